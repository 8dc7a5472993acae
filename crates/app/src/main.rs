use std::fmt;
use std::io::{BufRead, Write as _};
use std::sync::Arc;
use std::time::Duration;

use quiz_core::model::Question;
use services::{
    Clock, FixedQuestionSource, HttpDatasetTransport, QuestionSource, QuizDisplay, QuizSession,
    RemoteConfig, RemoteQuestionSource, RevealDelay, SessionRunner,
};
use storage::repository::Storage;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidQuestions { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidQuestions { raw } => write!(f, "invalid --questions value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

struct Args {
    db_url: String,
    api_url: Option<String>,
    questions: u32,
    offline: bool,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [--db <sqlite_url>] [--api <base_url>]");
    eprintln!("                      [--questions <n>] [--offline]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db quiz.sqlite3");
    eprintln!("  --questions 10");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DB_URL, QUIZ_API_URL, QUIZ_QUESTIONS");
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("QUIZ_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://quiz.sqlite3".into(), normalize_sqlite_url);
        let mut api_url = std::env::var("QUIZ_API_URL").ok();
        let mut questions = std::env::var("QUIZ_QUESTIONS")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(services::DEFAULT_QUESTIONS_PER_SESSION);
        let mut offline = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--api" => {
                    api_url = Some(require_value(args, "--api")?);
                }
                "--questions" => {
                    let value = require_value(args, "--questions")?;
                    questions = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidQuestions { raw: value.clone() })?;
                    if questions == 0 {
                        return Err(ArgsError::InvalidQuestions { raw: value });
                    }
                }
                "--offline" => {
                    offline = true;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            api_url,
            questions,
            offline,
        })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

struct TerminalDisplay;

impl QuizDisplay for TerminalDisplay {
    fn present_question(&self, question: &Question, position: &str) {
        println!();
        println!("[{position}] {}", question.text());
        print!("(y/n) > ");
        let _ = std::io::stdout().flush();
    }

    fn present_result(&self, report: &str, retry_label: &str) {
        println!();
        println!("{report}");
        println!();
        print!("{retry_label}? (r to restart, q to quit) > ");
        let _ = std::io::stdout().flush();
    }

    fn highlight_answer(&self, is_correct: bool) {
        println!("{}", if is_correct { "Correct!" } else { "Wrong." });
    }

    fn show_loading(&self) {}

    fn hide_loading(&self) {}

    fn show_recoverable_error(&self, message: &str) {
        eprintln!("error: {message}");
    }

    fn set_input_enabled(&self, _enabled: bool) {}
}

/// Small built-in dataset so the quiz works without a question server.
fn builtin_questions() -> Vec<Question> {
    [
        ("The Godfather was released in 1972.", true),
        ("The Shawshank Redemption won the Best Picture Oscar.", false),
        ("Alfred Hitchcock directed Psycho.", true),
        ("Pulp Fiction was directed by Martin Scorsese.", false),
        ("Spirited Away is a Studio Ghibli film.", true),
        ("The Matrix premiered in the 1980s.", false),
        ("Casablanca is set during World War II.", true),
        ("Parasite is a French production.", false),
        ("2001: A Space Odyssey was directed by Stanley Kubrick.", true),
        ("Titanic and Avatar share a director.", true),
    ]
    .into_iter()
    .map(|(text, answer)| Question::new(text, Vec::new(), answer))
    .collect()
}

fn parse_answer(line: &str) -> Option<bool> {
    match line.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);
    let args = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Open + migrate SQLite at startup. Keep this in the binary glue so
    // core/services stay pure.
    prepare_sqlite_file(&args.db_url)?;
    let storage = Storage::sqlite(&args.db_url).await?;

    let source: Arc<dyn QuestionSource> = if args.offline {
        Arc::new(FixedQuestionSource::new(builtin_questions()))
    } else {
        let config = args
            .api_url
            .map_or_else(RemoteConfig::from_env, |base_url| RemoteConfig { base_url });
        Arc::new(RemoteQuestionSource::new(HttpDatasetTransport::new(config)))
    };

    let runner = SessionRunner::new(
        Clock::default_clock(),
        source,
        storage.stats,
        Arc::new(TerminalDisplay),
    )
    .with_reveal_delay(RevealDelay::Fixed(Duration::from_secs(1)));

    let mut session = QuizSession::new(args.questions);
    if let Err(err) = runner.start(&mut session).await {
        eprintln!("could not start the quiz: {err}");
        eprintln!("run again to retry, or pass --offline for the built-in set");
        return Ok(());
    }

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let input = line.trim().to_ascii_lowercase();

        if session.is_finished() {
            match input.as_str() {
                "r" => {
                    runner.restart(&mut session).await?;
                    continue;
                }
                "q" | "" => break,
                _ => {
                    print!("(r to restart, q to quit) > ");
                    std::io::stdout().flush()?;
                    continue;
                }
            }
        }

        if input == "q" {
            break;
        }
        let Some(given) = parse_answer(&input) else {
            print!("(y/n) > ");
            std::io::stdout().flush()?;
            continue;
        };

        runner.answer(&mut session, given).await?;
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
