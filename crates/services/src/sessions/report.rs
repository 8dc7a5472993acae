use quiz_core::model::StatsAggregate;

/// Button label offered alongside the final report.
pub const RETRY_LABEL: &str = "Play again";

const BEST_GAME_DATE_FORMAT: &str = "%d.%m.%y %H:%M";

/// Render the end-of-session report.
///
/// Line order is a compatibility contract: current game result, lifetime
/// games count, best game, lifetime accuracy as a two-decimal percentage.
#[must_use]
pub fn format_report(correct: u32, total: u32, stats: &StatsAggregate) -> String {
    let current = format!("Your result: {correct}/{total}");
    let games = format!("Games played: {}", stats.games_count());
    let best = match stats.best_game() {
        Some(best) => format!(
            "Best game: {}/{} ({})",
            best.correct(),
            best.total(),
            best.completed_at().format(BEST_GAME_DATE_FORMAT)
        ),
        None => "Best game: none yet".to_string(),
    };
    let accuracy = format!("Average accuracy: {:.2}%", stats.total_accuracy() * 100.0);

    [current, games, best, accuracy].join("\n")
}
