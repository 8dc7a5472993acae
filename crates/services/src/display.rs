use quiz_core::model::Question;

/// Presentation boundary driven by the session runner.
///
/// Implementations render questions and results. They never call back into
/// the engine except through [`SessionRunner::answer`] and
/// [`SessionRunner::restart`].
///
/// [`SessionRunner::answer`]: crate::sessions::SessionRunner::answer
/// [`SessionRunner::restart`]: crate::sessions::SessionRunner::restart
pub trait QuizDisplay: Send + Sync {
    /// Show the given question; `position` is a 1-based `"i/N"` label.
    fn present_question(&self, question: &Question, position: &str);

    /// Show the end-of-session report with a retry affordance.
    fn present_result(&self, report: &str, retry_label: &str);

    /// Reveal whether the submitted answer was correct.
    fn highlight_answer(&self, is_correct: bool);

    fn show_loading(&self);

    fn hide_loading(&self);

    /// Surface a recoverable failure; the caller decides when to retry.
    fn show_recoverable_error(&self, message: &str);

    fn set_input_enabled(&self, enabled: bool);
}

/// Display that ignores every call; useful for headless runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDisplay;

impl QuizDisplay for NullDisplay {
    fn present_question(&self, _question: &Question, _position: &str) {}
    fn present_result(&self, _report: &str, _retry_label: &str) {}
    fn highlight_answer(&self, _is_correct: bool) {}
    fn show_loading(&self) {}
    fn hide_loading(&self) {}
    fn show_recoverable_error(&self, _message: &str) {}
    fn set_input_enabled(&self, _enabled: bool) {}
}
