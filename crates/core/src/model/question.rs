use std::fmt;

/// A single yes/no quiz question together with its artwork bytes.
///
/// Immutable once produced by a question source; the session owns it while
/// it is current and drops it after the answer is recorded.
#[derive(Clone, PartialEq, Eq)]
pub struct Question {
    text: String,
    image: Vec<u8>,
    correct_answer: bool,
}

impl Question {
    #[must_use]
    pub fn new(text: impl Into<String>, image: Vec<u8>, correct_answer: bool) -> Self {
        Self {
            text: text.into(),
            image,
            correct_answer,
        }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn image(&self) -> &[u8] {
        &self.image
    }

    #[must_use]
    pub fn correct_answer(&self) -> bool {
        self.correct_answer
    }
}

impl fmt::Debug for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Question")
            .field("text", &self.text)
            .field("image_len", &self.image.len())
            .field("correct_answer", &self.correct_answer)
            .finish()
    }
}
