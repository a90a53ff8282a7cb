use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subtitle {
    pub(crate) show_at: Duration,
    pub(crate) hide_at: Duration,
    pub(crate) text: Vec<String>,
}

impl Subtitle {
    pub fn new(show_at: Duration, hide_at: Duration, text: Vec<String>) -> Self {
        Self {
            show_at,
            hide_at,
            text,
        }
    }

    /// The raw caption text, content lines joined with `\n`.
    pub fn content(&self) -> String {
        self.text.join("\n")
    }
}
