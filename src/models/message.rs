#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Stdout,
    Stderr,
    Info,
    Error,
}

/// A single logical output line, without its trailing newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRecord {
    pub source: String,
    pub text: String,
    pub kind: RecordKind,
}

impl OutputRecord {
    pub fn new(source: impl Into<String>, text: impl Into<String>, kind: RecordKind) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskMessage {
    /// Sent once per executed step; a failed step is always the last one sent.
    StepCompleted {
        task: String,
        step: usize,
        success: bool,
    },
    /// Sent exactly once per task, including tasks without steps.
    Finished { task: String, success: bool },
}
