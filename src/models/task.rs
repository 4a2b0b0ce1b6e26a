use crossbeam_channel::Sender;

use super::message::{OutputRecord, RecordKind, TaskMessage};

/// One application's (or the setup phase's) ordered list of shell steps.
#[derive(Debug, Clone)]
pub struct Task {
    pub name: String,
    pub steps: Vec<String>,
    output: Sender<OutputRecord>,
    results: Sender<TaskMessage>,
}

impl Task {
    pub fn new(
        name: impl Into<String>,
        steps: Vec<String>,
        output: Sender<OutputRecord>,
        results: Sender<TaskMessage>,
    ) -> Self {
        Self {
            name: name.into(),
            steps,
            output,
            results,
        }
    }

    pub fn write_line(&self, kind: RecordKind, text: impl Into<String>) {
        let record = OutputRecord::new(self.name.clone(), text, kind);
        if self.output.send(record).is_err() {
            log::debug!("Console closed, dropping line from '{}'.", self.name);
        }
    }

    pub fn report(&self, message: TaskMessage) {
        if self.results.send(message).is_err() {
            log::debug!("Result channel closed for '{}'.", self.name);
        }
    }
}
