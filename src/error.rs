use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Failed to read config {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Failed to write manifest {}: {source}", path.display())]
    ManifestWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Console error: {0}")]
    Console(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Why a single step did not complete. Local to its task, never fatal to a run.
#[derive(Error, Debug)]
pub enum StepError {
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("could not capture {0} of child process")]
    MissingPipe(&'static str),

    #[error("failed waiting for child process: {0}")]
    Wait(std::io::Error),

    #[error("exit status {0}")]
    ExitCode(i32),

    #[error("terminated by signal {0}")]
    Signal(i32),

    #[error("terminated without an exit code")]
    Unknown,
}
