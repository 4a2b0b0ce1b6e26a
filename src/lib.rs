//! Runs each application's setup steps across a bounded pool of workers,
//! streams their output to the console with per-application prefixes, and
//! writes a Procfile once everything has passed.

pub mod app;
pub mod config;
pub mod error;
pub mod exit_codes;
pub mod logging;
pub mod manager;
pub mod manifest;
pub mod models;
pub mod worker;

pub use error::{Error, Result};
