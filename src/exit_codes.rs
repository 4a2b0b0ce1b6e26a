//! Process exit codes.

/// Setup and every application succeeded; the Procfile was written.
pub const OK: i32 = 0;
/// A setup step failed; no application ran.
pub const SETUP_FAILED: i32 = 1;
/// At least one application failed; the Procfile was not written.
pub const APPLICATIONS_FAILED: i32 = 2;
/// The config could not be read or parsed, or the Procfile could not be written.
pub const INVALID: i32 = 3;
