use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::info;

use crate::config::Application;
use crate::{Error, Result};

pub const DEFAULT_PROCFILE_PATH: &str = "Procfile";

/// Writes one `<name>: <command>` line per application, replacing any existing file.
pub fn write_procfile(path: &Path, apps: &[(&str, &Application)]) -> Result<()> {
    let to_error = |source| Error::ManifestWrite {
        path: path.to_path_buf(),
        source,
    };
    let mut out = BufWriter::new(File::create(path).map_err(to_error)?);
    for (name, app) in apps {
        writeln!(out, "{}: {}", name, app.command).map_err(to_error)?;
    }
    out.flush().map_err(to_error)?;
    info!("Wrote {} entries to {}.", apps.len(), path.display());
    Ok(())
}
