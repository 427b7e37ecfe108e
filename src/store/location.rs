//! Output location resolution.
//!
//! Descriptors land in `<root>/<dir prefix>/<kind directory>/`. The root is
//! resolved best-effort, in order: explicit override, the locator under the
//! host's class-output directory, the process-wide default, and finally a
//! fresh temporary directory. If all of those fail the pass runs in memory
//! only; resolution itself never fails.

use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::config::Options;

/// Marker file whose parent directory is the descriptor directory.
pub const LOCATOR_NAME: &str = "locator";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationSource {
    Configured,
    Locator,
    ProcessDefault,
    Temporary,
    InMemory,
}

/// Where descriptors are read from and written to for this pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OutputLocation {
    /// Descriptor directory; `None` when nothing usable was found.
    pub directory: Option<PathBuf>,
    pub source: LocationSource,
}

impl OutputLocation {
    pub fn at(directory: impl Into<PathBuf>, source: LocationSource) -> Self {
        Self {
            directory: Some(directory.into()),
            source,
        }
    }

    pub fn in_memory() -> Self {
        Self {
            directory: None,
            source: LocationSource::InMemory,
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.directory.is_none()
    }
}

/// What the host build tool knows about its output.
#[derive(Clone, Debug, Default)]
pub struct HostOutput {
    /// The build tool's class-output directory, if it reported one.
    pub class_output: Option<PathBuf>,
    /// Process-wide default root, normally [`Options::default_output_directory`].
    pub process_default: Option<PathBuf>,
}

impl HostOutput {
    pub fn new(class_output: Option<PathBuf>) -> Self {
        Self {
            class_output,
            process_default: Options::default_output_directory(),
        }
    }
}

#[derive(Debug, Error)]
enum LocatorError {
    #[error("class output {} is not a directory", .0.display())]
    MissingOutput(PathBuf),
    #[error("locator path {} escapes the class output", .0.display())]
    InvalidPath(PathBuf),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Resolve the descriptor directory for `relative` (prefix plus kind dir).
pub fn determine_output_location(
    options: &Options,
    host: &HostOutput,
    relative: &Path,
) -> OutputLocation {
    if let Some(root) = &options.output_directory {
        match prepare(&root.join(relative)) {
            Ok(dir) => return OutputLocation::at(dir, LocationSource::Configured),
            Err(err) => warn!(root = %root.display(), error = %err, "configured output directory unusable"),
        }
    }

    if let Some(class_output) = &host.class_output {
        match resolve_locator(class_output, relative) {
            Ok(dir) => return OutputLocation::at(dir, LocationSource::Locator),
            Err(err) => debug!(error = %err, "locator unavailable"),
        }
    }

    if let Some(root) = &host.process_default {
        match prepare(&root.join(relative)) {
            Ok(dir) => return OutputLocation::at(dir, LocationSource::ProcessDefault),
            Err(err) => warn!(root = %root.display(), error = %err, "default output directory unusable"),
        }
    }

    match temporary_root().and_then(|root| prepare(&root.join(relative))) {
        Ok(dir) => {
            warn!(directory = %dir.display(), "no output directory configured; using a temporary directory");
            OutputLocation::at(dir, LocationSource::Temporary)
        }
        Err(err) => {
            error!(error = %err, "no usable output location; registry changes stay in memory");
            OutputLocation::in_memory()
        }
    }
}

fn resolve_locator(class_output: &Path, relative: &Path) -> Result<PathBuf, LocatorError> {
    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(LocatorError::InvalidPath(relative.to_path_buf()));
    }
    if !class_output.is_dir() {
        return Err(LocatorError::MissingOutput(class_output.to_path_buf()));
    }
    let locator = class_output.join(relative).join(LOCATOR_NAME);
    let parent = locator
        .parent()
        .ok_or_else(|| LocatorError::InvalidPath(locator.clone()))?;
    Ok(prepare(parent)?)
}

fn prepare(dir: &Path) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    if !dir.is_dir() {
        return Err(io::Error::other(format!(
            "{} is not a directory",
            dir.display()
        )));
    }
    Ok(std::path::absolute(dir).unwrap_or_else(|_| dir.to_path_buf()))
}

fn temporary_root() -> io::Result<PathBuf> {
    let dir = tempfile::Builder::new()
        .prefix("provider-registry-")
        .tempdir()?;
    Ok(dir.keep())
}
