//! Error and diagnostic types.
//!
//! Nothing here is fatal to the host build. `StoreError` distinguishes the
//! expected "no descriptor yet" state from real filesystem failures so callers
//! can log at the right level, and `Diagnostic` carries user-visible problems
//! (invalid providers, failed writes) back to whoever drives the pass.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Failures surfaced by [`crate::RegistryStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// The descriptor (or locator) does not exist yet.
    #[error("no descriptor at {}", .path.display())]
    NotFound { path: PathBuf },

    /// The contract name is not a plain file name in the descriptor
    /// directory, or collides with the locator or the log.
    #[error("'{name}' cannot be used as a descriptor name")]
    InvalidName { name: String },

    /// The filesystem refused a read, write or delete.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub(crate) fn from_io(path: PathBuf, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            StoreError::NotFound { path }
        } else {
            StoreError::Io { path, source }
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Errors raised while building [`crate::Options`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading {}: {error}", .path.display())]
    Io {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("invalid config file {}: {error}", .path.display())]
    Parse {
        path: PathBuf,
        error: serde_json::Error,
    },

    #[error("invalid value '{value}' for option '{key}' (expected {expected})")]
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// The front-end flagged the provider as ineligible.
    Validation,
    /// The active descriptor kind does not maintain this contract.
    UnsupportedContract,
    /// A descriptor could not be written or deleted.
    Persistence,
    /// No usable output location could be resolved.
    Configuration,
}

/// A user-visible problem attached to a declaration or to the pass itself.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn for_contribution(
        kind: DiagnosticKind,
        type_name: &str,
        contract: &str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            type_name: Some(type_name.to_string()),
            contract: Some(contract.to_string()),
            message: message.into(),
        }
    }

    pub fn for_contract(kind: DiagnosticKind, contract: &str, message: impl Into<String>) -> Self {
        Self {
            kind,
            type_name: None,
            contract: Some(contract.to_string()),
            message: message.into(),
        }
    }

    pub fn persistence(contract: &str, err: &StoreError) -> Self {
        Self::for_contract(DiagnosticKind::Persistence, contract, err.to_string())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::Configuration,
            type_name: None,
            contract: None,
            message: message.into(),
        }
    }
}
