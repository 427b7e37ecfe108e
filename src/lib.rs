//! Incremental maintenance of provider-registry descriptor files.
//!
//! A build pass feeds declared types one at a time through [`BuildPass`],
//! which keeps a [`RegistryCollector`] consistent with the descriptors already
//! on disk and rewrites only the registries that changed.

pub mod config;
pub mod error;
pub mod kind;
pub mod pass;
pub mod registry;
pub mod store;

pub use config::Options;
pub use error::{ConfigError, Diagnostic, DiagnosticKind, StoreError};
pub use kind::{DescriptorKind, DescriptorKindName, SISU_INDEX_NAME, ServiceProviders, SisuIndex};
pub use pass::{BuildPass, Contribution, PassReport, TypeVisit};
pub use registry::{RegistryCollector, ServiceContract};
pub use store::{
    HostOutput, LOCATOR_NAME, LOG_FILE_NAME, LocationSource, OutputLocation, RegistryStore,
    determine_output_location, is_descriptor_name,
};

use anyhow::{Context, Result, bail};
use serde_json::Value;

/// Parse type-visit events from concatenated JSON values.
///
/// Each value is either one visit object or an array of them, so a single
/// object, an array, and newline-delimited objects are all accepted.
pub fn parse_visit_stream(input: &str) -> Result<Vec<TypeVisit>> {
    let mut visits = Vec::new();
    for (index, value) in serde_json::Deserializer::from_str(input)
        .into_iter::<Value>()
        .enumerate()
    {
        let value = value.context("Unable to parse type visit stream")?;
        match value {
            Value::Array(items) => {
                for item in items {
                    visits.push(
                        serde_json::from_value(item)
                            .with_context(|| format!("Invalid type visit in value {}", index + 1))?,
                    );
                }
            }
            Value::Object(_) => visits.push(
                serde_json::from_value(value)
                    .with_context(|| format!("Invalid type visit in value {}", index + 1))?,
            ),
            other => bail!("Unsupported JSON value {other}; expected object or array"),
        }
    }
    Ok(visits)
}
