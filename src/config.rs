//! Pass configuration.
//!
//! Hosts hand options over either as string pairs (the way annotation
//! processors receive `-A` options) or as a JSON file. The process-wide
//! default output directory is read here once and passed on explicitly; the
//! store never consults the environment itself.

use crate::error::ConfigError;
use crate::kind::DescriptorKindName;
use serde::{Deserialize, Serialize};
use std::env;
use std::env::VarError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const ENV_OUTPUT_DIR: &str = "PROVIDER_REGISTRY_OUTPUT_DIR";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Options {
    /// Explicit output root; wins over every other resolution step.
    pub output_directory: Option<PathBuf>,
    /// Skip all processing.
    pub disabled: bool,
    /// Prefix inserted between the output root and the kind directory.
    pub dir: String,
    pub kind: DescriptorKindName,
    /// Write `registry.log` next to the descriptors.
    pub log: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            output_directory: None,
            disabled: false,
            dir: String::new(),
            kind: DescriptorKindName::default(),
            log: true,
        }
    }
}

impl Options {
    /// Parse host-provided `key=value` options. Unknown keys are ignored.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut options = Options::default();
        for (key, value) in pairs {
            let key = key.as_ref().trim();
            let value = value.as_ref().trim();
            match key {
                "outputDirectory" => {
                    options.output_directory = (!value.is_empty()).then(|| PathBuf::from(value));
                }
                "disabled" => options.disabled = parse_flag(key, value)?,
                "log" => options.log = parse_flag(key, value)?,
                "dir" => options.dir = value.to_string(),
                "kind" => {
                    options.kind = DescriptorKindName::try_from(value).map_err(|_| {
                        ConfigError::InvalidValue {
                            key: key.to_string(),
                            value: value.to_string(),
                            expected: "services or sisu",
                        }
                    })?;
                }
                other => debug!(option = other, "ignoring unknown option"),
            }
        }
        Ok(options)
    }

    /// Load options from a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|error| ConfigError::Io {
            path: path.to_path_buf(),
            error,
        })?;
        serde_json::from_str(&data).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })
    }

    /// Process-wide default output root: runtime env first, then the hint
    /// baked in at compile time.
    pub fn default_output_directory() -> Option<PathBuf> {
        match env::var(ENV_OUTPUT_DIR) {
            Ok(value) if !value.is_empty() => return Some(PathBuf::from(value)),
            Ok(_) | Err(VarError::NotPresent) => {}
            Err(VarError::NotUnicode(os)) => return Some(PathBuf::from(os)),
        }
        option_env!("PROVIDER_REGISTRY_OUTPUT_HINT")
            .filter(|hint| !hint.is_empty())
            .map(PathBuf::from)
    }

    /// Relative path from the output root to the descriptor directory.
    pub fn descriptor_path(&self, kind_directory: &str) -> PathBuf {
        let prefix = self.dir.trim_matches('/');
        if prefix.is_empty() {
            PathBuf::from(kind_directory)
        } else {
            Path::new(prefix).join(kind_directory)
        }
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "" | "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            expected: "a boolean",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn pairs_override_defaults() {
        let options = Options::from_pairs([
            ("outputDirectory", "/tmp/out"),
            ("disabled", "true"),
            ("dir", "/generated/"),
            ("kind", "sisu"),
            ("log", "no"),
            ("verify", "true"),
        ])
        .expect("valid options");

        assert_eq!(options.output_directory, Some(PathBuf::from("/tmp/out")));
        assert!(options.disabled);
        assert!(!options.log);
        assert_eq!(options.kind, DescriptorKindName::Sisu);
        assert_eq!(
            options.descriptor_path("META-INF/sisu"),
            PathBuf::from("generated/META-INF/sisu")
        );
    }

    #[test]
    fn bare_flag_means_enabled() {
        let options = Options::from_pairs([("disabled", "")]).expect("valid options");
        assert!(options.disabled);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(Options::from_pairs([("disabled", "maybe")]).is_err());
        assert!(Options::from_pairs([("kind", "index")]).is_err());
    }

    #[test]
    fn loads_json_with_defaults() {
        let mut file = NamedTempFile::new().expect("temp file");
        write!(file, r#"{{"outputDirectory": "/tmp/reg", "kind": "services"}}"#).expect("write");
        let options = Options::load(file.path()).expect("load");
        assert_eq!(options.output_directory, Some(PathBuf::from("/tmp/reg")));
        assert!(options.log);
        assert!(!options.disabled);
        assert_eq!(options.descriptor_path("META-INF/services"), PathBuf::from("META-INF/services"));
    }

    #[test]
    fn load_reports_parse_errors() {
        let mut file = NamedTempFile::new().expect("temp file");
        write!(file, "not json").expect("write");
        assert!(matches!(
            Options::load(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }
}
