//! On-disk descriptor persistence.
//!
//! `RegistryStore` maps contracts to files under one descriptor directory.
//! Missing files are a normal state (first build, new contract) and every
//! filesystem failure is reported as a `StoreError` the caller may log and
//! ignore; nothing here aborts the host build. Writes go through a sibling
//! temp file that is flushed, synced and renamed over the target so readers
//! never observe a truncated descriptor.

pub mod format;
pub mod location;

pub use location::{
    HostOutput, LOCATOR_NAME, LocationSource, OutputLocation, determine_output_location,
};

use crate::StoreError;
use crate::kind::DescriptorKind;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Summary log written next to the descriptors.
pub const LOG_FILE_NAME: &str = "registry.log";

const TEMP_PREFIX: &str = ".registry-";

#[derive(Clone, Debug, PartialEq, Eq)]
enum LogEntry {
    Written { contract: String, providers: usize },
    Deleted { contract: String },
}

#[derive(Debug)]
pub struct RegistryStore {
    location: OutputLocation,
    kind_name: &'static str,
    log_enabled: bool,
    log: Vec<LogEntry>,
}

impl RegistryStore {
    pub fn new(location: OutputLocation, kind: &dyn DescriptorKind) -> Self {
        Self {
            location,
            kind_name: kind.name(),
            log_enabled: true,
            log: Vec::new(),
        }
    }

    pub fn with_log(mut self, enabled: bool) -> Self {
        self.log_enabled = enabled;
        self
    }

    pub fn location(&self) -> &OutputLocation {
        &self.location
    }

    pub fn directory(&self) -> Option<&Path> {
        self.location.directory.as_deref()
    }

    /// Path of the descriptor for `contract`, if the store is backed by disk.
    pub fn descriptor_path(&self, contract: &str) -> Option<PathBuf> {
        self.directory().map(|dir| dir.join(contract))
    }

    /// Names of descriptors currently on disk, sorted.
    pub fn try_find_all(&self) -> Vec<String> {
        let Some(dir) = self.directory() else {
            return Vec::new();
        };
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Vec::new(),
            Err(err) => {
                warn!(directory = %dir.display(), error = %err, "unable to list descriptors");
                return Vec::new();
            }
        };

        let mut names = Vec::new();
        for entry in entries.flatten() {
            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if is_descriptor_name(&name) {
                names.push(name);
            }
        }
        names.sort();
        names
    }

    /// Read the providers listed for `contract`.
    pub fn load(&self, contract: &str) -> Result<Vec<String>, StoreError> {
        check_name(contract)?;
        let Some(path) = self.descriptor_path(contract) else {
            return Err(StoreError::NotFound {
                path: PathBuf::from(contract),
            });
        };
        let mut text = String::new();
        File::open(&path)
            .and_then(|mut file| file.read_to_string(&mut text))
            .map_err(|err| StoreError::from_io(path.clone(), err))?;
        Ok(format::parse(&text))
    }

    /// Replace the descriptor for `contract` with `providers`, sorted.
    pub fn write(&mut self, contract: &str, providers: &[String]) -> Result<(), StoreError> {
        check_name(contract)?;
        let Some(dir) = self.directory().map(Path::to_path_buf) else {
            info!(contract, "no output location; discarding descriptor update");
            return Ok(());
        };
        let path = dir.join(contract);
        let body = format::render(providers.iter().map(String::as_str));
        replace_atomically(&dir, &path, body.as_bytes())
            .map_err(|err| StoreError::Io { path: path.clone(), source: err })?;
        debug!(contract, path = %path.display(), providers = providers.len(), "wrote descriptor");
        self.log.push(LogEntry::Written {
            contract: contract.to_string(),
            providers: providers.len(),
        });
        Ok(())
    }

    /// Remove the descriptor for `contract`; absence counts as success.
    pub fn delete(&mut self, contract: &str) -> Result<(), StoreError> {
        check_name(contract)?;
        let Some(path) = self.descriptor_path(contract) else {
            info!(contract, "no output location; discarding descriptor removal");
            return Ok(());
        };
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(StoreError::Io { path, source: err }),
        }
        debug!(contract, path = %path.display(), "deleted descriptor");
        self.log.push(LogEntry::Deleted {
            contract: contract.to_string(),
        });
        Ok(())
    }

    /// Write a human-readable summary of this pass. Failures are logged only.
    pub fn write_log(&self) {
        if !self.log_enabled {
            return;
        }
        let Some(dir) = self.directory() else {
            return;
        };
        let path = dir.join(LOG_FILE_NAME);
        if let Err(err) = replace_atomically(dir, &path, self.render_log().as_bytes()) {
            warn!(path = %path.display(), error = %err, "unable to write registry log");
        }
    }

    fn render_log(&self) -> String {
        let mut out = format!("{} descriptors ({} changes)\n", self.kind_name, self.log.len());
        for entry in &self.log {
            match entry {
                LogEntry::Written {
                    contract,
                    providers,
                } => out.push_str(&format!("wrote {contract} ({providers} providers)\n")),
                LogEntry::Deleted { contract } => out.push_str(&format!("deleted {contract}\n")),
            }
        }
        out
    }
}

/// Whether `name` can live in the descriptor directory: one plain file name
/// that is not the locator, the log, or a dot-file.
pub fn is_descriptor_name(name: &str) -> bool {
    if name.is_empty() || name != name.trim() || name.contains(['/', '\\']) {
        return false;
    }
    let mut components = Path::new(name).components();
    let single = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    single && !name.starts_with('.') && name != LOCATOR_NAME && name != LOG_FILE_NAME
}

fn check_name(contract: &str) -> Result<(), StoreError> {
    if is_descriptor_name(contract) {
        Ok(())
    } else {
        Err(StoreError::InvalidName {
            name: contract.to_string(),
        })
    }
}

fn replace_atomically(dir: &Path, target: &Path, contents: &[u8]) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    let mut temp = tempfile::Builder::new().prefix(TEMP_PREFIX).tempfile_in(dir)?;
    write_all_synced(&mut temp, contents)?;
    temp.persist(target).map_err(|err| err.error)?;
    Ok(())
}

fn write_all_synced(temp: &mut NamedTempFile, contents: &[u8]) -> io::Result<()> {
    temp.write_all(contents)?;
    temp.flush()?;
    temp.as_file().sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::ServiceProviders;
    use tempfile::TempDir;

    fn store(dir: &Path) -> RegistryStore {
        RegistryStore::new(
            OutputLocation::at(dir, LocationSource::Configured),
            &ServiceProviders,
        )
    }

    #[test]
    fn write_then_load_round_trips_membership() {
        let temp = TempDir::new().unwrap();
        let mut store = store(temp.path());
        store
            .write("c.Service", &["x.Z".to_string(), "x.Y".to_string()])
            .unwrap();

        let text = fs::read_to_string(temp.path().join("c.Service")).unwrap();
        assert_eq!(text, "x.Y\nx.Z\n");
        assert_eq!(store.load("c.Service").unwrap(), vec!["x.Y", "x.Z"]);
    }

    #[test]
    fn load_missing_is_not_found() {
        let temp = TempDir::new().unwrap();
        let err = store(temp.path()).load("c.Missing").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn delete_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let mut store = store(temp.path());
        store.write("c.Service", &["x.Y".to_string()]).unwrap();
        store.delete("c.Service").unwrap();
        assert!(!temp.path().join("c.Service").exists());
        store.delete("c.Service").unwrap();
    }

    #[test]
    fn find_all_skips_bookkeeping_files() {
        let temp = TempDir::new().unwrap();
        let mut store = store(temp.path());
        store.write("b.Service", &["x.Y".to_string()]).unwrap();
        store.write("a.Service", &["x.Y".to_string()]).unwrap();
        fs::write(temp.path().join(LOCATOR_NAME), "").unwrap();
        fs::write(temp.path().join(".hidden"), "").unwrap();
        fs::create_dir(temp.path().join("nested")).unwrap();
        store.write_log();

        assert!(temp.path().join(LOG_FILE_NAME).is_file());
        assert_eq!(store.try_find_all(), vec!["a.Service", "b.Service"]);
    }

    #[test]
    fn log_summarizes_changes() {
        let temp = TempDir::new().unwrap();
        let mut store = store(temp.path());
        store.write("c.Service", &["x.Y".to_string()]).unwrap();
        store.delete("c.Other").unwrap();
        store.write_log();

        let log = fs::read_to_string(temp.path().join(LOG_FILE_NAME)).unwrap();
        assert!(log.starts_with("services descriptors (2 changes)"));
        assert!(log.contains("wrote c.Service (1 providers)"));
        assert!(log.contains("deleted c.Other"));
    }

    #[test]
    fn disabled_log_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let store = store(temp.path()).with_log(false);
        store.write_log();
        assert!(!temp.path().join(LOG_FILE_NAME).exists());
    }

    #[test]
    fn reserved_and_escaping_names_are_refused() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("services");
        let mut store = store(&dir);
        let outside = temp.path().join("escaped");
        let outside_name = outside.to_string_lossy().into_owned();

        for name in [
            outside_name.as_str(),
            "../escaped",
            "nested/c.Service",
            "c.Service/",
            LOG_FILE_NAME,
            LOCATOR_NAME,
            ".hidden",
            "..",
            "",
            "  c.Service",
        ] {
            assert!(!is_descriptor_name(name), "{name:?} should be refused");
            let err = store.write(name, &["x.Y".to_string()]).unwrap_err();
            assert!(matches!(err, StoreError::InvalidName { .. }), "{name:?}");
            assert!(store.delete(name).is_err());
        }
        assert!(!outside.exists());
        assert!(is_descriptor_name("c.Service"));
        assert!(is_descriptor_name("javax.inject.Named"));
    }

    #[test]
    fn in_memory_store_discards_changes() {
        let mut store = RegistryStore::new(OutputLocation::in_memory(), &ServiceProviders);
        assert!(store.try_find_all().is_empty());
        store.write("c.Service", &["x.Y".to_string()]).unwrap();
        store.delete("c.Service").unwrap();
        assert!(store.load("c.Service").unwrap_err().is_not_found());
        store.write_log();
    }
}
