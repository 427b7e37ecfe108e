//! Build pass driver.
//!
//! A pass resolves its output location, seeds the collector from whatever
//! descriptors already exist, then consumes one `TypeVisit` per declared type:
//! stale contributions of that type are retracted first, then its current
//! valid contributions are registered. `finish` writes or deletes only the
//! contracts whose provider sets changed.

use crate::config::Options;
use crate::error::{Diagnostic, DiagnosticKind};
use crate::kind::DescriptorKind;
use crate::registry::RegistryCollector;
use crate::store::{
    HostOutput, OutputLocation, RegistryStore, determine_output_location, format,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// One declared type offered by the front-end.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeVisit {
    pub type_name: String,
    #[serde(default)]
    pub contributions: Vec<Contribution>,
}

impl TypeVisit {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            contributions: Vec::new(),
        }
    }

    pub fn provides(mut self, contract: impl Into<String>) -> Self {
        self.contributions.push(Contribution::valid(contract));
        self
    }
}

/// A contract the visited type declares it provides.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contribution {
    pub contract: String,
    #[serde(default = "default_valid")]
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn default_valid() -> bool {
    true
}

impl Contribution {
    pub fn valid(contract: impl Into<String>) -> Self {
        Self {
            contract: contract.into(),
            valid: true,
            error: None,
        }
    }

    pub fn invalid(contract: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            contract: contract.into(),
            valid: false,
            error: Some(error.into()),
        }
    }
}

/// Outcome of a finished pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PassReport {
    pub kind: &'static str,
    pub disabled: bool,
    pub location: Option<OutputLocation>,
    pub written: Vec<String>,
    pub deleted: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

struct ActivePass {
    store: RegistryStore,
    collector: RegistryCollector,
}

pub struct BuildPass {
    kind: Box<dyn DescriptorKind>,
    active: Option<ActivePass>,
    diagnostics: Vec<Diagnostic>,
}

impl BuildPass {
    /// Start a pass. Disabled passes accept events but touch nothing.
    pub fn begin(options: &Options, host: &HostOutput) -> Self {
        let kind = options.kind.build();
        if options.disabled {
            info!(kind = kind.name(), "registry processing disabled");
            return Self {
                kind,
                active: None,
                diagnostics: Vec::new(),
            };
        }

        let relative = options.descriptor_path(kind.directory());
        let location = determine_output_location(options, host, &relative);
        let mut diagnostics = Vec::new();
        if location.is_in_memory() {
            diagnostics.push(Diagnostic::configuration(
                "no usable output directory; registry changes were not persisted",
            ));
        }
        let store = RegistryStore::new(location, kind.as_ref()).with_log(options.log);
        let collector = RegistryCollector::load_from(&store);
        debug!(
            kind = kind.name(),
            directory = ?store.directory(),
            contracts = collector.len(),
            "registry pass started"
        );
        Self {
            kind,
            active: Some(ActivePass { store, collector }),
            diagnostics,
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.active.is_none()
    }

    pub fn collector(&self) -> Option<&RegistryCollector> {
        self.active.as_ref().map(|pass| &pass.collector)
    }

    pub fn location(&self) -> Option<&OutputLocation> {
        self.active.as_ref().map(|pass| pass.store.location())
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Retract what `visit.type_name` contributed before, then record what it
    /// contributes now.
    ///
    /// Names are trimmed first. A type name that cannot appear as a descriptor
    /// line invalidates all of its contributions.
    pub fn visit(&mut self, visit: &TypeVisit) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let type_name = visit.type_name.trim();
        let provider_ok = format::is_provider_name(type_name);
        if provider_ok {
            active.collector.remove_contributions_of(type_name);
        }

        for contribution in &visit.contributions {
            let contract = contribution.contract.trim();
            let rejection = if !provider_ok {
                Some(format!("'{type_name}' is not a usable provider name"))
            } else if contract.is_empty() {
                Some("contract name is blank".to_string())
            } else if !contribution.valid {
                Some(
                    contribution
                        .error
                        .clone()
                        .unwrap_or_else(|| "is not a valid provider".to_string()),
                )
            } else {
                None
            };
            if let Some(message) = rejection {
                debug!(type_name, contract, %message, "skipping invalid provider");
                self.diagnostics.push(Diagnostic::for_contribution(
                    DiagnosticKind::Validation,
                    type_name,
                    contract,
                    message,
                ));
                continue;
            }
            if !self.kind.accepts(contract) {
                self.diagnostics.push(Diagnostic::for_contribution(
                    DiagnosticKind::UnsupportedContract,
                    type_name,
                    contract,
                    format!("not maintained by the {} descriptor kind", self.kind.name()),
                ));
                continue;
            }
            active.collector.register(contract, type_name);
        }
    }

    /// Flush changed registries and write the summary log.
    pub fn finish(self) -> PassReport {
        let BuildPass {
            kind,
            active,
            mut diagnostics,
        } = self;
        let Some(ActivePass {
            mut store,
            collector,
        }) = active
        else {
            return PassReport {
                kind: kind.name(),
                disabled: true,
                location: None,
                written: Vec::new(),
                deleted: Vec::new(),
                diagnostics,
            };
        };

        let mut written = Vec::new();
        let mut deleted = Vec::new();
        for contract in collector.dirty_contracts() {
            let name = contract.name();
            let outcome = if contract.is_empty() {
                store.delete(name).map(|()| deleted.push(name.to_string()))
            } else {
                store
                    .write(name, &contract.provider_names())
                    .map(|()| written.push(name.to_string()))
            };
            if let Err(err) = outcome {
                warn!(contract = name, error = %err, "unable to persist descriptor");
                diagnostics.push(Diagnostic::persistence(name, &err));
            }
        }
        for contract in collector.held_back() {
            let name = contract.name();
            warn!(contract = name, providers = contract.len(), "descriptor unreadable; not rewritten");
            diagnostics.push(Diagnostic::for_contract(
                DiagnosticKind::Persistence,
                name,
                format!(
                    "existing descriptor could not be read; {} provider(s) were not persisted",
                    contract.len()
                ),
            ));
        }
        store.write_log();

        info!(
            kind = kind.name(),
            written = written.len(),
            deleted = deleted.len(),
            "registry pass finished"
        );
        PassReport {
            kind: kind.name(),
            disabled: false,
            location: Some(store.location().clone()),
            written,
            deleted,
            diagnostics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::{DescriptorKindName, SISU_INDEX_NAME};
    use std::fs;
    use tempfile::TempDir;

    fn options(root: &TempDir) -> Options {
        Options {
            output_directory: Some(root.path().to_path_buf()),
            ..Options::default()
        }
    }

    #[test]
    fn invalid_contributions_are_reported_and_skipped() {
        let root = TempDir::new().unwrap();
        let mut pass = BuildPass::begin(&options(&root), &HostOutput::default());
        let visit = TypeVisit {
            type_name: "x.Bad".to_string(),
            contributions: vec![
                Contribution::invalid("c.Service", "has no public no-args constructor"),
                Contribution::valid("c.Other"),
            ],
        };
        pass.visit(&visit);
        let report = pass.finish();

        assert_eq!(report.written, vec!["c.Other"]);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].kind, DiagnosticKind::Validation);
        assert_eq!(
            report.diagnostics[0].message,
            "has no public no-args constructor"
        );
        assert!(!root.path().join("META-INF/services/c.Service").exists());
    }

    #[test]
    fn names_are_trimmed_and_blank_names_rejected() {
        let root = TempDir::new().unwrap();
        let mut pass = BuildPass::begin(&options(&root), &HostOutput::default());
        pass.visit(&TypeVisit::new("   ").provides("c.Service"));
        pass.visit(&TypeVisit::new("x.Y # z").provides("c.Service"));
        pass.visit(&TypeVisit::new(" x.Y ").provides(" c.Other ").provides(" "));
        let report = pass.finish();

        assert_eq!(report.written, vec!["c.Other"]);
        assert_eq!(report.diagnostics.len(), 3);
        assert!(
            report
                .diagnostics
                .iter()
                .all(|d| d.kind == DiagnosticKind::Validation)
        );
        assert!(!root.path().join("META-INF/services/c.Service").exists());
        let other = fs::read_to_string(root.path().join("META-INF/services/c.Other")).unwrap();
        assert_eq!(other, "x.Y\n");
    }

    #[test]
    fn disabled_pass_touches_nothing() {
        let root = TempDir::new().unwrap();
        let opts = Options {
            disabled: true,
            ..options(&root)
        };
        let mut pass = BuildPass::begin(&opts, &HostOutput::default());
        assert!(pass.is_disabled());
        pass.visit(&TypeVisit::new("x.Y").provides("c.Service"));
        let report = pass.finish();

        assert!(report.disabled);
        assert!(report.written.is_empty());
        assert!(!root.path().join("META-INF").exists());
    }

    #[test]
    fn sisu_kind_rejects_other_contracts() {
        let root = TempDir::new().unwrap();
        let opts = Options {
            kind: DescriptorKindName::Sisu,
            ..options(&root)
        };
        let mut pass = BuildPass::begin(&opts, &HostOutput::default());
        pass.visit(
            &TypeVisit::new("x.Named")
                .provides(SISU_INDEX_NAME)
                .provides("c.Service"),
        );
        let report = pass.finish();

        assert_eq!(report.written, vec![SISU_INDEX_NAME]);
        assert_eq!(
            report.diagnostics[0].kind,
            DiagnosticKind::UnsupportedContract
        );
        let index = fs::read_to_string(root.path().join("META-INF/sisu").join(SISU_INDEX_NAME))
            .unwrap();
        assert_eq!(index, "x.Named\n");
    }

    #[test]
    fn visit_events_deserialize_with_defaults() {
        let visit: TypeVisit = serde_json::from_str(
            r#"{"typeName": "x.Y", "contributions": [{"contract": "c.Service"}, {"contract": "c.Bad", "valid": false, "error": "is not public"}]}"#,
        )
        .unwrap();
        assert_eq!(visit.contributions[0], Contribution::valid("c.Service"));
        assert_eq!(
            visit.contributions[1],
            Contribution::invalid("c.Bad", "is not public")
        );
    }
}
