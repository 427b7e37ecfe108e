#![allow(dead_code)]

use anyhow::{Context, Result};
use provider_registry::{BuildPass, HostOutput, Options, PassReport, TypeVisit};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const SERVICES_DIR: &str = "META-INF/services";

// A throwaway output root plus helpers for running passes against it.
pub struct Workspace {
    root: TempDir,
}

impl Workspace {
    pub fn new() -> Result<Self> {
        Ok(Self {
            root: TempDir::new().context("creating temp workspace")?,
        })
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    pub fn options(&self) -> Options {
        Options {
            output_directory: Some(self.root().to_path_buf()),
            ..Options::default()
        }
    }

    pub fn descriptor(&self, contract: &str) -> PathBuf {
        self.root().join(SERVICES_DIR).join(contract)
    }

    /// Provider names in a descriptor, or `None` if the file is missing.
    pub fn providers(&self, contract: &str) -> Result<Option<BTreeSet<String>>> {
        let path = self.descriptor(contract);
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        Ok(Some(text.lines().map(str::to_string).collect()))
    }

    pub fn write_descriptor(&self, contract: &str, contents: &str) -> Result<()> {
        let path = self.descriptor(contract);
        fs::create_dir_all(path.parent().expect("descriptor parent"))?;
        fs::write(&path, contents).with_context(|| format!("writing {}", path.display()))
    }

    /// Run one pass over `visits` with the default options for this workspace.
    pub fn run_pass(&self, visits: &[TypeVisit]) -> PassReport {
        run_pass_with(&self.options(), visits)
    }
}

pub fn run_pass_with(options: &Options, visits: &[TypeVisit]) -> PassReport {
    let mut pass = BuildPass::begin(options, &HostOutput::default());
    for visit in visits {
        pass.visit(visit);
    }
    pass.finish()
}

pub fn set_of(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|name| name.to_string()).collect()
}
