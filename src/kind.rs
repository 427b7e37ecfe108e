//! Descriptor kinds.
//!
//! Each kind names a family of descriptor files sharing one directory and one
//! rule for which contracts belong there. Passes pick a kind from
//! configuration instead of hard-coding the `META-INF/services` layout, so new
//! kinds can be added here without touching the collector or the store.

use crate::store::is_descriptor_name;
use serde::{Deserialize, Serialize};

/// Index file maintained by the sisu kind.
pub const SISU_INDEX_NAME: &str = "javax.inject.Named";

pub trait DescriptorKind {
    /// Short identifier used in config and logs.
    fn name(&self) -> &'static str;

    /// Directory, relative to the output root and prefix, holding descriptors.
    fn directory(&self) -> &'static str;

    /// Whether this kind maintains a descriptor for `contract`.
    fn accepts(&self, contract: &str) -> bool;
}

/// `META-INF/services/<contract>` files, one per service contract.
#[derive(Clone, Copy, Debug, Default)]
pub struct ServiceProviders;

impl DescriptorKind for ServiceProviders {
    fn name(&self) -> &'static str {
        "services"
    }

    fn directory(&self) -> &'static str {
        "META-INF/services"
    }

    fn accepts(&self, contract: &str) -> bool {
        is_descriptor_name(contract)
    }
}

/// The single `META-INF/sisu/javax.inject.Named` index.
#[derive(Clone, Copy, Debug, Default)]
pub struct SisuIndex;

impl DescriptorKind for SisuIndex {
    fn name(&self) -> &'static str {
        "sisu"
    }

    fn directory(&self) -> &'static str {
        "META-INF/sisu"
    }

    fn accepts(&self, contract: &str) -> bool {
        contract == SISU_INDEX_NAME
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptorKindName {
    #[default]
    Services,
    Sisu,
}

impl DescriptorKindName {
    pub fn as_str(&self) -> &'static str {
        match self {
            DescriptorKindName::Services => "services",
            DescriptorKindName::Sisu => "sisu",
        }
    }

    pub fn build(&self) -> Box<dyn DescriptorKind> {
        match self {
            DescriptorKindName::Services => Box::new(ServiceProviders),
            DescriptorKindName::Sisu => Box::new(SisuIndex),
        }
    }
}

impl TryFrom<&str> for DescriptorKindName {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "services" => Ok(DescriptorKindName::Services),
            "sisu" => Ok(DescriptorKindName::Sisu),
            other => Err(format!("unknown descriptor kind: {other}")),
        }
    }
}
