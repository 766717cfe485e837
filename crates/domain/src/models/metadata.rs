//! Side metadata attached to each stored record.
//!
//! Metadata is small enough to be returned by key listings, which lets the
//! pipeline classify and partially fold records without fetching them.

use serde::{Deserialize, Serialize};

use super::record::{InstallationType, TelemetryRecord};

/// Compact installation type code stored in metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum InstallationTypeCode {
    #[serde(rename = "o")]
    Os,
    #[serde(rename = "d")]
    Container,
    #[serde(rename = "c")]
    Core,
    #[serde(rename = "s")]
    Supervised,
    #[serde(rename = "uc")]
    UnsupportedContainer,
    #[default]
    #[serde(rename = "u", other)]
    Unknown,
}

impl From<InstallationType> for InstallationTypeCode {
    fn from(value: InstallationType) -> Self {
        match value {
            InstallationType::Os => Self::Os,
            InstallationType::Container => Self::Container,
            InstallationType::Core => Self::Core,
            InstallationType::Supervised => Self::Supervised,
            InstallationType::UnsupportedContainer => Self::UnsupportedContainer,
            InstallationType::Unknown => Self::Unknown,
        }
    }
}

/// Optional telemetry category included in a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetadataExtra {
    #[serde(rename = "i")]
    Integrations,
    #[serde(rename = "s")]
    Statistics,
    #[serde(rename = "a")]
    Addons,
}

/// Record side metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RecordMetadata {
    /// First time the installation was seen (ms since epoch).
    #[serde(rename = "a", default, skip_serializing_if = "Option::is_none")]
    pub added: Option<i64>,
    /// Last time the record was written (ms since epoch).
    #[serde(rename = "u", default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<i64>,
    #[serde(rename = "v", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(rename = "i", default)]
    pub installation_type: InstallationTypeCode,
    #[serde(rename = "c", default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(rename = "r", default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(rename = "e", default)]
    pub extra: Vec<MetadataExtra>,
}

impl RecordMetadata {
    /// Decode metadata from a listing entry. Undecodable metadata counts as missing.
    pub fn from_value(value: Option<&serde_json::Value>) -> Option<Self> {
        let value = value?;
        if value.is_null() {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }

    /// Synthesize metadata for a record.
    ///
    /// The added timestamp of `previous` is kept when present.
    pub fn for_record(
        record: &TelemetryRecord,
        updated: i64,
        previous: Option<&RecordMetadata>,
    ) -> Self {
        let mut extra = Vec::new();
        if record.integrations.is_some() {
            extra.push(MetadataExtra::Integrations);
        }
        if record.addons.is_some() {
            extra.push(MetadataExtra::Addons);
        }
        if record.shares_statistics() {
            extra.push(MetadataExtra::Statistics);
        }

        Self {
            added: Some(previous.and_then(|m| m.added).unwrap_or(updated)),
            updated: Some(updated),
            version: Some(record.version.clone()),
            installation_type: record.installation_type.into(),
            country: record.country.clone(),
            region: record.region.clone(),
            extra,
        }
    }

    /// True when the record shared no optional telemetry category.
    ///
    /// Such records are fully described by their metadata.
    pub fn is_lightweight(&self) -> bool {
        self.extra.is_empty()
    }
}
