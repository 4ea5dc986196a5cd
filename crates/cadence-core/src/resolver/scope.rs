//! View scopes and content layers.

use serde::{Deserialize, Serialize};

/// One tier of the override hierarchy. Ordered by precedence, lowest first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Template,
    Cohort,
    Client,
}

/// Addresses the records of one layer for a program.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(tag = "layer", content = "id", rename_all = "lowercase")]
pub enum LayerKey {
    Template,
    Cohort(String),
    /// Keyed by enrollment id.
    Client(String),
}

impl LayerKey {
    pub fn layer(&self) -> Layer {
        match self {
            LayerKey::Template => Layer::Template,
            LayerKey::Cohort(_) => Layer::Cohort,
            LayerKey::Client(_) => Layer::Client,
        }
    }
}

/// The view a caller is looking through.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "scope", rename_all = "lowercase")]
pub enum ContentScope {
    Template,
    Cohort { cohort_id: String },
    Client { enrollment_id: String },
}

impl ContentScope {
    pub fn cohort(cohort_id: impl Into<String>) -> Self {
        ContentScope::Cohort {
            cohort_id: cohort_id.into(),
        }
    }

    pub fn client(enrollment_id: impl Into<String>) -> Self {
        ContentScope::Client {
            enrollment_id: enrollment_id.into(),
        }
    }

    /// The layer that writes from this scope land in.
    pub fn write_key(&self) -> LayerKey {
        match self {
            ContentScope::Template => LayerKey::Template,
            ContentScope::Cohort { cohort_id } => LayerKey::Cohort(cohort_id.clone()),
            ContentScope::Client { enrollment_id } => LayerKey::Client(enrollment_id.clone()),
        }
    }
}
