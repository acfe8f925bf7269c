//! Collection and document addressing.
//!
//! A collection path alternates collection and document segments
//! (`patients/{id}/odontograms`); a document path is a collection path plus an ID.

use std::fmt;

pub const PATIENTS: &str = "patients";
pub const SERVICES: &str = "services";
pub const QUOTATIONS: &str = "quotations";
pub const PACKAGES: &str = "packages";
pub const AUDIT_LOG: &str = "auditLog";
pub const USERS: &str = "users";
pub const HISTORY_ENTRIES: &str = "historyEntries";
pub const ODONTOGRAMS: &str = "odontograms";
pub const CLINICAL_HISTORY: &str = "clinicalHistory";
pub const SESSIONS: &str = "sessions";

/// Path of a collection or sub-collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath(String);

impl CollectionPath {
    /// A top-level collection.
    pub fn root(name: &str) -> Self {
        Self(name.to_string())
    }

    /// A sub-collection under a document.
    pub fn nested(parent: &DocumentPath, name: &str) -> Self {
        Self(format!("{}/{}", parent, name))
    }

    /// Address a document in this collection.
    pub fn doc(&self, id: impl Into<String>) -> DocumentPath {
        DocumentPath {
            collection: self.clone(),
            id: id.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Every segment is non-empty.
    pub fn is_valid(&self) -> bool {
        self.0.split('/').all(|segment| !segment.trim().is_empty())
    }

    pub fn patients() -> Self {
        Self::root(PATIENTS)
    }

    pub fn services() -> Self {
        Self::root(SERVICES)
    }

    pub fn quotations() -> Self {
        Self::root(QUOTATIONS)
    }

    pub fn packages() -> Self {
        Self::root(PACKAGES)
    }

    pub fn audit_log() -> Self {
        Self::root(AUDIT_LOG)
    }

    pub fn history_entries(patient_id: &str) -> Self {
        Self::nested(&Self::patients().doc(patient_id), HISTORY_ENTRIES)
    }

    pub fn odontograms(patient_id: &str) -> Self {
        Self::nested(&Self::patients().doc(patient_id), ODONTOGRAMS)
    }

    /// Sections of a patient's initial clinical history, one document each.
    pub fn clinical_history(patient_id: &str) -> Self {
        Self::nested(&Self::patients().doc(patient_id), CLINICAL_HISTORY)
    }

    /// Device sessions of one identity.
    pub fn sessions(uid: &str) -> Self {
        Self::nested(&Self::root(USERS).doc(uid), SESSIONS)
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Path of a single document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentPath {
    collection: CollectionPath,
    id: String,
}

impl DocumentPath {
    pub fn collection(&self) -> &CollectionPath {
        &self.collection
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The ID is a single non-empty segment and the collection is valid.
    pub fn is_valid(&self) -> bool {
        !self.id.trim().is_empty() && !self.id.contains('/') && self.collection.is_valid()
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}
