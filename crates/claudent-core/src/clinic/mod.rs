//! Clinic records: patients, catalog, quotations, history and odontograms.
//!
//! Every mutation appends an audit entry attributed to the acting user.

mod catalog;
mod history;
mod odontograms;
mod patients;
mod quotations;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::audit::AuditLog;
use crate::models::{
    AuditAction, HistoryEntry, Odontogram, Package, Patient, Quotation, Service,
};
use crate::odontogram::EditorError;
use crate::store::{
    to_document, CollectionPath, DocumentPath, DocumentSnapshot, DocumentStore, StoreError,
};

/// Clinic errors.
#[derive(Error, Debug)]
pub enum ClinicError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Editor error: {0}")]
    Editor(#[from] EditorError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type ClinicResult<T> = Result<T, ClinicError>;

/// A stored model whose document ID lives outside its body.
pub(crate) trait Record: Serialize + DeserializeOwned {
    fn set_id(&mut self, id: String);
}

macro_rules! impl_record {
    ($($ty:ty),*) => {
        $(impl Record for $ty {
            fn set_id(&mut self, id: String) {
                self.id = id;
            }
        })*
    };
}

impl_record!(Patient, Service, Package, Quotation, HistoryEntry, Odontogram);

/// Clinic record operations on behalf of one user.
#[derive(Clone)]
pub struct Clinic {
    store: Arc<dyn DocumentStore>,
    audit: AuditLog,
    actor: String,
}

impl Clinic {
    pub fn new(store: Arc<dyn DocumentStore>, audit: AuditLog, actor: impl Into<String>) -> Self {
        Self {
            store,
            audit,
            actor: actor.into(),
        }
    }

    /// Email the audit entries are attributed to.
    pub fn actor(&self) -> &str {
        &self.actor
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Append an audit entry. A failed audit write never undoes the mutation.
    fn log(&self, action: AuditAction, module: &str, detail: &str) {
        if let Err(e) = self.audit.record(&self.actor, action, module, detail) {
            tracing::warn!(error = %e, module, "failed to record audit entry");
        }
    }

    fn create<T: Record>(
        &self,
        collection: &CollectionPath,
        record: &T,
        module: &str,
        detail: &str,
    ) -> ClinicResult<String> {
        let id = self.store.add(collection, to_document(record)?)?;
        self.log(AuditAction::Create, module, detail);
        Ok(id)
    }

    fn replace<T: Record>(
        &self,
        path: &DocumentPath,
        record: &T,
        module: &str,
        detail: &str,
    ) -> ClinicResult<()> {
        self.store
            .update(path, to_document(record)?)
            .map_err(not_found)?;
        self.log(AuditAction::Update, module, detail);
        Ok(())
    }

    fn remove(&self, path: &DocumentPath, module: &str, detail: &str) -> ClinicResult<()> {
        self.store.delete(path)?;
        self.log(AuditAction::Delete, module, detail);
        Ok(())
    }

    fn fetch<T: Record>(&self, path: &DocumentPath) -> ClinicResult<Option<T>> {
        self.store.get(path)?.map(|doc| decode(&doc)).transpose()
    }

    fn fetch_all<T: Record>(&self, collection: &CollectionPath) -> ClinicResult<Vec<T>> {
        self.store.list(collection)?.iter().map(decode).collect()
    }
}

fn decode<T: Record>(doc: &DocumentSnapshot) -> ClinicResult<T> {
    let mut record: T = doc.decode()?;
    record.set_id(doc.id().to_string());
    Ok(record)
}

fn not_found(e: StoreError) -> ClinicError {
    match e {
        StoreError::NotFound(what) => ClinicError::NotFound(what),
        other => other.into(),
    }
}

fn require(value: &str, field: &str) -> ClinicResult<()> {
    if value.trim().is_empty() {
        Err(ClinicError::InvalidInput(format!("{} is required", field)))
    } else {
        Ok(())
    }
}
