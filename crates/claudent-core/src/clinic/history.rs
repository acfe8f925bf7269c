//! Per-patient treatment history and the initial clinical history questionnaire.

use serde_json::Value;

use super::{not_found, Clinic, ClinicError, ClinicResult};
use crate::models::{AuditAction, HistoryEntry, HistorySection, InitialHistory, PerformedService};
use crate::store::{CollectionPath, DocumentData, DocumentStore, SetMode, WriteBatch};

const MODULE: &str = "history";

impl Clinic {
    /// Record a visit. The total is priced from the service catalog.
    pub fn add_history_entry(
        &self,
        patient_id: &str,
        date: &str,
        services: Vec<PerformedService>,
        notes: &str,
    ) -> ClinicResult<String> {
        let mut total = 0.0;
        for performed in &services {
            let service = self.get_service(&performed.service_id)?.ok_or_else(|| {
                ClinicError::InvalidInput(format!("Unknown service {}", performed.service_id))
            })?;
            total += service.price * f64::from(performed.quantity);
        }

        let entry = HistoryEntry {
            id: String::new(),
            date: date.to_string(),
            services,
            notes: notes.to_string(),
            total,
        };
        self.create(
            &CollectionPath::history_entries(patient_id),
            &entry,
            MODULE,
            &format!("Added visit of {} for patient {}", date, patient_id),
        )
    }

    /// Save every section of the initial clinical history and flag the
    /// patient, in one atomic batch. Saving again overwrites the sections.
    pub fn save_initial_history(&self, patient_id: &str, history: InitialHistory) -> ClinicResult<()> {
        let sections = CollectionPath::clinical_history(patient_id);
        let mut batch = WriteBatch::new();
        for (section, fields) in history.into_sections() {
            batch.set(sections.doc(section.doc_id()), fields, SetMode::Overwrite);
        }
        let mut flag = DocumentData::new();
        flag.insert("hasHistory".into(), Value::Bool(true));
        batch.update(CollectionPath::patients().doc(patient_id), flag);

        self.store.commit(batch).map_err(not_found)?;
        self.log(
            AuditAction::Create,
            MODULE,
            &format!("Saved initial clinical history of patient {}", patient_id),
        );
        Ok(())
    }

    /// The stored initial clinical history, if one was saved.
    pub fn initial_history(&self, patient_id: &str) -> ClinicResult<Option<InitialHistory>> {
        let docs = self.store.list(&CollectionPath::clinical_history(patient_id))?;
        if docs.is_empty() {
            return Ok(None);
        }
        let mut history = InitialHistory::new();
        for doc in docs {
            match HistorySection::from_doc_id(doc.id()) {
                Some(section) => {
                    history.set_section(section, doc.data);
                }
                None => tracing::warn!(doc = %doc.id(), "skipping unknown history section"),
            }
        }
        Ok(Some(history))
    }

    /// A patient's visits, newest first.
    pub fn list_history(&self, patient_id: &str) -> ClinicResult<Vec<HistoryEntry>> {
        let mut entries: Vec<HistoryEntry> =
            self.fetch_all(&CollectionPath::history_entries(patient_id))?;
        entries.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(entries)
    }

    pub fn delete_history_entry(&self, patient_id: &str, entry_id: &str) -> ClinicResult<()> {
        self.remove(
            &CollectionPath::history_entries(patient_id).doc(entry_id),
            MODULE,
            &format!("Deleted visit {} of patient {}", entry_id, patient_id),
        )
    }
}
