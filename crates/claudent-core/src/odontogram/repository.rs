//! Odontogram document persistence.

use serde_json::Value;

use crate::models::{Odontogram, TeethMap};
use crate::store::{
    to_document, CollectionPath, DocumentData, DocumentSnapshot, DocumentStore, StoreError,
    StoreResult,
};

/// Decode a stored odontogram, normalising legacy tooth entries.
pub fn decode_odontogram(snapshot: &DocumentSnapshot) -> StoreResult<Odontogram> {
    let mut odontogram: Odontogram = snapshot.decode()?;
    odontogram.id = snapshot.id().to_string();
    odontogram.normalize();
    Ok(odontogram)
}

/// Load one odontogram of a patient.
pub fn load_odontogram(
    store: &dyn DocumentStore,
    patient_id: &str,
    odontogram_id: &str,
) -> StoreResult<Odontogram> {
    let path = CollectionPath::odontograms(patient_id).doc(odontogram_id);
    let snapshot = store
        .get(&path)?
        .ok_or_else(|| StoreError::NotFound(path.to_string()))?;
    decode_odontogram(&snapshot)
}

/// Every odontogram of a patient, newest first.
pub fn list_odontograms(store: &dyn DocumentStore, patient_id: &str) -> StoreResult<Vec<Odontogram>> {
    let mut odontograms = store
        .list(&CollectionPath::odontograms(patient_id))?
        .iter()
        .map(decode_odontogram)
        .collect::<StoreResult<Vec<_>>>()?;
    odontograms.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(odontograms)
}

/// Write the tooth map and general notes as a single document update.
pub fn save_chart(
    store: &dyn DocumentStore,
    patient_id: &str,
    odontogram_id: &str,
    teeth: &TeethMap,
    general_notes: &str,
) -> StoreResult<()> {
    let mut update = DocumentData::new();
    update.insert("teeth".into(), Value::Object(to_document(teeth)?));
    update.insert("notes".into(), Value::String(general_notes.to_string()));
    store.update(
        &CollectionPath::odontograms(patient_id).doc(odontogram_id),
        update,
    )
}
