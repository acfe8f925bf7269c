//! Odontogram lifecycle for a patient.

use serde_json::Value;

use super::{not_found, Clinic, ClinicError, ClinicResult};
use crate::models::{AuditAction, DentitionType, Odontogram};
use crate::odontogram::{list_odontograms, OdontogramEditor};
use crate::store::{CollectionPath, DocumentData};

const MODULE: &str = "odontograms";

impl Clinic {
    /// Create an empty odontogram. A blank name gets the dentition default.
    pub fn create_odontogram(
        &self,
        patient_id: &str,
        dentition_type: DentitionType,
        name: Option<&str>,
    ) -> ClinicResult<Odontogram> {
        let mut odontogram = Odontogram::new(dentition_type, name.map(str::to_string));
        odontogram.id = self.create(
            &CollectionPath::odontograms(patient_id),
            &odontogram,
            MODULE,
            &format!(
                "Created odontogram \"{}\" for patient {}",
                odontogram.display_name(),
                patient_id
            ),
        )?;
        Ok(odontogram)
    }

    /// A patient's odontograms, newest first.
    pub fn list_odontograms(&self, patient_id: &str) -> ClinicResult<Vec<Odontogram>> {
        Ok(list_odontograms(self.store.as_ref(), patient_id)?)
    }

    pub fn rename_odontogram(&self, patient_id: &str, odontogram_id: &str, name: &str) -> ClinicResult<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ClinicError::InvalidInput("Name is required".into()));
        }
        let mut update = DocumentData::new();
        update.insert("name".into(), Value::String(name.to_string()));
        self.store
            .update(&CollectionPath::odontograms(patient_id).doc(odontogram_id), update)
            .map_err(not_found)?;
        self.log(
            AuditAction::Update,
            MODULE,
            &format!("Renamed odontogram {} to \"{}\"", odontogram_id, name),
        );
        Ok(())
    }

    pub fn delete_odontogram(&self, patient_id: &str, odontogram_id: &str) -> ClinicResult<()> {
        self.remove(
            &CollectionPath::odontograms(patient_id).doc(odontogram_id),
            MODULE,
            &format!("Deleted odontogram {} of patient {}", odontogram_id, patient_id),
        )
    }

    /// Open an editor on a stored odontogram.
    pub fn open_odontogram(&self, patient_id: &str, odontogram_id: &str) -> ClinicResult<OdontogramEditor> {
        Ok(OdontogramEditor::load(self.store.as_ref(), patient_id, odontogram_id)?)
    }

    /// Save an editor's working copy and record the change.
    pub fn save_odontogram(&self, editor: &mut OdontogramEditor) -> ClinicResult<()> {
        editor.save(self.store.as_ref())?;
        self.log(
            AuditAction::Update,
            MODULE,
            &format!(
                "Saved odontogram \"{}\" of patient {}",
                editor.odontogram().display_name(),
                editor.patient_id()
            ),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::clinic;
    use super::*;
    use crate::models::{ConditionCode, ToothNumber};

    #[test]
    fn test_create_uses_default_names() {
        let clinic = clinic();
        let mixed = clinic.create_odontogram("p1", DentitionType::Mixed, None).unwrap();
        assert_eq!(mixed.display_name(), "Mixed Odontogram");
        let adult = clinic.create_odontogram("p1", DentitionType::Adult, Some("  ")).unwrap();
        assert_eq!(adult.display_name(), "Odontogram adult");
        let named = clinic.create_odontogram("p1", DentitionType::Child, Some("First visit")).unwrap();
        assert_eq!(named.display_name(), "First visit");

        assert_eq!(clinic.list_odontograms("p1").unwrap().len(), 3);
    }

    #[test]
    fn test_rename_and_delete() {
        let clinic = clinic();
        let odontogram = clinic.create_odontogram("p1", DentitionType::Adult, None).unwrap();

        clinic.rename_odontogram("p1", &odontogram.id, "Initial exam").unwrap();
        let listed = clinic.list_odontograms("p1").unwrap();
        assert_eq!(listed[0].display_name(), "Initial exam");

        assert!(matches!(
            clinic.rename_odontogram("p1", &odontogram.id, ""),
            Err(ClinicError::InvalidInput(_))
        ));
        assert!(matches!(
            clinic.rename_odontogram("p1", "missing", "x"),
            Err(ClinicError::NotFound(_))
        ));

        clinic.delete_odontogram("p1", &odontogram.id).unwrap();
        assert!(clinic.list_odontograms("p1").unwrap().is_empty());
    }

    #[test]
    fn test_edit_and_save_is_audited() {
        let clinic = clinic();
        let odontogram = clinic.create_odontogram("p1", DentitionType::Adult, None).unwrap();

        let mut editor = clinic.open_odontogram("p1", &odontogram.id).unwrap();
        editor.select_tool(ConditionCode::Caries.into());
        editor.apply_tool_to_tooth(ToothNumber::new(16).unwrap()).unwrap();
        clinic.save_odontogram(&mut editor).unwrap();

        let reopened = clinic.open_odontogram("p1", &odontogram.id).unwrap();
        assert!(reopened
            .tooth_state(ToothNumber::new(16).unwrap())
            .has(ConditionCode::Caries));

        let latest = &clinic.audit().entries().unwrap()[0];
        assert!(latest.detail.starts_with("Saved odontogram"));
    }
}
