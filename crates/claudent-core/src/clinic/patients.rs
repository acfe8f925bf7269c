//! Patient operations.

use super::{require, Clinic, ClinicError, ClinicResult};
use crate::models::{Patient, RecordStatus};
use crate::store::CollectionPath;

const MODULE: &str = "patients";

impl Clinic {
    /// Register a patient. Returns the new ID.
    pub fn create_patient(&self, patient: &Patient) -> ClinicResult<String> {
        require(&patient.first_names, "First names")?;
        require(&patient.last_names, "Last names")?;
        self.create(
            &CollectionPath::patients(),
            patient,
            MODULE,
            &format!("Registered patient {}", patient.full_name()),
        )
    }

    pub fn get_patient(&self, id: &str) -> ClinicResult<Option<Patient>> {
        self.fetch(&CollectionPath::patients().doc(id))
    }

    /// All patients ordered by family then given names.
    pub fn list_patients(&self) -> ClinicResult<Vec<Patient>> {
        let mut patients: Vec<Patient> = self.fetch_all(&CollectionPath::patients())?;
        patients.sort_by(|a, b| {
            (a.last_names.to_lowercase(), a.first_names.to_lowercase())
                .cmp(&(b.last_names.to_lowercase(), b.first_names.to_lowercase()))
        });
        Ok(patients)
    }

    /// Patients whose name, phone or email contains `term` (case-insensitive).
    pub fn search_patients(&self, term: &str) -> ClinicResult<Vec<Patient>> {
        let term = term.trim().to_lowercase();
        Ok(self
            .list_patients()?
            .into_iter()
            .filter(|p| {
                term.is_empty()
                    || p.full_name().to_lowercase().contains(&term)
                    || p.phone.contains(&term)
                    || p.email.to_lowercase().contains(&term)
            })
            .collect())
    }

    pub fn update_patient(&self, patient: &Patient) -> ClinicResult<()> {
        require(&patient.first_names, "First names")?;
        require(&patient.last_names, "Last names")?;
        self.replace(
            &CollectionPath::patients().doc(patient.id.as_str()),
            patient,
            MODULE,
            &format!("Updated patient {}", patient.full_name()),
        )
    }

    /// Mark a patient active or inactive without deleting anything.
    pub fn set_patient_status(&self, id: &str, status: RecordStatus) -> ClinicResult<()> {
        let mut patient = self
            .get_patient(id)?
            .ok_or_else(|| ClinicError::NotFound(format!("patient {}", id)))?;
        patient.status = status;
        self.update_patient(&patient)
    }

    pub fn delete_patient(&self, id: &str) -> ClinicResult<()> {
        let name = self
            .get_patient(id)?
            .map(|p| p.full_name())
            .unwrap_or_else(|| id.to_string());
        self.remove(
            &CollectionPath::patients().doc(id),
            MODULE,
            &format!("Deleted patient {}", name),
        )
    }
}
