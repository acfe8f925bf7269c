//! Quotation operations.

use super::{require, Clinic, ClinicError, ClinicResult};
use crate::models::{Quotation, QuotationItem, QuotationStatus};
use crate::store::CollectionPath;

const MODULE: &str = "quotations";

impl Clinic {
    /// Store a quotation with its total recalculated.
    pub fn create_quotation(&self, quotation: &Quotation) -> ClinicResult<String> {
        let quotation = checked(quotation)?;
        self.create(
            &CollectionPath::quotations(),
            &quotation,
            MODULE,
            &format!(
                "Created quotation for patient {} totalling {:.2}",
                quotation.patient_id, quotation.total
            ),
        )
    }

    pub fn get_quotation(&self, id: &str) -> ClinicResult<Option<Quotation>> {
        self.fetch(&CollectionPath::quotations().doc(id))
    }

    /// Quotations, newest date first; only one patient's when `patient_id` is set.
    pub fn list_quotations(&self, patient_id: Option<&str>) -> ClinicResult<Vec<Quotation>> {
        let mut quotations: Vec<Quotation> = self
            .fetch_all::<Quotation>(&CollectionPath::quotations())?
            .into_iter()
            .filter(|q| patient_id.map_or(true, |id| q.patient_id == id))
            .collect();
        quotations.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(quotations)
    }

    pub fn update_quotation(&self, quotation: &Quotation) -> ClinicResult<()> {
        let quotation = checked(quotation)?;
        self.replace(
            &CollectionPath::quotations().doc(quotation.id.as_str()),
            &quotation,
            MODULE,
            &format!("Updated quotation {}", quotation.id),
        )
    }

    pub fn set_quotation_status(&self, id: &str, status: QuotationStatus) -> ClinicResult<()> {
        let mut quotation = self
            .get_quotation(id)?
            .ok_or_else(|| ClinicError::NotFound(format!("quotation {}", id)))?;
        quotation.status = status;
        self.update_quotation(&quotation)
    }

    pub fn delete_quotation(&self, id: &str) -> ClinicResult<()> {
        self.remove(
            &CollectionPath::quotations().doc(id),
            MODULE,
            &format!("Deleted quotation {}", id),
        )
    }
}

fn checked(quotation: &Quotation) -> ClinicResult<Quotation> {
    require(&quotation.patient_id, "Patient")?;
    if quotation.items.is_empty() {
        return Err(ClinicError::InvalidInput("A quotation needs at least one item".into()));
    }
    if quotation.items.iter().any(|item: &QuotationItem| item.quantity == 0) {
        return Err(ClinicError::InvalidInput("Quantities must be at least 1".into()));
    }
    if !(0.0..=100.0).contains(&quotation.discount_percent) {
        return Err(ClinicError::InvalidInput("Discount must be between 0 and 100".into()));
    }
    let mut quotation = quotation.clone();
    quotation.recalculate();
    Ok(quotation)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::clinic;
    use super::*;

    fn make_quotation(patient_id: &str, date: &str) -> Quotation {
        let mut quotation = Quotation::new(patient_id.into(), date.into());
        quotation.items.push(QuotationItem {
            service_id: Some("svc-1".into()),
            name: "Resin filling".into(),
            quantity: 2,
            unit_price: 450.0,
        });
        quotation.items.push(QuotationItem {
            service_id: None,
            name: "X-ray".into(),
            quantity: 1,
            unit_price: 100.0,
        });
        quotation.discount_percent = 10.0;
        quotation
    }

    #[test]
    fn test_total_is_recalculated_on_write() {
        let clinic = clinic();
        let id = clinic.create_quotation(&make_quotation("p1", "2026-05-01")).unwrap();
        let stored = clinic.get_quotation(&id).unwrap().unwrap();
        assert!((stored.total - 900.0).abs() < 1e-9);
    }

    #[test]
    fn test_list_filters_and_orders() {
        let clinic = clinic();
        clinic.create_quotation(&make_quotation("p1", "2026-01-10")).unwrap();
        clinic.create_quotation(&make_quotation("p2", "2026-03-01")).unwrap();
        clinic.create_quotation(&make_quotation("p1", "2026-02-20")).unwrap();

        let dates: Vec<String> = clinic
            .list_quotations(Some("p1"))
            .unwrap()
            .into_iter()
            .map(|q| q.date)
            .collect();
        assert_eq!(dates, vec!["2026-02-20", "2026-01-10"]);
        assert_eq!(clinic.list_quotations(None).unwrap().len(), 3);
    }

    #[test]
    fn test_status_change() {
        let clinic = clinic();
        let id = clinic.create_quotation(&make_quotation("p1", "2026-01-10")).unwrap();
        clinic.set_quotation_status(&id, QuotationStatus::Active).unwrap();
        assert_eq!(clinic.get_quotation(&id).unwrap().unwrap().status, QuotationStatus::Active);
    }

    #[test]
    fn test_rejects_bad_discount() {
        let clinic = clinic();
        let mut quotation = make_quotation("p1", "2026-01-10");
        quotation.discount_percent = 120.0;
        assert!(matches!(clinic.create_quotation(&quotation), Err(ClinicError::InvalidInput(_))));
    }
}
