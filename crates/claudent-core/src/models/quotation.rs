//! Quotation models.

use serde::{Deserialize, Serialize};

/// Lifecycle of a quotation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum QuotationStatus {
    #[default]
    Draft,
    Active,
    Inactive,
}

/// One line of a quotation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuotationItem {
    /// Catalog service, `None` for ad-hoc lines
    #[serde(default)]
    pub service_id: Option<String>,
    pub name: String,
    pub quantity: u32,
    pub unit_price: f64,
}

impl QuotationItem {
    pub fn line_total(&self) -> f64 {
        self.unit_price * f64::from(self.quantity)
    }
}

/// A price quotation for a patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Quotation {
    #[serde(skip)]
    pub id: String,
    pub patient_id: String,
    /// Quotation date (YYYY-MM-DD)
    pub date: String,
    pub items: Vec<QuotationItem>,
    /// Discount percentage (0–100)
    #[serde(default)]
    pub discount_percent: f64,
    /// Stored total, refreshed by [`Quotation::recalculate`]
    #[serde(default)]
    pub total: f64,
    #[serde(default)]
    pub status: QuotationStatus,
    #[serde(default)]
    pub notes: String,
}

impl Quotation {
    pub fn new(patient_id: String, date: String) -> Self {
        Self {
            id: String::new(),
            patient_id,
            date,
            items: Vec::new(),
            discount_percent: 0.0,
            total: 0.0,
            status: QuotationStatus::Draft,
            notes: String::new(),
        }
    }

    pub fn subtotal(&self) -> f64 {
        self.items.iter().map(QuotationItem::line_total).sum()
    }

    /// Discount amount; the percentage is clamped to 0–100.
    pub fn discount_amount(&self) -> f64 {
        self.subtotal() * self.discount_percent.clamp(0.0, 100.0) / 100.0
    }

    pub fn computed_total(&self) -> f64 {
        self.subtotal() - self.discount_amount()
    }

    /// Refresh the stored total from the items and discount.
    pub fn recalculate(&mut self) {
        self.total = self.computed_total();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quotation_totals() {
        let mut quotation = Quotation::new("patient-1".into(), "2026-05-01".into());
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
        quotation.recalculate();

        assert_eq!(quotation.subtotal(), 1000.0);
        assert_eq!(quotation.discount_amount(), 100.0);
        assert_eq!(quotation.total, 900.0);
    }

    #[test]
    fn test_discount_clamped() {
        let mut quotation = Quotation::new("patient-1".into(), "2026-05-01".into());
        quotation.items.push(QuotationItem {
            service_id: None,
            name: "Crown".into(),
            quantity: 1,
            unit_price: 200.0,
        });
        quotation.discount_percent = 150.0;
        assert_eq!(quotation.computed_total(), 0.0);
    }
}
