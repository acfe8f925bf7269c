//! Clinical history entry models.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A service performed during a visit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PerformedService {
    pub service_id: String,
    pub quantity: u32,
}

/// One visit in a patient's treatment history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(skip)]
    pub id: String,
    /// Visit date (YYYY-MM-DD)
    pub date: String,
    pub services: Vec<PerformedService>,
    #[serde(default)]
    pub notes: String,
    pub total: f64,
}

/// One section of the initial clinical history questionnaire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HistorySection {
    GeneralHistory,
    HereditaryBackground,
    PathologicalHistory,
    NonPathologicalHistory,
    Allergies,
    Hospitalizations,
    VitalSigns,
    HeadNeckExam,
    TmjExam,
    OralCavity,
}

impl HistorySection {
    /// Every section, in questionnaire order.
    pub const ALL: [HistorySection; 10] = [
        HistorySection::GeneralHistory,
        HistorySection::HereditaryBackground,
        HistorySection::PathologicalHistory,
        HistorySection::NonPathologicalHistory,
        HistorySection::Allergies,
        HistorySection::Hospitalizations,
        HistorySection::VitalSigns,
        HistorySection::HeadNeckExam,
        HistorySection::TmjExam,
        HistorySection::OralCavity,
    ];

    /// Document ID the section is stored under.
    pub fn doc_id(&self) -> &'static str {
        match self {
            HistorySection::GeneralHistory => "generalHistory",
            HistorySection::HereditaryBackground => "hereditaryBackground",
            HistorySection::PathologicalHistory => "pathologicalHistory",
            HistorySection::NonPathologicalHistory => "nonPathologicalHistory",
            HistorySection::Allergies => "allergies",
            HistorySection::Hospitalizations => "hospitalizations",
            HistorySection::VitalSigns => "vitalSigns",
            HistorySection::HeadNeckExam => "headNeckExam",
            HistorySection::TmjExam => "tmjExam",
            HistorySection::OralCavity => "oralCavity",
        }
    }

    pub fn from_doc_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.doc_id() == id)
    }
}

/// Answers to the initial clinical history, keyed by section.
///
/// Section bodies are free-form form fields. A section left out is saved empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InitialHistory {
    sections: BTreeMap<HistorySection, Map<String, Value>>,
}

impl InitialHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one form field of a section.
    pub fn set(&mut self, section: HistorySection, field: impl Into<String>, value: Value) -> &mut Self {
        self.sections
            .entry(section)
            .or_default()
            .insert(field.into(), value);
        self
    }

    /// Replace a whole section.
    pub fn set_section(&mut self, section: HistorySection, fields: Map<String, Value>) -> &mut Self {
        self.sections.insert(section, fields);
        self
    }

    pub fn section(&self, section: HistorySection) -> Option<&Map<String, Value>> {
        self.sections.get(&section)
    }

    /// Every section in questionnaire order, absent ones as empty bodies.
    pub fn into_sections(mut self) -> Vec<(HistorySection, Map<String, Value>)> {
        HistorySection::ALL
            .into_iter()
            .map(|section| (section, self.sections.remove(&section).unwrap_or_default()))
            .collect()
    }
}
