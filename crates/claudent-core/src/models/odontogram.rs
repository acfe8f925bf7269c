//! Odontogram models: tooth numbering, condition codes and per-tooth state.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// A clinical finding that can be recorded on a tooth.
///
/// Declaration order is the catalog order; condition sets iterate in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConditionCode {
    #[serde(rename = "0")]
    Sound,
    #[serde(rename = "1")]
    Caries,
    #[serde(rename = "2")]
    FilledWithCaries,
    #[serde(rename = "3")]
    FilledWithoutCaries,
    #[serde(rename = "4")]
    MissingCaries,
    #[serde(rename = "5")]
    MissingOther,
    #[serde(rename = "6")]
    FissureSealant,
    #[serde(rename = "7")]
    BridgeAbutment,
    #[serde(rename = "8")]
    Unerupted,
    #[serde(rename = "T")]
    Trauma,
    #[serde(rename = "9")]
    NotRecorded,
    #[serde(rename = "11")]
    GingivalRecession,
    #[serde(rename = "12")]
    RootCanal,
    #[serde(rename = "13")]
    SeparatedInstrument,
    #[serde(rename = "14")]
    PeriodontalPocket,
    #[serde(rename = "15")]
    Fluorosis,
    #[serde(rename = "16")]
    ShapeSizeAlteration,
    #[serde(rename = "17")]
    EndoPerioLesion,
    #[serde(rename = "LIBRE")]
    Other,
}

impl ConditionCode {
    /// Every code, in catalog order.
    pub const ALL: [ConditionCode; 19] = [
        ConditionCode::Sound,
        ConditionCode::Caries,
        ConditionCode::FilledWithCaries,
        ConditionCode::FilledWithoutCaries,
        ConditionCode::MissingCaries,
        ConditionCode::MissingOther,
        ConditionCode::FissureSealant,
        ConditionCode::BridgeAbutment,
        ConditionCode::Unerupted,
        ConditionCode::Trauma,
        ConditionCode::NotRecorded,
        ConditionCode::GingivalRecession,
        ConditionCode::RootCanal,
        ConditionCode::SeparatedInstrument,
        ConditionCode::PeriodontalPocket,
        ConditionCode::Fluorosis,
        ConditionCode::ShapeSizeAlteration,
        ConditionCode::EndoPerioLesion,
        ConditionCode::Other,
    ];

    /// Stored wire code.
    pub fn code(&self) -> &'static str {
        match self {
            ConditionCode::Sound => "0",
            ConditionCode::Caries => "1",
            ConditionCode::FilledWithCaries => "2",
            ConditionCode::FilledWithoutCaries => "3",
            ConditionCode::MissingCaries => "4",
            ConditionCode::MissingOther => "5",
            ConditionCode::FissureSealant => "6",
            ConditionCode::BridgeAbutment => "7",
            ConditionCode::Unerupted => "8",
            ConditionCode::Trauma => "T",
            ConditionCode::NotRecorded => "9",
            ConditionCode::GingivalRecession => "11",
            ConditionCode::RootCanal => "12",
            ConditionCode::SeparatedInstrument => "13",
            ConditionCode::PeriodontalPocket => "14",
            ConditionCode::Fluorosis => "15",
            ConditionCode::ShapeSizeAlteration => "16",
            ConditionCode::EndoPerioLesion => "17",
            ConditionCode::Other => "LIBRE",
        }
    }

    /// Parse a stored wire code.
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.code() == code)
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            ConditionCode::Sound => "Sound",
            ConditionCode::Caries => "Caries",
            ConditionCode::FilledWithCaries => "Filled with caries",
            ConditionCode::FilledWithoutCaries => "Filled without caries",
            ConditionCode::MissingCaries => "Missing (caries)",
            ConditionCode::MissingOther => "Missing (other reason)",
            ConditionCode::FissureSealant => "Fissure sealant",
            ConditionCode::BridgeAbutment => "Bridge/crown abutment",
            ConditionCode::Unerupted => "Unerupted",
            ConditionCode::Trauma => "Trauma",
            ConditionCode::NotRecorded => "Not recorded",
            ConditionCode::GingivalRecession => "Gingival recession",
            ConditionCode::RootCanal => "Root canal treatment",
            ConditionCode::SeparatedInstrument => "Separated instrument",
            ConditionCode::PeriodontalPocket => "Periodontal pocket",
            ConditionCode::Fluorosis => "Fluorosis",
            ConditionCode::ShapeSizeAlteration => "Shape/size alteration",
            ConditionCode::EndoPerioLesion => "Endo-perio lesion",
            ConditionCode::Other => "Other",
        }
    }

    /// Rank in [`DISPLAY_PRIORITY`]; lower wins.
    pub fn display_priority(&self) -> usize {
        DISPLAY_PRIORITY
            .iter()
            .position(|c| c == self)
            .unwrap_or(DISPLAY_PRIORITY.len())
    }
}

impl fmt::Display for ConditionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which condition dominates a tooth's display colour, highest first.
pub const DISPLAY_PRIORITY: [ConditionCode; 19] = [
    ConditionCode::MissingCaries,
    ConditionCode::MissingOther,
    ConditionCode::Caries,
    ConditionCode::FilledWithCaries,
    ConditionCode::EndoPerioLesion,
    ConditionCode::SeparatedInstrument,
    ConditionCode::RootCanal,
    ConditionCode::Trauma,
    ConditionCode::PeriodontalPocket,
    ConditionCode::GingivalRecession,
    ConditionCode::BridgeAbutment,
    ConditionCode::FilledWithoutCaries,
    ConditionCode::FissureSealant,
    ConditionCode::Fluorosis,
    ConditionCode::ShapeSizeAlteration,
    ConditionCode::Unerupted,
    ConditionCode::Other,
    ConditionCode::NotRecorded,
    ConditionCode::Sound,
];

/// An editor tool: a condition to apply, or the eraser.
///
/// The eraser is never stored on a tooth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Condition(ConditionCode),
    Eraser,
}

impl Default for Tool {
    fn default() -> Self {
        Tool::Condition(ConditionCode::Sound)
    }
}

impl From<ConditionCode> for Tool {
    fn from(code: ConditionCode) -> Self {
        Tool::Condition(code)
    }
}

/// Invalid tooth number.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid tooth number: {0}")]
pub struct InvalidToothNumber(pub u8);

/// A two-digit quadrant tooth number (FDI scheme).
///
/// Quadrants 1–4 are permanent (positions 1–8), 5–8 deciduous (positions 1–5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ToothNumber(u8);

impl ToothNumber {
    pub fn new(number: u8) -> Result<Self, InvalidToothNumber> {
        let quadrant = number / 10;
        let position = number % 10;
        let valid = match quadrant {
            1..=4 => (1..=8).contains(&position),
            5..=8 => (1..=5).contains(&position),
            _ => false,
        };
        if valid {
            Ok(Self(number))
        } else {
            Err(InvalidToothNumber(number))
        }
    }

    pub fn get(&self) -> u8 {
        self.0
    }

    pub fn quadrant(&self) -> u8 {
        self.0 / 10
    }

    /// Position counted from the midline (1 = central incisor).
    pub fn position(&self) -> u8 {
        self.0 % 10
    }

    pub fn is_deciduous(&self) -> bool {
        self.quadrant() >= 5
    }
}

impl TryFrom<u8> for ToothNumber {
    type Error = InvalidToothNumber;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        ToothNumber::new(value)
    }
}

impl From<ToothNumber> for u8 {
    fn from(tooth: ToothNumber) -> Self {
        tooth.0
    }
}

impl fmt::Display for ToothNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tooth surface that can carry a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SurfaceName {
    #[serde(rename = "oclusal")]
    Occlusal,
    #[serde(rename = "mesial")]
    Mesial,
    #[serde(rename = "distal")]
    Distal,
    #[serde(rename = "vestibular")]
    Vestibular,
    #[serde(rename = "lingual")]
    Lingual,
}

impl SurfaceName {
    pub const ALL: [SurfaceName; 5] = [
        SurfaceName::Occlusal,
        SurfaceName::Mesial,
        SurfaceName::Distal,
        SurfaceName::Vestibular,
        SurfaceName::Lingual,
    ];

    /// Stored name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SurfaceName::Occlusal => "oclusal",
            SurfaceName::Mesial => "mesial",
            SurfaceName::Distal => "distal",
            SurfaceName::Vestibular => "vestibular",
            SurfaceName::Lingual => "lingual",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }
}

/// Recorded state of one tooth.
///
/// Invariant: `conditions` is non-empty and `Sound` never shares the set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToothState {
    #[serde(rename = "estados")]
    pub conditions: BTreeSet<ConditionCode>,
    #[serde(rename = "textoLibre", default, skip_serializing_if = "Option::is_none")]
    pub free_text: Option<String>,
    #[serde(rename = "superficies", default)]
    pub surfaces: BTreeMap<SurfaceName, String>,
}

impl Default for ToothState {
    fn default() -> Self {
        Self::sound()
    }
}

impl ToothState {
    /// A tooth examined and found sound.
    pub fn sound() -> Self {
        Self {
            conditions: BTreeSet::from([ConditionCode::Sound]),
            free_text: None,
            surfaces: BTreeMap::new(),
        }
    }

    pub fn has(&self, code: ConditionCode) -> bool {
        self.conditions.contains(&code)
    }

    pub fn is_sound_only(&self) -> bool {
        self.conditions.len() == 1 && self.has(ConditionCode::Sound)
    }

    /// The condition that wins the tooth's display colour.
    pub fn dominant_condition(&self) -> ConditionCode {
        self.conditions
            .iter()
            .copied()
            .min_by_key(ConditionCode::display_priority)
            .unwrap_or(ConditionCode::Sound)
    }

    /// Restore the condition-set invariant on data that may predate it.
    pub fn normalize(&mut self) {
        if self.conditions.len() > 1 {
            self.conditions.remove(&ConditionCode::Sound);
        }
        if self.conditions.is_empty() {
            self.conditions.insert(ConditionCode::Sound);
        }
        if !self.has(ConditionCode::Other) {
            self.free_text = None;
        }
    }

    /// Label shown for one condition, with free text standing in for `Other`.
    pub fn condition_label(&self, code: ConditionCode) -> String {
        match (code, self.free_text.as_deref()) {
            (ConditionCode::Other, Some(text)) if !text.trim().is_empty() => text.to_string(),
            _ => code.label().to_string(),
        }
    }
}

/// Sparse per-tooth map; absent teeth are unexamined.
pub type TeethMap = BTreeMap<ToothNumber, ToothState>;

/// Dentition layout of an odontogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DentitionType {
    #[default]
    #[serde(rename = "adult", alias = "adulto")]
    Adult,
    #[serde(rename = "child", alias = "niño")]
    Child,
    #[serde(rename = "mixed", alias = "mixto")]
    Mixed,
}

impl DentitionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DentitionType::Adult => "adult",
            DentitionType::Child => "child",
            DentitionType::Mixed => "mixed",
        }
    }

    /// Accepts current and legacy names.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "adult" | "adulto" => Some(DentitionType::Adult),
            "child" | "niño" | "nino" => Some(DentitionType::Child),
            "mixed" | "mixto" => Some(DentitionType::Mixed),
            _ => None,
        }
    }

    /// Name given to an odontogram created without one.
    pub fn default_odontogram_name(&self) -> String {
        match self {
            DentitionType::Mixed => "Mixed Odontogram".to_string(),
            other => format!("Odontogram {}", other.as_str()),
        }
    }
}

/// A dated snapshot of per-tooth findings for one patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Odontogram {
    /// Store-assigned document ID
    #[serde(skip)]
    pub id: String,
    /// Display name ("Initial Exam", "6-month Review")
    #[serde(default)]
    pub name: Option<String>,
    /// Creation timestamp
    pub created_at: String,
    /// Dentition layout
    pub dentition_type: DentitionType,
    /// Sparse per-tooth state
    #[serde(default)]
    pub teeth: TeethMap,
    /// General notes
    #[serde(rename = "notes", default)]
    pub general_notes: String,
}

impl Odontogram {
    /// Create an empty odontogram; an absent name falls back to the dentition default.
    pub fn new(dentition_type: DentitionType, name: Option<String>) -> Self {
        let name = name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| dentition_type.default_odontogram_name());
        Self {
            id: String::new(),
            name: Some(name),
            created_at: chrono::Utc::now().to_rfc3339(),
            dentition_type,
            teeth: TeethMap::new(),
            general_notes: String::new(),
        }
    }

    /// Name to display, falling back to the dentition default.
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.dentition_type.default_odontogram_name())
    }

    /// Normalise every stored tooth entry.
    pub fn normalize(&mut self) {
        for state in self.teeth.values_mut() {
            state.normalize();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tooth_number_ranges() {
        for n in [11, 18, 21, 28, 31, 38, 41, 48, 51, 55, 61, 65, 71, 75, 81, 85] {
            assert!(ToothNumber::new(n).is_ok(), "{} should be valid", n);
        }
        for n in [0, 10, 19, 56, 66, 76, 86, 91, 99] {
            assert!(ToothNumber::new(n).is_err(), "{} should be invalid", n);
        }
    }

    #[test]
    fn test_condition_code_roundtrip_codes() {
        for code in ConditionCode::ALL {
            assert_eq!(ConditionCode::from_code(code.code()), Some(code));
        }
        assert_eq!(ConditionCode::from_code("eraser"), None);
    }

    #[test]
    fn test_priority_covers_every_code() {
        for code in ConditionCode::ALL {
            assert!(code.display_priority() < DISPLAY_PRIORITY.len());
        }
    }

    #[test]
    fn test_dominant_condition() {
        let mut state = ToothState::sound();
        state.conditions = BTreeSet::from([ConditionCode::FissureSealant, ConditionCode::Caries]);
        assert_eq!(state.dominant_condition(), ConditionCode::Caries);
    }

    #[test]
    fn test_tooth_state_wire_shape() {
        let mut state = ToothState::sound();
        state.conditions = BTreeSet::from([ConditionCode::Caries, ConditionCode::Other]);
        state.free_text = Some("Resin".into());

        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["estados"], serde_json::json!(["1", "LIBRE"]));
        assert_eq!(value["textoLibre"], "Resin");
        assert!(value["superficies"].as_object().unwrap().is_empty());
    }

    #[test]
    fn test_teeth_map_keys_are_strings() {
        let mut teeth = TeethMap::new();
        teeth.insert(ToothNumber::new(16).unwrap(), ToothState::sound());
        let value = serde_json::to_value(&teeth).unwrap();
        assert!(value.get("16").is_some());

        let back: TeethMap = serde_json::from_value(value).unwrap();
        assert!(back.contains_key(&ToothNumber::new(16).unwrap()));
    }

    #[test]
    fn test_invalid_tooth_key_rejected() {
        let value = serde_json::json!({ "99": { "estados": ["0"], "superficies": {} } });
        assert!(serde_json::from_value::<TeethMap>(value).is_err());
    }

    #[test]
    fn test_legacy_dentition_names() {
        let child: DentitionType = serde_json::from_value(serde_json::json!("niño")).unwrap();
        assert_eq!(child, DentitionType::Child);
        let mixed: DentitionType = serde_json::from_value(serde_json::json!("mixto")).unwrap();
        assert_eq!(mixed, DentitionType::Mixed);
        assert_eq!(DentitionType::parse("Adulto"), Some(DentitionType::Adult));
    }

    #[test]
    fn test_default_names() {
        assert_eq!(
            Odontogram::new(DentitionType::Mixed, None).name.as_deref(),
            Some("Mixed Odontogram")
        );
        assert_eq!(
            Odontogram::new(DentitionType::Child, Some("  ".into())).name.as_deref(),
            Some("Odontogram child")
        );
        assert_eq!(
            Odontogram::new(DentitionType::Adult, Some("Initial Exam".into())).name.as_deref(),
            Some("Initial Exam")
        );
    }

    #[test]
    fn test_normalize_empty_conditions() {
        let mut state = ToothState::sound();
        state.conditions.clear();
        state.free_text = Some("stale".into());
        state.normalize();
        assert!(state.is_sound_only());
        assert_eq!(state.free_text, None);
    }
}
