//! Findings summary derived from the tooth map.

use std::fmt;

use crate::models::{TeethMap, ToothNumber};

/// One line of the findings summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub tooth: ToothNumber,
    /// Comma-joined condition labels
    pub text: String,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tooth {}: {}", self.tooth, self.text)
    }
}

/// Findings sorted by tooth number, skipping teeth that are only sound.
pub fn findings_summary(teeth: &TeethMap) -> Vec<Finding> {
    teeth
        .iter()
        .filter(|(_, state)| !state.is_sound_only() && !state.conditions.is_empty())
        .map(|(tooth, state)| Finding {
            tooth: *tooth,
            text: state
                .conditions
                .iter()
                .map(|code| state.condition_label(*code))
                .collect::<Vec<_>>()
                .join(", "),
        })
        .collect()
}
