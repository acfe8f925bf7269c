//! Odontogram editing state machine.
//!
//! The editor works on a local copy of the tooth map which diverges from the
//! stored document until [`OdontogramEditor::save`]. Every tool application is
//! immediate except adding `Other`, which suspends until free text is
//! confirmed or cancelled.

use thiserror::Error;

use super::findings::{findings_summary, Finding};
use super::layout::ChartLayout;
use super::repository;
use crate::models::{
    ConditionCode, Odontogram, SurfaceName, TeethMap, Tool, ToothNumber, ToothState,
};
use crate::store::{DocumentStore, StoreError, StoreResult};

/// Editor errors.
#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Free text pending for tooth {0}")]
    FreeTextPending(ToothNumber),

    #[error("No free text prompt is open")]
    NoFreeTextPending,

    #[error("A save is already in progress")]
    SaveInProgress,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub type EditorResult<T> = Result<T, EditorError>;

/// Result of applying a tool to a tooth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolOutcome {
    /// The tooth map was updated.
    Applied,
    /// Waiting for free text before `Other` is added.
    AwaitingFreeText(ToothNumber),
}

/// Data committed by one save.
#[derive(Debug, Clone, PartialEq)]
pub struct SavePayload {
    pub teeth: TeethMap,
    pub general_notes: String,
}

/// Editing session over one odontogram.
#[derive(Debug, Clone)]
pub struct OdontogramEditor {
    patient_id: String,
    odontogram: Odontogram,
    selected_tool: Tool,
    selected_tooth: Option<ToothNumber>,
    teeth: TeethMap,
    general_notes: String,
    pending_free_text: Option<ToothNumber>,
    saving: bool,
}

impl OdontogramEditor {
    /// Start editing a loaded odontogram.
    pub fn new(patient_id: impl Into<String>, odontogram: Odontogram) -> Self {
        Self {
            patient_id: patient_id.into(),
            teeth: odontogram.teeth.clone(),
            general_notes: odontogram.general_notes.clone(),
            odontogram,
            selected_tool: Tool::default(),
            selected_tooth: None,
            pending_free_text: None,
            saving: false,
        }
    }

    /// Load an odontogram from the store and start editing it.
    pub fn load(store: &dyn DocumentStore, patient_id: &str, odontogram_id: &str) -> EditorResult<Self> {
        let odontogram = repository::load_odontogram(store, patient_id, odontogram_id)?;
        Ok(Self::new(patient_id, odontogram))
    }

    pub fn patient_id(&self) -> &str {
        &self.patient_id
    }

    /// The odontogram as last loaded or saved.
    pub fn odontogram(&self) -> &Odontogram {
        &self.odontogram
    }

    pub fn layout(&self) -> ChartLayout {
        ChartLayout::for_dentition(self.odontogram.dentition_type)
    }

    pub fn selected_tool(&self) -> Tool {
        self.selected_tool
    }

    pub fn selected_tooth(&self) -> Option<ToothNumber> {
        self.selected_tooth
    }

    pub fn pending_free_text(&self) -> Option<ToothNumber> {
        self.pending_free_text
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn teeth(&self) -> &TeethMap {
        &self.teeth
    }

    pub fn general_notes(&self) -> &str {
        &self.general_notes
    }

    /// State of a tooth; unexamined teeth read as sound.
    pub fn tooth_state(&self, tooth: ToothNumber) -> ToothState {
        self.teeth.get(&tooth).cloned().unwrap_or_default()
    }

    pub fn select_tool(&mut self, tool: Tool) {
        self.selected_tool = tool;
    }

    pub fn select_tooth(&mut self, tooth: Option<ToothNumber>) {
        self.selected_tooth = tooth;
    }

    pub fn set_general_notes(&mut self, notes: impl Into<String>) {
        self.general_notes = notes.into();
    }

    /// Record a note on one surface; an empty note clears it.
    pub fn set_surface(&mut self, tooth: ToothNumber, surface: SurfaceName, note: &str) {
        let state = self.teeth.entry(tooth).or_default();
        if note.trim().is_empty() {
            state.surfaces.remove(&surface);
        } else {
            state.surfaces.insert(surface, note.to_string());
        }
    }

    /// Apply the selected tool to a tooth.
    pub fn apply_tool_to_tooth(&mut self, tooth: ToothNumber) -> EditorResult<ToolOutcome> {
        if let Some(pending) = self.pending_free_text {
            return Err(EditorError::FreeTextPending(pending));
        }
        self.selected_tooth = Some(tooth);

        match self.selected_tool {
            Tool::Eraser => {
                self.teeth.remove(&tooth);
            }
            Tool::Condition(ConditionCode::Sound) => {
                let state = self.teeth.entry(tooth).or_default();
                state.conditions.clear();
                state.conditions.insert(ConditionCode::Sound);
                state.free_text = None;
            }
            Tool::Condition(ConditionCode::Other) => {
                if self.tooth_state(tooth).has(ConditionCode::Other) {
                    let state = self.teeth.entry(tooth).or_default();
                    state.conditions.remove(&ConditionCode::Other);
                    state.free_text = None;
                    reset_if_empty(state);
                } else {
                    self.pending_free_text = Some(tooth);
                    return Ok(ToolOutcome::AwaitingFreeText(tooth));
                }
            }
            Tool::Condition(code) => {
                let state = self.teeth.entry(tooth).or_default();
                state.conditions.remove(&ConditionCode::Sound);
                if !state.conditions.remove(&code) {
                    state.conditions.insert(code);
                }
                reset_if_empty(state);
            }
        }
        Ok(ToolOutcome::Applied)
    }

    /// Confirm the free-text prompt: add `Other` with the given text.
    pub fn confirm_free_text(&mut self, text: &str) -> EditorResult<()> {
        let tooth = self
            .pending_free_text
            .take()
            .ok_or(EditorError::NoFreeTextPending)?;
        let state = self.teeth.entry(tooth).or_default();
        state.conditions.remove(&ConditionCode::Sound);
        state.conditions.insert(ConditionCode::Other);
        let text = text.trim();
        state.free_text = (!text.is_empty()).then(|| text.to_string());
        Ok(())
    }

    /// Dismiss the free-text prompt without touching the tooth.
    pub fn cancel_free_text(&mut self) {
        self.pending_free_text = None;
    }

    /// Findings derived from the working copy.
    pub fn compute_findings_summary(&self) -> Vec<Finding> {
        findings_summary(&self.teeth)
    }

    /// Mark a save in flight and hand out what to write.
    pub fn begin_save(&mut self) -> EditorResult<SavePayload> {
        if self.saving {
            return Err(EditorError::SaveInProgress);
        }
        self.saving = true;
        Ok(SavePayload {
            teeth: self.teeth.clone(),
            general_notes: self.general_notes.clone(),
        })
    }

    /// Clear the in-flight flag. The working copy is kept either way.
    pub fn finish_save(&mut self, payload: SavePayload, result: &StoreResult<()>) {
        self.saving = false;
        match result {
            Ok(()) => {
                self.odontogram.teeth = payload.teeth;
                self.odontogram.general_notes = payload.general_notes;
                tracing::info!(odontogram = %self.odontogram.id, "odontogram saved");
            }
            Err(e) => {
                tracing::warn!(odontogram = %self.odontogram.id, error = %e, "odontogram save failed");
            }
        }
    }

    /// Commit the tooth map and notes. Last writer wins.
    pub fn save(&mut self, store: &dyn DocumentStore) -> EditorResult<()> {
        let payload = self.begin_save()?;
        let result = repository::save_chart(
            store,
            &self.patient_id,
            &self.odontogram.id,
            &payload.teeth,
            &payload.general_notes,
        );
        self.finish_save(payload, &result);
        Ok(result?)
    }
}

fn reset_if_empty(state: &mut ToothState) {
    if state.conditions.is_empty() {
        state.conditions.insert(ConditionCode::Sound);
        state.free_text = None;
    }
}
