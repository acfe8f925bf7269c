//! Claudent Core Library
//!
//! Dental clinic core: the odontogram editing model and the multi-device
//! session registry, over a realtime document store.
//!
//! # Architecture
//!
//! ```text
//!   Identity provider ──► AppContext ──► SessionRegistry ──► users/{uid}/sessions
//!                             │                 ▲                    │
//!                             │                 └── realtime snapshot┘
//!                             ▼
//!                           Clinic ──► patients / services / quotations / packages
//!                             │        patients/{id}/odontograms, historyEntries
//!                             ▼
//!                       OdontogramEditor ──► single-update save (last write wins)
//!                             │
//!                         AuditLog ──► auditLog (append-only)
//! ```
//!
//! # Modules
//!
//! - [`store`]: document store seam and its SQLite implementation
//! - [`models`]: domain types (ToothState, Odontogram, DeviceSession, Patient, ...)
//! - [`odontogram`]: chart layout, editor state machine, findings summary
//! - [`session`]: device fingerprinting, session IDs, revocation protocol
//! - [`identity`]: identity provider seam and sign-in error mapping
//! - [`clinic`]: audited CRUD over clinic records
//! - [`audit`]: audit log writer and paged reader
//! - [`context`]: explicit application context
//! - [`config`]: startup configuration

pub mod audit;
pub mod clinic;
pub mod config;
pub mod context;
pub mod identity;
pub mod models;
pub mod notice;
pub mod odontogram;
pub mod session;
pub mod store;

// Re-export commonly used types
pub use audit::{AuditLog, AuditPage};
pub use clinic::{Clinic, ClinicError};
pub use config::CoreConfig;
pub use context::AppContext;
pub use identity::{Identity, IdentityProvider, LocalIdentityProvider};
pub use models::{
    ConditionCode, DentitionType, DeviceSession, Odontogram, SurfaceName, Tool, ToothNumber,
    ToothState,
};
pub use notice::{Notice, NoticeLevel, NoticeQueue};
pub use odontogram::{ChartLayout, EditorError, Finding, OdontogramEditor, ToolOutcome};
pub use session::{ClientHints, SessionError, SessionRegistry, SessionState};
pub use store::{Database, DocumentStore, StoreError};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use identity::AuthError;
use models::{HistorySection, InitialHistory, Patient, Sex};
use session::{BrandVersion, MemorySessionIdStore};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum ClaudentError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Session error: {0}")]
    SessionError(String),

    #[error("Editor error: {0}")]
    EditorError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<StoreError> for ClaudentError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => ClaudentError::NotFound(what),
            other => ClaudentError::DatabaseError(other.to_string()),
        }
    }
}

impl From<EditorError> for ClaudentError {
    fn from(e: EditorError) -> Self {
        match e {
            EditorError::Store(inner) => inner.into(),
            other => ClaudentError::EditorError(other.to_string()),
        }
    }
}

impl From<ClinicError> for ClaudentError {
    fn from(e: ClinicError) -> Self {
        match e {
            ClinicError::Store(inner) => inner.into(),
            ClinicError::Editor(inner) => inner.into(),
            ClinicError::NotFound(what) => ClaudentError::NotFound(what),
            ClinicError::InvalidInput(msg) => ClaudentError::InvalidInput(msg),
        }
    }
}

impl From<SessionError> for ClaudentError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::Store(inner) => inner.into(),
            other => ClaudentError::SessionError(other.to_string()),
        }
    }
}

impl From<AuthError> for ClaudentError {
    fn from(e: AuthError) -> Self {
        ClaudentError::AuthError(e.to_string())
    }
}

impl From<config::ConfigError> for ClaudentError {
    fn from(e: config::ConfigError) -> Self {
        ClaudentError::ConfigError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for ClaudentError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        ClaudentError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open the core with explicit paths.
#[uniffi::export]
pub fn open_core(
    db_path: String,
    session_id_path: String,
    audit_page_size: u32,
    hints: FfiClientHints,
) -> Result<Arc<ClaudentCore>, ClaudentError> {
    let config = CoreConfig::new(db_path.into(), session_id_path.into(), audit_page_size as usize)?;
    ClaudentCore::open(config, hints)
}

/// Open the core configured from `CLAUDENT_*` environment variables.
#[uniffi::export]
pub fn open_core_from_env(hints: FfiClientHints) -> Result<Arc<ClaudentCore>, ClaudentError> {
    ClaudentCore::open(CoreConfig::from_env()?, hints)
}

/// Create an in-memory core (for testing).
#[uniffi::export]
pub fn open_core_in_memory(hints: FfiClientHints) -> Result<Arc<ClaudentCore>, ClaudentError> {
    let config = CoreConfig::new(":memory:".into(), "memory".into(), audit::DEFAULT_PAGE_SIZE)?;
    let identity = Arc::new(LocalIdentityProvider::new());
    let context = AppContext::new(
        config,
        Arc::new(Database::open_in_memory()?),
        identity.clone(),
        Arc::new(MemorySessionIdStore::new()),
        ClientHints::from(hints).detect(),
    );
    Ok(Arc::new(ClaudentCore::with_context(context, identity)))
}

/// The condition catalog in code order.
#[uniffi::export]
pub fn condition_catalog() -> Vec<FfiCondition> {
    ConditionCode::ALL.iter().copied().map(FfiCondition::from).collect()
}

/// Tooth rows of a chart, upper jaw first, each jaw left slot then right slot.
#[uniffi::export]
pub fn chart_layout(dentition_type: String) -> Result<Vec<FfiToothRow>, ClaudentError> {
    let dentition = parse_dentition(&dentition_type)?;
    let layout = ChartLayout::for_dentition(dentition);
    let mut rows = Vec::new();
    for (jaw, slots) in [("upper", &layout.upper), ("lower", &layout.lower)] {
        for slot in slots.iter() {
            for row in &slot.rows {
                rows.push(FfiToothRow {
                    jaw: jaw.to_string(),
                    side: match slot.side {
                        odontogram::Side::Left => "left".to_string(),
                        odontogram::Side::Right => "right".to_string(),
                    },
                    quadrant: row.quadrant,
                    teeth: row.teeth.iter().map(ToothNumber::get).collect(),
                    scaled: row.scaled,
                });
            }
        }
    }
    Ok(rows)
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe application context for FFI.
///
/// Identity is held by an in-process provider: hosts either sign in through
/// the core or push their own identity with `set_identity`, and poll
/// `take_forced_sign_out` after realtime revocations.
#[derive(uniffi::Object)]
pub struct ClaudentCore {
    context: AppContext,
    identity: Arc<LocalIdentityProvider>,
    editors: Mutex<HashMap<String, OdontogramEditor>>,
}

impl ClaudentCore {
    fn open(config: CoreConfig, hints: FfiClientHints) -> Result<Arc<Self>, ClaudentError> {
        let identity = Arc::new(LocalIdentityProvider::new());
        let context = AppContext::open(config, identity.clone(), ClientHints::from(hints).detect())?;
        Ok(Arc::new(Self::with_context(context, identity)))
    }

    fn with_context(context: AppContext, identity: Arc<LocalIdentityProvider>) -> Self {
        Self {
            context,
            identity,
            editors: Mutex::new(HashMap::new()),
        }
    }

    fn clinic(&self) -> Result<Clinic, ClaudentError> {
        self.context
            .clinic()
            .ok_or_else(|| ClaudentError::SessionError("Not signed in".into()))
    }

    fn with_editor<T>(
        &self,
        odontogram_id: &str,
        f: impl FnOnce(&mut OdontogramEditor) -> Result<T, ClaudentError>,
    ) -> Result<T, ClaudentError> {
        let mut editors = self.editors.lock()?;
        let editor = editors
            .get_mut(odontogram_id)
            .ok_or_else(|| ClaudentError::NotFound(format!("open odontogram {}", odontogram_id)))?;
        f(editor)
    }
}

#[uniffi::export]
impl ClaudentCore {
    // =========================================================================
    // Identity & Session Operations
    // =========================================================================

    /// Register a local account.
    pub fn register_account(&self, email: String, password: String) -> FfiIdentity {
        self.identity.register(&email, &password).into()
    }

    /// Sign in and start this device's session.
    pub fn sign_in(&self, email: String, password: String) -> Result<FfiIdentity, ClaudentError> {
        Ok(self.context.sign_in(&email, &password)?.into())
    }

    /// Report the host's current identity, or `None` after a sign-out.
    ///
    /// A revoked or logged-out session stays closed; use
    /// `sign_in_with_identity` to start a new one.
    pub fn set_identity(&self, identity: Option<FfiIdentity>) -> Result<(), ClaudentError> {
        self.identity
            .set_current(identity.map(|i| Identity::new(i.uid, i.email)));
        self.context.sync_identity()?;
        Ok(())
    }

    /// Start a session for an identity the host signed in explicitly.
    ///
    /// Unlike `set_identity`, this also re-registers a revoked device.
    pub fn sign_in_with_identity(&self, identity: FfiIdentity) -> Result<(), ClaudentError> {
        let identity = Identity::new(identity.uid, identity.email);
        self.identity.set_current(Some(identity.clone()));
        self.identity.take_sign_out_request();
        self.context.start_session(identity)?;
        Ok(())
    }

    /// Close this device's session and sign out.
    pub fn logout(&self) -> Result<(), ClaudentError> {
        self.editors.lock()?.clear();
        self.context.logout()?;
        Ok(())
    }

    pub fn request_password_reset(&self, email: String) -> Result<(), ClaudentError> {
        self.context.request_password_reset(&email)?;
        Ok(())
    }

    /// True once after another device revoked this session.
    pub fn take_forced_sign_out(&self) -> Result<bool, ClaudentError> {
        let forced = self.identity.take_sign_out_request();
        if forced {
            self.editors.lock()?.clear();
            self.context.sync_identity()?;
        }
        Ok(forced)
    }

    /// Current session state ("active(sess_…)", "revoked", ...).
    pub fn session_state(&self) -> String {
        self.context.sessions().state().to_string()
    }

    pub fn list_sessions(&self) -> Vec<FfiDeviceSession> {
        self.context
            .sessions()
            .sessions()
            .into_iter()
            .map(FfiDeviceSession::from)
            .collect()
    }

    pub fn refresh_session(&self) -> Result<(), ClaudentError> {
        self.context.sessions().refresh()?;
        Ok(())
    }

    pub fn revoke_session(&self, session_id: String) -> Result<(), ClaudentError> {
        self.context.sessions().revoke_session(&session_id)?;
        Ok(())
    }

    /// Returns how many sessions were closed.
    pub fn close_all_other_sessions(&self) -> Result<u32, ClaudentError> {
        Ok(self.context.sessions().close_all_other_sessions()? as u32)
    }

    pub fn drain_notices(&self) -> Vec<FfiNotice> {
        self.context
            .notices()
            .drain()
            .into_iter()
            .map(FfiNotice::from)
            .collect()
    }

    // =========================================================================
    // Patient Operations
    // =========================================================================

    pub fn create_patient(
        &self,
        first_names: String,
        last_names: String,
        birth_date: String,
        sex: String,
    ) -> Result<FfiPatient, ClaudentError> {
        let sex = match sex.as_str() {
            "M" => Sex::Male,
            "F" => Sex::Female,
            "X" => Sex::Unspecified,
            other => return Err(ClaudentError::InvalidInput(format!("Unknown sex {}", other))),
        };
        let mut patient = Patient::new(first_names, last_names, birth_date, sex);
        patient.id = self.clinic()?.create_patient(&patient)?;
        Ok(patient.into())
    }

    pub fn get_patient(&self, patient_id: String) -> Result<Option<FfiPatient>, ClaudentError> {
        Ok(self.clinic()?.get_patient(&patient_id)?.map(|p| p.into()))
    }

    pub fn search_patients(&self, query: String) -> Result<Vec<FfiPatient>, ClaudentError> {
        let patients = self.clinic()?.search_patients(&query)?;
        Ok(patients.into_iter().map(|p| p.into()).collect())
    }

    pub fn delete_patient(&self, patient_id: String) -> Result<(), ClaudentError> {
        self.clinic()?.delete_patient(&patient_id)?;
        Ok(())
    }

    /// Save the initial clinical history; each section body is a JSON object.
    pub fn save_initial_history(
        &self,
        patient_id: String,
        sections: Vec<FfiHistorySection>,
    ) -> Result<(), ClaudentError> {
        let mut history = InitialHistory::new();
        for entry in sections {
            let section = HistorySection::from_doc_id(&entry.section).ok_or_else(|| {
                ClaudentError::InvalidInput(format!("Unknown history section {}", entry.section))
            })?;
            let fields = match serde_json::from_str(&entry.fields_json) {
                Ok(serde_json::Value::Object(fields)) => fields,
                _ => {
                    return Err(ClaudentError::InvalidInput(format!(
                        "Section {} is not a JSON object",
                        entry.section
                    )))
                }
            };
            history.set_section(section, fields);
        }
        self.clinic()?.save_initial_history(&patient_id, history)?;
        Ok(())
    }

    pub fn initial_history(&self, patient_id: String) -> Result<Vec<FfiHistorySection>, ClaudentError> {
        let Some(history) = self.clinic()?.initial_history(&patient_id)? else {
            return Ok(Vec::new());
        };
        Ok(history
            .into_sections()
            .into_iter()
            .map(|(section, fields)| FfiHistorySection {
                section: section.doc_id().to_string(),
                fields_json: serde_json::Value::Object(fields).to_string(),
            })
            .collect())
    }

    // =========================================================================
    // Odontogram Operations
    // =========================================================================

    pub fn create_odontogram(
        &self,
        patient_id: String,
        dentition_type: String,
        name: Option<String>,
    ) -> Result<FfiOdontogram, ClaudentError> {
        let dentition = parse_dentition(&dentition_type)?;
        let odontogram = self
            .clinic()?
            .create_odontogram(&patient_id, dentition, name.as_deref())?;
        Ok(odontogram.into())
    }

    /// A patient's odontograms, newest first.
    pub fn list_odontograms(&self, patient_id: String) -> Result<Vec<FfiOdontogram>, ClaudentError> {
        let odontograms = self.clinic()?.list_odontograms(&patient_id)?;
        Ok(odontograms.into_iter().map(|o| o.into()).collect())
    }

    pub fn rename_odontogram(
        &self,
        patient_id: String,
        odontogram_id: String,
        name: String,
    ) -> Result<(), ClaudentError> {
        self.clinic()?
            .rename_odontogram(&patient_id, &odontogram_id, &name)?;
        Ok(())
    }

    pub fn delete_odontogram(&self, patient_id: String, odontogram_id: String) -> Result<(), ClaudentError> {
        self.clinic()?.delete_odontogram(&patient_id, &odontogram_id)?;
        self.editors.lock()?.remove(&odontogram_id);
        Ok(())
    }

    /// Load an odontogram into an editor kept until `close_odontogram`.
    pub fn open_odontogram(
        &self,
        patient_id: String,
        odontogram_id: String,
    ) -> Result<FfiEditorState, ClaudentError> {
        let editor = self.clinic()?.open_odontogram(&patient_id, &odontogram_id)?;
        let state = FfiEditorState::from(&editor);
        self.editors.lock()?.insert(odontogram_id, editor);
        Ok(state)
    }

    pub fn close_odontogram(&self, odontogram_id: String) -> Result<(), ClaudentError> {
        self.editors.lock()?.remove(&odontogram_id);
        Ok(())
    }

    /// Apply a tool (a condition code or `ERASER`) to a tooth.
    ///
    /// Returns true when the editor now waits for free text.
    pub fn apply_tool(&self, odontogram_id: String, tool: String, tooth: u8) -> Result<bool, ClaudentError> {
        let tool = parse_tool(&tool)?;
        let tooth = parse_tooth(tooth)?;
        self.with_editor(&odontogram_id, |editor| {
            editor.select_tool(tool);
            let outcome = editor.apply_tool_to_tooth(tooth)?;
            Ok(matches!(outcome, ToolOutcome::AwaitingFreeText(_)))
        })
    }

    pub fn confirm_free_text(&self, odontogram_id: String, text: String) -> Result<(), ClaudentError> {
        self.with_editor(&odontogram_id, |editor| Ok(editor.confirm_free_text(&text)?))
    }

    pub fn cancel_free_text(&self, odontogram_id: String) -> Result<(), ClaudentError> {
        self.with_editor(&odontogram_id, |editor| {
            editor.cancel_free_text();
            Ok(())
        })
    }

    pub fn set_general_notes(&self, odontogram_id: String, notes: String) -> Result<(), ClaudentError> {
        self.with_editor(&odontogram_id, |editor| {
            editor.set_general_notes(notes);
            Ok(())
        })
    }

    pub fn set_surface(
        &self,
        odontogram_id: String,
        tooth: u8,
        surface: String,
        note: String,
    ) -> Result<(), ClaudentError> {
        let tooth = parse_tooth(tooth)?;
        let surface = SurfaceName::parse(&surface)
            .ok_or_else(|| ClaudentError::InvalidInput(format!("Unknown surface {}", surface)))?;
        self.with_editor(&odontogram_id, |editor| {
            editor.set_surface(tooth, surface, &note);
            Ok(())
        })
    }

    pub fn editor_state(&self, odontogram_id: String) -> Result<FfiEditorState, ClaudentError> {
        self.with_editor(&odontogram_id, |editor| Ok(FfiEditorState::from(&*editor)))
    }

    pub fn findings(&self, odontogram_id: String) -> Result<Vec<FfiFinding>, ClaudentError> {
        self.with_editor(&odontogram_id, |editor| {
            Ok(editor
                .compute_findings_summary()
                .into_iter()
                .map(FfiFinding::from)
                .collect())
        })
    }

    /// Save the working copy. On failure the working copy is kept.
    pub fn save_odontogram(&self, odontogram_id: String) -> Result<(), ClaudentError> {
        let clinic = self.clinic()?;
        let result = self.with_editor(&odontogram_id, |editor| Ok(clinic.save_odontogram(editor)?));
        self.context.notices().push(Notice::from_result(
            &result,
            "Odontogram saved",
            "Could not save the odontogram",
        ));
        result
    }

    // =========================================================================
    // Audit Operations
    // =========================================================================

    /// One page of the audit log, filtered case-insensitively.
    pub fn audit_page(&self, filter: String, page: u32) -> Result<FfiAuditPage, ClaudentError> {
        let page = self.context.audit().page(&filter, page as usize)?;
        Ok(page.into())
    }
}

fn parse_dentition(value: &str) -> Result<DentitionType, ClaudentError> {
    DentitionType::parse(value)
        .ok_or_else(|| ClaudentError::InvalidInput(format!("Unknown dentition type {}", value)))
}

fn parse_tool(value: &str) -> Result<Tool, ClaudentError> {
    if value.eq_ignore_ascii_case("eraser") {
        return Ok(Tool::Eraser);
    }
    ConditionCode::from_code(value)
        .map(Tool::Condition)
        .ok_or_else(|| ClaudentError::InvalidInput(format!("Unknown tool {}", value)))
}

fn parse_tooth(number: u8) -> Result<ToothNumber, ClaudentError> {
    ToothNumber::new(number).map_err(|e| ClaudentError::InvalidInput(e.to_string()))
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe client hint brand.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiBrand {
    pub brand: String,
    pub version: String,
}

/// FFI-safe client hints.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiClientHints {
    pub user_agent: String,
    pub brands: Vec<FfiBrand>,
    pub platform: String,
    pub mobile: Option<bool>,
    pub max_touch_points: u32,
    pub screen_width: u32,
    pub screen_height: u32,
}

impl From<FfiClientHints> for ClientHints {
    fn from(hints: FfiClientHints) -> Self {
        ClientHints {
            user_agent: hints.user_agent,
            brands: hints
                .brands
                .into_iter()
                .map(|b| BrandVersion::new(b.brand, b.version))
                .collect(),
            platform: hints.platform,
            mobile: hints.mobile,
            max_touch_points: hints.max_touch_points,
            screen_width: hints.screen_width,
            screen_height: hints.screen_height,
        }
    }
}

/// FFI-safe identity.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiIdentity {
    pub uid: String,
    pub email: String,
}

impl From<Identity> for FfiIdentity {
    fn from(identity: Identity) -> Self {
        Self {
            uid: identity.uid,
            email: identity.email,
        }
    }
}

/// FFI-safe device session.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDeviceSession {
    pub id: String,
    pub headline: String,
    pub device_type: String,
    pub device_label: String,
    pub browser: String,
    pub browser_version: String,
    pub os: String,
    pub platform: String,
    pub last_active_at: Option<String>,
    pub is_current: bool,
}

impl From<DeviceSession> for FfiDeviceSession {
    fn from(session: DeviceSession) -> Self {
        Self {
            headline: session.headline(),
            id: session.id,
            device_type: session.device.device_type,
            device_label: session.device.device_label,
            browser: session.device.browser,
            browser_version: session.device.browser_version,
            os: session.device.os,
            platform: session.device.platform,
            last_active_at: session.last_active_at,
            is_current: session.is_current,
        }
    }
}

/// FFI-safe notice.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNotice {
    pub is_error: bool,
    pub message: String,
}

impl From<Notice> for FfiNotice {
    fn from(notice: Notice) -> Self {
        Self {
            is_error: notice.is_error(),
            message: notice.message,
        }
    }
}

/// FFI-safe patient.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatient {
    pub id: String,
    pub full_name: String,
    pub birth_date: String,
    pub phone: String,
    pub email: String,
    pub active: bool,
    pub has_history: bool,
}

impl From<Patient> for FfiPatient {
    fn from(patient: Patient) -> Self {
        Self {
            full_name: patient.full_name(),
            id: patient.id,
            birth_date: patient.birth_date,
            phone: patient.phone,
            email: patient.email,
            active: patient.status == models::RecordStatus::Active,
            has_history: patient.has_history,
        }
    }
}

/// FFI-safe condition catalog entry.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCondition {
    pub code: String,
    pub label: String,
    /// Rank used when a tooth carries several conditions (0 = highest)
    pub display_priority: u32,
}

impl From<ConditionCode> for FfiCondition {
    fn from(code: ConditionCode) -> Self {
        Self {
            code: code.code().to_string(),
            label: code.label().to_string(),
            display_priority: code.display_priority() as u32,
        }
    }
}

/// FFI-safe chart row.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiToothRow {
    pub jaw: String,
    pub side: String,
    pub quadrant: u8,
    pub teeth: Vec<u8>,
    pub scaled: bool,
}

/// FFI-safe odontogram summary.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiOdontogram {
    pub id: String,
    pub name: String,
    pub created_at: String,
    pub dentition_type: String,
    pub general_notes: String,
    pub recorded_teeth: u32,
}

impl From<Odontogram> for FfiOdontogram {
    fn from(odontogram: Odontogram) -> Self {
        Self {
            name: odontogram.display_name(),
            recorded_teeth: odontogram.teeth.len() as u32,
            id: odontogram.id,
            created_at: odontogram.created_at,
            dentition_type: odontogram.dentition_type.as_str().to_string(),
            general_notes: odontogram.general_notes,
        }
    }
}

/// FFI-safe clinical history section.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiHistorySection {
    /// Section ID ("allergies", "vitalSigns", ...)
    pub section: String,
    /// Form fields as a JSON object
    pub fields_json: String,
}

/// FFI-safe tooth state.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiToothState {
    pub tooth: u8,
    pub conditions: Vec<String>,
    /// Condition that colours the tooth
    pub dominant: String,
    pub free_text: Option<String>,
    /// Surface notes keyed by stored surface name
    pub surfaces: HashMap<String, String>,
}

/// FFI-safe editor state.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiEditorState {
    pub odontogram_id: String,
    pub patient_id: String,
    pub dentition_type: String,
    pub teeth: Vec<FfiToothState>,
    pub general_notes: String,
    pub selected_tooth: Option<u8>,
    pub pending_free_text: Option<u8>,
    pub saving: bool,
}

impl From<&OdontogramEditor> for FfiEditorState {
    fn from(editor: &OdontogramEditor) -> Self {
        Self {
            odontogram_id: editor.odontogram().id.clone(),
            patient_id: editor.patient_id().to_string(),
            dentition_type: editor.odontogram().dentition_type.as_str().to_string(),
            teeth: editor
                .teeth()
                .iter()
                .map(|(tooth, state)| FfiToothState {
                    tooth: tooth.get(),
                    conditions: state.conditions.iter().map(|c| c.code().to_string()).collect(),
                    dominant: state.dominant_condition().code().to_string(),
                    free_text: state.free_text.clone(),
                    surfaces: state
                        .surfaces
                        .iter()
                        .map(|(surface, note)| (surface.as_str().to_string(), note.clone()))
                        .collect(),
                })
                .collect(),
            general_notes: editor.general_notes().to_string(),
            selected_tooth: editor.selected_tooth().map(|t| t.get()),
            pending_free_text: editor.pending_free_text().map(|t| t.get()),
            saving: editor.is_saving(),
        }
    }
}

/// FFI-safe finding.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiFinding {
    pub tooth: u8,
    pub text: String,
}

impl From<Finding> for FfiFinding {
    fn from(finding: Finding) -> Self {
        Self {
            tooth: finding.tooth.get(),
            text: finding.text,
        }
    }
}

/// FFI-safe audit entry.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAuditEntry {
    pub user_email: String,
    pub action: String,
    pub module: String,
    pub detail: String,
    pub timestamp: Option<String>,
}

/// FFI-safe audit page.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAuditPage {
    pub entries: Vec<FfiAuditEntry>,
    pub page: u32,
    pub total_pages: u32,
    pub total: u32,
    pub range_text: String,
}

impl From<AuditPage> for FfiAuditPage {
    fn from(page: AuditPage) -> Self {
        Self {
            range_text: page.range_text(),
            page: page.page as u32,
            total_pages: page.total_pages as u32,
            total: page.total as u32,
            entries: page
                .entries
                .into_iter()
                .map(|e| FfiAuditEntry {
                    user_email: e.user_email,
                    action: e.action.as_str().to_string(),
                    module: e.module,
                    detail: e.detail,
                    timestamp: e.timestamp,
                })
                .collect(),
        }
    }
}
