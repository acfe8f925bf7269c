//! Audit log models.

use serde::{Deserialize, Serialize};

/// Kind of action recorded in the audit log.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Login,
    Logout,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "CREATE",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
            AuditAction::Login => "LOGIN",
            AuditAction::Logout => "LOGOUT",
        }
    }
}

/// One append-only audit entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    #[serde(skip)]
    pub id: String,
    /// Email of the acting user
    pub user_email: String,
    pub action: AuditAction,
    /// Functional area ("patients", "odontograms", ...)
    pub module: String,
    /// Free-form description
    pub detail: String,
    /// Store-assigned timestamp
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl AuditEntry {
    /// Case-insensitive match against detail, email, module and action.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.detail.to_lowercase().contains(&term)
            || self.user_email.to_lowercase().contains(&term)
            || self.module.to_lowercase().contains(&term)
            || self.action.as_str().to_lowercase().contains(&term)
    }
}
