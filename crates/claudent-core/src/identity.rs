//! Identity provider seam and sign-in helpers.
//!
//! The hosted identity service is reached through [`IdentityProvider`]. Its
//! failures carry provider error codes which are mapped onto a fixed set of
//! user-facing [`AuthErrorKind`]s.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use thiserror::Error;

/// An authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    pub uid: String,
    pub email: String,
}

impl Identity {
    pub fn new(uid: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: email.into(),
        }
    }
}

/// A failure reported by the identity provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct ProviderError {
    /// Provider error code, e.g. `auth/wrong-password`
    pub code: String,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Hosted identity service.
pub trait IdentityProvider: Send + Sync {
    fn current_identity(&self) -> Option<Identity>;

    fn sign_in(&self, email: &str, password: &str) -> Result<Identity, ProviderError>;

    fn send_password_reset(&self, email: &str) -> Result<(), ProviderError>;

    fn sign_out(&self) -> Result<(), ProviderError>;
}

/// User-facing classification of an authentication failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    BadCredentials,
    MalformedEmail,
    RateLimited,
    UnknownAccount,
    Unknown,
}

impl AuthErrorKind {
    /// Map a sign-in failure code.
    pub fn from_sign_in_code(code: &str) -> Self {
        match code {
            "auth/user-not-found" | "auth/wrong-password" | "auth/invalid-credential" => {
                AuthErrorKind::BadCredentials
            }
            "auth/invalid-email" => AuthErrorKind::MalformedEmail,
            "auth/too-many-requests" => AuthErrorKind::RateLimited,
            _ => AuthErrorKind::Unknown,
        }
    }

    /// Map a password-reset failure code.
    pub fn from_reset_code(code: &str) -> Self {
        match code {
            "auth/user-not-found" => AuthErrorKind::UnknownAccount,
            "auth/invalid-email" => AuthErrorKind::MalformedEmail,
            _ => AuthErrorKind::Unknown,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            AuthErrorKind::BadCredentials => "Incorrect email or password",
            AuthErrorKind::MalformedEmail => "The email address is not valid",
            AuthErrorKind::RateLimited => "Too many failed attempts. Try again later",
            AuthErrorKind::UnknownAccount => "No account exists with this email",
            AuthErrorKind::Unknown => "Could not complete the request. Try again",
        }
    }
}

/// Authentication errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Enter your email and password")]
    MissingCredentials,

    #[error("Enter your email address")]
    MissingEmail,

    #[error("{}", .kind.message())]
    Rejected { code: String, kind: AuthErrorKind },

    #[error("Sign-out failed: {0}")]
    SignOut(String),
}

impl AuthError {
    pub fn kind(&self) -> Option<AuthErrorKind> {
        match self {
            AuthError::Rejected { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Sign in after checking that neither field is blank.
pub fn sign_in(provider: &dyn IdentityProvider, email: &str, password: &str) -> AuthResult<Identity> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(AuthError::MissingCredentials);
    }
    provider.sign_in(email, password).map_err(|e| {
        tracing::info!(code = %e.code, "sign-in rejected");
        AuthError::Rejected {
            kind: AuthErrorKind::from_sign_in_code(&e.code),
            code: e.code,
        }
    })
}

/// Ask the provider to email a password-reset link.
pub fn request_password_reset(provider: &dyn IdentityProvider, email: &str) -> AuthResult<()> {
    let email = email.trim();
    if email.is_empty() {
        return Err(AuthError::MissingEmail);
    }
    provider.send_password_reset(email).map_err(|e| AuthError::Rejected {
        kind: AuthErrorKind::from_reset_code(&e.code),
        code: e.code,
    })
}

#[derive(Debug, Default)]
struct LocalState {
    accounts: HashMap<String, (Identity, String)>,
    current: Option<Identity>,
    resets_sent: Vec<String>,
    sign_out_requested: bool,
}

/// In-process identity provider.
///
/// Holds registered accounts and the signed-in identity. Hosts that
/// authenticate on their own side push the result with [`set_current`] and
/// poll [`take_sign_out_request`] to learn about forced sign-outs.
///
/// [`set_current`]: LocalIdentityProvider::set_current
/// [`take_sign_out_request`]: LocalIdentityProvider::take_sign_out_request
#[derive(Debug, Default)]
pub struct LocalIdentityProvider {
    state: Mutex<LocalState>,
}

impl LocalIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, LocalState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register an account; the uid is derived from a fresh UUID.
    pub fn register(&self, email: &str, password: &str) -> Identity {
        let identity = Identity::new(uuid::Uuid::new_v4().simple().to_string(), email);
        self.state()
            .accounts
            .insert(email.to_lowercase(), (identity.clone(), password.to_string()));
        identity
    }

    pub fn set_current(&self, identity: Option<Identity>) {
        self.state().current = identity;
    }

    /// True once after the core asked the provider to sign out.
    pub fn take_sign_out_request(&self) -> bool {
        std::mem::take(&mut self.state().sign_out_requested)
    }

    /// Addresses a reset link was sent to.
    pub fn resets_sent(&self) -> Vec<String> {
        self.state().resets_sent.clone()
    }
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((user, domain)) => !user.is_empty() && domain.contains('.'),
        None => false,
    }
}

impl IdentityProvider for LocalIdentityProvider {
    fn current_identity(&self) -> Option<Identity> {
        self.state().current.clone()
    }

    fn sign_in(&self, email: &str, password: &str) -> Result<Identity, ProviderError> {
        if !looks_like_email(email) {
            return Err(ProviderError::new("auth/invalid-email", "badly formatted email"));
        }
        let mut state = self.state();
        let identity = match state.accounts.get(&email.to_lowercase()) {
            Some((identity, stored)) if stored == password => identity.clone(),
            Some(_) => return Err(ProviderError::new("auth/wrong-password", "wrong password")),
            None => return Err(ProviderError::new("auth/user-not-found", "no such user")),
        };
        state.current = Some(identity.clone());
        state.sign_out_requested = false;
        Ok(identity)
    }

    fn send_password_reset(&self, email: &str) -> Result<(), ProviderError> {
        if !looks_like_email(email) {
            return Err(ProviderError::new("auth/invalid-email", "badly formatted email"));
        }
        let mut state = self.state();
        if !state.accounts.contains_key(&email.to_lowercase()) {
            return Err(ProviderError::new("auth/user-not-found", "no such user"));
        }
        state.resets_sent.push(email.to_string());
        Ok(())
    }

    fn sign_out(&self) -> Result<(), ProviderError> {
        let mut state = self.state();
        state.current = None;
        state.sign_out_requested = true;
        Ok(())
    }
}
