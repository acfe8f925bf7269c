//! Application context.
//!
//! Owns the collaborators every screen needs and wires identity changes into
//! the session registry: a new identity initialises a session and a clinic
//! handle, a cleared or switched identity tears the previous ones down.

use std::sync::{Arc, Mutex, PoisonError};

use crate::audit::AuditLog;
use crate::clinic::Clinic;
use crate::config::CoreConfig;
use crate::identity::{self, AuthResult, Identity, IdentityProvider};
use crate::models::{AuditAction, DeviceInfo};
use crate::notice::{Notice, NoticeQueue};
use crate::session::{
    FileSessionIdStore, SessionError, SessionIdStore, SessionRegistry, SessionResult,
};
use crate::store::{Database, DocumentStore, StoreResult};

const AUTH_MODULE: &str = "auth";

/// Explicit replacement for process-wide app state.
pub struct AppContext {
    config: CoreConfig,
    store: Arc<dyn DocumentStore>,
    identity_provider: Arc<dyn IdentityProvider>,
    sessions: SessionRegistry,
    audit: AuditLog,
    notices: NoticeQueue,
    clinic: Mutex<Option<Clinic>>,
}

impl AppContext {
    pub fn new(
        config: CoreConfig,
        store: Arc<dyn DocumentStore>,
        identity_provider: Arc<dyn IdentityProvider>,
        session_ids: Arc<dyn SessionIdStore>,
        device: DeviceInfo,
    ) -> Self {
        let notices = NoticeQueue::new();
        let audit = AuditLog::new(store.clone(), config.audit_page_size());
        let sessions = SessionRegistry::new(
            store.clone(),
            identity_provider.clone(),
            session_ids,
            device,
            notices.clone(),
        );
        Self {
            config,
            store,
            identity_provider,
            sessions,
            audit,
            notices,
            clinic: Mutex::new(None),
        }
    }

    /// Open the SQLite store and session-id file named by the configuration.
    pub fn open(
        config: CoreConfig,
        identity_provider: Arc<dyn IdentityProvider>,
        device: DeviceInfo,
    ) -> StoreResult<Self> {
        let store = Arc::new(Database::open(config.db_path())?);
        let session_ids = Arc::new(FileSessionIdStore::new(config.session_id_path()));
        tracing::info!(db = %config.db_path().display(), "opened application context");
        Ok(Self::new(config, store, identity_provider, session_ids, device))
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    pub fn notices(&self) -> &NoticeQueue {
        &self.notices
    }

    /// Clinic handle for the signed-in user; `None` unless the session is active.
    pub fn clinic(&self) -> Option<Clinic> {
        if !self.sessions.state().is_active() {
            return None;
        }
        self.clinic
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Initialise on sign-in, tear down on sign-out or identity switch.
    pub fn on_identity_changed(&self, identity: Option<Identity>) -> SessionResult<()> {
        let clinic = identity
            .as_ref()
            .map(|i| Clinic::new(self.store.clone(), self.audit.clone(), i.email.clone()));
        *self.clinic.lock().unwrap_or_else(PoisonError::into_inner) = None;

        self.sessions.handle_identity_change(identity)?;

        if self.sessions.state().is_active() {
            *self.clinic.lock().unwrap_or_else(PoisonError::into_inner) = clinic;
        }
        Ok(())
    }

    /// Follow the provider's current identity if it differs from ours.
    ///
    /// Hosts call this after any provider event, including forced sign-outs.
    /// A revoked or logged-out session never comes back from here: if the
    /// provider still reports an identity the sign-out is retried instead.
    pub fn sync_identity(&self) -> SessionResult<()> {
        let current = self.identity_provider.current_identity();
        let state = self.sessions.state();

        if state.is_terminal() {
            if current.is_some() {
                tracing::warn!(%state, "provider still signed in after the session ended");
                self.identity_provider
                    .sign_out()
                    .map_err(|e| SessionError::SignOut(e.to_string()))?;
            }
            if self.sessions.identity().is_some() {
                return self.on_identity_changed(None);
            }
            return Ok(());
        }

        if current == self.sessions.identity() && (current.is_none() || state.is_active()) {
            return Ok(());
        }
        self.on_identity_changed(current)
    }

    /// Sign in, audit the login and start the device session.
    pub fn sign_in(&self, email: &str, password: &str) -> AuthResult<Identity> {
        let identity = identity::sign_in(self.identity_provider.as_ref(), email, password)?;
        if let Err(e) = self.start_session(identity.clone()) {
            tracing::warn!(error = %e, "session setup failed after sign-in");
        }
        Ok(identity)
    }

    /// Explicit sign-in of an identity the host authenticated: audit the
    /// login and register this device, even after a revocation.
    pub fn start_session(&self, identity: Identity) -> SessionResult<()> {
        if let Err(e) = self
            .audit
            .record(&identity.email, AuditAction::Login, AUTH_MODULE, "Signed in")
        {
            tracing::warn!(error = %e, "failed to audit login");
        }
        self.on_identity_changed(Some(identity))
    }

    /// Audit the logout, close this device's session and tear down.
    pub fn logout(&self) -> SessionResult<()> {
        if let Some(identity) = self.sessions.identity() {
            if let Err(e) = self
                .audit
                .record(&identity.email, AuditAction::Logout, AUTH_MODULE, "Signed out")
            {
                tracing::warn!(error = %e, "failed to audit logout");
            }
        }
        let result = self.sessions.logout();
        self.on_identity_changed(None)?;
        result
    }

    pub fn request_password_reset(&self, email: &str) -> AuthResult<()> {
        let result = identity::request_password_reset(self.identity_provider.as_ref(), email);
        self.notices.push(Notice::from_result(
            &result,
            "Password reset email sent",
            "Could not send the reset email",
        ));
        result
    }

    /// Drop every subscription and the clinic handle.
    pub fn teardown(&self) -> SessionResult<()> {
        self.on_identity_changed(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{LocalIdentityProvider, ProviderError};
    use crate::models::{Patient, Sex};
    use crate::session::{ClientHints, MemorySessionIdStore, SessionState};
    use crate::store::CollectionPath;

    fn make_context(
        db: Arc<Database>,
        provider: Arc<dyn IdentityProvider>,
        session_id: &str,
    ) -> AppContext {
        let config = CoreConfig::new("unused.db".into(), "unused_sid".into(), 10).unwrap();
        AppContext::new(
            config,
            db,
            provider,
            Arc::new(MemorySessionIdStore::with_id(session_id)),
            ClientHints::from_user_agent("Mozilla/5.0 (X11; Linux x86_64) Firefox/125.0").detect(),
        )
    }

    fn context() -> (AppContext, Arc<LocalIdentityProvider>, Arc<Database>) {
        let provider = Arc::new(LocalIdentityProvider::new());
        let db = Arc::new(Database::open_in_memory().unwrap());
        let ctx = make_context(db.clone(), provider.clone(), "sess_ctx");
        (ctx, provider, db)
    }

    fn make_signed_in(db: &Arc<Database>, session_id: &str) -> (AppContext, Arc<LocalIdentityProvider>) {
        let provider = Arc::new(LocalIdentityProvider::new());
        provider.set_current(Some(doctor()));
        let ctx = make_context(db.clone(), provider.clone(), session_id);
        ctx.sync_identity().unwrap();
        assert!(ctx.sessions().state().is_active());
        (ctx, provider)
    }

    fn doctor() -> Identity {
        Identity::new("uid-1", "dr@clinic.com")
    }

    fn session_exists(db: &Database, session_id: &str) -> bool {
        db.get(&CollectionPath::sessions("uid-1").doc(session_id))
            .unwrap()
            .is_some()
    }

    /// Reports a signed-in identity and refuses to sign out.
    struct StuckProvider;

    impl IdentityProvider for StuckProvider {
        fn current_identity(&self) -> Option<Identity> {
            Some(doctor())
        }

        fn sign_in(&self, _email: &str, _password: &str) -> Result<Identity, ProviderError> {
            Ok(doctor())
        }

        fn send_password_reset(&self, _email: &str) -> Result<(), ProviderError> {
            Ok(())
        }

        fn sign_out(&self) -> Result<(), ProviderError> {
            Err(ProviderError::new("auth/network-request-failed", "offline"))
        }
    }

    #[test]
    fn test_sign_in_and_logout_are_audited() {
        let (ctx, provider, db) = context();
        provider.register("dr@clinic.com", "secret");

        ctx.sign_in("dr@clinic.com", "secret").unwrap();
        assert!(ctx.sessions().state().is_active());
        assert_eq!(ctx.clinic().map(|c| c.actor().to_string()), Some("dr@clinic.com".into()));
        assert_eq!(db.listener_count(), 1);

        ctx.logout().unwrap();
        assert_eq!(ctx.sessions().state(), SessionState::LoggedOut);
        assert!(ctx.clinic().is_none());
        assert_eq!(db.listener_count(), 0);

        let actions: Vec<AuditAction> = ctx.audit().entries().unwrap().into_iter().map(|e| e.action).collect();
        assert_eq!(actions, vec![AuditAction::Logout, AuditAction::Login]);
    }

    #[test]
    fn test_failed_sign_in_leaves_context_idle() {
        let (ctx, provider, _db) = context();
        provider.register("dr@clinic.com", "secret");

        assert!(ctx.sign_in("dr@clinic.com", "wrong").is_err());
        assert_eq!(ctx.sessions().state(), SessionState::Unauthenticated);
        assert!(ctx.clinic().is_none());
        assert!(ctx.audit().entries().unwrap().is_empty());
    }

    #[test]
    fn test_sync_identity_follows_provider() {
        let (ctx, provider, _db) = context();
        provider.set_current(Some(Identity::new("u1", "dr@clinic.com")));
        ctx.sync_identity().unwrap();
        assert!(ctx.sessions().state().is_active());

        provider.set_current(None);
        ctx.sync_identity().unwrap();
        assert_eq!(ctx.sessions().state(), SessionState::Unauthenticated);
        assert!(ctx.clinic().is_none());
    }

    #[test]
    fn test_password_reset_notice() {
        let (ctx, provider, _db) = context();
        provider.register("dr@clinic.com", "secret");
        ctx.request_password_reset("dr@clinic.com").unwrap();
        let notices = ctx.notices().drain();
        assert_eq!(notices, vec![Notice::success("Password reset email sent")]);
    }

    #[test]
    fn test_revoked_context_loses_clinic_immediately() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let (a, _) = make_signed_in(&db, "sess_a");
        let (b, _) = make_signed_in(&db, "sess_b");
        assert!(b.clinic().is_some());

        a.sessions().revoke_session("sess_b").unwrap();

        assert_eq!(b.sessions().state(), SessionState::Revoked);
        assert!(b.clinic().is_none());
        assert!(a.clinic().is_some());
    }

    #[test]
    fn test_revoked_session_not_revived_by_provider() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let (a, _) = make_signed_in(&db, "sess_a");
        let (b, provider) = make_signed_in(&db, "sess_b");
        a.sessions().revoke_session("sess_b").unwrap();

        // Host reports the old identity before acknowledging the forced sign-out
        provider.set_current(Some(doctor()));
        b.sync_identity().unwrap();

        assert_eq!(b.sessions().state(), SessionState::Revoked);
        assert!(!session_exists(&db, "sess_b"));
        assert!(provider.current_identity().is_none());
        assert!(b.clinic().is_none());

        b.start_session(doctor()).unwrap();
        assert!(b.sessions().state().is_active());
        assert!(session_exists(&db, "sess_b"));
        assert!(b.clinic().is_some());
    }

    #[test]
    fn test_failed_forced_sign_out_stays_revoked() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let (a, _) = make_signed_in(&db, "sess_a");
        let b = make_context(db.clone(), Arc::new(StuckProvider), "sess_b");
        b.sync_identity().unwrap();
        assert!(b.sessions().state().is_active());

        a.sessions().revoke_session("sess_b").unwrap();
        assert_eq!(b.sessions().state(), SessionState::Revoked);

        assert!(matches!(b.sync_identity(), Err(SessionError::SignOut(_))));
        assert!(b.sync_identity().is_err());
        assert_eq!(b.sessions().state(), SessionState::Revoked);
        assert!(!session_exists(&db, "sess_b"));
        assert!(b.clinic().is_none());
    }

    #[test]
    fn test_clinic_mutations_need_active_session() {
        let (ctx, provider, _db) = context();
        provider.register("dr@clinic.com", "secret");
        ctx.sign_in("dr@clinic.com", "secret").unwrap();
        let clinic = ctx.clinic().unwrap();
        clinic
            .create_patient(&Patient::new("Ana".into(), "López".into(), "1990-06-15".into(), Sex::Female))
            .unwrap();

        ctx.logout().unwrap();
        assert!(ctx.clinic().is_none());
    }
}
