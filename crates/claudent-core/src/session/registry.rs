//! Session registry state machine.

use std::cmp::Ordering;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use super::{SessionError, SessionIdStore, SessionResult, SessionState};
use crate::identity::{Identity, IdentityProvider};
use crate::models::{DeviceInfo, DeviceSession};
use crate::notice::{Notice, NoticeQueue};
use crate::store::{
    server_timestamp, to_document, CollectionPath, DocumentStore, Listener, QuerySnapshot, SetMode,
    Subscription, WriteBatch,
};

/// Notice shown when another device closes this session.
pub const REVOKED_MESSAGE: &str = "This session was closed from another device";

#[derive(Default)]
struct Inner {
    state: SessionState,
    identity: Option<Identity>,
    /// Live records from the latest snapshot
    sessions: Vec<DeviceSession>,
    /// Set once revocation or logout has been handled for the current sign-in
    revocation_latched: bool,
    subscription: Option<Subscription>,
    /// Bumped on every identity change; stale listeners compare against it
    generation: u64,
}

struct Shared {
    store: Arc<dyn DocumentStore>,
    identity_provider: Arc<dyn IdentityProvider>,
    session_ids: Arc<dyn SessionIdStore>,
    device: DeviceInfo,
    notices: NoticeQueue,
    inner: Mutex<Inner>,
}

/// Tracks this installation's session record and every sibling record of the
/// signed-in identity.
///
/// Store calls are never made while the inner lock is held, because the
/// store delivers snapshots synchronously back into the registry.
#[derive(Clone)]
pub struct SessionRegistry {
    shared: Arc<Shared>,
}

impl SessionRegistry {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        identity_provider: Arc<dyn IdentityProvider>,
        session_ids: Arc<dyn SessionIdStore>,
        device: DeviceInfo,
        notices: NoticeQueue,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                store,
                identity_provider,
                session_ids,
                device,
                notices,
                inner: Mutex::new(Inner::default()),
            }),
        }
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.shared.lock()
    }

    pub fn state(&self) -> SessionState {
        self.inner().state.clone()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.inner().identity.clone()
    }

    pub fn current_session_id(&self) -> Option<String> {
        self.inner().state.session_id().map(str::to_string)
    }

    pub fn device(&self) -> &DeviceInfo {
        &self.shared.device
    }

    pub fn notices(&self) -> &NoticeQueue {
        &self.shared.notices
    }

    /// Whether a realtime subscription is open.
    pub fn is_watching(&self) -> bool {
        self.inner().subscription.is_some()
    }

    /// React to the identity provider reporting a new identity (or none).
    ///
    /// The previous subscription is closed before anything else happens.
    pub fn handle_identity_change(&self, identity: Option<Identity>) -> SessionResult<()> {
        let (previous, generation) = {
            let mut inner = self.inner();
            inner.generation += 1;
            let previous = inner.subscription.take();
            inner.sessions.clear();
            match &identity {
                Some(identity) => {
                    inner.identity = Some(identity.clone());
                    inner.revocation_latched = false;
                    inner.state = SessionState::Authenticating;
                }
                None => {
                    inner.identity = None;
                    if !inner.state.is_terminal() {
                        inner.state = SessionState::Unauthenticated;
                    }
                }
            }
            (previous, inner.generation)
        };
        drop(previous);

        let Some(identity) = identity else {
            tracing::info!("identity cleared");
            return Ok(());
        };
        tracing::info!(uid = %identity.uid, "authenticating session");

        let session_id = match self.register(&identity.uid) {
            Ok(id) => id,
            Err(e) => {
                self.shared
                    .notices
                    .push(Notice::error(format!("Could not register this device: {}", e)));
                let mut inner = self.inner();
                if inner.generation == generation {
                    inner.state = SessionState::Unauthenticated;
                }
                return Err(e);
            }
        };

        {
            let mut inner = self.inner();
            if inner.generation != generation {
                return Ok(());
            }
            inner.state = SessionState::Active {
                session_id: session_id.clone(),
            };
        }
        tracing::info!(session = %session_id, "session active");

        let weak = Arc::downgrade(&self.shared);
        let listener: Listener = Arc::new(move |snapshot: &QuerySnapshot| {
            Shared::on_snapshot(&weak, generation, snapshot);
        });
        let subscription = self
            .shared
            .store
            .subscribe(&CollectionPath::sessions(&identity.uid), listener)?;

        let mut inner = self.inner();
        if inner.generation == generation && inner.state.is_active() {
            inner.subscription = Some(subscription);
        }
        Ok(())
    }

    /// Re-stamp the own record (heartbeat or reconnection).
    pub fn refresh(&self) -> SessionResult<()> {
        let uid = {
            let inner = self.inner();
            if !inner.state.is_active() {
                return Err(SessionError::NotActive);
            }
            inner.identity.as_ref().map(|i| i.uid.clone()).ok_or(SessionError::NotActive)?
        };
        self.register(&uid)?;
        tracing::debug!("session refreshed");
        Ok(())
    }

    /// Feed a snapshot of the session collection from an external source.
    pub fn apply_snapshot(&self, snapshot: &QuerySnapshot) {
        let generation = self.inner().generation;
        Shared::on_snapshot(&Arc::downgrade(&self.shared), generation, snapshot);
    }

    /// Live sessions: this device first, then most recently active.
    pub fn sessions(&self) -> Vec<DeviceSession> {
        let inner = self.inner();
        let current = inner.state.session_id();
        let mut sessions: Vec<DeviceSession> = inner
            .sessions
            .iter()
            .cloned()
            .map(|mut session| {
                session.is_current = Some(session.id.as_str()) == current;
                session
            })
            .collect();
        sessions.sort_by(|a, b| match (a.is_current, b.is_current) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => b.last_active_at.cmp(&a.last_active_at),
        });
        sessions
    }

    /// Delete the own record, then sign out.
    pub fn logout(&self) -> SessionResult<()> {
        let (uid, session_id) = {
            let mut inner = self.inner();
            let session_id = inner
                .state
                .session_id()
                .map(str::to_string)
                .ok_or(SessionError::NotActive)?;
            let uid = inner
                .identity
                .as_ref()
                .map(|i| i.uid.clone())
                .ok_or(SessionError::NotActive)?;
            inner.revocation_latched = true;
            (uid, session_id)
        };
        tracing::info!(session = %session_id, "logging out");

        if let Err(e) = self
            .shared
            .store
            .delete(&CollectionPath::sessions(&uid).doc(&session_id))
        {
            tracing::warn!(error = %e, "failed to delete own session record");
            self.shared
                .notices
                .push(Notice::error(format!("Could not remove this session: {}", e)));
        }

        let subscription = {
            let mut inner = self.inner();
            inner.state = SessionState::LoggedOut;
            inner.sessions.clear();
            inner.subscription.take()
        };
        drop(subscription);

        self.shared
            .identity_provider
            .sign_out()
            .map_err(|e| SessionError::SignOut(e.to_string()))
    }

    /// Close another device's session. Closing one's own is a logout.
    pub fn revoke_session(&self, session_id: &str) -> SessionResult<()> {
        let (uid, own) = self.active_ids()?;
        if session_id == own {
            return self.logout();
        }
        let result = self
            .shared
            .store
            .delete(&CollectionPath::sessions(&uid).doc(session_id));
        self.shared
            .notices
            .push(Notice::from_result(&result, "Session closed", "Could not close the session"));
        result?;
        tracing::info!(session = %session_id, "revoked session");
        Ok(())
    }

    /// Delete every live record except the own one in one atomic batch.
    ///
    /// Returns how many records were deleted.
    pub fn close_all_other_sessions(&self) -> SessionResult<usize> {
        let (uid, own) = self.active_ids()?;
        let others: Vec<String> = self
            .inner()
            .sessions
            .iter()
            .filter(|s| s.id != own)
            .map(|s| s.id.clone())
            .collect();
        if others.is_empty() {
            return Ok(0);
        }

        let sessions = CollectionPath::sessions(&uid);
        let mut batch = WriteBatch::new();
        for id in &others {
            batch.delete(sessions.doc(id.as_str()));
        }
        let result = self.shared.store.commit(batch);
        self.shared.notices.push(Notice::from_result(
            &result,
            "Other sessions closed",
            "Could not close the other sessions",
        ));
        result?;
        tracing::info!(count = others.len(), "closed other sessions");
        Ok(others.len())
    }

    fn active_ids(&self) -> SessionResult<(String, String)> {
        let inner = self.inner();
        let own = inner.state.session_id().ok_or(SessionError::NotActive)?;
        let uid = inner.identity.as_ref().ok_or(SessionError::NotActive)?;
        Ok((uid.uid.clone(), own.to_string()))
    }

    /// Upsert the own record with fresh server timestamps.
    fn register(&self, uid: &str) -> SessionResult<String> {
        let session_id = self.shared.session_ids.get_or_create()?;
        let mut data = to_document(&self.shared.device)?;
        data.insert("lastActiveAt".into(), server_timestamp());
        data.insert("updatedAt".into(), server_timestamp());
        self.shared.store.set(
            &CollectionPath::sessions(uid).doc(session_id.as_str()),
            data,
            SetMode::Merge,
        )?;
        Ok(session_id)
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn on_snapshot(weak: &Weak<Shared>, generation: u64, snapshot: &QuerySnapshot) {
        let Some(shared) = weak.upgrade() else {
            return;
        };

        let (revoked, subscription) = {
            let mut inner = shared.lock();
            if inner.generation != generation {
                return;
            }
            inner.sessions = decode_sessions(snapshot);

            let own_missing = match inner.state.session_id() {
                Some(own) => !snapshot.contains(own),
                None => false,
            };
            if own_missing && !snapshot.metadata.from_cache && !inner.revocation_latched {
                inner.revocation_latched = true;
                inner.state = SessionState::Revoked;
                inner.sessions.clear();
                (true, inner.subscription.take())
            } else {
                (false, None)
            }
        };
        drop(subscription);

        if revoked {
            tracing::warn!("session revoked from another device");
            shared.notices.push(Notice::error(REVOKED_MESSAGE));
            if let Err(e) = shared.identity_provider.sign_out() {
                tracing::warn!(error = %e, "forced sign-out failed");
            }
        }
    }
}

fn decode_sessions(snapshot: &QuerySnapshot) -> Vec<DeviceSession> {
    snapshot
        .documents
        .iter()
        .filter_map(|doc| match doc.decode::<DeviceSession>() {
            Ok(mut session) => {
                session.id = doc.id().to_string();
                Some(session)
            }
            Err(e) => {
                tracing::warn!(session = %doc.id(), error = %e, "skipping malformed session record");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::LocalIdentityProvider;
    use crate::session::{ClientHints, MemorySessionIdStore};
    use crate::store::{Database, DocumentData, SnapshotMetadata};

    const UA: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0";

    struct Fixture {
        db: Arc<Database>,
        provider: Arc<LocalIdentityProvider>,
        registry: SessionRegistry,
    }

    fn fixture(db: Arc<Database>, session_id: &str) -> Fixture {
        let provider = Arc::new(LocalIdentityProvider::new());
        let registry = SessionRegistry::new(
            db.clone(),
            provider.clone(),
            Arc::new(MemorySessionIdStore::with_id(session_id)),
            ClientHints::from_user_agent(UA).detect(),
            NoticeQueue::new(),
        );
        Fixture { db, provider, registry }
    }

    fn identity() -> Identity {
        Identity::new("uid-1", "dr@clinic.com")
    }

    fn seed_session(db: &Database, id: &str, last_active: &str) {
        let mut data = DocumentData::new();
        data.insert("deviceType".into(), "Phone".into());
        data.insert("browser".into(), "Safari".into());
        data.insert("lastActiveAt".into(), last_active.into());
        db.set(&CollectionPath::sessions("uid-1").doc(id), data, SetMode::Overwrite)
            .unwrap();
    }

    fn revoked_notices(registry: &SessionRegistry) -> usize {
        registry
            .notices()
            .drain()
            .iter()
            .filter(|n| n.message == REVOKED_MESSAGE)
            .count()
    }

    #[test]
    fn test_sign_in_registers_and_watches() {
        let f = fixture(Arc::new(Database::open_in_memory().unwrap()), "sess_a");
        f.registry.handle_identity_change(Some(identity())).unwrap();

        assert_eq!(
            f.registry.state(),
            SessionState::Active {
                session_id: "sess_a".into()
            }
        );
        assert!(f.registry.is_watching());
        assert_eq!(f.db.listener_count(), 1);

        let record = f
            .db
            .get(&CollectionPath::sessions("uid-1").doc("sess_a"))
            .unwrap()
            .unwrap();
        let session: DeviceSession = record.decode().unwrap();
        assert_eq!(session.device.browser, "Firefox");
        assert!(session.last_active_at.is_some());
        assert!(session.updated_at.is_some());

        let sessions = f.registry.sessions();
        assert_eq!(sessions.len(), 1);
        assert!(sessions[0].is_current);
    }

    #[test]
    fn test_repeat_sign_in_reuses_record() {
        let f = fixture(Arc::new(Database::open_in_memory().unwrap()), "sess_a");
        f.registry.handle_identity_change(Some(identity())).unwrap();
        f.registry.handle_identity_change(Some(identity())).unwrap();

        assert_eq!(f.db.list(&CollectionPath::sessions("uid-1")).unwrap().len(), 1);
        assert_eq!(f.db.listener_count(), 1);
    }

    #[test]
    fn test_remote_delete_revokes_once() {
        let f = fixture(Arc::new(Database::open_in_memory().unwrap()), "sess_a");
        f.registry.handle_identity_change(Some(identity())).unwrap();

        f.db.delete(&CollectionPath::sessions("uid-1").doc("sess_a")).unwrap();

        assert_eq!(f.registry.state(), SessionState::Revoked);
        assert!(f.provider.take_sign_out_request());
        assert!(!f.registry.is_watching());
        assert_eq!(f.db.listener_count(), 0);

        let empty = QuerySnapshot {
            collection: CollectionPath::sessions("uid-1"),
            documents: Vec::new(),
            metadata: SnapshotMetadata::confirmed(),
        };
        f.registry.apply_snapshot(&empty);
        f.registry.apply_snapshot(&empty);

        assert_eq!(revoked_notices(&f.registry), 1);
        assert!(!f.provider.take_sign_out_request());
    }

    #[test]
    fn test_cached_snapshot_never_revokes() {
        let f = fixture(Arc::new(Database::open_in_memory().unwrap()), "sess_a");
        f.registry.handle_identity_change(Some(identity())).unwrap();

        let cached = QuerySnapshot {
            collection: CollectionPath::sessions("uid-1"),
            documents: Vec::new(),
            metadata: SnapshotMetadata { from_cache: true },
        };
        f.registry.apply_snapshot(&cached);

        assert!(f.registry.state().is_active());
        assert_eq!(revoked_notices(&f.registry), 0);
    }

    #[test]
    fn test_logout_is_not_mistaken_for_revocation() {
        let f = fixture(Arc::new(Database::open_in_memory().unwrap()), "sess_a");
        f.registry.handle_identity_change(Some(identity())).unwrap();

        f.registry.logout().unwrap();

        assert_eq!(f.registry.state(), SessionState::LoggedOut);
        assert_eq!(revoked_notices(&f.registry), 0);
        assert!(f.provider.take_sign_out_request());
        assert!(f
            .db
            .get(&CollectionPath::sessions("uid-1").doc("sess_a"))
            .unwrap()
            .is_none());
        assert_eq!(f.db.listener_count(), 0);

        f.registry.handle_identity_change(None).unwrap();
        assert_eq!(f.registry.state(), SessionState::LoggedOut);
    }

    #[test]
    fn test_close_all_others_keeps_own() {
        let f = fixture(Arc::new(Database::open_in_memory().unwrap()), "sess_a");
        seed_session(&f.db, "sess_b", "2026-01-01T00:00:00Z");
        seed_session(&f.db, "sess_c", "2026-01-02T00:00:00Z");
        f.registry.handle_identity_change(Some(identity())).unwrap();
        assert_eq!(f.registry.sessions().len(), 3);

        assert_eq!(f.registry.close_all_other_sessions().unwrap(), 2);

        let remaining = f.db.list(&CollectionPath::sessions("uid-1")).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id(), "sess_a");
        assert!(f.registry.state().is_active());
        assert_eq!(f.registry.close_all_other_sessions().unwrap(), 0);
    }

    #[test]
    fn test_sessions_order_current_then_recent() {
        let f = fixture(Arc::new(Database::open_in_memory().unwrap()), "sess_a");
        seed_session(&f.db, "sess_old", "2025-01-01T00:00:00Z");
        seed_session(&f.db, "sess_new", "2025-06-01T00:00:00Z");
        f.registry.handle_identity_change(Some(identity())).unwrap();

        let ids: Vec<String> = f.registry.sessions().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["sess_a", "sess_new", "sess_old"]);
    }

    #[test]
    fn test_revoke_other_and_own() {
        let f = fixture(Arc::new(Database::open_in_memory().unwrap()), "sess_a");
        seed_session(&f.db, "sess_b", "2026-01-01T00:00:00Z");
        f.registry.handle_identity_change(Some(identity())).unwrap();

        f.registry.revoke_session("sess_b").unwrap();
        assert_eq!(f.registry.sessions().len(), 1);
        assert!(f.registry.state().is_active());

        f.registry.revoke_session("sess_a").unwrap();
        assert_eq!(f.registry.state(), SessionState::LoggedOut);
        assert_eq!(revoked_notices(&f.registry), 0);
    }

    #[test]
    fn test_identity_switch_drops_old_subscription() {
        let f = fixture(Arc::new(Database::open_in_memory().unwrap()), "sess_a");
        f.registry.handle_identity_change(Some(identity())).unwrap();
        f.registry
            .handle_identity_change(Some(Identity::new("uid-2", "other@clinic.com")))
            .unwrap();

        assert_eq!(f.db.listener_count(), 1);
        // Deleting under the old identity no longer affects this installation
        f.db.delete(&CollectionPath::sessions("uid-1").doc("sess_a")).unwrap();
        assert!(f.registry.state().is_active());

        f.registry.handle_identity_change(None).unwrap();
        assert_eq!(f.registry.state(), SessionState::Unauthenticated);
        assert_eq!(f.db.listener_count(), 0);
    }

    #[test]
    fn test_operations_require_active_session() {
        let f = fixture(Arc::new(Database::open_in_memory().unwrap()), "sess_a");
        assert!(matches!(f.registry.logout(), Err(SessionError::NotActive)));
        assert!(matches!(f.registry.refresh(), Err(SessionError::NotActive)));
        assert!(matches!(f.registry.close_all_other_sessions(), Err(SessionError::NotActive)));
    }

    #[test]
    fn test_refresh_restamps() {
        let f = fixture(Arc::new(Database::open_in_memory().unwrap()), "sess_a");
        f.registry.handle_identity_change(Some(identity())).unwrap();
        let path = CollectionPath::sessions("uid-1").doc("sess_a");
        let before = f.db.get(&path).unwrap().unwrap().update_time;

        std::thread::sleep(std::time::Duration::from_millis(2));
        f.registry.refresh().unwrap();

        let after = f.db.get(&path).unwrap().unwrap().update_time;
        assert!(after > before);
    }
}
