//! Explicit lifecycle container for one dashboard instance.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use wattsense_client::{AuthApi, BoardApi, HttpBoardApi};
use wattsense_kv::{KVStore, MemoryStore, RedbStore};

use crate::error::BoardsError;
use crate::optimistic::ToggleController;
use crate::session::{Session, SessionManager};
use crate::store::BoardStore;

#[derive(Debug, Clone, Default)]
pub struct DashboardConfig {
    /// Base URL of the API server, without the `/api` prefix.
    pub api_url: String,
    /// Session cache file. `None` keeps the session in memory only.
    pub session_path: Option<PathBuf>,
    /// Per-request timeout. `None` uses the HTTP client default.
    pub timeout: Option<Duration>,
}

/// Owns every long-lived piece: session, data client, store and toggle
/// controller. Built once by [`Dashboard::init`], torn down by
/// [`Dashboard::dispose`].
pub struct Dashboard {
    session: Arc<SessionManager>,
    auth: Arc<dyn AuthApi>,
    store: Arc<BoardStore>,
    toggles: ToggleController,
}

impl Dashboard {
    /// Open session storage, restore any cached login and connect to the
    /// API server. No request is sent yet.
    pub fn init(config: &DashboardConfig) -> Result<Self, BoardsError> {
        let storage: Arc<dyn KVStore> = match &config.session_path {
            Some(path) => Arc::new(RedbStore::open(path)?),
            None => Arc::new(MemoryStore::new()),
        };
        let session = Arc::new(SessionManager::restore(storage)?);
        let http = match config.timeout {
            Some(timeout) => HttpBoardApi::with_timeout(&config.api_url, session.clone(), timeout)?,
            None => HttpBoardApi::new(&config.api_url, session.clone()),
        };
        let http = Arc::new(http);
        info!("dashboard connected to {}", http.base_url());
        Ok(Self::from_parts(session, http.clone(), http))
    }

    /// Assemble from already-built parts.
    pub fn from_parts(
        session: Arc<SessionManager>,
        api: Arc<dyn BoardApi>,
        auth: Arc<dyn AuthApi>,
    ) -> Self {
        let store = Arc::new(BoardStore::new(api));
        let toggles = ToggleController::new(store.clone());
        Self {
            session,
            auth,
            store,
            toggles,
        }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn store(&self) -> &Arc<BoardStore> {
        &self.store
    }

    pub fn toggles(&self) -> &ToggleController {
        &self.toggles
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session, BoardsError> {
        self.session.login(self.auth.as_ref(), email, password).await
    }

    pub async fn login_google(&self, id_token: &str) -> Result<Session, BoardsError> {
        self.session.login_google(self.auth.as_ref(), id_token).await
    }

    /// Forget the session and every snapshot loaded under it.
    pub fn logout(&self) -> Result<(), BoardsError> {
        self.session.logout()?;
        self.store.reset();
        Ok(())
    }

    /// Drop all store subscriptions. The session cache is already on disk;
    /// nothing else needs flushing.
    pub fn dispose(self) {
        self.store.clear_subscribers();
        info!("dashboard disposed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wattsense_client::{ApiError, MemoryBackend, Role};

    fn memory_dashboard() -> (Arc<MemoryBackend>, Dashboard) {
        let backend = Arc::new(MemoryBackend::new());
        backend.add_account("admin@example.com", "secret", Role::Admin);
        let session = Arc::new(SessionManager::new(Arc::new(MemoryStore::new())));
        let dash = Dashboard::from_parts(session, backend.clone(), backend.clone());
        (backend, dash)
    }

    #[tokio::test]
    async fn login_then_load() {
        let (backend, dash) = memory_dashboard();
        backend.seed_board(None, None, true);

        dash.login("admin@example.com", "secret").await.unwrap();
        dash.store().refresh().await.unwrap();

        assert!(dash.session().is_admin());
        assert_eq!(dash.store().boards().len(), 1);
    }

    #[tokio::test]
    async fn logout_clears_snapshots() {
        let (backend, dash) = memory_dashboard();
        backend.seed_board(None, None, true);
        dash.login("admin@example.com", "secret").await.unwrap();
        dash.store().refresh().await.unwrap();

        dash.logout().unwrap();
        assert!(dash.session().current().is_none());
        assert!(dash.store().boards().is_empty());
    }

    #[tokio::test]
    async fn logged_out_dashboard_requires_login() {
        let (_, dash) = memory_dashboard();
        let err = dash.session().require().unwrap_err();
        assert!(matches!(err, BoardsError::NotLoggedIn));
        assert_eq!(err.surface(), wattsense_client::Surface::Relogin);

        dash.login("admin@example.com", "secret").await.unwrap();
        assert_eq!(dash.session().require().unwrap().email, "admin@example.com");

        dash.logout().unwrap();
        assert!(matches!(
            dash.session().require(),
            Err(BoardsError::NotLoggedIn)
        ));
    }

    #[test]
    fn dispose_drops_subscriptions() {
        let (_, dash) = memory_dashboard();
        let store = dash.store().clone();
        store.subscribe(|_| {});
        store.subscribe(|_| {});
        assert_eq!(store.subscriber_count(), 2);

        dash.dispose();
        assert_eq!(store.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn init_without_login_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let config = DashboardConfig {
            // Nothing listens here; a request would be a network error.
            api_url: "http://127.0.0.1:9".into(),
            session_path: Some(dir.path().join("session.redb")),
            timeout: Some(Duration::from_secs(2)),
        };
        let dash = Dashboard::init(&config).unwrap();

        let err = dash.store().refresh_boards().await.unwrap_err();
        assert!(matches!(err, ApiError::Auth(_)));
        dash.dispose();
    }
}
