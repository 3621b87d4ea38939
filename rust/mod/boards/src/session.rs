//! Login state, cached in local storage across restarts.

use std::fmt;
use std::sync::{Arc, RwLock};

use tracing::{debug, info, warn};
use wattsense_client::{ApiError, AuthApi, LoginResponse, Role, TokenSource};
use wattsense_kv::KVStore;

use crate::error::BoardsError;

pub const TOKEN_KEY: &str = "jwtToken";
pub const EMAIL_KEY: &str = "userEmail";
pub const ROLE_KEY: &str = "userRole";

/// An authenticated user.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub email: String,
    pub role: Role,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("email", &self.email)
            .field("role", &self.role)
            .finish()
    }
}

impl From<LoginResponse> for Session {
    fn from(resp: LoginResponse) -> Self {
        Self {
            token: resp.token,
            email: resp.user.email,
            role: resp.user.role,
        }
    }
}

/// Holds the current session and mirrors it into a [`KVStore`].
///
/// Also the [`TokenSource`] for the HTTP client: protected requests carry
/// whatever token is current at the time of the call.
pub struct SessionManager {
    storage: Arc<dyn KVStore>,
    current: RwLock<Option<Session>>,
}

impl SessionManager {
    /// Start logged out, ignoring anything already in `storage`.
    pub fn new(storage: Arc<dyn KVStore>) -> Self {
        Self {
            storage,
            current: RwLock::new(None),
        }
    }

    /// Load a previously saved session. A partial or unreadable entry set
    /// counts as logged out.
    pub fn restore(storage: Arc<dyn KVStore>) -> Result<Self, BoardsError> {
        let token = storage.get(TOKEN_KEY)?;
        let email = storage.get(EMAIL_KEY)?;
        let role = storage.get(ROLE_KEY)?;

        let session = match (token, email, role) {
            (Some(token), Some(email), Some(role)) if !token.is_empty() => match Role::parse(&role)
            {
                Some(role) => Some(Session { token, email, role }),
                None => {
                    warn!("ignoring cached session with unknown role {:?}", role);
                    None
                }
            },
            (None, None, None) => None,
            _ => {
                debug!("ignoring incomplete cached session");
                None
            }
        };
        if let Some(s) = &session {
            info!("restored session for {}", s.email);
        }
        Ok(Self {
            storage,
            current: RwLock::new(session),
        })
    }

    pub fn current(&self) -> Option<Session> {
        self.current.read().unwrap().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.read().unwrap().is_some()
    }

    /// The current session, or [`BoardsError::NotLoggedIn`].
    pub fn require(&self) -> Result<Session, BoardsError> {
        self.current().ok_or(BoardsError::NotLoggedIn)
    }

    pub fn is_admin(&self) -> bool {
        self.current
            .read()
            .unwrap()
            .as_ref()
            .is_some_and(Session::is_admin)
    }

    /// Email/password login. On failure the previous session, if any, is
    /// left as it was.
    pub async fn login(
        &self,
        auth: &dyn AuthApi,
        email: &str,
        password: &str,
    ) -> Result<Session, BoardsError> {
        let resp = auth.login(email.trim(), password).await?;
        self.establish(resp)
    }

    pub async fn login_google(&self, auth: &dyn AuthApi, id_token: &str) -> Result<Session, BoardsError> {
        let resp = auth.login_google(id_token).await?;
        self.establish(resp)
    }

    fn establish(&self, resp: LoginResponse) -> Result<Session, BoardsError> {
        let session = Session::from(resp);
        self.storage.set_many(&[
            (TOKEN_KEY, session.token.as_str()),
            (EMAIL_KEY, session.email.as_str()),
            (ROLE_KEY, session.role.as_str()),
        ])?;
        *self.current.write().unwrap() = Some(session.clone());
        info!("logged in as {} ({})", session.email, session.role.as_str());
        Ok(session)
    }

    /// Forget the session locally. There is no server-side logout.
    pub fn logout(&self) -> Result<(), BoardsError> {
        self.storage.remove_many(&[TOKEN_KEY, EMAIL_KEY, ROLE_KEY])?;
        if let Some(s) = self.current.write().unwrap().take() {
            info!("logged out {}", s.email);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl TokenSource for SessionManager {
    async fn token(&self) -> Result<Option<String>, ApiError> {
        Ok(self.current.read().unwrap().as_ref().map(|s| s.token.clone()))
    }
}
