//! Process-wide session state.
//!
//! [`AuthStore`] is the single source of truth for who is logged in. It is
//! created once from the persisted token slot, replaced wholesale on login and
//! cleared wholesale on logout. Observers subscribe to [`AuthEvent`]s instead
//! of polling.

use arc_swap::ArcSwap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

use super::storage::TokenStore;
use super::token::{decode_claims, TokenClaims, TokenError};
use super::AuthError;
use crate::models::Role;

/// Entry point a logged-out viewer is sent to.
pub const LOGIN_ROUTE: &str = "/login";

/// Snapshot of the current session.
///
/// `role` and `user_id` are present exactly when `token` is, and are always
/// derived from the token's claims.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    token: Option<String>,
    role: Option<Role>,
    user_id: Option<String>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Build an authenticated session from a raw token.
    pub fn from_token(token: &str) -> Result<Self, TokenError> {
        let claims = decode_claims(token)?;
        Self::from_claims(token, claims)
    }

    fn from_claims(token: &str, claims: TokenClaims) -> Result<Self, TokenError> {
        let role = claims.role()?;
        Ok(Self {
            token: Some(token.trim().to_string()),
            role: Some(role),
            user_id: Some(claims.sub),
        })
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.role == Some(Role::Admin)
    }

    pub fn is_member(&self) -> bool {
        self.role == Some(Role::Member)
    }
}

/// Session transitions published to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    LoggedIn { user_id: String, role: Role },
    /// The viewer must be taken to `redirect_to`.
    LoggedOut { redirect_to: &'static str },
}

pub struct AuthStore {
    storage: Arc<dyn TokenStore>,
    session: ArcSwap<Session>,
    events: broadcast::Sender<AuthEvent>,
}

impl AuthStore {
    /// Restore the session from the token slot.
    ///
    /// Never fails: an unreadable slot, a malformed token or an expired token
    /// all start the store unauthenticated. Bad tokens are removed from the slot.
    pub fn initialize(storage: Arc<dyn TokenStore>) -> Self {
        let session = match storage.load() {
            Ok(Some(token)) => Self::restore(storage.as_ref(), &token),
            Ok(None) => Session::anonymous(),
            Err(e) => {
                warn!(error = %e, "Failed to read persisted session, starting logged out");
                Session::anonymous()
            }
        };

        if let (Some(user_id), Some(role)) = (session.user_id(), session.role()) {
            info!(user_id = %user_id, role = %role, "Restored persisted session");
        }

        let (events, _) = broadcast::channel(16);
        Self {
            storage,
            session: ArcSwap::from_pointee(session),
            events,
        }
    }

    fn restore(storage: &dyn TokenStore, token: &str) -> Session {
        let outcome = decode_claims(token).and_then(|claims| {
            if claims.is_expired() {
                Err(TokenError::Expired)
            } else {
                Session::from_claims(token, claims)
            }
        });

        match outcome {
            Ok(session) => session,
            Err(e) => {
                warn!(reason = %e, "Discarding persisted session token");
                if let Err(e) = storage.clear() {
                    warn!(error = %e, "Failed to clear persisted session token");
                }
                Session::anonymous()
            }
        }
    }

    /// Current session snapshot.
    pub fn session(&self) -> Arc<Session> {
        self.session.load_full()
    }

    pub fn token(&self) -> Option<String> {
        self.session.load().token().map(str::to_string)
    }

    pub fn role(&self) -> Option<Role> {
        self.session.load().role()
    }

    pub fn user_id(&self) -> Option<String> {
        self.session.load().user_id().map(str::to_string)
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.load().is_authenticated()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    /// Adopt a token obtained from the backend's login endpoint.
    ///
    /// The token is decoded before anything is persisted, so a bad token leaves
    /// the current session untouched.
    pub fn login(&self, token: &str) -> Result<Arc<Session>, AuthError> {
        let session = Session::from_token(token)?;
        if let Some(token) = session.token() {
            self.storage.save(token)?;
        }

        let session = Arc::new(session);
        self.session.store(session.clone());

        if let (Some(user_id), Some(role)) = (session.user_id(), session.role()) {
            info!(user_id = %user_id, role = %role, "Logged in");
            let _ = self.events.send(AuthEvent::LoggedIn {
                user_id: user_id.to_string(),
                role,
            });
        }

        Ok(session)
    }

    /// Forget the session and ask observers to navigate to the login entry point.
    ///
    /// The in-memory session is always reset; a failure to erase the persisted
    /// slot is still reported.
    pub fn logout(&self) -> Result<(), AuthError> {
        let cleared = self.storage.clear();
        self.session.store(Arc::new(Session::anonymous()));
        info!("Logged out");
        let _ = self.events.send(AuthEvent::LoggedOut {
            redirect_to: LOGIN_ROUTE,
        });
        cleared.map_err(AuthError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::storage::MemoryTokenStore;
    use crate::auth::token::test_tokens::{admin, issue, member};

    fn store_with(storage: MemoryTokenStore) -> (Arc<MemoryTokenStore>, AuthStore) {
        let storage = Arc::new(storage);
        let auth = AuthStore::initialize(storage.clone());
        (storage, auth)
    }

    #[test]
    fn test_initialize_without_token_is_anonymous() {
        let (_, auth) = store_with(MemoryTokenStore::new());
        let session = auth.session();
        assert!(!session.is_authenticated());
        assert_eq!(session.role(), None);
        assert_eq!(session.user_id(), None);
    }

    #[test]
    fn test_initialize_restores_persisted_session() {
        let token = admin("a1");
        let (_, auth) = store_with(MemoryTokenStore::with_token(token.clone()));

        assert!(auth.is_authenticated());
        assert_eq!(auth.role(), Some(Role::Admin));
        assert_eq!(auth.user_id().as_deref(), Some("a1"));
        assert_eq!(auth.token(), Some(token));
    }

    #[test]
    fn test_initialize_degrades_on_corrupt_token() {
        let (storage, auth) = store_with(MemoryTokenStore::with_token("garbage"));

        assert!(!auth.is_authenticated());
        assert_eq!(auth.role(), None);
        assert_eq!(storage.load().unwrap(), None);
    }

    #[test]
    fn test_initialize_degrades_on_expired_token() {
        let expired = issue("u1", &["MEMBER"], Some(1));
        let (storage, auth) = store_with(MemoryTokenStore::with_token(expired));

        assert!(!auth.is_authenticated());
        assert_eq!(storage.load().unwrap(), None);
    }

    #[test]
    fn test_login_derives_role_and_user_from_claims() {
        let (storage, auth) = store_with(MemoryTokenStore::new());
        for (token, role, sub) in [
            (member("u1"), Role::Member, "u1"),
            (admin("a9"), Role::Admin, "a9"),
        ] {
            let session = auth.login(&token).unwrap();
            assert!(session.is_authenticated());
            assert_eq!(session.role(), Some(role));
            assert_eq!(session.user_id(), Some(sub));
            assert_eq!(storage.load().unwrap(), Some(token));
        }
    }

    #[test]
    fn test_login_with_bad_token_keeps_current_session() {
        let token = member("u1");
        let (storage, auth) = store_with(MemoryTokenStore::with_token(token.clone()));

        assert!(auth.login("not-a-token").is_err());
        assert!(auth.login(&issue("u2", &["GUEST"], None)).is_err());

        assert_eq!(auth.user_id().as_deref(), Some("u1"));
        assert_eq!(storage.load().unwrap(), Some(token));
    }

    #[test]
    fn test_logout_always_clears() {
        for initial in [None, Some(member("u1")), Some(admin("a1"))] {
            let storage = match &initial {
                Some(token) => MemoryTokenStore::with_token(token.clone()),
                None => MemoryTokenStore::new(),
            };
            let (storage, auth) = store_with(storage);

            auth.logout().unwrap();

            let session = auth.session();
            assert_eq!(*session, Session::anonymous());
            assert!(!session.is_authenticated());
            assert_eq!(storage.load().unwrap(), None);
        }
    }

    #[tokio::test]
    async fn test_subscribers_see_login_and_logout() {
        let (_, auth) = store_with(MemoryTokenStore::new());
        let mut events = auth.subscribe();

        auth.login(&member("u1")).unwrap();
        auth.logout().unwrap();

        assert_eq!(
            events.recv().await.unwrap(),
            AuthEvent::LoggedIn {
                user_id: "u1".to_string(),
                role: Role::Member
            }
        );
        assert_eq!(
            events.recv().await.unwrap(),
            AuthEvent::LoggedOut {
                redirect_to: LOGIN_ROUTE
            }
        );
    }
}
