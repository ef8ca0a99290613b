//! Session management: login, registration, token lifecycle, logout.
//!
//! [`SessionManager`] owns the customer session. It validates credentials
//! locally before any remote call, persists the session across runs, and
//! hands out bearer tokens to the domain stores via
//! [`get_valid_token`](SessionManager::get_valid_token), refreshing expired
//! tokens at most once per request and degrading to "unauthenticated"
//! instead of erroring.
//!
//! State machine: `Unauthenticated → (login/register) → Authenticated →
//! (logout | refresh failure) → Unauthenticated`. There is no externally
//! observable "refreshing" state.

mod error;
mod provider;

pub use error::AuthError;
pub use provider::{
    DEV_REFRESH_PREFIX, DEV_TOKEN_PREFIX, IdentityProvider, IssuedSession, MockIdentityProvider,
};

use std::sync::{Arc, RwLock};

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::warn;

use tundra_core::{CustomerId, Email};

use crate::storage::{KeyValueStore, keys};

/// Minimum password length accepted by local validation.
pub const MIN_PASSWORD_LENGTH: usize = 6;

// ─────────────────────────────────────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────────────────────────────────────

/// Customer profile attached to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: CustomerId,
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
}

/// Login credentials as submitted by the caller.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    /// Bundle an email and password.
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Account registration data.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Partial profile update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
}

impl ProfileUpdate {
    fn apply(self, profile: &mut Profile) {
        if let Some(first_name) = self.first_name {
            profile.first_name = first_name;
        }
        if let Some(last_name) = self.last_name {
            profile.last_name = last_name;
        }
        if let Some(phone) = self.phone {
            profile.phone = Some(phone);
        }
        if let Some(address) = self.address {
            profile.address = Some(address);
        }
        if let Some(city) = self.city {
            profile.city = Some(city);
        }
        if let Some(postal_code) = self.postal_code {
            profile.postal_code = Some(postal_code);
        }
    }
}

/// An authenticated customer session.
///
/// The access token is present iff the session exists, and the refresh
/// token always accompanies it; "logged out" is the absence of a `Session`.
#[derive(Clone)]
pub struct Session {
    profile: Profile,
    access_token: SecretString,
    refresh_token: SecretString,
}

impl Session {
    /// The customer this session belongs to.
    #[must_use]
    pub const fn customer_id(&self) -> CustomerId {
        self.profile.id
    }

    /// The customer profile.
    #[must_use]
    pub const fn profile(&self) -> &Profile {
        &self.profile
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("profile", &self.profile)
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

/// On-disk shape of a persisted session.
#[derive(Debug, Serialize, Deserialize)]
struct SessionBlob {
    access_token: String,
    refresh_token: String,
    profile: Profile,
}

// ─────────────────────────────────────────────────────────────────────────────
// Token inspection
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Claims {
    exp: Option<i64>,
}

/// Structural token expiry check.
///
/// Development tokens (`dev-jwt-token-*`) never expire. JWT-shaped tokens
/// have their payload decoded and `exp` compared against the current time.
/// Anything unparseable counts as expired, which routes the caller through
/// a refresh.
#[must_use]
pub fn is_token_expired(token: &str) -> bool {
    if token.is_empty() {
        return true;
    }
    if token.starts_with(DEV_TOKEN_PREFIX) {
        return false;
    }

    let Some(payload) = token.split('.').nth(1) else {
        return true;
    };
    let Ok(bytes) = URL_SAFE_NO_PAD.decode(payload) else {
        return true;
    };
    let Ok(claims) = serde_json::from_slice::<Claims>(&bytes) else {
        return true;
    };

    claims.exp.is_none_or(|exp| exp <= Utc::now().timestamp())
}

// ─────────────────────────────────────────────────────────────────────────────
// Session manager
// ─────────────────────────────────────────────────────────────────────────────

/// Owns the session and gates every authenticated call.
pub struct SessionManager {
    provider: Arc<dyn IdentityProvider>,
    storage: Arc<dyn KeyValueStore>,
    session: RwLock<Option<Session>>,
}

impl SessionManager {
    /// Create a manager, restoring a persisted session if one exists.
    ///
    /// A corrupt session blob is discarded with a warning rather than
    /// failing startup; the customer simply starts logged out.
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>, storage: Arc<dyn KeyValueStore>) -> Self {
        let session = restore_session(storage.as_ref());
        Self {
            provider,
            storage,
            session: RwLock::new(session),
        }
    }

    /// Whether a session is active.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.read_session().is_some()
    }

    /// The active session, if any.
    #[must_use]
    pub fn current(&self) -> Option<Session> {
        self.read_session()
    }

    /// The authenticated customer's id, if any.
    #[must_use]
    pub fn customer_id(&self) -> Option<CustomerId> {
        self.read_session().map(|s| s.customer_id())
    }

    /// Log in with email and password.
    ///
    /// Credentials are validated locally (email shape, password length)
    /// before the identity provider is contacted.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` on validation failure or provider rejection.
    pub async fn login(&self, credentials: Credentials) -> Result<Session, AuthError> {
        let email = validate_credentials(&credentials.email, &credentials.password)?;
        let issued = self.provider.login(&email, &credentials.password).await?;
        Ok(self.install(issued))
    }

    /// Register a new account and start its first session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` on validation failure or provider rejection.
    pub async fn register(&self, registration: Registration) -> Result<Session, AuthError> {
        validate_credentials(&registration.email, &registration.password)?;
        let issued = self.provider.register(&registration).await?;
        Ok(self.install(issued))
    }

    /// End the session.
    ///
    /// Remote invalidation is best-effort: a provider failure is logged and
    /// never blocks the local clear. Logging out while logged out is a
    /// no-op.
    pub async fn logout(&self) {
        let token = {
            let guard = self.session.read().unwrap_or_else(|e| e.into_inner());
            guard.as_ref().map(|s| s.access_token.clone())
        };

        if let Some(token) = token
            && let Err(e) = self.provider.logout(token.expose_secret()).await
        {
            warn!("remote logout failed, clearing local session anyway: {e}");
        }

        {
            let mut guard = self.session.write().unwrap_or_else(|e| e.into_inner());
            *guard = None;
        }
        if let Err(e) = self.storage.remove(keys::SESSION) {
            warn!("failed to clear persisted session: {e}");
        }
    }

    /// Return a token suitable for an authenticated call.
    ///
    /// If the current access token is expired, exactly one refresh is
    /// attempted. Returns `None` - never an error - when there is no
    /// session or the refresh fails; callers treat `None` as
    /// "unauthenticated".
    pub async fn get_valid_token(&self) -> Option<SecretString> {
        let token = {
            let guard = self.session.read().unwrap_or_else(|e| e.into_inner());
            guard.as_ref().map(|s| s.access_token.clone())
        }?;

        if !is_token_expired(token.expose_secret()) {
            return Some(token);
        }

        match self.refresh().await {
            Ok(fresh) => Some(fresh),
            Err(e) => {
                warn!("token refresh failed, treating session as unauthenticated: {e}");
                None
            }
        }
    }

    /// Exchange the refresh token for a new access token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::RefreshUnavailable`] when no session (and thus
    /// no refresh token) exists, or the provider's error when the exchange
    /// fails.
    pub async fn refresh(&self) -> Result<SecretString, AuthError> {
        let refresh_token = {
            let guard = self.session.read().unwrap_or_else(|e| e.into_inner());
            guard.as_ref().map(|s| s.refresh_token.clone())
        }
        .ok_or(AuthError::RefreshUnavailable)?;

        let fresh = self.provider.refresh(refresh_token.expose_secret()).await?;
        let fresh = SecretString::from(fresh);

        let persistable = {
            let mut guard = self.session.write().unwrap_or_else(|e| e.into_inner());
            if let Some(session) = guard.as_mut() {
                session.access_token = fresh.clone();
            }
            guard.clone()
        };
        if let Some(session) = persistable {
            self.persist(&session);
        }

        Ok(fresh)
    }

    /// Merge changes into the profile and persist the result.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotAuthenticated`] when no session is active.
    pub fn update_profile(&self, update: ProfileUpdate) -> Result<Profile, AuthError> {
        let session = {
            let mut guard = self.session.write().unwrap_or_else(|e| e.into_inner());
            let session = guard.as_mut().ok_or(AuthError::NotAuthenticated)?;
            update.apply(&mut session.profile);
            session.clone()
        };

        self.persist(&session);
        Ok(session.profile)
    }

    /// Change the account password.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotAuthenticated`] without a session,
    /// [`AuthError::PasswordTooShort`] if the new password fails
    /// validation, or the provider's error.
    pub async fn change_password(&self, current: &str, new: &str) -> Result<(), AuthError> {
        let token = {
            let guard = self.session.read().unwrap_or_else(|e| e.into_inner());
            guard.as_ref().map(|s| s.access_token.clone())
        }
        .ok_or(AuthError::NotAuthenticated)?;

        if new.len() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::PasswordTooShort {
                min: MIN_PASSWORD_LENGTH,
            });
        }

        self.provider
            .change_password(token.expose_secret(), current, new)
            .await
    }

    fn read_session(&self) -> Option<Session> {
        self.session
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn install(&self, issued: IssuedSession) -> Session {
        let session = Session {
            profile: issued.profile,
            access_token: SecretString::from(issued.access_token),
            refresh_token: SecretString::from(issued.refresh_token),
        };

        {
            let mut guard = self.session.write().unwrap_or_else(|e| e.into_inner());
            *guard = Some(session.clone());
        }
        self.persist(&session);

        session
    }

    /// Persistence is best-effort: the in-memory session stays valid even
    /// when the state file cannot be written.
    fn persist(&self, session: &Session) {
        let blob = SessionBlob {
            access_token: session.access_token.expose_secret().to_owned(),
            refresh_token: session.refresh_token.expose_secret().to_owned(),
            profile: session.profile.clone(),
        };

        let result = serde_json::to_string(&blob)
            .map_err(crate::storage::StorageError::from)
            .and_then(|raw| self.storage.set(keys::SESSION, &raw));

        if let Err(e) = result {
            warn!("failed to persist session: {e}");
        }
    }
}

fn restore_session(storage: &dyn KeyValueStore) -> Option<Session> {
    let raw = match storage.get(keys::SESSION) {
        Ok(raw) => raw?,
        Err(e) => {
            warn!("failed to read persisted session: {e}");
            return None;
        }
    };

    match serde_json::from_str::<SessionBlob>(&raw) {
        Ok(blob) => Some(Session {
            profile: blob.profile,
            access_token: SecretString::from(blob.access_token),
            refresh_token: SecretString::from(blob.refresh_token),
        }),
        Err(e) => {
            warn!("discarding corrupt persisted session: {e}");
            None
        }
    }
}

fn validate_credentials(email: &str, password: &str) -> Result<Email, AuthError> {
    if email.is_empty() || password.is_empty() {
        return Err(AuthError::MissingCredentials);
    }

    let email = Email::parse(email)?;

    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::PasswordTooShort {
            min: MIN_PASSWORD_LENGTH,
        });
    }

    Ok(email)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::storage::MemoryStore;

    /// Provider double that counts calls and can be told to fail.
    #[derive(Default)]
    struct FakeProvider {
        login_calls: AtomicUsize,
        refresh_calls: AtomicUsize,
        access_token: std::sync::Mutex<String>,
        fail_refresh: bool,
        fail_logout: bool,
    }

    impl FakeProvider {
        fn issuing(token: &str) -> Self {
            Self {
                access_token: std::sync::Mutex::new(token.to_owned()),
                ..Self::default()
            }
        }

        fn profile(email: &Email) -> Profile {
            Profile {
                id: CustomerId::new(9),
                first_name: "Ada".to_owned(),
                last_name: "Lovelace".to_owned(),
                email: email.clone(),
                phone: None,
                address: None,
                city: None,
                postal_code: None,
            }
        }
    }

    #[async_trait::async_trait]
    impl IdentityProvider for FakeProvider {
        async fn login(&self, email: &Email, _password: &str) -> Result<IssuedSession, AuthError> {
            self.login_calls.fetch_add(1, Ordering::SeqCst);
            Ok(IssuedSession {
                profile: Self::profile(email),
                access_token: self.access_token.lock().unwrap().clone(),
                refresh_token: "refresh-1".to_owned(),
            })
        }

        async fn register(
            &self,
            registration: &Registration,
        ) -> Result<IssuedSession, AuthError> {
            let email = Email::parse(&registration.email)?;
            self.login(&email, &registration.password).await
        }

        async fn refresh(&self, _refresh_token: &str) -> Result<String, AuthError> {
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_refresh {
                return Err(AuthError::InvalidCredentials);
            }
            Ok("refreshed-access".to_owned())
        }

        async fn logout(&self, _access_token: &str) -> Result<(), AuthError> {
            if self.fail_logout {
                return Err(AuthError::Api(crate::api::ApiError::Status {
                    status: 500,
                    message: "boom".to_owned(),
                }));
            }
            Ok(())
        }

        async fn change_password(
            &self,
            _access_token: &str,
            _current: &str,
            _new: &str,
        ) -> Result<(), AuthError> {
            Ok(())
        }
    }

    fn manager_with(provider: Arc<FakeProvider>) -> SessionManager {
        SessionManager::new(provider, Arc::new(MemoryStore::new()))
    }

    fn jwt_with_exp(exp: i64) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"exp":{exp}}}"#));
        format!("{header}.{payload}.sig")
    }

    #[tokio::test]
    async fn test_short_password_rejected_without_remote_call() {
        let provider = Arc::new(FakeProvider::default());
        let manager = manager_with(Arc::clone(&provider));

        let err = manager
            .login(Credentials::new("a@b.com", "12345"))
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::PasswordTooShort { min: 6 }));
        assert_eq!(provider.login_calls.load(Ordering::SeqCst), 0);
        assert!(!manager.is_authenticated());
    }

    #[tokio::test]
    async fn test_missing_and_malformed_email_rejected() {
        let provider = Arc::new(FakeProvider::default());
        let manager = manager_with(Arc::clone(&provider));

        let err = manager
            .login(Credentials::new("", "password"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingCredentials));

        let err = manager
            .login(Credentials::new("not-an-email", "password"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidEmail(_)));

        assert_eq!(provider.login_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_login_persists_and_restores() {
        let storage = Arc::new(MemoryStore::new());
        let provider = Arc::new(FakeProvider::issuing("dev-jwt-token-abc"));

        let manager = SessionManager::new(
            Arc::clone(&provider) as Arc<dyn IdentityProvider>,
            Arc::clone(&storage) as Arc<dyn KeyValueStore>,
        );
        let session = manager
            .login(Credentials::new("ada@example.com", "longenough"))
            .await
            .unwrap();
        assert_eq!(session.customer_id(), CustomerId::new(9));
        assert!(storage.get(keys::SESSION).unwrap().is_some());

        // A fresh manager over the same storage restores the session
        let restored = SessionManager::new(provider, storage);
        assert!(restored.is_authenticated());
        assert_eq!(restored.customer_id(), Some(CustomerId::new(9)));
    }

    #[tokio::test]
    async fn test_get_valid_token_without_session_is_none() {
        let manager = manager_with(Arc::new(FakeProvider::default()));
        assert!(manager.get_valid_token().await.is_none());
    }

    #[tokio::test]
    async fn test_dev_token_never_refreshes() {
        let provider = Arc::new(FakeProvider::issuing("dev-jwt-token-123"));
        let manager = manager_with(Arc::clone(&provider));
        manager
            .login(Credentials::new("a@b.com", "password"))
            .await
            .unwrap();

        let token = manager.get_valid_token().await.unwrap();
        assert!(token.expose_secret().starts_with(DEV_TOKEN_PREFIX));
        assert_eq!(provider.refresh_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_expired_jwt_refreshes_once() {
        let expired = jwt_with_exp(Utc::now().timestamp() - 3600);
        let provider = Arc::new(FakeProvider::issuing(&expired));
        let manager = manager_with(Arc::clone(&provider));
        manager
            .login(Credentials::new("a@b.com", "password"))
            .await
            .unwrap();

        let token = manager.get_valid_token().await.unwrap();
        assert_eq!(token.expose_secret(), "refreshed-access");
        assert_eq!(provider.refresh_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refresh_failure_yields_none() {
        let expired = jwt_with_exp(Utc::now().timestamp() - 3600);
        let provider = Arc::new(FakeProvider {
            fail_refresh: true,
            ..FakeProvider::issuing(&expired)
        });
        let manager = manager_with(Arc::clone(&provider));
        manager
            .login(Credentials::new("a@b.com", "password"))
            .await
            .unwrap();

        assert!(manager.get_valid_token().await.is_none());
    }

    #[tokio::test]
    async fn test_logout_clears_even_when_remote_fails() {
        let storage = Arc::new(MemoryStore::new());
        let provider = Arc::new(FakeProvider {
            fail_logout: true,
            ..FakeProvider::issuing("dev-jwt-token-x")
        });

        let manager = SessionManager::new(
            provider as Arc<dyn IdentityProvider>,
            Arc::clone(&storage) as Arc<dyn KeyValueStore>,
        );
        manager
            .login(Credentials::new("a@b.com", "password"))
            .await
            .unwrap();

        manager.logout().await;

        assert!(!manager.is_authenticated());
        assert!(storage.get(keys::SESSION).unwrap().is_none());

        // Logging out twice is harmless
        manager.logout().await;
        assert!(!manager.is_authenticated());
    }

    #[tokio::test]
    async fn test_update_profile_requires_session() {
        let manager = manager_with(Arc::new(FakeProvider::default()));
        let err = manager.update_profile(ProfileUpdate::default()).unwrap_err();
        assert!(matches!(err, AuthError::NotAuthenticated));
    }

    #[tokio::test]
    async fn test_update_profile_merges_fields() {
        let manager = manager_with(Arc::new(FakeProvider::issuing("dev-jwt-token-x")));
        manager
            .login(Credentials::new("ada@example.com", "password"))
            .await
            .unwrap();

        let profile = manager
            .update_profile(ProfileUpdate {
                city: Some("London".to_owned()),
                ..ProfileUpdate::default()
            })
            .unwrap();

        assert_eq!(profile.city.as_deref(), Some("London"));
        assert_eq!(profile.first_name, "Ada");
    }

    #[tokio::test]
    async fn test_change_password_validates_and_requires_session() {
        let manager = manager_with(Arc::new(FakeProvider::issuing("dev-jwt-token-x")));

        let err = manager.change_password("old", "newpassword").await.unwrap_err();
        assert!(matches!(err, AuthError::NotAuthenticated));

        manager
            .login(Credentials::new("a@b.com", "password"))
            .await
            .unwrap();

        let err = manager.change_password("old", "short").await.unwrap_err();
        assert!(matches!(err, AuthError::PasswordTooShort { .. }));

        manager.change_password("old", "newpassword").await.unwrap();
    }

    #[test]
    fn test_is_token_expired_shapes() {
        // Dev tokens never expire
        assert!(!is_token_expired("dev-jwt-token-1700000000-abcd"));

        // Garbage counts as expired
        assert!(is_token_expired(""));
        assert!(is_token_expired("not-a-jwt"));
        assert!(is_token_expired("a.b.c"));

        // Real exp claims are honored
        let future = Utc::now().timestamp() + 3600;
        let past = Utc::now().timestamp() - 3600;
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256"}"#);
        let valid = format!(
            "{header}.{}.sig",
            URL_SAFE_NO_PAD.encode(format!(r#"{{"exp":{future}}}"#))
        );
        let stale = format!(
            "{header}.{}.sig",
            URL_SAFE_NO_PAD.encode(format!(r#"{{"exp":{past}}}"#))
        );
        assert!(!is_token_expired(&valid));
        assert!(is_token_expired(&stale));
    }
}
