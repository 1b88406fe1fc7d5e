use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Deserialize;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    error::SessionError,
    models::{AuthEvent, Role, Session, SessionUser},
};

/// Buffered auth events per subscriber before the slowest one starts lagging.
const EVENT_CHANNEL_CAPACITY: usize = 16;

// 1. SessionProvider Contract
/// SessionProvider
///
/// Abstract contract for the hosted auth service. The session gate only talks to
/// this trait, so the real GoTrue client and the in-memory mock are interchangeable.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Returns the current session. A signed-out state is `Ok` with no user;
    /// `Err` is reserved for provider or transport failures.
    async fn get_session(&self) -> Result<Session, SessionError>;

    /// Opens a subscription to auth-state changes. It stays live until
    /// `AuthSubscription::unsubscribe` is called or it is dropped.
    fn on_auth_state_change(&self) -> AuthSubscription;

    /// Ends the current session.
    async fn sign_out(&self) -> Result<(), SessionError>;
}

/// SessionProviderState
///
/// The shared handle type used by the gate and by anything that owns a provider.
pub type SessionProviderState = Arc<dyn SessionProvider>;

/// AuthSubscription
///
/// Receiving end of a provider's auth-event stream.
pub struct AuthSubscription {
    receiver: broadcast::Receiver<AuthEvent>,
}

impl AuthSubscription {
    pub fn new(receiver: broadcast::Receiver<AuthEvent>) -> Self {
        Self { receiver }
    }

    /// Waits for the next event. Returns `None` once the provider is gone.
    pub async fn next(&mut self) -> Option<AuthEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "auth subscription lagged, events dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Detaches from the provider. Events sent afterwards are not delivered.
    pub fn unsubscribe(self) {
        tracing::debug!("auth subscription closed");
    }
}

// 2. The Real Implementation (Supabase GoTrue)
/// GoTrueUser
///
/// Minimal shape of `GET /auth/v1/user`.
#[derive(Deserialize)]
struct GoTrueUser {
    id: Uuid,
    email: Option<String>,
    email_confirmed_at: Option<DateTime<Utc>>,
    user_metadata: Option<GoTrueUserMetadata>,
}

#[derive(Deserialize)]
struct GoTrueUserMetadata {
    role: Option<String>,
}

impl From<GoTrueUser> for SessionUser {
    fn from(user: GoTrueUser) -> Self {
        let role = user
            .user_metadata
            .as_ref()
            .and_then(|meta| meta.role.as_deref());
        SessionUser {
            id: user.id,
            email: user.email,
            role: Role::from_metadata(role),
            email_verified: user.email_confirmed_at.is_some(),
        }
    }
}

/// SupabaseSessionProvider
///
/// Talks to the Supabase auth REST API with reqwest. The access token is installed
/// with `sign_in_with_token`; every call sends the project's anon key as `apikey`.
pub struct SupabaseSessionProvider {
    client: reqwest::Client,
    auth_url: String,
    anon_key: String,
    access_token: RwLock<Option<String>>,
    events: broadcast::Sender<AuthEvent>,
}

impl SupabaseSessionProvider {
    pub fn new(supabase_url: &str, anon_key: &str) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            client: reqwest::Client::new(),
            auth_url: format!("{}/auth/v1", supabase_url.trim_end_matches('/')),
            anon_key: anon_key.to_string(),
            access_token: RwLock::new(None),
            events,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.supabase_url, &config.supabase_anon_key)
    }

    /// sign_in_with_token
    ///
    /// Resolves the user behind `token`, installs the token, and broadcasts
    /// SIGNED_IN to every subscriber.
    pub async fn sign_in_with_token(&self, token: String) -> Result<Session, SessionError> {
        let user = self.fetch_user(&token).await?;
        *self.access_token.write() = Some(token);

        let session = Session::signed_in(user);
        tracing::info!(role = ?session.user.as_ref().map(|u| u.role), "session established");
        let _ = self.events.send(AuthEvent::signed_in(session.clone()));
        Ok(session)
    }

    async fn fetch_user(&self, token: &str) -> Result<SessionUser, SessionError> {
        let response = self
            .client
            .get(format!("{}/user", self.auth_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SessionError::Status(response.status().as_u16()));
        }

        let user = response.json::<GoTrueUser>().await?;
        Ok(user.into())
    }
}

#[async_trait]
impl SessionProvider for SupabaseSessionProvider {
    async fn get_session(&self) -> Result<Session, SessionError> {
        let Some(token) = self.access_token.read().clone() else {
            return Ok(Session::anonymous());
        };

        match self.fetch_user(&token).await {
            Ok(user) => Ok(Session::signed_in(user)),
            // An expired or revoked token is a signed-out state, not a provider failure.
            Err(SessionError::Status(401)) => {
                tracing::debug!("access token rejected, treating session as signed out");
                *self.access_token.write() = None;
                Ok(Session::anonymous())
            }
            Err(e) => Err(e),
        }
    }

    fn on_auth_state_change(&self) -> AuthSubscription {
        AuthSubscription::new(self.events.subscribe())
    }

    async fn sign_out(&self) -> Result<(), SessionError> {
        let token = self.access_token.write().take();

        let remote = match token {
            Some(token) => self
                .client
                .post(format!("{}/logout", self.auth_url))
                .header("apikey", &self.anon_key)
                .bearer_auth(token)
                .send()
                .await
                .map_err(SessionError::from)
                .and_then(|response| match response.status() {
                    status if status.is_success() => Ok(()),
                    status => Err(SessionError::Status(status.as_u16())),
                }),
            None => Ok(()),
        };

        // The local session is gone even if the remote revoke failed.
        let _ = self.events.send(AuthEvent::signed_out());
        remote
    }
}

// 3. The Mock Implementation (For Unit Tests)
/// MockSessionProvider
///
/// Scripted provider for tests. `sign_out` is recorded and clears the session but
/// does not broadcast; tests push events explicitly with `emit`.
pub struct MockSessionProvider {
    session: Mutex<Session>,
    /// When true, `get_session` returns a simulated transport failure.
    pub should_fail: bool,
    /// Artificial latency for `get_session`, to exercise in-flight checks.
    pub delay: Option<Duration>,
    sign_out_calls: AtomicUsize,
    events: broadcast::Sender<AuthEvent>,
}

impl MockSessionProvider {
    pub fn new(session: Session) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            session: Mutex::new(session),
            should_fail: false,
            delay: None,
            sign_out_calls: AtomicUsize::new(0),
            events,
        }
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::new(Session::anonymous())
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Broadcasts `event` to every live subscription; returns how many received it.
    pub fn emit(&self, event: AuthEvent) -> usize {
        self.events.send(event).unwrap_or(0)
    }

    pub fn set_session(&self, session: Session) {
        *self.session.lock() = session;
    }

    pub fn sign_out_calls(&self) -> usize {
        self.sign_out_calls.load(Ordering::SeqCst)
    }

    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }
}

#[async_trait]
impl SessionProvider for MockSessionProvider {
    async fn get_session(&self) -> Result<Session, SessionError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.should_fail {
            return Err(SessionError::Transport(
                "Mock Session Error: Simulation requested".to_string(),
            ));
        }
        Ok(self.session.lock().clone())
    }

    fn on_auth_state_change(&self) -> AuthSubscription {
        AuthSubscription::new(self.events.subscribe())
    }

    async fn sign_out(&self) -> Result<(), SessionError> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        *self.session.lock() = Session::anonymous();
        Ok(())
    }
}
