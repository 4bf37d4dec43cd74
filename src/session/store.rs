// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session store: one per client instance, shared by reference.
//!
//! Lifecycle is `init` (synchronous read of the slot), `observe` (follow
//! storage events from other contexts) and `dispose`. The latest
//! [`SessionState`] is published on a `watch` channel so consumers always
//! see a last-write-wins snapshot.

use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::DEFAULT_SESSION_TTL_SECS;
use crate::error::AuthError;
use crate::models::session::{Session, SessionState, SESSION_KEY};
use crate::services::cognito::{CognitoClient, TokenSet};
use crate::services::id_token::{decode_claims, Claims};
use crate::session::signout::{Navigator, SignOutNotifier};
use crate::session::storage::{SessionStorage, StorageEvent};

/// Outcome of a completed sign-in.
#[derive(Debug, Clone)]
pub struct SignIn {
    pub tokens: TokenSet,
    /// `None` when the ID token could not be decoded.
    pub claims: Option<Claims>,
    pub session: Session,
}

pub struct SessionStore {
    storage: Arc<dyn SessionStorage>,
    state: watch::Sender<SessionState>,
    observer: Mutex<Option<JoinHandle<()>>>,
    /// Slot contents a failed sign-out could not remove. Read as empty.
    signed_out: Mutex<Option<String>>,
    session_ttl: Duration,
}

impl SessionStore {
    /// Read the slot and build the store. Never fails.
    pub fn init(storage: Arc<dyn SessionStorage>) -> Arc<Self> {
        Self::init_with_ttl(storage, Duration::seconds(DEFAULT_SESSION_TTL_SECS))
    }

    /// Like [`SessionStore::init`] with a custom lifetime for sessions
    /// whose ID token has no `exp`.
    pub fn init_with_ttl(storage: Arc<dyn SessionStorage>, session_ttl: Duration) -> Arc<Self> {
        let initial = read_session(storage.as_ref(), None);
        let (state, _) = watch::channel(initial);

        Arc::new(Self {
            storage,
            state,
            observer: Mutex::new(None),
            signed_out: Mutex::new(None),
            session_ttl,
        })
    }

    /// Follow storage events. Events for the session slot (or a full
    /// clear) trigger a re-read; everything else is ignored. The slot is
    /// also re-read when the published session expires.
    ///
    /// Does nothing outside a tokio runtime. Replaces any previous
    /// observer.
    pub fn observe(self: &Arc<Self>, mut events: broadcast::Receiver<StorageEvent>) {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                tracing::warn!("No async runtime, not observing storage events");
                return;
            }
        };
        let store: Weak<Self> = Arc::downgrade(self);

        let handle = runtime.spawn(async move {
            loop {
                let Some(deadline) = store.upgrade().map(|this| this.expiry_deadline()) else {
                    break;
                };

                let relevant = tokio::select! {
                    event = events.recv() => match event {
                        Ok(event) => event.touches(SESSION_KEY),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::debug!(skipped, "Storage observer lagged, re-reading session");
                            true
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = sleep_until(deadline) => {
                        tracing::debug!("Published session expired, re-reading");
                        true
                    }
                };

                let Some(this) = store.upgrade() else {
                    break;
                };
                if relevant {
                    this.refresh();
                }
            }
        });

        let mut observer = self.observer.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = observer.replace(handle) {
            previous.abort();
        }
    }

    /// Stop observing storage events.
    pub fn dispose(&self) {
        let mut observer = self.observer.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = observer.take() {
            handle.abort();
        }
    }

    /// Read the session slot now. Never fails: anything unreadable,
    /// unparseable or expired is `Unauthenticated`.
    pub fn get_current_session(&self) -> SessionState {
        let signed_out = self.signed_out.lock().unwrap_or_else(|e| e.into_inner());
        read_session(self.storage.as_ref(), signed_out.as_deref())
    }

    /// Last published state, without touching storage. A published
    /// session that has since expired is replaced by `Unauthenticated`.
    pub fn snapshot(&self) -> SessionState {
        let current = self.state.borrow().clone();
        if current
            .session
            .as_ref()
            .is_some_and(|session| session.is_expired(Utc::now()))
        {
            let expired = SessionState::unauthenticated();
            self.publish(expired.clone());
            return expired;
        }
        current
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Re-read the slot and publish the result if it changed.
    pub fn refresh(&self) -> SessionState {
        let current = self.get_current_session();
        self.publish(current.clone());
        current
    }

    /// Build a session from `claims` and overwrite the slot with it.
    ///
    /// A write failure is an error and publishes nothing: an unsaved
    /// session is a failed sign-in. A token whose `exp` has already passed
    /// is stored but reads as `Unauthenticated`, like any expired session.
    pub fn materialize_session(
        &self,
        tokens: &TokenSet,
        claims: Option<&Claims>,
    ) -> Result<Session, AuthError> {
        let now = Utc::now();
        let session = Session::from_claims(claims, now, self.session_ttl);

        let json = serde_json::to_string(&session)
            .map_err(|e| AuthError::Storage(format!("Failed to serialize session: {}", e)))?;
        self.storage.set(SESSION_KEY, &json)?;
        self.signed_out
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();

        tracing::info!(
            user_id = session.user_id().unwrap_or("<degraded>"),
            expires = %session.expires,
            has_refresh_token = tokens.refresh_token.is_some(),
            "Session stored"
        );

        let state = session_state(session.clone(), now);
        if state.session.is_none() {
            tracing::warn!(expires = %session.expires, "Stored session is already expired");
        }
        self.publish(state);
        Ok(session)
    }

    /// Exchange `code`, decode the ID token and store the session.
    ///
    /// Undecodable claims do not fail the sign-in; the session is stored
    /// without a user ID.
    pub async fn sign_in(
        &self,
        client: &CognitoClient,
        code: &str,
        redirect_uri: &str,
    ) -> Result<SignIn, AuthError> {
        let tokens = client.exchange_code(code, redirect_uri).await?;

        let claims = match decode_claims(&tokens.id_token) {
            Ok(claims) => Some(claims),
            Err(e) => {
                tracing::warn!(error = %e, "ID token unreadable, storing degraded session");
                None
            }
        };

        let session = self.materialize_session(&tokens, claims.as_ref())?;
        Ok(SignIn {
            tokens,
            claims,
            session,
        })
    }

    /// Sign out locally. Never fails.
    ///
    /// The server is notified in a detached task whose outcome is only
    /// logged. Local state is cleared and the navigator sent to `/`
    /// regardless of what happens on the network. If storage cannot be
    /// cleared, the leftover session is ignored by this store until a new
    /// one is written.
    pub fn sign_out(&self, notifier: Option<&SignOutNotifier>, navigator: &dyn Navigator) {
        if let Some(notifier) = notifier {
            notifier.notify_detached();
        }

        let removed = match self.storage.clear() {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to clear storage, removing session slot");
                match self.storage.remove(SESSION_KEY) {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to remove session slot");
                        false
                    }
                }
            }
        };

        let leftover = if removed {
            None
        } else {
            self.storage.get(SESSION_KEY).ok().flatten()
        };
        *self.signed_out.lock().unwrap_or_else(|e| e.into_inner()) = leftover;

        self.publish(SessionState::unauthenticated());
        tracing::info!("Signed out");

        navigator.navigate("/");
    }

    /// When the published session expires, if there is one.
    fn expiry_deadline(&self) -> Option<Instant> {
        let state = self.state.borrow();
        let expires = DateTime::parse_from_rfc3339(&state.session.as_ref()?.expires).ok()?;
        let remaining = (expires.with_timezone(&Utc) - Utc::now())
            .to_std()
            .unwrap_or_default();
        Instant::now().checked_add(remaining)
    }

    fn publish(&self, next: SessionState) {
        self.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        self.dispose();
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn session_state(mut session: Session, now: DateTime<Utc>) -> SessionState {
    if session.is_expired(now) {
        tracing::debug!(expires = %session.expires, "Stored session expired");
        return SessionState::unauthenticated();
    }

    session.backfill_username();
    SessionState::authenticated(session)
}

fn read_session(storage: &dyn SessionStorage, signed_out: Option<&str>) -> SessionState {
    let raw = match storage.get(SESSION_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return SessionState::unauthenticated(),
        Err(e) => {
            tracing::warn!(error = %e, "Session slot unreadable");
            return SessionState::unauthenticated();
        }
    };

    if signed_out == Some(raw.as_str()) {
        return SessionState::unauthenticated();
    }

    match serde_json::from_str(&raw) {
        Ok(session) => session_state(session, Utc::now()),
        Err(e) => {
            tracing::debug!(error = %e, "Stored session is not valid JSON");
            SessionState::unauthenticated()
        }
    }
}
