//!
//! # Client Session Controller
//!
//! The client-side half of the session lifecycle. A `SessionController` is a
//! cloneable handle around a single shared session state; UI code reads the
//! state through accessors and mutates it only through the operations defined
//! here, mirroring how a view-tree-wide identity context behaves in a browser
//! frontend.
//!
//! On startup the state is `Resolving` until the one-shot [`SessionController::resolve`]
//! call answers "is there a valid session?". Every mutating operation advances
//! an internal epoch and a completion only lands if its epoch is still
//! current, so a slow `login` response cannot overwrite the state a later
//! `logout` produced: the latest operation wins deterministically.

pub mod api;
pub mod guard;

use std::sync::{Arc, Mutex};

use crate::models::UserIdentity;

pub use api::{ApiError, AuthApi, HttpAuthApi};
pub use guard::{route_decision, RouteDecision};

/// The client's view of the session.
///
/// `Resolving` is the loading state: it holds only during the initial
/// resolution attempt. An identity is exposed only in `Authenticated`.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Resolving,
    Authenticated(UserIdentity),
    Anonymous,
}

impl SessionState {
    pub fn identity(&self) -> Option<&UserIdentity> {
        match self {
            SessionState::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Resolving)
    }
}

struct Inner {
    state: SessionState,
    epoch: u64,
    resolved: bool,
}

/// Shared handle over the client session state machine.
pub struct SessionController<A> {
    api: Arc<A>,
    inner: Arc<Mutex<Inner>>,
}

impl<A> Clone for SessionController<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: AuthApi + Send + Sync> SessionController<A> {
    pub fn new(api: A) -> Self {
        Self {
            api: Arc::new(api),
            inner: Arc::new(Mutex::new(Inner {
                state: SessionState::Resolving,
                epoch: 0,
                resolved: false,
            })),
        }
    }

    /// Returns a snapshot of the current session state.
    pub fn state(&self) -> SessionState {
        self.inner
            .lock()
            .expect("session state lock poisoned")
            .state
            .clone()
    }

    /// Returns the authenticated identity, if any.
    pub fn identity(&self) -> Option<UserIdentity> {
        self.state().identity().cloned()
    }

    fn begin(&self) -> u64 {
        let mut inner = self.inner.lock().expect("session state lock poisoned");
        inner.epoch += 1;
        inner.epoch
    }

    fn finish(&self, epoch: u64, state: SessionState) {
        let mut inner = self.inner.lock().expect("session state lock poisoned");
        if inner.epoch == epoch {
            inner.state = state;
        }
    }

    /// Initial session resolution: asks the server whether the cookie (if
    /// any) still names a valid session. Single-shot per controller; repeat
    /// calls are no-ops and there is no automatic retry. Any failure,
    /// including plain 401, lands in `Anonymous`.
    pub async fn resolve(&self) {
        let epoch = {
            let mut inner = self.inner.lock().expect("session state lock poisoned");
            if inner.resolved {
                return;
            }
            inner.resolved = true;
            inner.epoch += 1;
            inner.epoch
        };

        match self.api.profile().await {
            Ok(identity) => self.finish(epoch, SessionState::Authenticated(identity)),
            Err(err) => {
                log::debug!("session resolution failed: {}", err);
                self.finish(epoch, SessionState::Anonymous);
            }
        }
    }

    /// Attempts a login. On success the returned identity is adopted directly
    /// (no extra profile round trip). On failure the state is unchanged and
    /// `false` is returned; expected auth failures never panic.
    pub async fn login(&self, email: &str, password: &str) -> bool {
        let epoch = self.begin();
        match self.api.login(email, password).await {
            Ok(identity) => {
                self.finish(epoch, SessionState::Authenticated(identity));
                true
            }
            Err(err) => {
                log::debug!("login failed: {}", err);
                false
            }
        }
    }

    /// Registers a new account; symmetric to [`SessionController::login`].
    pub async fn register(&self, username: &str, email: &str, password: &str) -> bool {
        let epoch = self.begin();
        match self.api.register(username, email, password).await {
            Ok(identity) => {
                self.finish(epoch, SessionState::Authenticated(identity));
                true
            }
            Err(err) => {
                log::debug!("registration failed: {}", err);
                false
            }
        }
    }

    /// Logs out. The local state clears to `Anonymous` before the server is
    /// even contacted; the cookie-clearing request is best-effort and a
    /// network failure does not resurrect the session. A user can always log
    /// out from their own perspective.
    pub async fn logout(&self) {
        {
            let mut inner = self.inner.lock().expect("session state lock poisoned");
            inner.epoch += 1;
            inner.state = SessionState::Anonymous;
        }

        if let Err(err) = self.api.logout().await {
            log::debug!("logout request failed (session cleared locally): {}", err);
        }
    }

    /// Updates username/email; on success the held identity is refreshed.
    pub async fn update_profile(&self, username: &str, email: &str) -> bool {
        let epoch = self.begin();
        match self.api.update_profile(username, email).await {
            Ok(identity) => {
                self.finish(epoch, SessionState::Authenticated(identity));
                true
            }
            Err(err) => {
                log::debug!("profile update failed: {}", err);
                false
            }
        }
    }

    /// Changes the password. Session state is not affected either way.
    pub async fn change_password(&self, old_password: &str, new_password: &str) -> bool {
        match self.api.change_password(old_password, new_password).await {
            Ok(()) => true,
            Err(err) => {
                log::debug!("password change failed: {}", err);
                false
            }
        }
    }
}
