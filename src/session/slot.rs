use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use log::{error, info, warn};
use tokio::sync::watch;

use crate::error::{Error, Result};
use crate::model::Identity;
use crate::storage::{SessionStorage, TOKEN_KEY, USER_KEY};

use super::AuthToken;

/// Monotonic counter bumped by every change of who is signed in.
///
/// Work that started under an older generation must not overwrite the slot.
pub type Generation = u64;

/// What subscribers see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    /// Nobody is signed in.
    Anonymous,
    /// Signed in as this identity.
    Authenticated(Identity),
    /// The server (or the token's own expiry) ended the session; the user must sign in again.
    Expired,
}

#[derive(Debug)]
struct Session {
    token: AuthToken,
    identity: Identity,
}

#[derive(Debug)]
struct SlotState {
    generation: Generation,
    session: Option<Session>,
}

/// The single mutable home of the token and cached identity, mirrored to storage.
pub struct SessionSlot {
    state: Mutex<SlotState>,
    storage: Box<dyn SessionStorage>,
    status: watch::Sender<SessionStatus>,
}

impl SessionSlot {
    /// Open the slot, restoring any session left in `storage`.
    ///
    /// A half-written or unparseable session is discarded, and a restored token that
    /// has already expired leaves the slot in the [`SessionStatus::Expired`] state.
    pub fn open(storage: impl SessionStorage + 'static) -> Result<Self> {
        let (session, status) = match restore(&storage)? {
            Some(session) if session.token.is_expired_at(Utc::now()) => {
                info!("Stored session has expired, discarding it");
                wipe(&storage);
                (None, SessionStatus::Expired)
            }
            Some(session) => {
                let status = SessionStatus::Authenticated(session.identity.clone());
                (Some(session), status)
            }
            None => (None, SessionStatus::Anonymous),
        };
        let (status, _) = watch::channel(status);

        Ok(Self {
            state: Mutex::new(SlotState {
                generation: 0,
                session,
            }),
            storage: Box::new(storage),
            status,
        })
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The current generation, without changing it.
    pub fn generation(&self) -> Generation {
        self.lock().generation
    }

    /// Start a sign-in. Any sign-in already in flight is superseded.
    pub fn begin(&self) -> Generation {
        let mut state = self.lock();
        state.generation += 1;
        state.generation
    }

    /// The token to send and the generation it belongs to.
    pub fn credentials(&self) -> (Option<AuthToken>, Generation) {
        let state = self.lock();
        let token = state.session.as_ref().map(|s| s.token.clone());
        (token, state.generation)
    }

    pub fn token(&self) -> Option<AuthToken> {
        self.lock().session.as_ref().map(|s| s.token.clone())
    }

    pub fn identity(&self) -> Option<Identity> {
        self.lock().session.as_ref().map(|s| s.identity.clone())
    }

    /// The latest status, as subscribers would see it.
    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    /// Finish the sign-in started at `ticket`, unless something else happened since.
    pub fn establish(&self, ticket: Generation, token: AuthToken, identity: Identity) -> Result<()> {
        let mut state = self.lock();
        if state.generation != ticket {
            warn!("Discarding sign-in for {}: session changed while it was in flight", identity.email);
            return Err(Error::Unauthorized(
                "Session changed while signing in".to_string(),
            ));
        }

        if let Err(e) = self.persist(&token, &identity) {
            wipe(self.storage.as_ref());
            return Err(e);
        }
        state.generation += 1;
        state.session = Some(Session {
            token,
            identity: identity.clone(),
        });
        info!("Signed in as {} ({})", identity.email, identity.role);
        self.status.send_replace(SessionStatus::Authenticated(identity));
        Ok(())
    }

    /// Replace the cached identity after a refresh that started at `ticket`.
    pub fn replace_identity(&self, ticket: Generation, identity: Identity) -> Result<()> {
        let mut state = self.lock();
        let current = state.generation == ticket;
        let session = match state.session.as_mut() {
            Some(session) if current => session,
            _ => {
                return Err(Error::Unauthorized(
                    "Session changed while refreshing".to_string(),
                ))
            }
        };

        self.storage
            .set(USER_KEY, &serde_json::to_string(&identity)?)?;
        session.identity = identity.clone();
        self.status.send_replace(SessionStatus::Authenticated(identity));
        Ok(())
    }

    /// Apply a local change to the cached identity.
    ///
    /// The in-memory copy is updated even if it cannot be persisted; the next refresh
    /// overwrites it with the server's view anyway. Returns the updated identity.
    pub fn update_identity(&self, change: impl FnOnce(&mut Identity)) -> Option<Identity> {
        let mut state = self.lock();
        let session = state.session.as_mut()?;
        change(&mut session.identity);
        let identity = session.identity.clone();

        match serde_json::to_string(&identity) {
            Ok(json) => {
                if let Err(e) = self.storage.set(USER_KEY, &json) {
                    error!("Failed to persist identity: {e}");
                }
            }
            Err(e) => error!("Failed to encode identity: {e}"),
        }
        self.status
            .send_replace(SessionStatus::Authenticated(identity.clone()));
        Some(identity)
    }

    /// Sign out locally. Always succeeds; returns the token that was in use, if any.
    pub fn clear(&self) -> Option<AuthToken> {
        let mut state = self.lock();
        state.generation += 1;
        let session = state.session.take();
        wipe(self.storage.as_ref());
        if let Some(session) = &session {
            info!("Signed out {}", session.identity.email);
        }
        self.status.send_replace(SessionStatus::Anonymous);
        session.map(|s| s.token)
    }

    /// End the session because the server rejected its token.
    ///
    /// Only applies if the slot still holds the session the rejected request was sent
    /// under (`seen`). Returns whether anything was cleared.
    pub fn invalidate(&self, seen: Generation) -> bool {
        let mut state = self.lock();
        if state.generation != seen || state.session.is_none() {
            return false;
        }
        state.generation += 1;
        state.session = None;
        wipe(self.storage.as_ref());
        warn!("Session expired, re-authentication required");
        self.status.send_replace(SessionStatus::Expired);
        true
    }

    fn persist(&self, token: &AuthToken, identity: &Identity) -> Result<()> {
        let user = serde_json::to_string(identity)?;
        self.storage.set(TOKEN_KEY, token.as_str())?;
        self.storage.set(USER_KEY, &user)?;
        Ok(())
    }
}

/// Read a previously persisted session.
fn restore(storage: &dyn SessionStorage) -> Result<Option<Session>> {
    let token = storage.get(TOKEN_KEY)?;
    let user = storage.get(USER_KEY)?;

    match (token, user) {
        (Some(token), Some(user)) => match serde_json::from_str::<Identity>(&user) {
            Ok(identity) => Ok(Some(Session {
                token: AuthToken::new(token),
                identity,
            })),
            Err(e) => {
                warn!("Discarding unreadable stored identity: {e}");
                wipe(storage);
                Ok(None)
            }
        },
        (None, None) => Ok(None),
        _ => {
            warn!("Discarding incomplete stored session");
            wipe(storage);
            Ok(None)
        }
    }
}

/// Remove both keys, logging rather than failing.
fn wipe(storage: &dyn SessionStorage) {
    for key in [TOKEN_KEY, USER_KEY] {
        if let Err(e) = storage.remove(key) {
            error!("Failed to remove stored {key}: {e}");
        }
    }
}
