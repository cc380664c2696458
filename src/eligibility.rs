//! Whether the signed-in user may vote in a given election.
//!
//! The cached voting history answers quickly but can be stale; the server's check is
//! authoritative and is consulted whenever the cache has no record.

use chrono::{DateTime, Utc};
use log::{debug, warn};

use crate::casting::CastState;
use crate::error::{Error, Result};
use crate::model::{Election, ElectionId, Identity, VotingRecord};
use crate::session::SessionStore;

/// Why a vote would be refused.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Ineligibility {
    #[error("your account has not been verified yet")]
    NotVerified,
    #[error("you have already voted in this election")]
    AlreadyVoted,
}

/// Check an identity against an election using only local state.
pub fn check(identity: &Identity, election_id: &ElectionId) -> std::result::Result<(), Ineligibility> {
    if !identity.is_verified {
        return Err(Ineligibility::NotVerified);
    }
    if identity.has_voted_in(election_id) {
        return Err(Ineligibility::AlreadyVoted);
    }
    Ok(())
}

pub fn can_vote(identity: &Identity, election_id: &ElectionId) -> bool {
    check(identity, election_id).is_ok()
}

/// Append an acknowledged vote to the history. Returns `false` if already present.
pub fn record_vote(identity: &mut Identity, election_id: ElectionId, voted_at: DateTime<Utc>) -> bool {
    if identity.has_voted_in(&election_id) {
        return false;
    }
    identity.voting_history.push(VotingRecord {
        election_id,
        voted_at,
    });
    true
}

/// The eligibility checks that need the session, and possibly the server.
#[derive(Clone)]
pub struct VoteGuard {
    store: SessionStore,
}

impl VoteGuard {
    pub fn new(store: SessionStore) -> Self {
        Self { store }
    }

    fn identity(&self) -> Result<Identity> {
        self.store
            .current_identity()
            .ok_or_else(|| Error::Unauthorized("Sign in to vote".to_string()))
    }

    /// Local-only eligibility of the current user.
    pub fn can_vote(&self, election_id: &ElectionId) -> bool {
        self.store
            .current_identity()
            .map_or(false, |identity| can_vote(&identity, election_id))
    }

    /// Has the current user voted in this election?
    ///
    /// Answers from the cached history when it has a record; otherwise asks the server,
    /// and refreshes the cache if the server knows about a vote the cache missed.
    pub async fn has_voted(&self, election_id: &ElectionId) -> Result<bool> {
        if self.identity()?.has_voted_in(election_id) {
            return Ok(true);
        }

        let voted = self.store.api().votes().check(election_id).await?.has_voted;
        if voted {
            debug!("Server reports a vote in {election_id} missing from the local history");
            if let Err(e) = self.store.refresh().await {
                warn!("Could not refresh identity after vote check: {e}");
            }
        }
        Ok(voted)
    }

    /// Record an acknowledged vote in the session.
    pub fn record_vote(&self, election_id: &ElectionId, voted_at: DateTime<Utc>) -> bool {
        self.store.record_vote(election_id, voted_at)
    }
}

/// What the "Vote Now" control should show.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum VoteAffordance {
    VoteNow,
    /// A ballot is in flight.
    Submitting,
    AlreadyVoted { results_available: bool },
    NotVerified,
    /// The election is not accepting votes.
    NotOpen,
}

impl VoteAffordance {
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::VoteNow)
    }
}

/// Decide the vote control for `identity` in `election`.
///
/// `has_voted` is the outcome of [`VoteGuard::has_voted`].
pub fn affordance(
    election: &Election,
    identity: &Identity,
    has_voted: bool,
    cast: &CastState,
) -> VoteAffordance {
    if matches!(cast, CastState::Pending) {
        return VoteAffordance::Submitting;
    }
    if has_voted || identity.has_voted_in(&election.id) || matches!(cast, CastState::Confirmed(_))
    {
        return VoteAffordance::AlreadyVoted {
            results_available: election.results_published,
        };
    }
    if !election.accepts_votes() {
        return VoteAffordance::NotOpen;
    }
    if !identity.is_verified {
        return VoteAffordance::NotVerified;
    }
    VoteAffordance::VoteNow
}
