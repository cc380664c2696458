//! Submitting a ballot: one at a time, bounded in time, and only counted once the
//! server says so.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use log::{info, warn};

use crate::eligibility::{self, Ineligibility, VoteGuard};
use crate::error::{Error, Result};
use crate::model::{CandidateId, ElectionId, VoteReceipt};
use crate::session::SessionStore;

/// Where a ballot submission stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CastState {
    Idle,
    Pending,
    Confirmed(VoteReceipt),
    Failed {
        message: String,
        retryable: bool,
        /// The ballot may have reached the server even though no acknowledgment did.
        outcome_unknown: bool,
    },
}

impl CastState {
    fn from_outcome(outcome: &Result<VoteReceipt>) -> Self {
        match outcome {
            Ok(receipt) => Self::Confirmed(receipt.clone()),
            Err(e) => Self::Failed {
                message: e.to_string(),
                retryable: e.is_retryable(),
                outcome_unknown: matches!(e, Error::Timeout(_) | Error::Network(_)),
            },
        }
    }
}

/// Casts the current user's ballot in one election.
///
/// Clones share the same state, so a second submission from anywhere is refused while
/// one is pending.
#[derive(Clone)]
pub struct VoteCaster {
    store: SessionStore,
    election_id: ElectionId,
    timeout: Duration,
    state: Arc<Mutex<CastState>>,
}

impl VoteCaster {
    pub fn new(store: SessionStore, election_id: ElectionId, timeout: Duration) -> Self {
        Self {
            store,
            election_id,
            timeout,
            state: Arc::new(Mutex::new(CastState::Idle)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CastState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> CastState {
        self.lock().clone()
    }

    pub fn election_id(&self) -> &ElectionId {
        &self.election_id
    }

    /// Cast a vote for `candidate_id`.
    ///
    /// The vote is added to the session's history only after an explicit acknowledgment.
    pub async fn cast(&self, candidate_id: &CandidateId) -> Result<VoteReceipt> {
        let identity = self
            .store
            .current_identity()
            .ok_or_else(|| Error::Unauthorized("Sign in to vote".to_string()))?;
        eligibility::check(&identity, &self.election_id).map_err(Error::Ineligible)?;

        let submission = self.begin()?;
        let outcome = self.submit(candidate_id, submission.after_unknown).await;
        submission.settle(&outcome);
        outcome
    }

    fn begin(&self) -> Result<Submission> {
        let mut state = self.lock();
        let after_unknown = match &*state {
            CastState::Pending => return Err(Error::InFlight),
            CastState::Confirmed(_) => return Err(Error::Ineligible(Ineligibility::AlreadyVoted)),
            CastState::Failed {
                outcome_unknown, ..
            } => *outcome_unknown,
            CastState::Idle => false,
        };
        *state = CastState::Pending;
        Ok(Submission {
            state: self.state.clone(),
            after_unknown,
            settled: false,
        })
    }

    async fn submit(&self, candidate_id: &CandidateId, after_unknown: bool) -> Result<VoteReceipt> {
        // The previous attempt may have landed; never send a second ballot blind.
        if after_unknown && VoteGuard::new(self.store.clone()).has_voted(&self.election_id).await? {
            info!("Earlier ballot in {} was recorded after all", self.election_id);
            return Err(Error::Conflict(
                "Your earlier vote was recorded".to_string(),
            ));
        }

        let votes = self.store.api().votes();
        let cast = votes.cast(&self.election_id, candidate_id);
        let receipt = match tokio::time::timeout(self.timeout, cast).await {
            Ok(Ok(receipt)) => receipt,
            Ok(Err(e @ Error::Conflict(_))) => {
                // Bring the history in line with what the server already knows.
                if let Err(refresh) = self.store.refresh().await {
                    warn!("Could not refresh identity after rejected ballot: {refresh}");
                }
                return Err(e);
            }
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                warn!(
                    "No acknowledgment for ballot in {} within {:?}",
                    self.election_id, self.timeout
                );
                return Err(Error::Timeout(self.timeout));
            }
        };

        let voted_at = receipt.voted_at.unwrap_or_else(Utc::now);
        self.store.record_vote(&self.election_id, voted_at);
        info!("Ballot in {} acknowledged", self.election_id);
        Ok(receipt)
    }
}

/// A pending submission. Dropping it unsettled leaves the caster retryable.
struct Submission {
    state: Arc<Mutex<CastState>>,
    after_unknown: bool,
    settled: bool,
}

impl Submission {
    fn settle(mut self, outcome: &Result<VoteReceipt>) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = CastState::from_outcome(outcome);
        self.settled = true;
    }
}

impl Drop for Submission {
    fn drop(&mut self) {
        if !self.settled {
            *self.state.lock().unwrap_or_else(PoisonError::into_inner) = CastState::Failed {
                message: "Vote submission was interrupted".to_string(),
                retryable: true,
                outcome_unknown: true,
            };
        }
    }
}
