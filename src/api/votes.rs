use log::warn;

use crate::error::{Error, Result};
use crate::model::vote::{VoteCheck, VoteRequest, VoteVerification};
use crate::model::{CandidateId, CastAck, ElectionId, ResultsPayload, VoteReceipt};

use super::{ApiClient, ApiRequest};

/// `/votes` endpoints.
pub struct VotesApi<'a> {
    client: &'a ApiClient,
}

impl<'a> VotesApi<'a> {
    pub(super) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Submit a ballot.
    ///
    /// Only an explicit `success: true` counts as an acknowledgment. A repeated ballot
    /// comes back as [`Error::Conflict`].
    pub async fn cast(&self, election: &ElectionId, candidate: &CandidateId) -> Result<VoteReceipt> {
        let request = ApiRequest::post("/votes").json(&VoteRequest {
            election_id: election.clone(),
            candidate_id: candidate.clone(),
        })?;
        let ack: CastAck = self
            .client
            .send(request)
            .await
            .map_err(Error::into_double_vote)?;

        if !ack.success {
            warn!("Vote in {election} was not acknowledged");
            return Err(Error::NotAcknowledged(
                ack.message
                    .unwrap_or_else(|| "The server did not confirm the vote".to_string()),
            ));
        }
        Ok(ack.data.unwrap_or_default())
    }

    /// Ask the server whether the current user has voted in `election`.
    pub async fn check(&self, election: &ElectionId) -> Result<VoteCheck> {
        self.client
            .send(ApiRequest::get("/votes/check").segment(election))
            .await
    }

    /// Published results. Refused until the election's results are published.
    pub async fn results(&self, election: &ElectionId) -> Result<ResultsPayload> {
        self.client
            .data(ApiRequest::get("/votes/results").segment(election))
            .await
    }

    /// The running count, for officers and admins.
    pub async fn live_results(&self, election: &ElectionId) -> Result<ResultsPayload> {
        self.client
            .data(ApiRequest::get("/votes/live-results").segment(election))
            .await
    }

    /// Look up a vote by the token on its receipt.
    pub async fn verify(&self, token: &str) -> Result<VoteVerification> {
        self.client
            .data(ApiRequest::get("/votes/verify").segment(token))
            .await
    }
}
