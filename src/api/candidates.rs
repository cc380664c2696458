use crate::error::Result;
use crate::model::candidate::{self, Candidate, CandidateSpec};
use crate::model::{Ack, CandidateId, ElectionId};

use super::{ApiClient, ApiRequest};

/// `/candidates` endpoints.
pub struct CandidatesApi<'a> {
    client: &'a ApiClient,
}

impl<'a> CandidatesApi<'a> {
    pub(super) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Every candidate of an election, including ones not yet on the ballot.
    pub async fn for_election(&self, election: &ElectionId) -> Result<Vec<Candidate>> {
        let request = ApiRequest::get("/candidates")
            .query(vec![("election".to_string(), election.to_string())]);
        self.client.data(request).await
    }

    /// The candidates a voter may choose between.
    pub async fn ballot(&self, election: &ElectionId) -> Result<Vec<Candidate>> {
        Ok(candidate::ballot(self.for_election(election).await?))
    }

    pub async fn get(&self, id: &CandidateId) -> Result<Candidate> {
        self.client
            .data(ApiRequest::get("/candidates").segment(id))
            .await
    }

    pub async fn create(&self, spec: &CandidateSpec) -> Result<Candidate> {
        spec.validate()?;
        let request = ApiRequest::post("/candidates").json(spec)?;
        self.client.data(request).await
    }

    pub async fn update(&self, id: &CandidateId, spec: &CandidateSpec) -> Result<Candidate> {
        spec.validate()?;
        let request = ApiRequest::put("/candidates").segment(id).json(spec)?;
        self.client.data(request).await
    }

    /// Approve a candidate, which also puts them on the ballot.
    pub async fn approve(&self, id: &CandidateId) -> Result<Candidate> {
        self.client
            .data(ApiRequest::put("/candidates").segment(id).segment("approve"))
            .await
    }

    pub async fn delete(&self, id: &CandidateId) -> Result<Ack> {
        self.client
            .send(ApiRequest::delete("/candidates").segment(id))
            .await
    }
}
