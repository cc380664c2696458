use crate::error::Result;
use crate::model::{Ack, Election, ElectionId, ElectionSpec};

use super::{ApiClient, ApiRequest};

/// `/elections` endpoints.
pub struct ElectionsApi<'a> {
    client: &'a ApiClient,
}

impl<'a> ElectionsApi<'a> {
    pub(super) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn all(&self) -> Result<Vec<Election>> {
        self.client.data(ApiRequest::get("/elections")).await
    }

    /// Elections currently open for voting.
    pub async fn active(&self) -> Result<Vec<Election>> {
        self.client.data(ApiRequest::get("/elections/active")).await
    }

    pub async fn get(&self, id: &ElectionId) -> Result<Election> {
        self.client
            .data(ApiRequest::get("/elections").segment(id))
            .await
    }

    /// Create a draft election.
    pub async fn create(&self, spec: &ElectionSpec) -> Result<Election> {
        spec.validate()?;
        let request = ApiRequest::post("/elections").json(spec)?;
        self.client.data(request).await
    }

    /// Edit a draft. Anything past draft is refused without asking the server.
    pub async fn update(&self, election: &Election, spec: &ElectionSpec) -> Result<Election> {
        election.ensure_editable()?;
        spec.validate()?;
        let request = ApiRequest::put("/elections").segment(&election.id).json(spec)?;
        self.client.data(request).await
    }

    pub async fn delete(&self, id: &ElectionId) -> Result<Ack> {
        self.client
            .send(ApiRequest::delete("/elections").segment(id))
            .await
    }

    /// Make a closed election's results visible to voters.
    pub async fn publish_results(&self, election: &Election) -> Result<Ack> {
        election.ensure_publishable()?;
        self.client
            .send(
                ApiRequest::put("/elections")
                    .segment(&election.id)
                    .segment("publish-results"),
            )
            .await
    }
}
