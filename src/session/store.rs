use chrono::{DateTime, Utc};
use log::{info, warn};
use tokio::sync::watch;

use crate::api::ApiClient;
use crate::eligibility;
use crate::error::{Error, Result};
use crate::model::user::{AuthResponse, Credentials, DetailsUpdate, NewUser, PasswordUpdate};
use crate::model::{ElectionId, Identity};

use super::{AuthToken, Generation, SessionSlot, SessionStatus};

/// The session as seen by the rest of the application.
///
/// Cheap to clone; all clones share one [`SessionSlot`].
#[derive(Clone)]
pub struct SessionStore {
    api: ApiClient,
}

impl SessionStore {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// The API client sharing this store's session.
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    fn slot(&self) -> &SessionSlot {
        self.api.slot()
    }

    /// Sign in. The new session replaces any current one.
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity> {
        let ticket = self.slot().begin();
        let credentials = Credentials {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response = self.api.auth().login(&credentials).await?;
        self.establish(ticket, response).await
    }

    /// Create a voter account and sign in as it.
    pub async fn register(&self, new_user: &NewUser) -> Result<Identity> {
        new_user.validate()?;
        let ticket = self.slot().begin();
        let response = self.api.auth().register(new_user).await?;
        self.establish(ticket, response).await
    }

    async fn establish(&self, ticket: Generation, response: AuthResponse) -> Result<Identity> {
        let identity = response.user;
        let token = AuthToken::new(response.token);
        if let Err(e) = self.slot().establish(ticket, token.clone(), identity.clone()) {
            // Nobody will use this token; don't leave it live on the server.
            if let Err(revoke) = self.api.auth().logout(token).await {
                warn!("Could not revoke unused token: {revoke}");
            }
            return Err(e);
        }
        Ok(identity)
    }

    /// Sign out.
    ///
    /// The local session is gone before the server is told; a failing or slow server
    /// only costs a log line.
    pub async fn logout(&self) {
        let Some(token) = self.slot().clear() else {
            return;
        };
        match self.api.auth().logout(token).await {
            Ok(_) => info!("Server acknowledged logout"),
            Err(e) => warn!("Server logout failed, session cleared locally: {e}"),
        }
    }

    pub fn current_identity(&self) -> Option<Identity> {
        self.slot().identity()
    }

    pub fn status(&self) -> SessionStatus {
        self.slot().status()
    }

    /// Notifications of every sign-in, sign-out and identity change.
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.slot().subscribe()
    }

    /// Re-fetch the identity from the server.
    ///
    /// A rejected token ends the session and yields [`Error::Unauthorized`].
    pub async fn refresh(&self) -> Result<Identity> {
        let (token, ticket) = self.slot().credentials();
        if token.is_none() {
            return Err(Error::Unauthorized("Not signed in".to_string()));
        }
        let identity = self.api.auth().me().await?;
        self.slot().replace_identity(ticket, identity.clone())?;
        Ok(identity)
    }

    /// Change profile details, then pick up the server's view of the result.
    pub async fn update_details(&self, update: &DetailsUpdate) -> Result<Identity> {
        self.api.auth().update_details(update).await?;
        self.refresh().await
    }

    pub async fn update_password(&self, update: &PasswordUpdate) -> Result<()> {
        update.validate()?;
        self.api.auth().update_password(update).await?;
        Ok(())
    }

    /// Add an acknowledged vote to the cached history.
    ///
    /// Returns `false` if it was already there or nobody is signed in.
    pub fn record_vote(&self, election_id: &ElectionId, voted_at: DateTime<Utc>) -> bool {
        let mut recorded = false;
        self.slot().update_identity(|identity| {
            recorded = eligibility::record_vote(identity, election_id.clone(), voted_at);
        });
        recorded
    }
}
