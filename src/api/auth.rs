use crate::error::Result;
use crate::model::user::{AuthResponse, Credentials, DetailsUpdate, NewUser, PasswordUpdate};
use crate::model::{Ack, Identity};
use crate::session::AuthToken;

use super::{ApiClient, ApiRequest};

/// `/auth` endpoints. Use [`crate::session::SessionStore`] to sign in and out; these
/// only talk to the server.
pub struct AuthApi<'a> {
    client: &'a ApiClient,
}

impl<'a> AuthApi<'a> {
    pub(super) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<AuthResponse> {
        let request = ApiRequest::post("/auth/login").json(credentials)?.anonymous();
        self.client.send(request).await
    }

    pub async fn register(&self, new_user: &NewUser) -> Result<AuthResponse> {
        let request = ApiRequest::post("/auth/register").json(new_user)?.anonymous();
        self.client.send(request).await
    }

    pub async fn me(&self) -> Result<Identity> {
        self.client.data(ApiRequest::get("/auth/me")).await
    }

    /// Revoke `token` on the server. The token is passed explicitly because the
    /// session has usually been cleared already.
    pub async fn logout(&self, token: AuthToken) -> Result<Ack> {
        let request = ApiRequest::post("/auth/logout").with_token(token);
        self.client.send(request).await
    }

    pub async fn update_details(&self, update: &DetailsUpdate) -> Result<Identity> {
        let request = ApiRequest::put("/auth/updatedetails").json(update)?;
        self.client.data(request).await
    }

    pub async fn update_password(&self, update: &PasswordUpdate) -> Result<Ack> {
        let request = ApiRequest::put("/auth/updatepassword").json(update)?;
        self.client.send(request).await
    }
}
