//! Typed wrappers around every endpoint of the voting API.
//!
//! All requests funnel through [`ApiClient::send`], which attaches the session token,
//! logs the exchange, maps error statuses, and ends the session on a `401`.

use std::sync::Arc;

use chrono::Utc;
use reqwest::Method;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::config::Config;
use crate::error::{self, Error, Result};
use crate::logging::{log_failure, log_request, log_response, RequestId};
use crate::model::envelope::{Envelope, ErrorBody};
use crate::session::{AuthToken, SessionSlot};
use crate::storage::FileStorage;
use crate::transport::{HttpRequest, HttpTransport, Transport};

mod admin;
mod auth;
mod candidates;
mod elections;
mod votes;

pub use admin::AdminApi;
pub use auth::AuthApi;
pub use candidates::CandidatesApi;
pub use elections::ElectionsApi;
pub use votes::VotesApi;

/// Which token, if any, a request carries.
#[derive(Debug, Clone)]
pub(crate) enum Authorization {
    /// The current session's token, if there is one.
    Session,
    /// No token, e.g. for login.
    Anonymous,
    /// A specific token, regardless of the current session.
    Token(AuthToken),
}

/// A request before authorization is resolved.
#[derive(Debug, Clone)]
pub(crate) struct ApiRequest {
    method: Method,
    segments: Vec<String>,
    query: Vec<(String, String)>,
    body: Option<Value>,
    authorization: Authorization,
}

impl ApiRequest {
    /// `path` is a fixed route such as `/votes/verify`; variable parts go in [`segment`].
    ///
    /// [`segment`]: ApiRequest::segment
    fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            segments: path
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            query: Vec::new(),
            body: None,
            authorization: Authorization::Session,
        }
    }

    pub(crate) fn get(path: &str) -> Self {
        Self::new(Method::GET, path)
    }

    pub(crate) fn post(path: &str) -> Self {
        Self::new(Method::POST, path)
    }

    pub(crate) fn put(path: &str) -> Self {
        Self::new(Method::PUT, path)
    }

    pub(crate) fn delete(path: &str) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append one path segment, such as an ID. It is escaped on the wire, so it can
    /// never reach another route.
    pub(crate) fn segment(mut self, segment: impl ToString) -> Self {
        self.segments.push(segment.to_string());
        self
    }

    pub(crate) fn json(mut self, body: &impl Serialize) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub(crate) fn query(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query.extend(pairs);
        self
    }

    pub(crate) fn anonymous(mut self) -> Self {
        self.authorization = Authorization::Anonymous;
        self
    }

    pub(crate) fn with_token(mut self, token: AuthToken) -> Self {
        self.authorization = Authorization::Token(token);
        self
    }
}

/// Entry point to the API. Cheap to clone; clones share the transport and session.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    slot: Arc<SessionSlot>,
}

impl ApiClient {
    pub fn new(transport: impl Transport + 'static, slot: SessionSlot) -> Self {
        Self {
            transport: Arc::new(transport),
            slot: Arc::new(slot),
        }
    }

    /// An HTTP client whose session lives in the configured directory.
    pub fn from_config(config: &Config) -> Result<Self> {
        let transport = HttpTransport::new(config)?;
        let storage = FileStorage::new(config.session_dir())?;
        Ok(Self::new(transport, SessionSlot::open(storage)?))
    }

    pub fn slot(&self) -> &SessionSlot {
        &self.slot
    }

    pub fn auth(&self) -> AuthApi<'_> {
        AuthApi::new(self)
    }

    pub fn elections(&self) -> ElectionsApi<'_> {
        ElectionsApi::new(self)
    }

    pub fn candidates(&self) -> CandidatesApi<'_> {
        CandidatesApi::new(self)
    }

    pub fn votes(&self) -> VotesApi<'_> {
        VotesApi::new(self)
    }

    pub fn admin(&self) -> AdminApi<'_> {
        AdminApi::new(self)
    }

    /// Send a request and parse the whole response body as `T`.
    pub(crate) async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let ApiRequest {
            method,
            segments,
            query,
            body,
            authorization,
        } = request;

        // Servers and proxies may resolve these even when escaped.
        if segments.iter().any(|s| matches!(s.as_str(), "" | "." | "..")) {
            return Err(Error::Validation("Invalid identifier".to_string()));
        }
        let path = format!("/{}", segments.join("/"));

        // The generation is only tracked for the session's own token.
        let (token, generation) = match authorization {
            Authorization::Session => {
                let (token, generation) = self.slot.credentials();
                if let Some(token) = &token {
                    if token.is_expired_at(Utc::now()) {
                        self.slot.invalidate(generation);
                        return Err(Error::Unauthorized(
                            "Session expired, please sign in again".to_string(),
                        ));
                    }
                }
                (token, Some(generation))
            }
            Authorization::Anonymous => (None, None),
            Authorization::Token(token) => (Some(token), None),
        };

        let id = RequestId::next();
        log_request(id, &method, &path);
        let response = match self
            .transport
            .send(HttpRequest {
                method,
                segments,
                query,
                bearer: token.map(|t| t.as_str().to_string()),
                body,
            })
            .await
        {
            Ok(response) => response,
            Err(e) => {
                log_failure(id, &path, &e);
                return Err(e);
            }
        };
        log_response(id, response.status, &path);

        if response.is_success() {
            return Ok(serde_json::from_slice(&response.body)?);
        }

        let message =
            ErrorBody::message(&response.body).unwrap_or_else(|| error::reason(response.status));
        if response.status == 401 {
            if let Some(generation) = generation {
                self.slot.invalidate(generation);
            }
            return Err(Error::Unauthorized(message));
        }
        Err(Error::from_status(response.status, message))
    }

    /// Send a request whose payload is wrapped in the standard envelope.
    pub(crate) async fn data<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        self.send::<Envelope<T>>(request)
            .await
            .map(|envelope| envelope.data)
    }
}
