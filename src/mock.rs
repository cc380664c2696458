//! An in-memory voting API for tests, with switches to make it misbehave.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{EncodingKey, Header};
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::model::admin::Settings;
use crate::model::election::SINGLE_CHOICE;
use crate::model::{
    AuditLog, Candidate, CandidateId, Election, ElectionId, ElectionStatus, Identity, LogId, Role,
    Severity, UserId, VotingRecord,
};
use crate::transport::{HttpRequest, HttpResponse, Transport};

const SECRET: &[u8] = b"mock-backend-secret";
const MANAGERS: &[Role] = &[Role::ElectionOfficer, Role::Admin];

/// Responses are built as `Err` to bail out early with `?`.
type Reply = std::result::Result<HttpResponse, HttpResponse>;

#[derive(Clone)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

struct Account {
    identity: Identity,
    password: String,
}

struct Ballot {
    election: ElectionId,
    voter: UserId,
    token: String,
    voted_at: DateTime<Utc>,
}

#[derive(Default)]
struct Faults {
    offline: bool,
    logout_fails: bool,
    reject_tokens: bool,
    unacknowledged_casts: bool,
    expired_tokens: bool,
    /// Wait before handling a route, keyed by `"METHOD /path"`.
    delays: HashMap<String, Duration>,
    /// Wait after handling a route and before answering.
    ack_delays: HashMap<String, Duration>,
}

struct MockState {
    accounts: Vec<Account>,
    sessions: HashMap<String, UserId>,
    elections: Vec<Election>,
    candidates: Vec<Candidate>,
    ballots: Vec<Ballot>,
    audit_logs: Vec<AuditLog>,
    settings: Settings,
    requests: Vec<String>,
    next_id: u64,
    faults: Faults,
}

impl MockBackend {
    pub const PASSWORD: &'static str = "password123";
    pub const VOTER_EMAIL: &'static str = "voter@example.com";
    pub const UNVERIFIED_EMAIL: &'static str = "unverified@example.com";
    pub const OFFICER_EMAIL: &'static str = "officer@example.com";
    pub const ADMIN_EMAIL: &'static str = "admin@example.com";

    /// Open, with visible candidates `ALICE` and `BOB` and an unapproved `PENDING`.
    pub const ACTIVE_ELECTION: &'static str = "e-active";
    pub const DRAFT_ELECTION: &'static str = "e-draft";
    /// Closed and published: `CAROL` 7, `DAN` 3.
    pub const CLOSED_ELECTION: &'static str = "e-closed";
    /// Closed, not yet published: `ERIN` 4, `FINN` 4.
    pub const UNPUBLISHED_ELECTION: &'static str = "e-unpublished";

    pub const ALICE: &'static str = "c-alice";
    pub const BOB: &'static str = "c-bob";
    pub const PENDING: &'static str = "c-pending";
    pub const CAROL: &'static str = "c-carol";
    pub const DAN: &'static str = "c-dan";
    pub const ERIN: &'static str = "c-erin";
    pub const FINN: &'static str = "c-finn";

    /// Four accounts (one per role, plus an unverified voter) and four elections.
    pub fn seeded() -> Self {
        let account = |id: &str, name: &str, email: &str, role: Role, is_verified: bool| Account {
            identity: Identity {
                id: UserId::new(id),
                name: name.to_string(),
                email: email.to_string(),
                role,
                is_verified,
                is_active: true,
                voting_history: Vec::new(),
                voter_id: (role == Role::Voter).then(|| format!("VTR-{id}")),
                phone: None,
                created_at: Some(Utc::now()),
            },
            password: Self::PASSWORD.to_string(),
        };
        let accounts = vec![
            account("u-voter", "Vera Voter", Self::VOTER_EMAIL, Role::Voter, true),
            account("u-unverified", "Uma Unverified", Self::UNVERIFIED_EMAIL, Role::Voter, false),
            account("u-officer", "Oscar Officer", Self::OFFICER_EMAIL, Role::ElectionOfficer, true),
            account("u-admin", "Ada Admin", Self::ADMIN_EMAIL, Role::Admin, true),
        ];

        let now = Utc::now();
        let election = |id: &str, title: &str, status: ElectionStatus, candidates: &[&str]| {
            let (start, end) = match status {
                ElectionStatus::Draft => (now + chrono::Duration::days(7), now + chrono::Duration::days(14)),
                ElectionStatus::Active => (now - chrono::Duration::days(1), now + chrono::Duration::days(1)),
                ElectionStatus::Closed => (now - chrono::Duration::days(14), now - chrono::Duration::days(7)),
            };
            Election {
                id: ElectionId::new(id),
                title: title.to_string(),
                description: format!("{title} election"),
                status,
                total_votes: 0,
                results_published: false,
                start_date: Some(start),
                end_date: Some(end),
                voting_type: SINGLE_CHOICE.to_string(),
                candidates: candidates.iter().map(|c| CandidateId::new(*c)).collect(),
                created_by: Some(UserId::new("u-officer")),
            }
        };
        let mut elections = vec![
            election(
                Self::ACTIVE_ELECTION,
                "Student Council",
                ElectionStatus::Active,
                &[Self::ALICE, Self::BOB, Self::PENDING],
            ),
            election(Self::DRAFT_ELECTION, "Library Committee", ElectionStatus::Draft, &[]),
            election(
                Self::CLOSED_ELECTION,
                "Board of Trustees",
                ElectionStatus::Closed,
                &[Self::CAROL, Self::DAN],
            ),
            election(
                Self::UNPUBLISHED_ELECTION,
                "Sports Captain",
                ElectionStatus::Closed,
                &[Self::ERIN, Self::FINN],
            ),
        ];
        elections[2].results_published = true;
        elections[2].total_votes = 10;
        elections[3].total_votes = 8;

        let candidate = |id: &str, name: &str, election: &str, visible: bool, votes: u64| Candidate {
            id: CandidateId::new(id),
            name: name.to_string(),
            position: "President".to_string(),
            bio: None,
            party: None,
            manifesto: None,
            election: ElectionId::new(election),
            is_approved: visible,
            is_visible: visible,
            vote_count: votes,
        };
        let candidates = vec![
            candidate(Self::ALICE, "Alice Adams", Self::ACTIVE_ELECTION, true, 0),
            candidate(Self::BOB, "Bob Brown", Self::ACTIVE_ELECTION, true, 0),
            candidate(Self::PENDING, "Pat Pending", Self::ACTIVE_ELECTION, false, 0),
            candidate(Self::CAROL, "Carol Clark", Self::CLOSED_ELECTION, true, 7),
            candidate(Self::DAN, "Dan Diaz", Self::CLOSED_ELECTION, true, 3),
            candidate(Self::ERIN, "Erin Evans", Self::UNPUBLISHED_ELECTION, true, 4),
            candidate(Self::FINN, "Finn Fox", Self::UNPUBLISHED_ELECTION, true, 4),
        ];

        let settings = Settings {
            site_name: "Online Voting".to_string(),
            site_description: "Secure elections".to_string(),
            maintenance_mode: false,
            allow_registration: true,
            contact_email: "help@example.com".to_string(),
            max_candidates_per_election: 10,
        };

        Self {
            state: Arc::new(Mutex::new(MockState {
                accounts,
                sessions: HashMap::new(),
                elections,
                candidates,
                ballots: Vec::new(),
                audit_logs: Vec::new(),
                settings,
                requests: Vec::new(),
                next_id: 0,
                faults: Faults::default(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every request received so far, as `"METHOD /path?query"`.
    pub fn requests(&self) -> Vec<String> {
        self.lock().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.lock().requests.len()
    }

    /// Tokens issued and not yet logged out.
    pub fn live_sessions(&self) -> usize {
        self.lock().sessions.len()
    }

    /// Fail every request with a network error.
    pub fn set_offline(&self, offline: bool) {
        self.lock().faults.offline = offline;
    }

    /// Answer logouts with a 500.
    pub fn fail_logout(&self) {
        self.lock().faults.logout_fails = true;
    }

    /// Answer every authenticated request with a 401, as if the token had been revoked.
    pub fn reject_tokens(&self) {
        self.lock().faults.reject_tokens = true;
    }

    /// Answer casts with `success: false` and record nothing.
    pub fn unacknowledge_casts(&self) {
        self.lock().faults.unacknowledged_casts = true;
    }

    /// Hand out tokens whose `exp` is already in the past.
    pub fn issue_expired_tokens(&self) {
        self.lock().faults.expired_tokens = true;
    }

    /// Hold requests to `route` (e.g. `"POST /votes"`) before handling them.
    pub fn delay(&self, route: &str, delay: Duration) {
        self.lock().faults.delays.insert(route.to_string(), delay);
    }

    /// Handle requests to `route` at once but hold the response.
    pub fn delay_ack(&self, route: &str, delay: Duration) {
        self.lock().faults.ack_delays.insert(route.to_string(), delay);
    }

    pub fn clear_delays(&self) {
        let mut state = self.lock();
        state.faults.delays.clear();
        state.faults.ack_delays.clear();
    }

    /// Record a ballot for `email` without going through the client, as another device would.
    pub fn record_ballot_elsewhere(&self, email: &str, election: &str) {
        let mut state = self.lock();
        let voter = state.account_by_email(email).identity.id.clone();
        let election = ElectionId::new(election);
        let candidate = state
            .candidates
            .iter()
            .find(|c| c.election == election && c.is_visible)
            .map(|c| c.id.clone())
            .unwrap();
        state.cast_ballot(&voter, &election, &candidate);
    }

    /// Overwrite the tallies of an election.
    pub fn set_counts(&self, election: &str, counts: &[(&str, u64)]) {
        let mut state = self.lock();
        for (id, count) in counts {
            state.candidate_mut(&CandidateId::new(*id)).unwrap().vote_count = *count;
        }
        let total = counts.iter().map(|(_, count)| count).sum();
        state.election_mut(&ElectionId::new(election)).unwrap().total_votes = total;
    }

    pub fn election(&self, id: &str) -> Election {
        self.lock()
            .elections
            .iter()
            .find(|e| e.id.as_str() == id)
            .cloned()
            .unwrap()
    }

    /// The server's view of an account.
    pub fn identity(&self, email: &str) -> Identity {
        self.lock().account_by_email(email).identity.clone()
    }

    pub fn ballots_for(&self, election: &str) -> usize {
        self.lock()
            .ballots
            .iter()
            .filter(|b| b.election.as_str() == election)
            .count()
    }
}

#[async_trait]
impl Transport for MockBackend {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let route = format!("{} {}", request.method, request.path());
        let (delay, offline) = {
            let mut state = self.lock();
            state.requests.push(describe(&request));
            (state.faults.delays.get(&route).copied(), state.faults.offline)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if offline {
            return Err(Error::Network("Connection refused".to_string()));
        }

        let (response, ack_delay) = {
            let mut state = self.lock();
            let response = match state.route(&request) {
                Ok(response) | Err(response) => response,
            };
            (response, state.faults.ack_delays.get(&route).copied())
        };

        if let Some(delay) = ack_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(response)
    }
}

fn describe(request: &HttpRequest) -> String {
    let mut line = format!("{} {}", request.method, request.path());
    if !request.query.is_empty() {
        let query: Vec<_> = request
            .query
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        line.push('?');
        line.push_str(&query.join("&"));
    }
    line
}

fn respond(status: u16, body: Value) -> HttpResponse {
    HttpResponse {
        status,
        body: body.to_string().into_bytes(),
    }
}

fn fail(status: u16, message: impl Into<String>) -> HttpResponse {
    respond(status, json!({ "success": false, "message": message.into() }))
}

fn data(status: u16, data: impl Serialize) -> Reply {
    Ok(respond(status, json!({ "success": true, "data": data })))
}

fn done(message: &str) -> Reply {
    Ok(respond(200, json!({ "success": true, "message": message })))
}

fn text(body: &Value, key: &str) -> Option<String> {
    body.get(key).and_then(Value::as_str).map(str::to_string)
}

fn date(body: &Value, key: &str) -> Option<DateTime<Utc>> {
    body.get(key)
        .and_then(|value| serde_json::from_value(value.clone()).ok())
}

impl MockState {
    fn route(&mut self, request: &HttpRequest) -> Reply {
        let segments: Vec<&str> = request.segments.iter().map(String::as_str).collect();
        let body = request.body.clone().unwrap_or(Value::Null);

        match (request.method.as_str(), segments.as_slice()) {
            ("POST", ["auth", "login"]) => self.login(&body),
            ("POST", ["auth", "register"]) => self.register(&body),
            ("GET", ["auth", "me"]) => data(200, self.caller(request)?),
            ("POST", ["auth", "logout"]) => self.logout(request),
            ("PUT", ["auth", "updatedetails"]) => self.update_details(request, &body),
            ("PUT", ["auth", "updatepassword"]) => self.update_password(request, &body),

            ("GET", ["elections"]) => {
                self.caller(request)?;
                data(200, &self.elections)
            }
            ("GET", ["elections", "active"]) => {
                self.caller(request)?;
                let active: Vec<_> = self.elections.iter().filter(|e| e.accepts_votes()).collect();
                data(200, active)
            }
            ("GET", ["elections", id]) => {
                self.caller(request)?;
                data(200, self.find_election(id)?.clone())
            }
            ("POST", ["elections"]) => self.create_election(request, &body),
            ("PUT", ["elections", id]) => self.update_election(request, id, &body),
            ("DELETE", ["elections", id]) => self.delete_election(request, id),
            ("PUT", ["elections", id, "publish-results"]) => self.publish_results(request, id),

            ("GET", ["candidates"]) => {
                self.caller(request)?;
                let election = request
                    .query
                    .iter()
                    .find(|(key, _)| key == "election")
                    .map(|(_, value)| value.as_str());
                let candidates: Vec<_> = self
                    .candidates
                    .iter()
                    .filter(|c| election.map_or(true, |e| c.election.as_str() == e))
                    .collect();
                data(200, candidates)
            }
            ("GET", ["candidates", id]) => {
                self.caller(request)?;
                data(200, self.find_candidate(id)?.clone())
            }
            ("POST", ["candidates"]) => self.create_candidate(request, &body),
            ("PUT", ["candidates", id]) => self.update_candidate(request, id, &body),
            ("PUT", ["candidates", id, "approve"]) => {
                self.require(request, MANAGERS)?;
                let candidate = self.find_candidate_mut(id)?;
                candidate.is_approved = true;
                candidate.is_visible = true;
                data(200, candidate.clone())
            }
            ("DELETE", ["candidates", id]) => {
                self.require(request, MANAGERS)?;
                let id = self.find_candidate(id)?.id.clone();
                self.candidates.retain(|c| c.id != id);
                for election in &mut self.elections {
                    election.candidates.retain(|c| *c != id);
                }
                done("Candidate deleted")
            }

            ("POST", ["votes"]) => self.vote(request, &body),
            ("GET", ["votes", "check", id]) => {
                let voter = self.caller(request)?.id;
                let has_voted = self
                    .ballots
                    .iter()
                    .any(|b| b.election.as_str() == *id && b.voter == voter);
                Ok(respond(200, json!({ "success": true, "hasVoted": has_voted })))
            }
            ("GET", ["votes", "results", id]) => {
                if !self.find_election(id)?.results_published {
                    return Err(fail(403, "Results have not been published yet"));
                }
                data(200, self.results(id)?)
            }
            ("GET", ["votes", "live-results", id]) => {
                self.require(request, MANAGERS)?;
                data(200, self.results(id)?)
            }
            ("GET", ["votes", "verify", token]) => {
                let ballot = self
                    .ballots
                    .iter()
                    .find(|b| b.token == *token)
                    .ok_or_else(|| fail(404, "Invalid verification token"))?;
                let election = self.find_election(ballot.election.as_str())?;
                data(
                    200,
                    json!({ "verified": true, "election": election, "votedAt": ballot.voted_at }),
                )
            }

            ("GET", ["admin", "users"]) => {
                self.require(request, &[Role::Admin])?;
                let users: Vec<_> = self.accounts.iter().map(|a| &a.identity).collect();
                data(200, users)
            }
            ("PUT", ["admin", "users", id, action]) => self.user_action(request, id, action, &body),
            ("GET", ["admin", "stats"]) => self.stats(request),
            ("GET", ["admin", "audit-logs"]) => self.audit_logs(request),
            ("GET", ["admin", "settings"]) => {
                self.require(request, &[Role::Admin])?;
                data(200, &self.settings)
            }
            ("PUT", ["admin", "settings"]) => {
                let admin = self.require(request, &[Role::Admin])?;
                self.settings = serde_json::from_value(body)
                    .map_err(|e| fail(400, format!("Invalid settings: {e}")))?;
                self.audit("settings_updated", Some(admin.id), Severity::Warning);
                data(200, &self.settings)
            }

            _ => Err(fail(404, format!("Route {} {} not found", request.method, request.path()))),
        }
    }

    fn account_by_email(&self, email: &str) -> &Account {
        self.accounts
            .iter()
            .find(|a| a.identity.email == email)
            .unwrap()
    }

    fn account_mut(&mut self, id: &UserId) -> std::result::Result<&mut Account, HttpResponse> {
        self.accounts
            .iter_mut()
            .find(|a| a.identity.id == *id)
            .ok_or_else(|| fail(404, "User not found"))
    }

    fn find_election(&self, id: &str) -> std::result::Result<&Election, HttpResponse> {
        self.elections
            .iter()
            .find(|e| e.id.as_str() == id)
            .ok_or_else(|| fail(404, "Election not found"))
    }

    fn election_mut(&mut self, id: &ElectionId) -> std::result::Result<&mut Election, HttpResponse> {
        self.elections
            .iter_mut()
            .find(|e| e.id == *id)
            .ok_or_else(|| fail(404, "Election not found"))
    }

    fn find_candidate(&self, id: &str) -> std::result::Result<&Candidate, HttpResponse> {
        self.candidates
            .iter()
            .find(|c| c.id.as_str() == id)
            .ok_or_else(|| fail(404, "Candidate not found"))
    }

    fn find_candidate_mut(&mut self, id: &str) -> std::result::Result<&mut Candidate, HttpResponse> {
        self.candidates
            .iter_mut()
            .find(|c| c.id.as_str() == id)
            .ok_or_else(|| fail(404, "Candidate not found"))
    }

    fn candidate_mut(&mut self, id: &CandidateId) -> std::result::Result<&mut Candidate, HttpResponse> {
        self.find_candidate_mut(id.as_str())
    }

    fn fresh_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    fn audit(&mut self, action: &str, user: Option<UserId>, severity: Severity) {
        let id = self.fresh_id("log");
        self.audit_logs.push(AuditLog {
            id: Some(LogId::new(id)),
            action: action.to_string(),
            user_id: user,
            details: Value::Null,
            ip_address: Some("127.0.0.1".to_string()),
            user_agent: Some("voting-client tests".to_string()),
            severity,
            created_at: Utc::now(),
        });
    }

    /// The signed-in user behind a request's bearer token.
    fn caller(&self, request: &HttpRequest) -> std::result::Result<Identity, HttpResponse> {
        let unauthorized = || fail(401, "Not authorized to access this route");
        if self.faults.reject_tokens {
            return Err(unauthorized());
        }
        let user = request
            .bearer
            .as_ref()
            .and_then(|token| self.sessions.get(token))
            .ok_or_else(unauthorized)?;
        let account = self
            .accounts
            .iter()
            .find(|a| a.identity.id == *user)
            .ok_or_else(unauthorized)?;
        if !account.identity.is_active {
            return Err(fail(401, "Account is suspended"));
        }
        Ok(account.identity.clone())
    }

    fn require(&self, request: &HttpRequest, roles: &[Role]) -> std::result::Result<Identity, HttpResponse> {
        let identity = self.caller(request)?;
        if !roles.contains(&identity.role) {
            return Err(fail(
                403,
                format!("User role {} is not authorized to access this route", identity.role),
            ));
        }
        Ok(identity)
    }

    fn issue_token(&mut self, user: &UserId) -> String {
        self.next_id += 1;
        let exp = if self.faults.expired_tokens {
            Utc::now() - chrono::Duration::hours(1)
        } else {
            Utc::now() + chrono::Duration::days(30)
        };
        let claims = json!({ "id": user, "exp": exp.timestamp(), "jti": self.next_id });
        let token =
            jsonwebtoken::encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET))
                .unwrap();
        self.sessions.insert(token.clone(), user.clone());
        token
    }

    fn login(&mut self, body: &Value) -> Reply {
        let email = text(body, "email").unwrap_or_default();
        let password = text(body, "password").unwrap_or_default();
        let identity = self
            .accounts
            .iter()
            .find(|a| a.identity.email == email && a.password == password)
            .map(|a| a.identity.clone())
            .ok_or_else(|| fail(401, "Invalid credentials"))?;
        if !identity.is_active {
            return Err(fail(401, "Account is suspended"));
        }

        let token = self.issue_token(&identity.id);
        self.audit("user_login", Some(identity.id.clone()), Severity::Info);
        Ok(respond(
            200,
            json!({ "success": true, "token": token, "user": identity }),
        ))
    }

    fn register(&mut self, body: &Value) -> Reply {
        if !self.settings.allow_registration {
            return Err(fail(403, "Registration is currently disabled"));
        }
        let email = text(body, "email").unwrap_or_default();
        if self.accounts.iter().any(|a| a.identity.email == email) {
            return Err(fail(400, "User already exists"));
        }

        let identity = Identity {
            id: UserId::new(self.fresh_id("u")),
            name: text(body, "name").unwrap_or_default(),
            email,
            role: Role::Voter,
            is_verified: false,
            is_active: true,
            voting_history: Vec::new(),
            voter_id: text(body, "voterId"),
            phone: text(body, "phone"),
            created_at: Some(Utc::now()),
        };
        self.accounts.push(Account {
            identity: identity.clone(),
            password: text(body, "password").unwrap_or_default(),
        });

        let token = self.issue_token(&identity.id);
        self.audit("user_registered", Some(identity.id.clone()), Severity::Info);
        Ok(respond(
            201,
            json!({ "success": true, "token": token, "user": identity }),
        ))
    }

    fn logout(&mut self, request: &HttpRequest) -> Reply {
        if self.faults.logout_fails {
            return Err(fail(500, "Logout failed"));
        }
        let identity = self.caller(request)?;
        if let Some(token) = &request.bearer {
            self.sessions.remove(token);
        }
        self.audit("user_logout", Some(identity.id), Severity::Info);
        done("Logged out successfully")
    }

    fn update_details(&mut self, request: &HttpRequest, body: &Value) -> Reply {
        let id = self.caller(request)?.id;
        let account = self.account_mut(&id)?;
        if let Some(name) = text(body, "name") {
            account.identity.name = name;
        }
        if let Some(email) = text(body, "email") {
            account.identity.email = email;
        }
        if let Some(phone) = text(body, "phone") {
            account.identity.phone = Some(phone);
        }
        data(200, account.identity.clone())
    }

    fn update_password(&mut self, request: &HttpRequest, body: &Value) -> Reply {
        let id = self.caller(request)?.id;
        let account = self.account_mut(&id)?;
        if text(body, "currentPassword").as_deref() != Some(account.password.as_str()) {
            return Err(fail(400, "Current password is incorrect"));
        }
        account.password = text(body, "newPassword").unwrap_or_default();
        done("Password updated")
    }

    fn create_election(&mut self, request: &HttpRequest, body: &Value) -> Reply {
        let creator = self.require(request, MANAGERS)?;
        let election = Election {
            id: ElectionId::new(self.fresh_id("e")),
            title: text(body, "title").unwrap_or_default(),
            description: text(body, "description").unwrap_or_default(),
            status: ElectionStatus::Draft,
            total_votes: 0,
            results_published: false,
            start_date: date(body, "startDate"),
            end_date: date(body, "endDate"),
            voting_type: text(body, "votingType").unwrap_or_else(|| SINGLE_CHOICE.to_string()),
            candidates: Vec::new(),
            created_by: Some(creator.id.clone()),
        };
        self.elections.push(election.clone());
        self.audit("election_created", Some(creator.id), Severity::Info);
        data(201, election)
    }

    fn update_election(&mut self, request: &HttpRequest, id: &str, body: &Value) -> Reply {
        self.require(request, MANAGERS)?;
        let election = self.election_mut(&ElectionId::new(id))?;
        if election.status != ElectionStatus::Draft {
            return Err(fail(400, "Only draft elections can be edited"));
        }
        if let Some(title) = text(body, "title") {
            election.title = title;
        }
        if let Some(description) = text(body, "description") {
            election.description = description;
        }
        if let Some(start) = date(body, "startDate") {
            election.start_date = Some(start);
        }
        if let Some(end) = date(body, "endDate") {
            election.end_date = Some(end);
        }
        data(200, election.clone())
    }

    fn delete_election(&mut self, request: &HttpRequest, id: &str) -> Reply {
        let user = self.require(request, MANAGERS)?;
        let id = self.find_election(id)?.id.clone();
        self.elections.retain(|e| e.id != id);
        self.candidates.retain(|c| c.election != id);
        self.audit("election_deleted", Some(user.id), Severity::Warning);
        done("Election deleted")
    }

    fn publish_results(&mut self, request: &HttpRequest, id: &str) -> Reply {
        let user = self.require(request, MANAGERS)?;
        let election = self.election_mut(&ElectionId::new(id))?;
        if election.status != ElectionStatus::Closed {
            return Err(fail(400, "Can only publish results for closed elections"));
        }
        if election.results_published {
            return Err(fail(400, "Results are already published"));
        }
        election.results_published = true;
        self.audit("results_published", Some(user.id), Severity::Info);
        done("Results published")
    }

    fn create_candidate(&mut self, request: &HttpRequest, body: &Value) -> Reply {
        self.require(request, MANAGERS)?;
        let election = text(body, "election").unwrap_or_default();
        let election = self.find_election(&election)?.id.clone();
        let candidate = Candidate {
            id: CandidateId::new(self.fresh_id("c")),
            name: text(body, "name").unwrap_or_default(),
            position: text(body, "position").unwrap_or_default(),
            bio: text(body, "bio"),
            party: text(body, "party"),
            manifesto: None,
            election: election.clone(),
            is_approved: false,
            is_visible: false,
            vote_count: 0,
        };
        self.election_mut(&election)?
            .candidates
            .push(candidate.id.clone());
        self.candidates.push(candidate.clone());
        data(201, candidate)
    }

    fn update_candidate(&mut self, request: &HttpRequest, id: &str, body: &Value) -> Reply {
        self.require(request, MANAGERS)?;
        let candidate = self.find_candidate_mut(id)?;
        if let Some(name) = text(body, "name") {
            candidate.name = name;
        }
        if let Some(position) = text(body, "position") {
            candidate.position = position;
        }
        candidate.bio = text(body, "bio");
        candidate.party = text(body, "party");
        data(200, candidate.clone())
    }

    fn vote(&mut self, request: &HttpRequest, body: &Value) -> Reply {
        let voter = self.require(request, &[Role::Voter])?;
        if !voter.is_verified {
            return Err(fail(403, "Please verify your account before voting"));
        }
        let election = text(body, "electionId").unwrap_or_default();
        let election = self.find_election(&election)?;
        if !election.accepts_votes() {
            return Err(fail(400, "Election is not active"));
        }
        let election = election.id.clone();
        if self
            .ballots
            .iter()
            .any(|b| b.election == election && b.voter == voter.id)
        {
            return Err(fail(400, "You have already voted in this election"));
        }
        let candidate = text(body, "candidateId").unwrap_or_default();
        let candidate = self
            .candidates
            .iter()
            .find(|c| c.id.as_str() == candidate && c.election == election && c.is_visible)
            .map(|c| c.id.clone())
            .ok_or_else(|| fail(400, "Invalid candidate"))?;

        if self.faults.unacknowledged_casts {
            return Ok(respond(
                200,
                json!({ "success": false, "message": "Vote could not be recorded" }),
            ));
        }

        let (token, voted_at) = self.cast_ballot(&voter.id, &election, &candidate);
        Ok(respond(
            201,
            json!({
                "success": true,
                "message": "Vote cast successfully",
                "data": { "verificationToken": token, "votedAt": voted_at },
            }),
        ))
    }

    fn cast_ballot(
        &mut self,
        voter: &UserId,
        election: &ElectionId,
        candidate: &CandidateId,
    ) -> (String, DateTime<Utc>) {
        let token = self.fresh_id("receipt");
        let voted_at = Utc::now();
        self.ballots.push(Ballot {
            election: election.clone(),
            voter: voter.clone(),
            token: token.clone(),
            voted_at,
        });
        if let Ok(candidate) = self.candidate_mut(candidate) {
            candidate.vote_count += 1;
        }
        if let Ok(election) = self.election_mut(election) {
            election.total_votes += 1;
        }
        if let Ok(account) = self.account_mut(voter) {
            account.identity.voting_history.push(VotingRecord {
                election_id: election.clone(),
                voted_at,
            });
        }
        self.audit("vote_cast", Some(voter.clone()), Severity::Info);
        (token, voted_at)
    }

    fn results(&self, id: &str) -> std::result::Result<Value, HttpResponse> {
        let election = self.find_election(id)?;
        let results: Vec<_> = election
            .candidates
            .iter()
            .filter_map(|c| self.candidates.iter().find(|candidate| candidate.id == *c))
            .filter(|c| c.is_visible)
            .map(|c| {
                json!({
                    "_id": c.id,
                    "name": c.name,
                    "position": c.position,
                    "voteCount": c.vote_count,
                })
            })
            .collect();
        Ok(json!({ "election": election, "results": results }))
    }

    fn user_action(&mut self, request: &HttpRequest, id: &str, action: &str, body: &Value) -> Reply {
        let admin = self.require(request, &[Role::Admin])?;
        let id = UserId::new(id);
        let account = self.account_mut(&id)?;
        let (logged, severity) = match action {
            "verify" => {
                account.identity.is_verified = true;
                ("user_verified", Severity::Info)
            }
            "suspend" => {
                account.identity.is_active = false;
                ("user_suspended", Severity::Warning)
            }
            "activate" => {
                account.identity.is_active = true;
                ("user_activated", Severity::Info)
            }
            "role" => {
                let role = body
                    .get("role")
                    .and_then(|role| serde_json::from_value::<Role>(role.clone()).ok())
                    .ok_or_else(|| fail(400, "Invalid role"))?;
                account.identity.role = role;
                ("role_updated", Severity::Warning)
            }
            _ => return Err(fail(404, format!("Unknown user action '{action}'"))),
        };
        let identity = account.identity.clone();
        self.audit(logged, Some(admin.id), severity);
        data(200, identity)
    }

    fn stats(&self, request: &HttpRequest) -> Reply {
        self.require(request, &[Role::Admin])?;
        let verified = self
            .accounts
            .iter()
            .filter(|a| a.identity.is_verified && a.identity.role == Role::Voter)
            .count();
        let voters_who_voted = self
            .accounts
            .iter()
            .filter(|a| a.identity.is_verified && !a.identity.voting_history.is_empty())
            .count();
        let turnout = if verified == 0 {
            0.0
        } else {
            voters_who_voted as f64 * 100.0 / verified as f64
        };
        let recent: Vec<_> = self.audit_logs.iter().rev().take(10).collect();
        let suspicious: Vec<_> = self
            .audit_logs
            .iter()
            .filter(|log| log.severity != Severity::Info)
            .collect();

        data(
            200,
            json!({
                "overview": {
                    "totalUsers": self.accounts.len(),
                    "verifiedUsers": verified,
                    "totalElections": self.elections.len(),
                    "activeElections": self.elections.iter().filter(|e| e.accepts_votes()).count(),
                    "totalVotes": self.ballots.len(),
                    "voterTurnout": format!("{turnout:.2}"),
                },
                "recentActivity": recent,
                "suspiciousActivities": suspicious,
            }),
        )
    }

    fn audit_logs(&self, request: &HttpRequest) -> Reply {
        self.require(request, &[Role::Admin])?;
        let param = |key: &str| {
            request
                .query
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };
        let page: usize = param("page").and_then(|p| p.parse().ok()).unwrap_or(1).max(1);
        let limit: usize = param("limit").and_then(|l| l.parse().ok()).unwrap_or(50).max(1);

        let matching: Vec<_> = self
            .audit_logs
            .iter()
            .filter(|log| param("action").map_or(true, |action| log.action == action))
            .filter(|log| {
                param("severity").map_or(true, |severity| {
                    serde_json::to_value(log.severity).ok() == Some(json!(severity))
                })
            })
            .collect();
        let pages = ((matching.len() + limit - 1) / limit).max(1);
        let logs: Vec<_> = matching.into_iter().skip((page - 1) * limit).take(limit).collect();

        Ok(respond(
            200,
            json!({ "success": true, "count": logs.len(), "pages": pages, "data": logs }),
        ))
    }
}
