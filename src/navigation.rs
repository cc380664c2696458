//! Which screen a user actually lands on.

use std::fmt::{Display, Formatter};

use crate::model::{ElectionId, Identity, Role};
use crate::session::SessionStatus;

const MANAGERS: &[Role] = &[Role::ElectionOfficer, Role::Admin];

/// Every screen of the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Home,
    Login,
    Register,
    About,
    Faq,
    Contact,
    Profile,
    VoterDashboard,
    Vote(ElectionId),
    VoterResults(ElectionId),
    OfficerDashboard,
    OfficerElections,
    NewElection,
    EditElection(ElectionId),
    OfficerCandidates,
    OfficerResults,
    OfficerElectionResults(ElectionId),
    OfficerVoters,
    AdminDashboard,
    AdminUsers,
    AdminElections,
    AdminOfficers,
    AdminAuditLogs,
    AdminSettings,
}

/// Who may open a screen.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Access {
    Public,
    /// Anyone signed in.
    Authenticated,
    /// Signed in with one of these roles.
    Roles(&'static [Role]),
}

impl Screen {
    pub fn access(&self) -> Access {
        use Screen::*;
        match self {
            Home | Login | Register | About | Faq | Contact | VoterResults(_) => Access::Public,
            Profile => Access::Authenticated,
            VoterDashboard | Vote(_) => Access::Roles(&[Role::Voter]),
            // Admins have their own dashboard.
            OfficerDashboard => Access::Roles(&[Role::ElectionOfficer]),
            OfficerElections
            | NewElection
            | EditElection(_)
            | OfficerCandidates
            | OfficerResults
            | OfficerElectionResults(_)
            | OfficerVoters => Access::Roles(MANAGERS),
            AdminDashboard | AdminUsers | AdminElections | AdminOfficers | AdminAuditLogs
            | AdminSettings => Access::Roles(&[Role::Admin]),
        }
    }

    /// Whether `identity` (or an anonymous visitor) may open this screen.
    pub fn allows(&self, identity: Option<&Identity>) -> bool {
        match (self.access(), identity) {
            (Access::Public, _) => true,
            (_, None) => false,
            (Access::Authenticated, Some(_)) => true,
            (Access::Roles(roles), Some(identity)) => roles.contains(&identity.role),
        }
    }
}

impl Display for Screen {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        use Screen::*;
        match self {
            Home => write!(f, "/"),
            Login => write!(f, "/login"),
            Register => write!(f, "/register"),
            About => write!(f, "/about"),
            Faq => write!(f, "/faq"),
            Contact => write!(f, "/contact"),
            Profile => write!(f, "/profile"),
            VoterDashboard => write!(f, "/voter/dashboard"),
            Vote(id) => write!(f, "/voter/vote/{id}"),
            VoterResults(id) => write!(f, "/voter/results/{id}"),
            OfficerDashboard => write!(f, "/officer/dashboard"),
            OfficerElections => write!(f, "/officer/elections"),
            NewElection => write!(f, "/officer/elections/new"),
            EditElection(id) => write!(f, "/officer/elections/{id}/edit"),
            OfficerCandidates => write!(f, "/officer/candidates"),
            OfficerResults => write!(f, "/officer/results"),
            OfficerElectionResults(id) => write!(f, "/officer/results/{id}"),
            OfficerVoters => write!(f, "/officer/voters"),
            AdminDashboard => write!(f, "/admin/dashboard"),
            AdminUsers => write!(f, "/admin/users"),
            AdminElections => write!(f, "/admin/elections"),
            AdminOfficers => write!(f, "/admin/officers"),
            AdminAuditLogs => write!(f, "/admin/audit-logs"),
            AdminSettings => write!(f, "/admin/settings"),
        }
    }
}

impl Role {
    /// Where a user of this role starts.
    pub fn dashboard(&self) -> Screen {
        match self {
            Role::Voter => Screen::VoterDashboard,
            Role::ElectionOfficer => Screen::OfficerDashboard,
            Role::Admin => Screen::AdminDashboard,
        }
    }
}

/// The screen to show when `target` is requested in the given session state.
///
/// Signed-out (or expired) visitors are sent to login for anything not public. Signed-in
/// users asking for another role's screen, or for home or login, go to their dashboard.
pub fn resolve(status: &SessionStatus, target: Screen) -> Screen {
    let identity = match status {
        SessionStatus::Authenticated(identity) => Some(identity),
        SessionStatus::Anonymous | SessionStatus::Expired => None,
    };

    match identity {
        Some(identity) if matches!(target, Screen::Home | Screen::Login | Screen::Register) => {
            identity.role.dashboard()
        }
        Some(identity) if !target.allows(Some(identity)) => identity.role.dashboard(),
        None if !target.allows(None) => Screen::Login,
        _ => target,
    }
}
