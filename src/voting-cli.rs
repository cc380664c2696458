//! Command-line front end for the voting platform.
//! Every screen of the web client has a subcommand here; the session persists between
//! invocations in the configured session directory.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use log::{debug, LevelFilter};
use log4rs::{
    append::console::{ConsoleAppender, Target},
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
};

use voting_client::casting::VoteCaster;
use voting_client::eligibility::{self, Ineligibility, VoteAffordance, VoteGuard};
use voting_client::model::admin::AuditLogQuery;
use voting_client::model::election::SINGLE_CHOICE;
use voting_client::model::user::{DetailsUpdate, NewUser, PasswordUpdate};
use voting_client::model::{
    Ack, CandidateId, CandidateSpec, Election, ElectionId, ElectionSpec, Role, Severity, UserId,
};
use voting_client::navigation::{self, Screen};
use voting_client::results::{LiveResults, ResultsSource, Standings};
use voting_client::{ApiClient, Config, Error, Result, SessionStore};

const PROGRAM_NAME: &str = "voting-cli";

const ABOUT_TEXT: &str = "Take part in online elections from the command line.

EXIT CODES:
     0: Success.
     2: Not signed in, or the session expired. Run `login` again.
 Other: Error.";

const LOG_CONFIG: &str = "log4rs.yaml";

const CONFIG: &str = "CONFIG";
const API_URL: &str = "API_URL";
const VERBOSE: &str = "VERBOSE";

/// Construct the CLI configuration.
fn cli() -> Command {
    // Make the build dirty when the toml changes.
    include_str!("../Cargo.toml");

    let election = || Arg::new("election").help("Election ID").required(true);
    let user = || Arg::new("user").help("User ID").required(true);

    clap::command!(PROGRAM_NAME)
        .about(ABOUT_TEXT)
        .subcommand_required(true)
        .arg(
            Arg::new(CONFIG)
                .long("config")
                .short('c')
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("Configuration file [default: Voting.toml]"),
        )
        .arg(
            Arg::new(API_URL)
                .long("api-url")
                .value_name("URL")
                .help("Base URL of the voting API, overriding the configuration"),
        )
        .arg(
            Arg::new(VERBOSE)
                .long("verbose")
                .short('v')
                .action(ArgAction::SetTrue)
                .help("Log every request to stderr"),
        )
        // Session.
        .subcommand(
            Command::new("login")
                .about("Sign in")
                .arg(Arg::new("email").required(true))
                .arg(
                    Arg::new("password")
                        .long("password")
                        .env("VOTING_PASSWORD")
                        .hide_env_values(true)
                        .required(true),
                ),
        )
        .subcommand(
            Command::new("register")
                .about("Create a voter account and sign in")
                .arg(Arg::new("name").long("name").required(true))
                .arg(Arg::new("email").long("email").required(true))
                .arg(Arg::new("password").long("password").required(true))
                .arg(Arg::new("confirm").long("confirm-password").required(true))
                .arg(Arg::new("voter-id").long("voter-id"))
                .arg(Arg::new("phone").long("phone")),
        )
        .subcommand(Command::new("logout").about("Sign out"))
        .subcommand(Command::new("whoami").about("Show the signed-in user"))
        .subcommand(Command::new("refresh").about("Re-fetch the signed-in user from the server"))
        .subcommand(
            Command::new("update-details")
                .about("Change profile details")
                .arg(Arg::new("name").long("name"))
                .arg(Arg::new("email").long("email"))
                .arg(Arg::new("phone").long("phone")),
        )
        .subcommand(
            Command::new("update-password")
                .about("Change password")
                .arg(Arg::new("current").long("current").required(true))
                .arg(Arg::new("new").long("new").required(true))
                .arg(Arg::new("confirm").long("confirm").required(true)),
        )
        .subcommand(
            Command::new("open")
                .about("Show where a path leads for the current session")
                .arg(Arg::new("path").required(true)),
        )
        // Voting.
        .subcommand(
            Command::new("elections").about("List elections").arg(
                Arg::new("active")
                    .long("active")
                    .action(ArgAction::SetTrue)
                    .help("Only elections open for voting"),
            ),
        )
        .subcommand(Command::new("election").about("Show one election").arg(election()))
        .subcommand(
            Command::new("candidates")
                .about("List the candidates on an election's ballot")
                .arg(election())
                .arg(
                    Arg::new("all")
                        .long("all")
                        .action(ArgAction::SetTrue)
                        .help("Include candidates not yet approved"),
                ),
        )
        .subcommand(
            Command::new("vote")
                .about("Cast a vote")
                .arg(election())
                .arg(Arg::new("candidate").help("Candidate ID").required(true)),
        )
        .subcommand(
            Command::new("has-voted")
                .about("Check whether you have voted in an election")
                .arg(election()),
        )
        .subcommand(
            Command::new("results")
                .about("Show an election's results")
                .arg(election())
                .arg(
                    Arg::new("live")
                        .long("live")
                        .action(ArgAction::SetTrue)
                        .help("The running count (officers and admins)"),
                )
                .arg(
                    Arg::new("watch")
                        .long("watch")
                        .action(ArgAction::SetTrue)
                        .requires("live")
                        .help("Keep refreshing the running count"),
                ),
        )
        .subcommand(
            Command::new("verify-receipt")
                .about("Check a vote receipt")
                .arg(Arg::new("token").required(true)),
        )
        // Officers.
        .subcommand(
            Command::new("create-election")
                .about("Create a draft election")
                .arg(Arg::new("title").long("title").required(true))
                .arg(Arg::new("description").long("description").required(true))
                .arg(time_arg("start").required(true))
                .arg(time_arg("end").required(true)),
        )
        .subcommand(
            Command::new("edit-election")
                .about("Change a draft election")
                .arg(election())
                .arg(Arg::new("title").long("title"))
                .arg(Arg::new("description").long("description"))
                .arg(time_arg("start"))
                .arg(time_arg("end")),
        )
        .subcommand(
            Command::new("delete-election")
                .about("Delete an election")
                .arg(election()),
        )
        .subcommand(
            Command::new("add-candidate")
                .about("Add a candidate to an election")
                .arg(election())
                .arg(Arg::new("name").long("name").required(true))
                .arg(Arg::new("position").long("position").required(true))
                .arg(Arg::new("bio").long("bio"))
                .arg(Arg::new("party").long("party")),
        )
        .subcommand(
            Command::new("edit-candidate")
                .about("Change a candidate's details")
                .arg(Arg::new("candidate").required(true))
                .arg(Arg::new("name").long("name"))
                .arg(Arg::new("position").long("position"))
                .arg(Arg::new("bio").long("bio"))
                .arg(Arg::new("party").long("party")),
        )
        .subcommand(
            Command::new("delete-candidate")
                .about("Remove a candidate")
                .arg(Arg::new("candidate").required(true)),
        )
        .subcommand(
            Command::new("publish")
                .about("Publish a closed election's results")
                .arg(election()),
        )
        .subcommand(
            Command::new("approve")
                .about("Approve a candidate")
                .arg(Arg::new("candidate").required(true)),
        )
        // Admins.
        .subcommand(Command::new("users").about("List all users"))
        .subcommand(Command::new("verify-user").about("Verify a user").arg(user()))
        .subcommand(Command::new("suspend-user").about("Suspend a user").arg(user()))
        .subcommand(Command::new("activate-user").about("Re-activate a user").arg(user()))
        .subcommand(
            Command::new("set-role")
                .about("Change a user's role")
                .arg(user())
                .arg(
                    Arg::new("role")
                        .required(true)
                        .value_parser(["voter", "election_officer", "admin"]),
                ),
        )
        .subcommand(Command::new("stats").about("Show platform statistics"))
        .subcommand(
            Command::new("audit-logs")
                .about("Browse the audit trail")
                .arg(Arg::new("action").long("action"))
                .arg(
                    Arg::new("severity")
                        .long("severity")
                        .value_parser(["info", "warning", "critical"]),
                )
                .arg(
                    Arg::new("page")
                        .long("page")
                        .value_parser(value_parser!(u32).range(1..))
                        .default_value("1"),
                )
                .arg(
                    Arg::new("limit")
                        .long("limit")
                        .value_parser(value_parser!(u32).range(1..))
                        .default_value("50"),
                ),
        )
        .subcommand(
            Command::new("settings")
                .about("Show or change platform settings")
                .arg(Arg::new("site-name").long("site-name"))
                .arg(Arg::new("site-description").long("site-description"))
                .arg(Arg::new("contact-email").long("contact-email"))
                .arg(
                    Arg::new("maintenance")
                        .long("maintenance")
                        .value_parser(value_parser!(bool)),
                )
                .arg(
                    Arg::new("allow-registration")
                        .long("allow-registration")
                        .value_parser(value_parser!(bool)),
                )
                .arg(
                    Arg::new("max-candidates")
                        .long("max-candidates")
                        .value_parser(value_parser!(u32).range(1..)),
                ),
        )
}

/// An RFC 3339 timestamp option such as `--start 2026-11-03T08:00:00Z`.
fn time_arg(name: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .value_name("RFC3339")
        .value_parser(parse_time)
}

fn parse_time(time: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(time).map(|t| t.with_timezone(&Utc))
}

/// Set up logging from `log4rs.yaml` if there is one, otherwise to stderr.
fn init_logging(verbose: bool) {
    if !verbose && Path::new(LOG_CONFIG).exists() {
        if let Err(e) = log4rs::init_file(LOG_CONFIG, Default::default()) {
            eprintln!("Failed to initialise logging from {LOG_CONFIG}: {e}");
        }
        return;
    }

    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new("{d(%H:%M:%S)} {h({l:<5})} {m}{n}")))
        .build();
    let config = log4rs::Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(level));
    match config {
        Ok(config) => {
            if let Err(e) = log4rs::init_config(config) {
                eprintln!("Failed to initialise logging: {e}");
            }
        }
        Err(e) => eprintln!("Invalid logging configuration: {e}"),
    }
}

fn load_config(args: &ArgMatches) -> Result<Config> {
    let file = args.get_one::<PathBuf>(CONFIG);
    let mut config = Config::load(file.map(PathBuf::as_path))?;
    if let Some(url) = args.get_one::<String>(API_URL) {
        config = config.with_api_url(url);
    }
    Ok(config)
}

/// Fetch a string argument that clap guarantees is present.
fn required<'a>(args: &'a ArgMatches, name: &str) -> &'a str {
    args.get_one::<String>(name).map(String::as_str).unwrap_or_default()
}

fn optional(args: &ArgMatches, name: &str) -> Option<String> {
    args.get_one::<String>(name).cloned()
}

/// Turn a disabled vote control into the error explaining why.
fn ensure_can_vote(affordance: VoteAffordance, election: &Election) -> Result<()> {
    match affordance {
        VoteAffordance::VoteNow => Ok(()),
        VoteAffordance::Submitting => Err(Error::InFlight),
        VoteAffordance::AlreadyVoted { .. } => Err(Error::Ineligible(Ineligibility::AlreadyVoted)),
        VoteAffordance::NotVerified => Err(Error::Ineligible(Ineligibility::NotVerified)),
        VoteAffordance::NotOpen => Err(Error::Validation(format!(
            "{} is {}, not open for voting",
            election.title, election.status
        ))),
    }
}

fn print_ack(ack: Ack, fallback: &str) {
    println!("{}", ack.message.unwrap_or_else(|| fallback.to_string()));
}

fn parse_role(role: &str) -> Option<Role> {
    match role {
        "voter" => Some(Role::Voter),
        "election_officer" => Some(Role::ElectionOfficer),
        "admin" => Some(Role::Admin),
        _ => None,
    }
}

fn parse_severity(severity: &str) -> Option<Severity> {
    match severity {
        "info" => Some(Severity::Info),
        "warning" => Some(Severity::Warning),
        "critical" => Some(Severity::Critical),
        _ => None,
    }
}

/// Map a web client path back to its screen.
fn parse_screen(path: &str) -> Option<Screen> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let screen = match segments.as_slice() {
        [] => Screen::Home,
        ["login"] => Screen::Login,
        ["register"] => Screen::Register,
        ["about"] => Screen::About,
        ["faq"] => Screen::Faq,
        ["contact"] => Screen::Contact,
        ["profile"] => Screen::Profile,
        ["voter", "dashboard"] => Screen::VoterDashboard,
        ["voter", "vote", e] => Screen::Vote(ElectionId::new(*e)),
        ["voter", "results", e] => Screen::VoterResults(ElectionId::new(*e)),
        ["officer", "dashboard"] => Screen::OfficerDashboard,
        ["officer", "elections"] => Screen::OfficerElections,
        ["officer", "elections", "new"] => Screen::NewElection,
        ["officer", "elections", e, "edit"] => Screen::EditElection(ElectionId::new(*e)),
        ["officer", "candidates"] => Screen::OfficerCandidates,
        ["officer", "results"] => Screen::OfficerResults,
        ["officer", "results", e] => Screen::OfficerElectionResults(ElectionId::new(*e)),
        ["officer", "voters"] => Screen::OfficerVoters,
        ["admin", "dashboard"] => Screen::AdminDashboard,
        ["admin", "users"] => Screen::AdminUsers,
        ["admin", "elections"] => Screen::AdminElections,
        ["admin", "officers"] => Screen::AdminOfficers,
        ["admin", "audit-logs"] => Screen::AdminAuditLogs,
        ["admin", "settings"] => Screen::AdminSettings,
        _ => return None,
    };
    Some(screen)
}

fn print_election(election: &Election) {
    println!(
        "{}  {:<32} {:<7} {:>5} vote{}{}",
        election.id,
        election.title,
        election.status,
        election.total_votes,
        if election.total_votes != 1 { "s" } else { " " },
        if election.results_published {
            "  (results published)"
        } else {
            ""
        }
    );
}

fn print_standings(standings: &Standings) {
    println!(
        "{} [{}] {} vote{}",
        standings.election.title,
        standings.election.status,
        standings.total_votes,
        if standings.total_votes != 1 { "s" } else { "" }
    );
    for (rank, result) in standings.results.iter().enumerate() {
        println!(
            "{:>3}. {:<28} {:<16} {:>6} {:>4}%",
            rank + 1,
            result.name,
            result.position,
            result.vote_count,
            result.percentage
        );
    }
    match standings.winner() {
        None => println!("No votes yet."),
        Some(_) if standings.is_tied() => println!("Tied for first place."),
        Some(winner) if standings.is_final() => println!("Winner: {}", winner.name),
        Some(leader) => println!("Leading: {}", leader.name),
    }
}

/// Dispatch a subcommand.
async fn execute(store: &SessionStore, config: &Config, command: &str, args: &ArgMatches) -> Result<()> {
    let api: &ApiClient = store.api();
    match command {
        "login" => {
            let identity = store
                .login(required(args, "email"), required(args, "password"))
                .await?;
            println!("Signed in as {} ({})", identity.name, identity.role);
            println!("Start at {}", identity.role.dashboard());
        }
        "register" => {
            let identity = store
                .register(&NewUser {
                    name: required(args, "name").to_string(),
                    email: required(args, "email").to_string(),
                    password: required(args, "password").to_string(),
                    confirm_password: required(args, "confirm").to_string(),
                    voter_id: optional(args, "voter-id"),
                    national_id: None,
                    phone: optional(args, "phone"),
                })
                .await?;
            println!("Registered and signed in as {}", identity.email);
            if !identity.is_verified {
                println!("Your account must be verified by an administrator before you can vote.");
            }
        }
        "logout" => {
            store.logout().await;
            println!("Signed out");
        }
        "whoami" => {
            let identity = store
                .current_identity()
                .ok_or_else(|| Error::Unauthorized("Not signed in".to_string()))?;
            println!("{} <{}>", identity.name, identity.email);
            println!("Role: {}", identity.role);
            println!("Verified: {}", if identity.is_verified { "yes" } else { "no" });
            for record in &identity.voting_history {
                println!("Voted in {} at {}", record.election_id, record.voted_at);
            }
        }
        "refresh" => {
            let identity = store.refresh().await?;
            println!("Refreshed {} ({})", identity.email, identity.role);
        }
        "update-details" => {
            let identity = store
                .update_details(&DetailsUpdate {
                    name: optional(args, "name"),
                    email: optional(args, "email"),
                    phone: optional(args, "phone"),
                })
                .await?;
            println!("Updated {} <{}>", identity.name, identity.email);
        }
        "update-password" => {
            store
                .update_password(&PasswordUpdate {
                    current_password: required(args, "current").to_string(),
                    new_password: required(args, "new").to_string(),
                    confirm_password: required(args, "confirm").to_string(),
                })
                .await?;
            println!("Password updated");
        }
        "open" => {
            let path = required(args, "path");
            let screen = parse_screen(path)
                .ok_or_else(|| Error::NotFound(format!("No page at {path}")))?;
            println!("{}", navigation::resolve(&store.status(), screen));
        }
        "elections" => {
            let elections = if args.get_flag("active") {
                api.elections().active().await?
            } else {
                api.elections().all().await?
            };
            for election in &elections {
                print_election(election);
            }
        }
        "election" => {
            let election = api
                .elections()
                .get(&ElectionId::new(required(args, "election")))
                .await?;
            print_election(&election);
            if !election.description.is_empty() {
                println!("{}", election.description);
            }
        }
        "candidates" => {
            let election = ElectionId::new(required(args, "election"));
            let candidates = if args.get_flag("all") {
                api.candidates().for_election(&election).await?
            } else {
                api.candidates().ballot(&election).await?
            };
            for candidate in &candidates {
                println!(
                    "{}  {:<28} {}{}",
                    candidate.id,
                    candidate.name,
                    candidate.position,
                    if candidate.is_approved { "" } else { "  (pending approval)" }
                );
            }
        }
        "vote" => {
            let election = api
                .elections()
                .get(&ElectionId::new(required(args, "election")))
                .await?;
            let identity = store
                .current_identity()
                .ok_or_else(|| Error::Unauthorized("Sign in to vote".to_string()))?;
            let has_voted = VoteGuard::new(store.clone()).has_voted(&election.id).await?;
            let caster = VoteCaster::new(store.clone(), election.id.clone(), config.vote_timeout());

            let affordance =
                eligibility::affordance(&election, &identity, has_voted, &caster.state());
            if let VoteAffordance::AlreadyVoted {
                results_available: true,
            } = affordance
            {
                println!("Results: {}", Screen::VoterResults(election.id.clone()));
            }
            ensure_can_vote(affordance, &election)?;

            let receipt = caster
                .cast(&CandidateId::new(required(args, "candidate")))
                .await?;
            println!("Vote recorded in {}.", election.title);
            if let Some(token) = receipt.verification_token {
                println!("Receipt: {token}");
            }
        }
        "has-voted" => {
            let voted = VoteGuard::new(store.clone())
                .has_voted(&ElectionId::new(required(args, "election")))
                .await?;
            println!("{}", if voted { "yes" } else { "no" });
        }
        "results" => {
            let election = ElectionId::new(required(args, "election"));
            if args.get_flag("watch") {
                let mut live = LiveResults::new(api.clone(), election, config.poll_interval());
                loop {
                    match live.next().await {
                        Ok(standings) => {
                            print_standings(&standings);
                            println!();
                        }
                        Err(e @ Error::Unauthorized(_)) => return Err(e),
                        Err(e) => eprintln!("Refresh failed: {e}"),
                    }
                }
            }
            let source = if args.get_flag("live") {
                ResultsSource::Live
            } else {
                ResultsSource::Published
            };
            print_standings(&Standings::fetch(api, &election, source).await?);
        }
        "verify-receipt" => {
            let verification = api.votes().verify(required(args, "token")).await?;
            if verification.verified {
                let title = verification
                    .election
                    .map(|e| e.title)
                    .unwrap_or_default();
                println!("Vote verified: {title}");
            } else {
                println!("Vote could not be verified");
            }
        }
        "create-election" => {
            let time = |name: &str| {
                args.get_one::<DateTime<Utc>>(name)
                    .copied()
                    .ok_or_else(|| Error::Validation(format!("--{name} is required")))
            };
            let spec = ElectionSpec {
                title: required(args, "title").to_string(),
                description: required(args, "description").to_string(),
                start_date: time("start")?,
                end_date: time("end")?,
                voting_type: SINGLE_CHOICE.to_string(),
            };
            let election = api.elections().create(&spec).await?;
            println!("Created draft election {}", election.id);
        }
        "edit-election" => {
            let election = api
                .elections()
                .get(&ElectionId::new(required(args, "election")))
                .await?;
            let time = |name: &str, current: Option<DateTime<Utc>>| {
                args.get_one::<DateTime<Utc>>(name)
                    .copied()
                    .or(current)
                    .ok_or_else(|| Error::Validation(format!("--{name} is required")))
            };
            let spec = ElectionSpec {
                title: optional(args, "title").unwrap_or_else(|| election.title.clone()),
                description: optional(args, "description")
                    .unwrap_or_else(|| election.description.clone()),
                start_date: time("start", election.start_date)?,
                end_date: time("end", election.end_date)?,
                voting_type: election.voting_type.clone(),
            };
            let election = api.elections().update(&election, &spec).await?;
            print_election(&election);
        }
        "delete-election" => {
            let ack = api
                .elections()
                .delete(&ElectionId::new(required(args, "election")))
                .await?;
            print_ack(ack, "Election deleted");
        }
        "add-candidate" => {
            let candidate = api
                .candidates()
                .create(&CandidateSpec {
                    name: required(args, "name").to_string(),
                    position: required(args, "position").to_string(),
                    bio: optional(args, "bio"),
                    party: optional(args, "party"),
                    election: ElectionId::new(required(args, "election")),
                })
                .await?;
            println!("Added {} ({}), pending approval", candidate.name, candidate.id);
        }
        "edit-candidate" => {
            let id = CandidateId::new(required(args, "candidate"));
            let current = api.candidates().get(&id).await?;
            let spec = CandidateSpec {
                name: optional(args, "name").unwrap_or(current.name),
                position: optional(args, "position").unwrap_or(current.position),
                bio: optional(args, "bio").or(current.bio),
                party: optional(args, "party").or(current.party),
                election: current.election,
            };
            let candidate = api.candidates().update(&id, &spec).await?;
            println!("Updated {}", candidate.name);
        }
        "delete-candidate" => {
            let ack = api
                .candidates()
                .delete(&CandidateId::new(required(args, "candidate")))
                .await?;
            print_ack(ack, "Candidate removed");
        }
        "publish" => {
            let election = api
                .elections()
                .get(&ElectionId::new(required(args, "election")))
                .await?;
            api.elections().publish_results(&election).await?;
            println!("Results of {} published", election.title);
        }
        "approve" => {
            let candidate = api
                .candidates()
                .approve(&CandidateId::new(required(args, "candidate")))
                .await?;
            println!("{} approved", candidate.name);
        }
        "users" => {
            for user in api.admin().users().await? {
                println!(
                    "{}  {:<24} {:<28} {:<16} {}{}",
                    user.id,
                    user.name,
                    user.email,
                    user.role,
                    if user.is_verified { "verified" } else { "unverified" },
                    if user.is_active { "" } else { ", suspended" }
                );
            }
        }
        "verify-user" | "suspend-user" | "activate-user" => {
            let id = UserId::new(required(args, "user"));
            let user = match command {
                "verify-user" => api.admin().verify_user(&id).await?,
                "suspend-user" => api.admin().suspend_user(&id).await?,
                _ => api.admin().activate_user(&id).await?,
            };
            println!(
                "{}: {}, {}",
                user.email,
                if user.is_verified { "verified" } else { "unverified" },
                if user.is_active { "active" } else { "suspended" }
            );
        }
        "set-role" => {
            let role = parse_role(required(args, "role"))
                .ok_or_else(|| Error::Validation("Unknown role".to_string()))?;
            let user = api
                .admin()
                .update_role(&UserId::new(required(args, "user")), role)
                .await?;
            println!("{} is now {}", user.email, user.role);
        }
        "stats" => {
            let stats = api.admin().stats().await?;
            let overview = &stats.overview;
            println!("Users:     {} ({} verified)", overview.total_users, overview.verified_users);
            println!("Elections: {} ({} active)", overview.total_elections, overview.active_elections);
            println!("Votes:     {}", overview.total_votes);
            println!("Turnout:   {:.2}%", overview.voter_turnout);
            if !stats.suspicious_activities.is_empty() {
                println!("{} suspicious activities", stats.suspicious_activities.len());
            }
        }
        "audit-logs" => {
            let query = AuditLogQuery {
                action: optional(args, "action"),
                severity: args
                    .get_one::<String>("severity")
                    .and_then(|s| parse_severity(s)),
                page: args.get_one::<u32>("page").copied().unwrap_or(1),
                limit: args.get_one::<u32>("limit").copied().unwrap_or(50),
            };
            let page = api.admin().audit_logs(&query).await?;
            for log in &page.logs {
                println!(
                    "{}  {:<8} {:<24} {}",
                    log.created_at,
                    format!("{:?}", log.severity),
                    log.action_label(),
                    log.user_id.as_ref().map(UserId::as_str).unwrap_or("system")
                );
            }
            println!("Page {} of {}", page.page, page.pages);
        }
        "settings" => {
            let mut settings = api.admin().settings().await?;
            let before = settings.clone();
            if let Some(name) = optional(args, "site-name") {
                settings.site_name = name;
            }
            if let Some(description) = optional(args, "site-description") {
                settings.site_description = description;
            }
            if let Some(email) = optional(args, "contact-email") {
                settings.contact_email = email;
            }
            if let Some(&maintenance) = args.get_one::<bool>("maintenance") {
                settings.maintenance_mode = maintenance;
            }
            if let Some(&allow) = args.get_one::<bool>("allow-registration") {
                settings.allow_registration = allow;
            }
            if let Some(&max) = args.get_one::<u32>("max-candidates") {
                settings.max_candidates_per_election = max;
            }
            if settings != before {
                settings = api.admin().update_settings(&settings).await?;
            }
            println!("Site name:          {}", settings.site_name);
            println!("Description:        {}", settings.site_description);
            println!("Contact:            {}", settings.contact_email);
            println!("Maintenance mode:   {}", settings.maintenance_mode);
            println!("Registration open:  {}", settings.allow_registration);
            println!("Max candidates:     {}", settings.max_candidates_per_election);
        }
        other => debug!("Unhandled subcommand {other}"),
    }
    Ok(())
}

async fn start(args: &ArgMatches) -> Result<()> {
    let config = load_config(args)?;
    let store = SessionStore::new(ApiClient::from_config(&config)?);
    match args.subcommand() {
        Some((command, sub_args)) => execute(&store, &config, command, sub_args).await,
        None => Ok(()),
    }
}

/// Run a subcommand and return the exit code.
async fn run(args: &ArgMatches) -> u8 {
    match start(args).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{e}");
            if let Error::Unauthorized(_) = e {
                eprintln!("Sign in with `{PROGRAM_NAME} login <EMAIL>`.");
            }
            exit_code(&e)
        }
    }
}

fn exit_code(error: &Error) -> u8 {
    match error {
        Error::Unauthorized(_) => 2,
        _ => 1,
    }
}

#[tokio::main]
async fn main() {
    let args = cli().get_matches();
    init_logging(args.get_flag(VERBOSE));
    let exit_code = run(&args).await;
    std::process::exit(exit_code.into())
}
