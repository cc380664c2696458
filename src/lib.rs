//! Client for the online voting platform's API.
//!
//! The server owns every rule that matters: authentication, vote recording, tallying
//! and auditing. This crate keeps a session, mirrors what the server reports, and
//! refuses locally what the server would certainly refuse.

#[cfg(test)]
#[macro_use]
extern crate client_test;

pub mod api;
pub mod casting;
pub mod config;
pub mod eligibility;
pub mod error;
pub mod logging;
pub mod model;
pub mod navigation;
pub mod results;
pub mod session;
pub mod storage;
pub mod transport;

#[cfg(test)]
mod mock;

pub use api::ApiClient;
pub use config::Config;
pub use error::{Error, ErrorKind, Result};
pub use session::{SessionSlot, SessionStatus, SessionStore};
