use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicUsize, Ordering};

use log::{error, info, warn};
use reqwest::Method;

/// A unique identifier for a particular request.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub struct RequestId(pub usize);

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl RequestId {
    /// Atomically get the next ID. This wraps around back to zero if you somehow exceed a usize.
    pub fn next() -> RequestId {
        static REQUEST_ID_COUNTER: AtomicUsize = AtomicUsize::new(0);
        RequestId(REQUEST_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Log an outgoing request.
pub fn log_request(id: RequestId, method: &Method, path: &str) {
    info!("->req{id} {method} {path}");
}

/// Log the response to a request, at a level matching its status class.
pub fn log_response(id: RequestId, status: u16, path: &str) {
    let log_msg = format!("<-rsp{id} {status} {path}");
    match status {
        500..=u16::MAX => error!("{log_msg}"),
        400..=499 => warn!("{log_msg}"),
        _ => info!("{log_msg}"),
    }
}

/// Log a request that never got a response.
pub fn log_failure(id: RequestId, path: &str, reason: &dyn Display) {
    error!("<-rsp{id} FAILED {path}: {reason}");
}
