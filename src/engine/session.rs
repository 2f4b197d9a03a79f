// Session identity — one id per analysis attempt, exactly one current at a time.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::config::SESSION_ID_SUFFIX_LEN;

/// Opaque token identifying one analysis attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Allocate a fresh id: epoch milliseconds plus a random suffix.
    ///
    /// The timestamp component is monotonic enough across user actions and
    /// the suffix covers rapid repeated invocations within one millisecond.
    pub fn generate() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SESSION_ID_SUFFIX_LEN)
            .map(char::from)
            .collect();
        SessionId(format!("{}_{}", millis, suffix.to_lowercase()))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of one session, owned by the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Starting,
    Running,
    Completed,
    Failed,
    Superseded,
}

/// Shared record of which session is current.
///
/// The single authority components consult before acting on any response;
/// a response gated against a non-current id is dropped silently, since
/// supersession is an expected, non-exceptional event.
#[derive(Default)]
pub struct SessionGate {
    current: RwLock<Option<SessionId>>,
}

impl SessionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_current(&self, id: SessionId) {
        *self.current.write() = Some(id);
    }

    pub fn clear(&self) {
        *self.current.write() = None;
    }

    pub fn is_current(&self, id: &SessionId) -> bool {
        self.current.read().as_ref().is_some_and(|cur| cur == id)
    }

    pub fn current(&self) -> Option<SessionId> {
        self.current.read().clone()
    }
}
