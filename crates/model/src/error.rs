use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// The kind of error that occurred while talking to a model provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The content is moderated.
    Moderated,
    /// The model provider is rate limited.
    RateLimitExceeded,
    /// The credentials were rejected by the provider.
    Authentication,
    /// The request never got a response (connection, DNS, TLS, ...).
    Transport,
    /// The provider answered with something that can't be understood.
    MalformedResponse,
    /// Any other errors.
    Other,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Moderated => "content moderated",
            ErrorKind::RateLimitExceeded => "rate limit exceeded",
            ErrorKind::Authentication => "authentication failed",
            ErrorKind::Transport => "transport error",
            ErrorKind::MalformedResponse => "malformed response",
            ErrorKind::Other => "other error",
        };
        f.write_str(s)
    }
}
