use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of fetching one request
///
/// Exactly one variant holds per fetch. A page that carries no usable data is
/// never reported as an empty `Success`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Usable page body
    Success {
        body: String,
        /// Whether the body came from the page cache instead of the network
        from_cache: bool,
    },

    /// HTTP 200 whose body carries no usable data
    SoftFailure(SoftFailureKind),

    /// Terminal failure for this request
    HardFailure(HardFailureKind),
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The reason this outcome costs coverage, if it does
    ///
    /// `no_results` is an expected empty listing and yields `None`.
    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self {
            Self::Success { .. } => None,
            Self::SoftFailure(SoftFailureKind::NoResults) => None,
            Self::SoftFailure(kind) => Some(FailureReason::SoftFailure(*kind)),
            Self::HardFailure(kind) => Some(FailureReason::HardFailure(kind.clone())),
        }
    }
}

/// Kinds of HTTP-200 pages without usable data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoftFailureKind {
    BotChallenge,
    LoginWall,
    NoResults,
}

impl SoftFailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BotChallenge => "bot_challenge",
            Self::LoginWall => "login_wall",
            Self::NoResults => "no_results",
        }
    }
}

impl fmt::Display for SoftFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kinds of terminal request failures
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HardFailureKind {
    /// The request URL could not be built or parsed; nothing was sent
    InvalidUrl,

    /// HTTP 404
    NotFound,

    /// Transient failures persisted through every allowed attempt
    ExhaustedRetries { attempts: u32 },

    /// A status outside the handled set persisted after its single retry
    UnexpectedStatus { status: u16 },

    /// A non-transient transport error
    NetworkError { message: String },
}

impl fmt::Display for HardFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUrl => f.write_str("invalid_url"),
            Self::NotFound => f.write_str("not_found"),
            Self::ExhaustedRetries { attempts } => {
                write!(f, "exhausted_retries after {} attempts", attempts)
            }
            Self::UnexpectedStatus { status } => write!(f, "unexpected_status {}", status),
            Self::NetworkError { message } => write!(f, "network_error: {}", message),
        }
    }
}

/// Why a request is listed in an aggregate's failure list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    SoftFailure(SoftFailureKind),
    HardFailure(HardFailureKind),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SoftFailure(kind) => write!(f, "soft failure ({})", kind),
            Self::HardFailure(kind) => write!(f, "hard failure ({})", kind),
        }
    }
}
