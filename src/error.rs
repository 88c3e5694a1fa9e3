use thiserror::Error;

/// Fatal dispatch failures. Nothing is sent when one of these is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    #[error("no emergency contacts configured")]
    NoContacts,
    #[error("location permission denied")]
    PermissionDenied,
    #[error("location unavailable: {0}")]
    LocationUnavailable(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LocationError {
    #[error("permission denied")]
    Denied,
    #[error("position fetch failed: {0}")]
    Unavailable(String),
}

impl From<LocationError> for DispatchError {
    fn from(e: LocationError) -> Self {
        match e {
            LocationError::Denied => DispatchError::PermissionDenied,
            LocationError::Unavailable(reason) => DispatchError::LocationUnavailable(reason),
        }
    }
}

/// Per-contact delivery failure. Never aborts the batch.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Built with the request URL stripped; the URL carries the sending domain.
    #[error("request failed: {0}")]
    Http(#[source] reqwest::Error),
    #[error("rejected with status {status}: {body_excerpt}")]
    Status { status: u16, body_excerpt: String },
    #[error("recipient is not an address: {0}")]
    InvalidRecipient(String),
    #[error("delivery aborted: {0}")]
    Aborted(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("notification failed: {0}")]
pub struct NotificationError(pub String);

#[derive(Debug, Clone, PartialEq, Error)]
#[error("speech failed: {0}")]
pub struct SpeechError(pub String);

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContactError {
    #[error("not a valid email address: {0:?}")]
    InvalidAddress(String),
    #[error("no contact at index {0}")]
    NoSuchContact(usize),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("unknown command: {0}")]
    Unknown(String),
    #[error("{command}: {reason}")]
    BadArgument { command: &'static str, reason: String },
}
