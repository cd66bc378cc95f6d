//! Per-call outcomes and failure classification.
use crate::TRANSIENT_FAULT_PATTERNS;
use std::borrow::Cow;
use std::error::Error;
use std::io;

/// Request ids run from `1` to the configured request count.
pub type RequestId = u64;

/// Result of one completed call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// The call returned, but without a usable payload.
    EmptyResponse,
    /// Connection reset/closed or an unexpected end of stream.
    TransientNetworkFault { message: String },
    OtherFailure {
        label: Cow<'static, str>,
        message: String,
    },
}

/// Failure categories tracked by the aggregate counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureKind {
    EmptyResponse,
    TransientNetworkFault,
    Other,
}

impl FailureKind {
    pub fn is_transient(self) -> bool {
        matches!(self, FailureKind::TransientNetworkFault)
    }
}

impl Outcome {
    pub fn from_payload<P: Payload>(payload: &P) -> Self {
        if payload.has_payload() {
            Outcome::Success
        } else {
            Outcome::EmptyResponse
        }
    }

    /// Classifies an error returned by the remote call.
    pub fn from_error(label: impl Into<Cow<'static, str>>, error: &(dyn Error + 'static)) -> Self {
        let message = error_message(error);
        if is_transient_network_fault(error) {
            Outcome::TransientNetworkFault { message }
        } else {
            Outcome::OtherFailure {
                label: label.into(),
                message,
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    /// `None` for [`Outcome::Success`].
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Outcome::Success => None,
            Outcome::EmptyResponse => Some(FailureKind::EmptyResponse),
            Outcome::TransientNetworkFault { .. } => Some(FailureKind::TransientNetworkFault),
            Outcome::OtherFailure { .. } => Some(FailureKind::Other),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Outcome::Success => "Success",
            Outcome::EmptyResponse => "EmptyResponse",
            Outcome::TransientNetworkFault { .. } => "TransientNetworkFault",
            Outcome::OtherFailure { label, .. } => label.as_ref(),
        }
    }
}

/// A response which may or may not carry something usable.
pub trait Payload {
    fn has_payload(&self) -> bool;
}

impl Payload for () {
    fn has_payload(&self) -> bool {
        true
    }
}

impl Payload for String {
    fn has_payload(&self) -> bool {
        !self.trim().is_empty()
    }
}

impl<T> Payload for Vec<T> {
    fn has_payload(&self) -> bool {
        !self.is_empty()
    }
}

impl<T: Payload> Payload for Option<T> {
    fn has_payload(&self) -> bool {
        self.as_ref().is_some_and(Payload::has_payload)
    }
}

/// Returns true if any error in the `source()` chain is a reset, abort or early EOF, either
/// by `io::ErrorKind` or by one of [`TRANSIENT_FAULT_PATTERNS`] in its message.
pub fn is_transient_network_fault(error: &(dyn Error + 'static)) -> bool {
    chain(error).any(|err| {
        let by_kind = err.downcast_ref::<io::Error>().is_some_and(|io_err| {
            matches!(
                io_err.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::UnexpectedEof
            )
        });

        by_kind || matches_transient_pattern(&err.to_string())
    })
}

pub fn matches_transient_pattern(message: &str) -> bool {
    let message = message.to_lowercase();
    TRANSIENT_FAULT_PATTERNS
        .iter()
        .any(|pattern| message.contains(pattern))
}

/// Joins the messages of an error and its sources with `": "`, skipping sources whose text
/// the outer message already contains.
pub fn error_message(error: &(dyn Error + 'static)) -> String {
    let mut message = error.to_string();
    for source in chain(error).skip(1) {
        let text = source.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
    }
    message
}

/// `my_crate::errors::CallError<u8>` becomes `CallError`.
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

fn chain<'a>(error: &'a (dyn Error + 'static)) -> impl Iterator<Item = &'a (dyn Error + 'static)> {
    std::iter::successors(Some(error), |&err| err.source())
}
