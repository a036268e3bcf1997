//! Negative acknowledgement (RFC 4585 generic NACK) interceptors.
//!
//! [`Responder`] keeps a short history of outgoing packets and resends the ones a remote
//! peer reports lost. [`Generator`] watches incoming sequence numbers and periodically
//! reports the gaps back to the sender.

use crate::interceptor::stream_info::StreamInfo;

pub mod generator;
pub mod responder;

pub use generator::{Generator, GeneratorBuilder};
pub use responder::{Responder, ResponderBuilder};

/// Sequence numbers less than half the u16 space apart are treated as "ahead" of each other.
const UINT16SIZE_HALF: u16 = 1 << 15;

/// stream_support_nack reports whether the stream negotiated plain `nack` feedback.
pub fn stream_support_nack(info: &StreamInfo) -> bool {
    info.rtcp_feedback
        .iter()
        .any(|fb| fb.typ == "nack" && fb.parameter.is_empty())
}
