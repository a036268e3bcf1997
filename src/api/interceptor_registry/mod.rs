#[cfg(test)]
mod interceptor_registry_test;

use std::sync::Arc;

use crate::api::media_engine::MediaEngine;
use crate::interceptor::nack::{Generator, Responder};
use crate::interceptor::registry::Registry;
use crate::rtp_transceiver::rtp_codec::RTPCodecType;
use crate::rtp_transceiver::{RTCPFeedback, TYPE_RTCP_FB_NACK};

/// register_default_interceptors will register some useful interceptors.
/// If you want to customize which interceptors are loaded, you should copy the
/// code from this method and remove unwanted interceptors.
pub fn register_default_interceptors(registry: Registry, media_engine: &mut MediaEngine) -> Registry {
    configure_nack(registry, media_engine)
}

/// configure_nack will setup everything necessary for handling generating/responding to nack messages.
pub fn configure_nack(mut registry: Registry, media_engine: &mut MediaEngine) -> Registry {
    media_engine.register_feedback(
        RTCPFeedback {
            typ: TYPE_RTCP_FB_NACK.to_owned(),
            parameter: "".to_owned(),
        },
        RTPCodecType::Video,
    );
    media_engine.register_feedback(
        RTCPFeedback {
            typ: TYPE_RTCP_FB_NACK.to_owned(),
            parameter: "pli".to_owned(),
        },
        RTPCodecType::Video,
    );

    registry.add(Arc::new(Responder::builder().build()));
    registry.add(Arc::new(Generator::builder().build()));
    registry
}
