use super::*;
use crate::api::media_engine::MIME_TYPE_VP8;
use crate::error::Result;
use crate::rtp_transceiver::rtp_codec::{RTCRtpCodecCapability, RTCRtpCodecParameters};

#[test]
fn test_configure_nack_registers_feedback_and_plugins() -> Result<()> {
    let mut m = MediaEngine::default();
    m.register_codec(
        RTCRtpCodecParameters {
            capability: RTCRtpCodecCapability {
                mime_type: MIME_TYPE_VP8.to_owned(),
                clock_rate: 90000,
                ..Default::default()
            },
            payload_type: 96,
            ..Default::default()
        },
        RTPCodecType::Video,
    )?;

    let registry = configure_nack(Registry::new(), &mut m);
    assert_eq!(registry.len(), 2);

    let feedback = &m.get_codecs_by_kind(RTPCodecType::Video)[0]
        .capability
        .rtcp_feedback;
    assert_eq!(
        feedback,
        &vec![
            RTCPFeedback {
                typ: "nack".to_owned(),
                parameter: "".to_owned(),
            },
            RTCPFeedback {
                typ: "nack".to_owned(),
                parameter: "pli".to_owned(),
            },
        ]
    );

    Ok(())
}

#[test]
fn test_register_default_interceptors() {
    let mut m = MediaEngine::default();
    let registry = register_default_interceptors(Registry::new(), &mut m);
    assert_eq!(registry.len(), 2);
}
