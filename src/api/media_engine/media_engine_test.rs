use super::*;

#[test]
fn test_register_default_codecs() -> Result<()> {
    let mut m = MediaEngine::default();
    m.register_default_codecs()?;

    let audio = m.get_codecs_by_kind(RTPCodecType::Audio);
    assert_eq!(audio.len(), 4);
    assert_eq!(audio[0].capability.mime_type, MIME_TYPE_OPUS);
    assert_eq!(audio[0].payload_type, 111);

    let video = m.get_codecs_by_kind(RTPCodecType::Video);
    assert_eq!(video[0].capability.mime_type, MIME_TYPE_VP8);
    assert_eq!(video[0].payload_type, 96);
    assert!(video
        .iter()
        .all(|c| c.capability.rtcp_feedback.iter().any(|fb| fb.typ == "nack")));

    assert!(m.get_codecs_by_kind(RTPCodecType::Unspecified).is_empty());

    Ok(())
}

#[test]
fn test_register_codec_rejects_unspecified_kind() {
    let mut m = MediaEngine::default();
    let result = m.register_codec(
        codec(MIME_TYPE_VP8, 90000, 0, "", &[], 96),
        RTPCodecType::Unspecified,
    );
    assert_eq!(result, Err(Error::ErrUnknownType));
}

#[test]
fn test_register_codec_skips_duplicates() -> Result<()> {
    let mut m = MediaEngine::default();
    m.register_codec(codec(MIME_TYPE_VP8, 90000, 0, "", &[], 96), RTPCodecType::Video)?;
    m.register_codec(codec(MIME_TYPE_VP8, 90000, 0, "", &[], 96), RTPCodecType::Video)?;
    m.register_codec(codec(MIME_TYPE_VP8, 90000, 0, "", &[], 97), RTPCodecType::Video)?;
    assert_eq!(m.get_codecs_by_kind(RTPCodecType::Video).len(), 2);

    Ok(())
}

#[test]
fn test_get_codec_by_payload() -> Result<()> {
    let mut m = MediaEngine::default();
    m.register_default_codecs()?;

    let (c, typ) = m.get_codec_by_payload(96)?;
    assert_eq!(c.capability.mime_type, MIME_TYPE_VP8);
    assert_eq!(typ, RTPCodecType::Video);

    let (c, typ) = m.get_codec_by_payload(0)?;
    assert_eq!(c.capability.mime_type, MIME_TYPE_PCMU);
    assert_eq!(typ, RTPCodecType::Audio);

    assert_eq!(m.get_codec_by_payload(55), Err(Error::ErrCodecNotFound));

    Ok(())
}

#[test]
fn test_register_feedback_only_touches_one_kind() -> Result<()> {
    let mut m = MediaEngine::default();
    m.register_codec(codec(MIME_TYPE_VP8, 90000, 0, "", &[], 96), RTPCodecType::Video)?;
    m.register_codec(codec(MIME_TYPE_OPUS, 48000, 2, "", &[], 111), RTPCodecType::Audio)?;

    m.register_feedback(
        RTCPFeedback {
            typ: "nack".to_owned(),
            parameter: "".to_owned(),
        },
        RTPCodecType::Video,
    );

    assert_eq!(
        m.get_codecs_by_kind(RTPCodecType::Video)[0]
            .capability
            .rtcp_feedback
            .len(),
        1
    );
    assert!(m.get_codecs_by_kind(RTPCodecType::Audio)[0]
        .capability
        .rtcp_feedback
        .is_empty());

    Ok(())
}

#[test]
fn test_register_header_extension_assigns_ids() -> Result<()> {
    let mut m = MediaEngine::default();
    let abs = RTCRtpHeaderExtensionCapability {
        uri: "urn:ietf:params:rtp-hdrext:sdes:mid".to_owned(),
    };
    let level = RTCRtpHeaderExtensionCapability {
        uri: "urn:ietf:params:rtp-hdrext:ssrc-audio-level".to_owned(),
    };

    m.register_header_extension(abs.clone(), RTPCodecType::Video)?;
    m.register_header_extension(level.clone(), RTPCodecType::Audio)?;
    m.register_header_extension(abs.clone(), RTPCodecType::Audio)?;

    assert_eq!(m.get_header_extension_id(&abs), Some(1));
    assert_eq!(m.get_header_extension_id(&level), Some(2));

    let video = m.get_rtp_parameters_by_kind(RTPCodecType::Video);
    assert_eq!(video.header_extensions.len(), 1);
    assert_eq!(video.header_extensions[0].id, 1);

    let audio = m.get_rtp_parameters_by_kind(RTPCodecType::Audio);
    assert_eq!(audio.header_extensions.len(), 2);

    Ok(())
}

#[test]
fn test_register_header_extension_runs_out_of_ids() -> Result<()> {
    let mut m = MediaEngine::default();
    for i in 0..14 {
        m.register_header_extension(
            RTCRtpHeaderExtensionCapability {
                uri: format!("urn:test:{i}"),
            },
            RTPCodecType::Video,
        )?;
    }

    let result = m.register_header_extension(
        RTCRtpHeaderExtensionCapability {
            uri: "urn:test:one-too-many".to_owned(),
        },
        RTPCodecType::Video,
    );
    assert_eq!(result, Err(Error::ErrRegisterHeaderExtensionNoFreeID));

    Ok(())
}
