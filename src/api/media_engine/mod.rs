#[cfg(test)]
mod media_engine_test;

use std::ops::Range;

use crate::error::{Error, Result};
use crate::rtp_transceiver::rtp_codec::{
    RTCRtpCodecCapability, RTCRtpCodecParameters, RTCRtpHeaderExtensionCapability,
    RTCRtpHeaderExtensionParameters, RTCRtpParameters, RTPCodecType,
};
use crate::rtp_transceiver::{PayloadType, RTCPFeedback};

/// MIME_TYPE_H264 H264 MIME type.
/// Note: Matching should be case insensitive.
pub const MIME_TYPE_H264: &str = "video/H264";
/// MIME_TYPE_OPUS Opus MIME type
/// Note: Matching should be case insensitive.
pub const MIME_TYPE_OPUS: &str = "audio/opus";
/// MIME_TYPE_VP8 VP8 MIME type
/// Note: Matching should be case insensitive.
pub const MIME_TYPE_VP8: &str = "video/VP8";
/// MIME_TYPE_VP9 VP9 MIME type
/// Note: Matching should be case insensitive.
pub const MIME_TYPE_VP9: &str = "video/VP9";
/// MIME_TYPE_G722 G722 MIME type
/// Note: Matching should be case insensitive.
pub const MIME_TYPE_G722: &str = "audio/G722";
/// MIME_TYPE_PCMU PCMU MIME type
/// Note: Matching should be case insensitive.
pub const MIME_TYPE_PCMU: &str = "audio/PCMU";
/// MIME_TYPE_PCMA PCMA MIME type
/// Note: Matching should be case insensitive.
pub const MIME_TYPE_PCMA: &str = "audio/PCMA";

const VALID_EXT_IDS: Range<isize> = 1..15;

#[derive(Default, Debug, Clone)]
struct MediaEngineHeaderExtension {
    uri: String,
    is_audio: bool,
    is_video: bool,
}

impl MediaEngineHeaderExtension {
    fn is_kind(&self, typ: RTPCodecType) -> bool {
        match typ {
            RTPCodecType::Audio => self.is_audio,
            RTPCodecType::Video => self.is_video,
            RTPCodecType::Unspecified => false,
        }
    }
}

fn codec(
    mime_type: &str,
    clock_rate: u32,
    channels: u16,
    sdp_fmtp_line: &str,
    rtcp_feedback: &[RTCPFeedback],
    payload_type: PayloadType,
) -> RTCRtpCodecParameters {
    RTCRtpCodecParameters {
        capability: RTCRtpCodecCapability {
            mime_type: mime_type.to_owned(),
            clock_rate,
            channels,
            sdp_fmtp_line: sdp_fmtp_line.to_owned(),
            rtcp_feedback: rtcp_feedback.to_vec(),
        },
        payload_type,
        ..Default::default()
    }
}

/// A MediaEngine holds the negotiated codecs and header extensions of one connection,
/// per media kind. It is filled in before the connection is built and read-only after.
#[derive(Default, Debug, Clone)]
pub struct MediaEngine {
    pub(crate) video_codecs: Vec<RTCRtpCodecParameters>,
    pub(crate) audio_codecs: Vec<RTCRtpCodecParameters>,
    header_extensions: Vec<MediaEngineHeaderExtension>,
}

impl MediaEngine {
    /// register_default_codecs registers Opus, G722, PCMU and PCMA for audio and VP8, VP9 and
    /// H264 for video, at their conventional payload types.
    pub fn register_default_codecs(&mut self) -> Result<()> {
        for c in [
            codec(MIME_TYPE_OPUS, 48000, 2, "minptime=10;useinbandfec=1", &[], 111),
            codec(MIME_TYPE_G722, 8000, 0, "", &[], 9),
            codec(MIME_TYPE_PCMU, 8000, 0, "", &[], 0),
            codec(MIME_TYPE_PCMA, 8000, 0, "", &[], 8),
        ] {
            self.register_codec(c, RTPCodecType::Audio)?;
        }

        let video_rtcp_feedback = [
            RTCPFeedback {
                typ: "goog-remb".to_owned(),
                parameter: "".to_owned(),
            },
            RTCPFeedback {
                typ: "ccm".to_owned(),
                parameter: "fir".to_owned(),
            },
            RTCPFeedback {
                typ: "nack".to_owned(),
                parameter: "".to_owned(),
            },
            RTCPFeedback {
                typ: "nack".to_owned(),
                parameter: "pli".to_owned(),
            },
        ];
        for c in [
            codec(MIME_TYPE_VP8, 90000, 0, "", &video_rtcp_feedback, 96),
            codec(MIME_TYPE_VP9, 90000, 0, "profile-id=0", &video_rtcp_feedback, 98),
            codec(MIME_TYPE_VP9, 90000, 0, "profile-id=1", &video_rtcp_feedback, 100),
            codec(
                MIME_TYPE_H264,
                90000,
                0,
                "level-asymmetry-allowed=1;packetization-mode=1;profile-level-id=42001f",
                &video_rtcp_feedback,
                102,
            ),
            codec(
                MIME_TYPE_H264,
                90000,
                0,
                "level-asymmetry-allowed=1;packetization-mode=0;profile-level-id=42001f",
                &video_rtcp_feedback,
                127,
            ),
        ] {
            self.register_codec(c, RTPCodecType::Video)?;
        }

        Ok(())
    }

    /// add_codec will append codec if it not exists
    fn add_codec(codecs: &mut Vec<RTCRtpCodecParameters>, codec: RTCRtpCodecParameters) {
        let exists = codecs.iter().any(|c| {
            c.capability.mime_type == codec.capability.mime_type
                && c.payload_type == codec.payload_type
        });
        if !exists {
            codecs.push(codec);
        }
    }

    /// register_codec adds codec to the MediaEngine
    /// These are the list of codecs supported by this connection.
    pub fn register_codec(
        &mut self,
        mut codec: RTCRtpCodecParameters,
        typ: RTPCodecType,
    ) -> Result<()> {
        codec.stats_id = format!("RTPCodec-{}-{}", typ, codec.payload_type);
        match typ {
            RTPCodecType::Audio => MediaEngine::add_codec(&mut self.audio_codecs, codec),
            RTPCodecType::Video => MediaEngine::add_codec(&mut self.video_codecs, codec),
            RTPCodecType::Unspecified => return Err(Error::ErrUnknownType),
        }
        Ok(())
    }

    /// register_header_extension adds a header extension for `typ`. Extensions are assigned ids
    /// 1 to 14 in registration order; registering a known URI for another kind keeps its id.
    pub fn register_header_extension(
        &mut self,
        extension: RTCRtpHeaderExtensionCapability,
        typ: RTPCodecType,
    ) -> Result<()> {
        if typ == RTPCodecType::Unspecified {
            return Err(Error::ErrUnknownType);
        }

        let index = match self
            .header_extensions
            .iter()
            .position(|ext| ext.uri == extension.uri)
        {
            Some(index) => index,
            None => {
                if self.header_extensions.len() as isize >= VALID_EXT_IDS.end - VALID_EXT_IDS.start
                {
                    return Err(Error::ErrRegisterHeaderExtensionNoFreeID);
                }
                self.header_extensions.push(MediaEngineHeaderExtension {
                    uri: extension.uri,
                    ..Default::default()
                });
                self.header_extensions.len() - 1
            }
        };

        let ext = &mut self.header_extensions[index];
        match typ {
            RTPCodecType::Audio => ext.is_audio = true,
            RTPCodecType::Video => ext.is_video = true,
            RTPCodecType::Unspecified => {}
        }

        Ok(())
    }

    /// register_feedback adds feedback mechanism to already registered codecs.
    pub fn register_feedback(&mut self, feedback: RTCPFeedback, typ: RTPCodecType) {
        let codecs = match typ {
            RTPCodecType::Video => &mut self.video_codecs,
            RTPCodecType::Audio => &mut self.audio_codecs,
            RTPCodecType::Unspecified => return,
        };
        for c in codecs {
            c.capability.rtcp_feedback.push(feedback.clone());
        }
    }

    /// get_header_extension_id returns the id assigned to a header extension, if registered.
    pub fn get_header_extension_id(
        &self,
        extension: &RTCRtpHeaderExtensionCapability,
    ) -> Option<isize> {
        self.header_extensions
            .iter()
            .position(|ext| ext.uri == extension.uri)
            .map(|index| VALID_EXT_IDS.start + index as isize)
    }

    /// get_codecs_by_kind returns the codecs registered for `typ`.
    pub fn get_codecs_by_kind(&self, typ: RTPCodecType) -> Vec<RTCRtpCodecParameters> {
        match typ {
            RTPCodecType::Video => self.video_codecs.clone(),
            RTPCodecType::Audio => self.audio_codecs.clone(),
            RTPCodecType::Unspecified => vec![],
        }
    }

    /// get_rtp_parameters_by_kind returns the codecs and header extensions registered for `typ`.
    pub fn get_rtp_parameters_by_kind(&self, typ: RTPCodecType) -> RTCRtpParameters {
        let header_extensions = self
            .header_extensions
            .iter()
            .enumerate()
            .filter(|(_, ext)| ext.is_kind(typ))
            .map(|(index, ext)| RTCRtpHeaderExtensionParameters {
                uri: ext.uri.clone(),
                id: VALID_EXT_IDS.start + index as isize,
            })
            .collect();

        RTCRtpParameters {
            header_extensions,
            codecs: self.get_codecs_by_kind(typ),
        }
    }

    /// get_codec_by_payload looks a payload type up across video and audio codecs.
    pub fn get_codec_by_payload(
        &self,
        payload_type: PayloadType,
    ) -> Result<(RTCRtpCodecParameters, RTPCodecType)> {
        let video = self
            .video_codecs
            .iter()
            .map(|c| (c, RTPCodecType::Video));
        let audio = self
            .audio_codecs
            .iter()
            .map(|c| (c, RTPCodecType::Audio));

        video
            .chain(audio)
            .find(|(c, _)| c.payload_type == payload_type)
            .map(|(c, typ)| (c.clone(), typ))
            .ok_or(Error::ErrCodecNotFound)
    }
}
