use crate::interceptor::stream_info::{RTPHeaderExtension, StreamCodec, StreamInfo};
use crate::rtp_transceiver::rtp_codec::*;

pub(crate) mod fmtp;
pub mod rtp_codec;
pub mod rtp_receiver;
pub mod rtp_sender;
pub(crate) mod sender_stream;

pub use crate::interceptor::stream_info::RTCPFeedback;

/// SSRC represents a synchronization source
/// A synchronization source is a randomly chosen
/// value meant to be globally unique within a particular
/// RTP session. Used to identify a single stream of media.
/// <https://tools.ietf.org/html/rfc3550#section-3>
#[allow(clippy::upper_case_acronyms)]
pub type SSRC = u32;

/// PayloadType identifies the format of the RTP payload and determines
/// its interpretation by the application. Each codec in a RTP Session
/// will have a different PayloadType
/// <https://tools.ietf.org/html/rfc3550#section-3>
pub type PayloadType = u8;

/// TYPE_RTCP_FB_TRANSPORT_CC ..
pub const TYPE_RTCP_FB_TRANSPORT_CC: &str = "transport-cc";

/// TYPE_RTCP_FB_GOOG_REMB ..
pub const TYPE_RTCP_FB_GOOG_REMB: &str = "goog-remb";

/// TYPE_RTCP_FB_CCM ..
pub const TYPE_RTCP_FB_CCM: &str = "ccm";

/// TYPE_RTCP_FB_NACK ..
pub const TYPE_RTCP_FB_NACK: &str = "nack";

/// RTCRtpCodingParameters provides information relating to both encoding and decoding.
/// <http://draft.ortc.org/#dom-rtcrtpcodingparameters>
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct RTCRtpCodingParameters {
    pub rid: String,
    pub ssrc: SSRC,
    pub payload_type: PayloadType,
}

/// RTCRtpDecodingParameters provides information relating to decoding.
pub type RTCRtpDecodingParameters = RTCRtpCodingParameters;

/// RTCRtpEncodingParameters provides information relating to encoding.
pub type RTCRtpEncodingParameters = RTCRtpCodingParameters;

/// RTCRtpReceiveParameters contains the RTP stack settings used by receivers
#[derive(Default, Debug, Clone)]
pub struct RTCRtpReceiveParameters {
    pub encodings: Vec<RTCRtpDecodingParameters>,
}

/// RTCRtpSendParameters contains the RTP stack settings used by senders
#[derive(Default, Debug, Clone)]
pub struct RTCRtpSendParameters {
    pub rtp_parameters: RTCRtpParameters,
    pub encodings: Vec<RTCRtpEncodingParameters>,
}

/// create_stream_info snapshots everything interceptors learn about a stream at bind time.
pub(crate) fn create_stream_info(
    id: String,
    ssrc: SSRC,
    payload_type: PayloadType,
    codec: RTCRtpCodecCapability,
    codecs: &[RTCRtpCodecParameters],
    header_extensions: &[RTCRtpHeaderExtensionParameters],
) -> StreamInfo {
    let rtp_header_extensions = header_extensions
        .iter()
        .map(|h| RTPHeaderExtension {
            id: h.id,
            uri: h.uri.clone(),
        })
        .collect();
    let codecs = codecs
        .iter()
        .map(|c| StreamCodec {
            payload_type: c.payload_type,
            mime_type: c.capability.mime_type.clone(),
            clock_rate: c.capability.clock_rate,
            channels: c.capability.channels,
            sdp_fmtp_line: c.capability.sdp_fmtp_line.clone(),
        })
        .collect();

    StreamInfo {
        id,
        ssrc,
        payload_type,
        rtp_header_extensions,
        mime_type: codec.mime_type,
        clock_rate: codec.clock_rate,
        channels: codec.channels,
        sdp_fmtp_line: codec.sdp_fmtp_line,
        rtcp_feedback: codec.rtcp_feedback,
        codecs,
    }
}
