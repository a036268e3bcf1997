pub mod track_local;
pub mod track_remote;

use std::sync::Arc;

use track_remote::*;

use crate::interceptor::stream_info::StreamInfo;
use crate::interceptor::RTCPReader;
use crate::transport::ReadStream;

pub(crate) const RTP_PAYLOAD_TYPE_BITMASK: u8 = 0x7F;

#[derive(Clone)]
pub(crate) struct TrackStream {
    pub(crate) stream_info: StreamInfo,
    pub(crate) rtp_read_stream: Arc<dyn ReadStream + Send + Sync>,
    pub(crate) rtcp_read_stream: Arc<dyn ReadStream + Send + Sync>,
    pub(crate) rtcp_interceptor: Arc<dyn RTCPReader + Send + Sync>,
}

/// TrackStreams maintains the mapping of RTP/RTCP streams to a specific track
#[derive(Clone)]
pub(crate) struct TrackStreams {
    pub(crate) track: Arc<TrackRemote>,
    pub(crate) stream: TrackStream,
}
