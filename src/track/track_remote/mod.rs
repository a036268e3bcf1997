#[cfg(test)]
mod track_remote_test;

use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use bytes::Bytes;
use util::sync::Mutex as SyncMutex;
use util::Unmarshal;

use crate::api::media_engine::MediaEngine;
use crate::error::{Error, Result};
use crate::interceptor::stream_info::StreamInfo;
use crate::interceptor::{Attributes, Interceptor, RTPReader};
use crate::rtp_transceiver::rtp_codec::{RTCRtpCodecParameters, RTCRtpParameters, RTPCodecType};
use crate::rtp_transceiver::rtp_receiver::RTPReceiverInternal;
use crate::rtp_transceiver::{PayloadType, SSRC};
use crate::track::RTP_PAYLOAD_TYPE_BITMASK;

/// TrackRemote represents a single inbound source of media
pub struct TrackRemote {
    id: SyncMutex<String>,
    stream_id: SyncMutex<String>,

    receive_mtu: usize,
    payload_type: AtomicU8, //PayloadType,
    kind: AtomicU8,         //RTPCodecType,
    ssrc: AtomicU32,        //SSRC,
    codec: SyncMutex<RTCRtpCodecParameters>,
    pub(crate) params: SyncMutex<RTCRtpParameters>,
    rid: String,

    media_engine: Arc<MediaEngine>,

    receiver: Weak<RTPReceiverInternal>,
    peeked: SyncMutex<Option<Bytes>>,
    rtp_interceptor: SyncMutex<Option<Arc<dyn RTPReader + Send + Sync>>>,
}

impl std::fmt::Debug for TrackRemote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackRemote")
            .field("id", &self.id())
            .field("stream_id", &self.stream_id())
            .field("payload_type", &self.payload_type())
            .field("kind", &self.kind())
            .field("ssrc", &self.ssrc())
            .field("rid", &self.rid)
            .finish()
    }
}

/// TrackRemoteReader is the raw end of a track's interceptor pipeline: it hands out the
/// peeked packet or the next packet from the receiver, parsed.
struct TrackRemoteReader {
    track: Weak<TrackRemote>,
}

#[async_trait]
impl RTPReader for TrackRemoteReader {
    async fn read(
        &self,
        buf: &mut [u8],
        a: &Attributes,
    ) -> Result<(rtp::packet::Packet, Attributes)> {
        let track = self.track.upgrade().ok_or(Error::ErrRTPReceiverNil)?;
        let n = track.read(buf).await?;
        let pkt = rtp::packet::Packet::unmarshal(&mut &buf[..n])?;
        Ok((pkt, a.clone()))
    }
}

impl TrackRemote {
    /// new creates the track and binds it as a remote stream. The interceptor-wrapped
    /// reader produced here serves every later read_rtp.
    #[allow(clippy::too_many_arguments)]
    pub(crate) async fn new(
        receive_mtu: usize,
        kind: RTPCodecType,
        ssrc: SSRC,
        rid: String,
        receiver: Weak<RTPReceiverInternal>,
        media_engine: Arc<MediaEngine>,
        interceptor: &Arc<dyn Interceptor + Send + Sync>,
        stream_info: &StreamInfo,
    ) -> Arc<Self> {
        let t = Arc::new(TrackRemote {
            id: Default::default(),
            stream_id: Default::default(),
            receive_mtu,
            payload_type: Default::default(),
            kind: AtomicU8::new(kind as u8),
            ssrc: AtomicU32::new(ssrc),
            codec: Default::default(),
            params: Default::default(),
            rid,
            media_engine,
            receiver,
            peeked: SyncMutex::new(None),
            rtp_interceptor: SyncMutex::new(None),
        });

        let reader = Arc::new(TrackRemoteReader {
            track: Arc::downgrade(&t),
        }) as Arc<dyn RTPReader + Send + Sync>;
        let rtp_interceptor = interceptor.bind_remote_stream(stream_info, reader).await;
        {
            let mut r = t.rtp_interceptor.lock();
            *r = Some(rtp_interceptor);
        }

        t
    }

    /// id is the unique identifier for this Track. This should be unique for the
    /// stream, but doesn't have to globally unique. A common example would be 'audio' or 'video'
    /// and StreamID would be 'desktop' or 'webcam'
    pub fn id(&self) -> String {
        let id = self.id.lock();
        id.clone()
    }

    pub fn set_id(&self, s: String) {
        let mut id = self.id.lock();
        *id = s;
    }

    /// stream_id is the group this track belongs too. This must be unique
    pub fn stream_id(&self) -> String {
        let stream_id = self.stream_id.lock();
        stream_id.clone()
    }

    pub fn set_stream_id(&self, s: String) {
        let mut stream_id = self.stream_id.lock();
        *stream_id = s;
    }

    /// rid gets the RTP Stream ID of this Track
    pub fn rid(&self) -> &str {
        self.rid.as_str()
    }

    /// payload_type gets the PayloadType of the track. It is zero until
    /// determine_payload_type has seen the first packet.
    pub fn payload_type(&self) -> PayloadType {
        self.payload_type.load(Ordering::SeqCst)
    }

    pub fn set_payload_type(&self, payload_type: PayloadType) {
        self.payload_type.store(payload_type, Ordering::SeqCst);
    }

    /// kind gets the Kind of the track
    pub fn kind(&self) -> RTPCodecType {
        self.kind.load(Ordering::SeqCst).into()
    }

    pub fn set_kind(&self, kind: RTPCodecType) {
        self.kind.store(kind as u8, Ordering::SeqCst);
    }

    /// ssrc gets the SSRC of the track
    pub fn ssrc(&self) -> SSRC {
        self.ssrc.load(Ordering::SeqCst)
    }

    pub fn set_ssrc(&self, ssrc: SSRC) {
        self.ssrc.store(ssrc, Ordering::SeqCst);
    }

    /// msid gets the Msid of the track
    pub fn msid(&self) -> String {
        format!("{} {}", self.stream_id(), self.id())
    }

    /// codec gets the Codec of the track
    pub fn codec(&self) -> RTCRtpCodecParameters {
        let codec = self.codec.lock();
        codec.clone()
    }

    pub fn set_codec(&self, codec: RTCRtpCodecParameters) {
        let mut c = self.codec.lock();
        *c = codec;
    }

    pub fn params(&self) -> RTCRtpParameters {
        let p = self.params.lock();
        p.clone()
    }

    pub fn set_params(&self, params: RTCRtpParameters) {
        let mut p = self.params.lock();
        *p = params;
    }

    /// Reads one raw RTP packet from the track, bypassing interceptors.
    ///
    /// A packet cached by peek is returned first. Two concurrent reads may race for that
    /// packet; only one of them gets it and the other reads the next one.
    pub async fn read(&self, b: &mut [u8]) -> Result<usize> {
        let peeked = {
            let mut peeked = self.peeked.lock();
            peeked.take()
        };
        if let Some(data) = peeked {
            let n = std::cmp::min(b.len(), data.len());
            b[..n].copy_from_slice(&data[..n]);
            return Ok(n);
        }

        let receiver = match self.receiver.upgrade() {
            Some(r) => r,
            None => return Err(Error::ErrRTPReceiverNil),
        };

        receiver.read_rtp(b).await
    }

    /// read_rtp reads the next packet through the interceptors bound for this track.
    pub async fn read_rtp(&self) -> Result<rtp::packet::Packet> {
        let rtp_interceptor = {
            let r = self.rtp_interceptor.lock();
            r.clone()
        };
        let rtp_interceptor = rtp_interceptor.ok_or(Error::ErrInterceptorNotBind)?;

        let mut b = vec![0u8; self.receive_mtu];
        let (pkt, _) = rtp_interceptor.read(&mut b, &Attributes::new()).await?;
        Ok(pkt)
    }

    /// peek is like read, but the packet stays cached for the next read.
    pub(crate) async fn peek(&self, b: &mut [u8]) -> Result<usize> {
        let n = self.read(b).await?;

        // this might overwrite data if somebody peeked between the read
        // and us getting the lock. Oh well, we'll just drop a packet in
        // that case.
        let mut peeked = self.peeked.lock();
        *peeked = Some(Bytes::copy_from_slice(&b[..n]));
        Ok(n)
    }

    /// determine_payload_type waits for the first packet and takes the payload type, and
    /// the codec registered for it, from that packet. The packet is still returned by the
    /// next read.
    pub async fn determine_payload_type(&self) -> Result<()> {
        let mut b = vec![0u8; self.receive_mtu];
        let n = self.peek(&mut b).await?;
        if n < 2 {
            return Err(Error::ErrRTPTooShort);
        }

        let payload_type = b[1] & RTP_PAYLOAD_TYPE_BITMASK;
        self.set_payload_type(payload_type);

        match self.media_engine.get_codec_by_payload(payload_type) {
            Ok((codec, _)) => self.set_codec(codec),
            Err(err) => log::debug!(
                "no codec for payload type {} on ssrc {}: {}",
                payload_type,
                self.ssrc(),
                err
            ),
        }

        Ok(())
    }
}
