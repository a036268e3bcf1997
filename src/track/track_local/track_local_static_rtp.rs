use tokio::sync::Mutex;

use super::*;
use crate::error::{flatten_errs, Error};

/// TrackLocalStaticRTP is a TrackLocal that has a pre-set codec and accepts RTP Packets.
#[derive(Debug)]
pub struct TrackLocalStaticRTP {
    pub(crate) bindings: Mutex<Vec<TrackBinding>>,
    codec: RTCRtpCodecCapability,
    id: String,
    rid: Option<String>,
    stream_id: String,
}

impl TrackLocalStaticRTP {
    /// returns a TrackLocalStaticRTP without rid.
    pub fn new(codec: RTCRtpCodecCapability, id: String, stream_id: String) -> Self {
        TrackLocalStaticRTP {
            codec,
            bindings: Mutex::new(vec![]),
            id,
            rid: None,
            stream_id,
        }
    }

    /// returns a TrackLocalStaticRTP with rid.
    pub fn new_with_rid(
        codec: RTCRtpCodecCapability,
        id: String,
        rid: String,
        stream_id: String,
    ) -> Self {
        TrackLocalStaticRTP {
            codec,
            bindings: Mutex::new(vec![]),
            id,
            rid: Some(rid),
            stream_id,
        }
    }

    /// codec gets the Codec of the track
    pub fn codec(&self) -> RTCRtpCodecCapability {
        self.codec.clone()
    }

    /// bindings_ssrc returns the SSRC of every sender this track is currently bound to.
    pub async fn bindings_ssrc(&self) -> Vec<SSRC> {
        let bindings = self.bindings.lock().await;
        bindings.iter().map(|b| b.ssrc).collect()
    }

    async fn write_rtp_to_binding(
        &self,
        pkt: &mut rtp::packet::Packet,
        binding: &TrackBinding,
    ) -> Result<usize> {
        pkt.header.ssrc = binding.ssrc;
        pkt.header.payload_type = binding.payload_type;

        if let Some(write_stream) = &binding.write_stream {
            write_stream.write_rtp(pkt).await
        } else {
            Ok(0)
        }
    }
}

#[async_trait]
impl TrackLocal for TrackLocalStaticRTP {
    /// bind is called by the RTCRtpSender once the negotiated codecs are known.
    /// This asserts that the codec requested is supported by the remote peer.
    /// If so it setups all the state (SSRC and PayloadType) to have a call
    async fn bind(&self, t: &TrackLocalContext) -> Result<RTCRtpCodecParameters> {
        let parameters = RTCRtpCodecParameters {
            capability: self.codec.clone(),
            ..Default::default()
        };

        let (codec, match_type) = codec_parameters_fuzzy_search(&parameters, t.codec_parameters());
        if match_type == CodecMatch::None {
            return Err(Error::ErrUnsupportedCodec);
        }

        log::trace!(
            "track {} bound to ssrc {} with payload type {}",
            self.id,
            t.ssrc(),
            codec.payload_type
        );
        let mut bindings = self.bindings.lock().await;
        bindings.push(TrackBinding {
            id: t.id(),
            ssrc: t.ssrc(),
            payload_type: codec.payload_type,
            write_stream: t.write_stream(),
        });

        Ok(codec)
    }

    /// unbind implements the teardown logic when the track is no longer needed. This happens
    /// because a track has been stopped.
    async fn unbind(&self, t: &TrackLocalContext) -> Result<()> {
        let mut bindings = self.bindings.lock().await;
        let idx = bindings.iter().position(|binding| binding.id == t.id);
        if let Some(index) = idx {
            bindings.remove(index);
            Ok(())
        } else {
            Err(Error::ErrUnbindFailed)
        }
    }

    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn rid(&self) -> Option<&str> {
        self.rid.as_deref()
    }

    fn stream_id(&self) -> &str {
        self.stream_id.as_str()
    }

    /// kind controls if this TrackLocal is audio or video
    fn kind(&self) -> RTPCodecType {
        if self.codec.mime_type.starts_with("audio/") {
            RTPCodecType::Audio
        } else if self.codec.mime_type.starts_with("video/") {
            RTPCodecType::Video
        } else {
            RTPCodecType::Unspecified
        }
    }
}

#[async_trait]
impl TrackLocalWriter for TrackLocalStaticRTP {
    /// write_rtp_with_attributes writes a RTP Packet to every sender the track is bound to.
    /// If one sender fails the packet is still sent to the others, and the
    /// returned error carries every failure.
    async fn write_rtp_with_attributes(
        &self,
        pkt: &rtp::packet::Packet,
        _attr: &Attributes,
    ) -> Result<usize> {
        let bindings = {
            let bindings = self.bindings.lock().await;
            bindings.clone()
        };

        let mut n = 0;
        let mut write_errs = vec![];
        let mut outbound = pkt.clone();
        for binding in &bindings {
            match self.write_rtp_to_binding(&mut outbound, binding).await {
                Ok(written) => n += written,
                Err(err) => write_errs.push(err),
            }
        }

        flatten_errs(write_errs)?;
        Ok(n)
    }
}
