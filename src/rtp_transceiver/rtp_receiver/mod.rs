
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use util::sync::RwLock as SyncRwLock;

use crate::api::media_engine::MediaEngine;
use crate::error::{flatten_errs, Error, Result};
use crate::interceptor::{Attributes, Interceptor, RTCPReader};
use crate::rtp_transceiver::rtp_codec::{RTCRtpParameters, RTPCodecType};
use crate::rtp_transceiver::{create_stream_info, RTCRtpDecodingParameters, RTCRtpReceiveParameters};
use crate::track::track_remote::TrackRemote;
use crate::track::{TrackStream, TrackStreams};
use crate::transport::{ReadStream, SecureTransport};
use crate::utilities::gate::Gate;

/// ReceiverRTCPReader parses compound RTCP straight off a receiver's RTCP read stream.
struct ReceiverRTCPReader {
    rtcp_read_stream: Arc<dyn ReadStream + Send + Sync>,
}

#[async_trait]
impl RTCPReader for ReceiverRTCPReader {
    async fn read(
        &self,
        buf: &mut [u8],
        a: &Attributes,
    ) -> Result<(Vec<Box<dyn rtcp::packet::Packet + Send + Sync>>, Attributes)> {
        let n = self.rtcp_read_stream.read(buf).await?;
        let pkts = rtcp::packet::unmarshal(&mut &buf[..n])?;
        Ok((pkts, a.clone()))
    }
}

/// RTPReceiverInternal is the part of the receiver its track reads through. The track
/// only keeps a Weak reference to it.
pub(crate) struct RTPReceiverInternal {
    kind: RTPCodecType,

    received: Gate,
    stopped: Gate,

    tracks: SyncRwLock<Option<TrackStreams>>,

    transport: Arc<dyn SecureTransport + Send + Sync>,
    media_engine: Arc<MediaEngine>,
    interceptor: Arc<dyn Interceptor + Send + Sync>,
}

impl RTPReceiverInternal {
    fn stream(&self) -> Option<TrackStream> {
        let tracks = self.tracks.read();
        tracks.as_ref().map(|t| t.stream.clone())
    }

    /// read_rtp reads raw RTP bytes from the receiver's RTP read stream.
    pub(crate) async fn read_rtp(&self, b: &mut [u8]) -> Result<usize> {
        if self.stopped.is_fired() {
            return Err(Error::ErrClosedPipe);
        }
        let stream = self.stream().ok_or(Error::ErrClosedPipe)?;

        tokio::select! {
            biased;
            _ = self.stopped.wait() => Err(Error::ErrClosedPipe),
            result = stream.rtp_read_stream.read(b) => result,
        }
    }

    async fn read(
        &self,
        b: &mut [u8],
    ) -> Result<(Vec<Box<dyn rtcp::packet::Packet + Send + Sync>>, Attributes)> {
        tokio::select! {
            biased;
            _ = self.stopped.wait() => return Err(Error::ErrClosedPipe),
            _ = self.received.wait() => {}
        }

        let stream = self.stream().ok_or(Error::ErrClosedPipe)?;
        let a = Attributes::new();
        tokio::select! {
            biased;
            _ = self.stopped.wait() => Err(Error::ErrClosedPipe),
            result = stream.rtcp_interceptor.read(b, &a) => result,
        }
    }

    fn get_parameters(&self) -> RTCRtpParameters {
        self.media_engine.get_rtp_parameters_by_kind(self.kind)
    }
}

/// RTPReceiver allows an application to inspect the receipt of a TrackRemote
pub struct RTCRtpReceiver {
    receive_mtu: usize,
    kind: RTPCodecType,

    /// serializes receive and stop
    op_lock: Mutex<()>,

    pub(crate) internal: Arc<RTPReceiverInternal>,
}

impl fmt::Debug for RTCRtpReceiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RTCRtpReceiver")
            .field("kind", &self.kind)
            .field("received", &self.have_received())
            .field("stopped", &self.internal.stopped.is_fired())
            .finish()
    }
}

impl RTCRtpReceiver {
    pub fn new(
        receive_mtu: usize,
        kind: RTPCodecType,
        transport: Arc<dyn SecureTransport + Send + Sync>,
        media_engine: Arc<MediaEngine>,
        interceptor: Arc<dyn Interceptor + Send + Sync>,
    ) -> Self {
        RTCRtpReceiver {
            receive_mtu,
            kind,
            op_lock: Mutex::new(()),

            internal: Arc::new(RTPReceiverInternal {
                kind,

                received: Gate::new(),
                stopped: Gate::new(),

                tracks: SyncRwLock::new(None),

                transport,
                media_engine,
                interceptor,
            }),
        }
    }

    pub fn kind(&self) -> RTPCodecType {
        self.kind
    }

    /// transport returns the transport this receiver reads from
    pub fn transport(&self) -> Arc<dyn SecureTransport + Send + Sync> {
        Arc::clone(&self.internal.transport)
    }

    /// get_parameters describes the current configuration for the encoding and
    /// transmission of media on the receiver's track.
    pub fn get_parameters(&self) -> RTCRtpParameters {
        self.internal.get_parameters()
    }

    /// track returns the RtpTransceiver TrackRemote, or None before receive
    pub fn track(&self) -> Option<Arc<TrackRemote>> {
        let tracks = self.internal.tracks.read();
        tracks.as_ref().map(|t| Arc::clone(&t.track))
    }

    /// receive initializes the track and starts all the transports
    pub async fn receive(&self, parameters: &RTCRtpReceiveParameters) -> Result<()> {
        let _op = self.op_lock.lock().await;
        if self.have_received() {
            return Err(Error::ErrRTPReceiverReceiveAlreadyCalled);
        }
        if self.internal.stopped.is_fired() {
            return Err(Error::ErrClosedPipe);
        }

        let encoding: RTCRtpDecodingParameters =
            parameters.encodings.first().cloned().unwrap_or_default();

        let global_params = self.get_parameters();
        let codec = global_params
            .codecs
            .first()
            .map(|c| c.capability.clone())
            .unwrap_or_default();

        let stream_info = create_stream_info(
            String::new(),
            encoding.ssrc,
            0,
            codec,
            &global_params.codecs,
            &global_params.header_extensions,
        );

        let rtp_read_stream = self
            .internal
            .transport
            .open_rtp_read_stream(encoding.ssrc)
            .await?;
        let rtcp_read_stream = self
            .internal
            .transport
            .open_rtcp_read_stream(encoding.ssrc)
            .await?;

        let rtcp_reader = Arc::new(ReceiverRTCPReader {
            rtcp_read_stream: Arc::clone(&rtcp_read_stream),
        }) as Arc<dyn RTCPReader + Send + Sync>;
        let rtcp_interceptor = self.internal.interceptor.bind_rtcp_reader(rtcp_reader).await;

        let track = TrackRemote::new(
            self.receive_mtu,
            self.kind,
            encoding.ssrc,
            encoding.rid.clone(),
            Arc::downgrade(&self.internal),
            Arc::clone(&self.internal.media_engine),
            &self.internal.interceptor,
            &stream_info,
        )
        .await;
        track.set_params(global_params);

        {
            let mut tracks = self.internal.tracks.write();
            *tracks = Some(TrackStreams {
                track,
                stream: TrackStream {
                    stream_info,
                    rtp_read_stream,
                    rtcp_read_stream,
                    rtcp_interceptor,
                },
            });
        }
        self.internal.received.fire();

        log::debug!(
            "RTPReceiver started receiving {} on ssrc {}",
            self.kind,
            encoding.ssrc
        );
        Ok(())
    }

    /// read reads incoming RTCP for this RTPReceiver. It waits until receive has been
    /// called and fails with ErrClosedPipe once the receiver is stopped.
    pub async fn read(
        &self,
        b: &mut [u8],
    ) -> Result<(Vec<Box<dyn rtcp::packet::Packet + Send + Sync>>, Attributes)> {
        self.internal.read(b).await
    }

    /// read_rtcp is a convenience method that allocates a receive buffer and reads into it.
    pub async fn read_rtcp(
        &self,
    ) -> Result<(Vec<Box<dyn rtcp::packet::Packet + Send + Sync>>, Attributes)> {
        let mut b = vec![0u8; self.receive_mtu];
        self.read(&mut b).await
    }

    /// stop irreversibly stops the RTPReceiver. Only the first call releases anything.
    pub async fn stop(&self) -> Result<()> {
        let _op = self.op_lock.lock().await;
        if !self.internal.stopped.fire() {
            return Ok(());
        }

        let Some(stream) = self.internal.stream() else {
            log::debug!("RTPReceiver stopped before receive");
            return Ok(());
        };

        let mut errs = vec![];
        if let Err(err) = stream.rtp_read_stream.close().await {
            errs.push(err);
        }
        if let Err(err) = stream.rtcp_read_stream.close().await {
            errs.push(err);
        }
        self.internal
            .interceptor
            .unbind_remote_stream(&stream.stream_info)
            .await;

        log::debug!("RTPReceiver stopped on ssrc {}", stream.stream_info.ssrc);
        flatten_errs(errs)
    }

    /// have_received tells if receive has been called on this instance
    pub(crate) fn have_received(&self) -> bool {
        self.internal.received.is_fired()
    }
}
