
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use util::sync::{Mutex as SyncMutex, RwLock as SyncRwLock};

use crate::api::media_engine::MediaEngine;
use crate::error::{flatten_errs, Error, Result};
use crate::interceptor::stream_info::StreamInfo;
use crate::interceptor::{Attributes, Interceptor, RTCPReader, RTPWriter};
use crate::rtp_transceiver::rtp_codec::RTPCodecType;
use crate::rtp_transceiver::sender_stream::SenderStream;
use crate::rtp_transceiver::{
    create_stream_info, RTCRtpEncodingParameters, RTCRtpSendParameters, SSRC,
};
use crate::track::track_local::{
    InterceptorToTrackLocalWriter, TrackLocal, TrackLocalContext, TrackLocalWriter,
};
use crate::transport::SecureTransport;
use crate::utilities::gate::Gate;
use crate::utilities::{generate_crypto_random_string, RUNES_ALPHA};

/// State is the lifecycle of an RTCRtpSender. It only ever moves forward:
/// Idle to Sent to Stopped, or Idle straight to Stopped.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum State {
    /// send has not been called yet.
    #[default]
    Idle,

    /// The track is bound and media can flow.
    Sent,

    /// stop has been called.
    Stopped,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Idle => write!(f, "Idle"),
            State::Sent => write!(f, "Sent"),
            State::Stopped => write!(f, "Stopped"),
        }
    }
}

/// RTPSender allows an application to control how a given Track is encoded and transmitted to a remote peer
pub struct RTCRtpSender {
    pub(crate) track: SyncRwLock<Option<Arc<dyn TrackLocal + Send + Sync>>>,

    pub(crate) sender_stream: Arc<SenderStream>,
    pub(crate) stream_info: SyncMutex<StreamInfo>,
    /// true while stream_info is bound as a local stream in the interceptor chain
    local_stream_bound: AtomicBool,
    pub(crate) context: SyncMutex<TrackLocalContext>,
    write_stream: Arc<InterceptorToTrackLocalWriter>,
    rtcp_interceptor: Arc<dyn RTCPReader + Send + Sync>,

    pub(crate) transport: Arc<dyn SecureTransport + Send + Sync>,

    ssrc: AtomicU32,
    receive_mtu: usize,

    pub(crate) media_engine: Arc<MediaEngine>,
    pub(crate) interceptor: Arc<dyn Interceptor + Send + Sync>,

    pub(crate) id: String,

    state: SyncRwLock<State>,
    /// serializes send, stop and replace_track
    op_lock: Mutex<()>,
    sent: Gate,
    stopped: Gate,
}

impl fmt::Debug for RTCRtpSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RTCRtpSender")
            .field("id", &self.id)
            .field("ssrc", &self.ssrc())
            .field("state", &self.state())
            .finish()
    }
}

impl RTCRtpSender {
    pub async fn new(
        receive_mtu: usize,
        track: Option<Arc<dyn TrackLocal + Send + Sync>>,
        transport: Option<Arc<dyn SecureTransport + Send + Sync>>,
        media_engine: Arc<MediaEngine>,
        interceptor: Arc<dyn Interceptor + Send + Sync>,
    ) -> Result<Self> {
        let track = track.ok_or(Error::ErrRTPSenderTrackNil)?;
        let transport = transport.ok_or(Error::ErrRTPSenderTransportNil)?;

        let id = generate_crypto_random_string(32, RUNES_ALPHA);
        let ssrc = rand::random::<u32>();

        let sender_stream = Arc::new(SenderStream::new(ssrc, Arc::clone(&transport)));
        let rtcp_reader = Arc::clone(&sender_stream) as Arc<dyn RTCPReader + Send + Sync>;
        let rtcp_interceptor = interceptor.bind_rtcp_reader(rtcp_reader).await;

        Ok(RTCRtpSender {
            track: SyncRwLock::new(Some(track)),

            sender_stream,
            stream_info: SyncMutex::new(StreamInfo::default()),
            local_stream_bound: AtomicBool::new(false),
            context: SyncMutex::new(TrackLocalContext::default()),
            write_stream: Arc::new(InterceptorToTrackLocalWriter::new()),
            rtcp_interceptor,

            transport,

            ssrc: AtomicU32::new(ssrc),
            receive_mtu,

            media_engine,
            interceptor,

            id,

            state: SyncRwLock::new(State::Idle),
            op_lock: Mutex::new(()),
            sent: Gate::new(),
            stopped: Gate::new(),
        })
    }

    /// id returns the random identifier of this sender. It is also the id of every
    /// TrackLocalContext and StreamInfo the sender creates.
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    /// ssrc returns the SSRC outgoing packets are stamped with.
    pub fn ssrc(&self) -> SSRC {
        self.ssrc.load(Ordering::SeqCst)
    }

    /// state returns the current lifecycle state.
    pub fn state(&self) -> State {
        *self.state.read()
    }

    /// transport returns the transport this sender writes to
    pub fn transport(&self) -> Arc<dyn SecureTransport + Send + Sync> {
        Arc::clone(&self.transport)
    }

    /// track returns the track currently being sent, or None
    pub fn track(&self) -> Option<Arc<dyn TrackLocal + Send + Sync>> {
        let track = self.track.read();
        track.clone()
    }

    /// get_parameters describes the current configuration for the encoding and
    /// transmission of media on the sender's track.
    pub fn get_parameters(&self) -> RTCRtpSendParameters {
        let (kind, rid) = match self.track() {
            Some(t) => (t.kind(), t.rid().unwrap_or_default().to_owned()),
            None => (RTPCodecType::default(), String::new()),
        };
        let payload_type = self.stream_info.lock().payload_type;

        RTCRtpSendParameters {
            rtp_parameters: self.media_engine.get_rtp_parameters_by_kind(kind),
            encodings: vec![RTCRtpEncodingParameters {
                rid,
                ssrc: self.ssrc(),
                payload_type,
            }],
        }
    }

    /// send binds the track and starts the flow of media. Calling it a second time, or
    /// after stop, fails; a bind failure leaves the sender Idle.
    ///
    /// The track and the interceptors are bound while the sender's operation lock is
    /// held, so neither may call send, stop or replace_track on this sender from bind.
    pub async fn send(&self, parameters: &RTCRtpSendParameters) -> Result<()> {
        let _op = self.op_lock.lock().await;
        match self.state() {
            State::Idle => {}
            State::Sent => return Err(Error::ErrRTPSenderSendAlreadyCalled),
            State::Stopped => return Err(Error::ErrRTPSenderStopped),
        }

        let track = self.track().ok_or(Error::ErrRTPSenderTrackNil)?;
        let ssrc = parameters
            .encodings
            .first()
            .map(|e| e.ssrc)
            .filter(|ssrc| *ssrc != 0)
            .unwrap_or_else(|| self.ssrc());

        let mut params = self.media_engine.get_rtp_parameters_by_kind(track.kind());
        if !parameters.rtp_parameters.codecs.is_empty() {
            params.codecs = parameters.rtp_parameters.codecs.clone();
        }
        if !parameters.rtp_parameters.header_extensions.is_empty() {
            params.header_extensions = parameters.rtp_parameters.header_extensions.clone();
        }

        let mut context = TrackLocalContext {
            id: self.id.clone(),
            params,
            ssrc,
            write_stream: Some(
                Arc::clone(&self.write_stream) as Arc<dyn TrackLocalWriter + Send + Sync>
            ),
        };

        let codec = track.bind(&context).await?;
        let stream_info = create_stream_info(
            self.id.clone(),
            ssrc,
            codec.payload_type,
            codec.capability.clone(),
            context.codec_parameters(),
            context.header_extensions(),
        );
        context.params.codecs = vec![codec];

        self.ssrc.store(ssrc, Ordering::SeqCst);
        self.sender_stream.set_ssrc(ssrc);
        self.bind_local_stream(stream_info).await;
        {
            let mut ctx = self.context.lock();
            *ctx = context;
        }
        {
            let mut state = self.state.write();
            *state = State::Sent;
        }
        self.sent.fire();

        log::debug!("RTPSender {} sent track {} on ssrc {}", self.id, track.id(), ssrc);
        Ok(())
    }

    /// stop irreversibly stops the RTPSender. Only the first call releases anything.
    pub async fn stop(&self) -> Result<()> {
        if self.stopped.is_fired() {
            return Ok(());
        }

        let _op = self.op_lock.lock().await;
        let previous = {
            let mut state = self.state.write();
            std::mem::replace(&mut *state, State::Stopped)
        };
        if previous == State::Stopped {
            return Ok(());
        }
        self.stopped.fire();
        log::debug!("RTPSender {} stopped from {}", self.id, previous);

        if previous != State::Sent {
            return Ok(());
        }

        let mut errs = vec![];
        let context = self.context.lock().clone();
        if let Some(t) = self.track() {
            if let Err(err) = t.unbind(&context).await {
                errs.push(err);
            }
        }
        self.unbind_local_stream().await;

        if let Err(err) = self.sender_stream.close().await {
            errs.push(err);
        }

        flatten_errs(errs)
    }

    /// replace_track replaces the track currently being used as the sender's source with a new TrackLocal.
    ///
    /// Before send it only swaps the reference. After send the old track is unbound and the
    /// new one is bound with the same SSRC and the codec negotiated by send, so a track
    /// that cannot produce that codec fails with ErrUnsupportedCodec. If the new track
    /// fails to bind, the old track is bound again and the sender keeps sending it. If
    /// the old track fails to unbind, nothing changes and that error is returned.
    ///
    /// As in send, binds run under the operation lock and must not call back into this
    /// sender.
    pub async fn replace_track(
        &self,
        track: Option<Arc<dyn TrackLocal + Send + Sync>>,
    ) -> Result<()> {
        let _op = self.op_lock.lock().await;
        match self.state() {
            State::Idle => {
                let mut t = self.track.write();
                *t = track;
                return Ok(());
            }
            State::Stopped => return Err(Error::ErrRTPSenderStopped),
            State::Sent => {}
        }

        let old_track = self.track();
        let context = self.context.lock().clone();
        let stream_info = self.stream_info.lock().clone();
        let was_bound = self.local_stream_bound.load(Ordering::SeqCst);

        if let Some(t) = &old_track {
            t.unbind(&context).await?;
        }
        self.unbind_local_stream().await;

        let Some(new_track) = track else {
            let mut t = self.track.write();
            *t = None;
            return Ok(());
        };

        let mut new_context = TrackLocalContext {
            id: context.id.clone(),
            params: context.params.clone(),
            ssrc: context.ssrc,
            write_stream: context.write_stream.clone(),
        };

        match new_track.bind(&new_context).await {
            Ok(codec) => {
                let new_stream_info = create_stream_info(
                    self.id.clone(),
                    new_context.ssrc,
                    codec.payload_type,
                    codec.capability.clone(),
                    new_context.codec_parameters(),
                    new_context.header_extensions(),
                );
                new_context.params.codecs = vec![codec];

                self.bind_local_stream(new_stream_info).await;
                {
                    let mut ctx = self.context.lock();
                    *ctx = new_context;
                }
                {
                    let mut t = self.track.write();
                    *t = Some(new_track);
                }

                log::debug!("RTPSender {} replaced its track", self.id);
                Ok(())
            }
            Err(err) => {
                // Re-bind the original track
                if was_bound {
                    self.bind_local_stream(stream_info).await;
                }
                if let Some(t) = &old_track {
                    if let Err(rebind_err) = t.bind(&context).await {
                        log::warn!(
                            "RTPSender {} failed to re-bind its previous track: {}",
                            self.id,
                            rebind_err
                        );
                    }
                }

                Err(err)
            }
        }
    }

    async fn bind_local_stream(&self, stream_info: StreamInfo) {
        let rtp_writer = Arc::clone(&self.sender_stream) as Arc<dyn RTPWriter + Send + Sync>;
        let rtp_interceptor = self
            .interceptor
            .bind_local_stream(&stream_info, rtp_writer)
            .await;
        self.write_stream.set_rtp_writer(Some(rtp_interceptor));

        {
            let mut si = self.stream_info.lock();
            *si = stream_info;
        }
        self.local_stream_bound.store(true, Ordering::SeqCst);
    }

    /// unbind_local_stream detaches the writer and unbinds the current stream from the
    /// interceptors. It does nothing if no stream is bound, so each bind is matched by
    /// exactly one unbind.
    async fn unbind_local_stream(&self) {
        self.write_stream.set_rtp_writer(None);
        if !self.local_stream_bound.swap(false, Ordering::SeqCst) {
            return;
        }
        let stream_info = self.stream_info.lock().clone();
        self.interceptor.unbind_local_stream(&stream_info).await;
    }

    /// read reads incoming RTCP for this RTPSender. It waits until send has been called
    /// and fails with ErrClosedPipe once the sender is stopped.
    pub async fn read(
        &self,
        b: &mut [u8],
    ) -> Result<(Vec<Box<dyn rtcp::packet::Packet + Send + Sync>>, Attributes)> {
        tokio::select! {
            biased;
            _ = self.stopped.wait() => return Err(Error::ErrClosedPipe),
            _ = self.sent.wait() => {}
        }

        let a = Attributes::new();
        tokio::select! {
            biased;
            _ = self.stopped.wait() => Err(Error::ErrClosedPipe),
            result = self.rtcp_interceptor.read(b, &a) => result,
        }
    }

    /// read_rtcp is a convenience method that allocates a receive buffer and reads into it.
    pub async fn read_rtcp(
        &self,
    ) -> Result<(Vec<Box<dyn rtcp::packet::Packet + Send + Sync>>, Attributes)> {
        let mut b = vec![0u8; self.receive_mtu];
        self.read(&mut b).await
    }

    /// has_sent tells if data has been ever sent for this instance
    pub(crate) fn has_sent(&self) -> bool {
        self.sent.is_fired()
    }

    /// has_stopped tells if stop has been called
    pub(crate) fn has_stopped(&self) -> bool {
        self.stopped.is_fired()
    }
}
