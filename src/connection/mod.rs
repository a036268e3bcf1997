#[cfg(test)]
mod connection_test;

use std::sync::Arc;

use async_trait::async_trait;

use crate::api::media_engine::MediaEngine;
use crate::api::setting_engine::SettingEngine;
use crate::api::API;
use crate::error::Result;
use crate::interceptor::{Attributes, Interceptor, RTCPWriter};
use crate::rtp_transceiver::rtp_codec::RTPCodecType;
use crate::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use crate::rtp_transceiver::rtp_sender::RTCRtpSender;
use crate::track::track_local::TrackLocal;
use crate::transport::SecureTransport;
use crate::utilities::gate::Gate;

/// ConnectionInternal is the raw end of the connection-scoped RTCP write pipeline.
struct ConnectionInternal {
    transport: Arc<dyn SecureTransport + Send + Sync>,
}

#[async_trait]
impl RTCPWriter for ConnectionInternal {
    async fn write(
        &self,
        pkts: &[Box<dyn rtcp::packet::Packet + Send + Sync>],
        _a: &Attributes,
    ) -> Result<usize> {
        self.transport.write_rtcp(pkts).await
    }
}

/// MediaConnection ties senders and receivers over one secure transport to a single
/// interceptor pipeline.
pub struct MediaConnection {
    transport: Arc<dyn SecureTransport + Send + Sync>,

    setting_engine: Arc<SettingEngine>,
    media_engine: Arc<MediaEngine>,

    interceptor: Arc<dyn Interceptor + Send + Sync>,
    interceptor_rtcp_writer: Arc<dyn RTCPWriter + Send + Sync>,

    closed: Gate,
}

impl MediaConnection {
    pub(crate) async fn new(
        api: API,
        transport: Arc<dyn SecureTransport + Send + Sync>,
    ) -> Arc<Self> {
        let interceptor = api.interceptor_registry.build();

        let internal_rtcp_writer = Arc::new(ConnectionInternal {
            transport: Arc::clone(&transport),
        }) as Arc<dyn RTCPWriter + Send + Sync>;
        let interceptor_rtcp_writer = interceptor.bind_rtcp_writer(internal_rtcp_writer).await;

        Arc::new(MediaConnection {
            transport,
            setting_engine: api.setting_engine,
            media_engine: api.media_engine,
            interceptor,
            interceptor_rtcp_writer,
            closed: Gate::new(),
        })
    }

    /// new_rtp_sender creates a sender for `track` on this connection. Media only flows
    /// once send is called on it.
    pub async fn new_rtp_sender(
        &self,
        track: Arc<dyn TrackLocal + Send + Sync>,
    ) -> Result<Arc<RTCRtpSender>> {
        let sender = RTCRtpSender::new(
            self.setting_engine.get_receive_mtu(),
            Some(track),
            Some(Arc::clone(&self.transport)),
            Arc::clone(&self.media_engine),
            Arc::clone(&self.interceptor),
        )
        .await?;

        Ok(Arc::new(sender))
    }

    /// new_rtp_receiver creates a receiver for media of `kind`.
    pub fn new_rtp_receiver(&self, kind: RTPCodecType) -> Arc<RTCRtpReceiver> {
        Arc::new(RTCRtpReceiver::new(
            self.setting_engine.get_receive_mtu(),
            kind,
            Arc::clone(&self.transport),
            Arc::clone(&self.media_engine),
            Arc::clone(&self.interceptor),
        ))
    }

    /// write_rtcp sends a user provided RTCP packet to the connected peer. If no peer is connected the
    /// packet is discarded. It also runs any configured interceptors.
    pub async fn write_rtcp(
        &self,
        pkts: &[Box<dyn rtcp::packet::Packet + Send + Sync>],
    ) -> Result<usize> {
        let a = Attributes::new();
        self.interceptor_rtcp_writer.write(pkts, &a).await
    }

    pub fn media_engine(&self) -> Arc<MediaEngine> {
        Arc::clone(&self.media_engine)
    }

    /// close shuts down every interceptor. All of them are closed even when some fail,
    /// and the failures are returned together. Later calls do nothing.
    pub async fn close(&self) -> Result<()> {
        if !self.closed.fire() {
            return Ok(());
        }

        log::debug!("MediaConnection closing");
        self.interceptor.close().await
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_fired()
    }
}
