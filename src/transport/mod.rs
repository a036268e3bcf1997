use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::rtp_transceiver::SSRC;

/// ReadStream is one inbound packet stream demultiplexed by SSRC from the secure transport.
/// Every successful read yields exactly one marshalled, already decrypted packet.
#[async_trait]
pub trait ReadStream {
    /// read blocks until a packet arrives and copies it into `buf`.
    async fn read(&self, buf: &mut [u8]) -> Result<usize>;

    /// close releases the stream. Blocked and later reads fail.
    async fn close(&self) -> Result<()>;
}

/// SecureTransport is the already established, already secured packet transport a
/// MediaConnection runs over. Session setup and encryption live behind it.
#[async_trait]
pub trait SecureTransport {
    /// write_rtp encrypts and sends one RTP packet.
    async fn write_rtp(&self, pkt: &rtp::packet::Packet) -> Result<usize>;

    /// write_rtcp encrypts and sends a compound RTCP packet.
    async fn write_rtcp(&self, pkts: &[Box<dyn rtcp::packet::Packet + Send + Sync>])
        -> Result<usize>;

    /// open_rtp_read_stream returns the inbound RTP stream for `ssrc`.
    async fn open_rtp_read_stream(&self, ssrc: SSRC) -> Result<Arc<dyn ReadStream + Send + Sync>>;

    /// open_rtcp_read_stream returns the inbound RTCP stream for `ssrc`.
    async fn open_rtcp_read_stream(
        &self,
        ssrc: SSRC,
    ) -> Result<Arc<dyn ReadStream + Send + Sync>>;
}
