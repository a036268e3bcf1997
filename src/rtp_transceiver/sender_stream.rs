use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::interceptor::{Attributes, RTCPReader, RTPWriter};
use crate::rtp_transceiver::SSRC;
use crate::transport::{ReadStream, SecureTransport};

/// SenderStream is the raw end of a sender's interceptor pipelines: outgoing RTP goes
/// straight to the transport and incoming RTCP is read from the per-SSRC RTCP stream,
/// which is opened on first read.
pub(crate) struct SenderStream {
    pub(crate) closed: AtomicBool,
    pub(crate) ssrc: AtomicU32,
    pub(crate) transport: Arc<dyn SecureTransport + Send + Sync>,
    pub(crate) rtcp_read_stream: Mutex<Option<Arc<dyn ReadStream + Send + Sync>>>,
}

impl SenderStream {
    pub(crate) fn new(ssrc: SSRC, transport: Arc<dyn SecureTransport + Send + Sync>) -> Self {
        SenderStream {
            closed: AtomicBool::new(false),
            ssrc: AtomicU32::new(ssrc),
            transport,
            rtcp_read_stream: Mutex::new(None),
        }
    }

    async fn rtcp_stream(&self) -> Result<Arc<dyn ReadStream + Send + Sync>> {
        let mut stream = self.rtcp_read_stream.lock().await;
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::ErrClosedPipe);
        }
        if let Some(rtcp_read_stream) = &*stream {
            return Ok(Arc::clone(rtcp_read_stream));
        }

        let ssrc = self.ssrc.load(Ordering::SeqCst);
        let rtcp_read_stream = self.transport.open_rtcp_read_stream(ssrc).await?;
        *stream = Some(Arc::clone(&rtcp_read_stream));
        Ok(rtcp_read_stream)
    }

    /// set_ssrc retargets the stream before the RTCP stream has been opened.
    pub(crate) fn set_ssrc(&self, ssrc: SSRC) {
        self.ssrc.store(ssrc, Ordering::SeqCst);
    }

    /// close releases the RTCP stream. Only the first call does any work.
    pub(crate) async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let stream = {
            let mut stream = self.rtcp_read_stream.lock().await;
            stream.take()
        };
        if let Some(rtcp_read_stream) = stream {
            rtcp_read_stream.close().await
        } else {
            Ok(())
        }
    }

    pub(crate) async fn read(&self, b: &mut [u8]) -> Result<usize> {
        let rtcp_read_stream = self.rtcp_stream().await?;
        rtcp_read_stream.read(b).await
    }
}

#[async_trait]
impl RTCPReader for SenderStream {
    async fn read(
        &self,
        buf: &mut [u8],
        a: &Attributes,
    ) -> Result<(Vec<Box<dyn rtcp::packet::Packet + Send + Sync>>, Attributes)> {
        let read = SenderStream::read(self, buf).await?;
        let pkts = rtcp::packet::unmarshal(&mut &buf[..read])?;

        Ok((pkts, a.clone()))
    }
}

#[async_trait]
impl RTPWriter for SenderStream {
    async fn write(&self, pkt: &rtp::packet::Packet, _a: &Attributes) -> Result<usize> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::ErrClosedPipe);
        }
        self.transport.write_rtp(pkt).await
    }
}
