use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{mpsc, Mutex};
use util::sync::Mutex as SyncMutex;
use util::{Marshal, MarshalSize};

use crate::error::{Error, Result};
use crate::rtp_transceiver::SSRC;
use crate::transport::{ReadStream, SecureTransport};
use crate::utilities::gate::Gate;

type RTCPPackets = Vec<Box<dyn rtcp::packet::Packet + Send + Sync>>;

/// MockReadStream is an in-memory inbound packet queue for one SSRC.
pub struct MockReadStream {
    tx: mpsc::UnboundedSender<Bytes>,
    rx: Mutex<mpsc::UnboundedReceiver<Bytes>>,
    closed: Gate,
    close_count: AtomicUsize,
}

impl MockReadStream {
    fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        MockReadStream {
            tx,
            rx: Mutex::new(rx),
            closed: Gate::new(),
            close_count: AtomicUsize::new(0),
        }
    }

    fn push(&self, data: Bytes) {
        let _ = self.tx.send(data);
    }

    /// close_count returns how many times close was called on this stream.
    pub fn close_count(&self) -> usize {
        self.close_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReadStream for MockReadStream {
    async fn read(&self, buf: &mut [u8]) -> Result<usize> {
        let mut rx = self.rx.lock().await;
        let data = tokio::select! {
            biased;
            _ = self.closed.wait() => return Err(Error::ErrIoEOF),
            data = rx.recv() => data.ok_or(Error::ErrIoEOF)?,
        };

        let n = data.len();
        if n > buf.len() {
            return Err(Error::ErrShortBuffer);
        }
        buf[..n].copy_from_slice(&data);
        Ok(n)
    }

    async fn close(&self) -> Result<()> {
        self.close_count.fetch_add(1, Ordering::SeqCst);
        self.closed.fire();
        Ok(())
    }
}

/// MockTransport is an in-memory SecureTransport. Outbound packets are recorded for
/// inspection and inbound packets are injected per SSRC.
pub struct MockTransport {
    rtp_out_tx: mpsc::UnboundedSender<rtp::packet::Packet>,
    rtp_out_rx: Mutex<mpsc::UnboundedReceiver<rtp::packet::Packet>>,
    rtcp_out_tx: mpsc::UnboundedSender<RTCPPackets>,
    rtcp_out_rx: Mutex<mpsc::UnboundedReceiver<RTCPPackets>>,

    rtp_streams: SyncMutex<HashMap<SSRC, Arc<MockReadStream>>>,
    rtcp_streams: SyncMutex<HashMap<SSRC, Arc<MockReadStream>>>,

    write_error: SyncMutex<Option<String>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        let (rtp_out_tx, rtp_out_rx) = mpsc::unbounded_channel();
        let (rtcp_out_tx, rtcp_out_rx) = mpsc::unbounded_channel();
        MockTransport {
            rtp_out_tx,
            rtp_out_rx: Mutex::new(rtp_out_rx),
            rtcp_out_tx,
            rtcp_out_rx: Mutex::new(rtcp_out_rx),
            rtp_streams: SyncMutex::new(HashMap::new()),
            rtcp_streams: SyncMutex::new(HashMap::new()),
            write_error: SyncMutex::new(None),
        }
    }
}

fn stream_for(
    streams: &SyncMutex<HashMap<SSRC, Arc<MockReadStream>>>,
    ssrc: SSRC,
) -> Arc<MockReadStream> {
    let mut streams = streams.lock();
    Arc::clone(
        streams
            .entry(ssrc)
            .or_insert_with(|| Arc::new(MockReadStream::new())),
    )
}

impl MockTransport {
    pub fn new() -> Self {
        MockTransport::default()
    }

    /// set_write_error makes every following write fail with `Error::Other(msg)`, or
    /// succeed again when `None`.
    pub fn set_write_error(&self, msg: Option<&str>) {
        let mut write_error = self.write_error.lock();
        *write_error = msg.map(|m| m.to_owned());
    }

    fn check_write_error(&self) -> Result<()> {
        let write_error = self.write_error.lock();
        match &*write_error {
            Some(msg) => Err(Error::Other(msg.clone())),
            None => Ok(()),
        }
    }

    /// inject_rtp queues an inbound RTP packet on the stream for `ssrc`.
    pub fn inject_rtp(&self, ssrc: SSRC, pkt: &rtp::packet::Packet) -> Result<()> {
        let data = pkt.marshal()?;
        stream_for(&self.rtp_streams, ssrc).push(data);
        Ok(())
    }

    /// inject_raw_rtp queues raw bytes on the RTP stream for `ssrc`, unparsed.
    pub fn inject_raw_rtp(&self, ssrc: SSRC, data: Bytes) {
        stream_for(&self.rtp_streams, ssrc).push(data);
    }

    /// inject_rtcp queues an inbound compound RTCP packet on the stream for `ssrc`.
    pub fn inject_rtcp(
        &self,
        ssrc: SSRC,
        pkts: &[Box<dyn rtcp::packet::Packet + Send + Sync>],
    ) -> Result<()> {
        let data = rtcp::packet::marshal(pkts)?;
        stream_for(&self.rtcp_streams, ssrc).push(data);
        Ok(())
    }

    /// written_rtp waits for the next RTP packet written to the transport.
    pub async fn written_rtp(&self) -> Option<rtp::packet::Packet> {
        let mut rx = self.rtp_out_rx.lock().await;
        rx.recv().await
    }

    /// written_rtcp waits for the next RTCP batch written to the transport.
    pub async fn written_rtcp(&self) -> Option<RTCPPackets> {
        let mut rx = self.rtcp_out_rx.lock().await;
        rx.recv().await
    }

    /// rtp_stream returns the inbound RTP stream for `ssrc`, creating it if needed.
    pub fn rtp_stream(&self, ssrc: SSRC) -> Arc<MockReadStream> {
        stream_for(&self.rtp_streams, ssrc)
    }

    /// rtcp_stream returns the inbound RTCP stream for `ssrc`, creating it if needed.
    pub fn rtcp_stream(&self, ssrc: SSRC) -> Arc<MockReadStream> {
        stream_for(&self.rtcp_streams, ssrc)
    }
}

#[async_trait]
impl SecureTransport for MockTransport {
    async fn write_rtp(&self, pkt: &rtp::packet::Packet) -> Result<usize> {
        self.check_write_error()?;
        let n = pkt.marshal_size();
        let _ = self.rtp_out_tx.send(pkt.clone());
        Ok(n)
    }

    async fn write_rtcp(
        &self,
        pkts: &[Box<dyn rtcp::packet::Packet + Send + Sync>],
    ) -> Result<usize> {
        self.check_write_error()?;
        let n = rtcp::packet::marshal(pkts)?.len();
        let _ = self.rtcp_out_tx.send(pkts.to_vec());
        Ok(n)
    }

    async fn open_rtp_read_stream(&self, ssrc: SSRC) -> Result<Arc<dyn ReadStream + Send + Sync>> {
        let stream: Arc<dyn ReadStream + Send + Sync> = stream_for(&self.rtp_streams, ssrc);
        Ok(stream)
    }

    async fn open_rtcp_read_stream(
        &self,
        ssrc: SSRC,
    ) -> Result<Arc<dyn ReadStream + Send + Sync>> {
        let stream: Arc<dyn ReadStream + Send + Sync> = stream_for(&self.rtcp_streams, ssrc);
        Ok(stream)
    }
}
