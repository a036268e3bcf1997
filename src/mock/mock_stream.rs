use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use util::sync::Mutex as SyncMutex;

use crate::error::{Error, Result};
use crate::interceptor::stream_info::StreamInfo;
use crate::interceptor::{Attributes, Interceptor, RTCPReader, RTCPWriter, RTPReader, RTPWriter};

type RTCPPackets = Vec<Box<dyn rtcp::packet::Packet + Send + Sync>>;

/// MockStream binds a single interceptor as both a local and a remote stream over in-memory
/// queues, so a plugin can be exercised without a connection or transport.
///
/// Packets handed to `write_rtp`/`write_rtcp` travel through the plugin and show up in
/// `written_rtp`/`written_rtcp`; packets injected with `receive_rtp`/`receive_rtcp` are
/// pumped through the plugin's readers by background tasks and show up in
/// `read_rtp`/`read_rtcp`.
pub struct MockStream {
    info: StreamInfo,
    interceptor: Arc<dyn Interceptor + Send + Sync>,

    rtcp_writer: SyncMutex<Option<Arc<dyn RTCPWriter + Send + Sync>>>,
    rtp_writer: SyncMutex<Option<Arc<dyn RTPWriter + Send + Sync>>>,

    rtcp_out_tx: mpsc::UnboundedSender<RTCPPackets>,
    rtp_out_tx: mpsc::UnboundedSender<rtp::packet::Packet>,
    rtcp_out_rx: Mutex<mpsc::UnboundedReceiver<RTCPPackets>>,
    rtp_out_rx: Mutex<mpsc::UnboundedReceiver<rtp::packet::Packet>>,

    rtcp_in_tx: SyncMutex<Option<mpsc::UnboundedSender<RTCPPackets>>>,
    rtp_in_tx: SyncMutex<Option<mpsc::UnboundedSender<rtp::packet::Packet>>>,
    rtcp_in_rx: Mutex<mpsc::UnboundedReceiver<RTCPPackets>>,
    rtp_in_rx: Mutex<mpsc::UnboundedReceiver<rtp::packet::Packet>>,

    rtcp_read_rx: Mutex<mpsc::UnboundedReceiver<Result<RTCPPackets>>>,
    rtp_read_rx: Mutex<mpsc::UnboundedReceiver<Result<rtp::packet::Packet>>>,
}

impl MockStream {
    /// new creates a MockStream and binds every hook of `interceptor` around it.
    pub async fn new(
        info: &StreamInfo,
        interceptor: Arc<dyn Interceptor + Send + Sync>,
    ) -> Arc<Self> {
        let (rtcp_out_tx, rtcp_out_rx) = mpsc::unbounded_channel();
        let (rtp_out_tx, rtp_out_rx) = mpsc::unbounded_channel();
        let (rtcp_in_tx, rtcp_in_rx) = mpsc::unbounded_channel();
        let (rtp_in_tx, rtp_in_rx) = mpsc::unbounded_channel();
        let (rtcp_read_tx, rtcp_read_rx) = mpsc::unbounded_channel();
        let (rtp_read_tx, rtp_read_rx) = mpsc::unbounded_channel();

        let stream = Arc::new(MockStream {
            info: info.clone(),
            interceptor: Arc::clone(&interceptor),

            rtcp_writer: SyncMutex::new(None),
            rtp_writer: SyncMutex::new(None),

            rtcp_out_tx,
            rtp_out_tx,
            rtcp_out_rx: Mutex::new(rtcp_out_rx),
            rtp_out_rx: Mutex::new(rtp_out_rx),

            rtcp_in_tx: SyncMutex::new(Some(rtcp_in_tx)),
            rtp_in_tx: SyncMutex::new(Some(rtp_in_tx)),
            rtcp_in_rx: Mutex::new(rtcp_in_rx),
            rtp_in_rx: Mutex::new(rtp_in_rx),

            rtcp_read_rx: Mutex::new(rtcp_read_rx),
            rtp_read_rx: Mutex::new(rtp_read_rx),
        });

        let rtcp_writer = interceptor
            .bind_rtcp_writer(Arc::clone(&stream) as Arc<dyn RTCPWriter + Send + Sync>)
            .await;
        *stream.rtcp_writer.lock() = Some(rtcp_writer);

        let rtp_writer = interceptor
            .bind_local_stream(info, Arc::clone(&stream) as Arc<dyn RTPWriter + Send + Sync>)
            .await;
        *stream.rtp_writer.lock() = Some(rtp_writer);

        let rtcp_reader = interceptor
            .bind_rtcp_reader(Arc::clone(&stream) as Arc<dyn RTCPReader + Send + Sync>)
            .await;
        tokio::spawn(async move {
            let mut buf = vec![0u8; 1500];
            let a = Attributes::new();
            loop {
                match rtcp_reader.read(&mut buf, &a).await {
                    Ok((pkts, _)) => {
                        let _ = rtcp_read_tx.send(Ok(pkts));
                    }
                    Err(Error::ErrIoEOF) => break,
                    Err(err) => {
                        let _ = rtcp_read_tx.send(Err(err));
                        break;
                    }
                }
            }
        });

        let rtp_reader = interceptor
            .bind_remote_stream(info, Arc::clone(&stream) as Arc<dyn RTPReader + Send + Sync>)
            .await;
        tokio::spawn(async move {
            let mut buf = vec![0u8; 1500];
            let a = Attributes::new();
            loop {
                match rtp_reader.read(&mut buf, &a).await {
                    Ok((pkt, _)) => {
                        let _ = rtp_read_tx.send(Ok(pkt));
                    }
                    Err(Error::ErrIoEOF) => break,
                    Err(err) => {
                        let _ = rtp_read_tx.send(Err(err));
                        break;
                    }
                }
            }
        });

        stream
    }

    /// write_rtcp writes a batch of rtcp packets through the interceptor.
    pub async fn write_rtcp(
        &self,
        pkts: &[Box<dyn rtcp::packet::Packet + Send + Sync>],
    ) -> Result<usize> {
        let writer = self.rtcp_writer.lock().clone();
        match writer {
            Some(writer) => writer.write(pkts, &Attributes::new()).await,
            None => Err(Error::ErrInterceptorNotBind),
        }
    }

    /// write_rtp writes an rtp packet through the interceptor.
    pub async fn write_rtp(&self, pkt: &rtp::packet::Packet) -> Result<usize> {
        let writer = self.rtp_writer.lock().clone();
        match writer {
            Some(writer) => writer.write(pkt, &Attributes::new()).await,
            None => Err(Error::ErrInterceptorNotBind),
        }
    }

    /// receive_rtcp queues an incoming rtcp batch for the interceptor's reader.
    pub fn receive_rtcp(&self, pkts: RTCPPackets) {
        if let Some(tx) = &*self.rtcp_in_tx.lock() {
            let _ = tx.send(pkts);
        }
    }

    /// receive_rtp queues an incoming rtp packet for the interceptor's reader.
    pub fn receive_rtp(&self, pkt: rtp::packet::Packet) {
        if let Some(tx) = &*self.rtp_in_tx.lock() {
            let _ = tx.send(pkt);
        }
    }

    /// written_rtcp waits for the next rtcp batch that left the interceptor.
    pub async fn written_rtcp(&self) -> Option<RTCPPackets> {
        let mut rx = self.rtcp_out_rx.lock().await;
        rx.recv().await
    }

    /// written_rtp waits for the next rtp packet that left the interceptor.
    pub async fn written_rtp(&self) -> Option<rtp::packet::Packet> {
        let mut rx = self.rtp_out_rx.lock().await;
        rx.recv().await
    }

    /// read_rtcp waits for the next rtcp batch read through the interceptor.
    pub async fn read_rtcp(&self) -> Option<Result<RTCPPackets>> {
        let mut rx = self.rtcp_read_rx.lock().await;
        rx.recv().await
    }

    /// read_rtp waits for the next rtp packet read through the interceptor.
    pub async fn read_rtp(&self) -> Option<Result<rtp::packet::Packet>> {
        let mut rx = self.rtp_read_rx.lock().await;
        rx.recv().await
    }

    /// close unbinds both streams, stops the reader pumps and closes the interceptor.
    pub async fn close(&self) -> Result<()> {
        self.rtcp_in_tx.lock().take();
        self.rtp_in_tx.lock().take();

        self.interceptor.unbind_local_stream(&self.info).await;
        self.interceptor.unbind_remote_stream(&self.info).await;
        self.interceptor.close().await
    }
}

#[async_trait]
impl RTCPWriter for MockStream {
    async fn write(
        &self,
        pkts: &[Box<dyn rtcp::packet::Packet + Send + Sync>],
        _a: &Attributes,
    ) -> Result<usize> {
        let _ = self.rtcp_out_tx.send(pkts.to_vec());
        Ok(pkts.len())
    }
}

#[async_trait]
impl RTCPReader for MockStream {
    async fn read(&self, _buf: &mut [u8], a: &Attributes) -> Result<(RTCPPackets, Attributes)> {
        let mut rx = self.rtcp_in_rx.lock().await;
        let pkts = rx.recv().await.ok_or(Error::ErrIoEOF)?;
        Ok((pkts, a.clone()))
    }
}

#[async_trait]
impl RTPWriter for MockStream {
    async fn write(&self, pkt: &rtp::packet::Packet, _a: &Attributes) -> Result<usize> {
        let _ = self.rtp_out_tx.send(pkt.clone());
        Ok(pkt.payload.len())
    }
}

#[async_trait]
impl RTPReader for MockStream {
    async fn read(
        &self,
        _buf: &mut [u8],
        a: &Attributes,
    ) -> Result<(rtp::packet::Packet, Attributes)> {
        let mut rx = self.rtp_in_rx.lock().await;
        let pkt = rx.recv().await.ok_or(Error::ErrIoEOF)?;
        Ok((pkt, a.clone()))
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use rtcp::payload_feedbacks::picture_loss_indication::PictureLossIndication;

    use super::*;
    use crate::interceptor::noop::NoOp;
    use crate::test::timeout_or_fail;

    #[tokio::test]
    async fn test_mock_stream_passes_each_packet_once() -> Result<()> {
        let s = MockStream::new(&StreamInfo::default(), Arc::new(NoOp)).await;

        s.write_rtcp(&[Box::<PictureLossIndication>::default()])
            .await?;
        timeout_or_fail(Duration::from_millis(10), s.written_rtcp()).await;
        let result = tokio::time::timeout(Duration::from_millis(10), s.written_rtcp()).await;
        assert!(result.is_err(), "single rtcp batch written, but multiple found");

        s.write_rtp(&rtp::packet::Packet::default()).await?;
        timeout_or_fail(Duration::from_millis(10), s.written_rtp()).await;
        let result = tokio::time::timeout(Duration::from_millis(10), s.written_rtp()).await;
        assert!(result.is_err(), "single rtp packet written, but multiple found");

        s.receive_rtcp(vec![Box::<PictureLossIndication>::default()]);
        let got = timeout_or_fail(Duration::from_millis(10), s.read_rtcp()).await;
        assert!(matches!(got, Some(Ok(_))), "rtcp batch should be read");

        s.receive_rtp(rtp::packet::Packet::default());
        let got = timeout_or_fail(Duration::from_millis(10), s.read_rtp()).await;
        assert!(matches!(got, Some(Ok(_))), "rtp packet should be read");

        s.close().await?;

        Ok(())
    }
}
