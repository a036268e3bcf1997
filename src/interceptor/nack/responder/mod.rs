mod responder_stream;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use responder_stream::ResponderStream;
use rtcp::transport_feedbacks::transport_layer_nack::TransportLayerNack;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::interceptor::nack::stream_support_nack;
use crate::interceptor::stream_info::StreamInfo;
use crate::interceptor::{Attributes, Interceptor, RTCPReader, RTCPWriter, RTPReader, RTPWriter};

/// Largest supported history is 1 << 15 packets, the sequence number half space.
const MAX_LOG2_SIZE: u8 = 15;

/// ResponderBuilder can be used to configure Responder Interceptor
#[derive(Default)]
pub struct ResponderBuilder {
    log2_size: Option<u8>,
}

impl ResponderBuilder {
    /// with_log2_size sets the size of the interceptor.
    /// Size must be one of: 1, 2, 4, 8, 16, 32, 64, 128, 256, 512, 1024, 2048, 4096, 8192, 16384, 32768
    pub fn with_log2_size(mut self, log2_size: u8) -> ResponderBuilder {
        self.log2_size = Some(log2_size);
        self
    }

    /// build returns the configured Responder.
    pub fn build(self) -> Responder {
        Responder {
            internal: Arc::new(ResponderInternal {
                log2_size: self.log2_size.unwrap_or(13).min(MAX_LOG2_SIZE), // 8192 = 1 << 13
                streams: Mutex::new(HashMap::new()),
            }),
        }
    }
}

struct ResponderInternal {
    log2_size: u8,
    streams: Mutex<HashMap<u32, Arc<ResponderStream>>>,
}

impl ResponderInternal {
    async fn resend_packets(&self, nack: TransportLayerNack) {
        let stream = {
            let streams = self.streams.lock().await;
            match streams.get(&nack.media_ssrc) {
                Some(stream) => Arc::clone(stream),
                None => return,
            }
        };

        let a = Attributes::new();
        for pair in &nack.nacks {
            for seq in *pair {
                let Some(pkt) = stream.get(seq).await else {
                    continue;
                };
                log::trace!("resending nacked packet ssrc={} seq={}", nack.media_ssrc, seq);
                if let Err(err) = stream.next_rtp_writer.write(&pkt, &a).await {
                    log::warn!("failed resending nacked packet: {}", err);
                }
            }
        }
    }
}

struct ResponderRtcpReader {
    parent_rtcp_reader: Arc<dyn RTCPReader + Send + Sync>,
    internal: Arc<ResponderInternal>,
}

#[async_trait]
impl RTCPReader for ResponderRtcpReader {
    async fn read(
        &self,
        buf: &mut [u8],
        a: &Attributes,
    ) -> Result<(Vec<Box<dyn rtcp::packet::Packet + Send + Sync>>, Attributes)> {
        let (pkts, attr) = self.parent_rtcp_reader.read(buf, a).await?;
        for p in &pkts {
            if let Some(nack) = p.as_any().downcast_ref::<TransportLayerNack>() {
                let nack = nack.clone();
                let internal = Arc::clone(&self.internal);
                tokio::spawn(async move {
                    internal.resend_packets(nack).await;
                });
            }
        }

        Ok((pkts, attr))
    }
}

/// Responder responds to nack feedback messages by resending the requested packets
/// while they are still buffered.
pub struct Responder {
    internal: Arc<ResponderInternal>,
}

impl Responder {
    /// builder returns a new ResponderBuilder.
    pub fn builder() -> ResponderBuilder {
        ResponderBuilder::default()
    }
}

#[async_trait]
impl Interceptor for Responder {
    async fn bind_rtcp_reader(
        &self,
        reader: Arc<dyn RTCPReader + Send + Sync>,
    ) -> Arc<dyn RTCPReader + Send + Sync> {
        Arc::new(ResponderRtcpReader {
            internal: Arc::clone(&self.internal),
            parent_rtcp_reader: reader,
        })
    }

    async fn bind_rtcp_writer(
        &self,
        writer: Arc<dyn RTCPWriter + Send + Sync>,
    ) -> Arc<dyn RTCPWriter + Send + Sync> {
        writer
    }

    async fn bind_local_stream(
        &self,
        info: &StreamInfo,
        writer: Arc<dyn RTPWriter + Send + Sync>,
    ) -> Arc<dyn RTPWriter + Send + Sync> {
        if !stream_support_nack(info) {
            return writer;
        }

        let stream = Arc::new(ResponderStream::new(self.internal.log2_size, writer));
        {
            let mut streams = self.internal.streams.lock().await;
            streams.insert(info.ssrc, Arc::clone(&stream));
        }

        stream
    }

    async fn unbind_local_stream(&self, info: &StreamInfo) {
        let mut streams = self.internal.streams.lock().await;
        streams.remove(&info.ssrc);
    }

    async fn bind_remote_stream(
        &self,
        _info: &StreamInfo,
        reader: Arc<dyn RTPReader + Send + Sync>,
    ) -> Arc<dyn RTPReader + Send + Sync> {
        reader
    }

    async fn unbind_remote_stream(&self, _info: &StreamInfo) {}

    async fn close(&self) -> Result<()> {
        let mut streams = self.internal.streams.lock().await;
        streams.clear();
        Ok(())
    }
}
