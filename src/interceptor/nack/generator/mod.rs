mod generator_stream;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use generator_stream::GeneratorStream;
use rtcp::transport_feedbacks::transport_layer_nack::{
    nack_pairs_from_sequence_numbers, TransportLayerNack,
};
use tokio::sync::mpsc;
use util::sync::Mutex;
use waitgroup::WaitGroup;

use crate::error::Result;
use crate::interceptor::nack::stream_support_nack;
use crate::interceptor::stream_info::StreamInfo;
use crate::interceptor::{Attributes, Interceptor, RTCPReader, RTCPWriter, RTPReader, RTPWriter};

/// Largest supported receive log is 1 << 15 entries, the sequence number half space.
const MAX_LOG2_SIZE_MINUS_6: u8 = 9;

/// GeneratorBuilder can be used to configure Generator Interceptor
#[derive(Default)]
pub struct GeneratorBuilder {
    log2_size_minus_6: Option<u8>,
    skip_last_n: Option<u16>,
    interval: Option<Duration>,
}

impl GeneratorBuilder {
    /// with_log2_size_minus_6 sets the size of the interceptor.
    /// Size must be one of: 64, 128, 256, 512, 1024, 2048, 4096, 8192, 16384, 32768
    pub fn with_log2_size_minus_6(mut self, log2_size_minus_6: u8) -> GeneratorBuilder {
        self.log2_size_minus_6 = Some(log2_size_minus_6);
        self
    }

    /// with_skip_last_n sets the number of packets (n-1 packets before the last received packets) to ignore when generating
    /// nack requests.
    pub fn with_skip_last_n(mut self, skip_last_n: u16) -> GeneratorBuilder {
        self.skip_last_n = Some(skip_last_n);
        self
    }

    /// with_interval sets the nack send interval for the interceptor
    pub fn with_interval(mut self, interval: Duration) -> GeneratorBuilder {
        self.interval = Some(interval);
        self
    }

    /// build returns the configured Generator. Its worker starts on bind_rtcp_writer.
    pub fn build(self) -> Generator {
        let (close_tx, close_rx) = mpsc::channel(1);
        Generator {
            internal: Arc::new(GeneratorInternal {
                log2_size_minus_6: self
                    .log2_size_minus_6
                    .unwrap_or(13 - 6) // 8192 = 1 << 13
                    .min(MAX_LOG2_SIZE_MINUS_6),
                skip_last_n: self.skip_last_n.unwrap_or_default(),
                interval: self.interval.unwrap_or(Duration::from_millis(100)),
                streams: Mutex::new(HashMap::new()),
            }),

            close_rx: Mutex::new(Some(close_rx)),
            close_tx: Mutex::new(Some(close_tx)),
            wg: Mutex::new(Some(WaitGroup::new())),
        }
    }
}

struct GeneratorInternal {
    log2_size_minus_6: u8,
    skip_last_n: u16,
    interval: Duration,

    streams: Mutex<HashMap<u32, Arc<GeneratorStream>>>,
}

impl GeneratorInternal {
    /// missing_nacks builds one TransportLayerNack per stream that has gaps.
    fn missing_nacks(&self, sender_ssrc: u32) -> Vec<TransportLayerNack> {
        let streams = self.streams.lock();
        streams
            .iter()
            .filter_map(|(ssrc, stream)| {
                let missing = stream.missing_seq_numbers(self.skip_last_n);
                if missing.is_empty() {
                    return None;
                }
                Some(TransportLayerNack {
                    sender_ssrc,
                    media_ssrc: *ssrc,
                    nacks: nack_pairs_from_sequence_numbers(&missing),
                })
            })
            .collect()
    }
}

/// Generator interceptor generates nack feedback messages.
pub struct Generator {
    internal: Arc<GeneratorInternal>,

    close_rx: Mutex<Option<mpsc::Receiver<()>>>,
    close_tx: Mutex<Option<mpsc::Sender<()>>>,
    wg: Mutex<Option<WaitGroup>>,
}

impl Generator {
    /// builder returns a new GeneratorBuilder.
    pub fn builder() -> GeneratorBuilder {
        GeneratorBuilder::default()
    }

    async fn run(
        rtcp_writer: Arc<dyn RTCPWriter + Send + Sync>,
        internal: Arc<GeneratorInternal>,
        mut close_rx: mpsc::Receiver<()>,
    ) {
        let mut ticker = tokio::time::interval(internal.interval);
        let sender_ssrc = rand::random::<u32>();
        let a = Attributes::new();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    for nack in internal.missing_nacks(sender_ssrc) {
                        log::trace!("sending nack for ssrc={} pairs={}", nack.media_ssrc, nack.nacks.len());
                        if let Err(err) = rtcp_writer.write(&[Box::new(nack)], &a).await {
                            log::warn!("failed sending nack: {}", err);
                        }
                    }
                }
                _ = close_rx.recv() => return,
            }
        }
    }
}

#[async_trait]
impl Interceptor for Generator {
    async fn bind_rtcp_reader(
        &self,
        reader: Arc<dyn RTCPReader + Send + Sync>,
    ) -> Arc<dyn RTCPReader + Send + Sync> {
        reader
    }

    /// bind_rtcp_writer starts the worker that periodically writes nacks. Only the first
    /// binding after construction starts one.
    async fn bind_rtcp_writer(
        &self,
        writer: Arc<dyn RTCPWriter + Send + Sync>,
    ) -> Arc<dyn RTCPWriter + Send + Sync> {
        let Some(close_rx) = self.close_rx.lock().take() else {
            log::debug!("nack generator worker already started or closed");
            return writer;
        };
        let worker = {
            let wg = self.wg.lock();
            wg.as_ref().map(|wg| wg.worker())
        };

        let writer2 = Arc::clone(&writer);
        let internal = Arc::clone(&self.internal);
        tokio::spawn(async move {
            let _d = worker;
            Generator::run(writer2, internal, close_rx).await;
        });

        writer
    }

    async fn bind_local_stream(
        &self,
        _info: &StreamInfo,
        writer: Arc<dyn RTPWriter + Send + Sync>,
    ) -> Arc<dyn RTPWriter + Send + Sync> {
        writer
    }

    async fn unbind_local_stream(&self, _info: &StreamInfo) {}

    async fn bind_remote_stream(
        &self,
        info: &StreamInfo,
        reader: Arc<dyn RTPReader + Send + Sync>,
    ) -> Arc<dyn RTPReader + Send + Sync> {
        if !stream_support_nack(info) {
            return reader;
        }

        let stream = Arc::new(GeneratorStream::new(
            self.internal.log2_size_minus_6,
            reader,
        ));
        {
            let mut streams = self.internal.streams.lock();
            streams.insert(info.ssrc, Arc::clone(&stream));
        }

        stream
    }

    async fn unbind_remote_stream(&self, info: &StreamInfo) {
        let mut streams = self.internal.streams.lock();
        streams.remove(&info.ssrc);
    }

    /// close stops the worker and waits for it to exit.
    async fn close(&self) -> Result<()> {
        self.close_tx.lock().take();
        self.close_rx.lock().take();

        let wg = self.wg.lock().take();
        if let Some(wg) = wg {
            wg.wait().await;
        }

        Ok(())
    }
}
