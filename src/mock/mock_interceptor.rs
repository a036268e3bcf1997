use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use util::sync::Mutex as SyncMutex;

use crate::error::{Error, Result};
use crate::interceptor::stream_info::StreamInfo;
use crate::interceptor::{Attributes, Interceptor, RTCPReader, RTCPWriter, RTPReader, RTPWriter};

/// MockEvents is the call log shared by one or more [`MockInterceptor`]s, so the relative
/// order of calls across a whole chain can be asserted.
pub type MockEvents = Arc<SyncMutex<Vec<String>>>;

/// count_events returns how many recorded events equal `needle`.
pub fn count_events(events: &MockEvents, needle: &str) -> usize {
    events.lock().iter().filter(|e| e.as_str() == needle).count()
}

/// MockInterceptor is a recording Interceptor for testing. It appends `"<name>:<call>"` to its
/// event log for every bind, unbind and close it receives and for every packet passing
/// through one of its wrappers, recording on entry before delegating to the next hop.
pub struct MockInterceptor {
    name: String,
    events: MockEvents,
    close_error: Option<String>,
    header_extension: Option<(u8, Bytes)>,
}

impl MockInterceptor {
    pub fn new(name: &str, events: MockEvents) -> Self {
        MockInterceptor {
            name: name.to_owned(),
            events,
            close_error: None,
            header_extension: None,
        }
    }

    /// with_close_error makes close record the call and then fail with `msg`.
    pub fn with_close_error(mut self, msg: &str) -> Self {
        self.close_error = Some(msg.to_owned());
        self
    }

    /// with_header_extension tags every RTP packet this interceptor sees, outgoing and incoming,
    /// with a header extension carrying `payload`.
    pub fn with_header_extension(mut self, id: u8, payload: &'static str) -> Self {
        self.header_extension = Some((id, Bytes::from_static(payload.as_bytes())));
        self
    }

    fn record(&self, call: &str) {
        record(&self.events, &self.name, call);
    }
}

fn record(events: &MockEvents, name: &str, call: &str) {
    let mut events = events.lock();
    events.push(format!("{name}:{call}"));
}

fn tag(pkt: &mut rtp::packet::Packet, header_extension: &Option<(u8, Bytes)>) -> Result<()> {
    if let Some((id, payload)) = header_extension {
        pkt.header.set_extension(*id, payload.clone())?;
    }
    Ok(())
}

struct MockRTPWriter {
    name: String,
    events: MockEvents,
    header_extension: Option<(u8, Bytes)>,
    next: Arc<dyn RTPWriter + Send + Sync>,
}

#[async_trait]
impl RTPWriter for MockRTPWriter {
    async fn write(&self, pkt: &rtp::packet::Packet, a: &Attributes) -> Result<usize> {
        record(&self.events, &self.name, "write");
        if self.header_extension.is_none() {
            return self.next.write(pkt, a).await;
        }

        let mut pkt = pkt.clone();
        tag(&mut pkt, &self.header_extension)?;
        self.next.write(&pkt, a).await
    }
}

struct MockRTPReader {
    name: String,
    events: MockEvents,
    header_extension: Option<(u8, Bytes)>,
    next: Arc<dyn RTPReader + Send + Sync>,
}

#[async_trait]
impl RTPReader for MockRTPReader {
    async fn read(
        &self,
        buf: &mut [u8],
        a: &Attributes,
    ) -> Result<(rtp::packet::Packet, Attributes)> {
        record(&self.events, &self.name, "read");
        let (mut pkt, attr) = self.next.read(buf, a).await?;
        tag(&mut pkt, &self.header_extension)?;
        Ok((pkt, attr))
    }
}

struct MockRTCPWriter {
    name: String,
    events: MockEvents,
    next: Arc<dyn RTCPWriter + Send + Sync>,
}

#[async_trait]
impl RTCPWriter for MockRTCPWriter {
    async fn write(
        &self,
        pkts: &[Box<dyn rtcp::packet::Packet + Send + Sync>],
        a: &Attributes,
    ) -> Result<usize> {
        record(&self.events, &self.name, "rtcp_write");
        self.next.write(pkts, a).await
    }
}

struct MockRTCPReader {
    name: String,
    events: MockEvents,
    next: Arc<dyn RTCPReader + Send + Sync>,
}

#[async_trait]
impl RTCPReader for MockRTCPReader {
    async fn read(
        &self,
        buf: &mut [u8],
        a: &Attributes,
    ) -> Result<(Vec<Box<dyn rtcp::packet::Packet + Send + Sync>>, Attributes)> {
        record(&self.events, &self.name, "rtcp_read");
        self.next.read(buf, a).await
    }
}

#[async_trait]
impl Interceptor for MockInterceptor {
    async fn bind_rtcp_reader(
        &self,
        reader: Arc<dyn RTCPReader + Send + Sync>,
    ) -> Arc<dyn RTCPReader + Send + Sync> {
        self.record("bind_rtcp_reader");
        Arc::new(MockRTCPReader {
            name: self.name.clone(),
            events: Arc::clone(&self.events),
            next: reader,
        })
    }

    async fn bind_rtcp_writer(
        &self,
        writer: Arc<dyn RTCPWriter + Send + Sync>,
    ) -> Arc<dyn RTCPWriter + Send + Sync> {
        self.record("bind_rtcp_writer");
        Arc::new(MockRTCPWriter {
            name: self.name.clone(),
            events: Arc::clone(&self.events),
            next: writer,
        })
    }

    async fn bind_local_stream(
        &self,
        info: &StreamInfo,
        writer: Arc<dyn RTPWriter + Send + Sync>,
    ) -> Arc<dyn RTPWriter + Send + Sync> {
        self.record(&format!("bind_local_stream:{}", info.ssrc));
        Arc::new(MockRTPWriter {
            name: self.name.clone(),
            events: Arc::clone(&self.events),
            header_extension: self.header_extension.clone(),
            next: writer,
        })
    }

    async fn unbind_local_stream(&self, info: &StreamInfo) {
        self.record(&format!("unbind_local_stream:{}", info.ssrc));
    }

    async fn bind_remote_stream(
        &self,
        info: &StreamInfo,
        reader: Arc<dyn RTPReader + Send + Sync>,
    ) -> Arc<dyn RTPReader + Send + Sync> {
        self.record(&format!("bind_remote_stream:{}", info.ssrc));
        Arc::new(MockRTPReader {
            name: self.name.clone(),
            events: Arc::clone(&self.events),
            header_extension: self.header_extension.clone(),
            next: reader,
        })
    }

    async fn unbind_remote_stream(&self, info: &StreamInfo) {
        self.record(&format!("unbind_remote_stream:{}", info.ssrc));
    }

    async fn close(&self) -> Result<()> {
        self.record("close");
        if let Some(msg) = &self.close_error {
            return Err(Error::Other(msg.clone()));
        }
        Ok(())
    }
}
