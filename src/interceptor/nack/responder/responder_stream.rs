use std::sync::Arc;

use async_trait::async_trait;
use util::sync::Mutex;

use crate::error::Result;
use crate::interceptor::nack::UINT16SIZE_HALF;
use crate::interceptor::{Attributes, RTPWriter};

/// SendBuffer is a ring of the most recent outgoing packets indexed by sequence number.
struct SendBuffer {
    packets: Vec<Option<rtp::packet::Packet>>,
    size: u16,
    last_added: u16,
    started: bool,
}

impl SendBuffer {
    fn new(log2_size: u8) -> Self {
        let size = 1u16 << log2_size;
        SendBuffer {
            packets: vec![None; size as usize],
            size,
            last_added: 0,
            started: false,
        }
    }

    fn slot(&self, seq: u16) -> usize {
        (seq % self.size) as usize
    }

    fn add(&mut self, packet: &rtp::packet::Packet) {
        let seq = packet.header.sequence_number;
        if self.started {
            let diff = seq.wrapping_sub(self.last_added);
            if diff == 0 {
                return;
            }
            if diff < UINT16SIZE_HALF {
                // moving forward: slots skipped over hold packets from a full ring ago
                let mut i = self.last_added.wrapping_add(1);
                while i != seq {
                    let slot = self.slot(i);
                    self.packets[slot] = None;
                    i = i.wrapping_add(1);
                }
            }
        }

        let slot = self.slot(seq);
        self.packets[slot] = Some(packet.clone());
        self.last_added = seq;
        self.started = true;
    }

    fn get(&self, seq: u16) -> Option<&rtp::packet::Packet> {
        let diff = self.last_added.wrapping_sub(seq);
        if diff >= UINT16SIZE_HALF || diff >= self.size {
            return None;
        }

        self.packets[self.slot(seq)]
            .as_ref()
            .filter(|p| p.header.sequence_number == seq)
    }
}

pub(super) struct ResponderStream {
    buffer: Mutex<SendBuffer>,
    pub(super) next_rtp_writer: Arc<dyn RTPWriter + Send + Sync>,
}

impl ResponderStream {
    pub(super) fn new(log2_size: u8, writer: Arc<dyn RTPWriter + Send + Sync>) -> Self {
        ResponderStream {
            buffer: Mutex::new(SendBuffer::new(log2_size)),
            next_rtp_writer: writer,
        }
    }

    pub(super) async fn get(&self, seq: u16) -> Option<rtp::packet::Packet> {
        let buffer = self.buffer.lock();
        buffer.get(seq).cloned()
    }
}

#[async_trait]
impl RTPWriter for ResponderStream {
    async fn write(&self, pkt: &rtp::packet::Packet, a: &Attributes) -> Result<usize> {
        {
            let mut buffer = self.buffer.lock();
            buffer.add(pkt);
        }

        self.next_rtp_writer.write(pkt, a).await
    }
}
