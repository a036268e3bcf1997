use std::sync::Arc;

use async_trait::async_trait;
use util::sync::Mutex;

use crate::error::Result;
use crate::interceptor::nack::UINT16SIZE_HALF;
use crate::interceptor::{Attributes, RTPReader};

/// ReceiveLog is a bitmap of recently received sequence numbers.
///
/// `end` is the newest sequence number seen and `last_consecutive` the newest one before
/// which nothing is missing. Everything between the two that is not marked received is
/// reported as missing.
struct ReceiveLog {
    packets: Vec<u64>,
    size: u16,
    end: u16,
    started: bool,
    last_consecutive: u16,
}

impl ReceiveLog {
    fn new(log2_size_minus_6: u8) -> Self {
        ReceiveLog {
            packets: vec![0u64; 1 << log2_size_minus_6],
            size: 1 << (log2_size_minus_6 + 6),
            end: 0,
            started: false,
            last_consecutive: 0,
        }
    }

    fn add(&mut self, seq: u16) {
        if !self.started {
            self.set_received(seq);
            self.end = seq;
            self.started = true;
            self.last_consecutive = seq;
            return;
        }

        let next_consecutive = self.last_consecutive.wrapping_add(1);
        let diff = seq.wrapping_sub(self.end);
        if diff == 0 {
            return;
        }

        if diff < UINT16SIZE_HALF {
            // seq is ahead of end; forget whatever the skipped slots held a full log ago
            let mut i = self.end.wrapping_add(1);
            while i != seq {
                self.del_received(i);
                i = i.wrapping_add(1);
            }
            self.end = seq;

            if next_consecutive == seq {
                self.last_consecutive = seq;
            } else if seq.wrapping_sub(self.last_consecutive) > self.size {
                self.last_consecutive = seq.wrapping_sub(self.size);
                self.fix_last_consecutive();
            }
        } else if next_consecutive == seq {
            // late arrival filling the first gap
            self.last_consecutive = seq;
            self.fix_last_consecutive();
        }

        self.set_received(seq);
    }

    fn get(&self, seq: u16) -> bool {
        let diff = self.end.wrapping_sub(seq);
        if diff >= UINT16SIZE_HALF || diff >= self.size {
            return false;
        }

        self.get_received(seq)
    }

    fn missing_seq_numbers(&self, skip_last_n: u16) -> Vec<u16> {
        let until = self.end.wrapping_sub(skip_last_n);
        if until.wrapping_sub(self.last_consecutive) >= UINT16SIZE_HALF {
            // until is behind last_consecutive
            return vec![];
        }

        let mut missing = vec![];
        let mut i = self.last_consecutive.wrapping_add(1);
        let until_plus_1 = until.wrapping_add(1);
        while i != until_plus_1 {
            if !self.get_received(i) {
                missing.push(i);
            }
            i = i.wrapping_add(1);
        }

        missing
    }

    fn position(&self, seq: u16) -> (usize, u64) {
        let pos = (seq % self.size) as usize;
        (pos / 64, 1u64 << (pos % 64))
    }

    fn set_received(&mut self, seq: u16) {
        let (word, bit) = self.position(seq);
        self.packets[word] |= bit;
    }

    fn del_received(&mut self, seq: u16) {
        let (word, bit) = self.position(seq);
        self.packets[word] &= !bit;
    }

    fn get_received(&self, seq: u16) -> bool {
        let (word, bit) = self.position(seq);
        self.packets[word] & bit != 0
    }

    fn fix_last_consecutive(&mut self) {
        let end_plus_1 = self.end.wrapping_add(1);
        let mut i = self.last_consecutive.wrapping_add(1);
        while i != end_plus_1 && self.get_received(i) {
            i = i.wrapping_add(1);
        }
        self.last_consecutive = i.wrapping_sub(1);
    }
}

/// GeneratorStream records the sequence number of every packet read through it.
pub(super) struct GeneratorStream {
    parent_rtp_reader: Arc<dyn RTPReader + Send + Sync>,
    log: Mutex<ReceiveLog>,
}

impl GeneratorStream {
    pub(super) fn new(log2_size_minus_6: u8, reader: Arc<dyn RTPReader + Send + Sync>) -> Self {
        GeneratorStream {
            parent_rtp_reader: reader,
            log: Mutex::new(ReceiveLog::new(log2_size_minus_6)),
        }
    }

    pub(super) fn missing_seq_numbers(&self, skip_last_n: u16) -> Vec<u16> {
        let log = self.log.lock();
        log.missing_seq_numbers(skip_last_n)
    }

    fn add(&self, seq: u16) {
        let mut log = self.log.lock();
        log.add(seq);
    }
}

#[async_trait]
impl RTPReader for GeneratorStream {
    async fn read(
        &self,
        buf: &mut [u8],
        a: &Attributes,
    ) -> Result<(rtp::packet::Packet, Attributes)> {
        let (pkt, attr) = self.parent_rtp_reader.read(buf, a).await?;
        self.add(pkt.header.sequence_number);
        Ok((pkt, attr))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn range(min: u16, max: u16) -> Vec<u16> {
        let mut result = vec![];
        let mut i = min;
        let max_plus_1 = max.wrapping_add(1);
        while i != max_plus_1 {
            result.push(i);
            i = i.wrapping_add(1);
        }
        result
    }

    #[test]
    fn test_receive_log_tracks_gaps() {
        for start in [0u16, 1, 127, 128, 511, 32767, 32768, 65408, 65535] {
            let offset = |nums: &[u16]| -> Vec<u16> {
                nums.iter().map(|n| start.wrapping_add(*n)).collect()
            };
            let mut rl = ReceiveLog::new(1);
            let add = |rl: &mut ReceiveLog, nums: &[u16]| {
                for seq in offset(nums) {
                    rl.add(seq);
                }
            };

            add(&mut rl, &[0]);
            assert!(rl.get(start));
            assert!(rl.missing_seq_numbers(0).is_empty());
            assert_eq!(rl.last_consecutive, start);

            add(&mut rl, &range(1, 127));
            assert!(rl.missing_seq_numbers(0).is_empty());
            assert_eq!(rl.last_consecutive, start.wrapping_add(127));

            // the log holds 128 entries, so 0 falls out
            add(&mut rl, &[128]);
            assert!(!rl.get(start));
            assert_eq!(rl.last_consecutive, start.wrapping_add(128));

            add(&mut rl, &[130]);
            assert_eq!(rl.missing_seq_numbers(0), offset(&[129]));
            assert_eq!(rl.last_consecutive, start.wrapping_add(128));

            // a jump past the log size moves last_consecutive to the oldest tracked entry
            add(&mut rl, &[333]);
            assert_eq!(rl.missing_seq_numbers(0), offset(&range(206, 332)));
            assert_eq!(rl.missing_seq_numbers(10), offset(&range(206, 323)));
            assert_eq!(rl.last_consecutive, start.wrapping_add(205));

            add(&mut rl, &range(206, 332));
            assert!(rl.missing_seq_numbers(0).is_empty(), "start {start}");
            assert_eq!(rl.last_consecutive, start.wrapping_add(333));
        }
    }

    #[test]
    fn test_receive_log_late_packet_advances_last_consecutive() {
        let mut rl = ReceiveLog::new(0);
        for seq in [10, 11, 13, 14] {
            rl.add(seq);
        }
        assert_eq!(rl.missing_seq_numbers(0), vec![12]);
        assert_eq!(rl.last_consecutive, 11);

        rl.add(12);
        assert!(rl.missing_seq_numbers(0).is_empty());
        assert_eq!(rl.last_consecutive, 14);
    }

    #[test]
    fn test_receive_log_rollover() {
        let mut rl = ReceiveLog::new(1);
        rl.add(65533);
        rl.add(65535);
        rl.add(65534);
        assert_eq!(rl.last_consecutive, 65535);

        let mut rl = ReceiveLog::new(1);
        rl.add(65534);
        rl.add(0);
        assert_eq!(rl.missing_seq_numbers(0), vec![65535]);
        rl.add(65535);
        assert_eq!(rl.last_consecutive, 0);
    }
}
