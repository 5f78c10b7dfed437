//! Record-oriented demo data.
//!
//! A demo buffer is a sequence of fixed-size textual records, each a
//! UUID-formatted string of random hex digits.

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

/// Size of one demo record.
pub const RECORD_SIZE_BYTES: usize = 36;

/// A buffer of demo records.
#[derive(Debug, Clone)]
pub struct DemoRecords {
    /// Concatenated record bytes
    pub buf: Vec<u8>,
    /// The records, in buffer order
    pub records: Vec<String>,
}

impl DemoRecords {
    /// Generates `count` records from `seed`.
    pub fn generate(count: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut buf = Vec::with_capacity(count * RECORD_SIZE_BYTES);
        let mut records = Vec::with_capacity(count);

        for _ in 0..count {
            let mut raw = [0u8; 16];
            rng.fill_bytes(&mut raw);
            let record = format_record(&raw);
            buf.extend_from_slice(record.as_bytes());
            records.push(record);
        }

        Self { buf, records }
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if there are no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn format_record(raw: &[u8; 16]) -> String {
    format!(
        "{}-{}-{}-{}-{}",
        hex::encode(&raw[0..4]),
        hex::encode(&raw[4..6]),
        hex::encode(&raw[6..8]),
        hex::encode(&raw[8..10]),
        hex::encode(&raw[10..16])
    )
}

/// Byte offset of record `position`.
pub fn record_offset(position: usize) -> u32 {
    (position * RECORD_SIZE_BYTES) as u32
}

/// Splits a buffer back into records.
pub fn split_records(buf: &[u8]) -> Vec<String> {
    buf.chunks(RECORD_SIZE_BYTES)
        .map(|r| String::from_utf8_lossy(r).into_owned())
        .collect()
}
