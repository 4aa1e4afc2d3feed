#![allow(dead_code)]

use std::{
    fs,
    path::{Path, PathBuf},
};

use pcapmerge::{FileHeader, Magic, RecordHeader};

/// Builder for single-record capture fixtures.
pub struct Capture {
    header: FileHeader,
    record: RecordHeader,
    payload: Vec<u8>,
}

impl Capture {
    pub fn new(magic: Magic, ts_sec: u32, ts_subsec: u32) -> Self {
        Capture {
            header: FileHeader::new(magic, 65535, 1),
            record: RecordHeader {
                ts_sec,
                ts_subsec,
                caplen: 0,
                len: 0,
            },
            payload: Vec::default(),
        }
    }

    pub fn micro(ts_sec: u32, ts_usec: u32) -> Self {
        Self::new(Magic::Micro, ts_sec, ts_usec)
    }

    pub fn nano(ts_sec: u32, ts_nsec: u32) -> Self {
        Self::new(Magic::Nano, ts_sec, ts_nsec)
    }

    pub fn snaplen(mut self, snaplen: u32) -> Self {
        self.header.snaplen = snaplen;
        self
    }

    /// Packet data of `len` bytes of `fill`.
    pub fn payload(mut self, len: usize, fill: u8) -> Self {
        self.payload = vec![fill; len];
        self.record.caplen = len as u32;
        self.record.len = len as u32;
        self
    }

    pub fn bytes(&self) -> Vec<u8> {
        let mut dat = Vec::from(self.header.as_bytes());
        dat.extend_from_slice(&self.record.as_bytes());
        dat.extend_from_slice(&self.payload);
        dat
    }

    pub fn write(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, self.bytes()).unwrap();
        path
    }
}

/// Bytes of a microsecond capture with a 4 byte packet.
pub fn capture(ts_sec: u32, ts_usec: u32) -> Vec<u8> {
    Capture::micro(ts_sec, ts_usec).payload(4, 0xff).bytes()
}
