//! Classic libpcap file and record headers.
//!
//! Fields are stored in the byte order of the host that wrote the capture, and no swapping is
//! performed; a capture written on a host of the other byte order will not have a recognized
//! magic and is treated as unusable.
//!
//! # Reference
//! <https://wiki.wireshark.org/Development/LibpcapFileFormat>
use serde::Serialize;

use crate::error::{Error, Result};

macro_rules! from_bytes2 {
    ($type:ty, $dat:ident, $start:expr) => {
        <$type>::from_ne_bytes([$dat[$start], $dat[$start + 1]])
    };
}

macro_rules! from_bytes4 {
    ($type:ty, $dat:ident, $start:expr) => {
        <$type>::from_ne_bytes([
            $dat[$start],
            $dat[$start + 1],
            $dat[$start + 2],
            $dat[$start + 3],
        ])
    };
}

/// The only supported file format version.
pub const VERSION_MAJOR: u16 = 2;
pub const VERSION_MINOR: u16 = 4;

/// Smallest file from which a sort key can be derived, i.e., a file header plus one record
/// header.
pub const MINIMUM_SIZE: usize = FileHeader::LEN + RecordHeader::LEN;

/// File format marker, selecting the resolution of record timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Magic {
    Micro,
    Nano,
}

impl Magic {
    pub const MICRO: u32 = 0xa1b2_c3d4;
    pub const NANO: u32 = 0xa1b2_3c4d;

    #[must_use]
    pub fn value(self) -> u32 {
        match self {
            Magic::Micro => Self::MICRO,
            Magic::Nano => Self::NANO,
        }
    }
}

impl TryFrom<u32> for Magic {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            Self::MICRO => Ok(Magic::Micro),
            Self::NANO => Ok(Magic::Nano),
            _ => Err(Error::InvalidMagic(value)),
        }
    }
}

/// Capture file header.
///
/// | field         | offset | width |
/// |---------------|--------|-------|
/// | magic         | 0      | 4     |
/// | version_major | 4      | 2     |
/// | version_minor | 6      | 2     |
/// | thiszone      | 8      | 4     |
/// | sigfigs       | 12     | 4     |
/// | snaplen       | 16     | 4     |
/// | linktype      | 20     | 4     |
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileHeader {
    /// Raw magic value; see [FileHeader::magic] for the decoded variant.
    pub magic: u32,
    pub version_major: u16,
    pub version_minor: u16,
    /// GMT to local correction in seconds.
    pub thiszone: i32,
    /// Accuracy of timestamps.
    pub sigfigs: u32,
    /// Max length of captured packets.
    pub snaplen: u32,
    /// Link-layer header type.
    pub linktype: u32,
}

impl FileHeader {
    pub const LEN: usize = 24;

    #[must_use]
    pub fn new(magic: Magic, snaplen: u32, linktype: u32) -> Self {
        FileHeader {
            magic: magic.value(),
            version_major: VERSION_MAJOR,
            version_minor: VERSION_MINOR,
            thiszone: 0,
            sigfigs: 0,
            snaplen,
            linktype,
        }
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < FileHeader::LEN {
            return Err(Error::NotEnoughBytes("FileHeader"));
        }
        Ok(Self {
            magic: from_bytes4!(u32, data, 0),
            version_major: from_bytes2!(u16, data, 4),
            version_minor: from_bytes2!(u16, data, 6),
            thiszone: from_bytes4!(i32, data, 8),
            sigfigs: from_bytes4!(u32, data, 12),
            snaplen: from_bytes4!(u32, data, 16),
            linktype: from_bytes4!(u32, data, 20),
        })
    }

    #[must_use]
    pub fn as_bytes(&self) -> [u8; Self::LEN] {
        let mut buf = [0u8; Self::LEN];
        buf[0..4].copy_from_slice(&self.magic.to_ne_bytes());
        buf[4..6].copy_from_slice(&self.version_major.to_ne_bytes());
        buf[6..8].copy_from_slice(&self.version_minor.to_ne_bytes());
        buf[8..12].copy_from_slice(&self.thiszone.to_ne_bytes());
        buf[12..16].copy_from_slice(&self.sigfigs.to_ne_bytes());
        buf[16..20].copy_from_slice(&self.snaplen.to_ne_bytes());
        buf[20..24].copy_from_slice(&self.linktype.to_ne_bytes());

        buf
    }

    /// Decoded magic.
    ///
    /// # Errors
    /// [Error::InvalidMagic] if the magic is not one of the recognized values.
    pub fn magic(&self) -> Result<Magic> {
        Magic::try_from(self.magic)
    }

    /// Check the magic and version, returning the decoded magic.
    ///
    /// # Errors
    /// [Error::InvalidMagic] or [Error::InvalidVersion].
    pub fn validate(&self) -> Result<Magic> {
        let magic = self.magic()?;
        if self.version_major != VERSION_MAJOR || self.version_minor != VERSION_MINOR {
            return Err(Error::InvalidVersion {
                major: self.version_major,
                minor: self.version_minor,
            });
        }
        Ok(magic)
    }
}

/// Header preceding each packet's bytes.
///
/// | field     | offset | width |
/// |-----------|--------|-------|
/// | ts_sec    | 0      | 4     |
/// | ts_subsec | 4      | 4     |
/// | caplen    | 8      | 4     |
/// | len       | 12     | 4     |
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordHeader {
    pub ts_sec: u32,
    /// Microseconds or nanoseconds, depending on the file's [Magic].
    pub ts_subsec: u32,
    /// Number of packet bytes present in the file.
    pub caplen: u32,
    /// Original length of the packet on the wire.
    pub len: u32,
}

impl RecordHeader {
    pub const LEN: usize = 16;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < RecordHeader::LEN {
            return Err(Error::NotEnoughBytes("RecordHeader"));
        }
        Ok(Self {
            ts_sec: from_bytes4!(u32, data, 0),
            ts_subsec: from_bytes4!(u32, data, 4),
            caplen: from_bytes4!(u32, data, 8),
            len: from_bytes4!(u32, data, 12),
        })
    }

    #[must_use]
    pub fn as_bytes(&self) -> [u8; Self::LEN] {
        let mut buf = [0u8; Self::LEN];
        buf[0..4].copy_from_slice(&self.ts_sec.to_ne_bytes());
        buf[4..8].copy_from_slice(&self.ts_subsec.to_ne_bytes());
        buf[8..12].copy_from_slice(&self.caplen.to_ne_bytes());
        buf[12..16].copy_from_slice(&self.len.to_ne_bytes());

        buf
    }
}
