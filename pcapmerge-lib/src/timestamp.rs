use std::{
    fmt::Display,
    fs::File,
    io::{ErrorKind, Read},
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    header::{FileHeader, Magic, RecordHeader, MINIMUM_SIZE},
};

/// How the first packet's sub-second timestamp field becomes part of a sort key.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampMode {
    /// Sub-second field is used as microseconds regardless of the file's resolution. This is how
    /// existing merged captures were ordered.
    #[default]
    Literal,
    /// Nanosecond resolution files have their sub-second field converted to microseconds.
    Normalized,
}

/// Reasons a candidate file cannot contribute a sort key.
#[derive(Debug)]
pub enum Unusable {
    Open(std::io::Error),
    TooShort,
    Read(std::io::Error),
    Magic(u32),
    Version { major: u16, minor: u16 },
}

impl Display for Unusable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Unusable::Open(err) => write!(f, "cannot open: {err}"),
            Unusable::TooShort => write!(f, "fewer than {MINIMUM_SIZE} bytes"),
            Unusable::Read(err) => write!(f, "cannot read: {err}"),
            Unusable::Magic(magic) => write!(f, "unrecognized magic 0x{magic:08x}"),
            Unusable::Version { major, minor } => {
                write!(f, "unsupported version {major}.{minor}")
            }
        }
    }
}

impl From<Error> for Unusable {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidMagic(magic) => Unusable::Magic(magic),
            Error::InvalidVersion { major, minor } => Unusable::Version { major, minor },
            _ => Unusable::TooShort,
        }
    }
}

/// Compute the sort key, microseconds since the epoch, of a record timestamp.
#[must_use]
pub fn sort_key(magic: Magic, record: &RecordHeader, mode: TimestampMode) -> u64 {
    let subsec = match (mode, magic) {
        (TimestampMode::Normalized, Magic::Nano) => u64::from(record.ts_subsec) / 1_000,
        _ => u64::from(record.ts_subsec),
    };
    u64::from(record.ts_sec) * 1_000_000 + subsec
}

/// Read and decode the file header and first record header of `path`.
///
/// # Errors
/// [Unusable] if the file cannot be opened, is too short, or does not have a supported header.
pub fn read_headers<P: AsRef<Path>>(
    path: P,
) -> std::result::Result<(FileHeader, RecordHeader), Unusable> {
    let mut file = File::open(path).map_err(Unusable::Open)?;
    let mut buf = [0u8; MINIMUM_SIZE];
    file.read_exact(&mut buf).map_err(|err| match err.kind() {
        ErrorKind::UnexpectedEof => Unusable::TooShort,
        _ => Unusable::Read(err),
    })?;

    let file_header = FileHeader::from_bytes(&buf[..FileHeader::LEN])?;
    file_header.validate()?;
    let record_header = RecordHeader::from_bytes(&buf[FileHeader::LEN..])?;

    Ok((file_header, record_header))
}

/// Extract the sort key of a candidate capture file from its first packet.
///
/// The file is closed before returning on every path.
///
/// # Errors
/// [Unusable] if the file is not a usable capture.
pub fn extract<P: AsRef<Path>>(
    path: P,
    mode: TimestampMode,
) -> std::result::Result<u64, Unusable> {
    let (file_header, record_header) = read_headers(path)?;
    // validated in read_headers
    let magic = file_header.magic()?;
    Ok(sort_key(magic, &record_header, mode))
}

/// Like [read_headers], but for callers that want a hard error.
///
/// # Errors
/// Io errors opening or reading, or header validation errors.
pub fn inspect<P: AsRef<Path>>(path: P) -> Result<(FileHeader, RecordHeader)> {
    read_headers(path).map_err(|err| match err {
        Unusable::Open(err) | Unusable::Read(err) => Error::Io(err),
        Unusable::TooShort => Error::NotEnoughBytes("capture headers"),
        Unusable::Magic(magic) => Error::InvalidMagic(magic),
        Unusable::Version { major, minor } => Error::InvalidVersion { major, minor },
    })
}
