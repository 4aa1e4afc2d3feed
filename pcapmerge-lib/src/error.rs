use std::{collections::TryReserveError, io, path::PathBuf};

/// Phase of a merge run an [Error] occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Config,
    Scan,
    Presize,
    Copy,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Not enough bytes creating {0}")]
    NotEnoughBytes(&'static str),

    #[error("unrecognized magic 0x{0:08x}")]
    InvalidMagic(u32),

    #[error("unsupported version {major}.{minor}")]
    InvalidVersion { major: u16, minor: u16 },

    #[error("'{0}' doesn't exist or is not a directory")]
    NotADirectory(PathBuf),

    #[error("failed to scan {path:?}: {source}")]
    Scan { path: PathBuf, source: io::Error },

    #[error("no capture files to merge")]
    NoInputs,

    #[error("{path:?} is {size} bytes, too small to be a capture")]
    TooSmall { path: PathBuf, size: u64 },

    #[error("failed allocating catalog entry for {path:?}: {source}")]
    Alloc {
        path: PathBuf,
        source: TryReserveError,
    },

    #[error("failed opening {path:?} for writing: {source}")]
    CreateSink { path: PathBuf, source: io::Error },

    #[error("failed truncating {path:?} to {size} bytes: {source}")]
    Presize {
        path: PathBuf,
        size: u64,
        source: io::Error,
    },

    #[error("failed copying {remaining} bytes from {src:?} to {dest:?}: {source}")]
    Copy {
        src: PathBuf,
        dest: PathBuf,
        remaining: u64,
        source: io::Error,
    },

    #[error("time format error: {0}")]
    TimeFormat(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("Config invalid: {0}")]
    ConfigInvalid(String),
    #[error("Failed to read config {path:?}: {source}")]
    ConfigRead { path: PathBuf, source: io::Error },
    #[error("Failed to load config: {}", .source)]
    ConfigLoad {
        #[from]
        source: serde_yaml::Error,
    },
}

impl Error {
    /// The run phase this error belongs to.
    #[must_use]
    pub fn phase(&self) -> Phase {
        match self {
            Error::ConfigInvalid(_)
            | Error::ConfigRead { .. }
            | Error::ConfigLoad { .. }
            | Error::TimeFormat(_) => Phase::Config,
            Error::Presize { .. } => Phase::Presize,
            Error::Copy { .. } => Phase::Copy,
            Error::NotEnoughBytes(_)
            | Error::InvalidMagic(_)
            | Error::InvalidVersion { .. }
            | Error::NotADirectory(_)
            | Error::Scan { .. }
            | Error::NoInputs
            | Error::TooSmall { .. }
            | Error::Alloc { .. }
            | Error::CreateSink { .. }
            | Error::Io(_) => Phase::Scan,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
