//! Merge a directory of classic libpcap captures into a single capture.
//!
//! Captures are ordered by the timestamp of their first packet. The merged capture keeps the
//! file header of the earliest capture followed by the packet records of every capture, so all
//! inputs are expected to share link-layer type, snapshot length, and byte order.
//!
//! ```no_run
//! use pcapmerge::{config::Config, merge_directory};
//!
//! let summary = merge_directory("captures", "merged.pcap", &Config::default())?;
//! println!("merged {} files", summary.files);
//! # Ok::<(), pcapmerge::Error>(())
//! ```
mod catalog;
mod collector;
mod error;
mod header;
mod merge;
mod time;
mod timestamp;
mod writer;

pub mod config;

pub use catalog::*;
pub use collector::*;
pub use error::*;
pub use header::*;
pub use merge::*;
pub use time::*;
pub use timestamp::*;
pub use writer::*;
