mod mapped;

pub use mapped::MappedFile;

use std::{
    fs::File,
    io::{self, ErrorKind, Write},
    path::Path,
};

use tracing::{debug, trace};

use crate::{
    catalog::{output_size, CatalogEntry},
    error::{Error, Result},
    header::MINIMUM_SIZE,
};

/// Destination of a merge.
///
/// A sink must support being sized up front so the output has its final length before any
/// packet data is copied.
pub trait Sink: Write {
    fn set_len(&mut self, len: u64) -> io::Result<()>;
}

impl Sink for File {
    fn set_len(&mut self, len: u64) -> io::Result<()> {
        File::set_len(self, len)
    }
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn set_len(&mut self, len: u64) -> io::Result<()> {
        (**self).set_len(len)
    }
}

/// Write all of `buf` to `sink`.
///
/// Interrupted writes are retried and partial writes resumed. On failure returns the number of
/// bytes of `buf` that were not written along with the error.
fn write_fully<W: Write + ?Sized>(
    sink: &mut W,
    mut buf: &[u8],
) -> std::result::Result<(), (u64, io::Error)> {
    while !buf.is_empty() {
        match sink.write(buf) {
            Ok(0) => {
                return Err((
                    buf.len() as u64,
                    io::Error::new(ErrorKind::WriteZero, "sink accepted no bytes"),
                ));
            }
            Ok(n) => buf = &buf[n..],
            Err(err) if err.kind() == ErrorKind::Interrupted => {
                trace!("write interrupted with {} bytes left; retrying", buf.len());
            }
            Err(err) => return Err((buf.len() as u64, err)),
        }
    }
    Ok(())
}

/// Copy the selected part of a single catalogued file to `sink`.
fn copy_entry<S: Sink + ?Sized>(
    sink: &mut S,
    entry: &CatalogEntry,
    offset: u64,
    dest: &Path,
) -> Result<u64> {
    let to_copy = entry.size.saturating_sub(offset);
    let copy_err = |remaining: u64, source: io::Error| Error::Copy {
        src: entry.path.clone(),
        dest: dest.to_path_buf(),
        remaining,
        source,
    };

    let mapped = MappedFile::open(&entry.path).map_err(|e| copy_err(to_copy, e))?;
    let data = mapped
        .range(offset, entry.size)
        .map_err(|e| copy_err(to_copy, e))?;
    write_fully(sink, data).map_err(|(remaining, e)| copy_err(remaining, e))?;

    debug!(path = ?entry.path, key = entry.key, bytes = to_copy, "copied");
    Ok(to_copy)
}

/// Merge `entries`, already in output order, into `sink`.
///
/// The first entry is copied in full and supplies the output's file header; only the packet
/// records following the file header are copied from the rest. The sink is sized to the final
/// output size before copying begins. `dest` identifies the sink in errors.
///
/// Returns the number of bytes written.
///
/// # Errors
/// [Error::TooSmall] if an entry's size cannot hold a file and record header, in which case the
/// sink is untouched. [Error::Presize] if the sink cannot be sized, or [Error::Copy] if an input
/// cannot be mapped or the sink fails. On error the contents of the sink are undefined.
pub fn write_merged<S: Sink + ?Sized>(
    entries: &[CatalogEntry],
    sink: &mut S,
    dest: &Path,
) -> Result<u64> {
    if let Some(entry) = entries.iter().find(|e| e.size <= MINIMUM_SIZE as u64) {
        return Err(Error::TooSmall {
            path: entry.path.clone(),
            size: entry.size,
        });
    }
    let Some(size) = output_size(entries) else {
        return Ok(0);
    };
    sink.set_len(size).map_err(|source| Error::Presize {
        path: dest.to_path_buf(),
        size,
        source,
    })?;
    debug!(?dest, size, "sized output");

    let mut written = 0;
    for (idx, entry) in entries.iter().enumerate() {
        written += copy_entry(sink, entry, CatalogEntry::copy_offset(idx), dest)?;
    }
    if let Err(source) = sink.flush() {
        // entries is non-empty here
        let last = &entries[entries.len() - 1];
        return Err(Error::Copy {
            src: last.path.clone(),
            dest: dest.to_path_buf(),
            remaining: 0,
            source,
        });
    }

    Ok(written)
}
