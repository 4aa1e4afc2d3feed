use std::{
    fs::File,
    io::{self, ErrorKind},
    path::Path,
};

use memmap2::Mmap;

/// Read-only view of an entire file. The mapping is released when this is dropped.
pub struct MappedFile {
    mmap: Mmap,
}

impl MappedFile {
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::open(path)?;
        // SAFETY: the mapping is only read, and inputs are not expected to be modified while a
        // merge is running. The file handle may be closed once mapped.
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(MappedFile { mmap })
    }

    /// Bytes `[start, end)` of the file.
    ///
    /// # Errors
    /// [ErrorKind::UnexpectedEof] if the file is shorter than `end`, e.g., it was truncated
    /// after being catalogued.
    pub fn range(&self, start: u64, end: u64) -> io::Result<&[u8]> {
        let len = self.mmap.len() as u64;
        if start > end || end > len {
            return Err(io::Error::new(
                ErrorKind::UnexpectedEof,
                format!("range {start}..{end} outside of {len} byte file"),
            ));
        }
        // both bounded by the mapping length, which fits in usize
        Ok(&self.mmap[start as usize..end as usize])
    }
}
