use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::{
    error::{Error, Result},
    header::{FileHeader, MINIMUM_SIZE},
};

/// A capture file accepted for merging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub path: PathBuf,
    /// File size in bytes at the time it was catalogued.
    pub size: u64,
    /// First packet time, microseconds since Jan 1, 1970.
    pub key: u64,
}

impl CatalogEntry {
    /// Byte range of this entry's file that is copied to the output, given its position in the
    /// sorted catalog. Only the first file contributes its file header.
    #[must_use]
    pub fn copy_offset(idx: usize) -> u64 {
        if idx == 0 {
            0
        } else {
            FileHeader::LEN as u64
        }
    }
}

/// Collection of accepted capture files that can be ordered by first packet time.
#[derive(Debug)]
pub struct Catalog {
    initial_capacity: usize,
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub const DEFAULT_CAPACITY: usize = 1024;

    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Create an empty catalog that will allocate room for `capacity` entries on first insert.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Catalog {
            initial_capacity: capacity.max(1),
            entries: Vec::new(),
        }
    }

    /// Add a file.
    ///
    /// # Errors
    /// [Error::TooSmall] if `size` cannot hold a file header and a record header.
    /// [Error::Alloc] if storage for the entry cannot be allocated. This is fatal for a merge
    /// since the final ordering can no longer be guaranteed.
    pub fn insert<P: AsRef<Path>>(&mut self, path: P, size: u64, key: u64) -> Result<()> {
        let path = path.as_ref();
        if size <= MINIMUM_SIZE as u64 {
            return Err(Error::TooSmall {
                path: path.to_path_buf(),
                size,
            });
        }
        self.grow().map_err(|source| Error::Alloc {
            path: path.to_path_buf(),
            source,
        })?;

        let mut owned = PathBuf::new();
        owned
            .as_mut_os_string()
            .try_reserve_exact(path.as_os_str().len())
            .map_err(|source| Error::Alloc {
                path: path.to_path_buf(),
                source,
            })?;
        owned.push(path);

        self.entries.push(CatalogEntry {
            path: owned,
            size,
            key,
        });
        Ok(())
    }

    // Doubling growth; never lets push reallocate on its own.
    fn grow(&mut self) -> std::result::Result<(), std::collections::TryReserveError> {
        if self.entries.len() < self.entries.capacity() {
            return Ok(());
        }
        let additional = if self.entries.capacity() == 0 {
            self.initial_capacity
        } else {
            self.entries.capacity()
        };
        self.entries.try_reserve_exact(additional)
    }

    /// Order entries by key ascending. Entries with equal keys have no defined relative order.
    pub fn sort(&mut self) {
        self.entries.sort_unstable_by_key(|e| e.key);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CatalogEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    fn capacity(&self) -> usize {
        self.entries.capacity()
    }

    /// Size of the merged output, or `None` if there is nothing to merge.
    #[must_use]
    pub fn output_size(&self) -> Option<u64> {
        output_size(&self.entries)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a CatalogEntry;
    type IntoIter = std::slice::Iter<'a, CatalogEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Size of merging `entries`: the sum of their sizes less one file header for every file but
/// the first.
///
/// `None` if there is nothing to merge, or if an entry is smaller than the part of it that
/// would be skipped.
#[must_use]
pub fn output_size(entries: &[CatalogEntry]) -> Option<u64> {
    if entries.is_empty() {
        return None;
    }
    entries.iter().enumerate().try_fold(0u64, |total, (idx, e)| {
        total.checked_add(e.size.checked_sub(CatalogEntry::copy_offset(idx))?)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_sort() {
        let mut catalog = Catalog::new();
        catalog.insert("a.pcap", 1040, 100).unwrap();
        catalog.insert("b.pcap", 1064, 50).unwrap();
        catalog.insert("c.pcap", 100, 75).unwrap();
        assert_eq!(catalog.len(), 3);

        catalog.sort();

        let keys: Vec<u64> = catalog.iter().map(|e| e.key).collect();
        assert_eq!(keys, vec![50, 75, 100]);
        assert_eq!(catalog.entries()[0].path, PathBuf::from("b.pcap"));
    }

    #[test]
    fn test_equal_keys_kept() {
        let mut catalog = Catalog::new();
        catalog.insert("a.pcap", 100, 7).unwrap();
        catalog.insert("b.pcap", 100, 7).unwrap();
        catalog.insert("c.pcap", 100, 1).unwrap();
        catalog.sort();

        let mut paths: Vec<&Path> = catalog.iter().skip(1).map(|e| e.path.as_path()).collect();
        paths.sort();
        assert_eq!(paths, vec![Path::new("a.pcap"), Path::new("b.pcap")]);
    }

    #[test]
    fn test_growth_doubles() {
        let mut catalog = Catalog::with_capacity(2);
        assert_eq!(catalog.capacity(), 0);

        catalog.insert("0", 41, 0).unwrap();
        assert_eq!(catalog.capacity(), 2);
        catalog.insert("1", 41, 1).unwrap();
        assert_eq!(catalog.capacity(), 2);
        catalog.insert("2", 41, 2).unwrap();
        assert_eq!(catalog.capacity(), 4);
        for i in 3..5 {
            catalog.insert(i.to_string(), 41, i).unwrap();
        }
        assert_eq!(catalog.capacity(), 8);
    }

    #[test]
    fn test_output_size() {
        let mut catalog = Catalog::new();
        assert_eq!(catalog.output_size(), None);

        catalog.insert("a.pcap", 1040, 100).unwrap();
        assert_eq!(catalog.output_size(), Some(1040));

        catalog.insert("b.pcap", 1064, 50).unwrap();
        assert_eq!(catalog.output_size(), Some(2080));
    }

    #[test]
    fn test_insert_too_small() {
        let mut catalog = Catalog::new();
        let zult = catalog.insert("a.pcap", 10, 1);
        assert!(matches!(zult, Err(Error::TooSmall { size: 10, .. })));
        assert!(matches!(
            catalog.insert("b.pcap", MINIMUM_SIZE as u64, 1),
            Err(Error::TooSmall { .. })
        ));
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_output_size_short_entry() {
        let entry = |size| CatalogEntry {
            path: PathBuf::from("x"),
            size,
            key: 0,
        };
        assert_eq!(output_size(&[entry(10)]), Some(10));
        assert_eq!(output_size(&[entry(10), entry(10)]), None);
        assert_eq!(output_size(&[entry(10), entry(24)]), Some(10));
    }

    #[test]
    fn test_copy_offset() {
        assert_eq!(CatalogEntry::copy_offset(0), 0);
        assert_eq!(CatalogEntry::copy_offset(1), 24);
        assert_eq!(CatalogEntry::copy_offset(99), 24);
    }
}
