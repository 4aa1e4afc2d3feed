use std::{
    fs::{self, ReadDir},
    path::{Path, PathBuf},
};

use regex::bytes::Regex;
use tracing::{debug, trace};

use crate::{
    catalog::Catalog,
    config::Config,
    error::{Error, Result},
    header::MINIMUM_SIZE,
    timestamp::{extract, TimestampMode},
};

/// A file that may be a capture, based on its name, type, and size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: PathBuf,
    pub size: u64,
}

/// Matches candidate file names on their extension, ignoring ASCII case. Names are compared as
/// raw bytes so names that are not UTF-8, or contain newlines, are still matched.
#[derive(Debug, Clone)]
pub struct NameFilter {
    pattern: Regex,
}

impl NameFilter {
    /// # Errors
    /// [Error::ConfigInvalid] if `extension` does not produce a valid pattern.
    pub fn new(extension: &str) -> Result<Self> {
        let pattern = Regex::new(&format!(r"(?is-u)^.+\.{}$", regex::escape(extension)))
            .map_err(|e| Error::ConfigInvalid(format!("extension {extension:?}: {e}")))?;
        Ok(NameFilter { pattern })
    }

    #[must_use]
    pub fn matches(&self, name: &[u8]) -> bool {
        self.pattern.is_match(name)
    }
}

/// Iterator of the [Candidate]s directly within a directory.
///
/// Only regular files (following symlinks) larger than [MINIMUM_SIZE] whose names match the
/// filter are produced. Entries that cannot be read are skipped.
pub struct Candidates {
    dir: PathBuf,
    entries: ReadDir,
    filter: NameFilter,
    exclude: Option<PathBuf>,
}

impl Candidates {
    /// # Errors
    /// [Error::Scan] if the directory cannot be read.
    pub fn new<P: AsRef<Path>>(dir: P, filter: NameFilter) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let entries = fs::read_dir(&dir).map_err(|source| Error::Scan {
            path: dir.clone(),
            source,
        })?;
        Ok(Candidates {
            dir,
            entries,
            filter,
            exclude: None,
        })
    }

    /// Never produce `path`, e.g., the merge output when it lives in the scanned directory.
    #[must_use]
    pub fn excluding<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.exclude = fs::canonicalize(path.as_ref()).ok();
        self
    }

    fn is_excluded(&self, path: &Path) -> bool {
        match &self.exclude {
            Some(exclude) => fs::canonicalize(path).is_ok_and(|p| p == *exclude),
            None => false,
        }
    }
}

impl Iterator for Candidates {
    type Item = Candidate;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.entries.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    debug!(dir = ?self.dir, "failed to read directory entry; skipping: {err}");
                    continue;
                }
            };
            let path = entry.path();
            if !self.filter.matches(entry.file_name().as_encoded_bytes()) {
                trace!(?path, "name does not match; skipping");
                continue;
            }
            let meta = match fs::metadata(&path) {
                Ok(meta) => meta,
                Err(err) => {
                    debug!(?path, "failed to stat; skipping: {err}");
                    continue;
                }
            };
            if !meta.is_file() || meta.len() <= MINIMUM_SIZE as u64 {
                trace!(?path, size = meta.len(), "not a regular file or too small; skipping");
                continue;
            }
            if self.is_excluded(&path) {
                debug!(?path, "skipping output file");
                continue;
            }
            return Some(Candidate {
                path,
                size: meta.len(),
            });
        }
    }
}

/// Validates candidates and collects the usable ones into a [Catalog].
pub struct Collector {
    mode: TimestampMode,
    catalog: Catalog,
    skipped: usize,
}

impl Collector {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Collector {
            mode: config.timestamp_mode,
            catalog: Catalog::with_capacity(config.initial_capacity),
            skipped: 0,
        }
    }

    /// Add a candidate, returning whether it was accepted. Candidates that are not usable
    /// captures are skipped.
    ///
    /// # Errors
    /// [Error::Alloc] if the catalog cannot grow.
    pub fn add(&mut self, candidate: Candidate) -> Result<bool> {
        match extract(&candidate.path, self.mode) {
            Ok(key) => {
                trace!(path = ?candidate.path, size = candidate.size, key, "accepted");
                self.catalog.insert(&candidate.path, candidate.size, key)?;
                Ok(true)
            }
            Err(reason) => {
                debug!(path = ?candidate.path, "not a usable capture; skipping: {reason}");
                self.skipped += 1;
                Ok(false)
            }
        }
    }

    /// Number of candidates that were not usable captures.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    #[must_use]
    pub fn finish(self) -> Catalog {
        self.catalog
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::header::{FileHeader, Magic, RecordHeader};

    fn capture(ts_sec: u32) -> Vec<u8> {
        let mut dat = Vec::from(FileHeader::new(Magic::Micro, 65535, 1).as_bytes());
        dat.extend_from_slice(
            &RecordHeader {
                ts_sec,
                ts_subsec: 0,
                caplen: 4,
                len: 4,
            }
            .as_bytes(),
        );
        dat.extend_from_slice(&[1, 2, 3, 4]);
        dat
    }

    fn names(dir: &Path, filter: NameFilter) -> Vec<String> {
        let mut names: Vec<String> = Candidates::new(dir, filter)
            .unwrap()
            .map(|c| c.path.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_name_filter() {
        let filter = NameFilter::new("pcap").unwrap();
        assert!(filter.matches(b"a.pcap"));
        assert!(filter.matches(b"A.PCAP"));
        assert!(filter.matches(b"x.y.PcAp"));
        assert!(!filter.matches(b".pcap"));
        assert!(!filter.matches(b"apcap"));
        assert!(!filter.matches(b"a.pcapng"));
        assert!(!filter.matches(b"a.cap"));
    }

    #[test]
    fn test_candidates() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.pcap"), capture(1)).unwrap();
        fs::write(dir.path().join("B.PCAP"), capture(2)).unwrap();
        fs::write(dir.path().join("c.txt"), capture(3)).unwrap();
        fs::write(dir.path().join("small.pcap"), [0u8; MINIMUM_SIZE]).unwrap();
        fs::create_dir(dir.path().join("sub.pcap")).unwrap();

        let zult = names(dir.path(), NameFilter::new("pcap").unwrap());
        assert_eq!(zult, vec!["B.PCAP", "a.pcap"]);
    }

    #[test]
    fn test_name_filter_raw_bytes() {
        let filter = NameFilter::new("pcap").unwrap();
        assert!(filter.matches(b"caf\xe9.pcap"));
        assert!(filter.matches(b"a\nb.PCAP"));
        assert!(filter.matches(b"\n.pcap"));
        assert!(!filter.matches(b"a.pcap\n"));
        assert!(!filter.matches(b"a.pc\xe9p"));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_candidates_unusual_names() {
        use std::{ffi::OsStr, os::unix::ffi::OsStrExt};

        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("ok.pcap"), capture(1)).unwrap();
        let latin1 = dir.path().join(OsStr::from_bytes(b"caf\xe9.pcap"));
        fs::write(&latin1, capture(2)).unwrap();
        let newline = dir.path().join("a\nb.pcap");
        fs::write(&newline, capture(3)).unwrap();

        let mut zult: Vec<PathBuf> = Candidates::new(dir.path(), NameFilter::new("pcap").unwrap())
            .unwrap()
            .map(|c| c.path)
            .collect();
        zult.sort();
        let mut expected = vec![dir.path().join("ok.pcap"), latin1, newline];
        expected.sort();
        assert_eq!(zult, expected);

        let catalog = crate::merge::catalog_directory(dir.path(), &Config::default()).unwrap();
        let keys: Vec<u64> = catalog.iter().map(|e| e.key).collect();
        assert_eq!(keys, vec![1_000_000, 2_000_000, 3_000_000]);
    }

    #[test]
    fn test_candidates_excluding() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.pcap"), capture(1)).unwrap();
        fs::write(dir.path().join("out.pcap"), capture(2)).unwrap();

        let zult: Vec<Candidate> = Candidates::new(dir.path(), NameFilter::new("pcap").unwrap())
            .unwrap()
            .excluding(dir.path().join("out.pcap"))
            .collect();
        assert_eq!(zult.len(), 1);
        assert_eq!(zult[0].path, dir.path().join("a.pcap"));
    }

    #[test]
    fn test_candidates_missing_dir() {
        let dir = TempDir::new().unwrap();
        let zult = Candidates::new(dir.path().join("nope"), NameFilter::new("pcap").unwrap());
        assert!(matches!(zult, Err(Error::Scan { .. })));
    }

    #[test]
    fn test_collector() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("good.pcap");
        fs::write(&good, capture(9)).unwrap();
        let bad = dir.path().join("bad.pcap");
        fs::write(&bad, [0xffu8; 64]).unwrap();

        let mut collector = Collector::new(&Config::default());
        assert!(collector
            .add(Candidate {
                path: good.clone(),
                size: 44
            })
            .unwrap());
        assert!(!collector
            .add(Candidate {
                path: bad,
                size: 64
            })
            .unwrap());
        assert_eq!(collector.skipped(), 1);

        let catalog = collector.finish();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.entries()[0].path, good);
        assert_eq!(catalog.entries()[0].key, 9_000_000);
    }
}
