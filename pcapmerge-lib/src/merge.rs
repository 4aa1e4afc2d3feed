use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};

use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    catalog::Catalog,
    collector::{Candidates, Collector, NameFilter},
    config::Config,
    error::{Error, Result},
    writer::write_merged,
};

/// States of a merge run. Runs only move forward through these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RunState {
    Scanning,
    Sorting,
    Copying,
    Committed,
    Aborted,
}

impl RunState {
    fn can_become(self, next: RunState) -> bool {
        use RunState::*;
        matches!(
            (self, next),
            (Scanning, Sorting)
                | (Sorting, Copying)
                | (Copying, Committed)
                | (Scanning, Aborted)
                | (Copying, Aborted)
        )
    }
}

#[derive(Debug)]
struct Run {
    state: RunState,
}

impl Run {
    fn new() -> Self {
        Run {
            state: RunState::Scanning,
        }
    }

    fn transition(&mut self, next: RunState) {
        debug_assert!(
            self.state.can_become(next),
            "invalid run transition {:?} -> {next:?}",
            self.state
        );
        debug!("{:?} -> {next:?}", self.state);
        self.state = next;
    }
}

/// Output file that is removed when dropped unless committed.
#[derive(Debug)]
pub struct PendingOutput {
    path: PathBuf,
    file: File,
    committed: bool,
}

impl PendingOutput {
    /// Create, or truncate, the output at `path`.
    ///
    /// # Errors
    /// [Error::CreateSink] if the file cannot be opened for writing.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|source| Error::CreateSink {
            path: path.clone(),
            source,
        })?;
        Ok(PendingOutput {
            path,
            file,
            committed: false,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file(&mut self) -> &mut File {
        &mut self.file
    }

    /// Close the output and keep it.
    pub fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for PendingOutput {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        debug!(path = ?self.path, "removing incomplete output");
        if let Err(err) = fs::remove_file(&self.path) {
            warn!(path = ?self.path, "failed to remove incomplete output: {err}");
        }
    }
}

/// Result of a successful merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    /// Number of files merged.
    pub files: usize,
    /// Number of candidates that were not usable captures.
    pub skipped: usize,
    /// Size of the output.
    pub bytes: u64,
    /// Sort key of the first merged file.
    pub first_key: u64,
    /// Sort key of the last merged file.
    pub last_key: u64,
}

fn scan(dir: &Path, config: &Config, exclude: Option<&Path>) -> Result<(Catalog, usize)> {
    let filter = NameFilter::new(&config.extension)?;
    let mut candidates = Candidates::new(dir, filter)?;
    if let Some(exclude) = exclude {
        candidates = candidates.excluding(exclude);
    }

    let mut collector = Collector::new(config);
    for candidate in candidates {
        collector.add(candidate)?;
    }
    let skipped = collector.skipped();
    let catalog = collector.finish();
    debug!(?dir, accepted = catalog.len(), skipped, "scanned");

    Ok((catalog, skipped))
}

fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        return Err(Error::NotADirectory(dir.to_path_buf()));
    }
    Ok(())
}

/// Catalog the captures in `dir`, sorted by first packet time, without merging them.
///
/// # Errors
/// If `dir` is not a readable directory or the catalog cannot grow.
pub fn catalog_directory<P: AsRef<Path>>(dir: P, config: &Config) -> Result<Catalog> {
    let dir = dir.as_ref();
    ensure_dir(dir)?;
    let (mut catalog, _) = scan(dir, config, None)?;
    catalog.sort();
    Ok(catalog)
}

/// Merge all captures directly within `dir` into a single capture at `dest` ordered by the
/// time of the first packet in each capture.
///
/// The output header is that of the earliest capture. Inputs are assumed to share link-layer
/// type and snapshot length.
///
/// # Errors
/// On any error the output is removed. See [Error::phase] for where the merge failed.
pub fn merge_directory<P: AsRef<Path>, Q: AsRef<Path>>(
    dir: P,
    dest: Q,
    config: &Config,
) -> Result<MergeSummary> {
    let dir = dir.as_ref();
    let dest = dest.as_ref();
    ensure_dir(dir)?;

    let output = PendingOutput::create(dest)?;
    let mut run = Run::new();

    let (catalog, skipped) = match scan(dir, config, Some(dest)) {
        Ok(zult) => zult,
        Err(err) => {
            run.transition(RunState::Aborted);
            return Err(err);
        }
    };

    let mut summary = finish(run, catalog, output)?;
    summary.skipped = skipped;
    Ok(summary)
}

/// Merge the files of an already populated `catalog` into a single capture at `dest`.
///
/// # Errors
/// On any error the output is removed. See [Error::phase] for where the merge failed.
pub fn merge_catalog<P: AsRef<Path>>(catalog: Catalog, dest: P) -> Result<MergeSummary> {
    let output = PendingOutput::create(dest)?;
    finish(Run::new(), catalog, output)
}

// Sort and copy a scanned catalog, committing the output only if every file was copied.
fn finish(mut run: Run, mut catalog: Catalog, mut output: PendingOutput) -> Result<MergeSummary> {
    if catalog.is_empty() {
        run.transition(RunState::Aborted);
        return Err(Error::NoInputs);
    }

    run.transition(RunState::Sorting);
    catalog.sort();

    run.transition(RunState::Copying);
    let dest = output.path().to_path_buf();
    let bytes = match write_merged(catalog.entries(), output.file(), &dest) {
        Ok(bytes) => bytes,
        Err(err) => {
            run.transition(RunState::Aborted);
            return Err(err);
        }
    };

    output.commit();
    run.transition(RunState::Committed);

    let entries = catalog.entries();
    Ok(MergeSummary {
        files: entries.len(),
        skipped: 0,
        bytes,
        first_key: entries.first().map_or(0, |e| e.key),
        last_key: entries.last().map_or(0, |e| e.key),
    })
}
