use anyhow::{Context, Result};
use pcapmerge::{config::Config, merge_directory, Time};
use std::path::{Path, PathBuf};
use tracing::info;

pub fn get_config(fpath: Option<PathBuf>) -> Result<Config> {
    match fpath {
        Some(fpath) => {
            Config::with_path(&fpath).with_context(|| format!("Invalid config {fpath:?}"))
        }
        None => Config::default_config().context("Invalid default config"),
    }
}

pub fn merge(config: Option<PathBuf>, input: &Path, output: &Path) -> Result<()> {
    let config = get_config(config)?;

    info!(?input, ?output, "merging");
    let summary = merge_directory(input, output, &config)
        .with_context(|| format!("merging {input:?} to {output:?}"))?;

    info!(
        "merged {} files ({} skipped) into {} bytes; first file starts {}, last file starts {}",
        summary.files,
        summary.skipped,
        summary.bytes,
        Time::from_key(summary.first_key).format_utc(Time::DEFAULT_FORMAT)?,
        Time::from_key(summary.last_key).format_utc(Time::DEFAULT_FORMAT)?,
    );

    Ok(())
}
