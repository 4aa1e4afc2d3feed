use anyhow::{Context, Result};
use pcapmerge::{catalog_directory, Time};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::command_merge::get_config;

#[derive(Debug, Serialize)]
struct Item {
    path: PathBuf,
    size: u64,
    key: u64,
    first_packet: String,
}

pub fn list(config: Option<PathBuf>, input: &Path) -> Result<()> {
    let config = get_config(config)?;
    let catalog =
        catalog_directory(input, &config).with_context(|| format!("cataloging {input:?}"))?;

    let mut items = Vec::with_capacity(catalog.len());
    for entry in &catalog {
        items.push(Item {
            path: entry.path.clone(),
            size: entry.size,
            key: entry.key,
            first_packet: Time::from_key(entry.key).format_utc(Time::DEFAULT_FORMAT)?,
        });
    }

    println!("{}", serde_json::to_string_pretty(&items)?);

    Ok(())
}
