use anyhow::{Context, Result};
use pcapmerge::{inspect, sort_key, FileHeader, Magic, RecordHeader, Time, TimestampMode};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize)]
struct Info {
    resolution: Magic,
    file_header: FileHeader,
    first_record: RecordHeader,
    key: u64,
    first_packet: String,
}

pub fn info<P: AsRef<Path>>(input: P) -> Result<()> {
    let input = input.as_ref();
    let (file_header, first_record) =
        inspect(input).with_context(|| format!("reading {input:?}"))?;
    let resolution = file_header.magic()?;
    // merge order uses the literal key; the displayed time is always the true packet time
    let key = sort_key(resolution, &first_record, TimestampMode::Literal);
    let time = sort_key(resolution, &first_record, TimestampMode::Normalized);

    let info = Info {
        resolution,
        first_packet: Time::from_key(time).format_utc(Time::DEFAULT_FORMAT)?,
        key,
        file_header,
        first_record,
    };

    print!("{}", serde_json::to_string_pretty(&info)?);

    Ok(())
}
