use std::{fs::File, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    catalog::Catalog,
    error::{Error, Result},
    timestamp::TimestampMode,
};

// Merge configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// File name extension of candidate capture files, without the dot.
    pub extension: String,
    /// Catalog entries allocated before the first file is added.
    pub initial_capacity: usize,
    pub timestamp_mode: TimestampMode,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            extension: "pcap".to_string(),
            initial_capacity: Catalog::DEFAULT_CAPACITY,
            timestamp_mode: TimestampMode::default(),
        }
    }
}

impl Config {
    const EXTENSION_LEN: usize = 4;

    fn validate(self) -> Result<Self> {
        if self.extension.len() != Self::EXTENSION_LEN
            || !self.extension.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(Error::ConfigInvalid(format!(
                "extension must be {} ascii alphanumeric characters, got {:?}",
                Self::EXTENSION_LEN,
                self.extension
            )));
        }
        if self.initial_capacity == 0 {
            return Err(Error::ConfigInvalid(
                "initial_capacity must be greater than 0".to_string(),
            ));
        }

        Ok(self)
    }

    pub fn with_path<P: AsRef<Path>>(fpath: P) -> Result<Config> {
        let fpath = fpath.as_ref();
        let fin = File::open(fpath).map_err(|source| Error::ConfigRead {
            path: fpath.to_path_buf(),
            source,
        })?;
        let config: Config = serde_yaml::from_reader(fin)?;

        config.validate()
    }

    pub fn with_data(dat: &str) -> Result<Config> {
        let config: Config = serde_yaml::from_str(dat)?;
        config.validate()
    }

    /// The embedded default configuration.
    pub fn default_config() -> Result<Config> {
        Self::with_data(DEFAULT_CONFIG)
    }
}

static DEFAULT_CONFIG: &str = include_str!(concat!(env!("OUT_DIR"), "/default.config.yaml"));

/// Content of the embedded default configuration file.
#[must_use]
pub fn get_default_content() -> &'static str {
    DEFAULT_CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Phase;

    #[test]
    fn test_default_content_matches_default() {
        assert_eq!(Config::default_config().unwrap(), Config::default());
    }

    #[test]
    fn test_partial_config() {
        let config = Config::with_data("timestamp_mode: normalized\n").unwrap();
        assert_eq!(config.timestamp_mode, TimestampMode::Normalized);
        assert_eq!(config.extension, "pcap");
        assert_eq!(config.initial_capacity, 1024);
    }

    #[test]
    fn test_invalid_extension() {
        for ext in ["cap", "pcapng", "p.ap", ""] {
            let zult = Config::with_data(&format!("extension: \"{ext}\"\n"));
            assert!(
                matches!(zult, Err(Error::ConfigInvalid(_))),
                "{ext:?} should be invalid"
            );
        }
    }

    #[test]
    fn test_invalid_capacity() {
        let zult = Config::with_data("initial_capacity: 0\n");
        assert!(matches!(zult, Err(Error::ConfigInvalid(_))));
    }

    #[test]
    fn test_missing_file() {
        let zult = Config::with_path("/nonexistent/pcapmerge.yaml");
        match zult {
            Err(err @ Error::ConfigRead { .. }) => assert_eq!(err.phase(), Phase::Config),
            other => panic!("expected config read error, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_field() {
        let zult = Config::with_data("extention: pcap\n");
        assert!(matches!(zult, Err(Error::ConfigLoad { .. })));
    }

    #[test]
    fn test_unknown_timestamp_mode() {
        let zult = Config::with_data("timestamp_mode: fixed\n");
        assert!(matches!(zult, Err(Error::ConfigLoad { .. })));
    }
}
