use std::ops::Deref;
use std::str::FromStr;

use hifitime::efmt::{Format, Formatter};
use hifitime::{Duration, Epoch, TimeScale, Unit};

use crate::error::{Error, Result};

/// UTC time of a sort key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Time(Epoch);

impl AsRef<Epoch> for Time {
    fn as_ref(&self) -> &Epoch {
        &self.0
    }
}

impl Deref for Time {
    type Target = Epoch;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Time {
    pub const DEFAULT_FORMAT: &'static str = "%Y-%m-%dT%H:%M:%S.%f";

    /// Create [Time] from a sort key, UTC microseconds since Jan 1, 1970.
    #[must_use]
    pub fn from_key(micros: u64) -> Self {
        let secs = micros / 1_000_000;
        let subsec = micros % 1_000_000;
        let since_unix = Duration::from_seconds(secs as f64) + (subsec as f64) * Unit::Microsecond;
        Time(Epoch::from_unix_duration(since_unix))
    }

    /// Format ourself using the provided format string.
    ///
    /// See [hifitime::efmt::Format].
    ///
    /// # Errors
    /// [Error::TimeFormat] if `fmt` is not a valid format string.
    pub fn format_utc(&self, fmt: &str) -> Result<String> {
        let fmt = Format::from_str(fmt).map_err(|e| Error::TimeFormat(format!("{fmt}: {e:?}")))?;
        let formatter = Formatter::to_time_scale(self.0, fmt, TimeScale::UTC);
        Ok(format!("{formatter}"))
    }
}
