//! The inclusive time range activity is filtered against.

use crate::Result;
use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use core::fmt::{Display, Formatter};
use ohno::{IntoAppError, bail};

/// An inclusive `[after, before]` range of UTC timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Window {
    after: DateTime<Utc>,
    before: DateTime<Utc>,
}

impl Window {
    /// Create a window from explicit bounds.
    ///
    /// # Errors
    ///
    /// Returns an error if `after` is later than `before`.
    pub fn new(after: DateTime<Utc>, before: DateTime<Utc>) -> Result<Self> {
        if after > before {
            bail!("window start {after} is after window end {before}");
        }

        Ok(Self { after, before })
    }

    /// Create a window covering whole UTC days, from `start` at `00:00:00.000000`
    /// through `end` at `23:59:59.999999`.
    ///
    /// # Errors
    ///
    /// Returns an error if `start` is later than `end`.
    pub fn from_dates(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        let end_of_day = NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999).into_app_err("computing end of day")?;
        Self::new(start.and_time(NaiveTime::MIN).and_utc(), end.and_time(end_of_day).and_utc())
    }

    #[must_use]
    pub const fn after(&self) -> DateTime<Utc> {
        self.after
    }

    #[must_use]
    pub const fn before(&self) -> DateTime<Utc> {
        self.before
    }

    /// Returns `true` if `ts` lies within the window, bounds included.
    #[must_use]
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.after <= ts && ts <= self.before
    }

    /// Lower bound formatted for GitLab query parameters.
    #[must_use]
    pub fn after_param(&self) -> String {
        self.after.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    /// Upper bound formatted for GitLab query parameters.
    #[must_use]
    pub fn before_param(&self) -> String {
        self.before.to_rfc3339_opts(SecondsFormat::Micros, true)
    }
}

impl Display for Window {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} to {}", self.after.date_naive(), self.before.date_naive())
    }
}
