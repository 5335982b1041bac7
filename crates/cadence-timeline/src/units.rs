//! Time literals.
//!
//! Times are accepted as plain numbers (milliseconds) or strings such as
//! `"250"`, `"250ms"`, `"1.5s"`. A leading `+=` or `-=` makes the value
//! relative to a base time (used by `Timeline::seek`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TimelineError};
use crate::types::Millis;

/// How a parsed time relates to its base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeStep {
    #[default]
    Absolute,
    Forward,
    Backward,
}

/// A parsed time literal, normalized to milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeValue {
    pub ms: Millis,
    pub step: TimeStep,
}

impl TimeValue {
    /// Resolve against `base`. Absolute values ignore it.
    pub fn resolve(&self, base: Millis) -> Millis {
        match self.step {
            TimeStep::Absolute => self.ms,
            TimeStep::Forward => base + self.ms,
            TimeStep::Backward => base - self.ms,
        }
    }
}

impl FromStr for TimeValue {
    type Err = TimelineError;

    fn from_str(s: &str) -> Result<Self> {
        let malformed = || TimelineError::MalformedTime(s.to_string());
        let trimmed = s.trim();

        let (step, rest) = if let Some(rest) = trimmed.strip_prefix("+=") {
            (TimeStep::Forward, rest)
        } else if let Some(rest) = trimmed.strip_prefix("-=") {
            (TimeStep::Backward, rest)
        } else if let Some(rest) = trimmed.strip_prefix('=') {
            (TimeStep::Absolute, rest)
        } else {
            (TimeStep::Absolute, trimmed)
        };
        let rest = rest.trim();

        // "ms" must be checked before "s"
        let (number, scale) = if let Some(n) = rest.strip_suffix("ms") {
            (n, 1.0)
        } else if let Some(n) = rest.strip_suffix('s') {
            (n, 1000.0)
        } else {
            (rest, 1.0)
        };

        let value: f64 = number.trim().parse().map_err(|_| malformed())?;
        if !value.is_finite() {
            return Err(malformed());
        }

        Ok(Self {
            ms: value * scale,
            step,
        })
    }
}

/// A time as supplied by callers: a number of milliseconds or a literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeInput {
    Millis(Millis),
    Text(String),
}

impl TimeInput {
    /// Parse into a [`TimeValue`].
    pub fn parse(&self) -> Result<TimeValue> {
        match self {
            Self::Millis(ms) if ms.is_finite() => Ok(TimeValue {
                ms: *ms,
                step: TimeStep::Absolute,
            }),
            Self::Millis(ms) => Err(TimelineError::MalformedTime(ms.to_string())),
            Self::Text(text) => text.parse(),
        }
    }

    /// Milliseconds, resolving relative literals against zero.
    pub fn to_ms(&self) -> Result<Millis> {
        Ok(self.parse()?.resolve(0.0))
    }
}

impl fmt::Display for TimeInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Millis(ms) => write!(f, "{}ms", ms),
            Self::Text(text) => f.write_str(text),
        }
    }
}

impl From<f64> for TimeInput {
    fn from(ms: f64) -> Self {
        Self::Millis(ms)
    }
}

impl From<u32> for TimeInput {
    fn from(ms: u32) -> Self {
        Self::Millis(ms as f64)
    }
}

impl From<&str> for TimeInput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for TimeInput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}
