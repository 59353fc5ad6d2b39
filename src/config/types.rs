use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::analysis::{AnalysisRequest, MAX_MONTHS};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub series: SeriesConfig,
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesConfig {
    /// Identifier of the power series in the archive
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Number of months to analyze, ending with the current one
    #[serde(default = "default_months")]
    pub months: u32,
    /// Offset that month and day boundaries are computed in
    #[serde(default = "default_utc_offset", with = "offset_format")]
    pub utc_offset: FixedOffset,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            months: default_months(),
            utc_offset: default_utc_offset(),
        }
    }
}

fn default_months() -> u32 {
    // Five years
    60
}

fn default_utc_offset() -> FixedOffset {
    Utc.fix()
}

impl Config {
    /// The analysis parameters this configuration describes.
    pub fn analysis_request(&self) -> AnalysisRequest {
        AnalysisRequest {
            series_id: self.series.id.clone(),
            month_count: self.analysis.months.clamp(1, MAX_MONTHS),
            utc_offset: self.analysis.utc_offset,
        }
    }

    /// Default tracing filter directive.
    pub fn log_directive(&self) -> &'static str {
        if self.debug {
            "powerband=debug"
        } else {
            "powerband=info"
        }
    }
}

/// Parse `+HH:MM` / `-HH:MM` (or `Z`) into a fixed offset.
pub fn parse_utc_offset(s: &str) -> Result<FixedOffset, String> {
    let s = s.trim();
    if s == "Z" || s == "z" {
        return Ok(default_utc_offset());
    }

    let (sign, rest) = match s.chars().next() {
        Some('+') => (1, &s[1..]),
        Some('-') => (-1, &s[1..]),
        _ => return Err(format!("invalid UTC offset '{}': expected +HH:MM or -HH:MM", s)),
    };

    let (hours, minutes) = rest
        .split_once(':')
        .ok_or_else(|| format!("invalid UTC offset '{}': expected +HH:MM or -HH:MM", s))?;

    let hours: i32 = hours
        .parse()
        .map_err(|_| format!("invalid hours in UTC offset '{}'", s))?;
    let minutes: i32 = minutes
        .parse()
        .map_err(|_| format!("invalid minutes in UTC offset '{}'", s))?;
    if hours < 0 || !(0..60).contains(&minutes) {
        return Err(format!("UTC offset '{}' out of range", s));
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .ok_or_else(|| format!("UTC offset '{}' out of range", s))
}

pub fn format_utc_offset(offset: &FixedOffset) -> String {
    let secs = offset.local_minus_utc();
    let sign = if secs < 0 { '-' } else { '+' };
    let secs = secs.abs();
    format!("{}{:02}:{:02}", sign, secs / 3600, (secs % 3600) / 60)
}

// Custom serde module for UTC offsets
mod offset_format {
    use chrono::FixedOffset;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(offset: &FixedOffset, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_utc_offset(offset))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<FixedOffset, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        super::parse_utc_offset(&s).map_err(serde::de::Error::custom)
    }
}
