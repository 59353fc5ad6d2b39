use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::parse::ConfigError;
use super::types::{parse_utc_offset, Config};
use crate::analysis::MAX_MONTHS;

/// A user-editable configuration field, named by its YAML key path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigField {
    SeriesId,
    ArchivePath,
    Months,
    UtcOffset,
    Debug,
}

impl ConfigField {
    pub const ALL: [ConfigField; 5] = [
        ConfigField::SeriesId,
        ConfigField::ArchivePath,
        ConfigField::Months,
        ConfigField::UtcOffset,
        ConfigField::Debug,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            ConfigField::SeriesId => "series.id",
            ConfigField::ArchivePath => "archive.path",
            ConfigField::Months => "analysis.months",
            ConfigField::UtcOffset => "analysis.utc_offset",
            ConfigField::Debug => "debug",
        }
    }

    /// Whether a change to this field invalidates a previously computed result.
    pub fn triggers_recompute(&self) -> bool {
        !matches!(self, ConfigField::Debug)
    }
}

impl fmt::Display for ConfigField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ConfigField {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConfigField::ALL
            .into_iter()
            .find(|field| field.key() == s.trim())
            .ok_or_else(|| ConfigError::UnknownField(s.to_string()))
    }
}

/// Return a copy of `config` with `field` set from its textual form.
///
/// Months are clamped into `1..=MAX_MONTHS` rather than rejected.
pub fn apply_update(config: &Config, field: ConfigField, raw: &str) -> Result<Config, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidValue {
        field: field.key().to_string(),
        reason,
    };

    let raw = raw.trim();
    let mut updated = config.clone();

    match field {
        ConfigField::SeriesId => {
            if raw.is_empty() {
                return Err(invalid("series id cannot be empty".to_string()));
            }
            updated.series.id = raw.to_string();
        }
        ConfigField::ArchivePath => {
            if raw.is_empty() {
                return Err(invalid("archive path cannot be empty".to_string()));
            }
            updated.archive.path = super::expand_tilde(&PathBuf::from(raw));
        }
        ConfigField::Months => {
            let months: i64 = raw
                .parse()
                .map_err(|_| invalid(format!("'{}' is not a whole number", raw)))?;
            updated.analysis.months = months.clamp(1, MAX_MONTHS as i64) as u32;
        }
        ConfigField::UtcOffset => {
            updated.analysis.utc_offset = parse_utc_offset(raw).map_err(invalid)?;
        }
        ConfigField::Debug => {
            updated.debug = match raw.to_ascii_lowercase().as_str() {
                "true" | "on" | "yes" | "1" => true,
                "false" | "off" | "no" | "0" => false,
                other => return Err(invalid(format!("'{}' is not a boolean", other))),
            };
        }
    }

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    fn base() -> Config {
        parse_config(
            r#"
series:
  id: house_power
archive:
  path: /tmp/archive.duckdb
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_field_keys_round_trip() {
        for field in ConfigField::ALL {
            assert_eq!(field.key().parse::<ConfigField>().unwrap(), field);
        }
        assert!(matches!(
            "analysis.years".parse::<ConfigField>(),
            Err(ConfigError::UnknownField(_))
        ));
    }

    #[test]
    fn test_update_leaves_original_untouched() {
        let config = base();
        let updated = apply_update(&config, ConfigField::SeriesId, "solar").unwrap();
        assert_eq!(updated.series.id, "solar");
        assert_eq!(config.series.id, "house_power");
    }

    #[test]
    fn test_months_clamped_into_range() {
        let updated = apply_update(&base(), ConfigField::Months, "-4").unwrap();
        assert_eq!(updated.analysis.months, 1);

        let updated = apply_update(&base(), ConfigField::Months, "24").unwrap();
        assert_eq!(updated.analysis.months, 24);

        let updated = apply_update(&base(), ConfigField::Months, "99999999999").unwrap();
        assert_eq!(updated.analysis.months, MAX_MONTHS);

        assert!(apply_update(&base(), ConfigField::Months, "many").is_err());
    }

    #[test]
    fn test_offset_and_debug() {
        let updated = apply_update(&base(), ConfigField::UtcOffset, "+02:00").unwrap();
        assert_eq!(updated.analysis.utc_offset.local_minus_utc(), 7200);

        let updated = apply_update(&base(), ConfigField::Debug, "on").unwrap();
        assert!(updated.debug);
        assert!(apply_update(&base(), ConfigField::Debug, "maybe").is_err());
    }

    #[test]
    fn test_empty_series_rejected() {
        assert!(matches!(
            apply_update(&base(), ConfigField::SeriesId, "  "),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_recompute_set() {
        assert!(ConfigField::SeriesId.triggers_recompute());
        assert!(ConfigField::Months.triggers_recompute());
        assert!(!ConfigField::Debug.triggers_recompute());
    }
}
