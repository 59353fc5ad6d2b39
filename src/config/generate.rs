pub fn generate_starter_config() -> String {
    r#"# =============================================================================
# POWERBAND CONFIGURATION
# =============================================================================
# Monthly power band distribution: for every month, how much time a power
# series spent in each tenth of its observed maximum.
#
# Config file locations (in order of precedence):
#   1. Path specified via --config argument
#   2. ~/.config/powerband/config.yml
#   3. /etc/powerband/config.yml
#
# Values may reference environment variables with $env{NAME}.

# =============================================================================
# SERIES
# =============================================================================
# The power series to analyze, as registered in the archive.

series:
  id: house_power

# =============================================================================
# ARCHIVE
# =============================================================================
# DuckDB file holding the logged samples and hourly aggregates.

archive:
  path: ~/.local/share/powerband/archive.duckdb

# =============================================================================
# ANALYSIS
# =============================================================================

analysis:
  # Number of months to analyze, ending with the current month
  months: 60
  # Offset used for month and day boundaries (+HH:MM or -HH:MM)
  utc_offset: "+00:00"

# Verbose logging
debug: false
"#
    .to_string()
}
