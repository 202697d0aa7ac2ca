//! Configuration Module
//!
//! Loads the demo process configuration from an optional properties file and
//! environment variables, and resolves it into the settings the cache and
//! workload are built with.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::CacheSettings;
use crate::tasks::WorkloadSettings;

/// File looked up in the home directory when `RESUME_CACHE_PROPERTIES` is unset
pub const PROPERTIES_FILE_NAME: &str = "resume_cache.properties";

/// Process configuration parameters.
///
/// All values can be configured via environment variables or a properties
/// file, with sensible defaults. Durations are in seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Period between workload runs
    pub interval: u64,
    /// Delay before the first cache sweep, and before the first sweep after a resume
    pub initial_cache_clean_delay: u64,
    /// Entries not accessed for this long expire
    pub cache_timeout: u64,
    /// Period between cache sweeps
    pub sweep_interval: u64,
    /// HTTP control server port
    pub server_port: u16,
    /// Simulate a checkpoint after this many workload runs
    pub checkpoint_after_runs: Option<u64>,
    /// How long a simulated checkpoint keeps the process paused
    pub checkpoint_pause: u64,
}

impl Config {
    // == Load ==
    /// Loads the properties file if one exists, then applies environment
    /// variable overrides.
    ///
    /// The file is `$RESUME_CACHE_PROPERTIES`, or `resume_cache.properties`
    /// in the home directory.
    pub fn load() -> Self {
        let properties = properties_path()
            .and_then(|path| fs::read_to_string(path).ok())
            .map(|text| parse_properties(&text))
            .unwrap_or_default();
        Self::from_sources(&properties, |key| env::var(key).ok())
    }

    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `INTERVAL` - Workload period (default: 5)
    /// - `INITIAL_CACHE_CLEAN_DELAY` - First sweep delay (default: 50)
    /// - `CACHE_TIMEOUT` - Entry timeout (default: 12)
    /// - `SWEEP_INTERVAL` - Sweep period (default: 5)
    /// - `SERVER_PORT` - HTTP control port (default: 3000)
    /// - `CHECKPOINT_AFTER_RUNS` - Simulated checkpoint trigger (default: unset)
    /// - `CHECKPOINT_PAUSE` - Simulated checkpoint length (default: 30)
    pub fn from_env() -> Self {
        Self::from_sources(&HashMap::new(), |key| env::var(key).ok())
    }

    /// Creates a new Config from `key=value` properties text alone.
    pub fn from_properties(text: &str) -> Self {
        Self::from_sources(&parse_properties(text), |_| None)
    }

    /// Environment lookups take precedence over properties. Values that do
    /// not parse fall back to the default.
    fn from_sources<F>(properties: &HashMap<String, String>, env_lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |env_key: &str, property: &str| {
            env_lookup(env_key).or_else(|| properties.get(property).cloned())
        };
        let defaults = Self::default();

        Self {
            interval: parse_or(read("INTERVAL", "interval"), defaults.interval),
            initial_cache_clean_delay: parse_or(
                read("INITIAL_CACHE_CLEAN_DELAY", "initial_cache_clean_delay"),
                defaults.initial_cache_clean_delay,
            ),
            cache_timeout: parse_or(
                read("CACHE_TIMEOUT", "cache_timeout"),
                defaults.cache_timeout,
            ),
            sweep_interval: parse_or(
                read("SWEEP_INTERVAL", "sweep_interval"),
                defaults.sweep_interval,
            ),
            server_port: parse_or(read("SERVER_PORT", "server_port"), defaults.server_port),
            checkpoint_after_runs: read("CHECKPOINT_AFTER_RUNS", "checkpoint_after_runs")
                .and_then(|v| v.trim().parse().ok()),
            checkpoint_pause: parse_or(
                read("CHECKPOINT_PAUSE", "checkpoint_pause"),
                defaults.checkpoint_pause,
            ),
        }
    }

    /// Timing parameters for the cache. Validated when the cache is built.
    pub fn cache_settings(&self) -> CacheSettings {
        CacheSettings::new(
            Duration::from_secs(self.initial_cache_clean_delay),
            Duration::from_secs(self.cache_timeout),
        )
        .with_sweep_interval(Duration::from_secs(self.sweep_interval))
    }

    pub fn workload_settings(&self) -> WorkloadSettings {
        WorkloadSettings {
            interval: Duration::from_secs(self.interval),
            ..WorkloadSettings::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval: 5,
            initial_cache_clean_delay: 50,
            cache_timeout: 12,
            sweep_interval: 5,
            server_port: 3000,
            checkpoint_after_runs: None,
            checkpoint_pause: 30,
        }
    }
}

fn properties_path() -> Option<PathBuf> {
    if let Ok(path) = env::var("RESUME_CACHE_PROPERTIES") {
        return Some(PathBuf::from(path));
    }
    env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(PROPERTIES_FILE_NAME))
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Parses `key=value` lines. Blank lines and lines starting with `#` or `!`
/// are skipped; `:` is accepted as a separator too.
pub fn parse_properties(text: &str) -> HashMap<String, String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
        .filter_map(|line| {
            let (key, value) = line.split_once(['=', ':'])?;
            Some((key.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.interval, 5);
        assert_eq!(config.initial_cache_clean_delay, 50);
        assert_eq!(config.cache_timeout, 12);
        assert_eq!(config.sweep_interval, 5);
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.checkpoint_after_runs, None);
        assert_eq!(config.checkpoint_pause, 30);
    }

    #[test]
    fn test_config_no_sources_gives_defaults() {
        let config = Config::from_sources(&HashMap::new(), |_| None);
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_parse_properties() {
        let props = parse_properties(
            "# timing\n\
             interval = 2\n\
             ! legacy comment\n\
             \n\
             cache_timeout:20\n\
             not a pair\n",
        );
        assert_eq!(props.len(), 2);
        assert_eq!(props["interval"], "2");
        assert_eq!(props["cache_timeout"], "20");
    }

    #[test]
    fn test_config_from_properties() {
        let config = Config::from_properties(
            "interval=2\ninitial_cache_clean_delay=10\ncache_timeout=6\ncheckpoint_after_runs=10\n",
        );
        assert_eq!(config.interval, 2);
        assert_eq!(config.initial_cache_clean_delay, 10);
        assert_eq!(config.cache_timeout, 6);
        assert_eq!(config.checkpoint_after_runs, Some(10));
        assert_eq!(config.sweep_interval, 5);
    }

    #[test]
    fn test_env_overrides_properties() {
        let props = parse_properties("cache_timeout=20\ninterval=2");
        let config = Config::from_sources(&props, |key| match key {
            "CACHE_TIMEOUT" => Some("30".to_string()),
            _ => None,
        });
        assert_eq!(config.cache_timeout, 30);
        assert_eq!(config.interval, 2);
    }

    #[test]
    fn test_unparseable_values_fall_back() {
        let config = Config::from_properties("cache_timeout=soon\nserver_port=99999");
        assert_eq!(config.cache_timeout, 12);
        assert_eq!(config.server_port, 3000);
    }

    #[test]
    fn test_cache_settings() {
        let settings = Config::default().cache_settings();
        assert_eq!(settings.initial_sweep_delay, Duration::from_secs(50));
        assert_eq!(settings.timeout, Duration::from_secs(12));
        assert_eq!(settings.sweep_interval, Duration::from_secs(5));
        assert!(settings.validate().is_ok());

        let zero = Config::from_properties("cache_timeout=0").cache_settings();
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_workload_settings() {
        let settings = Config::from_properties("interval=7").workload_settings();
        assert_eq!(settings.interval, Duration::from_secs(7));
        assert_eq!(settings.samples, 100_000);
    }
}
