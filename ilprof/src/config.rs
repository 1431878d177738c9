use anyhow::{Context, Result};
use std::{fs::File, io::Read, path::{Path, PathBuf}};

use serde::Deserialize;

pub const CONFIG_FILE: &str = "Ilprof.toml";

#[derive(Deserialize, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ProfilerConfig {
    pub report: Report,
    pub collector: Collector,
}

#[derive(Deserialize, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct Report {
    /// call-tree levels rendered below the root method
    pub max_recursion_depth: usize,
    pub output_dir: PathBuf,
}

impl Default for Report {
    fn default() -> Self {
        Self {
            max_recursion_depth: 5,
            output_dir: PathBuf::from("ilprof-results"),
        }
    }
}

#[derive(Deserialize, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct Collector {
    /// sample events buffered between the trace stream and the consumer
    pub channel_capacity: usize,
}

impl Default for Collector {
    fn default() -> Self {
        Self { channel_capacity: 2048 }
    }
}

impl ProfilerConfig {
    /// Loads `Ilprof.toml` from the current directory, or defaults when there is none
    pub fn new() -> Result<Self> {
        if Path::new(CONFIG_FILE).exists() {
            Self::from_path(CONFIG_FILE)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut config_file = File::open(path).with_context(|| format!("{} not found", path.display()))?;
        let mut contents = String::new();
        config_file
            .read_to_string(&mut contents)
            .with_context(|| format!("something went wrong reading {}", path.display()))?;
        let config = Self::parse(&contents).with_context(|| format!("invalid config {}", path.display()))?;
        tracing::debug!("loaded config from {}: {config:?}", path.display());
        Ok(config)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: ProfilerConfig = toml::from_str(contents)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_for_empty_file() {
        let config = ProfilerConfig::parse("").unwrap();
        assert_eq!(config, ProfilerConfig::default());
        assert_eq!(config.report.max_recursion_depth, 5);
        assert_eq!(config.collector.channel_capacity, 2048);
    }

    #[test]
    fn test_partial_override() {
        let config = ProfilerConfig::parse(
            "[report]\n\
             max_recursion_depth = 2\n",
        )
        .unwrap();
        assert_eq!(config.report.max_recursion_depth, 2);
        assert_eq!(config.report.output_dir, PathBuf::from("ilprof-results"));
        assert_eq!(config.collector.channel_capacity, 2048);
    }

    #[test]
    fn test_full_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            "[report]\nmax_recursion_depth = 8\noutput_dir = \"out\"\n\n[collector]\nchannel_capacity = 64\n",
        )
        .unwrap();

        let config = ProfilerConfig::from_path(&path).unwrap();
        assert_eq!(config.report.max_recursion_depth, 8);
        assert_eq!(config.report.output_dir, PathBuf::from("out"));
        assert_eq!(config.collector.channel_capacity, 64);
    }

    #[test]
    fn test_invalid_type() {
        assert!(ProfilerConfig::parse("[report]\nmax_recursion_depth = \"deep\"\n").is_err());
    }

    #[test]
    fn test_missing_file() {
        assert!(ProfilerConfig::from_path("/nonexistent/Ilprof.toml").is_err());
    }
}
