use facefind_core::{LinkTemplate, NormalizeOptions};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI configuration: optional TOML file, then `FACEFIND_*` environment overrides.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Normalization limits.
    #[serde(flatten)]
    pub normalize: NormalizeOptions,
    /// Directory receiving normalized scratch copies.
    pub scratch_dir: PathBuf,
    /// Application-relative URL of the files view used for deep links.
    pub link_base: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            normalize: NormalizeOptions::default(),
            scratch_dir: std::env::temp_dir(),
            link_base: LinkTemplate::DEFAULT_BASE.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

impl Config {
    /// Load from `FACEFIND_CONFIG` (if set) and apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let base = match std::env::var("FACEFIND_CONFIG") {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        Ok(base.with_env_overrides())
    }

    /// Parse a TOML file; missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    fn with_env_overrides(mut self) -> Self {
        self.normalize.max_area = env_u64("FACEFIND_MAX_AREA", self.normalize.max_area);
        self.normalize.min_side = env_u32("FACEFIND_MIN_SIDE", self.normalize.min_side);
        if let Ok(encoding) = std::env::var("FACEFIND_ENCODING") {
            self.normalize.encoding = encoding;
        }
        if let Ok(dir) = std::env::var("FACEFIND_SCRATCH_DIR") {
            self.scratch_dir = PathBuf::from(dir);
        }
        if let Ok(base) = std::env::var("FACEFIND_LINK_BASE") {
            self.link_base = base;
        }
        self
    }

    pub fn links(&self) -> LinkTemplate {
        LinkTemplate::new(&self.link_base)
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.normalize.max_area, 1920 * 1080);
        assert_eq!(config.normalize.min_side, 512);
        assert_eq!(config.link_base, "/apps/files/");
    }

    #[test]
    fn test_from_file_partial() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("facefind.toml");
        std::fs::write(
            &path,
            "max_area = 640000\nencoding = \"image/png\"\nscratch_dir = \"/var/tmp/facefind\"\n",
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.normalize.max_area, 640_000);
        assert_eq!(config.normalize.encoding, "image/png");
        assert_eq!(config.normalize.min_side, 512);
        assert_eq!(config.scratch_dir, PathBuf::from("/var/tmp/facefind"));
        assert_eq!(config.link_base, "/apps/files/");
    }

    #[test]
    fn test_from_file_rejects_bad_types() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("facefind.toml");
        std::fs::write(&path, "max_area = \"huge\"\n").unwrap();
        assert!(matches!(
            Config::from_file(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Config::from_file(Path::new("/nonexistent/facefind.toml")),
            Err(ConfigError::Read { .. })
        ));
    }
}
