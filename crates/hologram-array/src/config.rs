//! Configuration for array handles
//!
//! Settings can be built in code or loaded from a TOML file.
//!
//! # Example Config File
//!
//! ```toml
//! # hologram-array.toml
//!
//! # Device bulk handle operations run on: "serial" or "parallel" (default: serial)
//! device = "parallel"
//!
//! # Values per streaming block (default: 65536)
//! block_size = 1024
//!
//! # Minimum indices per parallel worker (default: 4096)
//! grain_size = 256
//! ```
//!
//! The same keys may also live under an `[array]` section so the file can be
//! shared with other hologram tools; the section wins when both are present.

use crate::constants::{DEFAULT_BLOCK_SIZE, DEFAULT_GRAIN_SIZE};
use crate::device::DeviceAdapterId;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root of a config file, accepting both sectioned and direct layouts
#[derive(Debug, Clone, Default, Deserialize)]
struct RootConfig {
    /// Settings under `[array]`
    #[serde(default)]
    array: Option<ArrayConfig>,

    /// Settings at the root level
    #[serde(flatten)]
    direct: ArrayConfig,
}

/// Array handle configuration
///
/// Threaded explicitly into handle construction; there is no process-wide
/// default device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArrayConfig {
    /// Device bulk handle operations are scheduled on
    pub device: DeviceAdapterId,

    /// Default number of values per streaming block
    pub block_size: usize,

    /// Minimum number of indices per parallel worker
    pub grain_size: usize,
}

impl Default for ArrayConfig {
    fn default() -> Self {
        Self {
            device: DeviceAdapterId::default(),
            block_size: DEFAULT_BLOCK_SIZE,
            grain_size: DEFAULT_GRAIN_SIZE,
        }
    }
}

impl ArrayConfig {
    /// Set the device
    pub fn with_device(mut self, device: DeviceAdapterId) -> Self {
        self.device = device;
        self
    }

    /// Set the default streaming block size
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Set the parallel grain size
    pub fn with_grain_size(mut self, grain_size: usize) -> Self {
        self.grain_size = grain_size;
        self
    }

    /// Load config from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML, or
    /// holds a zero block or grain size.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use hologram_array::ArrayConfig;
    ///
    /// let config = ArrayConfig::load("hologram-array.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        Self::parse(&contents, path.to_path_buf())
    }

    /// Parse config from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Self::parse(contents, PathBuf::from("<string>"))
    }

    fn parse(contents: &str, origin: PathBuf) -> Result<Self, ConfigError> {
        let root: RootConfig = toml::from_str(contents).map_err(|e| ConfigError::ParseError(origin, e))?;
        let config = root.array.unwrap_or(root.direct);
        config.validate()?;

        tracing::debug!(
            device = %config.device,
            block_size = config.block_size,
            grain_size = config.grain_size,
            "array_config_loaded"
        );

        Ok(config)
    }

    /// Check field ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.block_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "block_size",
                reason: "must be greater than zero",
            });
        }
        if self.grain_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "grain_size",
                reason: "must be greater than zero",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ArrayConfig::default();
        assert_eq!(config.device, DeviceAdapterId::Serial);
        assert_eq!(config.block_size, DEFAULT_BLOCK_SIZE);
        assert_eq!(config.grain_size, DEFAULT_GRAIN_SIZE);
    }

    #[test]
    fn test_direct_format() {
        let config = ArrayConfig::from_toml_str("device = \"parallel\"\nblock_size = 128\n").unwrap();
        assert_eq!(config.device, DeviceAdapterId::Parallel);
        assert_eq!(config.block_size, 128);
        assert_eq!(config.grain_size, DEFAULT_GRAIN_SIZE);
    }

    #[test]
    fn test_sectioned_format_wins() {
        let toml = r#"
            block_size = 16

            [array]
            device = "parallel"
            block_size = 32
            grain_size = 8
        "#;
        let config = ArrayConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.device, DeviceAdapterId::Parallel);
        assert_eq!(config.block_size, 32);
        assert_eq!(config.grain_size, 8);
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(ArrayConfig::from_toml_str("").unwrap(), ArrayConfig::default());
    }

    #[test]
    fn test_zero_block_size_rejected() {
        let err = ArrayConfig::from_toml_str("block_size = 0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "block_size", .. }));
    }

    #[test]
    fn test_unknown_device_rejected() {
        let err = ArrayConfig::from_toml_str("device = \"cuda\"").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(..)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[array]\ndevice = \"serial\"\ngrain_size = 64").unwrap();

        let config = ArrayConfig::load(file.path()).unwrap();
        assert_eq!(config.device, DeviceAdapterId::Serial);
        assert_eq!(config.grain_size, 64);
    }

    #[test]
    fn test_load_missing_file() {
        let err = ArrayConfig::load("/nonexistent/hologram-array.toml").unwrap_err();
        assert!(matches!(err, ConfigError::IoError(..)));
    }

    #[test]
    fn test_builder() {
        let config = ArrayConfig::default()
            .with_device(DeviceAdapterId::Parallel)
            .with_block_size(10)
            .with_grain_size(2);
        assert_eq!(config.device, DeviceAdapterId::Parallel);
        assert_eq!(config.block_size, 10);
        assert_eq!(config.grain_size, 2);
        assert!(config.validate().is_ok());
    }
}
