//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::device::finch::{TICKS_PER_CM, TICKS_PER_DEGREE};
use crate::device::ModelKind;
use crate::error::{BridgeError, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub device: DeviceConfig,

    #[serde(default)]
    pub motion: MotionConfig,

    #[serde(default)]
    pub protocol: ProtocolConfig,
}

/// Device identity
#[derive(Debug, Deserialize, Clone)]
pub struct DeviceConfig {
    pub model: ModelKind,

    #[serde(default = "default_name")]
    pub name: String,
}

/// Finch wheel calibration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct MotionConfig {
    #[serde(default = "default_ticks_per_cm")]
    pub ticks_per_cm: f64,

    #[serde(default = "default_ticks_per_degree")]
    pub ticks_per_degree: f64,
}

/// Protocol diagnostics
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct ProtocolConfig {
    #[serde(default)]
    pub trace_frames: bool,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            ticks_per_cm: default_ticks_per_cm(),
            ticks_per_degree: default_ticks_per_degree(),
        }
    }
}

// Default value functions
fn default_name() -> String { "robot".to_string() }
fn default_ticks_per_cm() -> f64 { TICKS_PER_CM }
fn default_ticks_per_degree() -> f64 { TICKS_PER_DEGREE }

/// Longest accepted device name
const MAX_NAME_LEN: usize = 32;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use birdbrain_bridge::config::Config;
    ///
    /// let config = Config::load("config/finch.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Configuration for a model with every other value defaulted
    pub fn for_model(model: ModelKind) -> Self {
        Self {
            device: DeviceConfig {
                model,
                name: default_name(),
            },
            motion: MotionConfig::default(),
            protocol: ProtocolConfig::default(),
        }
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        let name = self.device.name.trim();
        if name.is_empty() {
            return Err(BridgeError::Config(
                toml::de::Error::custom("device name cannot be empty")
            ));
        }

        if name.len() > MAX_NAME_LEN {
            return Err(BridgeError::Config(
                toml::de::Error::custom(format!("device name must be at most {} bytes", MAX_NAME_LEN))
            ));
        }

        for (field, value) in [
            ("ticks_per_cm", self.motion.ticks_per_cm),
            ("ticks_per_degree", self.motion.ticks_per_degree),
        ] {
            if !value.is_finite() || value <= 0.0 || value > 1000.0 {
                return Err(BridgeError::Config(
                    toml::de::Error::custom(format!("{} must be between 0 and 1000", field))
                ));
            }
        }

        Ok(())
    }
}
