//! Configuration parsing and validation for the viewer

use kernel::{Backend, KERNEL_SOURCE_NAME};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Viewer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Window and field width (pixels)
    pub width: u32,
    /// Window and field height (pixels)
    pub height: u32,
    /// Number of charges, fixed for the run
    pub n_charges: usize,
    /// Initial charge speed (pixels/s)
    pub speed: f32,
    /// RNG seed for the initial layout; time of day when absent
    pub seed: Option<u64>,
    /// Backend selected at startup
    pub initial_backend: Backend,
    /// Path to the device program
    pub kernel_source: String,
    /// Length of the rolling FPS window (seconds)
    pub fps_window_secs: f32,
}

// Default values
fn default_width() -> u32 {
    1200
}

fn default_height() -> u32 {
    800
}

fn default_n_charges() -> usize {
    256
}

fn default_speed() -> f32 {
    200.0
}

fn default_kernel_source() -> String {
    format!("crates/kernel/shaders/{KERNEL_SOURCE_NAME}")
}

fn default_fps_window_secs() -> f32 {
    1.0
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            n_charges: default_n_charges(),
            speed: default_speed(),
            seed: None,
            initial_backend: Backend::Gpu,
            kernel_source: default_kernel_source(),
            fps_window_secs: default_fps_window_secs(),
        }
    }
}

impl ViewerConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &str) -> Result<Self, String> {
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {}", path, e))?;

        let config = Self::from_json(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a JSON string; missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| format!("Failed to parse config JSON: {}", e))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err("Width and height must be positive".to_string());
        }
        if (self.width as u64) * (self.height as u64) > u32::MAX as u64 {
            return Err("Width * height must fit in 32 bits".to_string());
        }

        if self.n_charges == 0 {
            return Err("n_charges must be at least 1".to_string());
        }

        if !self.speed.is_finite() || self.speed < 0.0 {
            return Err("Speed must be finite and non-negative".to_string());
        }

        if Path::new(&self.kernel_source)
            .file_name()
            .and_then(|n| n.to_str())
            != Some(KERNEL_SOURCE_NAME)
        {
            return Err(format!(
                "kernel_source must name a file called {KERNEL_SOURCE_NAME}, got {}",
                self.kernel_source
            ));
        }

        if !self.fps_window_secs.is_finite() || self.fps_window_secs <= 0.0 {
            return Err("fps_window_secs must be positive".to_string());
        }

        Ok(())
    }

    /// The FPS window as a `Duration`
    pub fn fps_window(&self) -> Duration {
        Duration::from_secs_f32(self.fps_window_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ViewerConfig::default();
        assert_eq!(config.width, 1200);
        assert_eq!(config.height, 800);
        assert_eq!(config.n_charges, 256);
        assert_eq!(config.initial_backend, Backend::Gpu);
        assert!(config.kernel_source.ends_with("metaball.wgsl"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config =
            ViewerConfig::from_json(r#"{ "n_charges": 16, "seed": 42, "initial_backend": "Cpu" }"#)
                .unwrap();
        assert_eq!(config.n_charges, 16);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.initial_backend, Backend::Cpu);
        assert_eq!(config.width, 1200);
        assert_eq!(config.fps_window(), Duration::from_secs(1));
    }

    #[test]
    fn test_validation_dimensions() {
        let mut config = ViewerConfig {
            width: 0,
            ..ViewerConfig::default()
        };
        assert!(config.validate().is_err());

        config.width = 640;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_charges_and_speed() {
        let mut config = ViewerConfig {
            n_charges: 0,
            ..ViewerConfig::default()
        };
        assert!(config.validate().is_err());

        config.n_charges = 1;
        config.speed = f32::NAN;
        assert!(config.validate().is_err());

        config.speed = 0.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_kernel_source_name() {
        let mut config = ViewerConfig {
            kernel_source: "shaders/other.wgsl".to_string(),
            ..ViewerConfig::default()
        };
        assert!(config.validate().is_err());

        config.kernel_source = "/opt/metaball/metaball.wgsl".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_fps_window() {
        let config = ViewerConfig {
            fps_window_secs: 0.0,
            ..ViewerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        assert!(ViewerConfig::from_json(r#"{ "initial_backend": "Tpu" }"#).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = ViewerConfig::load("/nonexistent/viewer.json").unwrap_err();
        assert!(err.contains("Failed to read config file"));
    }
}
