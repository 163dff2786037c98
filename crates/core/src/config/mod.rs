use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Result, ShowError};

/// Duration of one reference animation frame. Per-frame constants below are
/// expressed in these units.
pub const REFERENCE_FRAME_MS: f64 = 1000.0 / 60.0;

/// Largest accepted glyph raster side. Raster indices are `u32`.
pub const MAX_RASTER_SIZE: u32 = 4096;

/// Top-level configuration structure for the show engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShowConfig {
    pub canvas: CanvasConfig,
    pub playback: PlaybackConfig,
    pub radial: RadialConfig,
    pub fountain: FountainConfig,
    pub glyph: GlyphConfig,
}

impl ShowConfig {
    /// Reads a JSON configuration file. Missing sections keep their defaults.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(ShowError::InvalidInput("canvas must have a non-zero size"));
        }
        if self.playback.frame_ms.is_nan() || self.playback.frame_ms <= 0.0 {
            return Err(ShowError::InvalidInput("frame duration must be positive"));
        }
        if self.radial.min_particles > self.radial.max_particles {
            return Err(ShowError::InvalidInput(
                "radial particle range is inverted",
            ));
        }
        if self.radial.min_speed > self.radial.max_speed
            || self.glyph.min_speed > self.glyph.max_speed
        {
            return Err(ShowError::InvalidInput("speed range is inverted"));
        }
        if self.glyph.min_size > self.glyph.max_size {
            return Err(ShowError::InvalidInput("glyph size range is inverted"));
        }
        if self.glyph.raster_size == 0 || self.glyph.sample_step == 0 {
            return Err(ShowError::InvalidInput(
                "glyph raster and sample step must be non-zero",
            ));
        }
        if self.glyph.raster_size > MAX_RASTER_SIZE {
            return Err(ShowError::InvalidInput("glyph raster is too large"));
        }
        Ok(())
    }
}

/// Size of the drawing surface events are scaled to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 960,
            height: 540,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Milliseconds that count as one simulation step.
    pub frame_ms: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            frame_ms: REFERENCE_FRAME_MS,
        }
    }
}

/// Omnidirectional burst ("maru").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadialConfig {
    pub min_particles: usize,
    pub max_particles: usize,
    pub min_speed: f32,
    pub max_speed: f32,
    pub min_size: f32,
    pub max_size: f32,
    /// Multiplicative speed decay per frame.
    pub drag: f32,
    /// Additive alpha decay per frame.
    pub fade: f32,
}

impl Default for RadialConfig {
    fn default() -> Self {
        Self {
            min_particles: 50,
            max_particles: 100,
            min_speed: 1.0,
            max_speed: 6.0,
            min_size: 1.0,
            max_size: 4.0,
            drag: 0.95,
            fade: 0.01,
        }
    }
}

/// Continuous upward spray ("hunshutsu").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FountainConfig {
    pub duration_ms: f64,
    /// Particles spawned per frame while the fountain is active.
    pub batch_size: usize,
    /// Full width of the horizontal velocity jitter.
    pub jitter: f32,
    pub min_lift: f32,
    pub max_lift: f32,
    pub gravity: f32,
    pub min_size: f32,
    pub max_size: f32,
    pub fade: f32,
}

impl Default for FountainConfig {
    fn default() -> Self {
        Self {
            duration_ms: 5000.0,
            batch_size: 5,
            jitter: 1.0,
            min_lift: 2.5,
            max_lift: 6.0,
            gravity: 0.06,
            min_size: 1.0,
            max_size: 3.0,
            fade: 0.01,
        }
    }
}

/// Text or emoji shaped shell ("moji/emoji").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlyphConfig {
    /// Pixels the rising marker climbs per frame.
    pub rise_step: f32,
    pub marker_radius: f32,
    /// Side of the square off-screen raster.
    pub raster_size: u32,
    /// Pixel size the glyph is rendered at inside the raster.
    pub font_px: f32,
    pub outline: bool,
    pub outline_width: f32,
    pub sample_step: u32,
    /// Cells must have a raster alpha strictly above this value.
    pub alpha_threshold: u8,
    pub min_size: f32,
    pub max_size: f32,
    pub min_speed: f32,
    pub max_speed: f32,
    /// Distance from the centre at which particles reach `max_speed`.
    pub speed_falloff: f32,
    pub drag: f32,
    pub fade: f32,
    pub min_particle_size: f32,
    pub max_particle_size: f32,
}

impl Default for GlyphConfig {
    fn default() -> Self {
        Self {
            rise_step: 5.0,
            marker_radius: 3.0,
            raster_size: 200,
            font_px: 180.0,
            outline: true,
            outline_width: 8.0,
            sample_step: 8,
            alpha_threshold: 128,
            min_size: 80.0,
            max_size: 120.0,
            min_speed: 0.02,
            max_speed: 5.0,
            speed_falloff: 100.0,
            drag: 0.98,
            fade: 0.008,
            min_particle_size: 1.0,
            max_particle_size: 3.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: ShowConfig =
            serde_json::from_str(r#"{ "fountain": { "duration_ms": 1200.0 } }"#).unwrap();

        assert_eq!(config.fountain.duration_ms, 1200.0);
        assert_eq!(config.fountain.batch_size, 5);
        assert_eq!(config.radial, RadialConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_inverted_ranges() {
        let mut config = ShowConfig::default();
        config.radial.min_particles = 200;
        assert!(config.validate().is_err());

        let mut config = ShowConfig::default();
        config.canvas.width = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn caps_the_glyph_raster() {
        let mut config = ShowConfig::default();
        config.glyph.raster_size = MAX_RASTER_SIZE;
        assert!(config.validate().is_ok());

        config.glyph.raster_size = 70_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("show.json");
        std::fs::write(&path, r#"{ "canvas": { "width": 320, "height": 200 } }"#).unwrap();

        let config = ShowConfig::from_path(&path).unwrap();
        assert_eq!(config.canvas.width, 320);
        assert_eq!(config.canvas.height, 200);
    }
}
