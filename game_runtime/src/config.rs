// config.rs - Runtime configuration (JSON file, overridden by CLI flags)

use rust_maze_generator::error::validate_dimension;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::controller::ControllerSettings;
use crate::error_handling::{GameError, Result};
use crate::lighting::FadeSettings;
use crate::physics::PhysicsSettings;

/// Largest accepted maze side length
pub const MAX_DIMENSION: usize = 1001;

/// Largest accepted snapshot cell size in pixels
pub const MAX_SNAPSHOT_CELL_PX: u32 = 64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Odd maze side length, at least 3
    pub dimension: usize,
    /// Random seed when absent
    pub seed: Option<u64>,
    pub fps: u32,
    /// Delay between victory and submission
    pub submit_delay_ms: u64,
    /// Hard stop after this many frames
    pub max_frames: Option<u64>,
    /// End the loop once the fade-out completes
    pub exit_after_fade: bool,
    /// Snapshot pixels per grid cell
    pub snapshot_cell_px: u32,
    pub fade: FadeSettings,
    pub physics: PhysicsSettings,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            dimension: 11,
            seed: None,
            fps: 60,
            submit_delay_ms: 300,
            max_frames: None,
            exit_after_fade: true,
            snapshot_cell_px: 16,
            fade: FadeSettings::default(),
            physics: PhysicsSettings::default(),
        }
    }
}

impl GameConfig {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path).await?;
        let config: GameConfig = serde_json::from_str(&text)?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        validate_dimension(self.dimension)?;
        if self.dimension > MAX_DIMENSION {
            return Err(GameError::invalid_config(format!(
                "dimension must be at most {MAX_DIMENSION}, got {}",
                self.dimension
            )));
        }

        if self.fps == 0 || self.fps > 1000 {
            return Err(GameError::invalid_config(format!(
                "fps must be in 1..=1000, got {}",
                self.fps
            )));
        }
        if self.max_frames == Some(0) {
            return Err(GameError::invalid_config("max_frames must be positive"));
        }
        if self.snapshot_cell_px == 0 || self.snapshot_cell_px > MAX_SNAPSHOT_CELL_PX {
            return Err(GameError::invalid_config(format!(
                "snapshot_cell_px must be in 1..={MAX_SNAPSHOT_CELL_PX}, got {}",
                self.snapshot_cell_px
            )));
        }

        let fade = &self.fade;
        if !(fade.rate > 0.0 && fade.rate <= 1.0) {
            return Err(GameError::invalid_config(format!(
                "fade.rate must be in (0, 1], got {}",
                fade.rate
            )));
        }
        if fade.fade_in_tolerance <= 0.0 || fade.fade_out_tolerance <= 0.0 {
            return Err(GameError::invalid_config("fade tolerances must be positive"));
        }

        let physics = &self.physics;
        if !(physics.ball_radius > 0.0 && physics.ball_radius < 0.5) {
            return Err(GameError::invalid_config(format!(
                "physics.ball_radius must be in (0, 0.5), got {}",
                physics.ball_radius
            )));
        }
        if physics.max_step_secs <= 0.0 || physics.max_speed <= 0.0 || physics.impulse <= 0.0 {
            return Err(GameError::invalid_config(
                "physics.max_step_secs, max_speed and impulse must be positive",
            ));
        }
        if physics.damping < 0.0 || !(0.0..=1.0).contains(&physics.restitution) {
            return Err(GameError::invalid_config(
                "physics.damping must be >= 0 and restitution within [0, 1]",
            ));
        }
        Ok(())
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.fps.max(1) as f64)
    }

    pub fn submit_delay(&self) -> Duration {
        Duration::from_millis(self.submit_delay_ms)
    }

    pub fn controller_settings(&self, seed: Option<u64>) -> ControllerSettings {
        ControllerSettings {
            fade: self.fade,
            seed,
        }
    }
}
