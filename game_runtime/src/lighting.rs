// lighting.rs - Point light intensity used for the fade transitions

use serde::{Deserialize, Serialize};

/// Fade parameters. Each frame closes `rate` of the remaining gap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FadeSettings {
    pub rate: f32,
    pub fade_in_tolerance: f32,
    pub fade_out_tolerance: f32,
}

impl Default for FadeSettings {
    fn default() -> Self {
        Self {
            rate: 0.1,
            fade_in_tolerance: 0.05,
            fade_out_tolerance: 0.1,
        }
    }
}

/// When `fade_toward` compares against the tolerance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToleranceCheck {
    /// Compare the intensity the frame starts with; a frame inside tolerance only snaps
    BeforeStep,
    /// Compare the intensity after this frame's step
    AfterStep,
}

/// Normalized intensity of the light following the ball
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointLight {
    intensity: f32,
}

impl PointLight {
    pub fn off() -> Self {
        Self { intensity: 0.0 }
    }

    #[inline]
    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    pub fn set_intensity(&mut self, intensity: f32) {
        self.intensity = intensity;
    }

    /// Step toward `target`; snaps and returns true once within `tolerance`.
    pub fn fade_toward(&mut self, target: f32, rate: f32, tolerance: f32, check: ToleranceCheck) -> bool {
        if check == ToleranceCheck::BeforeStep && (self.intensity - target).abs() >= tolerance {
            self.intensity += rate * (target - self.intensity);
            return false;
        }
        if check == ToleranceCheck::AfterStep {
            self.intensity += rate * (target - self.intensity);
        }
        if (self.intensity - target).abs() < tolerance {
            self.intensity = target;
            true
        } else {
            false
        }
    }
}
