// controller.rs - Frame-driven game state machine
//
// Initializing -> FadeIn -> Playing -> FadeOut. Every frame renders exactly
// once; physics is only stepped while Playing.

use chrono::{DateTime, Utc};
use log::{debug, info};
use rust_maze_generator::{exit_cell, Direction, Grid, GridPos};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error_handling::Result;
use crate::lighting::{FadeSettings, PointLight, ToleranceCheck};
use crate::path_recorder::PathRecorder;
use crate::physics::PhysicsWorld;
use crate::render::{FrameView, RenderSurface};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameState {
    Initializing,
    FadeIn,
    Playing,
    FadeOut,
}

impl GameState {
    pub fn as_str(self) -> &'static str {
        match self {
            GameState::Initializing => "initializing",
            GameState::FadeIn => "fade_in",
            GameState::Playing => "playing",
            GameState::FadeOut => "fade_out",
        }
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControllerSettings {
    pub fade: FadeSettings,
    /// Seed the maze was generated from, echoed into the solution
    pub seed: Option<u64>,
}

/// A completed run: the recorded path plus metadata for the submission payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    pub path: Vec<GridPos>,
    pub dimension: usize,
    pub seed: Option<u64>,
    pub frames: u64,
    pub elapsed_ms: u64,
    pub completed_at: DateTime<Utc>,
}

impl Solution {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    Continue,
    /// The ball reached the exit cell on this frame
    Victory(Solution),
    /// The fade-out snapped to zero on this frame (reported once)
    FadeOutComplete,
}

pub struct GameController<P, R> {
    grid: Grid,
    exit: GridPos,
    physics: P,
    renderer: R,
    settings: ControllerSettings,
    state: GameState,
    light: PointLight,
    path: PathRecorder,
    assets_ready: bool,
    faded_out: bool,
    frame_count: u64,
    play_started: Option<Duration>,
}

impl<P: PhysicsWorld, R: RenderSurface> GameController<P, R> {
    /// Builds the physics world from `grid`; a setup failure is fatal.
    pub fn new(grid: Grid, mut physics: P, renderer: R, settings: ControllerSettings) -> Result<Self> {
        physics.setup_world(&grid)?;
        let exit = exit_cell(grid.dimension());
        info!(
            "Controller ready: {}x{} maze, exit at {}",
            grid.dimension(),
            grid.dimension(),
            exit
        );
        Ok(Self {
            grid,
            exit,
            physics,
            renderer,
            settings,
            state: GameState::Initializing,
            light: PointLight::off(),
            path: PathRecorder::new(),
            assets_ready: false,
            faded_out: false,
            frame_count: 0,
            play_started: None,
        })
    }

    /// One-shot asset gate; the next Initializing frame starts the fade-in.
    pub fn assets_ready(&mut self) {
        if !self.assets_ready {
            debug!("Assets ready at frame {}", self.frame_count);
            self.assets_ready = true;
        }
    }

    /// Forwarded to physics in every state, without wall validation
    pub fn move_ball(&mut self, direction: Direction) {
        debug!("Impulse {} in state {}", direction, self.state);
        self.physics.move_ball(direction);
    }

    pub fn frame(&mut self, timestamp: Duration) -> Result<FrameOutcome> {
        self.frame_count += 1;
        let fade = self.settings.fade;

        let outcome = match self.state {
            GameState::Initializing => {
                self.light.set_intensity(0.0);
                if self.assets_ready {
                    self.transition(GameState::FadeIn);
                }
                FrameOutcome::Continue
            }
            GameState::FadeIn => {
                let lit = self
                    .light
                    .fade_toward(1.0, fade.rate, fade.fade_in_tolerance, ToleranceCheck::BeforeStep);
                if lit {
                    self.play_started = Some(timestamp);
                    self.transition(GameState::Playing);
                }
                FrameOutcome::Continue
            }
            GameState::Playing => self.play_frame(timestamp)?,
            GameState::FadeOut => {
                let dark = self
                    .light
                    .fade_toward(0.0, fade.rate, fade.fade_out_tolerance, ToleranceCheck::AfterStep);
                if dark && !self.faded_out {
                    self.faded_out = true;
                    info!("Fade out complete at frame {}", self.frame_count);
                    FrameOutcome::FadeOutComplete
                } else {
                    FrameOutcome::Continue
                }
            }
        };

        let view = FrameView {
            frame: self.frame_count,
            state: self.state,
            intensity: self.light.intensity(),
            pose: self.physics.ball_pose(),
            grid: &self.grid,
            path: self.path.cells(),
        };
        self.renderer.render(&view)?;
        Ok(outcome)
    }

    fn play_frame(&mut self, timestamp: Duration) -> Result<FrameOutcome> {
        self.physics.update_physics(timestamp)?;
        let cell = self.physics.ball_pose().cell();
        if self.path.record(cell) {
            debug!("Ball entered {} (path length {})", cell, self.path.len());
        }

        if cell != self.exit {
            return Ok(FrameOutcome::Continue);
        }

        let elapsed = self
            .play_started
            .map(|start| timestamp.saturating_sub(start))
            .unwrap_or_default();
        let solution = Solution {
            path: self.path.cells().to_vec(),
            dimension: self.grid.dimension(),
            seed: self.settings.seed,
            frames: self.frame_count,
            elapsed_ms: elapsed.as_millis() as u64,
            completed_at: Utc::now(),
        };
        info!(
            "Exit reached in {} ms over {} cells",
            solution.elapsed_ms,
            solution.path.len()
        );
        self.transition(GameState::FadeOut);
        Ok(FrameOutcome::Victory(solution))
    }

    fn transition(&mut self, next: GameState) {
        info!("State {} -> {} at frame {}", self.state, next, self.frame_count);
        self.state = next;
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn intensity(&self) -> f32 {
        self.light.intensity()
    }

    pub fn path(&self) -> &[GridPos] {
        self.path.cells()
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn is_faded_out(&self) -> bool {
        self.faded_out
    }

    pub fn physics(&self) -> &P {
        &self.physics
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }
}
