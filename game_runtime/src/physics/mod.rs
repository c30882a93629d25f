// physics/mod.rs - Physics collaborator interface
//
// The controller only ever reads the ball pose; motion is changed through
// directional impulses routed to the world.

pub mod ball_world;
pub mod scripted;

pub use ball_world::{GridBallWorld, PhysicsSettings};
pub use scripted::ScriptedPhysics;

use rust_maze_generator::{Direction, Grid};
use std::time::Duration;

use crate::error_handling::Result;
use crate::types::BallPose;

pub trait PhysicsWorld {
    /// Build collision geometry from the wall cells and place the ball at the start
    fn setup_world(&mut self, grid: &Grid) -> Result<()>;

    /// Advance the simulation to `timestamp` (time since the loop started)
    fn update_physics(&mut self, timestamp: Duration) -> Result<()>;

    /// Apply a directional impulse to the ball
    fn move_ball(&mut self, direction: Direction);

    fn ball_pose(&self) -> BallPose;
}

impl<P: PhysicsWorld + ?Sized> PhysicsWorld for Box<P> {
    fn setup_world(&mut self, grid: &Grid) -> Result<()> {
        (**self).setup_world(grid)
    }

    fn update_physics(&mut self, timestamp: Duration) -> Result<()> {
        (**self).update_physics(timestamp)
    }

    fn move_ball(&mut self, direction: Direction) {
        (**self).move_ball(direction)
    }

    fn ball_pose(&self) -> BallPose {
        (**self).ball_pose()
    }
}
