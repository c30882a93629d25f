// physics/scripted.rs - Deterministic playback physics
//
// Reports one scripted position per update and ignores collision entirely.
// Used to drive the controller in tests and to replay a recorded solution.

use rust_maze_generator::{Direction, Grid, GridPos};
use std::collections::VecDeque;
use std::time::Duration;

use super::PhysicsWorld;
use crate::error_handling::{GameError, Result};
use crate::types::{BallPose, Vec3};

const BALL_HEIGHT: f32 = 0.25;

#[derive(Debug, Clone, Default)]
pub struct ScriptedPhysics {
    script: VecDeque<Vec3>,
    pose: BallPose,
    world_ready: bool,
    updates: u64,
    impulses: Vec<Direction>,
}

impl ScriptedPhysics {
    pub fn new(positions: impl IntoIterator<Item = Vec3>) -> Self {
        let script: VecDeque<Vec3> = positions.into_iter().collect();
        let pose = BallPose::at(script.front().copied().unwrap_or_default());
        Self {
            script,
            pose,
            ..Default::default()
        }
    }

    /// Planar `(x, y)` positions at ball height
    pub fn from_xy(points: &[(f32, f32)]) -> Self {
        Self::new(points.iter().map(|&(x, y)| Vec3::new(x, y, BALL_HEIGHT)))
    }

    /// Replay a recorded path, `frames_per_cell` updates at each cell center
    pub fn from_path(path: &[GridPos], frames_per_cell: usize) -> Self {
        let repeat = frames_per_cell.max(1);
        Self::new(path.iter().flat_map(|cell| {
            std::iter::repeat(Vec3::new(cell.x as f32, cell.y as f32, BALL_HEIGHT)).take(repeat)
        }))
    }

    /// Directions received through `move_ball`, in order
    pub fn impulses(&self) -> &[Direction] {
        &self.impulses
    }

    pub fn updates(&self) -> u64 {
        self.updates
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl PhysicsWorld for ScriptedPhysics {
    fn setup_world(&mut self, grid: &Grid) -> Result<()> {
        if grid.dimension() == 0 {
            return Err(GameError::Physics("empty grid".to_string()));
        }
        self.world_ready = true;
        Ok(())
    }

    fn update_physics(&mut self, _timestamp: Duration) -> Result<()> {
        if !self.world_ready {
            return Err(GameError::Physics("world stepped before setup".to_string()));
        }
        self.updates += 1;
        // The last scripted position holds once the script runs out
        if let Some(next) = self.script.pop_front() {
            self.pose.position = next;
        }
        Ok(())
    }

    fn move_ball(&mut self, direction: Direction) {
        self.impulses.push(direction);
    }

    fn ball_pose(&self) -> BallPose {
        self.pose
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playback_holds_last_position() {
        let mut physics = ScriptedPhysics::from_xy(&[(1.0, 1.0), (2.0, 1.0)]);
        physics.setup_world(&Grid::filled(3)).unwrap();
        physics.update_physics(Duration::ZERO).unwrap();
        physics.update_physics(Duration::ZERO).unwrap();
        physics.update_physics(Duration::ZERO).unwrap();
        assert_eq!(physics.ball_pose().cell(), GridPos::new(2, 1));
        assert_eq!(physics.updates(), 3);
        assert_eq!(physics.remaining(), 0);
    }

    #[test]
    fn test_from_path_repeats_cells() {
        let physics = ScriptedPhysics::from_path(&[GridPos::new(1, 1), GridPos::new(1, 2)], 3);
        assert_eq!(physics.remaining(), 6);
    }

    #[test]
    fn test_records_impulses() {
        let mut physics = ScriptedPhysics::default();
        physics.move_ball(Direction::Up);
        physics.move_ball(Direction::Left);
        assert_eq!(physics.impulses(), &[Direction::Up, Direction::Left]);
    }

    #[test]
    fn test_requires_setup() {
        let mut physics = ScriptedPhysics::from_xy(&[(1.0, 1.0)]);
        assert!(physics.update_physics(Duration::ZERO).is_err());
    }
}
