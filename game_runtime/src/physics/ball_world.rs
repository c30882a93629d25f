// physics/ball_world.rs - Rolling-ball world on rapier2d, viewed top-down
//
// Wall cells become unit cuboid colliders on one fixed body; the ball is a
// dynamic disc with no gravity. Cells outside the grid are open, so the ball
// can leave through the exit opening.

use rapier2d::prelude::*;
use rust_maze_generator::{Direction, Grid, GridPos, ENTRANCE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::PhysicsWorld;
use crate::error_handling::{GameError, Result};
use crate::types::{BallPose, Quat, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsSettings {
    pub ball_radius: f32,
    /// Velocity added per directional impulse (cells / s)
    pub impulse: f32,
    /// Linear damping of the ball (1 / s)
    pub damping: f32,
    pub max_speed: f32,
    /// Longest simulated interval per update; larger gaps are clamped
    pub max_step_secs: f32,
    pub restitution: f32,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            ball_radius: 0.25,
            impulse: 0.5,
            damping: 1.5,
            max_speed: 3.0,
            max_step_secs: 1.0 / 30.0,
            restitution: 0.2,
        }
    }
}

/// Walls that touch open space (including off-grid space); buried walls get no collider
fn exposed_walls(grid: &Grid) -> impl Iterator<Item = GridPos> + '_ {
    let d = grid.dimension() as i64;
    (0..d)
        .flat_map(move |x| (0..d).map(move |y| GridPos::new(x, y)))
        .filter(move |&cell| {
            grid.is_wall(cell)
                && (-1..=1).any(|dx| {
                    (-1..=1).any(|dy| !grid.is_wall(GridPos::new(cell.x + dx, cell.y + dy)))
                })
        })
}

pub struct GridBallWorld {
    settings: PhysicsSettings,
    gravity: Vector<Real>,
    integration_params: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: BroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd: CCDSolver,
    ball: Option<RigidBodyHandle>,
    /// Orientation accumulated from rolling without slipping
    rolling: Quat,
    last_translation: Vector<Real>,
    last_timestamp: Option<Duration>,
}

impl GridBallWorld {
    pub fn new(settings: PhysicsSettings) -> Self {
        Self {
            settings,
            // Top-down view: the floor carries the ball, nothing pulls in-plane
            gravity: vector![0.0, 0.0],
            integration_params: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: BroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            ball: None,
            rolling: Quat::identity(),
            last_translation: vector![ENTRANCE.x as Real, ENTRANCE.y as Real],
            last_timestamp: None,
        }
    }

    pub fn settings(&self) -> &PhysicsSettings {
        &self.settings
    }

    /// Number of wall colliders built by the last `setup_world`
    pub fn wall_colliders(&self) -> usize {
        self.colliders.len().saturating_sub(usize::from(self.ball.is_some()))
    }

    fn ball_body(&self) -> Option<&RigidBody> {
        self.ball.and_then(|handle| self.bodies.get(handle))
    }

    fn step(&mut self, dt: f32) {
        self.integration_params.dt = dt;
        self.pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            None,
            &(),
            &(),
        );

        let Some(translation) = self.ball_body().map(|body| *body.translation()) else {
            return;
        };
        let delta = translation - self.last_translation;
        self.last_translation = translation;

        let moved = Vec3::new(delta.x, delta.y, 0.0);
        let distance = moved.length();
        if distance > 0.0 {
            let axis = Vec3::new(0.0, 0.0, 1.0).cross(moved);
            let spin = Quat::from_axis_angle(axis, distance / self.settings.ball_radius);
            self.rolling = spin.mul(self.rolling).normalize();
        }
    }
}

impl Default for GridBallWorld {
    fn default() -> Self {
        Self::new(PhysicsSettings::default())
    }
}

impl PhysicsWorld for GridBallWorld {
    fn setup_world(&mut self, grid: &Grid) -> Result<()> {
        if !grid.is_open(ENTRANCE) {
            return Err(GameError::Physics(format!(
                "start cell {} is not a passage",
                ENTRANCE
            )));
        }

        let settings = self.settings;
        *self = Self::new(settings);

        let walls = self.bodies.insert(RigidBodyBuilder::fixed().build());
        for cell in exposed_walls(grid) {
            let collider = ColliderBuilder::cuboid(0.5, 0.5)
                .translation(vector![cell.x as Real, cell.y as Real])
                .restitution(settings.restitution)
                .friction(0.0)
                .build();
            self.colliders.insert_with_parent(collider, walls, &mut self.bodies);
        }

        let start = vector![ENTRANCE.x as Real, ENTRANCE.y as Real];
        let body = RigidBodyBuilder::dynamic()
            .translation(start)
            .linear_damping(settings.damping)
            .angular_damping(settings.damping)
            .ccd_enabled(true)
            .build();
        let ball = self.bodies.insert(body);
        let collider = ColliderBuilder::ball(settings.ball_radius)
            .restitution(settings.restitution)
            .friction(0.0)
            .build();
        self.colliders.insert_with_parent(collider, ball, &mut self.bodies);
        self.ball = Some(ball);
        self.last_translation = start;

        log::debug!(
            "Physics world built from {}x{} grid with {} wall colliders",
            grid.dimension(),
            grid.dimension(),
            self.wall_colliders()
        );
        Ok(())
    }

    fn update_physics(&mut self, timestamp: Duration) -> Result<()> {
        if self.ball.is_none() {
            return Err(GameError::Physics("world stepped before setup".to_string()));
        }

        let dt = match self.last_timestamp {
            Some(last) if timestamp >= last => (timestamp - last).as_secs_f32(),
            Some(last) => {
                log::warn!("Physics timestamp went backwards ({:?} < {:?})", timestamp, last);
                0.0
            }
            None => 0.0,
        };
        self.last_timestamp = Some(timestamp);

        let dt = dt.min(self.settings.max_step_secs);
        if dt > 0.0 {
            self.step(dt);
        }
        Ok(())
    }

    fn move_ball(&mut self, direction: Direction) {
        let Some(body) = self.ball.and_then(|handle| self.bodies.get_mut(handle)) else {
            log::debug!("Impulse {} ignored; no ball yet", direction);
            return;
        };
        let (dx, dy) = direction.offset();
        let dv = vector![dx as Real, dy as Real] * self.settings.impulse;
        body.apply_impulse(dv * body.mass(), true);

        let velocity = *body.linvel();
        let speed = velocity.norm();
        if speed > self.settings.max_speed {
            body.set_linvel(velocity * (self.settings.max_speed / speed), true);
        }
    }

    fn ball_pose(&self) -> BallPose {
        let Some(body) = self.ball_body() else {
            return BallPose::at(Vec3::new(
                ENTRANCE.x as f32,
                ENTRANCE.y as f32,
                self.settings.ball_radius,
            ));
        };
        let t = body.translation();
        // In-plane spin about the vertical, applied after rolling
        let spin = Quat::from_axis_angle(Vec3::new(0.0, 0.0, 1.0), body.rotation().angle());
        BallPose {
            position: Vec3::new(t.x, t.y, self.settings.ball_radius),
            orientation: spin.mul(self.rolling).normalize(),
        }
    }
}
