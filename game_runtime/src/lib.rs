// lib.rs - Library exports for maze-ball-runtime
// Game state machine, collaborators and the frame loop that drives them

pub mod config;
pub mod controller;
pub mod error_handling;
pub mod frame_loop;
pub mod input;
pub mod lighting;
pub mod path_recorder;
pub mod physics;
pub mod render;
pub mod submission;
pub mod types;

// Re-export commonly used types
pub use config::GameConfig;
pub use controller::{ControllerSettings, FrameOutcome, GameController, GameState, Solution};
pub use error_handling::{GameError, Result};
pub use frame_loop::{stop_channel, FrameLoop, LoopReport, LoopSettings, StopHandle, StopReason, StopToken};
pub use physics::{GridBallWorld, PhysicsSettings, PhysicsWorld, ScriptedPhysics};
pub use render::{FrameView, NullRenderer, RenderSurface, SnapshotRenderer};
pub use submission::{schedule_submission, ChannelSink, FileSink, LogSink, ScheduledSubmission, SolutionSink};
pub use types::{BallPose, Quat, Vec3};
