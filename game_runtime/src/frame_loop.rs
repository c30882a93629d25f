// frame_loop.rs - Host scheduler driving the controller at a fixed frame rate
//
// One cooperative loop: tick, drain input, run one controller frame. Victory
// spawns the delayed submission; stopping the loop before it fires cancels it.

use futures::future;
use log::{debug, info};
use rust_maze_generator::Direction;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::GameConfig;
use crate::controller::{FrameOutcome, GameController, GameState, Solution};
use crate::error_handling::{GameError, Result};
use crate::input::Autopilot;
use crate::physics::PhysicsWorld;
use crate::render::RenderSurface;
use crate::submission::{schedule_submission, ScheduledSubmission, SolutionSink};

// ============================================================================
// Stop signal
// ============================================================================

/// Requests the frame loop to stop
#[derive(Debug)]
pub struct StopHandle {
    tx: watch::Sender<bool>,
}

/// Observed by the frame loop
#[derive(Debug, Clone)]
pub struct StopToken {
    rx: watch::Receiver<bool>,
}

pub fn stop_channel() -> (StopHandle, StopToken) {
    let (tx, rx) = watch::channel(false);
    (StopHandle { tx }, StopToken { rx })
}

impl StopHandle {
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }
}

impl StopToken {
    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once stop is requested; never resolves if the handle is dropped first
    pub async fn stopped(&mut self) {
        if self.rx.wait_for(|stopped| *stopped).await.is_err() {
            future::pending::<()>().await;
        }
    }
}

async fn wait_stop(stop: &mut Option<StopToken>) {
    match stop {
        Some(token) => token.stopped().await,
        None => future::pending::<()>().await,
    }
}

// ============================================================================
// Loop
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct LoopSettings {
    pub frame_interval: Duration,
    pub submit_delay: Duration,
    pub max_frames: Option<u64>,
    pub exit_after_fade: bool,
}

impl Default for LoopSettings {
    fn default() -> Self {
        LoopSettings::from_config(&GameConfig::default())
    }
}

impl LoopSettings {
    pub fn from_config(config: &GameConfig) -> Self {
        Self {
            frame_interval: config.frame_interval(),
            submit_delay: config.submit_delay(),
            max_frames: config.max_frames,
            exit_after_fade: config.exit_after_fade,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    FadeOutComplete,
    MaxFrames,
    Stopped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoopReport {
    pub frames: u64,
    pub final_state: GameState,
    pub stop_reason: StopReason,
    pub solution: Option<Solution>,
    /// The solution reached its sink
    pub submitted: bool,
}

pub struct FrameLoop<P, R> {
    controller: GameController<P, R>,
    sink: Arc<dyn SolutionSink>,
    settings: LoopSettings,
    commands: Option<mpsc::UnboundedReceiver<Direction>>,
    asset_gate: Option<oneshot::Receiver<()>>,
    stop: Option<StopToken>,
    autopilot: Option<Autopilot>,
}

impl<P: PhysicsWorld, R: RenderSurface> FrameLoop<P, R> {
    pub fn new(controller: GameController<P, R>, sink: Arc<dyn SolutionSink>, settings: LoopSettings) -> Self {
        Self {
            controller,
            sink,
            settings,
            commands: None,
            asset_gate: None,
            stop: None,
            autopilot: None,
        }
    }

    pub fn with_commands(mut self, commands: mpsc::UnboundedReceiver<Direction>) -> Self {
        self.commands = Some(commands);
        self
    }

    /// Without a gate, assets count as ready from the first frame
    pub fn with_asset_gate(mut self, gate: oneshot::Receiver<()>) -> Self {
        self.asset_gate = Some(gate);
        self
    }

    pub fn with_stop(mut self, stop: StopToken) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn with_autopilot(mut self, autopilot: Autopilot) -> Self {
        self.autopilot = Some(autopilot);
        self
    }

    pub fn controller(&self) -> &GameController<P, R> {
        &self.controller
    }

    pub fn into_controller(self) -> GameController<P, R> {
        self.controller
    }

    pub async fn run(&mut self) -> Result<LoopReport> {
        if self.asset_gate.is_none() {
            self.controller.assets_ready();
        }

        let mut pending: Option<ScheduledSubmission> = None;
        let mut solution: Option<Solution> = None;
        let reason = match self.drive(&mut pending, &mut solution).await {
            Ok(reason) => reason,
            Err(e) => {
                if let Some(submission) = pending.take() {
                    submission.cancel();
                }
                return Err(e);
            }
        };

        let submitted = match pending.take() {
            Some(submission) if reason == StopReason::Stopped => {
                submission.cancel();
                let fired = submission.is_finished() && submission.wait().await.is_ok();
                if !fired {
                    info!("Loop stopped before the solution was submitted");
                }
                fired
            }
            Some(submission) => {
                submission.wait().await?;
                true
            }
            None => false,
        };

        self.controller.renderer_mut().finish()?;

        let report = LoopReport {
            frames: self.controller.frame_count(),
            final_state: self.controller.state(),
            stop_reason: reason,
            solution,
            submitted,
        };
        info!(
            "Frame loop finished after {} frames ({:?}, state {})",
            report.frames, report.stop_reason, report.final_state
        );
        Ok(report)
    }

    async fn drive(
        &mut self,
        pending: &mut Option<ScheduledSubmission>,
        solution: &mut Option<Solution>,
    ) -> Result<StopReason> {
        let mut interval = tokio::time::interval(self.settings.frame_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut stop = self.stop.take();
        let start = Instant::now();

        loop {
            tokio::select! {
                biased;
                _ = wait_stop(&mut stop) => {
                    debug!("Stop requested at frame {}", self.controller.frame_count());
                    return Ok(StopReason::Stopped);
                }
                _ = interval.tick() => {}
            }

            self.poll_asset_gate()?;
            self.drain_commands();
            self.steer();

            match self.controller.frame(start.elapsed())? {
                FrameOutcome::Continue => {}
                FrameOutcome::Victory(found) => {
                    let payload = found.to_json()?;
                    *pending = Some(schedule_submission(
                        Arc::clone(&self.sink),
                        payload,
                        self.settings.submit_delay,
                    ));
                    *solution = Some(found);
                }
                FrameOutcome::FadeOutComplete if self.settings.exit_after_fade => {
                    return Ok(StopReason::FadeOutComplete);
                }
                FrameOutcome::FadeOutComplete => {}
            }

            if let Some(max) = self.settings.max_frames {
                if self.controller.frame_count() >= max {
                    return Ok(StopReason::MaxFrames);
                }
            }
        }
    }

    fn poll_asset_gate(&mut self) -> Result<()> {
        let Some(gate) = self.asset_gate.as_mut() else {
            return Ok(());
        };
        match gate.try_recv() {
            Ok(()) => {
                self.asset_gate = None;
                self.controller.assets_ready();
                Ok(())
            }
            Err(oneshot::error::TryRecvError::Empty) => Ok(()),
            Err(oneshot::error::TryRecvError::Closed) => Err(GameError::Assets(
                "asset loader finished without signalling".to_string(),
            )),
        }
    }

    fn drain_commands(&mut self) {
        let Some(commands) = self.commands.as_mut() else {
            return;
        };
        loop {
            match commands.try_recv() {
                Ok(direction) => self.controller.move_ball(direction),
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    debug!("Command source closed");
                    self.commands = None;
                    break;
                }
            }
        }
    }

    fn steer(&mut self) {
        if self.controller.state() != GameState::Playing {
            return;
        }
        let Some(pilot) = self.autopilot.as_mut() else {
            return;
        };
        let pose = self.controller.physics().ball_pose();
        if let Some(direction) = pilot.next_command(&pose) {
            self.controller.move_ball(direction);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::ControllerSettings;
    use crate::physics::{GridBallWorld, ScriptedPhysics};
    use crate::render::{FrameView, NullRenderer};
    use crate::submission::ChannelSink;
    use rust_maze_generator::{exit_cell, generate_seeded, ENTRANCE};

    fn controller(script: &[(f32, f32)]) -> GameController<ScriptedPhysics, NullRenderer> {
        GameController::new(
            generate_seeded(11, 42).unwrap(),
            ScriptedPhysics::from_xy(script),
            NullRenderer::new(),
            ControllerSettings {
                seed: Some(42),
                ..Default::default()
            },
        )
        .unwrap()
    }

    fn settings(max_frames: Option<u64>) -> LoopSettings {
        LoopSettings {
            max_frames,
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_run_submits_solution() {
        let (sink, mut rx) = ChannelSink::new();
        let mut frame_loop = FrameLoop::new(
            controller(&[(1.0, 1.0), (11.3, 9.4)]),
            Arc::new(sink),
            settings(None),
        );
        let report = frame_loop.run().await.unwrap();

        assert_eq!(report.stop_reason, StopReason::FadeOutComplete);
        assert_eq!(report.final_state, GameState::FadeOut);
        // 1 initializing + 30 fade-in + 2 playing + 22 fade-out
        assert_eq!(report.frames, 55);
        assert!(report.submitted);

        let solution = report.solution.unwrap();
        assert_eq!(solution.path, vec![ENTRANCE, exit_cell(11)]);
        assert_eq!(solution.seed, Some(42));

        let payload: serde_json::Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(payload["path"], serde_json::json!([[1, 1], [11, 9]]));
        assert_eq!(frame_loop.controller().renderer().frames(), 55);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_on_asset_gate() {
        let (sink, _rx) = ChannelSink::new();
        let (_loaded, gate) = oneshot::channel();
        let mut frame_loop = FrameLoop::new(controller(&[]), Arc::new(sink), settings(Some(10)))
            .with_asset_gate(gate);
        let report = frame_loop.run().await.unwrap();

        assert_eq!(report.stop_reason, StopReason::MaxFrames);
        assert_eq!(report.frames, 10);
        assert_eq!(report.final_state, GameState::Initializing);
        assert!(!report.submitted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_gate_starts_fade() {
        let (sink, _rx) = ChannelSink::new();
        let (loaded, gate) = oneshot::channel();
        loaded.send(()).unwrap();
        let mut frame_loop = FrameLoop::new(controller(&[]), Arc::new(sink), settings(Some(3)))
            .with_asset_gate(gate);
        let report = frame_loop.run().await.unwrap();
        assert_eq!(report.final_state, GameState::FadeIn);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_asset_loader_is_an_error() {
        let (sink, _rx) = ChannelSink::new();
        let (loaded, gate) = oneshot::channel::<()>();
        drop(loaded);
        let mut frame_loop = FrameLoop::new(controller(&[]), Arc::new(sink), settings(Some(5)))
            .with_asset_gate(gate);
        assert!(matches!(frame_loop.run().await, Err(GameError::Assets(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_pending_submission() {
        let (sink, mut rx) = ChannelSink::new();
        let (handle, token) = stop_channel();
        let mut frame_loop = FrameLoop::new(
            controller(&[(1.0, 1.0), (11.3, 9.4)]),
            Arc::new(sink),
            settings(None),
        )
        .with_stop(token);

        // Victory lands on frame 33 (~533 ms); the submission would fire ~300 ms later
        let (report, _) = tokio::join!(frame_loop.run(), async {
            tokio::time::sleep(Duration::from_millis(600)).await;
            handle.stop();
        });
        let report = report.unwrap();
        assert_eq!(report.stop_reason, StopReason::Stopped);
        assert!(report.solution.is_some());
        assert!(!report.submitted);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_commands_reach_physics() {
        let (sink, _rx) = ChannelSink::new();
        let (tx, commands) = mpsc::unbounded_channel();
        tx.send(Direction::Up).unwrap();
        tx.send(Direction::Left).unwrap();
        let mut frame_loop = FrameLoop::new(controller(&[]), Arc::new(sink), settings(Some(2)))
            .with_commands(commands);
        frame_loop.run().await.unwrap();

        let controller = frame_loop.into_controller();
        assert_eq!(controller.physics().impulses(), &[Direction::Up, Direction::Left]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_autopilot_steers_while_playing() {
        let grid = generate_seeded(11, 42).unwrap();
        let pilot = Autopilot::new(grid, ENTRANCE, exit_cell(11)).unwrap();
        let first_step = ENTRANCE.direction_to(pilot.route()[1]).unwrap();

        let (sink, _rx) = ChannelSink::new();
        let mut frame_loop = FrameLoop::new(controller(&[(1.0, 1.0)]), Arc::new(sink), settings(Some(60)))
            .with_autopilot(pilot);
        frame_loop.run().await.unwrap();

        let controller = frame_loop.into_controller();
        let impulses = controller.physics().impulses();
        assert!(!impulses.is_empty());
        assert!(impulses.iter().all(|&d| d == first_step));
    }

    #[tokio::test(start_paused = true)]
    async fn test_autopilot_rolls_ball_to_exit() {
        for seed in [1, 2, 3] {
            let grid = generate_seeded(11, seed).unwrap();
            let pilot = Autopilot::new(grid.clone(), ENTRANCE, exit_cell(11)).unwrap();
            let controller = GameController::new(
                grid,
                GridBallWorld::default(),
                NullRenderer::new(),
                ControllerSettings {
                    seed: Some(seed),
                    ..Default::default()
                },
            )
            .unwrap();

            let (sink, mut rx) = ChannelSink::new();
            let mut frame_loop =
                FrameLoop::new(controller, Arc::new(sink), settings(Some(7200))).with_autopilot(pilot);
            let report = frame_loop.run().await.unwrap();

            let solution = report.solution.unwrap_or_else(|| panic!("seed {seed} never reached the exit"));
            assert_eq!(report.stop_reason, StopReason::FadeOutComplete);
            assert_eq!(solution.path.first(), Some(&ENTRANCE));
            assert_eq!(solution.path.last(), Some(&exit_cell(11)));
            assert!(rx.try_recv().is_ok());
        }
    }

    struct FailingRenderer {
        fail_at: u64,
    }

    impl RenderSurface for FailingRenderer {
        fn render(&mut self, view: &FrameView<'_>) -> Result<()> {
            if view.frame >= self.fail_at {
                return Err(GameError::Render("surface lost".to_string()));
            }
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_render_error_stops_loop() {
        let controller = GameController::new(
            generate_seeded(11, 1).unwrap(),
            ScriptedPhysics::default(),
            FailingRenderer { fail_at: 3 },
            ControllerSettings::default(),
        )
        .unwrap();
        let (sink, _rx) = ChannelSink::new();
        let mut frame_loop = FrameLoop::new(controller, Arc::new(sink), settings(None));
        let err = frame_loop.run().await.unwrap_err();
        assert!(matches!(err, GameError::Render(_)));
        assert_eq!(frame_loop.controller().frame_count(), 3);
    }

    #[test]
    fn test_stop_token() {
        let (handle, token) = stop_channel();
        assert!(!token.is_stopped());
        handle.stop();
        assert!(token.is_stopped());
    }

    #[test]
    fn test_settings_from_config() {
        let config = GameConfig {
            fps: 30,
            submit_delay_ms: 500,
            max_frames: Some(100),
            ..Default::default()
        };
        let settings = LoopSettings::from_config(&config);
        assert_eq!(settings.submit_delay, Duration::from_millis(500));
        assert_eq!(settings.max_frames, Some(100));
        assert!(settings.frame_interval > Duration::from_millis(33));
    }
}
