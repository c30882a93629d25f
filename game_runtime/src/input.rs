// input.rs - Discrete direction commands: text parsing, stdin source and autopilot

use log::{debug, warn};
use rust_maze_generator::{shortest_path, Direction, Grid, GridPos};
use std::io::{self, BufRead, BufReader, Read};
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc;

use crate::types::BallPose;

/// `up|down|left|right` in any case, or the `w a s d` keys
pub fn parse_command(text: &str) -> Option<Direction> {
    let text = text.trim();
    if let Ok(direction) = text.parse::<Direction>() {
        return Some(direction);
    }
    match text {
        "w" | "W" => Some(Direction::Up),
        "s" | "S" => Some(Direction::Down),
        "a" | "A" => Some(Direction::Left),
        "d" | "D" => Some(Direction::Right),
        _ => None,
    }
}

/// Forwards one parsed command per line until EOF or until the receiver is gone.
///
/// Runs on a detached OS thread: a read blocked on a terminal must not keep the
/// async runtime from shutting down once the game is over.
pub fn spawn_line_reader<I>(input: I, tx: mpsc::UnboundedSender<Direction>) -> io::Result<JoinHandle<()>>
where
    I: Read + Send + 'static,
{
    thread::Builder::new().name("command-input".to_string()).spawn(move || {
        for line in BufReader::new(input).lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!("Command input failed: {e}");
                    return;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match parse_command(&line) {
                Some(direction) => {
                    if tx.send(direction).is_err() {
                        return;
                    }
                }
                None => warn!("Ignoring unknown command {:?}", line.trim()),
            }
        }
        debug!("Command input closed");
    })
}

pub fn spawn_stdin_reader(tx: mpsc::UnboundedSender<Direction>) -> io::Result<JoinHandle<()>> {
    spawn_line_reader(io::stdin(), tx)
}

// ============================================================================
// Autopilot
// ============================================================================

/// Distance (per axis) at which a waypoint counts as reached
const WAYPOINT_REACHED: f32 = 0.2;

/// No further pushes once the ball moves this fast toward its waypoint (cells / frame)
const CRUISE_SPEED: f32 = 0.04;

/// Above this speed the ball is slowed before a waypoint where the route turns
const BRAKE_SPEED: f32 = 0.02;
const BRAKE_DISTANCE: f32 = 0.6;

/// Default frames between impulses
pub const DEFAULT_TAP_EVERY: u64 = 6;

/// Steers the ball along the shortest route, one impulse every few frames.
///
/// Speed is estimated from successive poses; the pilot holds a cruise speed
/// and pushes back before corners instead of relying on walls to stop the ball.
#[derive(Debug, Clone)]
pub struct Autopilot {
    grid: Grid,
    goal: GridPos,
    route: Vec<GridPos>,
    index: usize,
    tap_every: u64,
    ticks: u64,
    last_position: Option<(f32, f32)>,
}

impl Autopilot {
    /// `None` when the goal is unreachable from `start`
    pub fn new(grid: Grid, start: GridPos, goal: GridPos) -> Option<Self> {
        let route = shortest_path(&grid, start, goal)?;
        debug!("Autopilot route: {} cells from {} to {}", route.len(), start, goal);
        Some(Self {
            grid,
            goal,
            route,
            index: 0,
            tap_every: DEFAULT_TAP_EVERY,
            ticks: 0,
            last_position: None,
        })
    }

    pub fn with_tap_every(mut self, frames: u64) -> Self {
        self.tap_every = frames.max(1);
        self
    }

    pub fn route(&self) -> &[GridPos] {
        &self.route
    }

    /// The waypoint currently steered toward
    pub fn target(&self) -> GridPos {
        self.route[self.index]
    }

    /// Called once per frame; returns a direction on tap frames only.
    pub fn next_command(&mut self, pose: &BallPose) -> Option<Direction> {
        let tick = self.ticks;
        self.ticks += 1;

        let (px, py) = (pose.position.x, pose.position.y);
        let (vx, vy) = match self.last_position.replace((px, py)) {
            Some((lx, ly)) => (px - lx, py - ly),
            None => (0.0, 0.0),
        };

        self.follow(pose.cell());
        while self.index + 1 < self.route.len() && reached(self.route[self.index], px, py) {
            self.index += 1;
        }

        if tick % self.tap_every != 0 {
            return None;
        }
        let target = self.route[self.index];
        if reached(target, px, py) {
            return None;
        }
        let (dx, dy) = (target.x as f32 - px, target.y as f32 - py);
        let (direction, distance) = if dx.abs() >= dy.abs() {
            (if dx > 0.0 { Direction::Right } else { Direction::Left }, dx.abs())
        } else {
            (if dy > 0.0 { Direction::Up } else { Direction::Down }, dy.abs())
        };

        let (ox, oy) = direction.offset();
        let speed = vx * ox as f32 + vy * oy as f32;
        if speed < CRUISE_SPEED {
            return Some(direction);
        }
        if distance < BRAKE_DISTANCE && speed > BRAKE_SPEED && self.turns_at(self.index, direction) {
            return Some(direction.opposite());
        }
        None
    }

    /// The route leaves waypoint `index` in a different direction than `arriving`
    fn turns_at(&self, index: usize, arriving: Direction) -> bool {
        match self.route.get(index + 1) {
            Some(&next) => self.route[index].direction_to(next) != Some(arriving),
            None => false,
        }
    }

    /// Keeps `index` consistent with the ball's cell, replanning when it strays
    fn follow(&mut self, cell: GridPos) {
        let window = self.index.saturating_sub(1)..=self.index;
        if self.route[window].contains(&cell) {
            return;
        }
        if let Some(ahead) = self.route[self.index..].iter().position(|&c| c == cell) {
            self.index += ahead;
            return;
        }
        match shortest_path(&self.grid, cell, self.goal) {
            Some(route) => {
                debug!("Autopilot replanned from {} ({} cells)", cell, route.len());
                self.route = route;
                self.index = 0;
            }
            None => debug!("Autopilot cannot plan from {}", cell),
        }
    }
}

fn reached(cell: GridPos, x: f32, y: f32) -> bool {
    (cell.x as f32 - x).abs() < WAYPOINT_REACHED && (cell.y as f32 - y).abs() < WAYPOINT_REACHED
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Vec3;
    use rust_maze_generator::{exit_cell, generate_seeded, ENTRANCE};
    use std::io::Cursor;

    fn pose(x: f32, y: f32) -> BallPose {
        BallPose::at(Vec3::new(x, y, 0.25))
    }

    /// 7x7: corridor y = 1 from x = 1..=5, branch up from (3, 1) to (3, 3)
    fn branched() -> Grid {
        let mut grid = Grid::filled(7);
        for x in 1..=5 {
            grid.set_wall(GridPos::new(x, 1), false).unwrap();
        }
        grid.set_wall(GridPos::new(3, 2), false).unwrap();
        grid.set_wall(GridPos::new(3, 3), false).unwrap();
        grid
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("up"), Some(Direction::Up));
        assert_eq!(parse_command("  LEFT \n"), Some(Direction::Left));
        assert_eq!(parse_command("d"), Some(Direction::Right));
        assert_eq!(parse_command("S"), Some(Direction::Down));
        assert_eq!(parse_command("jump"), None);
        assert_eq!(parse_command(""), None);
    }

    #[test]
    fn test_line_reader_forwards_commands() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let reader = spawn_line_reader(Cursor::new(b"up\nnope\n\nleft\n".to_vec()), tx).unwrap();
        assert_eq!(rx.blocking_recv(), Some(Direction::Up));
        assert_eq!(rx.blocking_recv(), Some(Direction::Left));
        assert_eq!(rx.blocking_recv(), None);
        reader.join().unwrap();
    }

    /// Blocks in `read` until released, like a terminal nobody types into
    struct HeldInput(std::sync::mpsc::Receiver<()>);

    impl Read for HeldInput {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            let _ = self.0.recv();
            Ok(0)
        }
    }

    #[test]
    fn test_idle_reader_does_not_hold_runtime_shutdown() {
        let (release, held) = std::sync::mpsc::channel();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap();
        let (reader, mut rx) = runtime.block_on(async {
            let (tx, rx) = mpsc::unbounded_channel();
            (spawn_line_reader(HeldInput(held), tx).unwrap(), rx)
        });

        let started = std::time::Instant::now();
        drop(runtime);
        assert!(started.elapsed() < std::time::Duration::from_secs(1));

        release.send(()).unwrap();
        reader.join().unwrap();
        assert_eq!(rx.blocking_recv(), None);
    }

    #[test]
    fn test_route_spans_entrance_to_exit() {
        let grid = generate_seeded(11, 5).unwrap();
        let pilot = Autopilot::new(grid, ENTRANCE, exit_cell(11)).unwrap();
        assert_eq!(pilot.route().first(), Some(&ENTRANCE));
        assert_eq!(pilot.route().last(), Some(&exit_cell(11)));
    }

    #[test]
    fn test_unreachable_goal() {
        assert!(Autopilot::new(branched(), ENTRANCE, GridPos::new(5, 5)).is_none());
    }

    #[test]
    fn test_steers_toward_next_waypoint() {
        let mut pilot = Autopilot::new(branched(), ENTRANCE, GridPos::new(5, 1)).unwrap();
        assert_eq!(pilot.next_command(&pose(1.0, 1.0)), Some(Direction::Right));
        assert_eq!(pilot.target(), GridPos::new(2, 1));
    }

    #[test]
    fn test_taps_are_spaced() {
        let mut pilot = Autopilot::new(branched(), ENTRANCE, GridPos::new(5, 1))
            .unwrap()
            .with_tap_every(3);
        let taps: Vec<bool> = (0..7)
            .map(|_| pilot.next_command(&pose(1.0, 1.0)).is_some())
            .collect();
        assert_eq!(taps, vec![true, false, false, true, false, false, true]);
    }

    #[test]
    fn test_replans_when_off_route() {
        let mut pilot = Autopilot::new(branched(), ENTRANCE, GridPos::new(5, 1)).unwrap();
        assert!(!pilot.route().contains(&GridPos::new(3, 3)));

        assert_eq!(pilot.next_command(&pose(3.0, 3.0)), Some(Direction::Down));
        assert_eq!(pilot.route().first(), Some(&GridPos::new(3, 3)));
        assert_eq!(pilot.target(), GridPos::new(3, 2));
    }

    #[test]
    fn test_holds_cruise_speed_on_straights() {
        let mut pilot = Autopilot::new(branched(), ENTRANCE, GridPos::new(5, 1))
            .unwrap()
            .with_tap_every(1);
        assert_eq!(pilot.next_command(&pose(2.5, 1.0)), Some(Direction::Right));
        // 0.05 cells per frame toward (3, 1), and the route runs straight on
        assert_eq!(pilot.next_command(&pose(2.55, 1.0)), None);
    }

    #[test]
    fn test_brakes_before_a_turn() {
        let mut pilot = Autopilot::new(branched(), ENTRANCE, GridPos::new(3, 3))
            .unwrap()
            .with_tap_every(1);
        assert_eq!(pilot.next_command(&pose(2.5, 1.0)), Some(Direction::Right));
        // Route turns up at (3, 1)
        assert_eq!(pilot.next_command(&pose(2.55, 1.0)), Some(Direction::Left));
        assert_eq!(pilot.target(), GridPos::new(3, 1));
    }

    #[test]
    fn test_skips_ahead_along_route() {
        let mut pilot = Autopilot::new(branched(), ENTRANCE, GridPos::new(5, 1)).unwrap();
        pilot.next_command(&pose(4.1, 1.0));
        assert_eq!(pilot.target(), GridPos::new(5, 1));
    }
}
