// generator.rs - Randomized depth-first (recursive backtracker) maze carving
//
// Carving runs on the odd-coordinate lattice with step 2, so the cell between
// two lattice cells is the wall that gets knocked out. The recursion is
// replaced by an explicit LIFO so large mazes never grow the call stack.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::direction::Direction;
use crate::error::{validate_dimension, Result};
use crate::grid::{Grid, GridPos};

/// Carving root and ball start cell
pub const ENTRANCE: GridPos = GridPos::new(1, 1);

/// Border cell forced open after carving
pub const fn exit_opening(dimension: usize) -> GridPos {
    GridPos::new(dimension as i64 - 1, dimension as i64 - 2)
}

/// Off-grid cell the ball has to reach to win, one step past the opening
pub const fn exit_cell(dimension: usize) -> GridPos {
    GridPos::new(dimension as i64, dimension as i64 - 2)
}

pub struct MazeGenerator;

impl MazeGenerator {
    /// Generate a perfect maze of side `dimension` (odd, >= 3).
    pub fn generate<R: Rng + ?Sized>(dimension: usize, rng: &mut R) -> Result<Grid> {
        validate_dimension(dimension)?;

        let mut grid = Grid::filled(dimension);
        grid.set_wall(ENTRANCE, false)?;

        let mut stack = vec![ENTRANCE];
        let mut carved = 1usize;

        while let Some(&current) = stack.last() {
            let candidates = Self::carvable_neighbors(&grid, current);

            let Some(&dir) = candidates.choose(rng) else {
                stack.pop();
                continue;
            };

            grid.set_wall(current.step(dir, 1), false)?;
            let next = current.step(dir, 2);
            grid.set_wall(next, false)?;
            stack.push(next);
            carved += 1;
        }

        grid.set_wall(exit_opening(dimension), false)?;

        log::debug!(
            "Carved {} lattice cells in a {}x{} maze",
            carved,
            dimension,
            dimension
        );
        Ok(grid)
    }

    /// Directions whose cell two steps away is an uncarved wall inside the border
    fn carvable_neighbors(grid: &Grid, from: GridPos) -> Vec<Direction> {
        let max = grid.dimension() as i64 - 2;
        Direction::ALL
            .into_iter()
            .filter(|dir| {
                let target = from.step(*dir, 2);
                (1..=max).contains(&target.x)
                    && (1..=max).contains(&target.y)
                    && grid.is_wall(target)
            })
            .collect()
    }
}

/// Deterministic generation from a seed
pub fn generate_seeded(dimension: usize, seed: u64) -> Result<Grid> {
    let mut rng = StdRng::seed_from_u64(seed);
    MazeGenerator::generate(dimension, &mut rng)
}
