// lib.rs - Perfect-maze generation and grid analysis
// Grids are square boolean occupancy matrices: true = wall, false = passage.

pub mod direction;
pub mod error;
pub mod generator;
pub mod grid;
pub mod solver;

pub use direction::Direction;
pub use error::{MazeError, Result};
pub use generator::{exit_cell, exit_opening, generate_seeded, MazeGenerator, ENTRANCE};
pub use grid::{Grid, GridPos};
pub use solver::shortest_path;
