// error.rs - Maze construction errors

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MazeError {
    #[error("Maze dimension must be odd, got {0}")]
    EvenDimension(usize),

    #[error("Maze dimension must be at least 3, got {0}")]
    TooSmall(usize),

    #[error("Cell ({x}, {y}) is outside a {dimension}x{dimension} grid")]
    OutOfBounds { x: i64, y: i64, dimension: usize },

    #[error("Grid column {column} has {len} cells, expected {dimension}")]
    NotSquare { column: usize, len: usize, dimension: usize },
}

pub type Result<T> = std::result::Result<T, MazeError>;

/// Reject dimensions the carving lattice cannot cover
pub fn validate_dimension(dimension: usize) -> Result<()> {
    if dimension < 3 {
        return Err(MazeError::TooSmall(dimension));
    }
    if dimension % 2 == 0 {
        return Err(MazeError::EvenDimension(dimension));
    }
    Ok(())
}
