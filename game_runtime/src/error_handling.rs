// error_handling.rs - Runtime error taxonomy
//
// Configuration and collaborator failures are fatal at construction; any
// error raised inside a frame stops the frame loop and is surfaced as-is.

use rust_maze_generator::MazeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GameError {
    #[error("Maze generation failed: {0}")]
    Maze(#[from] MazeError),

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Physics collaborator failed: {0}")]
    Physics(String),

    #[error("Render collaborator failed: {0}")]
    Render(String),

    #[error("Asset loading failed: {0}")]
    Assets(String),

    #[error("Solution submission failed: {0}")]
    Submission(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("Frame loop stopped before the pending submission fired")]
    LoopStopped,
}

impl GameError {
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        GameError::InvalidConfig {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GameError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maze_error_converts() {
        let err: GameError = MazeError::EvenDimension(8).into();
        assert!(matches!(err, GameError::Maze(MazeError::EvenDimension(8))));
        assert_eq!(
            err.to_string(),
            "Maze generation failed: Maze dimension must be odd, got 8"
        );
    }

    #[test]
    fn test_invalid_config_message() {
        let err = GameError::invalid_config("fps must be positive");
        assert_eq!(err.to_string(), "Invalid configuration: fps must be positive");
    }
}
