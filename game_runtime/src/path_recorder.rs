// path_recorder.rs - Compressed trace of the cells the ball has visited

use rust_maze_generator::GridPos;

/// Append-only path; a cell is only appended when it differs from the last one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathRecorder {
    cells: Vec<GridPos>,
}

impl PathRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the cell was appended
    pub fn record(&mut self, cell: GridPos) -> bool {
        if self.cells.last() == Some(&cell) {
            return false;
        }
        self.cells.push(cell);
        true
    }

    pub fn cells(&self) -> &[GridPos] {
        &self.cells
    }

    pub fn last(&self) -> Option<GridPos> {
        self.cells.last().copied()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// `[[x, y], ...]`
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.cells)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn cells(pairs: &[(i64, i64)]) -> Vec<GridPos> {
        pairs.iter().map(|&p| GridPos::from(p)).collect()
    }

    #[test]
    fn test_adjacent_duplicates_collapse() {
        let mut path = PathRecorder::new();
        for cell in cells(&[(1, 1), (1, 1), (2, 1), (2, 1), (3, 1)]) {
            path.record(cell);
        }
        assert_eq!(path.cells(), cells(&[(1, 1), (2, 1), (3, 1)]).as_slice());
    }

    #[test]
    fn test_revisits_are_kept() {
        let mut path = PathRecorder::new();
        for cell in cells(&[(1, 1), (2, 1), (1, 1), (1, 1), (2, 1)]) {
            path.record(cell);
        }
        assert_eq!(path.cells(), cells(&[(1, 1), (2, 1), (1, 1), (2, 1)]).as_slice());
    }

    #[test]
    fn test_json_shape() {
        let mut path = PathRecorder::new();
        assert!(path.record(GridPos::new(1, 1)));
        assert!(!path.record(GridPos::new(1, 1)));
        assert!(path.record(GridPos::new(1, 2)));
        assert_eq!(path.to_json().unwrap(), "[[1,1],[1,2]]");
    }

    proptest! {
        #[test]
        fn prop_no_adjacent_duplicates(steps in prop::collection::vec((0i64..4, 0i64..4), 0..200)) {
            let mut path = PathRecorder::new();
            for step in &steps {
                path.record(GridPos::from(*step));
            }
            prop_assert!(path.cells().windows(2).all(|w| w[0] != w[1]));
            prop_assert_eq!(path.is_empty(), steps.is_empty());
            prop_assert_eq!(path.last(), steps.last().map(|&p| GridPos::from(p)));
        }
    }
}
