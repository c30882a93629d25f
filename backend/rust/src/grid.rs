// grid.rs - Square wall/passage occupancy grid and connectivity queries

use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::fmt;

use crate::direction::Direction;
use crate::error::{MazeError, Result};

/// Integer grid coordinate. May lie outside the grid (the exit cell does).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "[i64; 2]", into = "[i64; 2]")]
pub struct GridPos {
    pub x: i64,
    pub y: i64,
}

impl GridPos {
    #[inline]
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Nearest cell to a continuous position: `floor(v + 0.5)` per axis
    #[inline]
    pub fn round_from(x: f32, y: f32) -> Self {
        Self::new((x + 0.5).floor() as i64, (y + 0.5).floor() as i64)
    }

    #[inline]
    pub fn step(self, dir: Direction, distance: i64) -> Self {
        let (dx, dy) = dir.offset();
        Self::new(self.x + dx * distance, self.y + dy * distance)
    }

    /// Direction of a unit step from `self` to `other`, if they are 4-adjacent
    pub fn direction_to(self, other: GridPos) -> Option<Direction> {
        Direction::ALL
            .into_iter()
            .find(|dir| self.step(*dir, 1) == other)
    }
}

impl From<[i64; 2]> for GridPos {
    fn from(arr: [i64; 2]) -> Self {
        GridPos::new(arr[0], arr[1])
    }
}

impl From<GridPos> for [i64; 2] {
    fn from(p: GridPos) -> [i64; 2] {
        [p.x, p.y]
    }
}

impl From<(i64, i64)> for GridPos {
    fn from((x, y): (i64, i64)) -> Self {
        GridPos::new(x, y)
    }
}

impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Maze occupancy grid indexed `[x][y]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GridData")]
pub struct Grid {
    dimension: usize,
    cells: Vec<Vec<bool>>,
}

/// Unchecked wire form; squareness is enforced on the way in
#[derive(Deserialize)]
struct GridData {
    dimension: usize,
    cells: Vec<Vec<bool>>,
}

impl TryFrom<GridData> for Grid {
    type Error = MazeError;

    fn try_from(data: GridData) -> Result<Self> {
        let grid = Grid::from_cells(data.cells)?;
        if grid.dimension != data.dimension {
            return Err(MazeError::NotSquare {
                column: 0,
                len: grid.dimension,
                dimension: data.dimension,
            });
        }
        Ok(grid)
    }
}

impl Grid {
    /// All-wall grid
    pub fn filled(dimension: usize) -> Self {
        Self {
            dimension,
            cells: vec![vec![true; dimension]; dimension],
        }
    }

    /// Build from explicit columns (`cells[x][y]`). Rows must be square.
    pub fn from_cells(cells: Vec<Vec<bool>>) -> Result<Self> {
        let dimension = cells.len();
        if let Some((x, column)) = cells.iter().enumerate().find(|(_, c)| c.len() != dimension) {
            return Err(MazeError::NotSquare {
                column: x,
                len: column.len(),
                dimension,
            });
        }
        Ok(Self { dimension, cells })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn cells(&self) -> &[Vec<bool>] {
        &self.cells
    }

    #[inline]
    pub fn contains(&self, pos: GridPos) -> bool {
        let d = self.dimension as i64;
        (0..d).contains(&pos.x) && (0..d).contains(&pos.y)
    }

    /// True only for in-bounds wall cells; everything outside the grid is open space.
    #[inline]
    pub fn is_wall(&self, pos: GridPos) -> bool {
        self.contains(pos) && self.cells[pos.x as usize][pos.y as usize]
    }

    /// In-bounds passage cell
    #[inline]
    pub fn is_open(&self, pos: GridPos) -> bool {
        self.contains(pos) && !self.cells[pos.x as usize][pos.y as usize]
    }

    pub fn set_wall(&mut self, pos: GridPos, wall: bool) -> Result<()> {
        if !self.contains(pos) {
            return Err(MazeError::OutOfBounds {
                x: pos.x,
                y: pos.y,
                dimension: self.dimension,
            });
        }
        self.cells[pos.x as usize][pos.y as usize] = wall;
        Ok(())
    }

    pub fn open_cells(&self) -> impl Iterator<Item = GridPos> + '_ {
        self.cells.iter().enumerate().flat_map(|(x, column)| {
            column
                .iter()
                .enumerate()
                .filter(|(_, wall)| !**wall)
                .map(move |(y, _)| GridPos::new(x as i64, y as i64))
        })
    }

    pub fn open_neighbors(&self, pos: GridPos) -> impl Iterator<Item = GridPos> + '_ {
        Direction::ALL
            .into_iter()
            .map(move |dir| pos.step(dir, 1))
            .filter(|n| self.is_open(*n))
    }

    /// Open cells 4-connected to `start` (empty if `start` is a wall)
    pub fn reachable_from(&self, start: GridPos) -> HashSet<GridPos> {
        let mut seen = HashSet::new();
        if !self.is_open(start) {
            return seen;
        }

        let mut queue = VecDeque::from([start]);
        seen.insert(start);
        while let Some(current) = queue.pop_front() {
            for next in self.open_neighbors(current) {
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        seen
    }

    /// Number of adjacent open/open pairs
    pub fn passage_edge_count(&self) -> usize {
        self.open_cells()
            .map(|p| {
                [Direction::Right, Direction::Up]
                    .into_iter()
                    .filter(|dir| self.is_open(p.step(*dir, 1)))
                    .count()
            })
            .sum()
    }

    /// Every open cell reachable from `entrance` and no cycles among them
    pub fn is_perfect(&self, entrance: GridPos) -> bool {
        let reachable = self.reachable_from(entrance);
        let open = self.open_cells().count();
        !reachable.is_empty()
            && reachable.len() == open
            && self.passage_edge_count() + 1 == open
    }

    /// Open cells with exactly one open neighbor
    pub fn dead_ends(&self) -> Vec<GridPos> {
        self.open_cells()
            .filter(|p| self.open_neighbors(*p).count() == 1)
            .collect()
    }

    /// Top-down text view, `y` growing upwards. `#` wall, ` ` passage.
    pub fn to_ascii(&self, marks: &[(GridPos, char)]) -> String {
        let mut out = String::with_capacity((self.dimension + 1) * self.dimension);
        for y in (0..self.dimension as i64).rev() {
            for x in 0..self.dimension as i64 {
                let pos = GridPos::new(x, y);
                let symbol = marks
                    .iter()
                    .find(|(p, _)| *p == pos)
                    .map(|(_, c)| *c)
                    .unwrap_or(if self.is_wall(pos) { '#' } else { ' ' });
                out.push(symbol);
            }
            out.push('\n');
        }
        out
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_ascii(&[]))
    }
}
