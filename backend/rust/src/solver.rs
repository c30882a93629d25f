// solver.rs - Breadth-first shortest path over open cells
//
// In a perfect maze the shortest path is the only simple path, so this is
// also "the" solution. The goal may sit just outside the grid (the exit cell),
// in which case it is accepted as a final step from an adjacent open cell.

use std::collections::{HashMap, VecDeque};

use crate::grid::{Grid, GridPos};

// --------------------------------------------
// BFS with a predecessor map
// --------------------------------------------

pub fn shortest_path(grid: &Grid, from: GridPos, to: GridPos) -> Option<Vec<GridPos>> {
    if !grid.is_open(from) {
        return None;
    }
    if from == to {
        return Some(vec![from]);
    }

    let mut previous: HashMap<GridPos, GridPos> = HashMap::new();
    let mut queue = VecDeque::from([from]);
    previous.insert(from, from);

    while let Some(current) = queue.pop_front() {
        // Off-grid goal: one step from an open cell
        if !grid.contains(to) && current.direction_to(to).is_some() {
            previous.insert(to, current);
            return Some(unwind(&previous, from, to));
        }

        for next in grid.open_neighbors(current) {
            if previous.contains_key(&next) {
                continue;
            }
            previous.insert(next, current);
            if next == to {
                return Some(unwind(&previous, from, to));
            }
            queue.push_back(next);
        }
    }

    None
}

fn unwind(previous: &HashMap<GridPos, GridPos>, from: GridPos, to: GridPos) -> Vec<GridPos> {
    let mut path = vec![to];
    let mut current = to;
    while current != from {
        current = previous[&current];
        path.push(current);
    }
    path.reverse();
    path
}
