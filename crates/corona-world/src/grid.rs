//! 2D occupancy grid for the world.

use corona_core::{AgentId, Error, Position, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A bounded 2D grid holding at most one agent per cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupancyGrid {
    pub width: i32,
    pub height: i32,
    cells: Vec<Option<AgentId>>,
}

impl OccupancyGrid {
    pub fn new(width: i32, height: i32) -> Self {
        let size = (width.max(0) * height.max(0)) as usize;
        Self {
            width,
            height,
            cells: vec![None; size],
        }
    }

    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.x < self.width && pos.y >= 0 && pos.y < self.height
    }

    /// Agent occupying `pos`; `None` for empty or out-of-bounds cells
    pub fn occupant(&self, pos: Position) -> Option<AgentId> {
        if self.in_bounds(pos) {
            self.cells[self.pos_to_index(pos)]
        } else {
            None
        }
    }

    /// True if `pos` is inside the grid and holds no agent
    pub fn is_empty(&self, pos: Position) -> bool {
        self.in_bounds(pos) && self.cells[self.pos_to_index(pos)].is_none()
    }

    /// Put `id` into an empty cell
    pub fn place(&mut self, id: AgentId, pos: Position) -> Result<()> {
        if !self.in_bounds(pos) {
            return Err(Error::OutOfBounds { x: pos.x, y: pos.y });
        }
        let index = self.pos_to_index(pos);
        if self.cells[index].is_some() {
            return Err(Error::CellOccupied { x: pos.x, y: pos.y });
        }
        self.cells[index] = Some(id);
        Ok(())
    }

    /// Clear a cell, returning whoever occupied it
    pub fn vacate(&mut self, pos: Position) -> Option<AgentId> {
        if !self.in_bounds(pos) {
            return None;
        }
        let index = self.pos_to_index(pos);
        self.cells[index].take()
    }

    /// Relocate `id` from `from` to `to`.
    ///
    /// The grid is left untouched on failure. Moving onto the same cell is a no-op.
    pub fn move_agent(&mut self, id: AgentId, from: Position, to: Position) -> Result<()> {
        if self.occupant(from) != Some(id) {
            return Err(Error::InvalidState(format!(
                "agent {} is not at {}",
                id, from
            )));
        }
        if from == to {
            return Ok(());
        }
        if !self.in_bounds(to) {
            return Err(Error::OutOfBounds { x: to.x, y: to.y });
        }
        let to_index = self.pos_to_index(to);
        if self.cells[to_index].is_some() {
            return Err(Error::CellOccupied { x: to.x, y: to.y });
        }
        let from_index = self.pos_to_index(from);
        self.cells[from_index] = None;
        self.cells[to_index] = Some(id);
        Ok(())
    }

    /// Chebyshev neighbourhood of `pos` in row-major order, clipped to the grid.
    ///
    /// The centre cell is included; callers skip it when they need to.
    pub fn neighborhood(
        &self,
        pos: Position,
        radius: i32,
    ) -> impl Iterator<Item = (Position, Option<AgentId>)> + '_ {
        let x_from = (pos.x - radius).max(0);
        let x_to = (pos.x + radius + 1).min(self.width);
        let y_from = (pos.y - radius).max(0);
        let y_to = (pos.y + radius + 1).min(self.height);

        (y_from..y_to).flat_map(move |y| {
            (x_from..x_to).map(move |x| {
                let p = Position::new(x, y);
                (p, self.cells[self.pos_to_index(p)])
            })
        })
    }

    /// Number of empty cells in the clipped 3x3 block around `pos`
    pub fn empty_count(&self, pos: Position) -> usize {
        self.neighborhood(pos, 1)
            .filter(|(_, cell)| cell.is_none())
            .count()
    }

    /// Iterator over all empty positions
    pub fn empty_cells(&self) -> impl Iterator<Item = Position> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_none())
            .map(move |(i, _)| self.index_to_pos(i))
    }

    /// Pick a uniformly random empty cell, or `None` if the grid is full
    pub fn random_empty_cell<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Position> {
        let empty = self.cells.iter().filter(|cell| cell.is_none()).count();
        if empty == 0 {
            return None;
        }
        let nth = rng.gen_range(0..empty);
        self.empty_cells().nth(nth)
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_some()).count()
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    fn pos_to_index(&self, pos: Position) -> usize {
        (pos.y * self.width + pos.x) as usize
    }

    /// Get position from index
    pub fn index_to_pos(&self, index: usize) -> Position {
        let x = (index as i32) % self.width;
        let y = (index as i32) / self.width;
        Position::new(x, y)
    }

    /// Iterator over all cells with positions
    pub fn iter(&self) -> impl Iterator<Item = (Position, Option<AgentId>)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, cell)| (self.index_to_pos(i), *cell))
    }
}
