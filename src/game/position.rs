use serde::{Deserialize, Serialize};

/// A map cell coordinate. All tactical reasoning happens at cell
/// granularity; sub-cell positions are the host simulation's concern.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellPos {
    pub x: i32,
    pub y: i32,
}

impl CellPos {
    pub const fn new(x: i32, y: i32) -> Self {
        CellPos { x, y }
    }

    /// Squared planar distance to another cell. Kept squared (in i64 to
    /// avoid overflow on large maps) so callers can compare against squared
    /// radii without taking roots.
    pub fn distance_squared(self, other: CellPos) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dy = (self.y - other.y) as i64;
        dx * dx + dy * dy
    }

    /// Euclidean distance in whole cells, rounded down.
    pub fn distance_to(self, other: CellPos) -> i32 {
        (self.distance_squared(other) as f64).sqrt() as i32
    }

    /// True when `other` lies within `radius` cells of `self`.
    pub fn in_range(self, other: CellPos, radius: i32) -> bool {
        self.distance_squared(other) <= (radius as i64) * (radius as i64)
    }

    pub fn offset(self, dx: i32, dy: i32) -> CellPos {
        CellPos::new(self.x + dx, self.y + dy)
    }

    /// The eight surrounding cells.
    pub fn neighbors(self) -> [CellPos; 8] {
        [
            self.offset(-1, -1),
            self.offset(0, -1),
            self.offset(1, -1),
            self.offset(-1, 0),
            self.offset(1, 0),
            self.offset(-1, 1),
            self.offset(0, 1),
            self.offset(1, 1),
        ]
    }

    /// Adjacency in the 8-way movement sense.
    pub fn is_adjacent(self, other: CellPos) -> bool {
        if self == other {
            return false;
        }
        (self.x - other.x).abs() <= 1 && (self.y - other.y).abs() <= 1
    }

    /// Every cell within `radius` (Euclidean), scan order fixed so callers
    /// iterating the result stay deterministic.
    pub fn cells_in_radius(self, radius: i32) -> Vec<CellPos> {
        let mut cells = Vec::new();
        let r = radius.max(0);
        for dy in -r..=r {
            for dx in -r..=r {
                let cell = self.offset(dx, dy);
                if self.in_range(cell, r) {
                    cells.push(cell);
                }
            }
        }
        cells
    }

    /// Step `distance` cells from `self` toward `other`, using the same
    /// integer normalization the movement code expects. Returns `self`
    /// when the two positions coincide.
    pub fn toward(self, other: CellPos, distance: i32) -> CellPos {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let len = self.distance_to(other);
        if len == 0 {
            return self;
        }
        self.offset(distance * dx / len, distance * dy / len)
    }

    /// The point reflecting `from` through `self`. Used for reflex
    /// avoidance: moving here takes a squad directly away from an attacker.
    pub fn mirrored_away(self, from: CellPos) -> CellPos {
        CellPos::new(2 * self.x - from.x, 2 * self.y - from.y)
    }

    /// Integer-average position of a set of cells. `None` for an empty set.
    pub fn average<I: IntoIterator<Item = CellPos>>(cells: I) -> Option<CellPos> {
        let mut sum_x: i64 = 0;
        let mut sum_y: i64 = 0;
        let mut count: i64 = 0;
        for cell in cells {
            sum_x += cell.x as i64;
            sum_y += cell.y as i64;
            count += 1;
        }
        if count == 0 {
            return None;
        }
        Some(CellPos::new((sum_x / count) as i32, (sum_y / count) as i32))
    }
}
