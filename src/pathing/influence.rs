use crate::game::CellPos;
use std::collections::HashMap;

/// Transient per-route-computation map of cell -> accumulated danger
/// weight around known point defenses. Built fresh for each routing call;
/// never persisted, so it cannot go stale.
#[derive(Clone, Debug, Default)]
pub struct InfluenceMap {
    weights: HashMap<CellPos, u32>,
}

impl InfluenceMap {
    /// Paint weight 1 per defense onto every cell within `scan_radius` of
    /// it. Overlapping coverage accumulates, so ground watched by several
    /// defenses is proportionally more expensive to cross.
    pub fn build<I: IntoIterator<Item = CellPos>>(defenses: I, scan_radius: i32) -> Self {
        let mut weights = HashMap::new();
        for defense in defenses {
            for cell in defense.cells_in_radius(scan_radius) {
                *weights.entry(cell).or_insert(0) += 1;
            }
        }
        InfluenceMap { weights }
    }

    pub fn weight(&self, cell: CellPos) -> u32 {
        self.weights.get(&cell).copied().unwrap_or(0)
    }

    pub fn is_covered(&self, cell: CellPos) -> bool {
        self.weight(cell) > 0
    }

    /// Movement cost of entering a cell. Covered cells cost
    /// `covered_cell_cost * weight`; the super-linear penalty makes the
    /// search strongly prefer long detours over crossing covered ground
    /// while still terminating when no uncovered path exists at all.
    pub fn movement_cost(&self, cell: CellPos, covered_cell_cost: u32) -> u32 {
        match self.weight(cell) {
            0 => 1,
            w => covered_cell_cost * w,
        }
    }

    /// Sum of weights along a sequence of cells.
    pub fn total_weight_along<'a, I: IntoIterator<Item = &'a CellPos>>(&self, cells: I) -> u64 {
        cells.into_iter().map(|c| self.weight(*c) as u64).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}
