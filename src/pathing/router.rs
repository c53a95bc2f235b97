use super::influence::InfluenceMap;
use crate::config::AiConfig;
use crate::game::{CellPos, MoveClass, PlayerId, WorldView};
use log::debug;
use pathfinding::prelude::dijkstra;

/// A search request against the external pathfinding service: any number
/// of seed cells, a passability predicate, a per-cell entry cost and a
/// goal predicate.
pub struct PathQuery<'a> {
    pub seeds: &'a [CellPos],
    pub passable: &'a dyn Fn(CellPos) -> bool,
    pub cost: &'a dyn Fn(CellPos) -> u32,
    pub is_goal: &'a dyn Fn(CellPos) -> bool,
}

/// The external pathfinding service. Returns the least-cost cell sequence
/// in goal-first order (goal cell at index 0, a seed cell at the end), or
/// an empty sequence when no goal is reachable.
pub trait PathProvider {
    fn find_path(&self, query: PathQuery<'_>) -> Vec<CellPos>;
}

/// Default provider: Dijkstra over the 8-connected cell grid, with a
/// virtual super-source so all seeds start the search at once.
#[derive(Clone, Copy, Debug, Default)]
pub struct GridPathfinder;

impl PathProvider for GridPathfinder {
    fn find_path(&self, query: PathQuery<'_>) -> Vec<CellPos> {
        let seeds: Vec<CellPos> = query
            .seeds
            .iter()
            .copied()
            .filter(|c| (query.passable)(*c))
            .collect();
        if seeds.is_empty() {
            return Vec::new();
        }

        // `None` is the super-source connecting to every seed.
        let result = dijkstra(
            &None::<CellPos>,
            |node| -> Vec<(Option<CellPos>, u32)> {
                match node {
                    None => seeds.iter().map(|s| (Some(*s), (query.cost)(*s))).collect(),
                    Some(cell) => cell
                        .neighbors()
                        .into_iter()
                        .filter(|n| (query.passable)(*n))
                        .map(|n| (Some(n), (query.cost)(n)))
                        .collect(),
                }
            },
            |node| matches!(node, Some(cell) if (query.is_goal)(*cell)),
        );

        match result {
            Some((nodes, _)) => {
                let mut path: Vec<CellPos> = nodes.into_iter().flatten().collect();
                path.reverse();
                path
            }
            None => Vec::new(),
        }
    }
}

/// An ordered sequence of traversable cells leading a squad toward its
/// destination. Cells are stored destination-first, so the consumer walks
/// the route from the tail: `current_waypoint` is the nearest cell and
/// `advance` pops it once reached.
#[derive(Clone, Debug, Default)]
pub struct Route {
    cells: Vec<CellPos>,
}

impl Route {
    pub fn from_cells(cells: Vec<CellPos>) -> Self {
        Route { cells }
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn current_waypoint(&self) -> Option<CellPos> {
        self.cells.last().copied()
    }

    pub fn advance(&mut self) -> Option<CellPos> {
        self.cells.pop()
    }

    pub fn cells(&self) -> &[CellPos] {
        &self.cells
    }
}

/// Computes threat-aware approach routes: paths from a set of source
/// structures toward a squad that stay out of known point-defense
/// coverage where any uncovered path exists.
#[derive(Clone, Copy, Debug)]
pub struct ThreatRouter {
    scan_radius: i32,
    covered_cell_cost: u32,
    /// Cells this close to the squad satisfy the goal predicate.
    goal_radius: i32,
}

impl ThreatRouter {
    pub fn from_config(config: &AiConfig) -> Self {
        ThreatRouter {
            scan_radius: config.influence_scan_radius,
            covered_cell_cost: config.covered_cell_cost,
            goal_radius: 2,
        }
    }

    /// Route from near the `sources` to near `squad_pos`, weighted away
    /// from `defenses`. An empty route means "no detour needed, advance
    /// directly" -- both when no defenses are known and when no path
    /// exists at all; it is never an error.
    pub fn safe_route(
        &self,
        world: &dyn WorldView,
        provider: &dyn PathProvider,
        squad_pos: CellPos,
        sources: &[CellPos],
        defenses: &[CellPos],
        class: MoveClass,
    ) -> Route {
        if defenses.is_empty() || sources.is_empty() {
            return Route::default();
        }

        let influence = InfluenceMap::build(defenses.iter().copied(), self.scan_radius);
        let passable = |cell: CellPos| world.is_passable(cell, class);
        let cost = |cell: CellPos| influence.movement_cost(cell, self.covered_cell_cost);
        let goal_radius = self.goal_radius;
        let is_goal = |cell: CellPos| cell.in_range(squad_pos, goal_radius);

        let mut path = provider.find_path(PathQuery {
            seeds: sources,
            passable: &passable,
            cost: &cost,
            is_goal: &is_goal,
        });

        if path.is_empty() {
            debug!("no safe route from {} sources, advancing directly", sources.len());
            return Route::default();
        }

        // Flip to destination-first and drop the two cells closest to the
        // source structure so units do not try to move "inside" it.
        path.reverse();
        let trim = path.len().min(2);
        path.drain(..trim);

        Route::from_cells(path)
    }

    /// Destination cell for an idle harvester: the nearest harvestable
    /// cell reachable while paying a penalty for proximity to hostiles.
    pub fn safe_resource_path(
        &self,
        world: &dyn WorldView,
        provider: &dyn PathProvider,
        player: PlayerId,
        start: CellPos,
        class: MoveClass,
        avoidance_radius: i32,
    ) -> Option<CellPos> {
        let passable = |cell: CellPos| world.is_passable(cell, class);
        let cost = |cell: CellPos| -> u32 {
            let danger: i32 = world
                .agents_in_radius(cell, avoidance_radius)
                .iter()
                .filter(|a| world.are_enemies(player, a.owner))
                .map(|a| (avoidance_radius - a.pos.distance_to(cell)).max(0))
                .sum();
            1 + danger as u32
        };
        let is_goal = |cell: CellPos| world.is_resource(cell);

        let path = provider.find_path(PathQuery {
            seeds: &[start],
            passable: &passable,
            cost: &cost,
            is_goal: &is_goal,
        });

        // Goal-first order: the first cell is the resource cell itself.
        path.first().copied()
    }
}
