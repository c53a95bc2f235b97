pub mod influence;
pub mod router;

pub use influence::InfluenceMap;
pub use router::{GridPathfinder, PathProvider, PathQuery, Route, ThreatRouter};
