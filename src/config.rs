use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Immutable tuning knobs supplied by the host at construction. There is
/// no hot reload; changing settings means building a new orchestrator.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Minimum number of free-pool units before an assault squad forms.
    pub squad_size: usize,
    /// Random extra units (exclusive upper bound) added to the assault
    /// threshold each evaluation, so squads come in varied sizes.
    pub squad_size_random_bonus: u32,

    /// Ticks between role assignment passes (new units, idle harvesters).
    pub assign_roles_interval: u32,
    /// Ticks between rush attack evaluations.
    pub rush_interval: u32,
    /// Ticks between attack force creation checks.
    pub attack_force_interval: u32,
    /// Ticks between base defense scans.
    pub defense_interval: u32,
    /// Ticks between capture squad evaluations.
    pub capture_interval: u32,
    /// Ticks between production nudges.
    pub production_interval: u32,

    /// At least 1/quotient of pending orders is issued per tick.
    pub min_order_quotient_per_tick: u32,
    /// Stop nudging production while this many units idle in the base.
    pub idle_base_units_maximum: usize,

    /// Scan radius around enemy base builders when weighing a rush.
    pub rush_attack_scan_radius: i32,
    /// Scan radius around a protected victim when recruiting defenders.
    pub protect_unit_scan_radius: i32,
    /// Radius counted as "the base" around own base builders.
    pub max_base_radius: i32,
    /// Radius scanned around a sampled member by the flee heuristic.
    pub danger_radius: i32,

    /// Radius of influence painted around each known point defense. Uses
    /// a generous fixed margin rather than the weapon's true range; the
    /// detour search needs slack to produce practical avoidance.
    pub influence_scan_radius: i32,
    /// Cost multiplier for influence-covered cells. Uncovered cells cost
    /// 1, covered cells cost this times the accumulated weight.
    pub covered_cell_cost: u32,
    /// A route waypoint counts as reached once the leader is this close.
    pub waypoint_radius: i32,
    /// Stalled ticks tolerated on one route before giving up the detour.
    pub route_stall_limit: u32,
    /// Ticks a gather regroup may take before resuming the prior state.
    pub gather_stall_limit: u32,

    /// Ticks a protection squad waits on an unattackable target before
    /// giving up.
    pub protection_backoff_ticks: u32,
    /// Enemy point defenses near the target needed to prefer siege
    /// positioning.
    pub siege_defense_threshold: usize,
    /// Distance siege members hold from the target while bombarding.
    pub siege_standoff_range: i32,
    /// How far ahead of the protected agent an escort stations itself.
    pub escort_lead_cells: i32,

    /// Attack when own power * 100 >= enemy power * this.
    pub attack_confidence_percent: u32,
    /// Rush variant of the above; rushes demand a clearer advantage.
    pub rush_confidence_percent: u32,

    /// Enemy proximity radius penalized when routing idle harvesters.
    pub harvester_avoidance_radius: i32,
    /// Cap on capture candidates examined per evaluation.
    pub maximum_capture_target_options: usize,

    /// Archetypes the engine never manages at all.
    pub exclude_from_squads: HashSet<String>,
    /// Archetypes managed but kept out of attack squads.
    pub exclude_from_attack_squads: HashSet<String>,
}

impl Default for AiConfig {
    fn default() -> Self {
        AiConfig {
            squad_size: 8,
            squad_size_random_bonus: 30,
            assign_roles_interval: 20,
            rush_interval: 600,
            attack_force_interval: 30,
            defense_interval: 30,
            capture_interval: 375,
            production_interval: 30,
            min_order_quotient_per_tick: 5,
            idle_base_units_maximum: 12,
            rush_attack_scan_radius: 15,
            protect_unit_scan_radius: 15,
            max_base_radius: 20,
            danger_radius: 10,
            influence_scan_radius: 14,
            covered_cell_cost: 100,
            waypoint_radius: 5,
            route_stall_limit: 100,
            gather_stall_limit: 10,
            protection_backoff_ticks: 4,
            siege_defense_threshold: 3,
            siege_standoff_range: 8,
            escort_lead_cells: 10,
            attack_confidence_percent: 90,
            rush_confidence_percent: 120,
            harvester_avoidance_radius: 8,
            maximum_capture_target_options: 10,
            exclude_from_squads: HashSet::new(),
            exclude_from_attack_squads: HashSet::new(),
        }
    }
}

impl AiConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn at_least(field: &'static str, value: i64, minimum: i64) -> Result<(), ConfigError> {
            if value < minimum {
                return Err(ConfigError::BelowMinimum { field, minimum, value });
            }
            Ok(())
        }

        at_least("squad_size", self.squad_size as i64, 1)?;
        at_least("min_order_quotient_per_tick", self.min_order_quotient_per_tick as i64, 1)?;
        at_least("assign_roles_interval", self.assign_roles_interval as i64, 1)?;
        at_least("rush_interval", self.rush_interval as i64, 1)?;
        at_least("attack_force_interval", self.attack_force_interval as i64, 1)?;
        at_least("defense_interval", self.defense_interval as i64, 1)?;
        at_least("capture_interval", self.capture_interval as i64, 1)?;
        at_least("production_interval", self.production_interval as i64, 1)?;
        at_least("danger_radius", self.danger_radius as i64, 1)?;
        at_least("influence_scan_radius", self.influence_scan_radius as i64, 1)?;
        at_least("covered_cell_cost", self.covered_cell_cost as i64, 2)?;
        at_least("waypoint_radius", self.waypoint_radius as i64, 1)?;
        at_least("attack_confidence_percent", self.attack_confidence_percent as i64, 1)?;
        at_least("rush_confidence_percent", self.rush_confidence_percent as i64, 1)?;
        Ok(())
    }
}
