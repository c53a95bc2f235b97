//! Infiltration squads carry capture-capable units into the enemy base
//! along the threat-weighted route, then put them to work. Infiltrators
//! never flee -- a spotted saboteur is already a sunk cost.

use super::ground::plan_detour_route;
use super::{pick_leader, TacticState, TickContext, Transition};
use crate::game::{Action, AgentId, AgentSnapshot, Capabilities, ClosestItertools};
use crate::military;
use crate::pathing::Route;
use crate::squad::{Squad, Target};
use itertools::Itertools;

/// Radius scanned around the squad for capture victims on arrival.
const CAPTURE_SCAN_RADIUS: i32 = 10;

#[derive(Debug, Default)]
pub struct InfiltrationDetour {
    route: Route,
    leader: Option<AgentId>,
    stalled: u32,
}

impl InfiltrationDetour {
    fn pick_capture_target(
        &self,
        squad: &Squad,
        ctx: &mut TickContext<'_>,
    ) -> Option<AgentSnapshot> {
        let members = squad.live_members(ctx.world);
        let capturer = members
            .iter()
            .find(|m| m.caps.contains(Capabilities::CAPTURER))?;
        let center = squad.center(ctx.world)?;

        // Least-guarded candidates first, capped before the (costly)
        // proximity pass.
        let candidates: Vec<AgentSnapshot> = ctx
            .world
            .agents_in_radius(center, CAPTURE_SCAN_RADIUS)
            .into_iter()
            .filter(|a| a.caps.contains(Capabilities::CAPTURABLE) && a.owner != ctx.player)
            .sorted_by_key(|a| (military::protection_level(ctx.world, a), a.id))
            .take(ctx.config.maximum_capture_target_options)
            .collect();

        candidates.into_iter().closest_to(capturer.pos)
    }

    fn run_capture(&mut self, squad: &mut Squad, ctx: &mut TickContext<'_>) {
        if !squad.target_valid(ctx.world) {
            match self.pick_capture_target(squad, ctx) {
                Some(target) => squad.set_target(Target::Agent(target.id)),
                None => {
                    // Nothing here worth taking; plot a fresh approach.
                    self.route = plan_detour_route(squad, ctx);
                    self.stalled = 0;
                    return;
                }
            }
        }
        let Some(target) = squad.target_agent(ctx.world) else {
            return;
        };

        for member in squad.live_members(ctx.world) {
            if member.caps.contains(Capabilities::CAPTURER) {
                ctx.orders.push(member.id, Action::Capture(target.id));
            } else {
                // Escorts "guard" the victim, which means shooting anyone
                // who interferes.
                ctx.orders.push(member.id, Action::Guard(target.id));
            }
        }
    }
}

impl TacticState for InfiltrationDetour {
    fn name(&self) -> &'static str {
        "infiltration_detour"
    }

    fn activate(&mut self, squad: &mut Squad, ctx: &mut TickContext<'_>) {
        self.route = plan_detour_route(squad, ctx);
        self.leader = None;
        self.stalled = 0;
    }

    fn tick(&mut self, squad: &mut Squad, ctx: &mut TickContext<'_>) -> Option<Transition> {
        let leader = match self
            .leader
            .filter(|id| squad.has_member(*id))
            .and_then(|id| ctx.world.agent(id))
        {
            Some(leader) => leader,
            None => {
                let leader = pick_leader(squad, ctx)?;
                self.leader = Some(leader.id);
                leader
            }
        };

        while let Some(waypoint) = self.route.current_waypoint() {
            if leader.pos.in_range(waypoint, ctx.config.waypoint_radius) {
                self.route.advance();
                self.stalled = 0;
                continue;
            }

            self.stalled += 1;
            if self.stalled > ctx.config.route_stall_limit {
                // Stuck mid-route; make do from here.
                break;
            }

            for member in squad.live_members(ctx.world) {
                ctx.orders.push(member.id, Action::Move(waypoint));
            }
            return None;
        }

        // At the destination (or as close as we are going to get).
        self.run_capture(squad, ctx);
        None
    }
}
