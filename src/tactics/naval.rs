//! Naval squad behavior: the ground skeleton minus the land detour, with
//! one twist in target selection -- distant enemy naval production is
//! worth sailing for even when closer targets exist.

use super::{
    cohesion_radius, go_to_home_building, should_flee, SquadState, TacticState, TickContext,
    Transition,
};
use crate::game::{Action, AgentSnapshot, Capabilities, ClosestItertools};
use crate::military;
use crate::squad::{Squad, Target};

const TARGET_SCAN_RADIUS: i32 = 10;
const ENGAGE_RADIUS: i32 = 12;
/// Enemy naval production beyond this range takes priority as a target.
const NAVAL_YARD_PRIORITY_RANGE: i32 = 20;

fn find_naval_target(squad: &Squad, ctx: &TickContext<'_>) -> Option<AgentSnapshot> {
    let members = squad.live_members(ctx.world);
    let first = members.first()?;

    // A far-off enemy naval yard is the strategic prize; nearby targets
    // are only preferred once the yard is close enough to matter.
    let yard = ctx
        .world
        .all_agents()
        .into_iter()
        .filter(|a| {
            ctx.world.are_enemies(ctx.player, a.owner)
                && a.caps.contains(Capabilities::NAVAL_PRODUCTION)
        })
        .closest_to(first.pos);
    if let Some(yard) = yard {
        if !yard.pos.in_range(first.pos, NAVAL_YARD_PRIORITY_RANGE) {
            return Some(yard);
        }
    }

    military::find_closest_attackable_enemy(ctx.world, ctx.player, &members, first.pos, None)
}

#[derive(Debug, Default)]
pub struct NavalIdle;

impl TacticState for NavalIdle {
    fn name(&self) -> &'static str {
        "naval_idle"
    }

    fn tick(&mut self, squad: &mut Squad, ctx: &mut TickContext<'_>) -> Option<Transition> {
        let members = squad.live_members(ctx.world);
        if members.is_empty() {
            return None;
        }

        if !squad.target_valid(ctx.world) {
            let target = find_naval_target(squad, ctx)?;
            squad.set_target(Target::Agent(target.id));
        }
        let target_pos = squad.target_pos(ctx.world)?;

        let enemies_near_target: Vec<AgentSnapshot> = ctx
            .world
            .agents_in_radius(target_pos, TARGET_SCAN_RADIUS)
            .into_iter()
            .filter(|a| ctx.world.are_enemies(ctx.player, a.owner))
            .collect();
        if enemies_near_target.is_empty() {
            return None;
        }

        if crate::military::power::can_attack(
            &members,
            &enemies_near_target,
            ctx.config.attack_confidence_percent,
        ) {
            for member in &members {
                ctx.orders.push(member.id, Action::AttackMove(target_pos));
            }
            Some(Transition::to(SquadState::NavalAttackMove(
                NavalAttackMove,
            )))
        } else {
            Some(Transition::to(SquadState::NavalFlee(NavalFlee)))
        }
    }
}

#[derive(Debug, Default)]
pub struct NavalAttackMove;

impl TacticState for NavalAttackMove {
    fn name(&self) -> &'static str {
        "naval_attack_move"
    }

    fn tick(&mut self, squad: &mut Squad, ctx: &mut TickContext<'_>) -> Option<Transition> {
        if !squad.target_valid(ctx.world) {
            match find_naval_target(squad, ctx) {
                Some(target) => squad.set_target(Target::Agent(target.id)),
                None => return Some(Transition::to(SquadState::NavalFlee(NavalFlee))),
            }
        }
        let target_pos = squad.target_pos(ctx.world)?;

        let members = squad.live_members(ctx.world);
        let leader = members.iter().cloned().closest_to(target_pos)?;

        // Regroup inline: halt the leader until stragglers close up.
        let radius = cohesion_radius(members.len());
        let stragglers: Vec<&AgentSnapshot> = members
            .iter()
            .filter(|m| !m.pos.in_range(leader.pos, radius))
            .collect();
        if !stragglers.is_empty() {
            ctx.orders.push(leader.id, Action::Stop);
            for straggler in stragglers {
                ctx.orders.push(straggler.id, Action::AttackMove(leader.pos));
            }
        } else if let Some(enemy) = military::find_closest_attackable_enemy(
            ctx.world,
            ctx.player,
            &members,
            leader.pos,
            Some(ENGAGE_RADIUS),
        ) {
            squad.set_target(Target::Agent(enemy.id));
            return Some(Transition::to(SquadState::NavalAttack(NavalAttack)));
        } else {
            for member in &members {
                ctx.orders.push(member.id, Action::AttackMove(target_pos));
            }
        }

        if should_flee(squad, ctx) {
            return Some(Transition::to(SquadState::NavalFlee(NavalFlee)));
        }
        None
    }
}

#[derive(Debug, Default)]
pub struct NavalAttack;

impl TacticState for NavalAttack {
    fn name(&self) -> &'static str {
        "naval_attack"
    }

    fn tick(&mut self, squad: &mut Squad, ctx: &mut TickContext<'_>) -> Option<Transition> {
        let members = squad.live_members(ctx.world);
        if !squad.target_valid(ctx.world) {
            match find_naval_target(squad, ctx) {
                Some(target) => squad.set_target(Target::Agent(target.id)),
                None => return Some(Transition::to(SquadState::NavalFlee(NavalFlee))),
            }
        }

        // Switch targets during the fight rather than overkilling one hull.
        let first = members.first()?;
        let focus = military::find_closest_attackable_enemy(
            ctx.world,
            ctx.player,
            &members,
            first.pos,
            None,
        );
        if let Some(focus) = focus {
            for member in &members {
                if member.is_idle {
                    ctx.orders.push(member.id, Action::Attack(focus.id));
                }
            }
        }

        if should_flee(squad, ctx) {
            return Some(Transition::to(SquadState::NavalFlee(NavalFlee)));
        }
        None
    }
}

#[derive(Debug, Default)]
pub struct NavalFlee;

impl TacticState for NavalFlee {
    fn name(&self) -> &'static str {
        "naval_flee"
    }

    fn tick(&mut self, squad: &mut Squad, ctx: &mut TickContext<'_>) -> Option<Transition> {
        go_to_home_building(squad, ctx);
        Some(Transition::to(SquadState::NavalIdle(NavalIdle)))
    }
}
