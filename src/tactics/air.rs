//! Air squad behavior. Aircraft are fragile and fast: they only commit
//! where no anti-air presence is known, and their damage reaction runs
//! outside the normal tick cadence (see `Squad::on_damage`).

use super::{go_to_home_building, SquadState, TacticState, TickContext, Transition};
use crate::game::{Action, Capabilities, CellPos};
use crate::military;
use crate::squad::{Squad, Target};

/// Whether a position is free of known anti-air coverage.
pub(crate) fn position_is_air_safe(ctx: &TickContext<'_>, pos: CellPos) -> bool {
    !ctx.world
        .agents_in_radius(pos, ctx.config.danger_radius)
        .iter()
        .any(|a| {
            ctx.world.are_enemies(ctx.player, a.owner)
                && a.caps.contains(Capabilities::ANTI_AIR)
        })
}

#[derive(Debug, Default)]
pub struct AirIdle;

impl TacticState for AirIdle {
    fn name(&self) -> &'static str {
        "air_idle"
    }

    fn tick(&mut self, squad: &mut Squad, ctx: &mut TickContext<'_>) -> Option<Transition> {
        let members = squad.live_members(ctx.world);
        let first = members.first()?;

        if !squad.target_valid(ctx.world) {
            let target = military::find_closest_attackable_enemy(
                ctx.world,
                ctx.player,
                &members,
                first.pos,
                None,
            )?;
            squad.set_target(Target::Agent(target.id));
        }
        let target_pos = squad.target_pos(ctx.world)?;

        if position_is_air_safe(ctx, target_pos) {
            Some(Transition::to(SquadState::AirAttack(AirAttack)))
        } else {
            // Covered target; wait for a better opening.
            None
        }
    }
}

#[derive(Debug, Default)]
pub struct AirAttack;

impl TacticState for AirAttack {
    fn name(&self) -> &'static str {
        "air_attack"
    }

    fn tick(&mut self, squad: &mut Squad, ctx: &mut TickContext<'_>) -> Option<Transition> {
        let members = squad.live_members(ctx.world);
        let center = squad.center(ctx.world)?;

        if !squad.target_valid(ctx.world) {
            match military::find_closest_attackable_enemy(
                ctx.world,
                ctx.player,
                &members,
                center,
                None,
            ) {
                Some(target) => squad.set_target(Target::Agent(target.id)),
                None => return Some(Transition::to(SquadState::AirFlee(AirFlee))),
            }
        }

        if !position_is_air_safe(ctx, center) {
            return Some(Transition::to(SquadState::AirFlee(AirFlee)));
        }

        let target = squad.target_agent(ctx.world)?;
        for member in &members {
            if member.is_idle {
                ctx.orders.push(member.id, Action::Attack(target.id));
            }
        }
        None
    }
}

#[derive(Debug, Default)]
pub struct AirFlee;

impl TacticState for AirFlee {
    fn name(&self) -> &'static str {
        "air_flee"
    }

    fn tick(&mut self, squad: &mut Squad, ctx: &mut TickContext<'_>) -> Option<Transition> {
        go_to_home_building(squad, ctx);
        Some(Transition::to(SquadState::AirIdle(AirIdle)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::PlayerId;
    use crate::squad::{SquadId, SquadKind};
    use crate::testkit::{aircraft_unit, anti_air_unit, combat_unit, Harness};

    const ME: PlayerId = PlayerId(0);
    const FOE: PlayerId = PlayerId(1);

    fn air_squad(harness: &mut Harness, positions: &[CellPos]) -> Squad {
        let mut squad = Squad::new(SquadId::from_u128(2), SquadKind::Air);
        for (i, pos) in positions.iter().enumerate() {
            let id = harness.world.add_agent(aircraft_unit(120 + i as u64, ME, *pos));
            squad.add_member(id);
        }
        squad
    }

    #[test]
    fn air_squad_commits_only_against_uncovered_targets() {
        let mut harness = Harness::new();
        harness.world.set_enemies(ME, FOE);
        let victim = harness.world.add_agent(combat_unit(200, FOE, CellPos::new(40, 10)));

        let mut squad = air_squad(&mut harness, &[CellPos::new(5, 10), CellPos::new(6, 10)]);
        squad.update(&mut harness.ctx());

        assert_eq!(squad.state_name(), Some("air_attack"));
        assert!(harness
            .queued_commands()
            .iter()
            .any(|c| c.action == Action::Attack(victim)));
    }

    #[test]
    fn air_squad_waits_when_target_is_covered() {
        let mut harness = Harness::new();
        harness.world.set_enemies(ME, FOE);
        harness.world.add_agent(combat_unit(200, FOE, CellPos::new(40, 10)));
        harness.world.add_agent(anti_air_unit(201, FOE, CellPos::new(42, 10)));

        let mut squad = air_squad(&mut harness, &[CellPos::new(5, 10), CellPos::new(6, 10)]);
        squad.update(&mut harness.ctx());

        assert_eq!(squad.state_name(), Some("air_idle"));
        assert!(harness.orders.is_empty());
    }
}
