//! Ground assault behavior: the idle → detour → attack-move → attack
//! cycle, with gather and siege excursions and flee as the pressure
//! valve. Rush squads run the same states with a different entry target.

use super::{
    cohesion_radius, go_to_home_building, pick_leader, should_flee, SquadState, TacticState,
    TickContext, Transition,
};
use crate::game::{
    Action, AgentId, AgentSnapshot, Capabilities, CellPos, ClosestItertools, MoveClass,
};
use crate::military::{self, power};
use crate::pathing::Route;
use crate::squad::{Squad, Target};

/// Radius scanned around the squad target when judging whether the fight
/// is worth picking.
const TARGET_SCAN_RADIUS: i32 = 10;
/// Radius around the leader scanned for engagement opportunities while
/// advancing.
const ENGAGE_RADIUS: i32 = 12;
/// Radius around the squad target scanned for enemy structures when
/// planning a detour.
const DETOUR_SOURCE_SCAN_RADIUS: i32 = 20;

#[derive(Debug, Default)]
pub struct GroundIdle;

impl TacticState for GroundIdle {
    fn name(&self) -> &'static str {
        "ground_idle"
    }

    fn tick(&mut self, squad: &mut Squad, ctx: &mut TickContext<'_>) -> Option<Transition> {
        let members = squad.live_members(ctx.world);
        let first = members.first()?;

        if !squad.target_valid(ctx.world) {
            let target = military::find_closest_enemy(ctx.world, ctx.player, first.pos)?;
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

        if power::can_attack(
            &members,
            &enemies_near_target,
            ctx.config.attack_confidence_percent,
        ) {
            // Enough of us gathered; start the approach.
            for member in &members {
                ctx.orders.push(member.id, Action::AttackMove(target_pos));
            }
            Some(Transition::to(SquadState::GroundDetour(
                GroundDetour::default(),
            )))
        } else {
            Some(Transition::to(SquadState::GroundFlee(GroundFlee)))
        }
    }
}

/// Follows a threat-weighted route around known point defenses. The
/// route is computed once at activation and abandoned on exit; if the
/// enemy builds more towers mid-walk, tough.
#[derive(Debug, Default)]
pub struct GroundDetour {
    route: Route,
    leader: Option<AgentId>,
    stalled: u32,
}

impl GroundDetour {
    fn advance_to_attack_move() -> Transition {
        Transition::to(SquadState::GroundAttackMove(GroundAttackMove))
    }
}

impl TacticState for GroundDetour {
    fn name(&self) -> &'static str {
        "ground_detour"
    }

    fn activate(&mut self, squad: &mut Squad, ctx: &mut TickContext<'_>) {
        self.route = plan_detour_route(squad, ctx);
        self.leader = None;
        self.stalled = 0;
    }

    fn tick(&mut self, squad: &mut Squad, ctx: &mut TickContext<'_>) -> Option<Transition> {
        if self.route.is_empty() {
            // No defenses known or nothing reachable: advance directly.
            return Some(Self::advance_to_attack_move());
        }

        let leader = match self.leader {
            Some(id) => match Some(id)
                .filter(|id| squad.has_member(*id))
                .and_then(|id| ctx.world.agent(id))
            {
                Some(leader) => leader,
                // The route was walked relative to this leader; without
                // it the plan is stale. Fall back to a direct advance.
                None => return Some(Self::advance_to_attack_move()),
            },
            None => {
                let leader = pick_leader(squad, ctx)?;
                self.leader = Some(leader.id);
                leader
            }
        };

        // Ground contact voids the sneaking plan.
        let contact = ctx
            .world
            .agents_in_radius(leader.pos, ctx.config.danger_radius)
            .into_iter()
            .filter(|a| ctx.world.are_enemies(ctx.player, a.owner))
            .any(|a| a.is_combatant() && !a.is_aircraft());
        if contact {
            return Some(Transition::to(SquadState::GroundAttack(GroundAttack)));
        }

        while let Some(waypoint) = self.route.current_waypoint() {
            if leader.pos.in_range(waypoint, ctx.config.waypoint_radius) {
                self.route.advance();
                self.stalled = 0;
                continue;
            }

            for member in squad.live_members(ctx.world) {
                ctx.orders.push(member.id, Action::Move(waypoint));
            }

            self.stalled += 1;
            if self.stalled > ctx.config.route_stall_limit {
                return Some(Self::advance_to_attack_move());
            }
            return None;
        }

        Some(Self::advance_to_attack_move())
    }
}

/// Enemy structures split into point defenses and everything else, from
/// the area the squad is actually heading into.
pub(crate) fn enemy_structures_near_objective(
    squad: &Squad,
    ctx: &TickContext<'_>,
) -> (Vec<AgentSnapshot>, Vec<AgentSnapshot>) {
    let scan_center = squad.target_pos(ctx.world).or(ctx.attack_center);
    let structures: Vec<AgentSnapshot> = match scan_center {
        Some(pos) => ctx.world.agents_in_radius(pos, DETOUR_SOURCE_SCAN_RADIUS),
        None => ctx.world.all_agents(),
    }
    .into_iter()
    .filter(|a| ctx.world.are_enemies(ctx.player, a.owner) && a.is_structure())
    .collect();

    structures
        .into_iter()
        .partition(|a| a.caps.contains(Capabilities::POINT_DEFENSE))
}

pub(crate) fn plan_detour_route(squad: &Squad, ctx: &mut TickContext<'_>) -> Route {
    let Some(center) = squad.center(ctx.world) else {
        return Route::default();
    };

    let (defenses, other_structures) = enemy_structures_near_objective(squad, ctx);
    if defenses.is_empty() || other_structures.is_empty() {
        return Route::default();
    }

    let class = pick_leader(squad, ctx)
        .map(|l| l.move_class())
        .unwrap_or(MoveClass::Ground);
    let sources: Vec<CellPos> = other_structures.iter().map(|a| a.pos).collect();
    let defense_cells: Vec<CellPos> = defenses.iter().map(|a| a.pos).collect();

    ctx.router.safe_route(
        ctx.world,
        ctx.pathfinder,
        center,
        &sources,
        &defense_cells,
        class,
    )
}

#[derive(Debug, Default)]
pub struct GroundAttackMove;

impl TacticState for GroundAttackMove {
    fn name(&self) -> &'static str {
        "ground_attack_move"
    }

    fn tick(&mut self, squad: &mut Squad, ctx: &mut TickContext<'_>) -> Option<Transition> {
        if !squad.target_valid(ctx.world) {
            let pos = squad.random_member(ctx.world, ctx.rng)?.pos;
            match military::find_closest_enemy(ctx.world, ctx.player, pos) {
                Some(enemy) => squad.set_target(Target::Agent(enemy.id)),
                None => return Some(Transition::to(SquadState::GroundFlee(GroundFlee))),
            }
        }
        let target_pos = squad.target_pos(ctx.world)?;

        let members = squad.live_members(ctx.world);
        let leader = members.iter().cloned().closest_to(target_pos)?;

        // Stragglers first; a spread-out squad trickling into a defended
        // position dies piecemeal.
        let radius = cohesion_radius(members.len());
        let gathered = members
            .iter()
            .filter(|m| m.pos.in_range(leader.pos, radius))
            .count();
        if gathered < members.len() {
            return Some(Transition::To {
                state: SquadState::GroundGather(GroundGather::default()),
                record_previous: true,
            });
        }

        let has_siege = members.iter().any(|m| m.caps.contains(Capabilities::SIEGE));
        if has_siege {
            let defended = ctx
                .world
                .agents_in_radius(target_pos, ENGAGE_RADIUS)
                .into_iter()
                .filter(|a| {
                    ctx.world.are_enemies(ctx.player, a.owner)
                        && a.caps.contains(Capabilities::POINT_DEFENSE)
                })
                .count();
            if defended >= ctx.config.siege_defense_threshold {
                return Some(Transition::to(SquadState::GroundSiege(GroundSiege)));
            }
        }

        if let Some(enemy) = military::find_closest_attackable_enemy(
            ctx.world,
            ctx.player,
            &members,
            leader.pos,
            Some(ENGAGE_RADIUS),
        ) {
            squad.set_target(Target::Agent(enemy.id));
            return Some(Transition::to(SquadState::GroundAttack(GroundAttack)));
        }

        for member in &members {
            ctx.orders.push(member.id, Action::AttackMove(target_pos));
        }

        if should_flee(squad, ctx) {
            return Some(Transition::to(SquadState::GroundFlee(GroundFlee)));
        }
        None
    }
}

/// Transient regroup: halt the leader, pull stragglers in, then resume
/// whatever the squad was doing before.
#[derive(Debug, Default)]
pub struct GroundGather {
    stalled: u32,
}

impl TacticState for GroundGather {
    fn name(&self) -> &'static str {
        "ground_gather"
    }

    fn tick(&mut self, squad: &mut Squad, ctx: &mut TickContext<'_>) -> Option<Transition> {
        let members = squad.live_members(ctx.world);
        if members.len() <= 1 {
            return Some(Transition::Revert {
                record_current: false,
            });
        }

        let anchor = squad
            .target_pos(ctx.world)
            .or_else(|| squad.center(ctx.world))?;
        let leader = members.iter().cloned().closest_to(anchor)?;
        let radius = cohesion_radius(members.len());

        let stragglers: Vec<&AgentSnapshot> = members
            .iter()
            .filter(|m| !m.pos.in_range(leader.pos, radius))
            .collect();

        if stragglers.is_empty() || self.stalled >= ctx.config.gather_stall_limit {
            return Some(Transition::Revert {
                record_current: false,
            });
        }

        ctx.orders.push(leader.id, Action::Stop);
        for straggler in stragglers {
            ctx.orders.push(straggler.id, Action::AttackMove(leader.pos));
        }
        self.stalled += 1;
        None
    }
}

/// Standoff bombardment for squads that brought artillery to a defended
/// position: siege members shell the defenses from range while the rest
/// hold at the standoff line.
#[derive(Debug, Default)]
pub struct GroundSiege;

impl TacticState for GroundSiege {
    fn name(&self) -> &'static str {
        "ground_siege"
    }

    fn tick(&mut self, squad: &mut Squad, ctx: &mut TickContext<'_>) -> Option<Transition> {
        if !squad.target_valid(ctx.world) {
            return Some(Transition::to(SquadState::GroundAttackMove(
                GroundAttackMove,
            )));
        }
        let target_pos = squad.target_pos(ctx.world)?;
        let members = squad.live_members(ctx.world);
        let center = squad.center(ctx.world)?;

        let defenses: Vec<AgentSnapshot> = ctx
            .world
            .agents_in_radius(target_pos, ENGAGE_RADIUS)
            .into_iter()
            .filter(|a| {
                ctx.world.are_enemies(ctx.player, a.owner)
                    && a.caps.contains(Capabilities::POINT_DEFENSE)
            })
            .collect();
        if defenses.len() < ctx.config.siege_defense_threshold {
            return Some(Transition::to(SquadState::GroundAttackMove(
                GroundAttackMove,
            )));
        }

        // Hostiles closing the gap turn this into a normal fight.
        let closing = military::hostiles_near(ctx.world, ctx.player, center, ctx.config.danger_radius)
            .into_iter()
            .any(|a| !a.is_aircraft());
        if closing {
            return Some(Transition::to(SquadState::GroundAttack(GroundAttack)));
        }

        let standoff = target_pos.toward(center, ctx.config.siege_standoff_range);
        for member in &members {
            if member.caps.contains(Capabilities::SIEGE) {
                if member.is_idle {
                    match defenses.iter().cloned().closest_to(member.pos) {
                        Some(defense) => ctx.orders.push(member.id, Action::Attack(defense.id)),
                        None => ctx.orders.push(member.id, Action::AttackMove(standoff)),
                    }
                }
            } else {
                ctx.orders.push(member.id, Action::Move(standoff));
            }
        }

        if should_flee(squad, ctx) {
            return Some(Transition::to(SquadState::GroundFlee(GroundFlee)));
        }
        None
    }
}

#[derive(Debug, Default)]
pub struct GroundAttack;

impl TacticState for GroundAttack {
    fn name(&self) -> &'static str {
        "ground_attack"
    }

    fn tick(&mut self, squad: &mut Squad, ctx: &mut TickContext<'_>) -> Option<Transition> {
        if !squad.target_valid(ctx.world) {
            let pos = squad.random_member(ctx.world, ctx.rng)?.pos;
            match military::find_closest_enemy(ctx.world, ctx.player, pos) {
                Some(enemy) => squad.set_target(Target::Agent(enemy.id)),
                None => return Some(Transition::to(SquadState::GroundFlee(GroundFlee))),
            }
        }

        for member in squad.live_members(ctx.world) {
            if !member.is_idle {
                continue;
            }
            let member_slice = [member.clone()];
            if let Some(enemy) = military::find_closest_attackable_enemy(
                ctx.world,
                ctx.player,
                &member_slice,
                member.pos,
                None,
            ) {
                ctx.orders.push(member.id, Action::Attack(enemy.id));
            }
        }

        if should_flee(squad, ctx) {
            return Some(Transition::to(SquadState::GroundFlee(GroundFlee)));
        }
        None
    }
}

/// Pull back to a friendly structure, then start over.
#[derive(Debug, Default)]
pub struct GroundFlee;

impl TacticState for GroundFlee {
    fn name(&self) -> &'static str {
        "ground_flee"
    }

    fn tick(&mut self, squad: &mut Squad, ctx: &mut TickContext<'_>) -> Option<Transition> {
        go_to_home_building(squad, ctx);
        Some(Transition::to(SquadState::GroundIdle(GroundIdle)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::PlayerId;
    use crate::squad::{SquadId, SquadKind};
    use crate::testkit::{combat_unit, defense_structure, structure, Harness};

    const ME: PlayerId = PlayerId(0);
    const FOE: PlayerId = PlayerId(1);

    fn assault_squad(harness: &mut Harness, positions: &[CellPos]) -> Squad {
        let mut squad = Squad::new(SquadId::from_u128(1), SquadKind::GroundAssault);
        for (i, pos) in positions.iter().enumerate() {
            let id = harness.world.add_agent(combat_unit(100 + i as u64, ME, *pos));
            squad.add_member(id);
        }
        squad
    }

    #[test]
    fn idle_without_enemies_stays_idle() {
        let mut harness = Harness::new();
        let mut squad = assault_squad(&mut harness, &[CellPos::new(5, 5), CellPos::new(6, 5)]);

        squad.update(&mut harness.ctx());

        assert_eq!(squad.state_name(), Some("ground_idle"));
        assert!(harness.orders.is_empty());
    }

    #[test]
    fn detour_with_no_defenses_falls_through_to_attack_move_same_tick() {
        let mut harness = Harness::new();
        harness.world.set_enemies(ME, FOE);

        // An enemy base with units but no point defenses.
        harness.world.add_agent(structure(200, FOE, CellPos::new(50, 50)));
        harness.world.add_agent(combat_unit(201, FOE, CellPos::new(51, 50)));

        let mut squad = assault_squad(&mut harness, &[CellPos::new(5, 5), CellPos::new(6, 5)]);
        squad.update(&mut harness.ctx());

        // Idle -> Detour -> AttackMove all inside one tick, with the
        // router never consulted.
        assert_eq!(squad.state_name(), Some("ground_attack_move"));
        assert_eq!(harness.pathfinder.calls(), 0);
    }

    #[test]
    fn detour_with_defenses_computes_one_route_and_follows_it() {
        let mut harness = Harness::new();
        harness.world.set_enemies(ME, FOE);

        harness.world.add_agent(structure(200, FOE, CellPos::new(50, 30)));
        harness.world.add_agent(combat_unit(201, FOE, CellPos::new(51, 30)));
        harness.world.add_agent(defense_structure(202, FOE, CellPos::new(40, 30)));

        let mut squad = assault_squad(
            &mut harness,
            &[CellPos::new(5, 30), CellPos::new(6, 30), CellPos::new(5, 31)],
        );

        squad.update(&mut harness.ctx());
        assert_eq!(squad.state_name(), Some("ground_detour"));
        assert_eq!(harness.pathfinder.calls(), 1);
        assert!(harness
            .queued_commands()
            .iter()
            .any(|c| matches!(c.action, Action::Move(_))));

        // Following the same route next tick does not replan.
        squad.update(&mut harness.ctx());
        assert_eq!(harness.pathfinder.calls(), 1);
    }

    #[test]
    fn stalled_detour_gives_up_and_advances() {
        let mut harness = Harness::with_config(|config| {
            config.route_stall_limit = 2;
        });
        harness.world.set_enemies(ME, FOE);

        harness.world.add_agent(structure(200, FOE, CellPos::new(50, 30)));
        harness.world.add_agent(combat_unit(201, FOE, CellPos::new(51, 30)));
        harness.world.add_agent(defense_structure(202, FOE, CellPos::new(40, 30)));

        let mut squad = assault_squad(&mut harness, &[CellPos::new(5, 30), CellPos::new(6, 30)]);

        // Nobody ever moves in the fake world, so the waypoint stalls out.
        for _ in 0..4 {
            squad.update(&mut harness.ctx());
        }
        assert_eq!(squad.state_name(), Some("ground_attack_move"));
    }

    #[test]
    fn scattered_squad_gathers_then_resumes_attack_move() {
        let mut harness = Harness::new();
        harness.world.set_enemies(ME, FOE);

        harness.world.add_agent(structure(200, FOE, CellPos::new(60, 10)));
        harness.world.add_agent(combat_unit(201, FOE, CellPos::new(61, 10)));

        // Three members bunched toward the target, one far behind.
        let mut squad = assault_squad(
            &mut harness,
            &[
                CellPos::new(21, 10),
                CellPos::new(20, 10),
                CellPos::new(21, 11),
                CellPos::new(4, 10),
            ],
        );

        squad.update(&mut harness.ctx());
        assert_eq!(squad.state_name(), Some("ground_gather"));
        let commands = harness.queued_commands();
        assert!(commands.iter().any(|c| c.action == Action::Stop));
        assert!(commands
            .iter()
            .any(|c| matches!(c.action, Action::AttackMove(_))));

        // Straggler catches up; the squad resumes its advance.
        let straggler = squad.members()[3];
        harness.world.move_agent(straggler, CellPos::new(22, 10));
        squad.update(&mut harness.ctx());
        assert_eq!(squad.state_name(), Some("ground_attack_move"));
    }

    #[test]
    fn siege_members_bombard_defended_targets_from_standoff() {
        let mut harness = Harness::new();
        harness.world.set_enemies(ME, FOE);

        let base = harness.world.add_agent(structure(200, FOE, CellPos::new(60, 10)));
        for i in 0..3 {
            harness
                .world
                .add_agent(defense_structure(210 + i, FOE, CellPos::new(58 + i as i32, 12)));
        }

        let mut squad = assault_squad(
            &mut harness,
            &[CellPos::new(30, 10), CellPos::new(30, 11), CellPos::new(31, 10)],
        );
        let artillery = harness
            .world
            .add_agent(crate::testkit::siege_unit(300, ME, CellPos::new(31, 11)));
        squad.add_member(artillery);
        squad.set_target(Target::Agent(base));

        let mut machine = std::mem::take(squad.machine_mut());
        machine.change_state(
            &mut squad,
            &mut harness.ctx(),
            SquadState::GroundAttackMove(GroundAttackMove),
            false,
        );
        machine.tick(&mut squad, &mut harness.ctx());
        *squad.machine_mut() = machine;

        assert_eq!(squad.state_name(), Some("ground_siege"));
        let commands = harness.queued_commands();
        assert!(commands
            .iter()
            .any(|c| c.agent == artillery && matches!(c.action, Action::Attack(_))));
    }

    #[test]
    fn attack_orders_only_idle_members() {
        let mut harness = Harness::new();
        harness.world.set_enemies(ME, FOE);
        let enemy = harness.world.add_agent(combat_unit(200, FOE, CellPos::new(12, 10)));

        let mut squad = assault_squad(&mut harness, &[CellPos::new(10, 10), CellPos::new(10, 11)]);
        let busy = squad.members()[1];
        harness.world.set_idle(busy, false);
        squad.set_target(Target::Agent(enemy));

        let mut machine = std::mem::take(squad.machine_mut());
        machine.change_state(
            &mut squad,
            &mut harness.ctx(),
            SquadState::GroundAttack(GroundAttack),
            false,
        );
        machine.tick(&mut squad, &mut harness.ctx());
        *squad.machine_mut() = machine;

        let commands = harness.queued_commands();
        let attackers: Vec<AgentId> = commands
            .iter()
            .filter(|c| matches!(c.action, Action::Attack(_)))
            .map(|c| c.agent)
            .collect();
        assert!(!attackers.contains(&busy));
        assert!(!attackers.is_empty());
    }

    #[test]
    fn flee_moves_everyone_home_and_restarts_the_cycle() {
        let mut harness = Harness::new();
        harness.world.set_enemies(ME, FOE);
        let home = CellPos::new(3, 3);
        harness.world.add_agent(structure(50, ME, home));

        let mut squad = assault_squad(&mut harness, &[CellPos::new(10, 10), CellPos::new(11, 10)]);

        let mut machine = std::mem::take(squad.machine_mut());
        machine.change_state(
            &mut squad,
            &mut harness.ctx(),
            SquadState::GroundFlee(GroundFlee),
            false,
        );
        machine.tick(&mut squad, &mut harness.ctx());
        *squad.machine_mut() = machine;

        assert_eq!(squad.state_name(), Some("ground_idle"));
        let commands = harness.queued_commands();
        let moves = commands
            .iter()
            .filter(|c| c.action == Action::Move(home))
            .count();
        assert_eq!(moves, 2);
    }
}
