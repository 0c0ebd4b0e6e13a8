use deadline_orbit_core::{
    Command, EntityId, Event, Focus, PointerButtons, Ray, RosterEntry, SlotId, Timestamp,
    VisibilityMode, NEUTRAL_SCALE, WEEK_MS,
};
use deadline_orbit_system_occupancy::{OccupancyEvent, OccupancyMap};
use deadline_orbit_system_picking::{
    pick_targets, Config, PickSignal, PickTarget, Picking, PointerPhase, PointerSample,
};
use deadline_orbit_world::{self as world, query, World};
use glam::Vec3;

const DAY_MS: i64 = 24 * 3600 * 1000;

fn loaded_world() -> World {
    let now = Timestamp::from_millis(900 * WEEK_MS);
    let roster = vec![
        RosterEntry::new("alice", "", now.offset_by(DAY_MS)).with_slot(SlotId::new("e1r1p1")),
        RosterEntry::new("gone", "", now.offset_by(-DAY_MS)),
    ];
    let mut world = World::new();
    world::apply(&mut world, Command::LoadRoster { roster, now }, &mut Vec::new());
    world
}

fn aim_at(target: &PickTarget) -> Ray {
    Ray::new(target.center + Vec3::new(0.0, 0.0, 20.0), Vec3::NEG_Z)
}

fn sample(ray: Ray, buttons: PointerButtons, phase: PointerPhase) -> PointerSample {
    PointerSample {
        ray,
        buttons,
        phase,
    }
}

fn orbiting_target(world: &World) -> PickTarget {
    let targets = pick_targets(&query::entities(world), VisibilityMode::Orbiting, &Config::default());
    assert_eq!(targets.len(), 1, "expired entity hidden while orbiting");
    targets[0].clone()
}

#[test]
fn expired_entities_pickable_only_in_overview() {
    let world = loaded_world();
    let entities = query::entities(&world);
    let config = Config::default();

    let orbiting = pick_targets(&entities, VisibilityMode::Orbiting, &config);
    let overview = pick_targets(&entities, VisibilityMode::ExpiredOverview, &config);

    assert_eq!(orbiting.len(), 1);
    assert_eq!(overview.len(), 2);
}

#[test]
fn hover_emphasis_scales_with_depth_and_resets_on_exit() {
    let world = loaded_world();
    let target = orbiting_target(&world);
    let targets = vec![target.clone()];
    let mut picking = Picking::default();
    let mut commands = Vec::new();

    let _ = picking.pointer(
        sample(aim_at(&target), PointerButtons::NONE, PointerPhase::Move),
        &targets,
        2.0,
        &mut commands,
    );
    assert_eq!(picking.hovered(), Some(target.entity));
    assert_eq!(
        commands,
        vec![Command::EmphasizeEntity {
            entity: target.entity,
            scale: 3.0,
        }]
    );

    let miss = Ray::new(Vec3::new(50.0, 50.0, 20.0), Vec3::NEG_Z);
    let _ = picking.pointer(
        sample(miss, PointerButtons::NONE, PointerPhase::Move),
        &targets,
        2.0,
        &mut commands,
    );
    assert_eq!(picking.hovered(), None);
    assert_eq!(
        commands.last(),
        Some(&Command::EmphasizeEntity {
            entity: target.entity,
            scale: NEUTRAL_SCALE,
        })
    );
}

#[test]
fn primary_click_opens_profile() {
    let world = loaded_world();
    let target = orbiting_target(&world);
    let targets = vec![target.clone()];
    let mut picking = Picking::default();
    let mut commands = Vec::new();
    let ray = aim_at(&target);

    let pressed = picking.pointer(
        sample(ray, PointerButtons::PRIMARY, PointerPhase::Down),
        &targets,
        1.0,
        &mut commands,
    );
    assert_eq!(pressed, None);

    let released = picking.pointer(
        sample(ray, PointerButtons::NONE, PointerPhase::Up),
        &targets,
        1.0,
        &mut commands,
    );
    assert_eq!(
        released,
        Some(PickSignal::OpenProfile {
            entity: target.entity,
            url: "https://profile.intra.42.fr/users/alice".to_owned(),
        })
    );
}

#[test]
fn middle_click_opens_profile_in_new_context() {
    let world = loaded_world();
    let target = orbiting_target(&world);
    let targets = vec![target.clone()];
    let mut picking = Picking::default();
    let mut commands = Vec::new();
    let ray = aim_at(&target);

    let _ = picking.pointer(
        sample(ray, PointerButtons::AUXILIARY, PointerPhase::Down),
        &targets,
        1.0,
        &mut commands,
    );
    let released = picking.pointer(
        sample(ray, PointerButtons::NONE, PointerPhase::Up),
        &targets,
        1.0,
        &mut commands,
    );
    assert!(matches!(
        released,
        Some(PickSignal::OpenProfileInNewContext { entity, .. }) if entity == target.entity
    ));
}

#[test]
fn dragging_away_before_release_produces_no_signal() {
    let world = loaded_world();
    let target = orbiting_target(&world);
    let targets = vec![target.clone()];
    let mut picking = Picking::default();
    let mut commands = Vec::new();

    let _ = picking.pointer(
        sample(aim_at(&target), PointerButtons::PRIMARY, PointerPhase::Down),
        &targets,
        1.0,
        &mut commands,
    );
    let away = Ray::new(Vec3::new(-40.0, 0.0, 20.0), Vec3::NEG_Z);
    let released = picking.pointer(
        sample(away, PointerButtons::NONE, PointerPhase::Up),
        &targets,
        1.0,
        &mut commands,
    );
    assert_eq!(released, None);
}

#[test]
fn release_with_buttons_still_held_is_not_a_click() {
    let world = loaded_world();
    let target = orbiting_target(&world);
    let targets = vec![target.clone()];
    let mut picking = Picking::default();
    let mut commands = Vec::new();
    let ray = aim_at(&target);
    let both = PointerButtons::from_bits(PointerButtons::PRIMARY.bits() | PointerButtons::SECONDARY.bits());

    let _ = picking.pointer(sample(ray, both, PointerPhase::Down), &targets, 1.0, &mut commands);
    let released = picking.pointer(
        sample(ray, PointerButtons::SECONDARY, PointerPhase::Up),
        &targets,
        1.0,
        &mut commands,
    );
    assert_eq!(released, None);
    assert_eq!(picking.last_buttons(), PointerButtons::SECONDARY);
}

#[test]
fn visibility_switch_clears_hover() {
    let world = loaded_world();
    let target = orbiting_target(&world);
    let targets = vec![target.clone()];
    let mut picking = Picking::default();
    let mut commands = Vec::new();
    let _ = picking.pointer(
        sample(aim_at(&target), PointerButtons::NONE, PointerPhase::Move),
        &targets,
        1.0,
        &mut commands,
    );
    commands.clear();

    picking.handle(
        &[Event::VisibilityModeChanged {
            mode: VisibilityMode::ExpiredOverview,
        }],
        &mut commands,
    );

    assert_eq!(picking.hovered(), None);
    assert_eq!(
        commands,
        vec![Command::EmphasizeEntity {
            entity: target.entity,
            scale: NEUTRAL_SCALE,
        }]
    );
}

#[test]
fn emphasis_commands_apply_to_world() {
    let mut world = loaded_world();
    let target = orbiting_target(&world);
    let targets = vec![target.clone()];
    let mut picking = Picking::default();
    let mut commands = Vec::new();
    let _ = picking.pointer(
        sample(aim_at(&target), PointerButtons::NONE, PointerPhase::Move),
        &targets,
        1.0,
        &mut commands,
    );

    let mut events = Vec::new();
    for command in commands {
        world::apply(&mut world, command, &mut events);
    }
    let entity = query::entity(&world, target.entity).expect("entity exists");
    assert_eq!(entity.scale, 1.5);
    assert_eq!(
        events,
        vec![Event::EntityEmphasisChanged {
            entity: target.entity,
            scale: 1.5,
        }]
    );
}

#[test]
fn popup_reads_live_occupancy_of_hovered_slot() {
    let mut world = loaded_world();
    world::apply(
        &mut world,
        Command::SetFocus {
            focus: Some(Focus::Expired),
        },
        &mut Vec::new(),
    );
    let targets = pick_targets(
        &query::entities(&world),
        query::visibility_mode(&world),
        &Config::default(),
    );
    let alice = targets
        .iter()
        .find(|target| target.entity == EntityId::new(0))
        .expect("alice is pickable")
        .clone();
    let mut occupancy = OccupancyMap::new();
    let mut picking = Picking::default();
    let mut commands = Vec::new();
    let _ = picking.pointer(
        sample(aim_at(&alice), PointerButtons::NONE, PointerPhase::Move),
        &targets,
        1.0,
        &mut commands,
    );
    assert_eq!(picking.popup(&targets, &occupancy), None);

    let _ = occupancy
        .apply_event(OccupancyEvent {
            slot: SlotId::new("e1r1p1"),
            login: "alice".to_owned(),
            portrait: "https://cdn.example/alice.jpg".to_owned(),
            left: false,
        })
        .expect("valid event");
    let popup = picking.popup(&targets, &occupancy).expect("occupied slot");
    assert_eq!(popup.login, "alice");
    assert_eq!(popup.slot, SlotId::new("e1r1p1"));
}

#[test]
fn resting_hover_follows_depth_changes() {
    let world = loaded_world();
    let target = orbiting_target(&world);
    let targets = vec![target.clone()];
    let mut picking = Picking::default();
    let mut commands = Vec::new();
    let ray = aim_at(&target);

    for depth in [1.0, 1.0, 3.0, 3.0] {
        let _ = picking.pointer(
            sample(ray, PointerButtons::NONE, PointerPhase::Move),
            &targets,
            depth,
            &mut commands,
        );
    }

    assert_eq!(
        commands,
        vec![
            Command::EmphasizeEntity {
                entity: target.entity,
                scale: 1.5,
            },
            Command::EmphasizeEntity {
                entity: target.entity,
                scale: 4.5,
            },
        ]
    );
}

#[test]
fn overview_grid_is_hit_before_orbits_underneath() {
    let world = loaded_world();
    let mut entities = query::entities(&world);
    let expired = entities
        .iter()
        .find(|entity| entity.is_expired())
        .expect("expired entity")
        .position;
    for entity in entities.iter_mut().filter(|entity| !entity.is_expired()) {
        entity.position = expired;
    }
    let targets = pick_targets(&entities, VisibilityMode::ExpiredOverview, &Config::default());
    let mut picking = Picking::default();
    let mut commands = Vec::new();

    let ray = Ray::new(expired.extend(20.0), Vec3::NEG_Z);
    let _ = picking.pointer(
        sample(ray, PointerButtons::NONE, PointerPhase::Move),
        &targets,
        1.0,
        &mut commands,
    );

    let gone = entities
        .iter()
        .find(|entity| entity.login == "gone")
        .expect("gone");
    assert_eq!(picking.hovered(), Some(gone.id));
}
