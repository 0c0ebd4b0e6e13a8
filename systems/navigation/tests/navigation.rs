use deadline_orbit_core::{Command, Event, Focus, RosterEntry, StageKey, Timestamp, WEEK_MS};
use deadline_orbit_system_navigation::{CameraNudge, Config, Navigation, SearchOutcome};
use deadline_orbit_world::{self as world, query, World};

const DAY_MS: i64 = 24 * 3600 * 1000;

fn stage(diff: i64) -> Option<Focus> {
    Some(Focus::Stage(StageKey::new(diff)))
}

/// Builds a world whose stages sit at weeks {0, 1, 2} plus one expired entity.
fn three_stage_world() -> World {
    let now = Timestamp::from_millis(500 * WEEK_MS);
    let roster = vec![
        RosterEntry::new("alice", "", now.offset_by(DAY_MS)),
        RosterEntry::new("bob", "", now.offset_by(WEEK_MS + DAY_MS)),
        RosterEntry::new("Carol", "", now.offset_by(2 * WEEK_MS + DAY_MS)),
        RosterEntry::new("bobby", "", now.offset_by(2 * WEEK_MS + DAY_MS)),
        RosterEntry::new("gone", "", now.offset_by(-DAY_MS)),
    ];
    let mut world = World::new();
    let mut events = Vec::new();
    world::apply(&mut world, Command::LoadRoster { roster, now }, &mut events);
    world
}

/// Feeds the roster classification into navigation, as the driver loop does.
fn boot(world: &World, navigation: &mut Navigation) {
    let index = query::stage_index(world);
    let events = vec![Event::RosterClassified {
        stages: index.keys().to_vec(),
        expired: query::expired(world).len(),
        smallest: index.smallest(),
    }];
    let mut commands = Vec::new();
    navigation.handle(&events, &index, &mut commands);
    assert_eq!(commands, vec![Command::SetFocus { focus: stage(0) }]);
}

#[test]
fn roster_classification_focuses_smallest_stage() {
    let world = three_stage_world();
    let index = query::stage_index(&world);
    let mut navigation = Navigation::default();
    let mut commands = Vec::new();

    navigation.handle(
        &[Event::RosterClassified {
            stages: index.keys().to_vec(),
            expired: 1,
            smallest: index.smallest(),
        }],
        &index,
        &mut commands,
    );

    assert_eq!(commands, vec![Command::SetFocus { focus: stage(0) }]);
    assert_eq!(navigation.state().focused(), stage(0));
}

#[test]
fn deltas_accumulate_associatively() {
    let world = three_stage_world();
    let index = query::stage_index(&world);

    let mut split = Navigation::default();
    let mut joined = Navigation::default();
    let mut commands = Vec::new();

    let _ = split.apply_delta(70.0, &index, &mut commands);
    let _ = split.apply_delta(-12.5, &index, &mut commands);
    let _ = joined.apply_delta(57.5, &index, &mut commands);

    assert_eq!(
        split.state().scroll_accumulator(),
        joined.state().scroll_accumulator()
    );
    assert_eq!(split.state().focused(), joined.state().focused());
}

#[test]
fn focus_changes_only_on_bucket_boundaries() {
    let world = three_stage_world();
    let index = query::stage_index(&world);
    let mut navigation = Navigation::default();
    let mut commands = Vec::new();

    assert!(navigation.apply_delta(0.0, &index, &mut commands).is_some());
    assert!(navigation.apply_delta(50.0, &index, &mut commands).is_none());
    assert!(navigation.apply_delta(50.0, &index, &mut commands).is_none());
    let change = navigation
        .apply_delta(20.0, &index, &mut commands)
        .expect("crossing 114 changes focus");

    assert_eq!(change.previous, stage(0));
    assert_eq!(change.current, stage(1));
    assert_eq!(
        commands,
        vec![
            Command::SetFocus { focus: stage(0) },
            Command::SetFocus { focus: stage(1) },
        ]
    );
}

#[test]
fn candidates_outside_range_clamp_to_edges() {
    let world = three_stage_world();
    let index = query::stage_index(&world);
    let mut navigation = Navigation::default();
    let mut commands = Vec::new();

    let _ = navigation.apply_delta(-5.0 * 114.0, &index, &mut commands);
    assert_eq!(navigation.state().focused(), stage(0));

    let _ = navigation.apply_delta(15.0 * 114.0, &index, &mut commands);
    assert_eq!(navigation.state().focused(), stage(2));
}

#[test]
fn scrolling_below_threshold_focuses_expired() {
    let world = three_stage_world();
    let index = query::stage_index(&world);
    let mut navigation = Navigation::new(Config::new(114.0, -3));
    let mut commands = Vec::new();

    let _ = navigation.apply_delta(-3.0 * 114.0, &index, &mut commands);
    assert_eq!(navigation.state().focused(), stage(0));

    let _ = navigation.apply_delta(-1.0, &index, &mut commands);
    assert_eq!(navigation.state().focused(), Some(Focus::Expired));
    assert_eq!(navigation.state().previous_focus(), stage(0));
}

#[test]
fn expired_focus_requires_expired_entities() {
    let now = Timestamp::from_millis(500 * WEEK_MS);
    let mut world = World::new();
    world::apply(
        &mut world,
        Command::LoadRoster {
            roster: vec![RosterEntry::new("alice", "", now.offset_by(DAY_MS))],
            now,
        },
        &mut Vec::new(),
    );
    let index = query::stage_index(&world);
    let mut navigation = Navigation::new(Config::new(114.0, -1));
    let mut commands = Vec::new();

    let _ = navigation.apply_delta(-50.0 * 114.0, &index, &mut commands);
    assert_eq!(navigation.state().focused(), stage(0));
}

#[test]
fn empty_world_leaves_focus_undefined() {
    let world = World::new();
    let index = query::stage_index(&world);
    let mut navigation = Navigation::default();
    let mut commands = Vec::new();

    assert!(navigation.apply_delta(400.0, &index, &mut commands).is_none());
    assert_eq!(navigation.state().focused(), None);
    assert!(commands.is_empty());
}

#[test]
fn jump_keeps_accumulator_and_nudges_camera() {
    let world = three_stage_world();
    let index = query::stage_index(&world);
    let mut navigation = Navigation::default();
    let mut commands = Vec::new();
    let _ = navigation.apply_delta(10.0, &index, &mut commands);

    let change = navigation
        .jump_to(Focus::Stage(StageKey::new(2)), true, &index, &mut commands)
        .expect("jump changes focus");

    assert_eq!(change.camera_nudge, Some(CameraNudge::Outward));
    assert_eq!(navigation.state().scroll_accumulator(), 10.0);
    assert_eq!(navigation.state().focused(), stage(2));
    assert_eq!(commands.last(), Some(&Command::SetFocus { focus: stage(2) }));
}

#[test]
fn small_scroll_after_jump_keeps_jumped_focus() {
    let world = three_stage_world();
    let mut navigation = Navigation::default();
    boot(&world, &mut navigation);
    let index = query::stage_index(&world);
    let mut commands = Vec::new();

    let _ = navigation.jump_to(Focus::Stage(StageKey::new(2)), false, &index, &mut commands);
    assert!(navigation.apply_delta(1.0, &index, &mut commands).is_none());
    assert!(navigation.apply_delta(100.0, &index, &mut commands).is_none());
    assert_eq!(navigation.state().focused(), stage(2));
    assert_eq!(commands, vec![Command::SetFocus { focus: stage(2) }]);

    let change = navigation
        .apply_delta(20.0, &index, &mut commands)
        .expect("crossing into bucket 1 refocuses");
    assert_eq!(change.previous, stage(2));
    assert_eq!(change.current, stage(1));
    assert_eq!(navigation.state().scroll_bucket(), Some(1));
}

#[test]
fn jump_to_unknown_stage_is_ignored() {
    let world = three_stage_world();
    let index = query::stage_index(&world);
    let mut navigation = Navigation::default();
    let mut commands = Vec::new();

    assert!(navigation
        .jump_to(Focus::Stage(StageKey::new(9)), false, &index, &mut commands)
        .is_none());
    assert!(commands.is_empty());
}

#[test]
fn search_is_case_insensitive_and_ordered_by_stage() {
    let world = three_stage_world();
    let entries = query::search_entries(&world);
    let navigation = Navigation::default();

    let hit = navigation.find_by_query("BOB", &entries).expect("match");
    assert_eq!(hit.login, "bob");
    assert_eq!(hit.stage, StageKey::new(1));

    let hit = navigation.find_by_query("carol", &entries).expect("match");
    assert_eq!(hit.stage, StageKey::new(2));

    assert!(navigation.find_by_query("gone", &entries).is_none());
}

#[test]
fn empty_query_restores_focus_held_before_search() {
    let world = three_stage_world();
    let mut navigation = Navigation::default();
    boot(&world, &mut navigation);
    let index = query::stage_index(&world);
    let entries = query::search_entries(&world);
    let mut commands = Vec::new();
    let _ = navigation.apply_delta(114.0, &index, &mut commands);
    assert_eq!(navigation.state().focused(), stage(1));

    let found = navigation.search("carol", &entries, &index, &mut commands);
    assert!(matches!(found, SearchOutcome::Found { .. }));
    assert_eq!(navigation.state().focused(), stage(2));

    let _ = navigation.search("alice", &entries, &index, &mut commands);
    assert_eq!(navigation.state().focused(), stage(0));

    let restored = navigation.search("", &entries, &index, &mut commands);
    assert_eq!(restored, SearchOutcome::Restored { focus: stage(1) });
    assert_eq!(navigation.state().focused(), stage(1));
    assert!(!navigation.state().search_active());
}

#[test]
fn unmatched_query_keeps_focus() {
    let world = three_stage_world();
    let index = query::stage_index(&world);
    let entries = query::search_entries(&world);
    let mut navigation = Navigation::default();
    let mut commands = Vec::new();
    let _ = navigation.apply_delta(2.0 * 114.0, &index, &mut commands);
    let before = commands.len();

    let outcome = navigation.search("zz_no_such_user", &entries, &index, &mut commands);

    assert_eq!(outcome, SearchOutcome::NotFound);
    assert_eq!(navigation.state().focused(), stage(2));
    assert_eq!(commands.len(), before);
}
