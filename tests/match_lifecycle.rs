use glam::Vec3;
use tokio::sync::broadcast::Receiver;
use uuid::Uuid;

use vrchaos_core::config::ModeSettings;
use vrchaos_core::game::host::TIME_LIMIT_TEXT;
use vrchaos_core::game::modes::{BattleMode, DecryptidMode, FreePlayMode, TagMode};
use vrchaos_core::game::r#match::MATCH_STARTED_TEXT;
use vrchaos_core::game::{
    GameMode, MatchEvent, MatchHost, MatchOutcome, MatchPhase, ModeManager, RecordingLobby,
    SessionContext, SessionError, StatusKind,
};
use vrchaos_core::net::{Broadcast, GamePlayMode, ParticipantId};

fn session(seed: u64) -> (SessionContext, RecordingLobby) {
    let lobby = RecordingLobby::new();
    (SessionContext::new(seed, Box::new(lobby.clone())), lobby)
}

/// Spawn `count` bodies far enough apart that nobody is in tag range
fn spawn_spread(ctx: &mut SessionContext, count: usize) -> Vec<ParticipantId> {
    let cfg = ctx.locomotion;
    (0..count)
        .map(|i| {
            let id = Uuid::new_v4();
            let body = ctx.spawn_body(id, (i % 4) as i32).unwrap();
            body.teleport(Vec3::new(i as f32 * 20.0, 0.0, 0.0), &cfg);
            id
        })
        .collect()
}

fn manager<M: GameMode>(rules: M, countdown: f32) -> ModeManager<M> {
    let mut settings = ModeSettings::for_mode(rules.mode());
    settings.countdown_secs = countdown;
    ModeManager::new(Uuid::new_v4(), settings, rules)
}

/// Register everyone and run the zero-second countdown to the first active tick
fn start<M: GameMode>(mgr: &mut ModeManager<M>, ctx: &mut SessionContext, ids: &[ParticipantId]) {
    for id in ids {
        assert!(mgr.register_participant(ctx, *id));
    }
    mgr.start_countdown(ctx, 0.0);
    mgr.tick(ctx);
    assert_eq!(mgr.core().phase(), MatchPhase::Active);
    ctx.clock.advance();
}

fn run_ticks<M: GameMode>(mgr: &mut ModeManager<M>, ctx: &mut SessionContext, ticks: usize) {
    for _ in 0..ticks {
        mgr.tick(ctx);
        ctx.clock.advance();
    }
}

fn drain(rx: &mut Receiver<Broadcast>) -> Vec<Broadcast> {
    let mut out = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        out.push(msg);
    }
    out
}

fn ended(messages: &[Broadcast]) -> Vec<&Broadcast> {
    messages
        .iter()
        .filter(|m| matches!(m, Broadcast::MatchEnded { .. }))
        .collect()
}

#[test]
fn tag_spreads_until_everyone_is_rabid() {
    let (mut ctx, lobby) = session(1);
    let mut rx = ctx.subscribe();
    let ids = spawn_spread(&mut ctx, 3);
    let mut mgr = manager(TagMode::new(), 0.0);

    start(&mut mgr, &mut ctx, &ids);
    assert_eq!(mgr.rules().infected().len(), 1);
    let rabid_bodies = ids
        .iter()
        .filter(|id| ctx.body(id).unwrap().is_infected())
        .count();
    assert_eq!(rabid_bodies, 1);

    mgr.tick(&mut ctx);
    assert_eq!(mgr.rules().infected().len(), 1, "nobody is in range");

    let first = mgr.rules().infected()[0];
    let rest: Vec<_> = ids.iter().copied().filter(|id| *id != first).collect();

    mgr.report_event(&mut ctx, MatchEvent::TagPlayer { participant: rest[0] });
    assert_eq!(mgr.rules().infected().len(), 2);
    // Tagging someone already rabid changes nothing
    mgr.report_event(&mut ctx, MatchEvent::TagPlayer { participant: rest[0] });
    assert_eq!(mgr.rules().infected().len(), 2);
    assert_eq!(mgr.core().phase(), MatchPhase::Active);

    mgr.report_event(&mut ctx, MatchEvent::TagPlayer { participant: rest[1] });
    assert_eq!(mgr.core().phase(), MatchPhase::Ended);
    mgr.report_event(&mut ctx, MatchEvent::TagPlayer { participant: rest[1] });

    let messages = drain(&mut rx);
    let infected = messages
        .iter()
        .filter(|m| matches!(m, Broadcast::Infected { .. }))
        .count();
    assert_eq!(infected, 3);
    let ends = ended(&messages);
    assert_eq!(ends.len(), 1);
    match ends[0] {
        Broadcast::MatchEnded { mode, winner, text } => {
            assert_eq!(*mode, GamePlayMode::Tag);
            assert_eq!(*winner, Some(rest[1]));
            assert!(text.starts_with("Match is over! We all became rabid!"));
        }
        other => panic!("unexpected {other:?}"),
    }

    assert_eq!(lobby.log().sessions_ended, 1);
    assert_eq!(ctx.body_count(), 0);
}

#[test]
fn tag_infects_by_proximity_after_the_start_tick() {
    let (mut ctx, _) = session(2);
    let ids = spawn_spread(&mut ctx, 3);
    let mut mgr = manager(TagMode::new(), 0.0);
    start(&mut mgr, &mut ctx, &ids);

    let first = mgr.rules().infected()[0];
    let victim = *ids.iter().find(|id| **id != first).unwrap();
    let cfg = ctx.locomotion;
    let near = ctx.body(&first).unwrap().position() + Vec3::new(0.5, 0.0, 0.0);
    ctx.body_mut(&victim).unwrap().teleport(near, &cfg);

    mgr.tick(&mut ctx);
    assert!(mgr.rules().is_infected(&victim));
    assert_eq!(mgr.rules().infected().len(), 2);
}

#[test]
fn registering_twice_keeps_one_entry() {
    let (mut ctx, _) = session(3);
    let ids = spawn_spread(&mut ctx, 2);
    let mut mgr = manager(BattleMode::new(), 30.0);

    assert!(mgr.register_participant(&mut ctx, ids[0]));
    assert!(!mgr.register_participant(&mut ctx, ids[0]));
    assert!(mgr.register_participant(&mut ctx, ids[1]));
    assert_eq!(mgr.core().participants().len(), 2);
}

#[test]
fn ending_twice_tears_down_once() {
    let (mut ctx, lobby) = session(4);
    let mut rx = ctx.subscribe();
    let ids = spawn_spread(&mut ctx, 2);
    let mut mgr = manager(BattleMode::new(), 0.0);
    start(&mut mgr, &mut ctx, &ids);

    let outcome = MatchOutcome {
        winner: None,
        text: "Host closed the match".into(),
    };
    assert!(mgr.end_match(&mut ctx, outcome.clone()));
    assert!(!mgr.end_match(&mut ctx, outcome));

    assert_eq!(ended(&drain(&mut rx)).len(), 1);
    let log = lobby.log();
    assert_eq!(log.sessions_ended, 1);
    assert_eq!(log.despawned.len(), 2);
    assert!(mgr.core().participants().is_empty());
}

#[test]
fn phase_only_moves_forward() {
    let (mut ctx, _) = session(5);
    let ids = spawn_spread(&mut ctx, 3);
    let mut mgr = manager(TagMode::new(), 0.5);
    let mut phases = vec![mgr.core().phase()];

    for id in &ids {
        mgr.register_participant(&mut ctx, *id);
    }
    mgr.start_countdown(&mut ctx, 0.5);
    for tick in 0..120 {
        mgr.tick(&mut ctx);
        if tick == 60 {
            // A late countdown request cannot rewind an active match
            mgr.start_countdown(&mut ctx, 10.0);
        }
        phases.push(mgr.core().phase());
        ctx.clock.advance();
    }
    for id in &ids {
        mgr.report_event(&mut ctx, MatchEvent::TagPlayer { participant: *id });
        phases.push(mgr.core().phase());
    }

    assert!(phases.windows(2).all(|w| w[0] <= w[1]), "{phases:?}");
    assert_eq!(phases.first(), Some(&MatchPhase::WaitingForPlayers));
    assert!(phases.contains(&MatchPhase::CountdownRunning));
    assert!(phases.contains(&MatchPhase::Active));
    assert_eq!(phases.last(), Some(&MatchPhase::Ended));
}

#[test]
fn countdown_announces_and_starts() {
    let (mut ctx, _) = session(6);
    let mut rx = ctx.subscribe();
    let ids = spawn_spread(&mut ctx, 2);
    let mut mgr = manager(BattleMode::new(), 3.0);
    for id in &ids {
        mgr.register_participant(&mut ctx, *id);
    }
    mgr.start_countdown(&mut ctx, 3.0);

    for _ in 0..=ctx.clock.ticks_for(3.0) {
        mgr.tick(&mut ctx);
        ctx.clock.advance();
    }
    assert_eq!(mgr.core().phase(), MatchPhase::Active);

    let messages = drain(&mut rx);
    assert_eq!(
        messages.first(),
        Some(&Broadcast::Countdown {
            seconds_remaining: 3.0
        })
    );
    assert!(messages.iter().any(|m| matches!(m, Broadcast::MatchStarted { .. })));
    assert!(messages.contains(&Broadcast::Message {
        text: MATCH_STARTED_TEXT.to_string()
    }));
}

#[test]
fn countdown_without_enough_participants_never_says_go() {
    let (mut ctx, _) = session(16);
    let mut rx = ctx.subscribe();
    let ids = spawn_spread(&mut ctx, 1);
    let mut mgr = manager(BattleMode::new(), 3.0);
    assert!(mgr.register_participant(&mut ctx, ids[0]));
    mgr.start_countdown(&mut ctx, 3.0);

    for _ in 0..ctx.clock.ticks_for(4.0) {
        mgr.tick(&mut ctx);
        ctx.clock.advance();
    }
    assert!(!mgr.core().is_started());

    let messages = drain(&mut rx);
    assert!(messages.contains(&Broadcast::Countdown {
        seconds_remaining: 3.0
    }));
    assert!(!messages.iter().any(|m| matches!(m, Broadcast::MatchStarted { .. })));
    assert!(!messages.contains(&Broadcast::Message {
        text: MATCH_STARTED_TEXT.to_string()
    }));
}

#[test]
fn full_session_compresses_countdown() {
    let (mut ctx, _) = session(7);
    let mut rx = ctx.subscribe();
    let ids = spawn_spread(&mut ctx, 3);
    let mut settings = ModeSettings::for_mode(GamePlayMode::Battle);
    settings.player_cap = 3;
    let mut mgr = ModeManager::new(Uuid::new_v4(), settings, BattleMode::new());

    mgr.register_participant(&mut ctx, ids[0]);
    mgr.register_participant(&mut ctx, ids[1]);
    mgr.start_countdown(&mut ctx, 180.0);
    assert_eq!(mgr.core().start_timer().remaining(&ctx.clock), Some(180.0));

    mgr.register_participant(&mut ctx, ids[2]);
    assert_eq!(mgr.core().start_timer().remaining(&ctx.clock), Some(60.0));
    assert_eq!(mgr.core().phase(), MatchPhase::CountdownRunning);

    // Already compressed: a later tick keeps the same deadline
    mgr.tick(&mut ctx);
    assert_eq!(mgr.core().start_timer().remaining(&ctx.clock), Some(60.0));
    assert_eq!(
        drain(&mut rx),
        vec![Broadcast::Countdown {
            seconds_remaining: 60.0
        }]
    );

    let late = Uuid::new_v4();
    assert!(!mgr.register_participant(&mut ctx, late));
}

#[test]
fn battle_three_hits_eliminate_once() {
    let (mut ctx, _) = session(8);
    let ids = spawn_spread(&mut ctx, 3);
    let (a, b, c) = (ids[0], ids[1], ids[2]);
    let mut mgr = manager(BattleMode::new(), 0.0);
    start(&mut mgr, &mut ctx, &ids);

    for expected in [2, 1, 0] {
        mgr.report_event(&mut ctx, MatchEvent::PlayerHit { victim: a, attacker: b });
        assert_eq!(mgr.rules().lives(&a), Some(expected));
    }
    assert_eq!(mgr.rules().eliminated(), &[a]);
    assert!(ctx.body(&a).unwrap().is_eliminated());

    mgr.report_event(&mut ctx, MatchEvent::PlayerHit { victim: a, attacker: c });
    assert_eq!(mgr.rules().lives(&a), Some(0));
    assert_eq!(mgr.rules().eliminated(), &[a]);
    assert_eq!(mgr.core().phase(), MatchPhase::Active);
}

#[test]
fn battle_darts_respect_invulnerability_and_ghosts() {
    let (mut ctx, _) = session(9);
    let mut rx = ctx.subscribe();
    let ids = spawn_spread(&mut ctx, 3);
    let (a, b, c) = (ids[0], ids[1], ids[2]);
    let mut mgr = manager(BattleMode::new(), 0.0);
    start(&mut mgr, &mut ctx, &ids);

    mgr.report_event(&mut ctx, MatchEvent::DartHit { victim: b, attacker: c });
    assert_eq!(mgr.rules().lives(&b), Some(2));
    assert!(ctx.body(&b).unwrap().is_invulnerable());
    assert!(ctx.body(&b).unwrap().movement_disabled());

    // Invulnerable bodies shrug off darts
    mgr.report_event(&mut ctx, MatchEvent::DartHit { victim: b, attacker: c });
    assert_eq!(mgr.rules().lives(&b), Some(2));

    for _ in 0..3 {
        mgr.report_event(&mut ctx, MatchEvent::PlayerHit { victim: a, attacker: c });
    }
    assert!(mgr.rules().is_eliminated(&a));

    // A ghost's dart only slows
    mgr.report_event(&mut ctx, MatchEvent::DartHit { victim: c, attacker: a });
    assert_eq!(mgr.rules().lives(&c), Some(3));
    assert!(ctx.body(&c).unwrap().status.is_set(StatusKind::Slowed));

    mgr.report_event(&mut ctx, MatchEvent::PlayerHit { victim: b, attacker: c });
    mgr.report_event(&mut ctx, MatchEvent::PlayerHit { victim: b, attacker: c });
    assert_eq!(mgr.core().phase(), MatchPhase::Ended);
    let ends = drain(&mut rx);
    let ends = ended(&ends);
    assert_eq!(ends.len(), 1);
    match ends[0] {
        Broadcast::MatchEnded { winner, text, .. } => {
            assert_eq!(*winner, Some(c));
            assert!(text.ends_with("wins the game and is the last Cryptid standing!"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn magic_hit_afflicts_until_the_timer_runs_out() {
    let (mut ctx, _) = session(19);
    let ids = spawn_spread(&mut ctx, 3);
    let (a, b) = (ids[0], ids[1]);
    let mut mgr = manager(BattleMode::new(), 0.0);
    start(&mut mgr, &mut ctx, &ids);
    let plain = ctx.body(&b).unwrap().nameplate();

    mgr.report_event(&mut ctx, MatchEvent::MagicHit { victim: b, attacker: a });
    let body = ctx.body(&b).unwrap();
    assert!(body.status.is_set(StatusKind::Afflicted));
    assert_eq!(body.nameplate(), format!("[Afflicted] {plain}"));
    assert_eq!(mgr.rules().lives(&b), Some(3));

    // A participant's own projectile does nothing
    mgr.report_event(&mut ctx, MatchEvent::MagicHit { victim: a, attacker: a });
    assert!(!ctx.body(&a).unwrap().status.is_set(StatusKind::Afflicted));

    // 2 s at 60 ticks per second, plus one for rounding
    let dt = ctx.clock.delta();
    for _ in 0..121 {
        for body in ctx.bodies_mut() {
            body.tick_status(dt);
        }
    }
    let body = ctx.body(&b).unwrap();
    assert!(!body.status.is_set(StatusKind::Afflicted));
    assert_eq!(body.nameplate(), plain);
}

#[test]
fn last_of_a_kind_is_buffed() {
    let (mut ctx, _) = session(10);
    let cfg = ctx.locomotion;
    let ids: Vec<_> = [0, 0, 1]
        .into_iter()
        .enumerate()
        .map(|(i, index)| {
            let id = Uuid::new_v4();
            let body = ctx.spawn_body(id, index).unwrap();
            body.teleport(Vec3::new(i as f32 * 20.0, 0.0, 0.0), &cfg);
            id
        })
        .collect();
    let mut mgr = manager(BattleMode::new(), 0.0);
    start(&mut mgr, &mut ctx, &ids);

    for _ in 0..3 {
        mgr.report_event(&mut ctx, MatchEvent::PlayerHit { victim: ids[0], attacker: ids[2] });
    }
    let survivor = ctx.body(&ids[1]).unwrap();
    assert!(survivor.status.is_set(StatusKind::Buffed));
    assert_eq!(survivor.movement_scale(&cfg), cfg.buff_multiplier);
}

#[test]
fn decryptid_captures_until_one_remains() {
    let (mut ctx, _) = session(11);
    let mut rx = ctx.subscribe();
    let ids = spawn_spread(&mut ctx, 3);
    let mut mgr = manager(DecryptidMode::new(), 0.0);
    start(&mut mgr, &mut ctx, &ids);

    for id in &ids {
        let target = mgr.rules().target_for(id).unwrap();
        assert_ne!(target, *id);
    }

    let hunter = ids[0];
    let first = mgr.rules().target_for(&hunter).unwrap();
    let bystander = *ids.iter().find(|id| **id != hunter && **id != first).unwrap();

    // Only the assigned target counts
    mgr.report_event(&mut ctx, MatchEvent::Capture { hunter, target: hunter });
    assert!(mgr.rules().captured().is_empty());

    mgr.report_event(&mut ctx, MatchEvent::Capture { hunter, target: first });
    assert_eq!(mgr.rules().captured(), &[first]);
    assert!(ctx.body(&first).unwrap().is_eliminated());
    assert_eq!(mgr.rules().target_for(&hunter), Some(bystander));
    assert_eq!(mgr.rules().target_for(&bystander), Some(hunter));

    mgr.report_event(&mut ctx, MatchEvent::Capture { hunter, target: bystander });
    assert_eq!(mgr.core().phase(), MatchPhase::Ended);

    let messages = drain(&mut rx);
    let assigned = messages
        .iter()
        .filter(|m| matches!(m, Broadcast::TargetAssigned { .. }))
        .count();
    assert!(assigned >= 3);
    match ended(&messages)[..] {
        [Broadcast::MatchEnded { winner, .. }] => assert_eq!(*winner, Some(hunter)),
        ref other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn free_play_returns_participant_after_exit_delay() {
    let (mut ctx, lobby) = session(12);
    let mut rx = ctx.subscribe();
    let ids = spawn_spread(&mut ctx, 2);
    let mut mgr = manager(FreePlayMode::new(), 0.0);
    start(&mut mgr, &mut ctx, &ids);
    drain(&mut rx);

    let leaver = ids[0];
    mgr.report_event(&mut ctx, MatchEvent::ReturnToLobbyRequest { participant: leaver });
    mgr.report_event(&mut ctx, MatchEvent::ReturnToLobbyRequest { participant: leaver });
    assert!(mgr.rules().is_leaving(&leaver));
    assert_eq!(
        drain(&mut rx),
        vec![Broadcast::ReturnToLobby { participant: leaver }]
    );

    // 0.25 s at 60 ticks per second
    for _ in 0..15 {
        mgr.tick(&mut ctx);
        assert!(lobby.log().returned.is_empty());
        ctx.clock.advance();
    }
    mgr.tick(&mut ctx);

    let log = lobby.log();
    assert_eq!(log.returned, vec![leaver]);
    assert_eq!(log.despawned, vec![leaver]);
    assert!(!mgr.core().contains(&leaver));
    assert!(ctx.body(&leaver).is_none());
    assert_eq!(mgr.core().phase(), MatchPhase::Active);
}

#[test]
fn free_play_participant_can_rejoin_and_leave_again() {
    let (mut ctx, lobby) = session(17);
    let ids = spawn_spread(&mut ctx, 2);
    let mut mgr = manager(FreePlayMode::new(), 0.0);
    start(&mut mgr, &mut ctx, &ids);
    let leaver = ids[0];

    mgr.report_event(&mut ctx, MatchEvent::ReturnToLobbyRequest { participant: leaver });
    run_ticks(&mut mgr, &mut ctx, 16);
    assert_eq!(lobby.log().returned, vec![leaver]);
    assert!(!mgr.rules().is_leaving(&leaver));

    ctx.spawn_body(leaver, 1).unwrap();
    assert!(mgr.register_participant(&mut ctx, leaver));
    mgr.report_event(&mut ctx, MatchEvent::ReturnToLobbyRequest { participant: leaver });
    assert!(mgr.rules().is_leaving(&leaver));
    run_ticks(&mut mgr, &mut ctx, 16);

    assert_eq!(lobby.log().returned, vec![leaver, leaver]);
    assert!(!mgr.core().contains(&leaver));
    assert!(!mgr.rules().is_leaving(&leaver));
}

#[test]
fn disconnecting_during_exit_cancels_the_return() {
    let (mut ctx, lobby) = session(18);
    let ids = spawn_spread(&mut ctx, 2);
    let mut mgr = manager(FreePlayMode::new(), 0.0);
    start(&mut mgr, &mut ctx, &ids);
    let leaver = ids[0];

    mgr.report_event(&mut ctx, MatchEvent::ReturnToLobbyRequest { participant: leaver });
    mgr.participant_left(&mut ctx, leaver);
    run_ticks(&mut mgr, &mut ctx, 20);

    let log = lobby.log();
    assert!(log.returned.is_empty());
    assert_eq!(log.despawned, vec![leaver]);
    assert!(!mgr.rules().is_leaving(&leaver));
    assert_eq!(mgr.core().participants(), &[ids[1]]);
}

#[test]
fn peers_without_authority_change_nothing() {
    let (mut ctx, lobby) = session(13);
    let ids = spawn_spread(&mut ctx, 2);
    let mut mgr = manager(TagMode::new(), 0.0);
    ctx.set_state_authority(false);

    assert!(!mgr.register_participant(&mut ctx, ids[0]));
    mgr.start_countdown(&mut ctx, 0.0);
    mgr.tick(&mut ctx);
    assert!(!mgr.end_match(
        &mut ctx,
        MatchOutcome {
            winner: None,
            text: "nope".into()
        }
    ));

    assert_eq!(mgr.core().phase(), MatchPhase::WaitingForPlayers);
    assert!(mgr.core().participants().is_empty());
    assert_eq!(lobby.log().sessions_ended, 0);
}

#[test]
fn leaving_before_start_frees_the_slot() {
    let (mut ctx, lobby) = session(14);
    let ids = spawn_spread(&mut ctx, 3);
    let mut mgr = manager(BattleMode::new(), 30.0);
    for id in &ids {
        mgr.register_participant(&mut ctx, *id);
    }

    mgr.participant_left(&mut ctx, ids[1]);
    assert_eq!(mgr.core().participants(), &[ids[0], ids[2]]);
    assert_eq!(mgr.rules().lives(&ids[1]), None);
    assert_eq!(lobby.log().despawned, vec![ids[1]]);
}

#[test]
fn leaving_mid_battle_can_decide_the_winner() {
    let (mut ctx, _) = session(15);
    let mut rx = ctx.subscribe();
    let ids = spawn_spread(&mut ctx, 2);
    let mut mgr = manager(BattleMode::new(), 0.0);
    start(&mut mgr, &mut ctx, &ids);

    mgr.participant_left(&mut ctx, ids[0]);
    assert_eq!(mgr.core().phase(), MatchPhase::Ended);
    match ended(&drain(&mut rx))[..] {
        [Broadcast::MatchEnded { winner, .. }] => assert_eq!(*winner, Some(ids[1])),
        ref other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn invalid_character_index_is_reported() {
    let (mut ctx, _) = session(16);
    let id = Uuid::new_v4();
    assert!(matches!(
        ctx.spawn_body(id, -1),
        Err(SessionError::InvalidCharacterIndex(-1))
    ));
    assert!(ctx.body(&id).is_none());
}

#[test]
fn host_stops_at_time_limit() {
    let lobby = RecordingLobby::new();
    let ctx = SessionContext::new(21, Box::new(lobby.clone()));
    let settings = ModeSettings::for_mode(GamePlayMode::Tag);
    let mut host = MatchHost::from_parts(ctx, GamePlayMode::Tag, settings, 5);
    for i in 0..3 {
        host.add_bot(i).unwrap();
    }

    let summary = tokio_test::block_on(host.run(std::future::pending::<()>()));

    assert_eq!(summary.phase, MatchPhase::Ended);
    assert_eq!(summary.ended_tick, 5);
    assert_eq!(summary.started_tick, None);
    let outcome = summary.outcome.unwrap();
    assert_eq!(outcome.winner, None);
    assert_eq!(outcome.text, TIME_LIMIT_TEXT);
    assert_eq!(lobby.log().sessions_ended, 1);
    assert_eq!(lobby.log().despawned.len(), 3);
}

#[tokio::test]
async fn host_honors_shutdown() {
    let lobby = RecordingLobby::new();
    let ctx = SessionContext::new(22, Box::new(lobby.clone()));
    let settings = ModeSettings::for_mode(GamePlayMode::Battle);
    let mut host = MatchHost::from_parts(ctx, GamePlayMode::Battle, settings, u64::MAX);
    host.add_bot(0).unwrap();
    host.add_bot(1).unwrap();

    let summary = host.run(async {}).await;

    assert_eq!(summary.phase, MatchPhase::Ended);
    assert!(summary.ended_tick <= 1);
    assert_eq!(lobby.log().sessions_ended, 1);
}

#[test]
fn host_runs_a_free_play_session() {
    let (ctx, _) = session(23);
    let settings = ModeSettings::for_mode(GamePlayMode::FreePlay);
    let mut host = MatchHost::from_parts(ctx, GamePlayMode::FreePlay, settings, 1_000);
    let mut rx = host.subscribe();
    let bot = host.add_bot(3).unwrap();

    assert!(host.step());
    assert_eq!(host.phase(), MatchPhase::Active);
    host.report(MatchEvent::ReturnToLobbyRequest { participant: bot });
    for _ in 0..20 {
        host.step();
    }

    assert!(host.driver().core().participants().is_empty());
    assert!(host.context().body(&bot).is_none());
    let messages = drain(&mut rx);
    assert!(messages.contains(&Broadcast::ReturnToLobby { participant: bot }));
    assert!(messages.iter().any(|m| matches!(m, Broadcast::MatchStarted { .. })));
}
