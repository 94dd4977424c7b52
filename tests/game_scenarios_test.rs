// Game Scenario Tests
// Drives complete games on a paused clock: claims, penalties, stale claims,
// reshuffles, natural game over and termination from every agent phase

use set_arena::{
    AgentHandle, AgentId, AgentPhase, Card, FreezeKind, Game, GameBuilder, GameConfig, NullSink,
    Oracle, ResidueOracle, Slot, TableConfig,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Qualifies exactly the listed id groups and counts judgement calls.
struct GroupList {
    groups: Vec<Vec<u32>>,
    calls: Arc<AtomicUsize>,
}

impl GroupList {
    fn new(groups: &[&[u32]]) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let oracle = Self {
            groups: groups.iter().map(|group| group.to_vec()).collect(),
            calls: Arc::clone(&calls),
        };
        (oracle, calls)
    }
}

impl Oracle for GroupList {
    fn is_qualifying_group(&self, cards: &[Card]) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut ids: Vec<u32> = cards.iter().map(|card| card.0).collect();
        ids.sort_unstable();
        self.groups.iter().any(|group| *group == ids)
    }

    fn any_qualifying_group_exists(&self, pool: &[Card]) -> bool {
        self.groups
            .iter()
            .any(|group| group.iter().all(|id| pool.contains(&Card(*id))))
    }
}

/// Four slots, groups of three, a four card deck
fn small_config(humans: usize) -> GameConfig {
    let mut config = GameConfig::default();
    config.table = TableConfig {
        slots: 4,
        group_size: 3,
        deck_size: 4,
    };
    config.players.human = humans;
    config.players.autonomous = 0;
    config.seed = Some(7);
    config
}

fn start(config: GameConfig, oracle: impl Oracle + 'static) -> Game {
    GameBuilder::new(config)
        .oracle(oracle)
        .sink(Arc::new(NullSink))
        .start()
        .expect("game should start")
}

/// Wait until the board holds `cards` cards
async fn wait_populated(game: &Game, cards: usize) {
    let table = game.table();
    while table.lock().await.board.count_cards() != cards {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

/// Wait for the initial fill and return the slot holding each card id
async fn card_slots(game: &Game, cards: u32) -> Vec<Slot> {
    wait_populated(game, cards as usize).await;
    let table = game.table();
    let table = table.lock().await;
    (0..cards)
        .map(|id| table.board.slot_of(Card(id)).expect("card on board"))
        .collect()
}

fn press(agent: &AgentHandle, slots: &[Slot]) {
    for slot in slots {
        assert!(agent.handle_input(*slot), "press on slot {slot} accepted");
    }
}

/// Let agent tasks drain their input queues
async fn settle() {
    tokio::time::sleep(Duration::from_millis(5)).await;
}

#[tokio::test(start_paused = true)]
async fn test_qualifying_claim_empties_slots_and_scores() {
    let (oracle, calls) = GroupList::new(&[&[0, 1, 2]]);
    let game = start(small_config(1), oracle);
    let slots = card_slots(&game, 4).await;
    let agent = &game.agents()[0];

    press(agent, &[slots[0], slots[1], slots[2]]);

    let phase = agent
        .wait_for_phase(|p| p == AgentPhase::Frozen(FreezeKind::Point))
        .await;
    assert_eq!(phase, AgentPhase::Frozen(FreezeKind::Point));
    assert_eq!(agent.score(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    {
        let table = game.table();
        let table = table.lock().await;
        assert_eq!(table.board.count_cards(), 1, "deck exhausted, no replacements");
        assert_eq!(table.board.card_at(slots[3]), Some(Card(3)));
        assert_eq!(table.consumed().len(), 3);
        assert_eq!(table.total_cards(), 4);
    }

    agent.wait_for_phase(|p| p == AgentPhase::Open).await;
    assert_eq!(
        game.table().lock().await.board.marker_count(AgentId(0)),
        0,
        "markers cleared after the point freeze"
    );

    let outcome = game.terminate().await.unwrap();
    assert_eq!(outcome.score_of(AgentId(0)), Some(1));
}

#[tokio::test(start_paused = true)]
async fn test_rejected_claim_freezes_without_board_change() {
    let (oracle, calls) = GroupList::new(&[&[0, 1, 2]]);
    let mut config = small_config(1);
    config.timing.penalty_freeze_ms = 3_000;
    let game = start(config, oracle);
    let slots = card_slots(&game, 4).await;
    let agent = &game.agents()[0];

    press(agent, &[slots[0], slots[1], slots[3]]);
    agent
        .wait_for_phase(|p| p == AgentPhase::Frozen(FreezeKind::Penalty))
        .await;
    let frozen_at = tokio::time::Instant::now();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!agent.handle_input(slots[2]), "frozen agents drop input");

    agent.wait_for_phase(|p| p == AgentPhase::Open).await;
    assert!(tokio::time::Instant::now() - frozen_at >= Duration::from_millis(2_900));
    assert_eq!(agent.score(), 0);
    {
        let table = game.table();
        let table = table.lock().await;
        assert_eq!(table.board.count_cards(), 4);
        assert!(table.consumed().is_empty());
        assert_eq!(
            table.board.markers_of(AgentId(0)),
            &[slots[0], slots[1], slots[3]],
            "markers survive a penalty"
        );
    }

    // Un-marking after the freeze works as usual
    press(agent, &[slots[3]]);
    settle().await;
    assert_eq!(game.table().lock().await.board.marker_count(AgentId(0)), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    game.terminate().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_incomplete_group_never_submits() {
    let (oracle, calls) = GroupList::new(&[&[0, 1, 2]]);
    let game = start(small_config(1), oracle);
    let slots = card_slots(&game, 4).await;
    let agent = &game.agents()[0];

    press(agent, &[slots[0], slots[1]]);
    settle().await;
    press(agent, &[slots[1]]);
    settle().await;

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(agent.phase(), AgentPhase::Open);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        game.table().lock().await.board.markers_of(AgentId(0)),
        &[slots[0]]
    );

    game.terminate().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_competing_claim_releases_the_loser() {
    let (oracle, calls) = GroupList::new(&[&[0, 1, 2], &[1, 2, 3]]);
    let game = start(small_config(2), oracle);
    let slots = card_slots(&game, 4).await;
    let (first, second) = (&game.agents()[0], &game.agents()[1]);

    // Both go for groups sharing two cards; only one can be rewarded
    press(first, &[slots[0], slots[1], slots[2]]);
    press(second, &[slots[1], slots[2], slots[3]]);

    while first.score() + second.score() == 0 {
        settle().await;
    }
    let (winner, loser) = if first.score() == 1 {
        (first, second)
    } else {
        (second, first)
    };
    loser.wait_for_phase(|p| p == AgentPhase::Open).await;
    settle().await;

    assert_eq!(winner.score() + loser.score(), 1);
    assert_eq!(winner.phase(), AgentPhase::Frozen(FreezeKind::Point));
    assert_eq!(calls.load(Ordering::SeqCst), 1, "stale claim never reaches the oracle");
    {
        let table = game.table();
        let table = table.lock().await;
        assert_eq!(table.board.marker_count(loser.id()), 1);
        assert_eq!(table.board.count_cards(), 1);
    }

    game.terminate().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_game_ends_when_no_group_is_left() {
    let (oracle, _calls) = GroupList::new(&[&[0, 1, 2]]);
    let game = start(small_config(2), oracle);
    let slots = card_slots(&game, 4).await;
    let agents: Vec<AgentHandle> = game.agents().to_vec();

    press(&agents[1], &[slots[2], slots[0], slots[1]]);
    agents[1]
        .wait_for_phase(|p| matches!(p, AgentPhase::Frozen(_)))
        .await;

    let outcome = game.wait().await.unwrap();
    assert!(!outcome.terminated);
    assert_eq!(outcome.winners, Some(vec![AgentId(1)]));
    assert_eq!(outcome.scores, vec![(AgentId(0), 0), (AgentId(1), 1)]);
    assert_eq!(outcome.cards_consumed, 3);
    assert_eq!(outcome.rounds, 1);
    for agent in &agents {
        assert_eq!(agent.phase(), AgentPhase::Closed);
    }
}

#[tokio::test(start_paused = true)]
async fn test_tied_scores_are_co_winners() {
    let (oracle, calls) = GroupList::new(&[]);
    let game = start(small_config(3), oracle);

    let outcome = game.wait().await.unwrap();
    assert_eq!(
        outcome.winners,
        Some(vec![AgentId(0), AgentId(1), AgentId(2)])
    );
    assert_eq!(outcome.rounds, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_reshuffles_and_repopulates() {
    let (oracle, _calls) = GroupList::new(&[&[0, 1, 2]]);
    let mut config = small_config(1);
    config.table.deck_size = 6;
    config.timing.round_ms = 1_000;
    let game = start(config, oracle);
    wait_populated(&game, 4).await;

    tokio::time::sleep(Duration::from_millis(3_500)).await;
    {
        let table = game.table();
        let table = table.lock().await;
        assert_eq!(table.board.count_cards(), 4);
        assert_eq!(table.deck.len(), 2);
        assert_eq!(table.total_cards(), 6);
    }

    let outcome = game.terminate().await.unwrap();
    assert!(outcome.terminated);
    assert_eq!(outcome.winners, None);
    assert!(outcome.rounds >= 3, "rounds: {}", outcome.rounds);
}

#[tokio::test(start_paused = true)]
async fn test_terminate_wakes_agents_in_every_phase() {
    let (oracle, _calls) = GroupList::new(&[&[0, 1, 2]]);
    let mut config = small_config(3);
    config.timing.point_freeze_ms = 30_000;
    config.timing.penalty_freeze_ms = 30_000;
    let game = start(config, oracle);
    let slots = card_slots(&game, 4).await;
    let agents: Vec<AgentHandle> = game.agents().to_vec();

    press(&agents[0], &[slots[0], slots[1], slots[2]]);
    agents[0]
        .wait_for_phase(|p| p == AgentPhase::Frozen(FreezeKind::Point))
        .await;
    press(&agents[1], &[slots[3]]);
    settle().await;
    assert_eq!(
        game.table().lock().await.board.markers_of(AgentId(1)),
        &[slots[3]]
    );
    assert_eq!(agents[1].phase(), AgentPhase::Open);
    assert_eq!(agents[2].phase(), AgentPhase::Open);

    let outcome = game.terminate().await.unwrap();
    assert!(outcome.terminated);
    for agent in &agents {
        assert_eq!(agent.phase(), AgentPhase::Closed, "{} joined", agent.id());
        assert!(!agent.handle_input(0));
    }
}

#[tokio::test(start_paused = true)]
async fn test_terminate_during_penalty_freeze() {
    let (oracle, _calls) = GroupList::new(&[]);
    let mut config = small_config(2);
    config.timing.penalty_freeze_ms = 30_000;
    let game = start(config, oracle);
    let slots = card_slots(&game, 4).await;
    let agents: Vec<AgentHandle> = game.agents().to_vec();

    press(&agents[0], &[slots[0], slots[1], slots[2]]);
    agents[0]
        .wait_for_phase(|p| p == AgentPhase::Frozen(FreezeKind::Penalty))
        .await;

    let started = tokio::time::Instant::now();
    let outcome = game.terminate().await.unwrap();
    assert!(tokio::time::Instant::now() - started < Duration::from_secs(1));
    assert!(outcome.terminated);
    assert!(agents.iter().all(|agent| agent.phase() == AgentPhase::Closed));
}

#[tokio::test(start_paused = true)]
async fn test_autonomous_players_finish_a_game() {
    let mut config = GameConfig::default();
    config.table = TableConfig {
        slots: 4,
        group_size: 3,
        deck_size: 9,
    };
    config.players.human = 0;
    config.players.autonomous = 2;
    config.timing.round_ms = 2_000;
    config.timing.point_freeze_ms = 100;
    config.timing.penalty_freeze_ms = 300;
    config.seed = Some(11);
    let group_size = config.table.group_size;
    let game = start(config, ResidueOracle::new(group_size));
    let agents: Vec<AgentHandle> = game.agents().to_vec();

    let outcome = tokio::time::timeout(Duration::from_secs(3_600), game.wait())
        .await
        .expect("bots finish within an hour of game time")
        .unwrap();

    assert!(!outcome.terminated);
    let winners = outcome.winners.clone().unwrap();
    assert!(!winners.is_empty());
    let points: u32 = outcome.scores.iter().map(|(_, score)| score).sum();
    assert_eq!(outcome.cards_consumed, points as usize * group_size);
    assert!(agents.iter().all(|agent| agent.phase() == AgentPhase::Closed));
}

#[tokio::test(start_paused = true)]
async fn test_terminate_stops_generators() {
    let mut config = GameConfig::default();
    config.players.human = 1;
    config.players.autonomous = 3;
    config.seed = Some(3);
    let game = start(config, ResidueOracle::new(3));
    let agents: Vec<AgentHandle> = game.agents().to_vec();

    tokio::time::sleep(Duration::from_millis(750)).await;
    let outcome = game.terminate().await.unwrap();

    assert!(outcome.terminated);
    assert_eq!(outcome.scores.len(), 4);
    assert!(agents.iter().all(|agent| agent.phase() == AgentPhase::Closed));
}

#[tokio::test]
async fn test_missing_oracle_is_rejected() {
    let result = GameBuilder::new(small_config(1)).start();
    assert!(result.is_err());
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let mut config = small_config(1);
    config.table.slots = 2;
    let (oracle, _calls) = GroupList::new(&[]);
    let result = GameBuilder::new(config).oracle(oracle).start();
    assert!(matches!(
        result,
        Err(set_arena::GameError::InvalidConfig { .. })
    ));
}
