use rand::SeedableRng;
use rand::rngs::SmallRng;
use rbc_core::belief::{BeliefSet, BeliefSnapshot, PropagationLimits, Propagator, SensingFilter};
use rbc_core::model::{Color, Move, MoveResult, Position, SensingWindow, Square};
use rbc_core::rules::{RulesOracle, StandardRules};

fn window(text: &str) -> SensingWindow {
    text.parse().unwrap()
}

fn sq(name: &str) -> Square {
    name.parse().unwrap()
}

#[test]
fn opening_turn_round_trip() {
    let mut rng = SmallRng::seed_from_u64(2024);
    let propagator = Propagator::new(PropagationLimits::default());
    let filter = SensingFilter::default();

    // We are black. White's first move is unseen.
    let start = BeliefSet::singleton(Position::starting());
    let after_white = propagator.advance(&start, false, None, &mut rng);
    assert_eq!(after_white.len(), 21);

    // Sensing around e3 shows the pawn on e4 and nothing else of note.
    let truth = Position::from_fen("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1")
        .unwrap();
    let observed = SensingWindow::observe(&truth, sq("e3"));
    let filtered = filter.apply(&after_white, &observed, Some(&start), &mut rng);
    assert!(!filtered.recovered);
    assert!(filtered.beliefs.contains(&truth));
    assert!(filtered.beliefs.iter().all(|p| observed.is_consistent_with(p)));

    // Our own reply goes through as requested.
    let reply: Move = "e7e5".parse().unwrap();
    let replay = propagator.replay_own_move(&filtered.beliefs, &MoveResult::executed(reply));
    assert!(!replay.recovered);
    assert!(replay.beliefs.iter().all(|p| p.turn() == Color::White));
    assert!(
        replay
            .beliefs
            .iter()
            .all(|p| p.piece_at(sq("e5")).is_some_and(|pc| pc.color == Color::Black))
    );
}

#[test]
fn filter_never_invents_positions() {
    let mut rng = SmallRng::seed_from_u64(8);
    let propagator = Propagator::new(PropagationLimits::unbounded());
    let start = BeliefSet::singleton(Position::starting());
    let after_white = propagator.advance(&start, false, None, &mut rng);
    let after_black = propagator.advance(&after_white, false, None, &mut rng);

    for text in ["d4:?;d5:?", "f3:N", "c6:n;e4:?", "a1:R;b1:N;a2:P"] {
        let observed = window(text);
        let kept = after_black.retain_consistent(&observed);
        assert!(kept.iter().all(|p| after_black.contains(p)), "{text}");
        assert!(kept.iter().all(|p| observed.is_consistent_with(p)), "{text}");
    }
}

#[test]
fn every_non_terminal_position_keeps_a_quiet_successor_and_the_pass() {
    let mut rng = SmallRng::seed_from_u64(1);
    let propagator = Propagator::new(PropagationLimits::unbounded());
    let rules = StandardRules;
    for fen in [
        "4k3/8/8/8/8/8/8/4K3 w - - 0 1",
        "r3k2r/pppq1ppp/2n2n2/3pp3/3PP3/2N2N2/PPPQ1PPP/R3K2R b KQkq - 4 9",
        "7k/8/8/8/8/8/8/K7 b - - 10 60",
    ] {
        let position = Position::from_fen(fen).unwrap();
        let next = propagator.advance(&BeliefSet::singleton(position.clone()), false, None, &mut rng);
        assert!(next.contains(&position.pass()), "{fen}");
        let quiet_moves: Vec<_> = rules
            .candidate_moves(&position)
            .into_iter()
            .filter(|mv| !rules.is_capture(&position, *mv))
            .collect();
        assert!(!quiet_moves.is_empty(), "{fen}");
        for mv in quiet_moves {
            let successor = rules.apply(&position, mv).unwrap();
            assert!(next.contains(&successor), "{fen} {mv}");
        }
    }
}

#[test]
fn inconsistent_window_on_singleton_still_recovers() {
    let mut rng = SmallRng::seed_from_u64(77);
    let filter = SensingFilter::default();
    let beliefs = BeliefSet::singleton(Position::starting());
    let outcome = filter.apply(&beliefs, &window("e2:?;e4:P"), None, &mut rng);
    assert!(outcome.recovered);
    assert_eq!(outcome.beliefs.len(), 1);
}

#[test]
fn snapshot_survives_a_propagation_step() {
    let mut rng = SmallRng::seed_from_u64(5);
    let propagator = Propagator::new(PropagationLimits::default());
    let next = propagator.advance(
        &BeliefSet::singleton(Position::starting()),
        false,
        None,
        &mut rng,
    );
    let json = BeliefSnapshot::to_json(&next).unwrap();
    let restored = BeliefSnapshot::from_json(&json).unwrap().restore().unwrap();
    assert_eq!(restored, next);
}

#[test]
fn relaxed_castle_through_an_unseen_rook_is_a_successor() {
    let mut rng = SmallRng::seed_from_u64(9);
    let propagator = Propagator::new(PropagationLimits::unbounded());
    let rules = StandardRules;
    // The black rook on f8 covers f1, so e1g1 only exists under relaxed rules.
    let position = Position::from_fen("k4r2/8/8/8/8/8/8/R3K2R w KQ - 0 1").unwrap();
    assert!(!rules.pseudo_legal_moves(&position).contains(&"e1g1".parse().unwrap()));

    let next = propagator.advance(&BeliefSet::singleton(position), false, None, &mut rng);
    let castled = Position::from_fen("k4r2/8/8/8/8/8/8/R4RK1 b - - 1 1").unwrap();
    assert!(next.contains(&castled));
}
