use std::str::FromStr;

use chess_session::{
    notation::NotationError,
    replay::{EvaluationPoint, SideAccuracy},
    rules,
    shakmaty::{san::SanPlus, Chess, Color, Position},
    Annotation, Classification, GameRecord, Replay, ReplayError, ReviewInput, SessionConfig,
    SessionEngine,
};
use pretty_assertions::assert_eq;

const RUY_LOPEZ: &str = "1. e4 e5 2. Nf3 Nc6 3. Bb5 a6 4. Ba4 Nf6 5. O-O Be7";

fn annotations(count: usize) -> Vec<Annotation> {
    (0..count)
        .map(|ply| Annotation {
            ply,
            side: if ply % 2 == 0 { Color::White } else { Color::Black },
            notation: String::new(),
            classification: if ply == 3 {
                Classification::Mistake
            } else {
                Classification::Best
            },
            explanation: format!("ply {ply}"),
            evaluation: ply as f32 * 0.1,
        })
        .collect()
}

/// Plays SAN tokens straight through shakmaty, bypassing the replay engine.
fn direct_positions(sans: &[&str]) -> Vec<Chess> {
    let mut position = Chess::default();
    let mut out = Vec::new();
    for san in sans {
        let m = SanPlus::from_str(san)
            .unwrap()
            .san
            .to_move(&position)
            .unwrap();
        position.play_unchecked(&m);
        out.push(position.clone());
    }
    out
}

#[test]
fn board_at_each_ply_matches_direct_play() {
    let replay = Replay::load(RUY_LOPEZ, annotations(10)).unwrap();
    let direct = direct_positions(&[
        "e4", "e5", "Nf3", "Nc6", "Bb5", "a6", "Ba4", "Nf6", "O-O", "Be7",
    ]);
    assert_eq!(replay.len(), 10);

    for (ply, expected) in direct.iter().enumerate() {
        let board = replay.board_at_ply(ply as isize);
        assert_eq!(board.ply, Some(ply));
        assert_eq!(rules::encode(&board.position), rules::encode(expected));
        assert_eq!(board.highlighted.as_ref(), Some(&replay.moves()[ply]));
    }
}

#[test]
fn reconstruction_is_deterministic() {
    let replay = Replay::load(RUY_LOPEZ, annotations(10)).unwrap();
    let a = replay.board_at_ply(6);
    let b = replay.board_at_ply(6);
    assert_eq!(rules::encode(&a.position), rules::encode(&b.position));
    assert_eq!(a.highlighted.unwrap().san, "Ba4");
}

#[test]
fn ply_minus_one_is_the_initial_position() {
    let initial = rules::encode(&Chess::default());
    for replay in [
        Replay::load(RUY_LOPEZ, annotations(10)).unwrap(),
        Replay::load("", Vec::new()).unwrap(),
    ] {
        let board = replay.board_at_ply(-1);
        assert_eq!(board.ply, None);
        assert!(board.highlighted.is_none());
        assert_eq!(rules::encode(&board.position), initial);
    }
}

#[test]
fn out_of_range_plies_are_clamped() {
    let replay = Replay::load(RUY_LOPEZ, annotations(10)).unwrap();
    assert_eq!(replay.board_at_ply(-7).ply, None);
    let last = replay.board_at_ply(500);
    assert_eq!(last.ply, Some(9));
    assert_eq!(last.highlighted.unwrap().san, "Be7");

    let empty = Replay::load("*", Vec::new()).unwrap();
    assert!(empty.is_empty());
    assert_eq!(empty.board_at_ply(3).ply, None);
}

#[test]
fn count_mismatch_is_rejected() {
    assert_eq!(
        Replay::load(RUY_LOPEZ, annotations(9)).unwrap_err(),
        ReplayError::CountMismatch {
            moves: 10,
            annotations: 9
        }
    );
}

#[test]
fn unreadable_notation_is_rejected() {
    assert_eq!(
        Replay::load("1. e4 e5 2. Qxf7", annotations(3)).unwrap_err(),
        ReplayError::Notation(NotationError::Illegal {
            ply: 2,
            token: "Qxf7".to_string()
        })
    );
}

#[test]
fn annotations_must_line_up_with_moves() {
    let mut shifted = annotations(2);
    shifted[1].ply = 5;
    assert_eq!(
        Replay::load("1. e4 e5", shifted).unwrap_err(),
        ReplayError::PlyOutOfOrder { index: 1, ply: 5 }
    );

    let mut wrong_side = annotations(2);
    wrong_side[0].side = Color::Black;
    assert_eq!(
        Replay::load("1. e4 e5", wrong_side).unwrap_err(),
        ReplayError::SideMismatch {
            ply: 0,
            expected: Color::White,
            found: Color::Black
        }
    );
}

#[test]
fn aggregate_counts_per_side_and_passes_accuracy_through() {
    let replay = Replay::load(RUY_LOPEZ, annotations(10))
        .unwrap()
        .with_accuracy(SideAccuracy {
            white: 91.5,
            black: 78.25,
        });
    let summary = replay.aggregate();

    assert_eq!(summary.white.moves, 5);
    assert_eq!(summary.black.moves, 5);
    assert_eq!(summary.white.count(Classification::Best), 5);
    assert_eq!(summary.black.count(Classification::Best), 4);
    assert_eq!(summary.black.count(Classification::Mistake), 1);
    assert_eq!(summary.side(Color::Black).count(Classification::Blunder), 0);
    assert_eq!(summary.white.accuracy, Some(91.5));
    assert_eq!(summary.black.accuracy, Some(78.25));

    let without = Replay::load(RUY_LOPEZ, annotations(10)).unwrap().aggregate();
    assert_eq!(without.white.accuracy, None);
}

#[test]
fn evaluation_series_is_one_point_per_ply_and_restartable() {
    let replay = Replay::load("1. d4 d5 2. c4", annotations(3)).unwrap();
    let series = replay.evaluation_series();
    let first: Vec<EvaluationPoint> = series.clone().collect();
    let second: Vec<EvaluationPoint> = series.collect();

    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
    assert_eq!(
        first[2],
        EvaluationPoint {
            ply: 2,
            evaluation: 0.2
        }
    );
    assert_eq!(replay.evaluation_series().count(), 3);
}

#[test]
fn review_input_loads_from_json() {
    let json = r#"{
        "notation": "1. e4 e5",
        "annotations": [
            {"ply": 0, "side": "white", "notation": "e4", "classification": "book", "evaluation": 0.3},
            {"ply": 1, "side": "black", "notation": "e5", "classification": "book",
             "explanation": "Symmetrical reply.", "evaluation": 0.25}
        ],
        "accuracy": {"white": 100.0, "black": 100.0}
    }"#;
    let input: ReviewInput = serde_json::from_str(json).unwrap();
    let replay = Replay::from_input(input).unwrap();

    assert_eq!(replay.annotations()[1].explanation, "Symmetrical reply.");
    assert_eq!(replay.aggregate().black.count(Classification::Book), 1);
    assert_eq!(replay.aggregate().white.accuracy, Some(100.0));
}

#[test]
fn session_record_replays_to_the_same_finish() {
    let mut engine = SessionEngine::started(SessionConfig::against_human());
    for (from, to) in [("f2", "f3"), ("e7", "e5"), ("g2", "g4"), ("d8", "h4")] {
        engine.attempt_move(from.parse().unwrap(), to.parse().unwrap(), None);
    }
    let record = engine.game_record("W", "B", "2024.05.05").unwrap();
    let stored = GameRecord::from_json(&record.to_json().unwrap()).unwrap();
    assert_eq!(stored, record);

    let replay = Replay::from_record(&stored, annotations(4)).unwrap();
    let last = replay.board_at_ply(3);
    assert!(last.position.is_checkmate());
    assert_eq!(
        rules::encode(&last.position),
        rules::encode(engine.position().unwrap())
    );
}
