//! Review of a finished game.
//!
//! A [`Replay`] is built once from movetext plus one [`Annotation`] per ply and
//! never changes afterwards, so any number of readers can query it at once.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use shakmaty::{Chess, Color, Move, Position};
use thiserror::Error;

use crate::{
    notation::{self, NotationError},
    record::GameRecord,
    rules::{self, MoveRecord},
};

/// Move quality tags produced by the upstream analysis.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Brilliant,
    Great,
    Best,
    Excellent,
    Good,
    Book,
    Inaccuracy,
    Mistake,
    Miss,
    Blunder,
}

impl Classification {
    pub const ALL: [Classification; 10] = [
        Self::Brilliant,
        Self::Great,
        Self::Best,
        Self::Excellent,
        Self::Good,
        Self::Book,
        Self::Inaccuracy,
        Self::Mistake,
        Self::Miss,
        Self::Blunder,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Brilliant => "Brilliant",
            Self::Great => "Great",
            Self::Best => "Best",
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Book => "Book",
            Self::Inaccuracy => "Inaccuracy",
            Self::Mistake => "Mistake",
            Self::Miss => "Miss",
            Self::Blunder => "Blunder",
        }
    }
}

/// Analysis of one ply.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Annotation {
    /// 0-based.
    pub ply: usize,
    #[serde(with = "crate::chess_serde::color_serde")]
    pub side: Color,
    pub notation: String,
    pub classification: Classification,
    #[serde(default)]
    pub explanation: String,
    /// Evaluation after the move, as reported upstream.
    pub evaluation: f32,
}

/// Accuracy percentages computed by the upstream analysis.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct SideAccuracy {
    pub white: f32,
    pub black: f32,
}

/// The analysis document handed to the review screen.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ReviewInput {
    pub notation: String,
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub accuracy: Option<SideAccuracy>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplayError {
    #[error("cannot replay notation: {0}")]
    Notation(#[from] NotationError),
    #[error("notation has {moves} moves but {annotations} annotations were given")]
    CountMismatch { moves: usize, annotations: usize },
    #[error("annotation {index} is for ply {ply}")]
    PlyOutOfOrder { index: usize, ply: usize },
    #[error("annotation for ply {ply} says {found:?} moved, but it was {expected:?}")]
    SideMismatch {
        ply: usize,
        expected: Color,
        found: Color,
    },
}

/// The board at one ply of the game.
#[derive(Debug, Clone)]
pub struct ReconstructedBoard {
    /// `None` for the initial position.
    pub ply: Option<usize>,
    pub position: Chess,
    /// The move that produced `position`.
    pub highlighted: Option<MoveRecord>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SideSummary {
    pub moves: usize,
    pub counts: BTreeMap<Classification, usize>,
    /// Passed through from the analysis, never computed here.
    pub accuracy: Option<f32>,
}

impl SideSummary {
    fn new(accuracy: Option<f32>) -> Self {
        Self {
            moves: 0,
            counts: Classification::ALL.iter().map(|&c| (c, 0)).collect(),
            accuracy,
        }
    }

    pub fn count(&self, classification: Classification) -> usize {
        self.counts.get(&classification).copied().unwrap_or(0)
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ReviewSummary {
    pub white: SideSummary,
    pub black: SideSummary,
}

impl ReviewSummary {
    pub fn side(&self, color: Color) -> &SideSummary {
        match color {
            Color::White => &self.white,
            Color::Black => &self.black,
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct EvaluationPoint {
    pub ply: usize,
    pub evaluation: f32,
}

#[derive(Debug, Clone)]
pub struct Replay {
    moves: Vec<Move>,
    records: Vec<MoveRecord>,
    annotations: Vec<Annotation>,
    accuracy: Option<SideAccuracy>,
}

impl Replay {
    /// Replays `notation` end to end and checks the annotations against it.
    /// Nothing is built unless every check passes.
    pub fn load(notation: &str, annotations: Vec<Annotation>) -> Result<Self, ReplayError> {
        let moves = notation::decode(notation)?;
        if moves.len() != annotations.len() {
            return Err(ReplayError::CountMismatch {
                moves: moves.len(),
                annotations: annotations.len(),
            });
        }

        let mut position = Chess::default();
        let mut records = Vec::with_capacity(moves.len());
        for (index, (m, annotation)) in moves.iter().zip(&annotations).enumerate() {
            if annotation.ply != index {
                return Err(ReplayError::PlyOutOfOrder {
                    index,
                    ply: annotation.ply,
                });
            }
            if annotation.side != position.turn() {
                return Err(ReplayError::SideMismatch {
                    ply: index,
                    expected: position.turn(),
                    found: annotation.side,
                });
            }
            let (after, record) = rules::play(&position, m);
            position = after;
            records.push(record);
        }

        log::debug!("loaded replay of {} plies", records.len());
        Ok(Self {
            moves,
            records,
            annotations,
            accuracy: None,
        })
    }

    pub fn from_input(input: ReviewInput) -> Result<Self, ReplayError> {
        let replay = Self::load(&input.notation, input.annotations)?;
        Ok(match input.accuracy {
            Some(accuracy) => replay.with_accuracy(accuracy),
            None => replay,
        })
    }

    pub fn from_record(record: &GameRecord, annotations: Vec<Annotation>) -> Result<Self, ReplayError> {
        Self::load(&record.notation, annotations)
    }

    pub fn with_accuracy(mut self, accuracy: SideAccuracy) -> Self {
        self.accuracy = Some(accuracy);
        self
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn moves(&self) -> &[MoveRecord] {
        &self.records
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Maps any requested ply into `-1..len`. `None` stands for `-1`, the
    /// initial position.
    pub fn clamp_ply(&self, ply: isize) -> Option<usize> {
        if ply < 0 || self.is_empty() {
            None
        } else {
            Some((ply as usize).min(self.len() - 1))
        }
    }

    /// The position after ply `ply`, rebuilt from the start every call.
    /// Out-of-range plies are clamped.
    pub fn board_at_ply(&self, ply: isize) -> ReconstructedBoard {
        let ply = self.clamp_ply(ply);
        let mut position = Chess::default();
        let Some(last) = ply else {
            return ReconstructedBoard {
                ply: None,
                position,
                highlighted: None,
            };
        };
        for m in &self.moves[..=last] {
            position.play_unchecked(m);
        }
        ReconstructedBoard {
            ply: Some(last),
            position,
            highlighted: Some(self.records[last].clone()),
        }
    }

    pub fn aggregate(&self) -> ReviewSummary {
        let mut summary = ReviewSummary {
            white: SideSummary::new(self.accuracy.map(|a| a.white)),
            black: SideSummary::new(self.accuracy.map(|a| a.black)),
        };
        for annotation in &self.annotations {
            let side = match annotation.side {
                Color::White => &mut summary.white,
                Color::Black => &mut summary.black,
            };
            side.moves += 1;
            *side.counts.entry(annotation.classification).or_insert(0) += 1;
        }
        summary
    }

    /// One point per ply, straight from the annotations. Call again to restart.
    pub fn evaluation_series(&self) -> impl Iterator<Item = EvaluationPoint> + Clone + '_ {
        self.annotations.iter().map(|a| EvaluationPoint {
            ply: a.ply,
            evaluation: a.evaluation,
        })
    }
}
