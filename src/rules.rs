//! Rules facade over `shakmaty`.
//!
//! Everything the session and replay engines know about chess legality goes
//! through these functions. Positions are never edited in place here: `apply`
//! always derives a fresh [`Chess`] from the old one.

use std::collections::HashMap;
use std::fmt;

use shakmaty::{
    fen::Fen, san::SanPlus, uci::Uci, CastlingMode, Chess, Color, EnPassantMode, Move, Piece,
    Position, Role, Square,
};
use thiserror::Error;

/// A move as requested by a player or an oracle. It may be illegal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CandidateMove {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<Role>,
}

impl CandidateMove {
    pub fn new(from: Square, to: Square) -> Self {
        Self {
            from,
            to,
            promotion: None,
        }
    }

    pub fn with_promotion(mut self, promotion: Option<Role>) -> Self {
        self.promotion = promotion;
        self
    }

    pub fn to_uci(&self) -> Uci {
        Uci::Normal {
            from: self.from,
            to: self.to,
            promotion: self.promotion,
        }
    }
}

impl fmt::Display for CandidateMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uci())
    }
}

/// A move that has been validated and played. Immutable once recorded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoveRecord {
    pub side: Color,
    pub from: Square,
    /// For castling this is the king's destination, not the rook's square.
    pub to: Square,
    pub promotion: Option<Role>,
    /// Standard algebraic notation including check and mate suffixes.
    pub san: String,
}

impl MoveRecord {
    pub fn uci(&self) -> String {
        Uci::Normal {
            from: self.from,
            to: self.to,
            promotion: self.promotion,
        }
        .to_string()
    }
}

impl fmt::Display for MoveRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.san)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IllegalMove {
    #[error("there is no piece on {0}")]
    EmptySquare(Square),
    #[error("{0} is not legal in this position")]
    NotLegal(String),
    #[error("no game is in progress")]
    NoGame,
    #[error("the game is already over")]
    GameOver,
}

/// The status predicates of one position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Status {
    pub in_check: bool,
    pub is_checkmate: bool,
    pub is_stalemate: bool,
    pub is_insufficient_material: bool,
    pub is_fifty_move_draw: bool,
    pub is_threefold_repetition: bool,
}

impl Status {
    /// Any drawn outcome, stalemate and repetition included.
    pub fn is_draw(&self) -> bool {
        self.is_stalemate
            || self.is_insufficient_material
            || self.is_fifty_move_draw
            || self.is_threefold_repetition
    }
}

/// Destination squares reachable by the piece on `square`.
///
/// Castling is reported as the king's two-square step. Promotions collapse
/// into a single destination.
pub fn legal_destinations(position: &Chess, square: Square) -> Vec<Square> {
    let mut destinations: Vec<Square> = position
        .legal_moves()
        .iter()
        .filter(|m| m.from() == Some(square))
        .map(|m| squares_of(m).1)
        .collect();
    destinations.sort();
    destinations.dedup();
    destinations
}

/// Validates `candidate` and derives the position after it.
pub fn apply(
    position: &Chess,
    candidate: &CandidateMove,
) -> Result<(Chess, MoveRecord), IllegalMove> {
    if position.board().piece_at(candidate.from).is_none() {
        return Err(IllegalMove::EmptySquare(candidate.from));
    }
    let m = candidate
        .to_uci()
        .to_move(position)
        .map_err(|_| IllegalMove::NotLegal(candidate.to_string()))?;
    Ok(play(position, &m))
}

/// Plays a move that is already known to be legal in `position`.
pub(crate) fn play(position: &Chess, m: &Move) -> (Chess, MoveRecord) {
    let side = position.turn();
    let (from, to) = squares_of(m);
    let mut after = position.clone();
    let san = SanPlus::from_move_and_play_unchecked(&mut after, m);
    let record = MoveRecord {
        side,
        from,
        to,
        promotion: m.promotion(),
        san: san.to_string(),
    };
    (after, record)
}

fn squares_of(m: &Move) -> (Square, Square) {
    match m.to_uci(CastlingMode::Standard) {
        Uci::Normal { from, to, .. } => (from, to),
        _ => (m.from().unwrap_or_else(|| m.to()), m.to()),
    }
}

pub fn status(position: &Chess, repetitions: &Repetitions) -> Status {
    Status {
        in_check: position.is_check(),
        is_checkmate: position.is_checkmate(),
        is_stalemate: position.is_stalemate(),
        is_insufficient_material: position.is_insufficient_material(),
        is_fifty_move_draw: position.halfmoves() >= 100,
        is_threefold_repetition: repetitions.count(position) >= 3,
    }
}

/// FEN of the position.
pub fn encode(position: &Chess) -> String {
    Fen::from_position(position.clone(), EnPassantMode::Legal).to_string()
}

/// The part of the FEN that decides whether two positions repeat: placement,
/// side to move, castling rights and en passant square.
pub fn position_key(position: &Chess) -> String {
    encode(position)
        .split_whitespace()
        .take(4)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Occupied squares, a1 first.
pub fn board_contents(position: &Chess) -> Vec<(Square, Piece)> {
    let board = position.board();
    Square::ALL
        .into_iter()
        .filter_map(|sq| board.piece_at(sq).map(|piece| (sq, piece)))
        .collect()
}

/// Occurrence counts of every position reached in a game.
#[derive(Clone, Debug, Default)]
pub struct Repetitions {
    seen: HashMap<String, u32>,
}

impl Repetitions {
    pub fn starting_from(position: &Chess) -> Self {
        let mut repetitions = Self::default();
        repetitions.record(position);
        repetitions
    }

    /// Counts one more occurrence.
    pub fn record(&mut self, position: &Chess) {
        *self.seen.entry(position_key(position)).or_insert(0) += 1;
    }

    pub fn count(&self, position: &Chess) -> u32 {
        self.seen.get(&position_key(position)).copied().unwrap_or(0)
    }
}
