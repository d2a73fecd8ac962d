//! The interactive game engine.
//!
//! A [`SessionEngine`] owns at most one live game. Human input arrives through
//! [`SessionEngine::attempt_move`] and [`SessionEngine::select`]; the automated
//! side is driven through tickets:
//!
//! 1. [`SessionEngine::begin_opponent_turn`] hands out a [`SuggestionTicket`]
//!    and marks a request as in flight.
//! 2. The caller sends `ticket.request` to a [`SuggestionOracle`], with
//!    [`request_suggestion`] or any transport it likes.
//! 3. [`SessionEngine::resolve_opponent_turn`] plays the answer, reports a
//!    fault, or drops it as stale.
//!
//! Every ticket carries the generation of the game it was issued for. A reset
//! bumps the generation, so answers that arrive afterwards are discarded
//! without touching the new game.
//!
//! [`SessionEngine::drive_opponent`] runs all three steps in one call.

use std::time::Duration;

use log::{debug, info, warn};
use shakmaty::{uci::Uci, Chess, Color, Piece, Position, Rank, Role, Square};
use thiserror::Error;

use crate::{
    config::{OpponentKind, SessionConfig},
    notation,
    oracle_types::{Suggestion, SuggestionRequest},
    record::GameRecord,
    rules::{self, CandidateMove, IllegalMove, MoveRecord, Repetitions},
    SuggestionOracle,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawReason {
    InsufficientMaterial,
    FiftyMoveRule,
}

/// How the game stands. Derived from the rules after every committed move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TerminationStatus {
    InProgress,
    Checkmate { winner: Color },
    Stalemate,
    Draw(DrawReason),
    Repetition,
}

impl TerminationStatus {
    fn derive(status: &rules::Status, side_to_move: Color) -> Self {
        if status.is_checkmate {
            TerminationStatus::Checkmate {
                winner: !side_to_move,
            }
        } else if status.is_stalemate {
            TerminationStatus::Stalemate
        } else if status.is_threefold_repetition {
            TerminationStatus::Repetition
        } else if status.is_insufficient_material {
            TerminationStatus::Draw(DrawReason::InsufficientMaterial)
        } else if status.is_fifty_move_draw {
            TerminationStatus::Draw(DrawReason::FiftyMoveRule)
        } else {
            TerminationStatus::InProgress
        }
    }

    pub fn is_terminal(&self) -> bool {
        *self != TerminationStatus::InProgress
    }

    /// The result token used in game notation.
    pub fn result(&self) -> &'static str {
        match self {
            TerminationStatus::InProgress => "*",
            TerminationStatus::Checkmate {
                winner: Color::White,
            } => "1-0",
            TerminationStatus::Checkmate {
                winner: Color::Black,
            } => "0-1",
            _ => "1/2-1/2",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    AwaitingHumanInput,
    AwaitingOpponentMove,
    Terminated,
}

/// The selected origin square and where its piece may go.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    pub square: Square,
    pub destinations: Vec<Square>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OccupiedSquare {
    pub square: Square,
    pub piece: Piece,
}

/// Why a human move attempt did not commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
    NoSession,
    GameOver,
    /// The side to move is played by the oracle.
    NotYourTurn,
    Illegal,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttemptOutcome {
    Selected(Selection),
    Cleared,
    Committed(MoveRecord),
    Rejected(Rejection),
}

/// A failure of the automated side. Recoverable: the game stays where it was.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleFault {
    #[error("suggestion request failed: {0}")]
    Request(String),
    #[error("no suggestion within {0:?}")]
    TimedOut(Duration),
    #[error("suggestion {0:?} is not a square-to-square move")]
    Malformed(String),
    #[error("suggestion moves for {found:?} but {expected:?} is to move")]
    WrongSide { expected: Color, found: Color },
    #[error("suggested move {0} is illegal")]
    IllegalSuggestion(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OpponentOutcome {
    Played {
        record: MoveRecord,
        rationale: String,
    },
    Fault(OracleFault),
    /// The answer belongs to a reset game or to a request already resolved.
    Stale,
}

/// Proof that one opponent request is outstanding for one game.
#[derive(Clone, Debug)]
pub struct SuggestionTicket {
    pub generation: u64,
    pub id: u64,
    pub side: Color,
    pub request: SuggestionRequest,
}

/// Sends a ticket's request and bounds the wait. Expiry reads as a fault,
/// the same as a failed request.
pub async fn request_suggestion<O: SuggestionOracle + ?Sized>(
    oracle: &O,
    ticket: &SuggestionTicket,
    timeout: Duration,
) -> Result<Suggestion, OracleFault> {
    match tokio::time::timeout(timeout, oracle.suggest(&ticket.request)).await {
        Ok(Ok(suggestion)) => Ok(suggestion),
        Ok(Err(why)) => Err(OracleFault::Request(why.to_string())),
        Err(_) => Err(OracleFault::TimedOut(timeout)),
    }
}

struct GameSession {
    position: Chess,
    history: Vec<MoveRecord>,
    human_color: Color,
    status: TerminationStatus,
    repetitions: Repetitions,
    standard_start: bool,
}

impl GameSession {
    fn new(human_color: Color, position: Chess) -> Self {
        let standard_start = rules::encode(&position) == rules::encode(&Chess::default());
        let status = TerminationStatus::derive(
            &rules::status(&position, &Repetitions::default()),
            position.turn(),
        );
        Self {
            repetitions: Repetitions::starting_from(&position),
            position,
            history: Vec::new(),
            human_color,
            status,
            standard_start,
        }
    }
}

pub struct SessionEngine {
    config: SessionConfig,
    game: Option<GameSession>,
    selection: Option<Selection>,
    generation: u64,
    next_ticket: u64,
    pending: Option<u64>,
    last_fault: Option<OracleFault>,
}

impl SessionEngine {
    /// An idle engine. Call [`Self::reset_session`] to start playing.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            game: None,
            selection: None,
            generation: 0,
            next_ticket: 0,
            pending: None,
            last_fault: None,
        }
    }

    /// An engine with a game already started.
    pub fn started(config: SessionConfig) -> Self {
        let mut engine = Self::new(config);
        engine.reset_session();
        engine
    }

    /// An engine with a game started from an arbitrary position, such as a
    /// composed endgame. A later reset returns to the standard start.
    pub fn started_from(config: SessionConfig, position: Chess) -> Self {
        let mut engine = Self::new(config);
        engine.begin_game(position);
        engine
    }

    /// Replaces the game with a fresh one. Any outstanding opponent request
    /// is orphaned; its answer will resolve as [`OpponentOutcome::Stale`].
    pub fn reset_session(&mut self) -> Phase {
        self.begin_game(Chess::default())
    }

    fn begin_game(&mut self, position: Chess) -> Phase {
        self.generation += 1;
        self.game = Some(GameSession::new(self.config.human_color, position));
        self.selection = None;
        self.pending = None;
        self.last_fault = None;
        let phase = self.phase();
        info!(
            "session {} started, human plays {:?}, {:?}",
            self.generation, self.config.human_color, phase
        );
        phase
    }

    /// Resets with a different configuration.
    pub fn reset_with(&mut self, config: SessionConfig) -> Phase {
        self.config = config;
        self.reset_session()
    }

    pub fn phase(&self) -> Phase {
        match &self.game {
            None => Phase::Idle,
            Some(game) if game.status.is_terminal() => Phase::Terminated,
            Some(game) if self.human_moves(game) => Phase::AwaitingHumanInput,
            Some(_) => Phase::AwaitingOpponentMove,
        }
    }

    fn human_moves(&self, game: &GameSession) -> bool {
        self.config.opponent == OpponentKind::Human || game.position.turn() == game.human_color
    }

    fn human_precondition(&self) -> Result<&GameSession, Rejection> {
        let game = self.game.as_ref().ok_or(Rejection::NoSession)?;
        if game.status.is_terminal() {
            return Err(Rejection::GameOver);
        }
        if !self.human_moves(game) {
            return Err(Rejection::NotYourTurn);
        }
        Ok(game)
    }

    /// Click-style input.
    ///
    /// With nothing selected, a piece of the side to move is selected and its
    /// destinations computed. With a selection, the click is the destination
    /// of [`Self::attempt_move`]; clicking the selected square again clears it.
    pub fn select(&mut self, square: Square) -> AttemptOutcome {
        if let Err(rejection) = self.human_precondition() {
            return AttemptOutcome::Rejected(rejection);
        }
        match self.selection.take() {
            Some(selected) if selected.square == square => AttemptOutcome::Cleared,
            Some(selected) => self.attempt_move(selected.square, square, None),
            None => match self.position().and_then(|p| selection_for(p, square)) {
                Some(selection) => {
                    debug!("selected {} -> {:?}", square, selection.destinations);
                    self.selection = Some(selection.clone());
                    AttemptOutcome::Selected(selection)
                }
                None => AttemptOutcome::Cleared,
            },
        }
    }

    /// Submits a human move.
    ///
    /// A pawn reaching the last rank without a promotion hint becomes a queen.
    /// An illegal move leaves the game untouched; if its destination holds a
    /// piece of the side to move, that piece becomes the selection.
    pub fn attempt_move(
        &mut self,
        from: Square,
        to: Square,
        promotion: Option<Role>,
    ) -> AttemptOutcome {
        let game = match self.human_precondition() {
            Ok(game) => game,
            Err(rejection) => return AttemptOutcome::Rejected(rejection),
        };
        let candidate = with_default_promotion(
            &game.position,
            CandidateMove::new(from, to).with_promotion(promotion),
        );

        match self.commit(&candidate) {
            Ok(record) => AttemptOutcome::Committed(record),
            Err(why) => {
                debug!("rejected {}: {}", candidate, why);
                self.selection = self
                    .game
                    .as_ref()
                    .and_then(|game| selection_for(&game.position, to));
                AttemptOutcome::Rejected(Rejection::Illegal)
            }
        }
    }

    /// Applies and appends a move for whichever side is to move.
    fn commit(&mut self, candidate: &CandidateMove) -> Result<MoveRecord, IllegalMove> {
        let game = self.game.as_mut().ok_or(IllegalMove::NoGame)?;
        if game.status.is_terminal() {
            return Err(IllegalMove::GameOver);
        }

        let (position, record) = rules::apply(&game.position, candidate)?;
        game.repetitions.record(&position);
        let status = rules::status(&position, &game.repetitions);
        game.status = TerminationStatus::derive(&status, position.turn());
        game.position = position;
        game.history.push(record.clone());
        self.selection = None;

        debug!("ply {}: {:?} played {}", game.history.len() - 1, record.side, record);
        if game.status.is_terminal() {
            info!("game over after {} plies: {:?}", game.history.len(), game.status);
        }
        Ok(record)
    }

    /// Issues the request for the automated side's move, if it is the
    /// automated side's turn and no request is outstanding.
    pub fn begin_opponent_turn(&mut self) -> Option<SuggestionTicket> {
        if self.phase() != Phase::AwaitingOpponentMove || self.pending.is_some() {
            return None;
        }
        let game = self.game.as_ref()?;
        self.next_ticket += 1;
        let ticket = SuggestionTicket {
            generation: self.generation,
            id: self.next_ticket,
            side: game.position.turn(),
            request: SuggestionRequest {
                position: game.position.clone(),
                difficulty: self.config.difficulty,
                seed: None,
            },
        };
        self.pending = Some(ticket.id);
        self.last_fault = None;
        debug!(
            "session {} ticket {}: asking for {:?}'s move",
            ticket.generation, ticket.id, ticket.side
        );
        Some(ticket)
    }

    /// Handles the answer to a ticket.
    pub fn resolve_opponent_turn(
        &mut self,
        ticket: SuggestionTicket,
        answer: Result<Suggestion, OracleFault>,
    ) -> OpponentOutcome {
        if ticket.generation != self.generation || self.pending != Some(ticket.id) {
            debug!(
                "discarding answer to ticket {} of session {} (current session {})",
                ticket.id, ticket.generation, self.generation
            );
            return OpponentOutcome::Stale;
        }
        self.pending = None;

        let suggestion = match answer {
            Ok(suggestion) => suggestion,
            Err(fault) => return self.fault(fault),
        };
        let candidate = match suggestion.r#move {
            Uci::Normal {
                from,
                to,
                promotion,
            } => CandidateMove::new(from, to).with_promotion(promotion),
            other => return self.fault(OracleFault::Malformed(other.to_string())),
        };

        let mover = self
            .game
            .as_ref()
            .and_then(|game| game.position.board().piece_at(candidate.from))
            .map(|piece| piece.color);
        if let Some(found) = mover.filter(|&c| c != ticket.side) {
            return self.fault(OracleFault::WrongSide {
                expected: ticket.side,
                found,
            });
        }

        match self.commit(&candidate) {
            Ok(record) => OpponentOutcome::Played {
                record,
                rationale: suggestion.rationale,
            },
            Err(_) => self.fault(OracleFault::IllegalSuggestion(candidate.to_string())),
        }
    }

    fn fault(&mut self, fault: OracleFault) -> OpponentOutcome {
        warn!("session {}: opponent turn failed: {}", self.generation, fault);
        self.last_fault = Some(fault.clone());
        OpponentOutcome::Fault(fault)
    }

    /// Runs one full opponent turn against `oracle`, bounded by the configured
    /// timeout. `None` when it is not the automated side's turn.
    pub async fn drive_opponent<O: SuggestionOracle + ?Sized>(
        &mut self,
        oracle: &O,
    ) -> Option<OpponentOutcome> {
        let ticket = self.begin_opponent_turn()?;
        let answer = request_suggestion(oracle, &ticket, self.config.suggestion_timeout()).await;
        Some(self.resolve_opponent_turn(ticket, answer))
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Bumped on every reset.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True while an opponent request is outstanding.
    pub fn in_flight(&self) -> bool {
        self.pending.is_some()
    }

    pub fn last_fault(&self) -> Option<&OracleFault> {
        self.last_fault.as_ref()
    }

    pub fn position(&self) -> Option<&Chess> {
        self.game.as_ref().map(|g| &g.position)
    }

    pub fn history(&self) -> &[MoveRecord] {
        self.game.as_ref().map_or(&[][..], |g| g.history.as_slice())
    }

    pub fn status(&self) -> Option<TerminationStatus> {
        self.game.as_ref().map(|g| g.status)
    }

    pub fn human_color(&self) -> Color {
        self.config.human_color
    }

    pub fn side_to_move(&self) -> Option<Color> {
        self.position().map(|p| p.turn())
    }

    pub fn is_opponent_turn(&self) -> bool {
        self.phase() == Phase::AwaitingOpponentMove
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn legal_destinations(&self) -> &[Square] {
        self.selection.as_ref().map_or(&[][..], |s| s.destinations.as_slice())
    }

    pub fn last_move(&self) -> Option<&MoveRecord> {
        self.history().last()
    }

    pub fn board(&self) -> Vec<OccupiedSquare> {
        self.position()
            .map(|p| {
                rules::board_contents(p)
                    .into_iter()
                    .map(|(square, piece)| OccupiedSquare { square, piece })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The square of the king of the side to move, if that king is in check.
    pub fn check_square(&self) -> Option<Square> {
        let game = self.game.as_ref()?;
        let status = rules::status(&game.position, &game.repetitions);
        if !status.in_check {
            return None;
        }
        let king = Piece {
            color: game.position.turn(),
            role: Role::King,
        };
        self.board()
            .into_iter()
            .find(|occupied| occupied.piece == king)
            .map(|occupied| occupied.square)
    }

    /// The game so far as a history record. Games seeded from another
    /// position have none, since the movetext would not replay.
    pub fn game_record(&self, white: &str, black: &str, date: &str) -> Option<GameRecord> {
        let game = self.game.as_ref().filter(|game| game.standard_start)?;
        let result = game.status.result();
        Some(GameRecord {
            notation: notation::encode(&game.history, Some(result)),
            date: date.to_string(),
            white: white.to_string(),
            black: black.to_string(),
            result: result.to_string(),
        })
    }
}

fn selection_for(position: &Chess, square: Square) -> Option<Selection> {
    let piece = position.board().piece_at(square)?;
    if piece.color != position.turn() {
        return None;
    }
    Some(Selection {
        square,
        destinations: rules::legal_destinations(position, square),
    })
}

fn with_default_promotion(position: &Chess, candidate: CandidateMove) -> CandidateMove {
    let is_pawn = position.board().role_at(candidate.from) == Some(Role::Pawn);
    let last_rank = matches!(candidate.to.rank(), Rank::First | Rank::Eighth);
    if candidate.promotion.is_none() && is_pawn && last_rank {
        candidate.with_promotion(Some(Role::Queen))
    } else {
        candidate
    }
}
