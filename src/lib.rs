pub mod chess_serde;
pub mod config;
pub mod notation;
pub mod oracle_types;
pub mod random_oracle;
pub mod record;
pub mod replay;
pub mod rules;
#[cfg(feature = "server")]
pub mod server;
pub mod session;

use async_trait::async_trait;
use oracle_types::{OracleInfo, Suggestion, SuggestionRequest};

pub use config::{OpponentKind, SessionConfig};
pub use oracle_types::{Difficulty, DifficultyAdjustment, DifficultyTier};
pub use random_oracle::RandomOracle;
pub use record::GameRecord;
pub use replay::{Annotation, Classification, Replay, ReplayError, ReviewInput};
pub use rules::{CandidateMove, MoveRecord};
pub use session::{
    AttemptOutcome, OpponentOutcome, OracleFault, Phase, SessionEngine, TerminationStatus,
};
pub use shakmaty;

/// The trait that defines a move suggestion oracle.
///
/// An oracle is something that takes a position and a difficulty and eventually
/// produces one move for the side to move, together with a short rationale.
/// It may be a local algorithm, a remote service, or a person typing.
///
/// The session engine treats every call as untrusted:
///
/// 1. The request is issued once per opponent turn.
/// 2. The answer may take arbitrarily long; the engine bounds the wait itself.
/// 3. The suggested move is validated by the rules before it is played,
///    so an oracle that answers with an illegal move only faults its own turn.
///
/// An oracle is provided a seed in every request.
/// It should use that for any randomness needed in its calculation, for reproducibility.
/// If the seed is absent, it may pick one itself.
///
/// ## Statefulness
/// The oracle must not keep game state between calls; the request carries the
/// full position, so the same request should produce the same move.
#[async_trait]
pub trait SuggestionOracle: Send + Sync {
    /// If an oracle's thinking can fail, this type should explain how.
    ///
    /// A failure is reported as a recoverable fault; the game is not forfeited.
    type Error: std::error::Error + Send + Sync;

    fn info(&self) -> OracleInfo;

    /// Calculate a move for the side to move in `request.position`.
    async fn suggest(&self, request: &SuggestionRequest) -> Result<Suggestion, Self::Error>;

    /// Map a named tier to the level this oracle understands.
    ///
    /// The default implementation is the standard tier table.
    fn adjust_difficulty(&self, tier: DifficultyTier) -> DifficultyAdjustment {
        tier.adjust()
    }
}
