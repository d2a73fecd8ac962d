#[cfg(feature = "server")]
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use shakmaty::{uci::Uci, Chess};

/// Ask the oracle for one move in a position.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SuggestionRequest {
    /// The position to move in. The side to move is the side the suggestion is for.
    #[serde(with = "crate::chess_serde::position_serde")]
    pub position: Chess,

    /// How strong the suggestion should be.
    pub difficulty: Difficulty,

    /// What random number to give to the oracle for this request?
    /// If None, it will be generated.
    #[serde(default)]
    pub seed: Option<u64>,
}

/// The oracle's answer: one candidate move plus a rationale.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    /// Origin, destination and optional promotion, e.g. `e7e8q`.
    #[serde(with = "crate::chess_serde::uci_serde")]
    pub r#move: Uci,

    /// Free-text explanation of why the move was chosen.
    #[serde(default)]
    pub rationale: String,
}

/// Named strength tiers.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyTier {
    Beginner,
    Intermediate,
    Advanced,
}

/// Result of mapping a tier to a numeric level.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DifficultyAdjustment {
    pub level: u8,
    pub description: String,
}

impl DifficultyTier {
    pub const ALL: [DifficultyTier; 3] = [Self::Beginner, Self::Intermediate, Self::Advanced];

    pub fn level(self) -> u8 {
        match self {
            Self::Beginner => 2,
            Self::Intermediate => 5,
            Self::Advanced => 8,
        }
    }

    /// The difficulty adjustment contract: a pure tier to level mapping.
    pub fn adjust(self) -> DifficultyAdjustment {
        let description = match self {
            Self::Beginner => "Plays loosely and often misses tactics.",
            Self::Intermediate => "Takes obvious material and spots simple checks.",
            Self::Advanced => "Prefers forcing moves whenever one is available.",
        };
        DifficultyAdjustment {
            level: self.level(),
            description: description.to_string(),
        }
    }
}

impl std::str::FromStr for DifficultyTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "beginner" => Ok(Self::Beginner),
            "intermediate" => Ok(Self::Intermediate),
            "advanced" => Ok(Self::Advanced),
            other => Err(format!("unknown difficulty tier {other:?}")),
        }
    }
}

/// Either a numeric level in `1..=10` or a named tier.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(untagged)]
pub enum Difficulty {
    Level(u8),
    Tier(DifficultyTier),
}

impl Difficulty {
    pub const MIN_LEVEL: u8 = 1;
    pub const MAX_LEVEL: u8 = 10;

    /// The numeric level, clamped into `1..=10`.
    pub fn level(self) -> u8 {
        match self {
            Difficulty::Level(level) => level.clamp(Self::MIN_LEVEL, Self::MAX_LEVEL),
            Difficulty::Tier(tier) => tier.level(),
        }
    }

    pub fn is_valid(self) -> bool {
        match self {
            Difficulty::Level(level) => (Self::MIN_LEVEL..=Self::MAX_LEVEL).contains(&level),
            Difficulty::Tier(_) => true,
        }
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty::Tier(DifficultyTier::Intermediate)
    }
}

impl std::str::FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<u8>() {
            Ok(level) => {
                let d = Difficulty::Level(level);
                if d.is_valid() {
                    Ok(d)
                } else {
                    Err(format!("difficulty level {level} is outside 1-10"))
                }
            }
            Err(_) => s.parse().map(Difficulty::Tier),
        }
    }
}

/// General oracle info.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct OracleInfo {
    /// The oracle's algorithm ID.
    pub id: String,

    /// A human-readable description of how the oracle picks moves.
    pub description: String,
}

/// Errors relating to a submitted request, independent of the oracle.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum SuggestionRequestError {
    /// The position has no legal moves, so there is nothing to suggest.
    NoLegalMoves,

    /// The oracle has generated a move that is not legal in the position.
    /// This is a bug in the oracle.
    /// The suggested move is included.
    OracleSentIllegalMove {
        #[serde(with = "crate::chess_serde::uci_serde")]
        r#move: Uci,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OracleInternalError {
    pub error_text: String,
}

#[derive(Clone, Debug)]
pub enum SuggestionResult {
    RequestError(SuggestionRequestError),
    OracleError(String),
    Ok(Suggestion),
}

#[cfg(feature = "server")]
impl IntoResponse for SuggestionResult {
    fn into_response(self) -> axum::response::Response {
        match self {
            SuggestionResult::RequestError(what @ SuggestionRequestError::NoLegalMoves) => {
                (StatusCode::BAD_REQUEST, Json(what)).into_response()
            }
            SuggestionResult::RequestError(what) => {
                (StatusCode::INTERNAL_SERVER_ERROR, Json(what)).into_response()
            }
            SuggestionResult::OracleError(error_text) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(OracleInternalError { error_text }),
            )
                .into_response(),
            SuggestionResult::Ok(what) => (StatusCode::OK, Json(what)).into_response(),
        }
    }
}
