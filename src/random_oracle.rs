use std::convert::Infallible;

use async_trait::async_trait;
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use shakmaty::{CastlingMode, Move, Position};

use crate::{
    oracle_types::{OracleInfo, Suggestion, SuggestionRequest},
    SuggestionOracle,
};

/// Picks among the legal moves at random.
///
/// The difficulty level is the chance, in tenths, of preferring a forcing move
/// (a check or a capture) when one exists. A position with no legal moves
/// yields a null move, which the session reports as a malformed suggestion.
#[derive(Debug, Default, Clone)]
pub struct RandomOracle;

impl RandomOracle {
    pub fn new() -> Self {
        RandomOracle
    }
}

fn is_forcing<P: Position + Clone>(position: &P, m: &Move) -> bool {
    if m.is_capture() {
        return true;
    }
    let mut after = position.clone();
    after.play_unchecked(m);
    after.is_check()
}

#[async_trait]
impl SuggestionOracle for RandomOracle {
    type Error = Infallible;

    fn info(&self) -> OracleInfo {
        OracleInfo {
            id: "random".to_string(),
            description: "Plays a random legal move, preferring checks and captures at higher levels.".to_string(),
        }
    }

    async fn suggest(&self, request: &SuggestionRequest) -> Result<Suggestion, Self::Error> {
        let seed = request.seed.unwrap_or_else(rand::random);
        let mut rng = StdRng::seed_from_u64(seed);
        let position = &request.position;
        let level = request.difficulty.level();

        let moves: Vec<Move> = position.legal_moves().into_iter().collect();
        let forcing: Vec<Move> = moves
            .iter()
            .filter(|m| is_forcing(position, m))
            .cloned()
            .collect();

        let prefer_forcing = !forcing.is_empty() && rng.gen_range(0..10) < level;
        let (pool, rationale) = if prefer_forcing {
            (&forcing, "Forcing move: keeps the initiative.")
        } else {
            (&moves, "Developing move chosen at random.")
        };

        let suggestion = match pool.choose(&mut rng) {
            Some(m) => Suggestion {
                r#move: m.to_uci(CastlingMode::Standard),
                rationale: rationale.to_string(),
            },
            None => Suggestion {
                r#move: shakmaty::uci::Uci::Null,
                rationale: "No legal moves.".to_string(),
            },
        };
        Ok(suggestion)
    }
}
