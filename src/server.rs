use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use shakmaty::Position;

use crate::{
    oracle_types::{
        DifficultyAdjustment, DifficultyTier, OracleInfo, SuggestionRequest,
        SuggestionRequestError, SuggestionResult,
    },
    SuggestionOracle,
};

/// Exposes an oracle over HTTP.
///
/// - `GET /` returns the oracle's [`OracleInfo`]
/// - `POST /suggest` takes a [`SuggestionRequest`] and returns a suggestion
/// - `GET /difficulty/:tier` returns the tier's [`DifficultyAdjustment`]
pub fn serve_oracle<O: SuggestionOracle + 'static>(oracle: O) -> Router {
    Router::new()
        .route("/", get(get_info::<O>))
        .route("/suggest", post(handle_suggest::<O>))
        .route("/difficulty/:tier", get(get_difficulty::<O>))
        .with_state(Arc::new(oracle))
}

async fn get_info<O: SuggestionOracle>(State(o): State<Arc<O>>) -> Json<OracleInfo> {
    Json(o.info())
}

async fn get_difficulty<O: SuggestionOracle>(
    State(o): State<Arc<O>>,
    Path(tier): Path<DifficultyTier>,
) -> Json<DifficultyAdjustment> {
    Json(o.adjust_difficulty(tier))
}

async fn handle_suggest<O: SuggestionOracle>(
    State(o): State<Arc<O>>,
    Json(request): Json<SuggestionRequest>,
) -> SuggestionResult {
    if request.position.legal_moves().is_empty() {
        return SuggestionResult::RequestError(SuggestionRequestError::NoLegalMoves);
    }

    // Fill in the seed so the answer can be reproduced.
    let mut request = request;
    request.seed = Some(request.seed.unwrap_or_else(rand::random));

    let suggestion = match o.suggest(&request).await {
        Ok(suggestion) => suggestion,
        Err(why) => {
            log::warn!("oracle failed: {why}");
            return SuggestionResult::OracleError(why.to_string());
        }
    };

    // Refuse to forward a move the oracle should never have produced.
    if suggestion.r#move.to_move(&request.position).is_err() {
        return SuggestionResult::RequestError(SuggestionRequestError::OracleSentIllegalMove {
            r#move: suggestion.r#move,
        });
    }

    SuggestionResult::Ok(suggestion)
}
