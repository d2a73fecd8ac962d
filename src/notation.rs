//! Game notation: numbered SAN movetext in and out.

use std::str::FromStr;

use shakmaty::{san::SanPlus, Chess, Move, Position};
use thiserror::Error;

use crate::rules::MoveRecord;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotationError {
    #[error("ply {ply}: cannot read {token:?} as a move")]
    Unparseable { ply: usize, token: String },
    #[error("ply {ply}: {token:?} is not legal in the position reached")]
    Illegal { ply: usize, token: String },
    #[error("unterminated {0} in movetext")]
    Unterminated(&'static str),
}

const RESULTS: [&str; 4] = ["1-0", "0-1", "1/2-1/2", "*"];

/// Reads movetext from the standard starting position.
///
/// Move numbers, results, NAGs, move-quality glyphs, `{}` and `;` comments,
/// `[Tag "pairs"]` and `()` variations are skipped. Every move must be legal in
/// the position reached by the moves before it.
pub fn decode(notation: &str) -> Result<Vec<Move>, NotationError> {
    let mut position = Chess::default();
    let mut moves = Vec::new();

    for token in tokens(notation)? {
        let ply = moves.len();
        let san = SanPlus::from_str(&token).map_err(|_| NotationError::Unparseable {
            ply,
            token: token.clone(),
        })?;
        let m = san
            .san
            .to_move(&position)
            .map_err(|_| NotationError::Illegal { ply, token })?;
        position.play_unchecked(&m);
        moves.push(m);
    }
    Ok(moves)
}

/// Writes `1. e4 e5 2. Nf3 ...`, optionally followed by a result token.
pub fn encode(history: &[MoveRecord], result: Option<&str>) -> String {
    let mut parts = Vec::with_capacity(history.len() * 3 / 2 + 1);
    for (ply, record) in history.iter().enumerate() {
        if ply % 2 == 0 {
            parts.push(format!("{}.", ply / 2 + 1));
        }
        parts.push(record.san.clone());
    }
    if let Some(result) = result {
        parts.push(result.to_string());
    }
    parts.join(" ")
}

fn tokens(notation: &str) -> Result<Vec<String>, NotationError> {
    let mut cleaned = String::with_capacity(notation.len());
    let mut chars = notation.chars();
    let mut variation_depth = 0usize;

    while let Some(c) = chars.next() {
        match c {
            '{' => {
                if !chars.by_ref().any(|c| c == '}') {
                    return Err(NotationError::Unterminated("comment"));
                }
                cleaned.push(' ');
            }
            ';' => {
                chars.by_ref().find(|&c| c == '\n');
                cleaned.push(' ');
            }
            '[' => {
                if !chars.by_ref().any(|c| c == ']') {
                    return Err(NotationError::Unterminated("tag pair"));
                }
                cleaned.push(' ');
            }
            '(' => {
                variation_depth += 1;
                cleaned.push(' ');
            }
            ')' => {
                variation_depth = variation_depth.saturating_sub(1);
                cleaned.push(' ');
            }
            _ if variation_depth > 0 => {}
            _ => cleaned.push(c),
        }
    }
    if variation_depth > 0 {
        return Err(NotationError::Unterminated("variation"));
    }

    Ok(cleaned
        .split_whitespace()
        .filter(|t| !RESULTS.contains(t) && !t.starts_with('$'))
        .map(strip_move_number)
        .map(|t| t.trim_end_matches(['!', '?']))
        .filter(|t| !t.is_empty())
        .map(castling_with_letters)
        .collect())
}

/// `0-0` / `0-0-0+` -> `O-O` / `O-O-O+`
fn castling_with_letters(token: &str) -> String {
    let suffix = token.trim_start_matches(['0', '-']);
    match &token[..token.len() - suffix.len()] {
        castle @ ("0-0" | "0-0-0") => format!("{}{suffix}", castle.replace('0', "O")),
        _ => token.to_string(),
    }
}

/// `12.` / `12...` / `12.Nf3` -> `""` / `""` / `Nf3`
fn strip_move_number(token: &str) -> &str {
    let rest = token.trim_start_matches(|c: char| c.is_ascii_digit());
    if rest.len() != token.len() && rest.starts_with('.') {
        rest.trim_start_matches('.')
    } else {
        token
    }
}
