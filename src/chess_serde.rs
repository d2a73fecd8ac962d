//! serde adapters for the `shakmaty` types that cross the oracle and record boundaries.

pub mod position_serde {
    use std::str::FromStr;

    use serde::{
        de::{Error, Visitor},
        Deserializer, Serializer,
    };
    use shakmaty::{fen::Fen, CastlingMode, Chess, EnPassantMode};

    pub fn serialize<S: Serializer>(position: &Chess, ser: S) -> Result<S::Ok, S::Error> {
        let fen = Fen::from_position(position.clone(), EnPassantMode::Legal);
        ser.serialize_str(&fen.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Chess, D::Error> {
        struct PositionVisitor;
        impl<'de> Visitor<'de> for PositionVisitor {
            type Value = Chess;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(formatter, "a position in the FEN format")
            }
            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: Error,
            {
                Fen::from_str(v)
                    .map_err(|_| Error::custom("error in parsing position FEN"))?
                    .into_position(CastlingMode::Standard)
                    .map_err(|v| Error::custom(format!("FEN is not a playable position: {v}")))
            }
            fn visit_none<E>(self) -> Result<Self::Value, E>
            where
                E: Error,
            {
                Ok(Chess::default())
            }
        }
        d.deserialize_string(PositionVisitor)
    }
}

pub mod uci_serde {
    use std::str::FromStr;

    use serde::{
        de::{Error, Visitor},
        Deserializer, Serializer,
    };
    use shakmaty::uci::Uci;

    pub fn serialize<S: Serializer>(u: &Uci, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&u.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Uci, D::Error> {
        struct UciVisitor;
        impl<'de> Visitor<'de> for UciVisitor {
            type Value = Uci;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(formatter, "a move as origin square, destination square and optional promotion piece")
            }
            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: Error,
            {
                Uci::from_str(v.trim()).map_err(|_| Error::custom(format!("malformed move {v:?}")))
            }
        }
        d.deserialize_string(UciVisitor)
    }
}

/// Colours travel as `"white"` / `"black"`.
pub mod color_serde {
    use serde::{
        de::{Error, Visitor},
        Deserializer, Serializer,
    };
    use shakmaty::Color;

    pub fn serialize<S: Serializer>(c: &Color, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(match c {
            Color::White => "white",
            Color::Black => "black",
        })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Color, D::Error> {
        struct ColorVisitor;
        impl<'de> Visitor<'de> for ColorVisitor {
            type Value = Color;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(formatter, "\"white\" or \"black\"")
            }
            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: Error,
            {
                match v.to_ascii_lowercase().as_str() {
                    "white" | "w" => Ok(Color::White),
                    "black" | "b" => Ok(Color::Black),
                    other => Err(Error::custom(format!("unknown side {other:?}"))),
                }
            }
        }
        d.deserialize_str(ColorVisitor)
    }
}
