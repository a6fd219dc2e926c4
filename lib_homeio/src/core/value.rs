//! # Item Value Model
//!
//! The backend exposes every data point as a dynamically-typed scalar.
//! `ItemValue` is the closed union over the three wire shapes (boolean,
//! number, string) with decode/encode happening only at the transport
//! boundary via `serde`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A scalar value associated with one item at a point in time.
///
/// Deserialization is untagged: JSON `true` becomes `Bool`, any JSON number
/// becomes `Number`, and everything quoted becomes `Text`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemValue {
    /// A switch-like state (`true`/`false` on the wire).
    Bool(bool),
    /// A numeric reading; integers and floats share this variant.
    Number(f64),
    /// Free-form text state.
    Text(String),
}

impl ItemValue {
    /// Coerces the value into a plottable number.
    ///
    /// Booleans map to 0/1 and unparseable text maps to 0, so a series never
    /// fails to render because one sample was textual.
    pub fn plot_number(&self) -> f64 {
        match self {
            ItemValue::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            ItemValue::Number(n) => *n,
            ItemValue::Text(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        }
    }
}

impl fmt::Display for ItemValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemValue::Bool(b) => write!(f, "{}", b),
            ItemValue::Number(n) => write!(f, "{}", n),
            ItemValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for ItemValue {
    fn from(b: bool) -> Self {
        ItemValue::Bool(b)
    }
}

impl From<f64> for ItemValue {
    fn from(n: f64) -> Self {
        ItemValue::Number(n)
    }
}

impl From<&str> for ItemValue {
    fn from(s: &str) -> Self {
        ItemValue::Text(s.to_string())
    }
}
