//! Fixed-width relay bit-string.
//!
//! A board's relay state is stored and transmitted as a string of `'0'` /
//! `'1'` characters, one per relay. Index 0 is physical relay 1.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

const ON: char = '1';
const OFF: char = '0';

/// Last-known on/off state of every relay on a board.
///
/// The string always consists solely of `'0'` and `'1'`; its length is the
/// board's relay count.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RelayState(String);

impl RelayState {
    /// All relays off.
    pub fn all_off(total_relays: usize) -> Self {
        Self(OFF.to_string().repeat(total_relays))
    }

    /// Build a state from per-relay flags, relay 1 first.
    pub fn from_bits<I>(bits: I) -> Self
    where
        I: IntoIterator<Item = bool>,
    {
        Self(bits.into_iter().map(|on| if on { ON } else { OFF }).collect())
    }

    /// Parse a persisted or client-supplied bit-string.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        if let Some(bad) = raw.chars().find(|c| *c != ON && *c != OFF) {
            return Err(CoreError::Validation(format!(
                "relay state may only contain '0' and '1', found {bad:?}"
            )));
        }
        Ok(Self(raw.to_string()))
    }

    /// Number of relays represented.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the relay at `index` (0-based) is on. Out of range reads as off.
    pub fn is_on(&self, index: usize) -> bool {
        self.0.as_bytes().get(index) == Some(&b'1')
    }

    /// A copy of this state with the relay at `index` flipped.
    ///
    /// Returns `None` when `index` is outside the state.
    pub fn toggled(&self, index: usize) -> Option<Self> {
        if index >= self.len() {
            return None;
        }
        Some(Self::from_bits(
            (0..self.len()).map(|i| if i == index { !self.is_on(i) } else { self.is_on(i) }),
        ))
    }

    /// Pad with `'0'` or truncate so the state is exactly `total_relays` wide.
    ///
    /// Used when a persisted value predates a change of the board's relay count.
    pub fn fit_to(&self, total_relays: usize) -> Self {
        Self::from_bits((0..total_relays).map(|i| self.is_on(i)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RelayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RelayState {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RelayState> for String {
    fn from(state: RelayState) -> Self {
        state.0
    }
}
