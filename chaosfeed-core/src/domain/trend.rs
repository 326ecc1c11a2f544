use serde::{Deserialize, Serialize};

/// Shared trend flip-flop.
///
/// Owned by the market walk, which flips it at low probability. Other
/// components receive a copy at each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
}

impl TrendDirection {
    pub fn flipped(self) -> Self {
        match self {
            TrendDirection::Up => TrendDirection::Down,
            TrendDirection::Down => TrendDirection::Up,
        }
    }

    /// +1.0 for up, -1.0 for down.
    pub fn sign(self) -> f64 {
        match self {
            TrendDirection::Up => 1.0,
            TrendDirection::Down => -1.0,
        }
    }

    /// Direction of a move from `previous` to `current`; flat counts as up.
    pub fn between(previous: f64, current: f64) -> Self {
        if current >= previous {
            TrendDirection::Up
        } else {
            TrendDirection::Down
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flip_round_trips() {
        assert_eq!(TrendDirection::Up.flipped(), TrendDirection::Down);
        assert_eq!(TrendDirection::Up.flipped().flipped(), TrendDirection::Up);
    }

    #[test]
    fn between_treats_flat_as_up() {
        assert_eq!(TrendDirection::between(1.0, 1.0), TrendDirection::Up);
        assert_eq!(TrendDirection::between(1.0, 0.5), TrendDirection::Down);
    }
}
