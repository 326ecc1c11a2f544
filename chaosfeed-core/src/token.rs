//! Token to quote-currency converter.
//!
//! The rate is locked when the converter is opened, so later ticks of the
//! token feed do not move a quote in progress. The amount is edited one key
//! at a time, like a keypad, starting from one token.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    Digit(u8),
    Point,
    Backspace,
    Clear,
}

impl Key {
    /// Parse a keypad label: `0`-`9`, `.`, `<` (backspace) or `C` (clear).
    pub fn parse(label: char) -> Option<Self> {
        match label {
            '0'..='9' => Some(Key::Digit(label as u8 - b'0')),
            '.' => Some(Key::Point),
            '<' => Some(Key::Backspace),
            'C' | 'c' => Some(Key::Clear),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TokenConverter {
    locked_rate: f64,
    amount: String,
}

impl TokenConverter {
    pub fn new(locked_rate: f64) -> Self {
        Self {
            locked_rate: if locked_rate.is_finite() { locked_rate } else { 0.0 },
            amount: "1".to_string(),
        }
    }

    pub fn locked_rate(&self) -> f64 {
        self.locked_rate
    }

    /// The amount as typed.
    pub fn amount(&self) -> &str {
        &self.amount
    }

    pub fn press(&mut self, key: Key) {
        match key {
            Key::Clear => self.amount = "0".to_string(),
            Key::Backspace => {
                self.amount.pop();
                if self.amount.is_empty() {
                    self.amount.push('0');
                }
            }
            Key::Point => {
                if !self.amount.contains('.') {
                    self.amount.push('.');
                }
            }
            Key::Digit(d) => {
                let ch = char::from(b'0' + d.min(9));
                if self.amount == "0" {
                    self.amount = ch.to_string();
                } else {
                    self.amount.push(ch);
                }
            }
        }
    }

    /// Type a whole string of keypad labels, skipping unknown characters.
    pub fn type_str(&mut self, keys: &str) {
        for key in keys.chars().filter_map(Key::parse) {
            self.press(key);
        }
    }

    /// Quote-currency value; an unparsable amount counts as zero.
    pub fn value(&self) -> f64 {
        self.amount.parse::<f64>().unwrap_or(0.0) * self.locked_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keypad_editing() {
        let mut c = TokenConverter::new(0.0002);
        assert_eq!(c.amount(), "1");
        c.type_str("000");
        assert_eq!(c.amount(), "1000");
        assert!((c.value() - 0.2).abs() < 1e-12);

        c.type_str("..5");
        assert_eq!(c.amount(), "1000.5");
        c.type_str("<<<<<<<");
        assert_eq!(c.amount(), "0");
        c.type_str("7C");
        assert_eq!(c.amount(), "0");
    }

    #[test]
    fn trailing_point_still_parses() {
        let mut c = TokenConverter::new(2.0);
        c.type_str("C3.");
        assert_eq!(c.value(), 6.0);
    }

    #[test]
    fn rate_stays_locked() {
        let c = TokenConverter::new(f64::INFINITY);
        assert_eq!(c.locked_rate(), 0.0);
        assert_eq!(c.value(), 0.0);
    }
}
