//! Flashcard review scheduling.
//!
//! A simplified SM-2: a miss resets the card to tomorrow and makes it
//! harder; a hit grows the interval geometrically by the ease factor.

use serde::{Deserialize, Serialize};

pub const MIN_EASE: f64 = 1.3;
pub const MAX_EASE: f64 = 2.5;
pub const INITIAL_EASE: f64 = MAX_EASE;
/// Longest gap between reviews, roughly a century.
pub const MAX_INTERVAL_DAYS: i32 = 36_500;

const EASE_PENALTY: f64 = 0.2;
const EASE_BONUS: f64 = 0.1;

/// Scheduling state of one card for one learner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReviewState {
    pub ease_factor: f64,
    /// Days until the next review. Zero means never reviewed.
    pub interval_days: i32,
}

impl Default for ReviewState {
    fn default() -> Self {
        Self {
            ease_factor: INITIAL_EASE,
            interval_days: 0,
        }
    }
}

impl ReviewState {
    pub fn new(ease_factor: f64, interval_days: i32) -> Self {
        Self {
            ease_factor,
            interval_days,
        }
    }

    /// Next state after a review.
    ///
    /// Ease stays within [`MIN_EASE`, `MAX_EASE`]. A correct answer never
    /// shortens the interval, which tops out at [`MAX_INTERVAL_DAYS`].
    pub fn review(self, correct: bool) -> Self {
        if !correct {
            return Self {
                ease_factor: (self.ease_factor - EASE_PENALTY).max(MIN_EASE),
                interval_days: 1,
            };
        }

        if self.interval_days <= 0 {
            return Self {
                ease_factor: self.ease_factor,
                interval_days: 1,
            };
        }

        let grown = (f64::from(self.interval_days) * self.ease_factor)
            .round()
            .min(f64::from(MAX_INTERVAL_DAYS)) as i32;
        Self {
            ease_factor: (self.ease_factor + EASE_BONUS).min(MAX_EASE),
            interval_days: grown.max(self.interval_days).min(MAX_INTERVAL_DAYS),
        }
    }
}
