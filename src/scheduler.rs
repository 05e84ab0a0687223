// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! An SM-2 style scheduler.
//!
//! Every function here is pure: the current time is always an argument, so
//! the same inputs always produce the same outputs.

use crate::types::card_state::CardState;
use crate::types::rating::Rating;
use crate::types::timestamp::Timestamp;

/// Recorded on every review event, so that the log can be replayed if the
/// algorithm changes.
pub const ALGORITHM_VERSION: u32 = 1;

/// The ease factor of a card that has never been reviewed.
pub const INITIAL_EASE_FACTOR: f64 = 2.5;

/// The ease factor never drops below this.
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Interval after the first success following a lapse, or on a new card.
const FIRST_INTERVAL: u32 = 1;

/// Interval after the second consecutive success.
const SECOND_INTERVAL: u32 = 6;

/// Interval after any failure.
const LAPSE_INTERVAL: u32 = 1;

/// The longest interval the scheduler will assign, in days.
pub const MAX_INTERVAL_DAYS: u32 = 36_500;

/// Multiplier applied to the interval on an `Easy` rating.
const EASY_BONUS: f64 = 1.3;

const GOOD_EASE_DELTA: f64 = 0.10;
const EASY_EASE_DELTA: f64 = 0.15;
const LAPSE_EASE_PENALTY: f64 = 0.20;

/// Extra penalty for `Hard`, on top of the lapse penalty.
const HARD_EASE_PENALTY: f64 = 0.15;

/// The result of scheduling a review.
#[derive(Clone, PartialEq, Debug)]
pub struct Scheduled {
    pub state: CardState,
    pub due_at: Timestamp,
    pub prev_interval: u32,
    pub next_interval: u32,
}

/// Apply a review to a card's state.
///
/// `Hard` counts as a failure: it resets the streak, counts as a lapse, and
/// costs more ease than `Again`.
pub fn review(state: &CardState, rating: Rating, now: Timestamp) -> Scheduled {
    let (interval, streak, lapses, ease_factor) = match rating {
        Rating::Again => lapse(state),
        Rating::Hard => {
            // Applied after the lapse penalty, not folded into it: the two
            // subtractions round differently from a single one.
            let (interval, streak, lapses, ease_factor) = lapse(state);
            (interval, streak, lapses, ease_factor - HARD_EASE_PENALTY)
        }
        Rating::Good => {
            let interval = recalled_interval(state);
            (
                interval,
                state.streak + 1,
                state.lapses,
                state.ease_factor + GOOD_EASE_DELTA,
            )
        }
        Rating::Easy => {
            let interval = (f64::from(recalled_interval(state)) * EASY_BONUS).floor() as u32;
            (
                interval,
                state.streak + 1,
                state.lapses,
                state.ease_factor + EASY_EASE_DELTA,
            )
        }
    };
    // A card is never due again the instant it is reviewed.
    let interval = interval.clamp(1, MAX_INTERVAL_DAYS);
    let due_at = now.plus_days(interval);
    Scheduled {
        state: CardState {
            ease_factor: ease_factor.max(MIN_EASE_FACTOR),
            interval_days: interval,
            streak,
            lapses,
            suspended: state.suspended,
            due_at: Some(due_at),
            last_reviewed_at: Some(now),
        },
        due_at,
        prev_interval: state.interval_days,
        next_interval: interval,
    }
}

/// The interval for a successful review, before any `Easy` bonus.
fn recalled_interval(state: &CardState) -> u32 {
    match state.streak {
        0 => FIRST_INTERVAL,
        1 => SECOND_INTERVAL,
        _ => (f64::from(state.interval_days) * state.ease_factor).floor() as u32,
    }
}

fn lapse(state: &CardState) -> (u32, u32, u32, f64) {
    (
        LAPSE_INTERVAL,
        0,
        state.lapses + 1,
        state.ease_factor - LAPSE_EASE_PENALTY,
    )
}

/// Return a card to its never-reviewed state. Suspension is kept.
pub fn reset(state: &CardState) -> CardState {
    CardState {
        suspended: state.suspended,
        ..CardState::default()
    }
}

/// Whether a card should be offered for review at `now`.
pub fn is_due(state: &CardState, now: Timestamp) -> bool {
    !state.suspended && state.due_at.is_none_or(|due_at| due_at <= now)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use chrono::Utc;

    use super::*;

    const EPSILON: f64 = 1e-9;

    fn now() -> Timestamp {
        Timestamp::new(Utc.with_ymd_and_hms(2025, 6, 1, 9, 30, 0).unwrap())
    }

    fn state(ease_factor: f64, interval_days: u32, streak: u32, lapses: u32) -> CardState {
        CardState {
            ease_factor,
            interval_days,
            streak,
            lapses,
            ..CardState::default()
        }
    }

    fn assert_ease(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < EPSILON,
            "expected ease {expected}, got {actual}"
        );
    }

    #[test]
    fn test_deterministic() {
        let s = state(2.3, 12, 4, 2);
        for rating in [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy] {
            assert_eq!(review(&s, rating, now()), review(&s, rating, now()));
        }
    }

    #[test]
    fn test_first_good() {
        let result = review(&CardState::default(), Rating::Good, now());
        assert_eq!(result.next_interval, 1);
        assert_eq!(result.prev_interval, 0);
        assert_eq!(result.state.streak, 1);
        assert_eq!(result.state.lapses, 0);
        assert_ease(result.state.ease_factor, 2.6);
        assert_eq!(result.due_at, now().plus_days(1));
        assert_eq!(result.state.due_at, Some(result.due_at));
        assert_eq!(result.state.last_reviewed_at, Some(now()));
    }

    #[test]
    fn test_second_good() {
        let first = review(&CardState::default(), Rating::Good, now());
        let second = review(&first.state, Rating::Good, now());
        assert_eq!(second.prev_interval, 1);
        assert_eq!(second.next_interval, 6);
        assert_eq!(second.state.streak, 2);
    }

    #[test]
    fn test_third_good_multiplies_by_ease() {
        let result = review(&state(2.6, 6, 2, 0), Rating::Good, now());
        assert_eq!(result.next_interval, 15);
        assert_eq!(result.state.streak, 3);
        assert_ease(result.state.ease_factor, 2.7);
    }

    #[test]
    fn test_streak_rules_ignore_prior_interval() {
        // A lapsed card with a long interval still restarts at 1, then 6.
        let result = review(&state(2.5, 40, 0, 1), Rating::Good, now());
        assert_eq!(result.next_interval, 1);
        let result = review(&state(2.5, 40, 1, 1), Rating::Good, now());
        assert_eq!(result.next_interval, 6);
    }

    #[test]
    fn test_easy_on_fresh_card() {
        let result = review(&CardState::default(), Rating::Easy, now());
        assert_eq!(result.next_interval, 1);
        assert_eq!(result.state.streak, 1);
        assert_ease(result.state.ease_factor, 2.65);
    }

    #[test]
    fn test_easy_bonus_applies_after_streak_rule() {
        // floor(6 * 1.3) = 7
        let result = review(&state(2.5, 1, 1, 0), Rating::Easy, now());
        assert_eq!(result.next_interval, 7);
        // floor(floor(10 * 2.5) * 1.3) = floor(25 * 1.3) = 32
        let result = review(&state(2.5, 10, 2, 0), Rating::Easy, now());
        assert_eq!(result.next_interval, 32);
    }

    #[test]
    fn test_interval_is_truncated() {
        // 7 * 2.5 = 17.5
        let result = review(&state(2.5, 7, 3, 0), Rating::Good, now());
        assert_eq!(result.next_interval, 17);
    }

    #[test]
    fn test_again_is_a_lapse() {
        let result = review(&state(2.5, 15, 3, 0), Rating::Again, now());
        assert_eq!(result.next_interval, 1);
        assert_eq!(result.prev_interval, 15);
        assert_eq!(result.state.streak, 0);
        assert_eq!(result.state.lapses, 1);
        assert_ease(result.state.ease_factor, 2.3);
        assert_eq!(result.due_at, now().plus_days(1));
    }

    #[test]
    fn test_hard_has_extra_penalty() {
        let result = review(&state(2.5, 6, 2, 3), Rating::Hard, now());
        assert_eq!(result.next_interval, 1);
        assert_eq!(result.state.streak, 0);
        assert_eq!(result.state.lapses, 4);
        assert_ease(result.state.ease_factor, 2.15);
    }

    #[test]
    fn test_mixed_history_is_bit_exact() {
        // Again, Hard and Easy deltas applied step by step must land on
        // exactly 1.9, or the last Good review floors to 17 instead of 18.
        let ratings = [
            Rating::Easy,
            Rating::Good,
            Rating::Again,
            Rating::Again,
            Rating::Again,
            Rating::Hard,
            Rating::Hard,
            Rating::Easy,
            Rating::Good,
            Rating::Good,
        ];
        let mut s = CardState::default();
        for rating in ratings {
            s = review(&s, rating, now()).state;
        }
        assert_eq!(s.interval_days, 10);
        let last = review(&s, Rating::Good, now());
        assert_eq!(last.state.ease_factor.to_bits(), 1.9_f64.to_bits());
        assert_eq!(last.next_interval, 18);
        assert_eq!(last.state.streak, 4);
        assert_eq!(last.state.lapses, 5);
    }

    #[test]
    fn test_ease_floor() {
        let mut s = CardState::default();
        for _ in 0..20 {
            s = review(&s, Rating::Hard, now()).state;
            assert!(s.ease_factor >= MIN_EASE_FACTOR);
        }
        assert_ease(s.ease_factor, MIN_EASE_FACTOR);
        let result = review(&state(1.35, 3, 0, 0), Rating::Again, now());
        assert_ease(result.state.ease_factor, MIN_EASE_FACTOR);
    }

    #[test]
    fn test_ease_recovers_slowly() {
        let lapsed = review(&CardState::default(), Rating::Again, now()).state;
        assert_ease(lapsed.ease_factor, 2.3);
        let recovered = review(&lapsed, Rating::Good, now()).state;
        assert_ease(recovered.ease_factor, 2.4);
        assert_eq!(recovered.lapses, 1);
    }

    #[test]
    fn test_interval_is_at_least_one_day() {
        // floor(0 * 2.5) would be zero.
        let result = review(&state(2.5, 0, 5, 0), Rating::Good, now());
        assert_eq!(result.next_interval, 1);
        assert_eq!(result.state.interval_days, 1);
    }

    #[test]
    fn test_interval_is_capped() {
        let result = review(&state(2.5, 30_000, 9, 0), Rating::Easy, now());
        assert_eq!(result.next_interval, MAX_INTERVAL_DAYS);
        let mut s = CardState::default();
        for _ in 0..40 {
            s = review(&s, Rating::Easy, now()).state;
        }
        assert_eq!(s.interval_days, MAX_INTERVAL_DAYS);
    }

    #[test]
    fn test_review_keeps_suspension() {
        let s = CardState {
            suspended: true,
            ..CardState::default()
        };
        assert!(review(&s, Rating::Good, now()).state.suspended);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let s = CardState {
            ease_factor: 1.7,
            interval_days: 30,
            streak: 4,
            lapses: 6,
            suspended: false,
            due_at: Some(now()),
            last_reviewed_at: Some(now()),
        };
        let once = reset(&s);
        let twice = reset(&once);
        assert_eq!(once, twice);
        assert_eq!(once, CardState::default());
    }

    #[test]
    fn test_reset_keeps_suspension() {
        let s = CardState {
            suspended: true,
            lapses: 2,
            ..CardState::default()
        };
        let r = reset(&s);
        assert!(r.suspended);
        assert_eq!(r.lapses, 0);
    }

    #[test]
    fn test_due_predicate() {
        let fresh = CardState::default();
        assert!(is_due(&fresh, now()));

        let future = CardState {
            due_at: Some(now().plus_days(1)),
            ..CardState::default()
        };
        assert!(!is_due(&future, now()));

        let exactly_now = CardState {
            due_at: Some(now()),
            ..CardState::default()
        };
        assert!(is_due(&exactly_now, now()));

        let suspended = CardState {
            suspended: true,
            ..CardState::default()
        };
        assert!(!is_due(&suspended, now()));

        let suspended_overdue = CardState {
            suspended: true,
            due_at: Some(now()),
            ..CardState::default()
        };
        assert!(!is_due(&suspended_overdue, now().plus_days(3)));
    }
}
