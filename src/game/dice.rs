//! Stick Dice
//!
//! Four two-faced sticks, each landing light or dark with equal odds. The
//! value is the number of light faces, except that zero light faces counts
//! as 6. Values 1, 4 and 6 grant another throw.

use serde::{Serialize, Deserialize};

use crate::core::rng::DeterministicRng;

/// Number of sticks thrown.
pub const STICKS: usize = 4;

/// Probability of each throw value, indexed by value (index 0 and 5 unused).
///
/// 0 light → 6 (1/16), 1 → 4/16, 2 → 6/16, 3 → 4/16, 4 → 1/16.
pub const VALUE_PROBABILITIES: [f64; 7] = [
    0.0,
    4.0 / 16.0,
    6.0 / 16.0,
    4.0 / 16.0,
    1.0 / 16.0,
    0.0,
    1.0 / 16.0,
];

/// Whether a throw value grants another throw.
#[inline]
pub fn grants_repeat(value: u8) -> bool {
    matches!(value, 1 | 4 | 6)
}

/// One throw of the sticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceResult {
    /// Face of each stick; `true` is light.
    pub stick_faces: [bool; STICKS],
    /// Steps to move, 1..=6 (never 5, never 0).
    pub value: u8,
    /// The thrower keeps the turn after using this value.
    pub must_repeat: bool,
    /// Set once a move has spent this value.
    pub consumed: bool,
}

impl DiceResult {
    /// Score a given set of stick faces.
    pub fn from_faces(stick_faces: [bool; STICKS]) -> Self {
        let light = stick_faces.iter().filter(|f| **f).count() as u8;
        let value = if light == 0 { 6 } else { light };
        Self {
            stick_faces,
            value,
            must_repeat: grants_repeat(value),
            consumed: false,
        }
    }
}

/// Thrower of the four sticks.
#[derive(Clone, Copy, Debug, Default)]
pub struct DiceModel;

impl DiceModel {
    /// Throw all four sticks once.
    pub fn roll_once(rng: &mut DeterministicRng) -> DiceResult {
        let mut faces = [false; STICKS];
        for face in faces.iter_mut() {
            *face = rng.next_coin();
        }
        DiceResult::from_faces(faces)
    }

    /// Just the value of a throw, for playouts that don't need the faces.
    #[inline]
    pub fn roll_value(rng: &mut DeterministicRng) -> u8 {
        Self::roll_once(rng).value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_dark_is_six() {
        let r = DiceResult::from_faces([false; 4]);
        assert_eq!(r.value, 6);
        assert!(r.must_repeat);
        assert!(!r.consumed);
    }

    #[test]
    fn test_face_counts() {
        assert_eq!(DiceResult::from_faces([true, false, false, false]).value, 1);
        assert_eq!(DiceResult::from_faces([true, true, false, false]).value, 2);
        assert_eq!(DiceResult::from_faces([true, true, true, false]).value, 3);
        assert_eq!(DiceResult::from_faces([true, true, true, true]).value, 4);
    }

    #[test]
    fn test_repeat_flag() {
        for v in 1..=6u8 {
            assert_eq!(grants_repeat(v), v == 1 || v == 4 || v == 6);
        }
        assert!(!DiceResult::from_faces([true, true, false, false]).must_repeat);
        assert!(!DiceResult::from_faces([true, true, true, false]).must_repeat);
    }

    #[test]
    fn test_distribution_roughly_matches_table() {
        let mut rng = DeterministicRng::new(2024);
        let mut counts = [0usize; 7];
        let n = 32_000;
        for _ in 0..n {
            counts[DiceModel::roll_value(&mut rng) as usize] += 1;
        }
        assert_eq!(counts[0], 0);
        assert_eq!(counts[5], 0);
        for v in [1usize, 2, 3, 4, 6] {
            let expected = VALUE_PROBABILITIES[v] * n as f64;
            let diff = (counts[v] as f64 - expected).abs();
            assert!(diff < expected * 0.15 + 50.0, "value {} seen {} times", v, counts[v]);
        }
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let sum: f64 = VALUE_PROBABILITIES.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
    }
}
