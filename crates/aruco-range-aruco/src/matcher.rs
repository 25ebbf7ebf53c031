//! Code lookup against a dictionary, in all four orientations.

use std::collections::HashMap;

use crate::Dictionary;

/// Result of looking up an observed code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Match {
    pub id: u32,
    /// Quarter turns applied to the stored code to reproduce the observation.
    pub rotation: u8,
    /// Number of differing bits.
    pub hamming: u8,
}

/// Dictionary lookup with optional error correction.
///
/// Exact hits go through a hash index over every rotated code; only when
/// that misses and `max_hamming > 0` does the matcher scan all candidates.
#[derive(Clone, Debug)]
pub struct Matcher {
    dict: Dictionary,
    max_hamming: u8,
    exact: HashMap<u64, (u32, u8)>,
    orientations: Vec<[u64; 4]>,
}

impl Matcher {
    pub fn new(dict: Dictionary, max_hamming: u8) -> Self {
        debug_assert!(dict.bit_count() <= 64, "marker codes wider than 64 bits");

        let side = dict.marker_size;
        let mut orientations = Vec::with_capacity(dict.len());
        let mut exact = HashMap::with_capacity(dict.len() * 4);
        for (id, &stored) in dict.codes.iter().enumerate() {
            let mut turns = [stored; 4];
            for k in 1..4 {
                turns[k] = quarter_turn(turns[k - 1], side);
            }
            for (k, &code) in turns.iter().enumerate() {
                // Lower ids win if two orientations collide.
                exact.entry(code).or_insert((id as u32, k as u8));
            }
            orientations.push(turns);
        }

        Self {
            dict,
            max_hamming,
            exact,
            orientations,
        }
    }

    #[inline]
    pub fn dictionary(&self) -> Dictionary {
        self.dict
    }

    #[inline]
    pub fn max_hamming(&self) -> u8 {
        self.max_hamming
    }

    /// Closest dictionary entry within `max_hamming` bits.
    ///
    /// Ties on distance go to the lower id, then the lower rotation.
    pub fn match_code(&self, observed: u64) -> Option<Match> {
        if let Some(&(id, rotation)) = self.exact.get(&observed) {
            return Some(Match {
                id,
                rotation,
                hamming: 0,
            });
        }
        if self.max_hamming == 0 {
            return None;
        }

        self.orientations
            .iter()
            .enumerate()
            .flat_map(|(id, turns)| {
                turns.iter().enumerate().map(move |(rotation, &code)| Match {
                    id: id as u32,
                    rotation: rotation as u8,
                    hamming: (observed ^ code).count_ones() as u8,
                })
            })
            .filter(|m| m.hamming <= self.max_hamming)
            .min_by_key(|m| (m.hamming, m.id, m.rotation))
    }
}

/// One clockwise quarter turn of a `side x side` row-major bit grid.
fn quarter_turn(code: u64, side: usize) -> u64 {
    let mut turned = 0u64;
    for row in 0..side {
        for col in 0..side {
            let src = (side - 1 - col) * side + row;
            if (code >> src) & 1 == 1 {
                turned |= 1u64 << (row * side + col);
            }
        }
    }
    turned
}

/// Rotate a row-major code (`bit = y * n + x`) by `rot` quarter turns.
pub fn rotate_code_u64(code: u64, n: usize, rot: u8) -> u64 {
    (0..rot & 3).fold(code, |c, _| quarter_turn(c, n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::{DICT_4X4_100, DICT_4X4_50};

    #[test]
    fn quarter_turn_moves_corner_bit() {
        // Bit (x=0, y=0) ends up at (x=3, y=0) after one clockwise turn.
        assert_eq!(quarter_turn(1, 4), 1 << 3);
        assert_eq!(rotate_code_u64(1, 4, 2), 1 << 15);
        assert_eq!(rotate_code_u64(1, 4, 3), 1 << 12);
    }

    #[test]
    fn full_turn_restores_code() {
        let code = 0x4cad_u64;
        assert_eq!(rotate_code_u64(code, 4, 4), code);
        assert_eq!(rotate_code_u64(rotate_code_u64(code, 4, 1), 4, 3), code);
    }

    #[test]
    fn exact_lookup_reports_rotation() {
        let matcher = Matcher::new(DICT_4X4_50, 0);
        for rot in 0..4u8 {
            let observed = rotate_code_u64(DICT_4X4_50.codes[17], 4, rot);
            let m = matcher.match_code(observed).expect("match");
            assert_eq!((m.id, m.rotation, m.hamming), (17, rot, 0));
        }
    }

    #[test]
    fn one_flipped_bit_is_corrected_only_when_allowed() {
        let observed = DICT_4X4_50.codes[4] ^ (1 << 6);

        let lenient = Matcher::new(DICT_4X4_50, DICT_4X4_50.max_correction_bits);
        let m = lenient.match_code(observed).expect("match");
        assert_eq!((m.id, m.hamming), (4, 1));

        let strict = Matcher::new(DICT_4X4_50, 0);
        assert!(strict.match_code(observed).map_or(true, |m| m.id != 4));
    }

    #[test]
    fn blank_codes_do_not_match() {
        let matcher = Matcher::new(DICT_4X4_50, 0);
        assert_eq!(matcher.match_code(0), None);
        assert_eq!(matcher.match_code(0xffff), None);
    }

    #[test]
    fn larger_dictionary_indexes_every_id() {
        let matcher = Matcher::new(DICT_4X4_100, 0);
        let m = matcher.match_code(DICT_4X4_100.codes[87]).expect("match");
        assert_eq!(m.id, 87);
    }
}
