//! Embedded built-in dictionaries.
//!
//! Codes follow the OpenCV `aruco` tables: row-major inner bits, least
//! significant bit first, white = 1. `DICT_4X4_100` extends `DICT_4X4_50`.

#![allow(clippy::unreadable_literal)]

use crate::Dictionary;

/// Names accepted by [`builtin_dictionary`].
pub const NAMES: &[&str] = &["DICT_4X4_50", "DICT_4X4_100"];

#[rustfmt::skip]
const DICT_4X4_50_CODES: [u64; 50] = [
    0x4cad, 0x59f0, 0xb4cc, 0x6299, 0x792a, 0xb39e, 0x7479, 0x4f23,
    0x5b7f, 0x6af3, 0x899f, 0xe588, 0xed70, 0xf054, 0x8d24, 0x7c64,
    0xa662, 0x0066, 0x7a36, 0xf56e, 0xd161, 0xd40d, 0xab33, 0x41bb,
    0xe27f, 0x8e29, 0x2735, 0x2aa5, 0xc484, 0xf62c, 0xa822, 0x4dea,
    0xf379, 0xd30f, 0x7510, 0x9490, 0xae18, 0xff20, 0x6fb0, 0x5a38,
    0x18e8, 0x1454, 0x314c, 0x4d1c, 0x1724, 0xd774, 0xfcb4, 0x26d2,
    0x740a, 0xc80a,
];

#[rustfmt::skip]
const DICT_4X4_100_CODES: [u64; 100] = [
    0x4cad, 0x59f0, 0xb4cc, 0x6299, 0x792a, 0xb39e, 0x7479, 0x4f23,
    0x5b7f, 0x6af3, 0x899f, 0xe588, 0xed70, 0xf054, 0x8d24, 0x7c64,
    0xa662, 0x0066, 0x7a36, 0xf56e, 0xd161, 0xd40d, 0xab33, 0x41bb,
    0xe27f, 0x8e29, 0x2735, 0x2aa5, 0xc484, 0xf62c, 0xa822, 0x4dea,
    0xf379, 0xd30f, 0x7510, 0x9490, 0xae18, 0xff20, 0x6fb0, 0x5a38,
    0x18e8, 0x1454, 0x314c, 0x4d1c, 0x1724, 0xd774, 0xfcb4, 0x26d2,
    0x740a, 0xc80a, 0x298a, 0x16aa, 0x82ba, 0xe9fa, 0x8016, 0xe616,
    0x2486, 0x9786, 0x48d6, 0xa7f6, 0xfbe6, 0xd87e, 0x0501, 0x22c1,
    0x45d1, 0x5ec9, 0x3621, 0x54a1, 0x39a1, 0x9139, 0x85f9, 0x3edd,
    0x203d, 0xda6d, 0x13fd, 0xd5ed, 0xf853, 0x4693, 0x1a9b, 0xabcb,
    0x1933, 0x05e3, 0xeca3, 0xba97, 0xa49f, 0xdddf, 0x5477, 0xb2ef,
    0xaeac, 0xb551, 0xe86e, 0xf350, 0xd260, 0x83b4, 0x1b92, 0x2fc2,
    0x6cf2, 0xcbf2, 0x2796, 0xe30e,
];

pub const DICT_4X4_50: Dictionary = Dictionary {
    name: "DICT_4X4_50",
    marker_size: 4,
    max_correction_bits: 1,
    codes: &DICT_4X4_50_CODES,
};

pub const DICT_4X4_100: Dictionary = Dictionary {
    name: "DICT_4X4_100",
    marker_size: 4,
    max_correction_bits: 1,
    codes: &DICT_4X4_100_CODES,
};

/// Look up a built-in dictionary by name (case-insensitive).
pub fn builtin_dictionary(name: &str) -> Option<Dictionary> {
    match name.to_ascii_uppercase().as_str() {
        "DICT_4X4_50" => Some(DICT_4X4_50),
        "DICT_4X4_100" => Some(DICT_4X4_100),
        _ => None,
    }
}
