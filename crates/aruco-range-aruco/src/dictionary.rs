//! Built-in marker code tables and name lookup.

use crate::builtins;

/// A fixed ArUco-style dictionary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dictionary {
    /// Human-readable name, e.g. `DICT_4X4_50`.
    pub name: &'static str,
    /// Inner bits per side, excluding the black border.
    pub marker_size: usize,
    /// Bit errors the code set can correct without ambiguity.
    pub max_correction_bits: u8,
    /// Packed inner bits, indexed by marker id.
    ///
    /// Bits are stored row-major, least significant bit first, with
    /// **white = 1** (the OpenCV layout).
    pub codes: &'static [u64],
}

/// Lookup failure for a dictionary name.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DictionaryError {
    #[error("unknown dictionary {0:?} (available: {available})", available = builtins::NAMES.join(", "))]
    Unknown(String),
}

impl Dictionary {
    /// Inner bits per marker.
    #[inline]
    pub fn bit_count(&self) -> usize {
        self.marker_size * self.marker_size
    }

    /// Number of marker ids in the dictionary.
    #[inline]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Packed code for `id`, if the id exists.
    #[inline]
    pub fn code(&self, id: u32) -> Option<u64> {
        self.codes.get(id as usize).copied()
    }

    /// Inner bit at `(x, y)` of `code`; `true` means white.
    #[inline]
    pub fn bit(&self, code: u64, x: usize, y: usize) -> bool {
        (code >> (y * self.marker_size + x)) & 1 == 1
    }

    /// Resolve a built-in dictionary by name (case-insensitive).
    pub fn by_name(name: &str) -> Result<Self, DictionaryError> {
        builtins::builtin_dictionary(name).ok_or_else(|| DictionaryError::Unknown(name.to_string()))
    }
}
