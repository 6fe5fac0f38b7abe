// Copyright 2023 The hhcode Contributors.
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

use std::convert::TryFrom;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::consts::{MAX_RESOLUTION, MIN_RESOLUTION, NUM_LEVELS};
use crate::hhcode::error::{HHError, HHResult};

lazy_static::lazy_static! {
    // Code prefix masks, indexed by level (resolution / 2 - 1).
    static ref PREFIX_MASKS: [u64; NUM_LEVELS] = {
        let mut masks = [0u64; NUM_LEVELS];
        for (level, mask) in masks.iter_mut().enumerate() {
            *mask = !(u64::MAX.checked_shr(4 * (level as u32 + 1)).unwrap_or(0));
        }
        masks
    };
}

/// Resolution is the number of significant bit pairs of a code, an even
/// value between 2 and 32. Each step of 2 adds one hex digit, i.e. splits a
/// cell into 16 children.
///
/// A Resolution can only be built through [`Resolution::new`], so every
/// operation taking one can rely on it being valid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "i64", into = "i64")
)]
pub struct Resolution(u8);

impl Resolution {
    pub const MIN: Resolution = Resolution(MIN_RESOLUTION as u8);
    pub const MAX: Resolution = Resolution(MAX_RESOLUTION as u8);

    /// Validates `value`; odd values and values outside 2..=32 are rejected,
    /// never rounded.
    pub fn new<T: Into<i64>>(value: T) -> HHResult<Self> {
        let value = value.into();
        if value < MIN_RESOLUTION as i64 || value > MAX_RESOLUTION as i64 || value % 2 != 0 {
            return Err(HHError::InvalidResolution(value));
        }
        Ok(Resolution(value as u8))
    }

    /// Returns the resolution of level `level` (0 for resolution 2, 15 for 32).
    pub(crate) fn from_level(level: usize) -> Self {
        debug_assert!(level < NUM_LEVELS);
        Resolution(((level + 1) * 2) as u8)
    }

    /// Iterates over all resolutions, coarsest first.
    pub fn all() -> impl DoubleEndedIterator<Item = Resolution> + ExactSizeIterator {
        (0..NUM_LEVELS).map(Resolution::from_level)
    }

    pub fn value(self) -> u32 {
        self.0 as u32
    }

    pub fn level(self) -> usize {
        (self.0 / 2 - 1) as usize
    }

    /// Number of significant hex digits.
    pub fn digits(self) -> usize {
        (self.0 / 2) as usize
    }

    /// Mask keeping the significant bits of a code.
    pub fn prefix_mask(self) -> u64 {
        PREFIX_MASKS[self.level()]
    }

    /// Bit position of the least significant hex digit at this resolution.
    pub fn digit_shift(self) -> u32 {
        64 - 2 * self.0 as u32
    }

    /// Width of a cell along either axis, in axis units.
    pub fn axis_span(self) -> i64 {
        1i64 << (MAX_RESOLUTION - self.0 as u32)
    }

    /// Mask of the axis bits below the cell's granularity.
    pub fn axis_offset_mask(self) -> i64 {
        self.axis_span() - 1
    }

    /// Mask of the axis bits significant at this resolution.
    pub fn axis_prefix_mask(self) -> i64 {
        !self.axis_offset_mask()
    }

    pub fn finer(self) -> Option<Resolution> {
        if self == Resolution::MAX {
            None
        } else {
            Some(Resolution(self.0 + 2))
        }
    }

    pub fn coarser(self) -> Option<Resolution> {
        if self == Resolution::MIN {
            None
        } else {
            Some(Resolution(self.0 - 2))
        }
    }
}

impl TryFrom<i64> for Resolution {
    type Error = HHError;

    fn try_from(value: i64) -> HHResult<Self> {
        Resolution::new(value)
    }
}

impl From<Resolution> for i64 {
    fn from(res: Resolution) -> i64 {
        res.0 as i64
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_validation() {
        for r in (2..=32).step_by(2) {
            assert_eq!(Resolution::new(r).map(Resolution::value), Ok(r as u32));
        }
        for r in &[-2i64, 0, 1, 3, 17, 31, 33, 34, 64] {
            assert_eq!(Resolution::new(*r), Err(HHError::InvalidResolution(*r)));
        }
    }

    #[test]
    fn test_prefix_masks() {
        assert_eq!(Resolution::MIN.prefix_mask(), 0xf000_0000_0000_0000);
        assert_eq!(Resolution::new(16).unwrap().prefix_mask(), 0xffff_ffff_0000_0000);
        assert_eq!(Resolution::new(30).unwrap().prefix_mask(), 0xffff_ffff_ffff_fff0);
        assert_eq!(Resolution::MAX.prefix_mask(), u64::MAX);
    }

    #[test]
    fn test_levels_and_neighbors() {
        let all: Vec<u32> = Resolution::all().map(Resolution::value).collect();
        assert_eq!(all.len(), 16);
        assert_eq!(all[0], 2);
        assert_eq!(all[15], 32);

        for res in Resolution::all() {
            assert_eq!(Resolution::from_level(res.level()), res);
            assert_eq!(res.digits() * 2, res.value() as usize);
        }

        assert_eq!(Resolution::MIN.coarser(), None);
        assert_eq!(Resolution::MAX.finer(), None);
        assert_eq!(Resolution::MIN.finer(), Resolution::new(4).ok());
        assert_eq!(Resolution::MIN.axis_span(), 1 << 30);
        assert_eq!(Resolution::MAX.axis_span(), 1);
        assert_eq!(Resolution::MAX.digit_shift(), 0);
        assert_eq!(Resolution::MIN.digit_shift(), 60);
    }
}
