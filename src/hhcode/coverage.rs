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

//! Multi-resolution cell sets and their algebra.

use std::collections::BTreeSet;
use std::convert::TryFrom;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::consts::{AXIS_MASK, NUM_LEVELS};
use crate::hhcode::cell;
use crate::hhcode::error::{HHError, HHResult};
use crate::hhcode::geocell::{self, max_geocell_resolution, GeoCell};
use crate::hhcode::point::{combine_axes, GeoCode};
use crate::hhcode::resolution::Resolution;

/// Thresholds holds one merge threshold (0..=15) per resolution.
///
/// Externally thresholds travel packed in a u64, one nibble per resolution,
/// resolution 2 in the top nibble and resolution 32 in the lowest one. A
/// threshold of 0 merges a parent only when all 16 of its children are
/// present; a threshold t > 0 merges as soon as t children are present.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(from = "u64", into = "u64")
)]
pub struct Thresholds([u8; NUM_LEVELS]);

impl Thresholds {
    /// Merge complete sibling sets only.
    pub const LOSSLESS: Thresholds = Thresholds([0; NUM_LEVELS]);

    pub fn from_packed(packed: u64) -> Self {
        let mut levels = [0u8; NUM_LEVELS];
        for (level, t) in levels.iter_mut().enumerate() {
            *t = ((packed >> (4 * (NUM_LEVELS - 1 - level))) & 0xf) as u8;
        }
        Thresholds(levels)
    }

    pub fn packed(self) -> u64 {
        self.0
            .iter()
            .enumerate()
            .fold(0u64, |acc, (level, t)| {
                acc | ((*t as u64 & 0xf) << (4 * (NUM_LEVELS - 1 - level)))
            })
    }

    /// Same threshold at every resolution.
    pub fn uniform(threshold: u8) -> Self {
        Thresholds([threshold.min(15); NUM_LEVELS])
    }

    /// Copy of these thresholds with `res` set to `threshold`.
    pub fn with(mut self, res: Resolution, threshold: u8) -> Self {
        self.0[res.level()] = threshold.min(15);
        self
    }

    pub fn at(self, res: Resolution) -> u8 {
        self.0[res.level()]
    }
}

impl From<u64> for Thresholds {
    fn from(packed: u64) -> Self {
        Thresholds::from_packed(packed)
    }
}

impl From<Thresholds> for u64 {
    fn from(t: Thresholds) -> u64 {
        t.packed()
    }
}

/// Coverage is a mutable set of cells at resolutions 2 to 32 whose union
/// approximates a region.
///
/// Cells are stored already truncated to their resolution, one ordered set
/// per resolution. A coverage may hold a cell together with finer cells
/// inside it; [`Coverage::dedup`] removes those finer cells.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Coverage {
    cells: [BTreeSet<GeoCode>; NUM_LEVELS],
}

impl Coverage {
    pub fn new() -> Self {
        Coverage::default()
    }

    /// Builds a coverage from (resolution, code) pairs.
    pub fn from_cells<I>(cells: I) -> Self
    where
        I: IntoIterator<Item = (Resolution, GeoCode)>,
    {
        let mut coverage = Coverage::new();
        for (res, code) in cells {
            coverage.add_cell(res, code);
        }
        coverage
    }

    /// Builds a coverage from geocells.
    pub fn from_geocells(geocells: &[GeoCell]) -> HHResult<Self> {
        let mut coverage = Coverage::new();
        for gc in geocells {
            let (code, res) = geocell::from_geocell(*gc)?;
            coverage.add_cell(res, code);
        }
        Ok(coverage)
    }

    /// Inserts the cell containing `code` at `res`. Returns false if it was
    /// already present.
    pub fn add_cell(&mut self, res: Resolution, code: GeoCode) -> bool {
        self.cells[res.level()].insert(cell::truncate(code, res))
    }

    /// Inserts the cell at grid coordinates (lat, lon). Coordinates outside
    /// `[0, 2^32)` wrap around.
    pub fn add_axes(&mut self, res: Resolution, lat: i64, lon: i64) -> bool {
        let lat = (lat & AXIS_MASK) as u32;
        let lon = (lon & AXIS_MASK) as u32;
        self.add_cell(res, combine_axes(lat, lon, Resolution::MAX))
    }

    pub fn remove_cell(&mut self, res: Resolution, code: GeoCode) -> bool {
        self.cells[res.level()].remove(&cell::truncate(code, res))
    }

    /// True if the cell containing `code` at `res` is present.
    pub fn contains_cell(&self, res: Resolution, code: GeoCode) -> bool {
        self.cells[res.level()].contains(&cell::truncate(code, res))
    }

    /// Cells at `res`, in ascending order.
    pub fn cells(&self, res: Resolution) -> &BTreeSet<GeoCode> {
        &self.cells[res.level()]
    }

    /// All cells, coarsest resolution first.
    pub fn iter(&self) -> impl Iterator<Item = (Resolution, GeoCode)> + '_ {
        self.cells.iter().enumerate().flat_map(|(level, set)| {
            let res = Resolution::from_level(level);
            set.iter().map(move |code| (res, *code))
        })
    }

    /// Resolutions holding at least one cell, coarsest first.
    pub fn resolutions(&self) -> Vec<Resolution> {
        Resolution::all()
            .filter(|res| !self.cells[res.level()].is_empty())
            .collect()
    }

    pub fn cell_count(&self) -> usize {
        self.cells.iter().map(BTreeSet::len).sum()
    }

    pub fn cell_count_at(&self, res: Resolution) -> usize {
        self.cells[res.level()].len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(BTreeSet::is_empty)
    }

    pub fn clear(&mut self) {
        for set in self.cells.iter_mut() {
            set.clear();
        }
    }

    pub fn coarsest(&self) -> Option<Resolution> {
        self.resolutions().first().copied()
    }

    pub fn finest(&self) -> Option<Resolution> {
        self.resolutions().last().copied()
    }

    /// Coarsest resolution at which a cell contains `code`.
    pub fn coarsest_resolution(&self, code: GeoCode) -> Option<Resolution> {
        Resolution::all().find(|res| self.contains_cell(*res, code))
    }

    /// Finest resolution at which a cell contains `code`.
    pub fn finest_resolution(&self, code: GeoCode) -> Option<Resolution> {
        Resolution::all().rev().find(|res| self.contains_cell(*res, code))
    }

    /// True if any cell contains the point `code`.
    pub fn includes(&self, code: GeoCode) -> bool {
        self.coarsest_resolution(code).is_some()
    }

    /// Adds every cell of `other`, resolution by resolution. Overlaps across
    /// resolutions are kept; call [`Coverage::dedup`] to drop them.
    pub fn merge(&mut self, other: &Coverage) {
        for (mine, theirs) in self.cells.iter_mut().zip(other.cells.iter()) {
            mine.extend(theirs.iter().copied());
        }
    }

    /// Removes every cell that has an ancestor present at a coarser
    /// resolution. Coarse cells are never inferred from finer ones.
    pub fn dedup(&mut self) {
        for level in 1..NUM_LEVELS {
            let (coarse, fine) = self.cells.split_at_mut(level);
            if fine[0].is_empty() {
                continue;
            }
            fine[0].retain(|code| {
                !coarse.iter().enumerate().any(|(l, set)| {
                    !set.is_empty() && set.contains(&(code & Resolution::from_level(l).prefix_mask()))
                })
            });
        }
    }

    /// Groups the cells at `res` by parent, returning (parent, children).
    fn sibling_groups(&self, res: Resolution, parent_res: Resolution) -> Vec<(GeoCode, usize)> {
        let mut groups: Vec<(GeoCode, usize)> = Vec::new();
        for code in self.cells[res.level()].iter() {
            let parent = code & parent_res.prefix_mask();
            match groups.last_mut() {
                Some((last, count)) if *last == parent => *count += 1,
                _ => groups.push((parent, 1)),
            }
        }
        groups
    }

    fn remove_children(&mut self, parent: GeoCode, res: Resolution) {
        let shift = res.digit_shift();
        let set = &mut self.cells[res.level()];
        for digit in 0..16u64 {
            set.remove(&(parent | (digit << shift)));
        }
    }

    /// Compacts with `thresholds` over every resolution.
    pub fn optimize(&mut self, thresholds: Thresholds) {
        self.optimize_with(thresholds, Resolution::MIN, 0);
    }

    /// Bottom-up compaction. From the finest resolution up to (excluding)
    /// `min_res`, sibling groups meeting their level's threshold are replaced
    /// by their parent. With a non-zero `cell_count`, stops as soon as the
    /// coverage holds at most that many cells.
    ///
    /// Non-zero thresholds are lossy: the parent may cover area none of its
    /// present children covered.
    pub fn optimize_with(&mut self, thresholds: Thresholds, min_res: Resolution, cell_count: usize) {
        let mut total = self.cell_count();
        if cell_count > 0 && total <= cell_count {
            return;
        }

        'levels: for level in (min_res.level() + 1..NUM_LEVELS).rev() {
            let res = Resolution::from_level(level);
            let parent_res = Resolution::from_level(level - 1);
            let threshold = thresholds.at(res) as usize;

            for (parent, children) in self.sibling_groups(res, parent_res) {
                if (threshold > 0 && children >= threshold) || children == 16 {
                    if self.cells[parent_res.level()].insert(parent) {
                        total += 1;
                    }
                    self.remove_children(parent, res);
                    total -= children;
                    if cell_count > 0 && total <= cell_count {
                        break 'levels;
                    }
                }
            }
        }

        // A merge may produce a parent covering cells two or more levels
        // finer which were not part of the group.
        self.dedup();
    }

    /// Drops every sibling group with at most `thresholds` members, finest
    /// resolution first, down to (excluding) `min_res`. With a non-zero
    /// `cell_count`, stops as soon as at most that many cells remain.
    pub fn prune(&mut self, thresholds: Thresholds, min_res: Resolution, cell_count: usize) {
        let mut total = self.cell_count();
        if cell_count > 0 && total <= cell_count {
            return;
        }

        'levels: for level in (min_res.level() + 1..NUM_LEVELS).rev() {
            let res = Resolution::from_level(level);
            let parent_res = Resolution::from_level(level - 1);
            let threshold = thresholds.at(res) as usize;

            for (parent, children) in self.sibling_groups(res, parent_res) {
                if children <= threshold {
                    self.remove_children(parent, res);
                    total -= children;
                    if cell_count > 0 && total <= cell_count {
                        break 'levels;
                    }
                }
            }
        }
    }

    /// Rewrites the coverage so that every cell sits at `res`: coarser cells
    /// are expanded into all their descendants and finer cells are replaced
    /// by their ancestor. Fails if the expansion would exceed `max_cells`.
    pub fn normalize(&mut self, res: Resolution, max_cells: usize) -> HHResult<()> {
        let target = res.level();

        let mut expected = self.cells[target..].iter().map(BTreeSet::len).sum::<usize>();
        for level in 0..target {
            let fanout = 1usize.checked_shl(4 * (target - level) as u32).unwrap_or(usize::MAX);
            expected = expected.saturating_add(self.cells[level].len().saturating_mul(fanout));
        }
        if expected > max_cells {
            return Err(HHError::CoverageTooLarge { cells: expected, limit: max_cells });
        }

        for level in 0..target {
            let coarse = std::mem::take(&mut self.cells[level]);
            let fanout = 1u64 << (4 * (target - level));
            for code in coarse {
                for descendant in 0..fanout {
                    self.cells[target].insert(code | (descendant << res.digit_shift()));
                }
            }
        }

        let mut thresholds = Thresholds::LOSSLESS;
        for finer in Resolution::all().skip(target + 1) {
            thresholds = thresholds.with(finer, 1);
        }
        self.optimize_with(thresholds, res, 0);
        Ok(())
    }

    /// Splits the coarsest cell covering `code` into its 16 children, again
    /// and again, until `code`'s cell at `res` is itself a member. Does
    /// nothing if no cell at or above `res` covers `code`.
    pub fn split_to(&mut self, res: Resolution, code: GeoCode) {
        while self.split_once(res, code) {}
    }

    /// One step of [`Coverage::split_to`]; false once nothing is left to
    /// split.
    fn split_once(&mut self, res: Resolution, code: GeoCode) -> bool {
        let covering = Resolution::all()
            .take_while(|r| *r <= res)
            .find(|r| self.contains_cell(*r, code));
        let covering = match covering {
            Some(r) if r < res => r,
            _ => return false,
        };
        self.remove_cell(covering, code);
        if let Some((finer, children)) = cell::children(code, covering) {
            self.cells[finer.level()].extend(children.iter().copied());
        }
        true
    }

    /// Splits cells of `a` and `b` until each cell of one is either a cell of
    /// the other, inside one, or disjoint from all of them. `max_cells` is
    /// checked after every split, so neither side outgrows it by more than
    /// one cell's children.
    pub fn normalize_pair(a: &mut Coverage, b: &mut Coverage, max_cells: Option<usize>) -> HHResult<()> {
        let check = |a: &Coverage, b: &Coverage| match max_cells {
            Some(limit) => {
                let cells = a.cell_count().max(b.cell_count());
                if cells > limit {
                    Err(HHError::CoverageTooLarge { cells, limit })
                } else {
                    Ok(())
                }
            }
            None => Ok(()),
        };

        for res in Resolution::all() {
            let from_a: Vec<GeoCode> = a.cells(res).iter().copied().collect();
            for code in from_a {
                while b.split_once(res, code) {
                    check(&*a, &*b)?;
                }
            }
            let from_b: Vec<GeoCode> = b.cells(res).iter().copied().collect();
            for code in from_b {
                while a.split_once(res, code) {
                    check(&*a, &*b)?;
                }
            }
        }
        check(&*a, &*b)
    }

    /// Losslessly compacted, deduplicated copies of `a` and `b`, split to a
    /// common grid.
    fn aligned(a: &Coverage, b: &Coverage, max_cells: Option<usize>) -> HHResult<(Coverage, Coverage)> {
        let mut a = a.clone();
        let mut b = b.clone();
        a.optimize(Thresholds::LOSSLESS);
        b.optimize(Thresholds::LOSSLESS);
        Coverage::normalize_pair(&mut a, &mut b, max_cells)?;
        Ok((a, b))
    }

    /// The region of `a` not covered by `b`.
    ///
    /// A cell of `a` partially covered by finer cells of `b` is split into
    /// its children, recursively, so no covered area survives. The working
    /// set may grow a lot before the caller compacts the result again;
    /// `max_cells` bounds it.
    pub fn minus(a: &Coverage, b: &Coverage, max_cells: Option<usize>) -> HHResult<Coverage> {
        if a.is_empty() || b.is_empty() {
            return Ok(a.clone());
        }
        let (mut a, b) = Coverage::aligned(a, b, max_cells)?;
        for (mine, theirs) in a.cells.iter_mut().zip(b.cells.iter()) {
            mine.retain(|code| !theirs.contains(code));
        }
        Ok(a)
    }

    /// True if some cell overlaps the cell of `code` at `res`, either as an
    /// ancestor, the cell itself or a descendant.
    pub fn intersects_cell(&self, res: Resolution, code: GeoCode) -> bool {
        let code = cell::truncate(code, res);
        let last = code | !res.prefix_mask();
        self.cells.iter().enumerate().any(|(level, set)| {
            if level <= res.level() {
                set.contains(&(code & Resolution::from_level(level).prefix_mask()))
            } else {
                set.range(code..=last).next().is_some()
            }
        })
    }

    /// The region covered by both `a` and `b`.
    ///
    /// By default only the overlap is kept: where cell sizes differ, the
    /// finer cell survives. With `with_lower_res`, overlapping cells are
    /// reported at the coarser of the two resolutions, which covers the
    /// overlap and the remainder of the coarse cell.
    pub fn intersection(
        a: &Coverage,
        b: &Coverage,
        with_lower_res: bool,
        max_cells: Option<usize>,
    ) -> HHResult<Coverage> {
        if a.is_empty() || b.is_empty() {
            return Ok(Coverage::new());
        }

        if with_lower_res {
            let mut c = Coverage::new();
            for (x, y) in [(a, b), (b, a)].iter() {
                for (res, code) in x.iter() {
                    if y.intersects_cell(res, code) {
                        c.add_cell(res, code);
                    }
                }
            }
            c.dedup();
            c.optimize(Thresholds::LOSSLESS);
            return Ok(c);
        }

        let (a, b) = Coverage::aligned(a, b, max_cells)?;
        let mut c = Coverage::new();
        for (level, (sa, sb)) in a.cells.iter().zip(b.cells.iter()).enumerate() {
            let (small, large) = if sa.len() < sb.len() { (sa, sb) } else { (sb, sa) };
            c.cells[level] = small.iter().filter(|code| large.contains(code)).copied().collect();
        }
        Ok(c)
    }

    /// Coarsens the coverage until it holds at most `max_cells` cells.
    ///
    /// Starts with lossless compaction, then lowers the merge threshold of
    /// the finest populated resolution from 15 to 1 before moving on to the
    /// next coarser one. Fails if even resolution 2 cannot fit the budget.
    pub fn reduce(&mut self, max_cells: usize) -> HHResult<()> {
        self.optimize_with(Thresholds::LOSSLESS, Resolution::MIN, max_cells);
        let mut res = match self.finest() {
            Some(res) => res,
            None => return Ok(()),
        };
        let mut threshold = 15u8;

        while self.cell_count() > max_cells {
            let coarser = match res.coarser() {
                Some(coarser) => coarser,
                None => {
                    return Err(HHError::CoverageTooLarge {
                        cells: self.cell_count(),
                        limit: max_cells,
                    })
                }
            };
            self.optimize_with(Thresholds::LOSSLESS.with(res, threshold), coarser, max_cells);

            threshold -= 1;
            if threshold == 0 {
                threshold = 15;
                res = coarser;
                while res != Resolution::MIN && self.cell_count_at(res) == 0 {
                    res = res.coarser().unwrap_or(Resolution::MIN);
                }
            }
        }
        Ok(())
    }

    /// A relative area metric: each resolution contributes its cell count
    /// in its own hex digit (resolution 2 in the top digit), and the sum is
    /// halved. Not a physical unit; only meaningful to compare coverages.
    pub fn area(&self) -> u64 {
        let total: u128 = self
            .cells
            .iter()
            .enumerate()
            .map(|(level, set)| set.len() as u128 * (1u128 << (60 - 4 * level)))
            .sum();
        u64::try_from(total >> 1).unwrap_or(u64::MAX)
    }

    /// Flattens to geocells, ascending, which groups them by resolution,
    /// coarsest first. Cells finer than `finest` (or than 30, the finest
    /// geocell resolution) are folded into their ancestor.
    pub fn to_geocells(&self, finest: Resolution) -> Vec<GeoCell> {
        let finest = finest.min(max_geocell_resolution());
        let mut folded = Coverage::new();
        for (res, code) in self.iter() {
            folded.add_cell(res.min(finest), code);
        }
        folded.dedup();

        folded
            .iter()
            .filter_map(|(res, code)| geocell::to_geocell(code, res).ok())
            .collect()
    }

    /// True if a geocell of `geocells` (sorted ascending) contains `code`.
    pub fn contains(geocells: &[GeoCell], code: GeoCode) -> bool {
        Resolution::all()
            .filter(|res| *res != Resolution::MAX)
            .filter_map(|res| geocell::to_geocell(code, res).ok())
            .any(|key| geocells.binary_search(&key).is_ok())
    }

    /// Like [`Coverage::contains`], only looking at geocells whose
    /// resolution lies in `lower..=upper`.
    pub fn contains_in_range(geocells: &[GeoCell], code: GeoCode, lower: Resolution, upper: Resolution) -> bool {
        let upper = upper.min(max_geocell_resolution());
        Resolution::all()
            .filter(|res| *res >= lower && *res <= upper)
            .filter_map(|res| geocell::to_geocell(code, res).ok())
            .any(|key| geocells.binary_search(&key).is_ok())
    }
}

impl fmt::Display for Coverage {
    /// Space separated hex cells, coarsest first.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (res, code) in self.iter() {
            if !first {
                f.write_str(" ")?;
            }
            first = false;
            f.write_str(&cell::to_hex(code, res))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_eq_with_callout;
    use crate::hhcode::cell::from_hex;
    use crate::hhcode::test_util::{random_code, rng};
    use rand::rngs::StdRng;
    use rand::Rng;

    fn res(r: i64) -> Resolution {
        Resolution::new(r).unwrap()
    }

    fn coverage(hex: &[&str]) -> Coverage {
        Coverage::from_cells(hex.iter().map(|h| {
            let (code, r) = from_hex(h).unwrap();
            (r, code)
        }))
    }

    #[test]
    fn test_thresholds_packing() {
        let t = Thresholds::from_packed(0x0123_4567_89ab_cdef);
        assert_eq!(t.at(Resolution::MIN), 0);
        assert_eq!(t.at(res(4)), 1);
        assert_eq!(t.at(Resolution::MAX), 0xf);
        assert_eq!(t.packed(), 0x0123_4567_89ab_cdef);
        assert_eq!(Thresholds::uniform(1).packed(), 0x1111_1111_1111_1111);
        assert_eq!(Thresholds::LOSSLESS.with(res(4), 4).packed(), 0x0400_0000_0000_0000);
        assert_eq!(u64::from(Thresholds::from(0x1u64)), 1);
    }

    #[test]
    fn test_add_and_query() {
        let mut c = Coverage::new();
        assert!(c.add_cell(res(4), 0xb570_7070_7070_7071));
        assert!(!c.add_cell(res(4), 0xb500_0000_0000_0000));
        assert!(c.contains_cell(res(4), 0xb5ff_0000_0000_0000));
        assert_eq!(c.cells(res(4)).iter().next(), Some(&0xb500_0000_0000_0000));
        assert_eq!(c.cell_count(), 1);
        assert_eq!(c.resolutions(), vec![res(4)]);

        assert!(c.includes(0xb5ab_cdef_0000_0000));
        assert!(!c.includes(0xb600_0000_0000_0000));
        assert_eq!(c.coarsest_resolution(0xb5ab_cdef_0000_0000), Some(res(4)));

        c.add_cell(Resolution::MIN, 0xb000_0000_0000_0000);
        assert_eq!(c.coarsest_resolution(0xb5ab_cdef_0000_0000), Some(Resolution::MIN));
        assert_eq!(c.finest_resolution(0xb5ab_cdef_0000_0000), Some(res(4)));
        assert_eq!(c.finest(), Some(res(4)));
        assert_eq!(c.to_string(), "b b5");

        assert!(c.remove_cell(res(4), 0xb500_0000_0000_0000));
        c.clear();
        assert!(c.is_empty());
    }

    #[test]
    fn test_add_axes_wraps() {
        let mut c = Coverage::new();
        c.add_axes(Resolution::MIN, -1, 1 << 32);
        // lat wraps to the top row, lon to the first column.
        assert_eq!(c.to_string(), "a");
    }

    #[test]
    fn test_optimize_fixtures() {
        let mut c = Coverage::from_cells(vec![(Resolution::MAX, 0x1)]);
        c.optimize(Thresholds::from_packed(0x1));
        assert_eq!(c.to_string(), "000000000000000");

        let mut c = coverage(&["a0", "a1", "a2", "a3"]);
        c.optimize(Thresholds::from_packed(0x0500_0000_0000_0000));
        assert_eq!(c.to_string(), "a0 a1 a2 a3");
        c.optimize(Thresholds::from_packed(0x0400_0000_0000_0000));
        assert_eq!(c.to_string(), "a");

        let mut c = coverage(&["a", "a00", "a01", "a02", "a03"]);
        c.optimize(Thresholds::from_packed(0x0500_0000_0000_0000));
        assert_eq!(c.to_string(), "a");
    }

    #[test]
    fn test_optimize_lossless_cascades() {
        let digits = "0123456789abcdef";
        let cells: Vec<String> = digits.chars().map(|d| format!("5{}", d)).collect();
        let refs: Vec<&str> = cells.iter().map(String::as_str).collect();
        let mut c = coverage(&refs);
        c.add_cell(res(4), 0x6100_0000_0000_0000);
        c.optimize(Thresholds::LOSSLESS);
        assert_eq!(c.to_string(), "5 61");

        // Fifteen siblings do not merge without a threshold.
        let mut c = coverage(&refs[1..]);
        c.optimize(Thresholds::LOSSLESS);
        assert_eq!(c.cell_count(), 15);
    }

    #[test]
    fn test_optimize_idempotent() {
        let mut c = coverage(&["a0", "a1", "a2", "b00", "b01", "b02", "c123"]);
        let t = Thresholds::uniform(3);
        c.optimize(t);
        let once = c.clone();
        c.optimize(t);
        assert_eq!(c, once);
    }

    #[test]
    fn test_optimize_cell_count_stops_early() {
        let mut c = coverage(&["a0", "a1", "b0", "b1", "c0", "c1"]);
        c.optimize_with(Thresholds::uniform(2), Resolution::MIN, 5);
        assert_eq!(c.cell_count(), 5);
        assert_eq!(c.to_string(), "a b0 b1 c0 c1");
    }

    #[test]
    fn test_prune() {
        let mut c = coverage(&["a0", "b0", "b1", "b2", "c"]);
        c.prune(Thresholds::uniform(1), Resolution::MIN, 0);
        assert_eq!(c.to_string(), "c b0 b1 b2");
    }

    #[test]
    fn test_dedup() {
        let mut c = coverage(&["a", "a1", "a12", "b12", "b1234"]);
        c.dedup();
        assert_eq!(c.to_string(), "a b12");

        // Finer cells never remove coarser ones.
        let mut c = coverage(&["a0", "a1"]);
        c.dedup();
        assert_eq!(c.cell_count(), 2);
    }

    #[test]
    fn test_merge() {
        let mut a = coverage(&["a", "b1"]);
        let b = coverage(&["a2", "c"]);
        a.merge(&b);
        assert_eq!(a.to_string(), "a c a2 b1");

        let mut x = coverage(&["1", "23"]);
        let y = coverage(&["12", "4"]);
        let mut xy = x.clone();
        xy.merge(&y);
        let mut yx = y.clone();
        yx.merge(&x);
        xy.dedup();
        yx.dedup();
        assert_eq!(xy, yx);
        let copy = x.clone();
        x.merge(&copy);
        assert_eq!(x, coverage(&["1", "23"]));
    }

    #[test]
    fn test_minus_fixtures() {
        let a = coverage(&["0"]);
        let c = Coverage::minus(&a, &coverage(&["00"]), None).unwrap();
        assert_eq!(c.cell_count(), 15);
        assert_eq!(c.cell_count_at(res(4)), 15);
        assert!(!c.contains_cell(res(4), 0));
        assert!(c.contains_cell(res(4), 0x0100_0000_0000_0000));
        assert!(c.contains_cell(res(4), 0x0f00_0000_0000_0000));

        let c = Coverage::minus(&a, &coverage(&["000000"]), None).unwrap();
        assert_eq_with_callout!(c.cell_count(), 75, "minus 000000 from 0");
        assert_eq!(c.resolutions(), vec![res(4), res(6), res(8), res(10), res(12)]);
        assert!(!c.contains_cell(res(6), 0));

        let empty = Coverage::minus(&a, &a, None).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_minus_coarse_subtrahend() {
        let a = coverage(&["012", "0a", "1"]);
        let c = Coverage::minus(&a, &coverage(&["0"]), None).unwrap();
        assert_eq!(c.to_string(), "1");

        let c = Coverage::minus(&a, &Coverage::new(), None).unwrap();
        assert_eq!(c, a);
    }

    #[test]
    fn test_minus_growth_cap() {
        let a = coverage(&["0"]);
        let b = coverage(&["0000000000000000"]);
        assert!(matches!(
            Coverage::minus(&a, &b, Some(100)),
            Err(HHError::CoverageTooLarge { limit: 100, .. })
        ));
        assert!(Coverage::minus(&a, &b, Some(1000)).is_ok());
    }

    #[test]
    fn test_normalize_pair_stops_at_cap() {
        // Splitting one coarse cell down to resolution 32 yields 226 cells;
        // the cap stops it after the split crossing the limit.
        let mut a = coverage(&["0"]);
        let mut b = coverage(&["0000000000000000"]);
        match Coverage::normalize_pair(&mut a, &mut b, Some(100)) {
            Err(HHError::CoverageTooLarge { cells, limit }) => {
                assert_eq!(limit, 100);
                assert!(cells > 100 && cells <= 115, "{} cells", cells);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(a.cell_count() <= 115);

        let mut a = coverage(&["0"]);
        let mut b = coverage(&["0000000000000000"]);
        Coverage::normalize_pair(&mut a, &mut b, None).unwrap();
        assert_eq!(a.cell_count(), 226);
        assert_eq!(b.cell_count(), 1);
    }

    fn random_coverage(rng: &mut StdRng) -> Coverage {
        // Codes share the first digit so cells overlap often.
        let mut c = Coverage::new();
        for _ in 0..rng.gen_range(1..20) {
            let r = res(2 * rng.gen_range(2..=6));
            c.add_cell(r, random_code(rng) >> 4);
        }
        c
    }

    fn covered(c: &Coverage, r: Resolution, code: GeoCode) -> bool {
        Resolution::all().take_while(|x| *x <= r).any(|x| c.contains_cell(x, code))
    }

    #[test]
    fn test_merge_laws_random() {
        let mut rng = rng();
        for _ in 0..100 {
            let (a, b, c) = (random_coverage(&mut rng), random_coverage(&mut rng), random_coverage(&mut rng));

            let mut ab = a.clone();
            ab.merge(&b);
            ab.dedup();
            let mut ba = b.clone();
            ba.merge(&a);
            ba.dedup();
            assert_eq!(ab, ba);

            let mut left = a.clone();
            left.merge(&b);
            left.merge(&c);
            left.dedup();
            let mut bc = b.clone();
            bc.merge(&c);
            let mut right = a.clone();
            right.merge(&bc);
            right.dedup();
            assert_eq!(left, right);
        }
    }

    #[test]
    fn test_intersection_and_minus_laws_random() {
        let mut rng = rng();
        for _ in 0..100 {
            let (a, b) = (random_coverage(&mut rng), random_coverage(&mut rng));
            let mut compact_a = a.clone();
            compact_a.optimize(Thresholds::LOSSLESS);
            let mut compact_b = b.clone();
            compact_b.optimize(Thresholds::LOSSLESS);

            let both = Coverage::intersection(&a, &b, false, None).unwrap();
            for (r, code) in both.iter() {
                assert!(covered(&compact_a, r, code), "{:016x} at {} not in a", code, r.value());
                assert!(covered(&compact_b, r, code), "{:016x} at {} not in b", code, r.value());
            }
            assert_eq!(both.area(), Coverage::intersection(&b, &a, false, None).unwrap().area());

            let rest = Coverage::minus(&a, &b, None).unwrap();
            for (r, code) in rest.iter() {
                assert!(!b.intersects_cell(r, code), "{:016x} at {} overlaps b", code, r.value());
                assert!(covered(&compact_a, r, code));
            }

            // The overlap and the remainder tile a.
            let mut tiled = a.clone();
            tiled.dedup();
            assert_eq!(rest.area() + both.area(), tiled.area());
        }
    }

    #[test]
    fn test_intersection_fixtures() {
        let a = coverage(&["0"]);
        let c = Coverage::intersection(&a, &coverage(&["000000"]), false, None).unwrap();
        assert_eq!(c.to_string(), "000000");

        let c = Coverage::intersection(&a, &coverage(&["1", "2"]), false, None).unwrap();
        assert!(c.is_empty());

        let c = Coverage::intersection(&a, &Coverage::new(), false, None).unwrap();
        assert!(c.is_empty());

        let x = coverage(&["01", "02", "1"]);
        let y = coverage(&["0", "10", "1f"]);
        let c = Coverage::intersection(&x, &y, false, None).unwrap();
        assert_eq!(c.to_string(), "01 02 10 1f");
    }

    #[test]
    fn test_intersection_with_lower_res() {
        let a = coverage(&["0", "5"]);
        let b = coverage(&["000000", "1", "5a"]);
        let strict = Coverage::intersection(&a, &b, false, None).unwrap();
        assert_eq!(strict.to_string(), "5a 000000");
        let coarse = Coverage::intersection(&a, &b, true, None).unwrap();
        assert_eq!(coarse.to_string(), "0 5");

        assert!(b.intersects_cell(Resolution::MIN, 0));
        assert!(b.intersects_cell(res(8), 0x5a12_0000_0000_0000));
        assert!(!b.intersects_cell(res(4), 0x0100_0000_0000_0000));
    }

    #[test]
    fn test_normalize() {
        let mut c = coverage(&["a", "b12"]);
        c.normalize(res(4), 100).unwrap();
        assert_eq!(c.cell_count(), 17);
        assert_eq!(c.resolutions(), vec![res(4)]);
        assert!(c.contains_cell(res(4), 0xb100_0000_0000_0000));

        let mut c = coverage(&["a"]);
        assert!(matches!(
            c.normalize(Resolution::MAX, 1_000_000),
            Err(HHError::CoverageTooLarge { .. })
        ));
    }

    #[test]
    fn test_split_to() {
        let mut c = coverage(&["a"]);
        c.split_to(res(6), 0xa120_0000_0000_0000);
        assert_eq!(c.cell_count(), 31);
        assert!(c.contains_cell(res(6), 0xa120_0000_0000_0000));
        assert!(!c.contains_cell(res(4), 0xa100_0000_0000_0000));
        assert!(c.contains_cell(res(4), 0xa200_0000_0000_0000));

        // Uncovered code: nothing happens.
        let mut c = coverage(&["a"]);
        c.split_to(res(6), 0xb000_0000_0000_0000);
        assert_eq!(c.to_string(), "a");
    }

    #[test]
    fn test_reduce() {
        let mut c = Coverage::new();
        for d in 0..16u64 {
            c.add_cell(res(6), 0x1200_0000_0000_0000 | (d << 52));
            c.add_cell(res(6), 0x3400_0000_0000_0000 | ((d % 7) << 52));
            c.add_cell(res(8), 0x5670_0000_0000_0000 | ((d % 3) << 48));
        }
        assert_eq!(c.cell_count(), 16 + 7 + 3);

        let mut r = c.clone();
        r.reduce(100).unwrap();
        assert_eq!(r.cell_count(), 26);

        // Lossless compaction of the complete group is enough.
        let mut r = c.clone();
        r.reduce(11).unwrap();
        assert_eq!(r.cell_count(), 11);
        assert!(r.contains_cell(res(4), 0x1200_0000_0000_0000));

        let mut r = c.clone();
        r.reduce(5).unwrap();
        assert!(r.cell_count() <= 5);
        // Still covers the original cells.
        for (res, code) in c.iter() {
            assert!(r.includes(code), "{} at {} lost", code, res);
        }

        let mut whole = coverage(&["0", "1", "2", "3", "4", "5", "6", "7", "8", "9"]);
        assert!(matches!(whole.reduce(3), Err(HHError::CoverageTooLarge { .. })));
    }

    #[test]
    fn test_area() {
        let mut c = coverage(&["0"]);
        assert_eq!(c.area(), 0x0800_0000_0000_0000);
        c.add_cell(Resolution::MAX, 0x1);
        assert_eq!(c.area(), 0x0800_0000_0000_0000);
        c.add_cell(res(30), 0x10);
        assert_eq!(c.area(), 0x0800_0000_0000_0008);

        let c = coverage(&["0", "1", "2", "3", "4", "5", "6", "7", "8"]);
        assert_eq!(c.area(), 0x4800_0000_0000_0000);

        let all = coverage(&[
            "0", "1", "2", "3", "4", "5", "6", "7", "8", "9", "a", "b", "c", "d", "e", "f",
        ]);
        assert_eq!(all.area(), 0x8000_0000_0000_0000);
    }

    #[test]
    fn test_geocells() {
        let mut c = coverage(&["1", "23", "456"]);
        c.add_cell(Resolution::MAX, 0x7777_7777_7777_7777);
        let cells = c.to_geocells(Resolution::MAX);
        assert_eq!(
            cells,
            vec![
                0x1100_0000_0000_0000,
                0x2230_0000_0000_0000,
                0x3456_0000_0000_0000,
                0xf777_7777_7777_7777,
            ]
        );
        let mut sorted = cells.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, cells);

        let back = Coverage::from_geocells(&cells).unwrap();
        assert_eq!(back.to_string(), "1 23 456 777777777777777");

        assert!(Coverage::contains(&cells, 0x1abc_0000_0000_0000));
        assert!(Coverage::contains(&cells, 0x7777_7777_7777_7770));
        assert!(!Coverage::contains(&cells, 0x2400_0000_0000_0000));
        assert!(Coverage::contains_in_range(&cells, 0x1abc_0000_0000_0000, Resolution::MIN, res(8)));
        assert!(!Coverage::contains_in_range(&cells, 0x1abc_0000_0000_0000, res(4), res(8)));

        // Folding to a coarser resolution never loses area.
        let coarse = c.to_geocells(res(4));
        assert_eq!(
            coarse,
            vec![
                0x1100_0000_0000_0000,
                0x2230_0000_0000_0000,
                0x2450_0000_0000_0000,
                0x2770_0000_0000_0000,
            ]
        );
    }
}
