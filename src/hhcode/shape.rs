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

//! Shapes: immutable, flattened coverages.
//!
//! A shape is the sorted list of geocells of a compacted coverage. Because
//! geocells carry their resolution in the top nibble, ascending order puts
//! the coarsest cells first. Shapes are what gets stored and shipped; the
//! wire form is the geocells as big-endian 64-bit integers.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use std::convert::TryFrom;

use crate::hhcode::cell::{self, BoundingBox};
use crate::hhcode::config::CoverageConfig;
use crate::hhcode::coverage::{Coverage, Thresholds};
use crate::hhcode::error::{HHError, HHResult};
use crate::hhcode::geocell::{self, GeoCell};
use crate::hhcode::geometry::Geometry;
use crate::hhcode::index;
use crate::hhcode::point::{self, GeoCode};
use crate::hhcode::resolution::Resolution;

pub use crate::hhcode::distance::{loxodromic_distance, orthodromic_distance};
pub use crate::hhcode::index::{bytes_from_point, indexable, indexable_strings};

/// Code of the point at (`lat`, `lon`) degrees.
pub fn to_point(lat: f64, lon: f64) -> GeoCode {
    point::encode(lat, lon)
}

/// (lat, lon) degrees of a point code.
pub fn from_point(code: GeoCode) -> (f64, f64) {
    point::decode(code, Resolution::MAX)
}

/// Center of the cell of `code` at `res`.
pub fn center_point(code: GeoCode, res: Resolution) -> GeoCode {
    point::center(code, res)
}

pub fn point_axes(code: GeoCode) -> (u32, u32) {
    point::split_axes(code, Resolution::MAX)
}

pub fn point_from_axes(lat: u32, lon: u32) -> GeoCode {
    point::combine_axes(lat, lon, Resolution::MAX)
}

/// Rasterizes `geometry` at the resolution whose cells are at most
/// `pct_error` of its bounding box diagonal, compacted.
pub fn to_shape(geometry: &Geometry, pct_error: f64, inside: bool) -> HHResult<Shape> {
    Shape::from_geometry(geometry, pct_error, inside)
}

/// Like [`to_shape`], with every cell at the same resolution.
pub fn to_uniform_shape(geometry: &Geometry, pct_error: f64, inside: bool) -> HHResult<Shape> {
    Shape::uniform_from_geometry(geometry, pct_error, inside)
}

pub fn is_point_in_shape(code: GeoCode, shape: &Shape) -> bool {
    shape.contains_point(code)
}

/// Geocell of the parent of `geocell`.
pub fn parent_cell(geocell: GeoCell) -> HHResult<GeoCell> {
    geocell::parent_geocell(geocell)
}

/// Immutable, sorted set of geocells.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "Vec<u64>", into = "Vec<u64>")
)]
pub struct Shape {
    geocells: Vec<GeoCell>,
}

impl Shape {
    /// Builds a shape from raw geocells, sorting and deduplicating them.
    pub fn from_cells<I>(cells: I) -> HHResult<Shape>
    where
        I: IntoIterator<Item = GeoCell>,
    {
        let mut geocells = Vec::new();
        for geocell in cells {
            if geocell::geocell_resolution(geocell).is_none() {
                return Err(HHError::Encoding(format!(
                    "{:016x} is not a geocell",
                    geocell
                )));
            }
            geocells.push(geocell);
        }
        geocells.sort_unstable();
        geocells.dedup();
        Ok(Shape { geocells })
    }

    /// Flattens `coverage` as is. Cells finer than 30 fold into their
    /// resolution 30 ancestor.
    pub fn from_coverage(coverage: &Coverage) -> Shape {
        Shape {
            geocells: coverage.to_geocells(Resolution::MAX),
        }
    }

    pub fn to_coverage(&self) -> HHResult<Coverage> {
        Coverage::from_geocells(&self.geocells)
    }

    /// Compacts `coverage` losslessly, then flattens it.
    fn compacted(mut coverage: Coverage) -> Shape {
        coverage.optimize(Thresholds::LOSSLESS);
        Shape::from_coverage(&coverage)
    }

    fn resolution_for(geometry: &Geometry, pct_error: f64) -> HHResult<Option<Resolution>> {
        CoverageConfig::default().with_pct_error(pct_error).validate()?;
        Ok(geometry.error_resolution(pct_error))
    }

    /// Rasterizes `geometry` at the resolution meeting `pct_error`, compacted.
    pub fn from_geometry(geometry: &Geometry, pct_error: f64, inside: bool) -> HHResult<Shape> {
        match Shape::resolution_for(geometry, pct_error)? {
            Some(res) => Shape::from_geometry_at(geometry, res, inside, None),
            None => Ok(Shape::default()),
        }
    }

    /// Rasterizes `geometry` at `res` and compacts it losslessly. With
    /// `max_cells`, the result is then coarsened to at most that many cells.
    pub fn from_geometry_at(
        geometry: &Geometry,
        res: Resolution,
        inside: bool,
        max_cells: Option<usize>,
    ) -> HHResult<Shape> {
        let mut coverage = geometry.cover(res.value() as i32, inside)?;
        coverage.optimize(Thresholds::LOSSLESS);
        if let Some(max_cells) = max_cells {
            coverage.reduce(max_cells)?;
        }
        Ok(Shape::from_coverage(&coverage))
    }

    pub fn uniform_from_geometry(geometry: &Geometry, pct_error: f64, inside: bool) -> HHResult<Shape> {
        match Shape::resolution_for(geometry, pct_error)? {
            Some(res) => Shape::uniform_from_geometry_at(geometry, res, inside, None),
            None => Ok(Shape::default()),
        }
    }

    /// Every cell at `res`, capped at 30. `max_cells` fails the call rather
    /// than coarsening, which would break the single resolution.
    pub fn uniform_from_geometry_at(
        geometry: &Geometry,
        res: Resolution,
        inside: bool,
        max_cells: Option<usize>,
    ) -> HHResult<Shape> {
        let res = res.min(geocell::max_geocell_resolution());
        let mut coverage = geometry.cover(res.value() as i32, inside)?;
        coverage.normalize(res, max_cells.unwrap_or(usize::MAX))?;
        Ok(Shape::from_coverage(&coverage))
    }

    /// The geocells, ascending.
    pub fn cells(&self) -> &[GeoCell] {
        &self.geocells
    }

    pub fn len(&self) -> usize {
        self.geocells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geocells.is_empty()
    }

    pub fn contains_point(&self, code: GeoCode) -> bool {
        Coverage::contains(&self.geocells, code)
    }

    /// Degrees box enclosing every cell, `None` for an empty shape. Shapes
    /// crossing the date line get a box spanning the whole longitude range
    /// between their extreme cells.
    pub fn bbox(&self) -> Option<BoundingBox> {
        let mut boxes = self
            .geocells
            .iter()
            .filter_map(|gc| geocell::from_geocell(*gc).ok())
            .map(|(code, res)| cell::bounding_box(code, res));
        let first = boxes.next()?;
        Some(boxes.fold(first, |acc, b| BoundingBox {
            sw_lat: acc.sw_lat.min(b.sw_lat),
            sw_lon: acc.sw_lon.min(b.sw_lon),
            ne_lat: acc.ne_lat.max(b.ne_lat),
            ne_lon: acc.ne_lon.max(b.ne_lon),
        }))
    }

    pub fn intersection(&self, other: &Shape) -> HHResult<Shape> {
        let c = Coverage::intersection(
            &self.to_coverage()?,
            &other.to_coverage()?,
            false,
            CoverageConfig::default().max_cells,
        )?;
        Ok(Shape::compacted(c))
    }

    pub fn union(&self, other: &Shape) -> HHResult<Shape> {
        let mut c = self.to_coverage()?;
        c.merge(&other.to_coverage()?);
        c.dedup();
        Ok(Shape::compacted(c))
    }

    /// The part of `self` not in `other`.
    pub fn subtraction(&self, other: &Shape) -> HHResult<Shape> {
        let c = Coverage::minus(
            &self.to_coverage()?,
            &other.to_coverage()?,
            CoverageConfig::default().max_cells,
        )?;
        Ok(Shape::compacted(c))
    }

    /// Coarsens the shape until it holds at most `count` cells.
    pub fn limit(&self, count: usize) -> HHResult<Shape> {
        if self.len() <= count {
            return Ok(self.clone());
        }
        let mut c = self.to_coverage()?;
        c.reduce(count)?;
        Ok(Shape::from_coverage(&c))
    }

    /// Folds every cell finer than `res` into its ancestor at `res`.
    pub fn limit_resolution(&self, res: Resolution) -> HHResult<Shape> {
        let mut c = self.to_coverage()?;
        c.optimize_with(Thresholds::uniform(1), res, 0);
        Ok(Shape::from_coverage(&c))
    }

    /// Folds cells finer than `max` into their ancestor at `max`, then
    /// merges complete sibling groups no coarser than `min`.
    pub fn limit_resolution_range(&self, min: Resolution, max: Resolution) -> HHResult<Shape> {
        if min > max {
            return Err(HHError::InvalidArgument(format!(
                "resolution range {}..{} is empty",
                min.value(),
                max.value()
            )));
        }
        let mut c = self.to_coverage()?;
        c.optimize_with(Thresholds::uniform(1), max, 0);
        c.optimize_with(Thresholds::LOSSLESS, min, 0);
        Ok(Shape::from_coverage(&c))
    }

    /// Regular expression matching the hex strings of the contained points.
    pub fn to_regexp(&self) -> String {
        index::to_regexp(&self.geocells)
    }

    /// The wire form: each geocell as 8 big-endian bytes, coarsest first.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.geocells.len() * 8);
        for geocell in &self.geocells {
            buf.extend_from_slice(&geocell.to_be_bytes());
        }
        buf
    }

    pub fn deserialize(bytes: &[u8]) -> HHResult<Shape> {
        if bytes.len() % 8 != 0 {
            return Err(HHError::Encoding(format!(
                "shape length {} is not a multiple of 8",
                bytes.len()
            )));
        }
        Shape::from_cells(bytes.chunks_exact(8).map(|chunk| {
            let mut word = [0u8; 8];
            word.copy_from_slice(chunk);
            u64::from_be_bytes(word)
        }))
    }
}

impl TryFrom<Vec<u64>> for Shape {
    type Error = HHError;

    fn try_from(cells: Vec<u64>) -> HHResult<Shape> {
        Shape::from_cells(cells)
    }
}

impl From<Shape> for Vec<u64> {
    fn from(shape: Shape) -> Self {
        shape.geocells
    }
}
