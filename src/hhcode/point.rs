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

//! Point codec: (lat, lon) degrees to and from 64-bit interleaved codes.
//!
//! A code interleaves two 32-bit axis values, most significant bit first,
//! latitude bit first. The axes map degrees linearly onto `[0, 2^32)`,
//! modulo 2^32, so `lat = 90` wraps onto `lat = -90` and `lon = 180` onto
//! `lon = -180`.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::consts::{AXIS_UNITS, DEGREES_PER_LAT_UNIT, DEGREES_PER_LON_UNIT};
use crate::hhcode::resolution::Resolution;

/// A 64-bit interleaved point code. A code carries no resolution; callers
/// supply one when they treat it as a cell.
pub type GeoCode = u64;

/// Maps a latitude in degrees onto the lat axis, rounding to the nearest
/// unit and wrapping modulo 2^32.
pub fn lat_to_axis(lat: f64) -> u32 {
    wrap_axis(((lat + 90.0) / DEGREES_PER_LAT_UNIT).round())
}

/// Maps a longitude in degrees onto the lon axis, rounding to the nearest
/// unit and wrapping modulo 2^32.
pub fn lon_to_axis(lon: f64) -> u32 {
    wrap_axis(((lon + 180.0) / DEGREES_PER_LON_UNIT).round())
}

fn wrap_axis(units: f64) -> u32 {
    // NaN and infinities land on 0.
    if !units.is_finite() {
        return 0;
    }
    units.rem_euclid(AXIS_UNITS as f64) as u64 as u32
}

pub fn axis_to_lat(axis: u32) -> f64 {
    axis as f64 * DEGREES_PER_LAT_UNIT - 90.0
}

pub fn axis_to_lon(axis: u32) -> f64 {
    axis as f64 * DEGREES_PER_LON_UNIT - 180.0
}

/// Spreads the 32 bits of `v` over the even bits of a u64.
fn spread(v: u32) -> u64 {
    let mut x = v as u64;
    x = (x | x << 16) & 0x0000_ffff_0000_ffff;
    x = (x | x << 8) & 0x00ff_00ff_00ff_00ff;
    x = (x | x << 4) & 0x0f0f_0f0f_0f0f_0f0f;
    x = (x | x << 2) & 0x3333_3333_3333_3333;
    x = (x | x << 1) & 0x5555_5555_5555_5555;
    x
}

/// Gathers the even bits of `x` into a u32, the inverse of `spread`.
fn compact(x: u64) -> u32 {
    let mut x = x & 0x5555_5555_5555_5555;
    x = (x | x >> 1) & 0x3333_3333_3333_3333;
    x = (x | x >> 2) & 0x0f0f_0f0f_0f0f_0f0f;
    x = (x | x >> 4) & 0x00ff_00ff_00ff_00ff;
    x = (x | x >> 8) & 0x0000_ffff_0000_ffff;
    x = (x | x >> 16) & 0x0000_0000_ffff_ffff;
    x as u32
}

/// Encodes a (lat, lon) pair in degrees. Any finite value is accepted;
/// out of range values wrap around.
pub fn encode(lat: f64, lon: f64) -> GeoCode {
    combine_axes(lat_to_axis(lat), lon_to_axis(lon), Resolution::MAX)
}

/// Decodes the reference corner (all low bits zero) of the cell containing
/// `code` at `res`.
pub fn decode(code: GeoCode, res: Resolution) -> (f64, f64) {
    let (lat, lon) = split_axes(code, res);
    (axis_to_lat(lat), axis_to_lon(lon))
}

/// De-interleaves `code`, keeping `res` bits of each axis and zero-filling
/// the rest.
pub fn split_axes(code: GeoCode, res: Resolution) -> (u32, u32) {
    let code = code & res.prefix_mask();
    (compact(code >> 1), compact(code))
}

/// Interleaves two axis values, keeping `res` bits of each.
pub fn combine_axes(lat: u32, lon: u32, res: Resolution) -> GeoCode {
    ((spread(lat) << 1) | spread(lon)) & res.prefix_mask()
}

/// Returns the point at the center of the cell containing `code` at `res`.
pub fn center(code: GeoCode, res: Resolution) -> GeoCode {
    let (lat, lon) = split_axes(code, res);
    let half = (res.axis_offset_mask() >> 1) as u32;
    combine_axes(lat | half, lon | half, Resolution::MAX)
}

/// An immutable point, wrapping a full resolution code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Point(pub GeoCode);

impl Point {
    pub fn from_lat_lon(lat: f64, lon: f64) -> Self {
        Point(encode(lat, lon))
    }

    pub fn from_axes(lat: u32, lon: u32) -> Self {
        Point(combine_axes(lat, lon, Resolution::MAX))
    }

    pub fn code(self) -> GeoCode {
        self.0
    }

    pub fn lat_lon(self) -> (f64, f64) {
        decode(self.0, Resolution::MAX)
    }

    pub fn axes(self) -> (u32, u32) {
        split_axes(self.0, Resolution::MAX)
    }

    /// Center of the cell containing this point at `res`.
    pub fn center(self, res: Resolution) -> Point {
        Point(center(self.0, res))
    }

    /// The cell containing this point at `res`.
    pub fn cell(self, res: Resolution) -> GeoCode {
        self.0 & res.prefix_mask()
    }
}

impl From<GeoCode> for Point {
    fn from(code: GeoCode) -> Self {
        Point(code)
    }
}

impl From<Point> for GeoCode {
    fn from(p: Point) -> Self {
        p.0
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}
