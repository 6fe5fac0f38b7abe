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

use std::f64::consts::PI;

/// Coarsest resolution, one hex digit.
pub const MIN_RESOLUTION: u32 = 2;

/// Finest resolution, full 32-bit axes.
pub const MAX_RESOLUTION: u32 = 32;

/// Number of distinct resolutions (2, 4, ..., 32).
pub const NUM_LEVELS: usize = 16;

/// Size of each axis, 2^32 units.
pub const AXIS_UNITS: i64 = 1 << 32;

/// Mask of a 32-bit axis value.
pub const AXIS_MASK: i64 = AXIS_UNITS - 1;

pub const DEGREES_PER_LAT_UNIT: f64 = 180.0 / AXIS_UNITS as f64;
pub const DEGREES_PER_LON_UNIT: f64 = 360.0 / AXIS_UNITS as f64;
pub const RADIANS_PER_LAT_UNIT: f64 = PI / AXIS_UNITS as f64;
pub const RADIANS_PER_LON_UNIT: f64 = 2.0 * PI / AXIS_UNITS as f64;

/// One minute of arc along a meridian is one nautical mile.
pub const METERS_PER_NAUTICAL_MILE: f64 = 1852.0;

/// Lat axis units per meter (independent of the latitude).
pub const LAT_UNITS_PER_METER: f64 = AXIS_UNITS as f64 / (180.0 * 60.0) / METERS_PER_NAUTICAL_MILE;

/// Lon axis units per meter at the equator, divide by cos(lat) elsewhere.
pub const LON_UNITS_PER_METER: f64 = AXIS_UNITS as f64 / (360.0 * 60.0) / METERS_PER_NAUTICAL_MILE;

/// Radius of the sphere on which one minute of arc is one nautical mile.
pub const EARTH_RADIUS_METERS: f64 = METERS_PER_NAUTICAL_MILE * 60.0 * 180.0 / PI;

/// Largest resolution spread tolerated when picking an automatic resolution.
pub const MAX_RES_DIFF: u32 = 4;

/// Number of polygon sides per quadrant used to approximate a circle.
pub const QUADRANT_POLYGON_SIDES: usize = 16;

/// Tolerance below which a rhumb line is treated as running east/west.
pub const TOLSQRT: f64 = 3.1622776601683794e-8;
