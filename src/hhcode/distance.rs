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

//! Great-circle and rhumb-line distances between points.
//!
//! Both helpers work on a sphere on which one minute of arc is one nautical
//! mile, the same model the grid uses to convert meters into axis units.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use crate::consts::{EARTH_RADIUS_METERS, RADIANS_PER_LAT_UNIT, RADIANS_PER_LON_UNIT, TOLSQRT};
use crate::hhcode::point::{split_axes, GeoCode};
use crate::hhcode::resolution::Resolution;

/// Latitude and longitude of `code`, in radians.
fn radians(code: GeoCode) -> (f64, f64) {
    let (lat, lon) = split_axes(code, Resolution::MAX);
    (
        lat as f64 * RADIANS_PER_LAT_UNIT - FRAC_PI_2,
        lon as f64 * RADIANS_PER_LON_UNIT - PI,
    )
}

/// Central angle between two positions given in radians (haversine).
pub fn central_angle(from_lat: f64, from_lon: f64, to_lat: f64, to_lon: f64) -> f64 {
    let slat = libm::sin((from_lat - to_lat) / 2.0);
    let slon = libm::sin((from_lon - to_lon) / 2.0);
    let h = slat * slat + libm::cos(from_lat) * libm::cos(to_lat) * slon * slon;
    2.0 * libm::asin(libm::sqrt(h.min(1.0)))
}

/// Great-circle distance in meters.
pub fn orthodromic_distance(from: GeoCode, to: GeoCode) -> f64 {
    let (flat, flon) = radians(from);
    let (tlat, tlon) = radians(to);
    central_angle(flat, flon, tlat, tlon) * EARTH_RADIUS_METERS
}

/// Rhumb-line (constant bearing) distance in meters.
pub fn loxodromic_distance(from: GeoCode, to: GeoCode) -> f64 {
    let (flat, flon) = radians(from);
    let (tlat, tlon) = radians(to);

    let dlat = tlat - flat;
    let mut dlon = tlon - flon;
    // Take the short way around the date line.
    if dlon.abs() > PI {
        dlon -= 2.0 * PI * dlon.signum();
    }

    let dphi = libm::log(libm::tan(tlat / 2.0 + FRAC_PI_4) / libm::tan(flat / 2.0 + FRAC_PI_4));
    let q = if dlat.abs() < TOLSQRT || !dphi.is_finite() || dphi == 0.0 {
        libm::cos(flat)
    } else {
        dlat / dphi
    };

    libm::sqrt(dlat * dlat + q * q * dlon * dlon) * EARTH_RADIUS_METERS
}
