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

//! Cell arithmetic: neighbors, parents, bounding boxes and hex strings of
//! codes truncated to a resolution.

use std::f64::consts::PI;

use crate::consts::{EARTH_RADIUS_METERS, NUM_LEVELS};
use crate::hhcode::distance::central_angle;
use crate::hhcode::error::{HHError, HHResult};
use crate::hhcode::point::{axis_to_lat, axis_to_lon, combine_axes, split_axes, GeoCode};
use crate::hhcode::resolution::Resolution;

/// Direction of a grid neighbor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    South,
    East,
    West,
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
        Direction::NorthEast,
        Direction::NorthWest,
        Direction::SouthEast,
        Direction::SouthWest,
    ];

    /// Steps along the (lat, lon) axes.
    fn steps(self) -> (i8, i8) {
        match self {
            Direction::North => (1, 0),
            Direction::South => (-1, 0),
            Direction::East => (0, 1),
            Direction::West => (0, -1),
            Direction::NorthEast => (1, 1),
            Direction::NorthWest => (1, -1),
            Direction::SouthEast => (-1, 1),
            Direction::SouthWest => (-1, -1),
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
            Direction::NorthEast => Direction::SouthWest,
            Direction::NorthWest => Direction::SouthEast,
            Direction::SouthEast => Direction::NorthWest,
            Direction::SouthWest => Direction::NorthEast,
        }
    }
}

fn step_axis(axis: u32, step: i8, span: u32) -> u32 {
    match step {
        1 => axis.wrapping_add(span),
        -1 => axis.wrapping_sub(span),
        _ => axis,
    }
}

/// Returns the code one cell away from `code` at `res` in direction `dir`.
///
/// The grid is a torus: stepping north of the last lat row lands on the
/// first one and stepping east of the last lon column lands on the first.
/// Bits finer than `res` are carried over unchanged.
pub fn neighbor(code: GeoCode, res: Resolution, dir: Direction) -> GeoCode {
    let (lat, lon) = split_axes(code, Resolution::MAX);
    let span = res.axis_span() as u32;
    let (dlat, dlon) = dir.steps();
    combine_axes(
        step_axis(lat, dlat, span),
        step_axis(lon, dlon, span),
        Resolution::MAX,
    )
}

pub fn north(code: GeoCode, res: Resolution) -> GeoCode {
    neighbor(code, res, Direction::North)
}

pub fn south(code: GeoCode, res: Resolution) -> GeoCode {
    neighbor(code, res, Direction::South)
}

pub fn east(code: GeoCode, res: Resolution) -> GeoCode {
    neighbor(code, res, Direction::East)
}

pub fn west(code: GeoCode, res: Resolution) -> GeoCode {
    neighbor(code, res, Direction::West)
}

/// Zeroes the bits of `code` finer than `res`.
pub fn truncate(code: GeoCode, res: Resolution) -> GeoCode {
    code & res.prefix_mask()
}

/// Returns the parent cell of `code` at `res`, one resolution step coarser.
/// A resolution 2 cell has no parent and is returned unchanged.
pub fn parent(code: GeoCode, res: Resolution) -> (GeoCode, Resolution) {
    match res.coarser() {
        Some(coarser) => (truncate(code, coarser), coarser),
        None => (truncate(code, res), res),
    }
}

/// Returns the 16 children of the cell `code` at `res`, or None at the finest
/// resolution.
pub fn children(code: GeoCode, res: Resolution) -> Option<(Resolution, [GeoCode; 16])> {
    let finer = res.finer()?;
    let base = truncate(code, res);
    let shift = finer.digit_shift();
    let mut cells = [0u64; 16];
    for (digit, cell) in cells.iter_mut().enumerate() {
        *cell = base | ((digit as u64) << shift);
    }
    Some((finer, cells))
}

/// Axis aligned box in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub sw_lat: f64,
    pub sw_lon: f64,
    pub ne_lat: f64,
    pub ne_lon: f64,
}

impl BoundingBox {
    /// Length of the box diagonal in meters.
    pub fn diagonal(&self) -> f64 {
        central_angle(
            self.sw_lat.to_radians(),
            self.sw_lon.to_radians(),
            self.ne_lat.to_radians(),
            self.ne_lon.to_radians(),
        ) * EARTH_RADIUS_METERS
    }
}

/// Bounding box of the cell `code` at `res`. The north-east corner is the
/// last grid unit inside the cell.
pub fn bounding_box(code: GeoCode, res: Resolution) -> BoundingBox {
    let (lat, lon) = split_axes(code, res);
    let offset = res.axis_offset_mask() as u32;
    BoundingBox {
        sw_lat: axis_to_lat(lat),
        sw_lon: axis_to_lon(lon),
        ne_lat: axis_to_lat(lat | offset),
        ne_lon: axis_to_lon(lon | offset),
    }
}

/// Formats the `res / 2` significant hex digits of `code`.
pub fn to_hex(code: GeoCode, res: Resolution) -> String {
    let mut hex = format!("{:016x}", code);
    hex.truncate(res.digits());
    hex
}

/// Parses 1 to 16 hex digits into a code, zero-filling the missing trailing
/// digits. Returns the code and the resolution implied by the digit count.
pub fn from_hex(s: &str) -> HHResult<(GeoCode, Resolution)> {
    if s.is_empty() || s.len() > NUM_LEVELS {
        return Err(HHError::HexDecode(format!(
            "'{}' must hold between 1 and 16 hex digits",
            s
        )));
    }
    if !s.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(HHError::HexDecode(format!("'{}' is not a hex string", s)));
    }
    let value = u64::from_str_radix(s, 16).map_err(|e| HHError::HexDecode(e.to_string()))?;
    let res = Resolution::new(2 * s.len() as i64)?;
    Ok((value << (4 * (NUM_LEVELS - s.len())), res))
}

/// Diagonal in meters of a cell at `res` on the equator, where cells are
/// the largest.
pub fn cell_diagonal(res: Resolution) -> f64 {
    let cells = (1u64 << res.value()) as f64;
    let lat_span = PI / cells;
    let lon_span = 2.0 * PI / cells;
    central_angle(-lat_span / 2.0, 0.0, lat_span / 2.0, lon_span) * EARTH_RADIUS_METERS
}

/// Picks the coarsest resolution whose cell diagonal is at most `pct_error`
/// of `diagonal` (meters). Falls back to the finest resolution.
pub fn optimal_resolution(diagonal: f64, pct_error: f64) -> Resolution {
    let err = diagonal * pct_error;
    Resolution::all()
        .find(|res| cell_diagonal(*res) <= err)
        .unwrap_or(Resolution::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hhcode::point::encode;
    use crate::hhcode::test_util::{random_code, rng};

    fn res(r: i64) -> Resolution {
        Resolution::new(r).unwrap()
    }

    #[test]
    fn test_neighbors_fixtures() {
        let r32 = Resolution::MAX;
        assert_eq!(north(0, r32), 2);
        assert_eq!(north(0, Resolution::MIN), 0x2000_0000_0000_0000);
        assert_eq!(north(0xaaaa_aaaa_aaaa_aaaa, r32), 0);
        assert_eq!(east(0, r32), 1);
        assert_eq!(east(5, r32), 0x10);
        assert_eq!(east(0x5555_5555_5555_5555, r32), 0);
        assert_eq!(west(0, r32), 0x5555_5555_5555_5555);
        assert_eq!(south(0, r32), 0xaaaa_aaaa_aaaa_aaaa);
        assert_eq!(neighbor(0, r32, Direction::NorthEast), 3);
        assert_eq!(neighbor(3, r32, Direction::SouthWest), 0);
    }

    #[test]
    fn test_neighbor_inverse() {
        let mut rng = rng();
        for _ in 0..500 {
            let code = random_code(&mut rng);
            for r in Resolution::all() {
                for dir in Direction::ALL.iter() {
                    assert_eq!(neighbor(neighbor(code, r, *dir), r, dir.opposite()), code);
                }
            }
        }
        // Wrapping at the poles and the date line.
        let top = 0xaaaa_aaaa_aaaa_aaaa;
        assert_eq!(south(north(top, Resolution::MIN), Resolution::MIN), top);
        let right = 0x5555_5555_5555_5555;
        assert_eq!(west(east(right, res(8)), res(8)), right);
    }

    #[test]
    fn test_truncation_invariant() {
        let mut rng = rng();
        for _ in 0..200 {
            let code = random_code(&mut rng);
            for r1 in Resolution::all() {
                for r2 in Resolution::all().filter(|r| *r > r1) {
                    assert_eq!(truncate(code, r1), truncate(truncate(code, r2), r1));
                }
            }
        }
    }

    #[test]
    fn test_parent_and_children() {
        let code = 0x1234_5678_90ab_cdef;
        assert_eq!(parent(code, res(8)), (0x1230_0000_0000_0000, res(6)));
        assert_eq!(parent(code, Resolution::MIN), (0x1000_0000_0000_0000, Resolution::MIN));

        let (finer, kids) = children(code, res(4)).unwrap();
        assert_eq!(finer, res(6));
        assert_eq!(kids[0], 0x1200_0000_0000_0000);
        assert_eq!(kids[15], 0x12f0_0000_0000_0000);
        for kid in kids.iter() {
            assert_eq!(parent(*kid, finer), (truncate(code, res(4)), res(4)));
        }
        assert!(children(code, Resolution::MAX).is_none());
    }

    #[test]
    fn test_bounding_box() {
        let bbox = bounding_box(encode(48.0, -4.5), Resolution::MIN);
        assert_eq!(bbox.sw_lat, 45.0);
        assert_eq!(bbox.sw_lon, -90.0);
        assert!((bbox.ne_lat - 90.0).abs() < 1e-6);
        assert!(bbox.ne_lon.abs() < 1e-6);

        let bbox = bounding_box(0, Resolution::MAX);
        assert_eq!((bbox.sw_lat, bbox.sw_lon), (-90.0, -180.0));
        assert_eq!((bbox.ne_lat, bbox.ne_lon), (-90.0, -180.0));
    }

    #[test]
    fn test_hex() {
        let code = encode(48.0, -4.5);
        assert_eq!(to_hex(code, Resolution::MAX), "b570707070707071");
        assert_eq!(to_hex(code, res(6)), "b57");
        assert_eq!(to_hex(0, Resolution::MIN), "0");

        assert_eq!(from_hex("b57"), Ok((0xb570_0000_0000_0000, res(6))));
        assert_eq!(from_hex("b570707070707071"), Ok((code, Resolution::MAX)));
        assert_eq!(from_hex("ffffffffffffffff"), Ok((u64::MAX, Resolution::MAX)));
        assert!(matches!(from_hex(""), Err(HHError::HexDecode(_))));
        assert!(matches!(from_hex("b5707070707070710"), Err(HHError::HexDecode(_))));
        assert!(matches!(from_hex("b5g"), Err(HHError::HexDecode(_))));
        assert!(matches!(from_hex("+b5"), Err(HHError::HexDecode(_))));
    }

    #[test]
    fn test_optimal_resolution() {
        // Cells shrink by 4 along the diagonal at each step.
        assert!(cell_diagonal(res(4)) < cell_diagonal(res(2)));
        assert!(cell_diagonal(Resolution::MAX) < 0.02);

        let r = optimal_resolution(10_000.0, 0.05);
        assert!(cell_diagonal(r) <= 500.0);
        assert!(cell_diagonal(r.coarser().unwrap()) > 500.0);

        assert_eq!(optimal_resolution(1e9, 1.0), Resolution::MIN);
        assert_eq!(optimal_resolution(1.0, 0.0), Resolution::MAX);
    }
}
