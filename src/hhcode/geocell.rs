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

//! Geocells: cells tagged with their own resolution.
//!
//! A geocell packs `res / 2` into its top nibble and the first 15 hex digits
//! of the cell code, truncated to the resolution, into the low 60 bits. This
//! makes a cell self-describing, which is what the shape wire format stores.
//! Only resolutions 2 to 30 fit; a resolution 32 cell has no geocell.

use crate::hhcode::cell;
use crate::hhcode::error::{HHError, HHResult};
use crate::hhcode::point::GeoCode;
use crate::hhcode::resolution::Resolution;

/// A resolution-tagged cell.
pub type GeoCell = u64;

const CODE_MASK: u64 = 0x0fff_ffff_ffff_ffff;

/// Finest resolution a geocell can carry.
pub fn max_geocell_resolution() -> Resolution {
    Resolution::MAX.coarser().unwrap_or(Resolution::MAX)
}

/// Builds the geocell of the cell containing `code` at `res`.
pub fn to_geocell(code: GeoCode, res: Resolution) -> HHResult<GeoCell> {
    if res == Resolution::MAX {
        return Err(HHError::InvalidResolution(res.value() as i64));
    }
    Ok(((res.digits() as u64) << 60) | ((cell::truncate(code, res) >> 4) & CODE_MASK))
}

/// Resolution carried by `geocell`, None if its tag is zero.
pub fn geocell_resolution(geocell: GeoCell) -> Option<Resolution> {
    match geocell >> 60 {
        0 => None,
        tag => Resolution::new(2 * tag as i64).ok(),
    }
}

/// Splits a geocell back into a cell code and its resolution.
pub fn from_geocell(geocell: GeoCell) -> HHResult<(GeoCode, Resolution)> {
    let res = geocell_resolution(geocell)
        .ok_or_else(|| HHError::Encoding(format!("geocell {:016x} has no resolution", geocell)))?;
    Ok(((geocell << 4) & res.prefix_mask(), res))
}

/// The 16 children of `geocell`. Children of a resolution 30 geocell are
/// resolution 32 cells and are returned as plain codes.
pub fn sub_geocells(geocell: GeoCell) -> HHResult<[u64; 16]> {
    let (code, res) = from_geocell(geocell)?;
    let (finer, mut cells) = cell::children(code, res)
        .ok_or_else(|| HHError::InvalidResolution(res.value() as i64))?;
    if finer != Resolution::MAX {
        for c in cells.iter_mut() {
            *c = to_geocell(*c, finer)?;
        }
    }
    Ok(cells)
}

/// Parent of `geocell`; a resolution 2 geocell is its own parent.
pub fn parent_geocell(geocell: GeoCell) -> HHResult<GeoCell> {
    let (code, res) = from_geocell(geocell)?;
    let (parent, coarser) = cell::parent(code, res);
    to_geocell(parent, coarser)
}

/// The geocells containing `code`, resolution 2 to 30, coarsest first.
pub fn point_geocells(code: GeoCode) -> Vec<GeoCell> {
    Resolution::all()
        .filter(|res| *res != Resolution::MAX)
        .filter_map(|res| to_geocell(code, res).ok())
        .collect()
}
