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

//! Encoded polylines: signed varints of 1e-5 degree deltas, five bits per
//! printable character, as published by common mapping APIs.

use crate::hhcode::error::{HHError, HHResult};
use crate::hhcode::geometry::LatLon;

const PRECISION: f64 = 1e5;

/// Reads one zigzag varint starting at `*index`.
fn next_value(bytes: &[u8], index: &mut usize) -> HHResult<i64> {
    let mut result: i64 = 0;
    let mut shift = 0;
    loop {
        let byte = *bytes
            .get(*index)
            .ok_or_else(|| HHError::Encoding("truncated polyline".to_string()))?;
        *index += 1;
        if !(63..=126).contains(&byte) {
            return Err(HHError::Encoding(format!(
                "invalid polyline character '{}'",
                byte as char
            )));
        }
        if shift > 60 {
            return Err(HHError::Encoding("polyline value overflows".to_string()));
        }
        let chunk = i64::from(byte - 63);
        result |= (chunk & 0x1f) << shift;
        shift += 5;
        if chunk < 0x20 {
            break;
        }
    }
    Ok(if result & 1 != 0 { !(result >> 1) } else { result >> 1 })
}

/// Decodes an encoded polyline into (lat, lon) vertices.
pub fn decode(encoded: &str) -> HHResult<Vec<LatLon>> {
    let bytes = encoded.as_bytes();
    let mut index = 0;
    let mut lat: i64 = 0;
    let mut lon: i64 = 0;
    let mut vertices = Vec::new();

    while index < bytes.len() {
        lat += next_value(bytes, &mut index)?;
        if index >= bytes.len() {
            return Err(HHError::Encoding("polyline ends with a lone latitude".to_string()));
        }
        lon += next_value(bytes, &mut index)?;
        vertices.push((lat as f64 / PRECISION, lon as f64 / PRECISION));
    }
    Ok(vertices)
}

fn push_value(value: i64, out: &mut String) {
    let mut v = if value < 0 { !(value << 1) } else { value << 1 };
    while v >= 0x20 {
        out.push((((v & 0x1f) | 0x20) as u8 + 63) as char);
        v >>= 5;
    }
    out.push((v as u8 + 63) as char);
}

/// Encodes (lat, lon) vertices, rounding to 1e-5 degree.
pub fn encode(vertices: &[LatLon]) -> String {
    let mut out = String::new();
    let (mut last_lat, mut last_lon) = (0i64, 0i64);
    for (lat, lon) in vertices {
        let lat = (lat * PRECISION).round() as i64;
        let lon = (lon * PRECISION).round() as i64;
        push_value(lat - last_lat, &mut out);
        push_value(lon - last_lon, &mut out);
        last_lat = lat;
        last_lon = lon;
    }
    out
}

/// True if `token` only holds characters an encoded polyline may contain.
/// Digits, ':' and ',' are excluded so numeric terms are never mistaken for
/// polylines.
pub fn looks_encoded(token: &str) -> bool {
    !token.is_empty()
        && token
            .bytes()
            .all(|b| (63..=126).contains(&b))
}
