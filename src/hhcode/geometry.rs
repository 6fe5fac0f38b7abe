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

//! Rasterization of points, lines, polygons, rectangles, circles and
//! corridors into coverages.
//!
//! Rasterization works on the integer grid: each axis spans `[0, 2^32)`
//! units and a cell at resolution r is `2^(32 - r)` units wide. Grid
//! coordinates are kept in `i64` so geometry crossing the date line may
//! leave that range; cells wrap modulo 2^32 when inserted. Circles reaching
//! a pole become the full band of longitudes up to that pole.
//!
//! A `resolution` argument of type `i32` follows one convention everywhere:
//! a positive value is an explicit resolution, zero or a negative value asks
//! for the automatic resolution refined by that many steps (`-2` is one
//! resolution finer than automatic).

use std::collections::BTreeSet;

use crate::consts::{
    AXIS_MASK, AXIS_UNITS, DEGREES_PER_LAT_UNIT, DEGREES_PER_LON_UNIT, EARTH_RADIUS_METERS,
    LAT_UNITS_PER_METER, LON_UNITS_PER_METER, MAX_RESOLUTION, MAX_RES_DIFF, QUADRANT_POLYGON_SIDES,
};
use crate::hhcode::cell::{self, BoundingBox};
use crate::hhcode::coverage::Coverage;
use crate::hhcode::error::HHResult;
use crate::hhcode::point::{self, GeoCode};
use crate::hhcode::resolution::Resolution;

/// Most cells along one side of a line's bounding box at the automatic
/// polyline resolution.
const MAX_CELLS_PER_SIDE: i64 = 64;

/// Finest automatic polyline resolution.
const MAX_POLYLINE_RESOLUTION: i64 = 26;

/// Converts a latitude to the grid unit containing it. Latitudes are
/// clamped to the poles and 90 maps to the last unit so closed areas
/// reaching the pole stay closed.
pub fn lat_to_grid(lat: f64) -> i64 {
    if lat >= 90.0 {
        return AXIS_MASK;
    }
    if lat <= -90.0 {
        return 0;
    }
    ((lat + 90.0) / DEGREES_PER_LAT_UNIT) as i64
}

/// Longitude counterpart of [`lat_to_grid`]; 180 maps to the last unit and
/// longitudes outside [-180, 180] wrap modulo 360.
pub fn lon_to_grid(lon: f64) -> i64 {
    if lon == 180.0 {
        return AXIS_MASK;
    }
    let mut offset = lon + 180.0;
    if !(0.0..=360.0).contains(&offset) {
        offset = offset.rem_euclid(360.0);
    }
    ((offset / DEGREES_PER_LON_UNIT) as i64).min(AXIS_MASK)
}

/// A point on the integer grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridPoint {
    pub lat: i64,
    pub lon: i64,
}

impl GridPoint {
    pub fn new(lat: i64, lon: i64) -> Self {
        GridPoint { lat, lon }
    }

    pub fn from_degrees(lat: f64, lon: f64) -> Self {
        GridPoint::new(lat_to_grid(lat), lon_to_grid(lon))
    }

    /// The full resolution code of this point, wrapped onto the grid.
    pub fn code(self) -> GeoCode {
        point::combine_axes(
            (self.lat & AXIS_MASK) as u32,
            (self.lon & AXIS_MASK) as u32,
            Resolution::MAX,
        )
    }

    /// Latitude and longitude in degrees, without wrapping.
    pub fn degrees(self) -> (f64, f64) {
        (
            self.lat as f64 * DEGREES_PER_LAT_UNIT - 90.0,
            self.lon as f64 * DEGREES_PER_LON_UNIT - 180.0,
        )
    }
}

impl From<GeoCode> for GridPoint {
    fn from(code: GeoCode) -> Self {
        let (lat, lon) = point::split_axes(code, Resolution::MAX);
        GridPoint::new(lat as i64, lon as i64)
    }
}

/// Bounding box on the grid, edges included.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridBox {
    pub south: i64,
    pub west: i64,
    pub north: i64,
    pub east: i64,
}

impl GridBox {
    pub fn of(points: &[GridPoint]) -> Option<GridBox> {
        let first = points.first()?;
        let mut b = GridBox {
            south: first.lat,
            west: first.lon,
            north: first.lat,
            east: first.lon,
        };
        for p in &points[1..] {
            b.south = b.south.min(p.lat);
            b.north = b.north.max(p.lat);
            b.west = b.west.min(p.lon);
            b.east = b.east.max(p.lon);
        }
        Some(b)
    }

    pub fn lat_span(&self) -> i64 {
        self.north.saturating_sub(self.south).saturating_abs()
    }

    pub fn lon_span(&self) -> i64 {
        self.east.saturating_sub(self.west).saturating_abs()
    }
}

/// floor(log2(v)), with 0 mapping far below any real span.
fn floor_log2(v: i64) -> i64 {
    if v <= 0 {
        i64::from(i32::MIN)
    } else {
        63 - i64::from(v.leading_zeros())
    }
}

/// Resolution whose cells are just smaller than the box, limiting the gap
/// between the lat and lon estimates to `MAX_RES_DIFF`. A negative `offset`
/// refines the result by that many steps as long as it stays valid.
pub fn optimal_polygon_resolution(bbox: &GridBox, offset: i32) -> Resolution {
    let lat_log = floor_log2(bbox.lat_span().min(AXIS_MASK));
    let lon_log = floor_log2(bbox.lon_span().min(AXIS_MASK));
    let max_diff = i64::from(MAX_RES_DIFF);

    let log = if (lat_log - lon_log).abs() > max_diff {
        lat_log.max(lon_log) - max_diff
    } else {
        lat_log.min(lon_log)
    };
    let mut res = i64::from(MAX_RESOLUTION) - (log.max(0).min(30) & !1);

    let refine = -i64::from(offset);
    if refine >= 0 && res + refine <= i64::from(MAX_RESOLUTION) {
        res = (res + refine) & 0x3e;
    }
    Resolution::new(res).unwrap_or(Resolution::MAX)
}

/// Resolution for covering lines: a few steps finer than the polygon
/// resolution, but with at most 64 cells per side of the box and never finer
/// than 26.
pub fn optimal_polyline_resolution(bbox: &GridBox, offset: i32) -> Resolution {
    let mut res = (i64::from(optimal_polygon_resolution(bbox, 0).value()) + 4).min(i64::from(MAX_RESOLUTION));
    while res > 2
        && ((bbox.lat_span() >> (32 - res)) > MAX_CELLS_PER_SIDE
            || (bbox.lon_span() >> (32 - res)) > MAX_CELLS_PER_SIDE)
    {
        res -= 2;
    }
    res = res.min(MAX_POLYLINE_RESOLUTION);

    let refined = res - i64::from(offset);
    if refined >= 2 && refined <= i64::from(MAX_RESOLUTION) {
        res = refined & 0x3e;
    }
    Resolution::new(res).unwrap_or(Resolution::MIN)
}

fn pick_resolution<F>(resolution: i32, auto: F) -> HHResult<Resolution>
where
    F: FnOnce() -> Resolution,
{
    if resolution <= 0 {
        Ok(auto())
    } else {
        Resolution::new(resolution)
    }
}

/// Resolution a polygon over `vertices` is rasterized at.
pub fn polygon_resolution(vertices: &[GridPoint], resolution: i32) -> HHResult<Resolution> {
    pick_resolution(resolution, || {
        GridBox::of(vertices)
            .map(|b| optimal_polygon_resolution(&b, resolution))
            .unwrap_or(Resolution::MAX)
    })
}

/// Resolution a polyline over `vertices` is rasterized at.
pub fn polyline_resolution(vertices: &[GridPoint], resolution: i32) -> HHResult<Resolution> {
    pick_resolution(resolution, || {
        GridBox::of(vertices)
            .map(|b| optimal_polyline_resolution(&b, resolution))
            .unwrap_or(Resolution::MAX)
    })
}

/// Covers the polygon, edges and interior, at a resolution picked as
/// described in the module docs. The polygon is implicitly closed.
pub fn cover_polygon(vertices: &[GridPoint], resolution: i32) -> HHResult<Coverage> {
    let mut coverage = Coverage::new();
    let res = polygon_resolution(vertices, resolution)?;
    cover_polygon_into(vertices, res, &mut coverage);
    Ok(coverage)
}

/// Adds the cells of the polygon at `res` to `coverage`.
pub fn cover_polygon_into(vertices: &[GridPoint], res: Resolution, coverage: &mut Coverage) {
    fill_polygon(vertices, res, coverage);
    cover_path(vertices, res, true, coverage);
}

/// Scanline fill. Each row of cells is scanned at its bottom latitude and
/// at every vertex latitude it holds. Edges crossing the scan latitude add
/// the cells they pass through inside the row and contribute one node;
/// cells between sorted node pairs are filled.
fn fill_polygon(vertices: &[GridPoint], res: Resolution, coverage: &mut Coverage) {
    let bbox = match GridBox::of(vertices) {
        Some(bbox) => bbox,
        None => return,
    };
    let n = vertices.len();
    let span = res.axis_span();
    let offset_mask = res.axis_offset_mask();
    let prefix_mask = res.axis_prefix_mask();

    // No scan covers more than one axis width in either direction.
    let bottom = bbox.south & prefix_mask;
    let top = (bbox.north | offset_mask).min(bottom.saturating_add(AXIS_MASK));

    let mut rows: BTreeSet<i64> = vertices.iter().map(|v| v.lat).collect();
    let mut lat = bottom;
    while lat <= top {
        rows.insert(lat & prefix_mask);
        lat += span;
    }

    let mut nodes: Vec<i64> = Vec::with_capacity(n);
    for &lat in rows.iter() {
        nodes.clear();

        let mut j = n - 1;
        for i in 0..n {
            let vi = vertices[i];
            let vj = vertices[j];

            if vi.lat != vj.lat
                && ((vi.lat >= lat && vj.lat <= lat) || (vj.lat >= lat && vi.lat <= lat))
            {
                // f64 slope: lon deltas may exceed 2^32 across the date line.
                let slope = (vj.lon - vi.lon) as f64 / (vj.lat - vi.lat) as f64;
                let bottom_x = vi.lon + ((lat - vi.lat) as f64 * slope) as i64;
                let top_x = vi.lon + (((lat | offset_mask) - vi.lat) as f64 * slope) as i64;

                let start = (top_x & prefix_mask).min(bottom_x & prefix_mask);
                let stop = (top_x & prefix_mask)
                    .max(bottom_x & prefix_mask)
                    .min(start.saturating_add(AXIS_MASK));

                let mut lowest = None;
                let mut lon = start;
                while lon <= stop {
                    if (lon >= (vi.lon & prefix_mask) && lon <= (vj.lon | offset_mask))
                        || (lon >= (vj.lon & prefix_mask) && lon <= (vi.lon | offset_mask))
                    {
                        coverage.add_axes(res, lat, lon);
                        if lowest.is_none() {
                            lowest = Some(lon);
                        }
                    }
                    lon += span;
                }

                // A vertex on the scan latitude counts only when it is a
                // local extremum; otherwise both its edges would add a node.
                let next = vertices[(i + 1) % n].lat;
                let extremum = i128::from(next - vi.lat) * i128::from(vj.lat - vi.lat) > 0;
                if lat != vi.lat || extremum {
                    nodes.push(lowest.unwrap_or(bottom_x));
                }
            } else if vi.lat == vj.lat && (lat & prefix_mask) == (vi.lat & prefix_mask) {
                let mut lon = vi.lon.min(vj.lon);
                let stop = vi.lon.max(vj.lon).min(lon.saturating_add(AXIS_MASK));
                while lon <= stop {
                    coverage.add_axes(res, lat, lon);
                    lon += span;
                }
            }

            j = i;
        }

        nodes.sort_unstable();
        for pair in nodes.chunks(2) {
            if let [from, to] = *pair {
                let mut lon = from & prefix_mask;
                let stop = (to | offset_mask).min(lon.saturating_add(AXIS_MASK));
                while lon <= stop {
                    coverage.add_axes(res, lat, lon);
                    lon += span;
                }
            }
        }
    }
}

/// Adds every cell the segment `from`-`to` passes through at `res`,
/// endpoints included.
///
/// The walk starts at the western end and, cell after cell, compares the
/// line's slope with the slope to the cell's exit corner to decide whether
/// the line leaves through the east side, the north/south side or the
/// corner.
pub fn cover_line(from: GridPoint, to: GridPoint, res: Resolution, coverage: &mut Coverage) {
    let (from, to) = if from.lon > to.lon { (to, from) } else { (from, to) };

    coverage.add_axes(res, from.lat, from.lon);
    coverage.add_axes(res, to.lat, to.lon);

    let dlat = i128::from((to.lat - from.lat).abs());
    let dlon = i128::from(to.lon - from.lon);
    let north = to.lat - from.lat;

    let span = res.axis_span();
    let offset_mask = res.axis_offset_mask();
    let prefix_mask = res.axis_prefix_mask();

    let mut lat = from.lat;
    let mut lon = from.lon;

    if north == 0 {
        while (lon & prefix_mask) < to.lon {
            coverage.add_axes(res, lat, lon);
            lon += span;
        }
    } else if dlon == 0 {
        if north > 0 {
            while (lat & prefix_mask) < to.lat {
                coverage.add_axes(res, lat, lon);
                lat += span;
            }
        } else {
            while (lat | offset_mask) > to.lat {
                coverage.add_axes(res, lat, lon);
                lat -= span;
            }
        }
    } else {
        loop {
            coverage.add_axes(res, lat, lon);

            let lat_offset = if north > 0 {
                (lat | offset_mask) + 1 - lat
            } else {
                lat - (lat & prefix_mask) + 1
            };
            let lon_offset = (lon | offset_mask) + 1 - lon;

            let lat_off_dlon = i128::from(lat_offset) * dlon;
            let lon_off_dlat = i128::from(lon_offset) * dlat;

            if lat_off_dlon > lon_off_dlat {
                // Leaves through the east side.
                lat += north.signum() * (lon_off_dlat / dlon) as i64;
                lon = (lon | offset_mask) + 1;
            } else {
                lat = if north > 0 {
                    (lat | offset_mask) + 1
                } else {
                    (lat & prefix_mask) - 1
                };
                if lat_off_dlon < lon_off_dlat {
                    lon += (lat_off_dlon / dlat) as i64;
                } else {
                    lon = (lon | offset_mask) + 1;
                }
            }

            let more = if north > 0 {
                (lat & prefix_mask) < to.lat
            } else {
                (lat | offset_mask) > to.lat
            };
            if !more || (lon & prefix_mask) >= to.lon {
                break;
            }
        }
    }
}

fn cover_path(vertices: &[GridPoint], res: Resolution, closed: bool, coverage: &mut Coverage) {
    match vertices {
        [] => {}
        [single] => {
            coverage.add_axes(res, single.lat, single.lon);
        }
        _ => {
            for pair in vertices.windows(2) {
                cover_line(pair[0], pair[1], res, coverage);
            }
            if closed {
                cover_line(vertices[vertices.len() - 1], vertices[0], res, coverage);
            }
        }
    }
}

/// Covers the line through `vertices`; `closed` also joins the last vertex
/// to the first.
pub fn cover_polyline(vertices: &[GridPoint], resolution: i32, closed: bool) -> HHResult<Coverage> {
    let mut coverage = Coverage::new();
    let res = polyline_resolution(vertices, resolution)?;
    cover_path(vertices, res, closed, &mut coverage);
    Ok(coverage)
}

/// Vertices of the rectangle(s) spanned by two corners in degrees. A west
/// edge east of the east edge crosses the date line and yields two
/// rectangles, one on each side.
pub fn rectangle_vertices(sw_lat: f64, sw_lon: f64, ne_lat: f64, ne_lon: f64) -> Vec<Vec<GridPoint>> {
    let (south, north) = (lat_to_grid(sw_lat.min(ne_lat)), lat_to_grid(sw_lat.max(ne_lat)));
    let quad = |west: i64, east: i64| {
        vec![
            GridPoint::new(south, west),
            GridPoint::new(south, east),
            GridPoint::new(north, east),
            GridPoint::new(north, west),
        ]
    };
    if sw_lon > ne_lon {
        vec![
            quad(lon_to_grid(sw_lon), lon_to_grid(180.0)),
            quad(lon_to_grid(-180.0), lon_to_grid(ne_lon)),
        ]
    } else {
        vec![quad(lon_to_grid(sw_lon), lon_to_grid(ne_lon))]
    }
}

/// Covers the rectangle between the south-west and north-east corners.
pub fn cover_rectangle(sw_lat: f64, sw_lon: f64, ne_lat: f64, ne_lon: f64, resolution: i32) -> HHResult<Coverage> {
    let parts = rectangle_vertices(sw_lat, sw_lon, ne_lat, ne_lon);

    // Both halves of a date line crossing share one resolution, picked from
    // the unwrapped extent.
    let res = pick_resolution(resolution, || {
        let west = lon_to_grid(sw_lon);
        let mut east = lon_to_grid(ne_lon);
        if sw_lon > ne_lon {
            east += AXIS_MASK + 1;
        }
        let bbox = GridBox {
            south: lat_to_grid(sw_lat.min(ne_lat)),
            west,
            north: lat_to_grid(sw_lat.max(ne_lat)),
            east,
        };
        optimal_polygon_resolution(&bbox, resolution)
    })?;

    let mut coverage = Coverage::new();
    for part in parts.iter() {
        cover_polygon_into(part, res, &mut coverage);
    }
    Ok(coverage)
}

/// Half the circumference; no distance on the sphere is longer.
const MAX_DISTANCE_METERS: f64 = std::f64::consts::PI * EARTH_RADIUS_METERS;

fn lon_units_per_meter(lat: f64) -> f64 {
    // Keep the scale finite at the poles.
    LON_UNITS_PER_METER / libm::cos(lat.to_radians()).abs().max(1e-9)
}

/// Non-negative distance in meters, at most half the circumference.
fn clamp_distance(meters: f64) -> f64 {
    if meters.is_nan() {
        return 0.0;
    }
    meters.abs().min(MAX_DISTANCE_METERS)
}

/// Polygon approximation of a circle, `4 * QUADRANT_POLYGON_SIDES` vertices
/// counter-clockwise from the east.
///
/// A circle reaching a pole, or wide enough to go around the world, is
/// replaced by the band of all longitudes between its southern and northern
/// extent, extended to the poles it reaches.
pub fn circle_vertices(lat: f64, lon: f64, radius: f64) -> Vec<GridPoint> {
    let center = GridPoint::from_degrees(lat, lon);
    let radius = clamp_distance(radius);
    let lat_radius = (radius * LAT_UNITS_PER_METER).round() as i64;
    let lon_radius = (radius * lon_units_per_meter(lat.clamp(-90.0, 90.0)))
        .round()
        .min(AXIS_UNITS as f64) as i64;

    let south = center.lat - lat_radius;
    let north = center.lat + lat_radius;
    if south < 0 || north > AXIS_MASK || 2 * lon_radius >= AXIS_UNITS {
        let (south, north) = (south.max(0), north.min(AXIS_MASK));
        return vec![
            GridPoint::new(south, 0),
            GridPoint::new(south, AXIS_MASK),
            GridPoint::new(north, AXIS_MASK),
            GridPoint::new(north, 0),
        ];
    }

    let (lat_radius, lon_radius) = (lat_radius as f64, lon_radius as f64);
    let sides = QUADRANT_POLYGON_SIDES;
    let step = std::f64::consts::PI * 2.0 / (4 * sides) as f64;
    let mut vertices = vec![center; 4 * sides];
    for i in 0..sides {
        let a = i as f64 * step;
        let (s, c) = (libm::sin(a), libm::cos(a));
        let at = |dlat: f64, dlon: f64| {
            GridPoint::new(center.lat + (dlat * lat_radius) as i64, center.lon + (dlon * lon_radius) as i64)
        };
        vertices[i] = at(s, c);
        vertices[i + sides] = at(c, -s);
        vertices[i + 2 * sides] = at(-s, -c);
        vertices[i + 3 * sides] = at(-c, s);
    }
    vertices
}

/// Covers a circle of `radius` meters around (lat, lon).
pub fn cover_circle(lat: f64, lon: f64, radius: f64, resolution: i32) -> HHResult<Coverage> {
    cover_polygon(&circle_vertices(lat, lon, radius), resolution)
}

/// Corners of the corridor extending `distance` meters on both sides and
/// past both ends of the segment. Distances are measured on a plane tangent
/// at the segment's midpoint.
pub fn segment_vertices(from: GridPoint, to: GridPoint, distance: f64) -> Vec<GridPoint> {
    let mid_lat = ((from.lat + to.lat) / 2) as f64 * DEGREES_PER_LAT_UNIT - 90.0;
    let lat_scale = LAT_UNITS_PER_METER;
    let lon_scale = lon_units_per_meter(mid_lat).round().max(1.0);

    let north = (to.lat - from.lat) as f64 / lat_scale;
    let east = (to.lon - from.lon) as f64 / lon_scale;
    let length = north.hypot(east);
    let (un, ue) = if length > 0.0 {
        (north / length, east / length)
    } else {
        (0.0, 1.0)
    };

    // Offsets stay within one axis width; corners stop at the poles.
    let limit = AXIS_UNITS as f64;
    let distance = clamp_distance(distance);
    let corner = |along: f64, left: f64| {
        let n = un * along + ue * left;
        let e = ue * along - un * left;
        let dlat = (n * lat_scale).round().clamp(-limit, limit) as i64;
        let dlon = (e * lon_scale).round().clamp(-limit, limit) as i64;
        GridPoint::new(from.lat.saturating_add(dlat).clamp(0, AXIS_MASK), from.lon.saturating_add(dlon))
    };

    vec![
        corner(-distance, distance),
        corner(length + distance, distance),
        corner(length + distance, -distance),
        corner(-distance, -distance),
    ]
}

/// Covers the corridor of half-width `distance` meters around a segment.
pub fn cover_segment(from: GridPoint, to: GridPoint, distance: f64, resolution: i32) -> HHResult<Coverage> {
    cover_polygon(&segment_vertices(from, to, distance), resolution)
}

/// Collapses consecutive codes falling in the same cell at `res` and moves
/// each survivor to its cell's center.
pub fn resample_polyline(codes: &[GeoCode], res: Resolution) -> Vec<GeoCode> {
    let mut resampled: Vec<GeoCode> = Vec::with_capacity(codes.len());
    let mut last = None;
    for code in codes {
        let cell = code & res.prefix_mask();
        if last == Some(cell) {
            continue;
        }
        last = Some(cell);
        resampled.push(point::center(cell, res));
    }
    resampled
}

/// A (lat, lon) vertex in degrees.
pub type LatLon = (f64, f64);

fn to_grid(vertices: &[LatLon]) -> Vec<GridPoint> {
    vertices.iter().map(|(lat, lon)| GridPoint::from_degrees(*lat, *lon)).collect()
}

/// Geometries the rasterizer accepts, coordinates in degrees.
#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
    Point(LatLon),
    LineString(Vec<LatLon>),
    /// Rings are implicitly closed.
    Polygon { exterior: Vec<LatLon>, holes: Vec<Vec<LatLon>> },
    Rectangle(BoundingBox),
    Circle { center: LatLon, radius: f64 },
    /// A path widened by `widths[i]` meters on each side of its i-th
    /// segment. Segments with no positive width are skipped.
    Corridor { path: Vec<LatLon>, widths: Vec<f64> },
    Collection(Vec<Geometry>),
}

impl Geometry {
    /// Vertices in degrees bounding the geometry.
    fn outline(&self) -> Vec<LatLon> {
        match self {
            Geometry::Point(p) => vec![*p],
            Geometry::LineString(path) => path.clone(),
            Geometry::Polygon { exterior, .. } => exterior.clone(),
            Geometry::Rectangle(b) => vec![(b.sw_lat, b.sw_lon), (b.ne_lat, b.ne_lon)],
            Geometry::Circle { center, radius } => circle_vertices(center.0, center.1, *radius)
                .into_iter()
                .map(GridPoint::degrees)
                .collect(),
            Geometry::Corridor { path, widths } => path
                .windows(2)
                .zip(widths.iter())
                .flat_map(|(seg, w)| {
                    segment_vertices(GridPoint::from_degrees(seg[0].0, seg[0].1), GridPoint::from_degrees(seg[1].0, seg[1].1), *w)
                })
                .map(GridPoint::degrees)
                .collect(),
            Geometry::Collection(parts) => parts.iter().flat_map(Geometry::outline).collect(),
        }
    }

    /// Bounding box in degrees, `None` for an empty geometry.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let outline = self.outline();
        let (first, rest) = outline.split_first()?;
        let mut b = BoundingBox {
            sw_lat: first.0,
            sw_lon: first.1,
            ne_lat: first.0,
            ne_lon: first.1,
        };
        for (lat, lon) in rest {
            b.sw_lat = b.sw_lat.min(*lat);
            b.ne_lat = b.ne_lat.max(*lat);
            b.sw_lon = b.sw_lon.min(*lon);
            b.ne_lon = b.ne_lon.max(*lon);
        }
        Some(b)
    }

    /// Coarsest resolution whose cell diagonal is at most `pct_error` of the
    /// bounding box diagonal, `None` for an empty geometry.
    pub fn error_resolution(&self, pct_error: f64) -> Option<Resolution> {
        self.bounding_box()
            .map(|bbox| cell::optimal_resolution(bbox.diagonal(), pct_error))
    }

    /// Rasterizes the geometry. With `inside`, only cells lying entirely
    /// within the area are kept: boundary cells are removed and lines or
    /// points produce nothing. Polygon holes are always subtracted.
    pub fn cover(&self, resolution: i32, inside: bool) -> HHResult<Coverage> {
        match self {
            Geometry::Point(p) => {
                if inside {
                    return Ok(Coverage::new());
                }
                cover_polyline(&to_grid(&[*p]), resolution, false)
            }
            Geometry::LineString(path) => {
                if inside {
                    return Ok(Coverage::new());
                }
                cover_polyline(&to_grid(path), resolution, false)
            }
            Geometry::Polygon { exterior, holes } => {
                let ring = to_grid(exterior);
                let res = polygon_resolution(&ring, resolution)?;
                let mut coverage = cover_ring(&ring, res, inside)?;
                for hole in holes {
                    // Cells straddling the hole's edge stay in the area,
                    // unless only inner cells are wanted.
                    let hole = cover_ring(&to_grid(hole), res, !inside)?;
                    coverage = Coverage::minus(&coverage, &hole, None)?;
                }
                Ok(coverage)
            }
            Geometry::Rectangle(b) => {
                let parts = rectangle_vertices(b.sw_lat, b.sw_lon, b.ne_lat, b.ne_lon);
                let mut coverage = cover_rectangle(b.sw_lat, b.sw_lon, b.ne_lat, b.ne_lon, resolution)?;
                if inside {
                    let res = coverage.finest().unwrap_or(Resolution::MAX);
                    let mut boundary = Coverage::new();
                    for part in parts.iter() {
                        cover_path(part, res, true, &mut boundary);
                    }
                    coverage = Coverage::minus(&coverage, &boundary, None)?;
                }
                Ok(coverage)
            }
            Geometry::Circle { center, radius } => {
                let ring = circle_vertices(center.0, center.1, *radius);
                let res = polygon_resolution(&ring, resolution)?;
                cover_ring(&ring, res, inside)
            }
            Geometry::Corridor { path, widths } => {
                let path = to_grid(path);
                let mut coverage = Coverage::new();
                for (segment, width) in path.windows(2).zip(widths.iter()) {
                    if *width <= 0.0 {
                        continue;
                    }
                    let ring = segment_vertices(segment[0], segment[1], *width);
                    let res = polygon_resolution(&ring, resolution)?;
                    coverage.merge(&cover_ring(&ring, res, inside)?);
                }
                Ok(coverage)
            }
            Geometry::Collection(parts) => {
                let mut coverage = Coverage::new();
                for part in parts {
                    coverage.merge(&part.cover(resolution, inside)?);
                }
                Ok(coverage)
            }
        }
    }
}

/// Cells of a closed ring at `res`; with `inside`, minus its boundary.
fn cover_ring(ring: &[GridPoint], res: Resolution, inside: bool) -> HHResult<Coverage> {
    let mut coverage = Coverage::new();
    cover_polygon_into(ring, res, &mut coverage);
    if inside {
        let mut boundary = Coverage::new();
        cover_path(ring, res, true, &mut boundary);
        coverage = Coverage::minus(&coverage, &boundary, None)?;
    }
    Ok(coverage)
}
