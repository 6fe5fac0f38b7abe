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

//! Textual area definitions.
//!
//! An area spec is a whitespace separated list of terms folded left to
//! right into a single coverage. Each term is an optional operator, an
//! optional `@<res>:` resolution prefix and a shape:
//!
//! ```text
//! +circle:48.0:-4.5:5000 -circle:48.0:-4.55:3000
//! &@-2:rect:40:-10,50:5
//! path:0:0:100,0:1,0:2:200,0:3
//! polyline:500:_p~iF~ps|U_ulLnnqC_mqNvxq`@
//! ```
//!
//! `+` merges the term into the accumulator (the default), `-` subtracts it
//! and `&` intersects with it. A leading operator character is always read
//! as an operator, so a point with a negative latitude is written `+-33:151`.

use std::fmt;
use std::str::FromStr;

use crate::hhcode::cell::BoundingBox;
use crate::hhcode::config::CoverageConfig;
use crate::hhcode::coverage::Coverage;
use crate::hhcode::error::{HHError, HHResult};
use crate::hhcode::geometry::{Geometry, LatLon};
use crate::hhcode::polyline;
use crate::hhcode::resolution::Resolution;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operator {
    Union,
    Subtract,
    Intersect,
}

impl Operator {
    pub fn symbol(self) -> char {
        match self {
            Operator::Union => '+',
            Operator::Subtract => '-',
            Operator::Intersect => '&',
        }
    }

    fn from_symbol(c: char) -> Option<Operator> {
        match c {
            '+' => Some(Operator::Union),
            '-' => Some(Operator::Subtract),
            '&' => Some(Operator::Intersect),
            _ => None,
        }
    }
}

/// One term of an area spec.
#[derive(Clone, Debug, PartialEq)]
pub struct AreaTerm {
    pub operator: Operator,
    /// Overrides the configured resolution for this term only.
    pub resolution: Option<i32>,
    pub geometry: Geometry,
}

impl AreaTerm {
    pub fn new(operator: Operator, geometry: Geometry) -> Self {
        AreaTerm {
            operator,
            resolution: None,
            geometry,
        }
    }

    pub fn with_resolution(mut self, resolution: i32) -> Self {
        self.resolution = Some(resolution);
        self
    }

    /// Resolution argument the term is rasterized with: its own prefix,
    /// else the configured resolution, else the one meeting `pct_error`.
    fn resolution_in(&self, config: &CoverageConfig) -> i32 {
        if let Some(resolution) = self.resolution {
            return resolution;
        }
        match config.pct_error {
            Some(pct_error) if config.resolution == 0 => self
                .geometry
                .error_resolution(pct_error)
                .map_or(0, |res| res.value() as i32),
            _ => config.resolution,
        }
    }

    /// Parses a single term such as `-@16:circle:48:-4.5:100`.
    pub fn parse(token: &str) -> HHResult<AreaTerm> {
        let mut rest = token;
        let mut operator = Operator::Union;
        if let Some(op) = rest.chars().next().and_then(Operator::from_symbol) {
            operator = op;
            rest = &rest[1..];
        }

        let mut resolution = None;
        if rest.starts_with('@') && rest.contains(':') {
            let (prefix, shape) = split_once(&rest[1..], ':');
            let value: i32 = prefix
                .parse()
                .map_err(|_| HHError::malformed(token, format!("invalid resolution '{}'", prefix)))?;
            if value > 0 {
                Resolution::new(value).map_err(|e| HHError::malformed(token, e.to_string()))?;
            }
            resolution = Some(value);
            rest = shape;
        }

        let geometry = parse_shape(token, rest)?;
        Ok(AreaTerm {
            operator,
            resolution,
            geometry,
        })
    }
}

/// A parsed area definition, ready to be rasterized.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AreaSpec {
    terms: Vec<AreaTerm>,
}

impl AreaSpec {
    pub fn new() -> Self {
        AreaSpec::default()
    }

    /// Parses every term up front; nothing is rasterized on failure.
    pub fn parse(text: &str) -> HHResult<AreaSpec> {
        let terms = text
            .split_whitespace()
            .map(AreaTerm::parse)
            .collect::<HHResult<Vec<_>>>()?;
        Ok(AreaSpec { terms })
    }

    pub fn terms(&self) -> &[AreaTerm] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Appends a term. Geometries with no textual form (collections and
    /// polygons with holes) are rejected so the terms can always be written
    /// back out.
    pub fn push(&mut self, term: AreaTerm) -> HHResult<()> {
        match &term.geometry {
            Geometry::Collection(_) => {
                return Err(HHError::InvalidArgument(
                    "collections cannot appear in an area spec".to_string(),
                ))
            }
            Geometry::Polygon { holes, .. } if !holes.is_empty() => {
                return Err(HHError::InvalidArgument(
                    "polygons with holes cannot appear in an area spec".to_string(),
                ))
            }
            _ => {}
        }
        self.terms.push(term);
        Ok(())
    }

    /// Folds the terms into one coverage, starting from an empty one, then
    /// compacts it with the configured thresholds and cell limit.
    pub fn to_coverage(&self, config: &CoverageConfig) -> HHResult<Coverage> {
        config.validate()?;

        let mut area = Coverage::new();
        for term in &self.terms {
            let coverage = term.geometry.cover(term.resolution_in(config), false)?;
            area = match term.operator {
                Operator::Union => {
                    area.merge(&coverage);
                    area
                }
                Operator::Subtract => Coverage::minus(&area, &coverage, config.max_cells)?,
                Operator::Intersect => Coverage::intersection(&area, &coverage, false, config.max_cells)?,
            };
        }

        area.optimize(config.thresholds());
        if let Some(limit) = config.limit_cells {
            area.reduce(limit)?;
        }
        Ok(area)
    }
}

impl FromStr for AreaSpec {
    type Err = HHError;

    fn from_str(s: &str) -> HHResult<AreaSpec> {
        AreaSpec::parse(s)
    }
}

/// Parses `text` and rasterizes it with `config`.
pub fn parse_area(text: &str, config: &CoverageConfig) -> HHResult<Coverage> {
    AreaSpec::parse(text)?.to_coverage(config)
}

fn split_once(s: &str, sep: char) -> (&str, &str) {
    match s.find(sep) {
        Some(idx) => (&s[..idx], &s[idx + sep.len_utf8()..]),
        None => (s, ""),
    }
}

fn number(token: &str, field: &str) -> HHResult<f64> {
    match field.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(HHError::malformed(token, format!("invalid number '{}'", field))),
    }
}

/// Parses `lat:lon` plus up to `extra` trailing fields.
fn fields(token: &str, text: &str, min: usize, max: usize) -> HHResult<Vec<f64>> {
    let parts: Vec<&str> = text.split(':').collect();
    if parts.len() < min || parts.len() > max {
        let reason = if min == max {
            format!("expected {} fields, got {}", min, parts.len())
        } else {
            format!("expected {} to {} fields, got {}", min, max, parts.len())
        };
        return Err(HHError::malformed(token, reason));
    }
    parts.iter().map(|field| number(token, field)).collect()
}

fn lat_lon(token: &str, text: &str) -> HHResult<LatLon> {
    let v = fields(token, text, 2, 2)?;
    Ok((v[0], v[1]))
}

fn vertices(token: &str, text: &str, min: usize) -> HHResult<Vec<LatLon>> {
    let vertices = text
        .split(',')
        .map(|vertex| lat_lon(token, vertex))
        .collect::<HHResult<Vec<_>>>()?;
    if vertices.len() < min {
        return Err(HHError::malformed(
            token,
            format!("expected at least {} vertices, got {}", min, vertices.len()),
        ));
    }
    Ok(vertices)
}

fn decode_polyline(token: &str, encoded: &str) -> HHResult<Vec<LatLon>> {
    let path = polyline::decode(encoded).map_err(|e| HHError::malformed(token, e.to_string()))?;
    if path.is_empty() {
        return Err(HHError::malformed(token, "empty polyline"));
    }
    Ok(path)
}

fn parse_shape(token: &str, shape: &str) -> HHResult<Geometry> {
    if let Some(def) = shape.strip_prefix("circle:") {
        let v = fields(token, def, 3, 3)?;
        return Ok(Geometry::Circle {
            center: (v[0], v[1]),
            radius: v[2].abs(),
        });
    }

    if let Some(def) = shape.strip_prefix("polygon:").or_else(|| shape.strip_prefix("poly:")) {
        let mut exterior = vertices(token, def, 3)?;
        if exterior.len() > 3 && exterior.first() == exterior.last() {
            exterior.pop();
        }
        return Ok(Geometry::Polygon {
            exterior,
            holes: Vec::new(),
        });
    }

    if let Some(def) = shape.strip_prefix("rect:") {
        let corners = vertices(token, def, 2)?;
        if corners.len() != 2 {
            return Err(HHError::malformed(token, "expected two corners"));
        }
        let (sw, ne) = (corners[0], corners[1]);
        return Ok(Geometry::Rectangle(BoundingBox {
            sw_lat: sw.0.min(ne.0),
            sw_lon: sw.1,
            ne_lat: sw.0.max(ne.0),
            ne_lon: ne.1,
        }));
    }

    if let Some(def) = shape.strip_prefix("path:") {
        let mut path = Vec::new();
        let mut widths = Vec::new();
        let mut width = 0.0;
        for vertex in def.split(',') {
            let v = fields(token, vertex, 2, 3)?;
            if !path.is_empty() {
                widths.push(width);
            }
            if let Some(w) = v.get(2) {
                width = *w;
            }
            path.push((v[0], v[1]));
        }
        if path.len() < 2 {
            return Err(HHError::malformed(token, "a path needs at least two vertices"));
        }
        return Ok(Geometry::Corridor { path, widths });
    }

    if let Some(def) = shape.strip_prefix("polyline:") {
        return match def.find(':') {
            Some(idx) => {
                let distance = number(token, &def[..idx])?;
                let path = decode_polyline(token, &def[idx + 1..])?;
                let widths = vec![distance; path.len().saturating_sub(1)];
                Ok(Geometry::Corridor { path, widths })
            }
            None => Ok(Geometry::LineString(decode_polyline(token, def)?)),
        };
    }

    if shape.contains(':') {
        return Ok(Geometry::Point(lat_lon(token, shape)?));
    }

    if polyline::looks_encoded(shape) {
        return Ok(Geometry::LineString(decode_polyline(token, shape)?));
    }

    Err(HHError::malformed(token, "unknown shape"))
}

fn write_vertices(f: &mut fmt::Formatter<'_>, vertices: &[LatLon]) -> fmt::Result {
    for (i, (lat, lon)) in vertices.iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        write!(f, "{}:{}", lat, lon)?;
    }
    Ok(())
}

impl fmt::Display for AreaTerm {
    /// Canonical text, parsed back to an equal term. Line strings go
    /// through the polyline encoding and keep 1e-5 degree precision.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.operator.symbol())?;
        if let Some(res) = self.resolution {
            write!(f, "@{}:", res)?;
        }
        match &self.geometry {
            Geometry::Point((lat, lon)) => write!(f, "{}:{}", lat, lon),
            Geometry::LineString(path) => write!(f, "polyline:{}", polyline::encode(path)),
            Geometry::Polygon { exterior, .. } => {
                f.write_str("poly:")?;
                write_vertices(f, exterior)
            }
            Geometry::Rectangle(b) => write!(f, "rect:{}:{},{}:{}", b.sw_lat, b.sw_lon, b.ne_lat, b.ne_lon),
            Geometry::Circle { center, radius } => write!(f, "circle:{}:{}:{}", center.0, center.1, radius),
            Geometry::Corridor { path, widths } => {
                f.write_str("path:")?;
                for (i, (lat, lon)) in path.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}:{}", lat, lon)?;
                    let width = widths.get(i);
                    let previous = i.checked_sub(1).and_then(|p| widths.get(p));
                    if let Some(width) = width {
                        if previous != Some(width) {
                            write!(f, ":{}", width)?;
                        }
                    }
                }
                Ok(())
            }
            Geometry::Collection(parts) => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    let term = AreaTerm {
                        operator: self.operator,
                        resolution: self.resolution,
                        geometry: part.clone(),
                    };
                    write!(f, "{}", term)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for AreaSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, term) in self.terms.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", term)?;
        }
        Ok(())
    }
}
