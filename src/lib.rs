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

//! HHCode cell coverage engine.
//!
//! Points are encoded as 64-bit codes interleaving a 32-bit latitude axis
//! and a 32-bit longitude axis. Truncating a code to an even resolution
//! (2..=32) yields a cell; a [`Coverage`] is a multi-resolution set of cells
//! approximating a region, and a [`Shape`] is its immutable, serializable
//! flattened form.

pub mod consts;
pub mod hhcode;

pub use crate::hhcode::cell::Direction;
pub use crate::hhcode::config::CoverageConfig;
pub use crate::hhcode::coverage::{Coverage, Thresholds};
pub use crate::hhcode::error::{HHError, HHResult};
pub use crate::hhcode::geometry::{Geometry, GridPoint};
pub use crate::hhcode::parser::{AreaSpec, AreaTerm, Operator};
pub use crate::hhcode::point::{GeoCode, Point};
pub use crate::hhcode::resolution::Resolution;
pub use crate::hhcode::shape::Shape;
