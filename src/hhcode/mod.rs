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

pub mod cell;
pub mod config;
pub mod coverage;
pub mod distance;
pub mod error;
pub mod geocell;
pub mod geometry;
pub mod index;
pub mod parser;
pub mod point;
pub mod polyline;
pub mod resolution;
pub mod shape;

#[cfg(test)]
mod test_util;
