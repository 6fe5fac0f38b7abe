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

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::hhcode::point::GeoCode;

/// Seeded generator so randomized tests replay the same cases.
pub fn rng() -> StdRng {
    StdRng::seed_from_u64(0x4848_434f_4445)
}

/// A latitude in [-90, 90) and a longitude in [-180, 180).
pub fn random_lat_lon(rng: &mut StdRng) -> (f64, f64) {
    (rng.gen_range(-90.0..90.0), rng.gen_range(-180.0..180.0))
}

pub fn random_code(rng: &mut StdRng) -> GeoCode {
    rng.gen::<u64>()
}

#[macro_export]
macro_rules! assert_eq_with_callout {
    ($x:expr, $y:expr) => {
        assert_eq_with_callout!($x, $y, "assertion failed: ");
    };

    ($x:expr, $y:expr, $msg:expr) => {
        let x_val = $x;
        let y_val = $y;
        if x_val != y_val {
            panic!(
                concat!("{}\n", "Left:  {:?}\n", "Right: {:?}\n", "NOT EQUAL!"),
                $msg, x_val, y_val,
            );
        }
    };
}
