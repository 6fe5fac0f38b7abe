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

//! Rasterization and algebra settings shared by the area spec parser, the
//! shape API and the command line front end.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::hhcode::coverage::Thresholds;
use crate::hhcode::error::{HHError, HHResult};
use crate::hhcode::resolution::Resolution;

/// Settings for turning geometries into coverages.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct CoverageConfig {
    /// Rasterization resolution. A positive even value is used as is; 0 or
    /// a negative value picks a resolution from each geometry's extent and
    /// refines it by that many steps.
    /// Default: 0
    pub resolution: i32,

    /// Largest cell diagonal, as a fraction of each geometry's bounding box
    /// diagonal. When set, it picks the resolution of geometries that would
    /// otherwise use the plain automatic one (`resolution` 0, no `@` prefix).
    /// Default: None
    pub pct_error: Option<f64>,

    /// Growth cap for subtraction and intersection. `None` disables it.
    /// Default: 1,000,000 cells
    pub max_cells: Option<usize>,

    /// Packed merge thresholds applied to final coverages (one nibble per
    /// resolution, 0 merges complete sibling sets only).
    /// Default: 0
    pub thresholds: u64,

    /// Budget final coverages are reduced to. `None` keeps them as is.
    /// Default: None
    pub limit_cells: Option<usize>,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            resolution: 0,
            pct_error: None,
            max_cells: Some(1_000_000),
            thresholds: 0,
            limit_cells: None,
        }
    }
}

impl CoverageConfig {
    pub fn with_resolution(mut self, resolution: i32) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_pct_error(mut self, pct_error: f64) -> Self {
        self.pct_error = Some(pct_error);
        self
    }

    pub fn with_max_cells(mut self, max_cells: Option<usize>) -> Self {
        self.max_cells = max_cells;
        self
    }

    pub fn with_thresholds(mut self, thresholds: u64) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_limit_cells(mut self, limit_cells: Option<usize>) -> Self {
        self.limit_cells = limit_cells;
        self
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds::from_packed(self.thresholds)
    }

    /// Checks the settings before any rasterization happens.
    pub fn validate(&self) -> HHResult<()> {
        if self.resolution > 0 {
            Resolution::new(self.resolution)?;
        }
        if let Some(pct_error) = self.pct_error {
            if !(pct_error > 0.0 && pct_error <= 1.0) {
                return Err(HHError::InvalidArgument(format!(
                    "pct_error must lie in (0, 1], got {}",
                    pct_error
                )));
            }
        }
        if self.limit_cells == Some(0) {
            return Err(HHError::InvalidArgument("limit_cells must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = CoverageConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.thresholds(), Thresholds::LOSSLESS);
    }

    #[test]
    fn test_validate() {
        let config = CoverageConfig::default().with_resolution(7);
        assert_eq!(config.validate(), Err(HHError::InvalidResolution(7)));
        assert!(CoverageConfig::default().with_resolution(-4).validate().is_ok());
        assert!(CoverageConfig::default().with_pct_error(0.0).validate().is_err());
        assert!(CoverageConfig::default().with_pct_error(f64::NAN).validate().is_err());
        assert!(CoverageConfig::default().with_pct_error(1.0).validate().is_ok());
        assert_eq!(CoverageConfig::default().with_pct_error(0.1).pct_error, Some(0.1));
        assert!(CoverageConfig::default().with_limit_cells(Some(0)).validate().is_err());
        assert_eq!(
            CoverageConfig::default().with_thresholds(0x1111).thresholds().at(Resolution::MAX),
            1
        );
    }

    #[cfg(feature = "cli")]
    #[test]
    fn test_partial_toml_uses_defaults() {
        // The binary reads this section from its TOML file.
        let config: CoverageConfig = toml::from_str("resolution = -2\nlimit_cells = 64\n").unwrap();
        assert_eq!(config.resolution, -2);
        assert_eq!(config.pct_error, None);

        let config: CoverageConfig = toml::from_str("pct_error = 0.1\n").unwrap();
        assert_eq!(config.pct_error, Some(0.1));
        assert_eq!(config.limit_cells, Some(64));
        assert_eq!(config.max_cells, Some(1_000_000));
    }
}
