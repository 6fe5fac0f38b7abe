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

use thiserror::Error;

/// HHError represents errors that can occur in cell and coverage operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HHError {
    /// Resolution is odd or outside 2..=32.
    #[error("Invalid resolution: {0} (expected an even value between 2 and 32)")]
    InvalidResolution(i64),

    /// An area definition could not be parsed.
    #[error("Malformed area spec '{token}': {reason}")]
    MalformedAreaSpec { token: String, reason: String },

    /// A hex cell string is too long or holds non-hex characters.
    #[error("Hex decode error: {0}")]
    HexDecode(String),

    /// A computation grew beyond the caller supplied cell budget.
    #[error("Coverage too large: {cells} cells exceed the limit of {limit}")]
    CoverageTooLarge { cells: usize, limit: usize },

    /// Invalid argument provided to a function
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Error during encoding/decoding of the shape wire format
    #[error("Encoding error: {0}")]
    Encoding(String),
}

impl HHError {
    pub(crate) fn malformed(token: &str, reason: impl Into<String>) -> Self {
        HHError::MalformedAreaSpec {
            token: token.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for cell and coverage operations
pub type HHResult<T> = Result<T, HHError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            HHError::InvalidResolution(3).to_string(),
            "Invalid resolution: 3 (expected an even value between 2 and 32)"
        );
        assert_eq!(
            HHError::malformed("circle:a:1:2", "invalid latitude").to_string(),
            "Malformed area spec 'circle:a:1:2': invalid latitude"
        );
        assert_eq!(
            HHError::CoverageTooLarge { cells: 10, limit: 4 }.to_string(),
            "Coverage too large: 10 cells exceed the limit of 4"
        );
    }
}
