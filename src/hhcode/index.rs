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

//! Search index terms for points and coverages.
//!
//! A point is indexed under the hex prefixes of its code, and a set of
//! geocells is turned into a regular expression matching the full hex
//! string of every point it contains.

use std::collections::BTreeMap;

use crate::hhcode::geocell::{self, GeoCell};
use crate::hhcode::point::GeoCode;
use crate::hhcode::resolution::Resolution;

/// The leading bytes of `code` holding its first `res / 2` hex digits. An
/// odd digit count leaves the low nibble of the last byte zero.
pub fn bytes_from_point(code: GeoCode, res: Resolution) -> Vec<u8> {
    let len = (res.value() as usize + 3) / 4;
    let mut bytes = code.to_be_bytes()[..len].to_vec();
    if res.digits() % 2 == 1 {
        if let Some(last) = bytes.last_mut() {
            *last &= 0xf0;
        }
    }
    bytes
}

/// The geocells containing `code`, coarsest first.
pub fn indexable(code: GeoCode) -> Vec<GeoCell> {
    geocell::point_geocells(code)
}

/// The full 16 digit hex string of `code` and all its proper prefixes,
/// shortest first.
pub fn indexable_strings(code: GeoCode) -> Vec<String> {
    let hex = format!("{:016x}", code);
    (1..=hex.len()).map(|len| hex[..len].to_string()).collect()
}

#[derive(Default)]
struct Node {
    leaf: bool,
    children: BTreeMap<u8, Node>,
}

impl Node {
    fn insert(&mut self, digits: &[u8]) {
        match digits.split_first() {
            None => self.leaf = true,
            Some((digit, rest)) => self.children.entry(*digit).or_default().insert(rest),
        }
    }

    fn regexp(&self, out: &mut String) {
        let leaves: Vec<u8> = self
            .children
            .iter()
            .filter(|(_, child)| child.leaf)
            .map(|(digit, _)| *digit)
            .collect();
        let branches: Vec<(&u8, &Node)> = self
            .children
            .iter()
            .filter(|(_, child)| !child.leaf && !child.children.is_empty())
            .collect();

        let alternatives = branches.len() + if leaves.is_empty() { 0 } else { 1 };
        if alternatives > 1 {
            out.push('(');
        }
        let mut first = true;
        if !leaves.is_empty() {
            write_class(&leaves, out);
            out.push_str(".*");
            first = false;
        }
        for (digit, child) in branches {
            if !first {
                out.push('|');
            }
            first = false;
            out.push(hex_digit(*digit));
            child.regexp(out);
        }
        if alternatives > 1 {
            out.push(')');
        }
    }
}

fn hex_digit(digit: u8) -> char {
    std::char::from_digit(u32::from(digit), 16).unwrap_or('0')
}

/// A character class, runs of three or more digits written as ranges.
fn write_class(digits: &[u8], out: &mut String) {
    if let [digit] = digits {
        out.push(hex_digit(*digit));
        return;
    }
    out.push('[');
    let mut i = 0;
    while i < digits.len() {
        let mut j = i;
        while j + 1 < digits.len() && digits[j + 1] == digits[j] + 1 {
            j += 1;
        }
        if j - i >= 2 {
            out.push(hex_digit(digits[i]));
            out.push('-');
            out.push(hex_digit(digits[j]));
        } else {
            for digit in &digits[i..=j] {
                out.push(hex_digit(*digit));
            }
        }
        i = j + 1;
    }
    out.push(']');
}

/// A regular expression over 16 digit hex strings matching exactly the
/// points contained in `geocells`.
///
/// Cells are arranged in a prefix tree, coarsest digit first; sibling cells
/// ending at the same level collapse into one character class. The pattern
/// uses only groups, alternation, classes and `.*`, and is meant to be
/// matched against the whole string. An empty input yields an empty pattern.
pub fn to_regexp(geocells: &[GeoCell]) -> String {
    let mut root = Node::default();
    for geocell in geocells {
        if let Ok((code, res)) = geocell::from_geocell(*geocell) {
            let digits: Vec<u8> = (0..res.digits())
                .map(|i| ((code >> (60 - 4 * i)) & 0xf) as u8)
                .collect();
            root.insert(&digits);
        }
    }

    let mut out = String::new();
    if !root.children.is_empty() {
        root.regexp(&mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hhcode::cell::from_hex;
    use crate::hhcode::coverage::Coverage;
    use crate::hhcode::geocell::to_geocell;
    use crate::hhcode::test_util::{random_code, rng};

    fn res(r: i64) -> Resolution {
        Resolution::new(r).unwrap()
    }

    fn geocells(hex: &[&str]) -> Vec<GeoCell> {
        let mut cells: Vec<GeoCell> = hex
            .iter()
            .map(|h| {
                let (code, r) = from_hex(h).unwrap();
                to_geocell(code, r).unwrap()
            })
            .collect();
        cells.sort_unstable();
        cells
    }

    /// Full match of the patterns `to_regexp` builds, where every branch
    /// ends with either `.*` or a group.
    fn matches(pattern: &[u8], s: &[u8]) -> bool {
        match pattern.first() {
            None => s.is_empty(),
            Some(b'.') => pattern.get(1) == Some(&b'*'),
            Some(b'(') => {
                let mut depth = 0;
                let mut start = 1;
                for (i, c) in pattern.iter().enumerate() {
                    match c {
                        b'(' => depth += 1,
                        b')' | b'|' if depth == 1 => {
                            if matches(&pattern[start..i], s) {
                                return true;
                            }
                            start = i + 1;
                            if *c == b')' {
                                return false;
                            }
                        }
                        b')' => depth -= 1,
                        _ => {}
                    }
                }
                false
            }
            Some(b'[') => {
                let end = pattern.iter().position(|c| *c == b']').unwrap();
                let class = &pattern[1..end];
                let c = match s.first() {
                    Some(c) => *c,
                    None => return false,
                };
                let mut hit = false;
                let mut i = 0;
                while i < class.len() {
                    if i + 2 < class.len() && class[i + 1] == b'-' {
                        hit |= class[i] <= c && c <= class[i + 2];
                        i += 3;
                    } else {
                        hit |= class[i] == c;
                        i += 1;
                    }
                }
                hit && matches(&pattern[end + 1..], &s[1..])
            }
            Some(c) => s.first() == Some(c) && matches(&pattern[1..], &s[1..]),
        }
    }

    #[test]
    fn test_bytes_from_point() {
        let code = 0x1234_5678_97ab_cdef;
        assert_eq!(bytes_from_point(code, res(2)), vec![0x10]);
        assert_eq!(bytes_from_point(code, res(4)), vec![0x12]);
        assert_eq!(bytes_from_point(code, res(6)), vec![0x12, 0x30]);
        assert_eq!(bytes_from_point(code, res(16)), code.to_be_bytes()[..4].to_vec());
        assert_eq!(bytes_from_point(code, res(22)), vec![0x12, 0x34, 0x56, 0x78, 0x97, 0xa0]);
        assert_eq!(bytes_from_point(code, res(30)), vec![0x12, 0x34, 0x56, 0x78, 0x97, 0xab, 0xcd, 0xe0]);
        assert_eq!(bytes_from_point(code, Resolution::MAX), code.to_be_bytes().to_vec());
    }

    #[test]
    fn test_indexable() {
        let code = 0xb570_7070_7070_7071;
        let strings = indexable_strings(code);
        assert_eq!(strings.len(), 16);
        assert_eq!(strings[0], "b");
        assert_eq!(strings[3], "b570");
        assert_eq!(strings[15], "b570707070707071");

        let cells = indexable(code);
        assert_eq!(cells.len(), 15);
        assert_eq!(cells[0], 0x1b00_0000_0000_0000);
        assert_eq!(cells[14], 0xfb57_0707_0707_0707);
    }

    #[test]
    fn test_regexp_text() {
        assert_eq!(to_regexp(&[]), "");
        assert_eq!(to_regexp(&geocells(&["a"])), "a.*");
        assert_eq!(to_regexp(&geocells(&["a", "b5", "b7"])), "(a.*|b[57].*)");
        assert_eq!(to_regexp(&geocells(&["10", "11", "12", "13", "15"])), "1[0-35].*");
        assert_eq!(to_regexp(&geocells(&["b57", "b58", "c"])), "(c.*|b5[78].*)");
        // Cells below a leaf add nothing.
        assert_eq!(to_regexp(&geocells(&["a", "a1", "a23"])), "a.*");
    }

    #[test]
    fn test_regexp_matches_contained_points() {
        let hex = ["3", "a1", "a2", "a3", "b57", "b5f", "c0123", "c0124"];
        let cells = geocells(&hex);
        let regexp = to_regexp(&cells);
        let coverage = Coverage::from_geocells(&cells).unwrap();

        let mut rng = rng();
        for _ in 0..2000 {
            let code = random_code(&mut rng);
            let s = format!("{:016x}", code);
            assert_eq!(
                matches(regexp.as_bytes(), s.as_bytes()),
                coverage.includes(code),
                "{} against {}",
                s,
                regexp
            );
        }
        for h in hex.iter() {
            let (code, _) = from_hex(h).unwrap();
            assert!(matches(regexp.as_bytes(), format!("{:016x}", code | 0x7).as_bytes()));
        }
        assert!(!matches(regexp.as_bytes(), b"c012500000000000"));
    }
}
