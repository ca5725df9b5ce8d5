//! Adobe/Resolve `.cube` text LUT format support.
//!
//! # Format
//!
//! ```text
//! # Comment
//! TITLE "LUT Name"
//! LUT_3D_SIZE 33
//! DOMAIN_MIN 0.0 0.0 0.0
//! DOMAIN_MAX 1.0 1.0 1.0
//! 0.0 0.0 0.0
//! ...
//! 1.0 1.0 1.0
//! ```
//!
//! Comments start at `#` anywhere in a line. Directives are matched
//! case-insensitively and may appear in any order. Sample rows are in
//! R-fastest order, which defines the [`Lut3d`] indexing.

use crate::{CoreError, CoreResult, Lut3d};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Reads a 3D LUT from a `.cube` file.
pub fn read<P: AsRef<Path>>(path: P) -> CoreResult<Lut3d> {
    let file = File::open(path.as_ref())?;
    parse(BufReader::new(file))
}

/// Parses a 3D LUT from a reader.
///
/// Fails with [`CoreError::MalformedLut`] when no valid `LUT_3D_SIZE`
/// directive is present or fewer than `size^3` sample rows follow.
/// Extra rows beyond `size^3` are tolerated; only the first `size^3`
/// are used.
pub fn parse<R: BufRead>(reader: R) -> CoreResult<Lut3d> {
    let mut size: usize = 0;
    let mut domain_min = [0.0_f32; 3];
    let mut domain_max = [1.0_f32; 3];
    let mut rows: Vec<[f32; 3]> = Vec::new();

    for line in reader.lines() {
        let line = line?;
        // Inline comments consume the rest of the line.
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }

        let upper = line.to_ascii_uppercase();
        if upper.starts_with("LUT_3D_SIZE") {
            size = parse_size(line)?;
        } else if upper.starts_with("DOMAIN_MIN") {
            domain_min = parse_domain(line)?;
        } else if upper.starts_with("DOMAIN_MAX") {
            domain_max = parse_domain(line)?;
        } else if upper.starts_with("TITLE") || upper.starts_with("LUT_1D_SIZE") {
            // Titles are ignored; 1D tables are not supported here.
            continue;
        } else if let Some(rgb) = parse_row(line) {
            rows.push(rgb);
        }
    }

    if size == 0 {
        return Err(CoreError::MalformedLut("missing LUT_3D_SIZE".into()));
    }

    let expected = size * size * size;
    if rows.len() < expected {
        return Err(CoreError::MalformedLut(format!(
            "expected {} sample rows, found {}",
            expected,
            rows.len()
        )));
    }
    rows.truncate(expected);

    Ok(Lut3d::from_data(rows, size)?.with_domain(domain_min, domain_max))
}

fn parse_size(line: &str) -> CoreResult<usize> {
    let value = line
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| CoreError::MalformedLut("LUT_3D_SIZE missing value".into()))?;
    let size: i64 = value
        .parse()
        .map_err(|_| CoreError::MalformedLut(format!("invalid LUT_3D_SIZE value: {value}")))?;
    if size <= 0 {
        return Err(CoreError::MalformedLut(format!(
            "LUT_3D_SIZE must be positive, got {size}"
        )));
    }
    Ok(size as usize)
}

fn parse_domain(line: &str) -> CoreResult<[f32; 3]> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 4 {
        return Err(CoreError::MalformedLut(format!("invalid domain line: {line}")));
    }
    let mut out = [0.0_f32; 3];
    for (slot, token) in out.iter_mut().zip(&parts[1..4]) {
        *slot = token
            .parse()
            .map_err(|_| CoreError::MalformedLut(format!("invalid domain value: {token}")))?;
    }
    Ok(out)
}

/// A data row is any remaining line with at least three numeric tokens.
fn parse_row(line: &str) -> Option<[f32; 3]> {
    let mut values = line.split_whitespace().filter_map(|t| t.parse::<f32>().ok());
    Some([values.next()?, values.next()?, values.next()?])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const TINY: &str = r#"
# Test LUT
TITLE "Test Grade"
lut_3d_size 2
DOMAIN_MIN 0.0 0.0 0.0
DOMAIN_MAX 1.0 1.0 1.0

0.0 0.0 0.0   # black
1.0 0.0 0.0
0.0 1.0 0.0
1.0 1.0 0.0
0.0 0.0 1.0
1.0 0.0 1.0
0.0 1.0 1.0
1.0 1.0 1.0
"#;

    #[test]
    fn parse_tiny_cube() {
        let lut = parse(Cursor::new(TINY)).expect("parse failed");
        assert_eq!(lut.size, 2);
        assert_eq!(lut.get(1, 0, 0), [1.0, 0.0, 0.0]);
        assert_eq!(lut.get(0, 1, 1), [0.0, 1.0, 1.0]);
    }

    #[test]
    fn directive_case_is_insensitive() {
        let lut = parse(Cursor::new(TINY)).unwrap();
        assert_eq!(lut.domain_max, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn missing_size_fails() {
        let text = "0.0 0.0 0.0\n1.0 1.0 1.0\n";
        match parse(Cursor::new(text)) {
            Err(CoreError::MalformedLut(msg)) => assert!(msg.contains("LUT_3D_SIZE")),
            other => panic!("expected MalformedLut, got {other:?}"),
        }
    }

    #[test]
    fn short_data_fails() {
        let text = "LUT_3D_SIZE 2\n0.0 0.0 0.0\n";
        match parse(Cursor::new(text)) {
            Err(CoreError::MalformedLut(msg)) => assert!(msg.contains("sample rows")),
            other => panic!("expected MalformedLut, got {other:?}"),
        }
    }

    #[test]
    fn extra_rows_are_tolerated() {
        let mut text = String::from("LUT_3D_SIZE 2\n");
        for _ in 0..10 {
            text.push_str("0.5 0.5 0.5\n");
        }
        let lut = parse(Cursor::new(text)).unwrap();
        assert_eq!(lut.data.len(), 8);
    }

    #[test]
    fn comment_only_lines_are_skipped() {
        let text = "# header\nLUT_3D_SIZE 2\n".to_string()
            + &"0.1 0.2 0.3 # trailing\n".repeat(8);
        let lut = parse(Cursor::new(text)).unwrap();
        assert_eq!(lut.get(0, 0, 0), [0.1, 0.2, 0.3]);
    }
}
