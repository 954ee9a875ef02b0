//! Back-annotation of placer output into a DEF file.
//!
//! The placer produces one coordinate pair per movable component, in the
//! order the components appear in COMPONENTS (the same order as the
//! movable vertices of `vertex_info.txt`).  Each `+ UNPLACED` clause is
//! replaced with `+ PLACED ( x y ) N` using the next pair, and a component
//! with no placement clause at all gets one appended.  Every other byte of
//! the DEF is copied unchanged.
use std::fs;
use std::io::Write;
use std::path::Path;

use log::{debug, info};
use scan_fmt::scan_fmt;
use tempfile::NamedTempFile;

use crate::def::{find_placement, parse_component, DefSections, PlacementStatus, Section};
use crate::error::NetlistError;

#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceOptions {
    /// Also rewrite components that are already `PLACED`, so that a DEF
    /// written by an earlier pass can be annotated again.
    pub replace_placed: bool,
}

/// Truncate a placer value to a DEF coordinate.  NaN, infinities and
/// values outside the `i64` range give `None`.
fn to_coordinate(v: f64) -> Option<i64> {
    if (i64::MIN as f64..i64::MAX as f64).contains(&v) {
        Some(v as i64)
    } else {
        None
    }
}

/// Read coordinate pairs, one per line.  `x,y`, `x y` and `(x, y)` are all
/// accepted; blank lines and `#` comments are skipped.  Real values are
/// truncated toward zero.
pub fn read_coordinates(text: &str) -> Result<Vec<(i64, i64)>, NetlistError> {
    let mut coords = Vec::new();
    for (i, raw) in text.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let cleaned: String = line
            .chars()
            .map(|c| if matches!(c, '(' | ')' | ',') { ' ' } else { c })
            .collect();
        let bad = || NetlistError::BadCoordinate {
            line: i + 1,
            text: raw.to_string(),
        };
        let (x, y) = scan_fmt!(cleaned.trim(), "{} {}", f64, f64).map_err(|_| bad())?;
        match (to_coordinate(x), to_coordinate(y)) {
            (Some(x), Some(y)) => coords.push((x, y)),
            _ => return Err(bad()),
        }
    }
    Ok(coords)
}

pub fn read_coordinate_file(path: &Path) -> Result<Vec<(i64, i64)>, NetlistError> {
    let text = fs::read_to_string(path).map_err(|e| NetlistError::io(path, e))?;
    read_coordinates(&text)
}

/// Where one coordinate pair goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    /// Byte range of an existing clause keyword through its orientation.
    Replace(usize, usize),
    /// Offset just past the last word of a component with no clause.
    Append(usize),
}

/// The placement targets of the COMPONENTS section, in file order.  These
/// are exactly the components extraction reports as movable, plus the
/// `PLACED` ones when `replace_placed` is set.
fn targets(def_text: &str, options: &PlaceOptions) -> Result<Vec<Target>, NetlistError> {
    let sections = DefSections::scan(def_text);
    let body = sections.require(Section::Components)?;
    let mut spans = Vec::new();
    for stmt in &body.statements {
        if let Err(reason) = parse_component(stmt) {
            debug!("line {}: not rewritten: {}", stmt.line, reason);
            continue;
        }
        let clause = match find_placement(&stmt.tokens) {
            Ok(Some(c)) => c,
            Ok(None) => {
                if let Some(last) = stmt.tokens.last() {
                    spans.push(Target::Append(last.end()));
                }
                continue;
            }
            Err(reason) => {
                debug!("line {}: not rewritten: {}", stmt.line, reason);
                continue;
            }
        };
        let wanted = match clause.status {
            PlacementStatus::Unplaced => true,
            PlacementStatus::Placed => options.replace_placed,
            PlacementStatus::Fixed | PlacementStatus::Cover => false,
        };
        if wanted {
            let start = stmt.tokens[clause.keyword].offset;
            let end = stmt.tokens[clause.end - 1].end();
            spans.push(Target::Replace(start, end));
        }
    }
    Ok(spans)
}

/// Number of components `place` would rewrite.
pub fn movable_count(def_text: &str, options: &PlaceOptions) -> Result<usize, NetlistError> {
    Ok(targets(def_text, options)?.len())
}

/// Rewrite the placement clauses of `def_text` with `coords`.  The number of
/// pairs must match the number of targets exactly.
pub fn place(
    def_text: &str,
    coords: &[(i64, i64)],
    options: &PlaceOptions,
) -> Result<String, NetlistError> {
    let spans = targets(def_text, options)?;
    if spans.len() != coords.len() {
        return Err(NetlistError::CountMismatch {
            expected: spans.len(),
            found: coords.len(),
        });
    }

    let mut out = String::with_capacity(def_text.len() + spans.len() * 24);
    let mut last = 0;
    for (target, (x, y)) in spans.iter().zip(coords) {
        match *target {
            Target::Replace(start, end) => {
                out.push_str(&def_text[last..start]);
                out.push_str(&format!("PLACED ( {} {} ) N", x, y));
                last = end;
            }
            Target::Append(at) => {
                out.push_str(&def_text[last..at]);
                out.push_str(&format!(" + PLACED ( {} {} ) N", x, y));
                last = at;
            }
        }
    }
    out.push_str(&def_text[last..]);
    Ok(out)
}

/// Write `text` next to `path` and rename it into place, so `path` holds
/// either its old contents or all of the new ones.
fn replace_file(path: &Path, text: &str) -> Result<(), NetlistError> {
    let dir = match path.parent() {
        Some(d) if !d.as_os_str().is_empty() => d,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| NetlistError::io(path, e))?;
    tmp.write_all(text.as_bytes())
        .and_then(|_| tmp.flush())
        .map_err(|e| NetlistError::io(path, e))?;
    tmp.persist(path)
        .map_err(|e| NetlistError::io(path, e.error))?;
    Ok(())
}

/// Read a DEF and a coordinate file, and write the annotated DEF.  The
/// output may be the input file itself; it is only written once the counts
/// have been checked.  Returns the number of components placed.
pub fn place_file(
    def_path: &Path,
    coord_path: &Path,
    out_path: &Path,
    options: &PlaceOptions,
) -> Result<usize, NetlistError> {
    let def_text = fs::read_to_string(def_path).map_err(|e| NetlistError::io(def_path, e))?;
    let coords = read_coordinate_file(coord_path)?;
    let placed = place(&def_text, &coords, options)?;
    replace_file(out_path, &placed)?;
    info!(
        "Placed {} components from {} into {}",
        coords.len(),
        coord_path.display(),
        out_path.display()
    );
    Ok(coords.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEF: &str = "\
COMPONENTS 4 ;
- U0 INV_X1 + FIXED ( 0 0 ) N ;
- U1 INV_X1 + UNPLACED ;
- U2 NAND2_X1
    + UNPLACED ;
- U3 BUF_X1 + PLACED ( 10 20 ) FS ;
END COMPONENTS
PINS 0 ;
END PINS
";

    #[test]
    fn coordinate_line_forms() {
        let coords = read_coordinates("1,2\n# comment\n\n3.9 -4.9\n( 5, 6 )\n").unwrap();
        assert_eq!(coords, vec![(1, 2), (3, -4), (5, 6)]);
    }

    #[test]
    fn bad_coordinate_line() {
        assert!(matches!(
            read_coordinates("1,2\nx,y\n"),
            Err(NetlistError::BadCoordinate { line: 2, .. })
        ));
    }

    #[test]
    fn out_of_range_coordinates() {
        for text in ["1e30,0\n", "0,-1e19\n", "nan,1\n", "inf,1\n"] {
            assert!(
                matches!(
                    read_coordinates(text),
                    Err(NetlistError::BadCoordinate { line: 1, .. })
                ),
                "{}",
                text
            );
        }
        assert_eq!(
            read_coordinates("-4.5e15,4.5e15\n").unwrap(),
            vec![(-4_500_000_000_000_000, 4_500_000_000_000_000)]
        );
    }

    #[test]
    fn clause_appended_where_missing() {
        let text = "COMPONENTS 2 ;\n- U0 INV ;\n- U1 INV + UNPLACED ;\nEND COMPONENTS\n";
        let opts = PlaceOptions::default();
        assert_eq!(movable_count(text, &opts).unwrap(), 2);
        let out = place(text, &[(1, 2), (3, 4)], &opts).unwrap();
        assert_eq!(
            out,
            "COMPONENTS 2 ;\n- U0 INV + PLACED ( 1 2 ) N ;\n\
             - U1 INV + PLACED ( 3 4 ) N ;\nEND COMPONENTS\n"
        );
    }

    #[test]
    fn unplaced_only_by_default() {
        let out = place(DEF, &[(100, 200), (300, 400)], &PlaceOptions::default()).unwrap();
        assert!(out.contains("- U1 INV_X1 + PLACED ( 100 200 ) N ;\n"));
        assert!(out.contains("- U2 NAND2_X1\n    + PLACED ( 300 400 ) N ;\n"));
        assert!(out.contains("- U3 BUF_X1 + PLACED ( 10 20 ) FS ;\n"));
        assert!(out.contains("- U0 INV_X1 + FIXED ( 0 0 ) N ;\n"));
    }

    #[test]
    fn count_mismatch_both_ways() {
        let opts = PlaceOptions::default();
        assert!(matches!(
            place(DEF, &[(1, 1)], &opts),
            Err(NetlistError::CountMismatch {
                expected: 2,
                found: 1
            })
        ));
        assert!(matches!(
            place(DEF, &[(1, 1), (2, 2), (3, 3)], &opts),
            Err(NetlistError::CountMismatch {
                expected: 2,
                found: 3
            })
        ));
    }

    #[test]
    fn replace_placed_is_idempotent() {
        let opts = PlaceOptions {
            replace_placed: true,
        };
        assert_eq!(movable_count(DEF, &opts).unwrap(), 3);
        let coords = [(1, 2), (3, 4), (5, 6)];
        let once = place(DEF, &coords, &opts).unwrap();
        let twice = place(&once, &coords, &opts).unwrap();
        assert_eq!(once, twice);
        assert!(once.contains("- U3 BUF_X1 + PLACED ( 5 6 ) N ;\n"));
    }

    #[test]
    fn unplaced_outside_components_untouched() {
        let text = format!("{}NETS 0 ;\n# UNPLACED\nEND NETS\n", DEF);
        let out = place(&text, &[(7, 8), (9, 10)], &PlaceOptions::default()).unwrap();
        assert!(out.ends_with("NETS 0 ;\n# UNPLACED\nEND NETS\n"));
    }
}
