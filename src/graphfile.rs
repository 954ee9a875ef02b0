//! Plain text files handed to a placer.
//!
//! `hypergraph.txt` has a short header with the vertex counts and then one
//! line per hyperedge, driver id first:
//!
//! ```text
//! Number of vertices: 3
//!   Number of macros + std_cells: 2
//!   Number of IOs: 1
//! hyperedges: driver_id load_id1 load_id2 ...
//! 0 1 2
//! ```
//!
//! `vertex_info.txt` lists every vertex in id order:
//!
//! ```text
//! vertex_id, vertex_name, is_fixed, x, y
//! 0, U0, 1, 0, 0
//! 1, U1, 0, 0, 0
//! 2, PAD0, 1, 45500, 0
//! ```
//!
//! Both files can be read back, so a consumer can reload a run.
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::info;
use scan_fmt::scan_fmt;
use sscanf::sscanf;

use crate::error::NetlistError;
use crate::netlist::{Hyperedge, Netlist, Vertex, VertexTable};

pub const HYPERGRAPH_FILE: &str = "hypergraph.txt";
pub const VERTEX_INFO_FILE: &str = "vertex_info.txt";

const VERTEX_INFO_HEADER: &str = "vertex_id, vertex_name, is_fixed, x, y";
const HYPEREDGE_HEADER: &str = "hyperedges: driver_id load_id1 load_id2 ...";

pub fn emit_hypergraph<W: Write>(
    table: &VertexTable,
    hyperedges: &[Hyperedge],
    out: &mut W,
) -> io::Result<()> {
    writeln!(out, "Number of vertices: {}", table.len())?;
    writeln!(out, "  Number of macros + std_cells: {}", table.num_cells)?;
    writeln!(out, "  Number of IOs: {}", table.num_ios)?;
    writeln!(out, "{}", HYPEREDGE_HEADER)?;
    for edge in hyperedges {
        let ids: Vec<String> = edge.ids().map(|id| id.to_string()).collect();
        writeln!(out, "{}", ids.join(" "))?;
    }
    Ok(())
}

pub fn emit_vertex_info<W: Write>(table: &VertexTable, out: &mut W) -> io::Result<()> {
    writeln!(out, "{}", VERTEX_INFO_HEADER)?;
    for v in &table.vertices {
        writeln!(
            out,
            "{}, {}, {}, {}, {}",
            v.id, v.name, v.is_fixed as u8, v.x, v.y
        )?;
    }
    Ok(())
}

fn write_file(
    path: &Path,
    emit: impl FnOnce(&mut BufWriter<File>) -> io::Result<()>,
) -> Result<(), NetlistError> {
    let f = File::create(path).map_err(|e| NetlistError::io(path, e))?;
    let mut w = BufWriter::new(f);
    emit(&mut w)
        .and_then(|_| w.flush())
        .map_err(|e| NetlistError::io(path, e))?;
    info!("Wrote {}", path.display());
    Ok(())
}

pub fn write_hypergraph(
    table: &VertexTable,
    hyperedges: &[Hyperedge],
    path: &Path,
) -> Result<(), NetlistError> {
    write_file(path, |w| emit_hypergraph(table, hyperedges, w))
}

pub fn write_vertex_info(table: &VertexTable, path: &Path) -> Result<(), NetlistError> {
    write_file(path, |w| emit_vertex_info(table, w))
}

impl Netlist {
    /// Write `hypergraph.txt` and `vertex_info.txt` into `dir`.
    pub fn write_outputs(&self, dir: &Path) -> Result<(PathBuf, PathBuf), NetlistError> {
        let hg_path = dir.join(HYPERGRAPH_FILE);
        let vi_path = dir.join(VERTEX_INFO_FILE);
        write_hypergraph(&self.table, &self.hyperedges, &hg_path)?;
        write_vertex_info(&self.table, &vi_path)?;
        Ok((hg_path, vi_path))
    }
}

/// Contents of a `hypergraph.txt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HypergraphFile {
    pub num_vertices: usize,
    pub num_cells: usize,
    pub num_ios: usize,
    pub hyperedges: Vec<Hyperedge>,
}

fn bad_hypergraph(line: usize, text: &str) -> NetlistError {
    NetlistError::BadHypergraph {
        line,
        text: text.to_string(),
    }
}

pub fn parse_hypergraph(text: &str) -> Result<HypergraphFile, NetlistError> {
    let mut lines = text.lines().enumerate().map(|(i, l)| (i + 1, l.trim()));

    let mut header = |fmt_line: fn(&str) -> Option<usize>| -> Result<usize, NetlistError> {
        let (n, line) = lines.next().ok_or_else(|| bad_hypergraph(0, ""))?;
        fmt_line(line).ok_or_else(|| bad_hypergraph(n, line))
    };
    let num_vertices = header(|l| scan_fmt!(l, "Number of vertices: {d}", usize).ok())?;
    let num_cells = header(|l| scan_fmt!(l, "Number of macros + std_cells: {d}", usize).ok())?;
    let num_ios = header(|l| scan_fmt!(l, "Number of IOs: {d}", usize).ok())?;
    header(|l| if l == HYPEREDGE_HEADER { Some(0) } else { None })?;

    if num_cells + num_ios != num_vertices {
        return Err(bad_hypergraph(
            1,
            &format!("{} vertices but {} + {}", num_vertices, num_cells, num_ios),
        ));
    }

    let mut hyperedges = Vec::new();
    for (n, line) in lines {
        if line.is_empty() {
            continue;
        }
        let ids: Vec<usize> = line
            .split_whitespace()
            .map(|w| w.parse())
            .collect::<Result<_, _>>()
            .map_err(|_| bad_hypergraph(n, line))?;
        let (driver, loads) = match ids.split_first() {
            Some((d, rest)) => (*d, rest.to_vec()),
            None => return Err(bad_hypergraph(n, line)),
        };
        hyperedges.push(Hyperedge { driver, loads });
    }

    Ok(HypergraphFile {
        num_vertices,
        num_cells,
        num_ios,
        hyperedges,
    })
}

pub fn parse_vertex_info(text: &str) -> Result<Vec<Vertex>, NetlistError> {
    let mut lines = text.lines().enumerate().map(|(i, l)| (i + 1, l.trim()));
    match lines.next() {
        Some((_, VERTEX_INFO_HEADER)) => {}
        Some((n, other)) => {
            return Err(NetlistError::BadVertexInfo {
                line: n,
                text: other.to_string(),
            })
        }
        None => return Ok(Vec::new()),
    }

    let mut vertices = Vec::new();
    for (n, line) in lines {
        if line.is_empty() {
            continue;
        }
        let bad = || NetlistError::BadVertexInfo {
            line: n,
            text: line.to_string(),
        };
        let (id, name, fixed, x, y) =
            sscanf!(line, "{usize}, {str}, {u8}, {i64}, {i64}").map_err(|_| bad())?;
        let is_fixed = match fixed {
            0 => false,
            1 => true,
            _ => return Err(bad()),
        };
        vertices.push(Vertex {
            id,
            name: name.to_string(),
            is_fixed,
            x,
            y,
        });
    }
    Ok(vertices)
}

pub fn read_hypergraph(path: &Path) -> Result<HypergraphFile, NetlistError> {
    let text = fs::read_to_string(path).map_err(|e| NetlistError::io(path, e))?;
    parse_hypergraph(&text)
}

pub fn read_vertex_info(path: &Path) -> Result<Vec<Vertex>, NetlistError> {
    let text = fs::read_to_string(path).map_err(|e| NetlistError::io(path, e))?;
    parse_vertex_info(&text)
}

/// Reload the vertex table and hyperedges written by `write_outputs`.
pub fn read_outputs(dir: &Path) -> Result<(VertexTable, Vec<Hyperedge>), NetlistError> {
    let hg = read_hypergraph(&dir.join(HYPERGRAPH_FILE))?;
    let vertices = read_vertex_info(&dir.join(VERTEX_INFO_FILE))?;
    if vertices.len() != hg.num_vertices {
        return Err(bad_hypergraph(
            1,
            &format!(
                "{} vertices declared, {} in {}",
                hg.num_vertices,
                vertices.len(),
                VERTEX_INFO_FILE
            ),
        ));
    }
    let table = VertexTable::from_vertices(vertices, hg.num_cells)?;
    Ok((table, hg.hyperedges))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> VertexTable {
        let vertices = vec![
            Vertex {
                id: 0,
                name: "U0".to_string(),
                is_fixed: true,
                x: 0,
                y: 0,
            },
            Vertex {
                id: 1,
                name: "U1".to_string(),
                is_fixed: false,
                x: 0,
                y: 0,
            },
            Vertex {
                id: 2,
                name: "PAD0".to_string(),
                is_fixed: true,
                x: 45500,
                y: -20,
            },
        ];
        VertexTable::from_vertices(vertices, 2).unwrap()
    }

    #[test]
    fn hypergraph_text_format() {
        let edges = vec![Hyperedge {
            driver: 0,
            loads: vec![1, 2],
        }];
        let mut out = Vec::new();
        emit_hypergraph(&table(), &edges, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Number of vertices: 3\n  Number of macros + std_cells: 2\n  Number of IOs: 1\n\
             hyperedges: driver_id load_id1 load_id2 ...\n0 1 2\n"
        );
    }

    #[test]
    fn vertex_info_text_format() {
        let mut out = Vec::new();
        emit_vertex_info(&table(), &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "vertex_id, vertex_name, is_fixed, x, y\n0, U0, 1, 0, 0\n1, U1, 0, 0, 0\n\
             2, PAD0, 1, 45500, -20\n"
        );
    }

    #[test]
    fn vertex_info_reads_back() {
        let t = table();
        let mut out = Vec::new();
        emit_vertex_info(&t, &mut out).unwrap();
        let vertices = parse_vertex_info(&String::from_utf8(out).unwrap()).unwrap();
        assert_eq!(vertices, t.vertices);
    }

    #[test]
    fn hypergraph_reads_back() {
        let text = "Number of vertices: 4\n  Number of macros + std_cells: 3\n  Number of IOs: 1\n\
                    hyperedges: driver_id load_id1 load_id2 ...\n0 1 2\n3 0\n";
        let hg = parse_hypergraph(text).unwrap();
        assert_eq!((hg.num_vertices, hg.num_cells, hg.num_ios), (4, 3, 1));
        assert_eq!(hg.hyperedges.len(), 2);
        assert_eq!(hg.hyperedges[1].driver, 3);
        assert_eq!(hg.hyperedges[1].loads, vec![0]);
    }

    #[test]
    fn bad_rows_name_their_line() {
        let text = "vertex_id, vertex_name, is_fixed, x, y\n0, U0, 1, 0, 0\n1, U1, 2, 0, 0\n";
        assert!(matches!(
            parse_vertex_info(text),
            Err(NetlistError::BadVertexInfo { line: 3, .. })
        ));
        let text = "Number of vertices: 2\n  Number of macros + std_cells: 2\n  Number of IOs: 0\n\
                    hyperedges: driver_id load_id1 load_id2 ...\n0 x\n";
        assert!(matches!(
            parse_hypergraph(text),
            Err(NetlistError::BadHypergraph { line: 5, .. })
        ));
    }

    #[test]
    fn header_counts_must_add_up() {
        let text = "Number of vertices: 5\n  Number of macros + std_cells: 3\n  Number of IOs: 1\n\
                    hyperedges: driver_id load_id1 load_id2 ...\n";
        assert!(parse_hypergraph(text).is_err());
    }
}
