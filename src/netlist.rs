//! Vertex table and hyperedges extracted from a DEF.
//!
//! Every component and every top-level IO pin becomes a vertex.  Vertex
//! ids are assigned components first, in COMPONENTS order, then pins in
//! PINS order; the placement writer depends on this order to match the
//! Nth movable vertex with the Nth coordinate of a placer's output.
//!
//! Each net becomes one hyperedge: a driver vertex and the load vertices.
//! Pins of a component collapse onto the component's vertex.
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;

use libc::{c_int, c_uint, c_ulong};
use log::{debug, info};
use pstools::PSTool;

use hypergraph::HyperGraph;

use crate::def::{ComponentRecord, DefSections, Endpoint, NetRecord, PinDirection, PinRecord};
use crate::error::{report, NetlistError, Warning};
use crate::marklist::MarkList;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vertex {
    pub id: usize,
    pub name: String,
    pub is_fixed: bool,
    pub x: i64,
    pub y: i64,
}

/// All vertices of a design, with a name lookup.  Ids `0..num_cells` are
/// components, `num_cells..len()` are IO pins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VertexTable {
    pub vertices: Vec<Vertex>,
    pub name_map: HashMap<String, usize>,
    pub num_cells: usize,
    pub num_ios: usize,
}

impl VertexTable {
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn vertex_index(&self, name: &str) -> Option<usize> {
        self.name_map.get(name).copied()
    }

    pub fn is_io(&self, id: usize) -> bool {
        id >= self.num_cells && id < self.vertices.len()
    }

    /// Vertices a placer is free to move, in id order.
    pub fn movable(&self) -> impl Iterator<Item = &Vertex> {
        self.vertices.iter().filter(|v| !v.is_fixed)
    }

    /// Rebuild a table from vertices read back from `vertex_info.txt`.
    /// The first `num_cells` vertices are taken to be components.  Line
    /// numbers in errors refer to `vertex_info.txt`.
    pub fn from_vertices(
        vertices: Vec<Vertex>,
        num_cells: usize,
    ) -> Result<VertexTable, NetlistError> {
        let mut name_map = HashMap::with_capacity(vertices.len());
        for (i, v) in vertices.iter().enumerate() {
            if v.id != i {
                return Err(NetlistError::BadVertexInfo {
                    line: i + 2,
                    text: format!("vertex id {} where {} was expected", v.id, i),
                });
            }
            if let Some(first) = name_map.insert(v.name.clone(), v.id) {
                return Err(NetlistError::DuplicateName {
                    name: v.name.clone(),
                    first: first + 2,
                    second: i + 2,
                });
            }
        }
        let num_cells = num_cells.min(vertices.len());
        let num_ios = vertices.len() - num_cells;
        Ok(VertexTable {
            vertices,
            name_map,
            num_cells,
            num_ios,
        })
    }
}

/// Concatenate components then pins and number them.  Names must be unique
/// across both; a collision is fatal.
pub fn assign_vertex_ids(
    components: &[ComponentRecord],
    pins: &[PinRecord],
) -> Result<VertexTable, NetlistError> {
    let total = components.len() + pins.len();
    let mut table = VertexTable {
        vertices: Vec::with_capacity(total),
        name_map: HashMap::with_capacity(total),
        num_cells: components.len(),
        num_ios: pins.len(),
    };
    let mut lines: Vec<usize> = Vec::with_capacity(total);

    let entries = components
        .iter()
        .map(|c| (&c.name, c.is_fixed(), c.x, c.y, c.line))
        .chain(pins.iter().map(|p| (&p.name, true, p.x, p.y, p.line)));

    for (name, is_fixed, x, y, line) in entries {
        let id = table.vertices.len();
        if let Some(first) = table.name_map.insert(name.clone(), id) {
            return Err(NetlistError::DuplicateName {
                name: name.clone(),
                first: lines[first],
                second: line,
            });
        }
        lines.push(line);
        table.vertices.push(Vertex {
            id,
            name: name.clone(),
            is_fixed,
            x,
            y,
        });
    }

    Ok(table)
}

/// One net: the driving vertex and the vertices it drives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hyperedge {
    pub driver: usize,
    pub loads: Vec<usize>,
}

impl Hyperedge {
    /// Driver first, then loads.
    pub fn ids(&self) -> impl Iterator<Item = usize> + '_ {
        std::iter::once(self.driver).chain(self.loads.iter().copied())
    }
}

/// How the driver of a net is chosen.  DEF connections carry no direction,
/// so by default the first listed endpoint drives the net.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriverPolicy {
    #[default]
    FirstListed,
    /// A top-level pin declared `+ DIRECTION INPUT` drives any net it is
    /// on; otherwise fall back to the first listed endpoint.
    InputPins,
}

#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Nets left out of the hypergraph by name (clock nets, typically).
    pub skip_nets: Vec<String>,
    pub driver_policy: DriverPolicy,
}

/// The result of one extraction run.
#[derive(Debug, Clone)]
pub struct Netlist {
    pub table: VertexTable,
    pub hyperedges: Vec<Hyperedge>,
    pub warnings: Vec<Warning>,
}

/// Reads a DEF into a `Netlist`.  Holds only its options, so one extractor
/// can be used for any number of files.
#[derive(Debug, Clone, Default)]
pub struct NetlistExtractor {
    pub options: ExtractOptions,
}

impl NetlistExtractor {
    pub fn new(options: ExtractOptions) -> NetlistExtractor {
        NetlistExtractor { options }
    }

    pub fn extract_file(&self, def_path: &Path) -> Result<Netlist, NetlistError> {
        info!("Opening {}", def_path.display());
        let text = fs::read_to_string(def_path).map_err(|e| NetlistError::io(def_path, e))?;
        self.extract(&text)
    }

    pub fn extract(&self, def_text: &str) -> Result<Netlist, NetlistError> {
        let sections = DefSections::scan(def_text);
        let mut warnings = Vec::new();

        let components = sections.components(&mut warnings)?;
        let pins = sections.pins(&mut warnings)?;
        let nets = sections.nets(&mut warnings)?;

        let table = assign_vertex_ids(&components, &pins)?;
        let hyperedges = self.build_hyperedges(&nets, &table, &pins, &mut warnings);

        info!(
            "Parsed DEF: {} components, {} ios, {} nets, {} hyperedges",
            table.num_cells,
            table.num_ios,
            nets.len(),
            hyperedges.len()
        );

        Ok(Netlist {
            table,
            hyperedges,
            warnings,
        })
    }

    /// Resolve every net against the vertex table.  Unknown endpoints are
    /// dropped, and nets left with fewer than two distinct vertices are
    /// dropped entirely.  Loads keep their listed order, without repeats.
    pub fn build_hyperedges(
        &self,
        nets: &[NetRecord],
        table: &VertexTable,
        pins: &[PinRecord],
        warnings: &mut Vec<Warning>,
    ) -> Vec<Hyperedge> {
        let skip: HashSet<&str> = self.options.skip_nets.iter().map(|s| s.as_str()).collect();
        let input_pins: HashSet<usize> = match self.options.driver_policy {
            DriverPolicy::FirstListed => HashSet::new(),
            DriverPolicy::InputPins => pins
                .iter()
                .filter(|p| p.direction == Some(PinDirection::Input))
                .filter_map(|p| table.vertex_index(&p.name))
                .collect(),
        };

        let mut marks = MarkList::new(table.len());
        let mut hyperedges = Vec::with_capacity(nets.len());

        for net in nets {
            if skip.contains(net.name.as_str()) {
                report(
                    warnings,
                    Warning::SkippedNet {
                        net: net.name.clone(),
                        line: net.line,
                    },
                );
                continue;
            }

            marks.clear();
            for endpoint in &net.endpoints {
                match resolve(endpoint, table) {
                    Some(id) => {
                        marks.mark(id);
                    }
                    None => report(
                        warnings,
                        Warning::UnresolvedEndpoint {
                            net: net.name.clone(),
                            endpoint: endpoint.to_string(),
                            line: net.line,
                        },
                    ),
                }
            }

            if marks.list.len() < 2 {
                report(
                    warnings,
                    Warning::DegenerateNet {
                        net: net.name.clone(),
                        resolved: marks.list.len(),
                        line: net.line,
                    },
                );
                continue;
            }

            let driver = marks
                .list
                .iter()
                .copied()
                .find(|id| input_pins.contains(id))
                .unwrap_or(marks.list[0]);
            let loads: Vec<usize> = marks
                .list
                .iter()
                .copied()
                .filter(|id| *id != driver)
                .collect();
            debug!("net {} driver {} loads {:?}", net.name, driver, loads);
            hyperedges.push(Hyperedge { driver, loads });
        }

        hyperedges
    }
}

fn resolve(endpoint: &Endpoint, table: &VertexTable) -> Option<usize> {
    match endpoint {
        Endpoint::IoPin(name) => table.vertex_index(name).filter(|id| table.is_io(*id)),
        Endpoint::Instance { instance, .. } => table
            .vertex_index(instance)
            .filter(|id| !table.is_io(*id)),
        Endpoint::Wildcard(_) => None,
    }
}

impl fmt::Display for Netlist {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} vertices ({} cells, {} ios), {} hyperedges, {} warnings",
            self.table.len(),
            self.table.num_cells,
            self.table.num_ios,
            self.hyperedges.len(),
            self.warnings.len()
        )
    }
}

impl Netlist {
    pub fn summarize(&self) {
        let fixed_cells = self.table.vertices[..self.table.num_cells]
            .iter()
            .filter(|v| v.is_fixed)
            .count();
        let pins: usize = self.hyperedges.iter().map(|e| e.loads.len() + 1).sum();
        info!("---- NETLIST SUMMARY ----");
        info!(
            "{} vertices: {} cells ({} fixed, {} movable), {} IOs",
            self.table.len(),
            self.table.num_cells,
            fixed_cells,
            self.table.num_cells - fixed_cells,
            self.table.num_ios
        );
        info!("{} hyperedges, {} pins", self.hyperedges.len(), pins);
        info!("{} warnings", self.warnings.len());
    }

    /// The hyperedges in the compressed form used by the partitioners:
    /// `eptr[eind[e]..eind[e+1]]` are the vertices of edge `e`.  Vertex and
    /// edge weights are all one and no vertex is pre-assigned a partition.
    pub fn partition_graph(&self) -> HyperGraph {
        let mut hg = HyperGraph::new();
        hg.vtxwt.clear();
        hg.hewt.clear();
        hg.part.clear();
        hg.eind.clear();
        hg.eptr.clear();

        for _ in &self.table.vertices {
            hg.vtxwt.push(1 as c_int);
            hg.part.push(-1);
        }

        hg.eind.push(0 as c_ulong);
        for edge in &self.hyperedges {
            for id in edge.ids() {
                hg.eptr.push(id as c_uint);
            }
            hg.hewt.push(1 as c_int);
            hg.eind.push(hg.eptr.len() as c_ulong);
        }
        hg
    }

    /// PostScript view of the vertices with a known location: IO pins in
    /// red, fixed cells in blue.
    pub fn postscript(&self, path: &Path) -> Result<(), NetlistError> {
        let fixed: Vec<&Vertex> = self.table.vertices.iter().filter(|v| v.is_fixed).collect();
        let extent = fixed
            .iter()
            .map(|v| v.x.max(v.y))
            .max()
            .unwrap_or(0)
            .max(100) as f32;
        let half = extent / 400.0;

        let mut pst = PSTool::new();
        for v in fixed {
            if self.table.is_io(v.id) {
                pst.set_color(1.0, 0.3, 0.3, 1.0);
            } else {
                pst.set_color(0.1, 0.1, 0.8, 1.0);
            }
            let (x, y) = (v.x as f32, v.y as f32);
            pst.add_box(x - half, y - half, x + half, y + half);
        }
        pst.set_border(40.0);
        pst.generate(path.to_string_lossy().to_string())
            .map_err(|_| NetlistError::Render {
                path: path.to_path_buf(),
            })?;
        Ok(())
    }
}
