//! # Defgraph_r
//!
//! `defgraph_r` is a library to turn a DEF (Design Exchange Format)
//! placement file into a hypergraph for placement research, and to
//! write a placer's results back into the DEF.
//!
//! Extraction reads the COMPONENTS, PINS and NETS sections.  Every
//! component and IO pin becomes a vertex (components first, then
//! pins), and every net becomes a hyperedge from its driver to its
//! loads.  The result is written as two plain text files,
//! `hypergraph.txt` and `vertex_info.txt`.
//!
//! Back-annotation takes one coordinate pair per movable component
//! and rewrites the `+ UNPLACED` clauses of the DEF (adding one where a
//! component has none), leaving every other byte alone.
//!
//! There is also a *marklist* library, used to collapse the pins of
//! a net onto distinct vertices while keeping their order.
//!
//! The hyperedges can be handed to a partitioner through the
//! `HyperGraph` structure of the external `hypergraph` crate.
pub mod def;
pub mod error;
pub mod graphfile;
pub mod marklist;
pub mod netlist;
pub mod placement;

pub use def::{scan_components, scan_nets, scan_pins};
pub use error::{NetlistError, Warning};
pub use netlist::{
    assign_vertex_ids, DriverPolicy, ExtractOptions, Hyperedge, Netlist, NetlistExtractor, Vertex,
    VertexTable,
};
pub use placement::{place, place_file, PlaceOptions};
