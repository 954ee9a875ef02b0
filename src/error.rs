//! Errors and warnings raised while extracting or back-annotating a DEF.
//!
//! `NetlistError` values stop a run: nothing is written.  `Warning` values
//! describe input that was skipped; they are logged as they happen and
//! collected so the caller can inspect them afterwards.
use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetlistError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{section} section not found in DEF file")]
    MissingSection { section: &'static str },

    #[error("{section} section opened on line {line} has no END {section}")]
    UnterminatedSection { section: &'static str, line: usize },

    #[error("vertex name {name} used twice (line {first} and line {second})")]
    DuplicateName {
        name: String,
        first: usize,
        second: usize,
    },

    #[error("{found} coordinates supplied for {expected} movable components")]
    CountMismatch { expected: usize, found: usize },

    #[error("line {line}: cannot read coordinate pair from '{text}'")]
    BadCoordinate { line: usize, text: String },

    #[error("line {line}: malformed vertex_info row '{text}'")]
    BadVertexInfo { line: usize, text: String },

    #[error("line {line}: malformed hypergraph line '{text}'")]
    BadHypergraph { line: usize, text: String },

    #[error("could not write PostScript to {path}")]
    Render { path: PathBuf },
}

impl NetlistError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> NetlistError {
        NetlistError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Something in the input that was skipped.  Line numbers are 1-based and
/// point at the start of the DEF statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    MalformedEntry {
        section: &'static str,
        line: usize,
        reason: String,
    },
    UnresolvedEndpoint {
        net: String,
        endpoint: String,
        line: usize,
    },
    DegenerateNet {
        net: String,
        resolved: usize,
        line: usize,
    },
    CountDiffers {
        section: &'static str,
        declared: usize,
        found: usize,
    },
    SkippedNet {
        net: String,
        line: usize,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Warning::MalformedEntry {
                section,
                line,
                reason,
            } => write!(f, "line {}: skipped {} entry: {}", line, section, reason),
            Warning::UnresolvedEndpoint {
                net,
                endpoint,
                line,
            } => write!(
                f,
                "line {}: net {} endpoint {} does not name a component or pin",
                line, net, endpoint
            ),
            Warning::DegenerateNet {
                net,
                resolved,
                line,
            } => write!(
                f,
                "line {}: net {} dropped, only {} distinct vertex resolved",
                line, net, resolved
            ),
            Warning::CountDiffers {
                section,
                declared,
                found,
            } => write!(
                f,
                "{} declares {} entries, {} were read",
                section, declared, found
            ),
            Warning::SkippedNet { net, line } => {
                write!(f, "line {}: net {} skipped by request", line, net)
            }
        }
    }
}

/// Log a warning and keep it for the caller.
pub(crate) fn report(warnings: &mut Vec<Warning>, warning: Warning) {
    log::warn!("{}", warning);
    warnings.push(warning);
}
