//! Theseus - Gap-affine wavefront alignment of sequences to graphs
//!
//! This library aligns a query string against a directed sequence graph
//! whose vertices carry string labels and whose edges carry exact-match
//! overlaps, using a gap-affine wavefront algorithm that traverses vertex
//! boundaries (including cycles). A specialization drives progressive
//! multiple-sequence alignment over a partial-order graph rebuilt from each
//! alignment.
//!
//! # Example
//! ```
//! use std::io::Cursor;
//! use theseus::{Penalties, TheseusAligner};
//!
//! let penalties = Penalties::affine(0, 2, 3, 1).unwrap();
//! let gfa = "S\tref\tACCCGTAAAAGGG\n";
//! let mut aligner = TheseusAligner::from_gfa(penalties, Cursor::new(gfa)).unwrap();
//!
//! let alignment = aligner.align("ACCCGTAAAAGGG", 0, 0).unwrap();
//! assert_eq!(alignment.score, 0);
//! assert_eq!(alignment.cigar_string(), "13M");
//! ```

pub mod aligner;
pub mod beyond_scope;
pub mod graph;
pub mod msa;
pub mod penalties;
pub mod poa;
pub mod scope;
pub mod scratchpad;
pub mod types;
pub mod vertices_data;

// Re-export main types and functions
pub use aligner::TheseusAligner;
pub use graph::{Edge, Graph, Vertex};
pub use msa::TheseusMsa;
pub use penalties::{GapModel, Penalties};
pub use poa::PoaGraph;
pub use types::{Alignment, CigarOp, TheseusError, VertexId};
