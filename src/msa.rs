//! Progressive multiple-sequence alignment
//!
//! The MSA aligner keeps a POA graph and its compact view; each added
//! sequence is aligned end-to-end into the compact graph (source to sink)
//! and the backtrace is folded back into both graphs before the next one.

use std::io::{self, Write};

use crate::aligner::{AlignMode, AlignerCore};
use crate::graph::Graph;
use crate::penalties::Penalties;
use crate::poa::PoaGraph;
use crate::types::{Alignment, TheseusError};

/// Compact-graph ids of the fixed source and sink vertices
const SOURCE_VERTEX: i32 = 0;
const SINK_VERTEX: i32 = 2;

/// Multiple-sequence aligner over a partial-order graph
pub struct TheseusMsa {
    core: AlignerCore,
    poa: PoaGraph,
    num_sequences: i32,
}

impl TheseusMsa {
    /// Start an MSA from its first sequence
    pub fn new(penalties: Penalties, initial_seq: &str) -> Result<Self, TheseusError> {
        let (poa, compact) = PoaGraph::initial(initial_seq);
        let core = AlignerCore::new(
            penalties,
            compact,
            AlignMode::Msa {
                end_vertex: SINK_VERTEX,
            },
        )?;
        Ok(Self {
            core,
            poa,
            num_sequences: 1,
        })
    }

    /// Align a sequence against the current graph without updating it.
    /// Repeating the same query yields the same alignment.
    pub fn align(&mut self, seq: &str) -> Result<Alignment, TheseusError> {
        self.core.align(seq, SOURCE_VERTEX, 0)
    }

    /// Align a sequence and fold it into the POA graph and its compact view
    pub fn add_sequence(&mut self, seq: &str) -> Result<Alignment, TheseusError> {
        let alignment = self.core.align(seq, SOURCE_VERTEX, 0)?;
        let seq_id = self.num_sequences;
        self.poa
            .add_alignment(self.core.graph_mut(), &alignment, seq, seq_id);
        self.num_sequences += 1;
        Ok(alignment)
    }

    /// Number of sequences folded into the graph so far
    pub fn num_sequences(&self) -> i32 {
        self.num_sequences
    }

    /// The compact sequence graph the aligner runs on
    pub fn graph(&self) -> &Graph {
        self.core.graph()
    }

    pub fn poa_graph(&self) -> &PoaGraph {
        &self.poa
    }

    /// Consensus sequence of the POA graph
    pub fn consensus(&self) -> String {
        self.poa.consensus()
    }

    /// Write the MSA in FASTA format, one padded row per sequence
    pub fn write_msa<W: Write>(&self, out: &mut W) -> io::Result<()> {
        self.poa.write_msa(self.num_sequences, out)
    }

    /// Write the compact graph as GFA
    pub fn write_gfa<W: Write>(&self, out: &mut W) -> io::Result<()> {
        self.core.graph().write_gfa(out)
    }

    /// Write the compact graph in Graphviz dot format
    pub fn write_dot<W: Write>(&self, out: &mut W) -> io::Result<()> {
        self.core.graph().write_dot(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msa(initial: &str) -> TheseusMsa {
        let penalties = Penalties::affine(0, 2, 3, 1).unwrap();
        TheseusMsa::new(penalties, initial).unwrap()
    }

    #[test]
    fn test_initial_compact_graph() {
        let msa = msa("ACCCGTAAAAGGG");
        assert_eq!(msa.graph().num_vertices(), 3);
        assert_eq!(msa.graph().vertex(1).label, "ACCCGTAAAAGGG");
        assert_eq!(msa.num_sequences(), 1);
    }

    #[test]
    fn test_align_does_not_mutate() {
        let mut msa = msa("ACCCGTAAAAGGG");
        let before = msa.graph().num_vertices();
        let alignment = msa.align("ACCCGTCAAAGGG").unwrap();
        assert_eq!(alignment.score, 2);
        assert_eq!(msa.graph().num_vertices(), before);
        assert_eq!(msa.num_sequences(), 1);
    }

    #[test]
    fn test_consensus_follows_majority() {
        let mut msa = msa("ACG");
        msa.add_sequence("ATG").unwrap();
        msa.add_sequence("ATG").unwrap();
        assert_eq!(msa.consensus(), "ATG");
    }
}
