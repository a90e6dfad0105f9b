//! Partial-order alignment graph
//!
//! In MSA mode every aligned base is a POA vertex carrying an "aligned-to"
//! equivalence class, and a compact view merges maximal unbranched runs of
//! POA vertices into the sequence graph the aligner runs on. Applying an
//! alignment updates both: edge weights grow along matches, mismatches reuse
//! or extend the aligned-to classes (splitting compact runs as needed), and
//! unaligned query bases open fresh runs.

use std::io::{self, Write};

use crate::graph::{Edge, Graph, Vertex};
use crate::types::{Alignment, CigarOp, VertexId};

/// One aligned base
#[derive(Debug, Clone)]
pub struct PoaVertex {
    pub value: u8,
    /// Aligned-to equivalence class (other POA vertices of the same column)
    pub aligned: Vec<i32>,
    pub in_edges: Vec<i32>,
    pub out_edges: Vec<i32>,
    /// Compact-graph vertex whose run contains this base
    pub compact_vertex: i32,
}

/// Weighted edge between consecutive aligned bases
#[derive(Debug, Clone)]
pub struct PoaEdge {
    pub source: i32,
    pub dest: i32,
    pub weight: i32,
    pub sequence_ids: Vec<i32>,
}

/// The POA graph plus its designated sink
#[derive(Debug, Clone, Default)]
pub struct PoaGraph {
    pub vertices: Vec<PoaVertex>,
    pub edges: Vec<PoaEdge>,
    pub end_vertex: i32,
}

fn empty_poa_vertex(value: u8) -> PoaVertex {
    PoaVertex {
        value,
        aligned: Vec::new(),
        in_edges: Vec::new(),
        out_edges: Vec::new(),
        compact_vertex: -1,
    }
}

impl PoaGraph {
    /// Build the POA graph and its compact view from the first sequence.
    ///
    /// The compact graph is source(empty) → sequence → sink(empty) with ids
    /// 0, 1 and 2; the POA chain runs source, one vertex per base, sink.
    pub fn initial(seq: &str) -> (PoaGraph, Graph) {
        let mut compact = Graph::new();
        let source = compact.add_vertex("0".to_string(), String::new());
        let central = compact.add_vertex("1".to_string(), seq.to_string());
        let sink = compact.add_vertex("2".to_string(), String::new());
        compact.add_edge(source, central, 0);
        compact.add_edge(central, sink, 0);
        compact.vertex_mut(source).first_poa_vtx = 0;
        compact.vertex_mut(central).first_poa_vtx = 1;
        compact.vertex_mut(sink).first_poa_vtx = seq.len() as i32 + 1;

        let mut poa = PoaGraph::default();

        let mut source_v = empty_poa_vertex(0);
        source_v.out_edges.push(0);
        source_v.compact_vertex = source;
        poa.vertices.push(source_v);
        poa.edges.push(PoaEdge {
            source: 0,
            dest: 1,
            weight: 1,
            sequence_ids: vec![0],
        });

        for base in seq.bytes() {
            let mut vertex = empty_poa_vertex(base);
            vertex.in_edges.push(poa.edges.len() as i32 - 1);
            vertex.out_edges.push(poa.edges.len() as i32);
            vertex.compact_vertex = central;
            poa.vertices.push(vertex);
            poa.edges.push(PoaEdge {
                source: poa.vertices.len() as i32 - 1,
                dest: poa.vertices.len() as i32,
                weight: 1,
                sequence_ids: vec![0],
            });
        }

        let mut sink_v = empty_poa_vertex(0);
        sink_v.in_edges.push(poa.edges.len() as i32 - 1);
        sink_v.compact_vertex = sink;
        poa.vertices.push(sink_v);
        poa.end_vertex = poa.vertices.len() as i32 - 1;

        (poa, compact)
    }

    /// Expand a compact-graph path into the corresponding POA vertex walk,
    /// bracketed by the source and sink POA vertices
    fn convert_path(&self, alignment: &Alignment, compact: &Graph) -> Vec<i32> {
        let mut poa_path = vec![compact.vertex(alignment.path[0]).first_poa_vtx];

        for &v in &alignment.path {
            let first = compact.vertex(v).first_poa_vtx;
            for k in 0..compact.vertex(v).label.len() as i32 {
                poa_path.push(first + k);
            }
        }

        let last = *alignment.path.last().expect("alignment path is never empty");
        poa_path.push(compact.vertex(last).first_poa_vtx);
        poa_path
    }

    /// Reuse a vertex of the aligned-to class carrying `value`, or create one
    /// and link it into the class (extending or opening a compact run)
    fn update_vertex(
        &mut self,
        poa_v: &mut i32,
        pos_new_vtx: &mut i32,
        value: u8,
        new_vertex_exists: &mut bool,
        compact: &mut Graph,
    ) {
        for l in 0..self.vertices[*poa_v as usize].aligned.len() {
            let vtx = self.vertices[*poa_v as usize].aligned[l];
            if self.vertices[vtx as usize].value == value {
                *new_vertex_exists = false;
                *poa_v = vtx;
                return;
            }
        }

        let mut new_vertex = empty_poa_vertex(value);
        new_vertex.aligned = self.vertices[*poa_v as usize].aligned.clone();
        new_vertex.aligned.push(*poa_v);
        let new_id = self.vertices.len() as i32;
        self.vertices.push(new_vertex);

        for l in 0..self.vertices[new_id as usize].aligned.len() {
            let vtx = self.vertices[new_id as usize].aligned[l];
            self.vertices[vtx as usize].aligned.push(new_id);
        }
        *poa_v = new_id;

        if *new_vertex_exists {
            // Append to the run opened earlier in this alignment
            compact
                .vertex_mut(*pos_new_vtx)
                .label
                .push(value as char);
            self.vertices[new_id as usize].compact_vertex = *pos_new_vtx;
        } else {
            let compact_id = compact.push_vertex(Vertex {
                name: compact.num_vertices().to_string(),
                label: (value as char).to_string(),
                first_poa_vtx: new_id,
                ..Vertex::default()
            });
            *pos_new_vtx = compact_id;
            self.vertices[new_id as usize].compact_vertex = compact_id;
            *new_vertex_exists = true;
        }
    }

    /// Bump an existing POA edge or create it, mirroring new edges into the
    /// compact graph (splitting runs as needed)
    fn update_edge(
        &mut self,
        source: i32,
        dest: i32,
        added_weight: i32,
        seq_id: i32,
        compact: &mut Graph,
    ) {
        for l in 0..self.vertices[source as usize].out_edges.len() {
            let e = self.vertices[source as usize].out_edges[l] as usize;
            if self.edges[e].source == source && self.edges[e].dest == dest {
                self.edges[e].weight += added_weight;
                self.edges[e].sequence_ids.push(seq_id);
                return;
            }
        }

        let edge_id = self.edges.len() as i32;
        self.edges.push(PoaEdge {
            source,
            dest,
            weight: added_weight,
            sequence_ids: vec![seq_id],
        });
        self.vertices[source as usize].out_edges.push(edge_id);
        self.vertices[dest as usize].in_edges.push(edge_id);

        self.split_vertices(source, dest, compact);
    }

    /// A new POA edge may land inside compact runs; split them so the edge's
    /// endpoints sit on run boundaries, then mirror the edge
    fn split_vertices(&mut self, poa_source: i32, poa_dest: i32, compact: &mut Graph) {
        let source_c = self.vertices[poa_source as usize].compact_vertex;
        let mut dest_c = self.vertices[poa_dest as usize].compact_vertex;
        let pos_source = poa_source - compact.vertex(source_c).first_poa_vtx;
        let split_source = pos_source < compact.vertex(source_c).label.len() as i32 - 1;
        let mut pos_dest = poa_dest - compact.vertex(dest_c).first_poa_vtx;
        let split_dest = pos_dest > 0;

        if source_c == dest_c && poa_source + 1 == poa_dest {
            // Consecutive bases of one run need no compact edge
            return;
        }

        if split_source {
            let new_id = self.split_run_after(source_c, pos_source, poa_source + 1, compact);
            if source_c == dest_c {
                dest_c = new_id;
                pos_dest = poa_dest - compact.vertex(dest_c).first_poa_vtx;
            }
        }

        if split_dest {
            dest_c = self.split_run_after(dest_c, pos_dest - 1, poa_dest, compact);
        }

        compact.add_edge(source_c, dest_c, 0);
    }

    /// Split a compact run right after character position `pos`, moving the
    /// tail into a fresh vertex whose run starts at POA vertex `tail_first`.
    /// Returns the id of the tail vertex.
    fn split_run_after(
        &mut self,
        vertex_c: VertexId,
        pos: i32,
        tail_first: i32,
        compact: &mut Graph,
    ) -> VertexId {
        let original = compact.vertex(vertex_c).clone();
        let new_id = compact.num_vertices() as VertexId;
        let link = Edge {
            from: vertex_c,
            to: new_id,
            overlap: 0,
        };

        let tail = Vertex {
            name: new_id.to_string(),
            label: original.label[(pos as usize + 1)..].to_string(),
            in_edges: vec![link],
            out_edges: original.out_edges.clone(),
            first_poa_vtx: tail_first,
        };
        // The moved characters now belong to the tail run
        let head_first = compact.vertex(vertex_c).first_poa_vtx;
        for l in (pos + 1)..original.label.len() as i32 {
            let poa_idx = head_first + l;
            self.vertices[poa_idx as usize].compact_vertex = new_id;
        }
        compact.push_vertex(tail);
        update_compact_out_edges(vertex_c, new_id, compact);

        let head = compact.vertex_mut(vertex_c);
        head.out_edges = vec![link];
        head.label.truncate(pos as usize + 1);

        new_id
    }

    /// Apply one alignment of `seq` to the POA graph and its compact view
    pub fn add_alignment(
        &mut self,
        compact: &mut Graph,
        alignment: &Alignment,
        seq: &str,
        seq_id: i32,
    ) {
        let poa_path = self.convert_path(alignment, compact);
        let seq = seq.as_bytes();

        let mut new_vertex_exists = false;
        let mut pos_new_vertex = -1;
        let mut i = 0usize;
        let mut l = 0usize;
        let mut new_v_poa = 0;

        for &op in &alignment.edit_op {
            match op {
                CigarOp::Match => {
                    let prev_v_poa = new_v_poa;
                    new_v_poa = poa_path[l + 1];
                    self.update_edge(prev_v_poa, new_v_poa, 1, seq_id, compact);
                    i += 1;
                    l += 1;
                    new_vertex_exists = false;
                }
                CigarOp::Mismatch => {
                    let prev_v_poa = new_v_poa;
                    new_v_poa = poa_path[l + 1];
                    self.update_vertex(
                        &mut new_v_poa,
                        &mut pos_new_vertex,
                        seq[i],
                        &mut new_vertex_exists,
                        compact,
                    );
                    self.update_edge(prev_v_poa, new_v_poa, 1, seq_id, compact);
                    i += 1;
                    l += 1;
                }
                CigarOp::Deletion => {
                    // A query base aligned to no column: fresh vertex
                    let new_id = self.vertices.len() as i32;
                    self.vertices.push(empty_poa_vertex(seq[i]));

                    if new_vertex_exists {
                        compact
                            .vertex_mut(pos_new_vertex)
                            .label
                            .push(seq[i] as char);
                        self.vertices[new_id as usize].compact_vertex = pos_new_vertex;
                    } else {
                        let compact_id = compact.push_vertex(Vertex {
                            name: compact.num_vertices().to_string(),
                            label: (seq[i] as char).to_string(),
                            first_poa_vtx: new_id,
                            ..Vertex::default()
                        });
                        pos_new_vertex = compact_id;
                        self.vertices[new_id as usize].compact_vertex = compact_id;
                        new_vertex_exists = true;
                    }

                    let prev_v_poa = new_v_poa;
                    new_v_poa = new_id;
                    self.update_edge(prev_v_poa, new_v_poa, 1, seq_id, compact);
                    i += 1;
                }
                CigarOp::Insertion => {
                    l += 1;
                }
            }
        }

        let prev_v_poa = new_v_poa;
        let sink = *poa_path.last().expect("poa path is never empty");
        self.update_edge(prev_v_poa, sink, 1, seq_id, compact);
    }

    /// Write the graph as an MSA in FASTA format, one row per sequence.
    ///
    /// Aligned-to classes share a column; the extra source and sink columns
    /// are not printed.
    pub fn write_msa<W: Write>(&self, num_sequences: i32, out: &mut W) -> io::Result<()> {
        // Augment with one edge per aligned pair of each edge's endpoints so
        // aligned vertices cannot be ordered across their shared column.
        let n = self.vertices.len();
        let mut adj: Vec<Vec<usize>> = vec![Vec::new(); n];
        for edge in &self.edges {
            adj[edge.source as usize].push(edge.dest as usize);
            for &s_aligned in &self.vertices[edge.source as usize].aligned {
                for &d_aligned in &self.vertices[edge.dest as usize].aligned {
                    adj[s_aligned as usize].push(d_aligned as usize);
                }
            }
        }

        let order = topological_order(&adj);

        // Aligned vertices share a column; the rest take fresh ones
        let mut node_to_column = vec![-1i32; n];
        let mut column_index = 0;
        for &v in &order {
            let mut aligned_column = -1;
            for &a in &self.vertices[v].aligned {
                if node_to_column[a as usize] != -1 {
                    aligned_column = node_to_column[a as usize];
                }
            }
            if aligned_column != -1 {
                node_to_column[v] = aligned_column;
            } else {
                node_to_column[v] = column_index;
                column_index += 1;
            }
        }

        let columns = column_index as usize;
        let rows = num_sequences as usize;
        let mut msa = vec![vec![b'-'; columns]; rows];

        for (v, vertex) in self.vertices.iter().enumerate() {
            let column = node_to_column[v];
            if column < 0 {
                continue;
            }
            for &e in &vertex.in_edges {
                for &seq_id in &self.edges[e as usize].sequence_ids {
                    msa[seq_id as usize][column as usize] = vertex.value;
                }
            }
        }

        for (row, line) in msa.iter().enumerate() {
            writeln!(out, ">Sequence_{}", row + 1)?;
            if columns > 2 {
                out.write_all(&line[1..columns - 1])?;
            }
            writeln!(out)?;
        }
        Ok(())
    }

    /// Consensus sequence: the maximum-total-weight source→sink path
    pub fn consensus(&self) -> String {
        let n = self.vertices.len();
        let mut adj: Vec<Vec<usize>> = vec![Vec::new(); n];
        for vertex in &self.vertices {
            for &e in &vertex.out_edges {
                adj[self.edges[e as usize].source as usize]
                    .push(self.edges[e as usize].dest as usize);
            }
        }
        let order = topological_order(&adj);

        let mut best = vec![i64::MIN; n];
        let mut pred = vec![-1i32; n];
        best[0] = 0;
        for &v in &order {
            if best[v] == i64::MIN {
                continue;
            }
            for &e in &self.vertices[v].out_edges {
                let edge = &self.edges[e as usize];
                let candidate = best[v] + edge.weight as i64;
                if candidate > best[edge.dest as usize] {
                    best[edge.dest as usize] = candidate;
                    pred[edge.dest as usize] = v as i32;
                }
            }
        }

        let mut bases = Vec::new();
        let mut v = self.end_vertex;
        while v > 0 {
            if v != self.end_vertex {
                bases.push(self.vertices[v as usize].value);
            }
            v = pred[v as usize];
            if v == -1 {
                break;
            }
        }
        bases.reverse();
        String::from_utf8_lossy(&bases).into_owned()
    }
}

/// Redirect the out-edges moved onto a split-off tail vertex, fixing the
/// matching in-edge records of their targets
fn update_compact_out_edges(orig_from: VertexId, new_from: VertexId, compact: &mut Graph) {
    let n_out = compact.vertex(new_from).out_edges.len();
    for l in 0..n_out {
        compact.vertex_mut(new_from).out_edges[l].from = new_from;
        let to = compact.vertex(new_from).out_edges[l].to;

        let n_in = compact.vertex(to).in_edges.len();
        for k in 0..n_in {
            if compact.vertex(to).in_edges[k].from == orig_from {
                compact.vertex_mut(to).in_edges[k].from = new_from;
            }
        }
    }
}

/// DFS post-order from vertex 0, reversed
fn topological_order(adj: &[Vec<usize>]) -> Vec<usize> {
    let mut visited = vec![false; adj.len()];
    let mut order = Vec::with_capacity(adj.len());
    let mut stack: Vec<(usize, usize)> = vec![(0, 0)];
    visited[0] = true;

    while let Some(top) = stack.last_mut() {
        let (v, i) = *top;
        if i < adj[v].len() {
            top.1 += 1;
            let w = adj[v][i];
            if !visited[w] {
                visited[w] = true;
                stack.push((w, 0));
            }
        } else {
            order.push(v);
            stack.pop();
        }
    }

    order.reverse();
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_graph_shape() {
        let (poa, compact) = PoaGraph::initial("ACGT");

        assert_eq!(compact.num_vertices(), 3);
        assert_eq!(compact.vertex(0).label, "");
        assert_eq!(compact.vertex(1).label, "ACGT");
        assert_eq!(compact.vertex(2).label, "");
        assert_eq!(compact.vertex(2).first_poa_vtx, 5);

        // source + 4 bases + sink
        assert_eq!(poa.vertices.len(), 6);
        assert_eq!(poa.edges.len(), 5);
        assert_eq!(poa.end_vertex, 5);
        assert_eq!(poa.vertices[1].value, b'A');
        assert_eq!(poa.vertices[1].compact_vertex, 1);
    }

    #[test]
    fn test_consensus_of_single_sequence() {
        let (poa, _) = PoaGraph::initial("ACCCGT");
        assert_eq!(poa.consensus(), "ACCCGT");
    }

    #[test]
    fn test_match_alignment_bumps_weights() {
        let (mut poa, mut compact) = PoaGraph::initial("ACG");
        let alignment = Alignment {
            edit_op: vec![CigarOp::Match; 3],
            path: vec![0, 1, 2],
            score: 0,
        };
        poa.add_alignment(&mut compact, &alignment, "ACG", 1);

        // No new vertices, every chain edge now carries both sequences
        assert_eq!(poa.vertices.len(), 5);
        assert_eq!(compact.num_vertices(), 3);
        for edge in &poa.edges {
            assert_eq!(edge.weight, 2);
            assert_eq!(edge.sequence_ids, vec![0, 1]);
        }
    }

    #[test]
    fn test_mismatch_splits_compact_run() {
        let (mut poa, mut compact) = PoaGraph::initial("ACG");
        let alignment = Alignment {
            edit_op: vec![CigarOp::Match, CigarOp::Mismatch, CigarOp::Match],
            path: vec![0, 1, 2],
            score: 2,
        };
        poa.add_alignment(&mut compact, &alignment, "ATG", 1);

        // One new POA vertex aligned to the C column
        assert_eq!(poa.vertices.len(), 6);
        let new_vertex = &poa.vertices[5];
        assert_eq!(new_vertex.value, b'T');
        assert!(new_vertex.aligned.contains(&2));
        assert!(poa.vertices[2].aligned.contains(&5));

        // The ACG run is split so T can branch around C
        let labels: Vec<&str> = compact
            .vertices()
            .iter()
            .map(|v| v.label.as_str())
            .collect();
        assert!(labels.contains(&"A"));
        assert!(labels.contains(&"T"));
    }

    #[test]
    fn test_msa_rows_after_mismatch() {
        let (mut poa, mut compact) = PoaGraph::initial("ACG");
        let alignment = Alignment {
            edit_op: vec![CigarOp::Match, CigarOp::Mismatch, CigarOp::Match],
            path: vec![0, 1, 2],
            score: 2,
        };
        poa.add_alignment(&mut compact, &alignment, "ATG", 1);

        let mut out = Vec::new();
        poa.write_msa(2, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let rows: Vec<&str> = text.lines().collect();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1], "ACG");
        assert_eq!(rows[3], "ATG");
    }
}
