//! Sequence graph: vertices carrying string labels, edges carrying an
//! exact-match overlap length
//!
//! Graphs are loaded from a GFA1 subset (`S` and `L` lines, `H` ignored).
//! Oriented vertex ids are formed by appending the strand sign to the segment
//! name; a minus-orientation vertex takes the reverse complement of its plus
//! twin's label.

use std::collections::HashMap;
use std::io::BufRead;

use crate::types::{TheseusError, VertexId};

/// Directed edge with an exact-match overlap between the two labels
#[derive(Debug, Clone, Copy)]
pub struct Edge {
    pub from: VertexId,
    pub to: VertexId,
    pub overlap: usize,
}

/// A vertex of the sequence graph
#[derive(Debug, Clone, Default)]
pub struct Vertex {
    pub name: String,
    pub label: String,
    pub in_edges: Vec<Edge>,
    pub out_edges: Vec<Edge>,
    /// First POA vertex mapped to this vertex (MSA mode only)
    pub first_poa_vtx: i32,
}

/// Directed sequence graph with string-labelled vertices
#[derive(Debug, Clone, Default)]
pub struct Graph {
    vertices: Vec<Vertex>,
    name_to_id: HashMap<String, VertexId>,
}

/// Reverse complement of a DNA sequence
fn reverse_complement(seq: &str) -> String {
    seq.chars()
        .rev()
        .map(|b| match b {
            'A' | 'a' => 'T',
            'T' | 't' => 'A',
            'C' | 'c' => 'G',
            'G' | 'g' => 'C',
            _ => 'N',
        })
        .collect()
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a graph from a GFA1 stream.
    ///
    /// Supported lines: `H` (ignored), `S\tname\tseq`, and
    /// `L\tfrom\t±\tto\t±\t<N>M`. Everything else is skipped.
    pub fn from_gfa<R: BufRead>(reader: R) -> Result<Self, TheseusError> {
        let mut graph = Graph::new();
        let mut pending_edges: Vec<(VertexId, VertexId, usize)> = Vec::new();

        for line in reader.lines() {
            let line = line
                .map_err(|e| TheseusError::InvalidGraph(format!("failed to read GFA: {e}")))?;
            if line.is_empty() || line.starts_with('H') {
                continue;
            }

            let fields: Vec<&str> = line.split('\t').collect();
            match fields[0] {
                "S" => {
                    if fields.len() < 3 {
                        return Err(TheseusError::InvalidGraph(format!(
                            "malformed segment line: {line}"
                        )));
                    }
                    let name = format!("{}+", fields[1]);
                    let seq = fields[2];
                    if seq == "*" {
                        return Err(TheseusError::InvalidGraph(format!(
                            "segment {} has no sequence (*)",
                            fields[1]
                        )));
                    }
                    let id = graph.intern(&name);
                    graph.vertices[id as usize].label = seq.to_string();
                }
                "L" => {
                    if fields.len() < 6 {
                        return Err(TheseusError::InvalidGraph(format!(
                            "malformed link line: {line}"
                        )));
                    }
                    let (from_sign, to_sign) = (fields[2], fields[4]);
                    if (from_sign != "+" && from_sign != "-")
                        || (to_sign != "+" && to_sign != "-")
                    {
                        return Err(TheseusError::InvalidGraph(format!(
                            "bad orientation in link line: {line}"
                        )));
                    }
                    let from = graph.intern(&format!("{}{}", fields[1], from_sign));
                    let to = graph.intern(&format!("{}{}", fields[3], to_sign));
                    let overlap = parse_overlap(fields[5])?;
                    pending_edges.push((from, to, overlap));
                }
                _ => {}
            }
        }

        // Minus-orientation vertices take the reverse complement of their
        // plus twin; a minus vertex without a twin is an error.
        for id in 0..graph.vertices.len() {
            if !graph.vertices[id].label.is_empty() || !graph.vertices[id].name.ends_with('-') {
                continue;
            }
            let base = graph.vertices[id].name.trim_end_matches('-').to_string();
            match graph.name_to_id.get(&format!("{base}+")) {
                Some(&twin) if !graph.vertices[twin as usize].label.is_empty() => {
                    let label = reverse_complement(&graph.vertices[twin as usize].label);
                    graph.vertices[id].label = label;
                }
                _ => {
                    return Err(TheseusError::InvalidGraph(format!(
                        "vertex {} is present in links but its segment is missing",
                        graph.vertices[id].name
                    )));
                }
            }
        }

        for (from, to, overlap) in pending_edges {
            for id in [from, to] {
                if graph.vertices[id as usize].label.is_empty() {
                    return Err(TheseusError::InvalidGraph(format!(
                        "link references vertex {} which has no segment",
                        graph.vertices[id as usize].name
                    )));
                }
            }
            let from_len = graph.vertices[from as usize].label.len();
            let to_len = graph.vertices[to as usize].label.len();
            if overlap >= from_len || overlap >= to_len {
                return Err(TheseusError::InvalidGraph(format!(
                    "overlap {}M between {} and {} is not strictly smaller than both labels",
                    overlap,
                    graph.vertices[from as usize].name,
                    graph.vertices[to as usize].name
                )));
            }
            graph.add_edge(from, to, overlap);
        }

        Ok(graph)
    }

    /// Register a vertex name, creating an empty vertex on first sight
    fn intern(&mut self, name: &str) -> VertexId {
        if let Some(&id) = self.name_to_id.get(name) {
            return id;
        }
        let id = self.vertices.len() as VertexId;
        self.name_to_id.insert(name.to_string(), id);
        self.vertices.push(Vertex {
            name: name.to_string(),
            ..Vertex::default()
        });
        id
    }

    /// Append a vertex and return its id
    pub fn add_vertex(&mut self, name: String, label: String) -> VertexId {
        self.push_vertex(Vertex {
            name,
            label,
            ..Vertex::default()
        })
    }

    /// Append a fully-built vertex and return its id
    pub(crate) fn push_vertex(&mut self, vertex: Vertex) -> VertexId {
        let id = self.vertices.len() as VertexId;
        if !vertex.name.is_empty() {
            self.name_to_id.insert(vertex.name.clone(), id);
        }
        self.vertices.push(vertex);
        id
    }

    /// Register an edge on both endpoints
    pub fn add_edge(&mut self, from: VertexId, to: VertexId, overlap: usize) {
        let edge = Edge { from, to, overlap };
        self.vertices[from as usize].out_edges.push(edge);
        self.vertices[to as usize].in_edges.push(edge);
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn vertex(&self, id: VertexId) -> &Vertex {
        &self.vertices[id as usize]
    }

    pub fn vertex_mut(&mut self, id: VertexId) -> &mut Vertex {
        &mut self.vertices[id as usize]
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Label length of a vertex
    pub fn label_len(&self, id: VertexId) -> i32 {
        self.vertices[id as usize].label.len() as i32
    }

    /// Longest label in the graph
    pub fn max_label_len(&self) -> usize {
        self.vertices.iter().map(|v| v.label.len()).max().unwrap_or(0)
    }

    /// Total label length over all vertices
    pub fn total_label_len(&self) -> usize {
        self.vertices.iter().map(|v| v.label.len()).sum()
    }

    /// Resolve an oriented vertex name (e.g. `"1+"`) to its id
    pub fn vertex_id(&self, name: &str) -> Option<VertexId> {
        self.name_to_id.get(name).copied()
    }

    /// Write the graph back out as GFA (forward orientations only)
    pub fn write_gfa<W: std::io::Write>(&self, out: &mut W) -> std::io::Result<()> {
        for vertex in &self.vertices {
            writeln!(out, "S\t{}\t{}", vertex.name, vertex.label)?;
        }
        for vertex in &self.vertices {
            for edge in &vertex.out_edges {
                writeln!(
                    out,
                    "L\t{}\t+\t{}\t+\t{}M",
                    self.vertices[edge.from as usize].name,
                    self.vertices[edge.to as usize].name,
                    edge.overlap
                )?;
            }
        }
        Ok(())
    }

    /// Write the graph in Graphviz dot format
    pub fn write_dot<W: std::io::Write>(&self, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "digraph G {{")?;
        for (id, vertex) in self.vertices.iter().enumerate() {
            writeln!(out, "  {} [label=\"{}\"]", id, vertex.label)?;
        }
        for vertex in &self.vertices {
            for edge in &vertex.out_edges {
                writeln!(out, "  {} -> {}", edge.from, edge.to)?;
            }
        }
        writeln!(out, "}}")
    }
}

/// Parse a GFA overlap field of the form `<N>M` with `N >= 0`
fn parse_overlap(field: &str) -> Result<usize, TheseusError> {
    if field == "*" {
        return Err(TheseusError::InvalidGraph(
            "unspecified edge overlaps (*) are not supported".to_string(),
        ));
    }
    let digits = match field.strip_suffix('M') {
        Some(d) if !d.is_empty() => d,
        _ => {
            return Err(TheseusError::InvalidGraph(format!(
                "edge overlaps other than exact match are not supported: {field}"
            )))
        }
    };
    digits.parse::<usize>().map_err(|_| {
        TheseusError::InvalidGraph(format!("invalid overlap field: {field}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const CYCLE_GFA: &str = "S\t1\tACTTAG\nS\t2\tACA\nS\t3\tT\nS\t4\tGTACTT\n\
                             L\t1\t+\t2\t+\t0M\nL\t1\t+\t3\t+\t0M\n\
                             L\t2\t+\t4\t+\t0M\nL\t3\t+\t4\t+\t0M\nL\t4\t+\t1\t+\t0M\n";

    #[test]
    fn test_parse_cyclic_graph() {
        let graph = Graph::from_gfa(Cursor::new(CYCLE_GFA)).unwrap();
        assert_eq!(graph.num_vertices(), 4);
        assert_eq!(graph.vertex_id("1+"), Some(0));
        assert_eq!(graph.vertex(0).label, "ACTTAG");
        assert_eq!(graph.vertex(0).out_edges.len(), 2);
        assert_eq!(graph.vertex(3).out_edges[0].to, 0);
        assert_eq!(graph.max_label_len(), 6);
    }

    #[test]
    fn test_minus_strand_takes_reverse_complement() {
        let gfa = "S\t1\tACGT\nS\t2\tGGG\nL\t1\t-\t2\t+\t0M\n";
        let graph = Graph::from_gfa(Cursor::new(gfa)).unwrap();
        let id = graph.vertex_id("1-").unwrap();
        assert_eq!(graph.vertex(id).label, "ACGT");

        let gfa = "S\t1\tAACGT\nS\t2\tGGG\nL\t1\t-\t2\t+\t0M\n";
        let graph = Graph::from_gfa(Cursor::new(gfa)).unwrap();
        let id = graph.vertex_id("1-").unwrap();
        assert_eq!(graph.vertex(id).label, "ACGTT");
    }

    #[test]
    fn test_rejects_star_label() {
        let gfa = "S\t1\t*\n";
        assert!(Graph::from_gfa(Cursor::new(gfa)).is_err());
    }

    #[test]
    fn test_rejects_bad_overlap() {
        for overlap in ["*", "3S", "M", "-1M"] {
            let gfa = format!("S\t1\tACGT\nS\t2\tACGT\nL\t1\t+\t2\t+\t{overlap}\n");
            assert!(
                Graph::from_gfa(Cursor::new(gfa)).is_err(),
                "overlap {overlap} should be rejected"
            );
        }
    }

    #[test]
    fn test_rejects_containing_overlap() {
        let gfa = "S\t1\tACGT\nS\t2\tAC\nL\t1\t+\t2\t+\t2M\n";
        assert!(Graph::from_gfa(Cursor::new(gfa)).is_err());
    }

    #[test]
    fn test_rejects_missing_segment() {
        let gfa = "S\t1\tACGT\nL\t1\t+\t2\t+\t0M\n";
        assert!(Graph::from_gfa(Cursor::new(gfa)).is_err());
        let gfa = "S\t1\tACGT\nL\t2\t-\t1\t+\t0M\n";
        assert!(Graph::from_gfa(Cursor::new(gfa)).is_err());
    }
}
