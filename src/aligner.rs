//! Gap-affine wavefront aligner for sequence-to-graph alignment
//!
//! The core explores wavefronts of increasing score by diagonal, modelling
//! the three affine matrices M, I and D per vertex. Incoming contributions
//! are merged through a diagonal-indexed scratchpad that keeps the furthest
//! cell per diagonal; when a diagonal reaches a vertex's right boundary the
//! wave jumps across the out-edges, which is how multi-vertex (and cyclic)
//! paths are traversed. Enough provenance is recorded to backtrace an
//! optimal edit script afterwards.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::io::BufRead;

use crate::beyond_scope::BeyondScope;
use crate::graph::Graph;
use crate::penalties::{GapModel, InternalPenalties, Penalties};
use crate::scope::Scope;
use crate::scratchpad::ScratchPad;
use crate::types::{Alignment, Cell, CigarOp, Matrix, Range, TheseusError, VertexId, NO_PREV};
use crate::vertices_data::{VerticesData, WfMatrix};

/// Termination discipline of the score loop
#[derive(Debug, Clone, Copy)]
pub(crate) enum AlignMode {
    /// Stop as soon as the query is exhausted anywhere in the graph
    Anchored,
    /// Stop only when the query is exhausted at the right boundary of the
    /// designated sink vertex
    Msa { end_vertex: VertexId },
}

/// Sequence-to-graph aligner over an immutable graph
pub struct TheseusAligner {
    core: AlignerCore,
}

impl TheseusAligner {
    /// Create an aligner over an already-built graph
    pub fn new(penalties: Penalties, graph: Graph) -> Result<Self, TheseusError> {
        Ok(Self {
            core: AlignerCore::new(penalties, graph, AlignMode::Anchored)?,
        })
    }

    /// Create an aligner from a GFA stream
    pub fn from_gfa<R: BufRead>(penalties: Penalties, reader: R) -> Result<Self, TheseusError> {
        let graph = Graph::from_gfa(reader)?;
        Self::new(penalties, graph)
    }

    pub fn graph(&self) -> &Graph {
        self.core.graph()
    }

    /// Align a query into the graph starting at `start_offset` columns into
    /// `start_node`. Returns the minimum-penalty edit script; its score is
    /// computed under the original penalties.
    pub fn align(
        &mut self,
        query: &str,
        start_node: VertexId,
        start_offset: u32,
    ) -> Result<Alignment, TheseusError> {
        self.core.align(query, start_node, start_offset)
    }
}

/// The wavefront state machine shared by the anchored and MSA frontends
pub(crate) struct AlignerCore {
    user_penalties: Penalties,
    penalties: InternalPenalties,
    n_scores: usize,
    graph: Graph,
    mode: AlignMode,

    scratchpad: ScratchPad,
    scope: Scope,
    beyond: BeyondScope,
    vertices: VerticesData,

    // Per-query state
    query: Vec<u8>,
    score: i32,
    end: bool,
    start_pos: Cell,
    start_kind: Matrix,
}

const SEED: Cell = Cell {
    vertex_id: 0,
    offset: 0,
    diag: 0,
    prev_pos: NO_PREV,
    from_matrix: Matrix::MJumps,
};

impl AlignerCore {
    pub fn new(
        user_penalties: Penalties,
        graph: Graph,
        mode: AlignMode,
    ) -> Result<Self, TheseusError> {
        if user_penalties.model() == GapModel::DualAffine {
            return Err(TheseusError::InvalidPenalties(
                "dual-affine penalties are not supported by the aligner core".to_string(),
            ));
        }
        let penalties = InternalPenalties::from_user(&user_penalties)?;
        let n_scores = penalties.n_scores();
        let vertices = VerticesData::new(&penalties, graph.num_vertices());

        Ok(Self {
            user_penalties,
            penalties,
            n_scores,
            graph,
            mode,
            scratchpad: ScratchPad::new(-1024, 1024),
            scope: Scope::new(n_scores),
            beyond: BeyondScope::new(),
            vertices,
            query: Vec::new(),
            score: 0,
            end: false,
            start_pos: SEED,
            start_kind: Matrix::MJumps,
        })
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    pub fn align(
        &mut self,
        query: &str,
        start_node: VertexId,
        start_offset: u32,
    ) -> Result<Alignment, TheseusError> {
        if start_node < 0 || start_node as usize >= self.graph.num_vertices() {
            return Err(TheseusError::InvalidGraph(format!(
                "start vertex {start_node} does not exist"
            )));
        }
        if start_offset as i32 > self.graph.label_len(start_node) {
            return Err(TheseusError::InvalidGraph(format!(
                "start offset {start_offset} exceeds the label of vertex {start_node}"
            )));
        }

        self.new_alignment(query, start_node, start_offset as i32);
        let score_cap = self.score_cap();

        loop {
            if self.score == 0 {
                // The seed is the only cell of wave zero; everything it can
                // reach for free is covered by its matching extension.
                self.extend_cell(Matrix::MJumps, 0);
            }
            self.compute_wave();
            if self.end {
                break;
            }

            self.score += 1;
            if let AlignMode::Msa { end_vertex } = self.mode {
                if self.score > score_cap {
                    return Err(TheseusError::UnalignableQuery(format!(
                        "sink vertex {end_vertex} not reached within score {score_cap}"
                    )));
                }
            }
            self.scope.new_score(self.score);
            self.vertices.new_score(self.score);
        }

        let (edit_op, path) = self.backtrace()?;
        let score = self.user_penalties.score_cigar(&edit_op);
        Ok(Alignment {
            edit_op,
            path,
            score,
        })
    }

    /// Reset all per-query state and plant the seed cell
    fn new_alignment(&mut self, query: &str, start_node: VertexId, start_offset: i32) {
        self.query = query.as_bytes().to_vec();
        self.scope.new_alignment();
        self.beyond.new_alignment();
        self.vertices.new_alignment(self.graph.num_vertices());

        let min_diag = -(self.query.len() as i32);
        let max_diag = self.graph.max_label_len() as i32;
        if self.scratchpad.min_diag() > min_diag || self.scratchpad.max_diag() < max_diag {
            let new_min = min_diag.min(self.scratchpad.min_diag().saturating_mul(2));
            let new_max = max_diag.max(self.scratchpad.max_diag().saturating_mul(2));
            self.scratchpad = ScratchPad::new(new_min, new_max);
        }

        self.score = 0;
        self.end = false;

        let seed = Cell {
            vertex_id: start_node,
            diag: start_offset,
            ..SEED
        };
        let idx = self.vertices.activate(start_node);
        let pos = self.beyond.push_m_jump(seed);
        self.vertices.data_mut(idx).m_jumps_positions[0].push(pos);
        self.start_pos = seed;
        self.start_kind = Matrix::MJumps;
    }

    /// Upper bound on any reachable optimal score; only enforced in MSA mode
    fn score_cap(&self) -> i32 {
        let q = self.query.len() as i32;
        let total = self.graph.total_label_len() as i32;
        let worst_step = self
            .penalties
            .mismatch
            .max(self.penalties.gapo + self.penalties.gape);
        (q + total + 2).saturating_mul(worst_step)
    }

    /// Compute the wavefronts of the current score for every active vertex
    fn compute_wave(&mut self) {
        self.vertices.expand();
        self.vertices.compact();

        // Vertices activated by jumps during this wave are appended behind
        // the snapshot; their first wave is the next score.
        let num_active = self.vertices.num_active();
        for vidx in 0..num_active {
            self.process_vertex(vidx);
        }
    }

    fn process_vertex(&mut self, vidx: usize) {
        let vertex = self.vertices.vertex_at(vidx);
        let upper = self.graph.label_len(vertex);

        self.next_i(vertex, vidx, upper);
        self.scratchpad.reset();
        self.next_d(vidx, upper);
        self.scratchpad.reset();
        self.next_m(vidx, upper);
        self.scratchpad.reset();

        let range = self.scope.m_pos(self.score)[vidx];
        for pos in range.start..range.end {
            self.extend_cell(Matrix::M, pos);
        }
    }

    /// Compute the I wavefront of the current score for one vertex
    fn next_i(&mut self, vertex: VertexId, vidx: usize, upper: i32) {
        let q = self.query.len() as i32;
        let s = self.score;
        let s_ext = s - self.penalties.gape;
        let s_open = s - (self.penalties.gapo + self.penalties.gape);

        // Extend an insertion
        if s_ext >= 0 {
            if let Some(&range) = self.scope.i_pos(s_ext).get(vidx) {
                sparsify_indel(
                    &mut self.scratchpad,
                    self.scope.i_wf(s_ext),
                    range,
                    0,
                    1,
                    q,
                    upper,
                );
            }
            let slot = s_ext as usize % self.n_scores;
            sparsify_jumps(
                &mut self.scratchpad,
                &self.beyond.i_jumps_wf,
                &self.vertices.data(vidx).i_jumps_positions[slot],
                0,
                1,
                q,
                upper,
                Matrix::IJumps,
            );
        }

        // Open an insertion from M
        if s_open >= 0 {
            if let Some(&range) = self.scope.m_pos(s_open).get(vidx) {
                sparsify_m(&mut self.scratchpad, &self.beyond.m_wf, range, 0, 1, q, upper);
            }
            let slot = s_open as usize % self.n_scores;
            sparsify_jumps(
                &mut self.scratchpad,
                &self.beyond.m_jumps_wf,
                &self.vertices.data(vidx).m_jumps_positions[slot],
                0,
                1,
                q,
                upper,
                Matrix::MJumps,
            );
        }

        // Densify the surviving diagonals into the new I slice
        let Self {
            scratchpad,
            scope,
            vertices,
            ..
        } = self;
        let wf = scope.i_wf_mut(s);
        let start = wf.len() as i32;
        for &diag in scratchpad.active_diags() {
            if vertices.is_valid_diag(WfMatrix::I, vidx, diag) {
                wf.push(*scratchpad.access(diag));
            }
        }
        let end = wf.len() as i32;
        scope.i_pos_mut(s).push(Range { start, end });

        if !self.graph.vertex(vertex).out_edges.is_empty() {
            self.check_and_store_jumps(vidx, start, end, upper);
        }
    }

    /// Compute the D wavefront of the current score for one vertex
    fn next_d(&mut self, vidx: usize, upper: i32) {
        let q = self.query.len() as i32;
        let s = self.score;
        let s_ext = s - self.penalties.gape;
        let s_open = s - (self.penalties.gapo + self.penalties.gape);

        // Extend a deletion
        if s_ext >= 0 {
            if let Some(&range) = self.scope.d_pos(s_ext).get(vidx) {
                sparsify_indel(
                    &mut self.scratchpad,
                    self.scope.d_wf(s_ext),
                    range,
                    1,
                    -1,
                    q,
                    upper,
                );
            }
        }

        // Open a deletion from M
        if s_open >= 0 {
            if let Some(&range) = self.scope.m_pos(s_open).get(vidx) {
                sparsify_m(&mut self.scratchpad, &self.beyond.m_wf, range, 1, -1, q, upper);
            }
            let slot = s_open as usize % self.n_scores;
            sparsify_jumps(
                &mut self.scratchpad,
                &self.beyond.m_jumps_wf,
                &self.vertices.data(vidx).m_jumps_positions[slot],
                1,
                -1,
                q,
                upper,
                Matrix::MJumps,
            );
        }

        let Self {
            scratchpad,
            scope,
            vertices,
            ..
        } = self;
        let wf = scope.d_wf_mut(s);
        let start = wf.len() as i32;
        for &diag in scratchpad.active_diags() {
            if vertices.is_valid_diag(WfMatrix::D, vidx, diag) {
                wf.push(*scratchpad.access(diag));
            }
        }
        let end = wf.len() as i32;
        scope.d_pos_mut(s).push(Range { start, end });
    }

    /// Compute the M wavefront of the current score for one vertex
    fn next_m(&mut self, vidx: usize, upper: i32) {
        let q = self.query.len() as i32;
        let s = self.score;
        let s_mism = s - self.penalties.mismatch;

        // Close a deletion
        if let Some(&range) = self.scope.d_pos(s).get(vidx) {
            sparsify_indel(&mut self.scratchpad, self.scope.d_wf(s), range, 0, 0, q, upper);
        }

        // Close an insertion
        if let Some(&range) = self.scope.i_pos(s).get(vidx) {
            sparsify_indel(&mut self.scratchpad, self.scope.i_wf(s), range, 0, 0, q, upper);
        }

        // Substitution from M
        if s_mism >= 0 {
            if let Some(&range) = self.scope.m_pos(s_mism).get(vidx) {
                sparsify_m(&mut self.scratchpad, &self.beyond.m_wf, range, 1, 0, q, upper);
            }
            let slot = s_mism as usize % self.n_scores;
            sparsify_jumps(
                &mut self.scratchpad,
                &self.beyond.m_jumps_wf,
                &self.vertices.data(vidx).m_jumps_positions[slot],
                1,
                0,
                q,
                upper,
                Matrix::MJumps,
            );
        }

        let Self {
            scratchpad,
            scope,
            vertices,
            beyond,
            ..
        } = self;
        let start = beyond.m_len();
        for &diag in scratchpad.active_diags() {
            if vertices.is_valid_diag(WfMatrix::M, vidx, diag) {
                beyond.push_m(*scratchpad.access(diag));
            }
        }
        let end = beyond.m_len();
        scope.m_pos_mut(s).push(Range { start, end });
    }

    /// Scan a fresh I slice for diagonals that reached the vertex boundary
    /// and propagate them across the out-edges, both match-side and
    /// insertion-side
    fn check_and_store_jumps(&mut self, vidx: usize, start: i32, end: i32, upper: i32) {
        for idx in start..end {
            let cell = self.scope.i_wf(self.score)[idx as usize];
            if cell.col() == upper {
                self.store_m_jump(vidx, cell, cell.prev_pos, cell.from_matrix);
                self.store_i_jump(vidx, cell, cell.prev_pos, cell.from_matrix);
            }
        }
    }

    /// Propagate a boundary cell into the successors of its vertex on the
    /// match side. The departure diagonal is masked, each arrival is recorded
    /// in the successor's jump ring and immediately extended (which may jump
    /// again at the same score, traversing cycles and empty vertices).
    fn store_m_jump(&mut self, vidx: usize, cell: Cell, prev_pos: i32, prev_tag: Matrix) {
        self.vertices.invalidate_m_jump(vidx, cell.diag);

        let slot = self.score as usize % self.n_scores;
        let n_out = self.graph.vertex(cell.vertex_id).out_edges.len();
        for k in 0..n_out {
            let edge = self.graph.vertex(cell.vertex_id).out_edges[k];
            let new_diag = -cell.offset + edge.overlap as i32;
            let widx = self.vertices.activate(edge.to);
            if !self.vertices.is_valid_diag(WfMatrix::M, widx, new_diag) {
                continue;
            }
            let arrival = Cell {
                vertex_id: edge.to,
                offset: cell.offset,
                diag: new_diag,
                prev_pos,
                from_matrix: prev_tag,
            };
            let pos = self.beyond.push_m_jump(arrival);
            self.vertices.data_mut(widx).m_jumps_positions[slot].push(pos);
            self.extend_cell(Matrix::MJumps, pos);
        }
    }

    /// Propagate a boundary cell into the successors on the insertion side.
    /// Empty-label successors are crossed recursively so a run of them costs
    /// nothing extra.
    fn store_i_jump(&mut self, vidx: usize, cell: Cell, prev_pos: i32, prev_tag: Matrix) {
        self.vertices.invalidate_i_jump(vidx, cell.diag);

        let slot = self.score as usize % self.n_scores;
        let n_out = self.graph.vertex(cell.vertex_id).out_edges.len();
        for k in 0..n_out {
            let edge = self.graph.vertex(cell.vertex_id).out_edges[k];
            let new_diag = -cell.offset + edge.overlap as i32;
            let widx = self.vertices.activate(edge.to);
            if !self.vertices.is_valid_diag(WfMatrix::I, widx, new_diag) {
                continue;
            }
            let arrival = Cell {
                vertex_id: edge.to,
                offset: cell.offset,
                diag: new_diag,
                prev_pos,
                from_matrix: prev_tag,
            };
            let pos = self.beyond.push_i_jump(arrival);
            self.vertices.data_mut(widx).i_jumps_positions[slot].push(pos);

            if self.graph.label_len(edge.to) == 0
                && !self.graph.vertex(edge.to).out_edges.is_empty()
            {
                self.store_i_jump(widx, arrival, pos, Matrix::IJumps);
            }
        }
    }

    /// Matching (LCP) extension of a cell stored in the M or M-jumps arena,
    /// followed by the termination check and boundary jump handling
    fn extend_cell(&mut self, tag: Matrix, pos: i32) {
        let mut cell = self.beyond.resolve(tag, pos);
        let upper = self.graph.label_len(cell.vertex_id);
        let q = self.query.len() as i32;

        {
            let label = self.graph.vertex(cell.vertex_id).label.as_bytes();
            while cell.col() < upper
                && cell.offset < q
                && self.query[cell.offset as usize] == label[cell.col() as usize]
            {
                cell.offset += 1;
            }
        }
        self.beyond.write(tag, pos, cell);

        let terminal = match self.mode {
            AlignMode::Anchored => cell.offset == q,
            AlignMode::Msa { end_vertex } => {
                cell.offset == q && cell.vertex_id == end_vertex && cell.col() == upper
            }
        };
        if terminal && !self.end {
            self.end = true;
            self.start_pos = cell;
            self.start_kind = tag;
        }
        if self.end {
            return;
        }

        if cell.col() == upper && !self.graph.vertex(cell.vertex_id).out_edges.is_empty() {
            let vidx = self.vertices.idx_of(cell.vertex_id) as usize;
            self.store_m_jump(vidx, cell, pos, tag);
        }
    }

    /// Recover the optimal edit script by walking `prev_pos` references from
    /// the terminal cell back to the seed
    fn backtrace(&self) -> Result<(Vec<CigarOp>, Vec<VertexId>), TheseusError> {
        let mut ops: Vec<CigarOp> = Vec::with_capacity(self.query.len() + 16);
        let mut path = vec![self.start_pos.vertex_id];
        let mut curr = self.start_pos;
        let mut curr_kind = self.start_kind;

        while curr.prev_pos != NO_PREV {
            let prev = self.beyond.resolve(curr.from_matrix, curr.prev_pos);
            let prev_kind = curr.from_matrix;

            if curr_kind == Matrix::M {
                // A step within one vertex's matrix
                if curr.diag == prev.diag {
                    // Substitution, then the matches of curr's extension
                    push_matches(&mut ops, curr.offset - prev.offset - 1)?;
                    ops.push(CigarOp::Mismatch);
                } else if curr.diag < prev.diag {
                    let gap = prev.diag - curr.diag;
                    push_matches(&mut ops, curr.offset - (prev.offset + gap))?;
                    for _ in 0..gap {
                        ops.push(CigarOp::Deletion);
                    }
                } else {
                    let gap = curr.diag - prev.diag;
                    push_matches(&mut ops, curr.offset - prev.offset)?;
                    for _ in 0..gap {
                        ops.push(CigarOp::Insertion);
                    }
                }
            } else {
                // curr is a jump-arrival cell: a vertex transition
                push_matches(&mut ops, curr.offset - prev.offset)?;
                self.backtrace_jump(&mut ops, &mut path, &curr, &prev, curr_kind)?;
            }

            curr = prev;
            curr_kind = prev_kind;
        }

        // The seed's own matching extension
        push_matches(&mut ops, curr.offset)?;

        let consumed = ops
            .iter()
            .filter(|op| !matches!(op, CigarOp::Insertion))
            .count();
        if consumed != self.query.len() {
            return Err(TheseusError::InvalidBacktrace(format!(
                "backtrace consumed {consumed} of {} query bases",
                self.query.len()
            )));
        }

        ops.reverse();
        path.reverse();
        Ok((ops, path))
    }

    /// Handle one cross-vertex hop of the backtrace: record the path
    /// vertices and, for insertion-bearing hops, the columns skipped
    fn backtrace_jump(
        &self,
        ops: &mut Vec<CigarOp>,
        path: &mut Vec<VertexId>,
        curr: &Cell,
        prev: &Cell,
        curr_kind: Matrix,
    ) -> Result<(), TheseusError> {
        let from = prev.vertex_id;
        let to = curr.vertex_id;
        // The arrival's diagonal was fixed before its extension, when its
        // offset still equalled the predecessor's.
        let entry_col = curr.diag + prev.offset;
        let boundary_col = prev.col();
        let from_len = self.graph.label_len(from);

        // A match-side jump departs exactly from the boundary and lands
        // exactly on an edge overlap: no columns are skipped.
        if curr_kind == Matrix::MJumps && boundary_col == from_len {
            let direct = self
                .graph
                .vertex(from)
                .out_edges
                .iter()
                .any(|e| e.to == to && e.overlap as i32 == entry_col);
            if direct {
                path.push(from);
                return Ok(());
            }
        }

        // Insertion-bearing hop: recover the intermediate vertex chain and
        // emit one insertion per column consumed between the two endpoints.
        let (dist, intermediates) = self.shortest_jump_path(from, to, entry_col)?;
        let skipped = dist + entry_col - boundary_col;
        if skipped < 0 {
            return Err(TheseusError::InvalidBacktrace(format!(
                "negative column skip between vertices {from} and {to}"
            )));
        }
        for _ in 0..skipped {
            ops.push(CigarOp::Insertion);
        }
        for &vertex in intermediates.iter().rev() {
            path.push(vertex);
        }
        path.push(from);
        Ok(())
    }

    /// Shortest column distance from `from` to `to` over edge weights
    /// `|label| - overlap`, constrained to enter `to` through an edge whose
    /// overlap matches the recorded arrival diagonal. Returns the distance
    /// and the intermediate vertices in from→to order.
    fn shortest_jump_path(
        &self,
        from: VertexId,
        to: VertexId,
        entry_overlap: i32,
    ) -> Result<(i32, Vec<VertexId>), TheseusError> {
        let n = self.graph.num_vertices();
        let mut dist = vec![i32::MAX; n];
        let mut pred: Vec<VertexId> = vec![-1; n];
        let mut heap = BinaryHeap::new();

        dist[from as usize] = 0;
        heap.push(Reverse((0, from)));

        let mut best: Option<(i32, VertexId)> = None;
        while let Some(Reverse((d, v))) = heap.pop() {
            if d > dist[v as usize] {
                continue;
            }
            if let Some((best_d, _)) = best {
                if d >= best_d {
                    break;
                }
            }
            let weight_out = self.graph.label_len(v);
            for edge in &self.graph.vertex(v).out_edges {
                let next = d + weight_out - edge.overlap as i32;
                if edge.to == to && edge.overlap as i32 == entry_overlap {
                    if best.map_or(true, |(best_d, _)| next < best_d) {
                        best = Some((next, v));
                    }
                }
                if next < dist[edge.to as usize] {
                    dist[edge.to as usize] = next;
                    pred[edge.to as usize] = v;
                    heap.push(Reverse((next, edge.to)));
                }
            }
        }

        let (total, last) = best.ok_or_else(|| {
            TheseusError::InvalidBacktrace(format!(
                "no edge path between jump endpoints {from} and {to}"
            ))
        })?;

        let mut intermediates = Vec::new();
        let mut v = last;
        while v != from {
            intermediates.push(v);
            v = pred[v as usize];
        }
        intermediates.reverse();
        Ok((total, intermediates))
    }
}

fn push_matches(ops: &mut Vec<CigarOp>, count: i32) -> Result<(), TheseusError> {
    if count < 0 {
        return Err(TheseusError::InvalidBacktrace(format!(
            "negative match run of length {count}"
        )));
    }
    for _ in 0..count {
        ops.push(CigarOp::Match);
    }
    Ok(())
}

/// Shift cells of a persistent M slice into the scratchpad, keeping the
/// furthest offset per diagonal
fn sparsify_m(
    pad: &mut ScratchPad,
    src: &[Cell],
    range: Range,
    offset_increase: i32,
    diag_shift: i32,
    q: i32,
    upper: i32,
) {
    for idx in range.start..range.end {
        let mut cell = src[idx as usize];
        cell.diag += diag_shift;
        cell.offset += offset_increase;
        cell.prev_pos = idx;
        cell.from_matrix = Matrix::M;
        push_candidate(pad, cell, q, upper);
    }
}

/// Shift jump-arrival cells (resolved through a per-vertex position list)
/// into the scratchpad
#[allow(clippy::too_many_arguments)]
fn sparsify_jumps(
    pad: &mut ScratchPad,
    src: &[Cell],
    positions: &[i32],
    offset_increase: i32,
    diag_shift: i32,
    q: i32,
    upper: i32,
    tag: Matrix,
) {
    for &pos in positions {
        let mut cell = src[pos as usize];
        cell.diag += diag_shift;
        cell.offset += offset_increase;
        cell.prev_pos = pos;
        cell.from_matrix = tag;
        push_candidate(pad, cell, q, upper);
    }
}

/// Shift cells of an I or D slice into the scratchpad; provenance is
/// inherited from the gap-opening cell
fn sparsify_indel(
    pad: &mut ScratchPad,
    src: &[Cell],
    range: Range,
    offset_increase: i32,
    diag_shift: i32,
    q: i32,
    upper: i32,
) {
    for idx in range.start..range.end {
        let mut cell = src[idx as usize];
        cell.diag += diag_shift;
        cell.offset += offset_increase;
        push_candidate(pad, cell, q, upper);
    }
}

fn push_candidate(pad: &mut ScratchPad, cell: Cell, q: i32, upper: i32) {
    if cell.offset > q || cell.col() > upper {
        return;
    }
    let slot = pad.access_or_create(cell.diag);
    if slot.offset < cell.offset {
        *slot = cell;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn single_vertex_aligner() -> TheseusAligner {
        let penalties = Penalties::affine(0, 2, 3, 1).unwrap();
        let gfa = "S\tref\tACCCGTAAAAGGG\n";
        TheseusAligner::from_gfa(penalties, Cursor::new(gfa)).unwrap()
    }

    #[test]
    fn test_empty_query() {
        let mut aligner = single_vertex_aligner();
        let alignment = aligner.align("", 0, 0).unwrap();
        assert!(alignment.edit_op.is_empty());
        assert_eq!(alignment.path, vec![0]);
        assert_eq!(alignment.score, 0);
    }

    #[test]
    fn test_start_position_is_validated() {
        let mut aligner = single_vertex_aligner();
        assert!(aligner.align("ACG", 5, 0).is_err());
        assert!(aligner.align("ACG", 0, 14).is_err());
        assert!(aligner.align("GGG", 0, 10).is_ok());
    }

    #[test]
    fn test_dual_affine_rejected_by_core() {
        let penalties = Penalties::dual_affine(0, 4, 6, 2, 24, 1).unwrap();
        let gfa = "S\tref\tACGT\n";
        assert!(TheseusAligner::from_gfa(penalties, Cursor::new(gfa)).is_err());
    }

    #[test]
    fn test_anchored_start_offset_seeds_the_diagonal() {
        let mut aligner = single_vertex_aligner();
        // Suffix of the label starting at column 10
        let alignment = aligner.align("GGG", 0, 10).unwrap();
        assert_eq!(alignment.cigar_string(), "3M");
        assert_eq!(alignment.score, 0);
    }
}
