//! Per-active-vertex bookkeeping
//!
//! Every vertex touched by the current query carries three lists of
//! invalid-diagonal intervals (one per matrix) and two rings of jump-arrival
//! positions. An interval masks the diagonals a jump departed from: for a
//! window of scores after the jump, no cheaper path can re-enter them, and
//! the window widens by one diagonal each time a countdown counter runs out.

use crate::penalties::InternalPenalties;
use crate::types::VertexId;

/// Matrix selector for diagonal-validity queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WfMatrix {
    M,
    I,
    D,
}

/// A masked diagonal interval `[start_d, end_d]` with growth countdowns
#[derive(Debug, Clone, Copy)]
pub struct InvalidInterval {
    pub start_d: i32,
    pub end_d: i32,
    /// Scores left until `end_d` grows by one
    pub rem_up: i32,
    /// Scores left until `start_d` grows by one
    pub rem_down: i32,
}

/// Bookkeeping for one active vertex
#[derive(Debug)]
pub struct VertexData {
    pub vertex_id: VertexId,
    pub m_invalid: Vec<InvalidInterval>,
    pub i_invalid: Vec<InvalidInterval>,
    pub d_invalid: Vec<InvalidInterval>,
    /// Ring of M jump-arrival indices (into the M-jumps arena), one slot per score
    pub m_jumps_positions: Vec<Vec<i32>>,
    /// Ring of I jump-arrival indices (into the I-jumps arena), one slot per score
    pub i_jumps_positions: Vec<Vec<i32>>,
}

impl VertexData {
    fn new(vertex_id: VertexId, n_scores: usize) -> Self {
        Self {
            vertex_id,
            m_invalid: Vec::new(),
            i_invalid: Vec::new(),
            d_invalid: Vec::new(),
            m_jumps_positions: (0..n_scores).map(|_| Vec::new()).collect(),
            i_jumps_positions: (0..n_scores).map(|_| Vec::new()).collect(),
        }
    }
}

/// The set of vertices activated during the current query, in activation order
#[derive(Debug)]
pub struct VerticesData {
    n_scores: usize,
    gapo: i32,
    gape: i32,
    active: Vec<VertexData>,
    vertex_to_idx: Vec<i32>,
}

impl VerticesData {
    pub fn new(penalties: &InternalPenalties, num_vertices: usize) -> Self {
        Self {
            n_scores: penalties.n_scores(),
            gapo: penalties.gapo,
            gape: penalties.gape,
            active: Vec::new(),
            vertex_to_idx: vec![-1; num_vertices],
        }
    }

    /// Reset for a new query; the graph may have grown since the last one
    pub fn new_alignment(&mut self, num_vertices: usize) {
        self.active.clear();
        self.vertex_to_idx.clear();
        self.vertex_to_idx.resize(num_vertices, -1);
    }

    /// Clear the ring slot that `score` wraps onto, for every active vertex
    pub fn new_score(&mut self, score: i32) {
        let slot = score as usize % self.n_scores;
        for vdata in &mut self.active {
            vdata.m_jumps_positions[slot].clear();
            vdata.i_jumps_positions[slot].clear();
        }
    }

    pub fn is_active(&self, vertex: VertexId) -> bool {
        self.vertex_to_idx[vertex as usize] != -1
    }

    /// Position of a vertex in the active list, or -1
    pub fn idx_of(&self, vertex: VertexId) -> i32 {
        self.vertex_to_idx[vertex as usize]
    }

    /// Register a vertex on first contact; returns its active-list position
    pub fn activate(&mut self, vertex: VertexId) -> usize {
        let idx = self.vertex_to_idx[vertex as usize];
        if idx != -1 {
            return idx as usize;
        }
        let idx = self.active.len();
        self.vertex_to_idx[vertex as usize] = idx as i32;
        self.active.push(VertexData::new(vertex, self.n_scores));
        idx
    }

    pub fn num_active(&self) -> usize {
        self.active.len()
    }

    pub fn vertex_at(&self, idx: usize) -> VertexId {
        self.active[idx].vertex_id
    }

    pub fn data(&self, idx: usize) -> &VertexData {
        &self.active[idx]
    }

    pub fn data_mut(&mut self, idx: usize) -> &mut VertexData {
        &mut self.active[idx]
    }

    /// Mask the departure diagonal of an M jump in all three matrices
    pub fn invalidate_m_jump(&mut self, idx: usize, diag: i32) {
        let (go, ge) = (self.gapo, self.gape);
        let vdata = &mut self.active[idx];

        vdata.m_invalid.push(InvalidInterval {
            start_d: diag,
            end_d: diag,
            rem_up: go + ge,
            rem_down: go + ge,
        });
        // Initially empty; grows into place as the countdowns expire
        vdata.i_invalid.push(InvalidInterval {
            start_d: diag + 1,
            end_d: diag,
            rem_up: go + ge,
            rem_down: 2 * (go + ge),
        });
        vdata.d_invalid.push(InvalidInterval {
            start_d: diag,
            end_d: diag - 1,
            rem_up: 2 * (go + ge),
            rem_down: go + ge,
        });
    }

    /// Mask the departure diagonal of an I jump in all three matrices
    pub fn invalidate_i_jump(&mut self, idx: usize, diag: i32) {
        let (go, ge) = (self.gapo, self.gape);
        let vdata = &mut self.active[idx];

        vdata.m_invalid.push(InvalidInterval {
            start_d: diag,
            end_d: diag,
            rem_up: ge,
            rem_down: go + ge,
        });
        vdata.i_invalid.push(InvalidInterval {
            start_d: diag,
            end_d: diag,
            rem_up: ge,
            rem_down: 2 * go + 3 * ge,
        });
        vdata.d_invalid.push(InvalidInterval {
            start_d: diag,
            end_d: diag - 1,
            rem_up: go + 2 * ge,
            rem_down: go + ge,
        });
    }

    /// Advance every countdown by one score, widening expired intervals
    pub fn expand(&mut self) {
        let default = self.gape;
        for vdata in &mut self.active {
            for list in [
                &mut vdata.m_invalid,
                &mut vdata.i_invalid,
                &mut vdata.d_invalid,
            ] {
                expand_intervals(list, default, default);
            }
        }
    }

    /// Sort and merge overlapping or adjacent intervals per matrix
    pub fn compact(&mut self) {
        let default = self.gape;
        for vdata in &mut self.active {
            for list in [
                &mut vdata.m_invalid,
                &mut vdata.i_invalid,
                &mut vdata.d_invalid,
            ] {
                compact_intervals(list, default, default);
            }
        }
    }

    /// True unless `diag` falls in a masked interval of the given matrix
    pub fn is_valid_diag(&self, matrix: WfMatrix, idx: usize, diag: i32) -> bool {
        let vdata = &self.active[idx];
        let list = match matrix {
            WfMatrix::M => &vdata.m_invalid,
            WfMatrix::I => &vdata.i_invalid,
            WfMatrix::D => &vdata.d_invalid,
        };
        !list
            .iter()
            .any(|iv| iv.start_d <= diag && diag <= iv.end_d)
    }
}

fn expand_intervals(list: &mut [InvalidInterval], default_up: i32, default_down: i32) {
    for iv in list {
        iv.rem_up -= 1;
        iv.rem_down -= 1;
        if iv.rem_up == 0 {
            iv.rem_up = default_up;
            iv.end_d += 1;
        }
        if iv.rem_down == 0 {
            iv.rem_down = default_down;
            iv.start_d -= 1;
        }
    }
}

fn compact_intervals(list: &mut Vec<InvalidInterval>, default_up: i32, default_down: i32) {
    if list.len() < 2 {
        return;
    }

    list.sort_by_key(|iv| iv.start_d);

    let mut k = 0;
    for l in 1..list.len() {
        let next = list[l];
        let kept = list[k];
        if kept.end_d + 1 >= next.start_d {
            // Counters are combined by minimum after translating by the
            // distance between the segment boundaries they belong to.
            list[k].rem_down = kept
                .rem_down
                .min(next.rem_down + (next.start_d - kept.start_d) * default_down);
            if next.end_d > kept.end_d {
                list[k].end_d = next.end_d;
                list[k].rem_up = next
                    .rem_up
                    .min(kept.rem_up + (next.end_d - kept.end_d) * default_up);
            } else {
                list[k].rem_up = kept
                    .rem_up
                    .min(next.rem_up + (kept.end_d - next.end_d) * default_up);
            }
        } else {
            k += 1;
            list[k] = next;
        }
    }
    list.truncate(k + 1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::penalties::Penalties;

    fn vertices() -> VerticesData {
        let user = Penalties::affine(0, 2, 3, 1).unwrap();
        let internal = InternalPenalties::from_user(&user).unwrap();
        VerticesData::new(&internal, 8)
    }

    #[test]
    fn test_activation_is_idempotent_and_ordered() {
        let mut v = vertices();
        assert_eq!(v.activate(5), 0);
        assert_eq!(v.activate(2), 1);
        assert_eq!(v.activate(5), 0);
        assert_eq!(v.num_active(), 2);
        assert_eq!(v.vertex_at(0), 5);
        assert_eq!(v.idx_of(2), 1);
        assert!(!v.is_active(7));
    }

    #[test]
    fn test_m_jump_masks_only_its_diagonal_at_first() {
        let mut v = vertices();
        v.activate(0);
        v.invalidate_m_jump(0, 4);

        assert!(!v.is_valid_diag(WfMatrix::M, 0, 4));
        assert!(v.is_valid_diag(WfMatrix::M, 0, 3));
        assert!(v.is_valid_diag(WfMatrix::M, 0, 5));
        // I and D start as empty intervals
        assert!(v.is_valid_diag(WfMatrix::I, 0, 4));
        assert!(v.is_valid_diag(WfMatrix::D, 0, 4));
    }

    #[test]
    fn test_expand_grows_after_countdown() {
        let mut v = vertices();
        v.activate(0);
        v.invalidate_m_jump(0, 0);

        // rem_up = rem_down = gapo + gape = 4 for the M interval
        for _ in 0..3 {
            v.expand();
            assert!(v.is_valid_diag(WfMatrix::M, 0, 1));
            assert!(v.is_valid_diag(WfMatrix::M, 0, -1));
        }
        v.expand();
        assert!(!v.is_valid_diag(WfMatrix::M, 0, 1));
        assert!(!v.is_valid_diag(WfMatrix::M, 0, -1));
        assert!(v.is_valid_diag(WfMatrix::M, 0, 2));
    }

    #[test]
    fn test_expand_is_monotone() {
        let mut v = vertices();
        v.activate(0);
        v.invalidate_i_jump(0, 2);

        for _ in 0..20 {
            let before: Vec<(i32, i32)> = v.data(0)
                .m_invalid
                .iter()
                .map(|iv| (iv.start_d, iv.end_d))
                .collect();
            v.expand();
            for (iv, (s, e)) in v.data(0).m_invalid.iter().zip(before) {
                assert!(iv.start_d <= s && iv.end_d >= e);
            }
        }
    }

    #[test]
    fn test_compact_merges_adjacent_intervals() {
        let mut v = vertices();
        v.activate(0);
        v.invalidate_m_jump(0, 3);
        v.invalidate_m_jump(0, 4);
        v.invalidate_m_jump(0, 9);
        v.compact();

        let m_invalid = &v.data(0).m_invalid;
        assert_eq!(m_invalid.len(), 2);
        assert_eq!((m_invalid[0].start_d, m_invalid[0].end_d), (3, 4));
        assert_eq!((m_invalid[1].start_d, m_invalid[1].end_d), (9, 9));

        // Disjointness after compaction
        for (a, b) in m_invalid.iter().zip(m_invalid.iter().skip(1)) {
            assert!(a.end_d < b.start_d);
        }
    }

    #[test]
    fn test_compact_translates_counters() {
        let mut v = vertices();
        v.activate(0);
        // Two M intervals one apart: [0,0] and [1,1], both counters 4
        v.invalidate_m_jump(0, 0);
        v.invalidate_m_jump(0, 1);
        v.compact();

        let m_invalid = &v.data(0).m_invalid;
        assert_eq!(m_invalid.len(), 1);
        assert_eq!((m_invalid[0].start_d, m_invalid[0].end_d), (0, 1));
        // rem_down: min(4, 4 + 1*1) = 4; rem_up: min(4, 4 + 1*1) = 4
        assert_eq!(m_invalid[0].rem_down, 4);
        assert_eq!(m_invalid[0].rem_up, 4);
    }
}
