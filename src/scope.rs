//! Circular per-score storage
//!
//! The I and D wavefronts (and the per-vertex range vectors of all three
//! matrices) are only ever read back within `n_scores` of being written, so
//! they live in a circular queue of score slots. The slot for a score is
//! cleared right before that score is computed; data from `n_scores` ago is
//! never observable.

use crate::types::{Cell, Range};

#[derive(Debug, Default)]
struct ScoreSlot {
    i_wf: Vec<Cell>,
    d_wf: Vec<Cell>,
    /// Per-vertex slices of the persistent M wavefront written at this score
    m_pos: Vec<Range>,
    i_pos: Vec<Range>,
    d_pos: Vec<Range>,
}

impl ScoreSlot {
    fn clear(&mut self) {
        self.i_wf.clear();
        self.d_wf.clear();
        self.m_pos.clear();
        self.i_pos.clear();
        self.d_pos.clear();
    }
}

/// Short-memory wavefront storage over the last `n_scores` scores
#[derive(Debug)]
pub struct Scope {
    slots: Vec<ScoreSlot>,
}

impl Scope {
    pub fn new(n_scores: usize) -> Self {
        let mut slots = Vec::with_capacity(n_scores);
        for _ in 0..n_scores {
            slots.push(ScoreSlot::default());
        }
        Self { slots }
    }

    pub fn size(&self) -> usize {
        self.slots.len()
    }

    /// Clear every slot for a fresh alignment
    pub fn new_alignment(&mut self) {
        for slot in &mut self.slots {
            slot.clear();
        }
    }

    /// Reclaim the slot that `score` wraps onto
    pub fn new_score(&mut self, score: i32) {
        let idx = score as usize % self.slots.len();
        self.slots[idx].clear();
    }

    fn slot(&self, score: i32) -> &ScoreSlot {
        &self.slots[score as usize % self.slots.len()]
    }

    fn slot_mut(&mut self, score: i32) -> &mut ScoreSlot {
        let idx = score as usize % self.slots.len();
        &mut self.slots[idx]
    }

    pub fn i_wf(&self, score: i32) -> &Vec<Cell> {
        &self.slot(score).i_wf
    }

    pub fn i_wf_mut(&mut self, score: i32) -> &mut Vec<Cell> {
        &mut self.slot_mut(score).i_wf
    }

    pub fn d_wf(&self, score: i32) -> &Vec<Cell> {
        &self.slot(score).d_wf
    }

    pub fn d_wf_mut(&mut self, score: i32) -> &mut Vec<Cell> {
        &mut self.slot_mut(score).d_wf
    }

    pub fn m_pos(&self, score: i32) -> &Vec<Range> {
        &self.slot(score).m_pos
    }

    pub fn m_pos_mut(&mut self, score: i32) -> &mut Vec<Range> {
        &mut self.slot_mut(score).m_pos
    }

    pub fn i_pos(&self, score: i32) -> &Vec<Range> {
        &self.slot(score).i_pos
    }

    pub fn i_pos_mut(&mut self, score: i32) -> &mut Vec<Range> {
        &mut self.slot_mut(score).i_pos
    }

    pub fn d_pos(&self, score: i32) -> &Vec<Range> {
        &self.slot(score).d_pos
    }

    pub fn d_pos_mut(&mut self, score: i32) -> &mut Vec<Range> {
        &mut self.slot_mut(score).d_pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Matrix, NO_PREV};

    fn cell(offset: i32) -> Cell {
        Cell {
            vertex_id: 0,
            offset,
            diag: 0,
            prev_pos: NO_PREV,
            from_matrix: Matrix::M,
        }
    }

    #[test]
    fn test_slots_wrap_and_clear() {
        let mut scope = Scope::new(3);

        scope.i_wf_mut(1).push(cell(4));
        scope.i_pos_mut(1).push(Range { start: 0, end: 1 });
        assert_eq!(scope.i_wf(1).len(), 1);

        // Score 4 reuses slot 1; reclaiming it drops the stale data
        scope.new_score(4);
        assert!(scope.i_wf(4).is_empty());
        assert!(scope.i_pos(4).is_empty());
    }

    #[test]
    fn test_new_alignment_clears_everything() {
        let mut scope = Scope::new(2);
        scope.d_wf_mut(0).push(cell(1));
        scope.m_pos_mut(1).push(Range { start: 2, end: 5 });
        scope.new_alignment();
        assert!(scope.d_wf(0).is_empty());
        assert!(scope.m_pos(1).is_empty());
    }
}
