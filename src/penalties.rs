//! Alignment penalty model
//!
//! User penalties come in linear, affine or dual-affine form. The aligner
//! itself runs on an equivalent internal form whose match penalty is zero and
//! whose remaining penalties are non-negative; the score of a returned CIGAR
//! is always recomputed under the user's original penalties.

use crate::types::{CigarOp, TheseusError};

/// Gap model of a penalty set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapModel {
    Linear,
    Affine,
    DualAffine,
}

/// User-defined alignment penalties. The objective is to minimize the score.
#[derive(Debug, Clone, Copy)]
pub struct Penalties {
    model: GapModel,
    match_score: i32,
    mismatch: i32,
    gapo: i32,
    gape: i32,
    gapo2: i32,
    gape2: i32,
}

impl Penalties {
    /// Create a gap-linear penalty set (every gap position costs `gape`)
    pub fn linear(match_score: i32, mismatch: i32, gape: i32) -> Result<Self, TheseusError> {
        let penalties = Self {
            model: GapModel::Linear,
            match_score,
            mismatch,
            gapo: 0,
            gape,
            gapo2: 0,
            gape2: 0,
        };
        penalties.validate()?;
        Ok(penalties)
    }

    /// Create a gap-affine penalty set
    pub fn affine(
        match_score: i32,
        mismatch: i32,
        gapo: i32,
        gape: i32,
    ) -> Result<Self, TheseusError> {
        let penalties = Self {
            model: GapModel::Affine,
            match_score,
            mismatch,
            gapo,
            gape,
            gapo2: 0,
            gape2: 0,
        };
        penalties.validate()?;
        Ok(penalties)
    }

    /// Create a dual gap-affine penalty set
    pub fn dual_affine(
        match_score: i32,
        mismatch: i32,
        gapo: i32,
        gape: i32,
        gapo2: i32,
        gape2: i32,
    ) -> Result<Self, TheseusError> {
        let penalties = Self {
            model: GapModel::DualAffine,
            match_score,
            mismatch,
            gapo,
            gape,
            gapo2,
            gape2,
        };
        penalties.validate()?;
        Ok(penalties)
    }

    fn validate(&self) -> Result<(), TheseusError> {
        if self.match_score > self.mismatch {
            return Err(TheseusError::InvalidPenalties(format!(
                "match ({}) must not exceed mismatch ({})",
                self.match_score, self.mismatch
            )));
        }
        if self.match_score > self.gape {
            return Err(TheseusError::InvalidPenalties(format!(
                "match ({}) must not exceed gap extension ({})",
                self.match_score, self.gape
            )));
        }
        if self.gape < 0 {
            return Err(TheseusError::InvalidPenalties(format!(
                "gap extension must be non-negative (got {})",
                self.gape
            )));
        }
        if self.model != GapModel::Linear {
            if self.match_score > self.gapo {
                return Err(TheseusError::InvalidPenalties(format!(
                    "match ({}) must not exceed gap open ({})",
                    self.match_score, self.gapo
                )));
            }
            if self.gapo < self.gape {
                return Err(TheseusError::InvalidPenalties(format!(
                    "gap open ({}) must not be smaller than gap extension ({})",
                    self.gapo, self.gape
                )));
            }
        }
        if self.model == GapModel::DualAffine {
            if self.match_score > self.gapo2 || self.match_score > self.gape2 {
                return Err(TheseusError::InvalidPenalties(
                    "match must not exceed the second gap penalties".to_string(),
                ));
            }
            if self.gapo2 < self.gape2 || self.gape2 < 0 {
                return Err(TheseusError::InvalidPenalties(
                    "second gap open must not be smaller than second gap extension".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn model(&self) -> GapModel {
        self.model
    }

    pub fn match_score(&self) -> i32 {
        self.match_score
    }

    pub fn mismatch(&self) -> i32 {
        self.mismatch
    }

    /// Gap open penalty; zero for the linear model
    pub fn gapo(&self) -> i32 {
        self.gapo
    }

    pub fn gape(&self) -> i32 {
        self.gape
    }

    /// Second gap open penalty; zero unless dual-affine
    pub fn gapo2(&self) -> i32 {
        self.gapo2
    }

    /// Second gap extension penalty; zero unless dual-affine
    pub fn gape2(&self) -> i32 {
        self.gape2
    }

    /// Compute the affine gap score of a CIGAR under these penalties.
    ///
    /// A transition M↔I, M↔D or I↔D opens a new gap; consecutive I (or D)
    /// operations extend the open one.
    pub fn score_cigar(&self, edit_op: &[CigarOp]) -> i32 {
        let mut score = 0;
        let mut insertion_open = false;
        let mut deletion_open = false;

        for op in edit_op {
            match op {
                CigarOp::Match => {
                    insertion_open = false;
                    deletion_open = false;
                    score += self.match_score;
                }
                CigarOp::Mismatch => {
                    insertion_open = false;
                    deletion_open = false;
                    score += self.mismatch;
                }
                CigarOp::Insertion => {
                    deletion_open = false;
                    if !insertion_open {
                        insertion_open = true;
                        score += self.gapo + self.gape;
                    } else {
                        score += self.gape;
                    }
                }
                CigarOp::Deletion => {
                    insertion_open = false;
                    if !deletion_open {
                        deletion_open = true;
                        score += self.gapo + self.gape;
                    } else {
                        score += self.gape;
                    }
                }
            }
        }

        score
    }
}

/// Penalties actually driven through the wavefronts: match is zero and the
/// rest are non-negative. When the user's match penalty is non-zero the
/// Eizenga shift is applied; the optimal alignment is unchanged.
#[derive(Debug, Clone, Copy)]
pub(crate) struct InternalPenalties {
    pub mismatch: i32,
    pub gapo: i32,
    pub gape: i32,
}

impl InternalPenalties {
    pub fn from_user(penalties: &Penalties) -> Result<Self, TheseusError> {
        let internal = if penalties.match_score() == 0 {
            Self {
                mismatch: penalties.mismatch(),
                gapo: penalties.gapo(),
                gape: penalties.gape(),
            }
        } else {
            Self {
                mismatch: 2 * penalties.mismatch() - 2 * penalties.match_score(),
                gapo: 2 * penalties.gapo(),
                gape: 2 * penalties.gape() - penalties.match_score(),
            }
        };

        // The score loop looks back mismatch and gape scores; either being
        // zero would make a wavefront reference its own score slot.
        if internal.mismatch <= 0 {
            return Err(TheseusError::InvalidPenalties(
                "mismatch must cost strictly more than a match".to_string(),
            ));
        }
        if internal.gape <= 0 {
            return Err(TheseusError::InvalidPenalties(
                "gap extension must cost strictly more than a match".to_string(),
            ));
        }

        Ok(internal)
    }

    /// Number of score slots the aligner needs to look back
    pub fn n_scores(&self) -> usize {
        ((self.gapo + self.gape).max(self.mismatch) + 1) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CigarOp::{Deletion, Insertion, Match, Mismatch};

    #[test]
    fn test_affine_score() {
        let penalties = Penalties::affine(0, 2, 3, 1).unwrap();

        // 6M X 6M
        let mut ops = vec![Match; 6];
        ops.push(Mismatch);
        ops.extend(vec![Match; 6]);
        assert_eq!(penalties.score_cigar(&ops), 2);

        // A gap run of 3 costs gapo + gape + 2*gape
        let ops = vec![Match, Insertion, Insertion, Insertion, Match];
        assert_eq!(penalties.score_cigar(&ops), 6);

        // I->D reopens the gap
        let ops = vec![Insertion, Deletion];
        assert_eq!(penalties.score_cigar(&ops), 8);
    }

    #[test]
    fn test_match_reward_is_scored() {
        let penalties = Penalties::affine(1, 4, 6, 2).unwrap();
        assert_eq!(penalties.score_cigar(&[Match, Match, Mismatch]), 6);
    }

    #[test]
    fn test_invalid_penalties_rejected() {
        assert!(Penalties::affine(3, 2, 3, 1).is_err());
        assert!(Penalties::affine(0, 2, 1, 3).is_err());
        assert!(Penalties::affine(0, 0, 3, 1).is_err());
        assert!(Penalties::linear(0, 1, 1).is_ok());
    }

    #[test]
    fn test_eizenga_shift() {
        let penalties = Penalties::affine(1, 4, 6, 2).unwrap();
        let internal = InternalPenalties::from_user(&penalties).unwrap();
        assert_eq!(internal.mismatch, 6);
        assert_eq!(internal.gapo, 12);
        assert_eq!(internal.gape, 3);
    }

    #[test]
    fn test_n_scores_covers_lookback() {
        let penalties = Penalties::affine(0, 2, 3, 1).unwrap();
        let internal = InternalPenalties::from_user(&penalties).unwrap();
        assert_eq!(internal.n_scores(), 5);
    }
}
