//! Candidate ranking.
//!
//! `combined = pixel * w_pixel + (vision ?? pixel) * w_vision`
//!
//! Weights are normalised to sum to 1, so the combined score stays on the
//! 0-100 scale and an unavailable oracle degrades to the pixel score alone.
//!
//! The ranker also keeps the brightest dark-rejected frame, used only when
//! no candidate passes the brightness gate.

use vthumb_models::{SelectionKind, VisionVerdict};

/// Normalised combined-score weights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankWeights {
    pixel: f64,
    vision: f64,
}

impl RankWeights {
    /// Normalise `pixel : vision`. Invalid input falls back to 0.4 : 0.6.
    pub fn new(pixel: f64, vision: f64) -> Self {
        let valid = |w: f64| w.is_finite() && w >= 0.0;
        let total = pixel + vision;
        if !valid(pixel) || !valid(vision) || total <= 0.0 {
            return Self::default();
        }
        Self {
            pixel: pixel / total,
            vision: vision / total,
        }
    }

    pub fn pixel(&self) -> f64 {
        self.pixel
    }

    pub fn vision(&self) -> f64 {
        self.vision
    }

    /// Fuse a pixel score with an oracle verdict.
    pub fn combine(&self, pixel_score: f64, verdict: VisionVerdict) -> f64 {
        let vision = verdict.score().unwrap_or(pixel_score);
        pixel_score * self.pixel + vision * self.vision
    }

    /// Highest combined score reachable with the given pixel score.
    pub fn ceiling(&self, pixel_score: f64) -> f64 {
        pixel_score * self.pixel + 100.0 * self.vision
    }
}

impl Default for RankWeights {
    fn default() -> Self {
        Self {
            pixel: 0.4,
            vision: 0.6,
        }
    }
}

/// A scored frame, with its encoded image.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub timestamp_secs: f64,
    pub brightness: f64,
    pub pixel_score: f64,
    pub vision: VisionVerdict,
    pub combined_score: f64,
    pub jpeg: Vec<u8>,
}

/// The frame chosen at the end of a run.
#[derive(Debug, Clone)]
pub struct Selection {
    pub candidate: Candidate,
    pub kind: SelectionKind,
}

/// Tracks the best accepted candidate and the dark fallback.
#[derive(Debug, Default)]
pub struct CandidateRanker {
    weights: RankWeights,
    best: Option<Candidate>,
    fallback: Option<Candidate>,
}

impl CandidateRanker {
    pub fn new(weights: RankWeights) -> Self {
        Self {
            weights,
            best: None,
            fallback: None,
        }
    }

    pub fn weights(&self) -> RankWeights {
        self.weights
    }

    /// Best combined score so far among accepted candidates.
    pub fn best_score(&self) -> Option<f64> {
        self.best.as_ref().map(|c| c.combined_score)
    }

    /// Whether the oracle could still make this candidate the winner.
    pub fn oracle_could_help(&self, pixel_score: f64) -> bool {
        match self.best_score() {
            Some(best) => self.weights.ceiling(pixel_score) > best,
            None => true,
        }
    }

    /// Score and offer an accepted candidate. Returns its combined score
    /// and whether it became the new best.
    pub fn offer(
        &mut self,
        timestamp_secs: f64,
        brightness: f64,
        pixel_score: f64,
        vision: VisionVerdict,
        jpeg: Vec<u8>,
    ) -> (f64, bool) {
        let combined_score = self.weights.combine(pixel_score, vision);
        // Ties keep the earlier candidate
        let improves = self
            .best_score()
            .map_or(true, |best| combined_score > best);

        if improves {
            self.best = Some(Candidate {
                timestamp_secs,
                brightness,
                pixel_score,
                vision,
                combined_score,
                jpeg,
            });
        }
        (combined_score, improves)
    }

    /// Whether a dark frame of this brightness would replace the fallback.
    pub fn improves_fallback(&self, brightness: f64) -> bool {
        self.fallback
            .as_ref()
            .map_or(true, |f| brightness > f.brightness)
    }

    /// Keep a dark-rejected frame if it is the brightest seen so far.
    pub fn offer_dark(&mut self, timestamp_secs: f64, brightness: f64, pixel_score: f64, jpeg: Vec<u8>) {
        if !self.improves_fallback(brightness) {
            return;
        }
        self.fallback = Some(Candidate {
            timestamp_secs,
            brightness,
            pixel_score,
            vision: VisionVerdict::Unavailable,
            combined_score: self.weights.combine(pixel_score, VisionVerdict::Unavailable),
            jpeg,
        });
    }

    /// The winner: best accepted candidate, else the dark fallback.
    pub fn finish(self) -> Option<Selection> {
        match (self.best, self.fallback) {
            (Some(candidate), _) => Some(Selection {
                candidate,
                kind: SelectionKind::Ranked,
            }),
            (None, Some(candidate)) => Some(Selection {
                candidate,
                kind: SelectionKind::DarkFallback,
            }),
            (None, None) => None,
        }
    }
}
