//! Placement engine
//!
//! Computes a non-overlapping top-left position for a new item given every
//! item already on the board.
//!
//! # Algorithm
//!
//! 1. Without a declared position, seed with a random point inside the working bounds.
//! 2. Test the candidate rectangle against every existing item (AABB overlap).
//! 3. On overlap, move the candidate below the lowest-extending item plus `gap`,
//!    keeping x. Nothing sits below that line, so one step resolves the collision.
//! 4. If that line is past the bottom of the working bounds, draw a fresh random
//!    position and try again.
//! 5. Give up after `MAX_PLACEMENT_ATTEMPTS` and return the last position tested.
//!
//! Each attempt is O(N) in the number of existing items.

use rand::Rng;
use sdk::types::{Item, Rect};
use tracing::debug;

/// Retry ceiling for a single placement
pub const MAX_PLACEMENT_ATTEMPTS: u32 = 50;

/// Default padding between a stacked item and the lowest existing item
pub const DEFAULT_GAP: f64 = 40.0;

/// Finite rectangle random positions are drawn from
///
/// Items may still end up outside it: explicit positions are never clamped and
/// the stacking fallback can run past the bottom edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkingBounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Default for WorkingBounds {
    fn default() -> Self {
        Self {
            min_x: 0.0,
            min_y: 0.0,
            max_x: 4000.0,
            max_y: 3000.0,
        }
    }
}

impl WorkingBounds {
    /// Whether a top-left point lies inside the bounds
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Random top-left point keeping an item of the given size inside the bounds
    /// when it fits, pinned to the minimum edge when it doesn't.
    pub fn random_point<R: Rng + ?Sized>(&self, width: f64, height: f64, rng: &mut R) -> (f64, f64) {
        let x = random_in(self.min_x, self.max_x - width, rng);
        let y = random_in(self.min_y, self.max_y - height, rng);
        (x, y)
    }
}

fn random_in<R: Rng + ?Sized>(low: f64, high: f64, rng: &mut R) -> f64 {
    // gen_range panics on a span that overflows f64
    if high > low && (high - low).is_finite() {
        rng.gen_range(low..high)
    } else {
        low
    }
}

/// Item about to be placed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub width: f64,
    pub height: f64,
    pub position: Option<(f64, f64)>,
}

/// How a placement ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementOutcome {
    /// Position overlaps nothing
    Clear,
    /// Retry budget spent; position may overlap
    Exhausted,
}

/// Result of a placement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    /// Positions tested, at most `MAX_PLACEMENT_ATTEMPTS`
    pub attempts: u32,
    pub outcome: PlacementOutcome,
}

/// Collision-avoiding auto-placement
#[derive(Debug, Clone)]
pub struct PlacementEngine {
    bounds: WorkingBounds,
    gap: f64,
    max_attempts: u32,
}

impl Default for PlacementEngine {
    fn default() -> Self {
        Self::new(WorkingBounds::default(), DEFAULT_GAP)
    }
}

impl PlacementEngine {
    pub fn new(bounds: WorkingBounds, gap: f64) -> Self {
        Self {
            bounds,
            gap,
            max_attempts: MAX_PLACEMENT_ATTEMPTS,
        }
    }

    pub fn bounds(&self) -> WorkingBounds {
        self.bounds
    }

    /// Place a candidate using the thread-local random source
    pub fn place(&self, candidate: Candidate, existing: &[Item]) -> Placement {
        self.place_with_rng(candidate, existing, &mut rand::thread_rng())
    }

    /// Place a candidate with an explicit random source
    pub fn place_with_rng<R: Rng + ?Sized>(
        &self,
        candidate: Candidate,
        existing: &[Item],
        rng: &mut R,
    ) -> Placement {
        let Candidate { width, height, .. } = candidate;
        let mut position = candidate
            .position
            .unwrap_or_else(|| self.bounds.random_point(width, height, rng));

        // Existing items never move during a placement, so the stacking line is fixed.
        let lowest_bottom = existing
            .iter()
            .map(|item| item.y + item.height)
            .fold(f64::NEG_INFINITY, f64::max);
        let stacked_y = lowest_bottom + self.gap;

        for attempt in 1..=self.max_attempts {
            let rect = Rect::new(position.0, position.1, width, height);
            if !existing.iter().any(|item| item.rect().overlaps(&rect)) {
                debug!(
                    "Placed {}x{} at ({}, {}) after {} attempt(s)",
                    width, height, position.0, position.1, attempt
                );
                return Placement {
                    x: position.0,
                    y: position.1,
                    attempts: attempt,
                    outcome: PlacementOutcome::Clear,
                };
            }

            if attempt == self.max_attempts {
                break;
            }

            position = if stacked_y > self.bounds.max_y {
                self.bounds.random_point(width, height, rng)
            } else {
                (position.0, stacked_y)
            };
        }

        Placement {
            x: position.0,
            y: position.1,
            attempts: self.max_attempts,
            outcome: PlacementOutcome::Exhausted,
        }
    }
}
