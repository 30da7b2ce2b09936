//! Rejection-sampled point fields
//!
//! Every new point is grown off a random already-accepted point, so the field stays
//! connected: each point lies within `max_distance` of something placed before it,
//! never closer than `min_distance` to anything, and within `max_radius` of the
//! generation center.

use std::f32::consts::TAU;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::seed::rng_for;
use crate::consts::{ATTEMPT_GUARD, MAX_RELAX_PASSES, RELAX_FACTOR};
use crate::polar_to_cartesian;

/// What to do when a point cannot be placed within the attempt guard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExhaustionPolicy {
    /// Stop and return what was placed so far (sparse fields such as hubs)
    Abort,
    /// Shrink min distance by 10% and keep going (dense fields)
    Relax,
}

/// How a generation run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldOutcome {
    Complete,
    Exhausted,
    Cancelled,
}

/// Sampling parameters for one field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointFieldParams {
    /// Total points wanted, start point included
    pub count: usize,
    pub min_distance: f32,
    pub max_distance: f32,
    pub max_radius: f32,
    /// Generation center for the radius constraint
    pub center: Vec2,
    pub attempt_guard: u32,
    pub max_relax_passes: u32,
    pub policy: ExhaustionPolicy,
}

impl PointFieldParams {
    pub fn new(count: usize, min_distance: f32, max_distance: f32, max_radius: f32) -> Self {
        Self {
            count,
            min_distance,
            max_distance,
            max_radius,
            center: Vec2::ZERO,
            attempt_guard: ATTEMPT_GUARD,
            max_relax_passes: MAX_RELAX_PASSES,
            policy: ExhaustionPolicy::Relax,
        }
    }

    pub fn with_policy(mut self, policy: ExhaustionPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Generated points plus how the run went
#[derive(Debug, Clone)]
pub struct PointField {
    pub points: Vec<Vec2>,
    pub outcome: FieldOutcome,
    /// Min distance in force when the run ended (lower than requested if relaxed)
    pub min_distance: f32,
    pub relaxed: bool,
}

/// Shared cancellation flag for long sampling runs
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Generate a field from a seed. `points[0]` is always `start`.
pub fn generate(params: &PointFieldParams, seed: i32, start: Vec2) -> PointField {
    let mut rng = rng_for(seed);
    let mut field = generate_around(params, &mut rng, &[start], &CancelToken::new(), &mut |_, _| {});
    field.points.insert(0, start);
    field
}

/// Grow `params.count - anchors.len()` new points off an existing anchor set.
///
/// Anchors count as accepted points for every constraint; only the new points are
/// returned. `on_point` fires once per accepted point with its index in the
/// combined sequence.
pub fn generate_around(
    params: &PointFieldParams,
    rng: &mut Pcg32,
    anchors: &[Vec2],
    cancel: &CancelToken,
    on_point: &mut dyn FnMut(usize, Vec2),
) -> PointField {
    let mut accepted: Vec<Vec2> = anchors.to_vec();
    let mut min_distance = params.min_distance;
    let mut relaxed = false;
    let seeded = anchors.len().max(1);

    let finish = |accepted: Vec<Vec2>, outcome, min_distance, relaxed| PointField {
        points: accepted[seeded..].to_vec(),
        outcome,
        min_distance,
        relaxed,
    };

    if accepted.is_empty() {
        accepted.push(params.center);
    }
    if !(min_distance > 0.0 && min_distance < params.max_distance) {
        log::warn!(
            "Degenerate spacing min={} max={}, nothing generated",
            min_distance,
            params.max_distance
        );
        return finish(accepted, FieldOutcome::Exhausted, min_distance, relaxed);
    }

    let mut attempts = 0u32;
    let mut relax_passes = 0u32;

    while accepted.len() < params.count {
        if cancel.is_cancelled() {
            log::info!("Sampling cancelled at {} of {} points", accepted.len(), params.count);
            return finish(accepted, FieldOutcome::Cancelled, min_distance, relaxed);
        }

        if attempts >= params.attempt_guard {
            match params.policy {
                ExhaustionPolicy::Abort => {
                    log::warn!(
                        "Attempt guard exhausted at {} of {} points, returning early",
                        accepted.len(),
                        params.count
                    );
                    return finish(accepted, FieldOutcome::Exhausted, min_distance, relaxed);
                }
                ExhaustionPolicy::Relax if relax_passes >= params.max_relax_passes => {
                    log::warn!(
                        "Gave up after {} relaxation passes at {} of {} points",
                        relax_passes,
                        accepted.len(),
                        params.count
                    );
                    return finish(accepted, FieldOutcome::Exhausted, min_distance, relaxed);
                }
                ExhaustionPolicy::Relax => {
                    min_distance *= RELAX_FACTOR;
                    relax_passes += 1;
                    relaxed = true;
                    attempts = 0;
                    log::info!("Relaxing min distance to {:.3} (pass {})", min_distance, relax_passes);
                }
            }
        }
        attempts += 1;

        let origin = accepted[rng.random_range(0..accepted.len())];
        let angle = rng.random_range(0.0..TAU);
        let radius = rng.random_range(min_distance..params.max_distance);
        let candidate = origin + polar_to_cartesian(radius, angle);

        if candidate.distance(params.center) > params.max_radius {
            continue;
        }
        if accepted.iter().any(|p| p.distance(candidate) < min_distance) {
            continue;
        }
        if accepted.iter().all(|p| p.distance(candidate) > params.max_distance) {
            continue;
        }

        accepted.push(candidate);
        on_point(accepted.len() - 1, candidate);
        attempts = 0;
    }

    finish(accepted, FieldOutcome::Complete, min_distance, relaxed)
}
