//! Adaptive wander-target search
//!
//! Shared by every wander-style task. Pathfinding failures are not errors:
//! they feed two persisted counters that shrink the search radius while the
//! entity keeps failing and grow it back once it succeeds.
//!
//! - `failedConsecutivePathfinds` counts searches (or walks) that failed in
//!   a row; a success pays back 3.
//! - `wanderRangeMul` scales every sampled offset and stays in `[0.1, 1.0]`.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::context::BehaviorEnv;
use crate::core::types::{block_pos, IVec3, Vec3};
use crate::entity::attributes::AttributeTree;
use crate::entity::environment::WorldAccess;

pub const WANDER_RANGE_MUL_KEY: &str = "wanderRangeMul";
pub const FAILED_PATHFINDS_KEY: &str = "failedConsecutivePathfinds";

pub const MIN_RANGE_MUL: f32 = 0.1;
pub const MAX_RANGE_MUL: f32 = 1.0;

/// Failures tolerated before the range starts shrinking
pub const FAILURE_THRESHOLD: i64 = 10;

const SEARCH_ATTEMPTS: usize = 9;
const SUCCESS_PAYBACK: i64 = 3;
const SHRINK_FACTOR: f32 = 0.9;
const GROW_FACTOR: f32 = 1.1;
const BONUS_GROW_CHANCE: f32 = 0.05;
const BONUS_GROW_FACTOR: f32 = 1.5;
const WIDE_ATTEMPT_CHANCE: f32 = 0.05;
const WIDE_ATTEMPT_SCALE: f32 = 3.0;

/// Medium a candidate target must be in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Medium {
    /// Open air cell resting on a solid block
    #[default]
    Land,
    /// Liquid cell
    Liquid,
}

impl Medium {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "land" => Some(Medium::Land),
            "liquid" | "water" => Some(Medium::Liquid),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    pub horizontal_min: f32,
    pub horizontal_max: f32,
    pub vertical_max: f32,
    pub preferred_light: Option<f32>,
    pub medium: Medium,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            horizontal_min: 3.0,
            horizontal_max: 30.0,
            vertical_max: 10.0,
            preferred_light: None,
            medium: Medium::Land,
        }
    }
}

/// The two persisted counters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptiveCounters {
    pub failed_consecutive_pathfinds: i64,
    pub wander_range_mul: f32,
}

impl AdaptiveCounters {
    pub fn load(attrs: &AttributeTree) -> Self {
        Self {
            failed_consecutive_pathfinds: attrs.get_int_or(FAILED_PATHFINDS_KEY, 0).max(0),
            wander_range_mul: (attrs.get_float_or(WANDER_RANGE_MUL_KEY, MAX_RANGE_MUL as f64) as f32)
                .clamp(MIN_RANGE_MUL, MAX_RANGE_MUL),
        }
    }

    pub fn save(&self, attrs: &mut AttributeTree) {
        attrs.set_int(FAILED_PATHFINDS_KEY, self.failed_consecutive_pathfinds);
        attrs.set_float(WANDER_RANGE_MUL_KEY, self.wander_range_mul as f64);
    }
}

/// Shrink or grow `wanderRangeMul` from the current failure streak.
/// Runs once per search, before sampling. Returns the new multiplier.
pub fn update_range_multiplier<R: Rng + ?Sized>(attrs: &mut AttributeTree, rng: &mut R) -> f32 {
    let mut counters = AdaptiveCounters::load(attrs);
    let mut mul = counters.wander_range_mul;

    if counters.failed_consecutive_pathfinds > FAILURE_THRESHOLD {
        mul = (mul * SHRINK_FACTOR).max(MIN_RANGE_MUL);
    } else {
        mul = (mul * GROW_FACTOR).min(MAX_RANGE_MUL);
        if rng.gen::<f32>() < BONUS_GROW_CHANCE {
            mul = (mul * BONUS_GROW_FACTOR).min(MAX_RANGE_MUL);
        }
    }

    counters.wander_range_mul = mul;
    counters.save(attrs);
    mul
}

/// Count one failed walk or search
pub fn record_failure(attrs: &mut AttributeTree) {
    let mut counters = AdaptiveCounters::load(attrs);
    counters.failed_consecutive_pathfinds += 1;
    counters.save(attrs);
}

fn record_success(attrs: &mut AttributeTree) {
    let mut counters = AdaptiveCounters::load(attrs);
    counters.failed_consecutive_pathfinds = (counters.failed_consecutive_pathfinds - SUCCESS_PAYBACK).max(0);
    counters.save(attrs);
}

/// Heavy-tailed sample in `[min, max]`: mostly near `min`, rarely far out
pub fn strong_inverse_exp<R: Rng + ?Sized>(rng: &mut R, min: f32, max: f32) -> f32 {
    let u: f32 = rng.gen();
    min + (max - min).max(0.0) * u * u * u
}

fn random_sign<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    if rng.gen::<bool>() {
        1.0
    } else {
        -1.0
    }
}

/// Score a candidate cell: 0 when it is not in the required medium,
/// otherwise a weight that falls off with vertical distance (and with
/// distance from the preferred light level, if one is set).
/// Returns the score and the position the entity would actually stand at.
pub fn score_candidate(world: &dyn WorldAccess, origin: Vec3, candidate: Vec3, params: &SearchParams) -> (f32, Vec3) {
    let settled = match params.medium {
        Medium::Land => match settle_on_ground(world, candidate, params.vertical_max) {
            Some(pos) => pos,
            None => return (0.0, candidate),
        },
        Medium::Liquid => {
            if !world.block(block_pos(candidate)).liquid {
                return (0.0, candidate);
            }
            candidate
        }
    };

    let dy = (settled.y - origin.y).abs();
    let mut weight = 1.0 / (dy + 1.0);
    if let Some(preferred) = params.preferred_light {
        let light = world.light_level(block_pos(settled)) as f32;
        weight /= 1.0 + (light - preferred).abs();
    }
    (weight, settled)
}

/// Nearest standable cell (air above solid ground) to `pos` within
/// `max_shift` blocks up or down, as the bottom-centre of that cell.
fn settle_on_ground(world: &dyn WorldAccess, pos: Vec3, max_shift: f32) -> Option<Vec3> {
    let start = block_pos(pos);
    let reach = max_shift.max(0.0).ceil() as i32;
    for shift in 0..=reach {
        for dy in [-shift, shift] {
            let cell = start + IVec3::new(0, dy, 0);
            if is_standable(world, cell) {
                return Some(Vec3::new(pos.x, cell.y as f32, pos.z));
            }
            if shift == 0 {
                break;
            }
        }
    }
    None
}

fn is_standable(world: &dyn WorldAccess, cell: IVec3) -> bool {
    let here = world.block(cell);
    let below = world.block(cell - IVec3::Y);
    !here.solid && !here.liquid && below.solid
}

/// Sample up to 9 candidates around the entity and keep the best.
/// Updates both adaptive counters; `None` means no valid target.
pub fn find_wander_target(env: &mut BehaviorEnv, params: &SearchParams) -> Option<Vec3> {
    let mul = update_range_multiplier(&mut env.entity.attributes, &mut *env.rng);
    let origin = env.entity.pos;

    let mut best: Option<(Vec3, f32)> = None;
    for _ in 0..SEARCH_ATTEMPTS {
        let scale = if env.rng.gen::<f32>() < WIDE_ATTEMPT_CHANCE {
            mul * WIDE_ATTEMPT_SCALE
        } else {
            mul
        };

        let dx = strong_inverse_exp(&mut *env.rng, params.horizontal_min, params.horizontal_max) * random_sign(&mut *env.rng);
        let dz = strong_inverse_exp(&mut *env.rng, params.horizontal_min, params.horizontal_max) * random_sign(&mut *env.rng);
        let dy = strong_inverse_exp(&mut *env.rng, 0.0, params.vertical_max) * random_sign(&mut *env.rng);
        let candidate = origin + Vec3::new(dx, dy, dz) * scale;

        let (score, settled) = score_candidate(env.world, origin, candidate, params);
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((settled, score));
        }
        if score >= 1.0 {
            break;
        }
    }

    match best {
        Some((target, score)) if score > 0.0 => {
            record_success(&mut env.entity.attributes);
            Some(target)
        }
        _ => {
            record_failure(&mut env.entity.attributes);
            tracing::debug!(entity = %env.entity.id, "wander search found no valid target");
            None
        }
    }
}
