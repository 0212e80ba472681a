//! Curve calculator - converts accumulated XP to level and back
//!
//! Level is never stored; it is always recomputed from `(total_xp,
//! curve_type)`, so two processes with the same inputs must agree. Every
//! curve keeps `level_for_xp` and `xp_for_level` as mutual inverses:
//! `level_for_xp(xp_for_level(l)) == l` for all l >= 0.

use serde::{Deserialize, Serialize};

/// XP required for level 1 under the Standard curve; scale factor for all
/// curves. Below this amount level is always 0.
pub const XP_BASE: i64 = 36;

/// Guard against f64 undershoot when a power lands exactly on an integer
const FLOAT_EPSILON: f64 = 1e-9;

/// Accelerated/Decelerated curve exponent. The ascending and descending
/// directions use this exponent and its reciprocal so they invert exactly.
const CURVE_EXPONENT: f64 = 1.25;

/// Level curve strategy for a guild
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurveType {
    /// `level = floor(sqrt(xp / base))` - quadratic XP requirement
    #[default]
    Standard,
    /// `level = xp / base` - flat XP requirement per level
    Linear,
    /// Early levels come fast, later levels slow down
    Accelerated,
    /// Early levels come slow, later levels speed up
    Decelerated,
    /// Guild-pluggable curve; currently Standard-equivalent
    Custom,
}

impl std::fmt::Display for CurveType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Standard => write!(f, "standard"),
            Self::Linear => write!(f, "linear"),
            Self::Accelerated => write!(f, "accelerated"),
            Self::Decelerated => write!(f, "decelerated"),
            Self::Custom => write!(f, "custom"),
        }
    }
}

impl std::str::FromStr for CurveType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "linear" => Ok(Self::Linear),
            "accelerated" => Ok(Self::Accelerated),
            "decelerated" => Ok(Self::Decelerated),
            "custom" => Ok(Self::Custom),
            _ => Err(format!("Invalid curve type: {s}")),
        }
    }
}

/// Compute the level reached at `xp` under the given curve.
///
/// Negative XP is treated as zero. The result is always non-negative.
#[must_use]
pub fn level_for_xp(xp: i64, curve: CurveType) -> i64 {
    let xp = xp.max(0);
    match curve {
        CurveType::Standard | CurveType::Custom => isqrt(xp / XP_BASE),
        CurveType::Linear => xp / XP_BASE,
        CurveType::Accelerated => powf_floor(xp, 1.0 / CURVE_EXPONENT),
        CurveType::Decelerated => powf_floor(xp, CURVE_EXPONENT),
    }
}

/// Compute the total XP required to reach `level` under the given curve.
///
/// `xp_for_level(0)` is 0 for every curve; the function is strictly
/// increasing in `level` past that.
#[must_use]
pub fn xp_for_level(level: i64, curve: CurveType) -> i64 {
    let level = level.max(0);
    if level == 0 {
        return 0;
    }
    match curve {
        CurveType::Standard | CurveType::Custom => XP_BASE * level * level,
        CurveType::Linear => XP_BASE * level,
        CurveType::Accelerated => powf_ceil(level, CURVE_EXPONENT),
        CurveType::Decelerated => powf_ceil(level, 1.0 / CURVE_EXPONENT),
    }
}

/// XP still needed from `xp` to the next level boundary
#[must_use]
pub fn xp_to_next_level(xp: i64, curve: CurveType) -> i64 {
    let next = level_for_xp(xp, curve) + 1;
    (xp_for_level(next, curve) - xp.max(0)).max(0)
}

/// Progress within the current level: `(xp_into_level, level_span)`.
///
/// Used by profile cards to draw the progress bar.
#[must_use]
pub fn level_progress(xp: i64, curve: CurveType) -> (i64, i64) {
    let xp = xp.max(0);
    let level = level_for_xp(xp, curve);
    let floor = xp_for_level(level, curve);
    let ceiling = xp_for_level(level + 1, curve);
    (xp - floor, (ceiling - floor).max(1))
}

/// `floor((xp / base) ^ exponent)` with an epsilon nudge so exact integer
/// powers are not lost to f64 rounding
fn powf_floor(xp: i64, exponent: f64) -> i64 {
    let ratio = xp as f64 / XP_BASE as f64;
    if ratio < 1.0 {
        return 0;
    }
    (ratio.powf(exponent) + FLOAT_EPSILON).floor() as i64
}

/// `ceil(base * level ^ exponent)`, the descending counterpart of
/// `powf_floor` with the reciprocal exponent
fn powf_ceil(level: i64, exponent: f64) -> i64 {
    (XP_BASE as f64 * (level as f64).powf(exponent) - FLOAT_EPSILON).ceil() as i64
}

/// Integer square root (floor)
fn isqrt(n: i64) -> i64 {
    if n <= 0 {
        return 0;
    }
    let mut root = (n as f64).sqrt() as i64;
    // f64 sqrt can be off by one near perfect squares
    while root * root > n {
        root -= 1;
    }
    while (root + 1) * (root + 1) <= n {
        root += 1;
    }
    root
}
