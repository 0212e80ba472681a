//! Level curve math - pure conversion between accumulated XP and level

mod curve;

pub use curve::{
    level_for_xp, level_progress, xp_for_level, xp_to_next_level, CurveType, XP_BASE,
};
