//! Domain events

mod level_event;

pub use level_event::LevelChange;
