mod clock;
mod phase;

pub use clock::{ClockState, SessionClock, Tick, MAX_INTERVAL_MS, MIN_INTERVAL_MS};
pub use phase::{CycleCursor, ItemTransition, PhaseScheduler, PhaseTransition, SequenceCursor};
