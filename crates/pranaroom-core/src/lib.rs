//! # Pranaroom Core Library
//!
//! This library provides the guided-practice session engine behind Pranaroom:
//! timed breath cycles, pose sequences and meditation countdowns, with
//! simulated biofeedback and an end-of-session score. The CLI and any other
//! host are thin layers over the same core.
//!
//! ## Architecture
//!
//! - **Technique catalog**: read-only definitions of phase cycles and item
//!   sequences, built in or loaded from TOML
//! - **Session clock**: a pull-based fixed-interval tick source; the host
//!   asks for ticks, nothing runs in the background
//! - **Phase scheduler**: pure functions that advance cycles and sequences
//! - **Biometric simulator**: bounded, mean-reverting sample streams
//! - **Scoring engine**: aggregates samples into a session summary
//! - **Session controller**: the state machine tying these together; the
//!   async [`SessionRunner`] hosts it on Tokio
//!
//! ## Key Components
//!
//! - [`SessionController`]: session lifecycle and tick handling
//! - [`Catalog`]: technique lookup and search
//! - [`EngineConfig`]: TOML-backed configuration
//! - [`Event`]: everything a session reports while it runs

pub mod biometrics;
pub mod error;
pub mod events;
pub mod scoring;
pub mod session;
pub mod storage;
pub mod technique;
pub mod timer;

pub use biometrics::{sim_rng, BiometricSample, BiometricSimulator, SimRng, SimulatorConfig};
pub use error::{CameraError, ClockError, ConfigError, CoreError, SessionError};
pub use events::Event;
pub use scoring::{QualityBand, ScoringConfig, ScoringEngine, SessionSummary};
pub use session::{
    CameraProvider, CameraStatus, CameraStream, Command, SessionController, SessionOutcome,
    SessionReport, SessionRunner, SessionStatus, SessionView, SummarySink,
};
pub use storage::{data_dir, EngineConfig};
pub use technique::{Catalog, PhaseKind, PracticeMode, TechniqueDefinition};
pub use timer::{PhaseScheduler, SessionClock};
