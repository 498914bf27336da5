mod camera;
mod controller;
mod report;
mod runner;
mod state;
mod view;

pub use camera::{
    CameraFuture, CameraLease, CameraProvider, CameraResult, CameraStatus, CameraStream,
};
pub use controller::SessionController;
pub use report::{SessionReport, SummarySink};
pub use runner::{Command, SessionRunner};
pub use state::{Progress, SessionOutcome, SessionState, SessionStatus};
pub use view::{ItemView, PhaseView, SessionView};
