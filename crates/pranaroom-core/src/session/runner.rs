//! Tokio host loop for a [`SessionController`].
//!
//! One `select!` loop owns the controller. It ticks on a deadline-driven
//! `Sleep`, applies UI commands from an `mpsc` channel, and awaits the camera
//! acquisition alongside, so a slow camera never delays a tick. After every
//! step the current [`SessionView`] is published on a `watch` channel, and
//! the events of that step go to the optional event channel.
//!
//! A pause holds the time left until the next tick and a resume restores
//! it, so a tick always stands for one interval of unpaused wall-clock time.

use std::future::pending;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, trace};

use super::camera::{CameraFuture, CameraProvider, CameraStatus};
use super::controller::SessionController;
use super::report::SessionReport;
use super::state::SessionStatus;
use super::view::SessionView;
use crate::error::{CameraError, SessionError};
use crate::events::Event;

/// User intent delivered to a running session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Pause,
    Resume,
    Stop,
    Abort,
}

pub struct SessionRunner {
    controller: SessionController,
    camera: Option<Arc<dyn CameraProvider>>,
    events: Option<mpsc::UnboundedSender<Event>>,
}

impl SessionRunner {
    /// Wrap a controller whose session has already been started.
    pub fn new(controller: SessionController) -> Self {
        Self {
            controller,
            camera: None,
            events: None,
        }
    }

    pub fn with_camera(mut self, provider: Arc<dyn CameraProvider>) -> Self {
        self.camera = Some(provider);
        self
    }

    /// Forward every event the session produces while running. Without an
    /// event channel the host observes the session through the view only.
    pub fn with_events(mut self, events: mpsc::UnboundedSender<Event>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    /// Drive the session until it completes or is ended.
    ///
    /// Dropping every command sender aborts the session, the same as the
    /// user leaving the session screen.
    ///
    /// # Errors
    ///
    /// [`SessionError::InvalidTransition`] when no session is live, and
    /// [`SessionError::ClockFailed`] when the clock cannot be resumed.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        view: watch::Sender<SessionView>,
    ) -> Result<SessionReport, SessionError> {
        let status = self.controller.status();
        let Some(session_id) = self.controller.session_id().filter(|_| status.is_live()) else {
            return Err(SessionError::InvalidTransition {
                command: "run",
                status,
            });
        };

        let period = self.controller.tick_interval();
        let mut deadline = Instant::now() + period;
        let ticker = sleep_until(deadline);
        tokio::pin!(ticker);
        // Time left until the next tick, held while the session is paused.
        let mut held: Option<Duration> = (status == SessionStatus::Paused).then_some(period);

        let mut acquisition: Option<CameraFuture> = None;
        if *self.controller.camera_status() == CameraStatus::Pending {
            match &self.camera {
                Some(provider) => acquisition = Some(provider.acquire()),
                None => {
                    let events = self.controller.attach_camera(
                        session_id,
                        Err(CameraError::Unavailable("no camera provider".into())),
                    );
                    self.publish(events);
                }
            }
        }
        view.send_replace(self.controller.view());

        while !self.controller.status().is_terminal() {
            tokio::select! {
                () = &mut ticker, if held.is_none() => {
                    let events = self.controller.tick();
                    trace!(events = events.len(), "tick");
                    self.publish(events);

                    deadline += period;
                    let now = Instant::now();
                    if deadline < now {
                        // Missed ticks are delayed, never burst.
                        deadline = now + period;
                    }
                    ticker.as_mut().reset(deadline);
                }
                command = commands.recv() => match command {
                    Some(command) => {
                        let was_paused = self.controller.status() == SessionStatus::Paused;
                        self.apply(command)?;
                        match (was_paused, self.controller.status()) {
                            (false, SessionStatus::Paused) => {
                                held = Some(deadline.saturating_duration_since(Instant::now()));
                            }
                            (true, SessionStatus::Active) => {
                                if let Some(remaining) = held.take() {
                                    deadline = Instant::now() + remaining;
                                    ticker.as_mut().reset(deadline);
                                }
                            }
                            _ => {}
                        }
                    }
                    None => {
                        debug!("command channel closed, aborting session");
                        let events = self.controller.abort()?;
                        self.publish(events);
                    }
                },
                result = async {
                    match acquisition.as_mut() {
                        Some(future) => future.await,
                        None => pending().await,
                    }
                } => {
                    acquisition = None;
                    let events = self.controller.attach_camera(session_id, result);
                    self.publish(events);
                }
            }
            view.send_replace(self.controller.view());
        }

        // An acquisition still in flight is cancelled by dropping it.
        drop(acquisition);
        self.controller
            .report()
            .cloned()
            .ok_or(SessionError::ChannelClosed)
    }

    fn apply(&mut self, command: Command) -> Result<(), SessionError> {
        debug!(?command, "command received");
        let outcome = match command {
            Command::Pause => self.controller.pause().map(|event| vec![event]),
            Command::Resume => self.controller.resume().map(|event| vec![event]),
            Command::Stop => self.controller.stop(),
            Command::Abort => self.controller.abort(),
        };
        match outcome {
            Ok(events) => {
                self.publish(events);
                Ok(())
            }
            Err(SessionError::InvalidTransition { command, status }) => {
                debug!(command, ?status, "command ignored");
                Ok(())
            }
            Err(e) => {
                if let SessionError::ClockFailed { events, .. } = &e {
                    self.publish(events.clone());
                }
                Err(e)
            }
        }
    }

    fn publish(&self, events: Vec<Event>) {
        let Some(tx) = &self.events else {
            return;
        };
        for event in events {
            if tx.send(event).is_err() {
                trace!("event receiver dropped");
                return;
            }
        }
    }
}
