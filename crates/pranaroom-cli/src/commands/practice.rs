use std::sync::Arc;
use std::time::Duration;

use clap::{Args, ValueEnum};
use pranaroom_core::session::{CameraFuture, CameraResult};
use pranaroom_core::{
    CameraError, CameraProvider, CameraStatus, CameraStream, Command, CoreError, EngineConfig,
    Event, SessionController, SessionReport, SessionRunner, SessionView, SummarySink,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tracing::debug;

/// Delay before the simulated camera answers.
const CAMERA_DELAY: Duration = Duration::from_millis(400);

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum CameraArg {
    Ok,
    Denied,
    Unavailable,
}

impl CameraArg {
    fn resolve(self) -> CameraResult {
        match self {
            CameraArg::Ok => Ok(Box::new(TerminalCamera)),
            CameraArg::Denied => Err(CameraError::Denied),
            CameraArg::Unavailable => Err(CameraError::Unavailable("no video device".into())),
        }
    }
}

#[derive(Args)]
pub struct PracticeArgs {
    /// Technique id (see `techniques list`)
    pub id: String,
    /// Session length for breath work, hold per pose, or sit length, in seconds
    #[arg(long)]
    pub duration: Option<u64>,
    /// Seed for the biometric simulator
    #[arg(long)]
    pub seed: Option<u64>,
    /// Deliver ticks back to back instead of waiting on the clock
    #[arg(long)]
    pub simulate: bool,
    /// Stop the session after this many seconds
    #[arg(long)]
    pub max_secs: Option<u64>,
    /// Outcome of the simulated camera for pose sessions
    #[arg(long, value_enum, default_value_t = CameraArg::Ok)]
    pub camera: CameraArg,
}

struct TerminalCamera;

impl CameraStream for TerminalCamera {
    fn label(&self) -> String {
        "Simulated camera".into()
    }

    fn release(&mut self) {
        debug!("simulated camera released");
    }
}

struct SimulatedCamera {
    outcome: CameraArg,
}

impl CameraProvider for SimulatedCamera {
    fn acquire(&self) -> CameraFuture {
        let outcome = self.outcome;
        Box::pin(async move {
            tokio::time::sleep(CAMERA_DELAY).await;
            outcome.resolve()
        })
    }
}

/// Prints finished reports as JSON on stdout.
struct StdoutSink;

impl SummarySink for StdoutSink {
    fn record(&mut self, report: &SessionReport) -> Result<(), CoreError> {
        println!("{}", serde_json::to_string_pretty(report)?);
        Ok(())
    }
}

fn log_events(events: impl IntoIterator<Item = Event>) {
    for event in events {
        debug!(?event, "session event");
    }
}

pub fn run(args: PracticeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = EngineConfig::load()?;
    if args.seed.is_some() {
        config.biometrics.seed = args.seed;
    }
    let catalog = config.catalog()?;

    let mut controller = SessionController::new(&config);
    let duration = args.duration.map(Duration::from_secs);
    log_events(controller.start_by_id(&catalog, &args.id, duration)?);

    let report = if args.simulate {
        simulate(controller, &args)?
    } else {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let result = runtime.block_on(live(controller, &args));
        // Stdin is read on a blocking thread that never returns on its own.
        runtime.shutdown_background();
        result?
    };

    StdoutSink.record(&report)?;
    Ok(())
}

fn simulate(
    mut controller: SessionController,
    args: &PracticeArgs,
) -> Result<SessionReport, Box<dyn std::error::Error>> {
    let limit_ms = args.max_secs.map(|s| s.saturating_mul(1000));
    let open_ended = controller
        .state()
        .and_then(|s| s.planned_ms())
        .is_none();
    if open_ended && limit_ms.is_none() {
        controller.abort()?;
        return Err("open-ended technique: pass --duration or --max-secs with --simulate".into());
    }

    if *controller.camera_status() == CameraStatus::Pending {
        if let Some(id) = controller.session_id() {
            log_events(controller.attach_camera(id, args.camera.resolve()));
        }
    }

    while !controller.status().is_terminal() {
        log_events(controller.tick());
        let elapsed = controller.state().map_or(0, |s| s.total_elapsed_ms());
        if limit_ms.is_some_and(|limit| elapsed >= limit) {
            log_events(controller.stop()?);
        }
    }

    controller
        .report()
        .cloned()
        .ok_or_else(|| "session ended without a report".into())
}

async fn live(
    controller: SessionController,
    args: &PracticeArgs,
) -> Result<SessionReport, Box<dyn std::error::Error>> {
    let (tx, rx) = mpsc::channel(16);
    let (view_tx, mut view_rx) = watch::channel(SessionView::idle());

    tokio::spawn(forward_stdin(tx.clone()));

    let ctrl_c_tx = tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = ctrl_c_tx.send(Command::Stop).await;
        }
    });

    if let Some(secs) = args.max_secs {
        let stop_tx = tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            let _ = stop_tx.send(Command::Stop).await;
        });
    }

    let render = tokio::spawn(async move {
        while view_rx.changed().await.is_ok() {
            let view = view_rx.borrow_and_update().clone();
            render_view(&view);
        }
    });

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            log_events([event]);
        }
    });

    eprintln!("keys: p pause, r resume, s stop, q abort (then Enter)");
    let runner = SessionRunner::new(controller)
        .with_camera(Arc::new(SimulatedCamera {
            outcome: args.camera,
        }))
        .with_events(event_tx);
    let report = runner.run(rx, view_tx).await;
    drop(tx);
    let _ = render.await;
    eprintln!();
    Ok(report?)
}

async fn forward_stdin(tx: mpsc::Sender<Command>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let command = match line.trim() {
            "p" => Command::Pause,
            "r" => Command::Resume,
            "s" => Command::Stop,
            "q" => Command::Abort,
            "" => continue,
            other => {
                eprintln!("unknown key: {other}");
                continue;
            }
        };
        if tx.send(command).await.is_err() {
            break;
        }
    }
}

fn render_view(view: &SessionView) {
    let position = if let Some(phase) = &view.phase {
        format!("{:<6} {:>4.1}s", phase.label, phase.remaining_ms as f64 / 1000.0)
    } else if let Some(item) = &view.item {
        format!(
            "{}/{} {} {:>3}s",
            item.index + 1,
            item.count,
            item.name,
            item.remaining_ms.div_ceil(1000)
        )
    } else {
        String::new()
    };
    let sample = view
        .latest_sample
        .map(|s| {
            format!(
                " | HR {:.0} HRV {:.0} align {:.0}%",
                s.heart_rate, s.hrv, s.alignment
            )
        })
        .unwrap_or_default();
    eprint!(
        "\r[{:?}] {} | {:>6.1}s{}   ",
        view.status,
        position,
        view.total_elapsed_ms as f64 / 1000.0,
        sample
    );
}
