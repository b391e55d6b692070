use indicatif::{ProgressBar, ProgressDrawTarget, ProgressState, ProgressStyle};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;
use vsepr::engine::progress::{Progress, ProgressCallback};

const SPINNER_TICK_MS: u64 = 80;
const FRAME_TEMPLATE: &str = "{prefix:>12} [{bar:40.cyan/blue}] {pos}/{len} {msg} ({eta})";

/// Drives one `indicatif` bar from the relaxation workflow's progress events.
#[derive(Clone)]
pub struct CliProgressHandler {
    pb: Arc<Mutex<ProgressBar>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        Self::with_draw_target(ProgressDrawTarget::stderr())
    }

    /// A handler whose bar is never drawn, for quiet runs.
    pub fn hidden() -> Self {
        Self::with_draw_target(ProgressDrawTarget::hidden())
    }

    fn with_draw_target(target: ProgressDrawTarget) -> Self {
        let pb = ProgressBar::with_draw_target(Some(0), target).with_style(spinner_style());
        pb.finish_and_clear();
        Self {
            pb: Arc::new(Mutex::new(pb)),
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let shared = Arc::clone(&self.pb);
        Box::new(move |progress: Progress| match shared.lock() {
            Ok(pb) => render(&pb, progress),
            Err(_) => warn!("Progress bar mutex was poisoned; dropping {:?}.", progress),
        })
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}

fn render(pb: &ProgressBar, progress: Progress) {
    match progress {
        Progress::PhaseStart { name } => {
            pb.reset();
            pb.set_length(0);
            pb.set_style(spinner_style());
            pb.set_prefix(name);
            pb.set_message(format!("{name}..."));
            pb.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
        }
        Progress::PhaseFinish => {
            pb.disable_steady_tick();
            pb.finish_with_message("✓ Done");
        }
        Progress::FramesStart { total_frames } => {
            pb.disable_steady_tick();
            pb.reset();
            pb.set_style(frame_style());
            pb.set_length(total_frames);
            pb.set_position(0);
        }
        Progress::FrameAdvanced { frame, error } => {
            pb.set_position(frame);
            pb.set_message(format!("error {error:.2e}"));
        }
        Progress::FramesFinish { converged } => {
            pb.finish_with_message(if converged { "settled" } else { "frame budget used" });
        }
        Progress::Message(msg) if pb.is_finished() => pb.set_message(msg),
        Progress::Message(msg) => pb.println(format!("  {msg}")),
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn frame_style() -> ProgressStyle {
    ProgressStyle::with_template(FRAME_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .with_key("eta", |state: &ProgressState, w: &mut dyn std::fmt::Write| {
            let _ = write!(w, "{:.1}s", state.eta().as_secs_f64());
        })
        .progress_chars("=>-")
}
