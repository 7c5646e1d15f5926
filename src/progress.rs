use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Progress reporting around long blocking collaborator calls.
///
/// The orchestrator invokes `on_start`/`on_end` in pairs; how (or whether)
/// anything is rendered is the implementation's business. This keeps the
/// console detail out of the pipeline and lets tests run silent.
pub trait ProgressReporter {
    fn on_start(&mut self, label: &str);
    fn on_end(&mut self, label: &str);
}

/// Console spinner shown while a blocking call runs.
#[derive(Default)]
pub struct SpinnerReporter {
    bar: Option<ProgressBar>,
}

impl SpinnerReporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressReporter for SpinnerReporter {
    fn on_start(&mut self, label: &str) {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{msg} {spinner:.green}")
                .expect("static spinner template is valid"),
        );
        bar.set_message(label.to_owned());
        bar.enable_steady_tick(Duration::from_millis(100));
        self.bar = Some(bar);
    }

    fn on_end(&mut self, _label: &str) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

/// Reporter that renders nothing. Used by tests and non-interactive callers.
#[derive(Default)]
pub struct NullReporter;

impl ProgressReporter for NullReporter {
    fn on_start(&mut self, _label: &str) {}
    fn on_end(&mut self, _label: &str) {}
}
