use std::sync::Mutex;

use console::Style;
use ganymede_core::masters::BatchCounts;
use ganymede_core::pipeline::{BuiltMaster, ExposureOutcome, PipelineStage, ProgressReporter};
use indicatif::{ProgressBar, ProgressStyle};

/// Drives an indicatif bar per pipeline stage.
pub struct BarReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl BarReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(ref bar) = *guard {
                f(bar);
            }
        }
    }
}

impl ProgressReporter for BarReporter {
    fn begin_stage(&self, stage: PipelineStage, total_items: Option<usize>) {
        let bar = match total_items {
            Some(total) => {
                let bar = ProgressBar::new(total as u64);
                if let Ok(style) =
                    ProgressStyle::default_bar().template("{msg:20} [{bar:40}] {pos}/{len}")
                {
                    bar.set_style(style.progress_chars("=> "));
                }
                bar
            }
            None => ProgressBar::new_spinner(),
        };
        bar.set_message(stage.to_string());
        if let Ok(mut guard) = self.bar.lock() {
            *guard = Some(bar);
        }
    }

    fn batch_indexed(&self, counts: &BatchCounts) {
        let mut line = format!("  {} bias, {} dark", counts.bias, counts.dark);
        for (filter, count) in &counts.flats {
            line.push_str(&format!(", {count} {filter} flat"));
        }
        self.with_bar(|bar| bar.println(&line));
    }

    fn advance(&self, items_done: usize) {
        self.with_bar(|bar| bar.set_position(items_done as u64));
    }

    fn exposure_finished(&self, name: &str, outcome: &ExposureOutcome) {
        let style = match outcome {
            ExposureOutcome::Calibrated { .. } => Style::new().green(),
            ExposureOutcome::Redundant => Style::new().dim(),
            ExposureOutcome::Rejected(_) | ExposureOutcome::MissingFlat(_) => {
                Style::new().yellow()
            }
            ExposureOutcome::Failed(_) => Style::new().red(),
        };
        let line = format!("  {name}: {}", style.apply_to(outcome));
        self.with_bar(|bar| bar.println(&line));
    }

    fn master_finished(&self, master: &BuiltMaster) {
        let line = if master.written {
            format!(
                "  {} from {} frames -> {}",
                Style::new().green().apply_to(&master.label),
                master.combined_count,
                master.path.display()
            )
        } else {
            format!(
                "  {} already exists, no new file written ({})",
                Style::new().yellow().apply_to(&master.label),
                master.path.display()
            )
        };
        self.with_bar(|bar| bar.println(&line));
    }

    fn finish_stage(&self) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(bar) = guard.take() {
                bar.finish_and_clear();
            }
        }
    }
}
