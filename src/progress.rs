//! Progress reporting utilities

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Progress reporter for question batches
#[derive(Debug)]
pub struct ProgressReporter {
    pub models_pb: Option<ProgressBar>,
    pub questions_pb: Option<ProgressBar>,
    questions_per_batch: u64,
    show_progress: bool,
}

impl ProgressReporter {
    /// Create progress reporter for a baseline run
    pub fn new_for_baseline(question_count: u64) -> Self {
        Self {
            models_pb: None,
            questions_pb: None,
            questions_per_batch: question_count,
            show_progress: true,
        }
    }

    /// Create progress reporter for an evaluation over several models
    pub fn new_for_evaluation(model_count: u64, question_count: u64) -> Self {
        let models_pb = create_progress_bar(model_count, "Evaluating models");

        Self {
            models_pb: Some(models_pb),
            questions_pb: None,
            questions_per_batch: question_count,
            show_progress: true,
        }
    }

    /// Create minimal progress reporter (no progress bars)
    pub fn new_minimal() -> Self {
        Self {
            models_pb: None,
            questions_pb: None,
            questions_per_batch: 0,
            show_progress: false,
        }
    }

    /// Start a batch of questions, labelled with the model or run name
    pub fn start_batch(&mut self, label: &str) {
        if !self.show_progress {
            return;
        }
        if let Some(pb) = &self.models_pb {
            pb.set_message(label.to_string());
        }
        if let Some(pb) = self.questions_pb.take() {
            pb.finish_and_clear();
        }
        self.questions_pb = Some(create_progress_bar(self.questions_per_batch, label));
    }

    /// Mark one question as done
    pub fn question_done(&mut self, question_number: &str) {
        if let Some(pb) = &self.questions_pb {
            pb.set_message(format!("question {}", question_number));
            pb.inc(1);
        }
    }

    /// Finish the current batch
    pub fn finish_batch(&mut self, message: &str) {
        if let Some(pb) = self.questions_pb.take() {
            pb.finish_with_message(message.to_string());
        }
        if let Some(pb) = &self.models_pb {
            pb.inc(1);
        }
    }

    /// Finish all progress bars
    pub fn finish_all(&mut self, message: &str) {
        if let Some(pb) = self.questions_pb.take() {
            pb.finish_and_clear();
        }
        if let Some(pb) = self.models_pb.take() {
            pb.finish_with_message(message.to_string());
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        // Ensure all progress bars are cleaned up silently
        if let Some(pb) = self.questions_pb.take() {
            pb.finish_and_clear();
        }
        if let Some(pb) = self.models_pb.take() {
            pb.finish_and_clear();
        }
    }
}

/// Create a spinner progress bar
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.green} {msg}")
            .expect("Invalid progress template"),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Create a progress bar with known total
fn create_progress_bar(total: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>4}/{len:4} {msg}")
            .expect("Invalid progress template")
            .progress_chars("#>-"),
    );
    pb.set_message(message.to_string());
    pb
}
