//! Unified progress across the four generation stages
//!
//! Each stage gets an equal slice of a 0..=4000 bar. An engine reporting
//! local step `s` during stage `i` shows up as global step `i * 1000 + s`.

use flowmodel_storage::ModelKind;
use std::sync::Arc;

/// Width of one stage's slice of the progress bar
pub const STEPS_PER_STAGE: u32 = 1000;

/// Upper bound of the progress bar
pub const MAX_STEP: u32 = 4000;

/// Progress as shown to the caller
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgressUpdate {
    pub step: u32,
    pub max_step: u32,
    pub message: String,
}

impl ProgressUpdate {
    pub fn new(step: u32, max_step: u32, message: impl Into<String>) -> Self {
        Self {
            step,
            max_step,
            message: message.into(),
        }
    }

    /// `{0, 0, ""}`: tells the caller to hide the progress indicator
    pub fn clear() -> Self {
        Self::default()
    }

    pub fn is_clear(&self) -> bool {
        self.step == 0 && self.max_step == 0 && self.message.is_empty()
    }
}

/// Caller-facing progress callback
pub type ProgressCallback = Arc<dyn Fn(ProgressUpdate) + Send + Sync>;

/// Engine-facing progress callback: `(local_step, local_message)`
pub type LocalProgress = dyn Fn(u32, &str) + Send + Sync;

/// Callback that discards every update
pub fn no_progress() -> ProgressCallback {
    Arc::new(|_| {})
}

/// Rescale one stage's local progress onto the global bar
pub fn stage_progress(
    kind: ModelKind,
    stage_index: u32,
    progress: ProgressCallback,
) -> impl Fn(u32, &str) + Send + Sync {
    move |step, message| {
        progress(ProgressUpdate {
            step: stage_index * STEPS_PER_STAGE + step,
            max_step: MAX_STEP,
            message: format!("Generating {} model: {}", kind, message),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn recorder() -> (ProgressCallback, Arc<Mutex<Vec<ProgressUpdate>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (Arc::new(move |update| sink.lock().push(update)), seen)
    }

    #[test]
    fn test_stage_progress_rescales() {
        let (progress, seen) = recorder();

        let sink_stage = stage_progress(ModelKind::Sink, 1, progress.clone());
        sink_stage(0, "compiling");
        sink_stage(250, "evaluating");

        let neutral_stage = stage_progress(ModelKind::Neutral, 3, progress);
        neutral_stage(1000, "done");

        let seen = seen.lock();
        assert_eq!(
            *seen,
            vec![
                ProgressUpdate::new(1000, 4000, "Generating sink model: compiling"),
                ProgressUpdate::new(1250, 4000, "Generating sink model: evaluating"),
                ProgressUpdate::new(4000, 4000, "Generating neutral model: done"),
            ]
        );
    }

    #[test]
    fn test_clear_progress() {
        let clear = ProgressUpdate::clear();
        assert!(clear.is_clear());
        assert_eq!(clear, ProgressUpdate::new(0, 0, ""));
        assert!(!ProgressUpdate::new(0, MAX_STEP, "").is_clear());
    }
}
