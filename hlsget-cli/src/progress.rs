//! Segment progress bar fed by the engine's per-segment callback.

use std::sync::Arc;

use hlsget_engine::{ProgressEvent, ProgressSink};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

pub struct SegmentProgress {
    bar: ProgressBar,
}

impl SegmentProgress {
    pub fn new() -> Self {
        // Hidden until the first event arrives with the real total.
        let bar = ProgressBar::hidden();
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} segments ({eta})",
            )
            .expect("static template")
            .progress_chars("=> "),
        );
        Self { bar }
    }

    pub fn sink(&self) -> ProgressSink {
        let bar = self.bar.clone();
        Arc::new(move |event: ProgressEvent| {
            if bar.length().is_none() || bar.length() == Some(0) {
                bar.set_length(event.total as u64);
                bar.set_draw_target(ProgressDrawTarget::stderr());
            }
            bar.set_position(event.completed as u64);
        })
    }

    pub fn finish(&self) {
        if self.bar.length().is_some() {
            self.bar.finish_and_clear();
        }
    }
}
