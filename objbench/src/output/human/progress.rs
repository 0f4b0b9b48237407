use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

/// One bar per running scenario, keyed by `driver scenario`.
pub(crate) struct HumanProgress {
    inner: Mutex<Inner>,
}

impl HumanProgress {
    pub(crate) fn new() -> Self {
        let multi = MultiProgress::new();
        multi.set_draw_target(ProgressDrawTarget::stderr_with_hz(5));

        Self {
            inner: Mutex::new(Inner {
                multi,
                bars: HashMap::new(),
            }),
        }
    }

    pub(crate) fn update(&self, key: &str, target: Duration, elapsed: Duration, message: String) {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let pb = inner.get_or_create_bar(key);
        pb.set_message(message);

        if target.is_zero() {
            pb.tick();
            return;
        }
        let total_ms = target.as_millis() as u64;
        pb.set_length(total_ms);
        pb.set_position((elapsed.as_millis() as u64).min(total_ms));
    }

    /// Removes the bar and prints a permanent line in its place.
    pub(crate) fn finish_bar(&self, key: &str, line: String) {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(pb) = inner.bars.remove(key) {
            pb.finish_and_clear();
        }
        let _ = inner.multi.println(line);
    }

    pub(crate) fn println(&self, line: String) {
        let inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let _ = inner.multi.println(line);
    }

    pub(crate) fn finish(&self) {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        for (_, pb) in inner.bars.drain() {
            pb.finish_and_clear();
        }

        let _ = inner.multi.clear();
    }
}

struct Inner {
    multi: MultiProgress,
    bars: HashMap<String, ProgressBar>,
}

impl Inner {
    fn get_or_create_bar(&mut self, key: &str) -> &ProgressBar {
        self.bars.entry(key.to_string()).or_insert_with(|| {
            let pb = self.multi.add(ProgressBar::new(0));
            pb.set_style(bar_style());
            pb.set_prefix(key.to_string());
            pb
        })
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("{prefix:<32} [ {bar:20.cyan/blue} ] {percent:>3}% {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█░")
}
