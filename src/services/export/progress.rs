//! Progress reporting.

/// Receives progress updates from the exporter. Calls must return quickly.
pub trait ProgressSink {
    fn set_total(&mut self, total: usize);
    fn advance(&mut self, tasks: usize);
    fn set_status_text(&mut self, text: &str);
}

impl<P: ProgressSink + ?Sized> ProgressSink for &mut P {
    fn set_total(&mut self, total: usize) {
        (**self).set_total(total);
    }

    fn advance(&mut self, tasks: usize) {
        (**self).advance(tasks);
    }

    fn set_status_text(&mut self, text: &str) {
        (**self).set_status_text(text);
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn set_total(&mut self, _total: usize) {}
    fn advance(&mut self, _tasks: usize) {}
    fn set_status_text(&mut self, _text: &str) {}
}

/// Reports through the `log` facade.
#[derive(Debug, Default, Clone)]
pub struct LogProgress {
    total: usize,
    done: usize,
}

impl LogProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn done(&self) -> usize {
        self.done
    }

    pub fn total(&self) -> usize {
        self.total
    }
}

impl ProgressSink for LogProgress {
    fn set_total(&mut self, total: usize) {
        self.total = total;
        self.done = 0;
        log::info!("Exporting {total} layer(s)");
    }

    fn advance(&mut self, tasks: usize) {
        self.done += tasks;
        log::info!("[{}/{}] done", self.done, self.total);
    }

    fn set_status_text(&mut self, text: &str) {
        log::debug!("{text}");
    }
}
