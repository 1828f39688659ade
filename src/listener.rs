//! Message listeners receive raw console text: subprocess output, download
//! notices, extracted entry paths.

use log::info;

pub trait MessageListener: Send + Sync {
    fn message(&self, raw: &str);
}

impl<F> MessageListener for F
where
    F: Fn(&str) + Send + Sync,
{
    fn message(&self, raw: &str) {
        self(raw)
    }
}

/// Forwards every non-blank message to the log at `info`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMessageListener;

impl MessageListener for LogMessageListener {
    fn message(&self, raw: &str) {
        let line = raw.trim_end();
        if !line.is_empty() {
            info!("{}", line);
        }
    }
}

/// Drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMessageListener;

impl MessageListener for NullMessageListener {
    fn message(&self, _raw: &str) {}
}
