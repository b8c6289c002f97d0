use tracing::warn;

/// User-facing alert channel.
pub trait Notifier: Send + Sync {
    fn alert(&self, message: &str);
}

/// Prints alerts on stderr, the terminal stand-in for a blocking dialog.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn alert(&self, message: &str) {
        warn!(%message, "alert");
        eprintln!("alert: {message}");
    }
}
