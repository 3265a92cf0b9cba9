use log::info;

/// User-facing notification sink. `alert` blocks until the message is shown.
pub trait Notifier: Send + Sync {
    fn alert(&self, message: &str);

    fn notify(&self, message: &str);
}

/// Writes alerts to stderr and notifications to stdout.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn alert(&self, message: &str) {
        eprintln!("alert: {}", message);
    }

    fn notify(&self, message: &str) {
        info!("(notify) {}", message);
        println!("{}", message);
    }
}
