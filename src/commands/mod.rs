//! Subcommand implementations.

pub mod auth;
pub mod tasks;

use colored::Colorize;
use tokio::sync::broadcast;

use taskflow::notify::Notification;

/// A failure already shown to the user as a notification.
///
/// `main` exits non-zero on it without printing it again.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct Reported(#[source] pub taskflow::Error);

/// Print every notification already queued on `rx`.
fn print_notifications(rx: &mut broadcast::Receiver<Notification>) {
    while let Ok(note) = rx.try_recv() {
        if note.is_success() {
            println!("  {} {}", "✓".green(), note.message);
        } else {
            eprintln!("  {} {}", "✗".red(), note.message);
        }
    }
}

/// Print the notifications of a finished mutation and pass its result on.
///
/// A failure comes back as [`Reported`] since its notification already
/// told the user what went wrong.
pub fn finish_mutation<T>(
    result: taskflow::Result<T>,
    rx: &mut broadcast::Receiver<Notification>,
) -> anyhow::Result<T> {
    print_notifications(rx);
    result.map_err(|e| Reported(e).into())
}
