use std::{
    sync::Arc,
    thread::{self, JoinHandle},
};

use log::{debug, error, info};

use pslink_shared::{Diagnostic, ErrorCode, ErrorReporter};

use super::{connection::PageServerConnection, request_queue::RequestQueue};

/// Background sender draining a [`RequestQueue`] over its connection.
///
/// The sender thread owns the connection while it runs and hands it back
/// when stopped, so the connection can only be closed after the loop has
/// fully exited.
pub struct Autosend {
    queue: Arc<RequestQueue>,
    handle: Option<JoinHandle<PageServerConnection>>,
}

impl Autosend {
    pub fn start(
        queue: Arc<RequestQueue>,
        connection: PageServerConnection,
        reporter: Arc<dyn ErrorReporter>,
    ) -> std::io::Result<Self> {
        let thread_name = format!("{}-autosend", connection.channel_name());
        let worker_queue = queue.clone();
        let handle = thread::Builder::new()
            .name(thread_name)
            .spawn(move || autosend_loop(worker_queue, connection, reporter))?;

        Ok(Self {
            queue,
            handle: Some(handle),
        })
    }

    /// `false` once the loop has exited, whether stopped or failed.
    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stops the loop, waits for it to exit and returns the connection.
    ///
    /// Returns `None` only if the sender thread panicked, in which case the
    /// connection was dropped with it.
    pub fn stop(mut self) -> Option<PageServerConnection> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Option<PageServerConnection> {
        let handle = self.handle.take()?;
        self.queue.stop();
        match handle.join() {
            Ok(connection) => Some(connection),
            Err(_) => {
                error!("Page server autosend thread panicked");
                None
            }
        }
    }
}

impl Drop for Autosend {
    fn drop(&mut self) {
        if let Some(connection) = self.shutdown() {
            connection.close();
        }
    }
}

// Fails the queue if the sender thread unwinds, so producers stop buffering
// for a consumer that is gone.
struct UnwindGuard {
    queue: Arc<RequestQueue>,
    reporter: Arc<dyn ErrorReporter>,
    channel_name: String,
    in_flight: bool,
}

impl Drop for UnwindGuard {
    fn drop(&mut self) {
        if !thread::panicking() {
            return;
        }
        let lost = self.queue.abandon(self.in_flight);
        self.reporter.report(&Diagnostic::error(
            ErrorCode::PageServerSend,
            format!(
                "Page server sender on '{}' panicked, {} requests lost",
                self.channel_name, lost
            ),
        ));
    }
}

fn autosend_loop(
    queue: Arc<RequestQueue>,
    mut connection: PageServerConnection,
    reporter: Arc<dyn ErrorReporter>,
) -> PageServerConnection {
    debug!("Autosend started on '{}'", connection.channel_name());
    let mut guard = UnwindGuard {
        queue: queue.clone(),
        reporter: reporter.clone(),
        channel_name: connection.channel_name().to_string(),
        in_flight: false,
    };

    while let Some(envelope) = queue.wait_pop() {
        guard.in_flight = true;
        let sent = connection.send_request(&envelope);
        guard.in_flight = false;

        match sent {
            Ok(()) => queue.mark_sent(),
            Err(send_error) => {
                let lost = queue.fail(envelope);
                reporter.report(&Diagnostic::error(
                    ErrorCode::PageServerSend,
                    format!(
                        "Sending to page server {} failed, {} requests lost: {}",
                        connection.endpoint(),
                        lost,
                        send_error
                    ),
                ));
                break;
            }
        }
    }

    info!(
        "Autosend on '{}' exited ({:?})",
        connection.channel_name(),
        connection.state()
    );
    connection
}
