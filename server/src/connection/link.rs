use std::sync::Arc;

use log::info;

use pslink_shared::{Endpoint, ErrorReporter, RequestEnvelope};

use super::{
    autosend::Autosend,
    connection::{ConnectionState, PageServerConnection},
    request_queue::{RequestQueue, RequestQueueStats},
};
use crate::error::PageServerError;

/// Connection, request queue and sender of one page server link.
///
/// Exists only fully built; [`PageServerLink::close`] tears the parts down
/// as sender, then queue, then connection.
pub(crate) struct PageServerLink {
    endpoint: Endpoint,
    queue: Arc<RequestQueue>,
    autosend: Autosend,
}

impl PageServerLink {
    pub fn establish(
        connection: PageServerConnection,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Result<Self, PageServerError> {
        let endpoint = connection.endpoint().clone();
        let queue = Arc::new(RequestQueue::new());
        let autosend = Autosend::start(queue.clone(), connection, reporter).map_err(|e| {
            PageServerError::AutosendSpawnFailed {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            endpoint,
            queue,
            autosend,
        })
    }

    pub fn push(&self, envelope: RequestEnvelope) -> bool {
        self.queue.push(envelope)
    }

    pub fn state(&self) -> ConnectionState {
        if self.queue.is_failed() || !self.autosend.is_running() {
            ConnectionState::Failed
        } else {
            ConnectionState::Connected
        }
    }

    pub fn stats(&self) -> RequestQueueStats {
        self.queue.stats()
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn close(self) {
        let Self {
            endpoint,
            queue,
            autosend,
        } = self;

        let connection = autosend.stop();
        let discarded = queue.discard_pending();
        drop(queue);
        if let Some(connection) = connection {
            connection.close();
        }

        info!(
            "Page server link to {} closed, {} unsent requests discarded",
            endpoint, discarded
        );
    }
}
