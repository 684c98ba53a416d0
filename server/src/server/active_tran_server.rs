use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    thread,
};

use log::{debug, info, warn};

use pslink_shared::{
    ChannelConnector, Diagnostic, Endpoint, ErrorCode, ErrorReporter, LogRecordSink,
    LogRecordSource, RequestEnvelope, RequestKind, SinkKey,
};

use super::ServerConfig;
use crate::{
    connection::{
        connection::{ConnectionState, PageServerConnection},
        link::PageServerLink,
        request_queue::RequestQueueStats,
    },
    error::PageServerError,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Active transaction server side of the page server link.
///
/// Owns at most one [`PageServerLink`] at a time. While linked, it is
/// registered with the log record source and forwards every committed unit of
/// log records to the page server, in generation order.
///
/// Running without a page server is a normal state: pushing requests is then
/// a caller bug, everything else degrades gracefully.
pub struct ActiveTranServer {
    config: ServerConfig,
    connector: Arc<dyn ChannelConnector>,
    log_source: Arc<dyn LogRecordSource>,
    reporter: Arc<dyn ErrorReporter>,
    // serializes connect / disconnect / reconnect attempts
    lifecycle: Mutex<()>,
    // bumped by every explicit disconnect, cancels a reconnect in backoff
    disconnects: AtomicU64,
    endpoint: Mutex<Option<Endpoint>>,
    link: Mutex<Option<PageServerLink>>,
    sink_key: Mutex<Option<SinkKey>>,
}

impl ActiveTranServer {
    pub fn new(
        config: ServerConfig,
        connector: Arc<dyn ChannelConnector>,
        log_source: Arc<dyn LogRecordSource>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            connector,
            log_source,
            reporter,
            lifecycle: Mutex::new(()),
            disconnects: AtomicU64::new(0),
            endpoint: Mutex::new(None),
            link: Mutex::new(None),
            sink_key: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Parses the configured page server endpoint and connects to it.
    ///
    /// An empty setting leaves the server unlinked. A malformed one is
    /// reported as a warning and also leaves it unlinked; neither is an error.
    /// Connection failures are reported and returned.
    pub fn init_page_server_hosts(self: &Arc<Self>) -> Result<(), PageServerError> {
        let hosts = &self.config.page_server_hosts;
        let endpoint = match Endpoint::parse(hosts) {
            Ok(Some(endpoint)) => endpoint,
            Ok(None) => {
                debug!("No page server configured");
                return Ok(());
            }
            Err(parse_error) => {
                self.reporter.report(&Diagnostic::warning(
                    ErrorCode::HostPortParameter,
                    format!("Invalid page_server_hosts value '{}': {}", hosts, parse_error),
                ));
                return Ok(());
            }
        };

        debug!(
            "Page server hosts: {} port: {}",
            endpoint.hostname(),
            endpoint.port()
        );
        self.connect_to_page_server(&endpoint)
    }

    /// Connects to `endpoint`, starts the request sender and subscribes to
    /// the log record source.
    ///
    /// # Panics
    ///
    /// Panics if a page server is already connected.
    pub fn connect_to_page_server(self: &Arc<Self>, endpoint: &Endpoint) -> Result<(), PageServerError> {
        let _lifecycle = lock(&self.lifecycle);
        self.connect_locked(endpoint)
    }

    fn connect_locked(self: &Arc<Self>, endpoint: &Endpoint) -> Result<(), PageServerError> {
        assert!(
            !self.is_page_server_connected(),
            "connect_to_page_server called while already connected to a page server"
        );
        *lock(&self.endpoint) = Some(endpoint.clone());

        let link = PageServerConnection::connect(
            self.connector.as_ref(),
            endpoint,
            &self.config.local_identity,
            &self.config.channel_name,
        )
        .and_then(|connection| PageServerLink::establish(connection, self.reporter.clone()))
        .map_err(|connect_error| {
            self.reporter.report(&Diagnostic::error(
                ErrorCode::PageServerConnection,
                connect_error.to_string(),
            ));
            connect_error
        })?;

        // publish the link before subscribing, so the first forwarded record
        // always finds it
        *lock(&self.link) = Some(link);

        let sink: Arc<dyn LogRecordSink> = self.clone();
        let key = self.log_source.add_sink(Arc::downgrade(&sink));
        *lock(&self.sink_key) = Some(key);

        info!("Connected to page server {}", endpoint);
        Ok(())
    }

    /// Unsubscribes from the log record source, then stops the sender,
    /// releases the queue and closes the connection. No-op when unlinked.
    ///
    /// A reconnect waiting between attempts gives up at its next attempt.
    pub fn disconnect_page_server(&self) {
        let _lifecycle = lock(&self.lifecycle);
        self.disconnects.fetch_add(1, Ordering::AcqRel);
        self.disconnect_locked();
    }

    fn disconnect_locked(&self) {
        let sink_key = lock(&self.sink_key).take();
        if let Some(key) = sink_key {
            if !self.log_source.remove_sink(key) {
                warn!("Log record sink was already unregistered");
            }
        }

        let link = lock(&self.link).take();
        if let Some(link) = link {
            let endpoint = link.endpoint().clone();
            link.close();
            info!("Disconnected from page server {}", endpoint);
        }
    }

    /// Replaces a failed or missing link with a fresh one to the last known
    /// endpoint, retrying per [`ServerConfig::reconnect`]. A healthy link is
    /// left untouched. Requests lost with the old link are not resent.
    ///
    /// The lifecycle lock is only held during an attempt, never across the
    /// backoff delay. A [`disconnect_page_server`](Self::disconnect_page_server)
    /// in between cancels the reconnect; a link established by someone else
    /// in between ends it successfully.
    pub fn reconnect_page_server(self: &Arc<Self>) -> Result<(), PageServerError> {
        let (endpoint, disconnects) = {
            let _lifecycle = lock(&self.lifecycle);
            if self.page_server_state() == Some(ConnectionState::Connected) {
                return Ok(());
            }
            let endpoint = lock(&self.endpoint)
                .clone()
                .ok_or(PageServerError::NoEndpoint)?;
            self.disconnect_locked();
            (endpoint, self.disconnects.load(Ordering::Acquire))
        };

        let policy = &self.config.reconnect;
        let max_attempts = policy.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = {
                let _lifecycle = lock(&self.lifecycle);
                if self.disconnects.load(Ordering::Acquire) != disconnects {
                    info!("Reconnect to page server {} cancelled by disconnect", endpoint);
                    return Err(PageServerError::ReconnectCancelled {
                        endpoint: endpoint.to_string(),
                    });
                }
                if self.is_page_server_connected() {
                    return Ok(());
                }
                self.connect_locked(&endpoint)
            };

            match result {
                Ok(()) => return Ok(()),
                Err(last) if attempt >= max_attempts => {
                    return Err(PageServerError::RetriesExhausted {
                        endpoint: endpoint.to_string(),
                        attempts: attempt,
                        last: Box::new(last),
                    });
                }
                Err(_) => {
                    let delay = policy.backoff(attempt);
                    debug!(
                        "Reconnect attempt {} to {} failed, retrying in {:?}",
                        attempt, endpoint, delay
                    );
                    thread::sleep(delay);
                }
            }
        }
    }

    /// `true` while a link exists, healthy or failed.
    pub fn is_page_server_connected(&self) -> bool {
        lock(&self.link).is_some()
    }

    /// `true` while a link exists and its sender has not failed.
    pub fn is_page_server_usable(&self) -> bool {
        self.page_server_state() == Some(ConnectionState::Connected)
    }

    pub fn page_server_state(&self) -> Option<ConnectionState> {
        lock(&self.link).as_ref().map(PageServerLink::state)
    }

    pub fn page_server_endpoint(&self) -> Option<Endpoint> {
        lock(&self.endpoint).clone()
    }

    pub fn request_stats(&self) -> Option<RequestQueueStats> {
        lock(&self.link).as_ref().map(PageServerLink::stats)
    }

    /// Queues a request for the page server. Never blocks on network I/O.
    ///
    /// On a failed link the request is counted and dropped.
    ///
    /// # Panics
    ///
    /// Panics if no page server is connected.
    pub fn push_request(&self, kind: RequestKind, payload: Vec<u8>) {
        let envelope = RequestEnvelope::new(kind, payload);
        let pushed = lock(&self.link)
            .as_ref()
            .map(|link| link.push(envelope));

        assert!(
            pushed.is_some(),
            "push_request called while no page server is connected"
        );
    }
}

impl LogRecordSink for ActiveTranServer {
    fn receive_log_records(&self, payload: Vec<u8>) {
        self.push_request(RequestKind::ForwardLogRecords, payload);
    }
}

impl Drop for ActiveTranServer {
    fn drop(&mut self) {
        self.disconnect_page_server();
    }
}
