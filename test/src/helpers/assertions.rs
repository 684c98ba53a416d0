use std::{
    thread,
    time::{Duration, Instant},
};

use crate::local_socket::RecordingConnector;

/// Upper bound for anything a test waits on the autosend thread for
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Polls `condition` until it holds or `timeout` elapses. Returns whether it held
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(1));
    }
}

/// Waits until channel `index` has received at least `count` envelopes and
/// returns their payloads
pub fn wait_for_payloads(
    connector: &RecordingConnector,
    index: usize,
    count: usize,
) -> Vec<Vec<u8>> {
    wait_until(WAIT_TIMEOUT, || {
        connector.channel(index).payloads().len() >= count
    });
    connector.channel(index).payloads()
}

/// Assert that the server holds a page server link
#[macro_export]
macro_rules! assert_linked {
    ($server:expr) => {
        assert!(
            $server.is_page_server_connected(),
            "expected a page server link to be present"
        );
    };
}

/// Assert that the server holds no page server link
#[macro_export]
macro_rules! assert_unlinked {
    ($server:expr) => {
        assert!(
            !$server.is_page_server_connected(),
            "expected no page server link"
        );
    };
}
