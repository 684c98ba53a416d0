/// Producers are isolated from a slow page server
///
/// While the sender thread is blocked inside a channel write, pushes and log
/// broadcasts keep returning. Everything queued in the meantime is delivered
/// in push order once the write completes.

use std::{sync::mpsc, thread};

use pslink_shared::RequestKind;
use pslink_test::{wait_for_payloads, wait_until, TestServer, WAIT_TIMEOUT};

const STALLED_PUSHES: usize = 100;

fn payload(index: usize) -> Vec<u8> {
    format!("L{}", index).into_bytes()
}

#[test]
fn push_returns_while_the_sender_is_stuck_in_a_write() {
    let test_server = TestServer::new("ps1:1523");
    let gate = test_server.connector.hold_next_envelopes();
    test_server.server.init_page_server_hosts().unwrap();

    test_server
        .server
        .push_request(RequestKind::ForwardLogRecords, payload(0));
    assert!(wait_until(WAIT_TIMEOUT, || gate.waiting() == 1));

    let (done_tx, done_rx) = mpsc::channel();
    let server = test_server.server.clone();
    let producer = thread::spawn(move || {
        for index in 1..=STALLED_PUSHES {
            server.push_request(RequestKind::ForwardLogRecords, payload(index));
        }
        done_tx.send(()).unwrap();
    });

    done_rx
        .recv_timeout(WAIT_TIMEOUT)
        .expect("pushes should not wait for the stalled write");
    producer.join().unwrap();

    // still stuck on the first envelope
    assert_eq!(gate.waiting(), 1);
    assert!(test_server.connector.channel(0).payloads().is_empty());
    let stats = test_server.server.request_stats().unwrap();
    assert_eq!(stats.pushed as usize, STALLED_PUSHES + 1);
    assert_eq!(stats.sent, 0);
    assert_eq!(stats.high_water, STALLED_PUSHES);

    gate.release();

    let expected: Vec<_> = (0..=STALLED_PUSHES).map(payload).collect();
    assert_eq!(
        wait_for_payloads(&test_server.connector, 0, expected.len()),
        expected
    );
}

#[test]
fn log_broadcast_returns_while_the_sender_is_stuck_in_a_write() {
    let test_server = TestServer::new("ps1:1523");
    let gate = test_server.connector.hold_next_envelopes();
    test_server.server.init_page_server_hosts().unwrap();

    test_server.log_source.send_list(payload(0));
    assert!(wait_until(WAIT_TIMEOUT, || gate.waiting() == 1));

    let (done_tx, done_rx) = mpsc::channel();
    let log_source = test_server.log_source.clone();
    let committer = thread::spawn(move || {
        for index in 1..=STALLED_PUSHES {
            log_source.send_list(payload(index));
        }
        done_tx.send(()).unwrap();
    });

    done_rx
        .recv_timeout(WAIT_TIMEOUT)
        .expect("commits should not wait for the stalled write");
    committer.join().unwrap();
    assert!(test_server.connector.channel(0).payloads().is_empty());

    gate.release();

    let expected: Vec<_> = (0..=STALLED_PUSHES).map(payload).collect();
    assert_eq!(
        wait_for_payloads(&test_server.connector, 0, expected.len()),
        expected
    );
}
