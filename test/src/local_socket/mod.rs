//! In-memory channel transport for E2E testing
//! Records everything written to each channel without network I/O, and can
//! be told to fail connects, handshakes or a specific send

use std::sync::{Arc, Condvar, Mutex, PoisonError};

use pslink_shared::{
    Channel, ChannelConnector, Endpoint, RequestEnvelope, TransportError,
};

/// Number of wire events a successful handshake writes:
/// connection class, local identity, role command
pub const HANDSHAKE_EVENTS: usize = 3;

/// One write observed on a recorded channel
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WireEvent {
    Int(i32),
    Message(Vec<u8>),
}

/// Everything observed on one channel
#[derive(Clone, Debug)]
pub struct ChannelRecord {
    pub name: String,
    pub endpoint: Endpoint,
    pub events: Vec<WireEvent>,
    pub closed: bool,
}

impl ChannelRecord {
    /// Handshake events, if the handshake got that far
    pub fn handshake(&self) -> &[WireEvent] {
        &self.events[..self.events.len().min(HANDSHAKE_EVENTS)]
    }

    /// Request envelopes written after the handshake, in write order
    pub fn envelopes(&self) -> Vec<RequestEnvelope> {
        self.events
            .iter()
            .skip(HANDSHAKE_EVENTS)
            .map(|event| match event {
                WireEvent::Message(frame) => {
                    RequestEnvelope::decode(frame).expect("recorded frame should decode")
                }
                WireEvent::Int(value) => panic!("unexpected int {} after handshake", value),
            })
            .collect()
    }

    pub fn payloads(&self) -> Vec<Vec<u8>> {
        self.envelopes()
            .into_iter()
            .map(RequestEnvelope::into_payload)
            .collect()
    }
}

/// Holds back envelope writes on a recorded channel until released
#[derive(Default)]
pub struct SendGate {
    state: Mutex<GateState>,
    changed: Condvar,
}

#[derive(Default)]
struct GateState {
    open: bool,
    waiting: usize,
}

impl SendGate {
    /// Lets every held and future write through
    pub fn release(&self) {
        self.state.lock().unwrap().open = true;
        self.changed.notify_all();
    }

    /// Number of writers currently held at the gate
    pub fn waiting(&self) -> usize {
        self.state.lock().unwrap().waiting
    }

    fn pass(&self) {
        let mut state = self.state.lock().unwrap();
        state.waiting += 1;
        while !state.open {
            state = self.changed.wait(state).unwrap();
        }
        state.waiting -= 1;
    }
}

#[derive(Default)]
struct Faults {
    failing_connects: usize,
    fail_next_handshake: bool,
    fail_next_envelope_at: Option<usize>,
    panic_next_envelope_at: Option<usize>,
    hold_next_envelopes: Option<Arc<SendGate>>,
}

#[derive(Default)]
struct ConnectorState {
    connect_attempts: usize,
    faults: Faults,
    channels: Vec<Arc<Mutex<ChannelRecord>>>,
}

/// [`ChannelConnector`] whose channels record every write
#[derive(Clone, Default)]
pub struct RecordingConnector {
    state: Arc<Mutex<ConnectorState>>,
}

impl RecordingConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `count` connect calls fail
    pub fn fail_connects(&self, count: usize) {
        self.state.lock().unwrap().faults.failing_connects = count;
    }

    /// The next channel opened fails its first write
    pub fn fail_next_handshake(&self) {
        self.state.lock().unwrap().faults.fail_next_handshake = true;
    }

    /// On the next channel opened, writing envelope number `index` (1-based)
    /// fails, and so does every later write
    pub fn fail_next_envelope_at(&self, index: usize) {
        assert!(index >= 1, "envelope index is 1-based");
        self.state.lock().unwrap().faults.fail_next_envelope_at = Some(index);
    }

    /// On the next channel opened, writing envelope number `index` (1-based)
    /// panics inside the channel
    pub fn panic_next_envelope_at(&self, index: usize) {
        assert!(index >= 1, "envelope index is 1-based");
        self.state.lock().unwrap().faults.panic_next_envelope_at = Some(index);
    }

    /// On the next channel opened, every envelope write blocks until the
    /// returned gate is released. Handshake writes pass through
    pub fn hold_next_envelopes(&self) -> Arc<SendGate> {
        let gate = Arc::new(SendGate::default());
        self.state.lock().unwrap().faults.hold_next_envelopes = Some(gate.clone());
        gate
    }

    pub fn connect_attempts(&self) -> usize {
        self.state.lock().unwrap().connect_attempts
    }

    pub fn channel_count(&self) -> usize {
        self.state.lock().unwrap().channels.len()
    }

    /// Snapshot of channel number `index`, in open order
    pub fn channel(&self, index: usize) -> ChannelRecord {
        let record = self.state.lock().unwrap().channels[index].clone();
        let snapshot = record.lock().unwrap().clone();
        snapshot
    }

    pub fn last_channel(&self) -> ChannelRecord {
        let count = self.channel_count();
        assert!(count > 0, "no channel was opened");
        self.channel(count - 1)
    }
}

impl ChannelConnector for RecordingConnector {
    fn connect(
        &self,
        endpoint: &Endpoint,
        channel_name: &str,
    ) -> Result<Box<dyn Channel>, TransportError> {
        let mut state = self.state.lock().unwrap();
        state.connect_attempts += 1;

        if state.faults.failing_connects > 0 {
            state.faults.failing_connects -= 1;
            return Err(TransportError::ConnectFailed {
                channel: channel_name.to_string(),
                host: endpoint.hostname().to_string(),
                port: endpoint.port(),
                reason: "connection refused".to_string(),
            });
        }

        let record = Arc::new(Mutex::new(ChannelRecord {
            name: channel_name.to_string(),
            endpoint: endpoint.clone(),
            events: Vec::new(),
            closed: false,
        }));
        state.channels.push(record.clone());

        // envelope writes follow the handshake writes
        let fail_at_write = if std::mem::take(&mut state.faults.fail_next_handshake) {
            Some(0)
        } else {
            state
                .faults
                .fail_next_envelope_at
                .take()
                .map(|index| HANDSHAKE_EVENTS - 1 + index)
        };

        let panic_at_write = state
            .faults
            .panic_next_envelope_at
            .take()
            .map(|index| HANDSHAKE_EVENTS - 1 + index);
        let gate = state.faults.hold_next_envelopes.take();

        Ok(Box::new(RecordingChannel {
            name: channel_name.to_string(),
            record,
            writes: 0,
            fail_at_write,
            panic_at_write,
            gate,
        }))
    }
}

struct RecordingChannel {
    name: String,
    record: Arc<Mutex<ChannelRecord>>,
    writes: usize,
    fail_at_write: Option<usize>,
    panic_at_write: Option<usize>,
    gate: Option<Arc<SendGate>>,
}

impl RecordingChannel {
    fn write(&mut self, event: WireEvent) -> Result<(), TransportError> {
        let write_index = self.writes;
        self.writes += 1;

        if write_index >= HANDSHAKE_EVENTS {
            if let Some(gate) = &self.gate {
                gate.pass();
            }
        }
        // before taking the record lock, so snapshots stay readable afterwards
        if self.panic_at_write == Some(write_index) {
            panic!("channel '{}' panicked while writing", self.name);
        }

        let mut record = self.record.lock().unwrap();
        if record.closed {
            return Err(TransportError::Closed {
                channel: self.name.clone(),
            });
        }
        if self.fail_at_write.is_some_and(|fail_at| write_index >= fail_at) {
            let len = match &event {
                WireEvent::Int(_) => 4,
                WireEvent::Message(bytes) => bytes.len(),
            };
            return Err(TransportError::SendFailed {
                channel: self.name.clone(),
                len,
                reason: "connection reset by peer".to_string(),
            });
        }
        record.events.push(event);
        Ok(())
    }
}

impl Channel for RecordingChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn send_int(&mut self, value: i32) -> Result<(), TransportError> {
        self.write(WireEvent::Int(value))
    }

    fn send(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        self.write(WireEvent::Message(payload.to_vec()))
    }

    fn close(&mut self) {
        self.record.lock().unwrap().closed = true;
    }
}

impl Drop for RecordingChannel {
    fn drop(&mut self) {
        self.record
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .closed = true;
    }
}
