//! Scripted transports and a stepping clock.
//!
//! Every mock hands out cloneable probes (shared `Rc` state) so a test can
//! keep inspecting what the engine wrote after moving the mock into it.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::rc::Rc;

use homeylink::EngineConfig;
use homeylink::protocol::engine::Engine;
use homeylink::protocol::transport::{Clock, DatagramSocket, Stream, StreamListener};

// ── Stream ────────────────────────────────────────────────────

/// What happened to one scripted connection.
#[derive(Clone, Default)]
pub struct ConnProbe {
    written: Rc<RefCell<Vec<u8>>>,
    closed: Rc<Cell<bool>>,
    reads: Rc<Cell<usize>>,
}

impl ConnProbe {
    pub fn written(&self) -> String {
        String::from_utf8(self.written.borrow().clone()).unwrap()
    }

    pub fn closed(&self) -> bool {
        self.closed.get()
    }

    pub fn reads(&self) -> usize {
        self.reads.get()
    }

    /// Body of the reply (after the blank line).
    pub fn body(&self) -> String {
        let text = self.written();
        text.split_once("\r\n\r\n")
            .map(|(_, body)| body.to_string())
            .unwrap_or_default()
    }
}

/// Replays `chunks` one per read, then reports "no data" forever.
pub struct ScriptedStream {
    chunks: VecDeque<Vec<u8>>,
    probe: ConnProbe,
}

impl ScriptedStream {
    pub fn new(chunks: &[&[u8]]) -> (Self, ConnProbe) {
        let probe = ConnProbe::default();
        let stream = Self {
            chunks: chunks.iter().map(|c| c.to_vec()).collect(),
            probe: probe.clone(),
        };
        (stream, probe)
    }
}

impl Stream for ScriptedStream {
    type Error = ();

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ()> {
        self.probe.reads.set(self.probe.reads.get() + 1);
        let Some(mut chunk) = self.chunks.pop_front() else {
            return Ok(0);
        };
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            self.chunks.push_front(chunk.split_off(n));
        }
        Ok(n)
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), ()> {
        self.probe.written.borrow_mut().extend_from_slice(data);
        Ok(())
    }

    fn close(&mut self) {
        self.probe.closed.set(true);
    }
}

/// Listener fed with connections by the test.
#[derive(Clone)]
pub struct MockListener {
    pending: Rc<RefCell<VecDeque<(ScriptedStream, SocketAddr)>>>,
    can_close: bool,
}

impl MockListener {
    pub fn new() -> Self {
        Self {
            pending: Rc::default(),
            can_close: true,
        }
    }

    /// A platform whose connections cannot be closed by the device.
    pub fn unclosable() -> Self {
        Self {
            can_close: false,
            ..Self::new()
        }
    }

    /// Queue a connection whose peer sends `chunks`.
    pub fn connect(&self, peer: SocketAddr, chunks: &[&[u8]]) -> ConnProbe {
        let (stream, probe) = ScriptedStream::new(chunks);
        self.pending.borrow_mut().push_back((stream, peer));
        probe
    }
}

impl StreamListener for MockListener {
    type Stream = ScriptedStream;
    type Error = ();

    fn accept(&mut self) -> Result<Option<(ScriptedStream, SocketAddr)>, ()> {
        Ok(self.pending.borrow_mut().pop_front())
    }

    fn can_close(&self) -> bool {
        self.can_close
    }
}

// ── Datagrams ─────────────────────────────────────────────────

/// Datagram socket with a test-fed inbox and a recorded outbox.
#[derive(Clone, Default)]
pub struct MockSocket {
    inbox: Rc<RefCell<VecDeque<(Vec<u8>, SocketAddr)>>>,
    sent: Rc<RefCell<Vec<(Vec<u8>, SocketAddr)>>>,
}

impl MockSocket {
    pub fn deliver(&self, from: SocketAddr, data: &[u8]) {
        self.inbox.borrow_mut().push_back((data.to_vec(), from));
    }

    pub fn sent(&self) -> Vec<(String, SocketAddr)> {
        self.sent
            .borrow()
            .iter()
            .map(|(d, a)| (String::from_utf8(d.clone()).unwrap(), *a))
            .collect()
    }
}

impl DatagramSocket for MockSocket {
    type Error = ();

    fn recv_from(&mut self, buf: &mut [u8]) -> Result<Option<(usize, SocketAddr)>, ()> {
        let Some((data, from)) = self.inbox.borrow_mut().pop_front() else {
            return Ok(None);
        };
        let n = data.len().min(buf.len());
        buf[..n].copy_from_slice(&data[..n]);
        Ok(Some((n, from)))
    }

    fn send_to(&mut self, data: &[u8], addr: SocketAddr) -> Result<(), ()> {
        self.sent.borrow_mut().push((data.to_vec(), addr));
        Ok(())
    }
}

// ── Clock ─────────────────────────────────────────────────────

/// Advances by `step` ms every time it is read.
pub struct StepClock {
    now: Cell<u64>,
    step: u64,
}

impl StepClock {
    pub fn new(step: u64) -> Self {
        Self {
            now: Cell::new(0),
            step,
        }
    }
}

impl Clock for StepClock {
    fn now_ms(&self) -> u64 {
        let now = self.now.get();
        self.now.set(now + self.step);
        now
    }
}

// ── Fixture ───────────────────────────────────────────────────

pub type TestEngine = Engine<MockListener, MockSocket, StepClock>;

pub struct Rig {
    pub engine: TestEngine,
    pub listener: MockListener,
    pub socket: MockSocket,
}

pub fn rig_with(config: EngineConfig, listener: MockListener) -> Rig {
    let socket = MockSocket::default();
    let mut engine = Engine::new(config, listener.clone(), socket.clone(), StepClock::new(10));
    engine.begin("test-device", "homeyduino").unwrap();
    Rig {
        engine,
        listener,
        socket,
    }
}

pub fn rig() -> Rig {
    rig_with(EngineConfig::default(), MockListener::new())
}

pub fn addr(s: &str) -> SocketAddr {
    s.parse().unwrap()
}
