//! Mock USART register file for host tests.

extern crate std;

use std::collections::VecDeque;
use std::sync::Mutex;
use std::vec::Vec;

use super::peripheral::UsartRegisters;
use super::registers as reg;

/// Register file that records every write and plays back queued input on
/// DATA reads. Lock-protected so it can be shared with an "ISR" thread.
pub(crate) struct MockUsart {
    state: Mutex<State>,
}

struct State {
    regs: [u8; 8],
    /// Write log in chronological order, DATA writes included.
    log: Vec<(u8, u8)>,
    /// Bytes the wire will deliver, one per DATA read.
    incoming: VecDeque<u8>,
    /// Bytes written to DATA.
    sent: Vec<u8>,
}

impl MockUsart {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(State {
                regs: [0; 8],
                log: Vec::new(),
                incoming: VecDeque::new(),
                sent: Vec::new(),
            }),
        }
    }

    /// Queue bytes to be returned by successive DATA reads.
    pub(crate) fn feed(&self, bytes: &[u8]) {
        self.state.lock().unwrap().incoming.extend(bytes.iter().copied());
    }

    /// `true` while queued input remains (the RXC condition).
    pub(crate) fn has_incoming(&self) -> bool {
        !self.state.lock().unwrap().incoming.is_empty()
    }

    /// Bytes transmitted through DATA so far.
    pub(crate) fn sent(&self) -> Vec<u8> {
        self.state.lock().unwrap().sent.clone()
    }

    /// Current value of a non-DATA register.
    pub(crate) fn reg(&self, offset: u8) -> u8 {
        self.state.lock().unwrap().regs[offset as usize]
    }

    /// Every write so far, as `(offset, value)`.
    pub(crate) fn writes(&self) -> Vec<(u8, u8)> {
        self.state.lock().unwrap().log.clone()
    }

    pub(crate) fn clear_log(&self) {
        self.state.lock().unwrap().log.clear();
    }
}

impl UsartRegisters for MockUsart {
    fn read(&self, offset: u8) -> u8 {
        let mut state = self.state.lock().unwrap();
        if offset == reg::DATA {
            state.incoming.pop_front().unwrap_or(0)
        } else {
            state.regs[offset as usize]
        }
    }

    fn write(&self, offset: u8, value: u8) {
        let mut state = self.state.lock().unwrap();
        state.log.push((offset, value));
        if offset == reg::DATA {
            state.sent.push(value);
        } else {
            state.regs[offset as usize] = value;
        }
    }
}
