use log::info;
use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreState {
    Running,
    /// Shutting down: every connection is being poisoned. There is no way back.
    Poisoned,
}

/// Process wide server state shared by every connection pool.
#[derive(Debug, Default)]
pub struct CoreStatus {
    state: AtomicU8,
}

const RUNNING: u8 = 0;
const POISONED: u8 = 1;

impl CoreStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CoreState {
        match self.state.load(Ordering::Acquire) {
            RUNNING => CoreState::Running,
            _ => CoreState::Poisoned,
        }
    }

    pub fn is_poisoned(&self) -> bool {
        self.state() == CoreState::Poisoned
    }

    pub fn poison(&self) {
        if self.state.swap(POISONED, Ordering::AcqRel) == RUNNING {
            info!("Server core poisoned, connections will be closed");
        }
    }
}
