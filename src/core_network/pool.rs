use super::error::{ConnectionError, PoolError};
use crate::core_server::CoreStatus;
use log::{debug, info, trace, warn};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;

pub type ConnectionId = u64;

/// Anything a pool can keep alive by ticking it.
pub trait Connection: Send + 'static {
    fn id(&self) -> ConnectionId;

    /// One self-service step. An error means the connection must be dropped.
    fn service(&mut self) -> Result<(), ConnectionError>;

    fn poison(&mut self);

    fn is_poisoned(&self) -> bool;

    /// Releases every resource. Must be safe to call more than once.
    fn destroy(&mut self);

    fn is_destroyed(&self) -> bool;
}

/// A pooled connection, shared between the pool and the task driving its socket.
pub struct SharedConnection<C> {
    id: ConnectionId,
    inner: Arc<Mutex<C>>,
}

impl<C> Clone for SharedConnection<C> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Connection> SharedConnection<C> {
    pub fn new(connection: C) -> Self {
        Self {
            id: connection.id(),
            inner: Arc::new(Mutex::new(connection)),
        }
    }
}

impl<C> SharedConnection<C> {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub async fn lock(&self) -> MutexGuard<'_, C> {
        self.inner.lock().await
    }
}

pub struct ConnectionPool<C: Connection> {
    name: &'static str,
    core: Arc<CoreStatus>,
    connections: StdMutex<HashMap<ConnectionId, SharedConnection<C>>>,
    destroyed: AtomicBool,
}

impl<C: Connection> ConnectionPool<C> {
    pub fn new(name: &'static str, core: Arc<CoreStatus>) -> Self {
        Self {
            name,
            core,
            connections: StdMutex::new(HashMap::new()),
            destroyed: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn initialize(&self) -> Result<(), PoolError> {
        if self.is_destroyed() {
            return Err(PoolError::Destroyed(self.name));
        }
        debug!("Connection pool {} initialized", self.name);
        Ok(())
    }

    pub fn add(&self, connection: SharedConnection<C>) -> Result<(), PoolError> {
        if self.is_destroyed() {
            return Err(PoolError::Destroyed(self.name));
        }
        trace!("Pool {}: adding connection {}", self.name, connection.id());
        self.entries().insert(connection.id(), connection);
        Ok(())
    }

    pub fn remove(&self, id: ConnectionId) -> Option<SharedConnection<C>> {
        let removed = self.entries().remove(&id);
        if removed.is_some() {
            trace!("Pool {}: removed connection {}", self.name, id);
        }
        removed
    }

    pub fn size(&self) -> usize {
        self.entries().len()
    }

    /// Snapshot of the pooled connections, safe to walk while the pool changes.
    pub fn list(&self) -> Vec<SharedConnection<C>> {
        self.entries().values().cloned().collect()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    /// Ticks every live connection once.
    ///
    /// Destroyed connections are removed without being ticked. While the server core is
    /// poisoned every connection is poisoned before its tick. A connection whose tick fails
    /// is destroyed and removed; the other connections are not affected.
    pub async fn service(&self) {
        if self.is_destroyed() {
            return;
        }
        let core_poisoned = self.core.is_poisoned();

        for connection in self.list() {
            let mut guard = connection.lock().await;
            if guard.is_destroyed() {
                drop(guard);
                self.remove(connection.id());
                continue;
            }
            if core_poisoned && !guard.is_poisoned() {
                guard.poison();
            }

            let result = panic::catch_unwind(AssertUnwindSafe(|| guard.service()))
                .unwrap_or(Err(ConnectionError::Panicked));
            if let Err(e) = result {
                match e {
                    ConnectionError::Closed | ConnectionError::Poisoned => {
                        debug!("Pool {}: connection {} done: {}", self.name, connection.id(), e)
                    }
                    _ => warn!(
                        "Pool {}: dropping connection {}: {}",
                        self.name,
                        connection.id(),
                        e
                    ),
                }
                guard.destroy();
                drop(guard);
                self.remove(connection.id());
            }
        }
    }

    /// Destroys every connection and leaves the pool empty. Idempotent.
    pub async fn destroy(&self) {
        let first = !self.destroyed.swap(true, Ordering::AcqRel);
        let drained: Vec<_> = self.entries().drain().map(|(_, c)| c).collect();
        for connection in drained {
            let mut guard = connection.lock().await;
            if !guard.is_destroyed() {
                guard.destroy();
            }
        }
        if first {
            info!("Connection pool {} destroyed", self.name);
        }
    }

    /// Keeps ticking the pool until it is destroyed.
    pub fn spawn_service(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let pool = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                if pool.is_destroyed() {
                    break;
                }
                pool.service().await;
            }
            debug!("Service loop of pool {} stopped", pool.name);
        })
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<ConnectionId, SharedConnection<C>>> {
        self.connections
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
