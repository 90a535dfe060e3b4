//! Scoped access to per-phone sessions.
//!
//! Two requests for the same phone number would otherwise race on the same
//! on-disk session file, so the registry serializes them with a keyed lock
//! held for the whole connect-operate-teardown span.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::connector::{ClientSession, Connector};
use super::TransportError;

type LockMap = Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>;

pub struct SessionRegistry {
    connector: Arc<dyn Connector>,
    locks: LockMap,
}

impl SessionRegistry {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Acquire the phone's lock, open its session slot and connect.
    ///
    /// The returned lease tears the session down when dropped, so connect
    /// and teardown always pair up — on success, on error, and when the
    /// request is cancelled mid-operation.
    pub async fn lease(&self, phone: &str) -> Result<SessionLease, TransportError> {
        let slot = self.slot(phone);
        let guard = slot.lock_owned().await;
        let session = match self.connector.open(phone).await {
            Ok(session) => session,
            Err(e) => {
                drop(guard);
                evict_idle(&self.locks, phone);
                return Err(e);
            }
        };
        Ok(SessionLease {
            guard: Some(guard),
            locks: Arc::clone(&self.locks),
            phone: phone.to_string(),
            session,
        })
    }

    fn slot(&self, phone: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(locks.entry(phone.to_string()).or_default())
    }

    #[cfg(test)]
    fn slot_count(&self) -> usize {
        self.locks.lock().unwrap().len()
    }
}

/// Remove the phone's slot if nothing holds or awaits its lock.
///
/// Both the guard and every waiter keep an `Arc` clone of the mutex, so a
/// strong count of one means only the map itself still refers to it.
fn evict_idle(locks: &LockMap, phone: &str) {
    let mut locks = locks.lock().unwrap_or_else(|e| e.into_inner());
    if locks
        .get(phone)
        .is_some_and(|slot| Arc::strong_count(slot) == 1)
    {
        locks.remove(phone);
    }
}

/// Exclusive use of one phone's connected session
pub struct SessionLease {
    guard: Option<OwnedMutexGuard<()>>,
    locks: LockMap,
    phone: String,
    session: Box<dyn ClientSession>,
}

impl Deref for SessionLease {
    type Target = dyn ClientSession;

    fn deref(&self) -> &Self::Target {
        &*self.session
    }
}

impl DerefMut for SessionLease {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.session
    }
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        self.session.close();
        drop(self.guard.take());
        evict_idle(&self.locks, &self.phone);
    }
}
