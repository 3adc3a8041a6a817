//! At-most-one in-flight operation per scope

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::error::ProtocolError;
use crate::types::KeyScope;

/// Set of scopes with an operation in flight.
///
/// Claims are taken synchronously before the first suspension point, so two
/// concurrent calls can never both pass.
#[derive(Clone)]
pub struct InFlight {
    operation: &'static str,
    active: Arc<Mutex<HashSet<KeyScope>>>,
}

impl InFlight {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            active: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Claim the scope, or fail with `OperationInProgress`.
    pub fn claim(&self, scope: KeyScope) -> Result<InFlightGuard, ProtocolError> {
        let mut active = self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !active.insert(scope) {
            tracing::debug!(%scope, operation = self.operation, "rejected concurrent operation");
            return Err(ProtocolError::OperationInProgress {
                operation: self.operation,
                scope,
            });
        }
        Ok(InFlightGuard {
            scope,
            active: Arc::clone(&self.active),
        })
    }

    /// No scope has an operation in flight
    pub fn is_idle(&self) -> bool {
        self.active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_empty()
    }

    pub fn is_active(&self, scope: &KeyScope) -> bool {
        self.active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(scope)
    }
}

/// Releases the claim when dropped, on every exit path including cancellation
pub struct InFlightGuard {
    scope: KeyScope,
    active: Arc<Mutex<HashSet<KeyScope>>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&self.scope);
    }
}
