//! Capability object for the external privacy SDK
//!
//! The SDK is either not ready yet or fully usable; there is no state in
//! between where some of its operations exist and others do not.

use std::sync::{Arc, RwLock};

use crate::error::ProtocolError;

pub enum Sdk<P> {
    Uninitialized,
    Initialized(Arc<P>),
}

impl<P> Clone for Sdk<P> {
    fn clone(&self) -> Self {
        match self {
            Sdk::Uninitialized => Sdk::Uninitialized,
            Sdk::Initialized(p) => Sdk::Initialized(Arc::clone(p)),
        }
    }
}

/// Shared, late-bound view of the SDK used by every component
pub struct SdkHandle<P> {
    inner: Arc<RwLock<Sdk<P>>>,
}

impl<P> Clone for SdkHandle<P> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<P> Default for SdkHandle<P> {
    fn default() -> Self {
        Self::uninitialized()
    }
}

impl<P> SdkHandle<P> {
    pub fn uninitialized() -> Self {
        Self { inner: Arc::new(RwLock::new(Sdk::Uninitialized)) }
    }

    pub fn initialized(primitive: P) -> Self {
        Self { inner: Arc::new(RwLock::new(Sdk::Initialized(Arc::new(primitive)))) }
    }

    /// Called once the external SDK signals it is ready.
    pub fn initialize(&self, primitive: P) {
        let mut sdk = self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *sdk = Sdk::Initialized(Arc::new(primitive));
        tracing::info!("privacy SDK initialized");
    }

    pub fn current(&self) -> Sdk<P> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner()).clone()
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.current(), Sdk::Initialized(_))
    }

    /// The primitive, or `SdkNotInitialized`
    pub fn primitive(&self) -> Result<Arc<P>, ProtocolError> {
        match self.current() {
            Sdk::Initialized(p) => Ok(p),
            Sdk::Uninitialized => Err(ProtocolError::SdkNotInitialized),
        }
    }
}
