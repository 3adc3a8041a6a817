//! Concrete implementations of the ports

pub mod file_store;
pub mod local_network;
pub mod lockfile;
pub mod memory_store;

pub use file_store::EncryptedFileKeyStore;
pub use local_network::LocalNetwork;
pub use memory_store::InMemoryKeyStore;
