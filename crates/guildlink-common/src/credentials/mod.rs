//! Credential store implementations

mod static_store;

pub use static_store::StaticCredentialStore;
