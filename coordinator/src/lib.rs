//! Coordinator side of infimum: reconstructs a poll from the chain, authenticates
//! the coordinator key and drives the prover.

pub mod chain;
pub mod config;
pub mod crypto;
pub mod error;
pub mod logger;
pub mod prover;
pub mod reconstruct;
pub mod service;

#[cfg(test)]
mod tests;

pub use chain::{Address, ChainReader, SnapshotChain};
pub use config::CoordinatorConfig;
pub use crypto::{AesGcmDecryptor, Decryptor, EnvKeyStore, KeyStore};
pub use error::ServiceError;
pub use prover::{CommandBackend, ProofBackend, ProofData, ZkeyLocator};
pub use reconstruct::{Replayer, RetryPolicy, ScanRange};
pub use service::{ProofBundle, ProofRequest, ProofService, ServiceConfig, Stage};
