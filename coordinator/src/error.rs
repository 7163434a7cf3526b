use std::path::PathBuf;
use std::time::Duration;

use infimum_state::{BlockNumber, KeyError, PollId, StateError};
use thiserror::Error;

/// Failures of a proof generation request.
///
/// Messages carry poll ids, block ranges and public values only; key material never
/// reaches an error.
#[derive(Debug, Error)]
pub enum ServiceError
{
    /// The poll is absent from the chain registry or from the reconstructed state.
    #[error("poll {0} not found")]
    PollNotFound(PollId),

    #[error("state tree of poll {0} has not been merged")]
    StateNotMerged(PollId),

    #[error("message tree of poll {0} has not been merged")]
    MessageTreeNotMerged(PollId),

    /// The decrypted coordinator key does not derive the committed public key.
    #[error("coordinator key mismatch for poll {poll_id}: expected {expected}, derived {actual}")]
    PrivateKeyMismatch { poll_id: PollId, expected: String, actual: String },

    /// A block window could not be read within the retry budget.
    #[error("failed to scan events in blocks {from}..={to}: {reason}")]
    EventScanFailure { from: BlockNumber, to: BlockNumber, reason: String },

    /// The replayed state does not agree with the chain.
    #[error("reconstructed state diverges from chain: {0}")]
    ReconstructionDivergence(String),

    #[error("proof backend failed: {0}")]
    ProofBackendFailure(String),

    #[error("proof generation timed out after {0:?}")]
    ProofGenerationTimeout(Duration),

    #[error("proving key {0} does not exist")]
    ZkeyNotFound(PathBuf),

    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("chain read failed: {0}")]
    Chain(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
