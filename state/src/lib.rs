//! Off-chain mirror of the sign-up registry and its polls.
//!
//! [`MaciState`] owns the sign-up accumulator, the ordered state leaves and the
//! registry of polls. It is rebuilt from the chain event log by the coordinator
//! and handed to the prover.

pub mod constants;
pub mod error;
pub mod hash;
pub mod leaf;
pub mod maci;
pub mod poll;
pub mod record;
pub mod types;


pub use error::StateError;
pub use leaf::StateLeaf;
pub use maci::{MaciState, PollSlot, ProcessingStatus};
pub use poll::{
    BatchSizes,
    IncrementalTree,
    Keypair,
    KeyError,
    MaxValues,
    Message,
    Poll,
    PrivateKey,
    PublicKey,
    TreeDepths,
    TreeError
};
pub use record::MaciStateRecord;
pub use types::*;
