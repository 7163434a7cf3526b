//! The interface to the external proof backend.

mod command;
mod staging;
mod zkey;

pub use command::CommandBackend;
pub use staging::StagingDir;
pub use zkey::{VotingMode, ZkeyLocator, ZkeyPaths};

use std::path::Path;

use async_trait::async_trait;
use infimum_state::{Keypair, MaciState, PollId};
use serde::{Deserialize, Serialize};

use crate::chain::Address;
use crate::error::ServiceError;

/// A single groth16 proof with the public inputs it attests to.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofData
{
    pub circuit: String,
    pub proof: serde_json::Value,
    pub public_inputs: Vec<String>
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TallyOutput
{
    pub tally_proofs: Vec<ProofData>,

    /// The tally artifact committed to on chain.
    pub tally_data: serde_json::Value
}

/// Everything the backend needs to prove one poll.
pub struct ProofJob<'a>
{
    /// The reconstructed state; the target poll holds its sign-up snapshot.
    pub state: &'a MaciState,

    pub poll_id: PollId,

    /// The authenticated coordinator keypair.
    pub coordinator: &'a Keypair,

    pub tally_address: Address,

    pub zkeys: &'a ZkeyPaths,

    /// Staging directory the backend writes into.
    pub output_dir: &'a Path,

    /// Network whose verifier parameters the tally commitments target.
    pub network: &'a str
}

#[async_trait]
pub trait ProofBackend: Send + Sync
{
    async fn generate_message_processing_proofs(&self, job: &ProofJob<'_>) -> Result<Vec<ProofData>, ServiceError>;

    async fn generate_tally_proofs(&self, job: &ProofJob<'_>) -> Result<TallyOutput, ServiceError>;
}
