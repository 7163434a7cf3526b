//! The proof generation pipeline.
//!
//! A request moves through the [`Stage`]s in order and fails at the first unmet
//! precondition. Every check which can reject a request runs before events are
//! scanned and before the backend is invoked.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use infimum_state::{BlockNumber, Keypair, PollId, StateError};
use serde::{Deserialize, Serialize};
use tracing::{info, info_span, Instrument};

use crate::chain::{Address, ChainReader};
use crate::crypto::{parse_private_key, Decryptor, KeyStore};
use crate::error::ServiceError;
use crate::prover::{ProofBackend, ProofData, ProofJob, StagingDir, VotingMode, ZkeyLocator};
use crate::reconstruct::{self, RetryPolicy, ScanRange};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Stage
{
    AddressResolved,
    PreconditionsChecked,
    KeyAuthenticated,
    StateReconstructed,
    ProofsGenerated
}

impl fmt::Display for Stage
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Clone, Debug)]
pub struct ProofRequest
{
    pub poll_id: PollId,
    pub maci_address: Address,
    pub tally_address: Address,
    pub use_quadratic_voting: bool,

    /// The coordinator key, encrypted under the service's key material.
    pub encrypted_coordinator_private_key: Vec<u8>,

    pub start_block: BlockNumber,
    pub end_block: BlockNumber,
    pub blocks_per_batch: u64
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofBundle
{
    pub poll_id: PollId,
    pub process_proofs: Vec<ProofData>,
    pub tally_proofs: Vec<ProofData>,
    pub tally_data: serde_json::Value,

    /// Where the artifacts were published.
    pub output_dir: PathBuf,

    /// The stages completed, in order.
    pub stages: Vec<Stage>
}

#[derive(Clone, Debug)]
pub struct ServiceConfig
{
    pub zkeys: ZkeyLocator,
    pub output_dir: PathBuf,
    pub proof_timeout: Duration,
    pub retry: RetryPolicy,
    pub network: String
}

pub struct ProofService
{
    chain: Arc<dyn ChainReader>,
    key_store: Arc<dyn KeyStore>,
    decryptor: Arc<dyn Decryptor>,
    backend: Arc<dyn ProofBackend>,
    config: ServiceConfig
}

impl ProofService
{
    pub fn new(
        chain: Arc<dyn ChainReader>,
        key_store: Arc<dyn KeyStore>,
        decryptor: Arc<dyn Decryptor>,
        backend: Arc<dyn ProofBackend>,
        config: ServiceConfig
    ) -> ProofService
    {
        ProofService { chain, key_store, decryptor, backend, config }
    }

    pub fn config(&self) -> &ServiceConfig { &self.config }

    pub async fn generate_proofs(&self, request: ProofRequest) -> Result<ProofBundle, ServiceError>
    {
        let span = info_span!("generate_proofs", poll_id = request.poll_id);
        self.run(request).instrument(span).await
    }

    async fn run(&self, request: ProofRequest) -> Result<ProofBundle, ServiceError>
    {
        let poll_id = request.poll_id;
        let maci = &request.maci_address;
        let mut stages = Vec::with_capacity(5);

        // Resolve the poll and read its configuration.
        let poll_address = self.chain.get_poll_address(maci, poll_id).await?;
        if poll_address.is_zero() { Err(ServiceError::PollNotFound(poll_id))? }

        let (poll_config, state_tree_depth, state_accumulator) = tokio::try_join!(
            self.chain.get_poll_config(&poll_address),
            self.chain.get_state_tree_depth(maci),
            self.chain.get_state_accumulator_address(maci)
        )?;
        complete(&mut stages, Stage::AddressResolved);

        // The state tree must be merged, then both merged roots are read together.
        if !poll_config.state_merged { Err(ServiceError::StateNotMerged(poll_id))? }

        let (message_root, state_root) = tokio::try_join!(
            self.chain.get_accumulator_root(&poll_config.message_accumulator_address, poll_config.tree_depths.message_tree_depth),
            self.chain.get_accumulator_root(&state_accumulator, state_tree_depth)
        )?;
        if message_root == [0u8; 32] { Err(ServiceError::MessageTreeNotMerged(poll_id))? }
        complete(&mut stages, Stage::PreconditionsChecked);

        // Recover the coordinator key and check it against the poll's commitment.
        let coordinator = {
            let material = self.key_store.key_material().await?;
            let plaintext = self.decryptor.decrypt(&material, &request.encrypted_coordinator_private_key)?;
            Keypair::from_private_key(parse_private_key(&plaintext)?)
        };
        if coordinator.public_key != poll_config.coordinator_public_key
        {
            Err(ServiceError::PrivateKeyMismatch {
                poll_id,
                expected: poll_config.coordinator_public_key.serialize(),
                actual: coordinator.public_key.serialize()
            })?
        }
        complete(&mut stages, Stage::KeyAuthenticated);

        // Replay the event log and check the result against the merged roots.
        let range = ScanRange {
            start_block: request.start_block,
            end_block: request.end_block,
            blocks_per_batch: request.blocks_per_batch
        };
        let mut state = reconstruct::reconstruct(
            self.chain.as_ref(),
            maci,
            state_tree_depth,
            poll_id,
            &range,
            &self.config.retry
        ).await?;

        let poll = state.poll(poll_id).map_err(|error| match error
        {
            StateError::PollNotFound(_) | StateError::NullPoll(_) => ServiceError::PollNotFound(poll_id),
            error => error.into(),
        })?;

        if poll.coordinator().public_key != poll_config.coordinator_public_key
        {
            Err(ServiceError::ReconstructionDivergence(format!("poll {} was deployed with a different coordinator key", poll_id)))?
        }
        if *poll.tree_depths() != poll_config.tree_depths
        {
            Err(ServiceError::ReconstructionDivergence(format!("poll {} was deployed with different tree depths", poll_id)))?
        }
        check_root("state", &state_root, &state.state_root()?)?;
        check_root("message", &message_root, &poll.message_root()?)?;

        let tree_depths = *poll.tree_depths();
        state.begin_processing(poll_id)?;
        complete(&mut stages, Stage::StateReconstructed);

        // Generate into a staging directory and publish it only on success.
        let mode = VotingMode::from_flag(request.use_quadratic_voting);
        let zkeys = self.config.zkeys.resolve(state_tree_depth, &tree_depths, mode).await?;
        let staging = StagingDir::create(&self.config.output_dir, poll_id).await?;

        let job = ProofJob {
            state: &state,
            poll_id,
            coordinator: &coordinator,
            tally_address: request.tally_address,
            zkeys: &zkeys,
            output_dir: staging.path(),
            network: &self.config.network
        };

        let generate = async {
            let process_proofs = self.backend.generate_message_processing_proofs(&job).await?;
            info!(proofs = process_proofs.len(), "message processing proofs generated");

            let tally = self.backend.generate_tally_proofs(&job).await?;
            info!(proofs = tally.tally_proofs.len(), "tally proofs generated");

            Ok::<_, ServiceError>((process_proofs, tally))
        };

        let timeout = self.config.proof_timeout;
        let (process_proofs, tally) = tokio::time::timeout(timeout, generate)
            .await
            .map_err(|_| ServiceError::ProofGenerationTimeout(timeout))??;

        let output_dir = staging.publish().await?;
        complete(&mut stages, Stage::ProofsGenerated);

        Ok(ProofBundle {
            poll_id,
            process_proofs,
            tally_proofs: tally.tally_proofs,
            tally_data: tally.tally_data,
            output_dir,
            stages
        })
    }
}

fn complete(stages: &mut Vec<Stage>, stage: Stage)
{
    info!(%stage, "stage complete");
    stages.push(stage);
}

fn check_root(tree: &str, expected: &[u8; 32], actual: &[u8; 32]) -> Result<(), ServiceError>
{
    if expected != actual
    {
        Err(ServiceError::ReconstructionDivergence(format!(
            "{} root is {} on chain but {} after replay",
            tree,
            hex::encode(expected),
            hex::encode(actual)
        )))?
    }
    Ok(())
}
