mod crypto;

use std::path::Path;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use infimum_state::hash::from_u64;
use infimum_state::record::{public_key_to_record, FieldRecord};
use infimum_state::{
    BlockNumber,
    HashBytes,
    Keypair,
    MaciState,
    MaxValues,
    Message,
    PollId,
    PrivateKey,
    PublicKey,
    TreeDepths
};
use zeroize::Zeroizing;

use crate::chain::{
    AccumulatorRecord,
    Address,
    ChainEvent,
    ChainReader,
    ChainSnapshot,
    DeployPollEvent,
    EventKind,
    PollConfig,
    PollContractRecord,
    PublishMessageEvent,
    SignUpEvent,
    SnapshotChain
};
use crate::crypto::{AesGcmDecryptor, KeyMaterial, KeyStore};
use crate::error::ServiceError;
use crate::prover::{ProofBackend, ProofData, ProofJob, TallyOutput, ZkeyLocator};
use crate::reconstruct::RetryPolicy;
use crate::service::{ProofRequest, ProofService, ServiceConfig};

pub const MACI: Address = Address([1u8; 20]);
pub const STATE_ACCUMULATOR: Address = Address([2u8; 20]);
pub const TARGET_POLL: Address = Address([3u8; 20]);
pub const MESSAGE_ACCUMULATOR: Address = Address([4u8; 20]);
pub const EARLIER_POLL: Address = Address([5u8; 20]);
pub const TALLY: Address = Address([6u8; 20]);

pub const STATE_TREE_DEPTH: u8 = 4;
pub const TARGET_POLL_ID: PollId = 1;

pub const KEY_MATERIAL: [u8; 32] = [9u8; 32];

pub fn get_coordinator() -> Keypair
{
    Keypair::from_private_key(PrivateKey::from_bytes([7u8; 32]).unwrap())
}

pub fn get_public_key(seed: u64) -> PublicKey
{
    PublicKey { x: from_u64(seed), y: from_u64(seed + 1) }
}

pub fn get_tree_depths() -> TreeDepths
{
    TreeDepths {
        int_state_tree_depth: 1,
        message_tree_depth: 2,
        message_tree_sub_depth: 1,
        vote_option_tree_depth: 2
    }
}

pub fn get_message(seed: u64) -> Message
{
    Message::new(core::array::from_fn(|i| from_u64(seed * 10 + i as u64)))
}

fn event(block: BlockNumber, log_index: u32, kind: EventKind) -> ChainEvent
{
    ChainEvent { block, log_index, kind }
}

fn sign_up(block: BlockNumber, log_index: u32, state_index: u32) -> ChainEvent
{
    event(block, log_index, EventKind::SignUp(SignUpEvent {
        state_index,
        public_key: get_public_key(u64::from(state_index) * 10),
        voice_credit_balance: 100,
        timestamp: u64::from(state_index)
    }))
}

fn deploy(block: BlockNumber, poll_id: PollId) -> ChainEvent
{
    event(block, 0, EventKind::DeployPoll(DeployPollEvent {
        poll_id,
        end_timestamp: 1000,
        max_values: MaxValues { max_messages: 25, max_vote_options: 25 },
        tree_depths: get_tree_depths(),
        message_batch_size: 5,
        coordinator_public_key: get_coordinator().public_key
    }))
}

fn publish(block: BlockNumber, log_index: u32, poll_id: PollId, seed: u64) -> ChainEvent
{
    event(block, log_index, EventKind::PublishMessage(PublishMessageEvent {
        poll_id,
        message: get_message(seed),
        enc_pub_key: get_public_key(500 + seed)
    }))
}

/// Three sign-ups, an earlier poll with one message, then the target poll with three
/// messages and one late sign-up.
pub fn get_events() -> Vec<ChainEvent>
{
    vec![
        sign_up(10, 0, 1),
        sign_up(10, 1, 2),
        sign_up(11, 0, 3),
        deploy(12, 0),
        publish(13, 0, 0, 99),
        deploy(20, TARGET_POLL_ID),
        publish(21, 0, TARGET_POLL_ID, 1),
        publish(21, 1, TARGET_POLL_ID, 2),
        publish(25, 0, TARGET_POLL_ID, 3),
        sign_up(26, 0, 4),
    ]
}

/// The state the events describe, built directly through the engine.
pub fn get_expected_state() -> MaciState
{
    let mut state = MaciState::new(STATE_TREE_DEPTH).unwrap();
    for index in 1..=4u64
    {
        state.sign_up(get_public_key(index * 10), 100, index).unwrap();
    }

    state.deploy_null_poll().unwrap();
    state.deploy_poll(
        1000,
        MaxValues { max_messages: 25, max_vote_options: 25 },
        get_tree_depths(),
        5,
        Keypair::from_public_key(get_coordinator().public_key)
    ).unwrap();

    let poll = state.poll_mut(TARGET_POLL_ID).unwrap();
    for seed in 1..=3
    {
        poll.publish_message(get_message(seed), get_public_key(500 + seed)).unwrap();
    }

    state
}

/// A chain whose merged roots agree with [`get_events`].
pub fn get_snapshot() -> ChainSnapshot
{
    let expected = get_expected_state();
    let state_root: HashBytes = expected.state_root().unwrap();
    let message_root: HashBytes = expected.poll(TARGET_POLL_ID).unwrap().message_root().unwrap();

    let mut snapshot = ChainSnapshot {
        maci_address: MACI,
        state_tree_depth: STATE_TREE_DEPTH,
        state_accumulator_address: STATE_ACCUMULATOR,
        polls: vec![EARLIER_POLL, TARGET_POLL],
        ..Default::default()
    };

    snapshot.poll_contracts.insert(TARGET_POLL, PollContractRecord {
        message_accumulator_address: MESSAGE_ACCUMULATOR,
        coordinator_pub_key: public_key_to_record(&get_coordinator().public_key),
        tree_depths: get_tree_depths(),
        state_merged: true
    });
    snapshot.accumulators.insert(STATE_ACCUMULATOR, AccumulatorRecord { depth: STATE_TREE_DEPTH, root: FieldRecord(state_root) });
    snapshot.accumulators.insert(MESSAGE_ACCUMULATOR, AccumulatorRecord { depth: 2, root: FieldRecord(message_root) });
    snapshot.events = get_events().iter().map(Into::into).collect();

    snapshot
}

pub fn get_request(encrypted_key: Vec<u8>) -> ProofRequest
{
    ProofRequest {
        poll_id: TARGET_POLL_ID,
        maci_address: MACI,
        tally_address: TALLY,
        use_quadratic_voting: false,
        encrypted_coordinator_private_key: encrypted_key,
        start_block: 0,
        end_block: 30,
        blocks_per_batch: 7
    }
}

pub fn encrypt_key(private_key: &PrivateKey) -> Vec<u8>
{
    AesGcmDecryptor::encrypt(&KEY_MATERIAL, [3u8; 12], private_key.serialize().as_bytes()).unwrap()
}

pub fn get_encrypted_coordinator_key() -> Vec<u8>
{
    encrypt_key(&PrivateKey::from_bytes([7u8; 32]).unwrap())
}

/// Creates empty proving keys for the fixture's tree configuration.
pub fn create_zkeys(dir: &Path)
{
    let locator = ZkeyLocator::new(dir);
    let paths = locator.paths(STATE_TREE_DEPTH, &get_tree_depths(), crate::prover::VotingMode::NonQuadratic);
    std::fs::write(paths.process_messages, b"").unwrap();
    std::fs::write(paths.tally_votes, b"").unwrap();
}

pub fn get_service_config(zkeys_dir: &Path, output_dir: &Path) -> ServiceConfig
{
    ServiceConfig {
        zkeys: ZkeyLocator::new(zkeys_dir),
        output_dir: output_dir.to_path_buf(),
        proof_timeout: Duration::from_secs(30),
        retry: RetryPolicy { max_attempts: 3, base_delay: Duration::from_millis(1) },
        network: "localhost".into()
    }
}

pub fn get_service(chain: Arc<dyn ChainReader>, backend: Arc<dyn ProofBackend>, config: ServiceConfig) -> ProofService
{
    ProofService::new(
        chain,
        Arc::new(StaticKeyStore(KEY_MATERIAL.to_vec())),
        Arc::new(AesGcmDecryptor),
        backend,
        config
    )
}

pub struct StaticKeyStore(pub Vec<u8>);

#[async_trait]
impl KeyStore for StaticKeyStore
{
    async fn key_material(&self) -> Result<KeyMaterial, ServiceError>
    {
        Ok(Zeroizing::new(self.0.clone()))
    }
}

/// Wraps a snapshot, failing the first `failures` scans and counting every call.
pub struct FlakyChain
{
    pub inner: SnapshotChain,
    pub failures: AtomicU32,
    pub scans: AtomicUsize
}

impl FlakyChain
{
    pub fn new(snapshot: ChainSnapshot, failures: u32) -> FlakyChain
    {
        FlakyChain {
            inner: SnapshotChain::new(snapshot),
            failures: AtomicU32::new(failures),
            scans: AtomicUsize::new(0)
        }
    }

    pub fn scans(&self) -> usize
    {
        self.scans.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainReader for FlakyChain
{
    async fn get_poll_address(&self, maci: &Address, poll_id: PollId) -> Result<Address, ServiceError>
    {
        self.inner.get_poll_address(maci, poll_id).await
    }

    async fn get_poll_config(&self, poll: &Address) -> Result<PollConfig, ServiceError>
    {
        self.inner.get_poll_config(poll).await
    }

    async fn get_accumulator_root(&self, accumulator: &Address, depth: u8) -> Result<HashBytes, ServiceError>
    {
        self.inner.get_accumulator_root(accumulator, depth).await
    }

    async fn get_state_tree_depth(&self, maci: &Address) -> Result<u8, ServiceError>
    {
        self.inner.get_state_tree_depth(maci).await
    }

    async fn get_state_accumulator_address(&self, maci: &Address) -> Result<Address, ServiceError>
    {
        self.inner.get_state_accumulator_address(maci).await
    }

    async fn scan_events(&self, maci: &Address, from: BlockNumber, to: BlockNumber) -> Result<Vec<ChainEvent>, ServiceError>
    {
        self.scans.fetch_add(1, Ordering::SeqCst);

        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0
        {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(ServiceError::Chain("provider unavailable".into()));
        }

        self.inner.scan_events(maci, from, to).await
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BackendBehaviour
{
    Succeed,
    Fail,
    Stall
}

/// Writes placeholder artifacts and counts invocations.
pub struct FakeBackend
{
    pub behaviour: BackendBehaviour,
    pub calls: AtomicUsize
}

impl FakeBackend
{
    pub fn new(behaviour: BackendBehaviour) -> FakeBackend
    {
        FakeBackend { behaviour, calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize
    {
        self.calls.load(Ordering::SeqCst)
    }

    async fn enter(&self, job: &ProofJob<'_>, artifact: &str) -> Result<(), ServiceError>
    {
        self.calls.fetch_add(1, Ordering::SeqCst);

        assert!(job.coordinator.private_key.is_some());
        assert!(job.state.poll(job.poll_id).unwrap().is_state_copied());

        tokio::fs::write(job.output_dir.join(artifact), b"{}").await?;

        match self.behaviour
        {
            BackendBehaviour::Succeed => Ok(()),
            BackendBehaviour::Fail => Err(ServiceError::ProofBackendFailure("witness generation failed".into())),
            BackendBehaviour::Stall =>
            {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            },
        }
    }
}

fn proof(circuit: &str, index: u64) -> ProofData
{
    ProofData {
        circuit: circuit.into(),
        proof: serde_json::json!({ "index": index }),
        public_inputs: vec![index.to_string()]
    }
}

#[async_trait]
impl ProofBackend for FakeBackend
{
    async fn generate_message_processing_proofs(&self, job: &ProofJob<'_>) -> Result<Vec<ProofData>, ServiceError>
    {
        self.enter(job, "process_proofs.json").await?;

        let batches = job.state.poll(job.poll_id)?.num_message_batches();
        Ok((0..batches).map(|i| proof("ProcessMessages", i)).collect())
    }

    async fn generate_tally_proofs(&self, job: &ProofJob<'_>) -> Result<TallyOutput, ServiceError>
    {
        self.enter(job, "tally.json").await?;

        let batches = job.state.poll(job.poll_id)?.num_tally_batches();
        Ok(TallyOutput {
            tally_proofs: (0..batches).map(|i| proof("TallyVotes", i)).collect(),
            tally_data: serde_json::json!({ "network": job.network })
        })
    }
}
