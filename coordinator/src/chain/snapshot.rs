use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use infimum_state::record::{
    public_key_from_record,
    public_key_to_record,
    FieldRecord,
    MessageRecord,
    PublicKeyRecord
};
use infimum_state::{BlockNumber, HashBytes, MaxValues, Message, PollId, StateIndex, Timestamp, TreeDepths, VoiceCredits};
use serde::{Deserialize, Serialize};

use crate::chain::{
    Address,
    ChainEvent,
    ChainReader,
    DeployPollEvent,
    EventKind,
    PollConfig,
    PublishMessageEvent,
    SignUpEvent
};
use crate::error::ServiceError;

/// An exported copy of the contract state and event log.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChainSnapshot
{
    pub maci_address: Address,

    pub state_tree_depth: u8,

    pub state_accumulator_address: Address,

    /// The poll registry, indexed by poll id.
    pub polls: Vec<Address>,

    pub poll_contracts: BTreeMap<Address, PollContractRecord>,

    /// Merged accumulator roots. Accumulators absent from the map are unmerged.
    pub accumulators: BTreeMap<Address, AccumulatorRecord>,

    pub events: Vec<EventRecord>
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PollContractRecord
{
    pub message_accumulator_address: Address,
    pub coordinator_pub_key: PublicKeyRecord,
    pub tree_depths: TreeDepths,
    pub state_merged: bool
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AccumulatorRecord
{
    pub depth: u8,
    pub root: FieldRecord
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EventRecord
{
    #[serde(rename_all = "camelCase")]
    SignUp
    {
        block: BlockNumber,
        log_index: u32,
        state_index: StateIndex,
        pub_key: PublicKeyRecord,
        voice_credit_balance: VoiceCredits,
        timestamp: Timestamp
    },

    #[serde(rename_all = "camelCase")]
    DeployPoll
    {
        block: BlockNumber,
        log_index: u32,
        poll_id: PollId,
        end_timestamp: Timestamp,
        max_values: MaxValues,
        tree_depths: TreeDepths,
        message_batch_size: u32,
        coordinator_pub_key: PublicKeyRecord
    },

    #[serde(rename_all = "camelCase")]
    PublishMessage
    {
        block: BlockNumber,
        log_index: u32,
        poll_id: PollId,
        message: MessageRecord,
        enc_pub_key: PublicKeyRecord
    },
}

impl From<&ChainEvent> for EventRecord
{
    fn from(event: &ChainEvent) -> Self
    {
        let (block, log_index) = event.position();

        match &event.kind
        {
            EventKind::SignUp(e) => EventRecord::SignUp {
                block,
                log_index,
                state_index: e.state_index,
                pub_key: public_key_to_record(&e.public_key),
                voice_credit_balance: e.voice_credit_balance,
                timestamp: e.timestamp
            },
            EventKind::DeployPoll(e) => EventRecord::DeployPoll {
                block,
                log_index,
                poll_id: e.poll_id,
                end_timestamp: e.end_timestamp,
                max_values: e.max_values,
                tree_depths: e.tree_depths,
                message_batch_size: e.message_batch_size,
                coordinator_pub_key: public_key_to_record(&e.coordinator_public_key)
            },
            EventKind::PublishMessage(e) => EventRecord::PublishMessage {
                block,
                log_index,
                poll_id: e.poll_id,
                message: MessageRecord::from(&e.message),
                enc_pub_key: public_key_to_record(&e.enc_pub_key)
            },
        }
    }
}

impl From<&EventRecord> for ChainEvent
{
    fn from(record: &EventRecord) -> Self
    {
        match record
        {
            EventRecord::SignUp { block, log_index, state_index, pub_key, voice_credit_balance, timestamp } => ChainEvent {
                block: *block,
                log_index: *log_index,
                kind: EventKind::SignUp(SignUpEvent {
                    state_index: *state_index,
                    public_key: public_key_from_record(pub_key),
                    voice_credit_balance: *voice_credit_balance,
                    timestamp: *timestamp
                })
            },
            EventRecord::DeployPoll {
                block,
                log_index,
                poll_id,
                end_timestamp,
                max_values,
                tree_depths,
                message_batch_size,
                coordinator_pub_key
            } => ChainEvent {
                block: *block,
                log_index: *log_index,
                kind: EventKind::DeployPoll(DeployPollEvent {
                    poll_id: *poll_id,
                    end_timestamp: *end_timestamp,
                    max_values: *max_values,
                    tree_depths: *tree_depths,
                    message_batch_size: *message_batch_size,
                    coordinator_public_key: public_key_from_record(coordinator_pub_key)
                })
            },
            EventRecord::PublishMessage { block, log_index, poll_id, message, enc_pub_key } => ChainEvent {
                block: *block,
                log_index: *log_index,
                kind: EventKind::PublishMessage(PublishMessageEvent {
                    poll_id: *poll_id,
                    message: Message::from(message),
                    enc_pub_key: public_key_from_record(enc_pub_key)
                })
            },
        }
    }
}

impl EventRecord
{
    fn block(&self) -> BlockNumber
    {
        match self
        {
            EventRecord::SignUp { block, .. }
            | EventRecord::DeployPoll { block, .. }
            | EventRecord::PublishMessage { block, .. } => *block,
        }
    }
}

/// A [`ChainReader`] answering from a [`ChainSnapshot`].
#[derive(Clone, Debug, Default)]
pub struct SnapshotChain
{
    snapshot: ChainSnapshot
}

impl SnapshotChain
{
    pub fn new(snapshot: ChainSnapshot) -> SnapshotChain
    {
        SnapshotChain { snapshot }
    }

    pub async fn from_file(path: &Path) -> Result<SnapshotChain, ServiceError>
    {
        let json = tokio::fs::read_to_string(path).await?;
        let snapshot = serde_json::from_str(&json)
            .map_err(|error| ServiceError::Chain(format!("malformed snapshot {}: {}", path.display(), error)))?;

        Ok(SnapshotChain { snapshot })
    }

    pub fn snapshot(&self) -> &ChainSnapshot { &self.snapshot }

    fn expect_maci(&self, maci: &Address) -> Result<(), ServiceError>
    {
        if *maci != self.snapshot.maci_address
        {
            Err(ServiceError::Chain(format!("no MACI contract at {}", maci)))?
        }
        Ok(())
    }
}

#[async_trait]
impl ChainReader for SnapshotChain
{
    async fn get_poll_address(&self, maci: &Address, poll_id: PollId) -> Result<Address, ServiceError>
    {
        self.expect_maci(maci)?;
        Ok(self.snapshot.polls.get(poll_id as usize).copied().unwrap_or(Address::ZERO))
    }

    async fn get_poll_config(&self, poll: &Address) -> Result<PollConfig, ServiceError>
    {
        let Some(record) = self.snapshot.poll_contracts.get(poll)
        else
        {
            return Err(ServiceError::Chain(format!("no poll contract at {}", poll)));
        };

        Ok(PollConfig {
            message_accumulator_address: record.message_accumulator_address,
            coordinator_public_key: public_key_from_record(&record.coordinator_pub_key),
            tree_depths: record.tree_depths,
            state_merged: record.state_merged
        })
    }

    async fn get_accumulator_root(&self, accumulator: &Address, depth: u8) -> Result<HashBytes, ServiceError>
    {
        let root = match self.snapshot.accumulators.get(accumulator)
        {
            Some(record) if record.depth == depth => record.root.0,
            _ => [0u8; 32],
        };
        Ok(root)
    }

    async fn get_state_tree_depth(&self, maci: &Address) -> Result<u8, ServiceError>
    {
        self.expect_maci(maci)?;
        Ok(self.snapshot.state_tree_depth)
    }

    async fn get_state_accumulator_address(&self, maci: &Address) -> Result<Address, ServiceError>
    {
        self.expect_maci(maci)?;
        Ok(self.snapshot.state_accumulator_address)
    }

    async fn scan_events(
        &self,
        maci: &Address,
        from: BlockNumber,
        to: BlockNumber
    ) -> Result<Vec<ChainEvent>, ServiceError>
    {
        self.expect_maci(maci)?;

        // Logs are reported in the order they were exported, as a node would.
        let events = self.snapshot.events
            .iter()
            .filter(|record| (from..=to).contains(&record.block()))
            .map(ChainEvent::from)
            .collect();

        Ok(events)
    }
}
