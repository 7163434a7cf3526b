//! Read-only view of the MACI contracts.

mod snapshot;

pub use snapshot::{AccumulatorRecord, ChainSnapshot, EventRecord, PollContractRecord, SnapshotChain};

use core::fmt;
use core::str::FromStr;

use async_trait::async_trait;
use infimum_state::{
    BlockNumber,
    HashBytes,
    MaxValues,
    Message,
    PollId,
    PublicKey,
    StateIndex,
    Timestamp,
    TreeDepths,
    VoiceCredits
};
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ServiceError;

pub const ADDRESS_LEN: usize = 20;

/// A contract address.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address
{
    /// The sentinel the registry reports for unknown polls.
    pub const ZERO: Address = Address([0u8; ADDRESS_LEN]);

    pub fn is_zero(&self) -> bool
    {
        *self == Self::ZERO
    }
}

impl fmt::Display for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address
{
    type Err = ServiceError;

    fn from_str(value: &str) -> Result<Self, Self::Err>
    {
        let encoded = value.strip_prefix("0x").unwrap_or(value);
        let bytes = hex::decode(encoded).map_err(|_| ServiceError::Config(format!("`{}` is not a hex address", value)))?;
        let bytes: [u8; ADDRESS_LEN] = bytes
            .try_into()
            .map_err(|_| ServiceError::Config(format!("`{}` is not {} bytes long", value, ADDRESS_LEN)))?;

        Ok(Address(bytes))
    }
}

impl Serialize for Address
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error>
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error>
    {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(D::Error::custom)
    }
}

/// What a poll contract reports about itself.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PollConfig
{
    /// The accumulator holding the poll's message leaves.
    pub message_accumulator_address: Address,

    /// The coordinator public key the poll was deployed with.
    pub coordinator_public_key: PublicKey,

    pub tree_depths: TreeDepths,

    /// Whether the sign-up tree has been merged for this poll.
    pub state_merged: bool
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SignUpEvent
{
    pub state_index: StateIndex,
    pub public_key: PublicKey,
    pub voice_credit_balance: VoiceCredits,
    pub timestamp: Timestamp
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeployPollEvent
{
    pub poll_id: PollId,
    pub end_timestamp: Timestamp,
    pub max_values: MaxValues,
    pub tree_depths: TreeDepths,
    pub message_batch_size: u32,
    pub coordinator_public_key: PublicKey
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PublishMessageEvent
{
    pub poll_id: PollId,
    pub message: Message,
    pub enc_pub_key: PublicKey
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EventKind
{
    SignUp(SignUpEvent),
    DeployPoll(DeployPollEvent),
    PublishMessage(PublishMessageEvent)
}

/// A log entry, positioned by block and index within the block.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ChainEvent
{
    pub block: BlockNumber,
    pub log_index: u32,
    pub kind: EventKind
}

impl ChainEvent
{
    pub fn position(&self) -> (BlockNumber, u32)
    {
        (self.block, self.log_index)
    }
}

#[async_trait]
pub trait ChainReader: Send + Sync
{
    /// The poll registered at `poll_id`, or [`Address::ZERO`] if none is.
    async fn get_poll_address(&self, maci: &Address, poll_id: PollId) -> Result<Address, ServiceError>;

    async fn get_poll_config(&self, poll: &Address) -> Result<PollConfig, ServiceError>;

    /// The merged root of an accumulator at the given depth; zero when unmerged.
    async fn get_accumulator_root(&self, accumulator: &Address, depth: u8) -> Result<HashBytes, ServiceError>;

    async fn get_state_tree_depth(&self, maci: &Address) -> Result<u8, ServiceError>;

    async fn get_state_accumulator_address(&self, maci: &Address) -> Result<Address, ServiceError>;

    /// Every event emitted by the MACI contract and its polls in `from..=to`, ordered by position.
    async fn scan_events(
        &self,
        maci: &Address,
        from: BlockNumber,
        to: BlockNumber
    ) -> Result<Vec<ChainEvent>, ServiceError>;
}
