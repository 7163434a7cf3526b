//! The persisted JSON shape of [`MaciState`].
//!
//! Records carry no tree roots: every accumulator is rebuilt by reinserting the
//! leaves, so a tampered root can never be loaded.

use serde::{Deserialize, Serialize};

use crate::error::StateError;
use crate::hash::field::decimal;
use crate::leaf::StateLeaf;
use crate::maci::{MaciState, PollSlot, ProcessingStatus};
use crate::poll::{
    BatchSizes,
    Keypair,
    MaxValues,
    Message,
    Poll,
    PublicKey,
    TreeDepths
};
use crate::types::{HashBytes, PollId, Timestamp, VoiceCredits, MESSAGE_DATA_LEN};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldRecord(#[serde(with = "decimal")] pub HashBytes);

/// A public key as `[x, y]`.
pub type PublicKeyRecord = [FieldRecord; 2];

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MaciStateRecord
{
    pub state_tree_depth: u8,

    pub polls: Vec<Option<PollRecord>>,

    pub state_leaves: Vec<StateLeafRecord>,

    pub poll_being_processed: bool,

    #[serde(deserialize_with = "Option::deserialize")]
    pub current_poll_being_processed: Option<PollId>,

    pub num_sign_ups: u32
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StateLeafRecord
{
    pub pub_key: PublicKeyRecord,

    pub voice_credit_balance: VoiceCredits,

    pub timestamp: Timestamp
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MessageRecord
{
    pub data: [FieldRecord; MESSAGE_DATA_LEN]
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BatchSizesRecord
{
    pub message_batch_size: u32,

    pub subsidy_batch_size: u32,

    pub tally_batch_size: u32
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PollRecord
{
    pub poll_end_timestamp: Timestamp,

    pub coordinator_pub_key: PublicKeyRecord,

    pub state_tree_depth: u8,

    pub tree_depths: TreeDepths,

    pub batch_sizes: BatchSizesRecord,

    pub max_values: MaxValues,

    pub messages: Vec<MessageRecord>,

    pub enc_pub_keys: Vec<PublicKeyRecord>,

    pub state_leaves: Vec<StateLeafRecord>,

    pub state_copied: bool,

    pub num_signups: u32,

    pub num_batches_processed: u32,

    pub num_batches_tallied: u32,

    #[serde(deserialize_with = "Option::deserialize")]
    pub current_message_batch_index: Option<u64>
}

impl MaciState
{
    pub fn to_record(&self) -> MaciStateRecord
    {
        MaciStateRecord::from(self)
    }

    pub fn from_record(record: MaciStateRecord) -> Result<MaciState, StateError>
    {
        MaciState::try_from(record)
    }

    /// Canonical JSON rendering of the state.
    pub fn to_json(&self) -> Result<String, StateError>
    {
        Ok(serde_json::to_string(&self.to_record())?)
    }

    pub fn from_json(json: &str) -> Result<MaciState, StateError>
    {
        let record: MaciStateRecord = serde_json::from_str(json)?;
        Self::from_record(record)
    }
}

impl From<&MaciState> for MaciStateRecord
{
    fn from(state: &MaciState) -> Self
    {
        let (poll_being_processed, current_poll_being_processed) = match state.processing()
        {
            ProcessingStatus::Idle => (false, None),
            ProcessingStatus::Processing(poll_id) => (true, Some(poll_id)),
        };

        MaciStateRecord {
            state_tree_depth: state.state_tree_depth(),
            polls: state.polls()
                .iter()
                .map(|slot| match slot
                {
                    PollSlot::Deployed(poll) => Some(PollRecord::from(poll.as_ref())),
                    PollSlot::Null => None,
                })
                .collect(),
            state_leaves: state.state_leaves().iter().map(StateLeafRecord::from).collect(),
            poll_being_processed,
            current_poll_being_processed,
            num_sign_ups: state.num_sign_ups()
        }
    }
}

impl TryFrom<MaciStateRecord> for MaciState
{
    type Error = StateError;

    fn try_from(record: MaciStateRecord) -> Result<Self, Self::Error>
    {
        if record.num_sign_ups as usize != record.state_leaves.len()
        {
            Err(malformed(format!(
                "numSignUps is {} but {} state leaves are present",
                record.num_sign_ups,
                record.state_leaves.len()
            )))?
        }

        let Some((blank, leaves)) = record.state_leaves.split_first() else { return Err(malformed("the blank state leaf is missing")) };
        if !StateLeaf::from(blank).is_blank() { Err(malformed("the first state leaf is not the blank leaf"))? }

        // The blank leaf is inserted by construction, so reinsertion starts at index 1.
        let mut state = MaciState::new(record.state_tree_depth).map_err(|error| malformed(format!("stateTreeDepth: {}", error)))?;
        for (index, leaf) in leaves.iter().map(StateLeaf::from).enumerate()
        {
            state.sign_up(leaf.public_key, leaf.voice_credit_balance, leaf.timestamp)
                .map_err(|error| malformed(format!("state leaf {}: {}", index + 1, error)))?;
        }

        for slot in record.polls
        {
            let poll_id = state.num_polls();
            match slot
            {
                None =>
                {
                    state.deploy_null_poll().map_err(|error| malformed(format!("poll {}: {}", poll_id, error)))?;
                },
                Some(poll) =>
                {
                    let poll = poll.into_poll(poll_id, record.state_tree_depth)?;
                    state.polls.push(PollSlot::Deployed(Box::new(poll)));
                }
            }
        }

        state.processing = match (record.poll_being_processed, record.current_poll_being_processed)
        {
            (false, None) => ProcessingStatus::Idle,
            (true, Some(poll_id)) =>
            {
                let poll = state.poll(poll_id).map_err(|error| malformed(error.to_string()))?;
                if !poll.is_state_copied() { Err(malformed(format!("poll {} is being processed without a state snapshot", poll_id)))? }
                ProcessingStatus::Processing(poll_id)
            },
            (flag, current) => Err(malformed(format!(
                "pollBeingProcessed is {} but currentPollBeingProcessed is {:?}",
                flag,
                current
            )))?,
        };

        Ok(state)
    }
}

impl From<&Poll> for PollRecord
{
    fn from(poll: &Poll) -> Self
    {
        let batch_sizes = poll.batch_sizes();

        PollRecord {
            poll_end_timestamp: poll.end_timestamp(),
            coordinator_pub_key: public_key_to_record(&poll.coordinator().public_key),
            state_tree_depth: poll.state_tree_depth(),
            tree_depths: *poll.tree_depths(),
            batch_sizes: BatchSizesRecord {
                message_batch_size: batch_sizes.message_batch_size(),
                subsidy_batch_size: batch_sizes.subsidy_batch_size(),
                tally_batch_size: batch_sizes.tally_batch_size()
            },
            max_values: *poll.max_values(),
            messages: poll.messages()
                .iter()
                .map(MessageRecord::from)
                .collect(),
            enc_pub_keys: poll.enc_pub_keys().iter().map(public_key_to_record).collect(),
            state_leaves: poll.state_leaves().iter().map(StateLeafRecord::from).collect(),
            state_copied: poll.is_state_copied(),
            num_signups: poll.num_signups(),
            num_batches_processed: poll.num_batches_processed(),
            num_batches_tallied: poll.num_batches_tallied(),
            current_message_batch_index: poll.current_message_batch_index()
        }
    }
}

impl PollRecord
{
    /// Rebuilds the poll, replaying its messages into a fresh message tree.
    fn into_poll(self, poll_id: PollId, state_tree_depth: u8) -> Result<Poll, StateError>
    {
        if self.state_tree_depth != state_tree_depth
        {
            Err(malformed(format!(
                "poll {} was deployed against state tree depth {} but the state has depth {}",
                poll_id,
                self.state_tree_depth,
                state_tree_depth
            )))?
        }

        let mut poll = Poll::new(
            poll_id,
            self.poll_end_timestamp,
            Keypair::from_public_key(public_key_from_record(&self.coordinator_pub_key)),
            state_tree_depth,
            self.tree_depths,
            self.batch_sizes.message_batch_size,
            self.max_values
        ).map_err(|error| malformed(format!("poll {}: {}", poll_id, error)))?;

        let derived = poll.batch_sizes();
        if derived.subsidy_batch_size() != self.batch_sizes.subsidy_batch_size
            || derived.tally_batch_size() != self.batch_sizes.tally_batch_size
        {
            Err(malformed(format!("poll {} carries batch sizes which do not match its tree depths", poll_id)))?
        }

        if self.messages.len() != self.enc_pub_keys.len()
        {
            Err(malformed(format!("poll {} has {} messages but {} encryption keys", poll_id, self.messages.len(), self.enc_pub_keys.len())))?
        }

        for (message, key) in self.messages.iter().zip(self.enc_pub_keys.iter())
        {
            poll.publish_message(Message::from(message), public_key_from_record(key))
                .map_err(|error| malformed(format!("poll {}: {}", poll_id, error)))?;
        }

        if self.state_copied
        {
            if self.num_signups as usize != self.state_leaves.len()
            {
                Err(malformed(format!("poll {} snapshot holds {} leaves but numSignups is {}", poll_id, self.state_leaves.len(), self.num_signups)))?
            }

            let leaves: Vec<StateLeaf> = self.state_leaves.iter().map(StateLeaf::from).collect();
            poll.copy_state(&leaves).map_err(|error| malformed(format!("poll {}: {}", poll_id, error)))?;
        }
        else if !self.state_leaves.is_empty() || self.num_signups != 0
        {
            Err(malformed(format!("poll {} holds a state snapshot it never copied", poll_id)))?
        }

        self.check_cursors(&poll)?;
        poll.num_batches_processed = self.num_batches_processed;
        poll.num_batches_tallied = self.num_batches_tallied;
        poll.current_message_batch_index = self.current_message_batch_index;

        Ok(poll)
    }

    /// The cursors must be reachable by processing and then tallying batches in order.
    fn check_cursors(&self, poll: &Poll) -> Result<(), StateError>
    {
        let poll_id = poll.poll_id();
        let processed = u64::from(self.num_batches_processed);
        let tallied = u64::from(self.num_batches_tallied);

        if (processed != 0 || tallied != 0) && !self.state_copied
        {
            Err(malformed(format!("poll {} has processed batches without a state snapshot", poll_id)))?
        }

        let message_batches = poll.num_message_batches();
        if processed > message_batches
        {
            Err(malformed(format!("poll {} records {} processed batches of {}", poll_id, processed, message_batches)))?
        }

        let tally_batches = poll.num_tally_batches();
        if tallied > tally_batches
        {
            Err(malformed(format!("poll {} records {} tallied batches of {}", poll_id, tallied, tally_batches)))?
        }

        if tallied != 0 && processed != message_batches
        {
            Err(malformed(format!("poll {} was tallied before every message batch was processed", poll_id)))?
        }

        let batch_size = u64::from(poll.batch_sizes().message_batch_size());
        let expected = (processed != 0).then(|| (message_batches - processed) * batch_size);
        if self.current_message_batch_index != expected
        {
            Err(malformed(format!(
                "poll {} has message batch index {:?} after {} processed batches, expected {:?}",
                poll_id,
                self.current_message_batch_index,
                processed,
                expected
            )))?
        }

        Ok(())
    }
}

impl From<&StateLeaf> for StateLeafRecord
{
    fn from(leaf: &StateLeaf) -> Self
    {
        StateLeafRecord {
            pub_key: public_key_to_record(&leaf.public_key),
            voice_credit_balance: leaf.voice_credit_balance,
            timestamp: leaf.timestamp
        }
    }
}

impl From<&StateLeafRecord> for StateLeaf
{
    fn from(record: &StateLeafRecord) -> Self
    {
        StateLeaf::new(
            public_key_from_record(&record.pub_key),
            record.voice_credit_balance,
            record.timestamp
        )
    }
}

impl From<&Message> for MessageRecord
{
    fn from(message: &Message) -> Self
    {
        MessageRecord { data: message.data.map(FieldRecord) }
    }
}

impl From<&MessageRecord> for Message
{
    fn from(record: &MessageRecord) -> Self
    {
        Message::new(record.data.map(|FieldRecord(bytes)| bytes))
    }
}

pub fn public_key_to_record(key: &PublicKey) -> PublicKeyRecord
{
    [FieldRecord(key.x), FieldRecord(key.y)]
}

pub fn public_key_from_record([FieldRecord(x), FieldRecord(y)]: &PublicKeyRecord) -> PublicKey
{
    PublicKey { x: *x, y: *y }
}

fn malformed(reason: impl Into<String>) -> StateError
{
    StateError::Deserialization(reason.into())
}
