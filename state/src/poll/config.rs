use serde::{Deserialize, Serialize};

use crate::error::StateError;
use crate::types::STATE_TREE_ARITY;

/// The tree configuration a poll's circuits are compiled against.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TreeDepths
{
    /// The depth of the intermediate state subtrees tallied per batch.
    pub int_state_tree_depth: u8,

    /// The depth of the message tree.
    pub message_tree_depth: u8,

    /// The depth of the message subtrees processed per batch.
    pub message_tree_sub_depth: u8,

    /// The vote option tree depth.
    pub vote_option_tree_depth: u8
}

/// Per-batch circuit capacities.
///
/// The subsidy and tally sizes are always `STATE_TREE_ARITY ^ int_state_tree_depth`,
/// so they can only be obtained through [`BatchSizes::derive`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSizes
{
    message_batch_size: u32,
    subsidy_batch_size: u32,
    tally_batch_size: u32
}

impl BatchSizes
{
    pub fn derive(
        message_batch_size: u32,
        int_state_tree_depth: u8
    ) -> Result<BatchSizes, StateError>
    {
        if message_batch_size == 0
        {
            Err(StateError::InvalidPollConfig("message batch size must be positive".into()))?
        }

        let Some(state_batch_size) = u32::from(STATE_TREE_ARITY).checked_pow(int_state_tree_depth.into())
        else
        {
            return Err(StateError::InvalidPollConfig(format!("intermediate state tree depth {} is too large", int_state_tree_depth)));
        };

        Ok(BatchSizes {
            message_batch_size,
            subsidy_batch_size: state_batch_size,
            tally_batch_size: state_batch_size
        })
    }

    pub fn message_batch_size(&self) -> u32 { self.message_batch_size }

    pub fn subsidy_batch_size(&self) -> u32 { self.subsidy_batch_size }

    pub fn tally_batch_size(&self) -> u32 { self.tally_batch_size }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MaxValues
{
    /// The maximum number of messages the poll accepts.
    pub max_messages: u64,

    /// The maximum number of vote options.
    pub max_vote_options: u32
}
