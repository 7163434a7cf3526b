use thiserror::Error;

use crate::hash::PoseidonError;
use crate::poll::{KeyError, TreeError};
use crate::types::PollId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError
{
    /// An accumulator has no room for another leaf.
    #[error("tree capacity of {capacity} leaves exceeded")]
    CapacityExceeded { capacity: u64 },

    /// The poll index lies beyond the end of the registry.
    #[error("poll {0} does not exist")]
    PollNotFound(PollId),

    /// The poll index refers to a round which deployed no poll.
    #[error("poll {0} is a null poll")]
    NullPoll(PollId),

    /// Another poll already holds the processing slot.
    #[error("poll {current} is already being processed")]
    AlreadyProcessing { current: PollId },

    /// The poll parameters cannot describe a valid circuit configuration.
    #[error("invalid poll configuration: {0}")]
    InvalidPollConfig(String),

    /// No poll holds the processing slot.
    #[error("no poll is being processed")]
    NoPollBeingProcessed,

    /// The poll has not taken its snapshot of the sign-up leaves.
    #[error("poll {0} has not copied the sign-up state")]
    StateNotCopied(PollId),

    /// Every batch of the poll has already been accounted for.
    #[error("poll {0} has no remaining batches")]
    BatchesExhausted(PollId),

    /// A persisted record could not be turned back into state.
    #[error("malformed state record: {0}")]
    Deserialization(String),

    /// The hash function did not succeed.
    #[error("hash failed: {0}")]
    Hash(String),

    #[error(transparent)]
    Key(#[from] KeyError),
}

impl From<TreeError> for StateError
{
    fn from(error: TreeError) -> Self
    {
        match error
        {
            TreeError::TreeFull { capacity } => StateError::CapacityExceeded { capacity },
            TreeError::HashFailed(reason) => StateError::Hash(reason),
        }
    }
}

impl From<serde_json::Error> for StateError
{
    fn from(error: serde_json::Error) -> Self
    {
        StateError::Deserialization(error.to_string())
    }
}

impl From<PoseidonError> for StateError
{
    fn from(error: PoseidonError) -> Self
    {
        StateError::Hash(error.to_string())
    }
}
