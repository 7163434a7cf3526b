use crate::hash::HASH_LEN;

pub type BlockNumber = u64;
pub type HashBytes = [u8; HASH_LEN];
pub type MessageData = [HashBytes; MESSAGE_DATA_LEN];
pub type PollId = u32;
pub type StateIndex = u32;
pub type Timestamp = u64;
pub type VoiceCredits = u64;

/// The number of field elements carried by a single message.
pub const MESSAGE_DATA_LEN: usize = 10;

/// The arity of the sign-up tree (and of the per-poll ballot trees).
pub const STATE_TREE_ARITY: u8 = 5;

/// The arity of the per-poll message trees.
pub const MESSAGE_TREE_ARITY: u8 = 5;
