use crate::constants::NOTHING_UP_MY_SLEEVE;
use crate::error::StateError;
use crate::leaf::StateLeaf;
use crate::poll::{
    AmortizedIncrementalMerkleTree,
    BatchSizes,
    IncrementalTree,
    Keypair,
    MaxValues,
    Message,
    PublicKey,
    TreeDepths
};
use crate::types::{HashBytes, PollId, Timestamp, MESSAGE_TREE_ARITY};

/// A single voting round.
///
/// The poll is owned by its [`MaciState`](crate::MaciState); `poll_id` is the
/// handle through which it refers back to the owner's registry.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Poll
{
    /// The poll id, i.e. its index within the owner's poll registry.
    pub(crate) poll_id: PollId,

    /// The time after which no further messages are accepted.
    pub(crate) end_timestamp: Timestamp,

    /// The coordinator keypair. Equality only considers the public key.
    pub(crate) coordinator: Keypair,

    /// The depth of the owner's sign-up tree at deployment.
    pub(crate) state_tree_depth: u8,

    pub(crate) tree_depths: TreeDepths,

    pub(crate) batch_sizes: BatchSizes,

    pub(crate) max_values: MaxValues,

    /// Published messages in publication order.
    pub(crate) messages: Vec<Message>,

    /// The ephemeral key accompanying each message.
    pub(crate) enc_pub_keys: Vec<PublicKey>,

    /// The accumulator of message hashes.
    pub(crate) message_tree: IncrementalTree,

    /// Snapshot of the sign-up leaves taken when processing begins.
    pub(crate) state_leaves: Vec<StateLeaf>,

    pub(crate) state_copied: bool,

    pub(crate) num_signups: u32,

    pub(crate) num_batches_processed: u32,

    pub(crate) num_batches_tallied: u32,

    /// Index of the first message of the most recently processed batch.
    pub(crate) current_message_batch_index: Option<u64>
}

impl Poll
{
    pub(crate) fn new(
        poll_id: PollId,
        end_timestamp: Timestamp,
        coordinator: Keypair,
        state_tree_depth: u8,
        tree_depths: TreeDepths,
        message_batch_size: u32,
        max_values: MaxValues
    ) -> Result<Poll, StateError>
    {
        if tree_depths.int_state_tree_depth > state_tree_depth
        {
            Err(StateError::InvalidPollConfig(format!(
                "intermediate state tree depth {} exceeds state tree depth {}",
                tree_depths.int_state_tree_depth,
                state_tree_depth
            )))?
        }

        let batch_sizes = BatchSizes::derive(message_batch_size, tree_depths.int_state_tree_depth)?;
        let message_tree = IncrementalTree::new(
            MESSAGE_TREE_ARITY,
            tree_depths.message_tree_depth,
            NOTHING_UP_MY_SLEEVE
        )?;

        Ok(Poll {
            poll_id,
            end_timestamp,
            coordinator,
            state_tree_depth,
            tree_depths,
            batch_sizes,
            max_values,
            messages: Vec::new(),
            enc_pub_keys: Vec::new(),
            message_tree,
            state_leaves: Vec::new(),
            state_copied: false,
            num_signups: 0,
            num_batches_processed: 0,
            num_batches_tallied: 0,
            current_message_batch_index: None
        })
    }

    /// Appends a message to the poll, returning its index in the message tree.
    ///
    /// -`message`: The encrypted command.
    /// -`enc_pub_key`: The ephemeral public key used to encrypt the message.
    ///
    pub fn publish_message(
        &mut self,
        message: Message,
        enc_pub_key: PublicKey
    ) -> Result<u64, StateError>
    {
        let max_messages = self.max_values.max_messages;
        if self.num_messages() >= max_messages
        {
            Err(StateError::CapacityExceeded { capacity: max_messages })?
        }

        let leaf = message.hash(&enc_pub_key)?;
        let index = self.message_tree.insert(leaf)?;

        self.messages.push(message);
        self.enc_pub_keys.push(enc_pub_key);

        Ok(index)
    }

    pub fn message_root(&self) -> Result<HashBytes, StateError>
    {
        Ok(self.message_tree.root()?)
    }

    /// The number of message batches the processing circuit must consume; never zero.
    pub fn num_message_batches(&self) -> u64
    {
        let batch_size = u64::from(self.batch_sizes.message_batch_size());
        self.num_messages().div_ceil(batch_size).max(1)
    }

    /// The number of state batches the tally circuit must consume; never zero.
    pub fn num_tally_batches(&self) -> u64
    {
        let batch_size = u64::from(self.batch_sizes.tally_batch_size());
        u64::from(self.num_signups).div_ceil(batch_size).max(1)
    }

    pub fn has_unprocessed_messages(&self) -> bool
    {
        u64::from(self.num_batches_processed) < self.num_message_batches()
    }

    pub fn has_untallied_ballots(&self) -> bool
    {
        u64::from(self.num_batches_tallied) < self.num_tally_batches()
    }

    /// Advances the processing cursor by one batch.
    ///
    /// Messages are processed in reverse, so the first batch is the last one published.
    pub fn record_processed_batch(&mut self) -> Result<u64, StateError>
    {
        if !self.state_copied { Err(StateError::StateNotCopied(self.poll_id))? }
        if !self.has_unprocessed_messages() { Err(StateError::BatchesExhausted(self.poll_id))? }

        let batch_size = u64::from(self.batch_sizes.message_batch_size());
        let index = match self.current_message_batch_index
        {
            None => (self.num_message_batches() - 1) * batch_size,
            Some(index) => index.saturating_sub(batch_size),
        };

        self.current_message_batch_index = Some(index);
        self.num_batches_processed += 1;

        Ok(index)
    }

    /// Advances the tally cursor by one batch. Tallying begins once every message is processed.
    pub fn record_tallied_batch(&mut self) -> Result<u32, StateError>
    {
        if !self.state_copied { Err(StateError::StateNotCopied(self.poll_id))? }
        if self.has_unprocessed_messages() || !self.has_untallied_ballots()
        {
            Err(StateError::BatchesExhausted(self.poll_id))?
        }

        self.num_batches_tallied += 1;
        Ok(self.num_batches_tallied)
    }

    /// Takes a snapshot of the owner's sign-ups.
    pub(crate) fn copy_state(&mut self, leaves: &[StateLeaf]) -> Result<(), StateError>
    {
        let num_signups = u32::try_from(leaves.len())
            .map_err(|_| StateError::CapacityExceeded { capacity: u64::from(u32::MAX) })?;

        self.state_leaves = leaves.to_vec();
        self.num_signups = num_signups;
        self.state_copied = true;

        Ok(())
    }

    pub fn poll_id(&self) -> PollId { self.poll_id }

    pub fn end_timestamp(&self) -> Timestamp { self.end_timestamp }

    pub fn coordinator(&self) -> &Keypair { &self.coordinator }

    pub fn state_tree_depth(&self) -> u8 { self.state_tree_depth }

    pub fn tree_depths(&self) -> &TreeDepths { &self.tree_depths }

    pub fn batch_sizes(&self) -> &BatchSizes { &self.batch_sizes }

    pub fn max_values(&self) -> &MaxValues { &self.max_values }

    pub fn messages(&self) -> &[Message] { &self.messages }

    pub fn enc_pub_keys(&self) -> &[PublicKey] { &self.enc_pub_keys }

    pub fn num_messages(&self) -> u64 { self.message_tree.count() }

    pub fn message_tree(&self) -> &IncrementalTree { &self.message_tree }

    pub fn state_leaves(&self) -> &[StateLeaf] { &self.state_leaves }

    pub fn is_state_copied(&self) -> bool { self.state_copied }

    pub fn num_signups(&self) -> u32 { self.num_signups }

    pub fn num_batches_processed(&self) -> u32 { self.num_batches_processed }

    pub fn num_batches_tallied(&self) -> u32 { self.num_batches_tallied }

    pub fn current_message_batch_index(&self) -> Option<u64> { self.current_message_batch_index }
}
