use crate::constants::BLANK_STATE_LEAF_HASH;
use crate::error::StateError;
use crate::leaf::StateLeaf;
use crate::poll::{
    AmortizedIncrementalMerkleTree,
    IncrementalTree,
    Keypair,
    MaxValues,
    Poll,
    PublicKey,
    TreeDepths
};
use crate::types::{
    HashBytes,
    PollId,
    StateIndex,
    Timestamp,
    VoiceCredits,
    STATE_TREE_ARITY
};

/// An entry of the poll registry.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PollSlot
{
    /// A materialized poll.
    Deployed(Box<Poll>),

    /// A round which deployed no poll. The slot keeps the indices of later polls stable.
    Null
}

/// Which poll, if any, currently holds the processing slot.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ProcessingStatus
{
    #[default]
    Idle,

    Processing(PollId)
}

/// The sign-up registry together with every poll deployed against it.
///
/// Mutations must be applied in event order since the accumulator root depends on it.
/// `Clone` yields a fully independent copy and `PartialEq` is structural equality.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MaciState
{
    /// The depth of the sign-up tree.
    state_tree_depth: u8,

    /// The accumulator of state leaf hashes.
    state_tree: IncrementalTree,

    /// The signed-up voters in insertion order; index 0 is the blank leaf.
    state_leaves: Vec<StateLeaf>,

    /// The append-only poll registry.
    pub(crate) polls: Vec<PollSlot>,

    pub(crate) processing: ProcessingStatus
}

impl MaciState
{
    /// Creates a registry whose first leaf is the blank state leaf.
    pub fn new(state_tree_depth: u8) -> Result<MaciState, StateError>
    {
        let mut state_tree = IncrementalTree::new(
            STATE_TREE_ARITY,
            state_tree_depth,
            BLANK_STATE_LEAF_HASH
        )?;
        state_tree.insert(BLANK_STATE_LEAF_HASH)?;

        Ok(MaciState {
            state_tree_depth,
            state_tree,
            state_leaves: vec![StateLeaf::blank()],
            polls: Vec::new(),
            processing: ProcessingStatus::Idle
        })
    }

    /// Registers a voter, returning the index of their leaf.
    ///
    /// - `public_key`: The voter's public key.
    /// - `initial_voice_credit_balance`: The voice credits granted to the voter.
    /// - `timestamp`: The time of the sign-up.
    ///
    pub fn sign_up(
        &mut self,
        public_key: PublicKey,
        initial_voice_credit_balance: VoiceCredits,
        timestamp: Timestamp
    ) -> Result<StateIndex, StateError>
    {
        let index = StateIndex::try_from(self.state_leaves.len())
            .map_err(|_| StateError::CapacityExceeded { capacity: u64::from(StateIndex::MAX) })?;

        let leaf = StateLeaf::new(public_key, initial_voice_credit_balance, timestamp);
        self.state_tree.insert(leaf.hash()?)?;
        self.state_leaves.push(leaf);

        Ok(index)
    }

    /// Deploys a poll against the current registry, returning its id.
    pub fn deploy_poll(
        &mut self,
        end_timestamp: Timestamp,
        max_values: MaxValues,
        tree_depths: TreeDepths,
        message_batch_size: u32,
        coordinator: Keypair
    ) -> Result<PollId, StateError>
    {
        let poll_id = self.next_poll_id()?;
        let poll = Poll::new(
            poll_id,
            end_timestamp,
            coordinator,
            self.state_tree_depth,
            tree_depths,
            message_batch_size,
            max_values
        )?;

        self.polls.push(PollSlot::Deployed(Box::new(poll)));

        Ok(poll_id)
    }

    /// Reserves the next poll id for a round which produced no poll.
    pub fn deploy_null_poll(&mut self) -> Result<PollId, StateError>
    {
        let poll_id = self.next_poll_id()?;
        self.polls.push(PollSlot::Null);
        Ok(poll_id)
    }

    pub fn poll(&self, poll_id: PollId) -> Result<&Poll, StateError>
    {
        match self.polls.get(poll_id as usize)
        {
            Some(PollSlot::Deployed(poll)) => Ok(&**poll),
            Some(PollSlot::Null) => Err(StateError::NullPoll(poll_id)),
            None => Err(StateError::PollNotFound(poll_id)),
        }
    }

    pub fn poll_mut(&mut self, poll_id: PollId) -> Result<&mut Poll, StateError>
    {
        match self.polls.get_mut(poll_id as usize)
        {
            Some(PollSlot::Deployed(poll)) => Ok(&mut **poll),
            Some(PollSlot::Null) => Err(StateError::NullPoll(poll_id)),
            None => Err(StateError::PollNotFound(poll_id)),
        }
    }

    /// Hands the processing slot to a poll and snapshots the sign-ups into it.
    pub fn begin_processing(&mut self, poll_id: PollId) -> Result<(), StateError>
    {
        if let ProcessingStatus::Processing(current) = self.processing
        {
            if current != poll_id { Err(StateError::AlreadyProcessing { current })? }
        }

        let leaves = self.state_leaves.clone();
        let poll = self.poll_mut(poll_id)?;
        if !poll.is_state_copied() { poll.copy_state(&leaves)?; }

        self.processing = ProcessingStatus::Processing(poll_id);
        Ok(())
    }

    /// Releases the processing slot.
    pub fn finish_processing(&mut self) -> Result<PollId, StateError>
    {
        let ProcessingStatus::Processing(poll_id) = self.processing else { return Err(StateError::NoPollBeingProcessed) };
        self.processing = ProcessingStatus::Idle;
        Ok(poll_id)
    }

    pub fn state_root(&self) -> Result<HashBytes, StateError>
    {
        Ok(self.state_tree.root()?)
    }

    pub fn state_tree_depth(&self) -> u8 { self.state_tree_depth }

    pub fn state_tree(&self) -> &IncrementalTree { &self.state_tree }

    pub fn state_leaves(&self) -> &[StateLeaf] { &self.state_leaves }

    /// The number of leaves, counting the blank leaf.
    pub fn num_sign_ups(&self) -> u32
    {
        // `sign_up` refuses to grow the leaves past `StateIndex::MAX`.
        self.state_leaves.len() as u32
    }

    pub fn polls(&self) -> &[PollSlot] { &self.polls }

    pub fn num_polls(&self) -> u32
    {
        self.polls.len() as u32
    }

    pub fn processing(&self) -> ProcessingStatus { self.processing }

    fn next_poll_id(&self) -> Result<PollId, StateError>
    {
        PollId::try_from(self.polls.len())
            .map_err(|_| StateError::InvalidPollConfig("poll registry is full".into()))
    }
}
