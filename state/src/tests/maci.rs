use crate::constants::BLANK_STATE_LEAF_HASH;
use crate::poll::{AmortizedIncrementalMerkleTree, IncrementalTree};
use crate::tests::{
    get_coordinator,
    get_max_values,
    get_poll_scenario,
    get_public_key,
    get_scenario,
    get_tree_depths
};
use crate::types::STATE_TREE_ARITY;
use crate::{MaciState, PollSlot, ProcessingStatus, StateError, StateLeaf};

/// A fresh registry holds only the blank leaf, whose hash is the protocol constant.
#[test]
fn blank_leaf()
{
    let state = MaciState::new(4).unwrap();

    assert_eq!(state.num_sign_ups(), 1);
    assert_eq!(state.state_leaves(), &[StateLeaf::blank()]);
    assert_eq!(StateLeaf::blank().hash().unwrap(), BLANK_STATE_LEAF_HASH);
    assert!(state.state_leaves()[0].is_blank());
}

/// Sign-ups return consecutive indices starting after the blank leaf.
#[test]
fn sign_up_indices()
{
    let mut state = MaciState::new(2).unwrap();

    assert_eq!(state.sign_up(get_public_key(1), 10, 1), Ok(1));
    assert_eq!(state.sign_up(get_public_key(2), 10, 2), Ok(2));
    assert_eq!(state.num_sign_ups(), 3);
    assert_eq!(state.state_leaves().len() as u32, state.num_sign_ups());
}

/// The registry root is the root of the blank leaf hash followed by each leaf hash.
#[test]
fn sign_up_accumulator()
{
    let state = get_scenario();

    let mut tree = IncrementalTree::new(STATE_TREE_ARITY, 4, BLANK_STATE_LEAF_HASH).unwrap();
    for leaf in state.state_leaves()
    {
        tree.insert(leaf.hash().unwrap()).unwrap();
    }

    assert_eq!(state.state_root().unwrap(), tree.root().unwrap());
    assert_eq!(state.state_tree().count(), 4);
}

/// Swapping two sign-ups changes the root.
#[test]
fn sign_up_non_commutative()
{
    let mut a = MaciState::new(4).unwrap();
    let mut b = MaciState::new(4).unwrap();

    a.sign_up(get_public_key(1), 100, 1).unwrap();
    a.sign_up(get_public_key(2), 100, 2).unwrap();
    b.sign_up(get_public_key(2), 100, 2).unwrap();
    b.sign_up(get_public_key(1), 100, 1).unwrap();

    assert_ne!(a.state_root().unwrap(), b.state_root().unwrap());
    assert_ne!(a, b);
}

/// Signing up past the capacity of the tree fails without changing the registry.
#[test]
fn sign_up_capacity_exceeded()
{
    let mut state = MaciState::new(1).unwrap();
    for i in 1..STATE_TREE_ARITY as u64
    {
        state.sign_up(get_public_key(i), 1, i).unwrap();
    }

    let root = state.state_root().unwrap();
    assert_eq!(
        state.sign_up(get_public_key(99), 1, 99),
        Err(StateError::CapacityExceeded { capacity: 5 })
    );
    assert_eq!(state.num_sign_ups(), 5);
    assert_eq!(state.state_root().unwrap(), root);
}

/// Mutating a copy leaves the original untouched.
#[test]
fn copy_independence()
{
    let original = get_poll_scenario();
    let mut copy = original.clone();
    assert_eq!(copy, original);

    copy.sign_up(get_public_key(77), 5, 9).unwrap();
    copy.poll_mut(0).unwrap().publish_message(crate::tests::get_message(1), get_public_key(3)).unwrap();
    copy.deploy_null_poll().unwrap();

    assert_ne!(copy, original);
    assert_eq!(original.num_sign_ups(), 4);
    assert_eq!(original.num_polls(), 1);
    assert_eq!(original.poll(0).unwrap().num_messages(), 0);
}

/// Null polls keep their slot and are distinguishable from missing polls.
#[test]
fn null_poll_lookup()
{
    let mut state = get_scenario();

    assert_eq!(state.deploy_null_poll(), Ok(0));
    assert_eq!(state.deploy_poll(10, get_max_values(), get_tree_depths(1), 5, get_coordinator()), Ok(1));

    assert_eq!(state.polls()[0], PollSlot::Null);
    assert_eq!(state.poll(0).unwrap_err(), StateError::NullPoll(0));
    assert_eq!(state.poll(2).unwrap_err(), StateError::PollNotFound(2));
    assert_eq!(state.poll(1).unwrap().poll_id(), 1);
}

/// Deploying a poll leaves the sign-up tree alone.
#[test]
fn deploy_poll_preserves_state()
{
    let mut state = get_scenario();
    let root = state.state_root().unwrap();

    state.deploy_poll(10, get_max_values(), get_tree_depths(1), 5, get_coordinator()).unwrap();

    assert_eq!(state.state_root().unwrap(), root);
    assert_eq!(state.num_sign_ups(), 4);
}

/// Polls whose intermediate depth exceeds the state depth cannot be deployed.
#[test]
fn deploy_poll_invalid_config()
{
    let mut state = MaciState::new(2).unwrap();

    assert!(matches!(
        state.deploy_poll(10, get_max_values(), get_tree_depths(3), 5, get_coordinator()),
        Err(StateError::InvalidPollConfig(_))
    ));
    assert!(matches!(
        state.deploy_poll(10, get_max_values(), get_tree_depths(1), 0, get_coordinator()),
        Err(StateError::InvalidPollConfig(_))
    ));
    assert_eq!(state.num_polls(), 0);
}

/// Only one poll may hold the processing slot.
#[test]
fn processing_slot()
{
    let mut state = get_poll_scenario();
    state.deploy_poll(200, get_max_values(), get_tree_depths(1), 5, get_coordinator()).unwrap();

    assert_eq!(state.finish_processing(), Err(StateError::NoPollBeingProcessed));

    state.begin_processing(0).unwrap();
    assert_eq!(state.processing(), ProcessingStatus::Processing(0));
    assert_eq!(state.begin_processing(1), Err(StateError::AlreadyProcessing { current: 0 }));

    let poll = state.poll(0).unwrap();
    assert!(poll.is_state_copied());
    assert_eq!(poll.num_signups(), 4);
    assert_eq!(poll.state_leaves(), state.state_leaves());

    assert_eq!(state.finish_processing(), Ok(0));
    assert_eq!(state.processing(), ProcessingStatus::Idle);
    assert!(state.begin_processing(1).is_ok());
}

/// The snapshot does not follow later sign-ups.
#[test]
fn processing_snapshot_is_fixed()
{
    let mut state = get_poll_scenario();
    state.begin_processing(0).unwrap();
    state.sign_up(get_public_key(50), 100, 4).unwrap();

    assert_eq!(state.poll(0).unwrap().num_signups(), 4);
    assert_eq!(state.num_sign_ups(), 5);
}
