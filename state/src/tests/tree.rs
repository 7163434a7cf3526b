use crate::hash::{hash5, from_u64};
use crate::poll::{AmortizedIncrementalMerkleTree, IncrementalTree, TreeError};
use crate::types::HashBytes;

fn zero_subtree(zero: HashBytes) -> HashBytes
{
    hash5([zero; 5]).unwrap()
}

/// An empty tree has the root of a tree filled with zero values.
#[test]
fn empty_root()
{
    let zero = from_u64(0);
    let tree = IncrementalTree::new(5, 2, zero).unwrap();
    let z1 = zero_subtree(zero);

    assert_eq!(tree.root().unwrap(), hash5([z1; 5]).unwrap());
    assert_eq!(tree.count(), 0);
    assert_eq!(tree.capacity(), 25);
    assert_eq!((tree.arity(), tree.depth(), tree.zero_value()), (5, 2, zero));
}

/// A partially filled tree pads each level with the matching zero subtree.
#[test]
fn partial_root()
{
    let zero = from_u64(0);
    let mut tree = IncrementalTree::new(5, 2, zero).unwrap();
    let leaves = [from_u64(1), from_u64(2), from_u64(3)];

    for (i, leaf) in leaves.iter().enumerate()
    {
        assert_eq!(tree.insert(*leaf).unwrap(), i as u64);
    }

    let z1 = zero_subtree(zero);
    let first = hash5([leaves[0], leaves[1], leaves[2], zero, zero]).unwrap();
    let expected = hash5([first, z1, z1, z1, z1]).unwrap();

    assert_eq!(tree.root().unwrap(), expected);
}

/// Completed subtrees are merged while later subtrees are still padded.
#[test]
fn merged_subtree_root()
{
    let zero = from_u64(0);
    let mut tree = IncrementalTree::new(5, 2, zero).unwrap();

    for i in 1..=6 { tree.insert(from_u64(i)).unwrap(); }

    let z1 = zero_subtree(zero);
    let first = hash5([from_u64(1), from_u64(2), from_u64(3), from_u64(4), from_u64(5)]).unwrap();
    let second = hash5([from_u64(6), zero, zero, zero, zero]).unwrap();
    let expected = hash5([first, second, z1, z1, z1]).unwrap();

    assert_eq!(tree.root().unwrap(), expected);
}

/// Computing the root does not disturb subsequent insertions.
#[test]
fn root_is_non_destructive()
{
    let zero = from_u64(0);
    let mut a = IncrementalTree::new(5, 2, zero).unwrap();
    let mut b = IncrementalTree::new(5, 2, zero).unwrap();

    for i in 1..=7
    {
        a.insert(from_u64(i)).unwrap();
        a.root().unwrap();
        b.insert(from_u64(i)).unwrap();
    }

    assert_eq!(a, b);
    assert_eq!(a.root().unwrap(), b.root().unwrap());
}

/// A full tree refuses further leaves and is left untouched.
#[test]
fn tree_full()
{
    let zero = from_u64(0);
    let mut tree = IncrementalTree::new(5, 1, zero).unwrap();

    for i in 1..=5 { tree.insert(from_u64(i)).unwrap(); }
    let root = tree.root().unwrap();

    assert_eq!(tree.insert(from_u64(6)), Err(TreeError::TreeFull { capacity: 5 }));
    assert_eq!(tree.count(), 5);
    assert_eq!(tree.root().unwrap(), root);
    assert_eq!(root, hash5([from_u64(1), from_u64(2), from_u64(3), from_u64(4), from_u64(5)]).unwrap());
}

/// Insertion order determines the root.
#[test]
fn order_dependent()
{
    let zero = from_u64(0);
    let mut a = IncrementalTree::new(5, 3, zero).unwrap();
    let mut b = IncrementalTree::new(5, 3, zero).unwrap();

    a.insert(from_u64(1)).unwrap();
    a.insert(from_u64(2)).unwrap();
    b.insert(from_u64(2)).unwrap();
    b.insert(from_u64(1)).unwrap();

    assert_ne!(a.root().unwrap(), b.root().unwrap());
}

/// Circom compatible hash of `[1, 1]`.
#[test]
fn poseidon_vector()
{
    let expected = [
        0, 122, 243, 70, 226, 211, 4, 39, 158, 121, 224, 169, 243, 2, 63, 119, 18, 148, 167, 138,
        203, 112, 231, 63, 144, 175, 226, 124, 173, 64, 30, 129,
    ];

    assert_eq!(crate::hash::hash_left_right(from_u64(1), from_u64(1)).unwrap(), expected);
}
