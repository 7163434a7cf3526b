use thiserror::Error;

use crate::hash::{self, PoseidonError};
use crate::types::HashBytes;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TreeError
{
    /// The tree is full and cannot be inserted.
    #[error("tree is full at {capacity} leaves")]
    TreeFull { capacity: u64 },

    /// The hash function did not succeed.
    #[error("hash failed: {0}")]
    HashFailed(String),
}

impl From<PoseidonError> for TreeError
{
    fn from(error: PoseidonError) -> Self
    {
        TreeError::HashFailed(error.to_string())
    }
}

/// A fixed arity, fixed depth, append-only merkle tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IncrementalTree
{
    /// The maximal depth of the tree.
    full_depth: u8,

    /// The immutable arity of the tree.
    arity: u8,

    /// The number of inserted leaves.
    count: u64,

    /// The (depth, hash) pairs of the incrementally merged subtrees.
    hashes: Vec<(u8, HashBytes)>,

    /// The roots of the empty subtrees, indexed by depth.
    zeroes: Vec<HashBytes>
}

pub trait AmortizedIncrementalMerkleTree: Sized
{
    /// Create a new empty tree whose vacant leaves take on `zero_value`.
    fn new(arity: u8, full_depth: u8, zero_value: HashBytes) -> Result<Self, TreeError>;

    /// Inserts a new right-most leaf, returning its index.
    fn insert(&mut self, leaf: HashBytes) -> Result<u64, TreeError>;

    /// Compute the root of the tree of maximal depth.
    fn root(&self) -> Result<HashBytes, TreeError>;

    /// The number of leaves the tree is able to hold.
    fn capacity(&self) -> u64;

    /// Hash function used to compute roots.
    fn hash(inputs: &[HashBytes]) -> Result<HashBytes, TreeError>;
}

impl IncrementalTree
{
    pub fn arity(&self) -> u8 { self.arity }

    pub fn depth(&self) -> u8 { self.full_depth }

    pub fn count(&self) -> u64 { self.count }

    pub fn zero_value(&self) -> HashBytes { self.zeroes[0] }
}

impl AmortizedIncrementalMerkleTree for IncrementalTree
{
    fn new(
        arity: u8,
        full_depth: u8,
        zero_value: HashBytes
    ) -> Result<IncrementalTree, TreeError>
    {
        let mut zeroes = Vec::with_capacity(usize::from(full_depth) + 1);
        zeroes.push(zero_value);

        for depth in 0..usize::from(full_depth)
        {
            let children = vec![zeroes[depth]; arity.into()];
            zeroes.push(Self::hash(&children)?);
        }

        Ok(IncrementalTree {
            full_depth,
            arity,
            count: 0,
            hashes: Vec::new(),
            zeroes
        })
    }

    /// Consumes a new leaf and merges every completed subtree along the right edge.
    ///
    /// -`leaf`: A new right-most leaf to insert into the tree.
    ///
    fn insert(
        &mut self,
        leaf: HashBytes
    ) -> Result<u64, TreeError>
    {
        // Ensure that the tree is not full.
        let capacity = self.capacity();
        if self.count >= capacity { Err(TreeError::TreeFull { capacity })? }

        let arity: usize = self.arity.into();
        let mut hashes = self.hashes.clone();
        hashes.push((0, leaf));

        loop
        {
            // We need at least `arity` nodes in order to compute a subtree root.
            let size = hashes.len();
            if size < arity { break; }

            let subtree = &hashes[size - arity..];
            let depth = subtree[0].0;

            // If the subtree is full compute the corresponding subtree root.
            if !subtree.iter().all(|&(d, _)| d == depth) { break; }

            let leaves: Vec<HashBytes> = subtree
                .iter()
                .map(|&(_, hash)| hash)
                .collect();

            let hash = Self::hash(&leaves)?;
            hashes.truncate(size - arity);
            hashes.push((depth + 1, hash));
        }

        let index = self.count;
        self.hashes = hashes;
        self.count += 1;

        Ok(index)
    }

    /// Obtain the root of the tree, wherein the remaining leaves take on zero values.
    /// NB the depth is fixed since the circuits must know it at compile time.
    fn root(&self) -> Result<HashBytes, TreeError>
    {
        let arity: usize = self.arity.into();
        let mut hashes = self.hashes.clone();

        loop
        {
            let Some(&(depth, _)) = hashes.last() else { return Ok(self.zeroes[usize::from(self.full_depth)]) };

            if hashes.len() == 1 && depth == self.full_depth { break; }

            let mut subtree: Vec<HashBytes> = hashes
                .iter()
                .rev()
                .take_while(|(d, _)| *d == depth)
                .map(|&(_, hash)| hash)
                .collect();

            // We built the subtree in reverse order, so restore the original order.
            subtree.reverse();

            let size = subtree.len();
            subtree.resize(arity, self.zeroes[usize::from(depth)]);

            let hash = Self::hash(&subtree)?;
            hashes.truncate(hashes.len() - size);
            hashes.push((depth + 1, hash));
        }

        let Some(&(_, root)) = hashes.first() else { return Ok(self.zeroes[usize::from(self.full_depth)]) };

        Ok(root)
    }

    fn capacity(&self) -> u64
    {
        u64::from(self.arity)
            .checked_pow(self.full_depth.into())
            .unwrap_or(u64::MAX)
    }

    fn hash(inputs: &[HashBytes]) -> Result<HashBytes, TreeError>
    {
        Ok(hash::hash(inputs)?)
    }
}
