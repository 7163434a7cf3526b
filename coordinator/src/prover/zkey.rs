use std::path::{Path, PathBuf};

use infimum_state::TreeDepths;

use crate::error::ServiceError;

/// The voice credit cost scheme a poll was compiled for.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VotingMode
{
    Quadratic,
    NonQuadratic
}

impl VotingMode
{
    pub fn from_flag(use_quadratic_voting: bool) -> VotingMode
    {
        if use_quadratic_voting { VotingMode::Quadratic } else { VotingMode::NonQuadratic }
    }

    fn tag(&self) -> &'static str
    {
        match self
        {
            VotingMode::Quadratic => "qv",
            VotingMode::NonQuadratic => "nonQv",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ZkeyPaths
{
    pub process_messages: PathBuf,
    pub tally_votes: PathBuf
}

/// Resolves proving keys following the circuit naming convention.
#[derive(Clone, Debug)]
pub struct ZkeyLocator
{
    base: PathBuf
}

impl ZkeyLocator
{
    pub fn new(base: impl Into<PathBuf>) -> ZkeyLocator
    {
        ZkeyLocator { base: base.into() }
    }

    pub fn base(&self) -> &Path { &self.base }

    pub fn paths(&self, state_tree_depth: u8, depths: &TreeDepths, mode: VotingMode) -> ZkeyPaths
    {
        let tag = mode.tag();

        let process_messages = format!(
            "ProcessMessages_{}_{}-{}-{}-{}.zkey",
            tag,
            state_tree_depth,
            depths.message_tree_depth,
            depths.message_tree_sub_depth,
            depths.vote_option_tree_depth
        );
        let tally_votes = format!(
            "TallyVotes_{}_{}-{}-{}.zkey",
            tag,
            state_tree_depth,
            depths.int_state_tree_depth,
            depths.vote_option_tree_depth
        );

        ZkeyPaths {
            process_messages: self.base.join(process_messages),
            tally_votes: self.base.join(tally_votes)
        }
    }

    /// As [`ZkeyLocator::paths`], failing unless both keys exist.
    pub async fn resolve(&self, state_tree_depth: u8, depths: &TreeDepths, mode: VotingMode) -> Result<ZkeyPaths, ServiceError>
    {
        let paths = self.paths(state_tree_depth, depths, mode);

        for path in [&paths.process_messages, &paths.tally_votes]
        {
            if !tokio::fs::try_exists(path).await? { Err(ServiceError::ZkeyNotFound(path.clone()))? }
        }

        Ok(paths)
    }
}
