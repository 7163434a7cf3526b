use crate::constants::{PAD_KEY_X, PAD_KEY_Y};
use crate::hash::{from_u64, hash4, PoseidonError};
use crate::poll::PublicKey;
use crate::types::{HashBytes, Timestamp, VoiceCredits};

/// A signed-up voter.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StateLeaf
{
    /// The voter's public key.
    pub public_key: PublicKey,

    /// The voice credits the voter may spend.
    pub voice_credit_balance: VoiceCredits,

    /// The time at which the voter signed up.
    pub timestamp: Timestamp
}

impl StateLeaf
{
    pub fn new(
        public_key: PublicKey,
        voice_credit_balance: VoiceCredits,
        timestamp: Timestamp
    ) -> StateLeaf
    {
        StateLeaf { public_key, voice_credit_balance, timestamp }
    }

    /// The leaf which occupies index 0 of every state tree, so that the tree is never
    /// empty and the zero leaf cannot be used to grief the accumulator.
    pub fn blank() -> StateLeaf
    {
        StateLeaf {
            public_key: PublicKey { x: PAD_KEY_X, y: PAD_KEY_Y },
            voice_credit_balance: 0,
            timestamp: 0
        }
    }

    pub fn is_blank(&self) -> bool
    {
        *self == Self::blank()
    }

    /// poseidon(pk.x, pk.y, voice credits, timestamp)
    pub fn hash(&self) -> Result<HashBytes, PoseidonError>
    {
        hash4([
            self.public_key.x,
            self.public_key.y,
            from_u64(self.voice_credit_balance),
            from_u64(self.timestamp)
        ])
    }
}
