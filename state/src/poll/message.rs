use crate::hash::{hash4, hash5, PoseidonError};
use crate::poll::PublicKey;
use crate::types::{HashBytes, MessageData};

/// An encrypted command published to a poll.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Message
{
    /// The ciphertext, one field element per entry.
    pub data: MessageData
}

impl Message
{
    pub fn new(data: MessageData) -> Message
    {
        Message { data }
    }

    /// The message tree leaf for this message and the ephemeral key which encrypted it.
    pub fn hash(&self, enc_pub_key: &PublicKey) -> Result<HashBytes, PoseidonError>
    {
        let d = &self.data;
        let left = hash5([d[0], d[1], d[2], d[3], d[4]])?;
        let right = hash5([d[5], d[6], d[7], d[8], d[9]])?;

        hash4([left, right, enc_pub_key.x, enc_pub_key.y])
    }
}
