pub mod config;
pub mod curve;
pub mod keys;
pub mod message;
pub mod poll;
pub mod state;

pub use config::{BatchSizes, MaxValues, TreeDepths};
pub use keys::*;
pub use message::Message;
pub use poll::*;
pub use state::{
    AmortizedIncrementalMerkleTree,
    IncrementalTree,
    TreeError
};
