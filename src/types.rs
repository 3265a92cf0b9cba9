use ethers_core::types::{Address, H160, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Celogram application contract on Alfajores
pub const APP_CONTRACT: Address = H160([
    0x2d, 0x6d, 0xcd, 0xa3, 0xa1, 0x31, 0xdc, 0x48, 0x19, 0xef, 0x57, 0x2c, 0x6c, 0xe5, 0xa0, 0xc5,
    0x73, 0xe7, 0x17, 0x5e,
]);

/// cUSD stable token on Alfajores
pub const STABLE_TOKEN: Address = H160([
    0x87, 0x40, 0x69, 0xfa, 0x1e, 0xb1, 0x6d, 0x44, 0xd6, 0x22, 0xf2, 0xe0, 0xca, 0x25, 0xee, 0xa1,
    0x72, 0x36, 0x9b, 0xc1,
]);

pub const ALFAJORES_CHAIN_ID: u64 = 44787;

pub const ERC20_DECIMALS: u32 = 18;

/// Account that signs every mutating call of a session.
pub type SigningIdentity = Address;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub description: String,
}

/// A post exactly as `getPost` returns it, without its index.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PostRecord {
    pub author: Address,
    pub image: String,
    pub title: String,
    pub description: String,
    pub likes: U256,
    pub comments: Vec<Comment>,
}

/// Point in time copy of an on-chain post.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Post {
    /// Assigned by the contract, never changes
    pub index: u64,
    pub author: Address,
    pub image: String,
    pub title: String,
    pub description: String,
    pub likes: U256,
    pub comments: Vec<Comment>,
}

impl Post {
    pub fn from_record(index: u64, record: PostRecord) -> Self {
        Self {
            index,
            author: record.author,
            image: record.image,
            title: record.title,
            description: record.description,
            likes: record.likes,
            comments: record.comments,
        }
    }
}

/// Display-ready stable token balance, always two fractional digits.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Balance(pub String);

impl Default for Balance {
    fn default() -> Self {
        Balance("0.00".to_string())
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
