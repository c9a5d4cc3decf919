//! Memcached binary protocol: framing and the admin client

pub mod client;
pub mod codec;

pub use client::{AdminClient, McClient};
pub use codec::VbucketState;
