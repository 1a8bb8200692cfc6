//! Re-exports the standalone [`swarmkeeper_bencode`] codec under the core
//! namespace so the rest of the crate can `use crate::core::bencode::*`
//! without naming the contrib package directly.
pub use swarmkeeper_bencode::{decode, encode, DictBuilder, Error, Value};
