//! Re-exports `agentrt_domain::tokenizer` so callers that only need the
//! utility leaves don't have to depend on the whole domain model
//! vocabulary by name.

pub use agentrt_domain::tokenizer::{count, encode};
