//! Reference rules.

mod signature;
mod transitive;

pub use signature::SignatureRule;
pub use transitive::TransitiveRule;
