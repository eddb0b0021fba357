pub mod config;
pub mod error;
pub mod policy;
pub mod types;

pub use config::BurnlinkConfig;
pub use error::{BurnlinkError, BurnlinkResult, StorageError};
pub use policy::{PolicyLimits, PolicyViolation, SecretPolicy, ViewOutcome};
pub use types::{Creator, SecretId};
