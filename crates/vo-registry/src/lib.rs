//! Discovery of Virtual Observatory services through the registry.

pub mod query;
pub mod resource;

pub use query::{RegistryQuery, RegistryResults, RegistryService};
pub use resource::{ResourceRecord, VoService};

/// Re-exports for the most common types.
pub mod prelude {
    pub use crate::{
        query::{RegistryQuery, RegistryResults, RegistryService},
        resource::{ResourceRecord, VoService},
    };
    pub use vo_core::errors::{AccessError, DalResult};
}
