//! Core building blocks shared by the Virtual Observatory client crates.

pub mod auth;
pub mod errors;
pub mod session;
pub mod vosi;
pub mod votable;

pub use errors::{AccessError, DalResult, FormatError, ParamError, QueryError, ServiceError};
pub use session::Session;
pub use votable::{parse_votable, Datatype, Field, Info, Param, Resource, Table, Value, VoTable};

/// Re-exports for the most common types.
pub mod prelude {
    pub use crate::{
        auth::AuthSession,
        errors::{AccessError, DalResult, FormatError, ParamError, QueryError, ServiceError},
        session::Session,
        votable::{parse_votable, VoTable},
    };
}
