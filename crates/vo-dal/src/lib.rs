//! Data Access Layer clients for the Virtual Observatory protocols.
//!
//! One generic query/results/record core, parameterized by per-protocol
//! capability descriptors, serves cone search, image, spectrum, line, and
//! table access, plus Datalink follow-on links and a small VOSpace reader.

pub mod cursor;
pub mod datalink;
pub mod params;
pub mod protocol;
pub mod query;
pub mod record;
pub mod results;
pub mod scs;
pub mod sia;
pub mod sla;
pub mod ssa;
pub mod tap;
pub mod uws;
pub mod vospace;

pub use cursor::{Cursor, ScrollMode, TypeCode};
pub use protocol::{FieldRole, Protocol};
pub use query::DalQuery;
pub use record::Record;
pub use results::DalResults;

/// Re-exports for the most common types.
pub mod prelude {
    pub use crate::{
        cursor::Cursor,
        datalink::DatalinkResults,
        params::Intersect,
        protocol::{FieldRole, Protocol},
        query::DalQuery,
        record::Record,
        results::DalResults,
        scs::ScsService,
        sia::SiaService,
        sla::SlaService,
        ssa::SsaService,
        tap::TapService,
    };
    pub use vo_core::errors::{AccessError, DalResult};
    pub use vo_core::session::Session;
}
