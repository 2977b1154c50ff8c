//! Domain records produced by the administrative tool.
//!
//! - [`types`]: the plain value records (clusters, infobases, sessions, connections) and
//!   the credentials used to authenticate against a cluster or infobase.
//! - [`schema`]: the static per-record tables mapping tool keys onto record fields.
//! - [`decoder`]: line decoding and block-to-record unmarshaling.

pub mod decoder;
pub mod schema;
pub mod types;

pub use decoder::{decode_line, is_blank, unmarshal};
pub use schema::{FieldSpec, Record, Slot};
pub use types::{Cluster, Connection, Credentials, Infobase, Session};
