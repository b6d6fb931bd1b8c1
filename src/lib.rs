//! cfgstack - layered git-style configuration store
//!
//! A [`ConfigStore`] manages an ordered stack of config backends (files on
//! disk or in-memory tables), each tagged with a [`ConfigLevel`]. Lookups
//! resolve across the stack by precedence, values are coerced to integers,
//! booleans or strings at the access boundary, multi-valued entries can be
//! read and rewritten by regex, and the whole stack can be enumerated.

pub mod discovery;
pub mod entries;
pub mod error;
pub mod level;
pub mod multivar;
pub mod store;
pub mod value;

pub use cfgstack_backend::{Backend, BackendError, FileBackend, MemoryBackend};
pub use discovery::{PathResolver, SearchPaths, SearchPathsError};
pub use entries::Entries;
pub use error::{ConfigError, ErrorKind};
pub use level::ConfigLevel;
pub use multivar::Multivar;
pub use store::{ConfigEntry, ConfigStore};
pub use value::{ConfigValue, TypedValue};
