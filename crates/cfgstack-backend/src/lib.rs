//! Backend primitive for cfgstack.
//!
//! This crate owns everything below the config store: the git-style text
//! grammar, key normalization, the integer/boolean value grammar, and the two
//! backend implementations (in-memory table and on-disk file).

mod backend;
mod document;
mod error;
mod file;
mod key;
mod memory;
mod parse;
mod value;

pub use backend::{compile_pattern, Backend, Entry};
pub use document::ConfigDocument;
pub use error::BackendError;
pub use file::FileBackend;
pub use key::{normalize_key, KeyParts};
pub use memory::MemoryBackend;
pub use parse::ParseError;
pub use value::{format_bool, format_int64, parse_bool, parse_int64};
