//! Asset definitions and the content-addressed registry storing them.
//!
//! A definition is stored under the hash of its canonical text, and each asset id points at
//! the definition describing it. Definitions referenced by url are retrieved over http and
//! cached in the same store.

mod definition;
mod error;
pub mod http;
pub mod kv;
mod pointer;
mod registry;

pub use definition::AssetDefinition;
pub use error::{Error, Result};
pub use http::{DefinitionFetcher, HttpFetcher};
pub use kv::{FileStore, KvStore, MemoryStore};
pub use pointer::{AssetDefinitionPointer, PointerKind, HASH_LEN};
pub use registry::Registry;
