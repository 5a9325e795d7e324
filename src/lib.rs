//! memotable — a persistent function-result cache.
//!
//! Given a computation, memotable persists the result and returns it on
//! repeated invocations, skipping recomputation, as long as the
//! computation's source logic is unchanged and its arguments match a
//! previously cached call exactly. Results live in one SQLite database per
//! function: a fixed-schema `registry` table maps
//! (identity, code fingerprint, input fingerprint) to a payload table
//! holding the stored value.
//!
//! ```no_run
//! use memotable::{CacheFacility, CacheOptions, CallArgs, FunctionSpec};
//!
//! # fn main() -> memotable::Result<()> {
//! let cache = CacheFacility::open(CacheOptions::new("./database"))?;
//! let func = FunctionSpec::new("demo", "b", "def b(x):\n    return x + 1\n");
//!
//! let args = CallArgs::new().arg(&1)?;
//! let value: i64 = cache.invoke(&func, &args, || Ok(1 + 1))?;
//! # let _ = value;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod facility;
pub mod fingerprint;
pub mod registry;
pub mod utils;

mod evict;

pub use backend::{Backend, MemoryBackend, SqliteBackend};
pub use config::{CacheOptions, STORAGE_DIR_ENV};
pub use error::{CacheError, Result, StorageError};
pub use facility::{CacheFacility, FunctionSpec};
pub use fingerprint::{CallArgs, CodeFingerprint, InputFingerprint, code_fingerprint, input_fingerprint};
pub use registry::{EntryRef, FunctionIdentity, PayloadReference};
