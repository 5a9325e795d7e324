//! Lookup/insert controller. One `invoke` drives the whole cycle:
//! fingerprint, search, then either replay the stored payload (updating the
//! row's timestamp first) or run the real computation, store its result,
//! insert the registry row, and let the eviction pass run.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::backend::{Backend, SqliteBackend};
use crate::config::CacheOptions;
use crate::error::{CacheError, Result, StorageError};
use crate::evict;
use crate::fingerprint::{CallArgs, CodeFingerprint, InputFingerprint, code_fingerprint, input_fingerprint};
use crate::registry::{EntryRef, FunctionIdentity, PayloadReference, timestamp_now};

/// Describes one cacheable function: where it lives and its current source
/// text. The source is fingerprinted on every call, so the spec should
/// always reflect the code that actually runs.
#[derive(Debug, Clone, Copy)]
pub struct FunctionSpec<'a> {
    pub module: &'a str,
    pub name: &'a str,
    pub source: &'a str,
}

impl<'a> FunctionSpec<'a> {
    pub fn new(module: &'a str, name: &'a str, source: &'a str) -> Self {
        Self {
            module,
            name,
            source,
        }
    }

    pub fn identity(&self) -> FunctionIdentity {
        FunctionIdentity::new(self.module, self.name)
    }
}

/// Immutable per-call state, computed once in the fingerprint step and
/// threaded through the remaining steps. Nothing call-specific lives on the
/// facility itself, so one facility can serve interleaved calls safely.
pub(crate) struct CallContext {
    pub(crate) identity: FunctionIdentity,
    pub(crate) code: CodeFingerprint,
    pub(crate) input: InputFingerprint,
}

#[derive(Debug)]
pub struct CacheFacility<B: Backend> {
    backend: B,
    options: CacheOptions,
}

impl CacheFacility<SqliteBackend> {
    /// Opens a facility over the SQLite backend rooted at the configured
    /// storage directory, creating it if absent.
    pub fn open(options: CacheOptions) -> Result<Self> {
        let backend = SqliteBackend::new(&options.storage_dir)?;
        Ok(Self::with_backend(options, backend))
    }
}

impl<B: Backend> CacheFacility<B> {
    pub fn with_backend(options: CacheOptions, backend: B) -> Self {
        Self { backend, options }
    }

    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    /// Invokes `compute` through the cache. On a hit the stored payload is
    /// decoded and returned without running `compute`; on a miss `compute`
    /// runs, its result is persisted, and the freshly computed value is
    /// returned — never a re-read. A failing computation propagates with
    /// nothing written.
    pub fn invoke<T, F>(&self, func: &FunctionSpec<'_>, args: &CallArgs, compute: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> anyhow::Result<T>,
    {
        let ctx = self.fingerprint(func, args)?;
        match self.backend.search(&ctx.identity, &ctx.code, &ctx.input)? {
            Some(entry) => self.replay(&ctx, &entry),
            None => self.compute_and_store(&ctx, compute),
        }
    }

    fn fingerprint(&self, func: &FunctionSpec<'_>, args: &CallArgs) -> Result<CallContext> {
        let code = code_fingerprint(func.source, &self.options.auxiliary_modules)?;
        let input = input_fingerprint(args);
        Ok(CallContext {
            identity: func.identity(),
            code,
            input,
        })
    }

    fn replay<T: DeserializeOwned>(&self, ctx: &CallContext, entry: &EntryRef) -> Result<T> {
        debug!(function = %ctx.identity, id = entry.id, "cache hit");
        // Refresh the recency clock before handing the payload back.
        self.backend
            .touch(&ctx.identity, entry.id, &timestamp_now())?;
        let bytes = self.backend.read_payload(&ctx.identity, &entry.data_point)?;
        let value =
            serde_json::from_slice(&bytes).map_err(|err| StorageError::PayloadDecode {
                reference: entry.data_point.as_str().to_owned(),
                source: err,
            })?;
        Ok(value)
    }

    fn compute_and_store<T, F>(&self, ctx: &CallContext, compute: F) -> Result<T>
    where
        T: Serialize,
        F: FnOnce() -> anyhow::Result<T>,
    {
        debug!(function = %ctx.identity, "cache miss");
        let value = compute().map_err(CacheError::Computation)?;

        let reference = PayloadReference::generate(&ctx.identity);
        let bytes = serde_json::to_vec(&value).map_err(|err| StorageError::PayloadEncode {
            reference: reference.as_str().to_owned(),
            source: err,
        })?;
        self.backend
            .write_payload(&ctx.identity, &reference, &bytes)?;
        self.backend.insert(
            &ctx.identity,
            &ctx.code,
            &ctx.input,
            &reference,
            &timestamp_now(),
        )?;
        debug!(function = %ctx.identity, reference = %reference, "stored result");

        evict::run(&self.backend, ctx, &self.options)?;
        Ok(value)
    }
}
