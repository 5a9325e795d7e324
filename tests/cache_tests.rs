use std::cell::Cell;

use anyhow::{Result, anyhow};
use memotable::{
    Backend, CacheError, CacheFacility, CacheOptions, CallArgs, FunctionSpec, SqliteBackend,
    code_fingerprint, input_fingerprint,
};

const ADD_ONE: &str = "def b(x):\n    return x + 1\n";
const ADD_ONE_COMMENTED: &str = "def b(x):  # bump by one\n    return x  +  1\n";
const ADD_TWO: &str = "def b(x):\n    return x + 2\n";

fn temp_storage() -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix("memotable-test")
        .tempdir()
        .expect("failed to create temp dir")
}

fn facility(dir: &tempfile::TempDir) -> CacheFacility<SqliteBackend> {
    memotable::utils::logger::init_logging();
    CacheFacility::open(CacheOptions::new(dir.path())).expect("failed to open cache")
}

fn add_one_func() -> FunctionSpec<'static> {
    FunctionSpec::new("demo", "b", ADD_ONE)
}

fn registry_count(dir: &tempfile::TempDir, func: &FunctionSpec<'_>) -> u64 {
    let backend = SqliteBackend::new(dir.path()).expect("failed to reopen backend");
    backend.count(&func.identity()).expect("count failed")
}

#[test]
fn repeated_call_runs_the_computation_once() -> Result<()> {
    let dir = temp_storage();
    let cache = facility(&dir);
    let func = add_one_func();
    let args = CallArgs::new().arg(&1)?;
    let runs = Cell::new(0_u32);

    let first: i64 = cache.invoke(&func, &args, || {
        runs.set(runs.get() + 1);
        Ok(1 + 1)
    })?;
    let second: i64 = cache.invoke(&func, &args, || {
        runs.set(runs.get() + 1);
        Ok(1 + 1)
    })?;

    assert_eq!(first, 2);
    assert_eq!(second, 2);
    assert_eq!(runs.get(), 1);
    assert_eq!(registry_count(&dir, &func), 1);
    Ok(())
}

#[test]
fn comment_and_whitespace_edits_still_hit() -> Result<()> {
    let dir = temp_storage();
    let cache = facility(&dir);
    let args = CallArgs::new().arg(&1)?;
    let runs = Cell::new(0_u32);

    let _: i64 = cache.invoke(&FunctionSpec::new("demo", "b", ADD_ONE), &args, || {
        runs.set(runs.get() + 1);
        Ok(2)
    })?;
    let replayed: i64 = cache.invoke(
        &FunctionSpec::new("demo", "b", ADD_ONE_COMMENTED),
        &args,
        || {
            runs.set(runs.get() + 1);
            Ok(2)
        },
    )?;

    assert_eq!(replayed, 2);
    assert_eq!(runs.get(), 1);
    Ok(())
}

#[test]
fn keyword_order_shares_an_entry_but_positional_order_does_not() -> Result<()> {
    let dir = temp_storage();
    let cache = facility(&dir);
    let func = add_one_func();
    let runs = Cell::new(0_u32);

    let ab = CallArgs::new().kwarg("a", &1)?.kwarg("b", &2)?;
    let ba = CallArgs::new().kwarg("b", &2)?.kwarg("a", &1)?;
    let _: i64 = cache.invoke(&func, &ab, || {
        runs.set(runs.get() + 1);
        Ok(3)
    })?;
    let _: i64 = cache.invoke(&func, &ba, || {
        runs.set(runs.get() + 1);
        Ok(3)
    })?;
    assert_eq!(runs.get(), 1, "keyword order must not matter");
    assert_eq!(registry_count(&dir, &func), 1);

    let one_two = CallArgs::new().arg(&1)?.arg(&2)?;
    let two_one = CallArgs::new().arg(&2)?.arg(&1)?;
    let _: i64 = cache.invoke(&func, &one_two, || {
        runs.set(runs.get() + 1);
        Ok(3)
    })?;
    let _: i64 = cache.invoke(&func, &two_one, || {
        runs.set(runs.get() + 1);
        Ok(3)
    })?;
    assert_eq!(runs.get(), 3, "positional order must matter");
    assert_eq!(registry_count(&dir, &func), 3);
    Ok(())
}

#[test]
fn code_change_recomputes_and_cleans_old_entries() -> Result<()> {
    let dir = temp_storage();
    let cache = facility(&dir);
    let runs = Cell::new(0_u32);

    // b(1) and b(2) under the original source.
    let one = CallArgs::new().arg(&1)?;
    let two = CallArgs::new().arg(&2)?;
    let old_func = FunctionSpec::new("demo", "b", ADD_ONE);
    let v: i64 = cache.invoke(&old_func, &one, || {
        runs.set(runs.get() + 1);
        Ok(2)
    })?;
    assert_eq!(v, 2);
    assert_eq!(registry_count(&dir, &old_func), 1);

    let v: i64 = cache.invoke(&old_func, &one, || {
        runs.set(runs.get() + 1);
        Ok(2)
    })?;
    assert_eq!(v, 2);
    assert_eq!(runs.get(), 1);
    assert_eq!(registry_count(&dir, &old_func), 1);

    let v: i64 = cache.invoke(&old_func, &two, || {
        runs.set(runs.get() + 1);
        Ok(3)
    })?;
    assert_eq!(v, 3);
    assert_eq!(registry_count(&dir, &old_func), 2);

    // Hold a handle to one of the old payloads to observe the cleanup.
    let backend = SqliteBackend::new(dir.path())?;
    let old_code = code_fingerprint(ADD_ONE, &[])?;
    let old_entry = backend
        .search(&old_func.identity(), &old_code, &input_fingerprint(&one))?
        .expect("entry for b(1) should exist");
    assert!(
        backend
            .read_payload(&old_func.identity(), &old_entry.data_point)
            .is_ok()
    );

    // Change the logic: the next call misses, and obsolete cleanup deletes
    // both prior entries along with their payload tables.
    let new_func = FunctionSpec::new("demo", "b", ADD_TWO);
    let v: i64 = cache.invoke(&new_func, &one, || {
        runs.set(runs.get() + 1);
        Ok(3)
    })?;
    assert_eq!(v, 3);
    assert_eq!(runs.get(), 3);
    assert_eq!(registry_count(&dir, &new_func), 1);
    assert!(
        backend
            .read_payload(&new_func.identity(), &old_entry.data_point)
            .is_err()
    );
    Ok(())
}

#[test]
fn computation_failure_propagates_and_caches_nothing() -> Result<()> {
    let dir = temp_storage();
    let cache = facility(&dir);
    let func = add_one_func();
    let args = CallArgs::new().arg(&1)?;

    let err = cache
        .invoke::<i64, _>(&func, &args, || Err(anyhow!("flaky upstream")))
        .unwrap_err();
    assert!(matches!(err, CacheError::Computation(_)));
    assert_eq!(registry_count(&dir, &func), 0);

    // The failed call left nothing behind, so this one still computes.
    let runs = Cell::new(0_u32);
    let v: i64 = cache.invoke(&func, &args, || {
        runs.set(runs.get() + 1);
        Ok(2)
    })?;
    assert_eq!(v, 2);
    assert_eq!(runs.get(), 1);
    Ok(())
}

#[test]
fn unhashable_argument_fails_before_any_side_effect() {
    let mut weird: std::collections::HashMap<(i32, i32), i32> = std::collections::HashMap::new();
    weird.insert((1, 2), 3);

    let err = CallArgs::new().arg(&weird).unwrap_err();
    assert!(matches!(err, CacheError::Unhashable { .. }));
}

#[test]
fn unusable_storage_location_is_a_storage_failure() -> Result<()> {
    let dir = temp_storage();
    let blocker = dir.path().join("occupied");
    std::fs::write(&blocker, b"not a directory")?;

    let err = CacheFacility::open(CacheOptions::new(&blocker)).unwrap_err();
    assert!(matches!(err, CacheError::Storage(_)));
    Ok(())
}
