//! In-memory backend. Exists for tests and as proof that the capability
//! seam carries everything the controller and eviction pass need; it keeps
//! the same per-function scoping and monotonic row ids as the SQLite
//! backend.

use std::collections::HashMap;

use parking_lot::Mutex;

use super::Backend;
use crate::error::StorageError;
use crate::fingerprint::{CodeFingerprint, InputFingerprint};
use crate::registry::{EntryRef, FunctionIdentity, PayloadReference};

#[derive(Debug, Default)]
struct Row {
    id: i64,
    name: String,
    code: String,
    input: String,
    timestamp: String,
    data_point: String,
}

#[derive(Debug, Default)]
struct FunctionTable {
    next_id: i64,
    rows: Vec<Row>,
    payloads: HashMap<String, Vec<u8>>,
}

#[derive(Debug, Default)]
pub struct MemoryBackend {
    tables: Mutex<HashMap<String, FunctionTable>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_table<T>(
        &self,
        identity: &FunctionIdentity,
        op: impl FnOnce(&mut FunctionTable) -> T,
    ) -> T {
        let mut tables = self.tables.lock();
        let table = tables.entry(identity.compact()).or_default();
        op(table)
    }
}

impl Backend for MemoryBackend {
    fn search(
        &self,
        identity: &FunctionIdentity,
        code: &CodeFingerprint,
        input: &InputFingerprint,
    ) -> Result<Option<EntryRef>, StorageError> {
        let name = identity.qualified();
        Ok(self.with_table(identity, |table| {
            table
                .rows
                .iter()
                .find(|row| {
                    row.name == name && row.code == code.as_str() && row.input == input.as_str()
                })
                .map(entry_ref)
        }))
    }

    fn insert(
        &self,
        identity: &FunctionIdentity,
        code: &CodeFingerprint,
        input: &InputFingerprint,
        data_point: &PayloadReference,
        timestamp: &str,
    ) -> Result<(), StorageError> {
        self.with_table(identity, |table| {
            table.next_id += 1;
            table.rows.push(Row {
                id: table.next_id,
                name: identity.qualified(),
                code: code.as_str().to_owned(),
                input: input.as_str().to_owned(),
                timestamp: timestamp.to_owned(),
                data_point: data_point.as_str().to_owned(),
            });
        });
        Ok(())
    }

    fn touch(
        &self,
        identity: &FunctionIdentity,
        id: i64,
        timestamp: &str,
    ) -> Result<(), StorageError> {
        self.with_table(identity, |table| {
            if let Some(row) = table.rows.iter_mut().find(|row| row.id == id) {
                row.timestamp = timestamp.to_owned();
            }
        });
        Ok(())
    }

    fn list_obsolete(
        &self,
        identity: &FunctionIdentity,
        current_code: &CodeFingerprint,
    ) -> Result<Vec<EntryRef>, StorageError> {
        let name = identity.qualified();
        Ok(self.with_table(identity, |table| {
            table
                .rows
                .iter()
                .filter(|row| row.name == name && row.code != current_code.as_str())
                .map(entry_ref)
                .collect()
        }))
    }

    fn count(&self, identity: &FunctionIdentity) -> Result<u64, StorageError> {
        Ok(self.with_table(identity, |table| table.rows.len() as u64))
    }

    fn oldest_entry(&self, identity: &FunctionIdentity) -> Result<Option<EntryRef>, StorageError> {
        Ok(self.with_table(identity, |table| {
            table
                .rows
                .iter()
                .min_by(|a, b| {
                    a.timestamp
                        .cmp(&b.timestamp)
                        .then_with(|| a.id.cmp(&b.id))
                })
                .map(entry_ref)
        }))
    }

    fn delete(&self, identity: &FunctionIdentity, id: i64) -> Result<(), StorageError> {
        self.with_table(identity, |table| {
            table.rows.retain(|row| row.id != id);
        });
        Ok(())
    }

    fn write_payload(
        &self,
        identity: &FunctionIdentity,
        reference: &PayloadReference,
        bytes: &[u8],
    ) -> Result<(), StorageError> {
        self.with_table(identity, |table| {
            table
                .payloads
                .insert(reference.as_str().to_owned(), bytes.to_vec());
        });
        Ok(())
    }

    fn read_payload(
        &self,
        identity: &FunctionIdentity,
        reference: &PayloadReference,
    ) -> Result<Vec<u8>, StorageError> {
        self.with_table(identity, |table| {
            table
                .payloads
                .get(reference.as_str())
                .cloned()
                .ok_or_else(|| StorageError::PayloadMissing {
                    reference: reference.as_str().to_owned(),
                })
        })
    }

    fn drop_payload(
        &self,
        identity: &FunctionIdentity,
        reference: &PayloadReference,
    ) -> Result<(), StorageError> {
        self.with_table(identity, |table| {
            table.payloads.remove(reference.as_str());
        });
        Ok(())
    }
}

fn entry_ref(row: &Row) -> EntryRef {
    EntryRef {
        id: row.id,
        data_point: PayloadReference::from(row.data_point.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> FunctionIdentity {
        FunctionIdentity::new("mem", "probe")
    }

    fn fingerprints(code: &str, input: &str) -> (CodeFingerprint, InputFingerprint) {
        // Real fingerprints are opaque strings; any distinct pair works here.
        (
            crate::fingerprint::code_fingerprint(code, &[]).unwrap(),
            crate::fingerprint::input_fingerprint(
                &crate::fingerprint::CallArgs::new().arg(&input).unwrap(),
            ),
        )
    }

    #[test]
    fn insert_then_search_finds_the_row() {
        let backend = MemoryBackend::new();
        let identity = identity();
        let (code, input) = fingerprints("a\n", "x");
        let reference = PayloadReference::generate(&identity);

        backend
            .insert(&identity, &code, &input, &reference, "t1")
            .unwrap();

        let found = backend.search(&identity, &code, &input).unwrap().unwrap();
        assert_eq!(found.data_point, reference);
        assert_eq!(backend.count(&identity).unwrap(), 1);
    }

    #[test]
    fn oldest_entry_orders_by_timestamp_then_id() {
        let backend = MemoryBackend::new();
        let identity = identity();
        let (code, input_a) = fingerprints("a\n", "a");
        let (_, input_b) = fingerprints("a\n", "b");

        let first = PayloadReference::generate(&identity);
        let second = PayloadReference::generate(&identity);
        backend
            .insert(&identity, &code, &input_a, &first, "t2")
            .unwrap();
        backend
            .insert(&identity, &code, &input_b, &second, "t1")
            .unwrap();

        let oldest = backend.oldest_entry(&identity).unwrap().unwrap();
        assert_eq!(oldest.data_point, second);

        // Touching the old row past the other makes the first row oldest.
        backend.touch(&identity, oldest.id, "t3").unwrap();
        let oldest = backend.oldest_entry(&identity).unwrap().unwrap();
        assert_eq!(oldest.data_point, first);
    }

    #[test]
    fn list_obsolete_only_reports_other_code_versions() {
        let backend = MemoryBackend::new();
        let identity = identity();
        let (old_code, input) = fingerprints("a\n", "x");
        let (new_code, _) = fingerprints("b\n", "x");
        let reference = PayloadReference::generate(&identity);

        backend
            .insert(&identity, &old_code, &input, &reference, "t1")
            .unwrap();

        assert!(backend.list_obsolete(&identity, &old_code).unwrap().is_empty());
        let obsolete = backend.list_obsolete(&identity, &new_code).unwrap();
        assert_eq!(obsolete.len(), 1);
    }

    #[test]
    fn missing_payload_reads_fail() {
        let backend = MemoryBackend::new();
        let identity = identity();
        let reference = PayloadReference::generate(&identity);

        let err = backend.read_payload(&identity, &reference).unwrap_err();
        assert!(matches!(err, StorageError::PayloadMissing { .. }));
    }
}
