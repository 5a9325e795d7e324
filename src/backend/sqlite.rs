//! SQLite table service: one database file per function under the storage
//! root, holding the fixed-schema `registry` table plus one single-column
//! table per stored payload, named by its reference.

use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension, params};

use super::Backend;
use crate::error::StorageError;
use crate::fingerprint::{CodeFingerprint, InputFingerprint};
use crate::registry::{EntryRef, FunctionIdentity, PayloadReference};

const REGISTRY_SCHEMA: &str = "CREATE TABLE IF NOT EXISTS registry (
    [id] INTEGER PRIMARY KEY,
    [name] TEXT,
    [code] TEXT,
    [input] TEXT,
    [timestamp] TEXT,
    [data_point] TEXT)";

#[derive(Debug)]
pub struct SqliteBackend {
    root: PathBuf,
}

impl SqliteBackend {
    /// Opens a backend rooted at `root`, creating the directory if absent.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root)
            .map_err(|err| StorageError::io("creating storage directory", &root, err))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Opens the function's database and ensures the registry table exists.
    /// Connections are scoped to one operation and dropped on every exit
    /// path, so no handle outlives the call that needed it.
    fn open(&self, identity: &FunctionIdentity) -> Result<Connection, StorageError> {
        let path = self.root.join(format!("{}.sqlite", identity.compact()));
        let conn = Connection::open(path)?;
        conn.execute(REGISTRY_SCHEMA, [])?;
        Ok(conn)
    }
}

impl Backend for SqliteBackend {
    fn search(
        &self,
        identity: &FunctionIdentity,
        code: &CodeFingerprint,
        input: &InputFingerprint,
    ) -> Result<Option<EntryRef>, StorageError> {
        let conn = self.open(identity)?;
        let row = conn
            .query_row(
                "SELECT id, data_point FROM registry
                 WHERE name = ?1 AND code = ?2 AND input = ?3",
                params![identity.qualified(), code.as_str(), input.as_str()],
                |row| {
                    Ok(EntryRef {
                        id: row.get(0)?,
                        data_point: PayloadReference::from(row.get::<_, String>(1)?),
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    fn insert(
        &self,
        identity: &FunctionIdentity,
        code: &CodeFingerprint,
        input: &InputFingerprint,
        data_point: &PayloadReference,
        timestamp: &str,
    ) -> Result<(), StorageError> {
        let conn = self.open(identity)?;
        conn.execute(
            "INSERT INTO registry (name, code, input, timestamp, data_point)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                identity.qualified(),
                code.as_str(),
                input.as_str(),
                timestamp,
                data_point.as_str()
            ],
        )?;
        Ok(())
    }

    fn touch(
        &self,
        identity: &FunctionIdentity,
        id: i64,
        timestamp: &str,
    ) -> Result<(), StorageError> {
        let conn = self.open(identity)?;
        conn.execute(
            "UPDATE registry SET timestamp = ?1 WHERE id = ?2",
            params![timestamp, id],
        )?;
        Ok(())
    }

    fn list_obsolete(
        &self,
        identity: &FunctionIdentity,
        current_code: &CodeFingerprint,
    ) -> Result<Vec<EntryRef>, StorageError> {
        let conn = self.open(identity)?;
        let mut stmt = conn.prepare(
            "SELECT id, data_point FROM registry WHERE name = ?1 AND code <> ?2",
        )?;
        let rows = stmt.query_map(params![identity.qualified(), current_code.as_str()], |row| {
            Ok(EntryRef {
                id: row.get(0)?,
                data_point: PayloadReference::from(row.get::<_, String>(1)?),
            })
        })?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    fn count(&self, identity: &FunctionIdentity) -> Result<u64, StorageError> {
        let conn = self.open(identity)?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM registry", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn oldest_entry(&self, identity: &FunctionIdentity) -> Result<Option<EntryRef>, StorageError> {
        let conn = self.open(identity)?;
        let row = conn
            .query_row(
                "SELECT id, data_point FROM registry
                 ORDER BY timestamp ASC, id ASC LIMIT 1",
                [],
                |row| {
                    Ok(EntryRef {
                        id: row.get(0)?,
                        data_point: PayloadReference::from(row.get::<_, String>(1)?),
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    fn delete(&self, identity: &FunctionIdentity, id: i64) -> Result<(), StorageError> {
        let conn = self.open(identity)?;
        conn.execute("DELETE FROM registry WHERE id = ?1", params![id])?;
        Ok(())
    }

    fn write_payload(
        &self,
        identity: &FunctionIdentity,
        reference: &PayloadReference,
        bytes: &[u8],
    ) -> Result<(), StorageError> {
        let conn = self.open(identity)?;
        // Payload references are clock-derived and identifier-safe, so they
        // are usable as quoted table names.
        conn.execute(
            &format!("CREATE TABLE \"{}\" ([data] BLOB)", reference.as_str()),
            [],
        )?;
        conn.execute(
            &format!("INSERT INTO \"{}\" (data) VALUES (?1)", reference.as_str()),
            params![bytes],
        )?;
        Ok(())
    }

    fn read_payload(
        &self,
        identity: &FunctionIdentity,
        reference: &PayloadReference,
    ) -> Result<Vec<u8>, StorageError> {
        let conn = self.open(identity)?;
        conn.query_row(
            &format!("SELECT data FROM \"{}\"", reference.as_str()),
            [],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| StorageError::PayloadMissing {
            reference: reference.as_str().to_owned(),
        })
    }

    fn drop_payload(
        &self,
        identity: &FunctionIdentity,
        reference: &PayloadReference,
    ) -> Result<(), StorageError> {
        let conn = self.open(identity)?;
        conn.execute(
            &format!("DROP TABLE IF EXISTS \"{}\"", reference.as_str()),
            [],
        )?;
        Ok(())
    }
}
