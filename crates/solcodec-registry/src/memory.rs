//! In-memory `SchemaRegistry` implementation.
//!
//! One entry per program address. Thread-safe via `Arc<RwLock<Inner>>`;
//! schemas are handed out as `Arc<ProgramSchema>` so readers never hold the lock
//! while decoding.

use solcodec_core::{
    address::decode_pubkey,
    error::RegistryError,
    schema::{ProgramSchema, SchemaRegistry},
};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};
use tracing::{debug, info, warn};

use crate::idl::IdlParser;

#[derive(Default)]
struct Inner {
    /// Program address → schema
    programs: HashMap<String, Arc<ProgramSchema>>,
}

/// Thread-safe in-memory program schema registry.
#[derive(Clone, Default)]
pub struct MemoryRegistry {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Parse and register an IDL for `program_address`.
    ///
    /// Re-registering an address replaces its entry. Documents matching neither
    /// IDL dialect are logged and skipped; the call still succeeds.
    pub fn register(&self, program_address: &str, idl_json: &str) -> Result<(), RegistryError> {
        let doc: serde_json::Value = serde_json::from_str(idl_json)?;
        self.register_value(program_address, doc)
    }

    /// Same as [`Self::register`] for an already-parsed JSON document.
    pub fn register_value(
        &self,
        program_address: &str,
        idl: serde_json::Value,
    ) -> Result<(), RegistryError> {
        decode_pubkey(program_address)?;
        match IdlParser::parse_value(program_address, idl)? {
            Some(schema) => {
                self.insert(schema);
                Ok(())
            }
            None => {
                warn!(
                    program = %program_address,
                    "document matches no known IDL dialect, not registered"
                );
                Ok(())
            }
        }
    }

    /// Insert an already-built schema, replacing any previous entry.
    pub fn insert(&self, schema: ProgramSchema) {
        debug!(
            program = %schema.program_address,
            name = %schema.name,
            dialect = %schema.dialect,
            instructions = schema.instructions.len(),
            accounts = schema.accounts.len(),
            events = schema.events.len(),
            "registered program schema"
        );
        let mut inner = self.write();
        if inner
            .programs
            .insert(schema.program_address.clone(), Arc::new(schema))
            .is_some()
        {
            debug!("replaced existing schema");
        }
    }

    /// Register a single IDL file under the given address.
    pub fn register_file(&self, program_address: &str, path: &Path) -> Result<(), RegistryError> {
        let content = std::fs::read_to_string(path)?;
        self.register(program_address, &content)
    }

    /// Load every `*.json` IDL under `dir` recursively.
    ///
    /// The program address is the IDL's own declared address if it has one,
    /// otherwise the file stem. Returns the number of schemas registered.
    pub fn load_directory(&self, dir: &Path) -> Result<usize, RegistryError> {
        let mut count = 0;
        for path in walkdir_json(dir)? {
            let content = std::fs::read_to_string(&path)?;
            let doc: serde_json::Value = serde_json::from_str(&content)?;
            let address = IdlParser::declared_address(&doc).or_else(|| {
                path.file_stem()
                    .and_then(|s| s.to_str())
                    .map(str::to_string)
            });
            let Some(address) = address else {
                warn!(path = %path.display(), "cannot determine program address, skipped");
                continue;
            };
            self.register_value(&address, doc)?;
            if self.contains(&address) {
                count += 1;
            }
        }
        info!(dir = %dir.display(), count, "loaded IDL directory");
        Ok(count)
    }

    /// Returns the number of registered programs.
    pub fn len(&self) -> usize {
        self.read().programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns all registered schemas.
    pub fn all_schemas(&self) -> Vec<Arc<ProgramSchema>> {
        self.read().programs.values().cloned().collect()
    }
}

impl SchemaRegistry for MemoryRegistry {
    fn get(&self, program_address: &str) -> Option<Arc<ProgramSchema>> {
        self.read().programs.get(program_address).cloned()
    }

    fn contains(&self, program_address: &str) -> bool {
        self.read().programs.contains_key(program_address)
    }

    fn programs(&self) -> Vec<String> {
        let mut out: Vec<String> = self.read().programs.keys().cloned().collect();
        out.sort();
        out
    }

    fn has_instruction_name(&self, name: &str) -> bool {
        self.read()
            .programs
            .values()
            .any(|s| s.instruction_names.contains(name))
    }
}

/// Collect all `.json` files under `dir` recursively, in a stable order.
fn walkdir_json(dir: &Path) -> Result<Vec<PathBuf>, RegistryError> {
    let mut files = Vec::new();
    if !dir.is_dir() {
        return Err(RegistryError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} is not a directory", dir.display()),
        )));
    }
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            files.extend(walkdir_json(&path)?);
        } else if path.extension().is_some_and(|e| e == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
