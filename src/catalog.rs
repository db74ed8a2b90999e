//! Structure templates found in a snapshot, and their export.
//!
//! Exported files hold the stored NBT payload byte for byte, laid out as
//! `structures/<namespace>/<name>.mcstructure`.

use crate::error::{Error, Result};
use crate::key::structure_id;
use crate::loader::Snapshot;
use bytes::Bytes;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Namespace used for ids without one
pub const DEFAULT_NAMESPACE: &str = "mystructure";

/// File extension of exported structures
pub const STRUCTURE_EXTENSION: &str = "mcstructure";

/// Directory created under the export root
pub const EXPORT_DIR_NAME: &str = "structures";

/// Replaces characters that are not allowed in file names with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect()
}

/// One saved structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureEntry {
    id: String,
    data: Bytes,
}

impl StructureEntry {
    /// Creates an entry from a namespaced id and its payload
    pub fn new(id: impl Into<String>, data: Bytes) -> Self {
        Self { id: id.into(), data }
    }

    /// Full id, e.g. `mystructure:house`
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Part of the id before the first `:`
    pub fn namespace(&self) -> &str {
        match self.id.find(':') {
            Some(i) if i > 0 => &self.id[..i],
            _ => DEFAULT_NAMESPACE,
        }
    }

    /// Part of the id after the first `:`
    pub fn name(&self) -> &str {
        match self.id.find(':') {
            Some(i) if i > 0 => &self.id[i + 1..],
            _ => &self.id,
        }
    }

    /// Raw NBT payload
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Payload size in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Human-readable size: `"512 B"`, `"1.5 KB"`, `"2.0 MB"`
    pub fn formatted_size(&self) -> String {
        const KB: usize = 1024;
        const MB: usize = 1024 * 1024;
        let size = self.size();
        if size < KB {
            format!("{} B", size)
        } else if size < MB {
            format!("{:.1} KB", size as f64 / KB as f64)
        } else {
            format!("{:.1} MB", size as f64 / MB as f64)
        }
    }

    /// Export file name: sanitized name plus extension
    pub fn file_name(&self) -> String {
        format!("{}.{}", sanitize_file_name(self.name()), STRUCTURE_EXTENSION)
    }

    /// Writes the payload verbatim
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(&self.data)?;
        writer.flush()?;
        Ok(())
    }

    /// Writes the payload to a new file at `path`
    pub fn export_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        self.write_to(BufWriter::new(file))
    }
}

/// Result of [`StructureCatalog::export_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    /// Number of files written
    pub exported: usize,
    /// The `structures` directory files were written under
    pub output_dir: PathBuf,
    /// Every file written, in catalog order
    pub files: Vec<PathBuf>,
}

/// All structures of a snapshot, sorted by key.
#[derive(Debug, Clone, Default)]
pub struct StructureCatalog {
    entries: Vec<StructureEntry>,
}

impl StructureCatalog {
    /// Collects structure entries, skipping empty ids and empty payloads
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let entries = snapshot
            .structures()
            .iter()
            .filter(|e| !e.value.is_empty())
            .filter_map(|e| {
                let id = structure_id(&e.key)?;
                if id.is_empty() {
                    log::debug!("Skipping structure key without id");
                    return None;
                }
                Some(StructureEntry::new(id, e.value.clone()))
            })
            .collect();
        Self { entries }
    }

    /// Entries in key order
    pub fn entries(&self) -> &[StructureEntry] {
        &self.entries
    }

    /// Number of structures
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a structure by its full id
    pub fn find(&self, id: &str) -> Option<&StructureEntry> {
        self.entries.iter().find(|e| e.id() == id)
    }

    /// Writes every structure to `out_dir/structures/<namespace>/<file_name>`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if there is nothing to export, or an I/O
    /// error from the first file that could not be written.
    pub fn export_all<P: AsRef<Path>>(&self, out_dir: P) -> Result<ExportSummary> {
        if self.entries.is_empty() {
            return Err(Error::not_found("No structures to export"));
        }

        let output_dir = out_dir.as_ref().join(EXPORT_DIR_NAME);
        let mut files = Vec::with_capacity(self.entries.len());

        for entry in &self.entries {
            let dir = output_dir.join(sanitize_file_name(entry.namespace()));
            fs::create_dir_all(&dir)?;
            let path = dir.join(entry.file_name());
            entry.export_to_file(&path)?;
            log::debug!("Exported {} to {}", entry.id(), path.display());
            files.push(path);
        }

        log::info!("Exported {} structures to {}", files.len(), output_dir.display());
        Ok(ExportSummary { exported: files.len(), output_dir, files })
    }
}
