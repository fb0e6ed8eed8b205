//! Shared strings table for string deduplication across the workbook

use std::collections::HashMap;

use crate::error::{Result, XlgenError};

/// Deduplicated text pool referenced by index from shared-string cells.
///
/// An entry's position is its permanent index. Lookups match text exactly
/// (case-sensitive, no trimming). Entries are never removed.
#[derive(Debug, Default, Clone)]
pub struct SharedStringPool {
    strings: Vec<String>,
    string_map: HashMap<String, u32>,
    /// Number of entries that came from a loaded table.
    loaded: usize,
    dirty: bool,
}

impl SharedStringPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a pool from a loaded shared-string table, keeping every entry at
    /// its original position.
    ///
    /// Tables written by other tools may repeat a text; lookups resolve to the
    /// first occurrence, the same entry an in-order scan would find.
    pub fn from_entries(entries: Vec<String>) -> Self {
        let mut string_map = HashMap::with_capacity(entries.len());
        let mut duplicates = 0usize;
        for (idx, s) in entries.iter().enumerate() {
            let Ok(idx) = u32::try_from(idx) else {
                break;
            };
            if string_map.contains_key(s) {
                duplicates += 1;
            } else {
                string_map.insert(s.clone(), idx);
            }
        }
        if duplicates > 0 {
            log::warn!("shared string table holds {duplicates} duplicate entries");
        }
        Self {
            loaded: entries.len(),
            strings: entries,
            string_map,
            dirty: false,
        }
    }

    /// Return the index of `text`, appending it as a new entry if absent.
    ///
    /// Appending marks the pool dirty; reusing an entry does not.
    pub fn intern(&mut self, text: &str) -> Result<u32> {
        if let Some(&index) = self.string_map.get(text) {
            return Ok(index);
        }

        let index = u32::try_from(self.strings.len())
            .map_err(|_| XlgenError::Other("shared string table is full".into()))?;
        self.strings.push(text.to_string());
        self.string_map.insert(text.to_string(), index);
        self.dirty = true;
        Ok(index)
    }

    /// Look up an index without inserting.
    pub fn index_of(&self, text: &str) -> Option<u32> {
        self.string_map.get(text).copied()
    }

    /// Text stored at `index`.
    pub fn get(&self, index: u32) -> Option<&str> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.strings.get(i))
            .map(String::as_str)
    }

    /// Get number of entries
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Entries in index order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.strings.iter().map(String::as_str)
    }

    /// Entries added after the table was loaded, in index order.
    pub fn appended(&self) -> impl Iterator<Item = &str> {
        self.strings
            .iter()
            .skip(self.loaded)
            .map(String::as_str)
    }

    /// Whether entries were appended since the pool was created or loaded.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}
