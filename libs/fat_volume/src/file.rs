//! File contents and in-place attribute patches.

use log::{debug, warn};

use crate::dir_entry::{Attributes, DirectoryEntry};
use crate::error::Result;
use crate::storage::Storage;
use crate::volume::Volume;

/// Offset of the attribute byte inside a 32-byte record.
const ATTR_OFFSET: u64 = 11;

impl<S: Storage> Volume<S> {
    /// Regular file at `path`. Directories and volume labels never match.
    pub fn find_file(&mut self, path: &str) -> Result<DirectoryEntry> {
        self.find_entry(path, |e| !e.is_directory() && !e.is_volume_label())
    }

    /// Whole contents of the file at `path`.
    pub fn read_file(&mut self, path: &str) -> Result<Vec<u8>> {
        let entry = self.find_file(path)?;
        self.read_entry(&entry)
    }

    /// Concatenate the clusters of `entry` in chain order and cut the result
    /// to the recorded size.
    pub fn read_entry(&mut self, entry: &DirectoryEntry) -> Result<Vec<u8>> {
        let chain = self.chain_from(entry.cluster)?;
        let mut data = Vec::with_capacity(chain.len() * self.layout().cluster_size as usize);
        for &cluster in &chain {
            data.extend_from_slice(&self.read_cluster(cluster)?);
        }
        if data.len() < entry.size as usize {
            warn!(
                "{}: chain holds {} bytes but the entry records {}",
                entry.name,
                data.len(),
                entry.size
            );
        }
        data.truncate(entry.size as usize);
        Ok(data)
    }

    /// Overwrite the attribute byte of the record at `path`.
    ///
    /// Only that one byte is written. The new value is not validated, and
    /// entries returned earlier keep their old attributes.
    pub fn set_attribute(&mut self, path: &str, attributes: Attributes) -> Result<()> {
        let entry = self.find_entry(path, |e| !e.is_volume_label() && !e.is_dot())?;
        debug!("{path}: attributes {:#04x} -> {:#04x}", entry.attributes.bits(), attributes.bits());
        self.storage.write_at(entry.offset + ATTR_OFFSET, &[attributes.bits()])?;
        Ok(())
    }
}
