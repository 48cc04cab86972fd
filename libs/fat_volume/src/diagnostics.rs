//! Whole-tree queries: enumeration, fragmentation and sector ownership.

use log::{debug, warn};

use crate::dir_entry::DirectoryEntry;
use crate::error::Result;
use crate::layout::RootLocation;
use crate::storage::Storage;
use crate::volume::Volume;

/// A file or directory found while walking the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Slash-joined path relative to where the walk started.
    pub path: String,
    pub entry: DirectoryEntry,
}

impl<S: Storage> Volume<S> {
    /// Every file and directory below `path`, depth first, parents before
    /// their children. `.`, `..` and volume labels are left out.
    pub fn walk_tree(&mut self, path: &str) -> Result<Vec<TreeEntry>> {
        let (start, entries) = self.resolve_directory(path)?;
        let root = match self.layout().root {
            RootLocation::Region { .. } => 0,
            RootLocation::Cluster(cluster) => cluster,
        };
        let mut open_dirs = vec![0, root];
        if !open_dirs.contains(&start) {
            open_dirs.push(start);
        }
        let mut out = Vec::new();
        self.walk_into(entries, "", &mut open_dirs, &mut out)?;
        Ok(out)
    }

    fn walk_into(
        &mut self,
        entries: Vec<DirectoryEntry>,
        prefix: &str,
        open_dirs: &mut Vec<u32>,
        out: &mut Vec<TreeEntry>,
    ) -> Result<()> {
        for entry in entries {
            if entry.is_dot() || entry.is_volume_label() {
                continue;
            }
            let path = if prefix.is_empty() {
                entry.name.clone()
            } else {
                format!("{prefix}/{}", entry.name)
            };

            if !entry.is_directory() {
                out.push(TreeEntry { path, entry });
                continue;
            }

            let cluster = entry.cluster;
            out.push(TreeEntry { path: path.clone(), entry });
            if open_dirs.contains(&cluster) {
                warn!("{path}: directory points back at cluster {cluster}, not descending");
                continue;
            }
            let children = self.directory_entries(cluster)?;
            open_dirs.push(cluster);
            self.walk_into(children, &path, open_dirs, out)?;
            open_dirs.pop();
        }
        Ok(())
    }

    /// Regular files anywhere on the volume whose chain is not contiguous.
    pub fn fragmented_files(&mut self) -> Result<Vec<TreeEntry>> {
        let mut fragmented = Vec::new();
        for item in self.walk_tree("")? {
            if item.entry.is_directory() {
                continue;
            }
            if self.chain_from(item.entry.cluster)?.is_fragmented() {
                fragmented.push(item);
            }
        }
        debug!("{} fragmented files", fragmented.len());
        Ok(fragmented)
    }

    /// First file, in tree order, with a cluster covering absolute `sector`.
    ///
    /// Directory clusters and the reserved, FAT and root regions belong to no
    /// file, so sectors there give `None`.
    pub fn file_owning_sector(&mut self, sector: u64) -> Result<Option<TreeEntry>> {
        let layout = *self.layout();
        for item in self.walk_tree("")? {
            if item.entry.is_directory() {
                continue;
            }
            let chain = self.chain_from(item.entry.cluster)?;
            let owns = chain
                .iter()
                .filter_map(|&cluster| layout.cluster_sectors(cluster))
                .any(|sectors| sectors.contains(&sector));
            if owns {
                return Ok(Some(item));
            }
        }
        Ok(None)
    }
}
