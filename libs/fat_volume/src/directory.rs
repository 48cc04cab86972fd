//! Directory reads and path resolution.
//!
//! Paths are slash-separated, case-insensitive and always resolved from the
//! root. Empty segments are ignored, so `""`, `"/"` and `"//"` all name the root.

use log::trace;

use crate::dir_entry::{DELETED, DIR_ENTRY_SIZE, DirectoryEntry, END_OF_DIR};
use crate::error::{Error, Result};
use crate::layout::{FatType, RootLocation};
use crate::storage::Storage;
use crate::volume::Volume;

/// Decode the records of one directory region into `out`.
///
/// Deleted records are skipped. Returns `true` when an end-of-directory
/// record was hit, meaning no later region of the same directory is read.
fn scan_records(region: &[u8], base: u64, wide_clusters: bool, out: &mut Vec<DirectoryEntry>) -> bool {
    for (i, chunk) in region.chunks_exact(DIR_ENTRY_SIZE).enumerate() {
        match chunk[0] {
            END_OF_DIR => return true,
            DELETED => continue,
            _ => {}
        }
        let Ok(record) = <&[u8; DIR_ENTRY_SIZE]>::try_from(chunk) else { continue };
        let offset = base + (i * DIR_ENTRY_SIZE) as u64;
        if let Some(entry) = DirectoryEntry::decode(record, offset, wide_clusters) {
            out.push(entry);
        }
    }
    false
}

/// `("a/b", "c.txt")` for `"a/b/c.txt"`; the parent is `""` at the root.
pub(crate) fn split_parent(path: &str) -> (&str, &str) {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(i) => (&trimmed[..i], &trimmed[i + 1..]),
        None => ("", trimmed),
    }
}

impl<S: Storage> Volume<S> {
    fn wide_clusters(&self) -> bool {
        self.layout().fat_type == FatType::Fat32
    }

    fn root_entries(&mut self) -> Result<Vec<DirectoryEntry>> {
        match self.layout().root {
            RootLocation::Region { offset, entries } => {
                let mut region = vec![0u8; entries as usize * DIR_ENTRY_SIZE];
                self.storage.read_at(offset, &mut region)?;
                let mut out = Vec::new();
                scan_records(&region, offset, false, &mut out);
                trace!("root region at {offset:#x}: {} entries", out.len());
                Ok(out)
            }
            RootLocation::Cluster(cluster) => self.chain_entries(cluster),
        }
    }

    /// Every record of a directory stored as a cluster chain, across all of its clusters.
    fn chain_entries(&mut self, start: u32) -> Result<Vec<DirectoryEntry>> {
        let chain = self.chain_from(start)?;
        let wide = self.wide_clusters();
        let mut out = Vec::new();
        for &cluster in &chain {
            let Some(offset) = self.layout().cluster_offset(cluster) else { continue };
            let region = self.read_cluster(cluster)?;
            if scan_records(&region, offset, wide, &mut out) {
                break;
            }
        }
        trace!("directory at cluster {start}: {} clusters, {} entries", chain.len(), out.len());
        Ok(out)
    }

    /// Records of the directory whose first cluster is `cluster`.
    /// Cluster 0 (the `..` of a top-level directory) is the root.
    pub(crate) fn directory_entries(&mut self, cluster: u32) -> Result<Vec<DirectoryEntry>> {
        if cluster == 0 {
            self.root_entries()
        } else {
            self.chain_entries(cluster)
        }
    }

    /// Entries of the directory at `path`, in on-disk order.
    ///
    /// Long-filename and deleted records are left out; `.`, `..` and volume
    /// labels are included as stored.
    pub fn list_directory(&mut self, path: &str) -> Result<Vec<DirectoryEntry>> {
        Ok(self.resolve_directory(path)?.1)
    }

    /// First cluster and entries of the directory at `path`.
    /// The cluster is 0 for the root, whatever the subtype.
    pub(crate) fn resolve_directory(&mut self, path: &str) -> Result<(u32, Vec<DirectoryEntry>)> {
        let mut cluster = 0;
        let mut entries = self.root_entries()?;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            let dir = entries
                .into_iter()
                .find(|e| e.is_directory() && e.matches(segment))
                .ok_or_else(|| Error::NotFound(path.to_string()))?;
            cluster = dir.cluster;
            entries = self.directory_entries(cluster)?;
        }
        Ok((cluster, entries))
    }

    /// First entry of the parent directory named like the last segment of
    /// `path` and accepted by `accept`. The root itself is never returned.
    pub(crate) fn find_entry(
        &mut self,
        path: &str,
        accept: impl Fn(&DirectoryEntry) -> bool,
    ) -> Result<DirectoryEntry> {
        let not_found = || Error::NotFound(path.to_string());
        let (parent, name) = split_parent(path);
        if name.is_empty() {
            return Err(not_found());
        }
        self.list_directory(parent)
            .map_err(|e| match e {
                Error::NotFound(_) => not_found(),
                e => e,
            })?
            .into_iter()
            .find(|e| e.matches(name) && accept(e))
            .ok_or_else(not_found)
    }

    /// Name stored in the root directory's volume-label record, if there is one.
    pub fn volume_label(&mut self) -> Result<Option<String>> {
        let Some(label) = self.root_entries()?.into_iter().find(|e| e.is_volume_label()) else {
            return Ok(None);
        };
        // Labels use all 11 bytes as one field, so re-read them unsplit.
        let mut raw = [0u8; 11];
        self.storage.read_at(label.offset, &mut raw)?;
        let text: String = raw.iter().map(|&b| char::from(b)).collect();
        Ok(Some(text.trim_end_matches(' ').to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dir_entry::Attributes;
    use crate::test_image::{TestImage, formatted};
    use std::io::{Cursor, Write};

    fn names(entries: &[DirectoryEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    fn deleted(name: &str) -> [u8; DIR_ENTRY_SIZE] {
        let mut r = TestImage::file(name, 0, 0);
        r[0] = DELETED;
        r
    }

    fn terminator() -> [u8; DIR_ENTRY_SIZE] {
        [0u8; DIR_ENTRY_SIZE]
    }

    #[test]
    fn split_parent_cases() {
        assert_eq!(split_parent("a/b/c.txt"), ("a/b", "c.txt"));
        assert_eq!(split_parent("c.txt"), ("", "c.txt"));
        assert_eq!(split_parent("/c.txt"), ("", "c.txt"));
        assert_eq!(split_parent("dir/"), ("", "dir"));
        assert_eq!(split_parent(""), ("", ""));
    }

    #[test]
    fn scan_skips_deleted_and_stops_at_end_marker() {
        let mut img = TestImage::fat12();
        img.put_root_record(0, TestImage::file("A.TXT", 0, 0));
        img.put_root_record(1, deleted("X.TXT"));
        img.put_root_record(2, TestImage::file("B.TXT", 0, 0));
        img.put_root_record(3, terminator());
        img.put_root_record(4, TestImage::file("C.TXT", 0, 0));
        let mut vol = Volume::open(img.into_cursor()).unwrap();
        assert_eq!(names(&vol.list_directory("").unwrap()), ["A.TXT", "B.TXT"]);
    }

    #[test]
    fn long_name_records_are_skipped() {
        let mut img = TestImage::fat12();
        let mut lfn = TestImage::file("LFN", 0, 0);
        lfn[0] = 0x41;
        lfn[11] = Attributes::LONG_NAME.bits();
        img.put_root_record(0, lfn);
        img.put_root_record(1, TestImage::file("SHORT.TXT", 0, 0));
        let mut vol = Volume::open(img.into_cursor()).unwrap();
        assert_eq!(names(&vol.list_directory("/").unwrap()), ["SHORT.TXT"]);
    }

    #[test]
    fn record_offsets_point_into_the_root_region() {
        let mut img = TestImage::fat12();
        let root = img.root_offset() as u64;
        img.put_root_record(0, TestImage::file("A.TXT", 0, 0));
        img.put_root_record(1, TestImage::file("B.TXT", 0, 0));
        let mut vol = Volume::open(img.into_cursor()).unwrap();
        let entries = vol.list_directory("").unwrap();
        assert_eq!(entries[0].offset, root);
        assert_eq!(entries[1].offset, root + 32);
    }

    #[test]
    fn resolves_nested_directories_case_insensitively() {
        let mut img = TestImage::fat12();
        img.put_root_record(0, TestImage::dir("FOLDER", 2));
        img.link(&[2]);
        let [dot, dotdot] = TestImage::dot_entries(2, 0);
        img.put_dir_record(&[2], 0, dot);
        img.put_dir_record(&[2], 1, dotdot);
        img.put_dir_record(&[2], 2, TestImage::dir("DEEP1", 3));
        img.link(&[3]);
        let [dot, dotdot] = TestImage::dot_entries(3, 2);
        img.put_dir_record(&[3], 0, dot);
        img.put_dir_record(&[3], 1, dotdot);
        img.put_dir_record(&[3], 2, TestImage::file("LEAF.TXT", 0, 0));

        let mut vol = Volume::open(img.into_cursor()).unwrap();
        assert_eq!(names(&vol.list_directory("folder").unwrap()), [".", "..", "DEEP1"]);
        assert_eq!(names(&vol.list_directory("Folder/deep1/").unwrap()), [".", "..", "LEAF.TXT"]);
        assert_eq!(names(&vol.list_directory("folder/deep1/..").unwrap()), [".", "..", "DEEP1"]);
        assert_eq!(names(&vol.list_directory("folder/..").unwrap()), ["FOLDER"]);
    }

    #[test]
    fn missing_segment_reports_whole_path() {
        let mut img = TestImage::fat12();
        img.put_root_record(0, TestImage::dir("FOLDER", 2));
        img.link(&[2]);
        let mut vol = Volume::open(img.into_cursor()).unwrap();
        match vol.list_directory("folder/nope/deeper") {
            Err(Error::NotFound(p)) => assert_eq!(p, "folder/nope/deeper"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn files_are_not_traversed_as_directories() {
        let mut img = TestImage::fat12();
        img.put_root_record(0, TestImage::file("FOLDER", 2, 10));
        img.link(&[2]);
        let mut vol = Volume::open(img.into_cursor()).unwrap();
        assert!(matches!(vol.list_directory("folder"), Err(Error::NotFound(_))));
    }

    #[test]
    fn subdirectory_spanning_several_clusters_is_read_completely() {
        let mut img = TestImage::fat12();
        let chain = [10, 40, 41];
        img.put_root_record(0, TestImage::dir("BIG", 10));
        img.link(&chain);
        let per_cluster = img.cluster_size() / DIR_ENTRY_SIZE;
        let count = per_cluster * 2 + 3;
        for i in 0..count {
            img.put_dir_record(&chain, i, TestImage::file(&format!("F{i}.BIN"), 0, 0));
        }
        let mut vol = Volume::open(img.into_cursor()).unwrap();
        let entries = vol.list_directory("big").unwrap();
        assert_eq!(entries.len(), count);
        assert_eq!(entries.last().unwrap().name, format!("F{}.BIN", count - 1));
    }

    #[test]
    fn end_marker_stops_reading_later_clusters() {
        let mut img = TestImage::fat12();
        let chain = [10, 11];
        img.put_root_record(0, TestImage::dir("DIR", 10));
        img.link(&chain);
        let per_cluster = img.cluster_size() / DIR_ENTRY_SIZE;
        img.put_dir_record(&chain, 0, TestImage::file("ONE.TXT", 0, 0));
        img.put_dir_record(&chain, per_cluster, TestImage::file("STALE.TXT", 0, 0));
        let mut vol = Volume::open(img.into_cursor()).unwrap();
        assert_eq!(names(&vol.list_directory("dir").unwrap()), ["ONE.TXT"]);
    }

    #[test]
    fn volume_label_keeps_all_eleven_bytes() {
        let mut img = TestImage::fat12();
        let mut label = TestImage::file("x", 0, 0);
        label[..11].copy_from_slice(b"MY DISK 01 ");
        label[11] = Attributes::VOLUME_LABEL.bits();
        img.put_root_record(0, label);
        img.put_root_record(1, TestImage::file("MY.TXT", 0, 0));
        let mut vol = Volume::open(img.into_cursor()).unwrap();
        assert_eq!(vol.volume_label().unwrap().as_deref(), Some("MY DISK 01"));
    }

    #[test]
    fn no_label_record() {
        let mut vol = Volume::open(TestImage::fat12().into_cursor()).unwrap();
        assert_eq!(vol.volume_label().unwrap(), None);
    }

    // ── against images written by fatfs ──────────────────────────────────────

    fn populated(fat_type: fatfs::FatType, size: usize) -> Cursor<Vec<u8>> {
        let mut disk = formatted(fat_type, size);
        {
            let fs = fatfs::FileSystem::new(&mut disk, fatfs::FsOptions::new()).unwrap();
            let root = fs.root_dir();
            root.create_file("TOP.TXT").unwrap().write_all(b"top").unwrap();
            let docs = root.create_dir("DOCS").unwrap();
            docs.create_file("A.TXT").unwrap().write_all(b"a").unwrap();
            let inner = docs.create_dir("INNER").unwrap();
            inner.create_file("B.BIN").unwrap().write_all(&[1, 2, 3]).unwrap();
        }
        disk
    }

    fn check_listing(disk: Cursor<Vec<u8>>, expected: FatType) {
        let mut vol = Volume::open(disk).unwrap();
        assert_eq!(vol.layout().fat_type, expected);

        let root = vol.list_directory("").unwrap();
        let root_names: Vec<_> = root.iter().filter(|e| !e.is_volume_label()).map(|e| e.name.as_str()).collect();
        assert_eq!(root_names, ["TOP.TXT", "DOCS"]);

        assert_eq!(names(&vol.list_directory("docs").unwrap()), [".", "..", "A.TXT", "INNER"]);
        let inner = vol.list_directory("DOCS/inner").unwrap();
        assert_eq!(names(&inner), [".", "..", "B.BIN"]);
        assert_eq!(inner[2].size, 3);
    }

    #[test]
    fn lists_fatfs_fat12_image() {
        check_listing(populated(fatfs::FatType::Fat12, 1_474_560), FatType::Fat12);
    }

    #[test]
    fn lists_fatfs_fat16_image() {
        check_listing(populated(fatfs::FatType::Fat16, 8 * 1024 * 1024), FatType::Fat16);
    }

    #[test]
    fn lists_fatfs_fat32_image() {
        check_listing(populated(fatfs::FatType::Fat32, 40 * 1024 * 1024), FatType::Fat32);
    }
}
