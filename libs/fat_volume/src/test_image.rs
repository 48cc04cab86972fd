//! In-memory images for the unit tests.
//!
//! `TestImage` hand-assembles small FAT12/FAT16 volumes so tests can place
//! exact chains and records. `formatted` produces real volumes with the
//! `fatfs` crate for cross-checking against an independent implementation.

use std::io::Cursor;

use crate::dir_entry::{Attributes, DIR_ENTRY_SIZE, DirectoryEntry};
use crate::layout::FatType;

const SECTOR: usize = 512;
const RESERVED: usize = 1;
const NUM_FATS: usize = 2;
const ROOT_ENTRIES: usize = 16;

pub struct TestImage {
    data: Vec<u8>,
    fat_type: FatType,
    sectors_per_cluster: usize,
    sectors_per_fat: usize,
    clusters: usize,
}

impl TestImage {
    /// 124 one-sector clusters.
    pub fn fat12() -> Self {
        Self::build(FatType::Fat12, 1, 1, 124)
    }

    /// FAT12 with multi-sector clusters.
    pub fn fat12_with_cluster_sectors(sectors_per_cluster: usize) -> Self {
        Self::build(FatType::Fat12, sectors_per_cluster, 1, 124)
    }

    /// 4200 one-sector clusters, just past the FAT12 limit.
    pub fn fat16() -> Self {
        Self::build(FatType::Fat16, 1, 17, 4200)
    }

    fn build(fat_type: FatType, sectors_per_cluster: usize, sectors_per_fat: usize, clusters: usize) -> Self {
        let root_sectors = ROOT_ENTRIES * DIR_ENTRY_SIZE / SECTOR;
        let total = RESERVED + NUM_FATS * sectors_per_fat + root_sectors + clusters * sectors_per_cluster;
        let mut data = vec![0u8; total * SECTOR];

        data[0..3].copy_from_slice(&[0xEB, 0x3C, 0x90]);
        data[3..11].copy_from_slice(b"TESTIMG ");
        data[11..13].copy_from_slice(&(SECTOR as u16).to_le_bytes());
        data[13] = sectors_per_cluster as u8;
        data[14..16].copy_from_slice(&(RESERVED as u16).to_le_bytes());
        data[16] = NUM_FATS as u8;
        data[17..19].copy_from_slice(&(ROOT_ENTRIES as u16).to_le_bytes());
        data[19..21].copy_from_slice(&(total as u16).to_le_bytes());
        data[21] = 0xF8;
        data[22..24].copy_from_slice(&(sectors_per_fat as u16).to_le_bytes());
        data[510] = 0x55;
        data[511] = 0xAA;

        let mut img = Self { data, fat_type, sectors_per_cluster, sectors_per_fat, clusters };
        img.set_fat(0, 0x0FFF_FFF8);
        img.set_fat(1, 0x0FFF_FFFF);
        img
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_cursor(self) -> Cursor<Vec<u8>> {
        Cursor::new(self.data)
    }

    pub fn last_cluster(&self) -> u32 {
        self.clusters as u32 + 1
    }

    pub fn cluster_size(&self) -> usize {
        self.sectors_per_cluster * SECTOR
    }

    /// Entry value marking the end of a chain.
    pub fn end_of_chain(&self) -> u32 {
        self.fat_type.eof() | 0x7
    }

    /// Write `value` into every FAT copy.
    pub fn set_fat(&mut self, cluster: u32, value: u32) {
        let fat_len = self.sectors_per_fat * SECTOR;
        for copy in 0..NUM_FATS {
            let start = (RESERVED * SECTOR) + copy * fat_len;
            self.fat_type.encode_entry(&mut self.data[start..start + fat_len], cluster, value);
        }
    }

    /// Link `clusters` in order and terminate the chain.
    pub fn link(&mut self, clusters: &[u32]) {
        for pair in clusters.windows(2) {
            self.set_fat(pair[0], pair[1]);
        }
        if let Some(&last) = clusters.last() {
            self.set_fat(last, self.end_of_chain());
        }
    }

    pub fn root_offset(&self) -> usize {
        (RESERVED + NUM_FATS * self.sectors_per_fat) * SECTOR
    }

    pub fn data_offset(&self) -> usize {
        self.root_offset() + ROOT_ENTRIES * DIR_ENTRY_SIZE
    }

    pub fn cluster_offset(&self, cluster: u32) -> usize {
        self.data_offset() + (cluster as usize - 2) * self.cluster_size()
    }

    pub fn write_cluster(&mut self, cluster: u32, payload: &[u8]) {
        assert!(payload.len() <= self.cluster_size());
        let off = self.cluster_offset(cluster);
        self.data[off..off + payload.len()].copy_from_slice(payload);
    }

    /// Spread `payload` over `clusters` and link them.
    pub fn write_chain(&mut self, clusters: &[u32], payload: &[u8]) {
        let size = self.cluster_size();
        for (i, &cluster) in clusters.iter().enumerate() {
            let start = (i * size).min(payload.len());
            let end = ((i + 1) * size).min(payload.len());
            self.write_cluster(cluster, &payload[start..end]);
        }
        self.link(clusters);
    }

    pub fn put_root_record(&mut self, index: usize, record: [u8; DIR_ENTRY_SIZE]) {
        assert!(index < ROOT_ENTRIES);
        let off = self.root_offset() + index * DIR_ENTRY_SIZE;
        self.data[off..off + DIR_ENTRY_SIZE].copy_from_slice(&record);
    }

    /// Store a record in slot `index` of a directory whose chain is `chain`.
    pub fn put_dir_record(&mut self, chain: &[u32], index: usize, record: [u8; DIR_ENTRY_SIZE]) {
        let per_cluster = self.cluster_size() / DIR_ENTRY_SIZE;
        let cluster = chain[index / per_cluster];
        let off = self.cluster_offset(cluster) + (index % per_cluster) * DIR_ENTRY_SIZE;
        self.data[off..off + DIR_ENTRY_SIZE].copy_from_slice(&record);
    }

    pub fn file(name: &str, cluster: u32, size: u32) -> [u8; DIR_ENTRY_SIZE] {
        DirectoryEntry::new(name, Attributes::ARCHIVE, cluster, size).to_bytes()
    }

    pub fn dir(name: &str, cluster: u32) -> [u8; DIR_ENTRY_SIZE] {
        DirectoryEntry::new(name, Attributes::DIRECTORY, cluster, 0).to_bytes()
    }

    /// `.` and `..` records for a directory at `cluster` whose parent is at `parent`.
    pub fn dot_entries(cluster: u32, parent: u32) -> [[u8; DIR_ENTRY_SIZE]; 2] {
        [Self::dir(".", cluster), Self::dir("..", parent)]
    }
}

/// Blank image of `size` bytes formatted by `fatfs` with the requested subtype.
pub fn formatted(fat_type: fatfs::FatType, size: usize) -> Cursor<Vec<u8>> {
    let mut cursor = Cursor::new(vec![0u8; size]);
    fatfs::format_volume(&mut cursor, fatfs::FormatVolumeOptions::new().fat_type(fat_type))
        .expect("format_volume failed");
    cursor
}
