//! Volume classification and region offsets.

use log::debug;

use crate::boot_sector::VolumeGeometry;
use crate::dir_entry::DIR_ENTRY_SIZE;
use crate::error::{Error, Result};

const FAT12_MAX_CLUSTERS: u32 = 4085;
const FAT16_MAX_CLUSTERS: u32 = 65525;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatType {
    Fat12,
    Fat16,
    Fat32,
}

impl FatType {
    pub fn from_cluster_count(clusters: u32) -> Self {
        if clusters < FAT12_MAX_CLUSTERS {
            FatType::Fat12
        } else if clusters < FAT16_MAX_CLUSTERS {
            FatType::Fat16
        } else {
            FatType::Fat32
        }
    }

    /// Table values at or above this end a cluster chain.
    pub const fn eof(self) -> u32 {
        match self {
            FatType::Fat12 => 0x0000_0FF8,
            FatType::Fat16 => 0x0000_FFF8,
            FatType::Fat32 => 0x0FFF_FFF8,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            FatType::Fat12 => "FAT12",
            FatType::Fat16 => "FAT16",
            FatType::Fat32 => "FAT32",
        }
    }
}

/// Where the root directory lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootLocation {
    /// Fixed region right after the FATs (FAT12/FAT16).
    Region { offset: u64, entries: u16 },
    /// Ordinary cluster chain (FAT32).
    Cluster(u32),
}

/// Byte offsets and subtype derived once from the geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeLayout {
    pub fat_start: u64,
    pub root_dir_start: u64,
    pub data_start: u64,
    pub cluster_count: u32,
    pub fat_type: FatType,
    pub eof: u32,
    pub root: RootLocation,
    pub sector_size: u64,
    pub cluster_size: u64,
}

impl VolumeLayout {
    pub fn classify(g: &VolumeGeometry) -> Result<Self> {
        // u64 throughout: a corrupt FAT32 sectors-per-FAT can overflow u32 here.
        let sector_size = g.bytes_per_sector as u64;
        let root_dir_sectors = (g.root_entries as u64 * DIR_ENTRY_SIZE as u64).div_ceil(sector_size);
        let fat_sectors = g.num_fats as u64 * g.sectors_per_fat as u64;
        let meta_sectors = g.reserved_sectors as u64 + fat_sectors + root_dir_sectors;

        let data_sectors = (g.total_sectors as u64).checked_sub(meta_sectors).ok_or_else(|| {
            Error::Format(format!(
                "{meta_sectors} metadata sectors exceed the {} sectors of the volume",
                g.total_sectors
            ))
        })?;
        // data_sectors <= total_sectors, so this fits.
        let cluster_count = (data_sectors / g.sectors_per_cluster as u64) as u32;
        let fat_type = FatType::from_cluster_count(cluster_count);

        let fat_start = g.reserved_sectors as u64 * sector_size;
        let root_dir_start = fat_start + fat_sectors * sector_size;
        let data_start = root_dir_start + root_dir_sectors * sector_size;

        let root = match (fat_type, g.root_cluster) {
            (FatType::Fat32, Some(cluster)) => RootLocation::Cluster(cluster),
            _ => RootLocation::Region { offset: root_dir_start, entries: g.root_entries },
        };

        let layout = Self {
            fat_start,
            root_dir_start,
            data_start,
            cluster_count,
            fat_type,
            eof: fat_type.eof(),
            root,
            sector_size,
            cluster_size: g.cluster_size(),
        };
        debug!(
            "{}: {} clusters, fat at {:#x}, root at {:#x}, data at {:#x}",
            fat_type.name(),
            cluster_count,
            fat_start,
            root_dir_start,
            data_start
        );
        Ok(layout)
    }

    /// Byte offset of a data cluster. Clusters 0 and 1 have no data region.
    pub fn cluster_offset(&self, cluster: u32) -> Option<u64> {
        let index = cluster.checked_sub(2)?;
        Some(self.data_start + index as u64 * self.cluster_size)
    }

    /// Absolute sector range `[first, first + sectors_per_cluster)` of a data cluster.
    pub fn cluster_sectors(&self, cluster: u32) -> Option<core::ops::Range<u64>> {
        let first = self.cluster_offset(cluster)? / self.sector_size;
        Some(first..first + self.cluster_size / self.sector_size)
    }
}
