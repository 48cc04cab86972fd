//! Single-entry access to the File Allocation Table.
//!
//! The three encodings live here and nowhere else; everything above this
//! module sees a plain `u32` per cluster plus the subtype's EOF threshold.

use byteorder::{ByteOrder, LittleEndian};
use log::trace;

use crate::error::Result;
use crate::layout::FatType;
use crate::storage::Storage;
use crate::volume::Volume;

impl FatType {
    /// Offset of a cluster's entry from the start of the table.
    pub fn entry_offset(self, cluster: u32) -> u64 {
        let cluster = cluster as u64;
        match self {
            FatType::Fat12 => cluster + cluster / 2,
            FatType::Fat16 => cluster * 2,
            FatType::Fat32 => cluster * 4,
        }
    }

    /// Bytes read per entry. FAT12 entries straddle a 2-byte window.
    pub fn entry_width(self) -> usize {
        match self {
            FatType::Fat12 | FatType::Fat16 => 2,
            FatType::Fat32 => 4,
        }
    }

    /// Decode the entry of `cluster` from the bytes at [`FatType::entry_offset`].
    ///
    /// FAT32 values keep their top four reserved bits.
    pub fn decode_entry(self, cluster: u32, raw: &[u8]) -> u32 {
        match self {
            FatType::Fat12 => {
                let pair = LittleEndian::read_u16(raw) as u32;
                if cluster & 1 == 1 { pair >> 4 } else { pair & 0x0FFF }
            }
            FatType::Fat16 => LittleEndian::read_u16(raw) as u32,
            FatType::Fat32 => LittleEndian::read_u32(raw),
        }
    }

    /// Inverse of [`FatType::decode_entry`] over an in-memory table; used to build test images.
    #[cfg(test)]
    pub(crate) fn encode_entry(self, table: &mut [u8], cluster: u32, value: u32) {
        let off = self.entry_offset(cluster) as usize;
        match self {
            FatType::Fat12 => {
                let pair = LittleEndian::read_u16(&table[off..off + 2]);
                let value = (value & 0x0FFF) as u16;
                let pair = if cluster & 1 == 1 {
                    (pair & 0x000F) | (value << 4)
                } else {
                    (pair & 0xF000) | value
                };
                LittleEndian::write_u16(&mut table[off..off + 2], pair);
            }
            FatType::Fat16 => LittleEndian::write_u16(&mut table[off..off + 2], value as u16),
            FatType::Fat32 => LittleEndian::write_u32(&mut table[off..off + 4], value),
        }
    }
}

impl<S: Storage> Volume<S> {
    /// Table entry of `cluster` in the first FAT.
    pub fn entry_for(&mut self, cluster: u32) -> Result<u32> {
        let layout = *self.layout();
        let fat_type = layout.fat_type;
        let mut raw = [0u8; 4];
        let raw = &mut raw[..fat_type.entry_width()];
        self.storage.read_at(layout.fat_start + fat_type.entry_offset(cluster), raw)?;
        let value = fat_type.decode_entry(cluster, raw);
        trace!("fat[{cluster}] = {value:#x}");
        Ok(value)
    }

    /// First cluster at or after `start` whose entry is 0 (free).
    ///
    /// Scans every remaining addressable cluster, one table read each.
    /// Returns the volume's EOF value when nothing is free.
    pub fn next_free_cluster(&mut self, start: u32) -> Result<u32> {
        let end = self.layout().cluster_count.saturating_add(2);
        for cluster in start.max(2)..end {
            if self.entry_for(cluster)? == 0 {
                return Ok(cluster);
            }
        }
        Ok(self.layout().eof)
    }
}
