//! BIOS Parameter Block decoding.

use byteorder::{ByteOrder, LittleEndian};
use log::debug;

use crate::error::{Error, Result};
use crate::storage::Storage;

/// Bytes of the classic BPB that every FAT variant shares.
pub const BPB_LEN: usize = 36;
/// FAT32 extension read when the 16-bit sectors-per-FAT field is zero.
const FAT32_EXT_LEN: usize = 12;

/// Volume geometry as recorded in the boot sector. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeGeometry {
    pub oem: String,
    pub bytes_per_sector: u16,
    pub sectors_per_cluster: u8,
    pub reserved_sectors: u16,
    pub num_fats: u8,
    pub root_entries: u16,
    /// 16-bit count, or the 32-bit count when the 16-bit field is zero.
    pub total_sectors: u32,
    pub media_descriptor: u8,
    /// 16-bit count, or the FAT32 extension's 32-bit count when the 16-bit field is zero.
    pub sectors_per_fat: u32,
    pub sectors_per_track: u16,
    pub num_heads: u16,
    pub hidden_sectors: u32,
    /// First cluster of the root directory; only present on FAT32 layouts.
    pub root_cluster: Option<u32>,
}

impl VolumeGeometry {
    /// Decode the shared 36-byte BPB.
    ///
    /// The jump instruction (bytes 0..3) is skipped. FAT32 fields are left
    /// unset; [`VolumeGeometry::read`] fills them in.
    pub fn parse(bpb: &[u8; BPB_LEN]) -> Result<Self> {
        let oem = bpb[3..11]
            .iter()
            .map(|&b| char::from(b))
            .collect::<String>()
            .trim_matches(' ')
            .to_string();

        let bytes_per_sector = LittleEndian::read_u16(&bpb[11..13]);
        let sectors_per_cluster = bpb[13];
        if bytes_per_sector == 0 {
            return Err(Error::Format("bytes per sector is 0".into()));
        }
        if sectors_per_cluster == 0 {
            return Err(Error::Format("sectors per cluster is 0".into()));
        }

        let total_sectors_16 = LittleEndian::read_u16(&bpb[19..21]);
        let total_sectors_32 = LittleEndian::read_u32(&bpb[32..36]);

        Ok(Self {
            oem,
            bytes_per_sector,
            sectors_per_cluster,
            reserved_sectors: LittleEndian::read_u16(&bpb[14..16]),
            num_fats: bpb[16],
            root_entries: LittleEndian::read_u16(&bpb[17..19]),
            total_sectors: if total_sectors_16 != 0 { total_sectors_16 as u32 } else { total_sectors_32 },
            media_descriptor: bpb[21],
            sectors_per_fat: LittleEndian::read_u16(&bpb[22..24]) as u32,
            sectors_per_track: LittleEndian::read_u16(&bpb[24..26]),
            num_heads: LittleEndian::read_u16(&bpb[26..28]),
            hidden_sectors: LittleEndian::read_u32(&bpb[28..32]),
            root_cluster: None,
        })
    }

    /// Fill in the FAT32 fields from bytes 36..48 of the boot sector.
    fn apply_fat32_extension(&mut self, ext: &[u8; FAT32_EXT_LEN]) {
        // ext_flags (u16) and fs_version (u16) sit between the two fields we need.
        self.sectors_per_fat = LittleEndian::read_u32(&ext[0..4]);
        self.root_cluster = Some(LittleEndian::read_u32(&ext[8..12]));
    }

    /// Read and decode the boot sector from the start of `storage`.
    pub fn read<S: Storage>(storage: &mut S) -> Result<Self> {
        let mut bpb = [0u8; BPB_LEN];
        storage.read_at(0, &mut bpb)?;
        let mut geometry = Self::parse(&bpb)?;

        if geometry.sectors_per_fat == 0 {
            let mut ext = [0u8; FAT32_EXT_LEN];
            storage.read_at(BPB_LEN as u64, &mut ext)?;
            geometry.apply_fat32_extension(&ext);
        }

        debug!(
            "boot sector: oem={:?} bps={} spc={} reserved={} fats={} root_entries={} total={} spf={}",
            geometry.oem,
            geometry.bytes_per_sector,
            geometry.sectors_per_cluster,
            geometry.reserved_sectors,
            geometry.num_fats,
            geometry.root_entries,
            geometry.total_sectors,
            geometry.sectors_per_fat,
        );
        Ok(geometry)
    }

    pub fn cluster_size(&self) -> u64 {
        self.bytes_per_sector as u64 * self.sectors_per_cluster as u64
    }
}
