use log::debug;

use crate::boot_sector::VolumeGeometry;
use crate::error::{Error, Result};
use crate::layout::VolumeLayout;
use crate::storage::Storage;

/// An opened FAT volume.
///
/// Geometry and layout are computed once in [`Volume::open`] and never change.
/// Operations are split by concern across the crate:
/// table access (`fat_table`), chains (`chain`), directories (`directory`),
/// file contents and attribute patches (`file`), and `diagnostics`.
///
/// Every method takes `&mut self` because each one seeks the shared storage
/// handle; sharing a volume across threads needs an outer lock.
pub struct Volume<S> {
    pub(crate) storage: S,
    geometry: VolumeGeometry,
    layout: VolumeLayout,
}

impl<S: Storage> Volume<S> {
    /// Parse the boot sector and classify the volume.
    pub fn open(mut storage: S) -> Result<Self> {
        let geometry = VolumeGeometry::read(&mut storage)?;
        let layout = VolumeLayout::classify(&geometry)?;
        debug!("opened {} volume \"{}\"", layout.fat_type.name(), geometry.oem);
        Ok(Self { storage, geometry, layout })
    }

    pub fn geometry(&self) -> &VolumeGeometry {
        &self.geometry
    }

    pub fn layout(&self) -> &VolumeLayout {
        &self.layout
    }

    /// Give the storage handle back.
    pub fn into_inner(self) -> S {
        self.storage
    }

    /// Raw payload of one data cluster (`sectors_per_cluster * bytes_per_sector` bytes).
    /// Clusters 0 and 1 have no payload and read as empty.
    pub fn read_cluster(&mut self, cluster: u32) -> Result<Vec<u8>> {
        let Some(offset) = self.layout.cluster_offset(cluster) else {
            return Ok(Vec::new());
        };
        let mut buf = vec![0u8; self.layout.cluster_size as usize];
        self.storage.read_at(offset, &mut buf)?;
        Ok(buf)
    }

    /// Extension point: allocate clusters via `next_free_cluster`, write a new
    /// record into the parent directory, grow the parent chain when it is full.
    pub fn create_file(&mut self, path: &str, _data: &[u8]) -> Result<()> {
        debug!("create_file({path}) refused");
        Err(Error::Unsupported("file creation"))
    }

    /// Extension point: mark the record's first name byte 0xE5 and zero every
    /// table entry of its chain so `next_free_cluster` can hand them out again.
    pub fn delete_file(&mut self, path: &str) -> Result<()> {
        debug!("delete_file({path}) refused");
        Err(Error::Unsupported("file deletion"))
    }
}
