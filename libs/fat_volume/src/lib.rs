//! Read-mostly FAT12/FAT16/FAT32 driver for raw disk images.
//!
//! Short filename (8.3) only. All I/O goes through [`Storage`], so any
//! `Read + Write + Seek` value (an image file, an in-memory cursor) can back
//! a [`Volume`].

pub mod boot_sector;
pub mod chain;
pub mod diagnostics;
pub mod dir_entry;
pub mod directory;
pub mod error;
pub mod fat_table;
pub mod file;
pub mod layout;
pub mod storage;
pub mod volume;

#[cfg(test)]
mod test_image;

pub use boot_sector::VolumeGeometry;
pub use chain::ClusterChain;
pub use diagnostics::TreeEntry;
pub use dir_entry::{Attributes, DirectoryEntry, FatDate, FatDateTime};
pub use error::{Error, Result};
pub use layout::{FatType, VolumeLayout};
pub use storage::Storage;
pub use volume::Volume;
