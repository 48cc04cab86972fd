//! Cluster chains: the ordered clusters holding one file or directory.

use log::{trace, warn};

use crate::error::{Error, Result};
use crate::storage::Storage;
use crate::volume::Volume;

/// Clusters in on-disk order. The terminating EOF value is not included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterChain(Vec<u32>);

impl ClusterChain {
    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> core::slice::Iter<'_, u32> {
        self.0.iter()
    }

    /// True when some cluster is not directly followed by its successor index.
    pub fn is_fragmented(&self) -> bool {
        self.0.windows(2).any(|pair| pair[0].checked_add(1) != Some(pair[1]))
    }
}

impl From<Vec<u32>> for ClusterChain {
    fn from(clusters: Vec<u32>) -> Self {
        Self(clusters)
    }
}

impl<'a> IntoIterator for &'a ClusterChain {
    type Item = &'a u32;
    type IntoIter = core::slice::Iter<'a, u32>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<S: Storage> Volume<S> {
    /// Follow the table from `start` until an entry at or above the EOF value.
    ///
    /// A start cluster of 0 is returned as `[0]` without touching the table.
    /// A chain longer than the volume's cluster count means the table loops
    /// and is reported as a format error.
    pub fn chain_from(&mut self, start: u32) -> Result<ClusterChain> {
        if start == 0 {
            return Ok(ClusterChain(vec![0]));
        }

        let eof = self.layout().eof;
        let limit = self.layout().cluster_count as usize + 2;
        let mut chain = vec![start];
        let mut cluster = start;
        loop {
            let next = self.entry_for(cluster)?;
            if next >= eof {
                break;
            }
            if chain.len() >= limit {
                warn!("cluster chain from {start} does not terminate");
                return Err(Error::Format(format!("cluster chain from {start} loops")));
            }
            chain.push(next);
            cluster = next;
        }
        trace!("chain from {start}: {chain:?}");
        Ok(ClusterChain(chain))
    }
}
