// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Filesystem statistics in the shape of `struct statvfs`.

use tracing::{debug, trace};

use crate::host::{HostError, Provider, VolumeProvider as _};
use crate::winposix::{RawFd, WinPosix};

/// Filesystem statistics. Fields the host cannot report carry the
/// conventional "unknown" sentinels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatVfs {
    /// Preferred block size, the cluster size on this host.
    pub f_bsize: u64,
    /// Fundamental block size, equal to `f_bsize` here.
    pub f_frsize: u64,
    pub f_blocks: u64,
    pub f_bfree: u64,
    /// Free blocks for unprivileged callers; the host draws no distinction.
    pub f_bavail: u64,
    /// Inode counts are meaningless on this host and report -1.
    pub f_files: i64,
    pub f_ffree: i64,
    pub f_favail: i64,
    pub f_fsid: u64,
    pub f_flag: u64,
    pub f_namemax: u64,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum StatVfsError {
    #[error("host volume query failed: {0}")]
    QueryFailed(HostError),
    /// Descriptor-based statistics have no host equivalent, as for `ENOSYS`.
    #[error("descriptor-based filesystem statistics are not available on this host")]
    NotImplemented,
}

impl<Host: Provider, Children, Descriptors> WinPosix<Host, Children, Descriptors> {
    /// Reports statistics for the volume holding `path`.
    pub fn statvfs(&self, path: &str) -> Result<StatVfs, StatVfsError> {
        let geometry = self.host.disk_free_space(path).map_err(|code| {
            debug!(path, %code, "volume query failed");
            StatVfsError::QueryFailed(code)
        })?;
        trace!(
            path,
            sectors_per_cluster = geometry.sectors_per_cluster,
            bytes_per_sector = geometry.bytes_per_sector,
            free_clusters = geometry.free_clusters,
            total_clusters = geometry.total_clusters,
            "volume geometry"
        );
        let cluster_bytes =
            u64::from(geometry.sectors_per_cluster) * u64::from(geometry.bytes_per_sector);
        Ok(StatVfs {
            f_bsize: cluster_bytes,
            f_frsize: cluster_bytes,
            f_blocks: u64::from(geometry.total_clusters),
            f_bfree: u64::from(geometry.free_clusters),
            f_bavail: u64::from(geometry.free_clusters),
            f_files: -1,
            f_ffree: -1,
            f_favail: -1,
            f_fsid: 0,
            f_flag: 0,
            f_namemax: Host::MAX_PATH - 1,
        })
    }

    /// Descriptor-based statistics always fail; callers should fall back to
    /// [`Self::statvfs`] with a path.
    pub fn fstatvfs(&self, _fd: RawFd) -> Result<StatVfs, StatVfsError> {
        Err(StatVfsError::NotImplemented)
    }
}
