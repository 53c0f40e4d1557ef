/*
 * SPDX-FileCopyrightText: Copyright (c) 2021-2024 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
 * SPDX-License-Identifier: LicenseRef-NvidiaProprietary
 *
 * NVIDIA CORPORATION, its affiliates and licensors retain all intellectual
 * property and proprietary rights in and to this material, related
 * documentation and any modifications thereto. Any use, reproduction,
 * disclosure or distribution of this material and related documentation
 * without an express license agreement from NVIDIA CORPORATION or
 * its affiliates is strictly prohibited.
 */

//! A scoped scratch directory for one request's uploaded parts. The
//! policy verifier reads its files by field name; the directory and
//! everything under it is removed when this value drops, on every exit
//! path including an early return or a panic unwind.

use std::io;
use std::path::Path;

pub struct RequestWorkspace {
    dir: tempfile::TempDir,
}

impl RequestWorkspace {
    pub fn new() -> io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("attest-").tempdir()?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(dir.path(), std::fs::Permissions::from_mode(0o755))?;
        }
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Writes `data` under this workspace as `field`, world-readable so
    /// a priv-separated policy verifier can open it under its own uid.
    pub fn write_field(&self, field: &str, data: &[u8]) -> io::Result<()> {
        let path = self.dir.path().join(field);
        std::fs::write(&path, data)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_field_is_readable_back() {
        let workspace = RequestWorkspace::new().unwrap();
        workspace.write_field("quote", b"hello").unwrap();
        let read_back = std::fs::read(workspace.path().join("quote")).unwrap();
        assert_eq!(read_back, b"hello");
    }

    #[test]
    fn workspace_directory_is_removed_on_drop() {
        let path = {
            let workspace = RequestWorkspace::new().unwrap();
            workspace.path().to_path_buf()
        };
        assert!(!path.exists());
    }
}
