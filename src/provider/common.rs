use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::Path;

#[cfg(windows)]
use std::fs::OpenOptions;

/// Atomically write content to a file
///
/// Writes to a temporary file in the same directory, syncs to disk, then
/// renames to the target path. Used for report files and plist updates so a
/// crash mid-write never leaves a truncated document behind.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_directory_exists(parent)?;
    }

    let temp_path = path.with_extension("tmp");

    {
        let mut file = File::create(&temp_path).with_context(|| {
            format!("Failed to create temporary file: {}", temp_path.display())
        })?;

        file.write_all(content)
            .context("Failed to write to temporary file")?;

        file.sync_all().context("Failed to sync file to disk")?;
    }

    std::fs::rename(&temp_path, path).with_context(|| {
        format!(
            "Failed to rename {} to {}",
            temp_path.display(),
            path.display()
        )
    })?;

    Ok(())
}

/// Ensure a directory exists, creating it and all parents if needed
pub fn ensure_directory_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    }

    Ok(())
}

/// Set permissions to make a file readable by all users
///
/// Managed preference files must be readable by every login session; reports
/// get the same treatment so external orchestrators can collect them.
pub fn set_permissions_readable_all(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let metadata = std::fs::metadata(path)
            .with_context(|| format!("Failed to get metadata for: {}", path.display()))?;

        let mut permissions = metadata.permissions();

        if path.is_dir() {
            permissions.set_mode(0o755);
        } else {
            permissions.set_mode(0o644);
        }

        std::fs::set_permissions(path, permissions)
            .with_context(|| format!("Failed to set permissions for: {}", path.display()))?;
    }

    #[cfg(windows)]
    {
        // On Windows just ensure it's not read-only; ACL manipulation would
        // require additional dependencies
        let metadata = std::fs::metadata(path)
            .with_context(|| format!("Failed to get metadata for: {}", path.display()))?;

        let mut permissions = metadata.permissions();
        permissions.set_readonly(false);

        std::fs::set_permissions(path, permissions)
            .with_context(|| format!("Failed to set permissions for: {}", path.display()))?;
    }

    Ok(())
}

/// Check if running with administrator/root privileges
///
/// Enforcement does not require this to succeed: missing rights are reported
/// as a warning and every write failure shows up in the run report instead.
pub fn ensure_admin_privileges() -> Result<()> {
    #[cfg(unix)]
    {
        let euid = unsafe { libc::geteuid() };
        if euid != 0 {
            anyhow::bail!(
                "This program must be run as root or with sudo. Current EUID: {}",
                euid
            );
        }
    }

    #[cfg(windows)]
    {
        // Probe write access to a system directory; a proper check would use
        // Windows APIs but this approximation matches what enforcement needs
        let test_path = std::path::PathBuf::from(r"C:\Windows\Temp\host-baseline-test.tmp");
        match OpenOptions::new().write(true).create(true).open(&test_path) {
            Ok(_) => {
                let _ = std::fs::remove_file(&test_path);
            }
            Err(_) => {
                anyhow::bail!(
                    "This program must be run as Administrator. Please restart with elevated privileges."
                );
            }
        }
    }

    Ok(())
}
