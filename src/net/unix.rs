//! Unix domain socket binding, permissions, and cleanup.

use std::fs;
use std::io;
use std::os::unix::fs::{FileTypeExt, PermissionsExt};
use std::path::Path;

use tokio::net::UnixListener;

use crate::config::validation::parse_mode;

/// Bind `path`, removing a stale socket file left by a previous run.
///
/// A non-socket file at `path`, or a socket another process still accepts
/// on, is left alone and the bind fails.
pub fn bind(path: &Path) -> io::Result<UnixListener> {
    if let Ok(metadata) = fs::symlink_metadata(path) {
        if metadata.file_type().is_socket() {
            match std::os::unix::net::UnixStream::connect(path) {
                Ok(_stream) => {
                    return Err(io::Error::new(
                        io::ErrorKind::AddrInUse,
                        format!("socket {} is in use", path.display()),
                    ));
                }
                Err(_) => {
                    tracing::debug!(path = %path.display(), "Removing stale socket file");
                    fs::remove_file(path)?;
                }
            }
        }
    }
    UnixListener::bind(path)
}

/// Apply an octal permission string such as `"0777"` to the socket file.
///
/// Failures are logged; the listener keeps serving.
pub fn apply_permissions(path: &Path, mode: &str) {
    let Some(bits) = parse_mode(mode) else {
        tracing::error!(path = %path.display(), mode, "Failed to parse socket file permission");
        return;
    };
    if let Err(error) = fs::set_permissions(path, fs::Permissions::from_mode(bits)) {
        tracing::error!(path = %path.display(), mode, error = %error, "Failed to chmod socket file");
    }
}

/// Remove the socket file after the listener stops.
pub fn cleanup(path: &Path) {
    match fs::symlink_metadata(path) {
        Ok(metadata) if metadata.file_type().is_socket() => {
            if let Err(error) = fs::remove_file(path) {
                tracing::warn!(path = %path.display(), error = %error, "Failed to remove socket file");
            }
        }
        _ => {}
    }
}
