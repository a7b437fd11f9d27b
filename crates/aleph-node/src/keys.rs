//! Node key material.

use std::fs;
use std::path::Path;

use aleph_crypto::SigningKey;
use tracing::info;

use crate::error::{NodeError, NodeResult};

/// Load the node key from `path`, creating it on first use.
///
/// With no path the node gets a fresh key and therefore a fresh peer id.
pub fn load_or_generate(path: Option<&Path>) -> NodeResult<SigningKey> {
    let Some(path) = path else {
        return Ok(SigningKey::generate());
    };

    if path.exists() {
        let text = fs::read_to_string(path)?;
        let key = SigningKey::from_hex(&text)
            .map_err(|e| NodeError::Config(format!("{}: {e}", path.display())))?;
        return Ok(key);
    }

    let key = SigningKey::generate();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, format!("{}\n", key.to_hex()))?;
    restrict_permissions(path)?;
    info!(path = %path.display(), peer_id = %key.peer_id(), "generated node key");
    Ok(key)
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_file_is_stable_across_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys/node.key");
        let first = load_or_generate(Some(&path)).unwrap();
        let second = load_or_generate(Some(&path)).unwrap();
        assert_eq!(first.peer_id(), second.peer_id());
    }

    #[test]
    fn no_path_means_fresh_identity() {
        let a = load_or_generate(None).unwrap();
        let b = load_or_generate(None).unwrap();
        assert_ne!(a.peer_id(), b.peer_id());
    }

    #[test]
    fn garbage_key_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node.key");
        fs::write(&path, "not hex").unwrap();
        let err = load_or_generate(Some(&path)).unwrap_err();
        assert!(matches!(err, NodeError::Config(_)));
    }
}
