//! Irreversible privilege drop.
//!
//! The gate starts with the supervisor's ambient (typically root)
//! credentials because it must eventually launch the protected service.
//! Any code path that touches the reputation store first reduces itself to
//! a fixed unprivileged identity; the reduction is verified before the
//! store is opened.

use nix::unistd::{setgid, setuid, Gid, Uid};
use thiserror::Error;

/// Errors from the privilege transition.
#[derive(Debug, Error)]
pub enum PrivilegeError {
    #[error("setgid({gid}) failed: {source}")]
    SetGid {
        gid: u32,
        #[source]
        source: nix::Error,
    },

    #[error("setuid({uid}) failed: {source}")]
    SetUid {
        uid: u32,
        #[source]
        source: nix::Error,
    },

    /// The drop appeared to succeed but elevated identity could still be
    /// re-acquired. This means the host environment is misconfigured and
    /// the operation must not proceed.
    #[error("privileges still elevated after drop to uid {uid}")]
    StillPrivileged { uid: u32 },
}

/// Proof that the calling process has irreversibly reduced its identity.
///
/// No public constructor and not `Clone`: the only way to obtain one is a
/// verified [`drop_privileges`] call in the current process image.
#[derive(Debug)]
pub struct DroppedPrivileges(());

/// Permanently reduce the process to `uid`/`gid`.
///
/// Group identity is dropped first: once the user identity is gone, the
/// process loses the right to change groups. After the drop, a nonzero
/// target uid must not be able to take uid 0 back; if it can, the drop did
/// not actually happen and the caller must treat the store as unreachable.
pub fn drop_privileges(uid: u32, gid: u32) -> Result<DroppedPrivileges, PrivilegeError> {
    setgid(Gid::from_raw(gid)).map_err(|source| PrivilegeError::SetGid { gid, source })?;
    setuid(Uid::from_raw(uid)).map_err(|source| PrivilegeError::SetUid { uid, source })?;

    if uid != 0 && setuid(Uid::from_raw(0)).is_ok() {
        return Err(PrivilegeError::StillPrivileged { uid });
    }

    Ok(DroppedPrivileges(()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::unistd::{getgid, getuid};

    // Dropping to the identity we already hold is a no-op that always
    // passes the verification, whether or not the suite runs as root.
    #[test]
    fn test_drop_to_current_identity_succeeds() {
        let token =
            drop_privileges(getuid().as_raw(), getgid().as_raw()).expect("drop to own identity");
        let _proof: DroppedPrivileges = token;
    }

    #[test]
    fn test_drop_to_foreign_gid_fails_without_root() {
        if getuid().is_root() {
            return;
        }
        let foreign_gid = getgid().as_raw().wrapping_add(1);
        let err = drop_privileges(getuid().as_raw(), foreign_gid).expect_err("should fail");
        assert!(matches!(err, PrivilegeError::SetGid { .. }));
    }

    #[test]
    fn test_drop_to_root_uid_fails_without_root() {
        if getuid().is_root() {
            return;
        }
        let err = drop_privileges(0, getgid().as_raw()).expect_err("should fail");
        assert!(matches!(err, PrivilegeError::SetUid { .. }));
    }

    #[test]
    fn test_error_messages_name_the_identity() {
        let err = PrivilegeError::StillPrivileged { uid: 65534 };
        assert_eq!(
            err.to_string(),
            "privileges still elevated after drop to uid 65534"
        );
    }
}
