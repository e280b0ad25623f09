//! Privilege isolation module
//!
//! Optional chroot into the serving root and switch to an unprivileged
//! account. The account is looked up before the chroot (the password database
//! is usually not reachable from inside it), the chroot happens before the
//! identity switch (an unprivileged process can no longer chroot).

use std::path::{Path, PathBuf};

use crate::error::BootstrapError;
use crate::logger;

/// Resolved account to run as
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub name: String,
    pub uid: u32,
    pub gid: u32,
}

/// OS primitives used for isolation
pub trait PrivilegeIsolation {
    fn lookup_user(&self, name: &str) -> Result<Account, BootstrapError>;

    /// Change the root directory to `dir` and move into it
    fn chroot(&self, dir: &Path) -> Result<(), BootstrapError>;

    fn drop_privileges(&self, account: &Account) -> Result<(), BootstrapError>;
}

/// Apply the requested isolation steps and return the serving root as seen
/// by the process afterwards
pub fn apply(
    isolation: &impl PrivilegeIsolation,
    root: PathBuf,
    chroot: bool,
    user: Option<&str>,
) -> Result<PathBuf, BootstrapError> {
    let account = user.map(|name| isolation.lookup_user(name)).transpose()?;

    let root = if chroot {
        isolation.chroot(&root)?;
        logger::log_info(&format!("Chrooted to {}", root.display()));
        PathBuf::from("/")
    } else {
        root
    };

    if let Some(account) = account {
        isolation.drop_privileges(&account)?;
        logger::log_info(&format!(
            "Running as {} (uid {}, gid {})",
            account.name, account.uid, account.gid
        ));
    }

    Ok(root)
}

#[cfg(unix)]
pub use unix::UnixIsolation as PlatformIsolation;

#[cfg(not(unix))]
pub use unsupported::UnsupportedIsolation as PlatformIsolation;

#[cfg(unix)]
mod unix {
    use nix::unistd::{setgid, setuid, Gid, Uid, User};
    use std::io;
    use std::path::Path;

    use super::{Account, PrivilegeIsolation};
    use crate::error::BootstrapError;

    pub struct UnixIsolation;

    impl PrivilegeIsolation for UnixIsolation {
        fn lookup_user(&self, name: &str) -> Result<Account, BootstrapError> {
            let user = User::from_name(name)
                .map_err(|e| BootstrapError::UserLookup {
                    user: name.to_string(),
                    source: io::Error::from(e),
                })?
                .ok_or_else(|| BootstrapError::UnknownUser(name.to_string()))?;
            Ok(Account {
                name: user.name,
                uid: user.uid.as_raw(),
                gid: user.gid.as_raw(),
            })
        }

        fn chroot(&self, dir: &Path) -> Result<(), BootstrapError> {
            let chroot_error = |source| BootstrapError::Chroot {
                path: dir.to_path_buf(),
                source,
            };
            std::os::unix::fs::chroot(dir).map_err(chroot_error)?;
            std::env::set_current_dir("/").map_err(chroot_error)
        }

        fn drop_privileges(&self, account: &Account) -> Result<(), BootstrapError> {
            let drop_error = |e: nix::Error| BootstrapError::DropPrivileges {
                user: account.name.clone(),
                source: io::Error::from(e),
            };
            // group first: once the uid is gone, setgid is no longer permitted
            setgid(Gid::from_raw(account.gid)).map_err(drop_error)?;
            setuid(Uid::from_raw(account.uid)).map_err(drop_error)
        }
    }
}

#[cfg(not(unix))]
mod unsupported {
    use std::path::Path;

    use super::{Account, PrivilegeIsolation};
    use crate::error::BootstrapError;

    pub struct UnsupportedIsolation;

    impl PrivilegeIsolation for UnsupportedIsolation {
        fn lookup_user(&self, _name: &str) -> Result<Account, BootstrapError> {
            Err(BootstrapError::IsolationUnsupported)
        }

        fn chroot(&self, _dir: &Path) -> Result<(), BootstrapError> {
            Err(BootstrapError::IsolationUnsupported)
        }

        fn drop_privileges(&self, _account: &Account) -> Result<(), BootstrapError> {
            Err(BootstrapError::IsolationUnsupported)
        }
    }
}
