//! Operating-system specific services.
//!
//! Everything that differs between Windows, POSIX systems and anything else
//! lives behind the [`Platform`] trait: where the configuration goes, how the
//! backup is hidden, how files are made read-only, how the configuration is
//! opened in an editor and how administrator privileges are obtained.
//! [`current`] picks the implementation for the running target.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

/// Directory name used under the per-user configuration directory.
pub const APP_DIR_NAME: &str = "Orderly";

/// Errors raised by platform services.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// Administrator/root privileges could not be acquired.
    #[error("Unable to elevate privileges: {0}")]
    ElevationFailed(String),
    /// The editor could not be launched or exited with a failure.
    #[error("Error while trying to open {}: {reason}", path.display())]
    EditorFailed { path: PathBuf, reason: String },
    /// The operation has no implementation on this platform.
    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),
    /// Filesystem error while adjusting attributes or permissions.
    #[error("Failed to update {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for platform operations.
pub type PlatformResult<T> = Result<T, PlatformError>;

/// Platform capabilities used by the rest of the crate.
pub trait Platform {
    /// Short human-readable platform name.
    fn name(&self) -> &'static str;

    /// Default directory that holds the configuration documents.
    fn config_dir(&self) -> PathBuf;

    /// File name of the backup document, or `None` when no backup is kept.
    fn backup_file_name(&self) -> Option<&'static str>;

    /// Hides `path` from regular directory listings.
    fn hide_file(&self, path: &Path) -> PlatformResult<()>;

    /// Restricts `path` to owner read-only.
    fn set_read_only(&self, path: &Path) -> PlatformResult<()> {
        set_readonly_flag(path, true)
    }

    /// Gives the owner write access to `path` again.
    fn set_writable(&self, path: &Path) -> PlatformResult<()> {
        set_readonly_flag(path, false)
    }

    /// Opens `path` for editing and waits for the editor to finish.
    fn open_in_editor(&self, path: &Path, editor: &str) -> PlatformResult<()>;

    /// Whether the process already runs with administrator/root privileges.
    fn is_elevated(&self) -> bool;

    /// Relaunches the process with elevated privileges, pinning the
    /// configuration directory to `config_dir` in the new process.
    ///
    /// `Ok(())` means an elevated copy was started and this process should
    /// stop. On POSIX systems a successful elevation replaces the current
    /// process and never returns.
    fn elevate(&self, config_dir: &Path) -> PlatformResult<()>;
}

/// Arguments for the elevated relaunch: the current arguments (without the
/// program name) with any `--config-dir` replaced by `config_dir`.
///
/// The elevated process may run with a different `HOME` and without
/// `ORDERLY_CONFIG_DIR`, so the directory is always passed explicitly.
pub fn relaunch_args<I>(args: I, config_dir: &Path) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut relaunch = Vec::new();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if arg == "--config-dir" {
            args.next();
            continue;
        }
        if arg.to_string_lossy().starts_with("--config-dir=") {
            continue;
        }
        relaunch.push(arg);
    }
    relaunch.push(OsString::from("--config-dir"));
    relaunch.push(config_dir.as_os_str().to_os_string());
    relaunch
}

fn set_readonly_flag(path: &Path, readonly: bool) -> PlatformResult<()> {
    let io_err = |source| PlatformError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut permissions = fs::metadata(path).map_err(io_err)?.permissions();
    #[allow(clippy::permissions_set_readonly_false)]
    permissions.set_readonly(readonly);
    fs::set_permissions(path, permissions).map_err(io_err)
}

/// Returns the platform services for the target this binary was built for.
pub fn current() -> Box<dyn Platform> {
    #[cfg(windows)]
    {
        Box::new(Windows)
    }
    #[cfg(unix)]
    {
        Box::new(Posix)
    }
    #[cfg(not(any(windows, unix)))]
    {
        Box::new(Unsupported)
    }
}

/// Linux and macOS.
#[cfg(unix)]
#[derive(Debug, Default, Clone, Copy)]
pub struct Posix;

#[cfg(unix)]
impl Platform for Posix {
    fn name(&self) -> &'static str {
        "posix"
    }

    fn config_dir(&self) -> PathBuf {
        dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR_NAME)
    }

    fn backup_file_name(&self) -> Option<&'static str> {
        Some(".conf.bckup.toml")
    }

    fn hide_file(&self, _path: &Path) -> PlatformResult<()> {
        // The leading dot already hides it.
        Ok(())
    }

    fn set_read_only(&self, path: &Path) -> PlatformResult<()> {
        use std::os::unix::fs::PermissionsExt;

        fs::set_permissions(path, fs::Permissions::from_mode(0o400)).map_err(|source| {
            PlatformError::Io {
                path: path.to_path_buf(),
                source,
            }
        })
    }

    fn set_writable(&self, path: &Path) -> PlatformResult<()> {
        use std::os::unix::fs::PermissionsExt;

        fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|source| {
            PlatformError::Io {
                path: path.to_path_buf(),
                source,
            }
        })
    }

    fn open_in_editor(&self, path: &Path, editor: &str) -> PlatformResult<()> {
        let editor_failed = |reason: String| PlatformError::EditorFailed {
            path: path.to_path_buf(),
            reason,
        };

        // EDITOR may carry arguments, e.g. "code --wait".
        let mut parts = editor.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| editor_failed("no editor configured".to_string()))?;

        log::debug!("launching editor {} for {}", editor, path.display());
        let status = Command::new(program)
            .args(parts)
            .arg(path)
            .status()
            .map_err(|e| editor_failed(format!("could not start '{}': {}", program, e)))?;

        if status.success() {
            Ok(())
        } else {
            Err(editor_failed(format!("'{}' exited with {}", program, status)))
        }
    }

    fn is_elevated(&self) -> bool {
        // SAFETY: geteuid has no preconditions and cannot fail.
        unsafe { libc::geteuid() == 0 }
    }

    fn elevate(&self, config_dir: &Path) -> PlatformResult<()> {
        use std::os::unix::process::CommandExt;

        let exe = std::env::current_exe()
            .map_err(|e| PlatformError::ElevationFailed(e.to_string()))?;
        let err = Command::new("sudo")
            .arg(exe)
            .args(relaunch_args(std::env::args_os().skip(1), config_dir))
            .exec();
        Err(PlatformError::ElevationFailed(format!(
            "could not run sudo: {}",
            err
        )))
    }
}

/// Windows.
#[cfg(windows)]
#[derive(Debug, Default, Clone, Copy)]
pub struct Windows;

#[cfg(windows)]
impl Platform for Windows {
    fn name(&self) -> &'static str {
        "windows"
    }

    fn config_dir(&self) -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR_NAME)
    }

    fn backup_file_name(&self) -> Option<&'static str> {
        Some("conf.bckup.toml")
    }

    fn hide_file(&self, path: &Path) -> PlatformResult<()> {
        let status = Command::new("attrib")
            .arg("+h")
            .arg(path)
            .status()
            .map_err(|source| PlatformError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(PlatformError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::other(format!("attrib exited with {}", status)),
            })
        }
    }

    fn open_in_editor(&self, path: &Path, _editor: &str) -> PlatformResult<()> {
        // The file association decides which program opens it.
        let status = Command::new("cmd")
            .args(["/C", "start", "/WAIT", ""])
            .arg(path)
            .status()
            .map_err(|e| PlatformError::EditorFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(PlatformError::EditorFailed {
                path: path.to_path_buf(),
                reason: format!("start exited with {}", status),
            })
        }
    }

    fn is_elevated(&self) -> bool {
        // `net session` only succeeds from an administrator context.
        Command::new("net")
            .arg("session")
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    fn elevate(&self, config_dir: &Path) -> PlatformResult<()> {
        let exe = std::env::current_exe()
            .map_err(|e| PlatformError::ElevationFailed(e.to_string()))?;
        let arguments = relaunch_args(std::env::args_os().skip(1), config_dir)
            .iter()
            .map(|arg| format!("'{}'", arg.to_string_lossy().replace('\'', "''")))
            .collect::<Vec<_>>()
            .join(",");

        let script = format!(
            "Start-Process -FilePath '{}' -Verb RunAs -ArgumentList {}",
            exe.display().to_string().replace('\'', "''"),
            arguments
        );

        let status = Command::new("powershell")
            .args(["-NoProfile", "-Command", &script])
            .status()
            .map_err(|e| PlatformError::ElevationFailed(e.to_string()))?;
        if status.success() {
            Ok(())
        } else {
            Err(PlatformError::ElevationFailed(format!(
                "elevation request exited with {}",
                status
            )))
        }
    }
}

/// Fallback for targets with no dedicated services.
///
/// No backup document is kept, and editing or elevating is refused.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unsupported;

impl Platform for Unsupported {
    fn name(&self) -> &'static str {
        "unsupported"
    }

    fn config_dir(&self) -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    fn backup_file_name(&self) -> Option<&'static str> {
        None
    }

    fn hide_file(&self, _path: &Path) -> PlatformResult<()> {
        Ok(())
    }

    fn open_in_editor(&self, _path: &Path, _editor: &str) -> PlatformResult<()> {
        Err(PlatformError::Unsupported("Editing the configuration file"))
    }

    fn is_elevated(&self) -> bool {
        false
    }

    fn elevate(&self, _config_dir: &Path) -> PlatformResult<()> {
        Err(PlatformError::ElevationFailed(
            "no elevation mechanism on this platform".to_string(),
        ))
    }
}
