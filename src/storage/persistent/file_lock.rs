//! Exclusive directory lock for the file-backed store.
//!
//! Only one process may hold a store directory open at a time. The holder
//! writes its process id into the lock file so a contending process can say
//! who it is waiting on.

use std::fs::{self, File, OpenOptions};
use std::io::{Error as IoError, ErrorKind, Result as IoResult, Seek, Write};
use std::path::{Path, PathBuf};

/// Name of the lock file inside a store directory.
pub const LOCK_FILE_NAME: &str = ".reviewledger.lock";

/// Exclusive lock on a store directory, held for the lifetime of this value.
///
/// Dropping it closes the handle, which releases the OS lock.
#[derive(Debug)]
pub struct FileLock {
    _file: File,
    path: PathBuf,
}

impl FileLock {
    /// Attempt to acquire an exclusive lock on `dir` without blocking.
    ///
    /// # Errors
    /// - `ErrorKind::WouldBlock` if another handle holds the lock; the
    ///   message names the holder's pid when it can be read
    /// - `ErrorKind::Unsupported` on platforms without advisory locks, unless
    ///   the `allow_no_lock` feature is enabled
    /// - any I/O error from creating or writing the lock file
    pub fn acquire(dir: &Path) -> IoResult<Self> {
        let lock_path = dir.join(LOCK_FILE_NAME);

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        if !try_lock(&file)? {
            let message = match read_holder(&lock_path) {
                Some(pid) => format!("store directory {} is locked by process {pid}", dir.display()),
                None => format!("store directory {} is locked by another process", dir.display()),
            };
            return Err(IoError::new(ErrorKind::WouldBlock, message));
        }

        file.set_len(0)?;
        file.rewind()?;
        write!(file, "{}", std::process::id())?;
        file.flush()?;

        Ok(Self {
            _file: file,
            path: lock_path,
        })
    }

    /// Returns the path to the lock file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Pid recorded by the current or last holder of the lock file.
fn read_holder(lock_path: &Path) -> Option<u32> {
    fs::read_to_string(lock_path).ok()?.trim().parse().ok()
}

/// `Ok(false)` means another handle holds the lock.
#[cfg(unix)]
fn try_lock(file: &File) -> IoResult<bool> {
    use std::os::unix::io::AsRawFd;

    // SAFETY: the descriptor is owned by `file` for the duration of the call.
    let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if result == 0 {
        return Ok(true);
    }

    let err = IoError::last_os_error();
    if err.raw_os_error() == Some(libc::EWOULDBLOCK) {
        Ok(false)
    } else {
        Err(err)
    }
}

/// `Ok(false)` means another handle holds the lock.
#[cfg(windows)]
fn try_lock(file: &File) -> IoResult<bool> {
    use std::os::windows::io::AsRawHandle;
    use windows_sys::Win32::Foundation::{ERROR_LOCK_VIOLATION, HANDLE};
    use windows_sys::Win32::Storage::FileSystem::{
        LockFileEx, LOCKFILE_EXCLUSIVE_LOCK, LOCKFILE_FAIL_IMMEDIATELY,
    };
    use windows_sys::Win32::System::IO::OVERLAPPED;

    let handle = file.as_raw_handle() as HANDLE;
    // Lock a range past any pid text so contenders can still read the holder.
    // SAFETY: `handle` belongs to `file`; OVERLAPPED is plain data and may be zeroed.
    let result = unsafe {
        let mut overlapped = std::mem::zeroed::<OVERLAPPED>();
        overlapped.Anonymous.Anonymous.OffsetHigh = 1;
        LockFileEx(
            handle,
            LOCKFILE_EXCLUSIVE_LOCK | LOCKFILE_FAIL_IMMEDIATELY,
            0,
            1,
            0,
            &mut overlapped,
        )
    };
    if result != 0 {
        return Ok(true);
    }

    let err = IoError::last_os_error();
    if err.raw_os_error() == Some(ERROR_LOCK_VIOLATION as i32) {
        Ok(false)
    } else {
        Err(err)
    }
}

#[cfg(not(any(unix, windows)))]
fn try_lock(_file: &File) -> IoResult<bool> {
    #[cfg(feature = "allow_no_lock")]
    {
        tracing::warn!("file locking not supported on this platform; opening store without a lock");
        Ok(true)
    }

    #[cfg(not(feature = "allow_no_lock"))]
    {
        Err(IoError::new(
            ErrorKind::Unsupported,
            "file locking not supported on this platform (enable `allow_no_lock` to open anyway)",
        ))
    }
}
