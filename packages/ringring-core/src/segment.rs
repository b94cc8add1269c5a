//! Shared memory segment backing the cross-process state vector.
//!
//! File-backed `mmap(MAP_SHARED)` over a file in the shm directory. A
//! segment created under `/dev/shm` is byte-compatible with POSIX shared
//! memory attachments made elsewhere under the same name. Only the
//! device-control process creates or removes the segment; every other
//! process attaches.

use std::fs::OpenOptions;
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

pub struct SharedSegment {
    ptr: *mut u8,
    len: usize,
    // Kept open to maintain the mapping.
    _file: std::fs::File,
    path: PathBuf,
    owns_file: bool,
}

impl SharedSegment {
    /// Create the segment file, size it, and map it. The creator owns the
    /// file and removes it on drop. A stale file left by a crashed run is
    /// truncated and reused.
    pub fn create(path: &Path, size: usize) -> io::Result<Self> {
        if size == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "segment size must be > 0",
            ));
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len(size as u64)?;

        let ptr = Self::map(&file, size)?;

        Ok(Self {
            ptr,
            len: size,
            _file: file,
            path: path.to_path_buf(),
            owns_file: true,
        })
    }

    /// Attach to an existing segment. Attached segments never remove the
    /// backing file. The file size determines the mapping size.
    pub fn attach(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let len = file.metadata()?.len() as usize;
        if len == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "segment file is empty",
            ));
        }

        let ptr = Self::map(&file, len)?;

        Ok(Self {
            ptr,
            len,
            _file: file,
            path: path.to_path_buf(),
            owns_file: false,
        })
    }

    fn map(file: &std::fs::File, len: usize) -> io::Result<*mut u8> {
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                file.as_raw_fd(),
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }
        Ok(ptr as *mut u8)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy the full segment contents out.
    pub fn read_all(&self) -> Vec<u8> {
        // SAFETY: the mapping is valid for `len` bytes while `self` lives.
        unsafe { std::slice::from_raw_parts(self.ptr, self.len) }.to_vec()
    }

    /// Overwrite the full segment. The slice length must match.
    pub fn write_all(&self, bytes: &[u8]) -> io::Result<()> {
        if bytes.len() != self.len {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "byte vector does not match segment size",
            ));
        }
        // SAFETY: bounds checked above; the mapping is valid while `self`
        // lives.
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), self.ptr, self.len);
        }
        Ok(())
    }

    /// Write a single field byte, the way an external owner updates only
    /// the field it owns.
    pub fn write_byte(&self, index: usize, value: u8) -> io::Result<()> {
        if index >= self.len {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "byte index out of segment bounds",
            ));
        }
        // SAFETY: bounds checked above.
        unsafe {
            std::ptr::write(self.ptr.add(index), value);
        }
        Ok(())
    }
}

impl Drop for SharedSegment {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.ptr as *mut libc::c_void, self.len);
        }
        if self.owns_file {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

// SAFETY: the mapping stays valid for the lifetime of the struct and the
// underlying memory is shared by design.
unsafe impl Send for SharedSegment {}
unsafe impl Sync for SharedSegment {}
