//! Open flags and seek positions.

/// Flags for [`FileSystem::open_file`](crate::FileSystem::open_file).
///
/// Objects can be read or replaced wholesale, never both at once and never
/// appended to, so `read + write` and `append` are rejected when the file is
/// opened. `create` implies `write`; `truncate` is accepted and has no
/// additional effect because every write replaces the whole object.
///
/// # Examples
///
/// ```
/// use bucketfs::OpenOptions;
///
/// let options = OpenOptions::new().create(true);
/// assert!(options.is_write());
/// assert!(OpenOptions::new().read(true).write(true).is_unsupported());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct OpenOptions {
    read: bool,
    write: bool,
    append: bool,
    create: bool,
    truncate: bool,
}

impl OpenOptions {
    /// No flags set, which opens for reading.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open for reading.
    #[must_use]
    pub fn read(mut self, read: bool) -> Self {
        self.read = read;
        self
    }

    /// Open for writing.
    #[must_use]
    pub fn write(mut self, write: bool) -> Self {
        self.write = write;
        self
    }

    /// Open for appending.
    #[must_use]
    pub fn append(mut self, append: bool) -> Self {
        self.append = append;
        self
    }

    /// Create the object if it does not exist.
    #[must_use]
    pub fn create(mut self, create: bool) -> Self {
        self.create = create;
        self
    }

    /// Truncate an existing object. Writes always replace the whole object,
    /// so this flag only exists for call-site compatibility.
    #[must_use]
    pub fn truncate(mut self, truncate: bool) -> Self {
        self.truncate = truncate;
        self
    }

    /// Whether `truncate` was requested.
    #[must_use]
    pub fn is_truncate(&self) -> bool {
        self.truncate
    }

    /// Whether the combination cannot be served (`read + write` or `append`).
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        self.append || (self.read && self.write)
    }

    /// Whether the file is opened for writing.
    #[must_use]
    pub fn is_write(&self) -> bool {
        self.write || self.create
    }
}

/// Seek position for [`VirtualFile::seek`](crate::VirtualFile::seek).
///
/// Offsets are signed so that a computation landing before the start of the
/// file can be reported instead of wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekFrom {
    /// Absolute offset.
    Start(i64),
    /// Relative to the current offset.
    Current(i64),
    /// This many bytes before the end of the file.
    End(i64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_reject_duplex_and_append() {
        assert!(OpenOptions::new().read(true).write(true).is_unsupported());
        assert!(OpenOptions::new().write(true).append(true).is_unsupported());
        assert!(!OpenOptions::new().write(true).is_unsupported());
        assert!(!OpenOptions::new().read(true).is_unsupported());
    }

    #[test]
    fn test_should_fold_create_into_write() {
        assert!(OpenOptions::new().create(true).is_write());
        assert!(OpenOptions::new().write(true).truncate(true).is_write());
        assert!(!OpenOptions::new().read(true).is_write());
        assert!(!OpenOptions::new().truncate(true).is_write());
        assert!(!OpenOptions::new().is_write());
    }
}
