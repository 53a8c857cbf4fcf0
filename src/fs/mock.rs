use super::FileSystem;
use std::collections::{HashMap, HashSet};
use std::io::{self, Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File { content: Vec<u8>, executable: bool },
    Dir,
}

#[derive(Debug, Default)]
struct MockState {
    entries: HashMap<PathBuf, MockEntry>,
    failing_writes: HashSet<PathBuf>,
}

/// In-memory filesystem.
///
/// Clones share state, so a test can keep one handle for assertions while
/// the installer works through another.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    state: Arc<Mutex<MockState>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        let fs = Self::default();
        fs.lock().entries.insert(PathBuf::from("."), MockEntry::Dir);
        fs
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let mut state = self.lock();
        state.entries.insert(
            path.as_ref().to_path_buf(),
            MockEntry::File {
                content: content.into(),
                executable: false,
            },
        );
    }

    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        match self.lock().entries.get(path.as_ref()) {
            Some(MockEntry::File { content, .. }) => Some(content.clone()),
            _ => None,
        }
    }

    /// Make every write to `path` fail (after the file has been created).
    pub fn fail_writes_to(&self, path: impl AsRef<Path>) {
        self.lock().failing_writes.insert(path.as_ref().to_path_buf());
    }
}

struct MockWriter {
    path: PathBuf,
    state: Arc<Mutex<MockState>>,
}

impl Write for MockWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        if state.failing_writes.contains(&self.path) {
            return Err(io::Error::other(format!("injected write failure: {:?}", self.path)));
        }
        match state.entries.get_mut(&self.path) {
            Some(MockEntry::File { content, .. }) => {
                content.extend_from_slice(buf);
                Ok(buf.len())
            }
            _ => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("file vanished while writing: {:?}", self.path),
            )),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("File not found: {:?}", path))
}

impl FileSystem for MockFileSystem {
    fn create_or_truncate(&self, path: &Path) -> io::Result<Box<dyn Write + Send>> {
        let mut state = self.lock();
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if !matches!(state.entries.get(&parent), Some(MockEntry::Dir)) {
            return Err(not_found(&parent));
        }
        if matches!(state.entries.get(path), Some(MockEntry::Dir)) {
            return Err(io::Error::other(format!("Is a directory: {:?}", path)));
        }
        // Truncation keeps the mode bits, like open(O_TRUNC) does.
        let executable = matches!(
            state.entries.get(path),
            Some(MockEntry::File { executable: true, .. })
        );
        state.entries.insert(
            path.to_path_buf(),
            MockEntry::File {
                content: Vec::new(),
                executable,
            },
        );
        Ok(Box::new(MockWriter {
            path: path.to_path_buf(),
            state: Arc::clone(&self.state),
        }))
    }

    fn open_read(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
        match self.lock().entries.get(path) {
            Some(MockEntry::File { content, .. }) => Ok(Box::new(Cursor::new(content.clone()))),
            Some(MockEntry::Dir) => Err(io::Error::other(format!("Is a directory: {:?}", path))),
            None => Err(not_found(path)),
        }
    }

    fn set_executable(&self, path: &Path) -> io::Result<()> {
        match self.lock().entries.get_mut(path) {
            Some(MockEntry::File { executable, .. }) => {
                *executable = true;
                Ok(())
            }
            Some(MockEntry::Dir) => Ok(()),
            None => Err(not_found(path)),
        }
    }

    fn is_executable(&self, path: &Path) -> bool {
        matches!(
            self.lock().entries.get(path),
            Some(MockEntry::File { executable: true, .. })
        )
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        let mut state = self.lock();
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                continue;
            }
            match state.entries.get(ancestor) {
                Some(MockEntry::File { .. }) => {
                    return Err(io::Error::new(
                        io::ErrorKind::AlreadyExists,
                        format!("Not a directory: {:?}", ancestor),
                    ));
                }
                Some(MockEntry::Dir) => {}
                None => {
                    state.entries.insert(ancestor.to_path_buf(), MockEntry::Dir);
                }
            }
        }
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        let mut state = self.lock();
        match state.entries.get(path) {
            Some(MockEntry::File { .. }) => {
                state.entries.remove(path);
                Ok(())
            }
            Some(MockEntry::Dir) => Err(io::Error::other(format!("Is a directory: {:?}", path))),
            None => Err(not_found(path)),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.lock().entries.contains_key(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.lock().entries.get(path), Some(MockEntry::File { .. }))
    }
}
