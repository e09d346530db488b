use directories::ProjectDirs;
use log::debug;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use uuid::Uuid;

// Maximum allowed size for state files to prevent DoS attacks (10MB)
const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;
const MAX_ITEMS: usize = 10000;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Could not determine data directory")]
    NoDataDir,
    #[error("File {0} exceeds security limits")]
    TooLarge(String),
    #[error("Too many items in file {0} (maximum {max})", max = MAX_ITEMS)]
    TooManyItems(String),
    #[error("Failed to parse JSON data: {0}")]
    Json(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Items that can be kept in a repository
pub trait Record: Sized + Clone + Serialize + DeserializeOwned {
    fn id(&self) -> Uuid;
    fn filename() -> &'static str;
}

/// Caller-owned storage for records.
///
/// Parsing and scheduling never touch storage directly; the application
/// layer passes a repository in.
pub trait Repository<T: Record> {
    fn list(&self) -> Result<Vec<T>, StoreError>;
    fn add(&mut self, item: T) -> Result<(), StoreError>;
    fn remove(&mut self, id: Uuid) -> Result<Option<T>, StoreError>;
    fn replace_all(&mut self, items: Vec<T>) -> Result<(), StoreError>;

    fn add_all(&mut self, items: Vec<T>) -> Result<(), StoreError> {
        let mut all = self.list()?;
        all.extend(items);
        self.replace_all(all)
    }
}

#[derive(Debug, Clone)]
pub struct MemoryRepository<T> {
    items: Vec<T>,
}

impl<T> Default for MemoryRepository<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Record> MemoryRepository<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }
}

impl<T: Record> Repository<T> for MemoryRepository<T> {
    fn list(&self) -> Result<Vec<T>, StoreError> {
        Ok(self.items.clone())
    }

    fn add(&mut self, item: T) -> Result<(), StoreError> {
        self.items.push(item);
        Ok(())
    }

    fn remove(&mut self, id: Uuid) -> Result<Option<T>, StoreError> {
        let position = self.items.iter().position(|item| item.id() == id);
        Ok(position.map(|index| self.items.remove(index)))
    }

    fn replace_all(&mut self, items: Vec<T>) -> Result<(), StoreError> {
        self.items = items;
        Ok(())
    }
}

/// JSON files in a data directory, one file per record type
#[derive(Debug, Clone)]
pub struct StateManager {
    state_dir: PathBuf,
}

impl StateManager {
    pub fn new(state_dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(state_dir)?;
        Ok(Self { state_dir: state_dir.to_path_buf() })
    }

    /// Platform data directory, e.g. `~/.local/share/celebrate`
    pub fn default_dir() -> Result<PathBuf, StoreError> {
        let proj_dirs =
            ProjectDirs::from("com", "celebrate", "celebrate").ok_or(StoreError::NoDataDir)?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load<T: Record>(&self) -> Result<Vec<T>, StoreError> {
        let path = self.state_dir.join(T::filename());
        if !path.exists() {
            return Ok(Vec::new());
        }

        let metadata = std::fs::metadata(&path)?;
        if metadata.len() > MAX_FILE_SIZE {
            return Err(StoreError::TooLarge(T::filename().to_string()));
        }

        let reader = BufReader::new(File::open(&path)?);
        let json_value: serde_json::Value = serde_json::from_reader(reader)?;
        if let Some(array) = json_value.as_array() {
            if array.len() > MAX_ITEMS {
                return Err(StoreError::TooManyItems(T::filename().to_string()));
            }
        }

        let items: Vec<T> = serde_json::from_value(json_value)?;
        debug!("Loaded {} item(s) from {}", items.len(), path.display());
        Ok(items)
    }

    pub fn save<T: Record>(&self, items: &[T]) -> Result<(), StoreError> {
        if items.len() > MAX_ITEMS {
            return Err(StoreError::TooManyItems(T::filename().to_string()));
        }
        let path = self.state_dir.join(T::filename());
        let file = OpenOptions::new().write(true).create(true).truncate(true).open(&path)?;

        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, items)?;
        debug!("Saved {} item(s) to {}", items.len(), path.display());
        Ok(())
    }
}

/// [`Repository`] backed by a [`StateManager`] file
#[derive(Debug, Clone)]
pub struct FileRepository {
    state: StateManager,
}

impl FileRepository {
    pub fn new(state: StateManager) -> Self {
        Self { state }
    }
}

impl<T: Record> Repository<T> for FileRepository {
    fn list(&self) -> Result<Vec<T>, StoreError> {
        self.state.load()
    }

    fn add(&mut self, item: T) -> Result<(), StoreError> {
        let mut items = self.state.load::<T>()?;
        items.push(item);
        self.state.save(&items)
    }

    fn remove(&mut self, id: Uuid) -> Result<Option<T>, StoreError> {
        let mut items = self.state.load::<T>()?;
        let Some(position) = items.iter().position(|item| item.id() == id) else {
            return Ok(None);
        };
        let removed = items.remove(position);
        self.state.save(&items)?;
        Ok(Some(removed))
    }

    fn replace_all(&mut self, items: Vec<T>) -> Result<(), StoreError> {
        self.state.save(&items)
    }
}
