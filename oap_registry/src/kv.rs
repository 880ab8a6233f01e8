use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::{info, log_enabled, Level};

use crate::Result;

const STORE_FILE: &str = "definitions.cbor";

/// Byte-keyed persistence backing the definition registry.
pub trait KvStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Writes all the entries, or none of them if an error occurs.
    fn put_batch(&mut self, entries: &[(Vec<u8>, Vec<u8>)]) -> Result<()>;

    fn contains(&self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.entries.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn put_batch(&mut self, entries: &[(Vec<u8>, Vec<u8>)]) -> Result<()> {
        self.entries.extend(entries.iter().cloned());
        Ok(())
    }
}

/// Keeps every entry in memory and rewrites the whole map as CBOR on each write.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    file: File,
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl FileStore {
    /// Opens the store file in `dir`, creating both if missing.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        std::fs::create_dir_all(dir.as_ref())?;
        let path = dir.as_ref().join(STORE_FILE);
        let mut file = OpenOptions::new().read(true).write(true).create(true).open(&path)?;
        let entries = if file.metadata()?.len() == 0 {
            BTreeMap::new()
        } else {
            read(&mut file)?
        };
        info!("opened definition store {:?} with {} entries", path, entries.len());
        Ok(FileStore {
            path,
            file,
            entries,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.put_batch(&[(key.to_vec(), value.to_vec())])
    }

    fn put_batch(&mut self, entries: &[(Vec<u8>, Vec<u8>)]) -> Result<()> {
        let mut updated = self.entries.clone();
        updated.extend(entries.iter().cloned());
        write(&updated, &mut self.file)?;
        self.entries = updated;
        Ok(())
    }
}

fn read(file: &mut File) -> Result<BTreeMap<Vec<u8>, Vec<u8>>> {
    file.seek(SeekFrom::Start(0))?;
    if log_enabled!(Level::Info) {
        info!("file {:?} size {}", &file, file.metadata()?.len());
    }
    let buffered = BufReader::new(file);
    Ok(serde_cbor::from_reader(buffered)?)
}

fn write(entries: &BTreeMap<Vec<u8>, Vec<u8>>, file: &mut File) -> Result<()> {
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    let mut buffered = BufWriter::new(file);
    serde_cbor::to_writer(&mut buffered, entries)?;
    buffered.flush()?;
    Ok(())
}
