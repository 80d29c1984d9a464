//! Key stream sources.
//!
//! The simulator never interprets keys beyond equality; the key distribution
//! is entirely determined by the source. Two sources are provided:
//!
//! - [`FileKeySource`]: whitespace-separated non-negative ASCII integers
//!   read from `data-0`, `data-1`, … in order, refilled block-wise behind a
//!   single mutex, the only shared mutable state in the system.
//! - [`SyntheticKeySource`]: a seeded infinite uniform stream for
//!   self-contained runs and benchmarks.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KeySourceError {
    #[error("failed to open key file {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read key file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed key {token:?} in {}", path.display())]
    Malformed { path: PathBuf, token: String },
    #[error("negative key {key} in {}", path.display())]
    Negative { path: PathBuf, key: i64 },
    #[error("key input exhausted after {consumed} keys")]
    Exhausted { consumed: u64 },
}

/// A thread-safe sequence of non-negative keys.
///
/// `next_key` may block only on the source's own lock; it never suspends
/// otherwise.
pub trait KeySource: Send + Sync {
    fn next_key(&self) -> Result<i64, KeySourceError>;
}

/// Number of keys parsed per buffer reload of the file source.
const DEFAULT_KEYS_PER_BLOCK: usize = 4096;

/// Reads keys from `data-0`, `data-1`, … under a directory.
pub struct FileKeySource {
    cursor: Mutex<FileCursor>,
}

struct FileCursor {
    dir: PathBuf,
    file_index: usize,
    path: PathBuf,
    reader: Option<BufReader<File>>,
    pending: VecDeque<i64>,
    keys_per_block: usize,
    consumed: u64,
}

impl FileKeySource {
    /// Open the source, requiring `data-0` to exist under `dir`.
    pub fn open(dir: &Path) -> Result<Self, KeySourceError> {
        Self::with_block_size(dir, DEFAULT_KEYS_PER_BLOCK)
    }

    pub fn with_block_size(dir: &Path, keys_per_block: usize) -> Result<Self, KeySourceError> {
        let path = dir.join("data-0");
        let file = File::open(&path).map_err(|source| KeySourceError::Open {
            path: path.clone(),
            source,
        })?;
        Ok(Self {
            cursor: Mutex::new(FileCursor {
                dir: dir.to_path_buf(),
                file_index: 0,
                path,
                reader: Some(BufReader::new(file)),
                pending: VecDeque::with_capacity(keys_per_block),
                keys_per_block: keys_per_block.max(1),
                consumed: 0,
            }),
        })
    }
}

impl FileCursor {
    /// Parse keys from the current file until the block buffer is full,
    /// moving on to `data-{n+1}` at end of file. Stops quietly when no
    /// successor file exists; exhaustion is reported on the next pop.
    fn refill(&mut self) -> Result<(), KeySourceError> {
        let mut line = String::new();
        while self.pending.len() < self.keys_per_block {
            let Some(reader) = self.reader.as_mut() else {
                break;
            };
            line.clear();
            let n = reader.read_line(&mut line).map_err(|source| KeySourceError::Io {
                path: self.path.clone(),
                source,
            })?;
            if n == 0 {
                self.advance_file()?;
                continue;
            }
            for token in line.split_ascii_whitespace() {
                let key: i64 = token.parse().map_err(|_| KeySourceError::Malformed {
                    path: self.path.clone(),
                    token: token.to_string(),
                })?;
                if key < 0 {
                    return Err(KeySourceError::Negative {
                        path: self.path.clone(),
                        key,
                    });
                }
                self.pending.push_back(key);
            }
        }
        Ok(())
    }

    fn advance_file(&mut self) -> Result<(), KeySourceError> {
        self.file_index += 1;
        let path = self.dir.join(format!("data-{}", self.file_index));
        match File::open(&path) {
            Ok(file) => {
                self.path = path;
                self.reader = Some(BufReader::new(file));
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.reader = None;
                Ok(())
            }
            Err(source) => Err(KeySourceError::Open { path, source }),
        }
    }
}

impl KeySource for FileKeySource {
    fn next_key(&self) -> Result<i64, KeySourceError> {
        let mut cursor = self.cursor.lock().expect("key source mutex poisoned");
        if cursor.pending.is_empty() {
            cursor.refill()?;
        }
        match cursor.pending.pop_front() {
            Some(key) => {
                cursor.consumed += 1;
                Ok(key)
            }
            None => Err(KeySourceError::Exhausted {
                consumed: cursor.consumed,
            }),
        }
    }
}

/// Infinite uniform key stream, deterministic per seed.
pub struct SyntheticKeySource {
    rng: Mutex<ChaCha8Rng>,
    key_space: i64,
}

impl SyntheticKeySource {
    /// Keys are uniform in `[0, key_space)`.
    ///
    /// # Panics
    ///
    /// Panics if `key_space` is not positive.
    pub fn new(seed: u64, key_space: i64) -> Self {
        assert!(key_space > 0, "key_space must be positive");
        Self {
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
            key_space,
        }
    }
}

impl KeySource for SyntheticKeySource {
    fn next_key(&self) -> Result<i64, KeySourceError> {
        let mut rng = self.rng.lock().expect("key source mutex poisoned");
        Ok(rng.gen_range(0..self.key_space))
    }
}

/// Write `count` synthetic keys across `data-0 … data-{files-1}` under
/// `dir`, 16 keys per line. Returns the number of keys written.
pub fn write_key_files(
    dir: &Path,
    count: u64,
    key_space: i64,
    files: usize,
    seed: u64,
) -> std::io::Result<u64> {
    let files = files.max(1);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let per_file = count.div_ceil(files as u64).max(1);
    let mut written = 0u64;
    for i in 0..files {
        let path = dir.join(format!("data-{}", i));
        let mut out = BufWriter::new(File::create(&path)?);
        let mut in_line = 0;
        while written < count && written < (i as u64 + 1) * per_file {
            write!(out, "{}", rng.gen_range(0..key_space))?;
            written += 1;
            in_line += 1;
            if in_line == 16 {
                out.write_all(b"\n")?;
                in_line = 0;
            } else {
                out.write_all(b" ")?;
            }
        }
        if in_line > 0 {
            out.write_all(b"\n")?;
        }
        out.flush()?;
    }
    Ok(written)
}
