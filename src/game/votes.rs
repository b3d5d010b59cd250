use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::{GameError, Result};

/// Prefix of the keys holding the title → votes mappings.
const VOTES_KEY: &str = "colorchords.votes";

const CORRUPT_SUFFIX: &str = ".corrupt";

/// Durable string key-value storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, value: &str) -> Self {
        let mut store = Self::new();
        store.entries.insert(key.to_string(), value.to_string());
        store
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}

/// Key-value store backed by a single JSON object on disk.
/// Every `set` rewrites the file.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
    // Set when an unreadable file could not be moved aside.
    read_only: bool,
}

impl JsonFileStore {
    /// Open `path`, creating nothing until the first `set`. An unreadable
    /// file is moved to `<name>.bak` first; if that fails the store never
    /// writes over it.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut read_only = false;
        let entries = match Self::read_entries(&path) {
            Ok(entries) => entries,
            Err(e) => {
                let backup = backup_path(&path);
                match std::fs::rename(&path, &backup) {
                    Ok(()) => log::warn!(
                        "Unreadable store {} ({}); moved it to {}",
                        path.display(),
                        e,
                        backup.display()
                    ),
                    Err(move_err) => {
                        log::warn!(
                            "Unreadable store {} ({}) could not be moved aside ({}); not writing to it",
                            path.display(),
                            e,
                            move_err
                        );
                        read_only = true;
                    }
                }
                BTreeMap::new()
            }
        };
        log::debug!("Opened store {} ({} keys)", path.display(), entries.len());
        Self {
            path,
            entries,
            read_only,
        }
    }

    /// `<data dir>/colorchords/store.json`, or the working directory as a last resort.
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .or_else(dirs::home_dir)
            .map(|base| base.join("colorchords"))
            .unwrap_or_default()
            .join("store.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(path: &Path) -> std::result::Result<BTreeMap<String, String>, String> {
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let file = File::open(path).map_err(|e| e.to_string())?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| e.to_string())
    }

    fn write_entries(&self) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer_pretty(writer, &self.entries)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        if self.read_only {
            return Err(GameError::Storage(format!(
                "{}: unreadable file left in place",
                self.path.display()
            )));
        }
        self.write_entries()
            .map_err(|e| GameError::Storage(format!("{}: {}", self.path.display(), e)))
    }
}

/// First free `<name>.bak`, `<name>.bak.2`, ... next to `path`.
fn backup_path(path: &Path) -> PathBuf {
    let name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    let mut n = 1;
    loop {
        let mut candidate = name.clone();
        candidate.push(".bak");
        if n > 1 {
            candidate.push(format!(".{}", n));
        }
        let candidate = path.with_file_name(candidate);
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

/// Per-track vote histograms, cached in memory and written through on every vote.
///
/// Histories live under [`votes_key`], one mapping per answer count, so
/// answer sets of different sizes never touch each other's vectors.
pub struct VoteStore {
    store: Box<dyn KeyValueStore>,
    key: String,
    answers: usize,
    history: BTreeMap<String, Vec<u32>>,
    // Entries that are not a vote vector of the right size; written back untouched.
    unreadable: Map<String, Value>,
    // Raw text of a mapping that did not parse; saved aside before the first write.
    corrupt: Option<String>,
}

impl VoteStore {
    /// Read the persisted mapping once. Entries that fail to decode are
    /// logged, read as zeros and kept as they are in the store.
    pub fn open(store: Box<dyn KeyValueStore>, answers: usize) -> Self {
        let key = votes_key(answers);
        let mut history = BTreeMap::new();
        let mut unreadable = Map::new();
        let mut corrupt = None;

        if let Some(raw) = store.get(&key) {
            match serde_json::from_str::<Map<String, Value>>(&raw) {
                Ok(entries) => {
                    for (title, value) in entries {
                        match decode_votes(&value, answers) {
                            Some(votes) => {
                                history.insert(title, votes);
                            }
                            None => {
                                log::warn!("Unreadable votes for '{}': {}", title, value);
                                unreadable.insert(title, value);
                            }
                        }
                    }
                }
                Err(e) => {
                    log::warn!(
                        "{}; starting with empty vote history",
                        GameError::PersistedStateCorrupt(e.to_string())
                    );
                    corrupt = Some(raw);
                }
            }
        }

        Self {
            store,
            key,
            answers,
            history,
            unreadable,
            corrupt,
        }
    }

    pub fn load(&self, title: &str) -> Vec<u32> {
        self.history
            .get(title)
            .cloned()
            .unwrap_or_else(|| vec![0; self.answers])
    }

    /// Count one vote. Repeated calls count repeatedly.
    pub fn record(&mut self, title: &str, choice: usize) -> Result<Vec<u32>> {
        if choice >= self.answers {
            return Err(GameError::InvalidChoice {
                choice,
                answers: self.answers,
            });
        }

        if let Some(value) = self.unreadable.remove(title) {
            let aside = self.free_title(title);
            log::warn!("Keeping unreadable votes for '{}' as '{}'", title, aside);
            self.unreadable.insert(aside, value);
        }

        let answers = self.answers;
        let votes = self
            .history
            .entry(title.to_string())
            .or_insert_with(|| vec![0; answers]);
        votes[choice] = votes[choice].saturating_add(1);
        let updated = votes.clone();

        if let Err(e) = self.persist() {
            log::warn!("Failed to persist votes for '{}': {}", title, e);
        }
        Ok(updated)
    }

    pub fn history(&self) -> &BTreeMap<String, Vec<u32>> {
        &self.history
    }

    /// Titles whose stored votes could not be read.
    pub fn unreadable(&self) -> impl Iterator<Item = &str> {
        self.unreadable.keys().map(String::as_str)
    }

    fn persist(&mut self) -> Result<()> {
        if let Some(raw) = self.corrupt.take() {
            let aside = format!("{}{}", self.key, CORRUPT_SUFFIX);
            if let Err(e) = self.store.set(&aside, raw.clone()) {
                // Never replace history that has not been saved somewhere.
                self.corrupt = Some(raw);
                return Err(e);
            }
            log::warn!("Saved unreadable vote history under '{}'", aside);
        }

        let mut entries = self.unreadable.clone();
        for (title, votes) in &self.history {
            entries.insert(title.clone(), Value::from(votes.clone()));
        }
        let json = serde_json::to_string(&entries)
            .map_err(|e| GameError::Storage(e.to_string()))?;
        self.store.set(&self.key, json)
    }

    fn free_title(&self, title: &str) -> String {
        let taken =
            |name: &str| self.unreadable.contains_key(name) || self.history.contains_key(name);
        let mut name = format!("{} (unreadable)", title);
        let mut n = 2;
        while taken(&name) {
            name = format!("{} (unreadable {})", title, n);
            n += 1;
        }
        name
    }
}

/// Store key for the histories of answer sets with `answers` slots.
pub fn votes_key(answers: usize) -> String {
    format!("{}.{}", VOTES_KEY, answers)
}

fn decode_votes(value: &Value, answers: usize) -> Option<Vec<u32>> {
    serde_json::from_value::<Vec<u32>>(value.clone())
        .ok()
        .filter(|votes| votes.len() == answers)
}
