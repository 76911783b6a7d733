use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::warn;

use crate::error::HarvestError;
use crate::export::StoreSchema;

/// Append-only CSV file holding one category of harvested rows.
#[derive(Debug, Clone)]
pub struct RecordStore {
    path: PathBuf,
    schema: StoreSchema,
}

impl RecordStore {
    pub fn new(path: impl Into<PathBuf>, schema: StoreSchema) -> Self {
        Self {
            path: path.into(),
            schema,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn schema(&self) -> &StoreSchema {
        &self.schema
    }

    /// Every distinct value of the key column. A missing file is an empty set;
    /// a file whose key column cannot be read is ledger corruption.
    pub fn read_keys(&self) -> Result<HashSet<String>, HarvestError> {
        if !self.path.exists() {
            return Ok(HashSet::new());
        }
        self.scan_keys().map_err(|err| HarvestError::LedgerCorruption {
            path: self.path.clone(),
            reason: format!("{err:#}"),
        })
    }

    fn scan_keys(&self) -> Result<HashSet<String>> {
        let mut keys = HashSet::new();
        let raw = fs::read(&self.path)
            .with_context(|| format!("read store {}", self.path.display()))?;
        if raw.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(keys);
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(raw.as_slice());
        let headers = reader.headers().context("read header row")?.clone();
        let idx = headers
            .iter()
            .position(|h| h.trim() == self.schema.key_column)
            .ok_or_else(|| anyhow!("no `{}` column in header", self.schema.key_column))?;

        for (line, record) in reader.records().enumerate() {
            let record = record.with_context(|| format!("decode data row {}", line + 1))?;
            if let Some(key) = record.get(idx).map(str::trim)
                && !key.is_empty()
            {
                keys.insert(key.to_string());
            }
        }
        Ok(keys)
    }

    /// Serializes `rows` in memory and appends them with a single write.
    /// The header goes out only when the file is new or holds no data. A
    /// failed write is truncated away, so the file never keeps part of a block.
    pub fn append_block(&self, rows: &[Vec<String>]) -> Result<usize, HarvestError> {
        if rows.is_empty() {
            return Ok(0);
        }
        self.write_block(rows).map_err(|source| self.io_error(source))?;
        Ok(rows.len())
    }

    /// Current end of the stored data, for a later `rollback`.
    pub fn mark(&self) -> Result<StoreMark, HarvestError> {
        let len = data_extent(&self.path)
            .map_err(|source| self.io_error(source))?
            .map_or(0, |(len, _)| len);
        Ok(StoreMark { len })
    }

    /// Drops everything appended after `mark`.
    pub fn rollback(&self, mark: StoreMark) -> Result<(), HarvestError> {
        if !self.path.is_file() {
            return Ok(());
        }
        truncate(&self.path, mark.len).map_err(|source| self.io_error(source))
    }

    fn io_error(&self, source: anyhow::Error) -> HarvestError {
        HarvestError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn write_block(&self, rows: &[Vec<String>]) -> Result<()> {
        let extent = data_extent(&self.path)?;
        let mut buf = Vec::new();
        if let Some((_, tail)) = extent
            && tail != b'\n'
        {
            buf.push(b'\n');
        }

        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(buf);
        if extent.is_none() {
            writer
                .write_record(self.schema.columns)
                .context("serialize header")?;
        }
        for row in rows {
            if row.len() != self.schema.columns.len() {
                return Err(anyhow!(
                    "row has {} fields, {} expects {}",
                    row.len(),
                    self.schema.name,
                    self.schema.columns.len()
                ));
            }
            writer.write_record(row).context("serialize row")?;
        }
        let buf = writer
            .into_inner()
            .map_err(|err| anyhow!("flush row buffer: {}", err.error()))?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open {}", self.path.display()))?;
        // Whitespace-only files are reset so the header lands on the first line.
        let start = extent.map_or(0, |(len, _)| len);
        if file.metadata().context("stat store")?.len() != start {
            file.set_len(start).context("reset blank store")?;
        }
        if let Err(err) = file.write_all(&buf).and_then(|()| file.sync_data()) {
            if let Err(undo) = file.set_len(start) {
                warn!(store = %self.path.display(), error = %undo, "partial block left in store");
            }
            return Err(err).context("append block");
        }
        Ok(())
    }
}

/// Length of a store at a point in time; see `RecordStore::mark`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreMark {
    len: u64,
}

impl StoreMark {
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

// Length and last byte of the file, or None when it is missing or holds
// only whitespace.
fn data_extent(path: &Path) -> Result<Option<(u64, u8)>> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err).with_context(|| format!("open {}", path.display())),
    };
    let len = file.metadata().context("stat store")?.len();
    let mut has_data = false;
    for byte in BufReader::new(&mut file).bytes() {
        if !byte.context("scan store")?.is_ascii_whitespace() {
            has_data = true;
            break;
        }
    }
    if !has_data {
        return Ok(None);
    }
    file.seek(SeekFrom::End(-1)).context("seek store tail")?;
    let mut byte = [0u8; 1];
    file.read_exact(&mut byte).context("read store tail")?;
    Ok(Some((len, byte[0])))
}

fn truncate(path: &Path, len: u64) -> Result<()> {
    let file = OpenOptions::new()
        .write(true)
        .open(path)
        .with_context(|| format!("open {}", path.display()))?;
    file.set_len(len)
        .with_context(|| format!("truncate {}", path.display()))?;
    file.sync_data().context("sync store")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::{EVENTS_SCHEMA, StoreSchema};

    const TINY: StoreSchema = StoreSchema {
        name: "tiny",
        key_column: "key",
        columns: &["key", "value"],
    };

    fn row(key: &str, value: &str) -> Vec<String> {
        vec![key.to_string(), value.to_string()]
    }

    #[test]
    fn header_is_written_once_and_quotes_are_doubled() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::new(dir.path().join("out.csv"), TINY);
        store.append_block(&[row("a", "plain")]).unwrap();
        store
            .append_block(&[row("b", "say \"hi\", twice"), row("b", "x")])
            .unwrap();

        let text = fs::read_to_string(store.path()).unwrap();
        assert_eq!(text, "key,value\na,plain\nb,\"say \"\"hi\"\", twice\"\nb,x\n");
        let keys = store.read_keys().unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains("a") && keys.contains("b"));
    }

    #[test]
    fn missing_newline_from_older_writer_is_repaired() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        fs::write(&path, "key,value\n\"a\",1").unwrap();
        let store = RecordStore::new(&path, TINY);
        store.append_block(&[row("b", "2")]).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "key,value\n\"a\",1\nb,2\n");
        assert_eq!(store.read_keys().unwrap().len(), 2);
    }

    #[test]
    fn blank_store_gets_a_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        fs::write(&path, "\n").unwrap();
        let store = RecordStore::new(&path, TINY);
        assert!(store.read_keys().unwrap().is_empty());
        assert!(store.mark().unwrap().is_empty());

        store.append_block(&[row("a", "1")]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "key,value\na,1\n");
        store.append_block(&[row("b", "2")]).unwrap();
        let keys = store.read_keys().unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains("a") && keys.contains("b"));
    }

    #[test]
    fn rollback_drops_blocks_after_mark() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::new(dir.path().join("out.csv"), TINY);
        let empty = store.mark().unwrap();
        store.append_block(&[row("a", "1")]).unwrap();
        let after_a = store.mark().unwrap();
        store.append_block(&[row("b", "2"), row("b", "3")]).unwrap();

        store.rollback(after_a).unwrap();
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "key,value\na,1\n");
        store.rollback(empty).unwrap();
        assert!(store.read_keys().unwrap().is_empty());
        store.append_block(&[row("c", "4")]).unwrap();
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "key,value\nc,4\n");
    }

    #[test]
    fn missing_key_column_is_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.csv");
        fs::write(&path, "url,minute\nm1,3\n").unwrap();
        let store = RecordStore::new(&path, EVENTS_SCHEMA);
        let err = store.read_keys().unwrap_err();
        assert!(matches!(err, HarvestError::LedgerCorruption { .. }));
    }

    #[test]
    fn missing_and_empty_files_have_no_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::new(dir.path().join("none.csv"), TINY);
        assert!(store.read_keys().unwrap().is_empty());
        fs::write(store.path(), "").unwrap();
        assert!(store.read_keys().unwrap().is_empty());
        assert_eq!(store.append_block(&[]).unwrap(), 0);
    }

    #[test]
    fn wrong_width_rows_are_rejected_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::new(dir.path().join("out.csv"), TINY);
        let err = store
            .append_block(&[row("a", "1"), vec!["b".to_string()]])
            .unwrap_err();
        assert!(matches!(err, HarvestError::Io { .. }));
        assert!(!store.path().exists());
    }
}
