use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use tokio::time::{Duration, interval};

use crate::error::StoreError;
use crate::models::CounterRecord;
use crate::store::CounterStore;

// Read the counter snapshot, a missing file is an empty store
pub fn load(path: &Path) -> Result<Vec<CounterRecord>, StoreError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    if file.metadata()?.len() == 0 {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

// Write to a sibling temp file and rename it over the snapshot
pub fn save(path: &Path, records: &[CounterRecord]) -> Result<(), StoreError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = Path::new(&tmp);

    let mut writer = BufWriter::new(File::create(tmp)?);
    serde_json::to_writer(&mut writer, records)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    drop(writer);

    fs::rename(tmp, path)?;
    Ok(())
}

// Flushes the store on a fixed interval until the runtime shuts down
pub async fn snapshot_writer(store: Arc<dyn CounterStore>, every: Duration) {
    let mut ticker = interval(every);
    // first tick fires immediately
    ticker.tick().await;

    tracing::info!(interval = ?every, "snapshot writer started");

    loop {
        ticker.tick().await;

        let task_store = Arc::clone(&store);
        match tokio::task::spawn_blocking(move || task_store.flush()).await {
            Ok(Ok(())) => tracing::debug!(records = store.len(), "snapshot flushed"),
            Ok(Err(e)) => tracing::error!(error = %e, "snapshot flush failed"),
            Err(e) => tracing::error!(error = %e, "snapshot task aborted"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn record(id: u64, name: &str, requests: u64) -> CounterRecord {
        CounterRecord {
            id,
            timestamp: 1_700_000_000,
            name: name.to_string(),
            requests,
        }
    }

    #[test]
    fn missing_or_empty_file_loads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        assert!(load(&path).unwrap().is_empty());

        File::create(&path).unwrap();
        assert!(load(&path).unwrap().is_empty());
    }

    #[test]
    fn save_replaces_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counters.json");

        save(&path, &[record(1, "a.com", 1)]).unwrap();
        save(&path, &[record(1, "a.com", 4), record(2, "b.com", 2)]).unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded, vec![record(1, "a.com", 4), record(2, "b.com", 2)]);
        assert!(!dir.path().join("counters.json.tmp").exists());
    }

    #[test]
    fn corrupt_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counters.json");
        fs::write(&path, b"{not json").unwrap();

        assert!(matches!(load(&path), Err(StoreError::Snapshot(_))));
    }

    #[tokio::test]
    async fn writer_flushes_on_interval() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counters.json");
        let store = Arc::new(MemoryStore::open(Some(path.clone())).unwrap());
        store.upsert(1, "a.com", 2).unwrap();

        let writer = tokio::spawn(snapshot_writer(store, Duration::from_millis(20)));

        let mut loaded = Vec::new();
        for _ in 0..250 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            loaded = load(&path).unwrap();
            if !loaded.is_empty() {
                break;
            }
        }
        writer.abort();

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].requests, 2);
    }
}
