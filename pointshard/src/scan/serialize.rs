//! Persisting analyzed sources as keyed records.

use crate::pool::Pool;
use crate::source::Source;
use crate::storage::Endpoint;
use std::collections::HashSet;
use std::path::Path;
use tracing::error;

/// Write one record per source into the endpoint.
///
/// Keys are the path stems (`"{stem}.json"`) when every stem is distinct,
/// which keeps records human-readable and stable. Any collision falls back
/// to positional keys (`"{index}.json"`) for the whole batch, sacrificing
/// readability for guaranteed uniqueness. Writes are dispatched across the worker pool and
/// the call blocks until every write has completed; individual write
/// failures are logged and never abort the batch.
pub fn serialize(sources: &[Source], endpoint: &Endpoint, threads: usize) {
    let unique = stems_unique(sources);

    let pool = Pool::new(threads);
    for (index, source) in sources.iter().enumerate() {
        let key = if unique {
            format!("{}.json", stem(&source.path))
        } else {
            format!("{index}.json")
        };

        let body = match serde_json::to_vec_pretty(source) {
            Ok(body) => body,
            Err(e) => {
                error!("skipping record '{}': {}", key, e);
                continue;
            }
        };

        let endpoint = endpoint.clone();
        pool.add(move || {
            if let Err(e) = endpoint.put(&key, &body) {
                error!("failed to write record '{}': {}", key, e);
            }
        });
    }
    pool.join();
}

/// The filename stem of a path: basename without its extension.
fn stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn stems_unique(sources: &[Source]) -> bool {
    let mut seen = HashSet::new();
    sources.iter().all(|source| seen.insert(stem(&source.path)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::FsStorage;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn endpoint(dir: &TempDir) -> Endpoint {
        Endpoint::new(
            Arc::new(FsStorage::new()),
            dir.path().to_string_lossy().into_owned(),
        )
    }

    #[test]
    fn test_stem() {
        assert_eq!(stem("a/b.laz"), "b");
        assert_eq!(stem("b.laz"), "b");
        assert_eq!(stem("dir/noext"), "noext");
    }

    #[test]
    fn test_unique_stems_use_stem_keys() {
        let dir = TempDir::new().unwrap();
        let sources = vec![Source::new("a.laz"), Source::new("b.laz")];

        serialize(&sources, &endpoint(&dir), 2);

        assert!(dir.path().join("a.json").exists());
        assert!(dir.path().join("b.json").exists());
    }

    #[test]
    fn test_duplicate_stems_fall_back_to_positions() {
        let dir = TempDir::new().unwrap();
        let sources = vec![Source::new("a/b.laz"), Source::new("c/b.laz")];

        serialize(&sources, &endpoint(&dir), 2);

        assert!(dir.path().join("0.json").exists());
        assert!(dir.path().join("1.json").exists());
        assert!(!dir.path().join("b.json").exists());
    }

    #[test]
    fn test_records_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut source = Source::new("a.laz");
        source.info.points = 99;
        source.info.srs = "EPSG:3857".to_string();

        serialize(std::slice::from_ref(&source), &endpoint(&dir), 1);

        let body = std::fs::read(dir.path().join("a.json")).unwrap();
        let back: Source = serde_json::from_slice(&body).unwrap();
        assert_eq!(back, source);
    }

    #[test]
    fn test_write_failure_does_not_abort_batch() {
        let dir = TempDir::new().unwrap();
        // Root the endpoint at a file path so every write under it fails.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let bad = Endpoint::new(
            Arc::new(FsStorage::new()),
            blocker.to_string_lossy().into_owned(),
        );

        let sources = vec![Source::new("a.laz"), Source::new("b.laz")];
        // Must return normally despite both writes failing.
        serialize(&sources, &bad, 2);
    }
}
