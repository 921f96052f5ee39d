//! Per-pass cache of remote file descriptions

use super::{ArchivalState, DxFile, DxFileDescribe, PlatformClient};
use crate::error::WdlError;
use indexmap::IndexMap;
use std::collections::HashMap;
use tracing::{debug, warn};

/// File descriptions gathered during one compilation pass.
///
/// Populated by batched [`prefetch`](FileInfoCache::prefetch) calls and read
/// afterwards without touching the platform again. Entries are never evicted.
#[derive(Debug, Clone, Default)]
pub struct FileInfoCache {
    entries: HashMap<String, DxFileDescribe>,
    describe_calls: usize,
}

impl FileInfoCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Describe every file not cached yet, in a single platform request.
    pub fn prefetch<C: PlatformClient + ?Sized>(
        &mut self,
        client: &C,
        files: &[DxFile],
    ) -> Result<(), WdlError> {
        let mut missing: IndexMap<&str, DxFile> = IndexMap::new();
        for file in files {
            if !self.entries.contains_key(&file.id) {
                missing.entry(file.id.as_str()).or_insert_with(|| file.clone());
            }
        }
        if missing.is_empty() {
            debug!(requested = files.len(), "all files already described");
            return Ok(());
        }

        let batch: Vec<DxFile> = missing.into_values().collect();
        debug!(requested = files.len(), describing = batch.len(), "describing files");
        let described = client.describe_files(&batch)?;
        self.describe_calls += 1;

        for file in &batch {
            if !described.contains_key(&file.id) {
                return Err(WdlError::platform(format!(
                    "file {} was not found by the platform",
                    file
                )));
            }
        }
        self.entries.extend(described);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&DxFileDescribe> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of describe requests issued so far.
    pub fn describe_calls(&self) -> usize {
        self.describe_calls
    }

    /// The cached description of a live file.
    pub fn ensure_live(&self, file: &DxFile) -> Result<&DxFileDescribe, WdlError> {
        let desc = self.get(&file.id).ok_or_else(|| {
            WdlError::platform(format!("file {} was not described in this pass", file))
        })?;
        if desc.archival_state != ArchivalState::Live {
            warn!(file = %file, state = %desc.archival_state, "file is not live");
            return Err(WdlError::FileNotLive {
                file_id: file.id.clone(),
                state: desc.archival_state.to_string(),
            });
        }
        Ok(desc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::cell::Cell;

    struct FakePlatform {
        archived: Vec<&'static str>,
        calls: Cell<usize>,
    }

    impl FakePlatform {
        fn new(archived: Vec<&'static str>) -> Self {
            Self {
                archived,
                calls: Cell::new(0),
            }
        }
    }

    impl PlatformClient for FakePlatform {
        fn describe_files(
            &self,
            files: &[DxFile],
        ) -> Result<HashMap<String, DxFileDescribe>, WdlError> {
            self.calls.set(self.calls.get() + 1);
            let stamp = Utc.timestamp_millis_opt(1_600_000_000_000).unwrap();
            Ok(files
                .iter()
                .filter(|f| f.id != "file-Missing")
                .map(|f| {
                    let state = if self.archived.contains(&f.id.as_str()) {
                        ArchivalState::Archived
                    } else {
                        ArchivalState::Live
                    };
                    let desc = DxFileDescribe {
                        project: f.project.clone().unwrap_or_else(|| "project-P0".to_string()),
                        id: f.id.clone(),
                        name: format!("{}.txt", f.id),
                        size: 10,
                        created: stamp,
                        modified: stamp,
                        archival_state: state,
                    };
                    (f.id.clone(), desc)
                })
                .collect())
        }
    }

    fn file(id: &str) -> DxFile {
        DxFile::new(Some("project-P1".to_string()), id)
    }

    #[test]
    fn test_prefetch_batches_and_caches() {
        let platform = FakePlatform::new(vec![]);
        let mut cache = FileInfoCache::new();
        cache
            .prefetch(&platform, &[file("file-A"), file("file-B"), file("file-A")])
            .unwrap();
        assert_eq!(platform.calls.get(), 1);
        assert_eq!(cache.len(), 2);

        cache.prefetch(&platform, &[file("file-B")]).unwrap();
        assert_eq!(platform.calls.get(), 1);

        cache.prefetch(&platform, &[file("file-B"), file("file-C")]).unwrap();
        assert_eq!(platform.calls.get(), 2);
        assert_eq!(cache.describe_calls(), 2);
        assert_eq!(cache.get("file-C").unwrap().name, "file-C.txt");
    }

    #[test]
    fn test_ensure_live() {
        let platform = FakePlatform::new(vec!["file-Old"]);
        let mut cache = FileInfoCache::new();
        cache
            .prefetch(&platform, &[file("file-New"), file("file-Old")])
            .unwrap();

        assert!(cache.ensure_live(&file("file-New")).is_ok());
        match cache.ensure_live(&file("file-Old")) {
            Err(WdlError::FileNotLive { file_id, state }) => {
                assert_eq!(file_id, "file-Old");
                assert_eq!(state, "archived");
            }
            other => panic!("expected FileNotLive, got {:?}", other),
        }
        assert!(matches!(
            cache.ensure_live(&file("file-Unseen")),
            Err(WdlError::Platform { .. })
        ));
    }

    #[test]
    fn test_prefetch_missing_file() {
        let platform = FakePlatform::new(vec![]);
        let mut cache = FileInfoCache::new();
        let err = cache.prefetch(&platform, &[file("file-Missing")]).unwrap_err();
        assert!(err.to_string().contains("file-Missing"));
        assert!(cache.is_empty());
    }
}
