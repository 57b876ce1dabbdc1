use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use gamex_types::{Product, ProductInput};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{Durability, ProductStore, StoreError, Written};

/// The whole catalog as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default = "first_seq")]
    pub seq: i64,
}

fn first_seq() -> i64 {
    1
}

impl Default for Document {
    fn default() -> Self {
        Self {
            products: Vec::new(),
            seq: first_seq(),
        }
    }
}

/// Catalog kept in a single JSON file.
///
/// Every operation reloads the file, mutates the document and writes it back
/// through a temp file + rename. Storage faults never surface as errors:
/// unreadable files are replaced by an empty document, and writes that cannot
/// reach disk are kept in an in-process shadow copy that later loads serve
/// until a save succeeds again.
///
/// The shadow mutex also serializes load-mutate-save, so concurrent requests
/// within one process cannot lose each other's updates. Separate processes
/// sharing the file are not coordinated.
pub struct JsonStore {
    path: PathBuf,
    tmp_path: PathBuf,
    shadow: Mutex<Option<Document>>,
}

impl JsonStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).ok();
        }

        let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".tmp");
        let tmp_path = path.with_file_name(tmp_name);

        info!("JSON catalog at {}", path.display());
        Self {
            path,
            tmp_path,
            shadow: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current document. Never fails; see the type docs.
    pub fn load(&self) -> Document {
        let mut shadow = self.lock();
        self.load_locked(&mut shadow)
    }

    pub fn save(&self, doc: &Document) -> Durability {
        let mut shadow = self.lock();
        self.save_locked(&mut shadow, doc)
    }

    /// Reserve the next id and persist the bumped counter right away. An id
    /// handed out here is spent even if the caller never inserts a record.
    pub fn next_id(&self) -> Result<Written<i64>, StoreError> {
        let mut shadow = self.lock();
        self.next_id_locked(&mut shadow)
    }

    pub fn add(&self, input: &ProductInput) -> Result<Written<Product>, StoreError> {
        let mut shadow = self.lock();
        let id = self.next_id_locked(&mut shadow)?;

        let product = input
            .normalized()
            .into_product(id.value, chrono::Utc::now().timestamp());

        let mut doc = self.load_locked(&mut shadow);
        doc.products.insert(0, product.clone());
        let durability = self.save_locked(&mut shadow, &doc);

        debug!("Created product {} ({})", product.id, product.title);
        Ok(Written {
            value: product,
            durability: id.durability.and(durability),
        })
    }

    pub fn update(&self, id: i64, input: &ProductInput) -> Written<bool> {
        let mut shadow = self.lock();
        let mut doc = self.load_locked(&mut shadow);

        let Some(product) = doc.products.iter_mut().find(|p| p.id == id) else {
            return Written {
                value: false,
                durability: current_durability(&shadow),
            };
        };
        input.normalized().apply_to(product);

        let durability = self.save_locked(&mut shadow, &doc);
        Written {
            value: true,
            durability,
        }
    }

    pub fn delete(&self, id: i64) -> Written<bool> {
        let mut shadow = self.lock();
        let mut doc = self.load_locked(&mut shadow);

        let before = doc.products.len();
        doc.products.retain(|p| p.id != id);
        if doc.products.len() == before {
            return Written {
                value: false,
                durability: current_durability(&shadow),
            };
        }

        let durability = self.save_locked(&mut shadow, &doc);
        debug!("Deleted product {}", id);
        Written {
            value: true,
            durability,
        }
    }

    pub fn get(&self, id: i64) -> Option<Product> {
        self.load().products.into_iter().find(|p| p.id == id)
    }

    /// Newest first, by construction of `add`.
    pub fn list(&self) -> Vec<Product> {
        self.load().products
    }

    fn lock(&self) -> MutexGuard<'_, Option<Document>> {
        // Poisoning is ignored: the shadow is only a cache of the document.
        self.shadow.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn load_locked(&self, shadow: &mut Option<Document>) -> Document {
        if let Some(doc) = shadow.as_ref() {
            return doc.clone();
        }

        match read_document(&self.path) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(
                    "Catalog file {} unusable ({:#}), resetting to empty",
                    self.path.display(),
                    e
                );
                let doc = Document::default();
                if let Err(e) = self.write_file(&doc) {
                    warn!("Could not rewrite {}: {:#}", self.path.display(), e);
                }
                doc
            }
        }
    }

    fn save_locked(&self, shadow: &mut Option<Document>, doc: &Document) -> Durability {
        match self.write_file(doc) {
            Ok(()) => {
                *shadow = None;
                Durability::Persisted
            }
            Err(e) => {
                warn!(
                    "Catalog not persisted to {} ({:#}); keeping changes in memory",
                    self.path.display(),
                    e
                );
                *shadow = Some(doc.clone());
                Durability::EphemeralOnly
            }
        }
    }

    fn next_id_locked(&self, shadow: &mut Option<Document>) -> Result<Written<i64>, StoreError> {
        let mut doc = self.load_locked(shadow);

        // A hand-edited counter must not hand out an id that is still live.
        let max_live = doc.products.iter().map(|p| p.id).max().unwrap_or(0);
        let allocation = max_live
            .checked_add(1)
            .map(|floor| doc.seq.max(floor))
            .and_then(|id| id.checked_add(1).map(|seq| (id, seq)));

        let Some((id, seq)) = allocation else {
            warn!(
                "No product ids left in {} (seq {}, max id {})",
                self.path.display(),
                doc.seq,
                max_live
            );
            return Err(StoreError::IdsExhausted);
        };
        doc.seq = seq;

        let durability = self.save_locked(shadow, &doc);
        Ok(Written {
            value: id,
            durability,
        })
    }

    /// Temp file + rename, falling back to overwriting the target directly.
    fn write_file(&self, doc: &Document) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(doc).context("serialize catalog")?;

        let atomic = write_synced(&self.tmp_path, &bytes)
            .and_then(|()| fs::rename(&self.tmp_path, &self.path).context("rename temp file"));

        if let Err(e) = atomic {
            debug!("Atomic write failed ({:#}), writing in place", e);
            fs::remove_file(&self.tmp_path).ok();
            write_synced(&self.path, &bytes)?;
        }
        Ok(())
    }
}

/// Durability of a call that wrote nothing: whatever mode the store is in.
fn current_durability(shadow: &Option<Document>) -> Durability {
    if shadow.is_some() {
        Durability::EphemeralOnly
    } else {
        Durability::Persisted
    }
}

fn read_document(path: &Path) -> Result<Document> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let doc = serde_json::from_slice(&bytes).context("parse catalog")?;
    Ok(doc)
}

fn write_synced(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file =
        fs::File::create(path).with_context(|| format!("create {}", path.display()))?;
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}

impl ProductStore for JsonStore {
    fn backend(&self) -> &'static str {
        "json"
    }

    fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        Ok(self.list())
    }

    fn get_product(&self, id: i64) -> Result<Option<Product>, StoreError> {
        Ok(self.get(id))
    }

    fn create_product(&self, input: &ProductInput) -> Result<Written<Product>, StoreError> {
        self.add(input)
    }

    fn update_product(
        &self,
        id: i64,
        input: &ProductInput,
    ) -> Result<Written<bool>, StoreError> {
        Ok(self.update(id, input))
    }

    fn delete_product(&self, id: i64) -> Result<Written<bool>, StoreError> {
        Ok(self.delete(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, JsonStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::open(dir.path().join("data.json"));
        (dir, store)
    }

    fn ids(products: &[Product]) -> Vec<i64> {
        products.iter().map(|p| p.id).collect()
    }

    #[test]
    fn test_catalog_walkthrough() {
        let (_dir, store) = store();

        let gpu = store.add(&ProductInput::new("GPU", "RTX", "", "Computer")).unwrap();
        assert_eq!(gpu.durability, Durability::Persisted);
        let gpu = gpu.value;
        assert_eq!(gpu.id, 1);
        assert_eq!(gpu.title, "GPU");
        assert_eq!(gpu.desc, "RTX");
        assert_eq!(gpu.photo, "");
        assert_eq!(gpu.category, "Computer");
        assert!(gpu.created_at.is_some());

        let mouse = store.add(&ProductInput::new("Mouse", "", "", "BadCategory")).unwrap().value;
        assert_eq!(mouse.id, 2);
        assert_eq!(mouse.category, "Second Hand");

        assert_eq!(store.list(), vec![mouse.clone(), gpu]);

        assert!(store.delete(1).value);
        assert_eq!(store.list(), vec![mouse]);
    }

    #[test]
    fn test_missing_file_loads_default_and_repairs() {
        let (_dir, store) = store();
        assert!(!store.path().exists());

        assert_eq!(store.load(), Document::default());
        let on_disk: Document =
            serde_json::from_slice(&fs::read(store.path()).unwrap()).unwrap();
        assert_eq!(on_disk, Document::default());
    }

    #[test]
    fn test_empty_file_self_repairs() {
        let (_dir, store) = store();
        fs::write(store.path(), b"").unwrap();

        let doc = store.load();
        assert!(doc.products.is_empty());
        assert_eq!(doc.seq, 1);
        assert!(!fs::read(store.path()).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_json_self_repairs() {
        let (_dir, store) = store();
        fs::write(store.path(), b"{\"products\": [ {\"id\": ").unwrap();

        assert_eq!(store.load(), Document::default());
        assert_eq!(read_document(store.path()).unwrap(), Document::default());
    }

    #[test]
    fn test_save_load_round_trip_preserves_order() {
        let (_dir, store) = store();
        let doc = Document {
            products: vec![
                ProductInput::new("c", "", "", "Tabs").normalized().into_product(9, 300),
                ProductInput::new("a", "x", "/a.png", "Printer")
                    .normalized()
                    .into_product(4, 100),
                ProductInput::new("b", "", "", "Accessories")
                    .normalized()
                    .into_product(7, 200),
            ],
            seq: 10,
        };

        assert_eq!(store.save(&doc), Durability::Persisted);
        assert_eq!(store.load(), doc);
        assert!(!store.tmp_path.exists());
    }

    #[test]
    fn test_reads_existing_deployed_file() {
        let (_dir, store) = store();
        let raw = r#"{
  "products": [
    {"id": 5, "title": "Old Tab", "desc": "", "photo": "", "category": "Legacy", "created_at": 1700000000}
  ],
  "seq": 6
}"#;
        fs::write(store.path(), raw).unwrap();

        let product = store.get(5).unwrap();
        // Out-of-set values are only coerced on write.
        assert_eq!(product.category, "Legacy");
        assert_eq!(product.created_at, Some(1_700_000_000));
        assert_eq!(store.add(&ProductInput::new("New", "", "", "Tabs")).unwrap().value.id, 6);
    }

    #[test]
    fn test_ids_increase_across_abandoned_allocations() {
        let (_dir, store) = store();

        let first = store.add(&ProductInput::new("a", "", "", "Tabs")).unwrap().value.id;
        let spent = store.next_id().unwrap().value;
        assert_eq!(spent, first + 1);

        let next = store.add(&ProductInput::new("b", "", "", "Tabs")).unwrap().value.id;
        assert!(next > spent);
        assert_eq!(store.load().seq, next + 1);
    }

    #[test]
    fn test_ids_not_reused_after_delete() {
        let (_dir, store) = store();
        let a = store.add(&ProductInput::new("a", "", "", "Tabs")).unwrap().value;
        store.delete(a.id);
        let b = store.add(&ProductInput::new("b", "", "", "Tabs")).unwrap().value;
        assert!(b.id > a.id);
    }

    #[test]
    fn test_counter_behind_live_ids_is_skipped_forward() {
        let (_dir, store) = store();
        let doc = Document {
            products: vec![ProductInput::new("x", "", "", "Tabs").normalized().into_product(3, 1)],
            seq: 2,
        };
        store.save(&doc);

        assert_eq!(store.next_id().unwrap().value, 4);
    }

    #[test]
    fn test_update() {
        let (_dir, store) = store();
        let original = store.add(&ProductInput::new("GPU", "", "", "Computer")).unwrap().value;

        let result = store.update(original.id, &ProductInput::new(" GPU Ti ", "fast", "", "Nope"));
        assert!(result.value);
        assert_eq!(result.durability, Durability::Persisted);

        let updated = store.get(original.id).unwrap();
        assert_eq!(updated.title, "GPU Ti");
        assert_eq!(updated.desc, "fast");
        assert_eq!(updated.category, "Second Hand");
        assert_eq!(updated.created_at, original.created_at);
    }

    #[test]
    fn test_update_missing_leaves_store_unchanged() {
        let (_dir, store) = store();
        store.add(&ProductInput::new("GPU", "", "", "Computer")).unwrap();
        let before = store.load();

        assert!(!store.update(99, &ProductInput::new("X", "", "", "Tabs")).value);
        assert_eq!(store.load(), before);
    }

    #[test]
    fn test_delete_missing_and_existing() {
        let (_dir, store) = store();
        let a = store.add(&ProductInput::new("a", "", "", "Tabs")).unwrap().value;
        store.add(&ProductInput::new("b", "", "", "Tabs")).unwrap();

        assert!(!store.delete(42).value);
        assert_eq!(store.list().len(), 2);

        assert!(store.delete(a.id).value);
        assert_eq!(store.get(a.id), None);
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn test_list_is_newest_first() {
        let (_dir, store) = store();
        for title in ["a", "b", "c"] {
            store.add(&ProductInput::new(title, "", "", "Tabs")).unwrap();
        }
        assert_eq!(ids(&store.list()), vec![3, 2, 1]);
    }

    #[test]
    fn test_unwritable_location_stays_in_memory() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the parent directory should be makes every write fail.
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"").unwrap();
        let store = JsonStore::open(blocker.join("data.json"));

        assert_eq!(store.load(), Document::default());

        let created = store.add(&ProductInput::new("GPU", "", "", "Computer")).unwrap();
        assert_eq!(created.durability, Durability::EphemeralOnly);
        assert_eq!(created.value.id, 1);

        let second = store.add(&ProductInput::new("Mouse", "", "", "Tabs")).unwrap();
        assert_eq!(second.value.id, 2);
        assert_eq!(ids(&store.list()), vec![2, 1]);

        let deleted = store.delete(1);
        assert!(deleted.value);
        assert_eq!(deleted.durability, Durability::EphemeralOnly);
        assert_eq!(ids(&store.list()), vec![2]);

        // Misses write nothing, but the catalog being served is still in memory only.
        let missed = store.update(99, &ProductInput::new("X", "", "", "Tabs"));
        assert!(!missed.value);
        assert_eq!(missed.durability, Durability::EphemeralOnly);
        let missed = store.delete(99);
        assert!(!missed.value);
        assert_eq!(missed.durability, Durability::EphemeralOnly);
    }

    #[test]
    fn test_misses_on_durable_store_report_persisted() {
        let (_dir, store) = store();
        store.add(&ProductInput::new("a", "", "", "Tabs")).unwrap();

        assert_eq!(
            store.update(99, &ProductInput::new("X", "", "", "Tabs")).durability,
            Durability::Persisted
        );
        assert_eq!(store.delete(99).durability, Durability::Persisted);
    }

    #[test]
    fn test_blocked_temp_file_falls_back_to_direct_write() {
        let (_dir, store) = store();
        fs::create_dir(&store.tmp_path).unwrap();

        let created = store.add(&ProductInput::new("GPU", "", "", "Computer")).unwrap();
        assert_eq!(created.durability, Durability::Persisted);

        let on_disk = read_document(store.path()).unwrap();
        assert_eq!(on_disk.products, vec![created.value]);
        assert_eq!(on_disk.seq, 2);
        assert!(store.tmp_path.is_dir());
    }

    #[test]
    fn test_exhausted_ids_fail_without_touching_the_file() {
        let (_dir, store) = store();
        let raw = format!(
            r#"{{"products":[{{"id":{},"title":"Max","desc":"","photo":"","category":"Tabs","created_at":1}}],"seq":1}}"#,
            i64::MAX
        );
        fs::write(store.path(), &raw).unwrap();

        let err = store.add(&ProductInput::new("New", "", "", "Tabs")).unwrap_err();
        assert!(matches!(err, StoreError::IdsExhausted));
        assert!(matches!(store.next_id(), Err(StoreError::IdsExhausted)));
        assert_eq!(fs::read_to_string(store.path()).unwrap(), raw);

        let doc = Document {
            products: Vec::new(),
            seq: i64::MAX,
        };
        store.save(&doc);
        assert!(matches!(store.next_id(), Err(StoreError::IdsExhausted)));
        assert_eq!(store.load(), doc);
    }

    #[test]
    fn test_concurrent_adds_keep_every_record() {
        let (_dir, store) = store();
        let store = std::sync::Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    store.add(&ProductInput::new(format!("p{i}"), "", "", "Tabs")).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut all = ids(&store.list());
        all.sort();
        assert_eq!(all, (1..=8).collect::<Vec<_>>());
    }
}
