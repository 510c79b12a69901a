// 🗄️ Roster Store - Player list persisted as one JSON snapshot
//
// Every mutation rewrites the whole file:
//   players.json.tmp  ← write + fsync
//   players.json      ← rename over
//
// Matching modes:
//   update/delete/get → exact tag (case-sensitive)
//   import            → case-insensitive (see reconciliation.rs)

use parking_lot::RwLock;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::entities::PlayerRecord;
use crate::error::{Result, RosterError};
use crate::parser::{RawCandidateRecord, SourceType};
use crate::reconciliation::{reconcile, ImportDecision, ImportReport, ReconcileOptions};

pub struct RosterStore {
    /// Snapshot file location
    path: PathBuf,

    /// Authoritative roster, in storage order
    players: RwLock<Vec<PlayerRecord>>,
}

impl RosterStore {
    /// Load the snapshot at `path`, creating an empty one if the file is missing.
    ///
    /// A blank file is an empty roster. A file that exists but doesn't decode
    /// is a storage failure; it is never overwritten here.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let players = match fs::read_to_string(&path) {
            Ok(data) if data.trim().is_empty() => Vec::new(),
            Ok(data) => serde_json::from_str::<Vec<PlayerRecord>>(&data)
                .map_err(|e| RosterError::storage(&path, e))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no roster snapshot found, creating empty one");
                write_snapshot(&path, &[])?;
                Vec::new()
            }
            Err(e) => return Err(RosterError::storage(&path, e)),
        };

        info!(path = %path.display(), players = players.len(), "roster loaded");

        Ok(RosterStore {
            path,
            players: RwLock::new(players),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // ========================================================================
    // READS
    // ========================================================================

    /// All players in storage order
    pub fn list_all(&self) -> Vec<PlayerRecord> {
        self.players.read().clone()
    }

    pub fn count(&self) -> usize {
        self.players.read().len()
    }

    /// Exact-tag lookup
    pub fn get(&self, tag: &str) -> Result<PlayerRecord> {
        self.players
            .read()
            .iter()
            .find(|p| p.tag == tag)
            .cloned()
            .ok_or_else(|| RosterError::not_found(tag))
    }

    /// Case-insensitive substring match on tag or any alias
    pub fn search(&self, query: &str) -> Vec<PlayerRecord> {
        self.players
            .read()
            .iter()
            .filter(|p| p.matches_query(query))
            .cloned()
            .collect()
    }

    // ========================================================================
    // MUTATIONS (each one persists the full snapshot before returning)
    // ========================================================================

    /// Append a player. No uniqueness check at this layer.
    pub fn insert(&self, mut player: PlayerRecord) -> Result<PlayerRecord> {
        player.dedup_aliases();
        let mut players = self.players.write();

        let mut next = players.clone();
        next.push(player.clone());
        self.commit(&mut players, next)?;

        debug!(tag = %player.tag, "player inserted");
        Ok(player)
    }

    /// Replace the first player whose tag equals `tag` exactly
    pub fn update(&self, tag: &str, mut player: PlayerRecord) -> Result<PlayerRecord> {
        player.dedup_aliases();
        let mut players = self.players.write();

        let index = players
            .iter()
            .position(|p| p.tag == tag)
            .ok_or_else(|| RosterError::not_found(tag))?;

        let mut next = players.clone();
        next[index] = player.clone();
        self.commit(&mut players, next)?;

        debug!(tag = %tag, "player updated");
        Ok(player)
    }

    /// Remove the first player whose tag equals `tag` exactly. Missing tag is a no-op.
    pub fn delete(&self, tag: &str) -> Result<()> {
        let mut players = self.players.write();

        let index = match players.iter().position(|p| p.tag == tag) {
            Some(i) => i,
            None => {
                debug!(tag = %tag, "player not found, skipping deletion");
                return Ok(());
            }
        };

        let mut next = players.clone();
        next.remove(index);
        self.commit(&mut players, next)?;

        debug!(tag = %tag, "player deleted");
        Ok(())
    }

    /// Empty the roster and persist `[]`. Returns how many players were removed.
    pub fn clear(&self) -> Result<usize> {
        let mut players = self.players.write();
        let before = players.len();

        self.commit(&mut players, Vec::new())?;

        info!(removed = before, "roster cleared");
        Ok(before)
    }

    /// Reconcile a decoded upload against the roster and apply the result.
    ///
    /// The whole batch runs under one write lock against one snapshot and is
    /// persisted once. On storage failure nothing changes, in memory or on disk.
    pub fn import(
        &self,
        rows: &[RawCandidateRecord],
        source: SourceType,
        options: ReconcileOptions,
    ) -> Result<ImportReport> {
        let mut players = self.players.write();

        let plan = reconcile(rows, &players, source.is_structured_json(), options);
        let report = ImportReport::from_plan(&plan);

        if plan.decisions.is_empty() {
            info!(source = source.name(), "{}", report.summary());
            return Ok(report);
        }

        let mut next = players.clone();
        for decision in plan.decisions {
            match decision {
                ImportDecision::Insert(player) => next.push(player),
                ImportDecision::Update { tag, player } => {
                    let index = next
                        .iter()
                        .position(|p| p.tag == tag)
                        .ok_or_else(|| RosterError::not_found(&tag))?;
                    next[index] = player;
                }
            }
        }

        self.commit(&mut players, next)?;

        info!(source = source.name(), "{}", report.summary());
        Ok(report)
    }

    /// Persist `next`, then swap it in. Memory is untouched if the write fails.
    fn commit(&self, players: &mut Vec<PlayerRecord>, next: Vec<PlayerRecord>) -> Result<()> {
        write_snapshot(&self.path, &next)?;
        *players = next;
        Ok(())
    }
}

// ============================================================================
// SNAPSHOT I/O
// ============================================================================

/// Write the roster to a sibling temp file, fsync, then rename over `path`
fn write_snapshot(path: &Path, players: &[PlayerRecord]) -> Result<()> {
    let json = serde_json::to_vec_pretty(players).map_err(|e| RosterError::storage(path, e))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| RosterError::storage(parent, e))?;
    }

    let tmp_path = temp_path(path);

    let write_tmp = || -> io::Result<()> {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(&json)?;
        file.sync_all()?;
        Ok(())
    };
    write_tmp().map_err(|e| RosterError::storage(&tmp_path, e))?;

    fs::rename(&tmp_path, path).map_err(|e| RosterError::storage(path, e))?;

    debug!(path = %path.display(), players = players.len(), "roster snapshot saved");
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "players.json".into());
    name.push(".tmp");
    path.with_file_name(name)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::get_decoder;
    use tempfile::TempDir;

    fn open_store(dir: &TempDir) -> RosterStore {
        RosterStore::open(dir.path().join("players.json")).unwrap()
    }

    fn read_snapshot(store: &RosterStore) -> Vec<PlayerRecord> {
        let data = fs::read_to_string(store.path()).unwrap();
        serde_json::from_str(&data).unwrap()
    }

    #[test]
    fn test_open_missing_file_creates_empty_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("local-data").join("players.json");

        let store = RosterStore::open(&path).unwrap();

        assert!(store.list_all().is_empty());
        assert_eq!(fs::read_to_string(&path).unwrap().trim(), "[]");
    }

    #[test]
    fn test_open_blank_file_is_empty_roster() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("players.json");
        fs::write(&path, "  \n").unwrap();

        let store = RosterStore::open(&path).unwrap();
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_open_corrupt_file_is_storage_failure() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("players.json");
        fs::write(&path, "[{\"tag\": ").unwrap();

        let result = RosterStore::open(&path);
        assert!(matches!(result, Err(RosterError::StorageFailure { .. })));

        // Corrupt snapshot is left for a human to look at
        assert_eq!(fs::read_to_string(&path).unwrap(), "[{\"tag\": ");
    }

    #[test]
    fn test_insert_appends_and_persists() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        store.insert(PlayerRecord::new("Mango")).unwrap();
        store.insert(PlayerRecord::new("Zain")).unwrap();

        let tags: Vec<String> = store.list_all().into_iter().map(|p| p.tag).collect();
        assert_eq!(tags, vec!["Mango", "Zain"]);
        assert_eq!(read_snapshot(&store), store.list_all());
        assert!(!temp_path(store.path()).exists());
    }

    #[test]
    fn test_insert_allows_duplicate_tags() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        store.insert(PlayerRecord::new("Mango")).unwrap();
        store.insert(PlayerRecord::new("Mango")).unwrap();

        assert_eq!(store.count(), 2);
    }

    #[test]
    fn test_update_exact_match() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        store.insert(PlayerRecord::new("Mango")).unwrap();

        let updated = store
            .update("Mango", PlayerRecord::new("Mango").with_venmo("@mango"))
            .unwrap();
        assert_eq!(updated.payment_methods.venmo, "@mango");
        assert_eq!(store.get("Mango").unwrap().payment_methods.venmo, "@mango");
        assert_eq!(read_snapshot(&store)[0].payment_methods.venmo, "@mango");
    }

    #[test]
    fn test_update_is_case_sensitive() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        store.insert(PlayerRecord::new("Mango")).unwrap();

        let result = store.update("mango", PlayerRecord::new("mango"));
        assert!(matches!(result, Err(RosterError::NotFound { .. })));
        assert_eq!(store.list_all()[0].tag, "Mango");
    }

    #[test]
    fn test_update_can_rename_tag() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        store.insert(PlayerRecord::new("Mango")).unwrap();

        store.update("Mango", PlayerRecord::new("Mang0")).unwrap();

        assert!(store.get("Mango").is_err());
        assert!(store.get("Mang0").is_ok());
    }

    #[test]
    fn test_delete_missing_is_noop() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        store.insert(PlayerRecord::new("Mango")).unwrap();
        let before = fs::read_to_string(store.path()).unwrap();

        store.delete("Nobody").unwrap();

        assert_eq!(store.count(), 1);
        assert_eq!(fs::read_to_string(store.path()).unwrap(), before);
    }

    #[test]
    fn test_delete_removes_first_exact_match() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        store.insert(PlayerRecord::new("Mango").with_notes("first")).unwrap();
        store.insert(PlayerRecord::new("Mango").with_notes("second")).unwrap();

        store.delete("Mango").unwrap();

        let remaining = store.list_all();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].notes, "second");
    }

    #[test]
    fn test_clear_empties_memory_and_snapshot() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        store.insert(PlayerRecord::new("Mango")).unwrap();
        store.insert(PlayerRecord::new("Zain")).unwrap();

        let removed = store.clear().unwrap();

        assert_eq!(removed, 2);
        assert!(store.list_all().is_empty());
        assert!(read_snapshot(&store).is_empty());
    }

    #[test]
    fn test_search() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        store.insert(PlayerRecord::new("Hungrybox").with_alias("Juan")).unwrap();
        store.insert(PlayerRecord::new("Mango")).unwrap();

        assert_eq!(store.search("JUAN").len(), 1);
        assert_eq!(store.search("an").len(), 2);
        assert!(store.search("zzz").is_empty());
    }

    #[test]
    fn test_reload_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("players.json");

        let store = RosterStore::open(&path).unwrap();
        store
            .insert(
                PlayerRecord::new("Mango")
                    .with_alias("C9")
                    .with_alias("Mang0")
                    .with_venmo("@mango")
                    .with_paypal("mango@pp")
                    .with_zelle("555")
                    .with_notes("owes $5"),
            )
            .unwrap();
        store.insert(PlayerRecord::new("Zain")).unwrap();
        let saved = store.list_all();
        drop(store);

        let reloaded = RosterStore::open(&path).unwrap();
        assert_eq!(reloaded.list_all(), saved);
    }

    #[test]
    fn test_failed_write_leaves_roster_unchanged() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        store.insert(PlayerRecord::new("Mango")).unwrap();

        // A directory squatting on the temp path makes File::create fail
        fs::create_dir(temp_path(store.path())).unwrap();

        let result = store.insert(PlayerRecord::new("Zain"));
        assert!(matches!(result, Err(RosterError::StorageFailure { .. })));
        assert_eq!(store.count(), 1);
        assert_eq!(read_snapshot(&store).len(), 1);
    }

    #[test]
    fn test_insert_and_update_store_each_alias_once() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        let mut player = PlayerRecord::new("Foo");
        player.aliases = vec!["a".to_string(), "a".to_string()];
        assert_eq!(store.insert(player).unwrap().aliases, vec!["a"]);

        let mut player = PlayerRecord::new("Foo");
        player.aliases = vec!["b".to_string(), "a".to_string(), "b".to_string()];
        store.update("Foo", player).unwrap();

        assert_eq!(store.get("Foo").unwrap().aliases, vec!["b", "a"]);
        assert_eq!(read_snapshot(&store)[0].aliases, vec!["b", "a"]);
    }

    #[test]
    fn test_failed_import_write_leaves_roster_unchanged() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        store.insert(PlayerRecord::new("Mango").with_venmo("@mango")).unwrap();
        let before = fs::read_to_string(store.path()).unwrap();

        fs::create_dir(temp_path(store.path())).unwrap();

        let rows = get_decoder(SourceType::Json)
            .decode(br#"[{"tag":"Zain","venmo":"@zain"},{"tag":"mango","zelle":"555"}]"#)
            .unwrap();
        let result = store.import(&rows, SourceType::Json, ReconcileOptions::default());

        assert!(matches!(result, Err(RosterError::StorageFailure { .. })));
        assert_eq!(store.count(), 1);
        assert_eq!(store.get("Mango").unwrap().payment_methods.zelle, "");
        assert_eq!(fs::read_to_string(store.path()).unwrap(), before);
    }
}
