//! SQLite-backed room directory.
//!
//! One row per canonical room id. Rows are only ever written from the
//! arbitrator loop; the mutex just satisfies `Sync`.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use parrot_core::{ParrotError, Result};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};

/// Liveness of a directory row. Stored as the integers 0/1/2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AliveState {
    Unknown,
    Alive,
    Dead,
}

impl AliveState {
    pub fn as_i64(self) -> i64 {
        match self {
            AliveState::Unknown => 0,
            AliveState::Alive => 1,
            AliveState::Dead => 2,
        }
    }

    pub fn from_i64(value: i64) -> Self {
        match value {
            1 => AliveState::Alive,
            2 => AliveState::Dead,
            _ => AliveState::Unknown,
        }
    }
}

/// Fresh numbers reported by a probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomStats {
    pub title: String,
    pub users: i64,
    pub files: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomRecord {
    pub room: String,
    pub title: String,
    pub users: i64,
    pub files: i64,
    pub alive: AliveState,
    /// Unix millis.
    pub first_added: i64,
}

impl RoomRecord {
    pub fn new(room: &str, stats: &RoomStats, first_added: i64) -> Self {
        Self {
            room: room.to_string(),
            title: stats.title.clone(),
            users: stats.users,
            files: stats.files,
            alive: AliveState::Alive,
            first_added,
        }
    }
}

pub struct RoomDirectory {
    conn: Mutex<Connection>,
}

fn store_err(e: impl std::fmt::Display) -> ParrotError {
    ParrotError::Store(e.to_string())
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<RoomRecord> {
    Ok(RoomRecord {
        room: row.get(0)?,
        title: row.get(1)?,
        users: row.get(2)?,
        files: row.get(3)?,
        alive: AliveState::from_i64(row.get(4)?),
        first_added: row.get(5)?,
    })
}

const SELECT_COLUMNS: &str = "SELECT room, title, users, files, alive, firstadded FROM rooms";

impl RoomDirectory {
    /// Open or create the directory database.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(store_err)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory().map_err(store_err)?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let dir = Self { conn: Mutex::new(conn) };
        dir.migrate()?;
        Ok(dir)
    }

    fn migrate(&self) -> Result<()> {
        self.conn()?
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS rooms (
                    room TEXT PRIMARY KEY,
                    title TEXT NOT NULL DEFAULT '',
                    users INTEGER NOT NULL DEFAULT 0,
                    files INTEGER NOT NULL DEFAULT 0,
                    alive INTEGER NOT NULL DEFAULT 1,   -- 0 unknown, 1 alive, 2 dead
                    firstadded INTEGER NOT NULL DEFAULT 0
                );
                CREATE INDEX IF NOT EXISTS rooms_alive ON rooms (alive);",
            )
            .map_err(store_err)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(store_err)
    }

    pub fn get(&self, room: &str) -> Result<Option<RoomRecord>> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("{SELECT_COLUMNS} WHERE room = ?1"),
            params![room],
            row_to_record,
        )
        .optional()
        .map_err(store_err)
    }

    pub fn contains(&self, room: &str) -> Result<bool> {
        Ok(self.get(room)?.is_some())
    }

    pub fn count(&self) -> Result<usize> {
        let conn = self.conn()?;
        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM rooms", [], |r| r.get(0))
            .map_err(store_err)?;
        Ok(n as usize)
    }

    /// Insert unless a row with the same id exists. Returns whether it inserted.
    pub fn upsert_if_absent(&self, record: &RoomRecord) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn
            .execute(
                "INSERT OR IGNORE INTO rooms (room, title, users, files, alive, firstadded)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.room,
                    record.title,
                    record.users,
                    record.files,
                    record.alive.as_i64(),
                    record.first_added,
                ],
            )
            .map_err(store_err)?;
        Ok(changed == 1)
    }

    /// Refresh stats in place and mark the room alive.
    pub fn update_stats(&self, room: &str, stats: &RoomStats) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn
            .execute(
                "UPDATE rooms SET title = ?1, users = ?2, files = ?3, alive = 1 WHERE room = ?4",
                params![stats.title, stats.users, stats.files, room],
            )
            .map_err(store_err)?;
        Ok(changed == 1)
    }

    /// Move `old` to its canonical id `canonical`, carrying the fresh stats.
    ///
    /// The `old` row is removed. If `canonical` already exists it is updated
    /// in place, otherwise it is inserted with `old`'s first-added time.
    pub fn migrate_canonical(&self, old: &str, canonical: &str, stats: &RoomStats) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(store_err)?;

        let first_added: Option<i64> = tx
            .query_row(
                "SELECT firstadded FROM rooms WHERE room = ?1",
                params![old],
                |r| r.get(0),
            )
            .optional()
            .map_err(store_err)?;
        tx.execute("DELETE FROM rooms WHERE room = ?1", params![old])
            .map_err(store_err)?;

        let updated = tx
            .execute(
                "UPDATE rooms SET title = ?1, users = ?2, files = ?3, alive = 1 WHERE room = ?4",
                params![stats.title, stats.users, stats.files, canonical],
            )
            .map_err(store_err)?;
        if updated == 0 {
            tx.execute(
                "INSERT INTO rooms (room, title, users, files, alive, firstadded)
                 VALUES (?1, ?2, ?3, ?4, 1, ?5)",
                params![
                    canonical,
                    stats.title,
                    stats.users,
                    stats.files,
                    first_added.unwrap_or_else(|| chrono::Utc::now().timestamp_millis()),
                ],
            )
            .map_err(store_err)?;
        }

        tx.commit().map_err(store_err)
    }

    fn set_alive(&self, room: &str, state: AliveState) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn
            .execute(
                "UPDATE rooms SET alive = ?1 WHERE room = ?2",
                params![state.as_i64(), room],
            )
            .map_err(store_err)?;
        Ok(changed == 1)
    }

    pub fn mark_dead(&self, room: &str) -> Result<bool> {
        self.set_alive(room, AliveState::Dead)
    }

    pub fn mark_unknown(&self, room: &str) -> Result<bool> {
        self.set_alive(room, AliveState::Unknown)
    }

    pub fn delete(&self, room: &str) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn
            .execute("DELETE FROM rooms WHERE room = ?1", params![room])
            .map_err(store_err)?;
        Ok(changed == 1)
    }

    /// Alive rooms, optionally excluding one room and filtering titles by a
    /// case-insensitive substring. Unordered; ranking is the caller's job.
    pub fn list_alive(&self, exclude: Option<&str>, title_filter: Option<&str>) -> Result<Vec<RoomRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!("{SELECT_COLUMNS} WHERE alive = 1 AND room <> ?1"))
            .map_err(store_err)?;
        let rows = stmt
            .query_map(params![exclude.unwrap_or("")], row_to_record)
            .map_err(store_err)?;

        let needle = title_filter.map(str::to_lowercase);
        let mut rooms = Vec::new();
        for row in rows {
            let record = row.map_err(store_err)?;
            if let Some(needle) = &needle
                && !record.title.to_lowercase().contains(needle.as_str())
            {
                continue;
            }
            rooms.push(record);
        }
        Ok(rooms)
    }

    /// Ids of every room that is not dead, most popular first.
    pub fn refresh_candidates(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT room FROM rooms WHERE alive <> 2 ORDER BY users DESC, files DESC, room ASC")
            .map_err(store_err)?;
        let rows = stmt.query_map([], |r| r.get(0)).map_err(store_err)?;
        rows.collect::<rusqlite::Result<Vec<String>>>().map_err(store_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(title: &str, users: i64, files: i64) -> RoomStats {
        RoomStats {
            title: title.into(),
            users,
            files,
        }
    }

    #[test]
    fn test_open_on_disk() {
        let dir = std::env::temp_dir().join("parrot-test-directory");
        std::fs::remove_dir_all(&dir).ok();
        let db = RoomDirectory::open(&dir.join("rooms.db")).unwrap();
        assert_eq!(db.count().unwrap(), 0);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_upsert_if_absent_never_duplicates() {
        let db = RoomDirectory::open_in_memory().unwrap();
        let first = RoomRecord::new("abc", &stats("first", 5, 1), 1);
        let second = RoomRecord::new("abc", &stats("second", 9, 9), 2);
        assert!(db.upsert_if_absent(&first).unwrap());
        assert!(!db.upsert_if_absent(&second).unwrap());
        assert_eq!(db.count().unwrap(), 1);
        assert_eq!(db.get("abc").unwrap().unwrap().title, "first");
    }

    #[test]
    fn test_update_stats_marks_alive() {
        let db = RoomDirectory::open_in_memory().unwrap();
        db.upsert_if_absent(&RoomRecord::new("abc", &stats("t", 1, 1), 1)).unwrap();
        db.mark_unknown("abc").unwrap();
        assert_eq!(db.get("abc").unwrap().unwrap().alive, AliveState::Unknown);

        assert!(db.update_stats("abc", &stats("new", 7, 3)).unwrap());
        let rec = db.get("abc").unwrap().unwrap();
        assert_eq!(rec.alive, AliveState::Alive);
        assert_eq!((rec.title.as_str(), rec.users, rec.files), ("new", 7, 3));
        assert!(!db.update_stats("missing", &stats("x", 1, 1)).unwrap());
    }

    #[test]
    fn test_migrate_canonical_inserts_new_id() {
        let db = RoomDirectory::open_in_memory().unwrap();
        db.upsert_if_absent(&RoomRecord::new("alias", &stats("old", 1, 1), 42)).unwrap();
        db.migrate_canonical("alias", "canon", &stats("fresh", 10, 20)).unwrap();

        assert!(db.get("alias").unwrap().is_none());
        let rec = db.get("canon").unwrap().unwrap();
        assert_eq!(rec.title, "fresh");
        assert_eq!(rec.first_added, 42);
        assert_eq!(db.count().unwrap(), 1);
    }

    #[test]
    fn test_migrate_canonical_updates_existing_id() {
        let db = RoomDirectory::open_in_memory().unwrap();
        db.upsert_if_absent(&RoomRecord::new("alias", &stats("old", 1, 1), 42)).unwrap();
        db.upsert_if_absent(&RoomRecord::new("canon", &stats("canon", 2, 2), 7)).unwrap();
        db.migrate_canonical("alias", "canon", &stats("fresh", 10, 20)).unwrap();

        assert_eq!(db.count().unwrap(), 1);
        let rec = db.get("canon").unwrap().unwrap();
        assert_eq!((rec.users, rec.files, rec.first_added), (10, 20, 7));
    }

    #[test]
    fn test_list_alive_excludes_and_filters() {
        let db = RoomDirectory::open_in_memory().unwrap();
        db.upsert_if_absent(&RoomRecord::new("home", &stats("Home Room", 3, 3), 1)).unwrap();
        db.upsert_if_absent(&RoomRecord::new("anime", &stats("ANIME dump", 3, 3), 1)).unwrap();
        db.upsert_if_absent(&RoomRecord::new("music", &stats("music", 3, 3), 1)).unwrap();
        db.upsert_if_absent(&RoomRecord::new("stale", &stats("anime too", 3, 3), 1)).unwrap();
        db.mark_unknown("stale").unwrap();

        let mut all: Vec<String> = db
            .list_alive(Some("home"), None)
            .unwrap()
            .into_iter()
            .map(|r| r.room)
            .collect();
        all.sort();
        assert_eq!(all, vec!["anime", "music"]);

        let filtered = db.list_alive(None, Some("Anime")).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].room, "anime");
    }

    #[test]
    fn test_refresh_candidates_skip_dead_and_sort_by_popularity() {
        let db = RoomDirectory::open_in_memory().unwrap();
        db.upsert_if_absent(&RoomRecord::new("small", &stats("", 1, 100), 1)).unwrap();
        db.upsert_if_absent(&RoomRecord::new("big", &stats("", 50, 0), 1)).unwrap();
        db.upsert_if_absent(&RoomRecord::new("mid", &stats("", 10, 5), 1)).unwrap();
        db.upsert_if_absent(&RoomRecord::new("dead", &stats("", 99, 99), 1)).unwrap();
        db.mark_dead("dead").unwrap();
        db.mark_unknown("mid").unwrap();

        assert_eq!(db.refresh_candidates().unwrap(), vec!["big", "mid", "small"]);
    }

    #[test]
    fn test_delete() {
        let db = RoomDirectory::open_in_memory().unwrap();
        db.upsert_if_absent(&RoomRecord::new("abc", &stats("", 1, 1), 1)).unwrap();
        assert!(db.delete("abc").unwrap());
        assert!(!db.delete("abc").unwrap());
        assert_eq!(db.count().unwrap(), 0);
    }
}
