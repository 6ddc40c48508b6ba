use super::models::*;
use super::watchlist_store::{CollaboratorAdded, ItemsWrite, WatchlistStore};
use crate::sqlite_column;
use crate::sqlite_persistence::{
    open_versioned_db, Column, ForeignKey, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP,
};
use anyhow::{Context, Result};
use rand::Rng;
use rand_distr::Alphanumeric;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::{
    path::Path,
    sync::{Arc, Mutex},
};
use tracing::debug;

const WATCHLIST_ID_LENGTH: usize = 16;

const WATCHLIST_FK: ForeignKey = ForeignKey {
    foreign_table: "watchlist",
    foreign_column: "id",
};

/// V 0
const WATCHLIST_TABLE_V_0: Table = Table {
    name: "watchlist",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("description", &SqlType::Text),
        sqlite_column!("visibility", &SqlType::Integer, non_null = true),
        sqlite_column!("owner_id", &SqlType::Integer, non_null = true),
        sqlite_column!(
            "follower_count",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!("cover_image", &SqlType::Text),
        sqlite_column!(
            "custom_cover",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[],
    indices: &[("idx_watchlist_owner_id", "owner_id")],
};
const WATCHLIST_COLLABORATOR_TABLE_V_0: Table = Table {
    name: "watchlist_collaborator",
    columns: &[
        sqlite_column!(
            "watchlist_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&WATCHLIST_FK)
        ),
        sqlite_column!("user_id", &SqlType::Integer, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[&["watchlist_id", "user_id"]],
    indices: &[("idx_watchlist_collaborator_user_id", "user_id")],
};
const WATCHLIST_FOLLOWER_TABLE_V_0: Table = Table {
    name: "watchlist_follower",
    columns: &[
        sqlite_column!(
            "watchlist_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&WATCHLIST_FK)
        ),
        sqlite_column!("user_id", &SqlType::Integer, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[&["watchlist_id", "user_id"]],
    indices: &[("idx_watchlist_follower_watchlist_id", "watchlist_id")],
};
const WATCHLIST_CATEGORY_TABLE_V_0: Table = Table {
    name: "watchlist_category",
    columns: &[
        sqlite_column!(
            "watchlist_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&WATCHLIST_FK)
        ),
        sqlite_column!("position", &SqlType::Integer, non_null = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
    ],
    unique_constraints: &[&["watchlist_id", "name"]],
    indices: &[],
};
const WATCHLIST_ITEM_TABLE_V_0: Table = Table {
    name: "watchlist_item",
    columns: &[
        sqlite_column!(
            "watchlist_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&WATCHLIST_FK)
        ),
        sqlite_column!("position", &SqlType::Integer, non_null = true),
        sqlite_column!("media_id", &SqlType::Text, non_null = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("poster_url", &SqlType::Text),
        sqlite_column!("media_kind", &SqlType::Integer, non_null = true),
        sqlite_column!("platforms", &SqlType::Text, non_null = true),
        sqlite_column!("runtime", &SqlType::Integer),
        sqlite_column!("season_count", &SqlType::Integer),
        sqlite_column!("episode_count", &SqlType::Integer),
        sqlite_column!("added_at", &SqlType::Integer, non_null = true),
    ],
    unique_constraints: &[&["watchlist_id", "media_id"]],
    indices: &[("idx_watchlist_item_watchlist_id", "watchlist_id")],
};

/// V 1
const WATCHLIST_TABLE_V_1: Table = Table {
    name: "watchlist",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("description", &SqlType::Text),
        sqlite_column!("visibility", &SqlType::Integer, non_null = true),
        sqlite_column!("owner_id", &SqlType::Integer, non_null = true),
        sqlite_column!(
            "follower_count",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!("cover_image", &SqlType::Text),
        sqlite_column!(
            "custom_cover",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!(
            "version",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
    ],
    unique_constraints: &[],
    indices: &[("idx_watchlist_owner_id", "owner_id")],
};

pub const VERSIONED_SCHEMAS: &[VersionedSchema] = &[
    VersionedSchema {
        version: 0,
        tables: &[
            WATCHLIST_TABLE_V_0,
            WATCHLIST_COLLABORATOR_TABLE_V_0,
            WATCHLIST_FOLLOWER_TABLE_V_0,
            WATCHLIST_CATEGORY_TABLE_V_0,
            WATCHLIST_ITEM_TABLE_V_0,
        ],
        migration: None,
    },
    VersionedSchema {
        version: 1,
        tables: &[
            WATCHLIST_TABLE_V_1,
            WATCHLIST_COLLABORATOR_TABLE_V_0,
            WATCHLIST_FOLLOWER_TABLE_V_0,
            WATCHLIST_CATEGORY_TABLE_V_0,
            WATCHLIST_ITEM_TABLE_V_0,
        ],
        migration: Some(|conn: &Connection| {
            conn.execute(
                "ALTER TABLE watchlist ADD COLUMN version INTEGER NOT NULL DEFAULT 0",
                [],
            )?;
            Ok(())
        }),
    },
];

fn random_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(WATCHLIST_ID_LENGTH)
        .map(char::from)
        .collect()
}

#[derive(Clone)]
pub struct SqliteWatchlistStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteWatchlistStore {
    pub fn new<T: AsRef<Path>>(db_path: T) -> Result<Self> {
        let conn = open_versioned_db(db_path, VERSIONED_SCHEMAS)?;
        Ok(SqliteWatchlistStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn load_user_ids(conn: &Connection, table: &Table, watchlist_id: &str) -> Result<Vec<usize>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT user_id FROM {} WHERE watchlist_id = ?1 ORDER BY rowid",
            table.name
        ))?;
        let ids = stmt
            .query_map(params![watchlist_id], |row| row.get::<_, i64>(0))?
            .map(|id| id.map(|id| id as usize))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    fn load_categories(conn: &Connection, watchlist_id: &str) -> Result<Vec<String>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT name FROM {} WHERE watchlist_id = ?1 ORDER BY position",
            WATCHLIST_CATEGORY_TABLE_V_0.name
        ))?;
        let categories = stmt
            .query_map(params![watchlist_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(categories)
    }

    fn load_items(conn: &Connection, watchlist_id: &str) -> Result<Vec<WatchlistItem>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT media_id, title, poster_url, media_kind, platforms, runtime, season_count, \
             episode_count, added_at FROM {} WHERE watchlist_id = ?1 ORDER BY position",
            WATCHLIST_ITEM_TABLE_V_0.name
        ))?;
        let rows = stmt
            .query_map(params![watchlist_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, i32>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, Option<u32>>(5)?,
                    row.get::<_, Option<u32>>(6)?,
                    row.get::<_, Option<u32>>(7)?,
                    row.get::<_, i64>(8)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut items = Vec::with_capacity(rows.len());
        for (media_id, title, poster_url, kind, platforms, runtime, seasons, episodes, added_at) in
            rows
        {
            let media_kind = MediaKind::from_int(kind)
                .with_context(|| format!("Invalid media kind {} for item {}", kind, media_id))?;
            let platforms: Vec<Platform> = serde_json::from_str(&platforms)
                .with_context(|| format!("Invalid platforms for item {}", media_id))?;
            items.push(WatchlistItem {
                media_id,
                title,
                poster_url,
                media_kind,
                platforms,
                runtime,
                season_count: seasons,
                episode_count: episodes,
                added_at,
            });
        }
        Ok(items)
    }

    fn load_watchlist(conn: &Connection, watchlist_id: &str) -> Result<Option<Watchlist>> {
        let row = conn
            .query_row(
                &format!(
                    "SELECT name, description, visibility, owner_id, follower_count, cover_image, \
                     custom_cover, created, version FROM {} WHERE id = ?1",
                    WATCHLIST_TABLE_V_1.name
                ),
                params![watchlist_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, i32>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, Option<String>>(5)?,
                        row.get::<_, i32>(6)?,
                        row.get::<_, Option<i64>>(7)?,
                        row.get::<_, i64>(8)?,
                    ))
                },
            )
            .optional()?;
        let (
            name,
            description,
            visibility,
            owner_id,
            follower_count,
            cover_image,
            custom_cover,
            created,
            version,
        ) = match row {
            Some(row) => row,
            None => return Ok(None),
        };
        let visibility = Visibility::from_int(visibility).with_context(|| {
            format!("Invalid visibility {} for watchlist {}", visibility, watchlist_id)
        })?;

        Ok(Some(Watchlist {
            id: watchlist_id.to_string(),
            name,
            description,
            visibility,
            owner_id: owner_id as usize,
            collaborator_ids: Self::load_user_ids(
                conn,
                &WATCHLIST_COLLABORATOR_TABLE_V_0,
                watchlist_id,
            )?,
            follower_ids: Self::load_user_ids(conn, &WATCHLIST_FOLLOWER_TABLE_V_0, watchlist_id)?,
            follower_count: follower_count.max(0) as u32,
            items: Self::load_items(conn, watchlist_id)?,
            cover_image,
            custom_cover: custom_cover != 0,
            categories: Self::load_categories(conn, watchlist_id)?,
            version: version.max(0) as u64,
            created: created.unwrap_or_default(),
        }))
    }

    fn write_categories(tx: &Transaction, watchlist_id: &str, categories: &[String]) -> Result<()> {
        tx.execute(
            &format!(
                "DELETE FROM {} WHERE watchlist_id = ?1",
                WATCHLIST_CATEGORY_TABLE_V_0.name
            ),
            params![watchlist_id],
        )?;
        for (position, category) in categories.iter().enumerate() {
            tx.execute(
                &format!(
                    "INSERT OR IGNORE INTO {} (watchlist_id, position, name) VALUES (?1, ?2, ?3)",
                    WATCHLIST_CATEGORY_TABLE_V_0.name
                ),
                params![watchlist_id, position as i64, category],
            )?;
        }
        Ok(())
    }

    fn write_items(tx: &Transaction, watchlist_id: &str, items: &[WatchlistItem]) -> Result<()> {
        tx.execute(
            &format!(
                "DELETE FROM {} WHERE watchlist_id = ?1",
                WATCHLIST_ITEM_TABLE_V_0.name
            ),
            params![watchlist_id],
        )?;
        for (position, item) in items.iter().enumerate() {
            let platforms = serde_json::to_string(&item.platforms)?;
            tx.execute(
                &format!(
                    "INSERT INTO {} (watchlist_id, position, media_id, title, poster_url, \
                     media_kind, platforms, runtime, season_count, episode_count, added_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                    WATCHLIST_ITEM_TABLE_V_0.name
                ),
                params![
                    watchlist_id,
                    position as i64,
                    item.media_id,
                    item.title,
                    item.poster_url,
                    item.media_kind.to_int(),
                    platforms,
                    item.runtime,
                    item.season_count,
                    item.episode_count,
                    item.added_at,
                ],
            )
            .with_context(|| format!("Failed to write item {}", item.media_id))?;
        }
        Ok(())
    }

    fn adjust_follower_count(tx: &Transaction, watchlist_id: &str, delta: i64) -> Result<()> {
        tx.execute(
            &format!(
                "UPDATE {} SET follower_count = MAX(follower_count + ?2, 0) WHERE id = ?1",
                WATCHLIST_TABLE_V_1.name
            ),
            params![watchlist_id, delta],
        )?;
        Ok(())
    }

    fn delete_member(
        tx: &Transaction,
        table: &Table,
        watchlist_id: &str,
        user_id: usize,
    ) -> Result<bool> {
        let deleted = tx.execute(
            &format!(
                "DELETE FROM {} WHERE watchlist_id = ?1 AND user_id = ?2",
                table.name
            ),
            params![watchlist_id, user_id],
        )?;
        Ok(deleted > 0)
    }

    fn insert_member(
        tx: &Transaction,
        table: &Table,
        watchlist_id: &str,
        user_id: usize,
    ) -> Result<bool> {
        let inserted = tx.execute(
            &format!(
                "INSERT OR IGNORE INTO {} (watchlist_id, user_id) VALUES (?1, ?2)",
                table.name
            ),
            params![watchlist_id, user_id],
        )?;
        Ok(inserted > 0)
    }
}

impl WatchlistStore for SqliteWatchlistStore {
    fn create_watchlist(
        &self,
        owner_id: usize,
        details: &WatchlistDetails,
        items: &[WatchlistItem],
    ) -> Result<Watchlist> {
        let mut conn = self.conn.lock().unwrap();
        let watchlist_id = random_id();
        {
            let tx = conn.transaction()?;
            tx.execute(
                &format!(
                    "INSERT INTO {} (id, name, description, visibility, owner_id) \
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    WATCHLIST_TABLE_V_1.name
                ),
                params![
                    watchlist_id,
                    details.name,
                    details.description,
                    details.visibility.to_int(),
                    owner_id
                ],
            )
            .context("Failed to insert watchlist")?;
            Self::write_categories(&tx, &watchlist_id, &details.categories)?;
            Self::write_items(&tx, &watchlist_id, items)?;
            tx.commit()?;
        }
        debug!("Created watchlist {} for user {}", watchlist_id, owner_id);
        Self::load_watchlist(&conn, &watchlist_id)?
            .with_context(|| format!("Watchlist {} vanished after creation", watchlist_id))
    }

    fn get_watchlist(&self, watchlist_id: &str) -> Result<Option<Watchlist>> {
        let conn = self.conn.lock().unwrap();
        Self::load_watchlist(&conn, watchlist_id)
    }

    fn get_watchlists(&self, watchlist_ids: &[String]) -> Result<Vec<Watchlist>> {
        let conn = self.conn.lock().unwrap();
        let mut watchlists = Vec::with_capacity(watchlist_ids.len());
        for watchlist_id in watchlist_ids {
            if let Some(watchlist) = Self::load_watchlist(&conn, watchlist_id)? {
                watchlists.push(watchlist);
            }
        }
        Ok(watchlists)
    }

    fn get_owned_or_collaborative(&self, user_id: usize) -> Result<Vec<Watchlist>> {
        let conn = self.conn.lock().unwrap();
        let ids = {
            let mut stmt = conn.prepare(&format!(
                "SELECT w.id FROM {} w WHERE w.owner_id = ?1 OR EXISTS \
                 (SELECT 1 FROM {} c WHERE c.watchlist_id = w.id AND c.user_id = ?1) \
                 ORDER BY w.rowid",
                WATCHLIST_TABLE_V_1.name, WATCHLIST_COLLABORATOR_TABLE_V_0.name
            ))?;
            let ids = stmt
                .query_map(params![user_id], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            ids
        };
        let mut watchlists = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(watchlist) = Self::load_watchlist(&conn, &id)? {
                watchlists.push(watchlist);
            }
        }
        Ok(watchlists)
    }

    fn update_details(&self, watchlist_id: &str, details: &WatchlistDetails) -> Result<bool> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let updated = tx.execute(
            &format!(
                "UPDATE {} SET name = ?2, description = ?3, visibility = ?4 WHERE id = ?1",
                WATCHLIST_TABLE_V_1.name
            ),
            params![
                watchlist_id,
                details.name,
                details.description,
                details.visibility.to_int()
            ],
        )?;
        if updated == 0 {
            return Ok(false);
        }
        Self::write_categories(&tx, watchlist_id, &details.categories)?;
        tx.commit()?;
        Ok(true)
    }

    fn delete_watchlist(&self, watchlist_id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1", WATCHLIST_TABLE_V_1.name),
            params![watchlist_id],
        )?;
        Ok(deleted > 0)
    }

    fn add_collaborator(&self, watchlist_id: &str, user_id: usize) -> Result<CollaboratorAdded> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let added =
            Self::insert_member(&tx, &WATCHLIST_COLLABORATOR_TABLE_V_0, watchlist_id, user_id)
                .context("Failed to add collaborator")?;
        let removed_follower =
            Self::delete_member(&tx, &WATCHLIST_FOLLOWER_TABLE_V_0, watchlist_id, user_id)?;
        if removed_follower {
            Self::adjust_follower_count(&tx, watchlist_id, -1)?;
        }
        tx.commit()?;
        Ok(CollaboratorAdded {
            added,
            removed_follower,
        })
    }

    fn remove_collaborator(&self, watchlist_id: &str, user_id: usize) -> Result<bool> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let removed =
            Self::delete_member(&tx, &WATCHLIST_COLLABORATOR_TABLE_V_0, watchlist_id, user_id)?;
        tx.commit()?;
        Ok(removed)
    }

    fn add_follower(&self, watchlist_id: &str, user_id: usize) -> Result<bool> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let added = Self::insert_member(&tx, &WATCHLIST_FOLLOWER_TABLE_V_0, watchlist_id, user_id)
            .context("Failed to add follower")?;
        if added {
            Self::adjust_follower_count(&tx, watchlist_id, 1)?;
        }
        tx.commit()?;
        Ok(added)
    }

    fn remove_follower(&self, watchlist_id: &str, user_id: usize) -> Result<bool> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let removed =
            Self::delete_member(&tx, &WATCHLIST_FOLLOWER_TABLE_V_0, watchlist_id, user_id)?;
        if removed {
            Self::adjust_follower_count(&tx, watchlist_id, -1)?;
        }
        tx.commit()?;
        Ok(removed)
    }

    fn set_items(
        &self,
        watchlist_id: &str,
        items: &[WatchlistItem],
        expected_version: Option<u64>,
    ) -> Result<ItemsWrite> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let current = tx
            .query_row(
                &format!(
                    "SELECT version FROM {} WHERE id = ?1",
                    WATCHLIST_TABLE_V_1.name
                ),
                params![watchlist_id],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        let current = match current {
            Some(version) => version.max(0) as u64,
            None => return Ok(ItemsWrite::NotFound),
        };
        if let Some(expected) = expected_version {
            if expected != current {
                return Ok(ItemsWrite::VersionMismatch { current });
            }
        }

        Self::write_items(&tx, watchlist_id, items)?;
        let version = current + 1;
        tx.execute(
            &format!(
                "UPDATE {} SET version = ?2 WHERE id = ?1",
                WATCHLIST_TABLE_V_1.name
            ),
            params![watchlist_id, version as i64],
        )?;
        tx.commit()?;
        Ok(ItemsWrite::Written { version })
    }

    fn set_custom_cover(&self, watchlist_id: &str, cover_image: Option<&str>) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            &format!(
                "UPDATE {} SET cover_image = ?2, custom_cover = ?3 WHERE id = ?1",
                WATCHLIST_TABLE_V_1.name
            ),
            params![watchlist_id, cover_image, cover_image.is_some() as i32],
        )?;
        Ok(updated > 0)
    }

    fn set_generated_cover(&self, watchlist_id: &str, cover_image: Option<&str>) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            &format!(
                "UPDATE {} SET cover_image = ?2 WHERE id = ?1 AND custom_cover = 0",
                WATCHLIST_TABLE_V_1.name
            ),
            params![watchlist_id, cover_image],
        )?;
        Ok(updated > 0)
    }
}
