use crate::sqlite_column;
use crate::sqlite_persistence::{
    open_versioned_db, system_time_from_column_result, Column, ForeignKey, SqlType, Table,
    VersionedSchema, DEFAULT_TIMESTAMP,
};
use crate::user::*;
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::{
    path::Path,
    sync::{Arc, Mutex},
};
use tracing::debug;

const USER_FK: ForeignKey = ForeignKey {
    foreign_table: "user",
    foreign_column: "id",
};

/// V 0
const USER_TABLE_V_0: Table = Table {
    name: "user",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("handle", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("email", &SqlType::Text),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[],
    indices: &[("idx_user_handle", "handle")],
};
const AUTH_TOKEN_TABLE_V_0: Table = Table {
    name: "auth_token",
    columns: &[
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!("value", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!("last_used", &SqlType::Integer),
    ],
    unique_constraints: &[],
    indices: &[("idx_auth_token_value", "value")],
};

/// V 1
const SAVED_WATCHLIST_TABLE_V_1: Table = Table {
    name: "saved_watchlist",
    columns: &[
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!("watchlist_id", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[&["user_id", "watchlist_id"]],
    indices: &[("idx_saved_watchlist_user_id", "user_id")],
};
const COLLABORATIVE_WATCHLIST_TABLE_V_1: Table = Table {
    name: "collaborative_watchlist",
    columns: &[
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!("watchlist_id", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[&["user_id", "watchlist_id"]],
    indices: &[("idx_collaborative_watchlist_user_id", "user_id")],
};
const WATCHLIST_ORDER_TABLE_V_1: Table = Table {
    name: "watchlist_order",
    columns: &[
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!("watchlist_id", &SqlType::Text, non_null = true),
        sqlite_column!("position", &SqlType::Integer, non_null = true),
    ],
    unique_constraints: &[&["user_id", "watchlist_id"]],
    indices: &[("idx_watchlist_order_user_id", "user_id")],
};

pub const VERSIONED_SCHEMAS: &[VersionedSchema] = &[
    VersionedSchema {
        version: 0,
        tables: &[USER_TABLE_V_0, AUTH_TOKEN_TABLE_V_0],
        migration: None,
    },
    VersionedSchema {
        version: 1,
        tables: &[
            USER_TABLE_V_0,
            AUTH_TOKEN_TABLE_V_0,
            SAVED_WATCHLIST_TABLE_V_1,
            COLLABORATIVE_WATCHLIST_TABLE_V_1,
            WATCHLIST_ORDER_TABLE_V_1,
        ],
        migration: Some(|conn: &Connection| {
            SAVED_WATCHLIST_TABLE_V_1.create(conn)?;
            COLLABORATIVE_WATCHLIST_TABLE_V_1.create(conn)?;
            WATCHLIST_ORDER_TABLE_V_1.create(conn)?;
            Ok(())
        }),
    },
];

#[derive(Clone)]
pub struct SqliteUserStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteUserStore {
    pub fn new<T: AsRef<Path>>(db_path: T) -> Result<Self> {
        let conn = open_versioned_db(db_path, VERSIONED_SCHEMAS)?;
        Ok(SqliteUserStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn query_ids(conn: &Connection, sql: &str, user_id: usize) -> Result<Vec<String>> {
        let mut stmt = conn.prepare(sql)?;
        let ids = stmt
            .query_map(params![user_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    fn append_to_order_tx(tx: &Transaction, user_id: usize, watchlist_id: &str) -> Result<bool> {
        let inserted = tx.execute(
            &format!(
                "INSERT OR IGNORE INTO {0} (user_id, watchlist_id, position) \
                 VALUES (?1, ?2, (SELECT COALESCE(MAX(position) + 1, 0) FROM {0} WHERE user_id = ?1))",
                WATCHLIST_ORDER_TABLE_V_1.name
            ),
            params![user_id, watchlist_id],
        )?;
        Ok(inserted > 0)
    }

    fn delete_membership_tx(
        tx: &Transaction,
        table: &Table,
        user_id: usize,
        watchlist_id: &str,
    ) -> Result<bool> {
        let deleted = tx.execute(
            &format!(
                "DELETE FROM {} WHERE user_id = ?1 AND watchlist_id = ?2",
                table.name
            ),
            params![user_id, watchlist_id],
        )?;
        Ok(deleted > 0)
    }

    fn insert_membership_tx(
        tx: &Transaction,
        table: &Table,
        user_id: usize,
        watchlist_id: &str,
    ) -> Result<bool> {
        let inserted = tx.execute(
            &format!(
                "INSERT OR IGNORE INTO {} (user_id, watchlist_id) VALUES (?1, ?2)",
                table.name
            ),
            params![user_id, watchlist_id],
        )?;
        Ok(inserted > 0)
    }
}

impl UserStore for SqliteUserStore {
    fn create_user(&self, user_handle: &str, email: Option<&str>) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT INTO {} (handle, email) VALUES (?1, ?2)",
                USER_TABLE_V_0.name
            ),
            params![user_handle, email],
        )
        .with_context(|| format!("Failed to create user {}", user_handle))?;
        Ok(conn.last_insert_rowid() as usize)
    }

    fn get_user(&self, user_id: usize) -> Result<Option<WatchlistUser>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                &format!(
                    "SELECT handle, email FROM {} WHERE id = ?1",
                    USER_TABLE_V_0.name
                ),
                params![user_id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?)),
            )
            .optional()?;
        let (handle, email) = match row {
            Some(row) => row,
            None => return Ok(None),
        };

        let saved_watchlists = Self::query_ids(
            &conn,
            &format!(
                "SELECT watchlist_id FROM {} WHERE user_id = ?1 ORDER BY rowid",
                SAVED_WATCHLIST_TABLE_V_1.name
            ),
            user_id,
        )?;
        let collaborative_watchlists = Self::query_ids(
            &conn,
            &format!(
                "SELECT watchlist_id FROM {} WHERE user_id = ?1 ORDER BY rowid",
                COLLABORATIVE_WATCHLIST_TABLE_V_1.name
            ),
            user_id,
        )?;
        let display_order = Self::query_ids(
            &conn,
            &format!(
                "SELECT watchlist_id FROM {} WHERE user_id = ?1 ORDER BY position",
                WATCHLIST_ORDER_TABLE_V_1.name
            ),
            user_id,
        )?;

        Ok(Some(WatchlistUser {
            id: user_id,
            handle,
            email,
            saved_watchlists,
            collaborative_watchlists,
            display_order,
        }))
    }

    fn get_user_id(&self, user_handle: &str) -> Result<Option<usize>> {
        let conn = self.conn.lock().unwrap();
        let id = conn
            .query_row(
                &format!("SELECT id FROM {} WHERE handle = ?1", USER_TABLE_V_0.name),
                params![user_handle],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(id.map(|id| id as usize))
    }

    fn get_user_handle(&self, user_id: usize) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                &format!("SELECT handle FROM {} WHERE id = ?1", USER_TABLE_V_0.name),
                params![user_id],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn add_saved_watchlist(&self, user_id: usize, watchlist_id: &str) -> Result<bool> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let added =
            Self::insert_membership_tx(&tx, &SAVED_WATCHLIST_TABLE_V_1, user_id, watchlist_id)?;
        let appended = Self::append_to_order_tx(&tx, user_id, watchlist_id)?;
        tx.commit()?;
        debug!("add_saved_watchlist({user_id}, {watchlist_id}) added={added} appended={appended}");
        Ok(added || appended)
    }

    fn remove_saved_watchlist(&self, user_id: usize, watchlist_id: &str) -> Result<bool> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let removed =
            Self::delete_membership_tx(&tx, &SAVED_WATCHLIST_TABLE_V_1, user_id, watchlist_id)?;
        let unordered =
            Self::delete_membership_tx(&tx, &WATCHLIST_ORDER_TABLE_V_1, user_id, watchlist_id)?;
        tx.commit()?;
        Ok(removed || unordered)
    }

    fn add_collaborative_watchlist(&self, user_id: usize, watchlist_id: &str) -> Result<bool> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let unsaved =
            Self::delete_membership_tx(&tx, &SAVED_WATCHLIST_TABLE_V_1, user_id, watchlist_id)?;
        let added = Self::insert_membership_tx(
            &tx,
            &COLLABORATIVE_WATCHLIST_TABLE_V_1,
            user_id,
            watchlist_id,
        )?;
        let appended = Self::append_to_order_tx(&tx, user_id, watchlist_id)?;
        tx.commit()?;
        debug!(
            "add_collaborative_watchlist({user_id}, {watchlist_id}) unsaved={unsaved} added={added} appended={appended}"
        );
        Ok(unsaved || added || appended)
    }

    fn remove_collaborative_watchlist(&self, user_id: usize, watchlist_id: &str) -> Result<bool> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let removed = Self::delete_membership_tx(
            &tx,
            &COLLABORATIVE_WATCHLIST_TABLE_V_1,
            user_id,
            watchlist_id,
        )?;
        let unordered =
            Self::delete_membership_tx(&tx, &WATCHLIST_ORDER_TABLE_V_1, user_id, watchlist_id)?;
        tx.commit()?;
        Ok(removed || unordered)
    }

    fn append_to_display_order(&self, user_id: usize, watchlist_id: &str) -> Result<bool> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let appended = Self::append_to_order_tx(&tx, user_id, watchlist_id)?;
        tx.commit()?;
        Ok(appended)
    }

    fn set_display_order(&self, user_id: usize, watchlist_ids: &[String]) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute(
            &format!(
                "DELETE FROM {} WHERE user_id = ?1",
                WATCHLIST_ORDER_TABLE_V_1.name
            ),
            params![user_id],
        )?;
        for (position, watchlist_id) in watchlist_ids.iter().enumerate() {
            tx.execute(
                &format!(
                    "INSERT OR IGNORE INTO {} (user_id, watchlist_id, position) VALUES (?1, ?2, ?3)",
                    WATCHLIST_ORDER_TABLE_V_1.name
                ),
                params![user_id, watchlist_id, position as i64],
            )
            .context("Could not write display order")?;
        }
        tx.commit()?;
        Ok(())
    }

    fn remove_watchlist_references(&self, user_id: usize, watchlist_id: &str) -> Result<bool> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let mut changed = false;
        for table in [
            &SAVED_WATCHLIST_TABLE_V_1,
            &COLLABORATIVE_WATCHLIST_TABLE_V_1,
            &WATCHLIST_ORDER_TABLE_V_1,
        ] {
            changed |= Self::delete_membership_tx(&tx, table, user_id, watchlist_id)?;
        }
        tx.commit()?;
        Ok(changed)
    }
}

impl UserAuthTokenStore for SqliteUserStore {
    fn get_user_auth_token(&self, value: &AuthTokenValue) -> Result<Option<AuthToken>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                &format!(
                    "SELECT user_id, value, created, last_used FROM {} WHERE value = ?1",
                    AUTH_TOKEN_TABLE_V_0.name
                ),
                params![value.0],
                |row| {
                    Ok(AuthToken {
                        user_id: row.get(0)?,
                        value: AuthTokenValue(row.get(1)?),
                        created: system_time_from_column_result(row.get(2)?),
                        last_used: row
                            .get::<usize, Option<i64>>(3)?
                            .map(system_time_from_column_result),
                    })
                },
            )
            .optional()?)
    }

    fn add_user_auth_token(&self, token: AuthToken) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT INTO {} (value, user_id) VALUES (?1, ?2)",
                AUTH_TOKEN_TABLE_V_0.name
            ),
            params![token.value.0, token.user_id],
        )
        .context("Could not add auth token")?;
        Ok(())
    }

    fn update_user_auth_token_last_used_timestamp(&self, token: &AuthTokenValue) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "UPDATE {} SET last_used = {} WHERE value = ?1",
                AUTH_TOKEN_TABLE_V_0.name, DEFAULT_TIMESTAMP
            ),
            params![token.0],
        )?;
        Ok(())
    }
}
