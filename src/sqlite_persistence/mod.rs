mod versioned_schema;

pub use versioned_schema::{
    open_versioned_db, Column, ForeignKey, SqlType, Table, VersionedSchema, BASE_DB_VERSION,
    DEFAULT_TIMESTAMP,
};

use std::time::SystemTime;

pub(crate) fn system_time_from_column_result(value: i64) -> SystemTime {
    SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(value.max(0) as u64)
}
