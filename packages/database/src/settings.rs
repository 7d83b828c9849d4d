//! Per-scenario key/value settings.

use chrono::Utc;
use duckdb::{Connection, params};
use ram_database_models::SettingKey;

use crate::{DbError, format_timestamp};

/// Gets a scenario setting value.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn get_setting(
    conn: &Connection,
    scenario_id: i64,
    key: SettingKey,
) -> Result<Option<String>, DbError> {
    let mut stmt =
        conn.prepare("SELECT value FROM scenarios_settings WHERE scenario_id = ? AND key = ?")?;
    let result = stmt.query_row(params![scenario_id, key.as_ref()], |row| row.get(0));
    match result {
        Ok(v) => Ok(Some(v)),
        Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(DbError::DuckDb(e)),
    }
}

/// Sets a scenario setting value, inserting or replacing it.
///
/// # Errors
///
/// Returns [`DbError`] if the upsert fails.
pub fn set_setting(
    conn: &Connection,
    scenario_id: i64,
    key: SettingKey,
    value: &str,
) -> Result<(), DbError> {
    let now = format_timestamp(&Utc::now());
    conn.execute(
        "INSERT INTO scenarios_settings (scenario_id, key, value, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?)
         ON CONFLICT (scenario_id, key) DO UPDATE SET
            value = EXCLUDED.value,
            updated_at = EXCLUDED.updated_at",
        params![scenario_id, key.as_ref(), value, now, now],
    )?;
    Ok(())
}

/// Gets a boolean scenario setting (`"true"` / `"false"`).
///
/// # Errors
///
/// Returns [`DbError::Conversion`] if the stored value is not a boolean.
pub fn get_bool_setting(
    conn: &Connection,
    scenario_id: i64,
    key: SettingKey,
) -> Result<Option<bool>, DbError> {
    get_setting(conn, scenario_id, key)?
        .map(|v| {
            v.parse::<bool>().map_err(|_| DbError::Conversion {
                message: format!("Setting {key} is not a boolean: {v:?}"),
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Db;

    #[tokio::test]
    async fn missing_setting_is_none() {
        let db = Db::open_in_memory().unwrap();
        let value = db
            .run(|conn| get_setting(conn, 1, SettingKey::AdminAreas))
            .await
            .unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn set_setting_upserts() {
        let db = Db::open_in_memory().unwrap();
        let (value, other) = db
            .run(|conn| {
                set_setting(conn, 1, SettingKey::RnActiveEditing, "true")?;
                set_setting(conn, 1, SettingKey::RnActiveEditing, "false")?;
                set_setting(conn, 2, SettingKey::RnActiveEditing, "true")?;
                Ok((
                    get_bool_setting(conn, 1, SettingKey::RnActiveEditing)?,
                    get_bool_setting(conn, 2, SettingKey::RnActiveEditing)?,
                ))
            })
            .await
            .unwrap();
        assert_eq!(value, Some(false));
        assert_eq!(other, Some(true));
    }

    #[tokio::test]
    async fn non_boolean_value_is_a_conversion_error() {
        let db = Db::open_in_memory().unwrap();
        let result = db
            .run(|conn| {
                set_setting(conn, 1, SettingKey::RnActiveEditing, "maybe")?;
                get_bool_setting(conn, 1, SettingKey::RnActiveEditing)
            })
            .await;
        assert!(matches!(result, Err(DbError::Conversion { .. })));
    }
}
