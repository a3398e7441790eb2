//! Guild records - board channel, watched channels and the pin mirror map
//!
//! Writes touch a single column so concurrent updates to other fields of the
//! same guild are never clobbered. Every setter reports whether a row matched.

use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Result as SqliteResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::db::Database;
use crate::models::{GuildRecord, PinMirror};

fn to_json<T: Serialize + ?Sized>(value: &T) -> SqliteResult<String> {
    serde_json::to_string(value).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

fn from_json<T: DeserializeOwned>(column: usize, json: &str) -> SqliteResult<T> {
    serde_json::from_str(json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

impl Database {
    /// Get a guild record, `None` if the guild never ran setup
    pub fn get_guild(&self, guild_id: &str) -> SqliteResult<Option<GuildRecord>> {
        let conn = self.conn();

        let row = conn
            .query_row(
                "SELECT id, board_channel_id, watch_channels, pinned_messages
                 FROM guilds WHERE id = ?1",
                params![guild_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((id, board_channel_id, watch_json, pinned_json)) => Ok(Some(GuildRecord {
                id,
                board_channel_id,
                watch_channels: from_json(2, &watch_json)?,
                pinned_messages: from_json(3, &pinned_json)?,
            })),
            None => Ok(None),
        }
    }

    /// Insert a new guild record. Fails on an existing id.
    pub fn create_guild(&self, record: &GuildRecord) -> SqliteResult<()> {
        let conn = self.conn();
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO guilds (id, board_channel_id, watch_channels, pinned_messages, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![
                record.id,
                record.board_channel_id,
                to_json(&record.watch_channels)?,
                to_json(&record.pinned_messages)?,
                now,
            ],
        )?;

        Ok(())
    }

    pub fn set_board_channel(&self, guild_id: &str, channel_id: &str) -> SqliteResult<bool> {
        let conn = self.conn();
        let now = Utc::now().to_rfc3339();
        let changed = conn.execute(
            "UPDATE guilds SET board_channel_id = ?1, updated_at = ?2 WHERE id = ?3",
            params![channel_id, now, guild_id],
        )?;
        Ok(changed > 0)
    }

    pub fn set_watch_channels(&self, guild_id: &str, channels: &[String]) -> SqliteResult<bool> {
        let conn = self.conn();
        let now = Utc::now().to_rfc3339();
        let changed = conn.execute(
            "UPDATE guilds SET watch_channels = ?1, updated_at = ?2 WHERE id = ?3",
            params![to_json(channels)?, now, guild_id],
        )?;
        Ok(changed > 0)
    }

    pub fn set_pinned_messages(&self, guild_id: &str, mirrors: &[PinMirror]) -> SqliteResult<bool> {
        let conn = self.conn();
        let now = Utc::now().to_rfc3339();
        let changed = conn.execute(
            "UPDATE guilds SET pinned_messages = ?1, updated_at = ?2 WHERE id = ?3",
            params![to_json(mirrors)?, now, guild_id],
        )?;
        Ok(changed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mirror(channel: &str, id: &str) -> PinMirror {
        PinMirror {
            target_channel_id: channel.into(),
            target_id: id.into(),
            mirror_channel_id: "board".into(),
            mirror_id: format!("mirror-{}", id),
        }
    }

    #[test]
    fn test_get_missing_guild() {
        let db = Database::new(":memory:").unwrap();
        assert_eq!(db.get_guild("nope").unwrap(), None);
    }

    #[test]
    fn test_create_and_get() {
        let db = Database::new(":memory:").unwrap();
        let record = GuildRecord::new("g1", "board");
        db.create_guild(&record).unwrap();

        assert_eq!(db.get_guild("g1").unwrap(), Some(record));
    }

    #[test]
    fn test_create_twice_fails() {
        let db = Database::new(":memory:").unwrap();
        let record = GuildRecord::new("g1", "board");
        db.create_guild(&record).unwrap();
        assert!(db.create_guild(&record).is_err());
    }

    #[test]
    fn test_field_updates_are_independent() {
        let db = Database::new(":memory:").unwrap();
        db.create_guild(&GuildRecord::new("g1", "board")).unwrap();

        assert!(db.set_watch_channels("g1", &["c1".to_string(), "c2".to_string()]).unwrap());
        assert!(db.set_pinned_messages("g1", &[mirror("c1", "m1")]).unwrap());
        assert!(db.set_board_channel("g1", "board2").unwrap());

        let record = db.get_guild("g1").unwrap().unwrap();
        assert_eq!(record.board_channel_id, "board2");
        assert_eq!(record.watch_channels, vec!["c1", "c2"]);
        assert_eq!(record.pinned_messages, vec![mirror("c1", "m1")]);
    }

    #[test]
    fn test_updates_on_missing_guild_report_no_match() {
        let db = Database::new(":memory:").unwrap();
        assert!(!db.set_board_channel("g1", "board").unwrap());
        assert!(!db.set_watch_channels("g1", &[]).unwrap());
        assert!(!db.set_pinned_messages("g1", &[]).unwrap());
        assert_eq!(db.get_guild("g1").unwrap(), None);
    }

    #[test]
    fn test_corrupt_document_is_an_error() {
        let db = Database::new(":memory:").unwrap();
        db.create_guild(&GuildRecord::new("g1", "board")).unwrap();
        db.conn()
            .execute("UPDATE guilds SET watch_channels = 'not json' WHERE id = 'g1'", [])
            .unwrap();

        assert!(matches!(
            db.get_guild("g1"),
            Err(rusqlite::Error::FromSqlConversionFailure(2, _, _))
        ));
    }

    #[test]
    fn test_record_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("starboard.db");
        let path = path.to_str().unwrap();

        let mut record = GuildRecord::new("g1", "board");
        record.watch_channels.push("c1".into());
        record.pinned_messages.push(mirror("c1", "m1"));
        {
            let db = Database::new(path).unwrap();
            db.create_guild(&record).unwrap();
        }

        let reopened = Database::new(path).unwrap();
        assert_eq!(reopened.get_guild("g1").unwrap(), Some(record));
    }
}
