use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{Connection, params};

use crate::error::{Error, Result};
use crate::types::CreativeWork;

/// On-disk cache of bibliographic lookups, keyed by `doi:<doi>` or
/// `q:<query text>`. A NULL record marks a lookup that found nothing.
pub struct LookupCache {
    conn: Connection,
}

impl LookupCache {
    /// Open the cache under the user cache directory.
    pub fn open() -> Result<Self> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| {
                Error::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "could not determine cache directory",
                ))
            })?
            .join("docshape");
        std::fs::create_dir_all(&cache_dir)?;
        Self::open_at(&cache_dir.join("lookups.db"))
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS lookups (
                key TEXT PRIMARY KEY,
                record TEXT,
                created_at INTEGER NOT NULL
            )",
        )?;
        Ok(Self { conn })
    }

    /// None = not cached, Some(None) = negative hit, Some(Some(work)) = cached record.
    pub fn get(&self, key: &str) -> Result<Option<Option<CreativeWork>>> {
        let mut stmt = self
            .conn
            .prepare("SELECT record FROM lookups WHERE key = ?1")?;
        let mut rows = stmt.query(params![key])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        let record: Option<String> = row.get(0)?;
        match record {
            Some(json) => Ok(Some(Some(serde_json::from_str(&json)?))),
            None => Ok(Some(None)),
        }
    }

    pub fn put(&self, key: &str, record: Option<&CreativeWork>) -> Result<()> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default();
        let json = record.map(serde_json::to_string).transpose()?;
        self.conn.execute(
            "INSERT OR REPLACE INTO lookups (key, record, created_at) VALUES (?1, ?2, ?3)",
            params![key, json, now],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_hits_and_negative_hits() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LookupCache::open_at(&dir.path().join("cache.db")).unwrap();

        assert_eq!(cache.get("doi:10.1000/x").unwrap(), None);

        let work = CreativeWork {
            title: Some("Cached".into()),
            doi: Some("10.1000/x".into()),
            ..Default::default()
        };
        cache.put("doi:10.1000/x", Some(&work)).unwrap();
        cache.put("q:nothing", None).unwrap();

        assert_eq!(cache.get("doi:10.1000/x").unwrap(), Some(Some(work)));
        assert_eq!(cache.get("q:nothing").unwrap(), Some(None));
    }
}
