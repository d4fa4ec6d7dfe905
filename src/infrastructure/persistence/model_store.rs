use crate::application::ml::artifact::ModelArtifact;
use crate::domain::market::interval::Ticker;
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::info;

/// Trained model artifacts as pretty JSON under the models directory
pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Writes a versioned file, or the fixed `{TICKER}_{kind}.json` when
    /// `overwrite` is set.
    pub fn save(&self, artifact: &ModelArtifact, overwrite: bool) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create models directory {}", self.dir.display()))?;

        let file_name = if overwrite {
            artifact.fixed_file_name()
        } else {
            artifact.versioned_file_name()
        };
        let path = self.dir.join(file_name);

        let content =
            serde_json::to_string_pretty(artifact).context("Failed to serialize model artifact")?;

        // Atomic write: write to temp file then rename
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, content).context("Failed to write temp model file")?;
        fs::rename(&temp_path, &path).context("Failed to rename model file")?;

        info!("Saved model {} to {:?}", artifact.run_id, path);
        Ok(path)
    }

    pub fn load(path: &Path) -> Result<ModelArtifact> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read model file {}", path.display()))?;
        let artifact: ModelArtifact = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse model file {}", path.display()))?;

        info!(
            "Loaded {} model for {} (run {}) from {:?}",
            artifact.kind.slug(),
            artifact.ticker,
            artifact.run_id,
            path
        );
        Ok(artifact)
    }

    /// Newest artifact for `ticker`. Versioned files are ordered by the
    /// timestamp in their name; fixed files by modification time.
    pub fn latest(&self, ticker: &Ticker) -> Result<Option<PathBuf>> {
        if !self.dir.exists() {
            return Ok(None);
        }

        let prefix = format!("{}_", ticker);
        let mut best: Option<(NaiveDateTime, PathBuf)> = None;

        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to list {}", self.dir.display()))?
        {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(rest) = name
                .strip_prefix(&prefix)
                .and_then(|r| r.strip_suffix(".json"))
            else {
                continue;
            };

            let stamp = match versioned_stamp(rest) {
                Some(stamp) => stamp,
                None => modified_at(&path)?,
            };

            if best.as_ref().is_none_or(|(current, _)| stamp > *current) {
                best = Some((stamp, path));
            }
        }

        Ok(best.map(|(_, path)| path))
    }
}

/// `{kind}_{YYYYMMDD_HHMMSS}` -> timestamp
fn versioned_stamp(rest: &str) -> Option<NaiveDateTime> {
    let stamp = rest.get(rest.len().checked_sub(15)?..)?;
    NaiveDateTime::parse_from_str(stamp, "%Y%m%d_%H%M%S").ok()
}

fn modified_at(path: &Path) -> Result<NaiveDateTime> {
    let modified = fs::metadata(path)?
        .modified()
        .unwrap_or(SystemTime::UNIX_EPOCH);
    Ok(chrono::DateTime::<chrono::Utc>::from(modified).naive_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_versioned_stamp() {
        let stamp = versioned_stamp("linear_20250307_153000").unwrap();
        assert_eq!(stamp.to_string(), "2025-03-07 15:30:00");
        assert!(versioned_stamp("linear").is_none());
        assert!(versioned_stamp("random_forest").is_none());
    }

    #[test]
    fn test_versioned_stamp_ignores_multibyte_names() {
        // Byte offset 15 from the end falls inside 'é'
        assert!(versioned_stamp("é20250307_15300").is_none());
        assert!(versioned_stamp("modèle_20250307_1530").is_none());
    }

    fn temp_store() -> (PathBuf, ModelStore) {
        let dir = std::env::temp_dir().join(format!("stockcast-models-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        let store = ModelStore::new(&dir);
        (dir, store)
    }

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, "{}").unwrap();
        path
    }

    #[test]
    fn test_latest_picks_newest_versioned_file() {
        let (dir, store) = temp_store();
        let ticker = Ticker::parse("JPM").unwrap();
        touch(&dir, "JPM_linear_20250101_090000.json");
        let newest = touch(&dir, "JPM_random_forest_20250301_090000.json");
        touch(&dir, "JPM_linear_20250201_090000.json");
        touch(&dir, "MSFT_linear_20260101_090000.json");
        touch(&dir, "JPM_linear_20250401_090000.csv");

        assert_eq!(store.latest(&ticker).unwrap(), Some(newest));
        assert_eq!(store.latest(&Ticker::parse("AAPL").unwrap()).unwrap(), None);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_latest_survives_non_ascii_file_names() {
        let (dir, store) = temp_store();
        let stray = touch(&dir, "JPM_é20250307_15300.json");

        assert_eq!(store.latest(&Ticker::parse("JPM").unwrap()).unwrap(), Some(stray));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_latest_orders_fixed_file_by_modification_time() {
        let (dir, store) = temp_store();
        let ticker = Ticker::parse("JPM").unwrap();
        let versioned = touch(&dir, "JPM_linear_20250301_090000.json");
        let fixed = touch(&dir, "JPM_linear.json");

        // Just written, so newer than a stamp from 2025
        assert_eq!(store.latest(&ticker).unwrap(), Some(fixed.clone()));

        let old = chrono::Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        fs::File::options()
            .write(true)
            .open(&fixed)
            .unwrap()
            .set_modified(SystemTime::from(old))
            .unwrap();
        assert_eq!(store.latest(&ticker).unwrap(), Some(versioned));
        let _ = fs::remove_dir_all(&dir);
    }
}
