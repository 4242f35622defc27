use crate::domain::model::Summary;
use crate::domain::ports::Storage;
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Seed,
    Purge,
}

/// Machine-readable record of one run, written next to the console summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub mode: RunMode,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<Summary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted: Option<usize>,
}

impl RunReport {
    pub fn start(mode: RunMode, dry_run: bool) -> Self {
        let started_at = Utc::now();
        let prefix = match mode {
            RunMode::Seed => "seed",
            RunMode::Purge => "purge",
        };

        Self {
            run_id: format!("{}_{}", prefix, started_at.format("%Y%m%d_%H%M%S")),
            mode,
            dry_run,
            started_at,
            finished_at: None,
            summary: None,
            deleted: None,
        }
    }

    pub fn finish_seed(mut self, summary: Summary) -> Self {
        self.summary = Some(summary);
        self.finished_at = Some(Utc::now());
        self
    }

    pub fn finish_purge(mut self, deleted: usize) -> Self {
        self.deleted = Some(deleted);
        self.finished_at = Some(Utc::now());
        self
    }

    pub async fn save<S: Storage>(&self, storage: &S, file_name: &str) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        tracing::debug!("Writing run report ({} bytes) to {}", json.len(), file_name);
        storage.write_file(file_name, &json).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::LocalStorage;
    use tempfile::TempDir;

    #[test]
    fn test_run_id_carries_mode_prefix() {
        let report = RunReport::start(RunMode::Purge, true);
        assert!(report.run_id.starts_with("purge_"));
        assert!(report.finished_at.is_none());
    }

    #[tokio::test]
    async fn test_seed_report_round_trips_through_storage() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path());
        let summary = Summary {
            created: 4,
            published: 4,
            skipped: 2,
            errors: 0,
            failures: Vec::new(),
        };

        let report = RunReport::start(RunMode::Seed, false).finish_seed(summary.clone());
        report.save(&storage, "report.json").await.unwrap();

        let raw = std::fs::read_to_string(temp_dir.path().join("report.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["mode"], "seed");
        assert_eq!(value["summary"]["created"], 4);
        assert!(value.get("deleted").is_none());
        assert!(value["finished_at"].is_string());
    }
}
