//! CSV result sink.
//!
//! Layout: `<output_dir>/<run_id>/screening.csv` with `prisma.json` beside it,
//! plus `metrics.json` when metrics were computed.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use slr_common::capability::{ResultRow, ResultSink};
use slr_common::{MetricsSummary, PrismaFlow, Result, SlrError};
use tracing::info;

pub const TABLE_FILE: &str = "screening.csv";
pub const METRICS_FILE: &str = "metrics.json";
pub const PRISMA_FILE: &str = "prisma.json";

/// Every file a run directory may hold.
pub const ARTIFACT_FILES: [&str; 3] = [TABLE_FILE, METRICS_FILE, PRISMA_FILE];

pub struct CsvSink {
    output_dir: PathBuf,
}

impl CsvSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self { output_dir: output_dir.into() }
    }

    fn run_dir(&self, run_id: &str) -> Result<PathBuf> {
        if run_id.is_empty() || run_id.contains(['/', '\\']) || run_id.contains("..") {
            return Err(SlrError::SinkWrite(format!("unsafe run id '{run_id}'")));
        }
        Ok(self.output_dir.join(run_id))
    }
}

/// Serialize rows with a header line; an empty table still gets the header.
pub fn rows_to_csv(rows: &[ResultRow]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    writer
        .write_record(["identifier", "title", "abstract", "disease_match", "decision", "confidence", "layer"])
        .map_err(sink_err)?;
    for row in rows {
        writer.serialize(row).map_err(sink_err)?;
    }
    writer.into_inner().map_err(|e| SlrError::SinkWrite(e.to_string()))
}

fn sink_err(e: csv::Error) -> SlrError {
    SlrError::SinkWrite(e.to_string())
}

async fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    tokio::fs::write(path, serde_json::to_vec_pretty(value)?)
        .await
        .map_err(|e| SlrError::SinkWrite(format!("{}: {e}", path.display())))
}

#[async_trait]
impl ResultSink for CsvSink {
    async fn write(
        &self,
        run_id: &str,
        rows: &[ResultRow],
        metrics: Option<&MetricsSummary>,
        prisma: &PrismaFlow,
    ) -> Result<String> {
        let dir = self.run_dir(run_id)?;
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| SlrError::SinkWrite(format!("{}: {e}", dir.display())))?;

        let table = dir.join(TABLE_FILE);
        tokio::fs::write(&table, rows_to_csv(rows)?)
            .await
            .map_err(|e| SlrError::SinkWrite(format!("{}: {e}", table.display())))?;

        write_json(&dir.join(PRISMA_FILE), prisma).await?;
        if let Some(m) = metrics {
            write_json(&dir.join(METRICS_FILE), m).await?;
        }

        info!(rows = rows.len(), path = %table.display(), "Screening table written");
        Ok(table.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, disease_match: Option<bool>) -> ResultRow {
        ResultRow {
            identifier: id.to_string(),
            title: "Metformin, PCOS and \"you\"".to_string(),
            abstract_text: "line one\nline two".to_string(),
            disease_match,
            decision: "INCLUDE".to_string(),
            confidence: 0.95,
            layer: "RULE".to_string(),
        }
    }

    #[test]
    fn test_csv_round_trips_through_reader() {
        let bytes = rows_to_csv(&[row("1", Some(true)), row("2", None)]).unwrap();
        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        assert_eq!(
            reader.headers().unwrap().iter().collect::<Vec<_>>(),
            vec!["identifier", "title", "abstract", "disease_match", "decision", "confidence", "layer"]
        );
        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(&records[0][1], "Metformin, PCOS and \"you\"");
        assert_eq!(&records[0][2], "line one\nline two");
        assert_eq!(&records[0][3], "true");
        assert_eq!(&records[1][3], "");
    }

    #[test]
    fn test_empty_table_has_header() {
        let bytes = rows_to_csv(&[]).unwrap();
        assert!(String::from_utf8(bytes).unwrap().starts_with("identifier,title,abstract"));
    }

    #[tokio::test]
    async fn test_writes_table_and_metrics() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(tmp.path());
        let metrics = MetricsSummary { precision: 1.0, true_positive: 1, ..Default::default() };

        let prisma = PrismaFlow { identified: 2, duplicates_removed: 1, screened: 1, included: 1, excluded: 0 };

        let reference = sink.write("job-1", &[row("1", Some(true))], Some(&metrics), &prisma).await.unwrap();

        assert!(reference.ends_with("screening.csv"));
        assert!(tmp.path().join("job-1").join(TABLE_FILE).exists());
        let json: serde_json::Value =
            serde_json::from_slice(&std::fs::read(tmp.path().join("job-1").join(METRICS_FILE)).unwrap()).unwrap();
        assert_eq!(json["precision"], 1.0);
        let flow: serde_json::Value =
            serde_json::from_slice(&std::fs::read(tmp.path().join("job-1").join(PRISMA_FILE)).unwrap()).unwrap();
        assert_eq!(flow["duplicates_removed"], 1);
    }

    #[tokio::test]
    async fn test_metrics_file_absent_without_metrics() {
        let tmp = tempfile::tempdir().unwrap();
        CsvSink::new(tmp.path()).write("job-2", &[], None, &PrismaFlow::default()).await.unwrap();
        assert!(!tmp.path().join("job-2").join(METRICS_FILE).exists());
        assert!(tmp.path().join("job-2").join(PRISMA_FILE).exists());
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let tmp = tempfile::tempdir().unwrap();
        let err = CsvSink::new(tmp.path()).write("../escape", &[], None, &PrismaFlow::default()).await.unwrap_err();
        assert!(matches!(err, SlrError::SinkWrite(_)));
    }
}
