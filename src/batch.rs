//! Fixed-size pull-based worker pool used by the batch jobs. Workers pop
//! records off a shared queue; a failed record is re-enqueued after a fixed
//! backoff until its attempts run out, then counted as failed with its last
//! error. A per-record failure never aborts the batch.

use crate::error::Result;
use metrics::{counter, histogram};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub concurrency: usize,
    /// Total attempts per record, first try included.
    pub max_attempts: u32,
    /// Wait before a failed record goes back on the queue.
    pub retry_delay: Duration,
    /// Minimum wall-clock spent per record, to pace remote writes.
    pub pacing: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            concurrency: 5,
            max_attempts: 2,
            retry_delay: Duration::from_millis(500),
            pacing: Duration::ZERO,
        }
    }
}

/// Terminal result of one record's operation. Errors are the retryable path
/// and travel through `Result` instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Completed,
    Skipped(String),
}

#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub total: usize,
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub errors: Vec<String>,
    pub skip_reasons: Vec<String>,
}

impl BatchReport {
    /// Invariant: equals `total` once the queue drains.
    pub fn accounted(&self) -> usize {
        self.completed + self.skipped + self.failed
    }
}

pub async fn run_batch<T, F, Fut>(
    job: &str,
    records: Vec<T>,
    options: &BatchOptions,
    op: F,
) -> BatchReport
where
    T: Clone + Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + Clone + 'static,
    Fut: Future<Output = Result<RecordOutcome>> + Send,
{
    let total = records.len();
    let started = Instant::now();
    counter!("ncd_batch_runs_total", "job" => job.to_string()).increment(1);

    let queue: Arc<Mutex<VecDeque<(usize, u32, T)>>> = Arc::new(Mutex::new(
        records
            .into_iter()
            .enumerate()
            .map(|(idx, record)| (idx, 1u32, record))
            .collect(),
    ));
    let report = Arc::new(Mutex::new(BatchReport {
        total,
        ..BatchReport::default()
    }));

    let workers = options.concurrency.max(1);
    let mut handles = Vec::with_capacity(workers);
    for worker in 0..workers {
        let queue = Arc::clone(&queue);
        let report = Arc::clone(&report);
        let op = op.clone();
        let options = options.clone();
        handles.push(tokio::spawn(async move {
            loop {
                let next = queue.lock().await.pop_front();
                let Some((idx, attempt, record)) = next else {
                    break;
                };
                let record_started = Instant::now();
                match op(record.clone()).await {
                    Ok(RecordOutcome::Completed) => {
                        let mut report = report.lock().await;
                        report.completed += 1;
                        let done = report.accounted();
                        if done % 20 == 0 {
                            info!("worker#{worker} processed {done}/{total} records");
                        }
                    }
                    Ok(RecordOutcome::Skipped(reason)) => {
                        let mut report = report.lock().await;
                        report.skipped += 1;
                        report.skip_reasons.push(format!("record {idx}: {reason}"));
                    }
                    Err(err) => {
                        warn!("worker#{worker} attempt {attempt} failed for record {idx}: {err}");
                        if attempt < options.max_attempts {
                            tokio::time::sleep(options.retry_delay).await;
                            queue.lock().await.push_back((idx, attempt + 1, record));
                        } else {
                            let mut report = report.lock().await;
                            report.failed += 1;
                            report.errors.push(format!("record {idx}: {err}"));
                        }
                    }
                }
                let elapsed = record_started.elapsed();
                if elapsed < options.pacing {
                    tokio::time::sleep(options.pacing - elapsed).await;
                }
            }
        }));
    }
    for handle in handles {
        let _ = handle.await;
    }

    let report = match Arc::try_unwrap(report) {
        Ok(mutex) => mutex.into_inner(),
        Err(shared) => shared.lock().await.clone(),
    };

    let duration_secs = started.elapsed().as_secs_f64();
    counter!("ncd_batch_records_completed_total", "job" => job.to_string())
        .increment(report.completed as u64);
    counter!("ncd_batch_records_skipped_total", "job" => job.to_string())
        .increment(report.skipped as u64);
    counter!("ncd_batch_records_failed_total", "job" => job.to_string())
        .increment(report.failed as u64);
    histogram!("ncd_batch_duration_seconds", "job" => job.to_string()).record(duration_secs);

    push_pushgateway_metrics(job, &report, duration_secs).await;

    report
}

/// Push a minimal metrics snapshot to a Prometheus Pushgateway when
/// NCD_PUSHGATEWAY_URL is configured.
async fn push_pushgateway_metrics(job: &str, report: &BatchReport, duration_secs: f64) {
    let base = match std::env::var("NCD_PUSHGATEWAY_URL") {
        Ok(v) if !v.trim().is_empty() => v,
        _ => return,
    };
    let push_url = format!(
        "{}/metrics/job/{}/instance/{}",
        base.trim_end_matches('/'),
        "ncd_maintenance",
        job
    );

    let timestamp_secs = chrono::Utc::now().timestamp() as f64;
    let body = format!(
        "# TYPE ncd_batch_runs_total counter\n\
         ncd_batch_runs_total 1\n\
         # TYPE ncd_batch_records_completed_total counter\n\
         ncd_batch_records_completed_total {}\n\
         # TYPE ncd_batch_records_skipped_total counter\n\
         ncd_batch_records_skipped_total {}\n\
         # TYPE ncd_batch_records_failed_total counter\n\
         ncd_batch_records_failed_total {}\n\
         # TYPE ncd_batch_duration_seconds gauge\n\
         ncd_batch_duration_seconds {}\n\
         # TYPE ncd_batch_last_run_timestamp_seconds gauge\n\
         ncd_batch_last_run_timestamp_seconds {}\n",
        report.completed, report.skipped, report.failed, duration_secs, timestamp_secs
    );

    let client = reqwest::Client::new();
    let push_res = client
        .post(&push_url)
        .header("Content-Type", "text/plain; version=0.0.4")
        .body(body)
        .send()
        .await;

    match push_res {
        Ok(r) if r.status().is_success() => {
            info!("Pushed metrics to Pushgateway for job={job}");
        }
        Ok(r) => {
            warn!(
                "Pushgateway push responded with status {} for job={job}",
                r.status().as_u16()
            );
        }
        Err(e) => {
            warn!("Failed to push metrics to Pushgateway for job={job}: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MaintenanceError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn options(concurrency: usize, max_attempts: u32) -> BatchOptions {
        BatchOptions {
            concurrency,
            max_attempts,
            retry_delay: Duration::from_millis(1),
            pacing: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn every_record_is_accounted_for() {
        let records: Vec<u32> = (0..10).collect();
        let report = run_batch("test", records, &options(3, 1), |record| async move {
            if record == 3 || record == 7 {
                Err(MaintenanceError::Config(format!("forced failure {record}")))
            } else {
                Ok(RecordOutcome::Completed)
            }
        })
        .await;

        assert_eq!(report.total, 10);
        assert_eq!(report.completed, 8);
        assert_eq!(report.failed, 2);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.accounted(), 10);
        assert_eq!(report.errors.len(), 2);
    }

    #[tokio::test]
    async fn transient_failures_are_retried_to_success() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        let report = run_batch("test", vec![1u32], &options(2, 2), move |_record| {
            let counter = Arc::clone(&counter);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(MaintenanceError::Config("first attempt fails".into()))
                } else {
                    Ok(RecordOutcome::Completed)
                }
            }
        })
        .await;

        assert_eq!(report.completed, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn skips_are_counted_separately() {
        let records: Vec<u32> = (0..4).collect();
        let report = run_batch("test", records, &options(2, 1), |record| async move {
            if record % 2 == 0 {
                Ok(RecordOutcome::Skipped("missing id".into()))
            } else {
                Ok(RecordOutcome::Completed)
            }
        })
        .await;

        assert_eq!(report.completed, 2);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.failed, 0);
        assert_eq!(report.accounted(), 4);
        assert_eq!(report.skip_reasons.len(), 2);
    }
}
