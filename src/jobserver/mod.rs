//! Bounded worker pool draining a shared job queue.
//!
//! Jobs enter through [`JobServer::add_job`], which enforces the miner
//! whitelist and nonce dedup before queueing, and leave through
//! [`JobServer::get_job_result`] once a worker has stored a terminal result.

pub mod dispatcher;

pub use dispatcher::Dispatcher;

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use metrics::{counter, gauge};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{Job, JobResult};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("this job is not from a whitelisted miner")]
    NotWhitelisted,
    #[error("job already executed")]
    DuplicateNonce,
    #[error("job queue is closed")]
    QueueClosed,
}

#[derive(Default)]
struct ResultStore {
    results: HashMap<Uuid, JobResult>,
    /// Every nonce ever accepted, including the empty one. A nonce is burned
    /// at submission, not at completion, so a replay racing the original
    /// still loses.
    nonces: HashSet<String>,
}

pub struct JobServer {
    tx: mpsc::UnboundedSender<Job>,
    rx: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Job>>>,
    store: Arc<Mutex<ResultStore>>,
    dispatcher: Arc<Dispatcher>,
    workers: usize,
    default_timeout: Duration,
    /// Miner worker IDs allowed to submit. Empty means open admission.
    whitelist: HashSet<String>,
}

impl JobServer {
    pub fn new(
        workers: usize,
        default_timeout: Duration,
        whitelist: HashSet<String>,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Arc::new(tokio::sync::Mutex::new(rx)),
            store: Arc::new(Mutex::new(ResultStore::default())),
            dispatcher,
            workers: workers.max(1),
            default_timeout,
            whitelist,
        }
    }

    /// Admit a job: whitelist check, nonce dedup, UUID assignment, enqueue.
    /// The returned UUID is the handle for later result polling.
    pub fn add_job(&self, mut job: Job) -> Result<Uuid, SubmitError> {
        // Only identified submitters are screened; a job with no worker ID
        // bypasses the whitelist.
        if !job.worker_id.is_empty()
            && !self.whitelist.is_empty()
            && !self.whitelist.contains(&job.worker_id)
        {
            counter!("jobs_rejected_total", "reason" => "not_whitelisted").increment(1);
            warn!(worker_id = %job.worker_id, "rejected job from non-whitelisted miner");
            return Err(SubmitError::NotWhitelisted);
        }

        {
            let mut store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
            if !store.nonces.insert(job.nonce.clone()) {
                counter!("jobs_rejected_total", "reason" => "duplicate_nonce").increment(1);
                return Err(SubmitError::DuplicateNonce);
            }
        }

        let uuid = Uuid::new_v4();
        job.uuid = Some(uuid);
        debug!(%uuid, job_type = %job.job_type, "job queued");
        counter!("jobs_submitted_total").increment(1);
        self.tx.send(job).map_err(|_| SubmitError::QueueClosed)?;
        gauge!("job_queue_depth").increment(1.0);
        Ok(uuid)
    }

    /// The capability snapshot the telemetry executor reports from. Replaced
    /// wholesale on re-detection, never edited in place.
    pub fn capabilities(&self) -> &Arc<crate::capabilities::CapabilitySnapshot> {
        self.dispatcher.capabilities()
    }

    /// Fetch the result of a finished job, if any. Submitted-but-unfinished
    /// jobs return None; results stay retrievable for the server's lifetime.
    pub fn get_job_result(&self, uuid: &Uuid) -> Option<JobResult> {
        self.store
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .results
            .get(uuid)
            .cloned()
    }

    /// Run the worker pool until `cancel` fires, then drain and return.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(workers = self.workers, "job server starting");
        let mut handles = Vec::with_capacity(self.workers);
        for worker_id in 0..self.workers {
            handles.push(tokio::spawn(worker_loop(
                worker_id,
                Arc::clone(&self.rx),
                Arc::clone(&self.store),
                Arc::clone(&self.dispatcher),
                self.default_timeout,
                cancel.clone(),
            )));
        }
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "worker task aborted");
            }
        }
        info!("job server stopped");
    }
}

async fn worker_loop(
    worker_id: usize,
    rx: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Job>>>,
    store: Arc<Mutex<ResultStore>>,
    dispatcher: Arc<Dispatcher>,
    default_timeout: Duration,
    cancel: CancellationToken,
) {
    loop {
        // Hold the queue lock only while waiting for the next job, never
        // while executing one.
        let job = {
            let mut rx = rx.lock().await;
            tokio::select! {
                _ = cancel.cancelled() => break,
                received = rx.recv() => match received {
                    Some(job) => job,
                    None => break,
                },
            }
        };

        gauge!("job_queue_depth").decrement(1.0);

        let Some(uuid) = job.uuid else {
            warn!(worker_id, "dropping job queued without a uuid");
            continue;
        };

        let timeout = if job.timeout > 0 {
            Duration::from_secs(job.timeout)
        } else {
            default_timeout
        };

        debug!(worker_id, %uuid, job_type = %job.job_type, "executing job");
        let result = match tokio::time::timeout(timeout, dispatcher.execute(&job)).await {
            Ok(result) => result,
            Err(_) => {
                counter!("jobs_timed_out_total").increment(1);
                warn!(worker_id, %uuid, timeout_secs = timeout.as_secs(), "job timed out");
                JobResult::err(
                    job.clone(),
                    format!("job execution timed out after {}s", timeout.as_secs()),
                )
            }
        };

        if result.success() {
            counter!("jobs_completed_total").increment(1);
        } else {
            counter!("jobs_failed_total").increment(1);
        }

        store
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .results
            .insert(uuid, result);
    }
    debug!(worker_id, "worker exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::CapabilitySnapshot;
    use crate::models::{JobArguments, JobType};
    use crate::twitter::pool::AccountPool;
    use crate::twitter::TwitterScraper;

    fn server(whitelist: &[&str]) -> JobServer {
        let pool = Arc::new(AccountPool::new(
            Vec::new(),
            Vec::new(),
            Duration::from_secs(900),
        ));
        let dispatcher = Arc::new(Dispatcher::new(
            TwitterScraper::new(pool, None),
            None,
            Arc::new(CapabilitySnapshot::default()),
        ));
        JobServer::new(
            2,
            Duration::from_secs(5),
            whitelist.iter().map(|s| s.to_string()).collect(),
            dispatcher,
        )
    }

    fn telemetry_job(nonce: &str, worker_id: &str) -> Job {
        let mut job = Job::new(JobType::Telemetry, JobArguments::new());
        job.nonce = nonce.to_string();
        job.worker_id = worker_id.to_string();
        job
    }

    #[tokio::test]
    async fn rejects_non_whitelisted_miner() {
        let server = server(&["miner-1"]);
        let err = server.add_job(telemetry_job("n1", "stranger")).unwrap_err();
        assert_eq!(err, SubmitError::NotWhitelisted);
        assert_eq!(
            err.to_string(),
            "this job is not from a whitelisted miner"
        );

        assert!(server.add_job(telemetry_job("n2", "miner-1")).is_ok());
    }

    #[tokio::test]
    async fn empty_whitelist_admits_anyone() {
        let server = server(&[]);
        assert!(server.add_job(telemetry_job("n1", "anyone")).is_ok());
    }

    #[tokio::test]
    async fn unset_worker_id_bypasses_whitelist() {
        let server = server(&["miner-1"]);
        assert!(server.add_job(telemetry_job("n1", "")).is_ok());
    }

    #[tokio::test]
    async fn duplicate_nonce_is_rejected_even_when_empty() {
        let server = server(&[]);
        assert!(server.add_job(telemetry_job("", "a")).is_ok());
        let err = server.add_job(telemetry_job("", "b")).unwrap_err();
        assert_eq!(err, SubmitError::DuplicateNonce);
        assert_eq!(err.to_string(), "job already executed");
    }

    #[tokio::test]
    async fn unexecuted_job_has_no_result() {
        let server = server(&[]);
        let uuid = server.add_job(telemetry_job("n1", "a")).unwrap();
        assert!(server.get_job_result(&uuid).is_none());
    }

    #[tokio::test]
    async fn workers_execute_queued_jobs() {
        let server = Arc::new(server(&[]));
        let cancel = CancellationToken::new();
        let runner = {
            let server = Arc::clone(&server);
            let cancel = cancel.clone();
            tokio::spawn(async move { server.run(cancel).await })
        };

        let uuid = server.add_job(telemetry_job("n1", "a")).unwrap();

        let mut result = None;
        for _ in 0..100 {
            if let Some(found) = server.get_job_result(&uuid) {
                result = Some(found);
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let result = result.expect("job never finished");
        assert!(result.success(), "error: {:?}", result.error);

        cancel.cancel();
        runner.await.unwrap();
    }
}
