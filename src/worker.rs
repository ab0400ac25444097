use chrono::NaiveDate;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc, oneshot};
use crate::analytics::analyze_pet;
use crate::error::AnalyticsError;
use crate::models::{Pet, PetAnalysis};

// One queued analysis - pet + channel to send the result back on
pub struct AnalysisJob {
    pub pet: Pet,
    pub today: NaiveDate,
    pub response_tx: oneshot::Sender<Result<PetAnalysis, AnalyticsError>>,
}

/// Fixed-size pool of analysis workers draining one bounded job queue.
pub struct AnalysisPool {
    job_tx: mpsc::Sender<AnalysisJob>,
    workers: usize,
}

impl AnalysisPool {
    // Must be called from inside a tokio runtime
    pub fn new(workers: usize, queue_capacity: usize) -> Self {
        let workers = workers.max(1);
        let (job_tx, job_rx) = mpsc::channel::<AnalysisJob>(queue_capacity.max(1));
        let job_rx = Arc::new(Mutex::new(job_rx));

        for id in 0..workers {
            tokio::spawn(analysis_worker(id, Arc::clone(&job_rx)));
        }
        tracing::debug!(workers, queue_capacity, "analysis pool started");

        Self { job_tx, workers }
    }

    // No workers; the caller owns the queue's receiving end
    #[cfg(test)]
    pub(crate) fn detached(queue_capacity: usize) -> (Self, mpsc::Receiver<AnalysisJob>) {
        let (job_tx, job_rx) = mpsc::channel::<AnalysisJob>(queue_capacity.max(1));
        (Self { job_tx, workers: 0 }, job_rx)
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Queue a pet for analysis. Waits while the queue is full.
    pub async fn submit(
        &self,
        pet: Pet,
        today: NaiveDate,
    ) -> Result<oneshot::Receiver<Result<PetAnalysis, AnalyticsError>>, AnalyticsError> {
        let (response_tx, response_rx) = oneshot::channel();

        self.job_tx
            .send(AnalysisJob { pet, today, response_tx })
            .await
            .map_err(|_| AnalyticsError::PoolClosed)?;

        Ok(response_rx)
    }
}

async fn analysis_worker(id: usize, rx: Arc<Mutex<mpsc::Receiver<AnalysisJob>>>) {
    loop {
        // hold the lock only while waiting for the next job
        let job = {
            let mut rx = rx.lock().await;
            rx.recv().await
        };

        let Some(job) = job else {
            tracing::debug!(worker = id, "analysis queue closed, worker exiting");
            break;
        };

        let result = analyze_pet(&job.pet, job.today);
        // receiver gone means the aggregation was abandoned
        let _ = job.response_tx.send(result);
    }
}
