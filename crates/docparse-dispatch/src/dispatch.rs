//! Bounded parallel fan-out of a job batch.

use crate::error::{Error, Result};
use crate::probe;
use crate::result::{Job, JobResult};
use crate::submit;
use core::time::Duration;
use docparse_tonic_core::proto::doc_parser_client::DocParserClient;
use futures::StreamExt;
use futures::stream;
use tonic::transport::Channel;

/// Where and how to reach the processing tier.
#[derive(Debug, Clone)]
pub struct Target {
    pub host: String,
    pub port: u16,
    pub max_attempts: usize,
    pub retry_delay: Duration,
}

impl Target {
    fn endpoint(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Effective fan-out degree for a batch: never more workers than jobs,
/// never more than the configured limit, never fewer than one.
pub fn effective_parallelism(jobs: usize, max_parallelism: usize) -> usize {
    jobs.clamp(1, max_parallelism.max(1))
}

/// Dispatches a batch and blocks until every job has produced a
/// [`JobResult`].
///
/// A target that does not form a valid endpoint URI is rejected
/// up front. The readiness probe runs before the first dispatch; if it
/// exhausts its budget, nothing is dispatched and
/// [`Error::UnreachableTarget`] is returned. An empty batch yields an
/// empty result set with a warning. Otherwise the jobs fan out across
/// `effective_parallelism` concurrent call sites; each produces exactly
/// one result, and one job's failure never cancels the others. Result
/// order does not follow submission order.
pub async fn run(
    jobs: Vec<Job>,
    target: &Target,
    max_parallelism: usize,
) -> Result<Vec<JobResult>> {
    let endpoint = Channel::from_shared(target.endpoint()).map_err(|e| Error::InvalidTarget {
        endpoint: target.endpoint(),
        detail: e.to_string(),
    })?;

    if !probe::wait_until_ready(&target.host, target.port, target.max_attempts, target.retry_delay)
        .await
    {
        return Err(Error::UnreachableTarget {
            host: target.host.clone(),
            port: target.port,
            attempts: target.max_attempts,
        });
    }

    if jobs.is_empty() {
        tracing::warn!("No jobs to dispatch");
        return Ok(Vec::new());
    }

    let parallelism = effective_parallelism(jobs.len(), max_parallelism);
    tracing::info!(
        "Dispatching {} jobs with parallelism {}",
        jobs.len(),
        parallelism
    );

    // Lazy connect: the probe already established reachability, and any
    // later transport failure belongs to the job it hits, not to the
    // batch.
    let client = DocParserClient::new(endpoint.connect_lazy());

    let results: Vec<JobResult> = stream::iter(jobs)
        .map(|job| {
            let client = client.clone();
            submit::submit(job, client)
        })
        .buffer_unordered(parallelism)
        .collect()
        .await;

    Ok(results)
}
