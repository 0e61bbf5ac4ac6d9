//! Single-job submission to the processing tier.

use crate::result::{Job, JobResult};
use docparse_tonic_core::codec;
use docparse_tonic_core::proto::{ParseRequest, doc_parser_client::DocParserClient};
use tonic::transport::Channel;

/// Submits one job over the given client and returns its result.
///
/// Every failure mode - an unreadable input file, a transport error, a
/// non-OK status from the server - is captured as a failed
/// [`JobResult`] and logged; this function never propagates an error,
/// so a single bad job cannot abort the batch.
pub async fn submit(job: Job, mut client: DocParserClient<Channel>) -> JobResult {
    let file_path = job.path.display().to_string();

    let encoded = match tokio::fs::read(&job.path).await {
        Ok(bytes) => codec::encode(&bytes),
        Err(e) => {
            tracing::error!("File: {file_path} - Info: failed to read document: {e}");
            return JobResult::failed(file_path, format!("failed to read document: {e}"));
        }
    };

    let request = ParseRequest {
        file: encoded,
        kwargs: job.options.into_map(),
    };

    match client.parse(request).await {
        Ok(response) => JobResult::succeeded(file_path, response.into_inner().output_dir),
        Err(status) => {
            tracing::error!("File: {file_path} - Info: {}: {}", status.code(), status.message());
            JobResult::failed(
                file_path,
                format!("{}: {}", status.code(), status.message()),
            )
        }
    }
}
