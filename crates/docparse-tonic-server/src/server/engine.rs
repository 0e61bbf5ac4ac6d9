//! Seam to the external parsing operation.
//!
//! The actual document-parsing algorithm is an external collaborator
//! with a single call contract. A [`ParseEngine`] instance is loaded
//! once per worker slot and stays attached to that slot's device for
//! the slot's lifetime; two slots never share a live engine.

use crate::server::config::DeviceBinding;
use docparse_tonic_core::{Error, OptionSet, Result};
use std::fs;
use std::path::PathBuf;

/// One loaded model instance, exclusively owned by a worker slot.
///
/// Implementations must not perform any accelerator-sensing work
/// before they receive the [`DeviceBinding`] at load time; the binding
/// is the slot's fixed device identity.
pub trait ParseEngine: Send + 'static {
    /// Runs the parsing operation for one job. Output must land under
    /// the engine's output root at `job_id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Processing`] when the operation fails. The
    /// caller surfaces the failure and still reclaims memory; the
    /// engine must not retry internally.
    fn parse(&mut self, document: &[u8], job_id: &str, opts: &OptionSet) -> Result<()>;

    /// Releases cached device memory after a job.
    ///
    /// Idempotent and infallible by contract: internal failures are
    /// logged by the implementation, never propagated, so cleanup can
    /// never mask the original processing error.
    fn reclaim(&mut self);
}

/// Default engine binding for the server binary.
///
/// Stands in at the seam where a real model integrates: it materializes
/// `output_dir/<job_id>/` and stores the raw document there, so the
/// full dispatch/routing/cleanup path is exercised end to end.
pub struct PassthroughEngine {
    binding: DeviceBinding,
    output_dir: PathBuf,
}

impl PassthroughEngine {
    /// Attaches an engine to its device and prepares the output root.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when the output root cannot be
    /// created; the slot is then excluded from routing.
    pub fn load(binding: DeviceBinding, output_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&output_dir).map_err(|e| Error::Configuration {
            detail: format!("cannot create output root {}: {e}", output_dir.display()),
        })?;
        tracing::info!(device = %binding, "engine attached");
        Ok(Self {
            binding,
            output_dir,
        })
    }
}

impl ParseEngine for PassthroughEngine {
    fn parse(&mut self, document: &[u8], job_id: &str, opts: &OptionSet) -> Result<()> {
        let job_dir = self.output_dir.join(job_id);
        fs::create_dir_all(&job_dir).map_err(|e| Error::Processing {
            detail: format!("cannot create job directory {}: {e}", job_dir.display()),
        })?;
        fs::write(job_dir.join("document.pdf"), document).map_err(|e| Error::Processing {
            detail: format!("cannot store document for job {job_id}: {e}"),
        })?;

        if opts.debug_enabled {
            tracing::debug!(
                device = %self.binding,
                job_id,
                parse_method = %opts.parse_method,
                bytes = document.len(),
                "parsed document"
            );
        }
        Ok(())
    }

    fn reclaim(&mut self) {
        // Nothing device-resident to drop here; a real engine would
        // empty its accelerator cache.
        tracing::trace!(device = %self.binding, "released cached device memory");
    }
}
