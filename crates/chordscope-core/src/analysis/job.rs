//! Detached analysis jobs
//!
//! A job runs on the rayon pool and hands its result back over a one-slot
//! channel. The caller owns the receiving end only; dropping it abandons the
//! job and the worker's send fails silently. A worker that panics drops its
//! sender, which the caller sees as `WorkerLost`.

use super::{AnalysisResult, Analyzer};
use crate::error::{AnalysisError, Result};
use crossbeam_channel::{bounded, Receiver, TryRecvError};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Handle to an analysis running in the background
#[derive(Debug)]
pub struct AnalysisJob {
    rx: Receiver<Result<AnalysisResult>>,
}

impl AnalysisJob {
    pub(super) fn start(analyzer: Arc<Analyzer>, samples: Vec<f32>, sample_rate: u32) -> Self {
        Self::run(move || analyzer.analyze(&samples, sample_rate))
    }

    fn run<F>(work: F) -> Self
    where
        F: FnOnce() -> Result<AnalysisResult> + Send + 'static,
    {
        let (tx, rx) = bounded(1);

        rayon::spawn(move || {
            // An uncaught panic here would abort the process
            match panic::catch_unwind(AssertUnwindSafe(work)) {
                Ok(result) => {
                    if tx.send(result).is_err() {
                        log::debug!("Analysis job abandoned; discarding result");
                    }
                }
                Err(_) => log::error!("Analysis worker panicked; no result delivered"),
            }
        });

        Self { rx }
    }

    /// Block until the analysis finishes
    pub fn wait(self) -> Result<AnalysisResult> {
        self.rx.recv().map_err(|_| AnalysisError::WorkerLost)?
    }

    /// Take the result if the analysis has finished, without blocking.
    /// The result is handed out once; later calls report `WorkerLost`.
    pub fn try_result(&self) -> Option<Result<AnalysisResult>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(AnalysisError::WorkerLost)),
        }
    }
}
