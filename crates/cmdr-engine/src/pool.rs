//! Fixed-size worker pool for parallel pipelines
//!
//! Workers are scoped threads pulling jobs from one shared channel. Each
//! worker builds its own state (in practice a database connection) before
//! taking its first job.

use cmdr_core::errors::{CmdError, CommandError, Result};
use std::sync::{mpsc, Mutex};
use std::thread;

fn worker_failure(reason: impl Into<String>) -> CmdError {
    CommandError::WorkerFailure {
        reason: reason.into(),
    }
    .into()
}

#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    size: usize,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        Self { size: size.max(1) }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Run every job `produce` submits through `work` on the pool
    ///
    /// `init` runs once per worker with the worker index. Jobs are consumed
    /// while `produce` is still submitting. Results come back in completion
    /// order. An error from `produce` wins over worker errors; otherwise the
    /// first worker error is returned. A panicked worker, or a job that never
    /// produced a result, fails the whole run.
    pub fn run<S, J, R, I, W, P>(&self, init: I, work: W, produce: P) -> Result<Vec<R>>
    where
        J: Send,
        R: Send,
        I: Fn(usize) -> Result<S> + Sync,
        W: Fn(&mut S, J) -> Result<R> + Sync,
        P: FnOnce(&mut dyn FnMut(J) -> Result<()>) -> Result<()>,
    {
        let (job_tx, job_rx) = mpsc::channel::<J>();
        let job_rx = Mutex::new(job_rx);
        let (result_tx, result_rx) = mpsc::channel::<Result<R>>();

        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(self.size);
            for index in 0..self.size {
                let job_rx = &job_rx;
                let result_tx = result_tx.clone();
                let init = &init;
                let work = &work;

                let spawned = thread::Builder::new()
                    .name(format!("cmdr-worker-{}", index))
                    .spawn_scoped(scope, move || {
                        let mut state = match init(index) {
                            Ok(state) => state,
                            Err(err) => {
                                let _ = result_tx.send(Err(err));
                                return;
                            }
                        };
                        loop {
                            let job = match job_rx.lock() {
                                Ok(receiver) => receiver.recv(),
                                Err(_) => return,
                            };
                            let Ok(job) = job else {
                                return;
                            };
                            if result_tx.send(work(&mut state, job)).is_err() {
                                return;
                            }
                        }
                    });

                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(err) => {
                        tracing::warn!(worker = index, error = %err, "failed to spawn worker");
                    }
                }
            }
            drop(result_tx);

            if handles.is_empty() {
                return Err(worker_failure("no worker could be started"));
            }

            let mut submitted = 0usize;
            let produced = {
                let mut submit = |job: J| -> Result<()> {
                    job_tx
                        .send(job)
                        .map_err(|_| worker_failure("job channel closed"))?;
                    submitted += 1;
                    Ok(())
                };
                produce(&mut submit)
            };
            drop(job_tx);

            let mut outputs = Vec::with_capacity(submitted);
            let mut first_error = None;
            for result in result_rx.iter() {
                match result {
                    Ok(output) => outputs.push(output),
                    Err(err) => {
                        first_error.get_or_insert(err);
                    }
                }
            }

            let mut panicked = 0usize;
            for handle in handles {
                if handle.join().is_err() {
                    panicked += 1;
                }
            }

            produced?;
            if let Some(err) = first_error {
                return Err(err);
            }
            if panicked > 0 {
                return Err(worker_failure(format!("{} worker(s) panicked", panicked)));
            }
            if outputs.len() < submitted {
                return Err(worker_failure(format!(
                    "{} of {} unit(s) produced no result",
                    submitted - outputs.len(),
                    submitted
                )));
            }
            Ok(outputs)
        })
    }
}
