//! Operating-system process enumeration

use anyhow::{anyhow, Context, Result};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread;
use std::time::Duration;
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System};

/// Lists the names of running processes
pub trait ProcessQuery: Send {
    fn process_names(&mut self) -> Result<Vec<String>>;
}

impl<F> ProcessQuery for F
where
    F: FnMut() -> Result<Vec<String>> + Send,
{
    fn process_names(&mut self) -> Result<Vec<String>> {
        self()
    }
}

/// Process table read through `sysinfo`
pub struct SysinfoProcessQuery {
    system: System,
}

impl SysinfoProcessQuery {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for SysinfoProcessQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessQuery for SysinfoProcessQuery {
    fn process_names(&mut self) -> Result<Vec<String>> {
        // Names are always collected; skip cpu/memory/disk sampling
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::new(),
        );

        Ok(self
            .system
            .processes()
            .values()
            .map(|process| process.name().to_string_lossy().into_owned())
            .collect())
    }
}

/// Runs another query on a worker thread and gives up waiting after `timeout`.
///
/// A query that times out stays outstanding and no new request is queued
/// behind it. Its answer describes the process table of an earlier poll, so
/// when it finally arrives it is discarded and a fresh query is issued.
pub struct TimeoutQuery {
    timeout: Duration,
    request_tx: Sender<()>,
    response_rx: Receiver<Result<Vec<String>>>,
    pending: bool,
}

impl TimeoutQuery {
    pub fn spawn(mut inner: Box<dyn ProcessQuery>, timeout: Duration) -> Result<Self> {
        let (request_tx, request_rx) = channel::<()>();
        let (response_tx, response_rx) = channel();

        thread::Builder::new()
            .name("process-query".into())
            .spawn(move || {
                while request_rx.recv().is_ok() {
                    if response_tx.send(inner.process_names()).is_err() {
                        break;
                    }
                }
            })
            .context("Failed to start process query thread")?;

        Ok(Self {
            timeout,
            request_tx,
            response_rx,
            pending: false,
        })
    }
}

impl ProcessQuery for TimeoutQuery {
    fn process_names(&mut self) -> Result<Vec<String>> {
        if self.pending {
            match self.response_rx.try_recv() {
                Ok(_) => {
                    log::debug!("Discarding process list from a timed-out query");
                    self.pending = false;
                }
                Err(TryRecvError::Empty) => {
                    return Err(anyhow!("previous process enumeration is still running"));
                }
                Err(TryRecvError::Disconnected) => {
                    return Err(anyhow!("process query thread has exited"));
                }
            }
        }

        self.request_tx
            .send(())
            .map_err(|_| anyhow!("process query thread has exited"))?;
        self.pending = true;

        match self.response_rx.recv_timeout(self.timeout) {
            Ok(result) => {
                self.pending = false;
                result
            }
            Err(RecvTimeoutError::Timeout) => Err(anyhow!(
                "process enumeration did not finish within {:?}",
                self.timeout
            )),
            Err(RecvTimeoutError::Disconnected) => {
                Err(anyhow!("process query thread has exited"))
            }
        }
    }
}
