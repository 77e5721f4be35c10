// Fetch worker
//
// Runs the ingestion collaborator on its own thread so a slow or dead
// backend never stalls the frame loop. The frame loop sends requests and
// drains responses with `try_recv`; all graph state stays on the main thread.

use super::source::Collaborator;
use super::{Device, TrafficBatch};
use crate::error::IngestError;
use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use std::io;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

/// Work handed to the fetch thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchRequest {
    Traffic,
    Devices,
    SetBlocked { address: String, blocked: bool },
    Shutdown,
}

/// Results coming back from the fetch thread
#[derive(Debug)]
pub enum FetchResponse {
    Traffic(Result<TrafficBatch, IngestError>),
    Devices(Result<Vec<Device>, IngestError>),
    Blocked {
        address: String,
        blocked: bool,
        ok: bool,
    },
}

/// Handle to the background fetch thread
pub struct FetchWorker {
    requests: Sender<FetchRequest>,
    responses: Receiver<FetchResponse>,
    handle: Option<JoinHandle<()>>,
}

impl FetchWorker {
    /// Spawn the fetch thread around a collaborator
    pub fn spawn<S>(source: S) -> io::Result<Self>
    where
        S: Collaborator + 'static,
    {
        let (req_tx, req_rx) = unbounded::<FetchRequest>();
        let (resp_tx, resp_rx) = unbounded::<FetchResponse>();

        let handle = thread::Builder::new()
            .name("ghostgraph-fetch".to_string())
            .spawn(move || run(source, req_rx, resp_tx))?;

        Ok(Self {
            requests: req_tx,
            responses: resp_rx,
            handle: Some(handle),
        })
    }

    /// Queue a request; fails only if the thread has exited
    pub fn request(&self, request: FetchRequest) -> Result<(), IngestError> {
        self.requests
            .send(request)
            .map_err(|_| IngestError::WorkerGone)
    }

    /// Take one finished response without blocking
    pub fn try_recv(&self) -> Option<FetchResponse> {
        match self.responses.try_recv() {
            Ok(resp) => Some(resp),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => None,
        }
    }
}

impl Drop for FetchWorker {
    fn drop(&mut self) {
        let _ = self.requests.send(FetchRequest::Shutdown);
        if let Some(handle) = self.handle.take() {
            // A request may still be in flight; the HTTP timeout bounds this wait
            if handle.join().is_err() {
                warn!("Fetch worker panicked");
            }
        }
    }
}

fn run<S: Collaborator>(
    mut source: S,
    requests: Receiver<FetchRequest>,
    responses: Sender<FetchResponse>,
) {
    debug!("Fetch worker started");
    for request in requests.iter() {
        let response = match request {
            FetchRequest::Traffic => FetchResponse::Traffic(source.fetch_batch()),
            FetchRequest::Devices => FetchResponse::Devices(source.list_devices()),
            FetchRequest::SetBlocked { address, blocked } => {
                let ok = source.set_blocked(&address, blocked);
                FetchResponse::Blocked {
                    address,
                    blocked,
                    ok,
                }
            }
            FetchRequest::Shutdown => break,
        };
        if responses.send(response).is_err() {
            break;
        }
    }
    debug!("Fetch worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traffic::source::SyntheticSource;
    use crate::traffic::SubnetPlan;
    use std::time::{Duration, Instant};

    fn wait_for(worker: &FetchWorker) -> FetchResponse {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(resp) = worker.try_recv() {
                return resp;
            }
            assert!(Instant::now() < deadline, "worker did not answer");
            thread::sleep(Duration::from_millis(5));
        }
    }

    fn worker() -> FetchWorker {
        FetchWorker::spawn(SyntheticSource::new(9, SubnetPlan::default()).without_host_load())
            .unwrap()
    }

    #[test]
    fn test_traffic_request_round_trip() {
        let worker = worker();
        worker.request(FetchRequest::Traffic).unwrap();
        match wait_for(&worker) {
            FetchResponse::Traffic(Ok(batch)) => assert!(!batch.events.is_empty()),
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[test]
    fn test_set_blocked_reports_outcome() {
        let worker = worker();
        worker
            .request(FetchRequest::SetBlocked {
                address: "192.168.1.15".to_string(),
                blocked: true,
            })
            .unwrap();
        match wait_for(&worker) {
            FetchResponse::Blocked { address, blocked, ok } => {
                assert_eq!(address, "192.168.1.15");
                assert!(blocked);
                assert!(ok);
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[test]
    fn test_try_recv_is_empty_without_requests() {
        let worker = worker();
        assert!(worker.try_recv().is_none());
    }
}
