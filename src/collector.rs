//! Size-calculation orchestrator
//!
//! Drives the appliance-side dir-size task through its full lifecycle for
//! one measurement run: open a session, start the task, poll its status on
//! a fixed cadence until it finishes or fails, publish the result, release
//! the task and log out. An application-level failure mid-poll restarts the
//! whole protocol from authentication, at most once per triggered run; a
//! transport failure abandons the run outright without touching the
//! (presumed unreachable) appliance again.

use serde::Deserialize;

use crate::appliance::session::DIRSIZE_API;
use crate::appliance::{ApiClient, ApiRequest, Session, SessionManager};
use crate::error::{MeterError, Result};
use crate::state::{AppState, SizeMeasurement};

/// Restarts allowed after a recoverable mid-poll failure, per triggered run
const MAX_RESTARTS: u32 = 1;

/// Payload of a successful dir-size start call
#[derive(Debug, Deserialize)]
struct StartData {
    #[serde(default)]
    taskid: Option<String>,
}

/// Payload of a dir-size status call
#[derive(Debug, Deserialize)]
struct TaskStatus {
    finished: bool,
    #[serde(default)]
    total_size: Option<u64>,
    #[serde(default)]
    num_dir: Option<u64>,
    #[serde(default)]
    num_file: Option<u64>,
}

/// Orchestrates one measurement run end to end
pub struct SizeCollector {
    client: ApiClient,
    sessions: SessionManager,
    state: AppState,
}

impl SizeCollector {
    pub fn new(state: AppState) -> Result<Self> {
        let config = &state.config;
        let client = ApiClient::new(&config.appliance_url, config.request_timeout())?;
        let sessions = SessionManager::new(client.clone(), &config.account, &config.password);

        Ok(SizeCollector {
            client,
            sessions,
            state,
        })
    }

    /// Entry point for one externally-triggered measurement run.
    ///
    /// Applies the bounded restart policy: a recoverable failure re-runs the
    /// protocol from authentication at most `MAX_RESTARTS` times, then the
    /// run terminates with the error.
    pub async fn run(&self) -> Result<SizeMeasurement> {
        let mut restarts = 0;
        loop {
            match self.run_once().await {
                Ok(measurement) => return Ok(measurement),
                Err(e) if e.is_recoverable() && restarts < MAX_RESTARTS => {
                    restarts += 1;
                    tracing::warn!(
                        "Appliance-side task failed ({}); restarting run from authentication \
                         ({}/{})",
                        e,
                        restarts,
                        MAX_RESTARTS
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// One pass of the protocol: authenticate, start, poll, finalize.
    async fn run_once(&self) -> Result<SizeMeasurement> {
        let session = self.sessions.open().await?;

        let task_id = match self.start_task(&session).await {
            Ok(id) => id,
            Err(e) => {
                self.sessions.close(&session).await;
                return Err(e);
            }
        };

        tracing::info!(task_id = %task_id, path = %self.state.config.share_path, "Size calculation started");

        match self.poll_to_completion(&session, &task_id).await {
            Ok(total_size) => {
                let measurement =
                    SizeMeasurement::new(total_size, self.state.config.max_size_bytes);
                self.state.publish(measurement.clone()).await;

                tracing::info!(
                    current_size_bytes = measurement.current_size_bytes,
                    used_percentage = measurement.used_percentage,
                    "Measurement published"
                );

                self.stop_task(&session, &task_id).await;
                self.sessions.close(&session).await;
                Ok(measurement)
            }
            Err(e) if e.is_transport() => {
                // Appliance unreachable: no stop, no logout
                Err(e)
            }
            Err(e) => {
                self.stop_task(&session, &task_id).await;
                self.sessions.close(&session).await;
                Err(e)
            }
        }
    }

    /// Ask the appliance to begin computing the size of the configured path.
    async fn start_task(&self, session: &Session) -> Result<String> {
        let start = ApiRequest::new(&session.entry_path, DIRSIZE_API, 2, "start")
            .param("path", encoded_path_list(&self.state.config.share_path))
            .param("_sid", session.sid.clone());

        let envelope = self.client.call(&start).await?;
        if !envelope.success {
            return Err(MeterError::TaskStart(format!(
                "appliance refused start for '{}' (code {})",
                self.state.config.share_path,
                envelope.error_code()
            )));
        }

        let data = envelope
            .data
            .ok_or_else(|| MeterError::Protocol("start response has no data".to_string()))?;
        let start_data: StartData = serde_json::from_value(data)
            .map_err(|e| MeterError::Protocol(format!("start payload: {}", e)))?;

        start_data
            .taskid
            .ok_or_else(|| MeterError::Protocol("start payload missing taskid".to_string()))
    }

    /// Poll task status on the configured cadence until it reports finished.
    async fn poll_to_completion(&self, session: &Session, task_id: &str) -> Result<u64> {
        loop {
            let status = ApiRequest::new(&session.entry_path, DIRSIZE_API, 2, "status")
                .param("taskid", quoted(task_id))
                .param("_sid", session.sid.clone());

            let envelope = self.client.call(&status).await?;
            if !envelope.success {
                return Err(MeterError::TaskFailed {
                    code: envelope.error_code(),
                });
            }

            let data = envelope
                .data
                .ok_or_else(|| MeterError::Protocol("status response has no data".to_string()))?;
            let task: TaskStatus = serde_json::from_value(data)
                .map_err(|e| MeterError::Protocol(format!("status payload: {}", e)))?;

            if task.finished {
                tracing::debug!(
                    num_dir = task.num_dir,
                    num_file = task.num_file,
                    "Task finished"
                );
                return task.total_size.ok_or_else(|| {
                    MeterError::Protocol("finished task missing total_size".to_string())
                });
            }

            tracing::debug!(task_id = %task_id, "Task still running; waiting before next poll");
            tokio::time::sleep(self.state.config.poll_interval()).await;
        }
    }

    /// Release the appliance-side task. Best-effort, like logout.
    async fn stop_task(&self, session: &Session, task_id: &str) {
        let stop = ApiRequest::new(&session.entry_path, DIRSIZE_API, 2, "stop")
            .param("taskid", quoted(task_id))
            .param("_sid", session.sid.clone());

        match self.client.call(&stop).await {
            Ok(envelope) if envelope.success => {}
            Ok(envelope) => {
                tracing::warn!(
                    task_id = %task_id,
                    code = envelope.error_code(),
                    "Appliance refused task stop"
                );
            }
            Err(e) => {
                tracing::warn!(task_id = %task_id, "Task stop failed: {}", e);
            }
        }
    }
}

/// The appliance expects directory paths as a JSON-encoded list in the
/// query string, e.g. `path=["/volume1/backups"]`.
fn encoded_path_list(path: &str) -> String {
    serde_json::json!([path]).to_string()
}

/// Task ids travel as JSON strings, quotes included.
fn quoted(value: &str) -> String {
    serde_json::json!(value).to_string()
}
