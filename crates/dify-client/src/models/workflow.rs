//! Workflow application endpoints.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{InputFile, ResponseMode, ResultResponse};
use crate::endpoint::Endpoint;
use crate::error::Result;
use crate::request::Request;

/// `POST /workflows/run`
#[derive(Debug, Clone, Serialize)]
pub struct RunWorkflow {
    inputs: Map<String, Value>,
    user: String,
    response_mode: ResponseMode,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    files: Vec<InputFile>,
}

impl RunWorkflow {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            inputs: Map::new(),
            user: user.into(),
            response_mode: ResponseMode::Blocking,
            files: Vec::new(),
        }
    }

    /// Set a workflow input variable.
    pub fn input(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.inputs.insert(key.into(), value.into());
        self
    }

    pub fn file(mut self, file: InputFile) -> Self {
        self.files.push(file);
        self
    }

    pub fn streaming(mut self) -> Self {
        self.response_mode = ResponseMode::Streaming;
        self
    }
}

impl Endpoint for RunWorkflow {
    type Output = WorkflowRunResponse;

    fn to_request(&self) -> Result<Request> {
        Ok(Request::post("/workflows/run").json(self)?.build())
    }
}

/// Result of a blocking workflow run.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowRunResponse {
    pub workflow_run_id: String,
    pub task_id: String,
    pub data: WorkflowRun,
}

/// Details of one workflow execution.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowRun {
    pub id: String,
    pub workflow_id: String,
    /// `running`, `succeeded`, `failed` or `stopped`.
    pub status: String,
    #[serde(default)]
    pub outputs: Option<Map<String, Value>>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub elapsed_time: Option<f64>,
    #[serde(default)]
    pub total_tokens: Option<u64>,
    #[serde(default)]
    pub total_steps: u32,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub finished_at: Option<i64>,
}

/// `POST /workflows/tasks/:task_id/stop`
#[derive(Debug, Clone)]
pub struct StopWorkflowTask {
    task_id: String,
    user: String,
}

impl StopWorkflowTask {
    pub fn new(task_id: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            user: user.into(),
        }
    }
}

impl Endpoint for StopWorkflowTask {
    type Output = ResultResponse;

    fn to_request(&self) -> Result<Request> {
        Ok(Request::post("/workflows/tasks/:task_id/stop")
            .path("task_id", &self.task_id)
            .field("user", self.user.clone())
            .build())
    }
}
