//! Long-running operation handles
//!
//! RPCs that only start work on the server return an [`Operation`]: a
//! named handle that is polled until `done` flips to true. A finished
//! operation embeds either a JSON result payload, decoded into the typed
//! result by the caller, or the terminal [`Status`] of the failure.

use crate::names::OperationName;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use trellis_core::lro::{OperationPoll, StartedOperation};
use trellis_core::{Error, Result, Status, StatusCode};

/// Terminal outcome embedded in a finished operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum OperationResult {
    /// Result payload of a successfully completed operation.
    Response(serde_json::Value),

    /// Failure reported by the server. Final; never retried.
    Error(Status),
}

/// A long-running operation as reported by the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Operation {
    /// Server-assigned name, echoed back in status checks.
    pub name: OperationName,

    /// Whether the operation has reached a terminal state.
    #[serde(default)]
    pub done: bool,

    /// The terminal outcome; present only once `done` is true.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<OperationResult>,
}

impl Operation {
    /// An operation the server is still working on.
    pub fn pending(name: OperationName) -> Self {
        Self {
            name,
            done: false,
            result: None,
        }
    }

    /// A finished operation carrying `payload` as its result.
    pub fn completed<T: Serialize>(name: OperationName, payload: &T) -> Result<Self> {
        Ok(Self {
            name,
            done: true,
            result: Some(OperationResult::Response(serde_json::to_value(payload)?)),
        })
    }

    /// A finished operation that failed with `status`.
    pub fn failed(name: OperationName, status: Status) -> Self {
        Self {
            name,
            done: true,
            result: Some(OperationResult::Error(status)),
        }
    }

    /// Interpret this operation as one status check's outcome.
    ///
    /// Decodes the embedded payload when the operation completed. A done
    /// operation with no result at all is a server contract violation and
    /// surfaces as an internal error.
    pub fn into_poll_result<T: DeserializeOwned>(self) -> Result<OperationPoll<T>> {
        if !self.done {
            return Ok(OperationPoll::Pending);
        }
        match self.result {
            Some(OperationResult::Response(value)) => {
                Ok(OperationPoll::Completed(serde_json::from_value(value)?))
            }
            Some(OperationResult::Error(status)) => Ok(OperationPoll::Failed(status)),
            None => Err(Error::rpc(
                StatusCode::Internal,
                format!("{} reported done without a result", self.name),
            )),
        }
    }

    /// Interpret this operation as an initiating call's outcome.
    ///
    /// An operation that is already done needs no polling and maps
    /// straight to a completed or failed start.
    pub fn into_started<T: DeserializeOwned>(self) -> Result<StartedOperation<OperationName, T>> {
        if !self.done {
            return Ok(StartedOperation::InProgress(self.name));
        }
        match self.result {
            Some(OperationResult::Response(value)) => {
                Ok(StartedOperation::Completed(serde_json::from_value(value)?))
            }
            Some(OperationResult::Error(status)) => Ok(StartedOperation::Failed(status)),
            None => Err(Error::rpc(
                StatusCode::Internal,
                format!("{} reported done without a result", self.name),
            )),
        }
    }
}
