use calendor_core::{CalendorError, CalendorResult};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Deserialize a task payload into its typed input struct.
///
/// Missing or malformed fields surface as task errors naming the task
/// type, so the failure lands on the task record rather than the loop.
pub(crate) fn parse_input<T: DeserializeOwned>(task_type: &str, input: &Value) -> CalendorResult<T> {
    serde_json::from_value(input.clone())
        .map_err(|e| CalendorError::Task(format!("invalid {task_type} input: {e}")))
}
