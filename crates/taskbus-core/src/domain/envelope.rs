//! TaskEnvelope - bus 上を流れる型付きペイロード
//!
//! 同じ型がリクエスト（`param`）とレスポンス（`result`）の両方を運びます。

use serde::{Deserialize, Serialize};

use super::task_class::TaskClass;
use crate::typed::describe::{Describe, TypeArg};

/// Request/response payload unit exchanged between producers and runners.
///
/// Wire shape: `{"taskClass": "...", "param": <TP>, "result": <RD>}`.
/// Absent slots are left out of the body entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskEnvelope<TP, RD> {
    task_class: TaskClass,

    #[serde(skip_serializing_if = "Option::is_none")]
    param: Option<TP>,

    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<RD>,
}

impl<TP, RD> TaskEnvelope<TP, RD> {
    pub fn new(task_class: impl Into<TaskClass>, param: Option<TP>, result: Option<RD>) -> Self {
        Self {
            task_class: task_class.into(),
            param,
            result,
        }
    }

    /// An envelope asking a runner to process `param`.
    pub fn request(task_class: impl Into<TaskClass>, param: TP) -> Self {
        Self::new(task_class, Some(param), None)
    }

    /// An envelope carrying a runner's answer.
    pub fn response(task_class: impl Into<TaskClass>, result: RD) -> Self {
        Self::new(task_class, None, Some(result))
    }

    pub fn task_class(&self) -> &TaskClass {
        &self.task_class
    }

    pub fn param(&self) -> Option<&TP> {
        self.param.as_ref()
    }

    pub fn result(&self) -> Option<&RD> {
        self.result.as_ref()
    }

    pub fn with_result(mut self, result: RD) -> Self {
        self.result = Some(result);
        self
    }

    /// True when either slot is filled.
    pub fn has_payload(&self) -> bool {
        self.param.is_some() || self.result.is_some()
    }

    pub fn into_param(self) -> Option<TP> {
        self.param
    }

    pub fn into_parts(self) -> (TaskClass, Option<TP>, Option<RD>) {
        (self.task_class, self.param, self.result)
    }
}

impl<TP: Describe, RD: Describe> Describe for TaskEnvelope<TP, RD> {
    fn declare() -> TypeArg {
        TypeArg::envelope(TypeArg::of::<TP>(), TypeArg::of::<RD>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_omits_empty_result() {
        let env = TaskEnvelope::<u32, String>::request("calc.Square", 7);
        let v = serde_json::to_value(&env).unwrap();
        assert_eq!(v, json!({ "taskClass": "calc.Square", "param": 7 }));
    }

    #[test]
    fn missing_slots_deserialize_as_none() {
        let env: TaskEnvelope<u32, String> =
            serde_json::from_value(json!({ "taskClass": "calc.Square", "result": "49" })).unwrap();
        assert_eq!(env.param(), None);
        assert_eq!(env.result().map(String::as_str), Some("49"));
        assert!(env.has_payload());
    }

    #[test]
    fn empty_envelope_has_no_payload() {
        let env = TaskEnvelope::<u32, u32>::new("calc.Square", None, None);
        assert!(!env.has_payload());
    }
}
