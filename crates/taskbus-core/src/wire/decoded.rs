//! Decode results
//!
//! `EnvelopeCodec::decode` は型を知らないまま body を検証し、
//! param/result を JSON 値のまま保持します。具体型への変換は
//! runner ごとに `DecodedEnvelope::into_typed` で行います。

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::codec::CodecError;
use super::shape::DecodeFailure;
use crate::domain::envelope::TaskEnvelope;
use crate::typed::descriptor::TypeDescriptor;

/// Where the descriptor used for decoding came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Registered,
    /// No shape was registered for the task class (or the class was
    /// missing), so the erased `TaskEnvelope<Any, Any>` was used.
    Fallback,
}

/// A body that passed the shape check for `descriptor`.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedEnvelope {
    task_class: Option<String>,
    descriptor: Arc<TypeDescriptor>,
    resolution: Resolution,
    param: Option<Value>,
    result: Option<Value>,
}

impl DecodedEnvelope {
    pub fn new(
        task_class: Option<String>,
        descriptor: Arc<TypeDescriptor>,
        resolution: Resolution,
        param: Option<Value>,
        result: Option<Value>,
    ) -> Self {
        Self {
            task_class,
            descriptor,
            resolution,
            param,
            result,
        }
    }

    /// Header value if there was one, otherwise the body's `taskClass`.
    pub fn task_class(&self) -> Option<&str> {
        self.task_class.as_deref()
    }

    pub fn descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.descriptor
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn param(&self) -> Option<&Value> {
        self.param.as_ref()
    }

    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    /// Convert the payloads into concrete types.
    pub fn into_typed<TP, RD>(self) -> Result<TaskEnvelope<TP, RD>, CodecError>
    where
        TP: DeserializeOwned,
        RD: DeserializeOwned,
    {
        let Self {
            task_class,
            descriptor,
            param,
            result,
            ..
        } = self;

        let converted = slot::<TP>(param)
            .and_then(|param| Ok((param, slot::<RD>(result)?)));

        match converted {
            Ok((param, result)) => Ok(TaskEnvelope::new(
                task_class.unwrap_or_default(),
                param,
                result,
            )),
            Err(e) => Err(CodecError::Decoding {
                task_class,
                descriptor,
                source: DecodeFailure::Convert(e),
            }),
        }
    }
}

/// 明示的な `null` は、型が null を受け付けるならその値（`()` など）、
/// そうでなければ「無し」として扱う。
fn slot<T: DeserializeOwned>(value: Option<Value>) -> Result<Option<T>, serde_json::Error> {
    match value {
        None => Ok(None),
        Some(Value::Null) => Ok(serde_json::from_value(Value::Null).ok()),
        Some(value) => serde_json::from_value(value).map(Some),
    }
}

/// Outcome of a successful `decode`.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Envelope(DecodedEnvelope),
    /// The message is not tagged as a task envelope. Someone else's.
    NotMine { content_type: Option<String> },
}

impl Decoded {
    pub fn into_envelope(self) -> Option<DecodedEnvelope> {
        match self {
            Self::Envelope(envelope) => Some(envelope),
            Self::NotMine { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typed::fixtures::{Money, Receipt};
    use serde_json::json;

    fn erased(param: Option<Value>, result: Option<Value>) -> DecodedEnvelope {
        DecodedEnvelope::new(
            Some("billing.ChargeTask".to_string()),
            Arc::new(TypeDescriptor::erased_envelope()),
            Resolution::Fallback,
            param,
            result,
        )
    }

    #[test]
    fn into_typed_converts_both_payloads() {
        let envelope = erased(
            Some(json!({ "amount": 1, "currency": "EUR" })),
            Some(json!({ "id": "r", "charged": { "amount": 1, "currency": "EUR" } })),
        )
        .into_typed::<Money, Receipt>()
        .unwrap();

        assert_eq!(envelope.task_class().as_str(), "billing.ChargeTask");
        assert_eq!(envelope.param().map(|m| m.amount), Some(1));
        assert_eq!(envelope.result().map(|r| r.id.as_str()), Some("r"));
    }

    #[test]
    fn into_typed_keeps_absent_payloads_absent() {
        let envelope = erased(None, None).into_typed::<Money, Receipt>().unwrap();
        assert!(!envelope.has_payload());
    }

    #[test]
    fn explicit_null_is_a_value_for_unit_and_absent_otherwise() {
        let unit = erased(Some(Value::Null), Some(Value::Null))
            .into_typed::<(), ()>()
            .unwrap();
        assert_eq!(unit.param(), Some(&()));
        assert_eq!(unit.result(), Some(&()));

        let money = erased(Some(Value::Null), None)
            .into_typed::<Money, Receipt>()
            .unwrap();
        assert!(money.param().is_none());
    }

    #[test]
    fn into_typed_reports_the_task_class_on_failure() {
        let err = erased(Some(json!("not money")), None)
            .into_typed::<Money, Receipt>()
            .unwrap_err();

        assert!(matches!(
            err,
            CodecError::Decoding { task_class: Some(ref tc), source: DecodeFailure::Convert(_), .. }
                if tc == "billing.ChargeTask"
        ));
    }
}
