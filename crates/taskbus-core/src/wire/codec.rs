//! EnvelopeCodec - envelope と WireMessage の相互変換
//!
//! # 送信
//! task class を予約ヘッダに書き、content type を予約タグにして body を JSON 化します。
//!
//! # 受信
//! 1. content type がタグでなければ `Decoded::NotMine`（エラーではない）
//! 2. ヘッダの task class で registry を引く。無ければ `TaskEnvelope<Any, Any>`
//! 3. body を descriptor に照らして検証し、`DecodedEnvelope` を返す
//!
//! 検証に失敗した body から envelope を部分的に作ることはありません。

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use super::decoded::{Decoded, DecodedEnvelope, Resolution};
use super::message::{HeaderValue, WireMessage};
use super::shape::{self, DecodeFailure, ShapeError};
use crate::config::BusConfig;
use crate::domain::envelope::TaskEnvelope;
use crate::ports::{Clock, IdGenerator, SystemClock, UlidMessageIds};
use crate::typed::descriptor::TypeDescriptor;
use crate::typed::registry::TypeRegistry;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to serialize envelope: {0}")]
    Encoding(#[source] serde_json::Error),

    #[error("cannot decode task class {task_class:?} as {descriptor}: {source}")]
    Decoding {
        task_class: Option<String>,
        descriptor: Arc<TypeDescriptor>,
        #[source]
        source: DecodeFailure,
    },
}

/// Something the codec can put on the wire.
///
/// Values that are not envelopes (no task class, or nothing to carry) are
/// still accepted by `encode`; they produce an empty message.
pub trait Outbound {
    fn task_class(&self) -> Option<&str>;

    fn has_payload(&self) -> bool;

    fn write_body(&self) -> Result<Vec<u8>, serde_json::Error>;
}

impl<TP: Serialize, RD: Serialize> Outbound for TaskEnvelope<TP, RD> {
    fn task_class(&self) -> Option<&str> {
        Some(self.task_class().as_str())
    }

    fn has_payload(&self) -> bool {
        TaskEnvelope::has_payload(self)
    }

    fn write_body(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// Untyped envelopes, e.g. replies assembled by the dispatcher.
impl Outbound for Value {
    fn task_class(&self) -> Option<&str> {
        self.get("taskClass").and_then(Value::as_str)
    }

    /// `"result": null` counts: a unit result is still a reply.
    fn has_payload(&self) -> bool {
        ["param", "result"].iter().any(|key| self.get(key).is_some())
    }

    fn write_body(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

pub struct EnvelopeCodec {
    registry: Arc<TypeRegistry>,
    content_type: String,
    task_class_header: String,
    fallback: Arc<TypeDescriptor>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl EnvelopeCodec {
    pub fn new(registry: Arc<TypeRegistry>, config: &BusConfig) -> Self {
        Self {
            registry,
            content_type: config.content_type.clone(),
            task_class_header: config.task_class_header.clone(),
            fallback: Arc::new(TypeDescriptor::erased_envelope()),
            clock: Arc::new(SystemClock),
            ids: Arc::new(UlidMessageIds::new(SystemClock)),
        }
    }

    /// Swap the time and id sources (tests use `FixedClock`).
    pub fn with_ports(mut self, clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>) -> Self {
        self.clock = clock;
        self.ids = ids;
        self
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn encode<T: Outbound + ?Sized>(&self, outbound: &T) -> Result<WireMessage, CodecError> {
        let task_class = match outbound.task_class() {
            Some(tc) if !tc.is_empty() && outbound.has_payload() => tc,
            other => {
                debug!(task_class = ?other, "nothing to encode as a task envelope");
                return Ok(WireMessage::default());
            }
        };

        let body = outbound.write_body().map_err(CodecError::Encoding)?;
        Ok(WireMessage::new(body)
            .with_content_type(self.content_type.as_str())
            .with_header(self.task_class_header.as_str(), task_class)
            .with_message_id(self.ids.next_message_id())
            .with_timestamp(self.clock.now()))
    }

    pub fn decode(&self, message: &WireMessage) -> Result<Decoded, CodecError> {
        if message.content_type.as_deref() != Some(self.content_type.as_str()) {
            warn!(
                content_type = ?message.content_type,
                expected = %self.content_type,
                "message is not a task envelope, skipping"
            );
            return Ok(Decoded::NotMine {
                content_type: message.content_type.clone(),
            });
        }

        let header_class = match message.header(&self.task_class_header) {
            Some(HeaderValue::Text(tc)) if !tc.is_empty() => Some(tc.as_str()),
            Some(HeaderValue::Text(_)) | None => None,
            Some(other) => {
                warn!(header = %self.task_class_header, value = ?other, "task class header is not text, ignoring");
                None
            }
        };

        let (descriptor, resolution) = match header_class.and_then(|tc| self.registry.lookup(tc)) {
            Some(descriptor) => (descriptor, Resolution::Registered),
            None => {
                debug!(task_class = ?header_class, fallback = %self.fallback, "no registered shape, using fallback");
                (Arc::clone(&self.fallback), Resolution::Fallback)
            }
        };

        let failed = |source: DecodeFailure| CodecError::Decoding {
            task_class: header_class.map(str::to_owned),
            descriptor: Arc::clone(&descriptor),
            source,
        };

        let mut fields = match shape::decode_value(&message.body, &descriptor) {
            Ok(Value::Object(fields)) => fields,
            Ok(other) => {
                return Err(failed(DecodeFailure::Shape(ShapeError {
                    path: "$".to_string(),
                    expected: descriptor.to_string(),
                    found: shape::kind(&other),
                })));
            }
            Err(source) => return Err(failed(source)),
        };

        let task_class = header_class
            .map(str::to_owned)
            .or_else(|| take_text(&mut fields, "taskClass"));
        let param = take_present(&mut fields, "param");
        let result = take_present(&mut fields, "result");

        Ok(Decoded::Envelope(DecodedEnvelope::new(
            task_class, descriptor, resolution, param, result,
        )))
    }
}

fn take_text(fields: &mut Map<String, Value>, key: &str) -> Option<String> {
    match fields.remove(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        _ => None,
    }
}

/// 明示的な `null` は残す（`()` の payload は `null` で届く）。
fn take_present(fields: &mut Map<String, Value>, key: &str) -> Option<Value> {
    fields.remove(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{TASK_CLASS, TASK_DATA};
    use crate::ports::FixedClock;
    use crate::typed::TypeResolver;
    use crate::typed::fixtures::{
        BATCH_TASK, BatchRunner, CHARGE_TASK, ChargeRunner, Item, Money, Page, Receipt,
    };
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn codec() -> EnvelopeCodec {
        let registry = Arc::new(TypeRegistry::default());
        let resolver = TypeResolver::default();
        registry
            .register_runner::<Money, Receipt, _>(CHARGE_TASK, &ChargeRunner, &resolver)
            .unwrap();
        registry
            .register_runner::<Page<Vec<Item>>, u64, _>(BATCH_TASK, &BatchRunner, &resolver)
            .unwrap();
        EnvelopeCodec::new(registry, &BusConfig::default())
    }

    fn usd(amount: u64) -> Money {
        Money {
            amount,
            currency: "USD".to_string(),
        }
    }

    fn envelope_of(decoded: Decoded) -> DecodedEnvelope {
        match decoded {
            Decoded::Envelope(envelope) => envelope,
            other => panic!("expected an envelope, got {other:?}"),
        }
    }

    #[test]
    fn encode_tags_and_stamps_the_message() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        let clock = Arc::new(FixedClock::new(at));
        let codec = codec().with_ports(clock.clone(), Arc::new(UlidMessageIds::new(clock)));

        let message = codec
            .encode(&TaskEnvelope::<Money, Receipt>::request(CHARGE_TASK, usd(500)))
            .unwrap();

        assert_eq!(message.content_type.as_deref(), Some(TASK_DATA));
        assert_eq!(
            message.header(TASK_CLASS).and_then(HeaderValue::as_text),
            Some(CHARGE_TASK)
        );
        assert_eq!(message.content_length, message.body.len());
        assert_eq!(message.timestamp, Some(at));
        assert_eq!(
            message.message_id.map(|id| id.as_ulid().timestamp_ms()),
            Some(at.timestamp_millis() as u64)
        );
    }

    #[test]
    fn round_trip_reproduces_the_param() {
        let codec = codec();
        let message = codec
            .encode(&TaskEnvelope::<Money, Receipt>::request(CHARGE_TASK, usd(500)))
            .unwrap();
        let decoded = envelope_of(codec.decode(&message).unwrap());

        assert_eq!(decoded.resolution(), Resolution::Registered);
        assert_eq!(decoded.task_class(), Some(CHARGE_TASK));
        let typed = decoded.into_typed::<Money, Receipt>().unwrap();
        assert_eq!(typed.param(), Some(&usd(500)));
        assert!(typed.result().is_none());
    }

    #[test]
    fn unit_payloads_survive_the_round_trip() {
        let codec = codec();
        let message = codec
            .encode(&TaskEnvelope::<(), ()>::request("ops.Ping", ()))
            .unwrap();
        assert_eq!(message.body, br#"{"taskClass":"ops.Ping","param":null}"#.to_vec());

        let decoded = envelope_of(codec.decode(&message).unwrap());
        assert_eq!(decoded.param(), Some(&Value::Null));
        let typed = decoded.into_typed::<(), ()>().unwrap();
        assert_eq!(typed.param(), Some(&()));
        assert!(typed.result().is_none());
    }

    #[test]
    fn values_without_a_task_class_encode_to_nothing() {
        let codec = codec();
        for value in [json!(42), json!({ "param": 1 }), json!({ "taskClass": "", "param": 1 })] {
            let message = codec.encode(&value).unwrap();
            assert_eq!(message, WireMessage::default(), "{value}");
        }

        let empty = TaskEnvelope::<Money, Receipt>::new(CHARGE_TASK, None, None);
        assert!(codec.encode(&empty).unwrap().body.is_empty());
    }

    #[test]
    fn foreign_content_type_is_not_mine() {
        let codec = codec();
        let message = WireMessage::new(b"<xml/>".to_vec())
            .with_content_type("text/xml")
            .with_header(TASK_CLASS, CHARGE_TASK);

        assert_eq!(
            codec.decode(&message).unwrap(),
            Decoded::NotMine {
                content_type: Some("text/xml".to_string())
            }
        );
        assert_eq!(codec.registry().len(), 2);
    }

    #[test]
    fn unregistered_class_falls_back_to_the_erased_shape() {
        let codec = codec();
        let message = WireMessage::new(br#"{"taskClass":"ops.Unknown","param":{"anything":[1,2]}}"#.to_vec())
            .with_content_type(TASK_DATA)
            .with_header(TASK_CLASS, "ops.Unknown");
        let decoded = envelope_of(codec.decode(&message).unwrap());

        assert_eq!(decoded.resolution(), Resolution::Fallback);
        assert_eq!(decoded.descriptor().as_ref(), &TypeDescriptor::erased_envelope());
        assert_eq!(decoded.param(), Some(&json!({ "anything": [1, 2] })));
        assert!(!codec.registry().contains("ops.Unknown"));
    }

    #[test]
    fn missing_header_uses_the_body_task_class() {
        let codec = codec();
        let message = WireMessage::new(br#"{"taskClass":"billing.ChargeTask","param":{"amount":1,"currency":"USD"}}"#.to_vec())
            .with_content_type(TASK_DATA);
        let decoded = envelope_of(codec.decode(&message).unwrap());

        // lookup はヘッダだけを見る
        assert_eq!(decoded.resolution(), Resolution::Fallback);
        assert_eq!(decoded.task_class(), Some(CHARGE_TASK));
    }

    #[test]
    fn non_text_header_is_treated_as_absent() {
        let codec = codec();
        let message = WireMessage::new(br#"{"param":1}"#.to_vec())
            .with_content_type(TASK_DATA)
            .with_header(TASK_CLASS, 7_i64);
        let decoded = envelope_of(codec.decode(&message).unwrap());

        assert_eq!(decoded.resolution(), Resolution::Fallback);
        assert_eq!(decoded.task_class(), None);
    }

    #[test]
    fn malformed_body_for_a_known_class_fails() {
        let codec = codec();
        let message = WireMessage::new(br#"{"param":{"amount":"five","currency":"USD"}}"#.to_vec())
            .with_content_type(TASK_DATA)
            .with_header(TASK_CLASS, CHARGE_TASK);

        match codec.decode(&message) {
            Err(CodecError::Decoding {
                task_class,
                source: DecodeFailure::Shape(shape),
                ..
            }) => {
                assert_eq!(task_class.as_deref(), Some(CHARGE_TASK));
                assert_eq!(shape.path, "$.param.amount");
            }
            other => panic!("expected a shape failure, got {other:?}"),
        }
    }

    #[test]
    fn negative_amount_for_an_unsigned_field_fails() {
        let codec = codec();
        let message = WireMessage::new(br#"{"param":{"amount":-5,"currency":"USD"}}"#.to_vec())
            .with_content_type(TASK_DATA)
            .with_header(TASK_CLASS, CHARGE_TASK);

        match codec.decode(&message) {
            Err(CodecError::Decoding {
                source: DecodeFailure::Shape(shape),
                ..
            }) => {
                assert_eq!(shape.path, "$.param.amount");
                assert_eq!(shape.expected, "UInt64");
            }
            other => panic!("expected a shape failure, got {other:?}"),
        }
    }

    #[test]
    fn invalid_json_is_a_decoding_error() {
        let codec = codec();
        let message = WireMessage::new(b"{\"param\":".to_vec()).with_content_type(TASK_DATA);

        assert!(matches!(
            codec.decode(&message),
            Err(CodecError::Decoding {
                source: DecodeFailure::Json(_),
                ..
            })
        ));
    }

    #[test]
    fn nested_generics_decode_losslessly() {
        let codec = codec();
        let page = Page {
            items: vec![
                vec![Item { sku: "a".into(), qty: 2 }],
                vec![Item { sku: "b".into(), qty: 3 }, Item { sku: "c".into(), qty: 1 }],
            ],
            next: Some("cursor-2".into()),
        };
        let message = codec
            .encode(&TaskEnvelope::<Page<Vec<Item>>, u64>::request(BATCH_TASK, page.clone()))
            .unwrap();
        let decoded = envelope_of(codec.decode(&message).unwrap());

        assert_eq!(decoded.descriptor().depth(), 3);
        let typed = decoded.into_typed::<Page<Vec<Item>>, u64>().unwrap();
        assert_eq!(typed.into_param(), Some(page));
    }
}
