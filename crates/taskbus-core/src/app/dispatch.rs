//! Dispatcher - decode → runner 実行 → reply encode
//!
//! 受信メッセージ 1 件を処理するだけで、I/O・リトライ・タイムアウトは持ちません。
//! それらは transport 側の責務です。

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use tracing::debug;

use crate::domain::errors::TaskError;
use crate::typed::runner::DynRunner;
use crate::wire::codec::{CodecError, EnvelopeCodec};
use crate::wire::decoded::Decoded;
use crate::wire::message::WireMessage;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("envelope carries no task class")]
    MissingTaskClass,

    #[error("no runner registered for task class '{0}'")]
    NoRunner(String),

    #[error(transparent)]
    Runner(TaskError),
}

/// What happened to a dispatched message.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatched {
    /// The runner finished. The reply is `{taskClass, result}`, with
    /// `"result": null` for a unit result.
    Replied(WireMessage),
    /// Not a task envelope.
    Skipped,
}

pub struct Dispatcher {
    codec: Arc<EnvelopeCodec>,
    runners: HashMap<String, Arc<dyn DynRunner>>,
}

impl Dispatcher {
    pub fn new(codec: Arc<EnvelopeCodec>, runners: HashMap<String, Arc<dyn DynRunner>>) -> Self {
        Self { codec, runners }
    }

    pub fn codec(&self) -> &Arc<EnvelopeCodec> {
        &self.codec
    }

    pub fn has_runner(&self, task_class: &str) -> bool {
        self.runners.contains_key(task_class)
    }

    pub async fn dispatch(&self, message: &WireMessage) -> Result<Dispatched, DispatchError> {
        let envelope = match self.codec.decode(message)? {
            Decoded::Envelope(envelope) => envelope,
            Decoded::NotMine { .. } => return Ok(Dispatched::Skipped),
        };

        let task_class = envelope
            .task_class()
            .ok_or(DispatchError::MissingTaskClass)?
            .to_owned();
        let runner = self
            .runners
            .get(&task_class)
            .ok_or_else(|| DispatchError::NoRunner(task_class.clone()))?;

        debug!(task_class = %task_class, resolution = ?envelope.resolution(), "dispatching");
        let result = runner.run_dyn(envelope).await?;

        let reply = json!({ "taskClass": task_class, "result": result });
        Ok(Dispatched::Replied(self.codec.encode(&reply)?))
    }
}
