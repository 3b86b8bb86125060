//! TaskRunner trait - envelope を処理する runner の定義
//!
//! # 二層構造
//! - `TaskRunner<TP, RD>`: 型付き。TP/RD は宣言した型と一致しなければならない
//! - `DynRunner`: object-safe。`HashMap<String, Arc<dyn DynRunner>>` に格納できる
//!
//! `TypedRunner<TP, RD, R>` が前者を後者に変換します（type erasure）。

use std::any::type_name;
use std::marker::PhantomData;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::ancestry::Ancestry;
use super::describe::Describe;
use crate::app::dispatch::DispatchError;
use crate::domain::envelope::TaskEnvelope;
use crate::domain::errors::TaskError;
use crate::wire::codec::CodecError;
use crate::wire::decoded::DecodedEnvelope;

/// Bounds every request/response type must satisfy.
///
/// - `Describe`: 型解決のため
/// - `Serialize + DeserializeOwned`: body との相互変換のため
/// - `Send + Sync + 'static`: runner を Arc で共有するため
pub trait Payload: Describe + Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> Payload for T where T: Describe + Serialize + DeserializeOwned + Send + Sync + 'static {}

/// Processes a `TaskEnvelope<TP, RD>` and produces an `RD`.
///
/// # 使用例
/// ```ignore
/// struct ChargeRunner;
///
/// #[async_trait]
/// impl TaskRunner<Money, Receipt> for ChargeRunner {
///     async fn run_task(&self, envelope: TaskEnvelope<Money, Receipt>) -> Result<Receipt, TaskError> {
///         let money = envelope.into_param().ok_or_else(|| TaskError::data("no charge"))?;
///         Ok(Receipt::for_charge(money))
///     }
/// }
/// ```
///
/// Business failures are reported as `TaskError::data` (bad task data),
/// `TaskError::partner` (an upstream partner failed) or `TaskError::internal`.
#[async_trait]
pub trait TaskRunner<TP: Payload, RD: Payload>: Send + Sync {
    async fn run_task(&self, envelope: TaskEnvelope<TP, RD>) -> Result<RD, TaskError>;

    /// Where this runner's type parameters get bound. Decorators override
    /// this to add their own unbound level.
    fn ancestry(&self) -> Ancestry {
        Ancestry::direct::<TP, RD>(type_name::<Self>())
    }
}

/// Object-safe runner operating on decoded, type-erased envelopes.
#[async_trait]
pub trait DynRunner: Send + Sync {
    async fn run_dyn(&self, envelope: DecodedEnvelope) -> Result<serde_json::Value, DispatchError>;

    fn ancestry(&self) -> Ancestry;
}

pub struct TypedRunner<TP, RD, R> {
    runner: R,
    _marker: PhantomData<fn(TP) -> RD>,
}

impl<TP, RD, R> TypedRunner<TP, RD, R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<TP, RD, R> DynRunner for TypedRunner<TP, RD, R>
where
    TP: Payload,
    RD: Payload,
    R: TaskRunner<TP, RD>,
{
    async fn run_dyn(&self, envelope: DecodedEnvelope) -> Result<serde_json::Value, DispatchError> {
        let typed = envelope.into_typed::<TP, RD>()?;
        let output = self
            .runner
            .run_task(typed)
            .await
            .map_err(DispatchError::Runner)?;
        serde_json::to_value(output).map_err(|e| DispatchError::Codec(CodecError::Encoding(e)))
    }

    fn ancestry(&self) -> Ancestry {
        self.runner.ancestry()
    }
}

/// Decorator that logs every run of the wrapped runner.
///
/// It re-declares the inner runner without fixing its types, so it shows up
/// as one extra unbound level in the ancestry.
pub struct Traced<R> {
    inner: R,
}

impl<R> Traced<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

#[async_trait]
impl<TP, RD, R> TaskRunner<TP, RD> for Traced<R>
where
    TP: Payload,
    RD: Payload,
    R: TaskRunner<TP, RD>,
{
    async fn run_task(&self, envelope: TaskEnvelope<TP, RD>) -> Result<RD, TaskError> {
        let task_class = envelope.task_class().clone();
        debug!(task_class = %task_class, "running task");
        let result = self.inner.run_task(envelope).await;
        match &result {
            Ok(_) => debug!(task_class = %task_class, "task finished"),
            Err(e) => warn!(task_class = %task_class, kind = ?e.kind(), error = %e, "task failed"),
        }
        result
    }

    fn ancestry(&self) -> Ancestry {
        Ancestry::wrap(type_name::<Self>(), self.inner.ancestry())
    }
}
