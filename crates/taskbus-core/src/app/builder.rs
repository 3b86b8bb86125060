//! AppBuilder - アプリケーションの構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - 型解決の失敗は register の時点でエラーになる（受信時まで持ち越さない）

use std::collections::HashMap;
use std::sync::Arc;

use super::dispatch::Dispatcher;
use crate::config::BusConfig;
use crate::ports::{Clock, IdGenerator};
use crate::typed::registry::{RegistryError, TypeRegistry};
use crate::typed::resolver::TypeResolver;
use crate::typed::runner::{DynRunner, Payload, TaskRunner, TypedRunner};
use crate::wire::codec::EnvelopeCodec;

/// AppBuilder はアプリケーションを構築
///
/// # 使用例
/// ```ignore
/// let app = AppBuilder::new(BusConfig::default())
///     .register::<Money, Receipt, _>("billing.ChargeTask", ChargeRunner)?
///     .expect_tasks(&["billing.ChargeTask"])
///     .build()?;
/// ```
///
/// # Fail-fast 設計
/// - expect_tasks() で期待される task class を登録
/// - build() 時に「期待集合 ⊆ 登録済み集合」をチェック
/// - 不足があれば BuildError を返す
pub struct AppBuilder {
    config: BusConfig,
    resolver: TypeResolver,
    registry: Arc<TypeRegistry>,
    runners: HashMap<String, Arc<dyn DynRunner>>,
    expected_tasks: Option<Vec<String>>,
    ports: Option<(Arc<dyn Clock>, Arc<dyn IdGenerator>)>,
}

/// BuildError はアプリケーション構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing task classes: {0:?}. These tasks were expected but not registered.")]
    MissingTaskClasses(Vec<String>),
}

impl AppBuilder {
    pub fn new(config: BusConfig) -> Self {
        Self {
            resolver: TypeResolver::from_config(&config),
            registry: Arc::new(TypeRegistry::new(config.on_conflict)),
            runners: HashMap::new(),
            expected_tasks: None,
            ports: None,
            config,
        }
    }

    /// Runner を登録
    ///
    /// envelope の形を解決して registry に書き込み、runner を type erasure して保持します。
    pub fn register<TP, RD, R>(
        mut self,
        task_class: impl Into<String>,
        runner: R,
    ) -> Result<Self, RegistryError>
    where
        TP: Payload,
        RD: Payload,
        R: TaskRunner<TP, RD> + 'static,
    {
        let task_class = task_class.into();
        if self.runners.contains_key(&task_class) {
            return Err(RegistryError::DuplicateRunner(task_class));
        }
        self.registry
            .register_runner::<TP, RD, R>(task_class.as_str(), &runner, &self.resolver)?;
        self.runners
            .insert(task_class, Arc::new(TypedRunner::<TP, RD, R>::new(runner)));
        Ok(self)
    }

    /// 期待される task class のリストを設定
    pub fn expect_tasks(mut self, task_classes: &[&str]) -> Self {
        self.expected_tasks = Some(task_classes.iter().map(|tc| tc.to_string()).collect());
        self
    }

    /// codec の時刻・ID の供給元を差し替える
    pub fn with_ports(mut self, clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>) -> Self {
        self.ports = Some((clock, ids));
        self
    }

    /// AppBuilder を構築して App を生成
    ///
    /// # 検証
    /// - expect_tasks() で設定された task class が全て登録されているかチェック
    /// - 不足があれば BuildError::MissingTaskClasses を返す
    pub fn build(self) -> Result<App, BuildError> {
        if let Some(expected_tasks) = &self.expected_tasks {
            let missing_tasks: Vec<String> = expected_tasks
                .iter()
                .filter(|tc| !self.runners.contains_key(tc.as_str()))
                .cloned()
                .collect();
            if !missing_tasks.is_empty() {
                return Err(BuildError::MissingTaskClasses(missing_tasks));
            }
        }

        let mut codec = EnvelopeCodec::new(Arc::clone(&self.registry), &self.config);
        if let Some((clock, ids)) = self.ports {
            codec = codec.with_ports(clock, ids);
        }
        let codec = Arc::new(codec);
        let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&codec), self.runners));

        Ok(App {
            registry: self.registry,
            codec,
            dispatcher,
        })
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new(BusConfig::default())
    }
}

/// 構築済みの registry / codec / dispatcher
///
/// どれも `Arc` で共有でき、受信ワーカーに clone して渡します。
#[derive(Clone)]
pub struct App {
    registry: Arc<TypeRegistry>,
    codec: Arc<EnvelopeCodec>,
    dispatcher: Arc<Dispatcher>,
}

impl App {
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    pub fn codec(&self) -> &Arc<EnvelopeCodec> {
        &self.codec
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }
}
