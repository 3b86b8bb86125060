//! taskbus-core
//!
//! Typed task envelopes over a byte-oriented message bus.
//!
//! 送信側は `TaskEnvelope<TP, RD>` を `WireMessage` に encode し、
//! 受信側は task class ヘッダから登録済みの型を引いて decode します。
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（task_class, envelope, ids, errors）
//! - **typed**: 型宣言と型解決（Describe, Ancestry, TypeResolver, TypeRegistry, TaskRunner）
//! - **wire**: bus との境界（WireMessage, EnvelopeCodec）
//! - **app**: 起動時のワイヤリングと dispatch（AppBuilder, Dispatcher）
//! - **ports**: 時刻と ID の抽象化（Clock, IdGenerator）
//! - **config**: BusConfig

pub mod app;
pub mod config;
pub mod domain;
pub mod ports;
pub mod typed;
pub mod wire;

pub use self::app::{App, AppBuilder, BuildError, DispatchError, Dispatched, Dispatcher};
pub use self::config::{BusConfig, ConfigError, ConflictPolicy, TASK_CLASS, TASK_DATA};
pub use self::domain::{ConfigurationError, ErrorKind, MessageId, TaskClass, TaskEnvelope, TaskError};
pub use self::typed::{
    Ancestry, Describe, FieldDecl, TaskRunner, Traced, TypeArg, TypeDescriptor, TypeRegistry,
    TypeResolver,
};
pub use self::wire::{CodecError, Decoded, DecodedEnvelope, EnvelopeCodec, HeaderValue, Resolution, WireMessage};
