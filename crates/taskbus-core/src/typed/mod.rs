//! Typed - envelope の型解決
//!
//! runner の宣言（`Describe` + `Ancestry`）から、envelope の具体的な形
//! （`TypeDescriptor`）を起動時に 1 回だけ求めて `TypeRegistry` に保存します。
//!
//! # 二層構造
//! - **表層（Typed）**: `TaskRunner<TP, RD>` - 型安全
//! - **内部（Dyn）**: `DynRunner` - object-safe, type erasure

pub mod ancestry;
pub mod describe;
pub mod descriptor;
pub mod registry;
pub mod resolver;
pub mod runner;

#[cfg(test)]
pub(crate) mod fixtures;

pub use self::ancestry::{Ancestry, Level, ROOT_CAPABILITY, Superclass};
pub use self::describe::{Describe, FieldDecl, RawDecl, TypeArg};
pub use self::descriptor::{FieldDescriptor, RawType, Scalar, TypeDescriptor};
pub use self::registry::{Registration, RegistryError, TypeRegistry};
pub use self::resolver::TypeResolver;
pub use self::runner::{DynRunner, Payload, TaskRunner, Traced, TypedRunner};
