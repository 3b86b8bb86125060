//! App - アプリケーション層
//!
//! typed と wire を組み合わせて、起動時の登録と受信時の実行をまとめます。
//!
//! # 主要コンポーネント
//! - **AppBuilder**: runner の登録と起動時検証
//! - **Dispatcher**: decode → runner 実行 → reply

pub mod builder;
pub mod dispatch;

// 主要な型を再エクスポート
pub use self::builder::{App, AppBuilder, BuildError};
pub use self::dispatch::{DispatchError, Dispatched, Dispatcher};
