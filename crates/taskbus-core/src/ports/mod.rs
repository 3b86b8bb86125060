//! Ports - 時刻と ID の抽象化
//!
//! codec はここで定義された trait 越しにしか時刻・乱数に触れません。

pub mod clock;
pub mod id_generator;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidMessageIds};
