//! IdGenerator port - message id の発行
//!
//! # 実装
//! - **UlidMessageIds**: Clock の時刻 + 乱数で ULID を作る

use crate::domain::ids::MessageId;
use crate::ports::Clock;
use ulid::Ulid;

/// Issues identifiers for outgoing wire messages.
pub trait IdGenerator: Send + Sync {
    fn next_message_id(&self) -> MessageId;
}

/// ULID-based generator driven by a [`Clock`].
///
/// With a `FixedClock` the timestamp part is deterministic; the random part
/// still differs per call.
pub struct UlidMessageIds<C> {
    clock: C,
}

impl<C: Clock> UlidMessageIds<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidMessageIds<C> {
    fn next_message_id(&self) -> MessageId {
        // 1970 年より前の時刻は 0 に丸める
        let timestamp_ms = u64::try_from(self.clock.now().timestamp_millis()).unwrap_or(0);
        MessageId::from(Ulid::from_parts(timestamp_ms, rand::random()))
    }
}
