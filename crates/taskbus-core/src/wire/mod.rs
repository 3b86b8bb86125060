//! Wire - bus との境界
//!
//! - **message**: `WireMessage`（content type, headers, body）
//! - **codec**: `EnvelopeCodec`（encode / decode）
//! - **shape**: descriptor による body の検証
//! - **decoded**: decode の結果

pub mod codec;
pub mod decoded;
pub mod message;
pub mod shape;

pub use self::codec::{CodecError, EnvelopeCodec, Outbound};
pub use self::decoded::{Decoded, DecodedEnvelope, Resolution};
pub use self::message::{HeaderValue, Headers, WireMessage};
pub use self::shape::{DecodeFailure, ShapeError};
