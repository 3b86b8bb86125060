//! Domain model (task classes, envelopes, identifiers, errors).

pub mod envelope;
pub mod errors;
pub mod ids;
pub mod task_class;

pub use self::envelope::TaskEnvelope;
pub use self::errors::{ConfigurationError, ErrorKind, TaskError};
pub use self::ids::MessageId;
pub use self::task_class::TaskClass;
