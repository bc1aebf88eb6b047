pub mod logging;

pub use logging::{build_filter, setup_logging, LoggingGuard, StructuredLogger};

pub mod prelude {
    pub use super::{setup_logging, LoggingGuard, StructuredLogger};
}
