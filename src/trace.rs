//! Feature-gated tracing facade.
//!
//! With the `tracing` feature the solver's instrumentation goes through the
//! `tracing` crate; without it the same macro names expand to nothing.
//!
//! ```rust,ignore
//! use crate::trace::{debug, debug_span, trace};
//!
//! let _span = debug_span!("solve", constraints = 3).entered();
//! trace!(var = ?v, "activated");
//! debug!(delayed = 2, "fixpoint");
//! ```

#[cfg(feature = "tracing")]
pub use tracing::{debug, debug_span, info, trace, trace_span, warn, Level, Span};

#[cfg(not(feature = "tracing"))]
mod noop {
    /// Span stand-in; entering it does nothing.
    pub struct Span;

    impl Span {
        pub fn none() -> Self {
            Span
        }

        pub fn entered(self) -> SpanGuard {
            SpanGuard
        }

        pub fn enter(&self) -> SpanGuard {
            SpanGuard
        }
    }

    pub struct SpanGuard;

    #[derive(Clone, Copy, Debug)]
    pub struct Level;

    impl Level {
        pub const TRACE: Level = Level;
        pub const DEBUG: Level = Level;
        pub const INFO: Level = Level;
        pub const WARN: Level = Level;
    }

    #[macro_export]
    macro_rules! trace {
        ($($tt:tt)*) => {};
    }

    #[macro_export]
    macro_rules! debug {
        ($($tt:tt)*) => {};
    }

    #[macro_export]
    macro_rules! info {
        ($($tt:tt)*) => {};
    }

    #[macro_export]
    macro_rules! warn {
        ($($tt:tt)*) => {};
    }

    #[macro_export]
    macro_rules! trace_span {
        ($($tt:tt)*) => {
            $crate::trace::Span::none()
        };
    }

    #[macro_export]
    macro_rules! debug_span {
        ($($tt:tt)*) => {
            $crate::trace::Span::none()
        };
    }

    pub use crate::{debug, debug_span, info, trace, trace_span, warn};
}

#[cfg(not(feature = "tracing"))]
pub use noop::*;

#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    #[error("cannot create flamegraph output {path}: {message}")]
    Flamegraph { path: String, message: String },
}

/// Install a stderr subscriber filtered by `RUST_LOG` (default `info`).
/// Calling it again is harmless.
#[cfg(feature = "tracing")]
pub fn init_subscriber() {
    init_subscriber_with("info");
}

/// Like [`init_subscriber`] with an explicit fallback filter.
#[cfg(feature = "tracing")]
pub fn init_subscriber_with(default_filter: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true)
                .with_ansi(false),
        )
        .with(filter)
        .try_init()
        .ok();
}

#[cfg(not(feature = "tracing"))]
pub fn init_subscriber() {}

#[cfg(not(feature = "tracing"))]
pub fn init_subscriber_with(_default_filter: &str) {}

/// Write folded stacks of solver spans to `path`.
///
/// The file is flushed when the returned guard is dropped.
#[cfg(feature = "tracing")]
pub fn init_flamegraph(path: &str) -> Result<impl Drop, TraceError> {
    use tracing_flame::FlameLayer;
    use tracing_subscriber::{prelude::*, registry::Registry};

    let (flame_layer, guard) =
        FlameLayer::with_file(path).map_err(|e| TraceError::Flamegraph {
            path: path.to_string(),
            message: e.to_string(),
        })?;
    Registry::default().with(flame_layer).try_init().ok();
    Ok(guard)
}

#[cfg(not(feature = "tracing"))]
pub fn init_flamegraph(_path: &str) -> Result<impl Drop, TraceError> {
    struct NoFlame;
    impl Drop for NoFlame {
        fn drop(&mut self) {}
    }
    Ok(NoFlame)
}

#[cfg(test)]
#[path = "tests/trace.rs"]
mod tests;
