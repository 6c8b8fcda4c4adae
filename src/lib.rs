#![cfg_attr(all(not(feature = "std"), not(test)), no_std)]

extern crate alloc;

// Re-export for convenience so other modules don't need alloc:: prefix
#[allow(unused_imports)]
pub(crate) use alloc::{boxed::Box, format, string::String, string::ToString, vec, vec::Vec};

pub mod ast;
pub mod context;
pub mod error;
pub mod fold;
pub mod instruction;
pub mod label;
pub mod lower;
pub mod opcode;
pub mod registry;
pub mod scope;
pub mod value;

mod driver;

pub use driver::{compile, compile_with, CompileOutput};
pub use error::{CompileError, ErrorKind};

/// Test utilities for enabling logging in tests.
#[cfg(test)]
pub mod test_utils {
    /// Initialize tracing subscriber for tests with DEBUG level.
    pub fn init_test_logging() {
        use tracing_subscriber::{fmt, EnvFilter};

        let _ = fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
            )
            .with_test_writer()
            .try_init();
    }
}
