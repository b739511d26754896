//! # Unasync Core
//!
//! Core implementation of the unasync source transform, including:
//! - Python lexing into a contiguous token stream
//! - Source encoding detection (BOM and coding cookies)
//! - Substitution tables mapping asynchronous tokens to synchronous ones
//! - The token-level file rewriter
//! - Rules binding a source root to a destination root
//! - The tree driver that replicates a source tree into its synchronous twin
//!
//! A build step hands [`unasync_files`] a list of file paths plus a list of
//! [`Rule`]s; every file under a rule's source root is rewritten into the
//! same relative location under the rule's destination root.

#![warn(clippy::all)]

pub mod config;
pub mod driver;
pub mod encoding;
pub mod errors;
pub mod fs;
pub mod lexer;
pub mod rewriter;
pub mod rule;
pub mod table;

// Re-export commonly used types
pub use crate::config::{load_defaults, Loader, ReplacementConfig, RuleConfig, UnasyncConfig};
pub use driver::{plan, unasync_files, FileJob, Summary};
pub use encoding::SourceEncoding;
pub use errors::{Result, UnasyncError};
pub use fs::makedirs_existok;
pub use lexer::{tokenize, LexError, Token, TokenKind};
pub use rewriter::{rewrite, rewrite_bytes, rewrite_source};
pub use rule::{normalize_path, FileOutcome, Rule};
pub use table::{SubstitutionTable, DEFAULT_REPLACEMENTS};

use tracing_subscriber::EnvFilter;

/// Unasync version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize tracing for unasync components
///
/// `RUST_LOG` takes precedence; without it unasync logs at `info`, or at
/// `debug` when `verbose` is set.
pub fn init_tracing(verbose: bool) {
    let filter = env_filter(verbose, std::env::var("RUST_LOG").ok().as_deref());

    // A subscriber may already be installed by an embedding build tool.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn env_filter(verbose: bool, rust_log: Option<&str>) -> EnvFilter {
    let level = if verbose { "debug" } else { "info" };
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(format!("unasync_core={level},unasync_cli={level}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rust_log_overrides_verbosity() {
        let filter = env_filter(true, Some("warn")).to_string();
        assert!(filter.contains("warn"));
        assert!(!filter.contains("unasync_core"));
    }

    #[test]
    fn verbosity_applies_without_rust_log() {
        assert!(env_filter(true, None).to_string().contains("unasync_core=debug"));
        assert!(env_filter(false, None).to_string().contains("unasync_core=info"));
        assert!(env_filter(false, Some("unasync_core=loud")).to_string().contains("unasync_core=info"));
    }
}
