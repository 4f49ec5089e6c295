//! Version resolution, manifest reading and manifest rewriting.

pub mod plist;
pub mod reader;
pub mod resolver;
pub mod rewriter;

pub use reader::{parse_declared_version, read_version};
pub use resolver::{BumpKind, PRERELEASE_TOKEN, bump, parse_version};
pub use rewriter::{LineRule, ManifestRewriter, RewriteReport, RewriteRequest};
