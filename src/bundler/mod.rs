//! Release artifact bundling.
//!
//! Produces one reproducible zip archive per release target from the
//! framework directories built for it, plus the license file.

mod archive;
mod checksum;

pub use archive::{ArtifactBundler, BundledArchive};
pub use checksum::calculate_sha256;
