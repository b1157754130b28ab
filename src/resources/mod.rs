//! Building blocks of the apply engine.
//!
//! - **[`template`]**: `{{TOKEN}}` substitution
//! - **[`backup`]**: timestamped pre-overwrite copies
//! - **[`writer`]**: privilege-scoped writes and the elevation seam
//! - **[`permissions`]**: name-based mode classification for secret trees
pub mod backup;
pub mod helpers;
pub mod permissions;
pub mod template;
pub mod writer;
