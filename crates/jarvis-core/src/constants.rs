//! Engine-wide constants.

/// Maximum number of evidence strings a pattern carries (UI contract).
pub const MAX_EVIDENCE: usize = 6;

/// Lowest and highest confidence a pattern can report.
pub const CONFIDENCE_MIN: u8 = 0;
pub const CONFIDENCE_MAX: u8 = 100;

/// Header carrying the authenticated user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Default page size for pattern queries.
pub const DEFAULT_PAGE_LIMIT: u32 = 50;
pub const MAX_PAGE_LIMIT: u32 = 200;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
