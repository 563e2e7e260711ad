//! Result type alias for compatibility-harness operations

use crate::error::SigdiffError;

/// Standard Result type for compatibility-harness operations
pub type Result<T> = std::result::Result<T, SigdiffError>;
