//! Convenient imports for txcache.
//!
//! ```ignore
//! use txcache::prelude::*;
//!
//! let manager = CacheManager::local();
//! let cache: Cache<String, u64> = manager.build_cache("counters")?;
//! ```

// Main entry points
pub use crate::{Cache, CacheManager, CasCache};

// Configuration
pub use crate::{CacheConfig, CacheSpecs, CodecKind};

// Error handling
pub use crate::{CacheError, CacheResult};

// Core types
pub use crate::{CacheLookup, CacheTransaction, CacheValue, HasVersion};
