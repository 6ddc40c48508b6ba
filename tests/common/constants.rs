//! Shared constants for end-to-end tests
//!
//! When test data changes (user handles, media ids, etc.), update only this file.

// ============================================================================
// Test Users
// ============================================================================

/// Handle of the user who usually owns the watchlists under test
pub const ALICE: &str = "alice";

/// Handle of a second user, usually a follower or collaborator
pub const BOB: &str = "bob";

/// Handle of a third user
pub const CAROL: &str = "carol";

/// All seeded users
pub const TEST_USERS: [&str; 3] = [ALICE, BOB, CAROL];

// ============================================================================
// Test Media
// ============================================================================

/// Movie known to the fake metadata service
pub const MOVIE_1_ID: &str = "tt0078748";

/// Another movie known to the fake metadata service
pub const MOVIE_2_ID: &str = "tt0090605";

/// Series known to the fake metadata service
pub const SERIES_1_ID: &str = "tt0903747";

/// Media id the fake metadata service answers 404 for
pub const MISSING_MEDIA_ID: &str = "missing";

/// Runtime reported by the fake metadata service for every title (minutes)
pub const FAKE_RUNTIME_MINUTES: u32 = 100;

/// Episode count reported by the fake metadata service for series
pub const FAKE_EPISODE_COUNT: u32 = 10;

// ============================================================================
// Test Timeouts and Configuration
// ============================================================================

/// Maximum time to wait for server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Timeout for individual HTTP requests (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Polling interval when waiting for server ready (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;

/// Maximum time to wait for a detached cover refresh to land (milliseconds)
pub const COVER_REFRESH_TIMEOUT_MS: u64 = 3000;
