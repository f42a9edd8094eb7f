pub mod db;
pub mod services;
pub mod validation;

/// Test utilities for unit and integration testing.
/// Only available with cfg(test) or feature "testing".
#[cfg(any(test, feature = "testing"))]
pub mod testing;
