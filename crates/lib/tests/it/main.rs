/*! Integration tests for Scopestore.
 *
 * This test suite is organized as a single integration test binary
 * following the pattern described by matklad in
 * https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html
 *
 * The module structure mirrors the main library structure:
 * - container: Tests for the StorageContainer trait and its implementations
 * - storage: Tests for the shared Storage handle
 * - scoped: Tests for ScopedStorage views, their change streams and snapshots
 */

use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("scopestore=info".parse().unwrap()),
        )
        .with_test_writer()
        .try_init();
}
