//! Integration test for the default key location
//!
//! Lives in its own test binary: it changes `TMPDIR`, which is process-wide.

use notify_queue::{QueueDependencies, SysVQueueBackend, SysVQueueConfig};
use tempfile::TempDir;

#[test]
fn test_default_key_ignores_tmpdir() {
    let alternate = TempDir::new().unwrap();

    std::env::remove_var("TMPDIR");
    let without = SysVQueueBackend::new(SysVQueueConfig::new("n"), QueueDependencies::default())
        .unwrap()
        .key();

    std::env::set_var("TMPDIR", alternate.path());
    let with = SysVQueueBackend::new(SysVQueueConfig::new("n"), QueueDependencies::default())
        .unwrap()
        .key();
    std::env::remove_var("TMPDIR");

    assert_eq!(without, with);
}
