use rstest::rstest;
use serial_test::serial;

use linklock::common_tests::link_list_stress_tests::*;

// Load shapes: (threads, values per thread). The serial attribute keeps
// the contention profiles honest by not letting suites poach each
// other's cores.

#[rstest]
#[serial]
#[case::narrow(2, 200)]
#[case::medium(4, 400)]
#[case::wide(8, 800)]
fn concurrent_appends(#[case] threads: usize, #[case] per_thread: usize) {
    test_concurrent_appends(threads, per_thread);
}

#[rstest]
#[serial]
#[case::narrow(2, 500)]
#[case::medium(4, 1000)]
#[case::wide(8, 1000)]
fn count_conservation(#[case] threads: usize, #[case] ops: usize) {
    test_count_conservation(threads, ops);
}

#[rstest]
#[serial]
#[case::narrow(2, 300)]
#[case::medium(4, 1200)]
#[case::wide(7, 2100)]
fn iteration_removal_partition(#[case] threads: usize, #[case] values: usize) {
    test_concurrent_iteration_removal(threads, values);
}

#[rstest]
#[serial]
#[case::narrow(2, 1000)]
#[case::wide(8, 4000)]
fn pop_unique(#[case] threads: usize, #[case] values: usize) {
    test_concurrent_pop_unique(threads, values);
}

#[rstest]
#[serial]
#[case::few(4)]
#[case::many(16)]
fn try_append_single_winner(#[case] threads: usize) {
    test_try_append_single_winner(threads);
}

#[rstest]
#[serial]
#[case::few(4)]
#[case::many(16)]
fn delete_single_winner(#[case] threads: usize) {
    test_concurrent_delete_single_winner(threads);
}

#[rstest]
#[serial]
#[case::light(2, 200)]
#[case::heavy(6, 600)]
fn iteration_during_appends(#[case] appenders: usize, #[case] per_thread: usize) {
    test_iteration_during_appends(appenders, per_thread);
}
