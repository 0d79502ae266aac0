/// Snapshot file stem for a test function name.
///
/// Only the last `::` segment is used. A leading `test` and then a leading
/// `_` are stripped, `()` is removed, spaces become underscores, and the
/// result is uppercased: `tests::test_login_screen` becomes `LOGIN_SCREEN`.
pub fn snapshot_name(test_name: &str) -> String {
    let name = test_name.rsplit("::").next().unwrap_or(test_name);
    let name = name.strip_prefix("test").unwrap_or(name);
    let name = name.strip_prefix('_').unwrap_or(name);
    name.replace("()", "").replace(' ', "_").to_uppercase()
}

/// Snapshot name derived from the running test.
///
/// The libtest harness names each test thread after the test's path. Returns
/// `None` on unnamed threads and on `main` (tests run with
/// `--test-threads=1` execute on the main thread).
pub fn current_test_snapshot_name() -> Option<String> {
    std::thread::current()
        .name()
        .filter(|name| *name != "main")
        .map(snapshot_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_test_prefix_and_uppercases() {
        assert_eq!(snapshot_name("test_login_screen"), "LOGIN_SCREEN");
        assert_eq!(snapshot_name("testLoginScreen"), "LOGINSCREEN");
        assert_eq!(snapshot_name("login_screen"), "LOGIN_SCREEN");
    }

    #[test]
    fn uses_last_path_segment() {
        assert_eq!(
            snapshot_name("ui::settings::tests::test_dark_mode"),
            "DARK_MODE"
        );
    }

    #[test]
    fn removes_parens_and_spaces() {
        assert_eq!(snapshot_name("test_empty state()"), "EMPTY_STATE");
    }

    #[test]
    fn strips_only_one_underscore() {
        assert_eq!(snapshot_name("test__double"), "_DOUBLE");
    }

    #[test]
    fn current_test_name_comes_from_thread() {
        // Either the harness named this thread or we run on `main`.
        if let Some(name) = current_test_snapshot_name() {
            assert_eq!(name, "CURRENT_TEST_NAME_COMES_FROM_THREAD");
        }
    }

    #[test]
    fn named_thread_drives_current_name() {
        let name = std::thread::Builder::new()
            .name("widgets::tests::test_primary_button".to_string())
            .spawn(current_test_snapshot_name)
            .unwrap()
            .join()
            .unwrap();
        assert_eq!(name.as_deref(), Some("PRIMARY_BUTTON"));
    }
}
