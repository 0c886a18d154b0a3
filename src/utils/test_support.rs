use std::io::ErrorKind;
use std::net::TcpListener;

/// Mock-server tests need a localhost listener; some sandboxes forbid it.
/// Returns true (after logging why) when such tests should be skipped.
pub fn should_skip_httpmock() -> bool {
    match TcpListener::bind(("127.0.0.1", 0)) {
        Ok(_) => false,
        Err(err) if err.kind() == ErrorKind::PermissionDenied => {
            eprintln!("skipping httpmock test: sandbox forbids binding to localhost");
            true
        }
        Err(err) => panic!("failed to bind localhost for httpmock tests: {err}"),
    }
}
