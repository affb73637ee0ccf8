//! Launcher integration tests.
//!
//! These tests start real processes through `/bin/sh` and therefore only
//! run on POSIX hosts.

#![cfg(unix)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use shell_spawn::{
    Capture, Context, Echo, FailureReason, Options, RawStdio, ShellSpawnError, StdioKind,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_test::{assert_err, assert_ok};

/// Root context with echoing turned off.
fn quiet() -> Context {
    Context::default().context(Options::new().echo_command(false))
}

fn capture() -> Options {
    Options::new().capture_output(true)
}

// ============================================================================
// Capture
// ============================================================================

#[tokio::test]
async fn test_capture_stdout_only() {
    let outcome = assert_ok!(quiet().shell("echo hello", capture()).await).unwrap();

    assert_eq!(outcome.exit_code, Some(0));
    assert!(outcome.signal.is_none());
    assert_eq!(outcome.stdout_text(), Some("hello\n"));
    assert!(outcome.stderr.is_none());
}

#[tokio::test]
async fn test_capture_stderr_only() {
    let outcome = assert_ok!(
        quiet()
            .shell("echo problem 1>&2", Options::new().capture_error(true))
            .await
    )
    .unwrap();

    assert!(outcome.stdout.is_none());
    assert_eq!(outcome.stderr_text(), Some("problem\n"));
}

#[tokio::test]
async fn test_newlines_normalized_by_default() {
    let outcome = assert_ok!(quiet().shell("printf 'a\\r\\nb\\rc'", capture()).await).unwrap();
    assert_eq!(outcome.stdout_text(), Some("a\nb\nc"));
}

#[tokio::test]
async fn test_normalization_disabled() {
    let options = capture().normalize_text(false);
    let outcome = assert_ok!(quiet().shell("printf 'a\\r\\n'", options).await).unwrap();
    assert_eq!(outcome.stdout_text(), Some("a\r\n"));
}

#[tokio::test]
async fn test_capture_transform() {
    let options = Options::new().capture_output(Capture::transform(|bytes: Vec<u8>| bytes.len()));
    let outcome = assert_ok!(quiet().shell("printf 12345", options).await).unwrap();
    assert_eq!(outcome.stdout.unwrap().downcast::<usize>(), Some(5));
}

#[tokio::test]
async fn test_capture_raw_bytes() {
    let options = Options::new().capture_output(Capture::Bytes);
    let outcome = assert_ok!(quiet().shell("printf 'x\\r\\n'", options).await).unwrap();
    assert_eq!(outcome.stdout.unwrap().as_bytes(), Some(&b"x\r\n"[..]));
}

#[tokio::test]
async fn test_large_interleaved_output_does_not_deadlock() {
    let script = "i=0; while [ $i -lt 3000 ]; do echo out-$i; echo err-$i 1>&2; i=$((i+1)); done";
    let options = capture().capture_error(true);

    let outcome = tokio::time::timeout(Duration::from_secs(30), quiet().shell(script, options))
        .await
        .expect("capture deadlocked")
        .unwrap()
        .unwrap();

    let stdout = outcome.stdout_text().unwrap();
    let stderr = outcome.stderr_text().unwrap();
    assert_eq!(stdout.lines().count(), 3000);
    assert_eq!(stderr.lines().count(), 3000);
    assert!(stdout.ends_with("out-2999\n"));
    assert!(stderr.starts_with("err-0\n"));
}

// ============================================================================
// Input
// ============================================================================

#[tokio::test]
async fn test_input_echoed_back() {
    let options = capture().input_content("hello");
    let execution = quiet().spawn("cat", Vec::<String>::new(), options).unwrap();
    let outcome = assert_ok!(execution.wait().await).unwrap();
    assert_eq!(outcome.stdout_text(), Some("hello"));
}

#[tokio::test]
async fn test_large_input_round_trips() {
    let input = vec![b'q'; 1024 * 1024];
    let options = Options::new()
        .capture_output(Capture::Bytes)
        .input_content(input.clone());

    let outcome = assert_ok!(quiet().shell("cat", options).await).unwrap();
    assert_eq!(outcome.stdout.unwrap().as_bytes().map(<[u8]>::len), Some(input.len()));
}

#[tokio::test]
async fn test_input_ignored_by_child() {
    // The child exits without reading stdin; the launch must still succeed.
    let options = Options::new().input_content(vec![b'z'; 256 * 1024]);
    let outcome = assert_ok!(quiet().shell("exit 0", options).await).unwrap();
    assert_eq!(outcome.exit_code, Some(0));
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_nonzero_exit_rejects() {
    let err = assert_err!(quiet().shell("exit 3", Options::new()).await);
    assert_eq!(err.reason(), Some(FailureReason::NonZeroExit));
    assert_eq!(err.exit_code(), Some(3));
    assert!(err.to_string().contains("exited with code 3"));
}

#[tokio::test]
async fn test_ignore_error_resolves_with_code() {
    let options = Options::new().ignore_error(true);
    let outcome = assert_ok!(quiet().shell("exit 3", options).await).unwrap();
    assert_eq!(outcome.exit_code, Some(3));
    assert!(!outcome.success());
}

#[tokio::test]
async fn test_signal_rejects() {
    let err = assert_err!(quiet().shell("kill -9 $$", Options::new()).await);
    assert_eq!(err.reason(), Some(FailureReason::KilledBySignal));
    assert_eq!(err.signal(), Some("SIGKILL"));
}

#[tokio::test]
async fn test_ignore_error_records_signal() {
    let options = Options::new().ignore_error(true);
    let outcome = assert_ok!(quiet().shell("kill -TERM $$", options).await).unwrap();
    assert!(outcome.exit_code.is_none());
    assert_eq!(outcome.signal.as_deref(), Some("SIGTERM"));
}

#[tokio::test]
async fn test_missing_program_is_spawn_error() {
    let result = quiet().spawn("shell-spawn-missing-program", ["--flag"], Options::new());
    match result {
        Err(err @ ShellSpawnError::Spawn { .. }) => {
            assert_eq!(err.reason(), Some(FailureReason::SpawnError));
            assert!(err.to_string().contains("shell-spawn-missing-program"));
        }
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("missing program was launched"),
    }
}

// ============================================================================
// Echo
// ============================================================================

#[tokio::test]
async fn test_echo_filter_veto() {
    let seen: Arc<Mutex<Vec<(String, Vec<String>)>>> = Arc::default();
    let recorder = seen.clone();
    let options = Options::new().echo_command(Echo::filter(move |program, args| {
        recorder
            .lock()
            .unwrap()
            .push((program.to_string(), args.to_vec()));
        false
    }));

    let execution = quiet().exec("exit 7", options).unwrap();
    assert!(execution.process.is_none());
    assert!(assert_ok!(execution.wait().await).is_none());

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, "/bin/sh");
    assert_eq!(seen[0].1, vec!["-c", "exit 7"]);
}

#[tokio::test]
async fn test_echo_filter_allows() {
    let options = capture().echo_command(Echo::filter(|_, _| true));
    let outcome = assert_ok!(quiet().shell("echo go", options).await).unwrap();
    assert_eq!(outcome.stdout_text(), Some("go\n"));
}

// ============================================================================
// Environment and host options
// ============================================================================

#[tokio::test]
async fn test_env_layers_merge_across_contexts() {
    let parent = quiet().context(Options::new().env("BAR", "2"));
    let child = parent.context(Options::new().env("FOO", "1"));

    let options = capture().env("FOO", "9");
    let outcome = assert_ok!(child.shell("printf '%s-%s' \"$FOO\" \"$BAR\"", options).await).unwrap();

    assert_eq!(outcome.stdout_text(), Some("9-2"));
}

#[tokio::test]
async fn test_env_list_value_joined() {
    let options = capture().env("SEARCH", ["/a", "/b"]);
    let outcome = assert_ok!(quiet().shell("printf '%s' \"$SEARCH\"", options).await).unwrap();
    assert_eq!(outcome.stdout_text(), Some("/a:/b"));
}

#[tokio::test]
async fn test_env_override_preserves_non_unicode_inherited() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    std::env::set_var("SHELL_SPAWN_RAW_BYTES", OsStr::from_bytes(b"a\xffb"));
    let options = Options::new()
        .capture_output(Capture::Bytes)
        .env("UNRELATED", "1");

    let outcome = assert_ok!(
        quiet()
            .shell("printf '%s' \"$SHELL_SPAWN_RAW_BYTES\"", options)
            .await
    )
    .unwrap();
    assert_eq!(outcome.stdout.unwrap().as_bytes(), Some(&b"a\xffb"[..]));
}

#[tokio::test]
async fn test_raw_env_used_verbatim() {
    std::env::set_var("SHELL_SPAWN_SHOULD_NOT_LEAK", "leaked");
    let options = capture()
        .raw_env([("ONLY", "1")])
        .env("IGNORED", "x");
    let script = "printf '%s|%s|%s' \"$ONLY\" \"${SHELL_SPAWN_SHOULD_NOT_LEAK:-none}\" \"${IGNORED:-none}\"";

    let outcome = assert_ok!(quiet().shell(script, options).await).unwrap();
    assert_eq!(outcome.stdout_text(), Some("1|none|none"));
}

#[tokio::test]
async fn test_working_directory() {
    let dir = tempfile::tempdir().unwrap();
    let expected = dir.path().canonicalize().unwrap();

    let options = capture().cwd(dir.path());
    let outcome = assert_ok!(quiet().shell("pwd -P", options).await).unwrap();

    assert_eq!(outcome.stdout_text().unwrap().trim_end(), expected.to_str().unwrap());
}

#[tokio::test]
async fn test_custom_shell_switch() {
    let options = capture().shell_name("/bin/sh").shell_switch(["-e", "-c"]);
    let err = assert_err!(quiet().shell("false; echo unreachable", options).await);
    assert_eq!(err.exit_code(), Some(1));
}

#[tokio::test]
async fn test_command_hook_applied() {
    let options = capture().command_hook(|cmd| {
        cmd.env("FROM_HOOK", "yes");
    });
    let outcome = assert_ok!(quiet().shell("printf '%s' \"$FROM_HOOK\"", options).await).unwrap();
    assert_eq!(outcome.stdout_text(), Some("yes"));
}

#[tokio::test]
async fn test_raw_stdio_hands_streams_to_caller() {
    let options = capture().stdio(RawStdio::all(StdioKind::Piped));
    let mut execution = quiet().spawn("cat", Vec::<String>::new(), options).unwrap();
    let process = execution.process.as_mut().unwrap();

    let mut stdin = process.stdin.take().unwrap();
    let mut stdout = process.stdout.take().unwrap();
    stdin.write_all(b"through the escape hatch").await.unwrap();
    drop(stdin);

    let mut read = String::new();
    stdout.read_to_string(&mut read).await.unwrap();
    assert_eq!(read, "through the escape hatch");

    let outcome = assert_ok!(execution.completion.await).unwrap();
    // Raw wiring disables managed capture.
    assert!(outcome.stdout.is_none());
}

// ============================================================================
// Process handle
// ============================================================================

#[tokio::test]
async fn test_timeout_then_kill() {
    let mut execution = quiet().exec("sleep 30", Options::new()).unwrap();

    let raced = tokio::time::timeout(Duration::from_millis(200), &mut execution.completion).await;
    assert!(raced.is_err());

    let process = execution.process.take().unwrap();
    assert!(process.id() > 0);
    assert!(process.kill());

    let err = assert_err!(execution.completion.await);
    assert_eq!(err.signal(), Some("SIGKILL"));
}

#[tokio::test]
async fn test_kill_after_exit_reports_reaped() {
    let mut execution = quiet().exec("exit 0", Options::new()).unwrap();
    let process = execution.process.take().unwrap();

    assert_ok!((&mut execution.completion).await);
    assert!(!process.kill());
}

#[tokio::test]
async fn test_root_entry_points() {
    let options = capture().echo_command(false);
    let outcome = assert_ok!(shell_spawn::shell("echo root", options).await).unwrap();
    assert_eq!(outcome.stdout_text(), Some("root\n"));

    let execution = shell_spawn::spawn("true", Vec::<String>::new(), Options::new().echo_command(false)).unwrap();
    assert!(assert_ok!(execution.wait().await).unwrap().success());
}
