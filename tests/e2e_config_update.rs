// LogMark - tests/e2e_config_update.rs
//
// End-to-end tests for multi-pattern waits: configuration updates with and
// without a feature update racing them, and installed-application checks.

mod common;

use common::{log_file, session, write_later};
use logmark::app::config_update::config_update_spec;
use logmark::core::watch::{DynamicWatch, WatchSet, WatchSpec};
use logmark::{LogMarkError, WaitConfig, WaitError};
use std::time::{Duration, Instant};

const NONE: &[&str] = &[];

/// A feature update that starts before the config-updated message must also
/// finish before the wait succeeds, although its completion pattern was
/// never in the initial watch set.
#[test]
fn e2e_feature_update_extends_config_wait() {
    let (_dir, file) = log_file("CWWKG0016I: Starting server configuration update.\n");
    let (mut session, _) = session();
    session.set_mark_to_end_of_log(std::slice::from_ref(&file)).unwrap();

    let writer = write_later(
        file.path(),
        &[
            (20, "CWWKF0007I: Feature update started.\n"),
            (20, "CWWKG0017I: The server configuration was successfully updated in 0.1 seconds.\n"),
            (150, "CWWKF0008I: Feature update completed in 0.3 seconds.\n"),
        ],
    );

    let started = Instant::now();
    let lines = session.wait_for_config_update(&file, NONE, false, NONE).unwrap();
    let elapsed = started.elapsed();
    writer.join().unwrap();

    assert_eq!(lines.len(), 3, "{lines:?}");
    assert!(lines[0].starts_with("CWWKF0007I"));
    assert!(lines[1].starts_with("CWWKG0017I"));
    assert!(lines[2].starts_with("CWWKF0008I"));
    assert!(elapsed >= Duration::from_millis(150), "returned before the feature update: {elapsed:?}");
}

/// A feature update after the config is applied is not waited for.
#[test]
fn e2e_config_done_first_completes_immediately() {
    let (_dir, file) = log_file("");
    let (mut session, _) = session();
    let writer = write_later(
        file.path(),
        &[(30, "CWWKG0018I: The server configuration was not updated. No functional changes were detected.\n")],
    );

    let lines = session.wait_for_config_update(&file, NONE, false, NONE).unwrap();
    writer.join().unwrap();
    assert_eq!(lines.len(), 1);
}

/// Lines before the mark do not satisfy the wait.
#[test]
fn e2e_old_config_message_ignored_after_mark() {
    let (_dir, file) = log_file("CWWKG0017I: The server configuration was successfully updated.\n");
    let config = WaitConfig::default()
        .with_poll_interval(common::TEST_POLL)
        .with_config_update_timeout(Duration::from_millis(80));
    let mut session = logmark::LogSession::new(config);
    session.set_mark_to_end_of_log(std::slice::from_ref(&file)).unwrap();

    let err = session
        .wait_for_config_update(&file, NONE, false, NONE)
        .unwrap_err();
    match err {
        LogMarkError::Wait(WaitError::Outstanding { patterns, apps, .. }) => {
            assert_eq!(patterns, vec!["CWWKG001[7-8]I"]);
            assert!(apps.is_empty());
        }
        other => panic!("unexpected error: {other}"),
    }
}

/// The wait also blocks on applications named by the caller, and the
/// timeout lists the one that never started.
#[test]
fn e2e_config_update_waits_for_named_apps() {
    let (_dir, file) = log_file("");
    let config = WaitConfig::default()
        .with_poll_interval(common::TEST_POLL)
        .with_config_update_timeout(Duration::from_millis(300));
    let mut session = logmark::LogSession::new(config);
    let writer = write_later(
        file.path(),
        &[
            (20, "CWWKG0017I: The server configuration was successfully updated.\n"),
            (20, "CWWKZ0003I: The application alpha updated in 0.2 seconds.\n"),
        ],
    );

    let err = session
        .wait_for_config_update(&file, &["alpha", "beta"], false, NONE)
        .unwrap_err();
    writer.join().unwrap();

    let text = err.to_string();
    assert!(text.contains("\"beta\""), "{text}");
    assert!(!text.contains("\"alpha\""), "{text}");
}

/// A caller-built spec with its own trigger behaves like the config wait.
#[test]
fn e2e_custom_dynamic_watch() {
    let (_dir, file) = log_file("");
    let (mut session, _) = session();
    let spec = WatchSpec::new(WatchSet::from_patterns(&["SESN0176I"]).unwrap())
        .with_dynamic(DynamicWatch::new("SRVE0169I: Loading", "SRVE0250I").unwrap());
    let writer = write_later(
        file.path(),
        &[
            (10, "SRVE0169I: Loading Web Module: shop.\n"),
            (10, "SESN0176I: A new session context will be created.\n"),
            (40, "SRVE0250I: Web Module shop has been bound to default_host.\n"),
        ],
    );

    let lines = session
        .wait_for_all(spec, NONE, &file, Duration::from_millis(2000))
        .unwrap();
    writer.join().unwrap();
    assert_eq!(lines.len(), 3);
}

#[test]
fn e2e_extra_patterns_required() {
    let (_dir, file) = log_file(
        "CWWKG0017I: The server configuration was successfully updated.\n\
         CWWKT0016I: Web application available (default_host): http://localhost:9080/shop/\n",
    );
    let (mut session, _) = session();
    let spec = config_update_spec(false, &["CWWKT0016I:.*shop"]).unwrap();
    let lines = session
        .wait_for_all(spec, NONE, &file, Duration::from_millis(500))
        .unwrap();
    assert_eq!(lines.len(), 2);
}
