use super::*;

#[test]
fn log_keeps_arrival_order() {
    let log = NoticeLog::new();
    log.success("AOI saved successfully");
    log.error("server responded 500: boom");
    assert_eq!(
        log.notices(),
        vec![Notice::success("AOI saved successfully"), Notice::error("server responded 500: boom")]
    );
}

#[test]
fn messages_filters_by_severity() {
    let log = NoticeLog::new();
    log.success("a");
    log.error("b");
    log.success("c");
    assert_eq!(log.messages(Severity::Success), vec!["a".to_string(), "c".to_string()]);
    assert_eq!(log.messages(Severity::Error), vec!["b".to_string()]);
}

#[test]
fn drain_empties_log() {
    let log = NoticeLog::new();
    log.error("x");
    assert_eq!(log.drain().len(), 1);
    assert!(log.notices().is_empty());
}

#[test]
fn notice_display_prefixes_severity() {
    assert_eq!(Notice::success("done").to_string(), "ok: done");
    assert_eq!(Notice::error("nope").to_string(), "error: nope");
}

#[test]
fn tracing_notifier_accepts_both_severities() {
    let notifier = TracingNotifier;
    notifier.success("fine");
    notifier.error("broken");
}
