use tokio::sync::broadcast;

use super::*;

fn info(target_id: &str, kind: &str, context: Option<&str>) -> TargetInfo {
    TargetInfo {
        target_id: target_id.to_string(),
        target_type: kind.to_string(),
        title: String::new(),
        url: "about:blank".to_string(),
        attached: false,
        browser_context_id: context.map(str::to_string),
        opener_id: None,
    }
}

fn registry() -> (
    parking_lot::Mutex<std::collections::HashMap<String, TargetInfo>>,
    broadcast::Sender<TargetEvent>,
    broadcast::Receiver<TargetEvent>,
) {
    let (tx, rx) = broadcast::channel(64);
    (parking_lot::Mutex::new(std::collections::HashMap::new()), tx, rx)
}

#[test]
fn target_kind_parses_wire_strings() {
    assert_eq!(TargetKind::parse("page"), TargetKind::Page);
    assert_eq!(TargetKind::parse("iframe"), TargetKind::Iframe);
    assert_eq!(TargetKind::parse("service_worker"), TargetKind::ServiceWorker);
    assert_eq!(TargetKind::parse("webview"), TargetKind::Other);
}

#[test]
fn created_emits_once_per_target() {
    let (known, tx, mut rx) = registry();
    apply_created(&known, &tx, info("T1", "page", None));
    apply_created(&known, &tx, info("T1", "page", None));

    assert!(matches!(rx.try_recv().unwrap(), TargetEvent::Created(i) if i.target_id == "T1"));
    assert!(rx.try_recv().is_err());
    assert_eq!(known.lock().len(), 1);
}

#[test]
fn destroyed_emits_only_for_known_targets() {
    let (known, tx, mut rx) = registry();
    apply_created(&known, &tx, info("T1", "page", None));
    let _ = rx.try_recv();

    apply_destroyed(&known, &tx, "T1");
    apply_destroyed(&known, &tx, "T1");
    apply_destroyed(&known, &tx, "NEVER-SEEN");

    assert!(matches!(rx.try_recv().unwrap(), TargetEvent::Destroyed(id) if id == "T1"));
    assert!(rx.try_recv().is_err());
    assert!(known.lock().is_empty());
}

#[test]
fn info_changed_updates_registry() {
    let (known, tx, mut rx) = registry();
    apply_created(&known, &tx, info("T1", "page", None));
    let _ = rx.try_recv();

    let mut updated = info("T1", "page", None);
    updated.url = "https://example.com/".to_string();
    apply_info_changed(&known, &tx, updated);

    assert!(
        matches!(rx.try_recv().unwrap(), TargetEvent::InfoChanged(i) if i.url == "https://example.com/")
    );
    assert_eq!(known.lock().get("T1").unwrap().url, "https://example.com/");
}

#[test]
fn snapshot_diff_emits_created_and_destroyed() {
    let (known, tx, mut rx) = registry();
    apply_created(&known, &tx, info("KEEP", "page", None));
    apply_created(&known, &tx, info("GONE", "page", None));
    while rx.try_recv().is_ok() {}

    // Live view: KEEP survives, GONE vanished, LATE is new.
    apply_snapshot(
        &known,
        &tx,
        vec![info("KEEP", "page", None), info("LATE", "page", None)],
    );

    let mut destroyed = Vec::new();
    let mut created = Vec::new();
    while let Ok(event) = rx.try_recv() {
        match event {
            TargetEvent::Destroyed(id) => destroyed.push(id),
            TargetEvent::Created(i) => created.push(i.target_id),
            _ => {}
        }
    }
    assert_eq!(destroyed, vec!["GONE".to_string()]);
    assert_eq!(created, vec!["LATE".to_string()]);

    let mut ids: Vec<String> = known.lock().keys().cloned().collect();
    ids.sort();
    assert_eq!(ids, vec!["KEEP".to_string(), "LATE".to_string()]);
}

#[test]
fn pages_in_context_filters_kind_and_context() {
    let (known, tx, _rx) = registry();
    apply_created(&known, &tx, info("P1", "page", None));
    apply_created(&known, &tx, info("P2", "page", Some("CTX")));
    apply_created(&known, &tx, info("W1", "worker", None));

    let known_map = known.into_inner();
    let default_pages: Vec<&TargetInfo> = known_map
        .values()
        .filter(|i| TargetKind::parse(&i.target_type) == TargetKind::Page)
        .filter(|i| i.browser_context_id.is_none())
        .collect();
    assert_eq!(default_pages.len(), 1);
    assert_eq!(default_pages[0].target_id, "P1");
}
