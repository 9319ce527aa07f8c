use super::*;

fn manager() -> (tempfile::TempDir, ProfileManager) {
    let dir = tempfile::tempdir().unwrap();
    let manager = ProfileManager::new(dir.path().join("profiles")).unwrap();
    (dir, manager)
}

#[test]
fn create_lays_out_the_directory() {
    let (_dir, manager) = manager();
    let profile = manager.create("scraper").unwrap();

    assert!(profile.path().join("metadata.json").is_file());
    assert!(profile.path().join("preferences.json").is_file());
    assert!(profile.user_data_dir().is_dir());
    assert!(profile.id().starts_with("scraper-"));
    assert_eq!(profile.name(), "scraper");
    assert_eq!(profile.metadata().state, ProfileState::Ready);
}

#[test]
fn open_roundtrips_metadata() {
    let (_dir, manager) = manager();
    let created = manager.create("roundtrip").unwrap();

    let opened = Profile::open(created.path()).unwrap();
    assert_eq!(opened.id(), created.id());
    assert_eq!(opened.name(), "roundtrip");
}

#[test]
fn open_missing_profile_fails() {
    let (_dir, manager) = manager();
    let result = Profile::open(manager.root().join("nope"));
    assert!(matches!(result, Err(ProfileError::Missing(_))));
}

#[test]
fn acquire_writes_lock_and_touches_metadata() {
    let (_dir, manager) = manager();
    let mut profile = manager.create("locked").unwrap();

    assert!(!profile.is_locked());
    let guard = profile.acquire().unwrap();
    assert!(profile.path().join(".lock").is_file());
    assert_eq!(profile.lock_owner(), Some(std::process::id()));
    assert!(profile.metadata().last_used.is_some());

    guard.release();
    assert!(!profile.path().join(".lock").exists());
}

#[test]
fn lock_releases_on_drop() {
    let (_dir, manager) = manager();
    let mut profile = manager.create("dropper").unwrap();
    {
        let _guard = profile.acquire().unwrap();
        assert!(profile.path().join(".lock").is_file());
    }
    assert!(!profile.path().join(".lock").exists());
}

#[test]
fn stale_lock_is_pruned_on_acquire() {
    let (_dir, manager) = manager();
    let mut profile = manager.create("stale").unwrap();

    // A pid that cannot be alive: pid_max on Linux caps well below this.
    let stale = serde_json::json!({"pid": 4_000_000, "timestamp": "2020-01-01T00:00:00Z"});
    std::fs::write(profile.path().join(".lock"), stale.to_string()).unwrap();

    if cfg!(target_os = "linux") {
        let guard = profile.acquire().unwrap();
        assert_eq!(profile.lock_owner(), Some(std::process::id()));
        guard.release();
    }
}

#[test]
fn cleanup_sweeps_stale_locks() {
    let (_dir, manager) = manager();
    let a = manager.create("a").unwrap();
    let _b = manager.create("b").unwrap();

    let stale = serde_json::json!({"pid": 4_000_000, "timestamp": "2020-01-01T00:00:00Z"});
    std::fs::write(a.path().join(".lock"), stale.to_string()).unwrap();

    if cfg!(target_os = "linux") {
        assert_eq!(manager.cleanup_stale_locks().unwrap(), 1);
        assert!(!a.path().join(".lock").exists());
    }
}

#[test]
fn list_and_get_by_name() {
    let (_dir, manager) = manager();
    manager.create("first").unwrap();
    manager.create("second").unwrap();

    let profiles = manager.list().unwrap();
    assert_eq!(profiles.len(), 2);

    let found = manager.get_by_name("second").unwrap().unwrap();
    assert_eq!(found.name(), "second");
    assert!(manager.get_by_name("missing").unwrap().is_none());
}

#[test]
fn delete_refuses_locked_profiles() {
    let (_dir, manager) = manager();
    let mut profile = manager.create("held").unwrap();
    let guard = profile.acquire().unwrap();

    let result = manager.delete(profile.id());
    assert!(matches!(result, Err(ProfileError::Locked { .. })));

    guard.release();
    manager.delete(profile.id()).unwrap();
    assert!(manager.get(profile.id()).is_err());
}

#[test]
fn duplicate_copies_user_data() {
    let (_dir, manager) = manager();
    let source = manager.create("template").unwrap();
    std::fs::write(source.user_data_dir().join("state.bin"), b"opaque").unwrap();

    let copy = manager.duplicate(source.id(), "clone").unwrap();
    assert_eq!(copy.name(), "clone");
    assert_eq!(
        std::fs::read(copy.user_data_dir().join("state.bin")).unwrap(),
        b"opaque"
    );
    // Ids stay distinct.
    assert_ne!(copy.id(), source.id());
}

#[test]
fn preferences_roundtrip() {
    let (_dir, manager) = manager();
    let profile = manager.create("prefs").unwrap();

    assert_eq!(
        profile.preferences().unwrap(),
        serde_json::json!({})
    );
    profile
        .set_preferences(&serde_json::json!({"download_dir": "/tmp"}))
        .unwrap();
    assert_eq!(
        profile.preferences().unwrap()["download_dir"],
        "/tmp"
    );
}

#[test]
fn sanitize_name_maps_specials() {
    assert_eq!(sanitize_name("My Profile!"), "my-profile-");
    assert_eq!(sanitize_name("ok_name-2"), "ok_name-2");
}
