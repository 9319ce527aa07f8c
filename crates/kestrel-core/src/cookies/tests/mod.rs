use super::*;

fn epoch_now() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs_f64()
}

#[test]
fn set_and_get_roundtrip() {
    let store = CookieStore::new();
    store.set(CookieRecord::new("session", "abc", "example.com"));

    let cookie = store.get("session", Some("example.com"), None).unwrap();
    assert_eq!(cookie.value, "abc");
    assert_eq!(cookie.path, "/");
}

#[test]
fn replace_keyed_by_domain_path_name() {
    let store = CookieStore::new();
    store.set(CookieRecord::new("a", "1", "example.com"));
    store.set(CookieRecord::new("a", "2", "example.com"));
    // Same key replaces.
    assert_eq!(store.len(), 1);
    assert_eq!(store.get("a", None, None).unwrap().value, "2");

    // Different path is a different record.
    store.set(CookieRecord::new("a", "3", "example.com").path("/admin"));
    assert_eq!(store.len(), 2);
}

#[test]
fn leading_dot_domain_is_same_key() {
    let store = CookieStore::new();
    store.set(CookieRecord::new("a", "1", ".example.com"));
    store.set(CookieRecord::new("a", "2", "example.com"));
    assert_eq!(store.len(), 1);
}

#[test]
fn expired_record_is_discarded_on_set() {
    let store = CookieStore::new();
    store.set(CookieRecord::new("old", "x", "example.com").expires(epoch_now() - 60.0));
    assert!(store.get("old", None, None).is_none());
    assert!(store.is_empty());
}

#[test]
fn expired_record_is_pruned_on_get() {
    let store = CookieStore::new();
    // Insert unexpired, then overwrite expiry via direct set of a record
    // expiring in the past (set discards it and removes the key).
    store.set(CookieRecord::new("s", "v", "example.com").expires(epoch_now() + 3600.0));
    assert!(store.get("s", None, None).is_some());

    store.set(CookieRecord::new("s", "v", "example.com").expires(epoch_now() - 1.0));
    assert!(store.get("s", None, None).is_none());
    assert_eq!(store.len(), 0);
}

#[test]
fn get_for_url_matches_domain_suffix() {
    let store = CookieStore::new();
    store.set(CookieRecord::new("root", "1", "example.com"));
    store.set(CookieRecord::new("sub", "2", "api.example.com"));
    store.set(CookieRecord::new("other", "3", "example.org"));

    let names: Vec<String> = store
        .get_for_url("http://api.example.com/v1/items")
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert!(names.contains(&"root".to_string()));
    assert!(names.contains(&"sub".to_string()));
    assert!(!names.contains(&"other".to_string()));

    // The parent host does not see the subdomain cookie.
    let names: Vec<String> = store
        .get_for_url("http://example.com/")
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert!(names.contains(&"root".to_string()));
    assert!(!names.contains(&"sub".to_string()));
}

#[test]
fn get_for_url_respects_path_prefix() {
    let store = CookieStore::new();
    store.set(CookieRecord::new("admin", "1", "example.com").path("/admin"));
    store.set(CookieRecord::new("site", "2", "example.com"));

    let names: Vec<String> = store
        .get_for_url("http://example.com/admin/users")
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["admin".to_string(), "site".to_string()]);

    let names: Vec<String> = store
        .get_for_url("http://example.com/public")
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["site".to_string()]);
}

#[test]
fn secure_cookie_requires_https() {
    let store = CookieStore::new();
    store.set(CookieRecord::new("token", "x", "example.com").secure(true));

    assert!(store.get_for_url("http://example.com/").is_empty());
    assert_eq!(store.get_for_url("https://example.com/").len(), 1);
}

#[test]
fn longest_path_sorts_first() {
    let store = CookieStore::new();
    store.set(CookieRecord::new("a", "1", "example.com"));
    store.set(CookieRecord::new("b", "2", "example.com").path("/deep/nested"));
    store.set(CookieRecord::new("c", "3", "example.com").path("/deep"));

    let names: Vec<String> = store
        .get_for_url("http://example.com/deep/nested/page")
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["b".to_string(), "c".to_string(), "a".to_string()]);
}

#[test]
fn delete_with_and_without_scope() {
    let store = CookieStore::new();
    store.set(CookieRecord::new("a", "1", "example.com"));
    store.set(CookieRecord::new("a", "2", "example.org"));

    store.delete("a", Some("example.com"), None);
    assert_eq!(store.len(), 1);
    assert!(store.get("a", Some("example.org"), None).is_some());

    store.delete("a", None, None);
    assert!(store.is_empty());
}

#[test]
fn clear_scoped_to_domain() {
    let store = CookieStore::new();
    store.set(CookieRecord::new("a", "1", "example.com"));
    store.set(CookieRecord::new("b", "2", "example.org"));

    store.clear(Some("example.com"));
    assert_eq!(store.len(), 1);
    store.clear(None);
    assert!(store.is_empty());
}

#[test]
fn update_from_list_bulk_upserts() {
    let store = CookieStore::new();
    store.update_from_list(vec![
        CookieRecord::new("a", "1", "example.com"),
        CookieRecord::new("b", "2", "example.com"),
        CookieRecord::new("a", "3", "example.com"),
    ]);
    assert_eq!(store.len(), 2);
    assert_eq!(store.get("a", None, None).unwrap().value, "3");
}

#[test]
fn empty_domain_matches_everything() {
    let record = CookieRecord::new("n", "v", "");
    assert!(record.matches_domain("anything.example"));
}

#[test]
fn invalid_url_yields_no_cookies() {
    let store = CookieStore::new();
    store.set(CookieRecord::new("a", "1", "example.com"));
    assert!(store.get_for_url("not a url").is_empty());
}
