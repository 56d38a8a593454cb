use json_prefs::PreferenceStore;
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::thread;

#[test]
fn test_concurrent_access_with_mutex() {
    let prefs = Arc::new(Mutex::new(
        PreferenceStore::open_testing(json!({"counter": 0})).unwrap(),
    ));
    let mut handles = vec![];

    // Spawn 10 threads that increment the counter
    for i in 0..10 {
        let prefs_clone = Arc::clone(&prefs);
        let handle = thread::spawn(move || {
            let mut prefs = prefs_clone.lock().unwrap();
            let current = prefs.get_as::<i64>("counter").unwrap_or(0);
            prefs.set("counter", current + 1).expect("Set should succeed");
            prefs
                .set("name", format!("thread-{}", i))
                .expect("Set should succeed");
        });
        handles.push(handle);
    }

    for handle in handles {
        handle.join().unwrap();
    }

    let prefs = prefs.lock().unwrap();
    assert_eq!(prefs.get("counter"), Some(json!(10)));
    assert!(prefs.get_as::<String>("name").unwrap().starts_with("thread-"));
    assert!(prefs.last_save_error().is_none());
}
