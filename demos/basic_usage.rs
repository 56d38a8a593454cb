use json_prefs::{PreferenceStore, StoreOptions};
use serde_json::json;

fn main() {
    let dir = std::env::temp_dir().join("json_prefs_demo");
    let mut prefs = PreferenceStore::open(
        StoreOptions::new()
            .directory(&dir)
            .file_name("app-preferences")
            .defaults(json!({
                "notifications": true,
                "username": "guest",
                "window": {"width": 800, "height": 600},
            }))
            .on_save_error(|e| eprintln!("Failed to save preferences: {}", e)),
    )
    .expect("Failed to open preferences");

    println!("Current preferences:");
    prefs.for_each(|value, key, _| println!("  {}: {}", key, value));

    // Update a single value
    prefs.set("username", "Alice").expect("Invalid preference");

    // Batch updates using edit guard
    {
        let mut edit = prefs.edit();
        edit.set("window", json!({"width": 1280, "height": 720})).expect("Invalid preference");
        edit.set("notifications", false).expect("Invalid preference");
        // Saves automatically when edit guard is dropped
    }

    println!("\nWindow: {}", prefs.get("window").unwrap_or_default());
    println!("Preferences stored at: {}", prefs.path().display());
}
