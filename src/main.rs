//! SmartMark: a per-user bookmark manager kept in sync with its store.
//!
//! Entry point: runs an interactive console demo against an in-memory local
//! backend. The presentation shell talks to `smartmark-rpc` instead.

use std::sync::Arc;
use std::time::Duration;

use smartmark::app::App;
use smartmark::database::connection::Database;
use smartmark::services::bookmark_input::normalize_url;
use smartmark::services::logging::init_logging;
use smartmark::types::config::SmartMarkConfig;

#[tokio::main]
async fn main() {
    let config = SmartMarkConfig::default();
    let _log_guard = init_logging(&config.logging);

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                SmartMark v{} — Demo Mode                 ║", env!("CARGO_PKG_VERSION"));
    println!("║        Per-user bookmarks, synchronized with the store       ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    demo_config(&config);
    demo_url_input();
    demo_sync(config).await;

    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!("  ✅ All components demonstrated successfully!");
    println!("═══════════════════════════════════════════════════════════════");
}

fn section(name: &str) {
    println!("───────────────────────────────────────────────────────────────");
    println!("  📦 {}", name);
    println!("───────────────────────────────────────────────────────────────");
}

fn demo_config(config: &SmartMarkConfig) {
    section("Configuration");
    println!("  Backend: {:?}", config.backend.kind);
    println!("  Local user: {}", config.local.user_id);
    println!("  Realtime channel: {}", config.realtime.channel);
    println!("  Log level: {}", config.logging.level);
    println!("  ✓ Config defaults OK");
    println!();
}

fn demo_url_input() {
    section("URL Input");
    for raw in ["github.com", "  http://example.com/a?b=1  ", "ftp://files.example.org", "", "https://"] {
        match normalize_url(raw) {
            Ok(url) => println!("  {:<32} → {}", format!("{:?}", raw), url),
            Err(kind) => println!("  {:<32} ✗ {}", format!("{:?}", raw), kind),
        }
    }
    println!("  ✓ URL normalization OK");
    println!();
}

async fn demo_sync(config: SmartMarkConfig) {
    section("Synchronization Controller");

    let db = Arc::new(Database::open_in_memory().expect("Failed to open database"));
    let app = App::local(config, db);
    app.startup().await;
    println!("  Activated for {:?}", app.current_user().await.map(|p| p.id));

    let controller = &app.controller;
    controller.submit_input("github.com", "GitHub", "dev, code").await;
    controller.submit_input("docs.rs", "Docs.rs", "rust, docs").await;
    controller.submit_input("https://www.rust-lang.org", "", "rust").await;
    // Let the change notifications settle into a refresh.
    tokio::time::sleep(Duration::from_millis(50)).await;

    for b in controller.bookmarks() {
        println!("  • {:<12} {:<28} [{}]", b.title, b.url, b.tags.join(", "));
    }

    controller.submit_input("not a url", "Broken", "").await;
    println!("  Invalid input → last error: {:?}", controller.last_error());
    controller.clear_error();

    controller.set_search_term("RUST");
    let titles: Vec<String> = controller.filtered().into_iter().map(|b| b.title).collect();
    println!("  Search \"RUST\" → {:?}", titles);
    controller.set_search_term("");

    if let Some(first) = controller.bookmarks().first() {
        controller.request_delete(&first.id);
        let deleted = controller.confirm_delete().await;
        println!("  Deleted {:?}: {}", first.title, deleted);
    }
    println!("  Remaining: {}", controller.snapshot().total);

    app.sign_out().await.expect("local sign-out cannot fail");
    println!("  After sign-out: {} bookmarks visible", controller.snapshot().total);

    app.shutdown();
    println!("  ✓ SyncController OK");
    println!();
}
