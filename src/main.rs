#![forbid(unsafe_code)]

mod background;
mod clipboard;
mod constants;
mod content;
mod engine;
mod extract;
mod host;
mod messenger;
mod page;
mod rules;
mod settings;
mod view;

use std::io;
use std::path::PathBuf;
use std::thread;
use std::time::Instant;

use clap::Parser;
use serde_json::{Map, json};
use tracing::{Level as TraceLevel, info};
use tracing_subscriber::FmtSubscriber;

use background::InstallReason;
use clipboard::{ClipboardSink, MemoryClipboard, SystemClipboard};
use engine::Viewport;
use host::ExtensionHost;
use messenger::PageId;
use page::PageDocument;
use settings::keys;
use settings::store::SettingsStore;
use view::{Renderer, TextRenderer};

/// Walk a sample browsing session against the ToC engine and print the
/// rendered sidebar after each step.
#[derive(Parser, Debug)]
#[command(name = "pagetoc", about = "Live table-of-contents engine demo")]
struct Args {
    /// Hostname reported by the demo page
    #[arg(long, default_value = "docs.example.com")]
    hostname: String,

    /// Settings file to use instead of the default config-dir location
    #[arg(long)]
    settings_file: Option<PathBuf>,

    /// Keep settings in memory only
    #[arg(long)]
    ephemeral: bool,

    /// Capture clipboard copies in memory instead of the system clipboard
    #[arg(long)]
    no_clipboard: bool,
}

fn sample_page() -> PageDocument {
    let mut page = PageDocument::new();
    page.append_at(PageDocument::ROOT, "h1", "Getting Started", 0.0);
    page.append_at(PageDocument::ROOT, "h2", "Introduction", 300.0);
    page.append_at(PageDocument::ROOT, "h2", "Installation", 700.0);
    page.append_at(PageDocument::ROOT, "h3", "From source", 1000.0);
    page.append_at(PageDocument::ROOT, "h2", "Configuration", 1400.0);
    page
}

fn print_sidebar(host: &ExtensionHost, id: PageId) {
    if let Some(view) = host.last_view(id) {
        TextRenderer::new(io::stdout().lock()).render(view);
    }
    for notice in host.notices(id) {
        println!("[notice] {}", notice.text);
    }
}

/// Sleep until each pending deadline and fire it, until nothing is left.
fn drain_deadlines(host: &mut ExtensionHost) {
    while let Some(deadline) = host.next_deadline() {
        let now = Instant::now();
        if deadline > now {
            thread::sleep(deadline - now);
        }
        host.tick(Instant::now());
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse log level from environment variable
    let log_level = match std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let store = if args.ephemeral {
        SettingsStore::ephemeral()
    } else if let Some(path) = args.settings_file.clone() {
        SettingsStore::open(path)
    } else {
        SettingsStore::open_default()
    };

    let memory_clipboard = MemoryClipboard::new();
    let copies = memory_clipboard.log_handle();
    let clipboard: Box<dyn ClipboardSink> = if args.no_clipboard {
        Box::new(memory_clipboard)
    } else {
        Box::new(SystemClipboard)
    };

    let mut host = ExtensionHost::new(store, clipboard);
    host.install(InstallReason::Install, Instant::now());
    let levels: Vec<&str> = host
        .settings()
        .heading_levels
        .iter()
        .map(|level| level.tag())
        .collect();
    info!(levels = ?levels, "enabled heading levels");

    let page = host.open_page(&args.hostname, sample_page(), true, Instant::now());
    info!("action icon clicked");
    host.click_icon(page, Instant::now());
    print_sidebar(&host, page);

    info!("page rewrites part of its content; the burst collapses into one re-scan");
    host.mutate_page(page, Instant::now(), |doc| {
        let extra = doc.append(PageDocument::ROOT, "h2", "Troubleshooting");
        doc.set_text(extra, "Troubleshooting & FAQ");
    });
    host.mutate_page(page, Instant::now(), |doc| {
        doc.append(PageDocument::ROOT, "h2", "License");
    });
    host.mutate_page(page, Instant::now(), |doc| {
        if let Some(node) = doc.find_by_id("heading-3") {
            doc.remove(node);
        }
    });
    drain_deadlines(&mut host);
    print_sidebar(&host, page);

    info!("scrolling moves the highlight");
    host.scroll_page(page, Viewport::new(600.0, 1000.0), Instant::now());
    print_sidebar(&host, page);

    info!("search filters the view without re-scanning");
    host.search(page, "in", Instant::now());
    print_sidebar(&host, page);
    host.search(page, "", Instant::now());

    info!("clicking an entry scrolls to its anchor");
    host.activate_entry(page, "heading-2", Instant::now());

    info!("the panel resizes within bounds, and close keeps the view state");
    host.resize_panel(page, 520, Instant::now());
    host.press_close(page, Instant::now());
    host.click_icon(page, Instant::now());
    print_sidebar(&host, page);

    info!("a second page observes the theme written from the first");
    let other = host.open_page("wiki.example.org", sample_page(), true, Instant::now());
    host.page_request(other, &json!({"action": "toggleSidebar"}), Instant::now());
    host.press_theme_toggle(page, Instant::now());
    print_sidebar(&host, other);

    info!("the sidebar settings control reaches the background");
    host.press_open_settings(page, Instant::now());
    info!(open = host.settings_surface_open(), "settings surface state");

    info!("markdown export");
    host.press_copy_markdown(page, Instant::now());
    if args.no_clipboard {
        for copy in copies.borrow().iter() {
            println!("{copy}");
        }
    }

    info!("a disable rule gates the toggle after navigation");
    host.write_settings(
        Map::from_iter([(
            keys::DOMAIN_RULES.to_string(),
            json!([{"domain": "blocked.example.net", "action": "disable"}]),
        )]),
        Instant::now(),
    )?;
    host.soft_navigate(other, "blocked.example.net", sample_page());
    host.click_icon(other, Instant::now());
    print_sidebar(&host, other);

    info!("a page whose content script never loads ends in a notice");
    let slow = host.open_page("slow.example.net", PageDocument::new(), false, Instant::now());
    host.click_icon(slow, Instant::now());
    while host.notices(slow).is_empty() {
        let Some(deadline) = host.next_deadline() else {
            break;
        };
        let now = Instant::now();
        if deadline > now {
            thread::sleep(deadline - now);
        }
        host.tick(Instant::now());
    }
    print_sidebar(&host, slow);

    info!("once the content script loads, the same toggle goes through");
    host.mark_ready(slow, Instant::now());
    host.click_icon(slow, Instant::now());
    print_sidebar(&host, slow);

    Ok(())
}
