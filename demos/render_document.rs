//! Walk a legacy HTML article through the pipeline
//!
//! Run with `RUST_LOG=content_pipeline=debug` to see the import decisions.

use chrono::{Duration, Utc};
use content_pipeline::blocks::Block;
use content_pipeline::converter::BlockConverter;
use content_pipeline::menu::{MenuItem, filter_menu_by_role};
use content_pipeline::metrics::slugify;
use content_pipeline::save_status::SaveIndicator;
use content_pipeline::storage::{DocumentStore, MemoryBackend, NewDocument};
use tracing_subscriber::EnvFilter;

const ARTICLE: &str = r#"<h1>Release 4.2</h1>
<p>This release makes <strong>saving</strong> faster and adds image uploads.</p>
<ul><li>Auto-save every 30 seconds</li><li>Drag and drop images</li></ul>
<script>trackVisit()</script>
<section>Thanks to everyone who reported bugs.</section>"#;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Content Pipeline - Render Document ===\n");

    let converter = BlockConverter::new();

    println!("Input HTML:");
    println!("{}\n", ARTICLE);

    let mut document = converter.from_html(ARTICLE);
    println!("Blocks:");
    for block in &document.blocks {
        println!("  - {}", block.kind());
    }
    println!();

    document.blocks.push(Block::delimiter());
    println!("Rendered HTML:");
    println!("{}\n", converter.to_html(&document));

    let metrics = converter.metrics(&document);
    println!("Slug:     {}", slugify("Release 4.2"));
    println!("Excerpt:  {}", converter.generate_excerpt(&document, 40));
    println!("Reading:  {} min", metrics.reading_time);

    let mut indicator = SaveIndicator::new();
    indicator.update_from_metrics(&metrics);
    indicator.begin_save();

    let mut store = DocumentStore::new(MemoryBackend::new());
    let saved = NewDocument::blocks("Release 4.2", &document).and_then(|new| store.create(new));
    match saved {
        Ok(stored) => {
            indicator.mark_saved(Utc::now() - Duration::minutes(3));
            println!("Stored:   {}", stored.id);
        }
        Err(err) => {
            indicator.mark_failed(err.to_string());
        }
    }
    println!(
        "Status:   {} ({})\n",
        indicator.status_label(Utc::now()),
        indicator.counts_label()
    );

    let menu = vec![
        MenuItem::link("home", "Home", "/"),
        MenuItem::group(
            "admin",
            "Administration",
            vec![MenuItem::link("users", "Users", "/admin/users")],
        )
        .with_roles(&["admin"]),
    ];
    for role in ["user", "admin"] {
        let visible: Vec<String> = filter_menu_by_role(&menu, role)
            .into_iter()
            .map(|item| item.title)
            .collect();
        println!("Menu for {role}: {}", visible.join(", "));
    }
}
