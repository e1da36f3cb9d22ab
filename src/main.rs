//! Stratum demo: seed a few images through the service and page over them.

use clap::Parser;
use stratum::config::AppConfig;
use stratum::context::AppContext;
use stratum::di::FromRef;
use stratum::services::{ImageService, ListImages, UploadImage};

#[derive(Parser)]
#[command(name = "stratum")]
#[command(about = "Persistence toolkit demo - seeds images and lists them")]
struct Cli {
    /// Run in verbose mode
    #[arg(short, long)]
    verbose: bool,

    /// One-based page to print
    #[arg(long, default_value_t = 1)]
    page: usize,

    /// Page size
    #[arg(long, default_value_t = 5)]
    page_size: usize,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Load configuration
    let config = AppConfig::load()?;
    tracing::info!(
        max_depth = config.repository.related_properties_max_depth,
        "configuration loaded"
    );

    let ctx = AppContext::new(config);
    let service = ImageService::from_ref(&ctx);

    // Seed a handful of images
    for (file_name, bytes) in [
        ("sunrise.png", vec![0u8; 2048]),
        ("harbor.jpg", vec![0u8; 512]),
        ("forest.png", vec![0u8; 4096]),
        ("skyline.jpg", vec![0u8; 1024]),
        ("meadow.png", vec![0u8; 256]),
        ("canyon.jpg", vec![0u8; 8192]),
    ] {
        let image = service
            .upload(UploadImage {
                file_name: file_name.to_string(),
                content_type: if file_name.ends_with(".png") {
                    "image/png".to_string()
                } else {
                    "image/jpeg".to_string()
                },
                bytes,
                alt_text: file_name.to_string(),
                description: format!("demo seed: {file_name}"),
                album_id: None,
            })
            .await?;
        tracing::info!(id = %image.id, name = %image.name, "seeded");
    }

    let page = service
        .list(ListImages {
            page_number: cli.page,
            page_size: cli.page_size,
            ..ListImages::default()
        })
        .await?;

    println!(
        "page {}/{} ({} images total)",
        page.page_index + 1,
        page.total_pages(),
        page.total_count
    );
    for image in &page.items {
        println!("{}  {:>8} bytes  {}", image.id, image.size, image.url);
    }

    Ok(())
}
