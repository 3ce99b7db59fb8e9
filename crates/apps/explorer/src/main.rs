use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use explorer::{Explorer, ExplorerConfig, Fixture};
use foundation::{GeoId, LayerId};
use plot::{POINT_FILL, POINT_OPACITY};
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Scatterplot explorer over an in-memory map")]
struct Args {
    /// Fixture describing the map: viewport, source layers and their features
    #[arg(long)]
    fixture: PathBuf,

    /// Optional JSON config; NEXUS_* environment variables override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// GEOID to hover once the plot is built
    #[arg(long)]
    hover: Option<String>,

    /// Source layer to plot when several are plottable
    #[arg(long)]
    source: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = ExplorerConfig::load(args.config.as_deref())?;
    let fixture = Fixture::load(&args.fixture)?;
    let service = Arc::new(fixture.service());

    let leave_delay = config.highlight.leave_delay();
    let mut explorer = Explorer::new(Arc::clone(&service), config);
    explorer.activate().await;

    let discovered = explorer.discover_sources().await?;
    for source in &fixture.sources {
        if !discovered.iter().any(|d| d.id == source.id) {
            warn!(source = %source.id, name = %source.name, "not a recognised geography; skipping");
            continue;
        }
        explorer
            .add_variables(&source.layer(), &source.attribute_refs())
            .await?;
    }
    if let Some(source) = &args.source {
        if !explorer.select_source(&LayerId::from(source.as_str())).await {
            warn!("source {source} is not plottable; keeping the default");
        }
    }

    let frame = explorer.frame().clone();
    if let Some(empty) = frame.empty {
        info!("{}", empty.message());
    }
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "legend": explorer.legend(),
            "frame": frame,
            "marks": { "fill": POINT_FILL, "opacity": POINT_OPACITY },
        }))?
    );

    if let Some(geoid) = args.hover {
        let geoid = GeoId::new(geoid);
        let outcome = explorer.hover_enter(geoid.clone()).await;
        info!(geoid = %geoid, ?outcome, "hover");
        if let Some(tooltip) = frame.tooltip(&geoid) {
            for line in &tooltip.lines {
                println!("{line}");
            }
        }
        let shown = explorer.variables().iter().find(|v| v.visible).cloned();
        if let Some(shown) = shown {
            if let Some(value) = shown.value(&geoid) {
                let legend = explorer.legend();
                if let Some(entry) = legend.iter().find(|e| e.id == shown.id) {
                    println!("{}: {}", shown.display_name(), entry.color_for(value));
                }
            }
        }
        explorer.hover_leave();
        tokio::time::sleep(leave_delay + Duration::from_millis(10)).await;
        info!(overlays = service.overlay_ids().len(), "after leave");
    }

    explorer.shutdown().await;
    Ok(())
}
