#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the civic map engine.
//!
//! Runs the engine headless against a live backend, drawing onto a
//! [`RecordingSurface`], and prints what the map would show.

mod filters;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use civic_map_api::{ComplaintBackend, HttpBackend};
use civic_map_map::{EngineConfig, MapOrchestrator};
use civic_map_render::{MarkerItem, Overlay, RecordingSurface};
use civic_map_territory_models::{RegionSelection, TerritoryLevel};
use clap::{Parser, Subcommand};

use crate::filters::{FilterArgs, parse_bbox};

type Engine = MapOrchestrator<dyn ComplaintBackend, RecordingSurface>;

#[derive(Parser)]
#[command(name = "civic_map_cli", about = "Civic complaint map engine")]
struct Cli {
    /// Engine config file (TOML). Defaults apply when it does not exist.
    #[arg(long, global = true, default_value = "civic_map.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch complaints and print statistics, visible count and markers
    Summary {
        #[command(flatten)]
        filters: FilterArgs,
        /// Viewport as `west,south,east,north`
        #[arg(long, value_parser = parse_bbox)]
        bbox: Option<civic_map_complaint_models::BoundingBox>,
        /// Viewport zoom level
        #[arg(long, default_value = "11")]
        zoom: f64,
    },
    /// Print heatmap weights (server heatmap, or local fallback)
    Heatmap {
        #[command(flatten)]
        filters: FilterArgs,
        /// Maximum number of points to print
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// List the territories of one level
    Territories {
        /// `fine` or `coarse`
        #[arg(long, default_value = "fine")]
        level: TerritoryLevel,
        /// Print the bounds of this territory (id for fine, name for coarse)
        #[arg(long)]
        select: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let mut config = EngineConfig::load(&cli.config)?;

    match cli.command {
        Commands::Summary {
            filters,
            bbox,
            zoom,
        } => {
            config.initial_filters = filters.merge_into(config.initial_filters);
            let engine = build_engine(config)?;
            engine.initialize().await;
            let bounds = bbox.unwrap_or_else(|| engine.viewport().bounds);
            let visible = engine.on_viewport_change(bounds, zoom);
            print_summary(&engine, visible);
        }
        Commands::Heatmap { filters, limit } => {
            config.initial_filters = filters.merge_into(config.initial_filters);
            let engine = build_engine(config)?;
            engine.refresh().await;
            let params = engine.filters().to_api_params();
            let weights = engine.complaint_store().fetch_heatmap(&params).await;
            println!("{} heatmap points", weights.len());
            println!("{:>10} {:>10} {:>9}", "LAT", "LNG", "INTENSITY");
            for point in weights.iter().take(limit) {
                let [lat, lng, intensity] = point.as_triple();
                println!("{lat:>10.5} {lng:>10.5} {intensity:>9.2}");
            }
            report_error(&engine);
        }
        Commands::Territories { level, select } => {
            let engine = build_engine(config)?;
            let store = engine.territory_store();
            let territories = store.load(level).await?;

            println!("{:<12} {:<28} {:<20} POLYGONS", "ID", "NAME", "PARENT");
            println!("{}", "-".repeat(72));
            for t in territories.iter() {
                println!(
                    "{:<12} {:<28} {:<20} {}",
                    t.id,
                    t.name,
                    t.parent_name.as_deref().unwrap_or("-"),
                    t.boundary.0.len()
                );
            }

            if let Some(key) = select {
                let selection = match level {
                    TerritoryLevel::Fine => RegionSelection::Fine(key),
                    TerritoryLevel::Coarse => RegionSelection::Coarse(key),
                };
                match (
                    store.bounds_of_selection(&selection),
                    store.full_bounds_of_selection(&selection),
                ) {
                    (Some(first), Some(full)) => {
                        println!();
                        println!("First-ring bounds: {first:?}");
                        println!("Full bounds:       {full:?}");
                    }
                    _ => return Err(format!("No {level} territory {selection:?}").into()),
                }
            }
        }
    }

    Ok(())
}

fn build_engine(config: EngineConfig) -> Result<Engine, Box<dyn std::error::Error>> {
    let backend: Arc<dyn ComplaintBackend> = Arc::new(HttpBackend::new(config.backend.clone())?);
    log::info!("Using backend {} ({})", config.backend.base_url, config.backend.city);
    Ok(MapOrchestrator::new(backend, RecordingSurface::new(), config))
}

fn print_summary(engine: &Engine, visible: usize) {
    let filters = engine.filters();
    let stats = engine.stats();

    println!("Active filter groups: {}", filters.active_filter_count());
    println!("Query: {}", filters.to_api_params());
    println!();
    println!("Total complaints: {}", stats.total);
    print_counts("Category", &stats.by_category);
    print_counts("Status", &stats.by_status);
    println!();
    println!("In view:            {visible}");
    println!("After refinement:   {}", engine.refined_complaints().len());

    let (markers, clusters) = engine.with_surface(|surface| {
        surface
            .overlays()
            .filter_map(|(_, overlay)| match overlay {
                Overlay::Markers(items) => Some(items),
                _ => None,
            })
            .flatten()
            .fold((0, 0), |(m, c), item| match item {
                MarkerItem::Marker(_) => (m + 1, c),
                MarkerItem::Cluster { .. } => (m, c + 1),
            })
    });
    println!("Markers drawn:      {markers} ({clusters} clusters)");

    if let Some(legend) = engine.legend() {
        println!();
        println!("Legend:");
        for entry in legend {
            println!("  {} {:<14} {}", entry.style.glyph, entry.category, entry.style.color);
        }
    }
    report_error(engine);
}

fn print_counts(label: &str, counts: &BTreeMap<String, u64>) {
    println!("By {}:", label.to_lowercase());
    for (key, count) in counts {
        println!("  {key:<20} {count:>6}");
    }
}

fn report_error(engine: &Engine) {
    if let Some(banner) = engine.error_banner() {
        let hint = if banner.retryable { " (retry may help)" } else { "" };
        log::error!("{}{hint}", banner.message);
    }
}
