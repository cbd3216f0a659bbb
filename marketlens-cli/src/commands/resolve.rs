//! `marketlens resolve`: one market resolution against a JSON fixture.

use clap::{Args, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use marketlens::config::ConfigFile;
use marketlens::coord::Coordinate;
use marketlens::logging::init_logging;
use marketlens::map::{entity_collection, radius_collection};
use marketlens::market::{MarketRequest, MarketResolutionService, ResolveOutcome};
use marketlens::model::{MarketEntity, MarketFilter, MarketView, Tag, TagScope};
use marketlens::store::{Fixture, InMemoryStore};

use crate::error::CliError;

/// How the resolved market is printed.
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq)]
pub enum OutputFormat {
    /// Summary header and a table, nearest first
    #[default]
    Table,
    /// The full market view as JSON
    Json,
    /// Radius polygon and entity points as two GeoJSON feature collections
    Geojson,
}

#[derive(Debug, Args)]
pub struct ResolveArgs {
    /// Center latitude in decimal degrees
    #[arg(long, allow_negative_numbers = true)]
    lat: f64,

    /// Center longitude in decimal degrees
    #[arg(long, allow_negative_numbers = true)]
    lon: f64,

    /// Radius in miles (default: [market] default_radius_miles)
    #[arg(long)]
    radius: Option<f64>,

    /// JSON fixture with organizations, identifiers and tags
    #[arg(long)]
    fixture: PathBuf,

    /// Tag scope: `market:<id>` for a saved market, otherwise a session id
    #[arg(long, default_value = "session:cli")]
    scope: String,

    /// Organization the market is centered on (excluded from map points)
    #[arg(long)]
    anchor: Option<String>,

    /// Apply a tag after resolving, as ENTITY=TAG (repeatable; TAG "none" clears)
    #[arg(long = "set-tag", value_name = "ENTITY=TAG")]
    set_tags: Vec<String>,

    /// Only show entities whose name, id, network or city contains this text
    #[arg(long)]
    search: Option<String>,

    /// Only show entities of this organization type
    #[arg(long = "type")]
    org_type: Option<String>,

    /// Only show entities with this tag
    #[arg(long)]
    tag: Option<String>,

    #[arg(long, value_enum, default_value_t)]
    format: OutputFormat,
}

pub fn run(args: ResolveArgs, config_path: &Path) -> Result<(), CliError> {
    let config = ConfigFile::load_from(config_path)?;

    let _logging = init_logging(&config.logging.file)
        .map_err(|e| CliError::LoggingInit(e.to_string()))?;

    let center = Coordinate::new(args.lat, args.lon)
        .map_err(|e| CliError::InvalidArgument(e.to_string()))?;
    let scope = parse_scope(&args.scope)?;
    let tag_updates = args
        .set_tags
        .iter()
        .map(|s| parse_tag_update(s))
        .collect::<Result<Vec<_>, _>>()?;

    let fixture = Fixture::from_json_file(&args.fixture).map_err(CliError::Fixture)?;
    info!(
        fixture = %args.fixture.display(),
        organizations = fixture.organizations.len(),
        "Loaded fixture"
    );

    let market_config = config.market_config();
    let radius = args.radius.unwrap_or(market_config.default_radius_miles);
    let mut request = MarketRequest::new(center, radius, scope);
    if let Some(anchor) = args.anchor {
        request = request.with_anchor(anchor);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    let store = Arc::new(InMemoryStore::from_fixture(fixture));
    let service = MarketResolutionService::from_store(store, market_config);

    let view = runtime.block_on(async {
        let outcome = service.resolve(request).await?;
        for (entity_id, tag) in tag_updates {
            service.apply_tag(&entity_id, tag).await?;
        }
        Ok::<_, CliError>(match outcome {
            ResolveOutcome::Published(_) => service.current(),
            ResolveOutcome::Superseded => None,
        })
    })?;

    let view = view.ok_or_else(|| CliError::Output("resolution was superseded".to_string()))?;

    let filter = MarketFilter {
        search: args.search,
        org_type: args.org_type,
        tag: args.tag.as_deref().map(Tag::parse),
    };

    match args.format {
        OutputFormat::Table => print_table(&view, &filter),
        OutputFormat::Json => print_json(&view)?,
        OutputFormat::Geojson => print_geojson(&view, config.map.polygon_points)?,
    }

    Ok(())
}

/// `market:<id>` → saved market scope, `session:<id>` or a bare id → session.
fn parse_scope(value: &str) -> Result<TagScope, CliError> {
    let (kind, id) = value.split_once(':').unwrap_or(("session", value));
    let id = id.trim();
    if id.is_empty() {
        return Err(CliError::InvalidArgument(format!(
            "scope '{}' has an empty id",
            value
        )));
    }

    match kind {
        "market" => Ok(TagScope::SavedMarket(id.to_string())),
        "session" => Ok(TagScope::Session(id.to_string())),
        other => Err(CliError::InvalidArgument(format!(
            "unknown scope kind '{}' (expected 'market' or 'session')",
            other
        ))),
    }
}

fn parse_tag_update(value: &str) -> Result<(String, Tag), CliError> {
    match value.split_once('=') {
        Some((entity, tag)) if !entity.trim().is_empty() => {
            Ok((entity.trim().to_string(), Tag::parse(tag)))
        }
        _ => Err(CliError::InvalidArgument(format!(
            "--set-tag expects ENTITY=TAG, got '{}'",
            value
        ))),
    }
}

fn print_table(view: &MarketView, filter: &MarketFilter) {
    let summary = view.summary();

    println!(
        "Market: {:.4}, {:.4} within {} mi ({})",
        view.center.latitude, view.center.longitude, view.radius_miles, view.scope
    );
    println!(
        "  Organizations: {}  Partners: {}  Competitors: {}  Other tags: {}  With identifiers: {}",
        summary.total,
        summary.partners,
        summary.competitors,
        summary.custom_tagged,
        summary.with_identifiers
    );
    if !summary.by_type.is_empty() {
        let by_type = summary
            .by_type
            .iter()
            .map(|(t, n)| format!("{} {}", if t.is_empty() { "(untyped)" } else { t }, n))
            .collect::<Vec<_>>()
            .join(", ");
        println!("  By type: {}", by_type);
    }
    for issue in &view.issues {
        println!("  ! {}", issue);
    }
    println!();

    let rows = view.filtered(filter);
    if rows.is_empty() {
        if view.is_empty() {
            println!("No organizations within {} mi.", view.radius_miles);
        } else {
            println!("No organizations match the filter.");
        }
        return;
    }

    println!(
        "{:>4}  {:<12}  {:<32}  {:<16}  {:>8}  {:<12}  IDENTIFIERS",
        "#", "ID", "NAME", "TYPE", "MILES", "TAG"
    );
    for (rank, entity) in rows.iter().enumerate() {
        print_row(rank + 1, entity);
    }

    if !filter.is_empty() {
        println!();
        println!("Showing {} of {}", rows.len(), view.len());
    }
}

fn print_row(rank: usize, entity: &MarketEntity) {
    let identifiers = if entity.external_identifiers.is_empty() {
        "-".to_string()
    } else {
        entity.external_identifiers.join(",")
    };
    let tag = if entity.tag.is_none() {
        "-"
    } else {
        entity.tag.as_str()
    };

    println!(
        "{:>4}  {:<12}  {:<32}  {:<16}  {:>8.2}  {:<12}  {}",
        rank,
        truncate(entity.id(), 12),
        truncate(entity.name(), 32),
        truncate(&entity.organization.org_type, 16),
        entity.distance_miles,
        tag,
        identifiers
    );
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    let mut out: String = value.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

fn print_json(view: &MarketView) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(view).map_err(|e| CliError::Output(e.to_string()))?;
    println!("{}", json);
    Ok(())
}

fn print_geojson(view: &MarketView, polygon_points: usize) -> Result<(), CliError> {
    let layers = serde_json::json!({
        "radius": radius_collection(view, polygon_points),
        "entities": entity_collection(view),
    });
    let json =
        serde_json::to_string_pretty(&layers).map_err(|e| CliError::Output(e.to_string()))?;
    println!("{}", json);
    Ok(())
}
