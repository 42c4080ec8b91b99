use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use geopub_core::models::{FeedKind, Source};
use geopub_core::storage::{Database, EventRepository, Repository, SourceRepository};
use geopub_core::workflow::{Actor, Contribution, PublicationRef, WorkflowService};
use geopub_core::AppConfig;
use geopub_harvest::{notifier_from_config, Harvester, HarvestSummary, OpenAlexMatcher};

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "geopub",
    about = "Harvest geoscientific publications and their spatial/temporal metadata",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format (for scripts).
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage harvesting sources.
    Source {
        #[command(subcommand)]
        action: SourceAction,
    },

    /// Run the harvesting pipeline.
    Harvest {
        /// Source to harvest, by name or id.
        source: Option<String>,

        /// Harvest every known source.
        #[arg(long, conflicts_with = "source")]
        all: bool,

        /// Harvest only sources whose interval has elapsed.
        #[arg(long, conflicts_with_all = ["source", "all"])]
        due: bool,

        /// Stop after this many records per source.
        #[arg(long)]
        max_records: Option<usize>,

        /// Notify this address when the run finishes.
        #[arg(long)]
        user_email: Option<String>,
    },

    /// Match stored publications against OpenAlex.
    BackfillOpenalex {
        #[arg(long, default_value = "100")]
        limit: usize,
    },

    /// Add geometry and/or a temporal extent to a harvested publication.
    Contribute {
        /// Publication reference: DOI or id.
        reference: String,

        /// Bare GeoJSON geometry, e.g. '{"type":"Point","coordinates":[7.6,51.9]}'.
        #[arg(long)]
        geometry_json: Option<String>,

        #[arg(long)]
        start: Option<String>,

        #[arg(long)]
        end: Option<String>,

        #[arg(long)]
        user: String,

        #[arg(long)]
        email: String,
    },

    /// Make a publication publicly visible (admin).
    Publish {
        reference: String,
        #[arg(long, default_value = "admin")]
        user: String,
        #[arg(long, default_value = "admin@localhost")]
        email: String,
    },

    /// Retract a published publication to draft (admin).
    Unpublish {
        reference: String,
        #[arg(long, default_value = "admin")]
        user: String,
        #[arg(long, default_value = "admin@localhost")]
        email: String,
    },

    /// Print one publication.
    Show { reference: String },
}

#[derive(Subcommand)]
enum SourceAction {
    /// Register a feed endpoint.
    Add {
        url: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        issn: Option<String>,
        #[arg(long)]
        collection: Option<String>,
        /// Feed format: oai-pmh or rss.
        #[arg(long, default_value = "oai-pmh")]
        feed_kind: String,
        #[arg(long)]
        interval_minutes: Option<i64>,
    },
    /// List registered sources.
    List,
    /// Show recent harvesting events for one source.
    Events { source: String },
}

// ─── Main ───────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load()?;
    let db = Database::open(&config.database_path())?;

    match cli.command {
        Commands::Source { action } => run_source(&config, &db, action, cli.json)?,

        Commands::Harvest {
            source,
            all,
            due,
            max_records,
            user_email,
        } => {
            let notifier = notifier_from_config(&config.email);
            let harvester = Harvester::new(&config, notifier)?;
            let email = user_email.as_deref();

            let results = if all {
                harvester.harvest_all(&db, max_records, email).await?
            } else if due {
                harvester.harvest_due(&db, max_records, email).await?
            } else {
                let Some(reference) = source else {
                    bail!("pass a source name/id, --all or --due");
                };
                let source = resolve_source(&db, &reference)?;
                let summary = harvester
                    .harvest_source(&db, &source, max_records, email)
                    .await?;
                vec![(source, summary)]
            };

            report_harvest(&results, cli.json)?;
        }

        Commands::BackfillOpenalex { limit } => {
            let matcher = OpenAlexMatcher::new(&config.openalex)?;
            let summary = matcher.backfill(&db, limit).await?;
            if cli.json {
                print_json(&serde_json::json!({
                    "matched": summary.matched,
                    "partial": summary.partial,
                    "unmatched": summary.unmatched,
                }))?;
            } else {
                println!(
                    "OpenAlex backfill: {} matched, {} with partial candidates, {} unmatched",
                    summary.matched, summary.partial, summary.unmatched
                );
            }
        }

        Commands::Contribute {
            reference,
            geometry_json,
            start,
            end,
            user,
            email,
        } => {
            let geometry = geometry_json
                .map(|raw| serde_json::from_str(&raw))
                .transpose()
                .context("invalid GeoJSON geometry")?;
            let contribution = Contribution {
                geometry,
                start_date: start,
                end_date: end,
            };
            let workflow = WorkflowService::new(&db);
            let publication = workflow.contribute(
                &PublicationRef::parse(&reference)?,
                contribution,
                &Actor::user(user, email),
            )?;
            print_publication(&publication, cli.json)?;
        }

        Commands::Publish {
            reference,
            user,
            email,
        } => {
            let workflow = WorkflowService::new(&db);
            let publication =
                workflow.publish(&PublicationRef::parse(&reference)?, &Actor::admin(user, email))?;
            print_publication(&publication, cli.json)?;
        }

        Commands::Unpublish {
            reference,
            user,
            email,
        } => {
            let workflow = WorkflowService::new(&db);
            let publication = workflow.unpublish(
                &PublicationRef::parse(&reference)?,
                &Actor::admin(user, email),
            )?;
            print_publication(&publication, cli.json)?;
        }

        Commands::Show { reference } => {
            use geopub_core::storage::PublicationRepository;
            let publication = match PublicationRef::parse(&reference)? {
                PublicationRef::Doi(doi) => db.publications().find_by_doi(&doi)?,
                PublicationRef::Id(id) => db.publications().find_by_id(&id)?,
            };
            match publication {
                Some(publication) => println!("{}", serde_json::to_string_pretty(&publication)?),
                None => {
                    eprintln!("Publication not found: {reference}");
                    std::process::exit(2);
                }
            }
        }
    }

    Ok(())
}

// ─── Subcommand bodies ──────────────────────────────────────────────────────

fn run_source(config: &AppConfig, db: &Database, action: SourceAction, json: bool) -> Result<()> {
    match action {
        SourceAction::Add {
            url,
            name,
            issn,
            collection,
            feed_kind,
            interval_minutes,
        } => {
            let Some(kind) = FeedKind::parse(&feed_kind) else {
                bail!("unknown feed kind: {feed_kind} (expected oai-pmh or rss)");
            };
            let mut source = Source::new(url, name);
            source.issn_l = issn;
            source.collection = collection;
            source.feed_kind = kind;
            source.harvest_interval_minutes =
                interval_minutes.unwrap_or(config.harvest.default_interval_minutes);
            db.sources().save(&source)?;
            if json {
                print_json(&serde_json::to_value(&source)?)?;
            } else {
                println!("Added source: {} ({})", source.name, source.id);
            }
        }

        SourceAction::List => {
            let sources = db.sources().list()?;
            if json {
                print_json(&serde_json::to_value(&sources)?)?;
            } else if sources.is_empty() {
                println!("No sources. Use `geopub source add` to register one.");
            } else {
                for source in &sources {
                    let last = source
                        .last_harvested_at
                        .map(|t| t.to_rfc3339())
                        .unwrap_or_else(|| "never".to_string());
                    println!(
                        "{id}  {name:<30}  {kind:<7}  last harvested: {last}",
                        id = &source.id.to_string()[..8],
                        name = source.name,
                        kind = source.feed_kind.as_str(),
                    );
                }
            }
        }

        SourceAction::Events { source } => {
            let source = resolve_source(db, &source)?;
            let events = db.events().list_for_source(&source.id)?;
            if json {
                print_json(&serde_json::to_value(&events)?)?;
            } else if events.is_empty() {
                println!("No harvesting events for {}.", source.name);
            } else {
                for event in &events {
                    println!(
                        "{}  {:<11}  {}",
                        event.started_at.to_rfc3339(),
                        event.status.as_str(),
                        event.log.as_deref().unwrap_or("")
                    );
                }
            }
        }
    }
    Ok(())
}

/// Accepts a source id or an exact source name.
fn resolve_source(db: &Database, reference: &str) -> Result<Source> {
    if let Ok(id) = uuid::Uuid::parse_str(reference) {
        if let Some(source) = db.sources().find_by_id(&id)? {
            return Ok(source);
        }
    }
    if let Some(source) = db.sources().find_by_name(reference)? {
        return Ok(source);
    }
    eprintln!("Source not found: {reference}");
    std::process::exit(2);
}

fn report_harvest(results: &[(Source, HarvestSummary)], json: bool) -> Result<()> {
    if json {
        let items: Vec<_> = results
            .iter()
            .map(|(source, summary)| {
                serde_json::json!({
                    "source": source.name,
                    "added": summary.added,
                    "spatial": summary.spatial,
                    "temporal": summary.temporal,
                })
            })
            .collect();
        print_json(&serde_json::Value::Array(items))?;
    } else if results.is_empty() {
        println!("Nothing to harvest.");
    } else {
        for (source, summary) in results {
            println!("{}: {}", source.name, summary.describe());
        }
    }
    Ok(())
}

fn print_publication(publication: &geopub_core::models::Publication, json: bool) -> Result<()> {
    if json {
        print_json(&serde_json::to_value(publication)?)?;
    } else {
        println!(
            "{}  [{}]  {}",
            publication.id,
            publication.status.label(),
            publication.title
        );
        if let Some(provenance) = &publication.provenance {
            if let Some(last) = provenance.lines().last() {
                println!("  {last}");
            }
        }
    }
    Ok(())
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}
