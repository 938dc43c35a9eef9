//! trailfinder - postcode lookup and nearby-trail search
//!
//! Commands:
//!   preprocess   Build the postcode lookup files from a national CSV
//!   lookup       Resolve a postcode
//!   near         Trails near a postcode
//!   nearby       Trails near another trail
//!   annotate     Attach the nearest postcode to every trail start

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use trailfinder::district::{annotate, DistrictIndex};
use trailfinder::search::Ranked;
use trailfinder::{
    hikes_near_postcode, nearby_hikes, preprocess, Config, Error, Hike, HikeStore, PostcodeDb,
    PostcodeLookup, SearchParams,
};

/// Exit codes by error category
const EXIT_NOT_FOUND: i32 = 2;
const EXIT_INVALID_INPUT: i32 = 64;
const EXIT_FAILURE: i32 = 1;

#[derive(Parser)]
#[command(name = "trailfinder", version, about = "Postcode lookup and nearby-trail search")]
struct Cli {
    /// INI config file ([data] and [search] sections)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data root used when no config file is given
    #[arg(long, global = true, default_value = "data")]
    data_dir: PathBuf,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build per-code and per-district files from a postcode CSV
    Preprocess {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        by_code: Option<PathBuf>,
        #[arg(long)]
        by_district: Option<PathBuf>,
    },
    /// Resolve a postcode to its record
    Lookup { postcode: String },
    /// Trails near a postcode
    Near {
        postcode: String,
        #[arg(long, allow_hyphen_values = true)]
        radius: Option<String>,
        #[arg(long, allow_hyphen_values = true)]
        limit: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Trails near another trail's start
    Nearby {
        slug: String,
        #[arg(long, allow_hyphen_values = true)]
        radius: Option<String>,
        #[arg(long, allow_hyphen_values = true)]
        limit: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Record the nearest postcode on every trail start
    Annotate,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn exit_code(err: &Error) -> i32 {
    match err {
        Error::NotFound(_) => EXIT_NOT_FOUND,
        Error::InvalidInput(_) => EXIT_INVALID_INPUT,
        _ => EXIT_FAILURE,
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => match Config::load(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to load config {}: {e}", path.display());
                process::exit(EXIT_FAILURE);
            }
        },
        None => Config::from_data_dir(&cli.data_dir),
    };

    let result = match cli.command {
        Command::Preprocess {
            input,
            by_code,
            by_district,
        } => cmd_preprocess(&config, input, by_code, by_district),
        Command::Lookup { postcode } => cmd_lookup(&config, &postcode),
        Command::Near {
            postcode,
            radius,
            limit,
            json,
        } => cmd_near(&config, &postcode, radius.as_deref(), limit.as_deref(), json),
        Command::Nearby {
            slug,
            radius,
            limit,
            json,
        } => cmd_nearby(&config, &slug, radius.as_deref(), limit.as_deref(), json),
        Command::Annotate => cmd_annotate(&config),
    };

    if let Err(e) = result {
        let code = e
            .downcast_ref::<Error>()
            .map(exit_code)
            .unwrap_or(EXIT_FAILURE);
        eprintln!("{e:#}");
        process::exit(code);
    }
}

fn cmd_preprocess(
    config: &Config,
    input: PathBuf,
    by_code: Option<PathBuf>,
    by_district: Option<PathBuf>,
) -> anyhow::Result<()> {
    let by_code = by_code.unwrap_or_else(|| config.postcodes_by_code.clone());
    let by_district = by_district.unwrap_or_else(|| config.postcodes_by_district.clone());

    let summary = preprocess::run(&input, &by_code, &by_district)?;

    println!("Rows read:            {}", summary.total_rows);
    println!("Records written:      {}", summary.written);
    println!("Skipped (postcode):   {}", summary.skipped_no_postcode);
    println!("Skipped (coords):     {}", summary.skipped_no_coords);
    println!("District files:       {}", summary.districts);
    if !summary.is_balanced() {
        anyhow::bail!("row counts do not add up");
    }
    Ok(())
}

fn cmd_lookup(config: &Config, raw: &str) -> anyhow::Result<()> {
    let db = PostcodeDb::open(&config.postcodes_by_code);
    let record = db.resolve(raw)?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

fn load_hikes(config: &Config) -> anyhow::Result<Vec<Hike>> {
    let corpus = HikeStore::open(&config.hikes_dir).load_all()?;
    if corpus.malformed > 0 {
        warn!(malformed = corpus.malformed, "some hike files could not be read");
    }
    Ok(corpus.hikes)
}

fn print_ranked(results: &[Ranked<'_, Hike>]) {
    if results.is_empty() {
        println!("No trails within range.");
        return;
    }
    for r in results {
        let h = r.candidate;
        println!(
            "{:>8.2} km  {:<40} {} ({:.1} km, {:?})",
            r.distance_km, h.name, h.region, h.distance_km, h.difficulty
        );
    }
}

fn cmd_near(
    config: &Config,
    postcode: &str,
    radius: Option<&str>,
    limit: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let params = SearchParams::from_query(radius, limit, &config.search_defaults()?)?;
    let db = PostcodeDb::open(&config.postcodes_by_code);
    let hikes = load_hikes(config)?;

    let found = hikes_near_postcode(&db, postcode, &hikes, &params)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&found)?);
        return Ok(());
    }

    println!(
        "{} -> {:.4}, {:.4} (within {} km)\n",
        found.postcode.code,
        found.postcode.latitude,
        found.postcode.longitude,
        params.max_distance_km()
    );
    print_ranked(&found.results);
    Ok(())
}

fn cmd_nearby(
    config: &Config,
    slug: &str,
    radius: Option<&str>,
    limit: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let params = SearchParams::from_query(radius, limit, &config.search_defaults()?)?;
    let hikes = load_hikes(config)?;

    let results = nearby_hikes(slug, &hikes, &params)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    println!("Trails near {slug} (within {} km)\n", params.max_distance_km());
    print_ranked(&results);
    Ok(())
}

fn cmd_annotate(config: &Config) -> anyhow::Result<()> {
    let store = HikeStore::open(&config.hikes_dir);
    let index = DistrictIndex::load_all(&config.postcodes_by_district)?;
    if index.malformed > 0 {
        warn!(malformed = index.malformed, "some district files could not be read");
    }
    let postcodes: Vec<_> = index.postcodes().cloned().collect();

    let summary = annotate(&store, &postcodes, config.nearest_postcode_radius_km)?;

    println!("Trails loaded:        {}", summary.loaded);
    println!("Unreadable files:     {}", summary.malformed);
    println!("Annotated:            {}", summary.annotated);
    println!(
        "No postcode in {} km: {}",
        config.nearest_postcode_radius_km, summary.unmatched
    );
    println!("Save failures:        {}", summary.failed);
    if summary.failed > 0 {
        anyhow::bail!("{} annotated trails could not be saved", summary.failed);
    }
    Ok(())
}
