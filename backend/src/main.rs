//! crmload CLI - convert lead lists into CRM import files
//!
//! # Main Commands
//!
//! ```bash
//! crmload process leads.csv --profile probate.json   # Write properties/contacts/phones files
//! crmload process leads.csv                          # Pick the best stored profile
//! crmload inspect leads.csv                          # Show detected format + matching profiles
//! crmload profile list                               # Manage stored profiles
//! ```
//!
//! # Reference Commands
//!
//! ```bash
//! crmload example-profile          # Print an example profile
//! crmload transforms               # Show available value transforms
//! ```

use clap::{Parser, Subcommand};
use crmload::logs::{log_info, log_success, log_warning};
use crmload::output::OUTPUT_DIR_ENV;
use crmload::parser::format_delimiter;
use crmload::{
    example_profile, process_cancellable, read_table, transforms_description, write_outputs, LogProgress,
    OutputFormat, OutputOptions, ProcessOptions, Profile, ProfileStore, RunHandle, RunOutcome,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Exit code for a run stopped with Ctrl-C.
const EXIT_CANCELLED: i32 = 130;

#[derive(Parser)]
#[command(name = "crmload")]
#[command(about = "Convert CSV lead lists into CRM property, contact and phone import files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a CSV file with a profile
    Process {
        /// Input CSV file
        input: PathBuf,

        /// Profile JSON file
        #[arg(short, long, conflicts_with = "profile_id")]
        profile: Option<PathBuf>,

        /// Stored profile ID (default: best match for the input headers)
        #[arg(long)]
        profile_id: Option<String>,

        /// Output directory (default: $CRMLOAD_OUTPUT_DIR or .)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Table formats, comma separated
        #[arg(short, long, value_delimiter = ',', default_value = "csv")]
        format: Vec<OutputFormat>,

        /// Replace every property and contact tag with this one
        #[arg(long)]
        tag_override: Option<String>,

        /// Write association labels on contact rows
        #[arg(long)]
        secondary_contact_labels: bool,

        /// Skip the JSON summary
        #[arg(long)]
        no_summary: bool,
    },

    /// Show detected encoding, delimiter, columns and matching profiles
    Inspect {
        /// Input CSV file
        input: PathBuf,
    },

    /// Manage stored profiles
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Print an example profile
    ExampleProfile,

    /// Show available value transforms
    Transforms,
}

#[derive(Subcommand)]
enum ProfileAction {
    /// List stored profiles
    List,

    /// Import a profile JSON file
    Import {
        /// Profile JSON file
        file: PathBuf,
        /// Name for the stored profile
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Show a stored profile
    Show {
        /// Profile ID
        id: String,
    },

    /// Delete a stored profile
    Delete {
        /// Profile ID
        id: String,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Process {
            input,
            profile,
            profile_id,
            output_dir,
            format,
            tag_override,
            secondary_contact_labels,
            no_summary,
        } => {
            let output = OutputOptions {
                output_dir: output_dir
                    .or_else(|| std::env::var(OUTPUT_DIR_ENV).ok().map(PathBuf::from))
                    .unwrap_or_else(|| PathBuf::from(".")),
                formats: format,
                write_summary: !no_summary,
            };
            let options = ProcessOptions {
                include_secondary_contacts_association_label: secondary_contact_labels,
                tag_override,
            };
            cmd_process(&input, profile.as_deref(), profile_id.as_deref(), options, output).await
        }

        Commands::Inspect { input } => cmd_inspect(&input),

        Commands::Profile { action } => cmd_profile(action),

        Commands::ExampleProfile => cmd_example_profile(),

        Commands::Transforms => cmd_transforms(),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn cmd_process(
    input: &Path,
    profile_path: Option<&Path>,
    profile_id: Option<&str>,
    options: ProcessOptions,
    output: OutputOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Processing: {}", input.display());

    let (table, info) = read_table(input)?;
    log_success(format!("Detected encoding: {}", info.encoding));
    log_success(format!("Detected separator: '{}'", format_delimiter(info.delimiter)));
    log_success(format!("Read {} rows", info.row_count));

    let mut store = ProfileStore::open();
    let (profile, stored_id) = select_profile(&store, profile_path, profile_id, table.headers())?;
    log_info(format!("Using profile: {}", profile.name));

    let handle = RunHandle::new();
    let cancel = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log_warning("Cancelling...");
            cancel.cancel();
        }
    });

    let run_handle = handle.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        process_cancellable(&profile, &table, &options, &run_handle, &LogProgress::default())
    })
    .await??;

    let result = match outcome {
        RunOutcome::Completed(result) => result,
        RunOutcome::Cancelled => {
            eprintln!("⚠️  Cancelled, no files written");
            std::process::exit(EXIT_CANCELLED);
        }
    };

    let report = match write_outputs(Arc::new(result), &output, &handle).await {
        RunOutcome::Completed(report) => report,
        RunOutcome::Cancelled => {
            eprintln!("⚠️  Cancelled, written files removed");
            std::process::exit(EXIT_CANCELLED);
        }
    };

    if let Some(id) = stored_id {
        store.mark_used(&id)?;
    }

    if !report.is_success() {
        return Err(format!("{} file(s) failed to write", report.failures.len()).into());
    }

    eprintln!("\n✨ Done! {} file(s) in {}", report.written.len(), output.output_dir.display());
    Ok(())
}

/// Profile from a file, a stored id, or the best stored match.
fn select_profile(
    store: &ProfileStore,
    path: Option<&Path>,
    id: Option<&str>,
    headers: &[String],
) -> Result<(Profile, Option<String>), Box<dyn std::error::Error>> {
    if let Some(path) = path {
        let profile = Profile::from_json(&fs::read_to_string(path)?)?;
        return Ok((profile, None));
    }

    if let Some(id) = id {
        let stored = store.get(id).ok_or_else(|| format!("Profile not found: {}", id))?;
        return Ok((stored.profile.clone(), Some(stored.id.clone())));
    }

    log_info("Looking for a compatible stored profile...");
    match store.find_compatible(headers).first() {
        Some((stored, score)) => {
            log_success(format!("Matched \"{}\" ({:.0}% of its columns)", stored.name, score * 100.0));
            Ok((stored.profile.clone(), Some(stored.id.clone())))
        }
        None => Err("No compatible stored profile; pass --profile or import one with 'crmload profile import'".into()),
    }
}

fn cmd_inspect(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("🔍 Inspecting: {}", input.display());

    let (table, info) = read_table(input)?;
    eprintln!("   Encoding: {}", info.encoding);
    eprintln!("   Delimiter: '{}'", format_delimiter(info.delimiter));
    eprintln!("   Rows: {}", info.row_count);

    eprintln!("\n📋 {} columns:", table.headers().len());
    for (i, col) in table.headers().iter().enumerate() {
        println!("  [{:2}] {}", i + 1, col);
    }

    let store = ProfileStore::open();
    let compatible = store.find_compatible(table.headers());
    if compatible.is_empty() {
        eprintln!("\n   No compatible stored profiles");
    } else {
        eprintln!("\n🗂️  Compatible profiles:");
        for (stored, score) in compatible {
            println!("  {} ({}) - {:.0}%", stored.name, stored.id, score * 100.0);
        }
    }

    Ok(())
}

fn cmd_profile(action: ProfileAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = ProfileStore::open();

    match action {
        ProfileAction::List => {
            let profiles = store.list();
            if profiles.is_empty() {
                eprintln!("📋 No profiles stored yet.");
                eprintln!("   Use 'crmload profile import <file>' to add one.");
                return Ok(());
            }

            eprintln!("📋 Stored profiles ({}):\n", profiles.len());
            for p in profiles {
                println!("  📄 {} ({})", p.name, p.id);
                println!("     Columns: {}", p.source_headers.join(", "));
                println!("     Uses: {}", p.use_count);
                if let Some(last) = p.last_used {
                    println!("     Last used: {}", last.to_rfc3339());
                }
                println!();
            }
        }

        ProfileAction::Import { file, name } => {
            eprintln!("📥 Importing profile from: {}", file.display());
            let id = store.import(&file, name.as_deref())?;
            eprintln!("✅ Profile saved with ID: {}", id);
        }

        ProfileAction::Show { id } => {
            let p = store.get(&id).ok_or_else(|| format!("Profile not found: {}", id))?;
            println!("📄 Profile: {} ({})\n", p.name, p.id);
            println!("Columns: {}", p.source_headers.join(", "));
            println!("Created: {}", p.created_at.to_rfc3339());
            println!("Uses: {}", p.use_count);
            println!("\n{}", p.profile.to_json()?);
        }

        ProfileAction::Delete { id } => {
            store.delete(&id)?;
            eprintln!("🗑️  Profile deleted: {}", id);
        }
    }

    Ok(())
}

fn cmd_example_profile() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", example_profile().to_json()?);
    Ok(())
}

fn cmd_transforms() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", transforms_description());
    Ok(())
}
