use anyhow::Result;
use clap::{Parser, Subcommand};
use mik_rekordbox_sync::mik::RESET_PHRASE;
use mik_rekordbox_sync::sync::check;
use mik_rekordbox_sync::tags::LoftyTagReader;
use mik_rekordbox_sync::{
    EnergyColorMap, MikDatabase, MikToXml, RekordboxXml, RemovalDeleter, ResetConfirmation,
    SyncConfig, SyncError, TagSync, XmlToMik,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "mik-rekordbox-sync")]
#[command(about = "Sync keys, colors and playlists between Rekordbox XML and Mixed In Key", long_about = None)]
struct Args {
    /// Path to the Rekordbox XML library export
    #[arg(short = 'x', long, global = true, default_value = "~/rekordbox.xml")]
    xml: String,

    /// Path to the Mixed In Key database
    #[arg(
        short = 'd',
        long,
        global = true,
        default_value = "~/Library/Application Support/Mixedinkey/MIKStore.db"
    )]
    db: String,

    /// TOML table mapping energy levels to Rekordbox colors
    #[arg(short = 'e', long, global = true, default_value = "~/.config/mik-rekordbox-sync/energy.toml")]
    energy_colors: String,

    /// Top-level XML folder holding this tool's playlists
    #[arg(short = 'm', long, global = true, default_value = "MIK")]
    management_folder: String,

    /// Playlist never mirrored into Mixed In Key (can be specified multiple times)
    #[arg(long = "skip-playlist", global = true)]
    skip_playlists: Vec<String>,

    /// Report what would change without writing, backing up or deleting anything
    #[arg(short = 'n', long, global = true)]
    dry_run: bool,

    /// Verbose logging
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Copy keys and energy colors from Mixed In Key comments into the XML
    FixTags,

    /// Mirror the XML playlist tree into Mixed In Key
    ToMik {
        /// Delete every non-system Mixed In Key collection first (asks for confirmation)
        #[arg(long)]
        reset: bool,
    },

    /// Mirror a top-level Mixed In Key folder into the XML
    FromMik {
        /// Name of the top-level Mixed In Key folder
        folder: String,
    },

    /// Delete the audio files of tracks in the removal playlist
    DeleteRemoved,

    /// Report count mismatches and store sizes without changing anything
    Check,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<SyncError>() {
                Some(abort) => eprintln!("Aborted: {abort}"),
                None => eprintln!("Error: {err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    // Expand ~ in paths
    let xml_path = expand(&args.xml);
    let db_path = expand(&args.db);

    let config = SyncConfig::new()
        .with_management_folder(args.management_folder.clone())
        .with_skip_playlists(args.skip_playlists.clone())
        .with_dry_run(args.dry_run);
    if config.dry_run {
        log::info!("Dry run: nothing will be written or deleted");
    }

    match args.command {
        Command::FixTags => {
            let colors = EnergyColorMap::load(&expand(&args.energy_colors))?;
            log::info!("Loaded {} energy colors", colors.len());
            let mut doc = RekordboxXml::load(&xml_path)?;
            log::info!("Library loaded: {} tracks", doc.track_count());

            let report = TagSync::new(config, colors, LoftyTagReader::new()).run(&mut doc)?;
            println!("{report}");
        }
        Command::ToMik { reset } => {
            let doc = RekordboxXml::load(&xml_path)?;
            let db = MikDatabase::open(&db_path)?;
            let confirmation = if asks_for_reset(reset, config.dry_run) {
                Some(confirm_reset()?)
            } else {
                if reset {
                    log::info!("Dry run: not resetting the Mixed In Key database");
                }
                None
            };

            let report = XmlToMik::new(config).run(&doc, &db, confirmation)?;
            println!("{report}");
        }
        Command::FromMik { folder } => {
            let mut doc = RekordboxXml::load(&xml_path)?;
            let db = MikDatabase::open(&db_path)?;

            let report = MikToXml::new(config).run(&db, &mut doc, &folder)?;
            println!("{report}");
        }
        Command::DeleteRemoved => {
            let doc = RekordboxXml::load(&xml_path)?;
            let report = RemovalDeleter::new(config).run(&doc)?;
            println!("{report}");
        }
        Command::Check => {
            let doc = RekordboxXml::load(&xml_path)?;
            let db = if db_path.exists() {
                Some(MikDatabase::open(&db_path)?)
            } else {
                log::warn!("No Mixed In Key database at {:?}, checking the XML only", db_path);
                None
            };
            let report = check(&doc, db.as_ref())?;
            println!("{report}");
        }
    }
    Ok(())
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

/// A dry run never resets, so it never asks
fn asks_for_reset(reset: bool, dry_run: bool) -> bool {
    reset && !dry_run
}

/// Ask the operator to type the reset phrase
fn confirm_reset() -> Result<ResetConfirmation> {
    eprint!(
        "This deletes every non-system collection in the Mixed In Key database.\nType {RESET_PHRASE} to continue: "
    );
    io::stderr().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(ResetConfirmation::from_operator_input(&answer)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dry_run_reset_skips_the_prompt() {
        let args = Args::parse_from(["mik-rekordbox-sync", "--dry-run", "to-mik", "--reset"]);
        let Command::ToMik { reset } = args.command else {
            panic!("expected to-mik");
        };
        assert!(reset);
        assert!(!asks_for_reset(reset, args.dry_run));
        assert!(asks_for_reset(true, false));
        assert!(!asks_for_reset(false, false));
    }
}
