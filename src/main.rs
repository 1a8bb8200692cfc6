//! `swarmkeeper` binary: a `publish` command that turns a file into a
//! tracked torrent, and a `serve` command that boots the HTTP tracker.
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use swarmkeeper::bootstrap;
use swarmkeeper::core::databases::driver;
use swarmkeeper::core::file_slicer::FileSlicer;
use swarmkeeper::core::torrent_builder::TorrentBuilder;
use swarmkeeper::servers::http::{launcher, AppState};
use swarmkeeper_configuration::Configuration;

#[derive(Parser, Debug)]
#[command(name = "swarmkeeper", version, about = "A single-file BitTorrent tracker.")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Hashes a file, derives its info-hash, writes a `.torrent` file next
    /// to it, and registers the torrent with the configured database.
    Publish {
        /// File to publish.
        file: PathBuf,

        /// Piece size in bytes. Must be greater than zero.
        #[arg(long)]
        piece_length: u32,

        /// Tracker announce URL. Repeat to add more URLs to the first tier.
        #[arg(long = "tracker")]
        trackers: Vec<String>,

        /// Marks the torrent private (no DHT/PEX, per BEP 27).
        #[arg(long)]
        private: bool,

        /// Value for the `.torrent` file's `created by` field.
        #[arg(long)]
        created_by: Option<String>,

        /// Where to write the `.torrent` file. Defaults to `<file>.torrent`.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Configuration file to load the database settings from.
        #[arg(long, env = "SWARMKEEPER_CONFIG", default_value = "./share/default/config/tracker.toml")]
        config: PathBuf,
    },

    /// Starts the HTTP tracker.
    Serve {
        /// Configuration file to load. Created with defaults if missing.
        #[arg(long, env = "SWARMKEEPER_CONFIG", default_value = "./share/default/config/tracker.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Command::Publish {
            file,
            piece_length,
            trackers,
            private,
            created_by,
            output,
            config,
        } => publish(&file, piece_length, trackers, private, created_by, output, &config).await,
        Command::Serve { config } => serve(&config).await,
    }
}

#[allow(clippy::too_many_arguments)]
async fn publish(
    file: &PathBuf,
    piece_length: u32,
    trackers: Vec<String>,
    private: bool,
    created_by: Option<String>,
    output: Option<PathBuf>,
    config_path: &PathBuf,
) -> ExitCode {
    let config = match Configuration::load_or_create_default(config_path) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("swarmkeeper: failed to load configuration: {error}");
            return ExitCode::FAILURE;
        }
    };
    bootstrap::logging::setup(&config);

    let announce_list = if trackers.is_empty() { vec![] } else { vec![trackers] };

    let slicer = match FileSlicer::open(file) {
        Ok(slicer) => slicer,
        Err(error) => {
            eprintln!("swarmkeeper: failed to open {}: {error}", file.display());
            return ExitCode::FAILURE;
        }
    };

    let builder = match TorrentBuilder::new(slicer, piece_length, announce_list, vec![], private, created_by) {
        Ok(builder) => builder,
        Err(error) => {
            eprintln!("swarmkeeper: {error}");
            return ExitCode::FAILURE;
        }
    };

    let record = match builder.build_record() {
        Ok(record) => record,
        Err(error) => {
            eprintln!("swarmkeeper: failed to hash {}: {error}", file.display());
            return ExitCode::FAILURE;
        }
    };

    let torrent_bytes = match builder.build_torrent_file() {
        Ok(bytes) => bytes,
        Err(error) => {
            eprintln!("swarmkeeper: failed to build .torrent file: {error}");
            return ExitCode::FAILURE;
        }
    };

    let output_path = output.unwrap_or_else(|| {
        let mut path = file.clone();
        let extended = format!("{}.torrent", path.file_name().and_then(|n| n.to_str()).unwrap_or("output"));
        path.set_file_name(extended);
        path
    });

    if let Err(error) = std::fs::write(&output_path, torrent_bytes) {
        eprintln!("swarmkeeper: failed to write {}: {error}", output_path.display());
        return ExitCode::FAILURE;
    }

    let db = match driver::build(config.db_driver, &config.db_path) {
        Ok(db) => db,
        Err(error) => {
            eprintln!("swarmkeeper: failed to open database: {error}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(error) = db.save_torrent(&record).await {
        eprintln!("swarmkeeper: failed to register torrent: {error}");
        return ExitCode::FAILURE;
    }

    println!("info_hash: {}", record.info_hash);
    println!("torrent file: {}", output_path.display());

    ExitCode::SUCCESS
}

async fn serve(config_path: &PathBuf) -> ExitCode {
    let config = match Configuration::load_or_create_default(config_path) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("swarmkeeper: failed to load configuration: {error}");
            return ExitCode::FAILURE;
        }
    };
    bootstrap::logging::setup(&config);

    let addr: SocketAddr = match config.bind_address.parse() {
        Ok(addr) => addr,
        Err(error) => {
            eprintln!("swarmkeeper: invalid bind_address {}: {error}", config.bind_address);
            return ExitCode::FAILURE;
        }
    };

    let db = match driver::build(config.db_driver, &config.db_path) {
        Ok(db) => Arc::<dyn swarmkeeper::core::databases::Database>::from(db),
        Err(error) => {
            eprintln!("swarmkeeper: failed to open database: {error}");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(driver = ?config.db_driver, "database ready");

    let state = Arc::new(AppState { db, config });

    match launcher::run(state, addr).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("swarmkeeper: {error}");
            ExitCode::FAILURE
        }
    }
}
