// lv-sorter: sort a folder of photos and videos into album groups.
// Usage: lv-sorter pick ~/Pictures && lv-sorter ls -m photos -s alpha

const VERSION: &str = env!("CARGO_PKG_VERSION");
const GIT_HASH: &str = env!("GIT_HASH");

mod cli;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use lv_sorter::config::{self, GridConfig};
use lv_sorter::{HandleStore, LocalFs, MediaFilter, Session, SortMode};

#[derive(Parser, Debug)]
#[command(name = "lv-sorter", about = "Media sorter: browse, filter and file photos and videos into albums")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Verbose logging to stderr
    #[arg(short, long, global = true)]
    debug: bool,

    /// Store file (defaults to the platform data dir)
    #[arg(long, global = true, env = "LV_SORTER_DB")]
    db: Option<PathBuf>,

    /// Cells per grid batch
    #[arg(long, global = true, default_value_t = 50)]
    batch_size: usize,

    /// Thumbnail edge length in px
    #[arg(long, global = true, default_value_t = 160)]
    thumb_size: u32,

    /// Print version and exit
    #[arg(short = 'V', long)]
    version: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Choose the root folder (remembered for next time)
    Pick { path: PathBuf },
    /// List the grid
    Ls {
        /// Show ALBUM/GROUP instead of the root
        #[arg(long)]
        group: Option<String>,
        /// Case-insensitive name search
        #[arg(short, long, default_value = "")]
        query: String,
        /// all | photos | videos
        #[arg(short, long, default_value = "all")]
        media: MediaFilter,
        /// alpha | date
        #[arg(short, long, default_value = "date")]
        sort: SortMode,
        /// Include subdirectories
        #[arg(short, long)]
        recursive: bool,
        /// Batches to load
        #[arg(long, default_value_t = 1)]
        pages: usize,
    },
    /// List albums and their groups
    Albums,
    /// Create an album under the root
    AddAlbum { name: String },
    /// Create a group inside an album
    AddGroup { album: String, name: String },
    /// Move files into ALBUM/GROUP
    Mv {
        #[arg(long)]
        to: String,
        /// Take the files from ALBUM/GROUP instead of the root
        #[arg(long)]
        group: Option<String>,
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Rename a file, keeping its extension
    Rename { name: String, new_base: String },
    /// Delete a file
    Rm { name: String },
    /// Show file metadata
    Info { name: String },
    /// Open a file with the default application
    Open { name: String },
    /// Render thumbnails for the first pages of the grid
    Thumbs {
        out: PathBuf,
        #[arg(long, default_value_t = 1)]
        pages: usize,
        /// Download ffmpeg if it is not installed
        #[arg(long)]
        fetch_ffmpeg: bool,
    },
}

fn init_logging(debug: bool) {
    let env = env_logger::Env::default().default_filter_or("warn");
    let mut builder = env_logger::Builder::from_env(env);
    if debug {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.format_timestamp(None).init();
}

fn main() {
    let args = Cli::parse();
    init_logging(args.debug);

    if args.version {
        println!("lv-sorter {} ({})", VERSION, GIT_HASH);
        return;
    }

    if let Err(e) = run(args) {
        eprintln!("lv-sorter: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: Cli) -> Result<()> {
    // ── Store ───────────────────────────────────────────────────────────
    let db_path = args.db.unwrap_or_else(config::default_db_path);
    let store = HandleStore::open(&db_path)?;

    let grid = GridConfig {
        batch_size: args.batch_size.max(1),
        thumb_size: args.thumb_size.max(1),
        ..GridConfig::default()
    };
    let mut s = Session::new(LocalFs, store, grid, 1280.0);

    // `pick` chooses a new root; everything else works on the remembered one.
    let cmd = match args.command {
        Some(Commands::Pick { path }) => return cli::pick(&mut s, &path),
        other => other,
    };
    if !cli::restore(&mut s)? {
        return Ok(());
    }
    log::debug!("lv-sorter {} ({})", VERSION, GIT_HASH);

    match cmd {
        None => {
            cli::print_grid(&s);
            Ok(())
        }
        Some(Commands::Pick { .. }) => Ok(()),
        Some(Commands::Ls {
            group,
            query,
            media,
            sort,
            recursive,
            pages,
        }) => cli::ls(
            &mut s,
            &cli::LsOpts {
                group,
                query,
                media,
                sort,
                recursive,
                pages,
            },
        ),
        Some(Commands::Albums) => cli::albums(&mut s),
        Some(Commands::AddAlbum { name }) => cli::add_album(&mut s, &name),
        Some(Commands::AddGroup { album, name }) => cli::add_group(&mut s, &album, &name),
        Some(Commands::Mv { to, group, names }) => cli::mv(&mut s, &to, group.as_deref(), &names),
        Some(Commands::Rename { name, new_base }) => cli::rename(&mut s, &name, &new_base),
        Some(Commands::Rm { name }) => cli::rm(&mut s, &name),
        Some(Commands::Info { name }) => cli::info(&s, &name),
        Some(Commands::Open { name }) => cli::open(&s, &name),
        Some(Commands::Thumbs {
            out,
            pages,
            fetch_ffmpeg,
        }) => cli::thumbs(&mut s, &out, pages, fetch_ffmpeg),
    }
}
