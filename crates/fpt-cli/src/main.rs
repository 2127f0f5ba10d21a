use anyhow::Result;
use clap::{Args, Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "fpt")]
#[command(about = "Factory production tracking CLI", long_about = None)]
struct Cli {
    /// Config YAML layers in merge order (base -> site -> overrides).
    /// Built-in defaults apply when omitted.
    #[arg(long = "config", global = true)]
    config: Vec<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Compute a shift output offline (no database)
    Calc(CalcArgs),

    /// Shift helpers
    Shift {
        #[command(subcommand)]
        cmd: ShiftCmd,
    },

    /// Shift entry: continuity lookup, preview, submit
    Entry {
        #[command(subcommand)]
        cmd: EntryCmd,
    },

    /// Machines of a process with their entry status for one shift
    Board {
        #[arg(long)]
        process: i64,
        #[arg(long)]
        date: String,
        #[arg(long)]
        shift: i64,
    },

    /// Assign an item to several machines (elevated users only)
    Dispatch {
        #[arg(long)]
        actor: i64,
        #[arg(long)]
        item: i64,
        /// Comma separated machine ids
        #[arg(long, value_delimiter = ',', required = true)]
        machines: Vec<i64>,
    },

    /// Item catalog commands
    Item {
        #[command(subcommand)]
        cmd: ItemCmd,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,

    /// Apply SQL migrations.
    Migrate,
}

#[derive(Args)]
pub struct CalcArgs {
    /// Formula type 1..=4
    #[arg(long)]
    pub formula: i32,
    /// Spindle count (formula 3)
    #[arg(long)]
    pub spindles: Option<i32>,
    #[arg(long, default_value_t = 0.0)]
    pub start: f64,
    #[arg(long, default_value_t = 0.0)]
    pub end: f64,
    /// Yarn count (formulas 3 and 4)
    #[arg(long)]
    pub ne: Option<f64>,
    #[arg(long, default_value_t = false)]
    pub reset: bool,
    #[arg(long, default_value_t = false)]
    pub stopped: bool,
}

#[derive(Subcommand)]
enum ShiftCmd {
    /// Suggest the (date, shift) being recorded at a local time
    Suggest {
        /// Local time `YYYY-MM-DD HH:MM`; defaults to now
        #[arg(long)]
        at: Option<String>,
    },
}

#[derive(Args)]
pub struct EntryArgs {
    #[arg(long)]
    pub machine: i64,
    /// Record date `YYYY-MM-DD`
    #[arg(long)]
    pub date: String,
    #[arg(long)]
    pub shift: i64,
    #[arg(long)]
    pub start: Option<f64>,
    #[arg(long)]
    pub end: Option<f64>,
    #[arg(long)]
    pub ne: Option<f64>,
    /// Item override; defaults to the machine's current item
    #[arg(long)]
    pub item: Option<i64>,
    #[arg(long, default_value_t = false)]
    pub reset: bool,
    #[arg(long, default_value_t = false)]
    pub stopped: bool,
    #[arg(long)]
    pub note: Option<String>,
    /// Print the result as JSON instead of key=value lines
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Subcommand)]
enum EntryCmd {
    /// Print the continuity baseline for (machine, date, shift)
    Prior {
        #[arg(long)]
        machine: i64,
        #[arg(long)]
        date: String,
        #[arg(long)]
        shift: i64,
    },

    /// Compute what a submission would write, without writing
    Preview(EntryArgs),

    /// Validate, compute and save a shift entry
    Submit {
        #[command(flatten)]
        entry: EntryArgs,
        #[arg(long)]
        actor: i64,
        /// Accept an output above the plausibility threshold
        #[arg(long = "confirm-large", default_value_t = false)]
        confirm_large: bool,
    },
}

#[derive(Subcommand)]
enum ItemCmd {
    /// Delete an item no production log references
    Delete {
        #[arg(long)]
        actor: i64,
        #[arg(long)]
        id: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();
    let engine = commands::load_engine_config(&cli.config)?;

    match cli.cmd {
        Commands::Db { cmd } => {
            let pool =
                fpt_db::connect_from_env_var(&engine.db_url_env, engine.db_max_connections).await?;
            match cmd {
                DbCmd::Status => {
                    let s = fpt_db::status(&pool).await?;
                    println!(
                        "db_ok={} has_production_logs_table={}",
                        s.ok, s.has_production_logs_table
                    );
                }
                DbCmd::Migrate => {
                    fpt_db::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }
            }
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = fpt_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Calc(args) => commands::calc::run_calc(&engine, &args)?,

        Commands::Shift { cmd } => match cmd {
            ShiftCmd::Suggest { at } => commands::calc::run_shift_suggest(at.as_deref())?,
        },

        Commands::Entry { cmd } => {
            let store = commands::connect_store(&engine).await?;
            match cmd {
                EntryCmd::Prior {
                    machine,
                    date,
                    shift,
                } => commands::entry::run_prior(&store, machine, &date, shift).await?,
                EntryCmd::Preview(args) => {
                    commands::entry::run_preview(&store, &engine, &args).await?
                }
                EntryCmd::Submit {
                    entry,
                    actor,
                    confirm_large,
                } => {
                    commands::entry::run_submit(&store, &engine, &entry, actor, confirm_large)
                        .await?
                }
            }
        }

        Commands::Board {
            process,
            date,
            shift,
        } => {
            let store = commands::connect_store(&engine).await?;
            commands::registry::run_board(&store, process, &date, shift).await?;
        }

        Commands::Dispatch {
            actor,
            item,
            machines,
        } => {
            let store = commands::connect_store(&engine).await?;
            commands::registry::run_dispatch(&store, actor, item, &machines).await?;
        }

        Commands::Item { cmd } => match cmd {
            ItemCmd::Delete { actor, id } => {
                let store = commands::connect_store(&engine).await?;
                commands::registry::run_item_delete(&store, actor, id).await?;
            }
        },
    }

    Ok(())
}

fn init_tracing() {
    // Logs go to stderr; stdout carries the key=value results.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}
