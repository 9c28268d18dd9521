//! Shelfmark CLI - administrative commands over the list database

use clap::{Parser, Subcommand, ValueEnum};
use shelfmark::config;
use shelfmark::ui::{self, Icons};
use shelfmark::{DbServer, Identity, ItemType, ListType, RowId};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "shelfmark")]
#[command(version)]
#[command(about = "Persistence layer for library title and author lists")]
#[command(long_about = r#"
Shelfmark keeps Titles and Authors filed under named Lists, each with its own
comments, in a single SQLite database.

Example usage:
  shelfmark init
  shelfmark stats
  shelfmark lists --type title
  shelfmark comments --item-type title --item-id 3
  shelfmark dump comments
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the database file (overrides the config)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Human)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Human,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema and write a config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Show row counts per table
    Stats,

    /// Show lists, optionally only one type
    Lists {
        /// title or author
        #[arg(short = 't', long = "type")]
        list_type: Option<String>,
    },

    /// Show the stored comments of one item
    Comments {
        /// title or author
        #[arg(long)]
        item_type: String,

        /// Row id of the owning item
        #[arg(long)]
        item_id: i64,
    },

    /// Write a table to a diagnostic text file
    Dump {
        /// lists, authors, titles or comments
        table: String,

        /// Directory for the dump file (overrides the config)
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Delete every row of a table
    Truncate {
        /// lists, authors, titles or comments
        table: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let mut shelf_config = config::load_config(Some(&config_path))?.unwrap_or_default();
    if let Some(database) = &cli.database {
        shelf_config.database = Some(database.to_string_lossy().to_string());
    }
    let base = Path::new(".");

    match cli.command {
        Commands::Init { force } => {
            let db_path = shelf_config.database_path_in(base);
            config::ensure_db_dir(&db_path)?;
            let server = DbServer::open(&db_path, &shelf_config)?;
            config::write_config(&config_path, &shelf_config, force)?;

            if cli.format == OutputFormat::Json {
                let data = serde_json::json!({
                    "database": db_path,
                    "config": config_path,
                    "stats": server.stats()?,
                });
                println!("{}", serde_json::to_string_pretty(&data)?);
            } else {
                ui::success(&format!("{} Database initialized", Icons::DATABASE));
                ui::info("Database", &db_path.display().to_string());
                ui::info("Config", &config_path.display().to_string());
            }
        }

        Commands::Stats => {
            let server = DbServer::from_config(&shelf_config, base)?;
            let stats = server.stats()?;

            if cli.format == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                ui::header(&format!(
                    "{} Shelfmark Statistics ({})",
                    Icons::STATS,
                    shelf_config.database_path_in(base).display()
                ));
                println!(
                    "{}",
                    ui::stats_table(&[
                        ("Lists", &stats.lists.to_string()),
                        ("Authors", &stats.authors.to_string()),
                        ("Titles", &stats.titles.to_string()),
                        ("Comments", &stats.comments.to_string()),
                    ])
                );
            }
        }

        Commands::Lists { list_type } => {
            let server = DbServer::from_config(&shelf_config, base)?;
            let lists = match list_type {
                Some(t) => server.get_lists_by_type(t.parse::<ListType>()?)?,
                None => server.get_all_lists()?,
            };

            if cli.format == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&lists)?);
            } else if lists.is_empty() {
                ui::warn("No lists found.");
            } else {
                let records = lists
                    .iter()
                    .map(|l| {
                        vec![
                            l.ident().map(|id| id.to_string()).unwrap_or_default(),
                            l.list_type.to_string(),
                            l.dialog_title.clone(),
                            l.component_label.clone(),
                            l.modify_date.format("%Y-%m-%d %H:%M").to_string(),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    ui::records_table(&["id", "type", "dialog title", "component", "modified"], records)
                );
            }
        }

        Commands::Comments { item_type, item_id } => {
            let server = DbServer::from_config(&shelf_config, base)?;
            let item_type: ItemType = item_type.parse()?;
            let comments = server.get_comments_for_item(item_type, RowId::new(item_id))?;

            if cli.format == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&comments)?);
            } else if comments.is_empty() {
                ui::warn(&format!("No comments for {} {}.", item_type, item_id));
            } else {
                ui::section(&format!("{} Comments for {} {}", Icons::COMMENT, item_type, item_id));
                for comment in comments {
                    let id = comment.ident().map(|id| id.to_string()).unwrap_or_default();
                    println!("  {} {}", ui::dim(&format!("#{}", id)), comment.text);
                }
            }
        }

        Commands::Dump { table, dir } => {
            let mut server = DbServer::from_config(&shelf_config, base)?;
            if let Some(dir) = dir {
                server.set_dump_dir(dir);
            }
            let path = server.dump_table(&table)?;

            if cli.format == OutputFormat::Json {
                println!("{}", serde_json::json!({ "table": table, "path": path }));
            } else {
                ui::success(&format!("{} Dumped {}", Icons::FILE, table));
                ui::summary_row("Path:", &path.display().to_string());
            }
        }

        Commands::Truncate { table } => {
            let mut server = DbServer::from_config(&shelf_config, base)?;
            let removed = server.truncate_table(&table)?;
            server.close_connection()?;

            if cli.format == OutputFormat::Json {
                println!("{}", serde_json::json!({ "table": table, "removed": removed }));
            } else {
                ui::success(&format!("{} Truncated {} ({} rows)", Icons::DEL, table, removed));
            }
        }
    }

    Ok(())
}
