use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tagfs::{Database, Storage, fingerprint, query, vfs};
use time::OffsetDateTime;

/// tagfs - tag files and browse them through a virtual filesystem
#[derive(Parser)]
#[command(name = "tagfs")]
#[command(about = "A tag-based file organizer with a virtual filesystem view")]
#[command(version)]
struct Cli {
    /// Database file (defaults to $TAGFS_DB, then ~/.tagfs/db)
    #[arg(long, global = true, value_name = "PATH")]
    database: Option<PathBuf>,

    /// Increase log verbosity (-v: debug, -vv: trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Create the database
    Init,
    /// Mount the virtual filesystem
    Mount(MountCommand),
    /// Apply tags to a file
    Tag(TagCommand),
    /// Remove tags from a file
    Untag(UntagCommand),
    /// List files matching a query
    Files(FilesCommand),
}

#[derive(Parser)]
struct MountCommand {
    /// Where to mount the virtual filesystem
    #[arg(value_name = "MOUNTPOINT")]
    mountpoint: PathBuf,
}

#[derive(Parser)]
struct TagCommand {
    /// The file to tag
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Tags to apply, each TAG or TAG=VALUE
    #[arg(value_name = "TAG", required = true)]
    tags: Vec<String>,
}

#[derive(Parser)]
struct UntagCommand {
    /// The file to untag
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Tag names to remove
    #[arg(value_name = "TAG", required = true)]
    tags: Vec<String>,
}

#[derive(Parser)]
struct FilesCommand {
    /// Query expression, e.g. 'cheese and (tomato or mushroom)'
    #[arg(value_name = "QUERY", trailing_var_arg = true)]
    query: Vec<String>,

    /// List every tagged file instead of evaluating a query
    #[arg(short, long)]
    all: bool,

    /// Emit matching file records as JSON
    #[arg(long)]
    json: bool,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("Error: could not initialize logging: {e}");
        std::process::exit(2);
    }

    let result = match &cli.command {
        Commands::Init => handle_init(&cli),
        Commands::Mount(cmd) => handle_mount(&cli, cmd),
        Commands::Tag(cmd) => handle_tag(&cli, cmd),
        Commands::Untag(cmd) => handle_untag(&cli, cmd),
        Commands::Files(cmd) => handle_files(&cli, cmd),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

/// Initializes the `log` facade with a stderr dispatcher.
fn init_logging(verbosity: u8) -> Result<()> {
    let level = match verbosity {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                humantime::format_rfc3339_seconds(SystemTime::now()),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()?;
    Ok(())
}

/// Resolves the database location: flag, then environment, then the
/// default under the home directory.
fn database_path(cli: &Cli) -> Result<PathBuf> {
    if let Some(path) = &cli.database {
        return Ok(path.clone());
    }

    if let Ok(path) = std::env::var("TAGFS_DB") {
        return Ok(PathBuf::from(path));
    }

    let home = dirs::home_dir().context("could not determine home directory")?;
    Ok(home.join(".tagfs").join("db"))
}

fn open_storage(cli: &Cli) -> Result<Storage> {
    let path = database_path(cli)?;
    ensure_database_directory(&path)?;
    let db = Database::open(&path)
        .with_context(|| format!("could not open database at '{}'", path.display()))?;
    Ok(Storage::new(db))
}

fn ensure_database_directory(db_path: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("could not create directory '{}'", parent.display()))?;
    }
    Ok(())
}

fn handle_init(cli: &Cli) -> Result<()> {
    let path = database_path(cli)?;
    ensure_database_directory(&path)?;
    Database::open(&path)
        .with_context(|| format!("could not create database at '{}'", path.display()))?;
    println!("Database created at {}", path.display());
    Ok(())
}

fn handle_mount(cli: &Cli, cmd: &MountCommand) -> Result<()> {
    let store = open_storage(cli)?;
    vfs::mount(store, &cmd.mountpoint)
}

fn handle_tag(cli: &Cli, cmd: &TagCommand) -> Result<()> {
    let store = open_storage(cli)?;

    let path = fs::canonicalize(&cmd.file)
        .with_context(|| format!("could not resolve '{}'", cmd.file.display()))?;
    let metadata = fs::metadata(&path)
        .with_context(|| format!("could not stat '{}'", path.display()))?;

    let mod_time = metadata
        .modified()
        .map(|t| OffsetDateTime::from(t).unix_timestamp())
        .unwrap_or(0);
    let digest = if metadata.is_file() {
        Some(fingerprint::fingerprint(&path)?)
    } else {
        None
    };

    store.unit_of_work(|store| {
        let file = match store.file_by_path(&path)? {
            Some(file) => {
                store.update_file(
                    file.id(),
                    digest.as_deref(),
                    mod_time,
                    metadata.len(),
                    metadata.is_dir(),
                )?;
                file
            }
            None => store.add_file(
                &path,
                digest.as_deref(),
                mod_time,
                metadata.len(),
                metadata.is_dir(),
            )?,
        };

        for spec in &cmd.tags {
            let (name, value) = parse_tag_spec(spec)?;

            let tag = match store.tag_by_name(name)? {
                Some(tag) => tag,
                None => store.add_tag(name)?,
            };
            let value_id = match value {
                Some(value) => store.get_or_create_value(value)?.id(),
                None => tagfs::ValueId::NONE,
            };

            store.add_file_tag(file.id(), tag.id(), value_id)?;
        }

        Ok(())
    })
}

fn handle_untag(cli: &Cli, cmd: &UntagCommand) -> Result<()> {
    let store = open_storage(cli)?;

    let path = fs::canonicalize(&cmd.file)
        .with_context(|| format!("could not resolve '{}'", cmd.file.display()))?;
    let file = store
        .file_by_path(&path)?
        .with_context(|| format!("'{}' is not tagged", path.display()))?;

    store.unit_of_work(|store| {
        for name in &cmd.tags {
            let tag = store
                .tag_by_name(name)?
                .with_context(|| format!("no such tag '{name}'"))?;
            store.delete_file_tags(file.id(), tag.id())?;
        }
        Ok(())
    })
}

fn handle_files(cli: &Cli, cmd: &FilesCommand) -> Result<()> {
    let store = open_storage(cli)?;

    let files = if cmd.all {
        store.all_files()?
    } else {
        let text = cmd.query.join(" ");
        if text.trim().is_empty() {
            bail!("a query must be given; use --all to list every tagged file");
        }

        let expression = query::parse(&text)?;
        for name in expression.tag_names() {
            if store.tag_by_name(name)?.is_none() {
                bail!("no such tag '{name}'");
            }
        }

        store.query_files(&expression)?
    };

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&files)?);
    } else {
        for file in &files {
            println!("{}", file.path().display());
        }
    }

    Ok(())
}

/// Splits a `TAG` or `TAG=VALUE` argument.
fn parse_tag_spec(spec: &str) -> Result<(&str, Option<&str>)> {
    match spec.split_once('=') {
        Some((name, value)) if !name.is_empty() && !value.is_empty() => Ok((name, Some(value))),
        Some(_) => bail!("malformed tag '{spec}': expected TAG or TAG=VALUE"),
        None if spec.is_empty() => bail!("tag name cannot be empty"),
        None => Ok((spec, None)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_tag_spec_accepts_bare_and_valued_forms() {
        assert_eq!(parse_tag_spec("cheese").unwrap(), ("cheese", None));
        assert_eq!(
            parse_tag_spec("rating=5").unwrap(),
            ("rating", Some("5"))
        );
    }

    #[test]
    fn parse_tag_spec_rejects_malformed_forms() {
        assert!(parse_tag_spec("=5").is_err());
        assert!(parse_tag_spec("rating=").is_err());
        assert!(parse_tag_spec("").is_err());
    }
}
