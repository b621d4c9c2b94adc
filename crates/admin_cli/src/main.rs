use std::{error::Error, io::Write, path::PathBuf};

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    style::Print,
    terminal,
    terminal::ClearType,
};
use engine::{
    DateRange, Engine,
    backup::{CancelFlag, ConflictMode, ExportOptions, ImportOptions, ImportResult},
};
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "shuttlebook_admin")]
#[command(about = "Admin utilities for Shuttlebook (schema, organizers, backups, balance repair)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./shuttlebook.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Applies or inspects schema migrations.
    Migrate(MigrateArgs),
    Organizer(Organizer),
    /// Writes an organizer's records to a JSON archive.
    Export(ExportArgs),
    /// Imports a JSON archive into an organizer.
    Import(ImportArgs),
    /// Deletes every record of an organizer.
    Reset(ResetArgs),
    /// Rebuilds every balance of an organizer from sessions and payments.
    Recompute(OrganizerArg),
    /// Lists credit transfers whose two legs do not pair up.
    CheckTransfers(OrganizerArg),
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum MigrateAction {
    /// Applies every pending migration.
    #[default]
    Up,
    /// Rolls back the last migration.
    Down,
    /// Drops every table and migrates from scratch.
    Fresh,
    Status,
}

#[derive(Args, Debug)]
struct MigrateArgs {
    #[arg(value_enum, default_value_t)]
    action: MigrateAction,
    /// Do not ask for confirmation before `down` or `fresh`.
    #[arg(long)]
    yes: bool,
}

#[derive(Args, Debug)]
struct Organizer {
    #[command(subcommand)]
    command: OrganizerCommand,
}

#[derive(Subcommand, Debug)]
enum OrganizerCommand {
    Create(OrganizerCreateArgs),
    List,
}

#[derive(Args, Debug)]
struct OrganizerCreateArgs {
    #[arg(long)]
    name: String,
}

#[derive(Args, Debug)]
struct OrganizerArg {
    #[arg(long)]
    organizer: String,
}

#[derive(Args, Debug)]
struct ExportArgs {
    #[arg(long)]
    organizer: String,
    #[arg(long)]
    out: PathBuf,
    #[arg(long)]
    from: Option<NaiveDate>,
    #[arg(long)]
    to: Option<NaiveDate>,
    /// Export only these sessions. Repeat the flag for several.
    #[arg(long = "session")]
    sessions: Vec<Uuid>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Conflict {
    Skip,
    Replace,
    Merge,
}

impl From<Conflict> for ConflictMode {
    fn from(value: Conflict) -> Self {
        match value {
            Conflict::Skip => ConflictMode::SkipDuplicates,
            Conflict::Replace => ConflictMode::ReplaceDuplicates,
            Conflict::Merge => ConflictMode::MergeData,
        }
    }
}

#[derive(Args, Debug)]
struct ImportArgs {
    #[arg(long)]
    organizer: String,
    #[arg(long)]
    file: PathBuf,
    #[arg(long, value_enum, default_value_t = Conflict::Skip)]
    conflict: Conflict,
    /// Report what would happen without writing anything.
    #[arg(long)]
    validate_only: bool,
    /// Delete the organizer's records before importing.
    #[arg(long)]
    clear_existing: bool,
    /// Do not ask for confirmation.
    #[arg(long)]
    yes: bool,
}

#[derive(Args, Debug)]
struct ResetArgs {
    #[arg(long)]
    organizer: String,
    /// Do not ask for confirmation.
    #[arg(long)]
    yes: bool,
}

struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> Result<Self, Box<dyn Error + Send + Sync>> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Asks a yes/no question on stderr; only `y` confirms.
fn confirm(prompt: &str) -> Result<bool, Box<dyn Error + Send + Sync>> {
    let _raw = RawModeGuard::enter()?;

    let mut out = std::io::stderr();
    execute!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine),
        Print(format!("{prompt} [y/N] "))
    )?;
    out.flush()?;

    loop {
        let Event::Key(KeyEvent {
            code, modifiers, ..
        }) = event::read()?
        else {
            continue;
        };

        let answer = match code {
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                return Err("interrupted".into());
            }
            KeyCode::Char('y') | KeyCode::Char('Y') => true,
            KeyCode::Char(_) | KeyCode::Enter | KeyCode::Esc => false,
            _ => continue,
        };

        execute!(out, Print(if answer { "y\r\n" } else { "n\r\n" }))?;
        out.flush()?;
        return Ok(answer);
    }
}

async fn migrate(
    db: &DatabaseConnection,
    args: &MigrateArgs,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let destructive = matches!(args.action, MigrateAction::Down | MigrateAction::Fresh);
    if destructive && !args.yes && !confirm("This discards ledger data. Continue?")? {
        eprintln!("aborted");
        std::process::exit(1);
    }
    match args.action {
        MigrateAction::Up => Migrator::up(db, None).await?,
        MigrateAction::Down => Migrator::down(db, Some(1)).await?,
        MigrateAction::Fresh => Migrator::fresh(db).await?,
        MigrateAction::Status => Migrator::status(db).await?,
    }
    let pending = Migrator::get_pending_migrations(db).await?.len();
    println!("schema migrated ({pending} pending)");
    Ok(())
}

fn print_report(report: &ImportResult) {
    println!("{}", report.message);
    let counts = &report.counts;
    for (name, entity) in [
        ("locations", counts.locations),
        ("players", counts.players),
        ("sessions", counts.sessions),
        ("session_participants", counts.session_participants),
        ("payments", counts.payments),
        ("player_balances", counts.player_balances),
    ] {
        println!(
            "  {name:<21} created {:>5}  updated {:>5}  skipped {:>5}  errors {:>5}",
            entity.created, entity.updated, entity.skipped, entity.errors
        );
    }
    for warning in &report.warnings {
        println!("warning: {warning}");
    }
    for error in &report.errors {
        eprintln!("error: {error}");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = Database::connect(&cli.database_url).await?;
    if let Command::Migrate(args) = &cli.command {
        return migrate(&db, args).await;
    }
    Migrator::up(&db, None).await?;
    let engine = Engine::builder().database(db).build().await?;

    match cli.command {
        Command::Migrate(_) => {}
        Command::Organizer(Organizer {
            command: OrganizerCommand::Create(args),
        }) => {
            let id = engine.new_organizer(&args.name).await?;
            println!("created organizer: {} ({id})", args.name);
        }
        Command::Organizer(Organizer {
            command: OrganizerCommand::List,
        }) => {
            for organizer in engine.organizers().await? {
                println!("{}\t{}", organizer.id, organizer.name);
            }
        }
        Command::Export(args) => {
            let options = ExportOptions {
                range: DateRange::new(args.from, args.to),
                session_ids: (!args.sessions.is_empty()).then_some(args.sessions),
            };
            let archive = engine.export_archive(&args.organizer, &options).await?;
            let file = std::fs::File::create(&args.out)?;
            serde_json::to_writer_pretty(std::io::BufWriter::new(file), &archive)?;
            println!(
                "exported {} records to {}",
                archive.metadata.total_records,
                args.out.display()
            );
        }
        Command::Import(args) => {
            let input = std::fs::read_to_string(&args.file)?;
            if args.clear_existing
                && !args.validate_only
                && !args.yes
                && !confirm(&format!(
                    "Delete every record of organizer {} before importing?",
                    args.organizer
                ))?
            {
                eprintln!("aborted");
                std::process::exit(1);
            }

            let cancel = CancelFlag::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    on_interrupt.cancel();
                }
            });

            let options = ImportOptions {
                conflict: args.conflict.into(),
                validate_only: args.validate_only,
                clear_existing_data: args.clear_existing,
                cancel: Some(cancel),
            };
            let report = engine
                .import_archive_str(&args.organizer, &input, &options)
                .await?;
            print_report(&report);
            if !report.success {
                std::process::exit(1);
            }
        }
        Command::Reset(args) => {
            if !args.yes
                && !confirm(&format!(
                    "Delete every record of organizer {}?",
                    args.organizer
                ))?
            {
                eprintln!("aborted");
                std::process::exit(1);
            }
            let removed = engine.reset_organizer_data(&args.organizer).await?;
            println!("removed {removed} records");
        }
        Command::Recompute(args) => {
            let players = engine.recompute_all_balances(&args.organizer).await?;
            println!("recomputed {players} balances");
        }
        Command::CheckTransfers(args) => {
            let broken = engine.verify_credit_transfers(&args.organizer).await?;
            if broken.is_empty() {
                println!("all credit transfers pair up");
            } else {
                for reference in &broken {
                    println!("broken: {reference}");
                }
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn migrate_defaults_to_up() {
        let cli = Cli::try_parse_from(["shuttlebook_admin", "migrate"]).unwrap();
        let Command::Migrate(args) = cli.command else {
            panic!("expected migrate");
        };
        assert!(matches!(args.action, MigrateAction::Up));
        assert!(!args.yes);

        let cli =
            Cli::try_parse_from(["shuttlebook_admin", "migrate", "fresh", "--yes"]).unwrap();
        let Command::Migrate(args) = cli.command else {
            panic!("expected migrate");
        };
        assert!(matches!(args.action, MigrateAction::Fresh));
        assert!(args.yes);

        assert!(Cli::try_parse_from(["shuttlebook_admin", "migrate", "sideways"]).is_err());
    }

    #[tokio::test]
    async fn migrate_up_creates_the_schema() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        let args = MigrateArgs {
            action: MigrateAction::Up,
            yes: false,
        };
        migrate(&db, &args).await.unwrap();
        assert!(Migrator::get_pending_migrations(&db).await.unwrap().is_empty());
    }
}
