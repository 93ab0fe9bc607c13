use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::{Datelike, Local, NaiveDate};
use clap::{Parser, Subcommand};

use tinymonth::{
    app::AppState,
    calendar::{CalendarUpdate, ImportPayload, holidays},
    input::DragSelector,
    storage::{
        DocumentStore, FileStore, MemoryStore, SqliteStore,
        config::{Config, StorageBackend},
        csv_import,
    },
    sync::{RemoteStore, server},
};

#[derive(Parser)]
#[command(name = "tinymonth")]
#[command(about = "Tag the days of a year with named, colored calendars")]
pub struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the persistence endpoint
    Serve {
        #[arg(long)]
        bind: Option<String>,
    },
    /// Merge a CSV with `date` and `calendars` columns into the stored data
    ImportCsv {
        path: PathBuf,
    },
    #[command(flatten)]
    State(StateCommand),
}

/// Commands that run against a loaded `AppState`.
#[derive(Subcommand)]
enum StateCommand {
    Calendars,
    AddCalendar {
        name: String,
        #[arg(long)]
        color: Option<String>,
    },
    UpdateCalendar {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },
    Activate {
        id: String,
    },
    Assign {
        date: NaiveDate,
        /// Calendar id, defaults to the active calendar
        #[arg(short, long)]
        calendar: Option<String>,
    },
    Unassign {
        date: NaiveDate,
        #[arg(short, long)]
        calendar: Option<String>,
    },
    Toggle {
        date: NaiveDate,
        #[arg(short, long)]
        calendar: Option<String>,
    },
    /// Toggle every date between FROM and TO like a drag across the grid
    Drag {
        from: NaiveDate,
        to: NaiveDate,
        #[arg(short, long)]
        calendar: Option<String>,
    },
    Comment {
        date: NaiveDate,
        text: String,
    },
    Uncomment {
        date: NaiveDate,
    },
    Show {
        date: NaiveDate,
    },
    Stats {
        year: Option<i32>,
    },
    Holidays {
        year: Option<i32>,
    },
    Import {
        path: PathBuf,
    },
    Export {
        path: Option<PathBuf>,
    },
}

pub async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_or_create_at(path),
        None => Config::load_or_create(),
    }
    .context("Failed to load config")?;

    let store = open_store(&config)?;

    match cli.command {
        Commands::Serve { bind } => {
            if config.storage.backend == StorageBackend::Remote {
                bail!("The server cannot use the remote backend; choose file, sqlite or memory");
            }
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            server::serve(&bind, store).await
        }
        Commands::ImportCsv { path } => {
            let text = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let summary = csv_import::import_csv(store.as_ref(), &text, &config.calendars.default_color).await?;

            println!(
                "Imported {} rows ({} skipped) into {}",
                summary.rows_imported,
                summary.rows_skipped,
                store.describe()
            );
            if !summary.calendars_created.is_empty() {
                println!("Created calendars: {}", summary.calendars_created.join(", "));
            }
            if let Some(active) = summary.active_id {
                println!("Active calendar: {}", active);
            }
            Ok(())
        }
        Commands::State(command) => {
            let mut app = AppState::new(store).with_holiday_years(config.holidays.years());
            app.load().await;

            let result = run_app_command(&mut app, &config, command).await;
            app.settle().await;

            let failed = app.sync_engine().failed_writes();
            if failed > 0 {
                eprintln!("Warning: {} write(s) failed, see the log for details", failed);
            }
            result
        }
    }
}

fn open_store(config: &Config) -> Result<Arc<dyn DocumentStore>> {
    let store: Arc<dyn DocumentStore> = match config.storage.backend {
        StorageBackend::File => Arc::new(FileStore::new(config.storage.data_file.clone())),
        StorageBackend::Sqlite => Arc::new(
            SqliteStore::open(&config.storage.sqlite_file)
                .with_context(|| format!("Failed to open {}", config.storage.sqlite_file.display()))?,
        ),
        StorageBackend::Remote => Arc::new(RemoteStore::new(config.storage.remote_url.as_str())),
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
    };

    tracing::info!("Using {} store", store.describe());
    Ok(store)
}

fn resolve_calendar(app: &AppState, calendar: Option<String>) -> Result<String> {
    match calendar.or_else(|| app.active_id().map(str::to_string)) {
        Some(id) => Ok(id),
        None => bail!(
            "No active calendar.\n\n\
            Pass --calendar <id> or select one with:\n  \
            tinymonth activate <id>"
        ),
    }
}

async fn run_app_command(app: &mut AppState, config: &Config, command: StateCommand) -> Result<()> {
    match command {
        StateCommand::Calendars => {
            if app.calendars().is_empty() {
                println!("No calendars yet. Create one with: tinymonth add-calendar <name>");
            }
            for calendar in app.calendars() {
                let marker = if app.active_id() == Some(calendar.id.as_str()) { "*" } else { " " };
                println!("{} {:<20} {:<24} {}", marker, calendar.id, calendar.name, calendar.color);
            }
        }
        StateCommand::AddCalendar { name, color } => {
            let color = color.unwrap_or_else(|| config.calendars.default_color.clone());
            let calendar = app.add_calendar(&name, &color)?;
            println!("Added calendar {} ({})", calendar.name, calendar.id);
        }
        StateCommand::UpdateCalendar { id, name, color } => {
            let update = CalendarUpdate { name, color };
            if update.is_empty() {
                bail!("Nothing to update; pass --name and/or --color");
            }
            if !app.update_calendar(&id, &update) {
                bail!("No calendar with id '{}'", id);
            }
            println!("Updated calendar {}", id);
        }
        StateCommand::Activate { id } => {
            if app.document().calendar(&id).is_none() {
                eprintln!("Warning: no calendar with id '{}' exists yet", id);
            }
            app.set_active_calendar(&id);
            println!("Active calendar: {}", id);
        }
        StateCommand::Assign { date, calendar } => {
            let id = resolve_calendar(app, calendar)?;
            app.add_assignment(date, &id);
            println!("{}: {}", date, app.get_assignments(date).join(", "));
        }
        StateCommand::Unassign { date, calendar } => {
            let id = resolve_calendar(app, calendar)?;
            app.remove_assignment(date, &id);
            println!("{}: {}", date, app.get_assignments(date).join(", "));
        }
        StateCommand::Toggle { date, calendar } => {
            let id = resolve_calendar(app, calendar)?;
            let assigned = app.toggle_assignment(date, &id);
            println!("{} {} {}", date, if assigned { "assigned to" } else { "removed from" }, id);
        }
        StateCommand::Drag { from, to, calendar } => {
            let id = resolve_calendar(app, calendar)?;
            let mut drag = DragSelector::new();
            drag.start_drag(from, id.as_str());
            drag.update_drag(to);
            let count = app.apply_drag(&drag);
            drag.end_drag();
            println!("Toggled {} on {} dates", id, count);
        }
        StateCommand::Comment { date, text } => {
            app.set_comment(date, &text);
            println!("{}: {}", date, app.get_comment(date));
        }
        StateCommand::Uncomment { date } => {
            app.remove_comment(date);
            println!("Removed comment on {}", date);
        }
        StateCommand::Show { date } => {
            println!("{}", date.format("%A, %B %d, %Y"));
            if let Some(name) = app.holiday_name(date) {
                println!("Holiday: {}", name);
            }
            let calendars = app.calendars_for_date(date);
            if calendars.is_empty() {
                println!("Calendars: none");
            } else {
                let names: Vec<&str> = calendars.iter().map(|c| c.name.as_str()).collect();
                println!("Calendars: {}", names.join(", "));
            }
            let comment = app.get_comment(date);
            if !comment.is_empty() {
                println!("Comment: {}", comment);
            }
        }
        StateCommand::Stats { year } => {
            let year = year.unwrap_or_else(|| Local::now().year());
            println!("Days per calendar in {}", year);
            for (calendar, count) in app.annual_stats(year) {
                println!("  {:<24} {}", calendar.name, count);
            }
        }
        StateCommand::Holidays { year } => {
            let year = year.unwrap_or_else(|| Local::now().year());
            for holiday in holidays::holidays_in_year(app.holidays(), year) {
                println!("{}  {}", holiday.date, holiday.name);
            }
        }
        StateCommand::Import { path } => {
            let content = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let payload = ImportPayload::from_json(&content)
                .with_context(|| format!("{} is not a valid export file", path.display()))?;
            app.import_data(payload);
            println!(
                "Imported {} calendars and {} assigned dates",
                app.calendars().len(),
                app.assignments().len()
            );
        }
        StateCommand::Export { path } => {
            let exported = app.export_data();
            let path = path.unwrap_or_else(|| PathBuf::from(exported.file_name()));
            tokio::fs::write(&path, exported.to_json()?)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Exported to {} at {}", path.display(), exported.exported_at.to_rfc3339());
        }
    }

    Ok(())
}
