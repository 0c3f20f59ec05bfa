// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! CalDAV client validation tool.
//!
//! A standalone CLI for exercising the client against real CalDAV servers.
//! Calendars are addressed by their id inside the principal's calendar home.

use std::error::Error;
use std::io::{Read as _, Write as _};

use clap::{Parser, Subcommand};
use colored::Colorize as _;
use davcal_caldav::{
    AuthMethod, CalDavConfig, Calendar, CalendarObjectResource, ComponentKind, DEFAULT_SORT_KEYS,
    DavClient, Principal,
};
use jiff::{Timestamp, Zoned, civil};
use tracing_subscriber::EnvFilter;

/// CalDAV client validation tool.
#[derive(Parser)]
#[command(name = "caldav_cli")]
#[command(about = "CalDAV client validation tool", long_about = None)]
#[command(version)]
struct Cli {
    /// CalDAV server URL
    #[arg(long, env = "DAVCAL_SERVER")]
    server: String,
    /// Username for basic auth
    #[arg(long, env = "DAVCAL_USERNAME")]
    username: Option<String>,
    /// Password for basic auth
    #[arg(long, env = "DAVCAL_PASSWORD", hide_env_values = true)]
    password: Option<String>,
    /// Bearer token for OAuth
    #[arg(long, env = "DAVCAL_TOKEN", hide_env_values = true)]
    token: Option<String>,
    /// Request timeout in seconds
    #[arg(long, default_value = "30")]
    timeout: u64,
    /// Log requests to stderr
    #[arg(long)]
    debug: bool,
    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Discover the principal and its calendar home
    Discover,
    /// List all calendars
    ListCals {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a calendar
    MakeCal {
        /// Calendar id (last path segment)
        id: String,
        /// Display name
        #[arg(long)]
        name: Option<String>,
        /// Accept only todos
        #[arg(long)]
        todos: bool,
    },
    /// List events in a time range
    ListEvents {
        /// Calendar id
        calendar: String,
        /// Start date (e.g., "2025-01-01" or "today")
        #[arg(long, default_value = "today")]
        start: String,
        /// End date
        #[arg(long)]
        end: Option<String>,
    },
    /// List todos
    ListTodos {
        /// Calendar id
        calendar: String,
        /// Include completed and cancelled todos
        #[arg(long)]
        all: bool,
        /// Sort keys, e.g. due,priority
        #[arg(long, value_delimiter = ',')]
        sort: Vec<String>,
    },
    /// Show busy periods
    FreeBusy {
        /// Calendar id
        calendar: String,
        /// Start date
        #[arg(long, default_value = "today")]
        start: String,
        /// End date
        #[arg(long)]
        end: String,
    },
    /// Print a calendar object
    Get {
        /// Calendar id
        calendar: String,
        /// Object href, relative to the calendar
        href: String,
    },
    /// Add an event, todo or journal entry
    Add {
        /// Calendar id
        calendar: String,
        /// iCalendar file path (or "-" for stdin)
        input: String,
    },
    /// Mark a todo as completed
    Complete {
        /// Calendar id
        calendar: String,
        /// UID of the todo
        uid: String,
    },
    /// Delete a calendar object
    Delete {
        /// Calendar id
        calendar: String,
        /// Object href, relative to the calendar
        href: String,
    },
}

impl Cli {
    fn build_config(&self) -> CalDavConfig {
        let auth = if let Some(token) = &self.token {
            AuthMethod::Bearer {
                token: token.clone(),
            }
        } else if let (Some(username), Some(password)) = (&self.username, &self.password) {
            AuthMethod::Basic {
                username: username.clone(),
                password: password.clone(),
            }
        } else {
            AuthMethod::None
        };

        CalDavConfig {
            base_url: self.server.clone(),
            auth,
            timeout_secs: self.timeout,
            ..Default::default()
        }
    }
}

async fn cmd_discover(principal: &mut Principal) -> Result<(), Box<dyn Error>> {
    println!("{}", "✓ Principal found".green());
    println!(
        "Principal: {}",
        principal.url().map(ToString::to_string).unwrap_or_default()
    );

    let home = principal.calendar_home_set().await?;
    println!(
        "Calendar home: {}",
        home.url().map(ToString::to_string).unwrap_or_default()
    );
    Ok(())
}

async fn cmd_list_cals(principal: &mut Principal, json: bool) -> Result<(), Box<dyn Error>> {
    let calendars = principal.calendars().await?;

    if json {
        let entries: Vec<_> = calendars
            .iter()
            .map(|cal| {
                serde_json::json!({
                    "url": cal.canonical_url(),
                    "name": cal.name(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if calendars.is_empty() {
        println!("No calendars found");
        return Ok(());
    }

    println!("{:-<80}", "");
    println!("{:<50} {:<30}", "Url", "Name");
    println!("{:-<80}", "");
    for cal in &calendars {
        let url = cal.canonical_url().unwrap_or_default();
        println!("{:<50} {:<30}", url, cal.name().unwrap_or("Unnamed"));
    }
    Ok(())
}

async fn cmd_make_cal(
    principal: &mut Principal,
    id: &str,
    name: Option<&str>,
    todos: bool,
) -> Result<(), Box<dyn Error>> {
    let components: &[ComponentKind] = if todos {
        &[ComponentKind::Todo]
    } else {
        &[]
    };
    let calendar = principal.make_calendar(name, Some(id), components).await?;

    println!("{}", "✓ Calendar created successfully".green());
    println!("Url: {}", calendar.canonical_url().unwrap_or_default());
    Ok(())
}

fn summary(resource: &CalendarObjectResource) -> String {
    property(resource, "SUMMARY").unwrap_or_default()
}

fn property(resource: &CalendarObjectResource, name: &str) -> Option<String> {
    resource
        .parsed()
        .and_then(|cal| cal.primary())
        .and_then(|c| c.value(name))
        .map(ToString::to_string)
}

fn short_href(resource: &CalendarObjectResource) -> String {
    resource
        .url()
        .and_then(|u| u.path().rsplit('/').next().map(ToString::to_string))
        .unwrap_or_default()
}

async fn cmd_list_events(
    calendar: &Calendar,
    start: &str,
    end: Option<&str>,
) -> Result<(), Box<dyn Error>> {
    let start = parse_date(start)?;
    let end = end.map(parse_date).transpose()?;
    let events = calendar
        .date_search(start, end, Some(ComponentKind::Event))
        .await?;

    if events.is_empty() {
        println!("No events found");
        return Ok(());
    }

    println!("{:-<80}", "");
    println!("{:<20} {:<40} {:<20}", "Start", "Summary", "Href");
    println!("{:-<80}", "");
    for event in &events {
        let start = property(event, "DTSTART").unwrap_or_else(|| "-".to_string());
        println!("{:<20} {:<40} {:<20}", start, summary(event), short_href(event));
    }
    Ok(())
}

async fn cmd_list_todos(
    calendar: &Calendar,
    all: bool,
    sort: &[String],
) -> Result<(), Box<dyn Error>> {
    let keys: Vec<&str> = if sort.is_empty() {
        DEFAULT_SORT_KEYS.to_vec()
    } else {
        sort.iter().map(String::as_str).collect()
    };
    let todos = calendar.todos(&keys, all).await?;

    if todos.is_empty() {
        println!("No todos found");
        return Ok(());
    }

    println!("{:-<80}", "");
    println!("{:<20} {:<40} {:<15}", "Due", "Summary", "Status");
    println!("{:-<80}", "");
    for todo in &todos {
        let due = property(todo, "DUE").unwrap_or_else(|| "-".to_string());
        let status = property(todo, "STATUS").unwrap_or_else(|| "NEEDS-ACTION".to_string());
        println!("{:<20} {:<40} {:<15}", due, summary(todo), status);
    }
    Ok(())
}

async fn cmd_free_busy(calendar: &Calendar, start: &str, end: &str) -> Result<(), Box<dyn Error>> {
    let freebusy = calendar
        .freebusy_request(parse_date(start)?, parse_date(end)?)
        .await?;

    let periods = freebusy.busy_periods()?;
    if periods.is_empty() {
        println!("{}", "✓ Free for the whole range".green());
    }
    for (start, end) in periods {
        println!("{} {start} → {end}", "busy".yellow());
    }
    Ok(())
}

async fn cmd_get(calendar: &Calendar, href: &str) -> Result<(), Box<dyn Error>> {
    let resource = calendar.event_by_url(href).await?;
    println!("Url: {}", resource.canonical_url().unwrap_or_default());
    println!("Kind: {}", resource.kind());
    println!();
    print!("{}", resource.raw().unwrap_or_default());
    Ok(())
}

/// Read iCalendar data from a file or stdin.
fn read_icalendar(input: &str) -> Result<String, Box<dyn Error>> {
    if input == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(std::fs::read_to_string(input)?)
    }
}

async fn cmd_add(calendar: &Calendar, input: &str) -> Result<(), Box<dyn Error>> {
    let ical = read_icalendar(input)?;
    let kind = ical
        .parse::<davcal_caldav::VCalendar>()?
        .kind()
        .ok_or("No VEVENT, VTODO or VJOURNAL component found in iCalendar data")?;

    let resource = match kind {
        ComponentKind::Todo => calendar.add_todo(&ical).await?,
        ComponentKind::Journal => calendar.add_journal(&ical).await?,
        ComponentKind::Event => calendar.add_event(&ical).await?,
        ComponentKind::FreeBusy => return Err("free/busy data cannot be stored".into()),
    };

    println!("{}", "✓ Resource created successfully".green());
    println!("Url: {}", resource.canonical_url().unwrap_or_default());
    Ok(())
}

async fn cmd_complete(calendar: &Calendar, uid: &str) -> Result<(), Box<dyn Error>> {
    let mut todo = calendar.todo_by_uid(uid).await?;
    todo.complete(Timestamp::now()).await?;
    println!("{}", "✓ Todo completed".green());
    Ok(())
}

async fn cmd_delete(calendar: &Calendar, href: &str) -> Result<(), Box<dyn Error>> {
    let mut resource = calendar.event_by_url(href).await?;
    resource.delete().await?;
    println!("{}", "✓ Resource deleted successfully".green());
    println!("Url: {}", resource.canonical_url().unwrap_or_default());
    Ok(())
}

/// Parse "today" or a `YYYY-MM-DD` date.
fn parse_date(date: &str) -> Result<civil::Date, String> {
    if date.eq_ignore_ascii_case("today") {
        return Ok(Zoned::now().date());
    }
    civil::Date::strptime("%Y-%m-%d", date)
        .map_err(|e| format!("Invalid date format: '{date}' ({e}). Use YYYY-MM-DD or today"))
}

async fn run(cli: Cli, client: DavClient) -> Result<(), Box<dyn Error>> {
    let mut principal = client.principal().await?;
    match cli.command {
        Commands::Discover => cmd_discover(&mut principal).await,
        Commands::ListCals { json } => cmd_list_cals(&mut principal, json).await,
        Commands::MakeCal { id, name, todos } => {
            cmd_make_cal(&mut principal, &id, name.as_deref(), todos).await
        }
        Commands::ListEvents {
            calendar,
            start,
            end,
        } => {
            let calendar = principal.calendar(None, &calendar).await?;
            cmd_list_events(&calendar, &start, end.as_deref()).await
        }
        Commands::ListTodos {
            calendar,
            all,
            sort,
        } => {
            let calendar = principal.calendar(None, &calendar).await?;
            cmd_list_todos(&calendar, all, &sort).await
        }
        Commands::FreeBusy {
            calendar,
            start,
            end,
        } => {
            let calendar = principal.calendar(None, &calendar).await?;
            cmd_free_busy(&calendar, &start, &end).await
        }
        Commands::Get { calendar, href } => {
            let calendar = principal.calendar(None, &calendar).await?;
            cmd_get(&calendar, &href).await
        }
        Commands::Add { calendar, input } => {
            let calendar = principal.calendar(None, &calendar).await?;
            cmd_add(&calendar, &input).await
        }
        Commands::Complete { calendar, uid } => {
            let calendar = principal.calendar(None, &calendar).await?;
            cmd_complete(&calendar, &uid).await
        }
        Commands::Delete { calendar, href } => {
            let calendar = principal.calendar(None, &calendar).await?;
            cmd_delete(&calendar, &href).await
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    // Variables already set win over .env.local, which wins over .env.
    dotenvy::from_filename(".env.local").ok();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let client = DavClient::new(cli.build_config())?;

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(run(cli, client));

    if let Err(e) = result {
        std::io::stdout().flush().ok();
        eprintln!("{} {e}", "Error:".red().bold());
        std::process::exit(1);
    }

    Ok(())
}
