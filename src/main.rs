mod config;
mod email;
mod error;
mod extract;
mod models;
mod store;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use config::Config;
use email::{EmailConfig, ImapConnector, MailboxScanner};
use extract::Extractor;
use models::{Application, ApplicationFilter, ApplicationUpdate};
use serde::Serialize;
use std::path::PathBuf;
use store::Store;

#[derive(Parser)]
#[command(name = "applytrack")]
#[command(about = "Track job applications in a CSV file and pick up updates from email")]
struct Cli {
    /// Config file (default: $APPLYTRACK_CONFIG or the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Tracker CSV, overriding the config
    #[arg(long, global = true, env = "CSV_PATH")]
    csv: Option<PathBuf>,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List applications, optionally filtered
    List {
        /// Status contains (case-insensitive)
        #[arg(short, long)]
        status: Option<String>,

        /// Priority equals (HIGH, MEDIUM, LOW)
        #[arg(short, long)]
        priority: Option<String>,

        /// Source contains (case-insensitive)
        #[arg(long)]
        source: Option<String>,

        /// Company contains (case-insensitive)
        #[arg(short, long)]
        company: Option<String>,
    },

    /// Show one application
    Show {
        /// Row number as shown by `list`
        index: usize,
    },

    /// Add an application
    Add {
        #[arg(long)]
        company: String,

        #[arg(long)]
        position: String,

        #[command(flatten)]
        fields: NewFields,
    },

    /// Change some fields of an application
    Update {
        /// Row number as shown by `list`
        index: usize,

        #[command(flatten)]
        fields: UpdateFields,
    },

    /// Delete an application (later rows move up)
    Delete {
        /// Row number as shown by `list`
        index: usize,
    },

    /// Overview numbers and top companies
    Stats,

    /// Most recently applied
    Recent {
        #[arg(short, long, default_value = "5")]
        limit: usize,
    },

    /// Applications and responses per month
    Timeline {
        #[arg(short, long, default_value = "6")]
        months: usize,
    },

    /// Count per status
    StatusBreakdown,

    /// Response rate per source
    SourceBreakdown,

    /// Applications flagged as phishing
    Phishing,

    /// Scan the mailbox for application updates and merge them
    Scan {
        /// Number of days to look back (default from config)
        #[arg(short, long)]
        days: Option<u32>,

        /// Mail account (default from config)
        #[arg(short, long)]
        username: Option<String>,

        /// Show what was found without touching the tracker
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Args)]
struct NewFields {
    /// YYYY-MM-DD (default: today)
    #[arg(long)]
    date_applied: Option<String>,
    #[arg(long)]
    location: Option<String>,
    #[arg(long)]
    contact_name: Option<String>,
    #[arg(long)]
    contact_email: Option<String>,
    #[arg(long, default_value = "LinkedIn")]
    source: String,
    #[arg(long, default_value = "Applied_LinkedIn")]
    status: String,
    #[arg(long, default_value = "Wait for response")]
    next_action: String,
    #[arg(long, default_value = "MEDIUM")]
    priority: String,
    #[arg(long)]
    notes: Option<String>,
}

#[derive(Args)]
struct UpdateFields {
    #[arg(long)]
    date_applied: Option<String>,
    #[arg(long)]
    company: Option<String>,
    #[arg(long)]
    position: Option<String>,
    #[arg(long)]
    location: Option<String>,
    #[arg(long)]
    contact_name: Option<String>,
    #[arg(long)]
    contact_email: Option<String>,
    #[arg(long)]
    source: Option<String>,
    #[arg(long)]
    status: Option<String>,
    /// YYYY-MM-DD, or "" to clear
    #[arg(long)]
    response_date: Option<String>,
    #[arg(long)]
    next_action: Option<String>,
    #[arg(long)]
    priority: Option<String>,
    #[arg(long)]
    notes: Option<String>,
}

impl From<UpdateFields> for ApplicationUpdate {
    fn from(f: UpdateFields) -> Self {
        Self {
            date_applied: f.date_applied,
            company: f.company,
            position_title: f.position,
            location: f.location,
            contact_name: f.contact_name,
            contact_email: f.contact_email,
            source: f.source,
            status: f.status,
            response_date: f.response_date,
            next_action: f.next_action,
            priority: f.priority,
            notes: f.notes,
        }
    }
}

fn init_logging(level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_table(rows: &[(usize, Application)]) {
    if rows.is_empty() {
        println!("No applications found.");
        return;
    }
    println!(
        "{:<5} {:<11} {:<22} {:<28} {:<24} {:<8}",
        "#", "APPLIED", "COMPANY", "POSITION", "STATUS", "PRIORITY"
    );
    println!("{}", "-".repeat(101));
    for (index, app) in rows {
        println!(
            "{:<5} {:<11} {:<22} {:<28} {:<24} {:<8}",
            index,
            truncate(&app.date_applied, 10),
            truncate(&app.company, 20),
            truncate(&app.position_title, 26),
            truncate(&app.status, 22),
            app.priority
        );
    }
}

fn print_application(index: usize, app: &Application) {
    println!("Application #{}", index);
    for (name, value) in models::COLUMNS.iter().zip(app.fields()) {
        if !value.is_empty() {
            println!("{:<15} {}", format!("{}:", name), value);
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    init_logging(&config.general.log_level);

    let store = Store::open(cli.csv.clone().unwrap_or_else(|| config.csv_path()));

    match cli.command {
        Commands::List {
            status,
            priority,
            source,
            company,
        } => {
            let filter = ApplicationFilter {
                status,
                priority,
                source,
                company,
            };
            // Keep row numbers so they can be passed to show/update/delete.
            let rows: Vec<(usize, Application)> = store
                .load()
                .into_iter()
                .enumerate()
                .filter(|(_, app)| store::matches(app, &filter))
                .collect();

            if cli.json {
                let apps: Vec<&Application> = rows.iter().map(|(_, a)| a).collect();
                print_json(&apps)?;
            } else {
                print_table(&rows);
            }
        }

        Commands::Show { index } => {
            let app = store
                .get(index)
                .ok_or_else(|| anyhow!("Application #{} not found", index))?;
            if cli.json {
                print_json(&app)?;
            } else {
                print_application(index, &app);
            }
        }

        Commands::Add {
            company,
            position,
            fields,
        } => {
            let app = Application {
                date_applied: fields.date_applied.unwrap_or_default(),
                company,
                position_title: position,
                location: fields.location.unwrap_or_default(),
                contact_name: fields.contact_name.unwrap_or_default(),
                contact_email: fields.contact_email.unwrap_or_default(),
                source: fields.source,
                status: fields.status,
                response_date: String::new(),
                next_action: fields.next_action,
                priority: fields.priority,
                notes: fields.notes.unwrap_or_default(),
            };
            let index = store.insert(app).context("Failed to create application")?;
            println!("Added application #{} to {}", index, store.path().display());
        }

        Commands::Update { index, fields } => {
            let update = ApplicationUpdate::from(fields);
            if update.is_empty() {
                println!("Nothing to update.");
            } else {
                store
                    .update(index, &update)
                    .context("Failed to update application")?;
                println!("Updated application #{}", index);
            }
        }

        Commands::Delete { index } => {
            let removed = store
                .delete(index)
                .context("Failed to delete application")?;
            println!(
                "Deleted #{}: {} at {}",
                index, removed.position_title, removed.company
            );
        }

        Commands::Stats => {
            let stats = store.stats();
            if cli.json {
                print_json(&stats)?;
            } else {
                println!("Total applications:   {}", stats.total);
                println!("Response rate:        {:.1}%", stats.response_rate);
                println!("Active opportunities: {}", stats.active_count);
                println!("Phishing blocked:     {}", stats.phishing_count);
                if !stats.top_companies.is_empty() {
                    println!("\nTop companies:");
                    for c in &stats.top_companies {
                        println!("  {:<30} {:>4}", truncate(&c.company, 28), c.count);
                    }
                }
            }
        }

        Commands::Recent { limit } => {
            let recent = store.recent(limit);
            if cli.json {
                print_json(&recent)?;
            } else {
                for app in &recent {
                    println!(
                        "{:<11} {:<22} {}",
                        app.date_applied,
                        truncate(&app.company, 20),
                        app.position_title
                    );
                }
            }
        }

        Commands::Timeline { months } => {
            let timeline = store.timeline(months);
            if cli.json {
                print_json(&timeline)?;
            } else {
                println!("{:<8} {:>12} {:>10}", "MONTH", "APPLICATIONS", "RESPONSES");
                for ((label, apps), responses) in timeline
                    .labels
                    .iter()
                    .zip(&timeline.applications)
                    .zip(&timeline.responses)
                {
                    println!("{:<8} {:>12} {:>10}", label, apps, responses);
                }
            }
        }

        Commands::StatusBreakdown => {
            let breakdown = store.status_breakdown();
            if cli.json {
                print_json(&breakdown)?;
            } else {
                for s in &breakdown {
                    println!("{:<30} {:>5} {:>6.1}%", truncate(&s.status, 28), s.count, s.percentage);
                }
            }
        }

        Commands::SourceBreakdown => {
            let breakdown = store.source_breakdown();
            if cli.json {
                print_json(&breakdown)?;
            } else {
                println!("{:<20} {:>12} {:>10} {:>8}", "SOURCE", "APPLICATIONS", "RESPONSES", "RATE");
                for s in &breakdown {
                    println!(
                        "{:<20} {:>12} {:>10} {:>7.1}%",
                        truncate(&s.source, 18),
                        s.applications,
                        s.responses,
                        s.response_rate
                    );
                }
            }
        }

        Commands::Phishing => {
            let flagged = store.phishing();
            if cli.json {
                print_json(&flagged)?;
            } else if flagged.is_empty() {
                println!("No phishing attempts recorded.");
            } else {
                for app in &flagged {
                    println!("{:<22} {:<30} {}", truncate(&app.company, 20), app.contact_email, app.notes);
                }
            }
        }

        Commands::Scan {
            days,
            username,
            dry_run,
        } => {
            let days = days.unwrap_or(config.scan.days);
            let username = username.unwrap_or_else(|| config.imap.username.clone());
            if username.is_empty() {
                return Err(anyhow!(
                    "No mail account configured. Set imap.username or pass --username"
                ));
            }

            let password = match std::env::var("APPLYTRACK_PASSWORD") {
                Ok(p) => p,
                Err(_) => EmailConfig::read_password_file(&config.password_file())?,
            };
            let email_config = EmailConfig {
                server: config.imap.server.clone(),
                port: config.imap.port,
                timeout: std::time::Duration::from_secs(config.imap.timeout_secs),
                ..EmailConfig::gmail(&username, &password)
            };

            let scanner = MailboxScanner::new(
                ImapConnector::new(email_config),
                Extractor::new()?,
                &config.imap.mailbox,
                config.scan.max_messages,
            );

            eprintln!("Scanning {} for the last {} days...", username, days);
            let report = scanner.scan(days);

            let summary = if dry_run || report.candidates.is_empty() {
                None
            } else {
                Some(
                    store
                        .merge_candidates(&report.candidates)
                        .context("Failed to merge scan results")?,
                )
            };

            if cli.json {
                print_json(&serde_json::json!({ "report": report, "merged": summary }))?;
                return Ok(());
            }

            println!("Emails examined: {}", report.examined);
            println!("Applications:    {}", report.candidates.len());
            for c in &report.candidates {
                println!("  {} - {} at {} ({})", c.date_applied, c.position_title, c.company, c.status);
            }
            if !report.errors.is_empty() {
                println!("Errors:          {}", report.errors.len());
                for e in &report.errors {
                    println!("  {}", e);
                }
            }

            match summary {
                Some(summary) => println!(
                    "\nMerged: {} added, {} updated, {} unchanged",
                    summary.added, summary.updated, summary.unchanged
                ),
                None if dry_run => println!("\n(Dry run - tracker not changed)"),
                None => {}
            }
        }
    }

    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
