#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! CLI for one configured mail account

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use mailroom::{
    AccountConfig, ClassicHandler, EmailMessage, FolderInfo, MailHandler, OperationResult,
    OutgoingEmail, PageQuery, SortOrder,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mail-cli")]
#[command(about = "Search, organize and send mail for one IMAP/SMTP account")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// List one page of emails
    List {
        /// Page number, starting at 1
        #[arg(long, default_value = "1")]
        page: u32,

        /// Emails per page
        #[arg(long, default_value = "10")]
        page_size: u32,

        /// Only emails before this date (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        before: Option<DateTime<Utc>>,

        /// Only emails on or after this date (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        after: Option<DateTime<Utc>>,

        /// Subject contains
        #[arg(long)]
        subject: Option<String>,

        /// Body contains
        #[arg(long)]
        body: Option<String>,

        /// Headers or body contain
        #[arg(long)]
        text: Option<String>,

        /// Sender contains
        #[arg(long)]
        from: Option<String>,

        /// Recipient contains
        #[arg(long)]
        to: Option<String>,

        /// Sort order: asc or desc
        #[arg(long, default_value = "desc")]
        order: SortOrder,
    },

    /// List folders
    Folders,

    /// Create a folder
    CreateFolder {
        name: String,
    },

    /// Copy emails by UID
    Copy {
        /// Destination folder
        destination: String,

        #[arg(required = true)]
        uids: Vec<String>,
    },

    /// Move emails by UID
    Move {
        /// Destination folder
        destination: String,

        #[arg(required = true)]
        uids: Vec<String>,
    },

    /// Send a plain-text email
    Send {
        #[arg(long, required = true)]
        to: Vec<String>,

        #[arg(long)]
        cc: Vec<String>,

        #[arg(long)]
        bcc: Vec<String>,

        #[arg(long)]
        subject: String,

        #[arg(long)]
        body: String,
    },
}

fn parse_date(s: &str) -> Result<DateTime<Utc>, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map(|d| d.and_time(chrono::NaiveTime::MIN).and_utc())
        .map_err(|e| format!("Invalid date '{s}': {e}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let account = AccountConfig::from_env()?;
    let handler = ClassicHandler::from_account(&account)?;

    match args.command {
        Command::List {
            page,
            page_size,
            before,
            after,
            subject,
            body,
            text,
            from,
            to,
            order,
        } => {
            let query = PageQuery {
                page,
                page_size,
                before,
                after,
                subject,
                body,
                text,
                from_address: from,
                to_address: to,
                order,
            };
            cmd_list(&handler, args.json, query).await?;
        }
        Command::Folders => {
            cmd_folders(&handler, args.json).await?;
        }
        Command::CreateFolder { name } => {
            let created = handler.create_folder(&name).await?;
            if args.json {
                println!("{}", serde_json::json!({ "name": name, "created": created }));
            } else if created {
                println!("Created {name}");
            } else {
                println!("Server refused to create {name}");
            }
        }
        Command::Copy { destination, uids } => {
            let result = handler.copy_emails(&uids, &destination).await?;
            print_operation(&result, args.json)?;
        }
        Command::Move { destination, uids } => {
            let result = handler.move_emails(&uids, &destination).await?;
            print_operation(&result, args.json)?;
        }
        Command::Send {
            to,
            cc,
            bcc,
            subject,
            body,
        } => {
            let email = OutgoingEmail {
                recipients: to,
                subject,
                body,
                cc,
                bcc,
            };
            handler.send_email(&email).await?;
            if !args.json {
                println!("Sent");
            }
        }
    }

    Ok(())
}

async fn cmd_list(handler: &impl MailHandler, json: bool, query: PageQuery) -> anyhow::Result<()> {
    let result = handler.get_emails(query).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_email_table(&result.emails);
        println!(
            "\nPage {} ({} per page), {} matching",
            result.query.page, result.query.page_size, result.total
        );
    }

    Ok(())
}

async fn cmd_folders(handler: &impl MailHandler, json: bool) -> anyhow::Result<()> {
    let folders = handler.list_folders().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&folders)?);
    } else {
        for folder in &folders {
            print_folder(folder);
        }
    }

    Ok(())
}

fn print_operation(result: &OperationResult, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        println!("{}", result.message);
        if !result.failed_uids.is_empty() {
            println!("Failed UIDs: {}", result.failed_uids.join(", "));
        }
    }
    Ok(())
}

fn print_folder(folder: &FolderInfo) {
    if folder.flags.is_empty() {
        println!("{}", folder.name);
    } else {
        println!("{} ({})", folder.name, folder.flags.join(", "));
    }
}

fn print_email_table(emails: &[EmailMessage]) {
    if emails.is_empty() {
        println!("No emails found.");
        return;
    }

    let header = format!("{:<8} {:<20} {:<30} {}", "UID", "Date", "From", "Subject");
    println!("{header}");
    println!("{}", "-".repeat(100));

    for email in emails {
        println!(
            "{:<8} {:<20} {:<30} {}",
            email.uid.map_or_else(|| "-".to_string(), |uid| uid.to_string()),
            email.timestamp.format("%Y-%m-%d %H:%M"),
            truncate(&email.sender, 28),
            truncate(&email.subject, 40),
        );
    }

    println!("\n{} email(s)", emails.len());
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}
