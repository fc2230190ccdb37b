use clap::Subcommand;
use tweny_core::{Database, HistoryStore};

use super::format_secs;

#[derive(Subcommand)]
pub enum HistoryAction {
    /// List completed sessions, newest first
    List {
        /// Show at most this many sessions
        #[arg(long)]
        limit: Option<usize>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Delete every recorded session
    Reset {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

pub fn run(action: HistoryAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        HistoryAction::List { limit, json } => {
            let mut records = db.list_desc()?;
            if let Some(limit) = limit {
                records.truncate(limit);
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else if records.is_empty() {
                println!("no sessions recorded");
            } else {
                for record in &records {
                    println!(
                        "{}  {:>8}  {} breaks",
                        record.start_time.format("%Y-%m-%d %H:%M"),
                        format_secs(record.duration_secs()),
                        record.breaks_taken
                    );
                }
            }
        }
        HistoryAction::Reset { yes } => {
            if !yes {
                return Err("refusing to delete history without --yes".into());
            }
            let removed = db.delete_all()?;
            println!("deleted {removed} sessions");
        }
    }
    Ok(())
}
