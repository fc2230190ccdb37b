use clap::Subcommand;
use serde_json::json;
use tweny_core::stats::{HistorySummary, BADGES};
use tweny_core::{Database, HistoryStore};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Totals, streaks and rank
    Summary,
    /// Every badge with its unlock state
    Badges,
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let summary = HistorySummary::compute(&db.list_desc()?);

    match action {
        StatsAction::Summary => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        StatsAction::Badges => {
            let badges: Vec<_> = BADGES
                .iter()
                .map(|badge| {
                    json!({
                        "id": badge.id,
                        "name": badge.name,
                        "description": badge.description,
                        "unlocked": summary.badges.iter().any(|b| b.id == badge.id),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&badges)?);
        }
    }
    Ok(())
}
