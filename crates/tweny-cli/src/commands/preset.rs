use clap::Subcommand;
use tweny_core::error::ValidationError;
use tweny_core::presets::MAX_DURATION_SECS;
use tweny_core::{Database, PresetRegistry, SessionPreset};

use super::format_secs;

#[derive(Subcommand)]
pub enum PresetAction {
    /// List saved presets
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Add a preset
    Add {
        name: String,
        /// Session goal in hours
        #[arg(long, default_value_t = 4.0)]
        goal_hours: f64,
        /// Work interval in minutes
        #[arg(long, default_value_t = 20.0)]
        work_minutes: f64,
        /// Break length in seconds
        #[arg(long, default_value_t = 20.0)]
        break_seconds: f64,
        #[arg(long, default_value = "#007AFF")]
        color: String,
        #[arg(long, default_value = "⏳")]
        icon: String,
    },
    /// Edit a preset, looked up by id or name
    Update {
        key: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        goal_hours: Option<f64>,
        #[arg(long)]
        work_minutes: Option<f64>,
        #[arg(long)]
        break_seconds: Option<f64>,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        icon: Option<String>,
    },
    /// Remove a preset, looked up by id or name
    Remove { key: String },
    /// Restore the built-in presets
    Reset,
}

fn to_secs(field: &str, value: f64, unit: f64) -> Result<u64, ValidationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            message: format!("must be a non-negative number, got {value}"),
        });
    }
    let secs = (value * unit).round();
    if secs > MAX_DURATION_SECS as f64 {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            message: "must be at most one week".to_string(),
        });
    }
    Ok(secs as u64)
}

pub fn run(action: PresetAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let mut registry = PresetRegistry::load(&db);

    match action {
        PresetAction::List { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(registry.list())?);
            } else {
                for p in registry.list() {
                    println!(
                        "{}  {} {:<20} goal {:>6}  work {:>6}  break {:>6}",
                        p.id,
                        p.icon,
                        p.name,
                        format_secs(p.session_goal_secs),
                        format_secs(p.work_interval_secs),
                        format_secs(p.break_interval_secs)
                    );
                }
            }
        }
        PresetAction::Add {
            name,
            goal_hours,
            work_minutes,
            break_seconds,
            color,
            icon,
        } => {
            let preset = SessionPreset::new(
                name,
                to_secs("goal_hours", goal_hours, 3600.0)?,
                to_secs("work_minutes", work_minutes, 60.0)?,
                to_secs("break_seconds", break_seconds, 1.0)?,
                color,
                icon,
            );
            let id = preset.id;
            registry.upsert_and_save(preset, &db)?;
            println!("{id}");
        }
        PresetAction::Update {
            key,
            name,
            goal_hours,
            work_minutes,
            break_seconds,
            color,
            icon,
        } => {
            let mut preset = registry
                .find(&key)
                .cloned()
                .ok_or(ValidationError::PresetNotFound(key))?;
            if let Some(name) = name {
                preset.name = name;
            }
            if let Some(hours) = goal_hours {
                preset.session_goal_secs = to_secs("goal_hours", hours, 3600.0)?;
            }
            if let Some(minutes) = work_minutes {
                preset.work_interval_secs = to_secs("work_minutes", minutes, 60.0)?;
            }
            if let Some(seconds) = break_seconds {
                preset.break_interval_secs = to_secs("break_seconds", seconds, 1.0)?;
            }
            if let Some(color) = color {
                preset.color_hex = color;
            }
            if let Some(icon) = icon {
                preset.icon = icon;
            }
            registry.upsert_and_save(preset, &db)?;
            println!("ok");
        }
        PresetAction::Remove { key } => {
            let id = registry
                .find(&key)
                .map(|p| p.id)
                .ok_or(ValidationError::PresetNotFound(key))?;
            registry.remove(id);
            registry.save(&db)?;
            println!("ok");
        }
        PresetAction::Reset => {
            registry.reset_to_defaults();
            registry.save(&db)?;
            println!("presets reset to defaults");
        }
    }
    Ok(())
}
