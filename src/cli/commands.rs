//! CLI command handlers

use anyhow::{Context, Result};
use std::fs;
use tracing::warn;

use crate::cli::args::Commands;
use tunnel_profiles::{KeyValueStore, ProfileStore, ServerProfile, Setting};

/// Run one command against `store`, printing results to stdout
pub fn handle_command<S: KeyValueStore>(store: &ProfileStore<S>, command: Commands) -> Result<()> {
    match command {
        Commands::List => {
            let loaded = store.load_profiles();
            if loaded.is_degraded() {
                warn!(dropped = loaded.dropped, "Some saved profiles could not be read");
            }
            if loaded.profiles.is_empty() {
                println!("No saved profiles");
            }
            for (idx, profile) in loaded.profiles.iter().enumerate() {
                println!("{:>3}  {}  {}", idx + 1, profile.name, profile.host);
            }
        }
        Commands::Add { name, host, password } => {
            let saved = store
                .upsert_profile(ServerProfile::new(name, host, password))
                .context("Failed to save profile")?;
            println!("Saved profile '{}' ({})", saved.name, saved.host);
        }
        Commands::Edit {
            name,
            rename,
            host,
            password,
        } => {
            let Some(current) = store.find_profile(&name) else {
                println!("No profile named '{name}'");
                return Ok(());
            };
            let edited = ServerProfile::new(
                rename.unwrap_or(current.name),
                host.unwrap_or(current.host),
                password.unwrap_or(current.credential),
            );
            match store.edit_profile(&name, edited).context("Failed to edit profile")? {
                Some(saved) => println!("Saved profile '{}' ({})", saved.name, saved.host),
                None => println!("No profile named '{name}'"),
            }
        }
        Commands::Remove { name } => match store.delete_profile(&name).context("Failed to delete profile")? {
            Some(removed) => println!("Deleted profile '{}'", removed.name),
            None => println!("No profile named '{name}'"),
        },
        Commands::Use { name } => match store.apply_profile_named(&name).context("Failed to apply profile")? {
            Some(profile) => println!("Profile '{}' activated", profile.name),
            None => println!("No profile named '{name}'"),
        },
        Commands::Next => match store.apply_next_profile().context("Failed to apply next profile")? {
            Some(profile) => println!("Profile '{}' activated", profile.name),
            None => println!("No saved profiles"),
        },
        Commands::SaveCurrent { name } => {
            let saved = store
                .save_current_as_profile(name.as_deref().unwrap_or_default())
                .context("Failed to save active connection as profile")?;
            println!("Saved profile '{}' ({})", saved.name, saved.host);
        }
        Commands::Show => {
            let active = store.active_connection();
            for setting in Setting::ALL {
                let value = match setting {
                    Setting::Credential if !active.credential.is_empty() => "********",
                    _ => active.get(setting),
                };
                println!("{:<24} {}", setting.name(), value);
            }
        }
        Commands::Get { setting } => println!("{}", store.setting(setting)),
        Commands::Set { setting, value } => {
            store
                .set_setting(setting, &value)
                .with_context(|| format!("Failed to set {setting}"))?;
            println!("{setting} = {value}");
        }
        Commands::Reset { setting, all } => {
            if all {
                store
                    .reset_active_connection()
                    .context("Failed to reset settings")?;
                println!("All settings reset to defaults");
            } else if let Some(setting) = setting {
                store
                    .reset_setting(setting)
                    .with_context(|| format!("Failed to reset {setting}"))?;
                println!("{setting} = {}", setting.default_value());
            }
        }
        Commands::Import { file } => {
            let raw = fs::read_to_string(&file)
                .with_context(|| format!("Failed to read profiles from {:?}", file))?;
            let report = store.import_profiles(&raw).context("Failed to import profiles")?;
            println!("Imported {} profile(s), skipped {}", report.imported, report.dropped);
        }
        Commands::Export => {
            println!("{}", store.export_profiles().context("Failed to encode profiles")?);
        }
    }
    Ok(())
}
