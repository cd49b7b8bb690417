use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use chrono::Utc;
use tracing::warn;

use tourbuddy_core::api::{DestinationKind, SearchClient};
use tourbuddy_core::cache::{CacheManager, CachedData};
use tourbuddy_core::links::{self, Coordinates, PlaceKind};
use tourbuddy_core::notify::ReminderHook;
use tourbuddy_core::utils::{format_amount, format_datetime, truncate_string};
use tourbuddy_core::{Expense, ListResourceManager, ManagerError, RemoteStore, Trip};

use crate::app::App;
use crate::resources::{apply_flags, parse_flags, CliResource};

/// Width of snippets in destination listings
const SNIPPET_WIDTH: usize = 80;

/// A manager wired to the signed-in user's store and snapshot cache.
struct RecordCommand<T: CliResource> {
    manager: ListResourceManager<T>,
    store: Arc<dyn RemoteStore>,
    owner: Option<String>,
    cache: CacheManager,
}

impl<T: CliResource> RecordCommand<T> {
    async fn open(app: &mut App) -> Result<Self> {
        app.ensure_signed_in().await?;
        let store = app.store()?;
        Ok(Self {
            manager: ListResourceManager::new(store.clone()),
            store,
            owner: app.owner(),
            cache: app.user_cache()?,
        })
    }

    /// Load from the store, falling back to the last snapshot when the
    /// store cannot be reached. Returns a note on the snapshot's age when
    /// it fell back.
    async fn load(&mut self) -> Result<Option<String>> {
        let loaded = self.manager.load(self.owner.as_deref()).await.map(|records| records.len());
        match loaded {
            Ok(_) => {
                self.save_snapshot();
                Ok(None)
            }
            Err(e) if e.is_retryable() => {
                let Some(cached) = self.cache.load_records::<T>()? else {
                    return Err(e.into());
                };
                warn!(error = %e, "Store unavailable, showing snapshot");
                let note = snapshot_note(&cached);
                self.manager = ListResourceManager::with_records(self.store.clone(), cached.data);
                Ok(Some(note))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn save_snapshot(&self) {
        if let Err(e) = self.cache.save_records(self.manager.records()) {
            warn!(error = %e, "Failed to save snapshot");
        }
    }

    /// Run a list/add/edit/delete action.
    async fn run(&mut self, action: &str, args: &[String]) -> Result<()> {
        match action {
            "list" => {
                if let Some(note) = self.load().await? {
                    println!("(offline, showing {} {})", T::PLURAL, note);
                }
                self.print_list();
            }
            "add" => {
                let flags = parse_flags(args)?;
                apply_flags::<T>(self.manager.draft_mut(), &flags)?;
                let record = self.manager.save(self.owner.as_deref()).await.map_err(explain)?;
                println!("Added {} {}: {}", T::NAME, record.id, record.fields.describe());
                self.after_write();
            }
            "edit" => {
                let (id, rest) = args
                    .split_first()
                    .ok_or_else(|| anyhow!("Usage: edit <id> --field value..."))?;
                let flags = parse_flags(rest)?;
                if flags.is_empty() {
                    bail!("Nothing to change. Pass one of: --{}", T::FLAGS.join(", --"));
                }
                self.manager.load(self.owner.as_deref()).await?;
                self.manager.begin_edit(id)?;
                apply_flags::<T>(self.manager.draft_mut(), &flags)?;
                let record = self.manager.save(self.owner.as_deref()).await.map_err(explain)?;
                println!("Updated {} {}: {}", T::NAME, record.id, record.fields.describe());
                self.after_write();
            }
            "delete" => {
                let id = args
                    .first()
                    .ok_or_else(|| anyhow!("Usage: delete <id>"))?;
                self.manager.delete(self.owner.as_deref(), id).await?;
                println!("Deleted {} {}", T::NAME, id);
                self.after_write();
            }
            other => bail!("Unknown {} action: {}", T::NAME, other),
        }
        Ok(())
    }

    fn after_write(&self) {
        if self.manager.needs_reconcile() {
            println!("Saved, but the list could not be refreshed; it may be out of date.");
        } else {
            self.save_snapshot();
        }
    }

    fn print_list(&self) {
        let records = self.manager.records();
        if records.is_empty() {
            println!("No {} yet.", T::PLURAL);
            return;
        }
        for record in records {
            println!("{:<24} {}", record.id, record.fields.describe());
        }
    }
}

/// "from 2h ago", with a warning once the snapshot is stale.
fn snapshot_note<D>(cached: &CachedData<D>) -> String {
    if cached.is_stale() {
        format!("from {}, may be out of date", cached.age_display())
    } else {
        format!("from {}", cached.age_display())
    }
}

/// Turn validation failures into a message naming the flag to fix.
fn explain(err: ManagerError) -> anyhow::Error {
    match err.field() {
        Some(field) => anyhow!("{} (check --{})", err, field),
        None => err.into(),
    }
}

fn action(args: &[String]) -> (&str, &[String]) {
    match args.split_first() {
        Some((action, rest)) => (action.as_str(), rest),
        None => ("list", &[]),
    }
}

pub async fn run_records<T: CliResource>(app: &mut App, args: &[String]) -> Result<()> {
    let (action, rest) = action(args);
    let mut ctx = RecordCommand::<T>::open(app).await?;
    ctx.run(action, rest).await
}

/// Trips also queue a reminder for every trip created.
pub async fn run_trips(app: &mut App, args: &[String]) -> Result<()> {
    let (action, rest) = action(args);
    let mut ctx = RecordCommand::<Trip>::open(app).await?;
    let mut events = ctx.manager.subscribe();
    let hook = ReminderHook::new(Arc::new(app.reminders()?));

    let result = ctx.run(action, rest).await;
    // The trip is stored whether or not a reminder could be queued
    let scheduled = hook.drain(&mut events).await;
    if scheduled > 0 {
        println!("Reminder set for an hour before departure.");
    }
    result
}

pub async fn run_expenses(app: &mut App, args: &[String]) -> Result<()> {
    let (action, rest) = action(args);
    let mut ctx = RecordCommand::<Expense>::open(app).await?;
    if action != "summary" {
        return ctx.run(action, rest).await;
    }

    if let Some(note) = ctx.load().await? {
        println!("(offline, summary {})", note);
    }
    let groups = ctx.manager.group_by_category();
    if groups.is_empty() {
        println!("No expenses yet.");
        return Ok(());
    }
    println!("Expenses by category:");
    for slice in ctx.manager.chart_slices() {
        println!("  {} {:<20} {}", slice.color, slice.name, format_amount(slice.amount));
    }
    println!("Total Expenses: ₹{}", ctx.manager.total());
    Ok(())
}

pub async fn show_reminders(app: &App) -> Result<()> {
    let pending = app.reminders()?.pending(Utc::now()).await?;
    if pending.is_empty() {
        println!("No upcoming reminders.");
    }
    for reminder in pending {
        println!("{}  {}", format_datetime(reminder.at), reminder.message);
    }
    Ok(())
}

pub async fn show_destinations(app: &App, args: &[String]) -> Result<()> {
    let kind = match args.first() {
        Some(label) => DestinationKind::from_label(label).ok_or_else(|| {
            let labels: Vec<_> = DestinationKind::ALL.iter().map(|k| k.label()).collect();
            anyhow!("Unknown category '{}' (expected one of: {})", label, labels.join(", "))
        })?,
        None => DestinationKind::Popular,
    };

    let client = SearchClient::new(app.config.serpapi_key()?)?;
    let destinations = client.fetch_destinations(kind).await?;
    println!("{} destinations:\n", kind);
    for destination in destinations {
        println!("{}", destination.title);
        println!("  {}", destination.link);
        if let Some(snippet) = destination.snippet {
            println!("  {}", truncate_string(&snippet, SNIPPET_WIDTH));
        }
    }
    Ok(())
}

pub fn show_weather(args: &[String]) -> Result<()> {
    let city = args.join(" ");
    let url = links::weather_search_url(&city)?;
    println!("{}", url);
    Ok(())
}

pub fn show_nearby(args: &[String]) -> Result<()> {
    let [kind, lat, lon] = args else {
        bail!("Usage: nearby <attractions|restaurants|parks> <lat> <lon>");
    };
    let kind = PlaceKind::from_name(kind).ok_or_else(|| {
        let names: Vec<_> = PlaceKind::ALL.iter().map(|k| k.to_string().to_lowercase()).collect();
        anyhow!("Unknown place type '{}' (expected one of: {})", kind, names.join(", "))
    })?;
    let latitude: f64 = lat.parse().map_err(|_| anyhow!("Invalid latitude '{}'", lat))?;
    let longitude: f64 = lon.parse().map_err(|_| anyhow!("Invalid longitude '{}'", lon))?;
    let at = Coordinates::new(latitude, longitude)?;

    println!("{} near {}:", kind, at);
    println!("{}", links::nearby_search_url(kind, at));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_action_defaults_to_list() {
        assert_eq!(action(&[]).0, "list");
        let given = args(&["edit", "doc-1", "--item", "Tent"]);
        let (name, rest) = action(&given);
        assert_eq!(name, "edit");
        assert_eq!(rest.len(), 3);
    }

    #[test]
    fn test_snapshot_note_flags_stale_data() {
        let mut cached = CachedData::new(());
        assert_eq!(snapshot_note(&cached), "from just now");

        cached.cached_at = Utc::now() - chrono::Duration::minutes(150);
        assert_eq!(snapshot_note(&cached), "from 3h ago, may be out of date");
    }

    #[test]
    fn test_nearby_argument_checks() {
        assert!(show_nearby(&args(&["parks", "12.97"])).is_err());
        assert!(show_nearby(&args(&["museums", "12.97", "77.59"])).is_err());
        assert!(show_nearby(&args(&["parks", "north", "77.59"])).is_err());
        assert!(show_nearby(&args(&["parks", "12.97", "77.59"])).is_ok());
    }

    #[test]
    fn test_weather_needs_a_city() {
        assert!(show_weather(&[]).is_err());
        assert!(show_weather(&args(&["New", "Delhi"])).is_ok());
    }
}
