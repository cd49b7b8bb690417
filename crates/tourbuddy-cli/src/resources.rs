//! How each record type is filled from command-line flags and printed.

use anyhow::{anyhow, bail, Result};
use chrono::Utc;

use tourbuddy_core::models::{ExpenseDraft, MemoryDraft, PackingDraft, TripDraft};
use tourbuddy_core::utils::{format_amount, format_datetime, parse_datetime, truncate_string};
use tourbuddy_core::{Expense, Memory, PackingItem, Resource, Trip};

/// Column width for free-text values in list output
const TEXT_WIDTH: usize = 40;

pub trait CliResource: Resource {
    /// Singular name used in messages, e.g. "trip"
    const NAME: &'static str;
    const PLURAL: &'static str;

    /// Flag names accepted by `add` and `edit`, without the leading `--`
    const FLAGS: &'static [&'static str];

    fn apply(draft: &mut Self::Draft, flag: &str, value: &str) -> Result<()>;

    /// One-line summary for list output
    fn describe(&self) -> String;
}

fn unknown_flag<T: CliResource>(flag: &str) -> anyhow::Error {
    anyhow!(
        "Unknown {} field --{} (expected one of: {})",
        T::NAME,
        flag,
        T::FLAGS.iter().map(|f| format!("--{}", f)).collect::<Vec<_>>().join(", ")
    )
}

impl CliResource for Trip {
    const NAME: &'static str = "trip";
    const PLURAL: &'static str = "trips";
    const FLAGS: &'static [&'static str] = &["name", "date"];

    fn apply(draft: &mut TripDraft, flag: &str, value: &str) -> Result<()> {
        match flag {
            "name" => draft.name = value.to_string(),
            "date" => {
                let date = parse_datetime(value)
                    .ok_or_else(|| anyhow!("Invalid date '{}': use YYYY-MM-DD HH:MM", value))?;
                draft.date = Some(date);
            }
            other => return Err(unknown_flag::<Self>(other)),
        }
        Ok(())
    }

    fn describe(&self) -> String {
        let marker = if self.is_upcoming(Utc::now()) { "" } else { "  (past)" };
        format!(
            "{} - {}{}",
            truncate_string(&self.name, TEXT_WIDTH),
            format_datetime(self.date),
            marker
        )
    }
}

impl CliResource for PackingItem {
    const NAME: &'static str = "packing item";
    const PLURAL: &'static str = "packing items";
    const FLAGS: &'static [&'static str] = &["item"];

    fn apply(draft: &mut PackingDraft, flag: &str, value: &str) -> Result<()> {
        match flag {
            "item" => draft.item = value.to_string(),
            other => return Err(unknown_flag::<Self>(other)),
        }
        Ok(())
    }

    fn describe(&self) -> String {
        truncate_string(&self.item, TEXT_WIDTH)
    }
}

impl CliResource for Expense {
    const NAME: &'static str = "expense";
    const PLURAL: &'static str = "expenses";
    const FLAGS: &'static [&'static str] = &["category", "amount"];

    fn apply(draft: &mut ExpenseDraft, flag: &str, value: &str) -> Result<()> {
        match flag {
            "category" => draft.category = value.to_string(),
            // Parsed on save so a bad amount reports as a field error
            "amount" => draft.amount = value.to_string(),
            other => return Err(unknown_flag::<Self>(other)),
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("{}: {}", truncate_string(&self.category, TEXT_WIDTH), format_amount(self.amount))
    }
}

impl CliResource for Memory {
    const NAME: &'static str = "memory";
    const PLURAL: &'static str = "memories";
    const FLAGS: &'static [&'static str] = &["uri", "note"];

    fn apply(draft: &mut MemoryDraft, flag: &str, value: &str) -> Result<()> {
        match flag {
            "uri" => draft.uri = value.to_string(),
            "note" => draft.note = value.to_string(),
            other => return Err(unknown_flag::<Self>(other)),
        }
        Ok(())
    }

    fn describe(&self) -> String {
        if self.note.is_empty() {
            self.uri.clone()
        } else {
            format!("{}  \"{}\"", self.uri, truncate_string(&self.note, TEXT_WIDTH))
        }
    }
}

/// Split `--flag value` pairs.
pub fn parse_flags(args: &[String]) -> Result<Vec<(String, String)>> {
    let mut flags = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let Some(name) = arg.strip_prefix("--") else {
            bail!("Expected a --field flag, got '{}'", arg);
        };
        let value = iter
            .next()
            .ok_or_else(|| anyhow!("Missing value for --{}", name))?;
        flags.push((name.to_string(), value.clone()));
    }
    Ok(flags)
}

/// Apply every flag to `draft`, stopping at the first bad one.
pub fn apply_flags<T: CliResource>(draft: &mut T::Draft, flags: &[(String, String)]) -> Result<()> {
    for (flag, value) in flags {
        T::apply(draft, flag, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_parse_flags() {
        let flags = parse_flags(&args(&["--name", "Goa", "--date", "2030-01-05 09:00"])).unwrap();
        assert_eq!(flags, vec![
            ("name".to_string(), "Goa".to_string()),
            ("date".to_string(), "2030-01-05 09:00".to_string()),
        ]);
        assert!(parse_flags(&args(&["Goa"])).is_err());
        assert!(parse_flags(&args(&["--name"])).is_err());
    }

    #[test]
    fn test_apply_trip_flags() {
        let mut draft = TripDraft::default();
        let flags = parse_flags(&args(&["--name", "Goa", "--date", "2030-01-05T09:00:00Z"])).unwrap();
        apply_flags::<Trip>(&mut draft, &flags).unwrap();
        assert_eq!(draft.name, "Goa");
        assert!(draft.date.is_some());

        let err = Trip::apply(&mut draft, "date", "soon").unwrap_err();
        assert!(err.to_string().contains("Invalid date"));
        let err = Trip::apply(&mut draft, "budget", "10").unwrap_err();
        assert!(err.to_string().contains("--name, --date"));
    }

    #[test]
    fn test_edit_keeps_unset_fields() {
        let expense = Expense { category: "Food".into(), amount: 12.5 };
        let mut draft = expense.to_draft();
        Expense::apply(&mut draft, "amount", "20").unwrap();
        assert_eq!(draft.category, "Food");
        assert_eq!(draft.amount, "20");
    }

    #[test]
    fn test_describe() {
        let expense = Expense { category: "Food".into(), amount: 12.5 };
        assert_eq!(expense.describe(), "Food: ₹12.50");
        let memory = Memory { uri: "file:///beach.jpg".into(), note: String::new() };
        assert_eq!(memory.describe(), "file:///beach.jpg");
    }
}
