use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{require_text, Resource, ValidationError};

/// How long before departure the trip reminder fires.
pub const REMINDER_LEAD_MINUTES: i64 = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub name: String,
    pub date: DateTime<Utc>,
}

/// Form state for a trip. The date starts unset, so a fresh draft never
/// passes validation until a departure time is picked.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TripDraft {
    pub name: String,
    pub date: Option<DateTime<Utc>>,
}

impl Trip {
    /// When the "starts in 1 hour" reminder should fire.
    pub fn reminder_at(&self) -> DateTime<Utc> {
        self.date - Duration::minutes(REMINDER_LEAD_MINUTES)
    }

    pub fn reminder_message(&self) -> String {
        format!("Your trip to {} starts in 1 hour!", self.name)
    }

    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        self.date > now
    }
}

impl Resource for Trip {
    const COLLECTION: &'static str = "trips";

    // Trips are shared across users in the backing collection
    const OWNER_SCOPED: bool = false;

    type Draft = TripDraft;

    fn to_draft(&self) -> TripDraft {
        TripDraft {
            name: self.name.clone(),
            date: Some(self.date),
        }
    }

    fn from_draft(draft: &TripDraft, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        let name = require_text("name", &draft.name)?;
        let date = draft
            .date
            .ok_or_else(|| ValidationError::new("date", "pick a departure date and time"))?;
        if date <= now {
            return Err(ValidationError::new("date", "must be in the future"));
        }
        Ok(Trip { name, date })
    }
}
