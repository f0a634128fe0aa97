//! SLA clock
//!
//! Deadlines are measured in business days: weekends and configured
//! holidays never count, and work submitted at or after the 17:00
//! cutoff starts counting from the next business day. Pausing freezes
//! the clock; resuming pushes the deadline out by exactly the paused
//! duration, in whole milliseconds — paused time is added back, never
//! lost.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Timelike, Utc, Weekday};
use linden_types::{ProjectState, Proposal};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Hour at which a business day ends
pub const DEFAULT_CUTOFF_HOUR: u32 = 17;
/// Remaining time at or below which a deadline is flagged at-risk
pub const DEFAULT_AT_RISK_HOURS: i64 = 48;

/// Business-day calendar: weekends plus configured holidays are
/// non-working days.
#[derive(Clone, Debug, Default)]
pub struct BusinessCalendar {
    holidays: BTreeSet<NaiveDate>,
}

impl BusinessCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_holidays(holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            holidays: holidays.into_iter().collect(),
        }
    }

    pub fn add_holiday(&mut self, date: NaiveDate) {
        self.holidays.insert(date);
    }

    pub fn is_business_day(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !self.holidays.contains(&date)
    }

    /// The next business day strictly after `date`.
    pub fn next_business_day(&self, date: NaiveDate) -> NaiveDate {
        let mut current = date.succ_opt().expect("date within supported range");
        while !self.is_business_day(current) {
            current = current.succ_opt().expect("date within supported range");
        }
        current
    }

    /// Advance `n` business days from `date`. `n = 0` returns `date`
    /// unchanged, even if it is not a business day.
    pub fn add_business_days(&self, date: NaiveDate, n: u32) -> NaiveDate {
        let mut current = date;
        let mut added = 0;
        while added < n {
            current = current.succ_opt().expect("date within supported range");
            if self.is_business_day(current) {
                added += 1;
            }
        }
        current
    }
}

/// Per-state SLA durations and thresholds
#[derive(Clone, Debug)]
pub struct SlaConfig {
    /// Business days allowed per state; states absent here carry no SLA
    pub durations: BTreeMap<ProjectState, u32>,
    pub cutoff_hour: u32,
    pub at_risk_hours: i64,
}

impl Default for SlaConfig {
    fn default() -> Self {
        let durations = BTreeMap::from([
            (ProjectState::FacultyReview, 5),
            (ProjectState::SchoolSelectionReview, 5),
            (ProjectState::OutlineCouncilReview, 7),
            (ProjectState::ChangesRequested, 10),
            (ProjectState::FacultyAcceptanceReview, 5),
            (ProjectState::SchoolAcceptanceReview, 7),
            (ProjectState::Handover, 5),
        ]);
        Self {
            durations,
            cutoff_hour: DEFAULT_CUTOFF_HOUR,
            at_risk_hours: DEFAULT_AT_RISK_HOURS,
        }
    }
}

/// Deadline status reported to dashboards and queue views
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlaStatus {
    #[serde(rename = "OK")]
    OnTrack,
    AtRisk,
    Overdue,
    Paused,
}

/// An SLA window opened on entry to an SLA-bearing state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlaWindow {
    pub started_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
}

/// Computes deadlines and pause/resume accounting
#[derive(Clone, Debug, Default)]
pub struct SlaClock {
    config: SlaConfig,
    calendar: BusinessCalendar,
}

impl SlaClock {
    pub fn new(config: SlaConfig, calendar: BusinessCalendar) -> Self {
        // Out-of-range cutoff would make deadline construction fail
        let cutoff_hour = config.cutoff_hour.min(23);
        Self {
            config: SlaConfig {
                cutoff_hour,
                ..config
            },
            calendar,
        }
    }

    /// Open an SLA window for a proposal entering `state`, or `None`
    /// for states without a configured duration.
    pub fn start(&self, state: ProjectState, now: DateTime<Utc>) -> Option<SlaWindow> {
        let days = *self.config.durations.get(&state)?;
        Some(SlaWindow {
            started_at: now,
            deadline: self.deadline_from(now, days),
        })
    }

    /// Deadline after `business_days` business days, with cutoff
    /// handling: a start at or after the cutoff hour counts from the
    /// next business day.
    pub fn deadline_from(&self, start: DateTime<Utc>, business_days: u32) -> DateTime<Utc> {
        let mut count_from = start.date_naive();
        if start.hour() >= self.config.cutoff_hour {
            count_from = self.calendar.next_business_day(count_from);
        }

        let deadline_date = if business_days == 0 {
            count_from
        } else {
            self.calendar.add_business_days(count_from, business_days - 1)
        };

        let naive = deadline_date
            .and_hms_opt(self.config.cutoff_hour, 0, 0)
            .expect("cutoff hour within 0..=23");
        Utc.from_utc_datetime(&naive)
    }

    /// New deadline after resuming at `now` a clock paused at
    /// `paused_at`: the paused duration is added back, in whole
    /// milliseconds so the deadline and the cumulative paused counter
    /// can never disagree.
    pub fn resume_deadline(
        &self,
        deadline: DateTime<Utc>,
        paused_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> DateTime<Utc> {
        deadline + Duration::milliseconds((now - paused_at).num_milliseconds())
    }

    /// Deadline status for a proposal at `now`. `Paused` overrides the
    /// time-based statuses; proposals without a window are on track.
    pub fn status(&self, proposal: &Proposal, now: DateTime<Utc>) -> SlaStatus {
        if proposal.is_paused() || proposal.sla_paused_at.is_some() {
            return SlaStatus::Paused;
        }
        let Some(deadline) = proposal.sla_deadline else {
            return SlaStatus::OnTrack;
        };
        if now > deadline {
            return SlaStatus::Overdue;
        }
        if deadline - now <= Duration::hours(self.config.at_risk_hours) {
            return SlaStatus::AtRisk;
        }
        SlaStatus::OnTrack
    }
}
