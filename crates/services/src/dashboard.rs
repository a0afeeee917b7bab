//! Read-side aggregation over bookings: counters, earnings, contiguous time
//! series and peak hours. All figures are recomputed on every request.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, Timelike, Utc};
use domains::{
    Actor, Booking, BookingStatus, Clock, DomainError, Result, SportType, UserRepo, UserRole,
    VenueRepo, VenueStatus,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::access::require_admin;
use crate::booking::{BookingService, OwnerBookingQuery};
use crate::venue::VenueService;
use crate::Ports;

pub const DEFAULT_COMMISSION_PERCENT: u32 = 10;
/// Upper bound on buckets per chart request.
pub const MAX_BUCKETS: usize = 400;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Earnings {
    pub revenue: i64,
    pub commission: i64,
    pub net: i64,
}

impl Earnings {
    /// Commission is rounded half-up to the minor unit; net absorbs the remainder.
    pub fn from_revenue(revenue: i64, commission_percent: u32) -> Self {
        let pct = i128::from(commission_percent.min(100));
        let commission = (i128::from(revenue) * pct + 50).div_euclid(100);
        // |commission| <= |revenue| while pct <= 100
        let commission = i64::try_from(commission).unwrap_or(revenue);
        Self { revenue, commission, net: revenue.saturating_sub(commission) }
    }
}

fn revenue_of<'a>(bookings: impl IntoIterator<Item = &'a Booking>) -> i64 {
    bookings
        .into_iter()
        .filter(|b| b.status.is_billable())
        .fold(0i64, |acc, b| acc.saturating_add(b.total_amount))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub total: u64,
    pub confirmed: u64,
    pub completed: u64,
    pub cancelled: u64,
}

impl StatusCounts {
    pub fn tally<'a>(bookings: impl IntoIterator<Item = &'a Booking>) -> Self {
        bookings.into_iter().fold(Self::default(), |mut acc, b| {
            acc.total += 1;
            match b.status {
                BookingStatus::Confirmed => acc.confirmed += 1,
                BookingStatus::Completed => acc.completed += 1,
                BookingStatus::Cancelled => acc.cancelled += 1,
            }
            acc
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingStats {
    pub counts: StatusCounts,
    /// Non-cancelled bookings dated today
    pub today: u64,
    /// Confirmed bookings that have not started yet
    pub upcoming: u64,
    /// Non-cancelled bookings dated in the current calendar month
    pub this_month: u64,
    pub earnings: Earnings,
    pub month_earnings: Earnings,
    pub commission_percent: u32,
}

pub fn summarize(bookings: &[Booking], now: DateTime<Utc>, commission_percent: u32) -> BookingStats {
    let today = now.date_naive();
    let now_naive = now.naive_utc();
    let same_month = |d: NaiveDate| d.year() == today.year() && d.month() == today.month();

    let billable = || bookings.iter().filter(|b| b.status.is_billable());
    let month: Vec<&Booking> = billable().filter(|b| same_month(b.date)).collect();

    BookingStats {
        counts: StatusCounts::tally(bookings),
        today: billable().filter(|b| b.date == today).count() as u64,
        upcoming: bookings
            .iter()
            .filter(|b| b.status == BookingStatus::Confirmed && b.starts_at() > now_naive)
            .count() as u64,
        this_month: month.len() as u64,
        earnings: Earnings::from_revenue(revenue_of(bookings), commission_percent),
        month_earnings: Earnings::from_revenue(revenue_of(month), commission_percent),
        commission_percent,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Daily,
    Weekly,
    Monthly,
}

impl Granularity {
    /// First day of the bucket containing `date`. Weeks start on Monday.
    pub fn bucket_start(self, date: NaiveDate) -> NaiveDate {
        match self {
            Granularity::Daily => date,
            Granularity::Weekly => date - Days::new(u64::from(date.weekday().num_days_from_monday())),
            Granularity::Monthly => date.with_day(1).unwrap_or(date),
        }
    }

    /// Last day of the bucket containing `date`.
    pub fn bucket_end(self, date: NaiveDate) -> Option<NaiveDate> {
        self.next_bucket(self.bucket_start(date)).and_then(|next| next.pred_opt())
    }

    pub fn next_bucket(self, start: NaiveDate) -> Option<NaiveDate> {
        match self {
            Granularity::Daily => start.checked_add_days(Days::new(1)),
            Granularity::Weekly => start.checked_add_days(Days::new(7)),
            Granularity::Monthly => start.checked_add_months(Months::new(1)),
        }
    }

    /// Window used when the caller gives no explicit start.
    fn default_from(self, to: NaiveDate) -> NaiveDate {
        let from = match self {
            Granularity::Daily => to.checked_sub_days(Days::new(6)),
            Granularity::Weekly => to.checked_sub_days(Days::new(7 * 7)),
            Granularity::Monthly => to.checked_sub_months(Months::new(11)),
        };
        self.bucket_start(from.unwrap_or(to))
    }

    fn label(self, start: NaiveDate) -> String {
        match self {
            Granularity::Daily | Granularity::Weekly => start.format("%Y-%m-%d").to_string(),
            Granularity::Monthly => start.format("%Y-%m").to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeBucket {
    pub label: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub bookings: u64,
    pub earnings: Earnings,
}

/// Contiguous, zero-filled buckets covering every period touching `[from, to]`.
/// Each bucket counts its whole period, so the first and last buckets may
/// include bookings outside `[from, to]`. Cancelled bookings are excluded.
pub fn time_series(
    bookings: &[Booking],
    granularity: Granularity,
    from: NaiveDate,
    to: NaiveDate,
    commission_percent: u32,
) -> Result<Vec<TimeBucket>> {
    if from > to {
        return Err(DomainError::Validation("chart window start must not be after its end".into()));
    }

    let first = granularity.bucket_start(from);
    let last = granularity
        .bucket_end(to)
        .ok_or_else(|| DomainError::Validation("chart window is out of range".into()))?;

    let mut per_bucket: HashMap<NaiveDate, (u64, i64)> = HashMap::new();
    for b in bookings.iter().filter(|b| b.status.is_billable() && b.date >= first && b.date <= last) {
        let entry = per_bucket.entry(granularity.bucket_start(b.date)).or_default();
        entry.0 += 1;
        entry.1 = entry.1.saturating_add(b.total_amount);
    }

    let mut buckets = Vec::new();
    let mut start = first;
    while start <= to {
        if buckets.len() >= MAX_BUCKETS {
            return Err(DomainError::Validation(format!(
                "chart window spans more than {MAX_BUCKETS} {granularity:?} buckets"
            )));
        }
        let next = granularity
            .next_bucket(start)
            .ok_or_else(|| DomainError::Validation("chart window is out of range".into()))?;
        let (count, revenue) = per_bucket.get(&start).copied().unwrap_or_default();
        buckets.push(TimeBucket {
            label: granularity.label(start),
            period_start: start,
            period_end: next.pred_opt().unwrap_or(start),
            bookings: count,
            earnings: Earnings::from_revenue(revenue, commission_percent),
        });
        start = next;
    }
    Ok(buckets)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HourBucket {
    pub hour: u32,
    pub bookings: u64,
}

/// 24 buckets by start hour, regardless of date. Cancelled bookings are excluded.
pub fn peak_hours(bookings: &[Booking]) -> Vec<HourBucket> {
    let mut counts = [0u64; 24];
    for b in bookings.iter().filter(|b| b.status.is_billable()) {
        counts[b.start_time.hour() as usize] += 1;
    }
    counts
        .iter()
        .enumerate()
        .map(|(hour, &bookings)| HourBucket { hour: hour as u32, bookings })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SportBucket {
    pub sport: SportType,
    pub bookings: u64,
    pub revenue: i64,
}

pub fn by_sport(bookings: &[Booking]) -> Vec<SportBucket> {
    let mut per_sport: BTreeMap<SportType, (u64, i64)> = BTreeMap::new();
    for b in bookings.iter().filter(|b| b.status.is_billable()) {
        let entry = per_sport.entry(b.sport_type).or_default();
        entry.0 += 1;
        entry.1 = entry.1.saturating_add(b.total_amount);
    }
    per_sport
        .into_iter()
        .map(|(sport, (bookings, revenue))| SportBucket { sport, bookings, revenue })
        .collect()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChartQuery {
    pub granularity: Option<Granularity>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub venue_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Charts {
    pub granularity: Granularity,
    /// First day of the first bucket
    pub from: NaiveDate,
    /// Last day of the last bucket
    pub to: NaiveDate,
    pub series: Vec<TimeBucket>,
    pub peak_hours: Vec<HourBucket>,
    pub by_sport: Vec<SportBucket>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlatformStats {
    pub users_by_role: BTreeMap<String, u64>,
    pub venues_by_status: BTreeMap<String, u64>,
    pub bookings: BookingStats,
}

#[derive(Clone)]
pub struct DashboardService {
    bookings: BookingService,
    venues: VenueService,
    users: Arc<dyn UserRepo>,
    venue_repo: Arc<dyn VenueRepo>,
    clock: Arc<dyn Clock>,
    commission_percent: u32,
}

impl DashboardService {
    pub fn new(ports: &Ports, bookings: BookingService, commission_percent: u32) -> Self {
        Self {
            bookings,
            venues: VenueService::new(ports),
            users: ports.users.clone(),
            venue_repo: ports.venues.clone(),
            clock: ports.clock.clone(),
            commission_percent,
        }
    }

    pub fn commission_percent(&self) -> u32 {
        self.commission_percent
    }

    async fn scoped_bookings(&self, actor: &Actor, query: &OwnerBookingQuery) -> Result<Vec<Booking>> {
        let venue_ids = self.venues.managed_venue_ids(actor).await?;
        self.bookings.fetch_for_venues(venue_ids, query).await
    }

    pub async fn stats(&self, actor: &Actor, venue_id: Option<Uuid>) -> Result<BookingStats> {
        let query = OwnerBookingQuery { venue_id, ..OwnerBookingQuery::default() };
        let bookings = self.scoped_bookings(actor, &query).await?;
        Ok(summarize(&bookings, self.clock.now(), self.commission_percent))
    }

    pub async fn charts(&self, actor: &Actor, query: ChartQuery) -> Result<Charts> {
        let granularity = query.granularity.unwrap_or(Granularity::Daily);
        let to = query.to.unwrap_or_else(|| self.clock.now().date_naive());
        let from = query.from.unwrap_or_else(|| granularity.default_from(to));
        let series_from = granularity.bucket_start(from);
        let series_to = granularity.bucket_end(to).unwrap_or(to);

        let scope = OwnerBookingQuery {
            venue_id: query.venue_id,
            date_from: Some(series_from),
            date_to: Some(series_to),
            ..OwnerBookingQuery::default()
        };
        let bookings = self.scoped_bookings(actor, &scope).await?;
        let series = time_series(&bookings, granularity, from, to, self.commission_percent)?;
        Ok(Charts {
            granularity,
            from: series_from,
            to: series_to,
            series,
            peak_hours: peak_hours(&bookings),
            by_sport: by_sport(&bookings),
        })
    }

    pub async fn platform(&self, actor: &Actor) -> Result<PlatformStats> {
        require_admin(actor)?;
        let mut users_by_role: BTreeMap<String, u64> =
            UserRole::ALL.iter().map(|r| (r.as_str().to_string(), 0)).collect();
        for (role, count) in self.users.count_by_role().await? {
            users_by_role.insert(role.as_str().to_string(), count);
        }
        let mut venues_by_status: BTreeMap<String, u64> =
            VenueStatus::ALL.iter().map(|s| (s.as_str().to_string(), 0)).collect();
        for (status, count) in self.venue_repo.count_by_status().await? {
            venues_by_status.insert(status.as_str().to_string(), count);
        }
        let bookings = self.bookings.fetch_for_venues(None, &OwnerBookingQuery::default()).await?;
        Ok(PlatformStats {
            users_by_role,
            venues_by_status,
            bookings: summarize(&bookings, self.clock.now(), self.commission_percent),
        })
    }
}
