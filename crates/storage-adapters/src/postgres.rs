//! # PostgreSQL store
//!
//! sqlx implementations of the repository ports. Enum-like columns hold the
//! wire names from `domains::models::enums`; money is BIGINT minor units.
//!
//! Booking creation runs in a SERIALIZABLE transaction (overlap check, then
//! insert). The `EXCLUDE USING gist` constraint in the schema backs it up, so
//! a serialization failure or exclusion violation both surface as `Conflict`.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use domains::{
    Booking, BookingFilter, BookingRepo, BookingStatus, Court, CourtRepo, DomainError, GeoPoint, ImageRepo,
    OperatingHours, Page, Paginated, Result, Review, ReviewRepo, SlotDuration, Unavailability,
    UnavailabilityRepo, User, UserFilter, UserRepo, UserRole, Venue, VenueDetails, VenueFilter, VenueImage,
    VenueRepo, VenueStatus,
};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder, Row};
use uuid::Uuid;

/// Maps driver errors onto the domain taxonomy.
fn db_err(e: sqlx::Error) -> DomainError {
    match &e {
        sqlx::Error::Database(db) => match db.code().as_deref() {
            // serialization_failure, deadlock_detected
            Some("40001") | Some("40P01") => {
                DomainError::Conflict("the slot was taken by a concurrent request".into())
            }
            // exclusion_violation
            Some("23P01") => DomainError::Conflict("the court is already booked for that time".into()),
            // unique_violation
            Some("23505") => DomainError::Conflict(format!(
                "duplicate record ({})",
                db.constraint().unwrap_or("unique constraint")
            )),
            _ => DomainError::Internal(format!("database error: {e}")),
        },
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => DomainError::Upstream(format!("database unavailable: {e}")),
        _ => DomainError::Internal(format!("database error: {e}")),
    }
}

fn parse<T: FromStr<Err = DomainError>>(value: String) -> Result<T> {
    value
        .parse()
        .map_err(|e: DomainError| DomainError::Internal(format!("corrupt stored value: {e}")))
}

fn to_i32(value: u32) -> Result<i32> {
    i32::try_from(value).map_err(|_| DomainError::Validation(format!("{value} is out of range")))
}

fn slot_duration(row: &PgRow) -> Result<SlotDuration> {
    let minutes: i32 = row.try_get("slot_minutes").map_err(db_err)?;
    u32::try_from(minutes)
        .map_err(|_| DomainError::Internal(format!("corrupt slot length {minutes}")))
        .and_then(SlotDuration::try_from)
}

/// Connection pool plus migrations. Repositories are cheap views over the pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(url: &str, max_connections: u32, acquire_timeout: Duration) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await
            .map_err(db_err)?;
        tracing::info!(max_connections, "connected to postgres");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DomainError::Internal(format!("migration failed: {e}")))
    }

    pub fn users(&self) -> PgUserRepo {
        PgUserRepo { pool: self.pool.clone() }
    }

    pub fn venues(&self) -> PgVenueRepo {
        PgVenueRepo { pool: self.pool.clone() }
    }

    pub fn courts(&self) -> PgCourtRepo {
        PgCourtRepo { pool: self.pool.clone() }
    }

    pub fn bookings(&self) -> PgBookingRepo {
        PgBookingRepo { pool: self.pool.clone() }
    }

    pub fn reviews(&self) -> PgReviewRepo {
        PgReviewRepo { pool: self.pool.clone() }
    }

    pub fn unavailability(&self) -> PgUnavailabilityRepo {
        PgUnavailabilityRepo { pool: self.pool.clone() }
    }

    pub fn images(&self) -> PgImageRepo {
        PgImageRepo { pool: self.pool.clone() }
    }
}

async fn count(pool: &PgPool, mut qb: QueryBuilder<'_, Postgres>) -> Result<u64> {
    let total: i64 = qb.build().fetch_one(pool).await.map_err(db_err)?.try_get(0).map_err(db_err)?;
    Ok(u64::try_from(total).unwrap_or_default())
}

fn push_page(qb: &mut QueryBuilder<'_, Postgres>, page: Page) {
    let page = page.clamped();
    qb.push(" LIMIT ").push_bind(i64::from(page.limit));
    qb.push(" OFFSET ").push_bind(page.offset() as i64);
}

// ── Users ───────────────────────────────────────────────────────────────────

pub struct PgUserRepo {
    pool: PgPool,
}

const USER_COLUMNS: &str = "id, external_id, email, display_name, role, is_active, created_at, updated_at";

fn user_from_row(row: &PgRow) -> Result<User> {
    Ok(User {
        id: row.try_get("id").map_err(db_err)?,
        external_id: row.try_get("external_id").map_err(db_err)?,
        email: row.try_get("email").map_err(db_err)?,
        display_name: row.try_get("display_name").map_err(db_err)?,
        role: parse(row.try_get("role").map_err(db_err)?)?,
        is_active: row.try_get("is_active").map_err(db_err)?,
        created_at: row.try_get("created_at").map_err(db_err)?,
        updated_at: row.try_get("updated_at").map_err(db_err)?,
    })
}

fn push_user_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &UserFilter) {
    qb.push(" WHERE TRUE");
    if let Some(role) = filter.role {
        qb.push(" AND role = ").push_bind(role.as_str());
    }
    if let Some(active) = filter.is_active {
        qb.push(" AND is_active = ").push_bind(active);
    }
    if let Some(needle) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", needle.to_lowercase());
        qb.push(" AND (LOWER(email) LIKE ").push_bind(pattern.clone());
        qb.push(" OR LOWER(display_name) LIKE ").push_bind(pattern).push(")");
    }
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE external_id = $1"))
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn insert(&self, user: User) -> Result<User> {
        sqlx::query(
            "INSERT INTO users (id, external_id, email, display_name, role, is_active, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(user.id)
        .bind(&user.external_id)
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(user.role.as_str())
        .bind(user.is_active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(user)
    }

    async fn update(&self, user: &User) -> Result<()> {
        let result = sqlx::query(
            "UPDATE users SET email = $2, display_name = $3, role = $4, is_active = $5, updated_at = $6 WHERE id = $1",
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(user.role.as_str())
        .bind(user.is_active)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("User", user.id));
        }
        Ok(())
    }

    async fn list(&self, filter: &UserFilter, page: Page) -> Result<Paginated<User>> {
        let mut counter = QueryBuilder::new("SELECT COUNT(*) FROM users");
        push_user_filter(&mut counter, filter);
        let total = count(&self.pool, counter).await?;

        let mut qb = QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM users"));
        push_user_filter(&mut qb, filter);
        qb.push(" ORDER BY created_at DESC, email");
        push_page(&mut qb, page);
        let rows = qb.build().fetch_all(&self.pool).await.map_err(db_err)?;
        let users = rows.iter().map(user_from_row).collect::<Result<Vec<_>>>()?;
        Ok(Paginated::new(users, total, page))
    }

    async fn count_by_role(&self) -> Result<Vec<(UserRole, u64)>> {
        let rows = sqlx::query("SELECT role, COUNT(*) AS n FROM users GROUP BY role")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter()
            .map(|row| {
                let role = parse(row.try_get("role").map_err(db_err)?)?;
                let n: i64 = row.try_get("n").map_err(db_err)?;
                Ok((role, n as u64))
            })
            .collect()
    }
}

// ── Venues ──────────────────────────────────────────────────────────────────

pub struct PgVenueRepo {
    pool: PgPool,
}

const VENUE_COLUMNS: &str = "id, owner_id, name, description, address, latitude, longitude, venue_type, sports, \
     amenities, images, operating_hours, status, rejection_reason, is_active, created_at, updated_at";

fn venue_from_row(row: &PgRow) -> Result<Venue> {
    let latitude: Option<f64> = row.try_get("latitude").map_err(db_err)?;
    let longitude: Option<f64> = row.try_get("longitude").map_err(db_err)?;
    let sports: Vec<String> = row.try_get("sports").map_err(db_err)?;
    let images: Json<Vec<VenueImage>> = row.try_get("images").map_err(db_err)?;
    let hours: Json<Vec<OperatingHours>> = row.try_get("operating_hours").map_err(db_err)?;
    Ok(Venue {
        id: row.try_get("id").map_err(db_err)?,
        owner_id: row.try_get("owner_id").map_err(db_err)?,
        details: VenueDetails {
            name: row.try_get("name").map_err(db_err)?,
            description: row.try_get("description").map_err(db_err)?,
            address: row.try_get("address").map_err(db_err)?,
            location: latitude.zip(longitude).map(|(latitude, longitude)| GeoPoint { latitude, longitude }),
            venue_type: parse(row.try_get("venue_type").map_err(db_err)?)?,
            sports: sports.into_iter().map(parse).collect::<Result<Vec<_>>>()?,
            amenities: row.try_get("amenities").map_err(db_err)?,
            images: images.0,
            operating_hours: hours.0,
        },
        status: parse(row.try_get("status").map_err(db_err)?)?,
        rejection_reason: row.try_get("rejection_reason").map_err(db_err)?,
        is_active: row.try_get("is_active").map_err(db_err)?,
        created_at: row.try_get("created_at").map_err(db_err)?,
        updated_at: row.try_get("updated_at").map_err(db_err)?,
    })
}

fn push_venue_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &VenueFilter) {
    qb.push(" WHERE TRUE");
    if filter.public_only {
        qb.push(" AND status = 'approved' AND is_active");
    }
    if let Some(owner) = filter.owner_id {
        qb.push(" AND owner_id = ").push_bind(owner);
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(sport) = filter.sport {
        qb.push(" AND ").push_bind(sport.as_str()).push(" = ANY(sports)");
    }
    if let Some(venue_type) = filter.venue_type {
        qb.push(" AND venue_type = ").push_bind(venue_type.as_str());
    }
    if let Some(needle) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", needle.to_lowercase());
        qb.push(" AND (LOWER(name) LIKE ").push_bind(pattern.clone());
        qb.push(" OR LOWER(address) LIKE ").push_bind(pattern).push(")");
    }
}

fn sport_names(venue: &Venue) -> Vec<String> {
    venue.details.sports.iter().map(|s| s.as_str().to_string()).collect()
}

#[async_trait]
impl VenueRepo for PgVenueRepo {
    async fn insert(&self, venue: Venue) -> Result<Venue> {
        let d = &venue.details;
        sqlx::query(
            "INSERT INTO venues (id, owner_id, name, description, address, latitude, longitude, venue_type, sports,
                                 amenities, images, operating_hours, status, rejection_reason, is_active,
                                 created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)",
        )
        .bind(venue.id)
        .bind(venue.owner_id)
        .bind(&d.name)
        .bind(&d.description)
        .bind(&d.address)
        .bind(d.location.map(|l| l.latitude))
        .bind(d.location.map(|l| l.longitude))
        .bind(d.venue_type.as_str())
        .bind(sport_names(&venue))
        .bind(&d.amenities)
        .bind(Json(&d.images))
        .bind(Json(&d.operating_hours))
        .bind(venue.status.as_str())
        .bind(&venue.rejection_reason)
        .bind(venue.is_active)
        .bind(venue.created_at)
        .bind(venue.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(venue)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Venue>> {
        let row = sqlx::query(&format!("SELECT {VENUE_COLUMNS} FROM venues WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(venue_from_row).transpose()
    }

    async fn update(&self, venue: &Venue) -> Result<()> {
        let d = &venue.details;
        let result = sqlx::query(
            "UPDATE venues SET name = $2, description = $3, address = $4, latitude = $5, longitude = $6,
                    venue_type = $7, sports = $8, amenities = $9, images = $10, operating_hours = $11,
                    status = $12, rejection_reason = $13, is_active = $14, updated_at = $15
             WHERE id = $1",
        )
        .bind(venue.id)
        .bind(&d.name)
        .bind(&d.description)
        .bind(&d.address)
        .bind(d.location.map(|l| l.latitude))
        .bind(d.location.map(|l| l.longitude))
        .bind(d.venue_type.as_str())
        .bind(sport_names(venue))
        .bind(&d.amenities)
        .bind(Json(&d.images))
        .bind(Json(&d.operating_hours))
        .bind(venue.status.as_str())
        .bind(&venue.rejection_reason)
        .bind(venue.is_active)
        .bind(venue.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("Venue", venue.id));
        }
        Ok(())
    }

    async fn list(&self, filter: &VenueFilter, page: Page) -> Result<Paginated<Venue>> {
        let mut counter = QueryBuilder::new("SELECT COUNT(*) FROM venues");
        push_venue_filter(&mut counter, filter);
        let total = count(&self.pool, counter).await?;

        let mut qb = QueryBuilder::new(format!("SELECT {VENUE_COLUMNS} FROM venues"));
        push_venue_filter(&mut qb, filter);
        qb.push(" ORDER BY created_at DESC, id");
        push_page(&mut qb, page);
        let rows = qb.build().fetch_all(&self.pool).await.map_err(db_err)?;
        let venues = rows.iter().map(venue_from_row).collect::<Result<Vec<_>>>()?;
        Ok(Paginated::new(venues, total, page))
    }

    async fn list_ids_by_owner(&self, owner_id: Uuid) -> Result<Vec<Uuid>> {
        sqlx::query_scalar("SELECT id FROM venues WHERE owner_id = $1")
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn count_by_status(&self) -> Result<Vec<(VenueStatus, u64)>> {
        let rows = sqlx::query("SELECT status, COUNT(*) AS n FROM venues GROUP BY status")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter()
            .map(|row| {
                let status = parse(row.try_get("status").map_err(db_err)?)?;
                let n: i64 = row.try_get("n").map_err(db_err)?;
                Ok((status, n as u64))
            })
            .collect()
    }

    async fn image_in_use(&self, image_id: &str) -> Result<bool> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM venues v, jsonb_array_elements(v.images) img WHERE img->>'id' = $1)",
        )
        .bind(image_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }
}

// ── Courts ──────────────────────────────────────────────────────────────────

pub struct PgCourtRepo {
    pool: PgPool,
}

const COURT_COLUMNS: &str =
    "id, venue_id, name, sport_type, slot_minutes, price_per_slot, is_active, created_at, updated_at";

fn court_from_row(row: &PgRow) -> Result<Court> {
    Ok(Court {
        id: row.try_get("id").map_err(db_err)?,
        venue_id: row.try_get("venue_id").map_err(db_err)?,
        name: row.try_get("name").map_err(db_err)?,
        sport_type: parse(row.try_get("sport_type").map_err(db_err)?)?,
        slot_duration: slot_duration(row)?,
        price_per_slot: row.try_get("price_per_slot").map_err(db_err)?,
        is_active: row.try_get("is_active").map_err(db_err)?,
        created_at: row.try_get("created_at").map_err(db_err)?,
        updated_at: row.try_get("updated_at").map_err(db_err)?,
    })
}

#[async_trait]
impl CourtRepo for PgCourtRepo {
    async fn insert(&self, court: Court) -> Result<Court> {
        sqlx::query(
            "INSERT INTO courts (id, venue_id, name, sport_type, slot_minutes, price_per_slot, is_active, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(court.id)
        .bind(court.venue_id)
        .bind(&court.name)
        .bind(court.sport_type.as_str())
        .bind(to_i32(court.slot_duration.minutes())?)
        .bind(court.price_per_slot)
        .bind(court.is_active)
        .bind(court.created_at)
        .bind(court.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(court)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Court>> {
        let row = sqlx::query(&format!("SELECT {COURT_COLUMNS} FROM courts WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(court_from_row).transpose()
    }

    async fn update(&self, court: &Court) -> Result<()> {
        let result = sqlx::query(
            "UPDATE courts SET name = $2, sport_type = $3, slot_minutes = $4, price_per_slot = $5,
                    is_active = $6, updated_at = $7
             WHERE id = $1",
        )
        .bind(court.id)
        .bind(&court.name)
        .bind(court.sport_type.as_str())
        .bind(to_i32(court.slot_duration.minutes())?)
        .bind(court.price_per_slot)
        .bind(court.is_active)
        .bind(court.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("Court", court.id));
        }
        Ok(())
    }

    async fn list_by_venue(&self, venue_id: Uuid) -> Result<Vec<Court>> {
        let rows = sqlx::query(&format!("SELECT {COURT_COLUMNS} FROM courts WHERE venue_id = $1 ORDER BY name"))
            .bind(venue_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter().map(court_from_row).collect()
    }
}

// ── Bookings ────────────────────────────────────────────────────────────────

pub struct PgBookingRepo {
    pool: PgPool,
}

const BOOKING_COLUMNS: &str = "id, user_id, venue_id, court_id, sport_type, date, start_time, end_time, slot_count, \
     slot_minutes, total_amount, status, cancellation_reason, cancelled_at, completed_at, payment_simulated, created_at";

fn booking_from_row(row: &PgRow) -> Result<Booking> {
    let slot_count: i32 = row.try_get("slot_count").map_err(db_err)?;
    Ok(Booking {
        id: row.try_get("id").map_err(db_err)?,
        user_id: row.try_get("user_id").map_err(db_err)?,
        venue_id: row.try_get("venue_id").map_err(db_err)?,
        court_id: row.try_get("court_id").map_err(db_err)?,
        sport_type: parse(row.try_get("sport_type").map_err(db_err)?)?,
        date: row.try_get("date").map_err(db_err)?,
        start_time: row.try_get("start_time").map_err(db_err)?,
        end_time: row.try_get("end_time").map_err(db_err)?,
        slot_count: u32::try_from(slot_count)
            .map_err(|_| DomainError::Internal(format!("corrupt slot count {slot_count}")))?,
        slot_duration: slot_duration(row)?,
        total_amount: row.try_get("total_amount").map_err(db_err)?,
        status: parse(row.try_get("status").map_err(db_err)?)?,
        cancellation_reason: row.try_get("cancellation_reason").map_err(db_err)?,
        cancelled_at: row.try_get("cancelled_at").map_err(db_err)?,
        completed_at: row.try_get("completed_at").map_err(db_err)?,
        payment_simulated: row.try_get("payment_simulated").map_err(db_err)?,
        created_at: row.try_get("created_at").map_err(db_err)?,
    })
}

#[async_trait]
impl BookingRepo for PgBookingRepo {
    async fn insert_if_free(&self, booking: Booking) -> Result<Booking> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        // existing.start < new.end AND new.start < existing.end
        let clash: Option<Uuid> = sqlx::query_scalar(
            "SELECT id FROM bookings
             WHERE court_id = $1 AND date = $2 AND status = 'confirmed'
               AND start_time < $4 AND $3 < end_time
             LIMIT 1",
        )
        .bind(booking.court_id)
        .bind(booking.date)
        .bind(booking.start_time)
        .bind(booking.end_time)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;
        if let Some(existing) = clash {
            tracing::debug!(court_id = %booking.court_id, %existing, "overlap detected");
            return Err(DomainError::Conflict(format!(
                "court {} is already booked on {} between {} and {}",
                booking.court_id, booking.date, booking.start_time, booking.end_time
            )));
        }

        sqlx::query(
            "INSERT INTO bookings (id, user_id, venue_id, court_id, sport_type, date, start_time, end_time, slot_count,
                                   slot_minutes, total_amount, status, cancellation_reason, cancelled_at,
                                   completed_at, payment_simulated, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)",
        )
        .bind(booking.id)
        .bind(booking.user_id)
        .bind(booking.venue_id)
        .bind(booking.court_id)
        .bind(booking.sport_type.as_str())
        .bind(booking.date)
        .bind(booking.start_time)
        .bind(booking.end_time)
        .bind(to_i32(booking.slot_count)?)
        .bind(to_i32(booking.slot_duration.minutes())?)
        .bind(booking.total_amount)
        .bind(booking.status.as_str())
        .bind(&booking.cancellation_reason)
        .bind(booking.cancelled_at)
        .bind(booking.completed_at)
        .bind(booking.payment_simulated)
        .bind(booking.created_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(booking)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>> {
        let row = sqlx::query(&format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(booking_from_row).transpose()
    }

    async fn update_status(&self, booking: &Booking, expected: BookingStatus) -> Result<()> {
        let result = sqlx::query(
            "UPDATE bookings SET status = $2, cancellation_reason = $3, cancelled_at = $4, completed_at = $5
             WHERE id = $1 AND status = $6",
        )
        .bind(booking.id)
        .bind(booking.status.as_str())
        .bind(&booking.cancellation_reason)
        .bind(booking.cancelled_at)
        .bind(booking.completed_at)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        if result.rows_affected() == 1 {
            return Ok(());
        }
        match self.find_by_id(booking.id).await? {
            None => Err(DomainError::not_found("Booking", booking.id)),
            Some(current) => Err(DomainError::Conflict(format!(
                "booking {} is {}, expected {}",
                booking.id, current.status, expected
            ))),
        }
    }

    async fn list(&self, filter: &BookingFilter) -> Result<Vec<Booking>> {
        let mut qb = QueryBuilder::new(format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE TRUE"));
        if let Some(user_id) = filter.user_id {
            qb.push(" AND user_id = ").push_bind(user_id);
        }
        if let Some(venue_ids) = &filter.venue_ids {
            qb.push(" AND venue_id = ANY(").push_bind(venue_ids.clone()).push(")");
        }
        if let Some(court_id) = filter.court_id {
            qb.push(" AND court_id = ").push_bind(court_id);
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(from) = filter.date_from {
            qb.push(" AND date >= ").push_bind(from);
        }
        if let Some(to) = filter.date_to {
            qb.push(" AND date <= ").push_bind(to);
        }
        qb.push(" ORDER BY date DESC, start_time DESC");
        let rows = qb.build().fetch_all(&self.pool).await.map_err(db_err)?;
        rows.iter().map(booking_from_row).collect()
    }

    async fn complete_elapsed(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE bookings SET status = 'completed', completed_at = $1
             WHERE status = 'confirmed' AND (date + end_time) <= $2",
        )
        .bind(now)
        .bind(now.naive_utc())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected())
    }
}

// ── Reviews ─────────────────────────────────────────────────────────────────

pub struct PgReviewRepo {
    pool: PgPool,
}

const REVIEW_COLUMNS: &str = "id, user_id, venue_id, booking_id, rating, comment, is_active, created_at, updated_at";

fn review_from_row(row: &PgRow) -> Result<Review> {
    let rating: i16 = row.try_get("rating").map_err(db_err)?;
    Ok(Review {
        id: row.try_get("id").map_err(db_err)?,
        user_id: row.try_get("user_id").map_err(db_err)?,
        venue_id: row.try_get("venue_id").map_err(db_err)?,
        booking_id: row.try_get("booking_id").map_err(db_err)?,
        rating: u8::try_from(rating).map_err(|_| DomainError::Internal(format!("corrupt rating {rating}")))?,
        comment: row.try_get("comment").map_err(db_err)?,
        is_active: row.try_get("is_active").map_err(db_err)?,
        created_at: row.try_get("created_at").map_err(db_err)?,
        updated_at: row.try_get("updated_at").map_err(db_err)?,
    })
}

impl PgReviewRepo {
    async fn fetch_where(&self, clause: &str, id: Uuid) -> Result<Vec<Review>> {
        let rows = sqlx::query(&format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE {clause}"))
            .bind(id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter().map(review_from_row).collect()
    }
}

#[async_trait]
impl ReviewRepo for PgReviewRepo {
    async fn insert(&self, review: Review) -> Result<Review> {
        sqlx::query(
            "INSERT INTO reviews (id, user_id, venue_id, booking_id, rating, comment, is_active, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(review.id)
        .bind(review.user_id)
        .bind(review.venue_id)
        .bind(review.booking_id)
        .bind(i16::from(review.rating))
        .bind(&review.comment)
        .bind(review.is_active)
        .bind(review.created_at)
        .bind(review.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match db_err(e) {
            DomainError::Conflict(_) => {
                DomainError::Conflict(format!("booking {} has already been reviewed", review.booking_id))
            }
            other => other,
        })?;
        Ok(review)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Review>> {
        Ok(self.fetch_where("id = $1", id).await?.into_iter().next())
    }

    async fn find_by_booking(&self, booking_id: Uuid) -> Result<Option<Review>> {
        Ok(self.fetch_where("booking_id = $1", booking_id).await?.into_iter().next())
    }

    async fn update(&self, review: &Review) -> Result<()> {
        let result = sqlx::query(
            "UPDATE reviews SET rating = $2, comment = $3, is_active = $4, updated_at = $5 WHERE id = $1",
        )
        .bind(review.id)
        .bind(i16::from(review.rating))
        .bind(&review.comment)
        .bind(review.is_active)
        .bind(review.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("Review", review.id));
        }
        Ok(())
    }

    async fn list_by_venue(&self, venue_id: Uuid) -> Result<Vec<Review>> {
        self.fetch_where("venue_id = $1 AND is_active ORDER BY created_at DESC", venue_id).await
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Review>> {
        self.fetch_where("user_id = $1 ORDER BY created_at DESC", user_id).await
    }
}

// ── Unavailability ──────────────────────────────────────────────────────────

pub struct PgUnavailabilityRepo {
    pool: PgPool,
}

const BLOCK_COLUMNS: &str = "id, venue_id, court_id, date, start_time, end_time, reason, note, created_by, created_at";

fn block_from_row(row: &PgRow) -> Result<Unavailability> {
    Ok(Unavailability {
        id: row.try_get("id").map_err(db_err)?,
        venue_id: row.try_get("venue_id").map_err(db_err)?,
        court_id: row.try_get("court_id").map_err(db_err)?,
        date: row.try_get("date").map_err(db_err)?,
        start_time: row.try_get("start_time").map_err(db_err)?,
        end_time: row.try_get("end_time").map_err(db_err)?,
        reason: parse(row.try_get("reason").map_err(db_err)?)?,
        note: row.try_get("note").map_err(db_err)?,
        created_by: row.try_get("created_by").map_err(db_err)?,
        created_at: row.try_get("created_at").map_err(db_err)?,
    })
}

#[async_trait]
impl UnavailabilityRepo for PgUnavailabilityRepo {
    async fn insert(&self, block: Unavailability) -> Result<Unavailability> {
        sqlx::query(
            "INSERT INTO unavailability (id, venue_id, court_id, date, start_time, end_time, reason, note, created_by, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(block.id)
        .bind(block.venue_id)
        .bind(block.court_id)
        .bind(block.date)
        .bind(block.start_time)
        .bind(block.end_time)
        .bind(block.reason.as_str())
        .bind(&block.note)
        .bind(block.created_by)
        .bind(block.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(block)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Unavailability>> {
        let row = sqlx::query(&format!("SELECT {BLOCK_COLUMNS} FROM unavailability WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(block_from_row).transpose()
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM unavailability WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("Unavailability", id));
        }
        Ok(())
    }

    async fn list_by_venue(&self, venue_id: Uuid, date: Option<NaiveDate>) -> Result<Vec<Unavailability>> {
        let mut qb = QueryBuilder::new(format!("SELECT {BLOCK_COLUMNS} FROM unavailability WHERE venue_id = "));
        qb.push_bind(venue_id);
        if let Some(date) = date {
            qb.push(" AND date = ").push_bind(date);
        }
        qb.push(" ORDER BY date, start_time");
        let rows = qb.build().fetch_all(&self.pool).await.map_err(db_err)?;
        rows.iter().map(block_from_row).collect()
    }
}

// ── Image uploads ───────────────────────────────────────────────────────────

pub struct PgImageRepo {
    pool: PgPool,
}

#[async_trait]
impl ImageRepo for PgImageRepo {
    async fn record(&self, image_id: &str, user_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            "INSERT INTO image_uploads (image_id, user_id, created_at) VALUES ($1, $2, $3)
             ON CONFLICT (image_id, user_id) DO NOTHING",
        )
        .bind(image_id)
        .bind(user_id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn uploaders(&self, image_id: &str) -> Result<Vec<Uuid>> {
        sqlx::query_scalar("SELECT user_id FROM image_uploads WHERE image_id = $1 ORDER BY created_at")
            .bind(image_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn forget(&self, image_id: &str, user_id: Option<Uuid>) -> Result<()> {
        sqlx::query("DELETE FROM image_uploads WHERE image_id = $1 AND ($2::uuid IS NULL OR user_id = $2)")
            .bind(image_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_enum_values_round_trip_through_parse() {
        let role: UserRole = parse("facility_owner".to_string()).unwrap();
        assert_eq!(role, UserRole::FacilityOwner);
        assert!(matches!(parse::<BookingStatus>("paid".to_string()), Err(DomainError::Internal(_))));
    }

    #[test]
    fn venue_filter_renders_bound_clauses() {
        let filter = VenueFilter {
            public_only: true,
            search: Some("  Arena ".into()),
            sport: Some(domains::SportType::Tennis),
            ..VenueFilter::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM venues");
        push_venue_filter(&mut qb, &filter);
        let sql = qb.sql();
        assert!(sql.contains("status = 'approved' AND is_active"));
        assert!(sql.contains("$1 = ANY(sports)"));
        assert!(sql.contains("LOWER(name) LIKE $2"));
        assert!(sql.contains("LOWER(address) LIKE $3"));
    }

    #[test]
    fn pool_timeouts_are_upstream_failures() {
        assert!(db_err(sqlx::Error::PoolTimedOut).is_retryable());
        assert!(matches!(db_err(sqlx::Error::RowNotFound), DomainError::Internal(_)));
    }
}
