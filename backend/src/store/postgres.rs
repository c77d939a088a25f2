//! Postgres-backed store. Runtime-checked queries (no compile-time DB
//! dependency); every composite operation runs inside one transaction.

use anyhow::Result;
use chrono::{DateTime, Utc};
use dotenvy::dotenv;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Row};
use std::env;
use uuid::Uuid;

use crate::models::{
    Booking, Driver, Location, Proposal, RequestStatus, RideRequest, Stop, Trip, Vehicle,
};

use super::{Store, StoreError};

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub database_url: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),
        })
    }
}

pub async fn get_db_pool(config: &DatabaseConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;

    Ok(pool)
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl FromRow<'_, PgRow> for RideRequest {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            customer_id: row.try_get("customer_id")?,
            pickup: Location {
                address: row.try_get("pickup_address")?,
                lat: row.try_get("pickup_lat")?,
                lng: row.try_get("pickup_lng")?,
            },
            dropoff: Location {
                address: row.try_get("dropoff_address")?,
                lat: row.try_get("dropoff_lat")?,
                lng: row.try_get("dropoff_lng")?,
            },
            return_point: Location {
                address: row.try_get("return_address")?,
                lat: row.try_get("return_lat")?,
                lng: row.try_get("return_lng")?,
            },
            home: Location {
                address: row.try_get("home_address")?,
                lat: row.try_get("home_lat")?,
                lng: row.try_get("home_lng")?,
            },
            desired_pickup_time: row.try_get("desired_pickup_time")?,
            desired_return_time: row.try_get("desired_return_time")?,
            passenger_count: row.try_get("passenger_count")?,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

const REQUEST_COLUMNS: &str = "id, customer_id, \
     pickup_address, pickup_lat, pickup_lng, \
     dropoff_address, dropoff_lat, dropoff_lng, \
     return_address, return_lat, return_lng, \
     home_address, home_lat, home_lng, \
     desired_pickup_time, desired_return_time, passenger_count, status, created_at";

impl Store for PgStore {
    async fn insert_request(&self, request: &RideRequest) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO ride_requests (
                id, customer_id,
                pickup_address, pickup_lat, pickup_lng,
                dropoff_address, dropoff_lat, dropoff_lng,
                return_address, return_lat, return_lng,
                home_address, home_lat, home_lng,
                desired_pickup_time, desired_return_time, passenger_count, status, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            "#,
        )
        .bind(request.id)
        .bind(request.customer_id)
        .bind(&request.pickup.address)
        .bind(request.pickup.lat)
        .bind(request.pickup.lng)
        .bind(&request.dropoff.address)
        .bind(request.dropoff.lat)
        .bind(request.dropoff.lng)
        .bind(&request.return_point.address)
        .bind(request.return_point.lat)
        .bind(request.return_point.lng)
        .bind(&request.home.address)
        .bind(request.home.lat)
        .bind(request.home.lng)
        .bind(request.desired_pickup_time)
        .bind(request.desired_return_time)
        .bind(request.passenger_count)
        .bind(request.status)
        .bind(request.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_request(&self, id: Uuid) -> Result<Option<RideRequest>, StoreError> {
        let request = sqlx::query_as::<_, RideRequest>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM ride_requests WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(request)
    }

    async fn list_requests_by_status(
        &self,
        status: RequestStatus,
    ) -> Result<Vec<RideRequest>, StoreError> {
        let requests = sqlx::query_as::<_, RideRequest>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM ride_requests WHERE status = $1 ORDER BY created_at, id"
        ))
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(requests)
    }

    async fn transition_request(
        &self,
        id: Uuid,
        from: RequestStatus,
        to: RequestStatus,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE ride_requests SET status = $1 WHERE id = $2 AND status = $3")
            .bind(to)
            .bind(id)
            .bind(from)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn transition_requests(
        &self,
        ids: &[Uuid],
        from: RequestStatus,
        to: RequestStatus,
    ) -> Result<bool, StoreError> {
        if ids.is_empty() {
            return Ok(true);
        }

        let mut tx = self.pool.begin().await?;
        let result =
            sqlx::query("UPDATE ride_requests SET status = $1 WHERE id = ANY($2) AND status = $3")
                .bind(to)
                .bind(ids)
                .bind(from)
                .execute(&mut *tx)
                .await?;

        if result.rows_affected() as usize != ids.len() {
            tx.rollback().await?;
            return Ok(false);
        }
        tx.commit().await?;
        Ok(true)
    }

    async fn insert_driver(&self, driver: &Driver) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO drivers (id, name, phone, created_at) VALUES ($1, $2, $3, $4)")
            .bind(driver.id)
            .bind(&driver.name)
            .bind(&driver.phone)
            .bind(driver.created_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn insert_vehicle(&self, vehicle: &Vehicle) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO vehicles (id, driver_id, plate, capacity, active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(vehicle.id)
        .bind(vehicle.driver_id)
        .bind(&vehicle.plate)
        .bind(vehicle.capacity)
        .bind(vehicle.active)
        .bind(vehicle.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn first_active_vehicle(&self) -> Result<Option<Vehicle>, StoreError> {
        let vehicle = sqlx::query_as::<_, Vehicle>(
            r#"
            SELECT id, driver_id, plate, capacity, active, created_at
            FROM vehicles
            WHERE active
            ORDER BY created_at, id
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(vehicle)
    }

    async fn insert_trip_with_stops(&self, trip: &Trip, stops: &[Stop]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO trips (id, vehicle_id, driver_id, direction, status, start_time, end_time, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(trip.id)
        .bind(trip.vehicle_id)
        .bind(trip.driver_id)
        .bind(trip.direction)
        .bind(trip.status)
        .bind(trip.start_time)
        .bind(trip.end_time)
        .bind(trip.created_at)
        .execute(&mut *tx)
        .await?;

        for stop in stops {
            sqlx::query(
                r#"
                INSERT INTO stops (id, trip_id, stop_type, sequence, address, lat, lng, scheduled_time, actual_time, customer_id)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(stop.id)
            .bind(stop.trip_id)
            .bind(stop.stop_type)
            .bind(stop.sequence)
            .bind(&stop.address)
            .bind(stop.lat)
            .bind(stop.lng)
            .bind(stop.scheduled_time)
            .bind(stop.actual_time)
            .bind(stop.customer_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list_trips(&self) -> Result<Vec<Trip>, StoreError> {
        let trips = sqlx::query_as::<_, Trip>(
            "SELECT id, vehicle_id, driver_id, direction, status, start_time, end_time, created_at \
             FROM trips ORDER BY created_at, id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(trips)
    }

    async fn list_stops(&self, trip_id: Uuid) -> Result<Vec<Stop>, StoreError> {
        let stops = sqlx::query_as::<_, Stop>(
            "SELECT id, trip_id, stop_type, sequence, address, lat, lng, scheduled_time, actual_time, customer_id \
             FROM stops WHERE trip_id = $1 ORDER BY sequence",
        )
        .bind(trip_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(stops)
    }

    async fn insert_proposal(&self, proposal: &Proposal) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        // One ACTIVE proposal per request: supersede before inserting.
        sqlx::query(
            "UPDATE proposals SET status = 'REJECTED' WHERE request_id = $1 AND status = 'ACTIVE'",
        )
        .bind(proposal.request_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO proposals (
                id, request_id, outbound_trip_id, return_trip_id,
                pickup_time, dropoff_time, return_pickup_time, return_dropoff_time,
                price_cents, status, expires_at, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(proposal.id)
        .bind(proposal.request_id)
        .bind(proposal.outbound_trip_id)
        .bind(proposal.return_trip_id)
        .bind(proposal.pickup_time)
        .bind(proposal.dropoff_time)
        .bind(proposal.return_pickup_time)
        .bind(proposal.return_dropoff_time)
        .bind(proposal.price_cents)
        .bind(proposal.status)
        .bind(proposal.expires_at)
        .bind(proposal.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_proposal(&self, id: Uuid) -> Result<Option<Proposal>, StoreError> {
        let proposal = sqlx::query_as::<_, Proposal>(
            "SELECT id, request_id, outbound_trip_id, return_trip_id, pickup_time, dropoff_time, \
             return_pickup_time, return_dropoff_time, price_cents, status, expires_at, created_at \
             FROM proposals WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(proposal)
    }

    async fn active_proposal_for_request(
        &self,
        request_id: Uuid,
    ) -> Result<Option<Proposal>, StoreError> {
        let proposal = sqlx::query_as::<_, Proposal>(
            "SELECT id, request_id, outbound_trip_id, return_trip_id, pickup_time, dropoff_time, \
             return_pickup_time, return_dropoff_time, price_cents, status, expires_at, created_at \
             FROM proposals WHERE request_id = $1 AND status = 'ACTIVE'",
        )
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(proposal)
    }

    async fn finalize_acceptance(
        &self,
        proposal_id: Uuid,
        now: DateTime<Utc>,
        booking: &Booking,
    ) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        let request_id: Option<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE proposals SET status = 'ACCEPTED'
            WHERE id = $1 AND status = 'ACTIVE' AND expires_at >= $2
            RETURNING request_id
            "#,
        )
        .bind(proposal_id)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(request_id) = request_id else {
            tx.rollback().await?;
            return Ok(false);
        };

        sqlx::query(
            r#"
            INSERT INTO bookings (
                id, proposal_id, request_id, outbound_trip_id, return_trip_id,
                price_cents, payment_txn_id, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(booking.id)
        .bind(booking.proposal_id)
        .bind(booking.request_id)
        .bind(booking.outbound_trip_id)
        .bind(booking.return_trip_id)
        .bind(booking.price_cents)
        .bind(&booking.payment_txn_id)
        .bind(booking.created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE ride_requests SET status = 'CONFIRMED' WHERE id = $1")
            .bind(request_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn reject_proposal(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        let request_id: Option<Uuid> = sqlx::query_scalar(
            "UPDATE proposals SET status = 'REJECTED' WHERE id = $1 AND status = 'ACTIVE' RETURNING request_id",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(request_id) = request_id else {
            tx.rollback().await?;
            return Ok(false);
        };

        sqlx::query("UPDATE ride_requests SET status = 'REQUESTED' WHERE id = $1")
            .bind(request_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn expire_proposals_before(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Proposal>, StoreError> {
        let expired = sqlx::query_as::<_, Proposal>(
            r#"
            UPDATE proposals SET status = 'EXPIRED'
            WHERE status = 'ACTIVE' AND expires_at < $1
            RETURNING id, request_id, outbound_trip_id, return_trip_id, pickup_time, dropoff_time,
                      return_pickup_time, return_dropoff_time, price_cents, status, expires_at, created_at
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(expired)
    }

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        let booking = sqlx::query_as::<_, Booking>(
            "SELECT id, proposal_id, request_id, outbound_trip_id, return_trip_id, price_cents, \
             payment_txn_id, created_at FROM bookings WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(booking)
    }
}
