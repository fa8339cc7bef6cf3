//! SeaORM implementation of BookingRepository

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use sea_orm::sea_query::{Expr, Func, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition,
    DatabaseConnection, DbErr, EntityTrait, FromQueryResult, JoinType, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Select, Set, SqlErr, TransactionTrait,
};

use crate::domain::booking::{
    Booking, BookingDetails, BookingRepository, BookingSessionSummary, BookingStatus, BookingUser,
    CohortConfirmation, ConfirmOutcome,
};
use crate::domain::payment::ProcessedEvent;
use crate::infrastructure::database::entities::{
    booking, cinema, event, movie, processed_event, session, user,
};
use crate::shared::{DomainError, DomainResult, PaginatedResult, PaginationParams};

pub struct SeaOrmBookingRepository {
    db: DatabaseConnection,
}

impl SeaOrmBookingRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Seats of `session_id` among `seats` that are currently held, sorted
    async fn held_seats(&self, session_id: i32, seats: &[String]) -> DomainResult<Vec<String>> {
        let mut held: Vec<String> = self
            .find_by_session_and_seats(session_id, seats)
            .await?
            .into_iter()
            .filter(Booking::is_active)
            .map(|b| b.place)
            .collect();
        held.sort();
        Ok(held)
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn model_to_domain(m: booking::Model) -> DomainResult<Booking> {
    Ok(Booking {
        id: m.id,
        session_id: m.session_id,
        place: m.place,
        status: m.status.parse()?,
        user_id: m.user_id,
        created_at: m.created_at,
        updated_at: m.updated_at,
        canceled_at: m.canceled_at,
    })
}

fn db_err(e: DbErr) -> DomainError {
    DomainError::Internal(format!("Database error: {}", e))
}

fn is_unique_violation(e: &DbErr) -> bool {
    matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// `lower(column) LIKE %needle%`, portable across SQLite and PostgreSQL
fn lower_contains<C: ColumnTrait>(column: C, needle: &str) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col(column.as_column_ref())))
        .like(format!("%{}%", needle.to_lowercase()))
}

// ── Detail projection ───────────────────────────────────────────

#[derive(Debug, FromQueryResult)]
struct BookingDetailsRow {
    id: i32,
    place: String,
    status: String,
    user_id: i32,
    user_name: Option<String>,
    session_id: i32,
    session_price: Option<i32>,
    session_starts_at: Option<DateTime<Utc>>,
    cinema_id: Option<i32>,
    cinema_name: Option<String>,
    movie_title: Option<String>,
}

impl BookingDetailsRow {
    fn into_domain(self) -> DomainResult<BookingDetails> {
        Ok(BookingDetails {
            id: self.id,
            place: self.place,
            status: self.status.parse()?,
            user: BookingUser {
                id: self.user_id,
                name: self.user_name.unwrap_or_default(),
            },
            session: BookingSessionSummary {
                id: self.session_id,
                price: self.session_price.unwrap_or_default(),
                starts_at: self.session_starts_at.unwrap_or_default(),
                cinema_id: self.cinema_id,
                cinema_name: self.cinema_name,
                movie_title: self.movie_title,
            },
        })
    }
}

fn details_query() -> Select<booking::Entity> {
    booking::Entity::find()
        .select_only()
        .column_as(booking::Column::Id, "id")
        .column_as(booking::Column::Place, "place")
        .column_as(booking::Column::Status, "status")
        .column_as(booking::Column::UserId, "user_id")
        .column_as(booking::Column::SessionId, "session_id")
        .column_as(user::Column::Name, "user_name")
        .column_as(session::Column::Price, "session_price")
        .column_as(session::Column::StartsAt, "session_starts_at")
        .column_as(cinema::Column::Id, "cinema_id")
        .column_as(cinema::Column::Name, "cinema_name")
        .column_as(movie::Column::Title, "movie_title")
        .join(JoinType::LeftJoin, booking::Relation::User.def())
        .join(JoinType::LeftJoin, booking::Relation::Session.def())
        .join(JoinType::LeftJoin, session::Relation::Event.def())
        .join(JoinType::LeftJoin, event::Relation::Cinema.def())
        .join(JoinType::LeftJoin, event::Relation::Movie.def())
}

fn search_condition(search: &str) -> Condition {
    let mut condition = Condition::any()
        .add(lower_contains(booking::Column::Place, search))
        .add(lower_contains(cinema::Column::Name, search))
        .add(lower_contains(movie::Column::Title, search));
    if let Ok(session_id) = search.parse::<i32>() {
        condition = condition.add(booking::Column::SessionId.eq(session_id));
    }
    condition
}

// ── BookingRepository impl ──────────────────────────────────────

#[async_trait]
impl BookingRepository for SeaOrmBookingRepository {
    async fn create_pending(
        &self,
        session_id: i32,
        user_id: i32,
        seats: &[String],
    ) -> DomainResult<Vec<Booking>> {
        debug!("Creating {} pending bookings for session {}", seats.len(), session_id);

        // The first statement is a write, so concurrent SQLite writers queue
        // on the busy timeout instead of failing a read-to-write upgrade.
        let txn = self.db.begin().await.map_err(db_err)?;

        let now = Utc::now();
        let mut created = Vec::with_capacity(seats.len());
        for seat in seats {
            let model = booking::ActiveModel {
                id: NotSet,
                session_id: Set(session_id),
                user_id: Set(user_id),
                place: Set(seat.clone()),
                status: Set(BookingStatus::Pending.as_str().to_string()),
                created_at: Set(now),
                updated_at: Set(now),
                canceled_at: Set(None),
            };

            match model.insert(&txn).await {
                Ok(inserted) => created.push(model_to_domain(inserted)?),
                Err(e) if is_unique_violation(&e) => {
                    txn.rollback().await.map_err(db_err)?;
                    let mut taken = self.held_seats(session_id, seats).await?;
                    if taken.is_empty() {
                        // The holder let go between our insert and the lookup.
                        taken.push(seat.clone());
                    }
                    debug!("Seats {:?} of session {} already held", taken, session_id);
                    return Err(DomainError::SeatConflict(taken));
                }
                Err(e) => return Err(db_err(e)),
            }
        }

        txn.commit().await.map_err(db_err)?;
        Ok(created)
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Booking>> {
        booking::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(model_to_domain)
            .transpose()
    }

    async fn find_by_session_and_seats(
        &self,
        session_id: i32,
        seats: &[String],
    ) -> DomainResult<Vec<Booking>> {
        booking::Entity::find()
            .filter(booking::Column::SessionId.eq(session_id))
            .filter(booking::Column::Place.is_in(seats.iter().cloned()))
            .order_by_asc(booking::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(model_to_domain)
            .collect()
    }

    async fn find_details(&self, id: i32) -> DomainResult<Option<BookingDetails>> {
        details_query()
            .filter(booking::Column::Id.eq(id))
            .into_model::<BookingDetailsRow>()
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(BookingDetailsRow::into_domain)
            .transpose()
    }

    async fn list_details(
        &self,
        pagination: PaginationParams,
        search: Option<&str>,
    ) -> DomainResult<PaginatedResult<BookingDetails>> {
        let pagination = pagination.normalized();
        let mut query = details_query();
        if let Some(search) = search.map(str::trim).filter(|s| !s.is_empty()) {
            query = query.filter(search_condition(search));
        }

        let paginator = query
            .order_by_desc(booking::Column::Id)
            .into_model::<BookingDetailsRow>()
            .paginate(&self.db, pagination.limit);

        let total = paginator.num_items().await.map_err(db_err)?;
        let items = paginator
            .fetch_page(pagination.page - 1)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(BookingDetailsRow::into_domain)
            .collect::<DomainResult<Vec<_>>>()?;

        Ok(PaginatedResult::new(
            items,
            total,
            pagination.page,
            pagination.limit,
        ))
    }

    async fn cancel_pending(&self, id: i32) -> DomainResult<bool> {
        let now = Utc::now();
        let result = booking::Entity::update_many()
            .col_expr(
                booking::Column::Status,
                Expr::value(BookingStatus::Canceled.as_str()),
            )
            .col_expr(booking::Column::CanceledAt, Expr::value(now))
            .col_expr(booking::Column::UpdatedAt, Expr::value(now))
            .filter(booking::Column::Id.eq(id))
            .filter(booking::Column::Status.eq(BookingStatus::Pending.as_str()))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected == 1)
    }

    async fn confirm_cohort(
        &self,
        session_id: i32,
        seats: &[String],
        processed: &ProcessedEvent,
    ) -> DomainResult<ConfirmOutcome> {
        debug!(
            "Confirming cohort of session {} ({} seats) for event {}",
            session_id,
            seats.len(),
            processed.event_id
        );

        let txn = self.db.begin().await.map_err(db_err)?;

        // Ledger first: a replay stops here, and on SQLite the write lock is
        // held from this point until commit.
        let ledger_entry = processed_event::ActiveModel {
            event_id: Set(processed.event_id.clone()),
            event_type: Set(processed.event_type.clone()),
            processed_at: Set(processed.processed_at),
        };
        if let Err(e) = processed_event::Entity::insert(ledger_entry)
            .exec_without_returning(&txn)
            .await
        {
            txn.rollback().await.map_err(db_err)?;
            return if is_unique_violation(&e) {
                debug!("Event {} already recorded, rolled back", processed.event_id);
                Ok(ConfirmOutcome::AlreadyProcessed)
            } else {
                Err(db_err(e))
            };
        }

        let pending = booking::Entity::find()
            .filter(booking::Column::SessionId.eq(session_id))
            .filter(booking::Column::Place.is_in(seats.iter().cloned()))
            .filter(booking::Column::Status.eq(BookingStatus::Pending.as_str()))
            .order_by_asc(booking::Column::Id)
            .lock_exclusive()
            .all(&txn)
            .await
            .map_err(db_err)?;

        let now = Utc::now();
        let mut confirmed = Vec::with_capacity(pending.len());
        if !pending.is_empty() {
            let ids: Vec<i32> = pending.iter().map(|m| m.id).collect();
            let result = booking::Entity::update_many()
                .col_expr(
                    booking::Column::Status,
                    Expr::value(BookingStatus::Confirmed.as_str()),
                )
                .col_expr(booking::Column::UpdatedAt, Expr::value(now))
                .filter(booking::Column::Id.is_in(ids.clone()))
                .filter(booking::Column::Status.eq(BookingStatus::Pending.as_str()))
                .exec(&txn)
                .await
                .map_err(db_err)?;

            if result.rows_affected as usize != ids.len() {
                txn.rollback().await.map_err(db_err)?;
                return Err(DomainError::Internal(format!(
                    "confirmed {} of {} locked bookings for event {}",
                    result.rows_affected,
                    ids.len(),
                    processed.event_id
                )));
            }

            for mut row in pending {
                row.status = BookingStatus::Confirmed.as_str().to_string();
                row.updated_at = now;
                confirmed.push(model_to_domain(row)?);
            }
        }

        txn.commit().await.map_err(db_err)?;

        let confirmed_seats: HashSet<&str> = confirmed.iter().map(|b| b.place.as_str()).collect();
        let skipped_seats = seats
            .iter()
            .filter(|s| !confirmed_seats.contains(s.as_str()))
            .cloned()
            .collect();

        Ok(ConfirmOutcome::Confirmed(CohortConfirmation {
            session_id,
            confirmed,
            skipped_seats,
        }))
    }

    async fn expire_pending(&self, cutoff: DateTime<Utc>) -> DomainResult<u64> {
        let now = Utc::now();
        let result = booking::Entity::update_many()
            .col_expr(
                booking::Column::Status,
                Expr::value(BookingStatus::Canceled.as_str()),
            )
            .col_expr(booking::Column::CanceledAt, Expr::value(now))
            .col_expr(booking::Column::UpdatedAt, Expr::value(now))
            .filter(booking::Column::Status.eq(BookingStatus::Pending.as_str()))
            .filter(booking::Column::CreatedAt.lt(cutoff))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected)
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::ProcessedEventRepository;
    use crate::infrastructure::database::repositories::test_support::*;
    use crate::infrastructure::database::repositories::SeaOrmProcessedEventRepository;

    async fn repo() -> SeaOrmBookingRepository {
        SeaOrmBookingRepository::new(seeded_db().await)
    }

    #[tokio::test]
    async fn create_pending_inserts_one_row_per_seat() {
        let repo = repo().await;
        let created = repo
            .create_pending(SESSION_ID, ALICE_ID, &seats(&["A1", "A2"]))
            .await
            .unwrap();

        assert_eq!(created.len(), 2);
        assert!(created.iter().all(|b| b.status == BookingStatus::Pending));
        assert_eq!(
            repo.held_seats(SESSION_ID, &seats(&["A1", "A2", "A3"]))
                .await
                .unwrap(),
            seats(&["A1", "A2"])
        );
    }

    #[tokio::test]
    async fn create_pending_is_all_or_nothing() {
        let repo = repo().await;
        repo.create_pending(SESSION_ID, ALICE_ID, &seats(&["A2"]))
            .await
            .unwrap();

        let err = repo
            .create_pending(SESSION_ID, BOB_ID, &seats(&["A1", "A2", "A3"]))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::SeatConflict(ref taken) if taken == &seats(&["A2"])));

        let rows = repo
            .find_by_session_and_seats(SESSION_ID, &seats(&["A1", "A2", "A3"]))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].user_id, ALICE_ID);
    }

    #[tokio::test]
    async fn canceled_seat_can_be_booked_again() {
        let repo = repo().await;
        let first = repo
            .create_pending(SESSION_ID, ALICE_ID, &seats(&["C3"]))
            .await
            .unwrap();
        assert!(repo.cancel_pending(first[0].id).await.unwrap());

        let second = repo
            .create_pending(SESSION_ID, BOB_ID, &seats(&["C3"]))
            .await
            .unwrap();
        assert_ne!(first[0].id, second[0].id);
    }

    #[tokio::test]
    async fn same_seat_in_other_session_is_independent() {
        let repo = repo().await;
        repo.create_pending(SESSION_ID, ALICE_ID, &seats(&["A1"]))
            .await
            .unwrap();
        repo.create_pending(OTHER_SESSION_ID, BOB_ID, &seats(&["A1"]))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn cancel_pending_only_touches_pending_rows() {
        let repo = repo().await;
        let created = repo
            .create_pending(SESSION_ID, ALICE_ID, &seats(&["A1"]))
            .await
            .unwrap();
        let id = created[0].id;

        assert!(repo.cancel_pending(id).await.unwrap());
        assert!(!repo.cancel_pending(id).await.unwrap());

        let booking = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(booking.status, BookingStatus::Canceled);
        assert!(booking.canceled_at.is_some());
    }

    #[tokio::test]
    async fn confirm_cohort_confirms_pending_and_records_event() {
        let repo = repo().await;
        repo.create_pending(SESSION_ID, ALICE_ID, &seats(&["A1", "A2"]))
            .await
            .unwrap();

        let event = ProcessedEvent::new("evt_1", "checkout.session.completed");
        let outcome = repo
            .confirm_cohort(SESSION_ID, &seats(&["A1", "A2", "A9"]), &event)
            .await
            .unwrap();

        let ConfirmOutcome::Confirmed(confirmation) = outcome else {
            panic!("expected confirmation, got {:?}", outcome);
        };
        assert_eq!(confirmation.seats(), seats(&["A1", "A2"]));
        assert_eq!(confirmation.skipped_seats, seats(&["A9"]));
        assert!(confirmation
            .confirmed
            .iter()
            .all(|b| b.status == BookingStatus::Confirmed));

        let again = repo
            .confirm_cohort(SESSION_ID, &seats(&["A1", "A2"]), &event)
            .await
            .unwrap();
        assert_eq!(again, ConfirmOutcome::AlreadyProcessed);
    }

    #[tokio::test]
    async fn confirm_cohort_rolls_back_when_event_already_recorded() {
        let db = seeded_db().await;
        let repo = SeaOrmBookingRepository::new(db.clone());
        let events = SeaOrmProcessedEventRepository::new(db);
        repo.create_pending(SESSION_ID, ALICE_ID, &seats(&["B1", "B2"]))
            .await
            .unwrap();

        let event = ProcessedEvent::new("evt_dup", "checkout.session.completed");
        assert!(events.record(&event).await.unwrap());

        let outcome = repo
            .confirm_cohort(SESSION_ID, &seats(&["B1", "B2"]), &event)
            .await
            .unwrap();
        assert_eq!(outcome, ConfirmOutcome::AlreadyProcessed);

        let rows = repo
            .find_by_session_and_seats(SESSION_ID, &seats(&["B1", "B2"]))
            .await
            .unwrap();
        assert!(rows.iter().all(|b| b.status == BookingStatus::Pending));
    }

    #[tokio::test]
    async fn confirm_cohort_skips_canceled_rows() {
        let repo = repo().await;
        let created = repo
            .create_pending(SESSION_ID, ALICE_ID, &seats(&["D1"]))
            .await
            .unwrap();
        repo.cancel_pending(created[0].id).await.unwrap();

        let event = ProcessedEvent::new("evt_late", "checkout.session.completed");
        let outcome = repo
            .confirm_cohort(SESSION_ID, &seats(&["D1"]), &event)
            .await
            .unwrap();
        let ConfirmOutcome::Confirmed(confirmation) = outcome else {
            panic!("expected confirmation, got {:?}", outcome);
        };
        assert!(confirmation.is_empty());

        let booking = repo.find_by_id(created[0].id).await.unwrap().unwrap();
        assert_eq!(booking.status, BookingStatus::Canceled);
    }

    #[tokio::test]
    async fn confirm_cohort_returns_only_rows_it_changed() {
        let repo = repo().await;
        repo.create_pending(SESSION_ID, ALICE_ID, &seats(&["F1", "F2", "F3"]))
            .await
            .unwrap();
        let first = ProcessedEvent::new("evt_f2", "checkout.session.completed");
        repo.confirm_cohort(SESSION_ID, &seats(&["F2"]), &first)
            .await
            .unwrap();
        let f3 = repo
            .find_by_session_and_seats(SESSION_ID, &seats(&["F3"]))
            .await
            .unwrap();
        repo.cancel_pending(f3[0].id).await.unwrap();

        let second = ProcessedEvent::new("evt_f123", "checkout.session.completed");
        let outcome = repo
            .confirm_cohort(SESSION_ID, &seats(&["F1", "F2", "F3"]), &second)
            .await
            .unwrap();
        let ConfirmOutcome::Confirmed(confirmation) = outcome else {
            panic!("expected confirmation, got {:?}", outcome);
        };
        assert_eq!(confirmation.seats(), seats(&["F1"]));
        assert_eq!(confirmation.skipped_seats, seats(&["F2", "F3"]));

        let stored = repo
            .find_by_id(confirmation.confirmed[0].id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, BookingStatus::Confirmed);
        assert_eq!(stored.place, "F1");
    }

    #[tokio::test]
    async fn expire_pending_cancels_only_old_pending_rows() {
        let repo = repo().await;
        repo.create_pending(SESSION_ID, ALICE_ID, &seats(&["E1"]))
            .await
            .unwrap();

        let earlier = Utc::now() - chrono::Duration::minutes(30);
        assert_eq!(repo.expire_pending(earlier).await.unwrap(), 0);

        let later = Utc::now() + chrono::Duration::seconds(1);
        assert_eq!(repo.expire_pending(later).await.unwrap(), 1);
        assert!(repo
            .held_seats(SESSION_ID, &seats(&["E1"]))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn details_join_user_session_cinema_and_movie() {
        let repo = repo().await;
        let created = repo
            .create_pending(SESSION_ID, ALICE_ID, &seats(&["A1"]))
            .await
            .unwrap();

        let details = repo.find_details(created[0].id).await.unwrap().unwrap();
        assert_eq!(details.place, "A1");
        assert_eq!(details.user.name, "alice");
        assert_eq!(details.session.id, SESSION_ID);
        assert_eq!(details.session.price, 1200);
        assert_eq!(details.session.cinema_name.as_deref(), Some("Grand Rex"));
        assert_eq!(details.session.movie_title.as_deref(), Some("Dune"));

        assert!(repo.find_details(9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_details_paginates_and_searches() {
        let repo = repo().await;
        repo.create_pending(SESSION_ID, ALICE_ID, &seats(&["A1", "A2", "A3"]))
            .await
            .unwrap();
        repo.create_pending(OTHER_SESSION_ID, BOB_ID, &seats(&["Z9"]))
            .await
            .unwrap();

        let page = repo
            .list_details(PaginationParams::new(1, 2), None)
            .await
            .unwrap();
        assert_eq!(page.total, 4);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total_pages, 2);

        let heat = repo
            .list_details(PaginationParams::default(), Some("hEaT"))
            .await
            .unwrap();
        assert_eq!(heat.total, 1);
        assert_eq!(heat.items[0].place, "Z9");

        let by_session = repo
            .list_details(PaginationParams::default(), Some("5"))
            .await
            .unwrap();
        assert_eq!(by_session.total, 3);

        let empty = repo
            .list_details(PaginationParams::new(3, 10), None)
            .await
            .unwrap();
        assert!(empty.items.is_empty());
        assert_eq!(empty.total, 4);
    }
}
