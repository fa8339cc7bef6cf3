//! Database repository implementations
//!
//! Per-aggregate SeaORM repositories + unified RepositoryProvider.

pub mod booking_repository;
pub mod catalog_repository;
pub mod processed_event_repository;
pub mod repository_provider;

pub use booking_repository::SeaOrmBookingRepository;
pub use catalog_repository::SeaOrmCatalogRepository;
pub use processed_event_repository::SeaOrmProcessedEventRepository;
pub use repository_provider::SeaOrmRepositoryProvider;

#[cfg(test)]
pub(crate) mod test_support {
    //! In-memory database with a small catalog:
    //! admin 1, manager 2 owning cinema 1, viewers 7 (alice) and 9 (bob),
    //! session 5 of "Dune" at price 1200, session 6 of "Heat" at price 900.

    use chrono::{Duration, Utc};
    use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

    use crate::infrastructure::database::entities::{cinema, event, movie, room, session, user};
    use crate::infrastructure::database::{init_database_with_migrations, DatabaseConfig};

    pub const ADMIN_ID: i32 = 1;
    pub const MANAGER_ID: i32 = 2;
    pub const ALICE_ID: i32 = 7;
    pub const BOB_ID: i32 = 9;
    pub const SESSION_ID: i32 = 5;
    pub const OTHER_SESSION_ID: i32 = 6;
    pub const CINEMA_ID: i32 = 1;

    async fn add_user(db: &DatabaseConnection, id: i32, name: &str, role: user::UserRole) {
        user::ActiveModel {
            id: Set(id),
            name: Set(name.to_string()),
            email: Set(format!("{}@example.com", name)),
            role: Set(role),
            created_at: Set(Utc::now()),
        }
        .insert(db)
        .await
        .unwrap();
    }

    pub async fn seeded_db() -> DatabaseConnection {
        let db = init_database_with_migrations(&DatabaseConfig::in_memory())
            .await
            .unwrap();

        add_user(&db, ADMIN_ID, "admin", user::UserRole::Admin).await;
        add_user(&db, MANAGER_ID, "manager", user::UserRole::Manager).await;
        add_user(&db, ALICE_ID, "alice", user::UserRole::Viewer).await;
        add_user(&db, BOB_ID, "bob", user::UserRole::Viewer).await;

        cinema::ActiveModel {
            id: Set(CINEMA_ID),
            user_id: Set(MANAGER_ID),
            name: Set("Grand Rex".into()),
            description: Set(None),
        }
        .insert(&db)
        .await
        .unwrap();

        movie::ActiveModel {
            id: Set(1),
            title: Set("Dune".into()),
            language: Set(Some("en".into())),
        }
        .insert(&db)
        .await
        .unwrap();
        movie::ActiveModel {
            id: Set(2),
            title: Set("Heat".into()),
            language: Set(None),
        }
        .insert(&db)
        .await
        .unwrap();

        room::ActiveModel {
            id: Set(1),
            cinema_id: Set(CINEMA_ID),
            number: Set(1),
        }
        .insert(&db)
        .await
        .unwrap();

        for (event_id, movie_id) in [(1, 1), (2, 2)] {
            event::ActiveModel {
                id: Set(event_id),
                cinema_id: Set(CINEMA_ID),
                movie_id: Set(movie_id),
            }
            .insert(&db)
            .await
            .unwrap();
        }

        for (session_id, event_id, price) in [(SESSION_ID, 1, 1200), (OTHER_SESSION_ID, 2, 900)] {
            session::ActiveModel {
                id: Set(session_id),
                event_id: Set(event_id),
                room_id: Set(1),
                price: Set(price),
                starts_at: Set(Utc::now() + Duration::days(1)),
                deleted_at: Set(None),
            }
            .insert(&db)
            .await
            .unwrap();
        }

        db
    }

    pub fn seats(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }
}
