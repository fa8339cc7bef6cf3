//! Database entities module

pub mod booking;
pub mod cinema;
pub mod event;
pub mod movie;
pub mod processed_event;
pub mod room;
pub mod session;
pub mod user;

pub use booking::Entity as Booking;
pub use cinema::Entity as Cinema;
pub use event::Entity as Event;
pub use movie::Entity as Movie;
pub use processed_event::Entity as ProcessedEvent;
pub use room::Entity as Room;
pub use session::Entity as Session;
pub use user::Entity as User;
