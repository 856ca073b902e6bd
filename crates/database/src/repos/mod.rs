//! Database repository implementations

pub mod activity_repository;
pub mod info_item_repository;
pub mod notification_repository;
pub mod poll_repository;
pub mod session_repository;
pub mod user_repository;

pub use activity_repository::ActivityRepository;
pub use info_item_repository::InfoItemRepository;
pub use notification_repository::NotificationRepository;
pub use poll_repository::PollRepository;
pub use session_repository::SessionRepository;
pub use user_repository::UserRepository;
