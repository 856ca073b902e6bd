//! Domain entities for the database layer

pub mod activity;
pub mod info_item;
pub mod notification;
pub mod poll;
pub mod session;
pub mod user;

pub use activity::{ActivityEntry, ActivityFilter, NewActivity};
pub use info_item::{InfoItem, InfoItemFilter, InfoItemKind, InfoItemUpdate, NewInfoItem};
pub use notification::{NewNotification, Notification, NotificationKind};
pub use poll::{NewPoll, Poll, PollOption, PollOptionResult, PollSummary};
pub use session::Session;
pub use user::{NewUser, User, UserRole, UserUpdate};

use chrono::{DateTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;

static CUID: Lazy<cuid2::CuidConstructor> = Lazy::new(cuid2::CuidConstructor::new);

/// Generate the externally visible identifier for a new row.
pub fn new_public_id() -> String {
    CUID.create_id()
}

/// Stored timestamps use a fixed-width RFC 3339 form so they sort lexically.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn now_rfc3339() -> String {
    format_timestamp(Utc::now())
}
