pub mod alert;
pub mod user;

pub use alert::{Alert, AlertClass, Condition, NotificationMethod, SnoozeCondition};
pub use user::UserContact;
