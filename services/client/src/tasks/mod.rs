pub mod notification_poll;

pub use notification_poll::NotificationPoller;
