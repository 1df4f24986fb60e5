pub mod emitter;

pub use emitter::{insert_pending, NotificationService};
