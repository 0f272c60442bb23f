pub mod manager;
pub mod notifiers;
pub mod traits;

pub use manager::{DispatchReport, NotificationDispatcher};
pub use traits::{NotifierPlugin, OutboundMessage};
