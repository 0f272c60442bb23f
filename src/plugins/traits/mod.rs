pub mod notifier;

pub use notifier::{NotificationResult, NotifierPlugin, OutboundMessage};
