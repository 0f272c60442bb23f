// Notifier plugin implementations
pub mod discord;
pub mod whatsapp;

pub use discord::DiscordNotifier;
pub use whatsapp::WhatsAppNotifier;
