mod client;
mod events;
mod studio;

pub use client::ObsClient;
pub use events::ObsEvent;
