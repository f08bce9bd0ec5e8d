mod config;
mod dns;
mod error;
mod events;
mod relay;
mod session;
mod upstream;

pub use config::{EndpointConfig, RelayConfig, ResolutionMode, TimeoutConfig};
pub use dns::{DnsResolver, SystemResolver};
pub use error::{RelayError, SessionError};
pub use events::{RelayEvent, RelayEvents};
pub use relay::RelayServer;
