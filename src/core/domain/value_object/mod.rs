mod connection_uri;
mod host;
mod password;
mod port;
mod service_path;
mod username;

pub use connection_uri::ConnectionUri;
pub use host::Host;
pub use password::Password;
pub use port::Port;
pub use service_path::ServicePath;
pub use username::Username;
