pub mod process_launcher;
pub mod service_connection;

pub use process_launcher::{ProcessLauncher, ServiceLauncher};
pub use service_connection::{ServiceConnection, ServiceConnectionState};
