//! Process configuration.
//!
//! Every setting is an environment variable; each is also accepted as a
//! flag. Firestore credentials themselves are read separately, see
//! [`Args::load_credentials`].

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{ArgAction, Parser};

use sensor_firestore::client::DEFAULT_DATABASE;
use sensor_firestore::{ClientOptions, CredentialsError, ServiceAccountCredentials};

#[derive(Parser, Debug, Clone)]
#[command(name = "sensor-gateway")]
#[command(version, about = "HTTP gateway that stores hardware sensor readings in Firestore")]
pub struct Args {
    /// Port to listen on (all interfaces).
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Service-account JSON key file. When set, `FIREBASE_*` variables are
    /// ignored.
    #[arg(long, env = "GOOGLE_APPLICATION_CREDENTIALS")]
    pub credentials_file: Option<PathBuf>,

    /// `host:port` of a Firestore emulator.
    #[arg(long, env = "FIRESTORE_EMULATOR_HOST")]
    pub emulator_host: Option<String>,

    /// Firestore database id.
    #[arg(long, env = "FIRESTORE_DATABASE", default_value = DEFAULT_DATABASE)]
    pub database: String,

    /// Check Firestore connectivity before accepting traffic.
    #[arg(long, env = "STARTUP_PROBE", default_value_t = true, action = ArgAction::Set)]
    pub startup_probe: bool,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,
}

impl Args {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }

    /// Resolve service-account credentials: the key file if one is
    /// configured, otherwise the `FIREBASE_*` environment variables.
    pub fn load_credentials(&self) -> Result<ServiceAccountCredentials, CredentialsError> {
        match self
            .credentials_file
            .as_deref()
            .filter(|path| !path.as_os_str().is_empty())
        {
            Some(path) => ServiceAccountCredentials::from_file(path),
            None => ServiceAccountCredentials::from_env(),
        }
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            emulator_host: self.emulator_host.clone().filter(|h| !h.is_empty()),
            database: Some(self.database.clone()),
        }
    }
}
