//! Configuration for the CarePortal CLI
//!
//! CLI arguments and environment variable handling using clap. A `.env` file
//! in the working directory is loaded before parsing.

use std::path::PathBuf;

use careportal_session::routing::RouteTable;
use careportal_session::{PortalConfig, Role};
use clap::{Parser, Subcommand};

/// CarePortal - session client for the healthcare portal
#[derive(Parser, Debug, Clone)]
#[command(name = "careportal")]
#[command(about = "Inspect, restore and guard CarePortal sessions")]
pub struct Args {
    /// Directory holding client storage (defaults to the user data dir)
    #[arg(long, env = "CAREPORTAL_STORAGE_DIR")]
    pub storage_dir: Option<PathBuf>,

    /// Run without durable storage (every session is ephemeral)
    #[arg(long, env = "CAREPORTAL_NO_STORAGE", default_value = "false")]
    pub no_storage: bool,

    /// Storage key holding the identity record
    #[arg(long, env = "CAREPORTAL_SESSION_KEY", default_value = "user")]
    pub session_key: String,

    /// Base URL of the portal REST API
    #[arg(long, env = "CAREPORTAL_API_URL", default_value = "http://localhost:5000/api")]
    pub api_url: String,

    /// Login route
    #[arg(long, env = "CAREPORTAL_LOGIN_PATH", default_value = "/login")]
    pub login_path: String,

    /// Admin home route
    #[arg(long, env = "CAREPORTAL_ADMIN_HOME", default_value = "/admin")]
    pub admin_home: String,

    /// Doctor home route
    #[arg(long, env = "CAREPORTAL_DOCTOR_HOME", default_value = "/doctor")]
    pub doctor_home: String,

    /// Patient home route
    #[arg(long, env = "CAREPORTAL_PATIENT_HOME", default_value = "/patient")]
    pub patient_home: String,

    /// Minutes before expiry at which `status` warns
    #[arg(long, env = "CAREPORTAL_EXPIRY_WARNING_MINUTES", default_value = "5")]
    pub expiry_warning_minutes: u32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Decode a token and report its validity
    Inspect {
        token: String,
        /// Also report whether it expires within this many minutes
        #[arg(long)]
        within: Option<u32>,
    },

    /// Hydrate and print the current session
    Status,

    /// Store an identity record from a JSON file
    Import { file: PathBuf },

    /// Log in against the portal API
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "CAREPORTAL_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Drop the stored session
    Logout,

    /// Evaluate route access for the current session
    Guard {
        /// Path being entered
        path: String,
        /// Roles admitted by the route (comma separated)
        #[arg(long, value_delimiter = ',', value_parser = parse_role)]
        roles: Vec<Role>,
        /// Route does not require a session
        #[arg(long)]
        public: bool,
    },

    /// Issue a development token (HS256) for local testing
    Mint {
        #[arg(long, value_parser = parse_role)]
        role: Role,
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        name: String,
        /// Lifetime in seconds; negative values mint an already expired token
        #[arg(long, default_value = "3600", allow_hyphen_values = true)]
        ttl: i64,
        /// Omit the `exp` claim
        #[arg(long, conflicts_with = "ttl")]
        no_expiry: bool,
        #[arg(long, env = "CAREPORTAL_DEV_SECRET", default_value = "careportal-dev-secret-not-for-production")]
        secret: String,
        /// Store the minted identity as the current session
        #[arg(long)]
        save: bool,
    },

    /// Parse a consultation link, optionally running the join hand-off
    Meeting {
        url: String,
        /// Initialize the meeting client, fetch a signature if needed, join and leave
        #[arg(long)]
        join: bool,
    },
}

fn parse_role(value: &str) -> Result<Role, String> {
    match value.parse::<Role>().unwrap_or(Role::Unknown) {
        Role::Unknown => Err(format!(
            "unknown role '{}' (expected admin, doctor or patient)",
            value
        )),
        role => Ok(role),
    }
}

impl Args {
    /// Library configuration derived from the arguments
    pub fn portal_config(&self) -> PortalConfig {
        PortalConfig {
            session_key: self.session_key.clone(),
            routes: RouteTable {
                login: self.login_path.clone(),
                admin_home: self.admin_home.clone(),
                doctor_home: self.doctor_home.clone(),
                patient_home: self.patient_home.clone(),
            },
            expiry_warning_minutes: self.expiry_warning_minutes,
        }
    }

    /// Effective storage directory; `None` when storage is disabled or unresolvable
    pub fn storage_dir(&self) -> Option<PathBuf> {
        if self.no_storage {
            return None;
        }
        if let Some(dir) = &self.storage_dir {
            return Some(dir.clone());
        }

        app_dirs2::app_root(
            app_dirs2::AppDataType::UserData,
            &app_dirs2::AppInfo {
                name: "careportal",
                author: "CarePortal",
            },
        )
        .ok()
        .map(|root| root.join("storage"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err(format!("API URL must be http(s), got '{}'", self.api_url));
        }
        self.portal_config().validate().map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("careportal").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_guard_roles_parse() {
        let args = parse(&["guard", "/admin", "--roles", "admin,doctor"]);
        match args.command {
            Command::Guard { path, roles, public } => {
                assert_eq!(path, "/admin");
                assert_eq!(roles, vec![Role::Admin, Role::Doctor]);
                assert!(!public);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_unknown_role_rejected() {
        let result = Args::try_parse_from(["careportal", "guard", "/x", "--roles", "nurse"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_route_overrides_flow_into_config() {
        let args = parse(&["--login-path", "/signin", "--session-key", "cp", "status"]);
        let config = args.portal_config();
        assert_eq!(config.routes.login, "/signin");
        assert_eq!(config.session_key, "cp");
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_no_storage_disables_dir() {
        let args = parse(&["--no-storage", "--storage-dir", "/tmp/x", "status"]);
        assert_eq!(args.storage_dir(), None);

        let args = parse(&["--storage-dir", "/tmp/x", "status"]);
        assert_eq!(args.storage_dir(), Some(PathBuf::from("/tmp/x")));
    }

    #[test]
    fn test_validate_rejects_bad_api_url() {
        let args = parse(&["--api-url", "ftp://x", "status"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_mint_negative_ttl() {
        let args = parse(&[
            "mint", "--role", "doctor", "--user-id", "1", "--name", "Dr. X", "--ttl", "-60",
        ]);
        match args.command {
            Command::Mint { ttl, role, .. } => {
                assert_eq!(ttl, -60);
                assert_eq!(role, Role::Doctor);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_meeting_join_flag() {
        let args = parse(&["meeting", "https://meet.jit.si/consult-42", "--join"]);
        match args.command {
            Command::Meeting { url, join } => {
                assert_eq!(url, "https://meet.jit.si/consult-42");
                assert!(join);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
