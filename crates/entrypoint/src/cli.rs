use std::fmt;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "vardr-entrypoint",
    about = "Merge mounted CA certificates into the runtime trust store, then start the application",
    version,
)]
pub struct Cli {
    /// Framework profile: selects the trust format and the launch command
    #[arg(value_enum)]
    pub framework: Framework,

    /// Directory of *.crt files (overrides VARD_CERTS_DIR)
    #[arg(long)]
    pub certs_dir: Option<PathBuf>,

    /// Writable directory for the trust material and fingerprint (overrides VARD_STATE_DIR)
    #[arg(long)]
    pub state_dir: Option<PathBuf>,

    /// Trust material to start from (overrides VARD_BASE_TRUST and the profile default)
    #[arg(long, conflicts_with = "no_base_trust")]
    pub base_trust: Option<PathBuf>,

    /// Only trust the mounted certificates plus the runtime's own defaults
    #[arg(long)]
    pub no_base_trust: bool,

    /// Also scan the nested certs/ subdirectory
    #[arg(long)]
    pub scan_nested: bool,

    /// One JSON record per log line (also enabled by VARD_JSON_LOGS=true)
    #[arg(long)]
    pub json_logs: bool,

    /// Application directory
    #[arg(long, default_value = "/app")]
    pub app_dir: PathBuf,

    /// Update trust material and exit without starting the application
    #[arg(long)]
    pub no_exec: bool,

    /// Extra arguments appended to the application command
    #[arg(last = true)]
    pub extra_args: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Framework {
    SpringBoot,
    Fastapi,
    Nextjs,
}

/// Trust format the framework's TLS stack consumes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrustFormat {
    KeyStore,
    PemBundle,
}

impl Framework {
    pub fn trust_format(self) -> TrustFormat {
        match self {
            Framework::SpringBoot => TrustFormat::KeyStore,
            Framework::Fastapi | Framework::Nextjs => TrustFormat::PemBundle,
        }
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Framework::SpringBoot => "Spring Boot",
            Framework::Fastapi => "FastAPI",
            Framework::Nextjs => "Next.js",
        })
    }
}
