//! Framework launch profiles and the final process handoff.

use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode};

use thiserror::Error;
use tracing::{info, warn};
use vardr_engine::KeyStoreWriter;

use crate::cli::Framework;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("No FastAPI application found. Please ensure your app.py or main.py exists in {}", .0.display())]
    NoFastApiApp(PathBuf),
    #[error("No Spring Boot jar found at {}", .0.display())]
    NoSpringJar(PathBuf),
    #[error("No Next.js server found at {}", .0.display())]
    NoNextServer(PathBuf),
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Program, arguments and extra environment for the application process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl LaunchPlan {
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        cmd
    }

    /// Command line for logs, with the trust store password masked.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(|arg| {
                if arg.starts_with("-Djavax.net.ssl.trustStorePassword=") {
                    "-Djavax.net.ssl.trustStorePassword=****"
                } else {
                    arg
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Inputs shared by every profile.
pub struct LaunchContext<'a, F> {
    pub trust_path: &'a Path,
    pub keystore: Option<&'a KeyStoreWriter>,
    pub app_dir: &'a Path,
    pub extra_args: &'a [String],
    pub env: F,
}

pub fn plan<F>(framework: Framework, ctx: &LaunchContext<'_, F>) -> Result<LaunchPlan, LaunchError>
where
    F: Fn(&str) -> Option<String>,
{
    match framework {
        Framework::SpringBoot => spring_boot_plan(ctx),
        Framework::Fastapi => fastapi_plan(ctx),
        Framework::Nextjs => nextjs_plan(ctx),
    }
}

const JVM_SYSTEM_STORES: [&str; 2] = ["/etc/ssl/certs/java/cacerts", "/etc/pki/java/cacerts"];

const SYSTEM_BUNDLES: [&str; 5] = [
    "/etc/ssl/certs/ca-certificates.crt",
    "/etc/pki/tls/certs/ca-bundle.crt",
    "/etc/pki/ca-trust/extracted/pem/tls-ca-bundle.pem",
    "/etc/ssl/ca-bundle.pem",
    "/etc/ssl/cert.pem",
];

/// Default trust material to start from when none is configured. Logs a
/// warning when the profile needs one and nothing was found, since the
/// runtime would then trust only the mounted certificates.
pub fn default_base_trust<F>(framework: Framework, env: F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    let found = match framework {
        // JDK 9-17 ship JKS cacerts, later ones PKCS#12; both load.
        Framework::SpringBoot => env("JAVA_HOME")
            .map(PathBuf::from)
            .into_iter()
            .chain(java_home_from_path(&env))
            .map(|home| home.join("lib/security/cacerts"))
            .chain(JVM_SYSTEM_STORES.iter().map(PathBuf::from))
            .find(|p| p.is_file()),
        Framework::Fastapi => SYSTEM_BUNDLES.iter().map(PathBuf::from).find(|p| p.is_file()),
        // NODE_EXTRA_CA_CERTS adds to Node's bundled roots.
        Framework::Nextjs => return None,
    };
    if found.is_none() {
        warn!(
            "No default trust material found for {framework}; only the mounted certificates will be trusted"
        );
    }
    found
}

/// Installation directory of the `java` found on `PATH`, following
/// symlinks such as `/usr/bin/java`.
fn java_home_from_path<F>(env: &F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    let path = env("PATH")?;
    let java = std::env::split_paths(&path)
        .map(|dir| dir.join("java"))
        .find(|p| p.is_file())?;
    let java = std::fs::canonicalize(java).ok()?;
    java.parent()?.parent().map(Path::to_path_buf)
}

fn spring_boot_plan<F>(ctx: &LaunchContext<'_, F>) -> Result<LaunchPlan, LaunchError>
where
    F: Fn(&str) -> Option<String>,
{
    let jar = ctx.app_dir.join("app.jar");
    if !jar.is_file() {
        return Err(LaunchError::NoSpringJar(jar));
    }
    let mut args = jvm_options(ctx.trust_path, ctx.keystore, &ctx.env);
    args.push("-jar".to_string());
    args.push(jar.display().to_string());
    args.extend(ctx.extra_args.iter().cloned());
    Ok(LaunchPlan {
        program: "java".to_string(),
        args,
        env: Vec::new(),
    })
}

/// JVM flags tuned for Spring Boot in a container.
pub fn jvm_options<F>(trust_path: &Path, keystore: Option<&KeyStoreWriter>, env: &F) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut opts = Vec::new();

    if let Some(ks) = keystore {
        for (key, value) in ks.trust_store_properties(trust_path) {
            opts.push(format!("-D{key}={value}"));
        }
    }
    opts.push("-Djava.security.egd=file:/dev/./urandom".to_string());

    opts.push("-XX:+UseContainerSupport".to_string());
    match env("JAVA_MAX_HEAP") {
        Some(max) => opts.push(format!("-Xmx{max}")),
        None => opts.push("-XX:MaxRAMPercentage=75.0".to_string()),
    }
    match env("JAVA_MIN_HEAP") {
        Some(min) => opts.push(format!("-Xms{min}")),
        None => opts.push("-XX:InitialRAMPercentage=50.0".to_string()),
    }

    match env("JAVA_GC_TYPE").as_deref() {
        None | Some("g1") => {
            opts.push("-XX:+UseG1GC".to_string());
            opts.push("-XX:+UseStringDeduplication".to_string());
            opts.push("-XX:MaxGCPauseMillis=200".to_string());
        }
        Some("zgc") => opts.push("-XX:+UseZGC".to_string()),
        Some("shenandoah") => opts.push("-XX:+UseShenandoahGC".to_string()),
        Some(_) => {}
    }

    opts.extend(
        [
            "-XX:+UnlockExperimentalVMOptions",
            "-XX:+OptimizeStringConcat",
            "-XX:+UseCompressedOops",
            "-XX:+UseCompressedClassPointers",
            "-Xlog:gc*:file=/tmp/gc.log:time,uptime,level,tags",
            "-Djava.awt.headless=true",
            "-Dspring.jmx.enabled=false",
            "-Dspring.main.banner-mode=off",
            "-Dspring.main.web-application-type=servlet",
            "-Djava.net.preferIPv4Stack=true",
            "-Dfile.encoding=UTF-8",
            "-Duser.timezone=UTC",
        ]
        .map(String::from),
    );

    if let Some(custom) = env("JAVA_OPTS") {
        opts.extend(custom.split_whitespace().map(String::from));
    }
    opts
}

fn fastapi_plan<F>(ctx: &LaunchContext<'_, F>) -> Result<LaunchPlan, LaunchError>
where
    F: Fn(&str) -> Option<String>,
{
    let module = find_fastapi_module(ctx.app_dir)
        .ok_or_else(|| LaunchError::NoFastApiApp(ctx.app_dir.to_path_buf()))?;
    let env = &ctx.env;

    let mut args = vec![
        "-m".to_string(),
        "uvicorn".to_string(),
        format!("{module}:app"),
        "--host".to_string(),
        "0.0.0.0".to_string(),
        "--port".to_string(),
        env("PORT").unwrap_or_else(|| "8000".to_string()),
        "--workers".to_string(),
        env("WORKERS").unwrap_or_else(|| "1".to_string()),
    ];
    if let Some(opts) = env("UVICORN_OPTS") {
        args.extend(opts.split_whitespace().map(String::from));
    }
    args.extend(ctx.extra_args.iter().cloned());

    let bundle = ctx.trust_path.display().to_string();
    Ok(LaunchPlan {
        program: "python".to_string(),
        args,
        env: vec![
            ("SSL_CERT_FILE".to_string(), bundle.clone()),
            ("REQUESTS_CA_BUNDLE".to_string(), bundle.clone()),
            ("CURL_CA_BUNDLE".to_string(), bundle),
            ("PYTHONUNBUFFERED".to_string(), "1".to_string()),
            ("PYTHONDONTWRITEBYTECODE".to_string(), "1".to_string()),
        ],
    })
}

const FASTAPI_CANDIDATES: [&str; 5] = ["main.py", "app.py", "application.py", "api.py", "server.py"];

/// Module name of the FastAPI app: a conventional file name first, then any
/// top-level `*.py` that mentions FastAPI (alphabetical).
pub fn find_fastapi_module(app_dir: &Path) -> Option<String> {
    let file = FASTAPI_CANDIDATES
        .iter()
        .map(|name| name.to_string())
        .find(|name| app_dir.join(name).is_file())
        .or_else(|| {
            let mut py: Vec<PathBuf> = std::fs::read_dir(app_dir)
                .ok()?
                .filter_map(Result::ok)
                .map(|e| e.path())
                .filter(|p| p.extension().is_some_and(|ext| ext == "py"))
                .collect();
            py.sort();
            py.into_iter()
                .find(|p| {
                    std::fs::read_to_string(p)
                        .map(|src| src.contains("FastAPI") || src.contains("from fastapi"))
                        .unwrap_or(false)
                })
                .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        })?;
    Some(file.trim_end_matches(".py").to_string())
}

fn nextjs_plan<F>(ctx: &LaunchContext<'_, F>) -> Result<LaunchPlan, LaunchError>
where
    F: Fn(&str) -> Option<String>,
{
    let server = ctx.app_dir.join("server.js");
    if !server.is_file() {
        return Err(LaunchError::NoNextServer(server));
    }
    let env = &ctx.env;

    let mut args = vec![server.display().to_string()];
    args.extend(ctx.extra_args.iter().cloned());

    let mut vars = vec![
        ("NODE_EXTRA_CA_CERTS".to_string(), ctx.trust_path.display().to_string()),
        ("NODE_ENV".to_string(), "production".to_string()),
        ("HOSTNAME".to_string(), "0.0.0.0".to_string()),
        ("PORT".to_string(), env("PORT").unwrap_or_else(|| "3000".to_string())),
    ];
    if let Some(node_opts) = env("NODE_OPTIONS") {
        vars.push(("NODE_OPTIONS".to_string(), node_opts));
    }
    Ok(LaunchPlan {
        program: "node".to_string(),
        args,
        env: vars,
    })
}

/// Replace this process with the application (unix), or run it and pass
/// its exit status through.
pub fn handoff(plan: &LaunchPlan) -> Result<ExitCode, LaunchError> {
    info!("Running command: {}", plan.display());
    run(plan, plan.command())
}

#[cfg(unix)]
fn run(plan: &LaunchPlan, mut cmd: Command) -> Result<ExitCode, LaunchError> {
    use std::os::unix::process::CommandExt;
    // exec only returns on failure
    let source = cmd.exec();
    Err(LaunchError::Spawn {
        program: plan.program.clone(),
        source,
    })
}

#[cfg(not(unix))]
fn run(plan: &LaunchPlan, mut cmd: Command) -> Result<ExitCode, LaunchError> {
    let status = cmd.status().map_err(|source| LaunchError::Spawn {
        program: plan.program.clone(),
        source,
    })?;
    let code = status.code().unwrap_or(1);
    Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)))
}
