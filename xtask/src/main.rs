use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{exit, Command, ExitStatus};

use clap::{Parser, Subcommand, ValueEnum};
use thoughtful_core::container::{
    copied_sources, declared_entry_point, ContainerSpec, DEFAULT_BUILDER_TAG, DEFAULT_RUNTIME_TAG,
};
use thoughtful_core::dispatch::{
    DispatchSecrets, RepositoryDispatch, DEFAULT_EVENT_TYPE, GITHUB_API_BASE,
};
use thoughtful_core::entry_point::EntryPoint;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "xtask",
    about = "Task runner for the Thoughtful Python backend workspace",
    long_about = "Packages the Lambda bootstrap, renders the container Dockerfile,\n\
                  notifies the deploy pipeline and runs CI checks."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the bootstrap binary for Lambda and zip it
    Package {
        /// Compilation target triple for the Lambda binary
        #[arg(long, default_value = "x86_64-unknown-linux-gnu")]
        target: String,
        /// Build profile used for the binary
        #[arg(value_enum, long, default_value_t = BuildProfile::Release)]
        profile: BuildProfile,
    },
    /// Render the container Dockerfile
    Dockerfile {
        /// Tag of the Rust builder image
        #[arg(long, default_value = DEFAULT_BUILDER_TAG)]
        builder_tag: String,
        /// Tag of the Lambda runtime base image
        #[arg(long, default_value = DEFAULT_RUNTIME_TAG)]
        runtime_tag: String,
        /// Default handler reference written to CMD
        #[arg(long, default_value = "handlers.auth")]
        entry_point: String,
        /// Output file path
        #[arg(long, default_value = "Dockerfile")]
        output: PathBuf,
        /// Fail if the file on disk differs instead of writing it
        #[arg(long)]
        check: bool,
    },
    /// Send the repository_dispatch event to the deploy pipeline
    Dispatch {
        /// Commit being deployed
        #[arg(long, env = "GITHUB_SHA")]
        sha: String,
        /// Deployment tag
        #[arg(long)]
        tag: String,
        /// repository_dispatch event type
        #[arg(long, default_value = DEFAULT_EVENT_TYPE)]
        event_type: String,
        /// GitHub API base URL
        #[arg(long, default_value = GITHUB_API_BASE)]
        api_base: String,
    },
    /// Run CI checks (fmt, clippy, tests)
    Ci {
        /// Job to run
        #[arg(value_enum, default_value_t = CiJob::Check)]
        job: CiJob,
    },
}

#[derive(Clone, ValueEnum)]
enum CiJob {
    /// Formatting, clippy, and tests
    Check,
    /// Verify the committed Dockerfile matches the rendered one
    Dockerfile,
    /// Run check + dockerfile
    All,
}

#[derive(Clone, Copy, ValueEnum)]
enum BuildProfile {
    Debug,
    Release,
}

impl BuildProfile {
    fn dir_name(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Release => "release",
        }
    }

    fn as_cargo_flag(self) -> Option<&'static str> {
        match self {
            Self::Debug => None,
            Self::Release => Some("--release"),
        }
    }
}

// ── helpers ────────────────────────────────────────────────────────

fn step(label: &str) {
    eprintln!("\n=== {label} ===");
}

fn cargo(args: &[&str]) -> ExitStatus {
    eprintln!("+ cargo {}", args.join(" "));
    Command::new("cargo")
        .args(args)
        .status()
        .expect("failed to execute cargo")
}

fn run_cargo(args: &[&str]) {
    let status = cargo(args);
    if !status.success() {
        exit(status.code().unwrap_or(1));
    }
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("error: {message}");
    exit(1);
}

// ── package ────────────────────────────────────────────────────────

fn package_lambda(target: &str, profile: BuildProfile) {
    ensure_rust_target_installed(target);

    step("Build bootstrap binary");
    let mut cargo_args = vec![
        "build",
        "-p",
        "thoughtful_lambda",
        "--target",
        target,
        "--bin",
        "bootstrap",
    ];
    if let Some(flag) = profile.as_cargo_flag() {
        cargo_args.push(flag);
    }
    run_cargo(&cargo_args);

    step("Package lambda zip artifact");
    let target_dir = Path::new("target").join(target).join(profile.dir_name());
    let dist_dir = Path::new("dist");
    fs::create_dir_all(dist_dir).expect("failed to create dist directory");
    let zip_path = dist_dir.join("thoughtful_lambda.zip");
    package_lambda_zip(&target_dir.join("bootstrap"), &zip_path);

    eprintln!("\nPackaged artifact:\n- {}", zip_path.display());
}

fn ensure_rust_target_installed(target: &str) {
    let output = Command::new("rustup")
        .args(["target", "list", "--installed"])
        .output();

    let output = match output {
        Ok(value) => value,
        Err(error) => {
            eprintln!(
                "warning: failed to run `rustup target list --installed` ({error}); continuing without target preflight"
            );
            return;
        }
    };

    let installed = String::from_utf8_lossy(&output.stdout);
    if output.status.success() && !installed.lines().any(|line| line.trim() == target) {
        fail(format!(
            "required rust target `{target}` is not installed. install it with `rustup target add {target}` and re-run `cargo run -p xtask -- package`"
        ));
    }
}

fn package_lambda_zip(binary_path: &Path, zip_path: &Path) {
    if !binary_path.exists() {
        let path = binary_path.display();
        fail(format!("expected lambda binary at '{path}'"));
    }

    let binary = fs::read(binary_path).expect("failed to read lambda binary");
    let file = fs::File::create(zip_path).expect("failed to create lambda zip");
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o755);
    zip.start_file("bootstrap", options)
        .expect("failed to start bootstrap entry in lambda zip");
    zip.write_all(&binary)
        .expect("failed to write bootstrap entry");
    zip.finish().expect("failed to finish lambda zip");
}

// ── dockerfile ─────────────────────────────────────────────────────

fn container_spec(builder_tag: &str, runtime_tag: &str, entry_point: &str) -> ContainerSpec {
    let entry_point: EntryPoint = entry_point.parse().unwrap_or_else(|error| fail(error));
    let spec = ContainerSpec::default()
        .with_builder_tag(builder_tag)
        .with_runtime_tag(runtime_tag)
        .with_entry_point(entry_point);
    if let Err(error) = spec.validate() {
        fail(error);
    }
    spec
}

fn write_dockerfile(spec: &ContainerSpec, output: &Path, check: bool) {
    let rendered = spec.render_dockerfile();
    if check {
        let on_disk = fs::read_to_string(output).unwrap_or_default();
        if on_disk != rendered {
            fail(format!(
                "{} is out of date; run `cargo run -p xtask -- dockerfile`",
                output.display()
            ));
        }
        let fingerprint = spec.fingerprint();
        eprintln!("{} is up to date ({fingerprint})", output.display());
        return;
    }

    fs::write(output, &rendered).expect("failed to write Dockerfile");
    eprintln!(
        "wrote {} (entry point {}, sha256 {})",
        output.display(),
        declared_entry_point(&rendered).unwrap_or("<none>"),
        spec.fingerprint()
    );
}

// ── dispatch ───────────────────────────────────────────────────────

fn send_dispatch(sha: &str, tag: &str, event_type: &str, api_base: &str) {
    let secrets = DispatchSecrets::from_lookup(|name| std::env::var(name).ok())
        .unwrap_or_else(|error| fail(error));
    let dispatch =
        RepositoryDispatch::new(event_type, sha, tag).unwrap_or_else(|error| fail(error));
    let endpoint = secrets.endpoint(api_base);

    step("Send repository dispatch");
    eprintln!("+ POST {endpoint} ({event_type}, sha {sha}, tag {tag})");
    let response = reqwest::blocking::Client::new()
        .post(&endpoint)
        .bearer_auth(&secrets.token)
        .header("Accept", "application/vnd.github+json")
        .header("User-Agent", "thoughtful-xtask")
        .json(&dispatch)
        .send()
        .unwrap_or_else(|error| fail(error.without_url()));

    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        fail(format!("dispatch rejected with {status}: {body}"));
    }
    eprintln!("dispatch accepted ({status})");
}

// ── CI jobs ────────────────────────────────────────────────────────

fn ci_check() {
    step("Check formatting");
    run_cargo(&["fmt", "--all", "--", "--check"]);

    step("Clippy");
    run_cargo(&[
        "clippy",
        "--all-targets",
        "--all-features",
        "--",
        "-D",
        "warnings",
    ]);

    step("Test thoughtful_core");
    run_cargo(&["test", "-p", "thoughtful_core"]);

    step("Test thoughtful_lambda");
    run_cargo(&["test", "-p", "thoughtful_lambda"]);
}

fn ci_dockerfile() {
    step("Check Dockerfile");
    let spec = container_spec(
        DEFAULT_BUILDER_TAG,
        DEFAULT_RUNTIME_TAG,
        EntryPoint::DEFAULT.reference(),
    );
    write_dockerfile(&spec, Path::new("Dockerfile"), true);

    step("Check Dockerfile build context");
    let rendered = spec.render_dockerfile();
    let absent: Vec<&str> = copied_sources(&rendered)
        .into_iter()
        .filter(|source| !source.ends_with('*') && !Path::new(source).exists())
        .collect();
    if !absent.is_empty() {
        let listed = absent.join(", ");
        fail(format!("Dockerfile copies missing paths: {listed}"));
    }
}

// ── main ───────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Package { target, profile } => package_lambda(&target, profile),
        Commands::Dockerfile {
            builder_tag,
            runtime_tag,
            entry_point,
            output,
            check,
        } => {
            let spec = container_spec(&builder_tag, &runtime_tag, &entry_point);
            write_dockerfile(&spec, &output, check);
        }
        Commands::Dispatch {
            sha,
            tag,
            event_type,
            api_base,
        } => send_dispatch(&sha, &tag, &event_type, &api_base),
        Commands::Ci { job } => {
            match job {
                CiJob::Check => ci_check(),
                CiJob::Dockerfile => ci_dockerfile(),
                CiJob::All => {
                    ci_check();
                    ci_dockerfile();
                }
            }
            eprintln!("\nCI job passed.");
        }
    }
}
