//! Container image description for the Lambda deployment.
//!
//! The Dockerfile is rendered purely from [`ContainerSpec`], so identical
//! specs always produce identical build files. A committed lockfile is copied
//! when present; otherwise one is generated inside the builder stage. The
//! release build then runs with `--locked` against that single resolution.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::entry_point::EntryPoint;
use crate::error::ValidationError;

pub const DEFAULT_BUILDER_IMAGE: &str = "rust";
pub const DEFAULT_BUILDER_TAG: &str = "1.82-slim";
pub const DEFAULT_RUNTIME_IMAGE: &str = "public.ecr.aws/lambda/provided";
pub const DEFAULT_RUNTIME_TAG: &str = "al2023";
pub const LAMBDA_PACKAGE: &str = "thoughtful_lambda";
pub const BOOTSTRAP_BINARY: &str = "bootstrap";
/// Task root of the Lambda base images. The bootstrap binary must live in
/// `/var/runtime`.
pub const RUNTIME_BINARY_PATH: &str = "/var/runtime/bootstrap";
pub const TASK_ROOT: &str = "/var/task";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BaseImage {
    pub name: String,
    pub tag: String,
}

impl BaseImage {
    pub fn new(name: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tag: tag.into(),
        }
    }

    pub fn reference(&self) -> String {
        format!("{}:{}", self.name, self.tag)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContainerSpec {
    pub builder_image: BaseImage,
    pub runtime_image: BaseImage,
    /// Manifests copied before the sources.
    pub manifest_files: Vec<String>,
    /// Lockfile copied alongside the manifests when the build context has one.
    pub lockfile: String,
    /// Source directories copied into the build context.
    pub source_dirs: Vec<String>,
    pub package: String,
    pub binary: String,
    pub entry_point: EntryPoint,
}

impl Default for ContainerSpec {
    fn default() -> Self {
        Self {
            builder_image: BaseImage::new(DEFAULT_BUILDER_IMAGE, DEFAULT_BUILDER_TAG),
            runtime_image: BaseImage::new(DEFAULT_RUNTIME_IMAGE, DEFAULT_RUNTIME_TAG),
            manifest_files: vec!["Cargo.toml".to_string()],
            lockfile: "Cargo.lock".to_string(),
            source_dirs: vec!["crates".to_string(), "xtask".to_string()],
            package: LAMBDA_PACKAGE.to_string(),
            binary: BOOTSTRAP_BINARY.to_string(),
            entry_point: EntryPoint::DEFAULT,
        }
    }
}

impl ContainerSpec {
    pub fn with_builder_tag(mut self, tag: impl Into<String>) -> Self {
        self.builder_image.tag = tag.into();
        self
    }

    pub fn with_runtime_tag(mut self, tag: impl Into<String>) -> Self {
        self.runtime_image.tag = tag.into();
        self
    }

    pub fn with_entry_point(mut self, entry_point: EntryPoint) -> Self {
        self.entry_point = entry_point;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        for image in [&self.builder_image, &self.runtime_image] {
            if image.name.trim().is_empty() || image.tag.trim().is_empty() {
                return Err(ValidationError::new(
                    "base images need both a name and a version tag",
                ));
            }
            if image.tag.contains(char::is_whitespace) {
                return Err(ValidationError::new(format!(
                    "image tag '{}' must not contain whitespace",
                    image.tag
                )));
            }
        }
        if self.manifest_files.is_empty() {
            return Err(ValidationError::new("manifest_files cannot be empty"));
        }
        if self.lockfile.trim().is_empty() {
            return Err(ValidationError::new(
                "lockfile is required for a locked build",
            ));
        }
        if self.source_dirs.is_empty() {
            return Err(ValidationError::new("source_dirs cannot be empty"));
        }
        if self.package.trim().is_empty() || self.binary.trim().is_empty() {
            return Err(ValidationError::new("package and binary are required"));
        }
        Ok(())
    }

    pub fn render_dockerfile(&self) -> String {
        let mut lines = vec![
            "# syntax=docker/dockerfile:1".to_string(),
            format!("FROM {} AS builder", self.builder_image.reference()),
            "WORKDIR /build".to_string(),
        ];
        lines.push(format!(
            "COPY {} {}* ./",
            self.manifest_files.join(" "),
            self.lockfile
        ));
        for dir in &self.source_dirs {
            lines.push(format!("COPY {dir} ./{dir}"));
        }
        lines.push(format!(
            "RUN test -f {lock} || cargo generate-lockfile",
            lock = self.lockfile
        ));
        lines.push(format!(
            "RUN cargo build --release --locked -p {} --bin {}",
            self.package, self.binary
        ));
        lines.push(String::new());
        lines.push(format!("FROM {}", self.runtime_image.reference()));
        lines.push(format!("WORKDIR {TASK_ROOT}"));
        lines.push(format!(
            "COPY --from=builder /build/target/release/{} {RUNTIME_BINARY_PATH}",
            self.binary
        ));
        lines.push(format!("CMD [\"{}\"]", self.entry_point.reference()));

        let mut rendered = lines.join("\n");
        rendered.push('\n');
        rendered
    }

    /// sha256 of the rendered Dockerfile.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.render_dockerfile().as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// Build-context paths read by the `COPY` lines of a rendered Dockerfile.
/// Copies from an earlier stage are skipped and the destination is dropped.
pub fn copied_sources(dockerfile: &str) -> Vec<&str> {
    dockerfile
        .lines()
        .filter_map(|line| line.trim().strip_prefix("COPY "))
        .filter(|args| !args.starts_with("--from="))
        .flat_map(|args| {
            let mut parts: Vec<&str> = args.split_whitespace().collect();
            parts.pop();
            parts
        })
        .collect()
}

/// The entry point declared by a rendered Dockerfile's `CMD` line.
pub fn declared_entry_point(dockerfile: &str) -> Option<&str> {
    dockerfile
        .lines()
        .rev()
        .find_map(|line| line.trim().strip_prefix("CMD [\""))
        .and_then(|rest| rest.strip_suffix("\"]"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_spec_is_valid_and_targets_auth() {
        let spec = ContainerSpec::default();
        spec.validate().expect("default spec should be valid");
        let dockerfile = spec.render_dockerfile();
        assert!(dockerfile.contains("FROM rust:1.82-slim AS builder"));
        assert!(dockerfile.contains("FROM public.ecr.aws/lambda/provided:al2023"));
        assert!(dockerfile.contains("COPY Cargo.toml Cargo.lock* ./"));
        assert!(dockerfile.contains(
            "cargo build --release --locked -p thoughtful_lambda --bin bootstrap"
        ));
        assert_eq!(declared_entry_point(&dockerfile), Some("handlers.auth"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let spec = ContainerSpec::default().with_entry_point(EntryPoint::LearningEntries);
        assert_eq!(spec.render_dockerfile(), spec.clone().render_dockerfile());
        assert_eq!(spec.fingerprint(), spec.clone().fingerprint());
    }

    #[test]
    fn changing_base_tag_keeps_entry_point() {
        let original = ContainerSpec::default().with_entry_point(EntryPoint::PrimmFeedback);
        let bumped = original
            .clone()
            .with_runtime_tag("al2023.2025.01")
            .with_builder_tag("1.83-slim");

        assert_ne!(original.fingerprint(), bumped.fingerprint());
        assert_eq!(
            declared_entry_point(&original.render_dockerfile()),
            declared_entry_point(&bumped.render_dockerfile())
        );
    }

    #[test]
    fn declared_entry_point_resolves() {
        for entry in EntryPoint::ALL {
            let dockerfile = ContainerSpec::default()
                .with_entry_point(entry)
                .render_dockerfile();
            let declared = declared_entry_point(&dockerfile).expect("CMD present");
            assert_eq!(declared.parse::<EntryPoint>(), Ok(entry));
        }
    }

    #[test]
    fn rejects_unlocked_build() {
        let mut spec = ContainerSpec::default();
        spec.lockfile = " ".to_string();
        let error = spec.validate().expect_err("missing lockfile");
        assert!(error.message().contains("lockfile"));
    }

    #[test]
    fn generates_lockfile_before_locked_build() {
        let dockerfile = ContainerSpec::default().render_dockerfile();
        let generate = dockerfile
            .find("RUN test -f Cargo.lock || cargo generate-lockfile")
            .expect("lockfile fallback");
        let build = dockerfile.find("cargo build").expect("build step");
        assert!(generate < build);
    }

    #[test]
    fn lists_build_context_sources() {
        let dockerfile = ContainerSpec::default().render_dockerfile();
        assert_eq!(
            copied_sources(&dockerfile),
            vec!["Cargo.toml", "Cargo.lock*", "crates", "xtask"]
        );
    }

    #[test]
    fn rejects_empty_tag() {
        let spec = ContainerSpec::default().with_runtime_tag(" ");
        assert!(spec.validate().is_err());
    }
}
