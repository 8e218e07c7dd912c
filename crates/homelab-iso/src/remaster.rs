//! Unattended-install remastering
//!
//! Hashes the account password with `mkpasswd`, renders a preseed answer
//! file and hands both to the remaster script (`ubuntu-auto.sh`).

use crate::error::{IsoError, Result};
use crate::fetch::require_binary;
use crate::flavor::Flavor;
use homelab_core::AnswerFile;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tera::{Context, Tera};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

const PRESEED_TEMPLATE: &str = include_str!("../templates/preseed.cfg");
const SEED_FILE: &str = "lab.seed";

pub const DEFAULT_SCRIPT: &str = "ubuntu-auto.sh";
pub const DEFAULT_MKPASSWD: &str = "mkpasswd";

#[derive(Debug, Clone)]
pub struct RemasterRequest {
    pub flavor: String,
    pub input: PathBuf,
    /// Defaults to `<input stem>-unattended.iso` in the workspace
    pub output: Option<PathBuf>,
    pub workspace: PathBuf,
    pub usb_boot: bool,
    pub reuse: bool,
    pub debug: bool,
    pub answers: AnswerFile,
}

impl RemasterRequest {
    pub fn output_path(&self) -> PathBuf {
        if let Some(output) = &self.output {
            return output.clone();
        }
        let stem = self
            .input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        self.workspace.join(format!("{}-unattended.iso", stem))
    }
}

#[derive(Serialize)]
struct PreseedContext<'a> {
    timezone: &'a str,
    username: &'a str,
    password_hash: &'a str,
    hostname: &'a str,
    domain: &'a str,
    ip_address: &'a str,
    net_mask: &'a str,
    gateway: &'a str,
    name_servers: String,
}

/// Render the preseed answer file
pub fn render_preseed(answers: &AnswerFile, password_hash: &str) -> Result<String> {
    let ctx = PreseedContext {
        timezone: &answers.timezone,
        username: &answers.username,
        password_hash,
        hostname: &answers.hostname,
        domain: &answers.domain,
        ip_address: &answers.ip_address,
        net_mask: &answers.net_mask,
        gateway: &answers.gateway,
        // preseed wants a space separated list
        name_servers: answers.name_servers.join(" "),
    };
    let context = Context::from_serialize(&ctx)?;
    Ok(Tera::one_off(PRESEED_TEMPLATE, &context, false)?)
}

#[derive(Debug, Clone)]
pub struct Remaster {
    script: PathBuf,
    mkpasswd: PathBuf,
}

impl Default for Remaster {
    fn default() -> Self {
        Self {
            script: PathBuf::from(DEFAULT_SCRIPT),
            mkpasswd: PathBuf::from(DEFAULT_MKPASSWD),
        }
    }
}

impl Remaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(mut self, script: impl Into<PathBuf>) -> Self {
        self.script = script.into();
        self
    }

    pub fn with_mkpasswd(mut self, mkpasswd: impl Into<PathBuf>) -> Self {
        self.mkpasswd = mkpasswd.into();
        self
    }

    /// Produce the unattended-install image, returning its path
    pub async fn run(&self, request: &RemasterRequest) -> Result<PathBuf> {
        let codename = Flavor::lookup(&request.flavor)?.seed_codename()?;
        if !request.input.is_file() {
            return Err(IsoError::InputNotFound(request.input.clone()));
        }

        require_binary(&self.mkpasswd, "Install the whois package to get mkpasswd").await?;
        require_binary(&self.script, "Put ubuntu-auto.sh on PATH").await?;

        if !request.workspace.exists() {
            tokio::fs::create_dir_all(&request.workspace).await?;
        }

        let hash = self.hash_password(&request.answers.password).await?;
        let seed = request.workspace.join(SEED_FILE);
        tokio::fs::write(&seed, render_preseed(&request.answers, &hash)?).await?;
        tracing::debug!("Wrote preseed to {}", seed.display());

        let output = request.output_path();
        let mut args: Vec<std::ffi::OsString> = vec![
            "--seed".into(),
            seed.into_os_string(),
            "--flavor".into(),
            codename.into(),
            "--workspace".into(),
            request.workspace.clone().into_os_string(),
            "--input".into(),
            request.input.clone().into_os_string(),
            "--output".into(),
            output.clone().into_os_string(),
        ];
        if request.usb_boot {
            args.push("--bootable".into());
        }
        if request.reuse {
            args.push("--reuse".into());
        }
        if request.debug {
            args.push("--debug".into());
        }

        tracing::info!("Remastering {} into {}", request.input.display(), output.display());
        self.run_script(&args).await?;
        Ok(output)
    }

    /// `mkpasswd -s -m sha-512`, password on stdin
    async fn hash_password(&self, password: &str) -> Result<String> {
        let mut child = Command::new(&self.mkpasswd)
            .args(["-s", "-m", "sha-512"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| IsoError::CommandFailed(format!("Failed to run mkpasswd: {}", e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(password.as_bytes()).await?;
            stdin.write_all(b"\n").await?;
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(IsoError::CommandFailed(format!(
                "mkpasswd failed: {}",
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn run_script(&self, args: &[std::ffi::OsString]) -> Result<()> {
        tracing::debug!(
            "Running: {} {}",
            self.script.display(),
            args.iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let output = Command::new(&self.script)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            tracing::debug!("{}", line);
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(IsoError::CommandFailed(format!(
                "{} exited with {}: {}",
                self.script.display(),
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}
