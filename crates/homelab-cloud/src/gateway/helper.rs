use super::MediaGateway;
use super::protocol::{FIELD_FILE, FIELD_OUTPUT_PATH, expect_field, last_object};
use crate::error::{CloudError, Result};
use async_trait::async_trait;
use homelab_core::{AnswerFile, Image};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Gateway delegating to a helper process, normally `lab` itself
/// (`lab iso get|auto --output-format json`).
#[derive(Debug, Clone)]
pub struct HelperGateway {
    program: PathBuf,
    base_args: Vec<String>,
    work_dir: PathBuf,
    debug: bool,
}

impl HelperGateway {
    pub fn new(program: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            base_args: Vec::new(),
            work_dir: work_dir.into(),
            debug: false,
        }
    }

    /// Arguments placed before every subcommand
    pub fn with_base_args(mut self, args: Vec<String>) -> Self {
        self.base_args = args;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    fn program_name(&self) -> String {
        self.program.display().to_string()
    }

    /// Run the helper and return its stdout
    async fn run_command(&self, args: &[String]) -> Result<String> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.base_args);
        cmd.args(args);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::debug!("Running: {} {}", self.program_name(), args.join(" "));

        let output = cmd.output().await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CloudError::dependency(
                self.program_name(),
                "Install it or pass the helper path with --helper",
            ),
            _ => CloudError::CommandFailed(e.to_string()),
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        if !output.status.success() {
            tracing::debug!("{} exited with {}", self.program_name(), output.status);
            // the helper may still have reported a structured error
            if last_object(&stdout).is_none() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(CloudError::CommandFailed(stderr.trim().to_string()));
            }
        }
        Ok(stdout)
    }

    fn common_args(&self, image: &Image) -> Vec<String> {
        let mut args = vec![
            "--flavor".to_string(),
            image.flavor.clone(),
            "--output-format".to_string(),
            "json".to_string(),
        ];
        if image.reuse {
            args.push("--reuse".to_string());
        }
        if self.debug {
            args.push("--debug".to_string());
        }
        args
    }
}

#[async_trait]
impl MediaGateway for HelperGateway {
    async fn ensure_base_image(&self, image: &Image) -> Result<PathBuf> {
        let mut args = vec!["iso".to_string(), "get".to_string()];
        args.extend(self.common_args(image));
        args.push("--target-dir".to_string());
        args.push(self.work_dir.display().to_string());

        let output = self.run_command(&args).await?;
        let file = expect_field("iso get", &output, FIELD_FILE)?;
        Ok(PathBuf::from(file))
    }

    async fn remaster(&self, image: &Image, base: &Path, answers: &AnswerFile) -> Result<PathBuf> {
        let mut args = vec!["iso".to_string(), "auto".to_string()];
        args.extend(self.common_args(image));
        if image.usb_boot {
            args.push("--usb-boot".to_string());
        }
        let pairs = [
            ("--input-iso", base.display().to_string()),
            ("--workspace", self.work_dir.display().to_string()),
            ("--timezone", answers.timezone.clone()),
            ("--username", answers.username.clone()),
            ("--password", answers.password.clone()),
            ("--hostname", answers.hostname.clone()),
            ("--domain", answers.domain.clone()),
            ("--ip-address", answers.ip_address.clone()),
            ("--net-mask", answers.net_mask.clone()),
            ("--gateway", answers.gateway.clone()),
            ("--name-servers", answers.joined_name_servers()),
        ];
        for (flag, value) in pairs {
            args.push(flag.to_string());
            args.push(value);
        }

        let output = self.run_command(&args).await?;
        let path = expect_field("iso auto", &output, FIELD_OUTPUT_PATH)?;
        Ok(PathBuf::from(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use homelab_core::ErrorKind;

    fn image(reuse: bool) -> Image {
        Image {
            name: "bionic".to_string(),
            flavor: "ubuntu/bionic64".to_string(),
            auto: true,
            usb_boot: false,
            reuse,
        }
    }

    fn answers() -> AnswerFile {
        AnswerFile {
            timezone: "UTC".to_string(),
            username: "ops".to_string(),
            password: "pw".to_string(),
            hostname: "node1".to_string(),
            domain: "home.local".to_string(),
            ip_address: "10.0.0.5".to_string(),
            net_mask: "255.255.255.0".to_string(),
            gateway: "10.0.0.1".to_string(),
            name_servers: vec!["1.1.1.1".to_string(), "8.8.8.8".to_string()],
        }
    }

    /// `sh -c <script> sh <args...>`: the script sees the gateway args as `$@`
    fn shell(script: &str) -> HelperGateway {
        HelperGateway::new("sh", "/tmp/lab").with_base_args(vec![
            "-c".to_string(),
            script.to_string(),
            "sh".to_string(),
        ])
    }

    #[tokio::test]
    async fn test_ensure_base_image_reads_file_field() {
        let gateway = shell(
            r#"echo "fetching $4"; echo '{"level":"INFO","event":"fetch_success","message":"ok","file":"/tmp/lab/ubuntu.iso"}'"#,
        );
        let path = gateway.ensure_base_image(&image(true)).await.unwrap();
        assert_eq!(path, PathBuf::from("/tmp/lab/ubuntu.iso"));
    }

    #[tokio::test]
    async fn test_reuse_flag_forwarded() {
        let script = r#"for a in "$@"; do if [ "$a" = "--reuse" ]; then echo '{"level":"INFO","file":"reused"}'; exit 0; fi; done; echo '{"level":"INFO","file":"fresh"}'"#;
        let gateway = shell(script);
        assert_eq!(
            gateway.ensure_base_image(&image(true)).await.unwrap(),
            PathBuf::from("reused")
        );
        assert_eq!(
            gateway.ensure_base_image(&image(false)).await.unwrap(),
            PathBuf::from("fresh")
        );
    }

    #[tokio::test]
    async fn test_remaster_passes_joined_name_servers() {
        let script = r#"while [ $# -gt 0 ]; do if [ "$1" = "--name-servers" ]; then echo "{\"level\":\"INFO\",\"event\":\"remaster_success\",\"output_path\":\"$2\"}"; exit 0; fi; shift; done; exit 1"#;
        let gateway = shell(script);
        let path = gateway
            .remaster(&image(false), Path::new("/tmp/lab/ubuntu.iso"), &answers())
            .await
            .unwrap();
        assert_eq!(path, PathBuf::from("1.1.1.1,8.8.8.8"));
    }

    #[tokio::test]
    async fn test_error_record() {
        let gateway = shell(r#"echo '{"level":"ERROR","message":"boom"}'; exit 1"#);
        let err = gateway.ensure_base_image(&image(true)).await.unwrap_err();
        assert!(matches!(err, CloudError::Operational(ref m) if m == "boom"));
    }

    #[tokio::test]
    async fn test_failure_without_record() {
        let gateway = shell("echo broken >&2; exit 3");
        let err = gateway.ensure_base_image(&image(true)).await.unwrap_err();
        assert!(matches!(err, CloudError::CommandFailed(ref m) if m == "broken"));
        assert_eq!(err.kind(), ErrorKind::Operational);
    }

    #[tokio::test]
    async fn test_missing_helper() {
        let gateway = HelperGateway::new("/nonexistent/lab-helper", "/tmp");
        let err = gateway.ensure_base_image(&image(true)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Dependency);
    }
}
