use crate::IsoCommands;
use crate::output::Reporter;
use homelab_cloud::gateway::protocol::{
    EVENT_FETCH_SUCCESS, EVENT_REMASTER_SUCCESS, FIELD_FILE, FIELD_OUTPUT_PATH,
};
use homelab_cloud::{Level, ResultRecord};
use homelab_core::AnswerFile;
use homelab_iso::{IsoFetcher, Remaster, RemasterRequest};

pub async fn handle(cmd: IsoCommands, debug: bool, reporter: &Reporter) -> anyhow::Result<()> {
    match cmd {
        IsoCommands::Get {
            flavor,
            target_dir,
            reuse,
        } => {
            let target_dir = target_dir.unwrap_or_else(homelab_config::work_dir);
            let outcome = IsoFetcher::wget().fetch(&flavor, &target_dir, reuse).await?;

            let message = if outcome.reused {
                format!("Reusing {}", outcome.path.display())
            } else {
                format!("Downloaded {}", outcome.path.display())
            };
            let record = ResultRecord::new(Level::Info, EVENT_FETCH_SUCCESS, message)
                .with(FIELD_FILE, outcome.path.display().to_string());
            reporter.success(&record)
        }
        IsoCommands::Auto {
            flavor,
            input_iso,
            output_iso,
            workspace,
            usb_boot,
            reuse,
            timezone,
            username,
            password,
            hostname,
            domain,
            ip_address,
            net_mask,
            gateway,
            name_servers,
        } => {
            let request = RemasterRequest {
                flavor,
                input: input_iso,
                output: output_iso,
                workspace: workspace.unwrap_or_else(homelab_config::work_dir),
                usb_boot,
                reuse,
                debug,
                answers: AnswerFile {
                    timezone,
                    username,
                    password,
                    hostname,
                    domain,
                    ip_address,
                    net_mask,
                    gateway,
                    name_servers: split_name_servers(&name_servers),
                },
            };
            let output = Remaster::new().run(&request).await?;

            let record = ResultRecord::new(
                Level::Info,
                EVENT_REMASTER_SUCCESS,
                format!("Unattended image written to {}", output.display()),
            )
            .with(FIELD_OUTPUT_PATH, output.display().to_string());
            reporter.success(&record)
        }
    }
}

fn split_name_servers(raw: &str) -> Vec<String> {
    raw.split(AnswerFile::NAME_SERVER_DELIMITER)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_name_servers() {
        assert_eq!(
            split_name_servers("1.1.1.1, 8.8.8.8,"),
            vec!["1.1.1.1", "8.8.8.8"]
        );
        assert!(split_name_servers("").is_empty());
    }
}
