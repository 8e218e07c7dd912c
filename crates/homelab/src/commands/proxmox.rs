use crate::output::Reporter;
use crate::{ProxmoxCommands, VmCommands};
use clap::error::ErrorKind as ClapErrorKind;
use clap::{Arg, ArgAction, Command};
use homelab_cloud::{Level, ResultRecord, SessionCache};
use homelab_core::{Archetype, ArchetypeRegistry, CoreError, FlagSpec, FlagValues, ProviderKind};
use homelab_proxmox::auth::forget_rejected;
use homelab_proxmox::{
    COMMON_CREATE_FLAGS, Credentials, ProxmoxClient, cached_session, create_and_start,
    ensure_session, request_from_flags, upload_file,
};

pub async fn handle(cmd: ProxmoxCommands, reporter: &Reporter) -> anyhow::Result<()> {
    let cache = SessionCache::new(homelab_config::session_cache_path());

    match cmd {
        ProxmoxCommands::Login {
            api_server,
            username,
            password,
            realm,
            force,
        } => {
            let client = ProxmoxClient::new()?;
            let credentials = Credentials {
                username,
                password,
                realm,
            };
            let session = ensure_session(&client, &cache, &api_server, &credentials, force).await?;

            let record = ResultRecord::new(
                Level::Info,
                "login_success",
                format!("Logged in to {} as {}", session.api_server, session.username),
            )
            .with("username", session.username.clone());
            reporter.success(&record)
        }
        ProxmoxCommands::Upload {
            node,
            file,
            storage,
            format,
        } => {
            let client = ProxmoxClient::new()?;
            let session = cached_session(&cache).await?;
            let uploaded =
                upload_file(&client, &session, &node, storage.as_deref(), &format, &file).await;
            let storage = forget_rejected(&cache, uploaded).await?;

            let record = ResultRecord::new(
                Level::Info,
                "upload_success",
                format!("Uploaded {} to {}/{}", file.display(), node, storage),
            )
            .with("storage", storage.clone());
            reporter.success(&record)
        }
        ProxmoxCommands::Vm(VmCommands::Create { archetype, args }) => {
            let archetypes = ArchetypeRegistry::builtin()?;
            let archetype = archetypes.resolve(ProviderKind::Proxmox, &archetype)?;
            let Some(values) = parse_archetype_flags(archetype.as_ref(), &args)? else {
                return Ok(());
            };

            let (node, request) = request_from_flags(archetype.as_ref(), &values)?;
            let client = ProxmoxClient::new()?;
            let session = cached_session(&cache).await?;
            let start = request.plan.start;
            let created = create_and_start(&client, &session, &node, &request, start).await;
            forget_rejected(&cache, created).await?;

            let verb = if start { "created and started" } else { "created" };
            let record = ResultRecord::new(
                Level::Info,
                "vm_created",
                format!("VM {} ({}) {} on {}", request.vmid, request.name, verb, node),
            )
            .with("vmid", request.vmid.clone());
            reporter.success(&record)
        }
        ProxmoxCommands::Vm(VmCommands::Archetypes) => {
            let archetypes = ArchetypeRegistry::builtin()?;
            for archetype in archetypes.iter() {
                let record = ResultRecord::new(
                    Level::Info,
                    "archetype",
                    format!("{:<12} {}", archetype.name(), archetype.short()),
                )
                .with("name", archetype.name());
                reporter.emit(&record)?;
            }
            Ok(())
        }
    }
}

fn flag_arg(spec: &FlagSpec) -> Arg {
    let arg = Arg::new(spec.name).long(spec.name).help(spec.help);
    if spec.switch {
        return arg.action(ArgAction::SetTrue);
    }
    let arg = arg.required(spec.required);
    match spec.default {
        Some(default) => arg.default_value(default),
        None => arg,
    }
}

/// `vm create <archetype>` as a command built from the archetype's flags
fn archetype_command(archetype: &dyn Archetype) -> Command {
    let name = archetype.name().to_string();
    let about = archetype.short().to_string();
    let long_about = archetype.long().to_string();
    let mut cmd = Command::new(name)
        .about(about)
        .long_about(long_about)
        .no_binary_name(true);
    for spec in COMMON_CREATE_FLAGS.iter().chain(archetype.flags()) {
        cmd = cmd.arg(flag_arg(spec));
    }
    cmd
}

/// Flag values from `args`, or `None` when help was requested and printed
fn parse_archetype_flags(
    archetype: &dyn Archetype,
    args: &[String],
) -> anyhow::Result<Option<FlagValues>> {
    let matches = match archetype_command(archetype).try_get_matches_from(args) {
        Ok(matches) => matches,
        Err(e) if matches!(e.kind(), ClapErrorKind::DisplayHelp) => {
            e.print()?;
            return Ok(None);
        }
        Err(e) => return Err(CoreError::Parse(e.to_string().trim().to_string()).into()),
    };

    let mut values = FlagValues::new();
    for spec in COMMON_CREATE_FLAGS.iter().chain(archetype.flags()) {
        if spec.switch {
            values.insert(spec.name.to_string(), matches.get_flag(spec.name).to_string());
        } else if let Some(value) = matches.get_one::<String>(spec.name) {
            values.insert(spec.name.to_string(), value.clone());
        }
    }
    Ok(Some(values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use homelab_core::BasicArchetype;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_flags_with_defaults() {
        let values = parse_archetype_flags(
            &BasicArchetype,
            &args(&[
                "--id", "120", "--name", "db", "--iso-image", "bionic.iso", "--drive-storage",
                "local-lvm", "--start",
            ]),
        )
        .unwrap()
        .unwrap();

        assert_eq!(values["node"], "pve");
        assert_eq!(values["iso-storage"], "local");
        assert_eq!(values["core"], "2");
        assert_eq!(values["start"], "true");

        let (node, request) = request_from_flags(&BasicArchetype, &values).unwrap();
        assert_eq!(node, "pve");
        assert_eq!(request.iso.file, "bionic.iso");
        assert_eq!(request.plan.drive.size_gb, 64);
        assert!(request.plan.start);
    }

    #[test]
    fn test_switch_defaults_to_false() {
        let values = parse_archetype_flags(
            &BasicArchetype,
            &args(&[
                "--id", "120", "--name", "db", "--iso-image", "x.iso", "--drive-storage", "lvm",
            ]),
        )
        .unwrap()
        .unwrap();
        assert_eq!(values["start"], "false");
    }

    #[test]
    fn test_missing_required_flag_is_parse_error() {
        let err = parse_archetype_flags(&BasicArchetype, &args(&["--id", "120"])).unwrap_err();
        let core = err.downcast_ref::<CoreError>().unwrap();
        assert_eq!(core.kind(), homelab_core::ErrorKind::Parse);
    }
}
