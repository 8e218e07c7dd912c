//! Proxmox provider implementation
//!
//! Provisions one VM in five stages, each gating the next:
//! resolve image, ensure base image, remaster (unattended images only),
//! upload, create and optionally start.

use crate::api::{Credentials, PlatformApi, ProxmoxClient};
use crate::auth::{ensure_session, forget_rejected};
use crate::error::{ProxmoxError, Result};
use crate::upload::{ISO_FORMAT, upload_file};
use crate::vm::{CreateVmRequest, DEFAULT_NODE, IsoRef, create_and_start};
use async_trait::async_trait;
use homelab_cloud::{
    CloudError, Provider, ProviderFactory, ProviderRegistry, ProvisionContext, Session,
};
use homelab_core::{CoreError, Image, ProviderConfig, ProviderKind, ProxmoxConfig, Vm, find_image};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Proxmox VE provider
pub struct ProxmoxProvider<A = ProxmoxClient> {
    config: ProxmoxConfig,
    api: A,
    ctx: ProvisionContext,
}

impl ProxmoxProvider<ProxmoxClient> {
    pub fn new(config: ProxmoxConfig, ctx: ProvisionContext) -> Result<Self> {
        Ok(Self::with_api(config, ProxmoxClient::new()?, ctx))
    }
}

impl<A: PlatformApi> ProxmoxProvider<A> {
    pub fn with_api(config: ProxmoxConfig, api: A, ctx: ProvisionContext) -> Self {
        Self { config, api, ctx }
    }

    async fn session(&self) -> Result<Session> {
        let credentials = Credentials::from(&self.config.identity);
        ensure_session(
            &self.api,
            &self.ctx.session,
            &self.config.api,
            &credentials,
            false,
        )
        .await
    }

    /// Upload target: the VM's image store, else the datastore tagged `iso`,
    /// else whatever storage the node reports as accepting ISOs
    fn iso_storage<'a>(&'a self, vm: &'a Vm) -> Option<&'a str> {
        vm.image
            .store
            .as_deref()
            .or_else(|| self.config.datastore_tagged(ISO_FORMAT).map(|d| d.name.as_str()))
    }

    async fn provision(&self, vm: &Vm, images: &[Image]) -> Result<()> {
        let image = find_image(images, &vm.image.name)
            .ok_or_else(|| CoreError::ImageNotFound(vm.image.name.clone()))?;
        let archetype = self
            .ctx
            .archetypes
            .resolve(ProviderKind::Proxmox, &vm.archetype)?;
        let plan = archetype.plan(&vm.params)?;
        let node = vm
            .provider
            .arg_str("node")
            .unwrap_or_else(|| DEFAULT_NODE.to_string());

        info!("[{}] ensuring base image {}", vm.id, image.flavor);
        let base = self.ctx.gateway.ensure_base_image(image).await?;

        let medium = if image.auto {
            let answers = plan
                .answers
                .as_ref()
                .ok_or_else(|| ProxmoxError::MissingAnswers {
                    vm: vm.id.clone(),
                    image: image.name.clone(),
                })?;
            info!("[{}] remastering {}", vm.id, base.display());
            self.ctx.gateway.remaster(image, &base, answers).await?
        } else {
            base
        };

        info!("[{}] uploading {}", vm.id, medium.display());
        let session = self.session().await?;
        let uploaded = upload_file(
            &self.api,
            &session,
            &node,
            self.iso_storage(vm),
            ISO_FORMAT,
            &medium,
        )
        .await;
        let storage = forget_rejected(&self.ctx.session, uploaded).await?;

        let session = self.session().await?;
        let request = CreateVmRequest {
            vmid: vm.id.clone(),
            name: vm.name.clone(),
            iso: IsoRef {
                storage,
                file: file_name(&medium),
            },
            plan,
        };
        let start = vm.start || request.plan.start;
        let created = create_and_start(&self.api, &session, &node, &request, start).await;
        forget_rejected(&self.ctx.session, created).await
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[async_trait]
impl<A: PlatformApi> Provider for ProxmoxProvider<A> {
    fn name(&self) -> &str {
        ProviderKind::Proxmox.as_str()
    }

    fn display_name(&self) -> &str {
        "Proxmox VE"
    }

    async fn create_vm(&self, vm: &Vm, images: &[Image]) -> homelab_cloud::Result<()> {
        self.provision(vm, images).await.map_err(CloudError::from)
    }
}

/// Factory building a [`ProxmoxProvider`] from its declaration
pub fn factory() -> ProviderFactory {
    Arc::new(
        |config: &ProviderConfig,
         ctx: &ProvisionContext|
         -> homelab_cloud::Result<Box<dyn Provider>> {
            let proxmox = config
                .as_proxmox()
                .ok_or_else(|| CloudError::ProviderNotFound(config.name().to_string()))?;
            let provider = ProxmoxProvider::new(proxmox.clone(), ctx.clone())?;
            Ok(Box::new(provider))
        },
    )
}

/// Register the proxmox provider type
pub fn register(registry: &mut ProviderRegistry) -> homelab_cloud::Result<()> {
    registry.register(ProviderKind::Proxmox.as_str(), factory())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::StorageInfo;
    use homelab_cloud::{MediaGateway, SessionCache};
    use homelab_core::{AnswerFile, ArchetypeRegistry, Config, ErrorKind, parse_config_str};
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tempfile::{TempDir, tempdir};

    type Log = Arc<Mutex<Vec<String>>>;

    fn record(log: &Log, call: impl Into<String>) {
        log.lock().unwrap().push(call.into());
    }

    struct FakeApi {
        log: Log,
        reject_login: bool,
        reject_upload: bool,
    }

    #[async_trait]
    impl PlatformApi for FakeApi {
        async fn login(&self, api_server: &str, credentials: &Credentials) -> Result<Session> {
            record(&self.log, "login");
            if self.reject_login {
                return Err(ProxmoxError::AuthenticationFailed("401".into()));
            }
            Ok(Session {
                username: format!("{}@{}", credentials.username, credentials.realm),
                ticket: "ticket".into(),
                csrf_token: "csrf".into(),
                api_server: api_server.to_string(),
            })
        }

        async fn list_storage(&self, _: &Session, node: &str) -> Result<Vec<StorageInfo>> {
            record(&self.log, format!("list_storage {}", node));
            Ok(vec![
                StorageInfo {
                    storage: "local-lvm".into(),
                    content: "images".into(),
                },
                StorageInfo {
                    storage: "nas".into(),
                    content: "backup,iso".into(),
                },
            ])
        }

        async fn upload(
            &self,
            _: &Session,
            node: &str,
            storage: &str,
            _format: &str,
            file: &Path,
        ) -> Result<()> {
            record(
                &self.log,
                format!("upload {} {} {}", node, storage, file_name(file)),
            );
            if self.reject_upload {
                return Err(ProxmoxError::AuthenticationFailed("401".into()));
            }
            Ok(())
        }

        async fn create_vm(&self, _: &Session, node: &str, request: &CreateVmRequest) -> Result<()> {
            let ide2 = request
                .form()
                .into_iter()
                .find(|(k, _)| *k == "ide2")
                .map(|(_, v)| v)
                .unwrap_or_default();
            record(&self.log, format!("create {} {} {}", node, request.vmid, ide2));
            Ok(())
        }

        async fn start_vm(&self, _: &Session, _: &str, vmid: &str) -> Result<()> {
            record(&self.log, format!("start {}", vmid));
            Ok(())
        }
    }

    struct FakeGateway {
        log: Log,
        dir: PathBuf,
        fail_ensure: bool,
    }

    #[async_trait]
    impl MediaGateway for FakeGateway {
        async fn ensure_base_image(&self, image: &Image) -> homelab_cloud::Result<PathBuf> {
            record(&self.log, format!("ensure {}", image.flavor));
            if self.fail_ensure {
                return Err(CloudError::Operational("download failed".into()));
            }
            let path = self.dir.join("base.iso");
            std::fs::write(&path, b"iso")?;
            Ok(path)
        }

        async fn remaster(
            &self,
            _image: &Image,
            base: &Path,
            answers: &AnswerFile,
        ) -> homelab_cloud::Result<PathBuf> {
            record(&self.log, format!("remaster {}", answers.hostname));
            let path = base.with_file_name("base-unattended.iso");
            std::fs::write(&path, b"iso")?;
            Ok(path)
        }
    }

    const CONFIG: &str = r#"
version: 1
infra:
  - name: proxmox
    api: https://pve.home:8006/
    identity:
      password: pw
    datastores:
      - name: local
        tags: [iso]
images:
  - name: bionic
    flavor: ubuntu/bionic64
    reuse: true
vms:
  - id: 101
    name: web
    provider:
      name: proxmox
      args:
        node: pve2
    image:
      name: Bionic
    archetype: basic
    params:
      cpu: 2
      memory: 2G
      drive: { store: local-lvm, size: 32G }
      network: { ip: 10.0.0.10, gateway: 10.0.0.1 }
      system: { username: ops, password: pw, hostname: web }
"#;

    struct Harness {
        _dir: TempDir,
        log: Log,
        cache: SessionCache,
        provider: ProxmoxProvider<FakeApi>,
        config: Config,
    }

    fn harness(document: &str, api: impl FnOnce(Log) -> FakeApi, fail_ensure: bool) -> Harness {
        let dir = tempdir().unwrap();
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let archetypes = Arc::new(ArchetypeRegistry::builtin().unwrap());
        let config = parse_config_str(document, &archetypes).unwrap();
        let cache = SessionCache::new(dir.path().join(".proxmox"));
        let gateway = FakeGateway {
            log: log.clone(),
            dir: dir.path().to_path_buf(),
            fail_ensure,
        };
        let ctx = ProvisionContext::new(cache.clone(), Arc::new(gateway), archetypes);
        let proxmox = config.providers[0].as_proxmox().unwrap().clone();
        let provider = ProxmoxProvider::with_api(proxmox, api(log.clone()), ctx);
        Harness {
            _dir: dir,
            log,
            cache,
            provider,
            config,
        }
    }

    fn ok_api(log: Log) -> FakeApi {
        FakeApi {
            log,
            reject_login: false,
            reject_upload: false,
        }
    }

    impl Harness {
        async fn run(&self) -> homelab_cloud::Result<()> {
            self.provider
                .create_vm(&self.config.vms[0], &self.config.images)
                .await
        }

        fn calls(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    #[tokio::test]
    async fn test_plain_image_end_to_end() {
        let h = harness(CONFIG, ok_api, false);
        h.run().await.unwrap();

        assert_eq!(
            h.calls(),
            vec![
                "ensure ubuntu/bionic64",
                "login",
                "upload pve2 local base.iso",
                "create pve2 101 local:iso/base.iso,media=cdrom",
            ]
        );
        let cached = h.cache.load().await.unwrap().unwrap();
        assert_eq!(cached.api_server, "https://pve.home:8006");
    }

    #[tokio::test]
    async fn test_ensure_failure_short_circuits() {
        let h = harness(CONFIG, ok_api, true);
        let err = h.run().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Operational);
        assert_eq!(h.calls(), vec!["ensure ubuntu/bionic64"]);
    }

    #[tokio::test]
    async fn test_auto_image_is_remastered_and_started() {
        let doc = CONFIG
            .replace("    reuse: true", "    auto: true")
            .replace("    archetype: basic", "    archetype: basic\n    start: true");
        let h = harness(&doc, ok_api, false);
        h.run().await.unwrap();

        let calls = h.calls();
        assert_eq!(calls[1], "remaster web");
        assert!(calls.contains(&"upload pve2 local base-unattended.iso".to_string()));
        assert_eq!(calls.last().unwrap(), "start 101");
    }

    #[tokio::test]
    async fn test_cached_session_reused() {
        let h = harness(CONFIG, ok_api, false);
        h.cache
            .save(&Session {
                username: "root@pam".into(),
                ticket: "cached".into(),
                csrf_token: "cached".into(),
                api_server: "https://pve.home:8006".into(),
            })
            .await
            .unwrap();

        h.run().await.unwrap();
        assert!(!h.calls().contains(&"login".to_string()));
    }

    #[tokio::test]
    async fn test_session_of_other_server_not_reused() {
        let h = harness(CONFIG, ok_api, false);
        h.cache
            .save(&Session {
                username: "root@pam".into(),
                ticket: "cached".into(),
                csrf_token: "cached".into(),
                api_server: "https://other:8006".into(),
            })
            .await
            .unwrap();

        h.run().await.unwrap();
        assert_eq!(h.calls().iter().filter(|c| *c == "login").count(), 1);
    }

    #[tokio::test]
    async fn test_storage_matched_through_api() {
        let doc = CONFIG.replace("        tags: [iso]", "        tags: [backup]");
        let h = harness(&doc, ok_api, false);
        h.run().await.unwrap();

        let calls = h.calls();
        assert!(calls.contains(&"list_storage pve2".to_string()));
        assert!(calls.contains(&"upload pve2 nas base.iso".to_string()));
    }

    #[tokio::test]
    async fn test_login_rejected() {
        let h = harness(
            CONFIG,
            |log| FakeApi {
                log,
                reject_login: true,
                reject_upload: false,
            },
            false,
        );
        let err = h.run().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert!(!h.calls().iter().any(|c| c.starts_with("upload")));
    }

    #[tokio::test]
    async fn test_rejected_session_is_cleared() {
        let h = harness(
            CONFIG,
            |log| FakeApi {
                log,
                reject_login: false,
                reject_upload: true,
            },
            false,
        );
        let err = h.run().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert!(h.cache.load().await.unwrap().is_none());
        assert!(!h.calls().iter().any(|c| c.starts_with("create")));
    }

    #[tokio::test]
    async fn test_unknown_image() {
        let h = harness(CONFIG, ok_api, false);
        let err = h
            .provider
            .create_vm(&h.config.vms[0], &[])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Api);
        assert!(h.calls().is_empty());
    }
}
