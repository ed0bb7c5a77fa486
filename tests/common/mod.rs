//! Shared utilities for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use reload_conductor::config::PathsConfig;
use reload_conductor::model::{
    AclRuleGroup, Action, BackendPool, ChangeSetId, Frontend, Placement, ReloadMode, RouteBatch, Server,
    ServiceRoute,
};
use reload_conductor::proxy::{CommandFailure, ProxyControl};
use reload_conductor::service::ConductorService;

/// Scripted `ProxyControl`. Each queued result is consumed by the next call
/// of that kind; an empty script means success.
#[derive(Default)]
pub struct FakeProxy {
    validate_script: Mutex<VecDeque<Result<(), CommandFailure>>>,
    reload_script: Mutex<VecDeque<Result<(), CommandFailure>>>,
    pub validations: AtomicUsize,
    pub reloads: AtomicUsize,
    pub starts: AtomicUsize,
    pub kills: AtomicUsize,
}

impl FakeProxy {
    pub fn reject_next_validation(&self, diagnostic: &str) {
        self.validate_script
            .lock()
            .unwrap()
            .push_back(Err(CommandFailure::new(diagnostic)));
    }

    pub fn fail_next_reload(&self, diagnostic: &str) {
        self.reload_script
            .lock()
            .unwrap()
            .push_back(Err(CommandFailure::new(diagnostic)));
    }

    pub fn validations(&self) -> usize {
        self.validations.load(Ordering::SeqCst)
    }

    pub fn reloads(&self) -> usize {
        self.reloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProxyControl for FakeProxy {
    async fn start(&self, config: &Path) -> Result<(), CommandFailure> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if config.exists() {
            Ok(())
        } else {
            Err(CommandFailure::new("no active config"))
        }
    }

    async fn validate(&self, _config: &Path) -> Result<(), CommandFailure> {
        self.validations.fetch_add(1, Ordering::SeqCst);
        self.validate_script.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }

    async fn reload(&self) -> Result<(), CommandFailure> {
        self.reloads.fetch_add(1, Ordering::SeqCst);
        self.reload_script.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }

    async fn kill(&self) -> Result<(), CommandFailure> {
        self.kills.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Temp directories plus a service wired to a `FakeProxy`.
pub struct Harness {
    pub root: tempfile::TempDir,
    pub paths: PathsConfig,
    pub proxy: Arc<FakeProxy>,
    pub service: Arc<ConductorService>,
}

impl Harness {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let paths = PathsConfig {
            conf_dir: root.path().join("conf"),
            proxy_dir: root.path().join("haproxy"),
            live_marker: root.path().join("live"),
        };
        fs::create_dir_all(&paths.conf_dir).unwrap();
        fs::create_dir_all(&paths.proxy_dir).unwrap();
        fs::write(paths.conf_dir.join("base.globalcfg"), "global\n    daemon\n").unwrap();
        fs::write(paths.conf_dir.join("base.defaultcfg"), "defaults\n    mode http\n").unwrap();
        fs::write(paths.conf_dir.join("base.public.frontendcfg"), "\nfrontend public\n    bind *:80\n").unwrap();

        let proxy = Arc::new(FakeProxy::default());
        let service = Arc::new(ConductorService::open(&paths, proxy.clone()).unwrap());
        Self {
            root,
            paths,
            proxy,
            service,
        }
    }

    /// Reopen the service over the same directories, as after a restart.
    pub fn reopen(&mut self) {
        self.service = Arc::new(ConductorService::open(&self.paths, self.proxy.clone()).unwrap());
    }

    pub fn active(&self) -> Option<String> {
        fs::read_to_string(self.paths.proxy_dir.join("config.active")).ok()
    }

    pub fn fragment(&self, name: &str) -> Option<String> {
        fs::read_to_string(self.paths.conf_dir.join(name)).ok()
    }

    pub fn fragment_names(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(&self.paths.conf_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    pub fn proxy_file(&self, name: &str) -> PathBuf {
        self.paths.proxy_dir.join(name)
    }
}

/// The "checkout" route: `/cart` on frontend `public` → `cart-backend`.
pub fn checkout_route() -> ServiceRoute {
    route("checkout", "public", "/cart", "cart-backend", "10.0.0.5", 8080)
}

pub fn route(
    id: &str,
    frontend: &str,
    token: &str,
    backend: &str,
    address: &str,
    port: u16,
) -> ServiceRoute {
    ServiceRoute {
        id: id.into(),
        frontends: vec![Frontend {
            name: frontend.into(),
            acl_groups: vec![AclRuleGroup {
                name: format!("is_{}", id),
                matches: vec![token.into()],
                backend: backend.into(),
            }],
            default_backend: None,
            placement: Placement::Normal,
        }],
        backends: vec![BackendPool {
            name: backend.into(),
            servers: vec![Server {
                name: format!("{}-1", id),
                address: address.into(),
                port,
            }],
            tail: String::new(),
        }],
        action: Action::Upsert,
    }
}

pub fn batched(id: &str, routes: Vec<ServiceRoute>) -> RouteBatch {
    RouteBatch {
        id: Some(ChangeSetId::new(id).unwrap()),
        routes,
        mode: ReloadMode::Batched,
    }
}

pub fn immediate(routes: Vec<ServiceRoute>) -> RouteBatch {
    RouteBatch {
        id: None,
        routes,
        mode: ReloadMode::Immediate,
    }
}

pub fn id(s: &str) -> ChangeSetId {
    ChangeSetId::new(s).unwrap()
}
