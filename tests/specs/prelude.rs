//! Shared harness for the workspace specs.

// Not every spec module touches every harness field.
#![allow(dead_code)]

use ixado_adapters::{FakeGh, FakeGit};
use ixado_core::{AdapterId, Assignee, Settings, SystemClock};
use ixado_engine::{AgentSupervisor, ControlCenter, PhaseRunner, RuntimeBus};
use ixado_storage::{ProjectPaths, RegistryFile};
use tempfile::TempDir;

pub struct Kernel {
    pub runner: PhaseRunner<SystemClock, FakeGit, FakeGh>,
    pub git: FakeGit,
    pub gh: FakeGh,
    pub dir: TempDir,
}

impl Kernel {
    pub fn service(&self) -> &ControlCenter<SystemClock> {
        self.runner.service()
    }
}

/// A fully wired kernel on a fresh temp project, mock adapter only.
pub fn kernel(settings: Settings) -> Kernel {
    let dir = TempDir::new().unwrap();
    let paths = ProjectPaths::resolve_with_home(dir.path(), dir.path().join("home"));
    let registry = RegistryFile::new(paths.registry_file());
    let service = ControlCenter::with_paths(paths, settings, SystemClock);
    service.ensure_initialized("IxADO", dir.path()).unwrap();

    let supervisor = AgentSupervisor::new(registry, RuntimeBus::new(), SystemClock);
    let git = FakeGit::new("main");
    let gh = FakeGh::new();
    let runner = PhaseRunner::new(service, supervisor, git.clone(), gh.clone());
    Kernel {
        runner,
        git,
        gh,
        dir,
    }
}

/// Settings whose mock adapter runs the given shell script.
pub fn settings_with_mock_script(script: &str) -> Settings {
    let mut settings = Settings::default();
    settings.adapters.insert(
        "MOCK_CLI".to_string(),
        ixado_core::AdapterSettings {
            command: Some("/bin/sh".to_string()),
            args: Some(vec!["-c".to_string(), script.to_string()]),
            timeout_ms: 10_000,
            startup_silence_timeout_ms: 10_000,
        },
    );
    settings
}

pub fn mock_assignee() -> Assignee {
    Assignee::Adapter(AdapterId::MockCli)
}
