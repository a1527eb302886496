// Copyright 2025 Eric Jingryd (tidynest@proton.me)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Store tests
//!
//! The root store is driven through a plain `sh` on a temporary directory,
//! so every command it builds really runs.

use std::{fs, path::Path, sync::Arc, time::Duration};
use tempfile::TempDir;

use crate::{
    shell::{testing::ScriptedRunner, OneShotShell, ShellCommand, ShellError, SuSession},
    store::{AccessMode, LocalModuleStore, ModeGuard, ModuleStore, RootModuleStore, StoreError},
};

fn sh_root_store() -> RootModuleStore {
    RootModuleStore::new(Arc::new(SuSession::new(
        ShellCommand::new("sh"),
        Duration::from_secs(10),
    )))
}

/// Runs the shared contract checks against any store.
fn check_store_contract(store: &dyn ModuleStore, root: &Path) {
    let script = root.join("scripts/nested/click_735.sh");
    let payload = "#!/bin/bash\n\n# 脚本内容请在此处添加\necho 'quoted' $HOME\n".as_bytes();

    assert_eq!(store.read_file(&script).unwrap(), None, "Missing file reads as None");
    assert!(!store.exists(&script).unwrap());

    store.write_file(&script, payload).unwrap();
    assert!(store.exists(&script).unwrap());
    assert_eq!(store.read_file(&script).unwrap().as_deref(), Some(payload));

    store.write_file(&root.join("scripts/a.sh"), b"").unwrap();
    assert_eq!(
        store.read_file(&root.join("scripts/a.sh")).unwrap(),
        Some(Vec::new()),
        "Empty file is not missing"
    );

    let listed = store.list_files(&root.join("scripts")).unwrap();
    assert_eq!(
        listed,
        vec![root.join("scripts/a.sh"), root.join("scripts/nested/click_735.sh")]
    );
    assert!(store.list_files(&root.join("nowhere")).unwrap().is_empty());

    store.set_executable(&script).unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(&script).unwrap().permissions().mode();
        assert!(mode & 0o111 != 0, "Script should be executable, mode {:o}", mode);
    }

    store.remove_file(&script).unwrap();
    store.remove_file(&script).unwrap();
    assert!(!store.exists(&script).unwrap());
}

#[test]
fn test_local_store_contract() {
    let temp_dir = TempDir::new().unwrap();
    check_store_contract(&LocalModuleStore::new(), temp_dir.path());
}

#[test]
fn test_root_store_contract() {
    let temp_dir = TempDir::new().unwrap();
    check_store_contract(&sh_root_store(), temp_dir.path());
}

#[test]
fn test_root_store_with_oneshot_shell() {
    let temp_dir = TempDir::new().unwrap();
    let store = RootModuleStore::new(Arc::new(OneShotShell::new(
        ShellCommand::new("sh"),
        Duration::from_secs(10),
    )));
    check_store_contract(&store, temp_dir.path());
}

#[test]
fn test_root_store_handles_quotes_in_paths() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("it's here.txt");

    let store = sh_root_store();
    store.write_file(&path, b"ok").unwrap();
    assert_eq!(fs::read(&path).unwrap(), b"ok");
}

#[test]
fn test_root_store_surfaces_shell_failures() {
    let runner = ScriptedRunner::new().on_failure("chmod", 1, "Operation not permitted");
    let store = RootModuleStore::new(Arc::new(runner));

    match store.set_executable(Path::new("/data/adb/modules/kctrl/kfind")) {
        Err(StoreError::Shell(ShellError::CommandFailed { stderr, .. })) => {
            assert_eq!(stderr, "Operation not permitted");
        }
        other => panic!("Expected CommandFailed, got {:?}", other),
    }
}

#[test]
fn test_root_store_rejects_corrupt_transfer() {
    let runner = ScriptedRunner::new().on("base64", "not*base64");
    let store = RootModuleStore::new(Arc::new(runner));
    assert!(matches!(
        store.read_file(Path::new("/x/config.txt")),
        Err(StoreError::Transfer { .. })
    ));
}

#[test]
fn test_read_text_rejects_binary() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("blob");
    fs::write(&path, [0xff, 0xfe]).unwrap();

    assert!(matches!(
        LocalModuleStore::new().read_text(&path),
        Err(StoreError::InvalidEncoding(_))
    ));
}

#[test]
fn test_dry_run_skips_writes() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.txt");
    let store = ModeGuard::new(Arc::new(LocalModuleStore::new()), AccessMode::DryRun);

    store.write_file(&path, b"enable_log=1\n").unwrap();
    store.remove_file(&path).unwrap();
    assert!(!path.exists(), "Dry run must not touch the filesystem");
}

#[test]
fn test_read_only_blocks_modifications() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.txt");
    fs::write(&path, "enable_log=0\n").unwrap();
    let store = ModeGuard::new(Arc::new(LocalModuleStore::new()), AccessMode::ReadOnly);

    assert!(matches!(
        store.write_file(&path, b"enable_log=1\n"),
        Err(StoreError::ReadOnly(_))
    ));
    assert!(store.remove_file(&path).is_err());
    assert_eq!(
        store.read_text(&path).unwrap().as_deref(),
        Some("enable_log=0\n"),
        "Reads still work"
    );
}

#[test]
fn test_access_mode_parsing() {
    assert_eq!("dry-run".parse::<AccessMode>(), Ok(AccessMode::DryRun));
    assert_eq!("live".parse::<AccessMode>(), Ok(AccessMode::Live));
    assert!("root".parse::<AccessMode>().is_err());
}
