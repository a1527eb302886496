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

//! Single-writer queue for config saves
//!
//! Editors post whole settings or binding sets; one worker thread owns the
//! write path. Requests of the same kind replace each other, and nothing is
//! written until the queue has been quiet for the debounce window, which
//! starts over with every new request. Both kinds are written in one pass,
//! settings first, each as its own read-modify-write of the document.

use std::{
    sync::{
        mpsc::{self, Receiver, RecvTimeoutError, Sender},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crate::{
    config::{ConfigError, ConfigRepository},
    core::{DeviceSelection, KeyBindingSet, ModuleSettings},
};

enum SaveRequest {
    Settings {
        settings: ModuleSettings,
        devices: Vec<DeviceSelection>,
    },
    Keys(KeyBindingSet),
    Flush(Sender<Result<(), String>>),
    Shutdown,
}

#[derive(Default)]
struct Pending {
    settings: Option<(ModuleSettings, Vec<DeviceSelection>)>,
    keys: Option<KeyBindingSet>,
    last_error: Option<String>,
}

impl Pending {
    fn is_empty(&self) -> bool {
        self.settings.is_none() && self.keys.is_none()
    }

    fn write(&mut self, repo: &ConfigRepository) {
        if let Some((settings, devices)) = self.settings.take() {
            if let Err(e) = repo.save_settings(&settings, &devices) {
                tracing::error!("Queued settings save failed: {}", e);
                self.last_error = Some(e.to_string());
            }
        }
        if let Some(bindings) = self.keys.take() {
            if let Err(e) = repo.save_key_bindings(&bindings) {
                tracing::error!("Queued key binding save failed: {}", e);
                self.last_error = Some(e.to_string());
            }
        }
    }
}

/// Handle to the save worker. Dropping it writes what is pending and stops the worker.
pub struct SaveQueue {
    sender: Sender<SaveRequest>,
    worker: Option<JoinHandle<()>>,
}

impl SaveQueue {
    pub fn spawn(repo: Arc<ConfigRepository>, debounce: Duration) -> Self {
        let (sender, receiver) = mpsc::channel();
        let worker = thread::Builder::new()
            .name("kctrl-save-queue".to_string())
            .spawn(move || run_worker(&repo, &receiver, debounce));

        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::error!("Failed to start save worker: {}", e);
                None
            }
        };

        Self { sender, worker }
    }

    fn send(&self, request: SaveRequest) -> Result<(), ConfigError> {
        self.sender
            .send(request)
            .map_err(|_| ConfigError::SaveFailed("save queue has stopped".to_string()))
    }

    /// Queues a settings save, replacing any queued one.
    pub fn save_settings(
        &self,
        settings: ModuleSettings,
        devices: Vec<DeviceSelection>,
    ) -> Result<(), ConfigError> {
        self.send(SaveRequest::Settings { settings, devices })
    }

    /// Queues a key binding save, replacing any queued one.
    pub fn save_key_bindings(&self, bindings: KeyBindingSet) -> Result<(), ConfigError> {
        self.send(SaveRequest::Keys(bindings))
    }

    /// Writes everything queued now and waits for it.
    ///
    /// # Errors
    ///
    /// `ConfigError::SaveFailed` with the last write error since the
    /// previous flush, or if the worker is gone.
    pub fn flush(&self) -> Result<(), ConfigError> {
        let (reply, done) = mpsc::channel();
        self.send(SaveRequest::Flush(reply))?;
        done.recv()
            .map_err(|_| ConfigError::SaveFailed("save queue has stopped".to_string()))?
            .map_err(ConfigError::SaveFailed)
    }

    /// Flushes and stops the worker.
    pub fn shutdown(mut self) -> Result<(), ConfigError> {
        let result = self.flush();
        self.stop();
        result
    }

    fn stop(&mut self) {
        let _ = self.sender.send(SaveRequest::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("Save worker panicked");
            }
        }
    }
}

impl Drop for SaveQueue {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_worker(repo: &ConfigRepository, receiver: &Receiver<SaveRequest>, debounce: Duration) {
    let mut pending = Pending::default();

    loop {
        let request = if pending.is_empty() {
            match receiver.recv() {
                Ok(request) => request,
                Err(_) => break,
            }
        } else {
            match receiver.recv_timeout(debounce) {
                Ok(request) => request,
                Err(RecvTimeoutError::Timeout) => {
                    pending.write(repo);
                    continue;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        };

        match request {
            SaveRequest::Settings { settings, devices } => {
                pending.settings = Some((settings, devices));
            }
            SaveRequest::Keys(bindings) => pending.keys = Some(bindings),
            SaveRequest::Flush(reply) => {
                pending.write(repo);
                let _ = reply.send(pending.last_error.take().map_or(Ok(()), Err));
            }
            SaveRequest::Shutdown => break,
        }
    }

    pending.write(repo);
    tracing::debug!("Save worker stopped");
}
