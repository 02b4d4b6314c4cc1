// Ember Hardware Wallet firmware and supporting software libraries
//
// Copyright (C) 2025 The Ember Developers
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use ember::EmberSdk;

use ::model::emulator::HostMessage;
use ::model::{DeviceConfig, Pin, Screen};

use firmware::hw::Flash;

use crate::link::{self, try_pull_msg, DeviceStreams};

pub mod model;
pub mod report;

/// Initial device state baked into the flash before boot.
#[derive(Debug, Clone)]
pub struct DeviceSetup {
    pub label: Option<String>,
    pub pin: Option<String>,
    pub initialized: bool,
    pub entropy: u64,
}

impl Default for DeviceSetup {
    fn default() -> Self {
        DeviceSetup {
            label: Some("test".to_string()),
            pin: None,
            initialized: true,
            entropy: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum HtmlReport {
    None,
    OnlyFailing,
    All,
}

pub struct EmulatorInstance {
    pub msgs: DeviceStreams,
    /// Last screen flushed by the device.
    pub screen: Option<Screen>,
    pub sdk: Arc<EmberSdk>,
    pub flash: Flash,
    pub entropy: u64,

    host: mpsc::UnboundedSender<HostMessage>,
    tasks: Vec<JoinHandle<()>>,
}

impl EmulatorInstance {
    pub fn spawn(setup: DeviceSetup) -> Result<Self, crate::Error> {
        let mut flash = Flash::new();

        if setup.initialized {
            let pin = setup
                .pin
                .as_deref()
                .map(|pin| Pin::new(pin, setup.entropy.to_be_bytes()));
            let config = DeviceConfig::new(setup.label.clone(), pin);
            firmware::config::write_config(&mut flash, &config)
                .map_err(|e| format!("Failed to seed the config: {:?}", e))?;
        }

        Self::attach(flash, setup.entropy)
    }

    /// Wire a firmware task and a fresh SDK to the given flash.
    fn attach(flash: Flash, entropy: u64) -> Result<Self, crate::Error> {
        let (host_s, host_r) = mpsc::unbounded_channel();
        let (device_s, device_r) = mpsc::unbounded_channel();

        let mut tasks = vec![];
        tasks.push(tokio::spawn(firmware::run(
            flash.clone(),
            entropy,
            host_r,
            device_s,
        )));

        let (msgs, link) = link::stream_incoming_messages(device_r);

        let sdk = EmberSdk::new();
        tasks.extend(Self::attach_sdk(&sdk, host_s.clone(), link));

        Ok(EmulatorInstance {
            msgs,
            screen: None,
            sdk,
            flash,
            entropy,
            host: host_s,
            tasks,
        })
    }

    fn attach_sdk(
        sdk: &Arc<EmberSdk>,
        host: mpsc::UnboundedSender<HostMessage>,
        mut link: mpsc::UnboundedReceiver<Vec<u8>>,
    ) -> Vec<JoinHandle<()>> {
        log::trace!("Attaching SDK");

        let cloned_sdk = Arc::clone(sdk);
        let out_task = tokio::spawn(async move {
            loop {
                let out = match cloned_sdk.poll().await {
                    Ok(out) => out,
                    Err(_) => break,
                };

                log::trace!("> {:02X?}", out);
                if host.send(HostMessage::Link(out)).is_err() {
                    break;
                }
            }
        });

        let cloned_sdk = Arc::clone(sdk);
        let in_task = tokio::spawn(async move {
            while let Some(incoming) = link.recv().await {
                log::trace!("< {:02X?}", incoming);
                if cloned_sdk.incoming_data(incoming).is_err() {
                    break;
                }
            }
        });

        vec![out_task, in_task]
    }

    /// Reboot the device, keeping the flash contents.
    pub async fn reset(&mut self) -> Result<(), crate::Error> {
        log::debug!("Resetting the device");

        for task in self.tasks.drain(..) {
            task.abort();
        }

        let fresh = Self::attach(self.flash.clone(), self.entropy)?;

        self.msgs = fresh.msgs;
        self.screen = None;
        self.sdk = fresh.sdk;
        self.host = fresh.host;
        self.tasks = fresh.tasks;

        Ok(())
    }

    /// Erase the flash and reboot into a factory-fresh device.
    pub async fn wipe_flash(&mut self) -> Result<(), crate::Error> {
        self.flash.erase_all();
        self.reset().await
    }

    pub fn press(&self, value: bool) -> Result<(), crate::Error> {
        self.host
            .send(HostMessage::Input(value))
            .map_err(|e| e.to_string())?;
        Ok(())
    }

    pub fn send_tick(&self) -> Result<(), crate::Error> {
        self.host
            .send(HostMessage::Tick)
            .map_err(|e| e.to_string())?;
        Ok(())
    }

    /// Pull pending screen updates and give the device task a chance to run.
    pub async fn manage_hw(&mut self) -> Result<usize, crate::Error> {
        let mut update_count = 0;
        while let Some(screen) = try_pull_msg(&mut self.msgs.screen)? {
            self.screen = Some(screen);
            update_count += 1;
        }

        // Sleep for a little bit: in case of a single-threaded context this
        // will let the runtime move forward the other tasks a bit. Otherwise
        // we might end up in a deadlock while waiting for something to happen
        tokio::time::sleep(Duration::from_millis(5)).await;

        Ok(update_count)
    }
}

pub async fn list_tests(dir: &Path) -> Result<Vec<PathBuf>, crate::Error> {
    if !dir.is_dir() {
        return Err("Invalid tests_dir".into());
    }

    let mut result = vec![];
    let mut stream = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = stream.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }

        if !entry
            .file_name()
            .into_string()
            .expect("Valid file name")
            .ends_with(".json")
        {
            continue;
        }

        result.push(entry.path());
    }

    Ok(result)
}
