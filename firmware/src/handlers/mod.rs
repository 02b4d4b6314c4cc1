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

use std::boxed::Box;
use std::pin::Pin;

use futures::pin_mut;
use futures::prelude::*;

use gui::{ConfirmBarPage, ErrorPage, Page};
use model::{DeviceConfig, Reply, SettingsUpdate};

use crate::{hw, translations, Error};

pub mod debug;
pub mod idle;
pub mod init;
pub mod language;
pub mod settings;

pub enum CurrentState {
    /// Power on reset
    POR,
    /// Empty new device
    Init,
    /// Initialized but locked device
    Locked { config: DeviceConfig },
    /// Device ready
    Idle { config: DeviceConfig },
    /// Writing the initial configuration
    InitializeDevice {
        label: Option<String>,
        pin: Option<String>,
    },
    /// Settings change waiting for confirmation
    ApplySettings {
        config: DeviceConfig,
        update: SettingsUpdate,
    },
    /// Receiving a translation blob
    ChangeLanguage {
        config: DeviceConfig,
        data_length: usize,
    },
    /// Button-protected echo request
    Echo {
        config: DeviceConfig,
        message: String,
    },
    /// Wipe device
    WipeDevice { config: DeviceConfig },
    /// Error
    Error,
}

#[derive(Debug)]
pub enum Event {
    Tick,
    Input(bool),
    Request(model::Request),
}

pub struct HandlerPeripherals {
    pub link: hw::LinkChannel,
    pub display: hw::Display,
    pub flash: hw::Flash,
    pub rng: rand_chacha::ChaCha20Rng,
    pub translations: translations::Store,
}

fn only_requests(stream: impl Stream<Item = Event>) -> impl Stream<Item = model::Request> {
    stream.filter_map(|e| async move {
        match e {
            Event::Request(r) => Some(r),
            _ => None,
        }
    })
}

pub async fn dispatch_handler<'a>(
    current_state: &'a mut CurrentState,
    events: impl Stream<Item = Event> + Unpin + Send + 'a,
    peripherals: &'a mut HandlerPeripherals,
) {
    pin_mut!(events);

    let mut moved_state = CurrentState::Init;
    core::mem::swap(&mut moved_state, current_state);

    let result = match moved_state {
        CurrentState::POR => Box::pin(init::handle_por(peripherals))
            as Pin<Box<dyn Future<Output = Result<CurrentState, Error>> + Send + '_>>,
        CurrentState::Init => Box::pin(init::handle_init(events, peripherals))
            as Pin<Box<dyn Future<Output = Result<CurrentState, Error>> + Send + '_>>,
        CurrentState::Locked { config } => {
            Box::pin(init::handle_locked(config, events, peripherals))
                as Pin<Box<dyn Future<Output = Result<CurrentState, Error>> + Send + '_>>
        }
        CurrentState::Idle { config } => Box::pin(idle::handle_idle(config, events, peripherals))
            as Pin<Box<dyn Future<Output = Result<CurrentState, Error>> + Send + '_>>,
        CurrentState::InitializeDevice { label, pin } => {
            Box::pin(init::handle_initialize_device(label, pin, events, peripherals))
                as Pin<Box<dyn Future<Output = Result<CurrentState, Error>> + Send + '_>>
        }
        CurrentState::ApplySettings { config, update } => {
            Box::pin(settings::handle_apply_settings(config, update, events, peripherals))
                as Pin<Box<dyn Future<Output = Result<CurrentState, Error>> + Send + '_>>
        }
        CurrentState::ChangeLanguage {
            config,
            data_length,
        } => Box::pin(language::handle_change_language(
            config,
            data_length,
            events,
            peripherals,
        )) as Pin<Box<dyn Future<Output = Result<CurrentState, Error>> + Send + '_>>,
        CurrentState::Echo { config, message } => {
            Box::pin(idle::handle_protected_echo(config, message, events, peripherals))
                as Pin<Box<dyn Future<Output = Result<CurrentState, Error>> + Send + '_>>
        }
        CurrentState::WipeDevice { config } => {
            Box::pin(debug::wipe_device(config, events, peripherals))
                as Pin<Box<dyn Future<Output = Result<CurrentState, Error>> + Send + '_>>
        }
        CurrentState::Error => Box::pin(handle_error_state(peripherals))
            as Pin<Box<dyn Future<Output = Result<CurrentState, Error>> + Send + '_>>,
    }
    .await;

    *current_state = match result {
        Ok(new_state) => new_state,
        Err(e) => {
            log::error!("Handler error: {:?}", e);
            CurrentState::Error
        }
    }
}

/// Terminal state: show the error screen and stop processing events, exactly
/// like a halted device.
async fn handle_error_state(peripherals: &mut HandlerPeripherals) -> Result<CurrentState, Error> {
    let title = peripherals.translations.tr("words__error").to_string();

    let page = ErrorPage::new(&title, "General Failure");
    let _ = page.draw_to(&mut peripherals.display);
    let _ = peripherals.display.flush();

    futures::future::pending::<()>().await;
    unreachable!()
}

/// Drive a hold-to-confirm page: progress accrues on every tick while the
/// button is held and resets when it is released. Requests arriving in the
/// meantime are answered with `DelayedReply` so the host keeps polling.
pub(super) async fn manage_confirmation_loop(
    mut events: impl Stream<Item = Event> + Unpin,
    peripherals: &mut HandlerPeripherals,
    page: &mut ConfirmBarPage<'_>,
) -> Result<(), Error> {
    let mut pressing = false;

    while !page.is_confirmed() {
        match events.next().await.ok_or(Error::BrokenProtocol)? {
            Event::Request(_) => {
                peripherals.link.send(Reply::DelayedReply).await?;
            }
            Event::Input(v) if v != pressing => {
                pressing = v;
                if !v {
                    page.reset_confirm();
                }
            }
            Event::Tick => {
                if pressing {
                    page.add_confirm(gui::CONFIRM_PER_TICK);
                }
            }
            _ => {}
        }
    }

    Ok(())
}
