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

use futures::prelude::*;

use rand_chacha::rand_core::RngCore;

use gui::{ConfirmBarPage, InitialPage, Page};
use model::{DeviceConfig, Features, Reply};

use super::*;
use crate::Error;

pub async fn handle_idle(
    config: DeviceConfig,
    mut events: impl Stream<Item = Event> + Unpin,
    peripherals: &mut HandlerPeripherals,
) -> Result<CurrentState, Error> {
    log::info!("handle_idle");

    let title = config
        .label
        .clone()
        .unwrap_or_else(|| crate::DEVICE_NAME.to_string());
    let status = peripherals.translations.tr("words__ready").to_string();

    let page = InitialPage::new(&title, &status);
    page.draw_to(&mut peripherals.display)?;
    peripherals.display.flush()?;

    let events = only_requests(&mut events);
    pin_mut!(events);

    loop {
        match events.next().await {
            Some(model::Request::GetFeatures) => {
                peripherals
                    .link
                    .send(Reply::Features(Features::from_config(
                        &config,
                        true,
                        peripherals.translations.language(),
                        env!("CARGO_PKG_VERSION"),
                    )))
                    .await?;
                continue;
            }
            Some(model::Request::ApplySettings(update)) => {
                break Ok(CurrentState::ApplySettings { config, update });
            }
            Some(model::Request::BeginChangeLanguage { data_length }) => {
                break Ok(CurrentState::ChangeLanguage {
                    config,
                    data_length,
                });
            }
            Some(model::Request::WipeDevice) => {
                break Ok(CurrentState::WipeDevice { config });
            }
            Some(model::Request::Echo {
                message,
                button_protection,
            }) => {
                if button_protection {
                    break Ok(CurrentState::Echo { config, message });
                }

                peripherals.link.send(Reply::Echo(message)).await?;
                continue;
            }
            Some(model::Request::GetNonce) => {
                if !config.experimental_features {
                    peripherals
                        .link
                        .send(Reply::Error("Experimental features are disabled".into()))
                        .await?;
                    continue;
                }

                let mut nonce = [0u8; 32];
                peripherals.rng.fill_bytes(&mut nonce);
                peripherals
                    .link
                    .send(Reply::Nonce(nonce.to_vec().into()))
                    .await?;
                continue;
            }
            Some(model::Request::InitializeDevice { .. }) => {
                peripherals
                    .link
                    .send(Reply::Error("Already initialized".into()))
                    .await?;
                continue;
            }
            Some(model::Request::Ping) => {
                peripherals.link.send(Reply::Pong).await?;
                continue;
            }
            Some(_) => {
                peripherals.link.send(Reply::UnexpectedMessage).await?;
                continue;
            }
            _ => break Err(Error::BrokenProtocol),
        }
    }
}

/// Button-protected echo: the confirm word doubles as the dialog title, which
/// is how the harness checks that installed translations actually render.
pub async fn handle_protected_echo(
    config: DeviceConfig,
    message: String,
    mut events: impl Stream<Item = Event> + Unpin,
    peripherals: &mut HandlerPeripherals,
) -> Result<CurrentState, Error> {
    log::info!("handle_protected_echo");

    let title = peripherals.translations.tr("words__confirm").to_string();
    let cancel = peripherals.translations.tr("buttons__cancel").to_string();
    let confirm = peripherals.translations.tr("buttons__confirm").to_string();

    let mut page = ConfirmBarPage::new(&title, vec![message.clone()], &cancel, &confirm);
    page.draw_to(&mut peripherals.display)?;
    peripherals.display.flush()?;

    manage_confirmation_loop(&mut events, peripherals, &mut page).await?;

    peripherals.link.send(Reply::Echo(message)).await?;

    Ok(CurrentState::Idle { config })
}
