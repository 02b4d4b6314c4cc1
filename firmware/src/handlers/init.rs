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

use gui::{Page, SingleLineTextPage, SummaryPage, WelcomePage};
use model::{DeviceConfig, Features, Pin, Reply, MAX_LABEL_LEN};

use super::*;
use crate::{config, version, Error};

pub async fn handle_por(peripherals: &mut HandlerPeripherals) -> Result<CurrentState, Error> {
    let page = SingleLineTextPage::new("Loading...");
    page.draw_to(&mut peripherals.display)?;
    peripherals.display.flush()?;

    if let Err(e) = peripherals
        .translations
        .load_from_flash(&peripherals.flash, &version::TRANSLATIONS_VERSION)
    {
        log::warn!("Stored language pack rejected: {}", e);
        peripherals.translations.reset();
    }

    let config = match config::read_config(&peripherals.flash) {
        Ok(config) => config,
        Err(e) => {
            log::warn!("Config error: {:?}", e);
            return Ok(CurrentState::Init);
        }
    };

    if config.pin.is_some() {
        Ok(CurrentState::Locked { config })
    } else {
        Ok(CurrentState::Idle { config })
    }
}

pub async fn handle_init(
    mut events: impl Stream<Item = Event> + Unpin,
    peripherals: &mut HandlerPeripherals,
) -> Result<CurrentState, Error> {
    let page = WelcomePage::new(crate::DEVICE_NAME);
    page.draw_to(&mut peripherals.display)?;
    peripherals.display.flush()?;

    let events = only_requests(&mut events);
    pin_mut!(events);

    loop {
        match events.next().await {
            Some(model::Request::GetFeatures) => {
                peripherals
                    .link
                    .send(Reply::Features(Features::new_uninitialized(
                        peripherals.translations.language(),
                        env!("CARGO_PKG_VERSION"),
                    )))
                    .await?;
                continue;
            }
            Some(model::Request::InitializeDevice { label, pin }) => {
                if let Some(label) = &label {
                    if label.chars().count() > MAX_LABEL_LEN {
                        peripherals
                            .link
                            .send(Reply::Error("Label too long".into()))
                            .await?;
                        continue;
                    }
                }

                break Ok(CurrentState::InitializeDevice { label, pin });
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

pub async fn handle_initialize_device(
    label: Option<String>,
    pin: Option<String>,
    mut events: impl Stream<Item = Event> + Unpin,
    peripherals: &mut HandlerPeripherals,
) -> Result<CurrentState, Error> {
    log::info!("handle_initialize_device");

    let title = peripherals.translations.tr("title__initialize").to_string();
    let cancel = peripherals.translations.tr("buttons__cancel").to_string();
    let confirm = peripherals.translations.tr("buttons__confirm").to_string();

    let mut page = SummaryPage::new(&title, "HOLD BTN TO CONFIRM", &cancel, &confirm);
    page.draw_to(&mut peripherals.display)?;
    peripherals.display.flush()?;

    manage_confirmation_loop(&mut events, peripherals, &mut page).await?;

    let pin = pin.map(|pin| {
        let mut salt = [0u8; 8];
        peripherals.rng.fill_bytes(&mut salt);
        Pin::new(&pin, salt)
    });

    let config = DeviceConfig::new(label, pin);
    config::write_config(&mut peripherals.flash, &config)?;

    peripherals.link.send(Reply::Ok).await?;

    Ok(CurrentState::Idle { config })
}

pub async fn handle_locked(
    config: DeviceConfig,
    mut events: impl Stream<Item = Event> + Unpin,
    peripherals: &mut HandlerPeripherals,
) -> Result<CurrentState, Error> {
    let title = peripherals.translations.tr("words__locked").to_string();
    let page = SingleLineTextPage::new(&title);
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
                        false,
                        peripherals.translations.language(),
                        env!("CARGO_PKG_VERSION"),
                    )))
                    .await?;
                continue;
            }
            Some(model::Request::Unlock { pin }) => {
                let stored = config.pin.as_ref().expect("Locked implies a PIN");
                if !stored.check(&pin) {
                    peripherals.link.send(Reply::WrongPin).await?;
                    continue;
                }

                peripherals.link.send(Reply::Ok).await?;
                break Ok(CurrentState::Idle { config });
            }
            Some(model::Request::Ping) => {
                peripherals.link.send(Reply::Pong).await?;
                continue;
            }
            Some(_) => {
                peripherals.link.send(Reply::Locked).await?;
                continue;
            }
            _ => break Err(Error::BrokenProtocol),
        }
    }
}
