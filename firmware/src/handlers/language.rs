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

use core::str::FromStr;

use futures::prelude::*;

use gui::{ConfirmBarPage, Page, TransferProgressPage};
use model::langpack::{BlobError, TranslationsHeader, HEADER_LEN};
use model::{DeviceConfig, Reply, SafetyCheckLevel};

use super::*;
use crate::hw::MAX_TRANSLATIONS_LEN;
use crate::{translations, version, Error};

#[cfg(feature = "production")]
const TRANSLATIONS_SIGNING_KEY: &str =
    "dff1d77f2a671c5f36183726db2341be58feae1da2deced843240f7b502ba659";

#[cfg(not(feature = "production"))]
const TRANSLATIONS_SIGNING_KEY: &str =
    "79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";

/// Run all the blob checks in the order the original device applies them.
/// Unsigned blobs only pass when safety checks are relaxed.
fn verify_blob(blob: &[u8], config: &DeviceConfig) -> Result<TranslationsHeader, BlobError> {
    let header = TranslationsHeader::parse(blob)?;
    header.verify_payload(blob)?;
    header.verify_version(&version::TRANSLATIONS_VERSION)?;

    if header.is_unsigned() {
        if config.safety_checks == SafetyCheckLevel::Strict {
            return Err(BlobError::InvalidSignature);
        }

        log::warn!("Installing an unsigned language pack");
    } else {
        let signing_key = secp256k1::XOnlyPublicKey::from_str(TRANSLATIONS_SIGNING_KEY)
            .expect("Valid signing pubkey");
        header.verify_signature(blob, &signing_key)?;
    }

    Ok(header)
}

pub async fn handle_change_language(
    config: DeviceConfig,
    data_length: usize,
    mut events: impl Stream<Item = Event> + Unpin,
    peripherals: &mut HandlerPeripherals,
) -> Result<CurrentState, Error> {
    log::info!("handle_change_language, data_length = {}", data_length);

    let title = peripherals.translations.tr("title__language").to_string();
    let cancel = peripherals.translations.tr("buttons__cancel").to_string();
    let confirm = peripherals.translations.tr("buttons__confirm").to_string();

    // Empty data restores the built-in English strings
    if data_length == 0 {
        let mut page = ConfirmBarPage::new(
            &title,
            vec!["Restore default language?".to_string()],
            &cancel,
            &confirm,
        );
        page.draw_to(&mut peripherals.display)?;
        peripherals.display.flush()?;

        manage_confirmation_loop(&mut events, peripherals, &mut page).await?;

        translations::erase_blob(&mut peripherals.flash)?;
        peripherals.translations.reset();

        peripherals.link.send(Reply::Ok).await?;
        return Ok(CurrentState::Idle { config });
    }

    if data_length > MAX_TRANSLATIONS_LEN {
        peripherals
            .link
            .send(Reply::Error("Translations too long".into()))
            .await?;
        return Ok(CurrentState::Idle { config });
    }
    if data_length < HEADER_LEN {
        peripherals
            .link
            .send(Reply::Error("Invalid data length".into()))
            .await?;
        return Ok(CurrentState::Idle { config });
    }

    let mut page = TransferProgressPage::new(&title, data_length);
    page.draw_to(&mut peripherals.display)?;
    peripherals.display.flush()?;

    peripherals.link.send(Reply::NextChunk(0)).await?;

    let mut blob = Vec::with_capacity(data_length);

    {
        let events = only_requests(&mut events);
        pin_mut!(events);

        loop {
            match events.next().await {
                Some(model::Request::TranslationChunk(data)) => {
                    if blob.len() + data.len() > data_length {
                        peripherals
                            .link
                            .send(Reply::Error("Invalid data length".into()))
                            .await?;
                        return Ok(CurrentState::Idle { config });
                    }

                    blob.extend_from_slice(&data);
                    page.add_progress(data.len());

                    peripherals.link.send(Reply::NextChunk(blob.len())).await?;
                }
                Some(model::Request::CompleteChangeLanguage) => break,
                Some(model::Request::Ping) => {
                    peripherals.link.send(Reply::Pong).await?;
                }
                Some(_) => {
                    peripherals.link.send(Reply::UnexpectedMessage).await?;
                    return Ok(CurrentState::Idle { config });
                }
                _ => return Err(Error::BrokenProtocol),
            }
        }
    }

    if blob.len() != data_length {
        peripherals
            .link
            .send(Reply::Error("Invalid data length".into()))
            .await?;
        return Ok(CurrentState::Idle { config });
    }

    let header = match verify_blob(&blob, &config) {
        Ok(header) => header,
        Err(e) => {
            log::warn!("Rejecting language pack: {}", e);
            peripherals.link.send(Reply::Error(e.to_string())).await?;
            return Ok(CurrentState::Idle { config });
        }
    };

    let mut page = ConfirmBarPage::new(
        &title,
        vec![format!("Change language to {}?", header.language)],
        &cancel,
        &confirm,
    );
    page.draw_to(&mut peripherals.display)?;
    peripherals.display.flush()?;

    manage_confirmation_loop(&mut events, peripherals, &mut page).await?;

    translations::write_blob(&mut peripherals.flash, &blob)?;
    if let Err(e) = peripherals.translations.install_from_blob(&blob) {
        // Verified above, so this only fires on a corrupt payload encoding
        log::warn!("Failed to install language pack: {}", e);
        peripherals.translations.reset();
        translations::erase_blob(&mut peripherals.flash)?;

        peripherals.link.send(Reply::Error(e.to_string())).await?;
        return Ok(CurrentState::Idle { config });
    }

    peripherals.link.send(Reply::Ok).await?;

    Ok(CurrentState::Idle { config })
}
