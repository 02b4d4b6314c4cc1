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

use gui::{ConfirmBarPage, Page};
use model::{DeviceConfig, Reply, SafetyCheckLevel, SettingsUpdate, MAX_LABEL_LEN};

use super::*;
use crate::{config, homescreen, Error};

const ALLOWED_ROTATIONS: [u16; 4] = [0, 90, 180, 270];

fn validate(update: &SettingsUpdate) -> Result<(), String> {
    if update.is_empty() {
        return Err("No setting provided".into());
    }

    if let Some(label) = &update.label {
        if label.chars().count() > MAX_LABEL_LEN {
            return Err("Label too long".into());
        }
    }

    if let Some(rotation) = update.display_rotation {
        if !ALLOWED_ROTATIONS.contains(&rotation) {
            return Err("Invalid rotation".into());
        }
    }

    if let Some(image) = &update.homescreen {
        if !image.is_empty() {
            homescreen::validate(image).map_err(|e| e.to_string())?;
        }
    }

    Ok(())
}

fn describe(update: &SettingsUpdate) -> Vec<String> {
    let mut lines = vec![];

    if let Some(label) = &update.label {
        lines.push(format!("Label: {}", label));
    }
    if let Some(enabled) = update.use_passphrase {
        lines.push(format!(
            "Passphrase: {}",
            if enabled { "on" } else { "off" }
        ));
    }
    if let Some(enabled) = update.passphrase_always_on_device {
        lines.push(format!(
            "Passphrase on device: {}",
            if enabled { "on" } else { "off" }
        ));
    }
    if let Some(rotation) = update.display_rotation {
        lines.push(format!("Rotation: {}", rotation));
    }
    if let Some(image) = &update.homescreen {
        if image.is_empty() {
            lines.push("Reset homescreen".to_string());
        } else {
            lines.push("Set homescreen".to_string());
        }
    }
    if let Some(level) = update.safety_checks {
        lines.push(format!("Safety checks: {:?}", level));
    }
    if let Some(enabled) = update.experimental_features {
        lines.push(format!(
            "Experimental features: {}",
            if enabled { "on" } else { "off" }
        ));
    }

    lines
}

pub async fn handle_apply_settings(
    mut config: DeviceConfig,
    update: SettingsUpdate,
    mut events: impl Stream<Item = Event> + Unpin,
    peripherals: &mut HandlerPeripherals,
) -> Result<CurrentState, Error> {
    log::info!("handle_apply_settings");

    if let Err(msg) = validate(&update) {
        peripherals.link.send(Reply::Error(msg)).await?;
        return Ok(CurrentState::Idle { config });
    }

    let title = peripherals.translations.tr("title__settings").to_string();
    let cancel = peripherals.translations.tr("buttons__cancel").to_string();
    let confirm = peripherals.translations.tr("buttons__confirm").to_string();

    let mut page = ConfirmBarPage::new(&title, describe(&update), &cancel, &confirm);
    page.draw_to(&mut peripherals.display)?;
    peripherals.display.flush()?;

    manage_confirmation_loop(&mut events, peripherals, &mut page).await?;

    if let Some(label) = update.label {
        config.label = Some(label);
    }
    if let Some(enabled) = update.use_passphrase {
        config.passphrase_protection = enabled;
        if !enabled {
            // Turning the passphrase off also drops the on-device preference.
            // Re-enabling it later does not bring the preference back.
            config.passphrase_always_on_device = false;
        }
    }
    if let Some(enabled) = update.passphrase_always_on_device {
        config.passphrase_always_on_device = enabled;
    }
    if let Some(rotation) = update.display_rotation {
        config.display_rotation = Some(rotation);
    }
    if let Some(image) = update.homescreen {
        config.homescreen = if image.is_empty() { None } else { Some(image) };
    }
    if let Some(level) = update.safety_checks {
        if level == SafetyCheckLevel::PromptTemporarily {
            log::warn!("Safety checks disabled until the next reboot");
        }
        config.safety_checks = level;
    }
    if let Some(enabled) = update.experimental_features {
        config.experimental_features = enabled;
    }

    config::write_config(&mut peripherals.flash, &config.to_persisted())?;

    peripherals.link.send(Reply::Ok).await?;

    Ok(CurrentState::Idle { config })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_empty() {
        assert_eq!(
            validate(&SettingsUpdate::default()),
            Err("No setting provided".to_string())
        );
    }

    #[test]
    fn test_validate_label() {
        let update = SettingsUpdate {
            label: Some("A".repeat(MAX_LABEL_LEN + 1)),
            ..Default::default()
        };
        assert_eq!(validate(&update), Err("Label too long".to_string()));

        let update = SettingsUpdate {
            label: Some("A".repeat(MAX_LABEL_LEN)),
            ..Default::default()
        };
        assert!(validate(&update).is_ok());
    }

    #[test]
    fn test_validate_rotation() {
        let update = SettingsUpdate {
            display_rotation: Some(123),
            ..Default::default()
        };
        assert_eq!(validate(&update), Err("Invalid rotation".to_string()));
    }
}
