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

use gui::{Page, SummaryPage};
use model::{DeviceConfig, Reply};

use super::*;
use crate::{config, translations, Error};

pub async fn wipe_device(
    _config: DeviceConfig,
    mut events: impl Stream<Item = Event> + Unpin,
    peripherals: &mut HandlerPeripherals,
) -> Result<CurrentState, Error> {
    log::info!("wipe_device");

    let title = peripherals.translations.tr("title__wipe").to_string();
    let cancel = peripherals.translations.tr("buttons__cancel").to_string();
    let confirm = peripherals.translations.tr("buttons__confirm").to_string();

    let mut page = SummaryPage::new_with_threshold(&title, "HOLD BTN TO WIPE", &cancel, &confirm, 70);
    page.draw_to(&mut peripherals.display)?;
    peripherals.display.flush()?;

    manage_confirmation_loop(&mut events, peripherals, &mut page).await?;

    config::erase_config(&mut peripherals.flash)?;
    translations::erase_blob(&mut peripherals.flash)?;
    peripherals.translations.reset();

    peripherals.link.send(Reply::Ok).await?;

    // Soft reboot: back through power-on reset with the flash now empty
    Ok(CurrentState::POR)
}
