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

use tokio::sync::mpsc;

use model::emulator::DeviceMessage;
use model::Screen;

pub struct DeviceStreams {
    pub screen: mpsc::UnboundedReceiver<Screen>,
    pub tick: mpsc::UnboundedReceiver<()>,
}

/// Split the raw device-message stream into per-peripheral streams plus the
/// debug-link fragments.
pub fn stream_incoming_messages(
    mut device_msgs: mpsc::UnboundedReceiver<DeviceMessage>,
) -> (DeviceStreams, mpsc::UnboundedReceiver<Vec<u8>>) {
    let (link_s, link) = mpsc::unbounded_channel();
    let (screen_s, screen) = mpsc::unbounded_channel();
    let (tick_s, tick) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Some(device_message) = device_msgs.recv().await {
            match &device_message {
                DeviceMessage::Link(data) => log::trace!("< Link({})", data.len()),
                DeviceMessage::Screen(screen) => log::trace!("< Screen({:?})", screen.title),
                DeviceMessage::Tick => log::trace!("< Tick"),
            }

            let result = match device_message {
                DeviceMessage::Link(data) => link_s.send(data).map_err(|e| e.to_string()),
                DeviceMessage::Screen(s) => screen_s.send(s).map_err(|e| e.to_string()),
                DeviceMessage::Tick => tick_s.send(()).map_err(|e| e.to_string()),
            };

            if let Err(e) = result {
                log::warn!("Stream error: {:?}", e);
                break;
            }
        }
    });

    (DeviceStreams { screen, tick }, link)
}

pub fn try_pull_msg<T>(s: &mut mpsc::UnboundedReceiver<T>) -> Result<Option<T>, String> {
    match s.try_recv() {
        Ok(v) => Ok(Some(v)),
        Err(mpsc::error::TryRecvError::Empty) => Ok(None),
        Err(e) => Err(e.to_string()),
    }
}
