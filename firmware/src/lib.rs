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

//! Ember device firmware, emulator build.
//!
//! The device is a single async task: host messages come in over a channel,
//! get turned into an [`handlers::Event`] stream (assembling link fragments
//! into requests on the way), and a per-state handler consumes events until
//! it transitions somewhere else.

use futures::stream;

use rand_chacha::rand_core::SeedableRng;

use tokio::sync::mpsc;

use model::emulator::{DeviceMessage, HostMessage};
use model::{Message, MessageFragment, Request, MAX_FRAGMENT_LEN};

pub mod config;
pub mod error;
pub mod handlers;
pub mod homescreen;
pub mod hw;
pub mod translations;
pub mod version;

pub use error::Error;

use handlers::{CurrentState, Event, HandlerPeripherals};

pub const DEVICE_NAME: &str = "Ember";

/// Run the device until the host side hangs up.
pub async fn run(
    flash: hw::Flash,
    entropy: u64,
    host: mpsc::UnboundedReceiver<HostMessage>,
    device: mpsc::UnboundedSender<DeviceMessage>,
) {
    let mut peripherals = HandlerPeripherals {
        link: hw::LinkChannel::new(device.clone()),
        display: hw::Display::new(device.clone()),
        flash,
        rng: rand_chacha::ChaCha20Rng::seed_from_u64(entropy),
        translations: translations::Store::new(),
    };

    let events = stream::unfold(
        (host, device, Message::empty()),
        |(mut host, device, mut partial)| async move {
            loop {
                let event = match host.recv().await? {
                    HostMessage::Tick => {
                        // Echo processed ticks so the host can count device time
                        let _ = device.send(DeviceMessage::Tick);
                        Event::Tick
                    }
                    HostMessage::Input(v) => Event::Input(v),
                    HostMessage::Link(fragment) => {
                        if fragment.len() != MAX_FRAGMENT_LEN {
                            log::warn!("Dropping malformed fragment ({} bytes)", fragment.len());
                            continue;
                        }

                        let finished =
                            match partial.push_fragment(MessageFragment::from(fragment.as_slice()))
                            {
                                Ok(finished) => finished,
                                Err(e) => {
                                    log::warn!("Link error: {:?}", e);
                                    partial = Message::empty();
                                    continue;
                                }
                            };
                        if !finished {
                            continue;
                        }

                        let request = partial.deserialize::<Request>();
                        partial = Message::empty();
                        match request {
                            Ok(request) => {
                                log::trace!("< {:?}", request);
                                Event::Request(request)
                            }
                            Err(e) => {
                                log::warn!("Undecodable request: {:?}", e);
                                continue;
                            }
                        }
                    }
                };

                return Some((event, (host, device, partial)));
            }
        },
    );
    let mut events = Box::pin(events);

    let mut state = CurrentState::POR;
    loop {
        handlers::dispatch_handler(&mut state, events.as_mut(), &mut peripherals).await;
    }
}
