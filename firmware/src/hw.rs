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

//! Emulated peripherals: page-addressed flash, the layout display and the
//! debug-link reply channel.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use model::emulator::DeviceMessage;
use model::{Message, Reply, Screen};

use gui::ScreenTarget;

pub const PAGE_SIZE: usize = 2048;
pub const NUM_PAGES: usize = 64;
pub const FLASH_SIZE: usize = PAGE_SIZE * NUM_PAGES;

pub const CONFIG_PAGE: usize = NUM_PAGES - 1;

pub const TRANSLATIONS_FIRST_PAGE: usize = 32;
pub const TRANSLATIONS_NUM_PAGES: usize = 16;
/// Capacity of the translations area, minus the length prefix.
pub const MAX_TRANSLATIONS_LEN: usize = TRANSLATIONS_NUM_PAGES * PAGE_SIZE - 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashError {
    OutOfBounds,
}

/// In-memory device flash. Cloning yields another handle to the same
/// storage, which is how the emulator seeds and inspects it.
#[derive(Clone)]
pub struct Flash {
    data: Arc<Mutex<Vec<u8>>>,
}

impl Flash {
    pub fn new() -> Self {
        Flash {
            data: Arc::new(Mutex::new(vec![0x00; FLASH_SIZE])),
        }
    }

    pub fn read(&self, address: usize, buf: &mut [u8]) -> Result<(), FlashError> {
        let data = self.data.lock().unwrap();
        let end = address.checked_add(buf.len()).ok_or(FlashError::OutOfBounds)?;
        if end > data.len() {
            return Err(FlashError::OutOfBounds);
        }
        buf.copy_from_slice(&data[address..end]);

        Ok(())
    }

    pub fn write(&mut self, address: usize, bytes: &[u8]) -> Result<(), FlashError> {
        let mut data = self.data.lock().unwrap();
        let end = address
            .checked_add(bytes.len())
            .ok_or(FlashError::OutOfBounds)?;
        if end > data.len() {
            return Err(FlashError::OutOfBounds);
        }
        data[address..end].copy_from_slice(bytes);

        Ok(())
    }

    pub fn erase_page(&mut self, page: usize) -> Result<(), FlashError> {
        if page >= NUM_PAGES {
            return Err(FlashError::OutOfBounds);
        }
        let mut data = self.data.lock().unwrap();
        data[page * PAGE_SIZE..(page + 1) * PAGE_SIZE].fill(0x00);

        Ok(())
    }

    pub fn erase_all(&mut self) {
        self.data.lock().unwrap().fill(0x00);
    }
}

impl Default for Flash {
    fn default() -> Self {
        Flash::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayError;

/// Layout display: pages draw a [`Screen`], `flush` pushes it to the host.
pub struct Display {
    sender: mpsc::UnboundedSender<DeviceMessage>,
    pending: Option<Screen>,
}

impl Display {
    pub fn new(sender: mpsc::UnboundedSender<DeviceMessage>) -> Self {
        Display {
            sender,
            pending: None,
        }
    }

    pub fn flush(&mut self) -> Result<(), DisplayError> {
        if let Some(screen) = self.pending.take() {
            log::trace!("flush: {:?}", screen);
            self.sender
                .send(DeviceMessage::Screen(screen))
                .map_err(|_| DisplayError)?;
        }

        Ok(())
    }
}

impl ScreenTarget for Display {
    type Error = DisplayError;

    fn draw(&mut self, screen: Screen) -> Result<(), Self::Error> {
        self.pending = Some(screen);
        Ok(())
    }
}

/// Reply side of the debug link: serializes a [`Reply`] and pushes it out as
/// 64-byte fragments.
pub struct LinkChannel {
    sender: mpsc::UnboundedSender<DeviceMessage>,
}

impl LinkChannel {
    pub fn new(sender: mpsc::UnboundedSender<DeviceMessage>) -> Self {
        LinkChannel { sender }
    }

    pub async fn send(&mut self, reply: Reply) -> Result<(), crate::Error> {
        log::trace!("> {:?}", reply);

        let message = Message::new_serialize(&reply)?;
        for fragment in message.get_fragments() {
            self.sender
                .send(DeviceMessage::Link(fragment.raw_buf().to_vec()))
                .map_err(|_| crate::Error::Link)?;
        }

        Ok(())
    }
}
