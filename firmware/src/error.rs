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

use crate::{config, hw};

#[derive(Debug)]
pub enum Error {
    BrokenProtocol,

    Unknown,

    Link,
    Config(config::ConfigError),
    Flash(hw::FlashError),
    Message(model::MessageError),
    Display(hw::DisplayError),
}

impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Error::Config(e)
    }
}
impl From<hw::FlashError> for Error {
    fn from(e: hw::FlashError) -> Self {
        Error::Flash(e)
    }
}
impl From<model::MessageError> for Error {
    fn from(e: model::MessageError) -> Self {
        Error::Message(e)
    }
}
impl From<hw::DisplayError> for Error {
    fn from(e: hw::DisplayError) -> Self {
        Error::Display(e)
    }
}
