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

//! Messages exchanged between the emulated device task and the host harness.

use serde::{Deserialize, Serialize};

use crate::Screen;

/// Host → device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HostMessage {
    /// One debug-link fragment.
    Link(Vec<u8>),
    /// Button pressed/released.
    Input(bool),
    /// Advance device time by one tick.
    Tick,
}

/// Device → host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DeviceMessage {
    /// One debug-link fragment.
    Link(Vec<u8>),
    /// Freshly flushed screen layout.
    Screen(Screen),
    /// Echo of a processed tick, lets the harness count device time.
    Tick,
}
