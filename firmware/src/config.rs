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

use model::DeviceConfig;

use crate::hw::{Flash, CONFIG_PAGE, PAGE_SIZE};

pub fn read_config(flash: &Flash) -> Result<DeviceConfig, ConfigError> {
    let mut buf = [0u8; PAGE_SIZE];
    flash.read(CONFIG_PAGE * PAGE_SIZE, &mut buf)?;

    let len = u16::from_be_bytes(buf[..2].try_into().unwrap()) as usize;
    if len == 0 || len >= PAGE_SIZE - 2 {
        return Err(ConfigError::CorruptedConfig);
    }

    let config = minicbor::decode(&buf[2..2 + len])?;
    Ok(config)
}

pub fn write_config(flash: &mut Flash, config: &DeviceConfig) -> Result<(), ConfigError> {
    let mut data = vec![0x00, 0x00];
    let serialized = minicbor::to_vec(config).expect("always succeed");

    if serialized.len() > PAGE_SIZE - 2 {
        return Err(ConfigError::CorruptedConfig);
    }

    let len = (serialized.len() as u16).to_be_bytes();
    data.extend(serialized);
    data[..2].copy_from_slice(&len);
    data.resize(PAGE_SIZE, 0x00);

    flash.erase_page(CONFIG_PAGE)?;
    flash.write(CONFIG_PAGE * PAGE_SIZE, &data)?;

    Ok(())
}

pub fn erase_config(flash: &mut Flash) -> Result<(), ConfigError> {
    flash.erase_page(CONFIG_PAGE)?;

    Ok(())
}

#[derive(Debug)]
pub enum ConfigError {
    CorruptedConfig,
    Deserialization,

    Flash(crate::hw::FlashError),
}

impl From<minicbor::decode::Error> for ConfigError {
    fn from(_: minicbor::decode::Error) -> Self {
        ConfigError::Deserialization
    }
}
impl From<crate::hw::FlashError> for ConfigError {
    fn from(e: crate::hw::FlashError) -> Self {
        ConfigError::Flash(e)
    }
}
