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

//! Custom homescreen validation.
//!
//! The device only accepts grayscale TOIF images matching its display, so all
//! that happens here is a header check: magic, dimensions and the trailing
//! data length. Decoding is left to the display pipeline.

use core::fmt;

pub const HOMESCREEN_MAGIC: &[u8; 4] = b"TOIG";
pub const HOMESCREEN_WIDTH: u16 = 128;
pub const HOMESCREEN_HEIGHT: u16 = 64;
const HOMESCREEN_HEADER_LEN: usize = 12;

/// Header plus the compressed 1-bpp payload can never legitimately exceed
/// one flash page.
pub const MAX_HOMESCREEN_LEN: usize = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomescreenError {
    Invalid,
    TooLarge,
}

impl fmt::Display for HomescreenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            HomescreenError::Invalid => "Invalid homescreen",
            HomescreenError::TooLarge => "Homescreen too large",
        };
        f.write_str(msg)
    }
}
impl std::error::Error for HomescreenError {}

pub fn validate(data: &[u8]) -> Result<(), HomescreenError> {
    if data.len() > MAX_HOMESCREEN_LEN {
        return Err(HomescreenError::TooLarge);
    }
    if data.len() < HOMESCREEN_HEADER_LEN {
        return Err(HomescreenError::Invalid);
    }
    if &data[..4] != HOMESCREEN_MAGIC {
        return Err(HomescreenError::Invalid);
    }

    let width = u16::from_le_bytes(data[4..6].try_into().unwrap());
    let height = u16::from_le_bytes(data[6..8].try_into().unwrap());
    if width != HOMESCREEN_WIDTH || height != HOMESCREEN_HEIGHT {
        return Err(HomescreenError::Invalid);
    }

    let data_len = u32::from_le_bytes(data[8..12].try_into().unwrap()) as usize;
    if data_len != data.len() - HOMESCREEN_HEADER_LEN {
        return Err(HomescreenError::Invalid);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    pub fn make_image(width: u16, height: u16, payload_len: usize) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(HOMESCREEN_MAGIC);
        data.extend_from_slice(&width.to_le_bytes());
        data.extend_from_slice(&height.to_le_bytes());
        data.extend_from_slice(&(payload_len as u32).to_le_bytes());
        data.extend(std::iter::repeat(0x55).take(payload_len));
        data
    }

    #[test]
    fn test_valid_image() {
        validate(&make_image(128, 64, 256)).unwrap();
    }

    #[test]
    fn test_wrong_size() {
        assert_eq!(
            validate(&make_image(64, 64, 256)),
            Err(HomescreenError::Invalid)
        );
    }

    #[test]
    fn test_jpeg_rejected() {
        let jpeg = [0xFFu8, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46, 0x00, 0x01];
        assert_eq!(validate(&jpeg), Err(HomescreenError::Invalid));
    }

    #[test]
    fn test_length_mismatch() {
        let mut data = make_image(128, 64, 256);
        data.extend_from_slice(b"junk");
        assert_eq!(validate(&data), Err(HomescreenError::Invalid));
    }

    #[test]
    fn test_too_large() {
        assert_eq!(
            validate(&make_image(128, 64, MAX_HOMESCREEN_LEN)),
            Err(HomescreenError::TooLarge)
        );
    }
}
