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

//! Installed language pack and the built-in English table.

use std::collections::BTreeMap;

use model::langpack::{BlobError, BlobVersion, TranslationsHeader};

use crate::hw::{Flash, MAX_TRANSLATIONS_LEN, PAGE_SIZE, TRANSLATIONS_FIRST_PAGE, TRANSLATIONS_NUM_PAGES};

pub const DEFAULT_LANGUAGE: &str = "en-US";

/// Built-in English strings. Every key the firmware ever looks up must be in
/// this table, installed packs only override it.
pub const ENGLISH: &[(&str, &str)] = &[
    ("words__confirm", "Confirm"),
    ("words__cancel", "Cancel"),
    ("words__ready", "Ready"),
    ("words__error", "Error"),
    ("words__locked", "Locked"),
    ("buttons__confirm", "Confirm"),
    ("buttons__cancel", "Cancel"),
    ("title__settings", "Settings"),
    ("title__language", "Language"),
    ("title__wipe", "Wipe device"),
    ("title__initialize", "Initialize"),
];

struct InstalledPack {
    language: String,
    #[allow(dead_code)]
    version: BlobVersion,
    strings: BTreeMap<String, String>,
}

/// Translation lookup with English fallback for keys missing from the
/// installed pack.
pub struct Store {
    installed: Option<InstalledPack>,
}

impl Store {
    pub fn new() -> Self {
        Store { installed: None }
    }

    pub fn language(&self) -> &str {
        self.installed
            .as_ref()
            .map(|pack| pack.language.as_str())
            .unwrap_or(DEFAULT_LANGUAGE)
    }

    pub fn tr<'s>(&'s self, key: &'s str) -> &'s str {
        if let Some(pack) = &self.installed {
            if let Some(value) = pack.strings.get(key) {
                return value;
            }
        }

        ENGLISH
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
            .unwrap_or(key)
    }

    pub fn reset(&mut self) {
        self.installed = None;
    }

    /// Install a pack from an already verified blob. Only the structural
    /// checks are repeated here.
    pub fn install_from_blob(&mut self, blob: &[u8]) -> Result<(), BlobError> {
        let header = TranslationsHeader::parse(blob)?;
        let strings: BTreeMap<String, String> = minicbor::decode(header.payload(blob))
            .map_err(|_| BlobError::InvalidDataLength)?;

        log::info!(
            "Installing language pack {} v{} ({} items)",
            header.language,
            header.version,
            strings.len()
        );

        self.installed = Some(InstalledPack {
            language: header.language,
            version: header.version,
            strings,
        });

        Ok(())
    }

    /// Re-verify and load the blob persisted in flash, if any.
    pub fn load_from_flash(
        &mut self,
        flash: &Flash,
        expected_version: &BlobVersion,
    ) -> Result<(), BlobError> {
        self.reset();

        let blob = match read_blob(flash) {
            Some(blob) => blob,
            None => return Ok(()),
        };

        let header = TranslationsHeader::parse(&blob)?;
        header.verify_payload(&blob)?;
        header.verify_version(expected_version)?;

        self.install_from_blob(&blob)
    }
}

impl Default for Store {
    fn default() -> Self {
        Store::new()
    }
}

pub fn read_blob(flash: &Flash) -> Option<Vec<u8>> {
    let base = TRANSLATIONS_FIRST_PAGE * PAGE_SIZE;

    let mut len = [0u8; 4];
    flash.read(base, &mut len).ok()?;
    let len = u32::from_be_bytes(len) as usize;
    if len == 0 || len > MAX_TRANSLATIONS_LEN {
        return None;
    }

    let mut blob = vec![0u8; len];
    flash.read(base + 4, &mut blob).ok()?;
    Some(blob)
}

pub fn write_blob(flash: &mut Flash, blob: &[u8]) -> Result<(), crate::Error> {
    if blob.len() > MAX_TRANSLATIONS_LEN {
        return Err(crate::Error::Unknown);
    }

    erase_blob(flash)?;

    let base = TRANSLATIONS_FIRST_PAGE * PAGE_SIZE;
    flash.write(base, &(blob.len() as u32).to_be_bytes())?;
    flash.write(base + 4, blob)?;

    Ok(())
}

pub fn erase_blob(flash: &mut Flash) -> Result<(), crate::Error> {
    for page in TRANSLATIONS_FIRST_PAGE..TRANSLATIONS_FIRST_PAGE + TRANSLATIONS_NUM_PAGES {
        flash.erase_page(page)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_english_fallback() {
        let store = Store::new();
        assert_eq!(store.language(), "en-US");
        assert_eq!(store.tr("words__confirm"), "Confirm");
        // unknown keys render as themselves rather than panicking
        assert_eq!(store.tr("words__nonexistent"), "words__nonexistent");
    }

    #[test]
    fn test_blob_storage_roundtrip() {
        let mut flash = Flash::new();
        assert!(read_blob(&flash).is_none());

        let blob = vec![0xABu8; 300];
        write_blob(&mut flash, &blob).unwrap();
        assert_eq!(read_blob(&flash).as_deref(), Some(blob.as_slice()));

        erase_blob(&mut flash).unwrap();
        assert!(read_blob(&flash).is_none());
    }
}
