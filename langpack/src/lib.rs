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

//! Translation blob builder and signer.
//!
//! Turns a JSON language definition into the binary format the device
//! verifies (see `model::langpack`). The bundled definitions are the ones
//! shipped with firmware releases; the development signing key is public so
//! that tests and local tooling can produce installable blobs.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use bitcoin_hashes::{sha256, Hash};

use model::langpack::{
    signed_digest, BlobVersion, BLOB_MAGIC, DATA_HASH_OFFSET, DATA_LENGTH_OFFSET, HEADER_LEN,
    ITEM_COUNT_OFFSET, LANGUAGE_OFFSET, LANGUAGE_TAG_LEN, SIGNATURE_LEN, SIGNATURE_OFFSET,
    VERSION_OFFSET,
};

/// Secret key matching the non-production firmware signing key.
pub const DEV_SIGNING_KEY: &str =
    "0000000000000000000000000000000000000000000000000000000000000001";

/// Languages bundled with firmware releases.
pub const LANGUAGES: [&str; 4] = ["cs", "de", "es", "fr"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefinitionHeader {
    pub language: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageDefinition {
    pub header: DefinitionHeader,
    pub translations: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub enum BuildError {
    InvalidVersion(String),
    InvalidLanguageTag(String),
    PayloadTooLarge(usize),
    TooManyItems(usize),
    UnknownLanguage(String),
    Serialization,
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::InvalidVersion(v) => write!(f, "Invalid version string: {}", v),
            BuildError::InvalidLanguageTag(t) => write!(f, "Invalid language tag: {}", t),
            BuildError::PayloadTooLarge(len) => write!(f, "Payload too large: {} bytes", len),
            BuildError::TooManyItems(n) => write!(f, "Too many translations: {}", n),
            BuildError::UnknownLanguage(l) => write!(f, "Unknown language: {}", l),
            BuildError::Serialization => write!(f, "Serialization error"),
        }
    }
}
impl std::error::Error for BuildError {}

/// Bundled definition for one of [`LANGUAGES`].
pub fn get_lang_def(lang: &str) -> Result<LanguageDefinition, BuildError> {
    let json = match lang {
        "cs" => include_str!("../languages/cs.json"),
        "de" => include_str!("../languages/de.json"),
        "es" => include_str!("../languages/es.json"),
        "fr" => include_str!("../languages/fr.json"),
        _ => return Err(BuildError::UnknownLanguage(lang.to_string())),
    };

    Ok(serde_json::from_str(json).expect("Valid bundled definition"))
}

/// Build an unsigned blob: full header with a zero signature.
pub fn build_blob(def: &LanguageDefinition) -> Result<Vec<u8>, BuildError> {
    let version: BlobVersion = def
        .header
        .version
        .parse()
        .map_err(|_| BuildError::InvalidVersion(def.header.version.clone()))?;

    let tag = def.header.language.as_bytes();
    if tag.is_empty() || tag.len() > LANGUAGE_TAG_LEN || !def.header.language.is_ascii() {
        return Err(BuildError::InvalidLanguageTag(def.header.language.clone()));
    }

    let payload = minicbor::to_vec(&def.translations).map_err(|_| BuildError::Serialization)?;
    if payload.len() > u16::MAX as usize {
        return Err(BuildError::PayloadTooLarge(payload.len()));
    }
    if def.translations.len() > u16::MAX as usize {
        return Err(BuildError::TooManyItems(def.translations.len()));
    }

    let mut blob = vec![0u8; HEADER_LEN];
    blob[..4].copy_from_slice(&BLOB_MAGIC);
    blob[VERSION_OFFSET..VERSION_OFFSET + 2].copy_from_slice(&version.major.to_le_bytes());
    blob[VERSION_OFFSET + 2..VERSION_OFFSET + 4].copy_from_slice(&version.minor.to_le_bytes());
    blob[VERSION_OFFSET + 4..VERSION_OFFSET + 6].copy_from_slice(&version.patch.to_le_bytes());
    blob[LANGUAGE_OFFSET..LANGUAGE_OFFSET + tag.len()].copy_from_slice(tag);
    blob[DATA_LENGTH_OFFSET..DATA_LENGTH_OFFSET + 2]
        .copy_from_slice(&(payload.len() as u16).to_le_bytes());
    blob[ITEM_COUNT_OFFSET..ITEM_COUNT_OFFSET + 2]
        .copy_from_slice(&(def.translations.len() as u16).to_le_bytes());

    let hash = sha256::Hash::hash(&payload).into_inner();
    blob[DATA_HASH_OFFSET..DATA_HASH_OFFSET + 32].copy_from_slice(&hash);

    blob.extend_from_slice(&payload);
    Ok(blob)
}

/// Sign a built blob in place.
pub fn sign_blob(blob: &mut [u8], keypair: &secp256k1::KeyPair) {
    let digest = signed_digest(blob);
    let message = secp256k1::Message::from_slice(&digest).expect("Correct length");

    let ctx = secp256k1::Secp256k1::new();
    let signature = ctx.sign_schnorr(&message, keypair);

    blob[SIGNATURE_OFFSET..SIGNATURE_OFFSET + SIGNATURE_LEN]
        .copy_from_slice(signature.as_ref());
}

pub fn dev_keypair() -> secp256k1::KeyPair {
    let ctx = secp256k1::Secp256k1::new();
    secp256k1::KeyPair::from_seckey_str(&ctx, DEV_SIGNING_KEY).expect("Valid dev key")
}

/// Build a blob signed with the development key, as the device tests do.
pub fn build_signed_blob(def: &LanguageDefinition) -> Result<Vec<u8>, BuildError> {
    let mut blob = build_blob(def)?;
    sign_blob(&mut blob, &dev_keypair());
    Ok(blob)
}
