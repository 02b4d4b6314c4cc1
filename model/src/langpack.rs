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

//! Translation blob format.
//!
//! A language pack is a fixed 128-byte header followed by a CBOR map of
//! translation keys. The header commits to the payload through a sha256 hash
//! and is itself covered by a schnorr signature, so the payload can be
//! streamed to flash and verified before anything is installed.
//!
//! ```text
//! 0   .. 4    magic "ELTR"
//! 4   .. 10   version, three little-endian u16 (major, minor, patch)
//! 10  .. 18   language tag, NUL-padded ASCII ("cs-CZ")
//! 18  .. 20   payload length, little-endian u16
//! 20  .. 22   item count, little-endian u16
//! 22  .. 54   sha256 of the payload
//! 54  .. 118  schnorr signature over sha256 of bytes 0..54
//! 118 .. 128  reserved, zero
//! ```

use core::fmt;
use core::str::FromStr;

use bitcoin_hashes::{sha256, Hash};

pub const BLOB_MAGIC: [u8; 4] = *b"ELTR";
pub const HEADER_LEN: usize = 128;
pub const LANGUAGE_TAG_LEN: usize = 8;

pub const VERSION_OFFSET: usize = 4;
pub const LANGUAGE_OFFSET: usize = 10;
pub const DATA_LENGTH_OFFSET: usize = 18;
pub const ITEM_COUNT_OFFSET: usize = 20;
pub const DATA_HASH_OFFSET: usize = 22;
pub const SIGNATURE_OFFSET: usize = 54;
pub const SIGNATURE_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct BlobVersion {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
}

impl BlobVersion {
    pub const fn new(major: u16, minor: u16, patch: u16) -> Self {
        BlobVersion {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for BlobVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[derive(Debug, Clone)]
pub struct InvalidVersion(pub String);

impl fmt::Display for InvalidVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid version string: {}", self.0)
    }
}
impl std::error::Error for InvalidVersion {}

impl FromStr for BlobVersion {
    type Err = InvalidVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('.');
        let mut next = || {
            parts
                .next()
                .and_then(|p| p.parse::<u16>().ok())
                .ok_or_else(|| InvalidVersion(s.to_string()))
        };

        let version = BlobVersion {
            major: next()?,
            minor: next()?,
            patch: next()?,
        };
        if parts.next().is_some() {
            return Err(InvalidVersion(s.to_string()));
        }

        Ok(version)
    }
}

/// Why a blob was rejected. The `Display` strings are asserted verbatim by
/// the device tests, treat them as part of the protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobError {
    InvalidDataLength,
    InvalidMagic,
    InvalidLanguageTag,
    InvalidDataHash,
    VersionMismatch,
    InvalidSignature,
}

impl fmt::Display for BlobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            BlobError::InvalidDataLength => "Invalid data length",
            BlobError::InvalidMagic => "Invalid header magic",
            BlobError::InvalidLanguageTag => "Invalid language tag",
            BlobError::InvalidDataHash => "Invalid data hash",
            BlobError::VersionMismatch => "Translations version mismatch",
            BlobError::InvalidSignature => "Invalid translations signature",
        };
        f.write_str(msg)
    }
}
impl std::error::Error for BlobError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationsHeader {
    pub version: BlobVersion,
    pub language: String,
    pub data_length: usize,
    pub item_count: u16,
    pub data_hash: [u8; 32],
    pub signature: [u8; SIGNATURE_LEN],
}

impl TranslationsHeader {
    /// Parse the header and check that the advertised payload length matches
    /// what was actually received.
    pub fn parse(blob: &[u8]) -> Result<Self, BlobError> {
        if blob.len() < HEADER_LEN {
            return Err(BlobError::InvalidDataLength);
        }
        if blob[..4] != BLOB_MAGIC {
            return Err(BlobError::InvalidMagic);
        }

        let u16_at = |offset: usize| -> u16 {
            u16::from_le_bytes(blob[offset..offset + 2].try_into().unwrap())
        };

        let data_length = u16_at(DATA_LENGTH_OFFSET) as usize;
        if blob.len() - HEADER_LEN != data_length {
            return Err(BlobError::InvalidDataLength);
        }

        let version = BlobVersion {
            major: u16_at(VERSION_OFFSET),
            minor: u16_at(VERSION_OFFSET + 2),
            patch: u16_at(VERSION_OFFSET + 4),
        };

        let tag = &blob[LANGUAGE_OFFSET..LANGUAGE_OFFSET + LANGUAGE_TAG_LEN];
        let tag_len = tag.iter().position(|b| *b == 0x00).unwrap_or(tag.len());
        let language = core::str::from_utf8(&tag[..tag_len])
            .map_err(|_| BlobError::InvalidLanguageTag)?
            .to_string();
        if language.is_empty() || !language.is_ascii() {
            return Err(BlobError::InvalidLanguageTag);
        }

        let mut data_hash = [0u8; 32];
        data_hash.copy_from_slice(&blob[DATA_HASH_OFFSET..DATA_HASH_OFFSET + 32]);
        let mut signature = [0u8; SIGNATURE_LEN];
        signature.copy_from_slice(&blob[SIGNATURE_OFFSET..SIGNATURE_OFFSET + SIGNATURE_LEN]);

        Ok(TranslationsHeader {
            version,
            language,
            data_length,
            item_count: u16_at(ITEM_COUNT_OFFSET),
            data_hash,
            signature,
        })
    }

    pub fn payload<'b>(&self, blob: &'b [u8]) -> &'b [u8] {
        &blob[HEADER_LEN..]
    }

    pub fn verify_payload(&self, blob: &[u8]) -> Result<(), BlobError> {
        let hash = sha256::Hash::hash(self.payload(blob));
        if hash.into_inner() != self.data_hash {
            return Err(BlobError::InvalidDataHash);
        }

        Ok(())
    }

    pub fn verify_version(&self, expected: &BlobVersion) -> Result<(), BlobError> {
        if self.version != *expected {
            return Err(BlobError::VersionMismatch);
        }

        Ok(())
    }

    /// An all-zero signature marks an unsigned (development) blob.
    pub fn is_unsigned(&self) -> bool {
        self.signature.iter().all(|b| *b == 0x00)
    }

    pub fn verify_signature(
        &self,
        blob: &[u8],
        signing_key: &secp256k1::XOnlyPublicKey,
    ) -> Result<(), BlobError> {
        let digest = signed_digest(blob);
        let message = secp256k1::Message::from_slice(&digest).expect("Correct length");
        let signature = secp256k1::schnorr::Signature::from_slice(&self.signature)
            .map_err(|_| BlobError::InvalidSignature)?;

        let ctx = secp256k1::Secp256k1::verification_only();
        ctx.verify_schnorr(&signature, &message, signing_key)
            .map_err(|_| BlobError::InvalidSignature)
    }
}

/// Digest covered by the header signature: everything up to the signature
/// field itself.
pub fn signed_digest(blob: &[u8]) -> [u8; 32] {
    sha256::Hash::hash(&blob[..SIGNATURE_OFFSET]).into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_blob(payload: &[u8]) -> Vec<u8> {
        let mut blob = vec![0u8; HEADER_LEN];
        blob[..4].copy_from_slice(&BLOB_MAGIC);
        blob[VERSION_OFFSET..VERSION_OFFSET + 2].copy_from_slice(&1u16.to_le_bytes());
        blob[LANGUAGE_OFFSET..LANGUAGE_OFFSET + 5].copy_from_slice(b"cs-CZ");
        blob[DATA_LENGTH_OFFSET..DATA_LENGTH_OFFSET + 2]
            .copy_from_slice(&(payload.len() as u16).to_le_bytes());
        let hash = sha256::Hash::hash(payload).into_inner();
        blob[DATA_HASH_OFFSET..DATA_HASH_OFFSET + 32].copy_from_slice(&hash);
        blob.extend_from_slice(payload);
        blob
    }

    #[test]
    fn test_parse_blob() {
        let blob = dummy_blob(b"hello");
        let header = TranslationsHeader::parse(&blob).unwrap();

        assert_eq!(header.language, "cs-CZ");
        assert_eq!(header.version, BlobVersion::new(1, 0, 0));
        assert_eq!(header.data_length, 5);
        header.verify_payload(&blob).unwrap();
        assert!(header.is_unsigned());
    }

    #[test]
    fn test_bad_magic() {
        let mut blob = dummy_blob(b"hello");
        blob[..4].copy_from_slice(b"aaaa");
        assert_eq!(
            TranslationsHeader::parse(&blob),
            Err(BlobError::InvalidMagic)
        );
    }

    #[test]
    fn test_trailing_garbage() {
        let mut blob = dummy_blob(b"hello");
        blob.extend_from_slice(b"abcd");
        assert_eq!(
            TranslationsHeader::parse(&blob),
            Err(BlobError::InvalidDataLength)
        );
    }

    #[test]
    fn test_truncated() {
        assert_eq!(
            TranslationsHeader::parse(&[0u8; 12]),
            Err(BlobError::InvalidDataLength)
        );
    }

    #[test]
    fn test_tampered_payload() {
        let mut blob = dummy_blob(b"hello");
        let len = blob.len();
        blob[len - 1] ^= 0xFF;

        let header = TranslationsHeader::parse(&blob).unwrap();
        assert_eq!(header.verify_payload(&blob), Err(BlobError::InvalidDataHash));
    }

    #[test]
    fn test_version_mismatch() {
        let blob = dummy_blob(b"hello");
        let header = TranslationsHeader::parse(&blob).unwrap();
        assert_eq!(
            header.verify_version(&BlobVersion::new(3, 5, 4)),
            Err(BlobError::VersionMismatch)
        );
    }

    #[test]
    fn test_version_parse() {
        assert_eq!("1.2.3".parse::<BlobVersion>().unwrap(), BlobVersion::new(1, 2, 3));
        assert!("ABC.XYZ.DEF".parse::<BlobVersion>().is_err());
        assert!("1.2".parse::<BlobVersion>().is_err());
        assert!("1.2.3.4".parse::<BlobVersion>().is_err());
    }
}
