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

pub use minicbor::bytes::{ByteArray, ByteVec};
use minicbor::{Decode, Encode};

use modular_bitfield::prelude::*;

use bitcoin_hashes::{sha256, Hash, HashEngine};

pub const MAX_FRAGMENT_LEN: usize = 64;

pub const DEFAULT_PIN_ITERATIONS: usize = 1024;

pub const MAX_LABEL_LEN: usize = 32;

#[cfg(feature = "emulator")]
pub mod emulator;
pub mod langpack;

#[derive(Debug)]
pub struct MessageFragment {
    buf: [u8; MAX_FRAGMENT_LEN],
}

impl MessageFragment {
    pub fn empty() -> Self {
        MessageFragment {
            buf: [0; MAX_FRAGMENT_LEN],
        }
    }

    pub fn new(slice: &[u8], is_last: bool) -> Self {
        assert!(slice.len() <= MAX_FRAGMENT_LEN - 2);

        let mut fragment = MessageFragment::empty();
        fragment.buf[0] = if is_last { 0x01 } else { 0x00 };
        fragment.buf[1] = slice.len() as u8;
        fragment.buf[2..slice.len() + 2].copy_from_slice(slice);

        fragment
    }

    pub fn is_eof(&self) -> bool {
        self.flags().eof() == Eof::LastFragment
    }

    pub fn flags(&self) -> FragmentFlags {
        FragmentFlags::from_bytes([self.buf[0]])
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.buf[1] as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn raw_buf(&self) -> &[u8] {
        &self.buf
    }
}

impl AsRef<[u8]> for MessageFragment {
    fn as_ref(&self) -> &[u8] {
        &self.buf[2..2 + self.len()]
    }
}

impl From<&[u8]> for MessageFragment {
    fn from(slice: &[u8]) -> Self {
        assert!(slice.len() <= MAX_FRAGMENT_LEN);

        let mut buf = [0; MAX_FRAGMENT_LEN];
        buf[..slice.len()].copy_from_slice(slice);
        MessageFragment { buf }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, BitfieldSpecifier)]
#[bits = 1]
pub enum Eof {
    MoreFragments,
    LastFragment,
}
#[bitfield]
pub struct FragmentFlags {
    pub eof: Eof,

    #[allow(dead_code)]
    reserved: B7,
}

#[derive(Debug)]
pub struct Message {
    buf: Vec<u8>,
    finished: bool,
}

impl Message {
    pub fn empty() -> Self {
        Message {
            buf: Vec::new(),
            finished: false,
        }
    }

    pub fn from_slice(data: &[u8]) -> Self {
        Message {
            buf: data.to_vec(),
            finished: true,
        }
    }

    pub fn new_serialize<S>(obj: &S) -> Result<Self, MessageError>
    where
        S: Encode<()>,
    {
        let buf = minicbor::to_vec(obj).map_err(|_| MessageError::FailedSerialization)?;
        Ok(Message {
            buf,
            finished: true,
        })
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn push_fragment(&mut self, fragment: MessageFragment) -> Result<bool, MessageError> {
        if self.finished {
            return Err(MessageError::MessageAlreadyFinished);
        }
        self.finished = fragment.is_eof();

        self.buf.extend_from_slice(fragment.as_ref());

        Ok(self.finished)
    }

    pub fn deserialize<'d, T>(&'d self) -> Result<T, MessageError>
    where
        T: minicbor::Decode<'d, ()>,
    {
        if !self.finished {
            return Err(MessageError::IncompleteMessage);
        }

        Ok(minicbor::decode(&self.buf)?)
    }

    fn iter_chunks(&self, chunk_size: usize) -> impl Iterator<Item = (&[u8], bool)> + '_ {
        let last_chunk = self.buf.len().saturating_sub(1) / chunk_size;
        self.buf
            .chunks(chunk_size)
            .enumerate()
            .map(move |(i, chunk)| (chunk, i == last_chunk))
    }

    pub fn get_fragments(&self) -> Vec<MessageFragment> {
        self.iter_chunks(MAX_FRAGMENT_LEN - 2)
            .map(|(chunk, eof)| MessageFragment::new(chunk, eof))
            .collect()
    }

    pub fn data(&self) -> &[u8] {
        &self.buf
    }
}

impl AsRef<[u8]> for Message {
    fn as_ref(&self) -> &[u8] {
        &self.buf
    }
}

/// Rendered screen layout, as exposed to the debug link.
///
/// The firmware draws structured text rather than pixels: the harness asserts
/// on titles and button labels, which is what actually matters for the
/// translation tests.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "emulator", derive(serde::Serialize, serde::Deserialize))]
pub struct Screen {
    pub title: String,
    pub body: Vec<String>,
    pub left_button: Option<String>,
    pub right_button: Option<String>,
}

impl Screen {
    pub fn new(title: &str) -> Self {
        Screen {
            title: title.to_string(),
            body: Vec::new(),
            left_button: None,
            right_button: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
#[cfg_attr(feature = "emulator", derive(serde::Serialize, serde::Deserialize))]
pub enum SafetyCheckLevel {
    #[cbor(n(0))]
    Strict,
    #[cbor(n(1))]
    PromptAlways,
    /// Like `PromptAlways` but reverts to `Strict` at the next boot.
    #[cbor(n(2))]
    PromptTemporarily,
}

impl SafetyCheckLevel {
    /// The level that actually gets written to flash.
    pub fn persisted(self) -> Self {
        match self {
            SafetyCheckLevel::PromptTemporarily => SafetyCheckLevel::Strict,
            level => level,
        }
    }
}

#[derive(Debug, Clone, Default, Encode, Decode)]
#[cfg_attr(feature = "emulator", derive(serde::Serialize, serde::Deserialize))]
pub struct SettingsUpdate {
    #[cbor(n(0))]
    pub label: Option<String>,
    #[cbor(n(1))]
    pub use_passphrase: Option<bool>,
    #[cbor(n(2))]
    pub passphrase_always_on_device: Option<bool>,
    #[cbor(n(3))]
    pub display_rotation: Option<u16>,
    /// `Some` with empty bytes restores the default homescreen.
    #[cbor(n(4))]
    #[cfg_attr(
        feature = "emulator",
        serde(
            serialize_with = "serde_bytevec::serialize_opt",
            deserialize_with = "serde_bytevec::deserialize_opt"
        )
    )]
    pub homescreen: Option<ByteVec>,
    #[cbor(n(5))]
    pub safety_checks: Option<SafetyCheckLevel>,
    #[cbor(n(6))]
    pub experimental_features: Option<bool>,
}

impl SettingsUpdate {
    pub fn is_empty(&self) -> bool {
        self.label.is_none()
            && self.use_passphrase.is_none()
            && self.passphrase_always_on_device.is_none()
            && self.display_rotation.is_none()
            && self.homescreen.is_none()
            && self.safety_checks.is_none()
            && self.experimental_features.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
#[cfg_attr(feature = "emulator", derive(serde::Serialize, serde::Deserialize))]
pub struct Features {
    #[cbor(n(0))]
    pub firmware_version: Option<String>,
    #[cbor(n(1))]
    pub initialized: bool,
    #[cbor(n(2))]
    pub unlocked: bool,
    #[cbor(n(3))]
    pub label: Option<String>,
    #[cbor(n(4))]
    pub language: String,
    #[cbor(n(5))]
    pub display_rotation: Option<u16>,
    #[cbor(n(6))]
    pub passphrase_protection: bool,
    #[cbor(n(7))]
    pub passphrase_always_on_device: bool,
    #[cbor(n(8))]
    pub safety_checks: SafetyCheckLevel,
    #[cbor(n(9))]
    pub experimental_features: bool,
    #[cbor(n(10))]
    pub custom_homescreen: bool,
}

impl Features {
    pub fn new_uninitialized(language: &str, version: &'static str) -> Self {
        Features {
            firmware_version: Some(version.to_string()),
            initialized: false,
            unlocked: true,
            label: None,
            language: language.to_string(),
            display_rotation: None,
            passphrase_protection: false,
            passphrase_always_on_device: false,
            safety_checks: SafetyCheckLevel::Strict,
            experimental_features: false,
            custom_homescreen: false,
        }
    }

    pub fn from_config(
        config: &DeviceConfig,
        unlocked: bool,
        language: &str,
        version: &'static str,
    ) -> Self {
        Features {
            firmware_version: Some(version.to_string()),
            initialized: true,
            unlocked,
            label: config.label.clone(),
            language: language.to_string(),
            display_rotation: config.display_rotation,
            passphrase_protection: config.passphrase_protection,
            passphrase_always_on_device: config.passphrase_always_on_device,
            safety_checks: config.safety_checks,
            experimental_features: config.experimental_features,
            custom_homescreen: config.homescreen.is_some(),
        }
    }
}

/// Stretched PIN digest stored in the device config.
#[derive(Debug, Clone, Encode, Decode)]
pub struct Pin {
    #[cbor(n(0))]
    pub hash: [u8; 32],
    #[cbor(n(1))]
    pub salt: [u8; 8],
    #[cbor(n(2))]
    pub iterations: usize,
}

impl Pin {
    pub fn new(pin: &str, salt: [u8; 8]) -> Self {
        let mut hash = sha256::HashEngine::default();
        hash.input(pin.as_bytes());
        hash.input(&salt);

        let mut hash = sha256::Hash::from_engine(hash);
        for _ in 0..DEFAULT_PIN_ITERATIONS {
            hash = sha256::Hash::hash(&hash);
        }

        Pin {
            hash: hash.into_inner(),
            salt,
            iterations: DEFAULT_PIN_ITERATIONS,
        }
    }

    pub fn check(&self, pin: &str) -> bool {
        let check = Pin::new(pin, self.salt);
        check.hash == self.hash
    }
}

/// Persisted device state, stored CBOR-encoded on the config flash page.
#[derive(Debug, Clone, Encode, Decode)]
pub struct DeviceConfig {
    #[cbor(n(0))]
    pub label: Option<String>,
    #[cbor(n(1))]
    pub pin: Option<Pin>,
    #[cbor(n(2))]
    pub display_rotation: Option<u16>,
    #[cbor(n(3))]
    pub passphrase_protection: bool,
    #[cbor(n(4))]
    pub passphrase_always_on_device: bool,
    #[cbor(n(5))]
    pub safety_checks: SafetyCheckLevel,
    #[cbor(n(6))]
    pub experimental_features: bool,
    #[cbor(n(7))]
    pub homescreen: Option<ByteVec>,
}

impl DeviceConfig {
    pub fn new(label: Option<String>, pin: Option<Pin>) -> Self {
        DeviceConfig {
            label,
            pin,
            display_rotation: None,
            passphrase_protection: false,
            passphrase_always_on_device: false,
            safety_checks: SafetyCheckLevel::Strict,
            experimental_features: false,
            homescreen: None,
        }
    }

    /// Copy written to flash. The temporary safety-check level is RAM-only.
    pub fn to_persisted(&self) -> Self {
        let mut config = self.clone();
        config.safety_checks = config.safety_checks.persisted();
        config
    }
}

#[derive(Debug, Clone, Encode, Decode)]
#[cfg_attr(feature = "emulator", derive(serde::Serialize, serde::Deserialize))]
pub enum Request {
    #[cbor(n(0))]
    GetFeatures,
    #[cbor(n(1))]
    ApplySettings(#[cbor(n(0))] SettingsUpdate),
    #[cbor(n(2))]
    BeginChangeLanguage {
        #[cbor(n(0))]
        data_length: usize,
    },
    #[cbor(n(3))]
    #[cfg_attr(feature = "emulator", serde(with = "serde_bytevec"))]
    TranslationChunk(#[cbor(n(0))] ByteVec),
    #[cbor(n(4))]
    CompleteChangeLanguage,
    #[cbor(n(5))]
    WipeDevice,
    #[cbor(n(6))]
    InitializeDevice {
        #[cbor(n(0))]
        label: Option<String>,
        #[cbor(n(1))]
        pin: Option<String>,
    },
    #[cbor(n(7))]
    Unlock {
        #[cbor(n(0))]
        pin: String,
    },
    #[cbor(n(8))]
    GetNonce,
    #[cbor(n(9))]
    Echo {
        #[cbor(n(0))]
        message: String,
        #[cbor(n(1))]
        button_protection: bool,
    },
    #[cbor(n(10))]
    Ping,
}

#[derive(Debug, Clone, Encode, Decode)]
#[cfg_attr(feature = "emulator", derive(serde::Serialize, serde::Deserialize))]
pub enum Reply {
    #[cbor(n(0))]
    Features(#[cbor(n(0))] Features),
    #[cbor(n(1))]
    Ok,
    #[cbor(n(2))]
    Error(#[cbor(n(0))] String),
    #[cbor(n(3))]
    Echo(#[cbor(n(0))] String),
    #[cbor(n(4))]
    #[cfg_attr(feature = "emulator", serde(with = "serde_bytevec"))]
    Nonce(#[cbor(n(0))] ByteVec),
    #[cbor(n(5))]
    NextChunk(#[cbor(n(0))] usize),
    #[cbor(n(6))]
    UnexpectedMessage,
    #[cbor(n(7))]
    Busy,
    #[cbor(n(8))]
    DelayedReply,
    #[cbor(n(9))]
    Pong,
    #[cbor(n(10))]
    Locked,
    #[cbor(n(11))]
    WrongPin,
}

#[cfg(feature = "emulator")]
mod serde_bytevec {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub(crate) fn serialize<S>(
        bytes: &minicbor::bytes::ByteVec,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        Serialize::serialize(&bytes.to_vec(), serializer)
    }

    pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<minicbor::bytes::ByteVec, D::Error>
    where
        D: Deserializer<'de>,
    {
        let vec: Vec<u8> = Deserialize::deserialize(deserializer)?;
        Ok(vec.into())
    }

    pub(crate) fn serialize_opt<S>(
        bytes: &Option<minicbor::bytes::ByteVec>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        Serialize::serialize(&bytes.as_ref().map(|b| b.to_vec()), serializer)
    }

    pub(crate) fn deserialize_opt<'de, D>(
        deserializer: D,
    ) -> Result<Option<minicbor::bytes::ByteVec>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let vec: Option<Vec<u8>> = Deserialize::deserialize(deserializer)?;
        Ok(vec.map(Into::into))
    }
}

#[derive(Debug, Clone)]
pub enum MessageError {
    MessageTooLong,
    MessageAlreadyFinished,
    IncompleteMessage,
    FailedSerialization,
    FailedDeserialization,
}

impl From<minicbor::decode::Error> for MessageError {
    fn from(_: minicbor::decode::Error) -> Self {
        MessageError::FailedDeserialization
    }
}

impl core::fmt::Display for MessageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_fmt(core::format_args!("{:?}", self))
    }
}
impl std::error::Error for MessageError {}
