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

//! Host-side client for the Ember debug link.
//!
//! The SDK does not own a transport: callers pump raw fragments with
//! [`EmberSdk::poll`] / [`EmberSdk::incoming_data`] and a background task
//! takes care of framing, request/reply pairing and the busy/delayed-reply
//! dance.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};

use model::{Features, Message, MessageFragment, Reply, Request, SettingsUpdate};

const MAX_RETRIES: usize = 5;

/// Upload chunk size for translation blobs.
pub const CHANGE_LANGUAGE_CHUNK: usize = 1024;

#[derive(Debug, Clone)]
pub enum DebugMessage {
    Out(Request),
    In(Reply),
}

struct RequestChannels {
    o: mpsc::UnboundedSender<Request>,
    i: mpsc::UnboundedReceiver<Reply>,
}

impl RequestChannels {
    fn send(&self, request: Request) -> Result<(), SdkError> {
        self.o.send(request).map_err(|_| SdkError::ChannelError)
    }

    async fn recv(&mut self) -> Result<Reply, SdkError> {
        self.i.recv().await.ok_or(SdkError::ChannelError)
    }
}

macro_rules! send_with_retry {
    ($channels:expr, $req:expr, $( $match:tt )*) => ({
        let mut i = 0;
        let mut send_ping = false;

        loop {
            if i > MAX_RETRIES {
                break Err(SdkError::CommunicationError)
            }
            let req = if !send_ping {
                $req
            } else {
                send_ping = false;
                Request::Ping
            };
            $channels.send(req)?;

            match $channels.recv().await {
                $( $match )*,

                Ok(Reply::Pong) | Ok(Reply::DelayedReply) => {
                    log::trace!("Got delayed reply, sending ping");

                    // Keep pinging until the actual reply shows up
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    send_ping = true;
                },
                Ok(Reply::Busy) => {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    continue;
                },
                Ok(Reply::Locked) => {
                    break Err(SdkError::Locked)
                }
                Ok(Reply::WrongPin) => {
                    break Err(SdkError::WrongPin)
                }
                Ok(Reply::UnexpectedMessage) => {
                    break Err(SdkError::UnexpectedMessage)
                }
                Ok(Reply::Error(e)) => {
                    break Err(SdkError::Device(e))
                }
                Err(e) => {
                    break Err(e)
                }
                _ => {
                    i += 1; // Only increment when there's some kind of failure
                },
            }
        }
    })
}

pub struct EmberSdk {
    requests: Mutex<RequestChannels>,
    link_out: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    link_in: mpsc::UnboundedSender<Vec<u8>>,

    #[cfg(feature = "debug")]
    debug_channel: Mutex<mpsc::UnboundedReceiver<DebugMessage>>,
}

impl EmberSdk {
    pub fn new() -> Arc<Self> {
        let (req_o, req_i) = mpsc::unbounded_channel();
        let (reply_o, reply_i) = mpsc::unbounded_channel();
        let (frag_out_o, frag_out_i) = mpsc::unbounded_channel();
        let (frag_in_o, frag_in_i) = mpsc::unbounded_channel();
        let (debug_o, _debug_i) = mpsc::unbounded_channel();

        tokio::spawn(background_task(req_i, reply_o, frag_out_o, frag_in_i, debug_o));

        Arc::new(EmberSdk {
            requests: Mutex::new(RequestChannels {
                o: req_o,
                i: reply_i,
            }),
            link_out: Mutex::new(frag_out_i),
            link_in: frag_in_o,

            #[cfg(feature = "debug")]
            debug_channel: Mutex::new(_debug_i),
        })
    }

    /// Next outgoing fragment, ready to be put on the wire.
    pub async fn poll(&self) -> Result<Vec<u8>, SdkError> {
        self.link_out
            .lock()
            .await
            .recv()
            .await
            .ok_or(SdkError::ChannelError)
    }

    /// Feed one fragment received from the device.
    pub fn incoming_data(&self, fragment: Vec<u8>) -> Result<(), SdkError> {
        self.link_in
            .send(fragment)
            .map_err(|_| SdkError::ChannelError)
    }

    /// Replies produced by the device, mirrored for test assertions.
    #[cfg(feature = "debug")]
    pub async fn debug_msg(&self) -> Result<DebugMessage, SdkError> {
        self.debug_channel
            .lock()
            .await
            .recv()
            .await
            .ok_or(SdkError::ChannelError)
    }

    pub async fn get_features(&self) -> Result<Features, SdkError> {
        let mut channels = self.requests.lock().await;
        let features = send_with_retry!(channels, Request::GetFeatures, Ok(Reply::Features(features)) => break Ok(features))?;
        Ok(features)
    }

    pub async fn apply_settings(&self, update: SettingsUpdate) -> Result<(), SdkError> {
        let mut channels = self.requests.lock().await;
        send_with_retry!(channels, Request::ApplySettings(update.clone()), Ok(Reply::Ok) => break Ok(()))?;
        Ok(())
    }

    /// Upload a translation blob. Empty data restores the built-in language.
    pub async fn change_language(&self, data: Vec<u8>) -> Result<(), SdkError> {
        let mut channels = self.requests.lock().await;

        let first = send_with_retry!(
            channels,
            Request::BeginChangeLanguage { data_length: data.len() },
            Ok(Reply::NextChunk(offset)) => break Ok(Some(offset)),
            Ok(Reply::Ok) => break Ok(None)
        )?;
        let mut offset = match first {
            Some(offset) => offset,
            None => return Ok(()),
        };

        while offset < data.len() {
            let end = (offset + CHANGE_LANGUAGE_CHUNK).min(data.len());
            let chunk = data[offset..end].to_vec();

            offset = send_with_retry!(
                channels,
                Request::TranslationChunk(chunk.clone().into()),
                Ok(Reply::NextChunk(offset)) => break Ok(offset)
            )?;
        }

        send_with_retry!(channels, Request::CompleteChangeLanguage, Ok(Reply::Ok) => break Ok(()))?;
        Ok(())
    }

    pub async fn wipe_device(&self) -> Result<(), SdkError> {
        let mut channels = self.requests.lock().await;
        send_with_retry!(channels, Request::WipeDevice, Ok(Reply::Ok) => break Ok(()))?;
        Ok(())
    }

    pub async fn initialize_device(
        &self,
        label: Option<String>,
        pin: Option<String>,
    ) -> Result<(), SdkError> {
        let mut channels = self.requests.lock().await;
        send_with_retry!(channels, Request::InitializeDevice { label: label.clone(), pin: pin.clone() }, Ok(Reply::Ok) => break Ok(()))?;
        Ok(())
    }

    pub async fn unlock(&self, pin: String) -> Result<(), SdkError> {
        let mut channels = self.requests.lock().await;
        send_with_retry!(channels, Request::Unlock { pin: pin.clone() }, Ok(Reply::Ok) => break Ok(()))?;
        Ok(())
    }

    pub async fn get_nonce(&self) -> Result<Vec<u8>, SdkError> {
        let mut channels = self.requests.lock().await;
        let nonce = send_with_retry!(channels, Request::GetNonce, Ok(Reply::Nonce(nonce)) => break Ok(nonce))?;
        Ok(nonce.to_vec())
    }

    pub async fn echo(&self, message: String, button_protection: bool) -> Result<String, SdkError> {
        let mut channels = self.requests.lock().await;
        let reply = send_with_retry!(channels, Request::Echo { message: message.clone(), button_protection }, Ok(Reply::Echo(msg)) => break Ok(msg))?;
        Ok(reply)
    }

    pub async fn ping(&self) -> Result<(), SdkError> {
        let mut channels = self.requests.lock().await;
        send_with_retry!(channels, Request::Ping, Ok(Reply::Pong) => break Ok(()))?;
        Ok(())
    }
}

async fn background_task(
    mut requests: mpsc::UnboundedReceiver<Request>,
    replies: mpsc::UnboundedSender<Reply>,
    frag_out: mpsc::UnboundedSender<Vec<u8>>,
    mut frag_in: mpsc::UnboundedReceiver<Vec<u8>>,
    debug: mpsc::UnboundedSender<DebugMessage>,
) {
    let mut partial = Message::empty();

    loop {
        tokio::select! {
            request = requests.recv() => {
                let request = match request {
                    Some(request) => request,
                    None => break,
                };

                log::trace!("> {:?}", request);
                let _ = debug.send(DebugMessage::Out(request.clone()));

                let message = match Message::new_serialize(&request) {
                    Ok(message) => message,
                    Err(e) => {
                        log::warn!("Serialization error: {:?}", e);
                        continue;
                    }
                };
                for fragment in message.get_fragments() {
                    if frag_out.send(fragment.raw_buf().to_vec()).is_err() {
                        return;
                    }
                }
            }
            fragment = frag_in.recv() => {
                let fragment = match fragment {
                    Some(fragment) => fragment,
                    None => break,
                };
                if fragment.len() != model::MAX_FRAGMENT_LEN {
                    log::warn!("Dropping malformed fragment ({} bytes)", fragment.len());
                    continue;
                }

                let finished = match partial.push_fragment(MessageFragment::from(fragment.as_slice())) {
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

                let reply = partial.deserialize::<Reply>();
                partial = Message::empty();
                match reply {
                    Ok(reply) => {
                        log::trace!("< {:?}", reply);
                        let _ = debug.send(DebugMessage::In(reply.clone()));
                        if replies.send(reply).is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        log::warn!("Undecodable reply: {:?}", e);
                    }
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum SdkError {
    ChannelError,
    CommunicationError,
    UnexpectedMessage,
    Locked,
    WrongPin,
    Device(String),
    Message(model::MessageError),
}

impl From<model::MessageError> for SdkError {
    fn from(e: model::MessageError) -> Self {
        SdkError::Message(e)
    }
}

impl fmt::Display for SdkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SdkError::Device(msg) => write!(f, "Device error: {}", msg),
            e => write!(f, "{:?}", e),
        }
    }
}
impl std::error::Error for SdkError {}
