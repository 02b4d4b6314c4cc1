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

//! Test script execution: one operation at a time against a live emulator.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use ember::DebugMessage;

use model::Reply;

use crate::link::try_pull_msg;
use crate::utils::model::*;
use crate::utils::EmulatorInstance;

/// Replies that are part of the transport chatter rather than an operation's
/// outcome.
fn is_transport_chatter(reply: &Reply) -> bool {
    matches!(
        reply,
        Reply::Pong | Reply::DelayedReply | Reply::Busy | Reply::NextChunk(_)
    )
}

const DEFAULT_DISPLAY_TIMEOUT_TICKS: usize = 32;
const REPLY_TIMEOUT_TICKS: usize = 600;

async fn wait_ticks(emulator: &mut EmulatorInstance, nticks: usize) -> Result<(), crate::Error> {
    let mut count = 0;
    while count < nticks {
        emulator.send_tick()?;
        emulator.manage_hw().await?;
        while try_pull_msg::<()>(&mut emulator.msgs.tick)?.is_some() {
            count += 1;
        }
    }

    Ok(())
}

fn spawn_link_action(emulator: &EmulatorInstance, action: LinkAction) {
    let sdk = Arc::clone(&emulator.sdk);

    tokio::spawn(async move {
        match action {
            LinkAction::GetFeatures => {
                let _ = sdk.get_features().await;
            }
            LinkAction::ApplySettings(update) => {
                let _ = sdk.apply_settings(update).await;
            }
            LinkAction::ChangeLanguage(data) => {
                let _ = sdk.change_language(data).await;
            }
            LinkAction::WipeDevice => {
                let _ = sdk.wipe_device().await;
            }
            LinkAction::InitializeDevice { label, pin } => {
                let _ = sdk.initialize_device(label, pin).await;
            }
            LinkAction::Unlock(pin) => {
                let _ = sdk.unlock(pin).await;
            }
            LinkAction::GetNonce => {
                let _ = sdk.get_nonce().await;
            }
            LinkAction::Echo(message, button_protection) => {
                let _ = sdk.echo(message, button_protection).await;
            }
        }
    });
}

/// Wait for the next meaningful device reply, pumping device time so pending
/// confirmations can make progress in the meantime.
async fn next_reply(emulator: &mut EmulatorInstance) -> Result<Reply, AssertionResult> {
    let mut ticks = 0;

    loop {
        let _ = emulator.manage_hw().await;

        // The device only advances on host ticks, so keep them flowing even
        // while the link is chatty
        let _ = emulator.send_tick();
        while let Ok(Some(_)) = try_pull_msg::<()>(&mut emulator.msgs.tick) {
            ticks += 1;
        }
        if ticks > REPLY_TIMEOUT_TICKS {
            return Err(AssertionResult::NoReply);
        }

        match tokio::time::timeout(Duration::from_millis(20), emulator.sdk.debug_msg()).await {
            Ok(Ok(DebugMessage::In(reply))) if !is_transport_chatter(&reply) => {
                return Ok(reply);
            }
            Ok(Ok(_)) => {}
            Ok(Err(_)) => return Err(AssertionResult::NoReply),
            Err(_) => {}
        }
    }
}

async fn check_display(
    emulator: &mut EmulatorInstance,
    expected: &model::Screen,
    timeout_ticks: Option<usize>,
) -> Result<Option<AssertionResult>, crate::Error> {
    let timeout = timeout_ticks.unwrap_or(DEFAULT_DISPLAY_TIMEOUT_TICKS);
    let mut ticks = 0;

    loop {
        emulator.manage_hw().await?;
        if emulator.screen.as_ref() == Some(expected) {
            break Ok(None);
        }

        emulator.send_tick()?;
        while try_pull_msg::<()>(&mut emulator.msgs.tick)?.is_some() {
            ticks += 1;
        }

        if ticks > timeout {
            let actual = serde_json::to_string(&emulator.screen)?;
            break Ok(Some(AssertionResult::WrongDisplay(actual)));
        }
    }
}

pub async fn run_script(
    mut script: mpsc::Receiver<TestOp>,
    result_chan: mpsc::Sender<Result<(), AssertionResult>>,
    emulator: &mut EmulatorInstance,
) -> Result<TestLog, crate::Error> {
    let mut log = vec![];
    let mut result = true;

    while let Some(op) = script.recv().await {
        log::debug!("OP: {:?}", op);

        let fail = match &op {
            TestOp::Action(TestAction::WaitTicks(nticks)) => {
                wait_ticks(emulator, *nticks).await?;
                None
            }
            TestOp::Action(TestAction::Input(value)) => {
                emulator.press(*value)?;
                None
            }
            TestOp::Action(TestAction::Link(action)) => {
                spawn_link_action(emulator, action.clone());
                None
            }
            TestOp::Action(TestAction::Reset) => {
                emulator.reset().await?;
                None
            }
            TestOp::Action(TestAction::WipeFlash) => {
                emulator.wipe_flash().await?;
                None
            }

            TestOp::Assertion(TestAssertion::LinkResponse(expected)) => {
                match next_reply(emulator).await {
                    Err(fail) => Some(fail),
                    Ok(reply) => {
                        // `Reply` doesn't impl eq
                        let actual = serde_json::to_string(&reply)?;
                        if actual != serde_json::to_string(expected)? {
                            Some(AssertionResult::WrongReply(actual))
                        } else {
                            None
                        }
                    }
                }
            }
            TestOp::Assertion(TestAssertion::LinkResponseVariant(expected)) => {
                match next_reply(emulator).await {
                    Err(fail) => Some(fail),
                    Ok(reply) => {
                        if reply_variant(&reply) != expected {
                            Some(AssertionResult::WrongReply(serde_json::to_string(&reply)?))
                        } else {
                            None
                        }
                    }
                }
            }
            TestOp::Assertion(TestAssertion::Display {
                screen,
                timeout_ticks,
            }) => check_display(emulator, screen, *timeout_ticks).await?,
        };

        let pass = fail.is_none();
        if let Some(fail) = &fail {
            result_chan.send(Err(fail.clone())).await?;
        } else {
            result_chan.send(Ok(())).await?;
        }

        log.push(TestLogStep {
            op,
            screen: emulator.screen.clone(),
            pass,
            fail,
        });

        if !pass {
            result = false;
            break;
        }
    }

    Ok(TestLog { steps: log, result })
}
