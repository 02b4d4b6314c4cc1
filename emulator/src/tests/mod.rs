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

use std::sync::{Once, OnceLock};

use tokio::sync::mpsc;

use model::{Features, Reply, SafetyCheckLevel, Screen, SettingsUpdate};

use langpack::LanguageDefinition;

pub(crate) use crate::script::run_script;
pub(crate) use crate::utils::model::*;
pub(crate) use crate::utils::EmulatorInstance;

mod settings;

pub(crate) static INIT_LOG: Once = Once::new();

pub struct Tester {
    op_sender: mpsc::Sender<TestOp>,
    res_receiver: mpsc::Receiver<Result<(), AssertionResult>>,
}

impl Tester {
    pub fn new(
        op_sender: mpsc::Sender<TestOp>,
        res_receiver: mpsc::Receiver<Result<(), AssertionResult>>,
    ) -> Self {
        Tester {
            op_sender,
            res_receiver,
        }
    }

    async fn expect_reply(&mut self) -> Result<(), crate::Error> {
        self.res_receiver.recv().await.ok_or("No reply")??;
        Ok(())
    }

    pub async fn wait_ticks(&mut self, nticks: usize) -> Result<(), crate::Error> {
        self.op_sender
            .send(TestAction::WaitTicks(nticks).into())
            .await?;
        self.expect_reply().await?;

        Ok(())
    }

    pub async fn link(&mut self, action: LinkAction) -> Result<(), crate::Error> {
        self.op_sender.send(TestAction::Link(action).into()).await?;
        self.expect_reply().await?;

        Ok(())
    }

    pub async fn link_assertion(&mut self, assertion: Reply) -> Result<(), crate::Error> {
        self.op_sender
            .send(TestAssertion::LinkResponse(assertion).into())
            .await?;
        self.expect_reply().await?;

        Ok(())
    }

    pub async fn link_assertion_variant(&mut self, variant: &str) -> Result<(), crate::Error> {
        self.op_sender
            .send(TestAssertion::LinkResponseVariant(variant.to_string()).into())
            .await?;
        self.expect_reply().await?;

        Ok(())
    }

    pub async fn display_assertion(
        &mut self,
        screen: Screen,
        timeout_ticks: Option<usize>,
    ) -> Result<(), crate::Error> {
        self.op_sender
            .send(
                TestAssertion::Display {
                    screen,
                    timeout_ticks,
                }
                .into(),
            )
            .await?;
        self.expect_reply().await?;

        Ok(())
    }

    pub async fn press(&mut self, value: bool) -> Result<(), crate::Error> {
        self.op_sender.send(TestAction::Input(value).into()).await?;
        self.expect_reply().await?;

        Ok(())
    }

    pub async fn reset(&mut self) -> Result<(), crate::Error> {
        self.op_sender.send(TestAction::Reset.into()).await?;
        self.expect_reply().await?;

        Ok(())
    }
}

pub(crate) fn get_temp_dir() -> std::path::PathBuf {
    if let Ok(dir) = std::env::var("REPORT_TMP_DIR") {
        let path = std::path::PathBuf::from(&dir);
        if !path.exists() {
            std::fs::create_dir_all(&path).expect("Can create the report dir");
        }

        path
    } else {
        // n.b. static items do not call [`Drop`] on program termination, but this is
        // actually good for us because it means the tempdir will be kept
        static TEMPDIR: OnceLock<tempdir::TempDir> = OnceLock::new();
        TEMPDIR
            .get_or_init(|| {
                tempdir::TempDir::new("ember-func-tests").expect("Can create temp directory")
            })
            .path()
            .to_path_buf()
    }
}

// Expected-screen builders. Translated strings come from the language
// definition when one is installed, mirroring the firmware's fallback rules.

pub(crate) fn english(key: &str) -> String {
    firmware::translations::ENGLISH
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v.to_string())
        .unwrap_or_else(|| key.to_string())
}

pub(crate) fn tr(def: Option<&LanguageDefinition>, key: &str) -> String {
    def.and_then(|d| d.translations.get(key).cloned())
        .unwrap_or_else(|| english(key))
}

pub(crate) fn confirm_dialog(
    def: Option<&LanguageDefinition>,
    title_key: &str,
    body: Vec<String>,
) -> Screen {
    Screen {
        title: tr(def, title_key),
        body,
        left_button: Some(tr(def, "buttons__cancel")),
        right_button: Some(tr(def, "buttons__confirm")),
    }
}

pub(crate) fn ready_screen(def: Option<&LanguageDefinition>, label: &str) -> Screen {
    Screen {
        title: label.to_string(),
        body: vec![tr(def, "words__ready")],
        left_button: None,
        right_button: None,
    }
}

pub(crate) fn welcome_screen() -> Screen {
    Screen {
        title: "Ember".to_string(),
        body: vec!["Uninitialized".to_string()],
        left_button: None,
        right_button: None,
    }
}

pub(crate) fn locked_screen() -> Screen {
    Screen::new(&english("words__locked"))
}

pub(crate) fn echo_screen(def: Option<&LanguageDefinition>, message: &str) -> Screen {
    Screen {
        title: tr(def, "words__confirm"),
        body: vec![message.to_string()],
        left_button: Some(tr(def, "buttons__cancel")),
        right_button: Some(tr(def, "buttons__confirm")),
    }
}

pub(crate) fn settings_screen(def: Option<&LanguageDefinition>, body: Vec<String>) -> Screen {
    confirm_dialog(def, "title__settings", body)
}

pub(crate) fn language_change_screen(def: Option<&LanguageDefinition>, tag: &str) -> Screen {
    confirm_dialog(
        def,
        "title__language",
        vec![format!("Change language to {}?", tag)],
    )
}

pub(crate) fn restore_language_screen(def: Option<&LanguageDefinition>) -> Screen {
    confirm_dialog(
        def,
        "title__language",
        vec!["Restore default language?".to_string()],
    )
}

pub(crate) fn wipe_screen(def: Option<&LanguageDefinition>) -> Screen {
    confirm_dialog(def, "title__wipe", vec!["HOLD BTN TO WIPE".to_string()])
}

pub(crate) fn initialize_screen(def: Option<&LanguageDefinition>) -> Screen {
    confirm_dialog(
        def,
        "title__initialize",
        vec!["HOLD BTN TO CONFIRM".to_string()],
    )
}

pub(crate) fn default_features() -> Features {
    Features {
        firmware_version: Some(env!("CARGO_PKG_VERSION").to_string()),
        initialized: true,
        unlocked: true,
        label: Some("test".to_string()),
        language: "en-US".to_string(),
        display_rotation: None,
        passphrase_protection: false,
        passphrase_always_on_device: false,
        safety_checks: SafetyCheckLevel::Strict,
        experimental_features: false,
        custom_homescreen: false,
    }
}

pub(crate) fn uninitialized_features() -> Features {
    Features::new_uninitialized("en-US", env!("CARGO_PKG_VERSION"))
}

/// Valid grayscale homescreen for the 128x64 display.
pub(crate) fn make_homescreen(width: u16, height: u16, payload_len: usize) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(firmware::homescreen::HOMESCREEN_MAGIC);
    data.extend_from_slice(&width.to_le_bytes());
    data.extend_from_slice(&height.to_le_bytes());
    data.extend_from_slice(&(payload_len as u32).to_le_bytes());
    data.extend(std::iter::repeat(0x55).take(payload_len));
    data
}

/// Drive the button-protected echo and verify the confirm dialog renders with
/// the given language's strings.
pub(crate) async fn check_echo_screen(
    tester: &mut Tester,
    def: Option<&LanguageDefinition>,
) -> Result<(), crate::Error> {
    tester.link(LinkAction::Echo("ahoj!".into(), true)).await?;
    tester
        .display_assertion(echo_screen(def, "ahoj!"), None)
        .await?;

    tester.press(true).await?;
    tester.link_assertion(Reply::Echo("ahoj!".into())).await?;
    tester.press(false).await?;

    Ok(())
}
