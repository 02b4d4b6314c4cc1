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

use super::*;

#[functional_test_wrapper::functional_test]
async fn test_apply_settings_label(mut tester: Tester) -> Result<(), crate::Error> {
    tester.link(LinkAction::GetFeatures).await?;
    tester
        .link_assertion(Reply::Features(default_features()))
        .await?;
    tester.display_assertion(ready_screen(None, "test"), None).await?;

    tester
        .link(LinkAction::ApplySettings(SettingsUpdate {
            label: Some("new label".into()),
            ..Default::default()
        }))
        .await?;
    tester
        .display_assertion(settings_screen(None, vec!["Label: new label".into()]), None)
        .await?;
    tester.press(true).await?;
    tester.link_assertion(Reply::Ok).await?;
    tester.press(false).await?;

    tester
        .display_assertion(ready_screen(None, "new label"), None)
        .await?;

    tester.link(LinkAction::GetFeatures).await?;
    tester
        .link_assertion(Reply::Features(Features {
            label: Some("new label".into()),
            ..default_features()
        }))
        .await?;

    Ok(())
}

#[functional_test_wrapper::functional_test]
async fn test_label_too_long(mut tester: Tester) -> Result<(), crate::Error> {
    tester
        .link(LinkAction::ApplySettings(SettingsUpdate {
            label: Some("A".repeat(33)),
            ..Default::default()
        }))
        .await?;
    tester
        .link_assertion(Reply::Error("Label too long".into()))
        .await?;

    tester.link(LinkAction::GetFeatures).await?;
    tester
        .link_assertion(Reply::Features(default_features()))
        .await?;

    Ok(())
}

#[functional_test_wrapper::functional_test]
async fn test_apply_settings_empty(mut tester: Tester) -> Result<(), crate::Error> {
    tester
        .link(LinkAction::ApplySettings(SettingsUpdate::default()))
        .await?;
    tester
        .link_assertion(Reply::Error("No setting provided".into()))
        .await?;

    Ok(())
}

#[functional_test_wrapper::functional_test]
async fn test_apply_settings_rotation(mut tester: Tester) -> Result<(), crate::Error> {
    tester.link(LinkAction::GetFeatures).await?;
    tester
        .link_assertion(Reply::Features(default_features()))
        .await?;

    tester
        .link(LinkAction::ApplySettings(SettingsUpdate {
            display_rotation: Some(270),
            ..Default::default()
        }))
        .await?;
    tester
        .display_assertion(settings_screen(None, vec!["Rotation: 270".into()]), None)
        .await?;
    tester.press(true).await?;
    tester.link_assertion(Reply::Ok).await?;
    tester.press(false).await?;

    tester.link(LinkAction::GetFeatures).await?;
    tester
        .link_assertion(Reply::Features(Features {
            display_rotation: Some(270),
            ..default_features()
        }))
        .await?;

    // Not a multiple of 90 degrees
    tester
        .link(LinkAction::ApplySettings(SettingsUpdate {
            display_rotation: Some(123),
            ..Default::default()
        }))
        .await?;
    tester
        .link_assertion(Reply::Error("Invalid rotation".into()))
        .await?;

    Ok(())
}

#[functional_test_wrapper::functional_test]
async fn test_apply_settings_passphrase(mut tester: Tester) -> Result<(), crate::Error> {
    tester
        .link(LinkAction::ApplySettings(SettingsUpdate {
            use_passphrase: Some(true),
            ..Default::default()
        }))
        .await?;
    tester
        .display_assertion(settings_screen(None, vec!["Passphrase: on".into()]), None)
        .await?;
    tester.press(true).await?;
    tester.link_assertion(Reply::Ok).await?;
    tester.press(false).await?;

    tester.link(LinkAction::GetFeatures).await?;
    tester
        .link_assertion(Reply::Features(Features {
            passphrase_protection: true,
            ..default_features()
        }))
        .await?;

    tester
        .link(LinkAction::ApplySettings(SettingsUpdate {
            use_passphrase: Some(false),
            ..Default::default()
        }))
        .await?;
    tester
        .display_assertion(settings_screen(None, vec!["Passphrase: off".into()]), None)
        .await?;
    tester.press(true).await?;
    tester.link_assertion(Reply::Ok).await?;
    tester.press(false).await?;

    tester.link(LinkAction::GetFeatures).await?;
    tester
        .link_assertion(Reply::Features(default_features()))
        .await?;

    Ok(())
}

#[functional_test_wrapper::functional_test]
async fn test_apply_settings_passphrase_always_on_device(
    mut tester: Tester,
) -> Result<(), crate::Error> {
    // enable passphrase
    tester
        .link(LinkAction::ApplySettings(SettingsUpdate {
            use_passphrase: Some(true),
            ..Default::default()
        }))
        .await?;
    tester
        .display_assertion(settings_screen(None, vec!["Passphrase: on".into()]), None)
        .await?;
    tester.press(true).await?;
    tester.link_assertion(Reply::Ok).await?;
    tester.press(false).await?;

    // enable force on device
    tester
        .link(LinkAction::ApplySettings(SettingsUpdate {
            passphrase_always_on_device: Some(true),
            ..Default::default()
        }))
        .await?;
    tester
        .display_assertion(
            settings_screen(None, vec!["Passphrase on device: on".into()]),
            None,
        )
        .await?;
    tester.press(true).await?;
    tester.link_assertion(Reply::Ok).await?;
    tester.press(false).await?;

    tester.link(LinkAction::GetFeatures).await?;
    tester
        .link_assertion(Reply::Features(Features {
            passphrase_protection: true,
            passphrase_always_on_device: true,
            ..default_features()
        }))
        .await?;

    // turning off the passphrase also clears the always_on_device setting
    tester
        .link(LinkAction::ApplySettings(SettingsUpdate {
            use_passphrase: Some(false),
            ..Default::default()
        }))
        .await?;
    tester
        .display_assertion(settings_screen(None, vec!["Passphrase: off".into()]), None)
        .await?;
    tester.press(true).await?;
    tester.link_assertion(Reply::Ok).await?;
    tester.press(false).await?;

    tester.link(LinkAction::GetFeatures).await?;
    tester
        .link_assertion(Reply::Features(default_features()))
        .await?;

    // and turning it back on does not restore always_on_device
    tester
        .link(LinkAction::ApplySettings(SettingsUpdate {
            use_passphrase: Some(true),
            ..Default::default()
        }))
        .await?;
    tester
        .display_assertion(settings_screen(None, vec!["Passphrase: on".into()]), None)
        .await?;
    tester.press(true).await?;
    tester.link_assertion(Reply::Ok).await?;
    tester.press(false).await?;

    tester.link(LinkAction::GetFeatures).await?;
    tester
        .link_assertion(Reply::Features(Features {
            passphrase_protection: true,
            passphrase_always_on_device: false,
            ..default_features()
        }))
        .await?;

    Ok(())
}

#[functional_test_wrapper::functional_test]
async fn test_apply_homescreen(mut tester: Tester) -> Result<(), crate::Error> {
    tester
        .link(LinkAction::ApplySettings(SettingsUpdate {
            homescreen: Some(make_homescreen(128, 64, 256).into()),
            ..Default::default()
        }))
        .await?;
    tester
        .display_assertion(settings_screen(None, vec!["Set homescreen".into()]), None)
        .await?;
    tester.press(true).await?;
    tester.link_assertion(Reply::Ok).await?;
    tester.press(false).await?;

    tester.link(LinkAction::GetFeatures).await?;
    tester
        .link_assertion(Reply::Features(Features {
            custom_homescreen: true,
            ..default_features()
        }))
        .await?;

    // Revert to the default homescreen
    tester
        .link(LinkAction::ApplySettings(SettingsUpdate {
            homescreen: Some(vec![].into()),
            ..Default::default()
        }))
        .await?;
    tester
        .display_assertion(settings_screen(None, vec!["Reset homescreen".into()]), None)
        .await?;
    tester.press(true).await?;
    tester.link_assertion(Reply::Ok).await?;
    tester.press(false).await?;

    tester.link(LinkAction::GetFeatures).await?;
    tester
        .link_assertion(Reply::Features(default_features()))
        .await?;

    Ok(())
}

#[functional_test_wrapper::functional_test]
async fn test_apply_homescreen_wrong_size(mut tester: Tester) -> Result<(), crate::Error> {
    tester
        .link(LinkAction::ApplySettings(SettingsUpdate {
            homescreen: Some(make_homescreen(64, 64, 256).into()),
            ..Default::default()
        }))
        .await?;
    tester
        .link_assertion(Reply::Error("Invalid homescreen".into()))
        .await?;

    Ok(())
}

#[functional_test_wrapper::functional_test]
async fn test_apply_homescreen_jpeg_fails(mut tester: Tester) -> Result<(), crate::Error> {
    let jpeg = vec![
        0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46, 0x00, 0x01, 0x01, 0x01,
    ];

    tester
        .link(LinkAction::ApplySettings(SettingsUpdate {
            homescreen: Some(jpeg.into()),
            ..Default::default()
        }))
        .await?;
    tester
        .link_assertion(Reply::Error("Invalid homescreen".into()))
        .await?;

    Ok(())
}

#[functional_test_wrapper::functional_test]
async fn test_experimental_features(mut tester: Tester) -> Result<(), crate::Error> {
    tester.link(LinkAction::GetNonce).await?;
    tester
        .link_assertion(Reply::Error("Experimental features are disabled".into()))
        .await?;

    tester
        .link(LinkAction::ApplySettings(SettingsUpdate {
            experimental_features: Some(true),
            ..Default::default()
        }))
        .await?;
    tester
        .display_assertion(
            settings_screen(None, vec!["Experimental features: on".into()]),
            None,
        )
        .await?;
    tester.press(true).await?;
    tester.link_assertion(Reply::Ok).await?;
    tester.press(false).await?;

    tester.link(LinkAction::GetFeatures).await?;
    tester
        .link_assertion(Reply::Features(Features {
            experimental_features: true,
            ..default_features()
        }))
        .await?;

    tester.link(LinkAction::GetNonce).await?;
    tester.link_assertion_variant("Nonce").await?;

    Ok(())
}

#[functional_test_wrapper::functional_test]
async fn test_safety_checks(mut tester: Tester) -> Result<(), crate::Error> {
    let cs = langpack::get_lang_def("cs")?;
    let unsigned = langpack::build_blob(&cs)?;

    tester.link(LinkAction::GetFeatures).await?;
    tester
        .link_assertion(Reply::Features(default_features()))
        .await?;

    // Strict safety checks reject unsigned language packs
    tester
        .link(LinkAction::ChangeLanguage(unsigned.clone()))
        .await?;
    tester
        .link_assertion(Reply::Error("Invalid translations signature".into()))
        .await?;

    tester
        .link(LinkAction::ApplySettings(SettingsUpdate {
            safety_checks: Some(SafetyCheckLevel::PromptAlways),
            ..Default::default()
        }))
        .await?;
    tester
        .display_assertion(
            settings_screen(None, vec!["Safety checks: PromptAlways".into()]),
            None,
        )
        .await?;
    tester.press(true).await?;
    tester.link_assertion(Reply::Ok).await?;
    tester.press(false).await?;

    // Relaxed checks let the unsigned pack through (with confirmation)
    tester.link(LinkAction::ChangeLanguage(unsigned)).await?;
    tester
        .display_assertion(language_change_screen(None, "cs-CZ"), None)
        .await?;
    tester.press(true).await?;
    tester.link_assertion(Reply::Ok).await?;
    tester.press(false).await?;

    tester.link(LinkAction::GetFeatures).await?;
    tester
        .link_assertion(Reply::Features(Features {
            language: "cs-CZ".into(),
            safety_checks: SafetyCheckLevel::PromptAlways,
            ..default_features()
        }))
        .await?;

    // Back to English and strict checks
    tester.link(LinkAction::ChangeLanguage(vec![])).await?;
    tester
        .display_assertion(restore_language_screen(Some(&cs)), None)
        .await?;
    tester.press(true).await?;
    tester.link_assertion(Reply::Ok).await?;
    tester.press(false).await?;

    tester
        .link(LinkAction::ApplySettings(SettingsUpdate {
            safety_checks: Some(SafetyCheckLevel::Strict),
            ..Default::default()
        }))
        .await?;
    tester
        .display_assertion(
            settings_screen(None, vec!["Safety checks: Strict".into()]),
            None,
        )
        .await?;
    tester.press(true).await?;
    tester.link_assertion(Reply::Ok).await?;
    tester.press(false).await?;

    let unsigned = langpack::build_blob(&cs)?;
    tester.link(LinkAction::ChangeLanguage(unsigned)).await?;
    tester
        .link_assertion(Reply::Error("Invalid translations signature".into()))
        .await?;

    Ok(())
}

#[functional_test_wrapper::functional_test]
async fn test_safety_checks_temporary_reverts_on_reboot(
    mut tester: Tester,
) -> Result<(), crate::Error> {
    tester
        .link(LinkAction::ApplySettings(SettingsUpdate {
            safety_checks: Some(SafetyCheckLevel::PromptTemporarily),
            ..Default::default()
        }))
        .await?;
    tester
        .display_assertion(
            settings_screen(None, vec!["Safety checks: PromptTemporarily".into()]),
            None,
        )
        .await?;
    tester.press(true).await?;
    tester.link_assertion(Reply::Ok).await?;
    tester.press(false).await?;

    tester.link(LinkAction::GetFeatures).await?;
    tester
        .link_assertion(Reply::Features(Features {
            safety_checks: SafetyCheckLevel::PromptTemporarily,
            ..default_features()
        }))
        .await?;

    tester.reset().await?;
    tester.wait_ticks(4).await?;

    tester.link(LinkAction::GetFeatures).await?;
    tester
        .link_assertion(Reply::Features(default_features()))
        .await?;

    Ok(())
}

#[functional_test_wrapper::functional_test(pin = "1234")]
async fn test_apply_settings_locked(mut tester: Tester) -> Result<(), crate::Error> {
    tester.display_assertion(locked_screen(), None).await?;

    tester.link(LinkAction::GetFeatures).await?;
    tester
        .link_assertion(Reply::Features(Features {
            unlocked: false,
            ..default_features()
        }))
        .await?;

    // Settings are not reachable while locked
    tester
        .link(LinkAction::ApplySettings(SettingsUpdate {
            label: Some("new label".into()),
            ..Default::default()
        }))
        .await?;
    tester.link_assertion(Reply::Locked).await?;

    tester.link(LinkAction::Unlock("4321".into())).await?;
    tester.link_assertion(Reply::WrongPin).await?;

    tester.link(LinkAction::Unlock("1234".into())).await?;
    tester.link_assertion(Reply::Ok).await?;

    tester.display_assertion(ready_screen(None, "test"), None).await?;

    tester.link(LinkAction::GetFeatures).await?;
    tester
        .link_assertion(Reply::Features(default_features()))
        .await?;

    tester
        .link(LinkAction::ApplySettings(SettingsUpdate {
            label: Some("new label".into()),
            ..Default::default()
        }))
        .await?;
    tester
        .display_assertion(settings_screen(None, vec!["Label: new label".into()]), None)
        .await?;
    tester.press(true).await?;
    tester.link_assertion(Reply::Ok).await?;
    tester.press(false).await?;

    tester.link(LinkAction::GetFeatures).await?;
    tester
        .link_assertion(Reply::Features(Features {
            label: Some("new label".into()),
            ..default_features()
        }))
        .await?;

    Ok(())
}
