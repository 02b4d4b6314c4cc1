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

//! Screen pages drawn by the firmware.
//!
//! Pages render to a structured [`Screen`] layout (title, body lines, button
//! labels) instead of a framebuffer. The debug link snapshots whole layouts,
//! which is what the functional tests assert on.

use model::Screen;

/// Where pages draw to. Implemented by the firmware display.
pub trait ScreenTarget {
    type Error;

    fn draw(&mut self, screen: Screen) -> Result<(), Self::Error>;
}

pub trait Page {
    fn render(&self) -> Screen;

    fn draw_to<T: ScreenTarget>(&self, target: &mut T) -> Result<(), T::Error> {
        target.draw(self.render())
    }
}

pub struct WelcomePage<'s> {
    device_name: &'s str,
}

impl<'s> WelcomePage<'s> {
    pub fn new(device_name: &'s str) -> Self {
        WelcomePage { device_name }
    }
}

impl<'s> Page for WelcomePage<'s> {
    fn render(&self) -> Screen {
        let mut screen = Screen::new(self.device_name);
        screen.body.push("Uninitialized".to_string());
        screen
    }
}

pub struct SingleLineTextPage<'s> {
    text: &'s str,
}

impl<'s> SingleLineTextPage<'s> {
    pub fn new(text: &'s str) -> Self {
        SingleLineTextPage { text }
    }
}

impl<'s> Page for SingleLineTextPage<'s> {
    fn render(&self) -> Screen {
        Screen::new(self.text)
    }
}

/// Idle screen: the device label (or model name) and a status line.
pub struct InitialPage<'s> {
    title: &'s str,
    status: &'s str,
}

impl<'s> InitialPage<'s> {
    pub fn new(title: &'s str, status: &'s str) -> Self {
        InitialPage { title, status }
    }
}

impl<'s> Page for InitialPage<'s> {
    fn render(&self) -> Screen {
        let mut screen = Screen::new(self.title);
        if !self.status.is_empty() {
            screen.body.push(self.status.to_string());
        }
        screen
    }
}

pub struct ErrorPage<'s> {
    title: &'s str,
    message: &'s str,
}

impl<'s> ErrorPage<'s> {
    pub fn new(title: &'s str, message: &'s str) -> Self {
        ErrorPage { title, message }
    }
}

impl<'s> Page for ErrorPage<'s> {
    fn render(&self) -> Screen {
        let mut screen = Screen::new(self.title);
        screen.body.push(self.message.to_string());
        screen
    }
}

pub const DEFAULT_CONFIRM_THRESHOLD: u32 = 70;
pub const CONFIRM_PER_TICK: u32 = 15;

/// Page with a hold-to-confirm bar: holding the button accrues progress on
/// every tick, releasing it resets the bar.
pub struct ConfirmBarPage<'s> {
    title: &'s str,
    body: Vec<String>,
    left_button: &'s str,
    right_button: &'s str,

    threshold: u32,
    confirm: u32,
}

impl<'s> ConfirmBarPage<'s> {
    pub fn new(
        title: &'s str,
        body: Vec<String>,
        left_button: &'s str,
        right_button: &'s str,
    ) -> Self {
        ConfirmBarPage {
            title,
            body,
            left_button,
            right_button,
            threshold: DEFAULT_CONFIRM_THRESHOLD,
            confirm: 0,
        }
    }

    pub fn new_with_threshold(
        title: &'s str,
        body: Vec<String>,
        left_button: &'s str,
        right_button: &'s str,
        threshold: u32,
    ) -> Self {
        ConfirmBarPage {
            threshold,
            ..Self::new(title, body, left_button, right_button)
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirm >= self.threshold
    }

    pub fn add_confirm(&mut self, value: u32) -> bool {
        self.confirm = self.confirm.saturating_add(value);
        self.is_confirmed()
    }

    pub fn reset_confirm(&mut self) {
        self.confirm = 0;
    }

    pub fn get_confirm(&self) -> u32 {
        self.confirm
    }

    /// Returns whether the page needs a redraw. Progress is not part of the
    /// rendered layout, so ticking never forces one.
    pub fn tick(&mut self) -> bool {
        false
    }
}

impl<'s> Page for ConfirmBarPage<'s> {
    fn render(&self) -> Screen {
        Screen {
            title: self.title.to_string(),
            body: self.body.clone(),
            left_button: Some(self.left_button.to_string()),
            right_button: Some(self.right_button.to_string()),
        }
    }
}

macro_rules! impl_wrapper_page {
    ($struct:ident $( < $($lifetimes:lifetime),+ > )*, $inner:ty) => {
        impl$( < $($lifetimes),* > )* Page for $struct $( < $($lifetimes),* > )* {
            fn render(&self) -> Screen {
                self.0.render()
            }
        }

        impl$( < $($lifetimes),* > )* core::ops::Deref for $struct $( < $($lifetimes),* > )* {
            type Target = $inner;
            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }
        impl$( < $($lifetimes),* > )* core::ops::DerefMut for $struct $( < $($lifetimes),* > )* {
            fn deref_mut(&mut self) -> &mut Self::Target {
                &mut self.0
            }
        }
    };
}

/// One-line summary with a hold-to-confirm hint, used for destructive or
/// state-changing operations.
pub struct SummaryPage<'s>(ConfirmBarPage<'s>);
impl_wrapper_page!(SummaryPage<'s>, ConfirmBarPage<'s>);

impl<'s> SummaryPage<'s> {
    pub fn new(title: &'s str, hint: &'s str, left_button: &'s str, right_button: &'s str) -> Self {
        SummaryPage(ConfirmBarPage::new(
            title,
            vec![hint.to_string()],
            left_button,
            right_button,
        ))
    }

    pub fn new_with_threshold(
        title: &'s str,
        hint: &'s str,
        left_button: &'s str,
        right_button: &'s str,
        threshold: u32,
    ) -> Self {
        SummaryPage(ConfirmBarPage::new_with_threshold(
            title,
            vec![hint.to_string()],
            left_button,
            right_button,
            threshold,
        ))
    }
}

/// Shown while a translation blob is being streamed in.
pub struct TransferProgressPage<'s> {
    title: &'s str,
    total: usize,
    received: usize,
}

impl<'s> TransferProgressPage<'s> {
    pub fn new(title: &'s str, total: usize) -> Self {
        TransferProgressPage {
            title,
            total,
            received: 0,
        }
    }

    pub fn add_progress(&mut self, bytes: usize) {
        self.received = (self.received + bytes).min(self.total);
    }
}

impl<'s> Page for TransferProgressPage<'s> {
    fn render(&self) -> Screen {
        let mut screen = Screen::new(self.title);
        screen.body.push("Receiving data...".to_string());
        screen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirm_bar_threshold() {
        let mut page = ConfirmBarPage::new("Confirm", vec![], "Cancel", "Confirm");
        assert!(!page.is_confirmed());

        // 5 ticks of holding the button
        for _ in 0..4 {
            page.add_confirm(CONFIRM_PER_TICK);
            assert!(!page.is_confirmed());
        }
        page.add_confirm(CONFIRM_PER_TICK);
        assert!(page.is_confirmed());
    }

    #[test]
    fn test_confirm_bar_reset_on_release() {
        let mut page = ConfirmBarPage::new("Confirm", vec![], "Cancel", "Confirm");
        page.add_confirm(60);
        page.reset_confirm();
        assert_eq!(page.get_confirm(), 0);
    }

    #[test]
    fn test_render_buttons() {
        let page = ConfirmBarPage::new("Potvrdit", vec!["ahoj!".into()], "Zrušit", "Potvrdit");
        let screen = page.render();
        assert_eq!(screen.title, "Potvrdit");
        assert_eq!(screen.right_button.as_deref(), Some("Potvrdit"));
    }
}
