//! Input bar component
//!
//! The text input plus the send, voice, and stop controls.

use crate::controller::ConversationController;
use crate::speech::Control;
use crate::ui::focus::FocusNavigator;
use crate::ui::theme::Theme;
use egui::{self, Key, RichText, Vec2};

/// Input bar component for typed and spoken questions
pub struct InputBar<'a> {
    controller: &'a mut ConversationController,
    navigator: &'a mut FocusNavigator,
    theme: &'a Theme,
}

impl<'a> InputBar<'a> {
    pub fn new(
        controller: &'a mut ConversationController,
        navigator: &'a mut FocusNavigator,
        theme: &'a Theme,
    ) -> Self {
        Self {
            controller,
            navigator,
            theme,
        }
    }

    pub fn show(mut self, ui: &mut egui::Ui) {
        egui::Frame::none()
            .fill(self.theme.bg_secondary)
            .rounding(self.theme.card_rounding)
            .inner_margin(self.theme.spacing)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    self.show_text_input(ui);
                    ui.add_space(self.theme.spacing_sm);
                    self.show_send_button(ui);
                    self.show_voice_button(ui);
                    self.show_stop_button(ui);
                });
            });
    }

    fn show_text_input(&mut self, ui: &mut egui::Ui) {
        // Reserve space for the three buttons
        let available_width = ui.available_width() - 160.0;

        let text_edit = egui::TextEdit::singleline(self.controller.input_text_mut())
            .hint_text("Ask a question...")
            .desired_width(available_width)
            .font(egui::TextStyle::Body)
            .margin(egui::Margin::symmetric(12.0, 8.0));

        let response = ui.add(text_edit);

        if self.navigator.take_focus_request(Control::TextInput) {
            response.request_focus();
        }
        self.navigator
            .observe(Control::TextInput, response.has_focus());

        // Enter submits through the same debounced path as the send button
        if response.lost_focus() && ui.input(|i| i.key_pressed(Key::Enter)) {
            self.controller.submit_from_send();
            response.request_focus();
        }
    }

    fn show_send_button(&mut self, ui: &mut egui::Ui) {
        let enabled = self.controller.send_enabled();

        let button = egui::Button::new(
            RichText::new("➤").size(18.0).color(egui::Color32::WHITE),
        )
        .min_size(Vec2::splat(44.0))
        .rounding(self.theme.button_rounding)
        .fill(if enabled {
            self.theme.primary
        } else {
            self.theme.text_muted
        });

        let response = ui.add_enabled(enabled, button);

        if self.navigator.take_focus_request(Control::Send) {
            response.request_focus();
        }
        self.navigator.observe(Control::Send, response.has_focus());

        if response.clicked() {
            self.controller.submit_from_send();
        }

        response.on_hover_text("Send question (Enter)");
    }

    fn show_voice_button(&mut self, ui: &mut egui::Ui) {
        let listening = self.controller.voice_armed();
        let color = if listening {
            self.theme.listening
        } else {
            self.theme.text_secondary
        };

        let button = egui::Button::new(RichText::new("🎤").size(20.0).color(color))
            .min_size(Vec2::splat(44.0))
            .rounding(self.theme.button_rounding);

        let response = ui.add(button);

        if self.navigator.take_focus_request(Control::Voice) {
            response.request_focus();
        }
        self.navigator.observe(Control::Voice, response.has_focus());

        if response.clicked() {
            self.controller.activate_voice();
        }

        response.on_hover_text("Ask by voice");
    }

    fn show_stop_button(&mut self, ui: &mut egui::Ui) {
        let speaking = self.controller.is_speaking();
        let color = if speaking {
            self.theme.primary
        } else {
            self.theme.text_secondary
        };

        let button = egui::Button::new(RichText::new("⏹").size(20.0).color(color))
            .min_size(Vec2::splat(44.0))
            .rounding(self.theme.button_rounding);

        let response = ui.add(button);

        if self.navigator.take_focus_request(Control::Stop) {
            response.request_focus();
        }
        self.navigator.observe(Control::Stop, response.has_focus());

        if response.clicked() {
            self.controller.stop_speaking();
        }

        response.on_hover_text("Stop speaking");
    }
}
