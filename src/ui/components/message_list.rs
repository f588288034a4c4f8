//! Message list component
//!
//! Renders the conversation log, following the newest message.

use crate::transcript::{Message, Sender, TranscriptLog};
use crate::ui::theme::Theme;
use egui::{self, Align, Color32, RichText};

/// Scrollable view over the transcript
pub struct MessageList<'a> {
    transcript: &'a TranscriptLog,
    theme: &'a Theme,
}

impl<'a> MessageList<'a> {
    pub fn new(transcript: &'a TranscriptLog, theme: &'a Theme) -> Self {
        Self { transcript, theme }
    }

    pub fn show(self, ui: &mut egui::Ui) {
        let messages = self.transcript.snapshot();

        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .stick_to_bottom(true)
            .show(ui, |ui| {
                ui.vertical(|ui| {
                    ui.add_space(self.theme.spacing);

                    if messages.is_empty() {
                        self.show_empty_state(ui);
                    } else {
                        for message in &messages {
                            self.show_message(ui, message);
                            ui.add_space(self.theme.spacing_sm);
                        }
                    }

                    ui.add_space(self.theme.spacing);
                });
            });
    }

    fn show_empty_state(&self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.add_space(100.0);

            ui.label(
                RichText::new("Parley")
                    .size(24.0)
                    .color(self.theme.text_primary),
            );

            ui.add_space(self.theme.spacing);

            ui.label(
                RichText::new("Type a question, or use the voice button to ask aloud.")
                    .size(14.0)
                    .color(self.theme.text_muted),
            );
        });
    }

    fn show_message(&self, ui: &mut egui::Ui, message: &Message) {
        let is_user = matches!(message.sender, Sender::User);
        let bubble_color = if is_user {
            self.theme.user_bubble
        } else {
            self.theme.assistant_bubble
        };
        let text_color = if is_user {
            Color32::WHITE
        } else {
            self.theme.text_primary
        };
        let align = if is_user { Align::RIGHT } else { Align::LEFT };

        ui.with_layout(egui::Layout::top_down(align), |ui| {
            ui.label(
                RichText::new(if is_user { "You" } else { "Parley" })
                    .size(12.0)
                    .color(self.theme.text_muted),
            );

            ui.add_space(2.0);

            let max_width = ui.available_width() * 0.75;

            egui::Frame::none()
                .fill(bubble_color)
                .rounding(self.theme.bubble_rounding)
                .inner_margin(egui::Margin::symmetric(12.0, 8.0))
                .show(ui, |ui| {
                    ui.set_max_width(max_width);

                    let text = if message.is_placeholder() {
                        RichText::new(&message.text)
                            .italics()
                            .color(self.theme.text_muted)
                    } else {
                        RichText::new(&message.text).color(text_color)
                    };
                    ui.label(text);
                });

            let time_str = message.timestamp.format("%H:%M").to_string();
            ui.label(
                RichText::new(time_str)
                    .size(10.0)
                    .color(self.theme.text_muted),
            );
        });
    }
}
