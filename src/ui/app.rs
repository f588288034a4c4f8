//! Main application struct and eframe integration

use crate::controller::ConversationController;
use crate::ui::components::{InputBar, MessageList};
use crate::ui::focus::FocusNavigator;
use crate::ui::theme::Theme;
use egui::{self, CentralPanel, RichText, TopBottomPanel};
use std::time::Duration;

/// Main Parley application
pub struct ParleyApp {
    /// Conversation orchestrator
    controller: ConversationController,
    /// Focus cycling and announcements
    navigator: FocusNavigator,
    /// Visual theme
    theme: Theme,
}

impl ParleyApp {
    /// Create the application, applying the theme
    pub fn new(cc: &eframe::CreationContext<'_>, controller: ConversationController) -> Self {
        let theme = Theme::dark();
        theme.apply(&cc.egui_ctx);

        Self {
            controller,
            navigator: FocusNavigator::new(),
            theme,
        }
    }

    fn show_header(&self, ctx: &egui::Context) {
        TopBottomPanel::top("header")
            .frame(
                egui::Frame::none()
                    .fill(self.theme.bg_secondary)
                    .inner_margin(12.0),
            )
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(
                        RichText::new("Parley")
                            .size(20.0)
                            .strong()
                            .color(self.theme.text_primary),
                    );
                    ui.label(
                        RichText::new("Voice Chat")
                            .size(14.0)
                            .color(self.theme.text_muted),
                    );

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if self.controller.is_speaking() {
                            ui.label(
                                RichText::new("Speaking...")
                                    .size(12.0)
                                    .color(self.theme.primary),
                            );
                        } else if self.controller.voice_active() {
                            ui.label(
                                RichText::new("Listening...")
                                    .size(12.0)
                                    .color(self.theme.listening),
                            );
                        }
                    });
                });
            });
    }

    fn show_input_area(&mut self, ctx: &egui::Context) {
        TopBottomPanel::bottom("input_area")
            .frame(
                egui::Frame::none()
                    .fill(self.theme.bg_primary)
                    .inner_margin(self.theme.spacing),
            )
            .show(ctx, |ui| {
                InputBar::new(&mut self.controller, &mut self.navigator, &self.theme).show(ui);
            });
    }

    fn show_content(&mut self, ctx: &egui::Context) {
        CentralPanel::default()
            .frame(egui::Frame::none().fill(self.theme.bg_primary))
            .show(ctx, |ui| {
                MessageList::new(self.controller.transcript(), &self.theme).show(ui);
            });
    }

    fn show_alert(&mut self, ctx: &egui::Context) {
        let Some(text) = self.controller.alert().map(String::from) else {
            return;
        };

        egui::Window::new("Voice input")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                ui.label(RichText::new(text).color(self.theme.text_primary));
                ui.add_space(self.theme.spacing_sm);
                ui.vertical_centered(|ui| {
                    if ui.button("OK").clicked() {
                        self.controller.dismiss_alert();
                    }
                });
            });
    }
}

impl eframe::App for ParleyApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Apply worker results before rendering
        self.controller.poll_events();

        self.navigator.begin_frame();

        // Tab inside the text input cycles our controls instead of egui's
        // default focus order
        if self.navigator.input_focused()
            && ctx.input_mut(|i| i.consume_key(egui::Modifiers::NONE, egui::Key::Tab))
        {
            self.navigator.navigate();
        }

        self.show_header(ctx);
        self.show_input_area(ctx);
        self.show_content(ctx);
        self.show_alert(ctx);

        self.navigator.end_frame(self.controller.speech());

        // Keep polling for worker events while idle
        ctx.request_repaint_after(Duration::from_millis(100));
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.controller.shutdown();
    }
}
