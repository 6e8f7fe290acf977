use std::time::Duration;

use eframe::egui::{self, Button, Color32, DragValue, Key, RichText, Spinner, TextEdit};
use eframe::{App, Frame};
use egui_extras::{Column, TableBuilder};

use crate::constants::{APP_TITLE, MAX_SAVE_DELAY_SECS, MIN_SAVE_DELAY_SECS};
use crate::models::ConnectionStatus;

use super::state::HighlightApp;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const ERROR_COLOR: Color32 = Color32::from_rgb(255, 120, 120);
const CONNECTING_COLOR: Color32 = Color32::from_rgb(120, 170, 255);

fn status_color(status: ConnectionStatus) -> Color32 {
    match status {
        ConnectionStatus::Connected => Color32::LIGHT_GREEN,
        ConnectionStatus::Error => ERROR_COLOR,
        ConnectionStatus::Connecting => CONNECTING_COLOR,
        ConnectionStatus::Idle => Color32::GRAY,
    }
}

impl App for HighlightApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        self.poll_backend();
        self.apply_theme(ctx);

        if self.status == ConnectionStatus::Connecting || self.play_in_flight() {
            ctx.request_repaint_after(Duration::from_millis(200));
        }

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(RichText::new(format!("{APP_TITLE} v{VERSION}")).strong());
                    ui.separator();
                    ui.checkbox(&mut self.dark_theme, "Use dark theme");
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.spacing_mut().item_spacing.y = 10.0;
            if self.status == ConnectionStatus::Connected {
                egui::ScrollArea::vertical()
                    .auto_shrink([false, false])
                    .show(ui, |ui| self.dashboard(ui));
            } else {
                self.login_form(ui);
            }
        });
    }
}

impl HighlightApp {
    fn apply_theme(&self, ctx: &egui::Context) {
        if self.dark_theme {
            ctx.set_visuals(egui::Visuals::dark());
        } else {
            ctx.set_visuals(egui::Visuals::light());
        }
    }

    fn login_form(&mut self, ui: &mut egui::Ui) {
        let locked = self.status.locks_form();
        ui.vertical_centered(|ui| {
            ui.add_space(40.0);
            ui.heading(RichText::new(format!("{APP_TITLE} v{VERSION}")).size(28.0));
            ui.label("Connect to OBS Studio");
            ui.add_space(12.0);

            ui.colored_label(
                status_color(self.status),
                format!("● {}", self.status.label()),
            );
            if let Some(err) = &self.error_message {
                ui.colored_label(ERROR_COLOR, err);
            }
            ui.add_space(12.0);

            // Enter only counts when it left one of the fields.
            let entered = egui::Grid::new("login_grid")
                .num_columns(2)
                .spacing([16.0, 8.0])
                .show(ui, |ui| {
                    ui.label("Port *");
                    let port = ui.add_enabled(
                        !locked,
                        TextEdit::singleline(&mut self.port_input)
                            .desired_width(200.0)
                            .hint_text("4455"),
                    );
                    ui.end_row();

                    ui.label("Password (optional)");
                    let password = ui.add_enabled(
                        !locked,
                        TextEdit::singleline(&mut self.password_input)
                            .password(true)
                            .desired_width(200.0)
                            .hint_text("Enter password"),
                    );
                    ui.end_row();

                    (port.lost_focus() || password.lost_focus())
                        && ui.input(|input| input.key_pressed(Key::Enter))
                })
                .inner;
            ui.add_space(8.0);

            let submitted = if self.status == ConnectionStatus::Connecting {
                ui.horizontal(|ui| {
                    ui.add(Spinner::new());
                    ui.label("Connecting…");
                });
                false
            } else {
                let label = if self.status == ConnectionStatus::Connected {
                    "Connected"
                } else {
                    "Connect to OBS"
                };
                let clicked = ui
                    .add_enabled(!locked, Button::new(label).min_size([200.0, 32.0].into()))
                    .clicked();
                clicked || (!locked && entered)
            };
            if submitted {
                self.submit_login();
            }

            ui.add_space(16.0);
            ui.label(
                RichText::new(
                    "Make sure OBS Studio is running with its WebSocket server enabled.",
                )
                .small()
                .weak(),
            );
        });
    }

    fn dashboard(&mut self, ui: &mut egui::Ui) {
        ui.heading(RichText::new(format!("{APP_TITLE} Dashboard v{VERSION}")).size(26.0));
        ui.colored_label(Color32::LIGHT_GREEN, "● OBS Studio connected");
        ui.add_space(6.0);

        ui.group(|ui| {
            ui.set_width(ui.available_width());
            ui.label(RichText::new("Recorded clips").strong());
            self.clip_table(ui);
        });

        ui.group(|ui| {
            ui.set_width(ui.available_width());
            ui.label(RichText::new("Playback").strong());
            ui.horizontal(|ui| {
                let button = Button::new("▶ Play highlights").min_size([180.0, 32.0].into());
                if ui.add_enabled(!self.play_in_flight(), button).clicked() {
                    self.play_highlights();
                }
                if self.play_in_flight() {
                    ui.add(Spinner::new());
                }
            });
            if let Some(err) = &self.last_play_error {
                ui.colored_label(ERROR_COLOR, err);
            } else if let Some(summary) = &self.last_play_summary {
                ui.colored_label(Color32::LIGHT_GREEN, summary);
            }
            ui.label("• Goals and epic saves are recorded automatically.");
            ui.label(format!(
                "• Listening for game events on UDP {}",
                self.udp_listen_addr
            ));
        });

        ui.group(|ui| {
            ui.set_width(ui.available_width());
            ui.label(RichText::new("Settings").strong());
            ui.horizontal(|ui| {
                ui.label("Save delay");
                let mut secs = self.save_delay_secs;
                let response = ui.add(
                    DragValue::new(&mut secs)
                        .clamp_range(MIN_SAVE_DELAY_SECS..=MAX_SAVE_DELAY_SECS)
                        .suffix(" s"),
                );
                if response.changed() && secs != self.save_delay_secs {
                    self.set_save_delay(secs);
                }
            });
            ui.label(
                RichText::new("Wait between a goal or save and saving the replay buffer.")
                    .small()
                    .weak(),
            );
        });
    }

    fn clip_table(&self, ui: &mut egui::Ui) {
        if self.clips.is_empty() {
            ui.label(RichText::new("No recordings").weak());
            return;
        }
        ui.push_id("clip_table", |ui| {
            TableBuilder::new(ui)
                .striped(true)
                .max_scroll_height(220.0)
                .column(Column::auto().at_least(32.0))
                .column(Column::auto().at_least(72.0))
                .column(Column::remainder())
                .header(20.0, |mut header| {
                    header.col(|ui| {
                        ui.strong("#");
                    });
                    header.col(|ui| {
                        ui.strong("Saved");
                    });
                    header.col(|ui| {
                        ui.strong("Path");
                    });
                })
                .body(|mut body| {
                    for (index, clip) in self.clips.entries().iter().enumerate() {
                        body.row(20.0, |mut row| {
                            row.col(|ui| {
                                ui.label((index + 1).to_string());
                            });
                            row.col(|ui| {
                                ui.label(clip.received_at.format("%H:%M:%S").to_string());
                            });
                            row.col(|ui| {
                                let path = clip.path.display().to_string();
                                ui.label(RichText::new(&path).monospace())
                                    .on_hover_text(path);
                            });
                        });
                    }
                });
        });
        ui.label(
            RichText::new(format!("{} clip(s)", self.clips.len()))
                .small()
                .weak(),
        );
    }
}
