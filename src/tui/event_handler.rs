use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};

use super::app::{App, AppMode, InputField, SettingsField};

/// Handle input in main mode
pub async fn handle_main_input(app: &mut App, key: KeyEvent) -> Result<()> {
    match key.code {
        // Navigation
        KeyCode::Up | KeyCode::Char('k') => app.select_previous(),
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::Home => app.selected = 0,
        KeyCode::End => app.selected = app.session.results().len().saturating_sub(1),

        // Inputs
        KeyCode::Char('b') => app.start_input(InputField::BasePath),
        KeyCode::Char('l') => app.start_input(InputField::ReferencePath),
        KeyCode::Char('p') => app.start_input(InputField::Prefix),
        KeyCode::Char('x') => {
            app.session.clear_reference_image();
            app.set_status("Reference image cleared");
        }

        // Batches
        KeyCode::Char('g') => app.generate(),
        KeyCode::Char('v') | KeyCode::Char('r') => app.revariate_selected(),
        KeyCode::Char('d') | KeyCode::Enter => app.download_selected().await,

        // Open settings
        KeyCode::Char('s') => {
            app.mode = AppMode::Settings;
            app.settings_selected = 0;
            app.settings_editing = false;
        }

        // Quit
        KeyCode::Char('q') | KeyCode::Esc => {
            app.should_quit = true;
        }

        _ => {}
    }
    Ok(())
}

/// Byte offset of the `pos`-th char
fn byte_index(s: &str, pos: usize) -> usize {
    s.char_indices().nth(pos).map(|(i, _)| i).unwrap_or(s.len())
}

/// Handle input in text input mode
pub fn handle_input_mode(app: &mut App, field: InputField, key: KeyEvent) -> Result<()> {
    let len = app.input.chars().count();
    match key.code {
        KeyCode::Esc => {
            app.mode = AppMode::Main;
            app.input.clear();
            app.cursor_pos = 0;
        }

        KeyCode::Enter => {
            let value = std::mem::take(&mut app.input);
            app.cursor_pos = 0;
            app.mode = AppMode::Main;
            app.submit_input(field, &value);
        }

        KeyCode::Char(c) => {
            let at = byte_index(&app.input, app.cursor_pos);
            app.input.insert(at, c);
            app.cursor_pos += 1;
        }

        KeyCode::Backspace => {
            if app.cursor_pos > 0 {
                app.cursor_pos -= 1;
                let at = byte_index(&app.input, app.cursor_pos);
                app.input.remove(at);
            }
        }

        KeyCode::Delete => {
            if app.cursor_pos < len {
                let at = byte_index(&app.input, app.cursor_pos);
                app.input.remove(at);
            }
        }

        KeyCode::Left => {
            if app.cursor_pos > 0 {
                app.cursor_pos -= 1;
            }
        }

        KeyCode::Right => {
            if app.cursor_pos < len {
                app.cursor_pos += 1;
            }
        }

        KeyCode::Home => {
            app.cursor_pos = 0;
        }

        KeyCode::End => {
            app.cursor_pos = len;
        }

        _ => {}
    }
    Ok(())
}

/// Handle input in settings mode
pub fn handle_settings_input(app: &mut App, key: KeyEvent) -> Result<()> {
    let fields = SettingsField::all();

    if app.settings_editing {
        // Editing a text field
        match key.code {
            KeyCode::Esc => {
                app.settings_editing = false;
                app.settings_edit_buffer.clear();
            }

            KeyCode::Enter => {
                let field = fields[app.settings_selected];
                let value = app.settings_edit_buffer.clone();
                if let Err(e) = app.set_settings_value(&field, &value) {
                    app.set_error(e.to_string());
                } else {
                    app.set_status(format!("Updated {}", field.label()));
                }
                app.settings_editing = false;
                app.settings_edit_buffer.clear();
            }

            KeyCode::Char(c) => {
                app.settings_edit_buffer.push(c);
            }

            KeyCode::Backspace => {
                app.settings_edit_buffer.pop();
            }

            _ => {}
        }
    } else {
        // Navigation
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                if app.settings_selected > 0 {
                    app.settings_selected -= 1;
                }
            }

            KeyCode::Down | KeyCode::Char('j') => {
                if app.settings_selected < fields.len() - 1 {
                    app.settings_selected += 1;
                }
            }

            KeyCode::Enter | KeyCode::Char(' ') => {
                let field = &fields[app.settings_selected];

                // Check if this field has options to cycle
                if app.get_settings_options(field).is_some() {
                    app.cycle_settings_option(field)?;
                    app.set_status(format!("Updated {}", field.label()));
                } else {
                    // Enter edit mode for text fields
                    app.settings_editing = true;
                    app.settings_edit_buffer = match field {
                        SettingsField::Timeout if app.config.api.timeout_secs.is_none() => String::new(),
                        _ => app.get_settings_value(field),
                    };
                }
            }

            KeyCode::Esc | KeyCode::Char('q') => {
                app.mode = AppMode::Main;
                app.clear_messages();
            }

            _ => {}
        }
    }
    Ok(())
}
