//! Keyboard input handling for the TUI.
//!
//! This module handles all keyboard events and translates them into
//! application state changes.

use std::time::Instant;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};

use crate::app::{can_add_password_char, can_add_user_id_char, App, AppState, Focus, LoginFocus, Page};

/// Handle keyboard input. Returns true if the app should quit.
pub async fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match app.state {
        AppState::LoggingIn => return handle_login_input(app, key).await,
        AppState::ShowingHelp => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
                app.state = AppState::Normal;
            }
            return Ok(false);
        }
        AppState::ConfirmingQuit => {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    app.state = AppState::Quitting;
                    return Ok(true);
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    app.state = AppState::Normal;
                }
                _ => {}
            }
            return Ok(false);
        }
        AppState::ConfirmingDelete => {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => app.confirm_delete().await,
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.cancel_delete(),
                _ => {}
            }
            return Ok(false);
        }
        AppState::Editing => {
            handle_form_input(app, key).await;
            return Ok(false);
        }
        AppState::Searching => {
            handle_search_input(app, key);
            return Ok(false);
        }
        AppState::Normal | AppState::Quitting => {}
    }

    // Account pages type straight into their form
    if app.focus == Focus::Content && matches!(app.page, Page::Account(_)) {
        handle_form_input(app, key).await;
        return Ok(false);
    }

    // Global keys
    match key.code {
        KeyCode::Char('q') => {
            app.state = AppState::ConfirmingQuit;
            return Ok(false);
        }
        KeyCode::Char('?') => {
            app.state = AppState::ShowingHelp;
            return Ok(false);
        }
        KeyCode::Char('L') => {
            app.logout();
            return Ok(false);
        }
        KeyCode::Char('u') => {
            app.refresh().await;
            return Ok(false);
        }
        KeyCode::Tab | KeyCode::BackTab => {
            app.focus = match app.focus {
                Focus::Menu => Focus::Content,
                Focus::Content => Focus::Menu,
            };
            return Ok(false);
        }
        _ => {}
    }

    match app.focus {
        Focus::Menu => handle_menu_input(app, key).await,
        Focus::Content => handle_content_input(app, key).await,
    }
    Ok(false)
}

async fn handle_menu_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => app.select_menu_prev(),
        KeyCode::Down | KeyCode::Char('j') => app.select_menu_next(),
        KeyCode::Enter | KeyCode::Right => app.open_menu_selection().await,
        _ => {}
    }
}

async fn handle_content_input(app: &mut App, key: KeyEvent) {
    if matches!(app.page, Page::List(_)) {
        handle_list_input(app, key).await;
        return;
    }

    match key.code {
        KeyCode::Esc | KeyCode::Backspace | KeyCode::Left => app.go_back().await,
        _ => {}
    }
}

async fn handle_list_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => app.open_selected().await,
        KeyCode::Char('n') => app.new_record().await,
        KeyCode::Char('e') => app.edit_selected().await,
        KeyCode::Char('d') => app.request_delete(),
        KeyCode::Char('r') => app.enroll_selected().await,
        KeyCode::Char('/') => app.state = AppState::Searching,
        KeyCode::Esc | KeyCode::Left => app.focus = Focus::Menu,
        _ => {
            let Some(list) = app.list_mut() else {
                return;
            };
            match key.code {
                KeyCode::Up | KeyCode::Char('k') => list.select_prev(),
                KeyCode::Down | KeyCode::Char('j') => list.select_next(),
                KeyCode::PageDown | KeyCode::Char(']') => list.next_page(),
                KeyCode::PageUp | KeyCode::Char('[') => list.prev_page(),
                _ => {}
            }
        }
    }
}

fn handle_search_input(app: &mut App, key: KeyEvent) {
    let now = Instant::now();
    let Some(list) = app.list_mut() else {
        app.state = AppState::Normal;
        return;
    };
    match key.code {
        KeyCode::Esc => {
            list.type_search("", now);
            list.submit_search();
            app.state = AppState::Normal;
        }
        KeyCode::Enter => {
            // Apply without waiting for the debounce
            list.submit_search();
            app.state = AppState::Normal;
        }
        KeyCode::Backspace => list.pop_search_char(now),
        KeyCode::Char(c) => list.push_search_char(c, now),
        _ => {}
    }
}

/// Keys for the editor overlay or an account page form.
async fn handle_form_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            if app.editor.is_some() {
                app.close_editor();
            } else {
                app.go_back().await;
            }
            return;
        }
        KeyCode::Enter => {
            if app.editor.is_some() {
                app.submit_editor().await;
            } else {
                app.submit_account_form().await;
            }
            return;
        }
        _ => {}
    }

    let Some(form) = app.active_form() else {
        return;
    };
    if form.is_submitting() {
        return;
    }
    match key.code {
        KeyCode::Tab | KeyCode::Down => form.focus_next(),
        KeyCode::BackTab | KeyCode::Up => form.focus_prev(),
        KeyCode::Left => form.cycle_option(false),
        KeyCode::Right => form.cycle_option(true),
        KeyCode::Backspace => form.pop_char(),
        KeyCode::Char(c) if !c.is_control() => form.push_char(c),
        _ => {}
    }
}

async fn handle_login_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Esc => {
            // Quit if on login screen
            app.state = AppState::Quitting;
            return Ok(true);
        }
        KeyCode::Down | KeyCode::Tab => app.login_focus = app.login_focus.next(),
        KeyCode::Up | KeyCode::BackTab => app.login_focus = app.login_focus.prev(),
        KeyCode::Enter => match app.login_focus {
            LoginFocus::UserId => app.login_focus = LoginFocus::Password,
            LoginFocus::Password | LoginFocus::Button => app.attempt_login().await,
            LoginFocus::Forgot => app.forgot_password().await,
        },
        KeyCode::Backspace => match app.login_focus {
            LoginFocus::UserId => {
                app.login_user_id.pop();
            }
            LoginFocus::Password => {
                app.login_password.pop();
            }
            LoginFocus::Button | LoginFocus::Forgot => {}
        },
        KeyCode::Char(c) => match app.login_focus {
            LoginFocus::UserId => {
                if can_add_user_id_char(app.login_user_id.len(), c) {
                    app.login_user_id.push(c);
                }
            }
            LoginFocus::Password => {
                if can_add_password_char(app.login_password.len(), c) {
                    app.login_password.push(c);
                }
            }
            LoginFocus::Button | LoginFocus::Forgot => {}
        },
        _ => {}
    }
    Ok(false)
}
