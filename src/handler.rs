use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, InputMode, View};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick_animation();
            app.poll_ask_task().await;
        }
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    // The chat panel captures all input while it is open
    if app.show_chat {
        handle_chat_key(app, key);
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_search_editing(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match app.view {
        View::Home => handle_home(app, key),
        View::Search => handle_search(app, key),
        View::ProductDetail => handle_product_detail(app, key),
    }
}

fn handle_home(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        // Product list
        KeyCode::Char('j') | KeyCode::Down => app.product_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.product_nav_up(),
        KeyCode::Enter => app.open_highlighted_product(),

        // Category tabs
        KeyCode::Tab | KeyCode::Right | KeyCode::Char('l') => app.next_category(),
        KeyCode::BackTab | KeyCode::Left | KeyCode::Char('h') => app.prev_category(),

        // Search input
        KeyCode::Char('/') => {
            app.input_mode = InputMode::Editing;
            app.search_cursor = app.search_input.chars().count();
        }

        // Chat panel
        KeyCode::Char('a') => app.open_chat(),

        _ => {}
    }
}

fn handle_search(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Esc => app.go_home(),

        KeyCode::Char('j') | KeyCode::Down => app.product_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.product_nav_up(),
        KeyCode::Enter => app.open_highlighted_product(),

        KeyCode::Char('/') => {
            app.input_mode = InputMode::Editing;
            app.search_cursor = app.search_input.chars().count();
        }

        KeyCode::Char('a') => app.open_chat(),

        _ => {}
    }
}

fn handle_product_detail(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Esc | KeyCode::Char('h') | KeyCode::Backspace => app.leave_product_detail(),

        KeyCode::Char('j') | KeyCode::Down => app.detail_scroll_down(),
        KeyCode::Char('k') | KeyCode::Up => app.detail_scroll_up(),

        KeyCode::Char('/') => {
            app.leave_product_detail();
            app.input_mode = InputMode::Editing;
            app.search_cursor = app.search_input.chars().count();
        }

        KeyCode::Char('a') => app.open_chat(),

        _ => {}
    }
}

fn handle_search_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            app.perform_search();
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Backspace => {
            if app.search_cursor > 0 {
                app.search_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.search_input, app.search_cursor);
                app.search_input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.search_input.chars().count();
            if app.search_cursor < char_count {
                let byte_pos = char_to_byte_index(&app.search_input, app.search_cursor);
                app.search_input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.search_cursor = app.search_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.search_input.chars().count();
            app.search_cursor = (app.search_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.search_cursor = 0;
        }
        KeyCode::End => {
            app.search_cursor = app.search_input.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.search_input, app.search_cursor);
            app.search_input.insert(byte_pos, c);
            app.search_cursor += 1;
        }
        _ => {}
    }
}

fn handle_chat_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.close_chat(),
        KeyCode::Enter => app.begin_ask(),

        KeyCode::Up => app.chat_scroll = app.chat_scroll.saturating_sub(1),
        KeyCode::Down => app.chat_scroll = app.chat_scroll.saturating_add(1),

        KeyCode::Backspace => {
            if app.chat_cursor > 0 {
                app.chat_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.chat_input, app.chat_cursor);
                app.chat_input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.chat_input.chars().count();
            if app.chat_cursor < char_count {
                let byte_pos = char_to_byte_index(&app.chat_input, app.chat_cursor);
                app.chat_input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.chat_cursor = app.chat_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.chat_input.chars().count();
            app.chat_cursor = (app.chat_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.chat_cursor = 0;
        }
        KeyCode::End => {
            app.chat_cursor = app.chat_input.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.chat_input, app.chat_cursor);
            app.chat_input.insert(byte_pos, c);
            app.chat_cursor += 1;
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEvent;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_search_flow_switches_views() {
        let mut app = App::new().unwrap();
        assert_eq!(app.view, View::Home);

        handle_key(&mut app, key(KeyCode::Char('/')));
        assert_eq!(app.input_mode, InputMode::Editing);

        for c in "sony".chars() {
            handle_key(&mut app, key(KeyCode::Char(c)));
        }
        handle_key(&mut app, key(KeyCode::Enter));

        assert_eq!(app.view, View::Search);
        assert_eq!(app.input_mode, InputMode::Normal);
        assert!(app.visible().iter().any(|p| p.brand == "Sony"));
    }

    #[test]
    fn test_enter_opens_product_and_esc_returns() {
        let mut app = App::new().unwrap();

        handle_key(&mut app, key(KeyCode::Enter));
        assert_eq!(app.view, View::ProductDetail);
        assert!(app.selected_product().is_some());

        handle_key(&mut app, key(KeyCode::Esc));
        assert_eq!(app.view, View::Home);
        assert!(app.selected_product().is_none());
    }

    #[test]
    fn test_chat_captures_typing() {
        let mut app = App::new().unwrap();

        handle_key(&mut app, key(KeyCode::Char('a')));
        assert!(app.show_chat);
        // Opening the chat seeds exactly one greeting
        assert_eq!(app.conversation.messages().len(), 1);

        for c in "hi".chars() {
            handle_key(&mut app, key(KeyCode::Char(c)));
        }
        assert_eq!(app.chat_input, "hi");
        // Typing into the chat never leaks into the catalog search
        assert!(app.search_input.is_empty());

        handle_key(&mut app, key(KeyCode::Esc));
        assert!(!app.show_chat);
    }

    #[test]
    fn test_search_cursor_editing_is_utf8_safe() {
        let mut app = App::new().unwrap();

        handle_key(&mut app, key(KeyCode::Char('/')));
        for c in "dysön".chars() {
            handle_key(&mut app, key(KeyCode::Char(c)));
        }
        assert_eq!(app.search_cursor, 5);

        // Fix the typo in the middle of the word
        handle_key(&mut app, key(KeyCode::Left));
        handle_key(&mut app, key(KeyCode::Backspace));
        handle_key(&mut app, key(KeyCode::Char('o')));
        assert_eq!(app.search_input, "dyson");

        handle_key(&mut app, key(KeyCode::Home));
        handle_key(&mut app, key(KeyCode::Delete));
        assert_eq!(app.search_input, "yson");
        assert_eq!(app.search_cursor, 0);

        handle_key(&mut app, key(KeyCode::End));
        assert_eq!(app.search_cursor, 4);
    }

    #[test]
    fn test_slash_places_cursor_at_end_of_existing_query() {
        let mut app = App::new().unwrap();

        handle_key(&mut app, key(KeyCode::Char('/')));
        for c in "tv".chars() {
            handle_key(&mut app, key(KeyCode::Char(c)));
        }
        handle_key(&mut app, key(KeyCode::Enter));
        assert_eq!(app.view, View::Search);

        // Re-entering edit mode resumes at the end of the kept query
        handle_key(&mut app, key(KeyCode::Char('/')));
        assert_eq!(app.search_cursor, 2);
        handle_key(&mut app, key(KeyCode::Char('s')));
        assert_eq!(app.search_input, "tvs");
    }

    #[test]
    fn test_chat_cursor_editing_is_utf8_safe() {
        let mut app = App::new().unwrap();
        handle_key(&mut app, key(KeyCode::Char('a')));

        for c in "héllo".chars() {
            handle_key(&mut app, key(KeyCode::Char(c)));
        }
        handle_key(&mut app, key(KeyCode::Home));
        handle_key(&mut app, key(KeyCode::Delete));
        assert_eq!(app.chat_input, "éllo");

        handle_key(&mut app, key(KeyCode::End));
        handle_key(&mut app, key(KeyCode::Backspace));
        assert_eq!(app.chat_input, "éll");
    }
}
