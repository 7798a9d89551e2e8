use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{InputPurpose, Screen};

#[derive(Debug, Clone, PartialEq)]
pub enum AppAction {
    Quit,
    MoveUp,
    MoveDown,
    Select,
    Back,
    Refresh,
    Navigate(Screen),
    ShowHelp,
    HideHelp,
    // Text input
    StartInput(InputPurpose),
    InputChar(char),
    InputBackspace,
    // Discovery filters
    CycleDiscipline,
    CycleField,
    ClearFilters,
    NextPage,
    PrevPage,
    TogglePreferenceFilter,
    // Article actions
    ShowDetail,
    ToggleSave,
    Cite,
    CycleCitationFormat,
    CopyCitation,
    AddToCollection,
    OpenInBrowser,
    // Collections
    NewCollection,
    ToggleVisibility,
    DeleteCollection,
    ShareCollection,
    RemoveFromCollection,
    // Preferences
    ToggleKeywordLogic,
    SavePreferences,
    ClearPreferences,
    // Account
    ChangePassword,
    SignOut,
}

/// Which kind of key handling is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Help,
    Detail,
    Text,
    Form,
    Citation,
    Confirm,
    Picker,
}

pub fn handle_key_event(key: KeyEvent, mode: InputMode, screen: &Screen) -> Option<AppAction> {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Some(AppAction::Quit);
    }

    match mode {
        // If help is showing, any key closes it
        InputMode::Help => return Some(AppAction::HideHelp),

        InputMode::Text | InputMode::Form => {
            return match key.code {
                KeyCode::Enter => Some(AppAction::Select),
                KeyCode::Esc => Some(AppAction::Back),
                KeyCode::Backspace => Some(AppAction::InputBackspace),
                KeyCode::Tab | KeyCode::Down => Some(AppAction::MoveDown),
                KeyCode::BackTab | KeyCode::Up => Some(AppAction::MoveUp),
                KeyCode::Char(c) => Some(AppAction::InputChar(c)),
                _ => None,
            };
        }

        InputMode::Detail => {
            return match key.code {
                KeyCode::Char('o') => Some(AppAction::OpenInBrowser),
                KeyCode::Char('c') => Some(AppAction::Cite),
                KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') | KeyCode::Char('d') => {
                    Some(AppAction::Back)
                }
                _ => None,
            };
        }

        InputMode::Citation => {
            return match key.code {
                KeyCode::Tab | KeyCode::Char('f') => Some(AppAction::CycleCitationFormat),
                KeyCode::Char('y') => Some(AppAction::CopyCitation),
                KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') => Some(AppAction::Back),
                _ => None,
            };
        }

        InputMode::Confirm => {
            return match key.code {
                KeyCode::Char('y') | KeyCode::Enter => Some(AppAction::Select),
                KeyCode::Char('n') | KeyCode::Esc => Some(AppAction::Back),
                _ => None,
            };
        }

        InputMode::Picker => {
            return match key.code {
                KeyCode::Char('j') | KeyCode::Down => Some(AppAction::MoveDown),
                KeyCode::Char('k') | KeyCode::Up => Some(AppAction::MoveUp),
                KeyCode::Enter => Some(AppAction::Select),
                KeyCode::Esc => Some(AppAction::Back),
                _ => None,
            };
        }

        InputMode::Normal => {}
    }

    // Keys shared by every screen
    match key.code {
        KeyCode::Char('q') => return Some(AppAction::Quit),
        KeyCode::Char('?') => return Some(AppAction::ShowHelp),
        KeyCode::Char('j') | KeyCode::Down => return Some(AppAction::MoveDown),
        KeyCode::Char('k') | KeyCode::Up => return Some(AppAction::MoveUp),
        KeyCode::Enter => return Some(AppAction::Select),
        KeyCode::Esc => return Some(AppAction::Back),
        KeyCode::Char('r') => return Some(AppAction::Refresh),
        KeyCode::Char(c @ '1'..='8') => {
            return c
                .to_digit(10)
                .and_then(|n| Screen::nav(n as usize))
                .map(AppAction::Navigate);
        }
        _ => {}
    }

    let article_keys = |code: KeyCode| match code {
        KeyCode::Char('d') => Some(AppAction::ShowDetail),
        KeyCode::Char('s') => Some(AppAction::ToggleSave),
        KeyCode::Char('c') => Some(AppAction::Cite),
        KeyCode::Char('a') => Some(AppAction::AddToCollection),
        KeyCode::Char('o') => Some(AppAction::OpenInBrowser),
        _ => None,
    };

    match screen {
        Screen::Landing => match key.code {
            KeyCode::Char('i') => Some(AppAction::Navigate(Screen::SignIn)),
            KeyCode::Char('u') => Some(AppAction::Navigate(Screen::SignUp)),
            _ => None,
        },

        Screen::DiscoveryArticles => match key.code {
            KeyCode::Char('/') => Some(AppAction::StartInput(InputPurpose::Search)),
            KeyCode::Char('f') => Some(AppAction::CycleDiscipline),
            KeyCode::Char('F') => Some(AppAction::CycleField),
            KeyCode::Char('t') => Some(AppAction::StartInput(InputPurpose::Ticker)),
            KeyCode::Char('J') => Some(AppAction::StartInput(InputPurpose::Journal)),
            KeyCode::Char('[') => Some(AppAction::StartInput(InputPurpose::DateFrom)),
            KeyCode::Char(']') => Some(AppAction::StartInput(InputPurpose::DateTo)),
            KeyCode::Char('x') => Some(AppAction::ClearFilters),
            KeyCode::Char('n') | KeyCode::Right => Some(AppAction::NextPage),
            KeyCode::Char('p') | KeyCode::Left => Some(AppAction::PrevPage),
            KeyCode::Char('P') => Some(AppAction::TogglePreferenceFilter),
            code => article_keys(code),
        },

        Screen::Dashboard | Screen::Saved => article_keys(key.code),

        Screen::Collection(_) => match key.code {
            KeyCode::Char('X') => Some(AppAction::RemoveFromCollection),
            KeyCode::Char('y') => Some(AppAction::ShareCollection),
            KeyCode::Char('v') => Some(AppAction::ToggleVisibility),
            KeyCode::Char('R') => Some(AppAction::StartInput(InputPurpose::RenameCollection)),
            KeyCode::Char('E') => Some(AppAction::StartInput(InputPurpose::CollectionDescription)),
            KeyCode::Char('D') => Some(AppAction::DeleteCollection),
            code => article_keys(code),
        },

        Screen::Collections => match key.code {
            KeyCode::Char('N') => Some(AppAction::NewCollection),
            KeyCode::Char('R') => Some(AppAction::StartInput(InputPurpose::RenameCollection)),
            KeyCode::Char('E') => Some(AppAction::StartInput(InputPurpose::CollectionDescription)),
            KeyCode::Char('v') => Some(AppAction::ToggleVisibility),
            KeyCode::Char('D') => Some(AppAction::DeleteCollection),
            KeyCode::Char('y') => Some(AppAction::ShareCollection),
            _ => None,
        },

        Screen::Discovery => match key.code {
            KeyCode::Char('i') => Some(AppAction::StartInput(InputPurpose::IncludeKeyword)),
            KeyCode::Char('e') => Some(AppAction::StartInput(InputPurpose::ExcludeKeyword)),
            KeyCode::Char('b') => Some(AppAction::StartInput(InputPurpose::ExcludeJournal)),
            KeyCode::Char('m') => Some(AppAction::StartInput(InputPurpose::FollowJournal)),
            KeyCode::Char('T') => Some(AppAction::StartInput(InputPurpose::FollowTicker)),
            KeyCode::Char('g') => Some(AppAction::ToggleKeywordLogic),
            KeyCode::Char('w') => Some(AppAction::SavePreferences),
            KeyCode::Char('C') => Some(AppAction::ClearPreferences),
            KeyCode::Char('l') => Some(AppAction::Navigate(Screen::DiscoveryArticles)),
            _ => None,
        },

        Screen::Account => match key.code {
            KeyCode::Char('n') => Some(AppAction::StartInput(InputPurpose::DisplayName)),
            KeyCode::Char('K') => Some(AppAction::ChangePassword),
            KeyCode::Char('L') => Some(AppAction::SignOut),
            _ => None,
        },

        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn text_input_captures_letters() {
        let action = handle_key_event(press(KeyCode::Char('q')), InputMode::Text, &Screen::DiscoveryArticles);
        assert_eq!(action, Some(AppAction::InputChar('q')));
    }

    #[test]
    fn ctrl_c_always_quits() {
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(handle_key_event(key, InputMode::Form, &Screen::SignIn), Some(AppAction::Quit));
    }

    #[test]
    fn same_key_means_different_things_per_screen() {
        let key = press(KeyCode::Char('i'));
        assert_eq!(
            handle_key_event(key, InputMode::Normal, &Screen::Landing),
            Some(AppAction::Navigate(Screen::SignIn))
        );
        assert_eq!(
            handle_key_event(key, InputMode::Normal, &Screen::Discovery),
            Some(AppAction::StartInput(InputPurpose::IncludeKeyword))
        );
    }

    #[test]
    fn number_keys_navigate() {
        assert_eq!(
            handle_key_event(press(KeyCode::Char('5')), InputMode::Normal, &Screen::Dashboard),
            Some(AppAction::Navigate(Screen::Collections))
        );
    }

    #[test]
    fn detail_key_opens_and_closes_the_article_popup() {
        assert_eq!(
            handle_key_event(press(KeyCode::Char('d')), InputMode::Normal, &Screen::Saved),
            Some(AppAction::ShowDetail)
        );
        let screen = Screen::Collection("c1".to_string());
        assert_eq!(
            handle_key_event(press(KeyCode::Char('d')), InputMode::Detail, &screen),
            Some(AppAction::Back)
        );
        assert_eq!(
            handle_key_event(press(KeyCode::Char('o')), InputMode::Detail, &screen),
            Some(AppAction::OpenInBrowser)
        );
        assert_eq!(
            handle_key_event(press(KeyCode::Char('s')), InputMode::Detail, &screen),
            None
        );
    }

    #[test]
    fn confirm_popup_only_accepts_yes_or_no() {
        assert_eq!(
            handle_key_event(press(KeyCode::Char('y')), InputMode::Confirm, &Screen::Collections),
            Some(AppAction::Select)
        );
        assert_eq!(
            handle_key_event(press(KeyCode::Char('D')), InputMode::Confirm, &Screen::Collections),
            None
        );
    }
}
