use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};

/// Event utility functions
pub mod event_utils {
    use super::*;

    /// Ctrl+C or Ctrl+Q
    pub fn is_terminate_event(event: &Event) -> bool {
        matches!(
            event,
            Event::Key(KeyEvent {
                code: KeyCode::Char('c') | KeyCode::Char('q'),
                modifiers: KeyModifiers::CONTROL,
                ..
            })
        )
    }

    /// Rows a mouse wheel event scrolls by, negative is up
    pub fn wheel_delta(mouse: &MouseEvent) -> Option<isize> {
        match mouse.kind {
            MouseEventKind::ScrollUp => Some(-1),
            MouseEventKind::ScrollDown => Some(1),
            _ => None,
        }
    }

    /// Numeric value of a plain digit key
    pub fn digit(key: &KeyEvent) -> Option<usize> {
        match key.code {
            KeyCode::Char(c) if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT => {
                c.to_digit(10).map(|d| d as usize)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::event_utils::*;
    use super::*;

    #[test]
    fn test_terminate_keys() {
        let ctrl_c = Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        let plain_q = Event::Key(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE));
        assert!(is_terminate_event(&ctrl_c));
        assert!(!is_terminate_event(&plain_q));
    }

    #[test]
    fn test_digit() {
        assert_eq!(digit(&KeyEvent::new(KeyCode::Char('7'), KeyModifiers::NONE)), Some(7));
        assert_eq!(digit(&KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE)), None);
        assert_eq!(digit(&KeyEvent::new(KeyCode::Char('1'), KeyModifiers::CONTROL)), None);
    }
}
