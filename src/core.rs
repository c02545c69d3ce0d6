/// Raw window handle value. Plain integer so it can cross threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(pub usize);

pub const WS_EX_TOPMOST: u32 = 0x0000_0008;
pub const WS_EX_TOOLWINDOW: u32 = 0x0000_0080;
pub const WS_EX_APPWINDOW: u32 = 0x0004_0000;
pub const WS_EX_NOACTIVATE: u32 = 0x0800_0000;

/// Host window class of UWP content; the frame window is listed instead.
pub const CORE_WINDOW_CLASS: &str = "Windows.UI.Core.CoreWindow";

#[derive(Debug, Clone, Default)]
pub struct WindowTraits {
    pub visible: bool,
    pub ex_style: u32,
    pub has_owner: bool,
    pub title_len: usize,
    pub class_name: String,
}

pub fn is_app_window(w: &WindowTraits) -> bool {
    if !w.visible {
        return false;
    }
    if w.ex_style & WS_EX_APPWINDOW != 0 {
        return true;
    }
    !w.has_owner
        && w.ex_style & WS_EX_NOACTIVATE == 0
        && w.ex_style & WS_EX_TOOLWINDOW == 0
        && w.title_len > 0
        && w.class_name != CORE_WINDOW_CLASS
}

pub fn is_topmost_style(ex_style: u32) -> bool {
    ex_style & WS_EX_TOPMOST != 0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleFailure {
    AccessDenied,
    WindowClosed,
    Other(u32),
}

impl ToggleFailure {
    pub fn from_win32(code: u32) -> Self {
        match code {
            5 => Self::AccessDenied,
            1400 => Self::WindowClosed,
            c => Self::Other(c),
        }
    }

    pub fn message(self) -> String {
        match self {
            Self::AccessDenied => {
                "Access denied. The window belongs to a process running with higher privileges."
                    .into()
            }
            Self::WindowClosed => "The window has already been closed.".into(),
            Self::Other(c) => format!("Changing the window failed (error {c})."),
        }
    }
}

/// Win32 error code carried by an HRESULT, or the raw value otherwise.
pub fn win32_code(hresult: i32) -> u32 {
    let hr = hresult as u32;
    if hr & 0xFFFF_0000 == 0x8007_0000 {
        hr & 0xFFFF
    } else {
        hr
    }
}

/// Menu text for a window title: `&` escaped, long titles cut with an ellipsis.
pub fn menu_label(title: &str, max_chars: usize) -> String {
    let trimmed = title.trim();
    let mut out = String::with_capacity(trimmed.len() + 4);
    let count = trimmed.chars().count();
    for (i, ch) in trimmed.chars().enumerate() {
        if max_chars > 0 && count > max_chars && i + 1 == max_chars {
            out.push('…');
            break;
        }
        if ch == '&' {
            out.push('&');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> WindowTraits {
        WindowTraits {
            visible: true,
            ex_style: 0,
            has_owner: false,
            title_len: 5,
            class_name: "Notepad".into(),
        }
    }

    #[test]
    fn plain_top_level_window_is_listed() {
        assert!(is_app_window(&plain()));
    }

    #[test]
    fn hidden_or_tool_windows_are_not() {
        assert!(!is_app_window(&WindowTraits { visible: false, ..plain() }));
        assert!(!is_app_window(&WindowTraits { ex_style: WS_EX_TOOLWINDOW, ..plain() }));
        assert!(!is_app_window(&WindowTraits { ex_style: WS_EX_NOACTIVATE, ..plain() }));
        assert!(!is_app_window(&WindowTraits { title_len: 0, ..plain() }));
        assert!(!is_app_window(&WindowTraits { class_name: CORE_WINDOW_CLASS.into(), ..plain() }));
    }

    #[test]
    fn appwindow_style_overrides_owner_and_toolwindow() {
        let w = WindowTraits {
            ex_style: WS_EX_APPWINDOW | WS_EX_TOOLWINDOW,
            has_owner: true,
            ..plain()
        };
        assert!(is_app_window(&w));
    }

    #[test]
    fn classifies_setwindowpos_errors() {
        assert_eq!(ToggleFailure::from_win32(5), ToggleFailure::AccessDenied);
        assert_eq!(ToggleFailure::from_win32(1400), ToggleFailure::WindowClosed);
        assert_eq!(ToggleFailure::from_win32(87), ToggleFailure::Other(87));
        assert_eq!(win32_code(0x8007_0005_u32 as i32), 5);
        assert_eq!(win32_code(0x8000_4005_u32 as i32), 0x8000_4005);
    }

    #[test]
    fn labels_escape_and_truncate() {
        assert_eq!(menu_label("  R&D notes ", 60), "R&&D notes");
        assert_eq!(menu_label("abcdef", 4), "abc…");
        assert_eq!(menu_label("abcd", 4), "abcd");
        assert_eq!(menu_label("abcdef", 0), "abcdef");
    }
}
