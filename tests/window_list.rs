use topmost::core::{
    CORE_WINDOW_CLASS, ToggleFailure, WS_EX_APPWINDOW, WS_EX_NOACTIVATE, WS_EX_TOOLWINDOW,
    WindowTraits, is_app_window, is_topmost_style,
};

fn traits(visible: bool, ex_style: u32, has_owner: bool, title_len: usize, class: &str) -> WindowTraits {
    WindowTraits {
        visible,
        ex_style,
        has_owner,
        title_len,
        class_name: class.into(),
    }
}

#[test]
fn app_window_truth_table() {
    // visible, ex_style, owned, title, class -> listed?
    let rows = [
        (traits(true, 0, false, 4, "Notepad"), true),
        (traits(false, 0, false, 4, "Notepad"), false),
        (traits(false, WS_EX_APPWINDOW, false, 4, "Notepad"), false),
        (traits(true, 0, true, 4, "Notepad"), false),
        (traits(true, WS_EX_APPWINDOW, true, 0, "Dialog"), true),
        (traits(true, WS_EX_TOOLWINDOW, false, 4, "Palette"), false),
        (traits(true, WS_EX_TOOLWINDOW | WS_EX_APPWINDOW, false, 4, "Palette"), true),
        (traits(true, WS_EX_NOACTIVATE, false, 4, "Osd"), false),
        (traits(true, 0, false, 0, "Untitled"), false),
        (traits(true, 0, false, 4, CORE_WINDOW_CLASS), false),
    ];
    for (i, (t, want)) in rows.iter().enumerate() {
        assert_eq!(is_app_window(t), *want, "row {i}: {t:?}");
    }
}

#[test]
fn topmost_bit() {
    assert!(is_topmost_style(0x0000_0008));
    assert!(is_topmost_style(0x0004_0108));
    assert!(!is_topmost_style(WS_EX_APPWINDOW));
}

#[test]
fn toggle_failures_have_user_messages() {
    assert!(ToggleFailure::AccessDenied.message().contains("Access denied"));
    assert!(ToggleFailure::WindowClosed.message().contains("closed"));
    assert!(ToggleFailure::Other(87).message().contains("87"));
}
