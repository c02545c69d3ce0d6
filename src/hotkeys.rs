use crate::config::KeyChord;
#[cfg(windows)]
use anyhow::{Result, anyhow};
#[cfg(windows)]
use windows::Win32::Foundation::HWND;
#[cfg(windows)]
use windows::Win32::UI::Input::KeyboardAndMouse::{
    MOD_ALT, MOD_CONTROL, MOD_NOREPEAT, MOD_SHIFT, RegisterHotKey, UnregisterHotKey,
};

pub const HK_TOGGLE_TOPMOST: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vk(pub u32);

/// Virtual-key code for a single letter/digit or `F1`..`F24`.
pub fn vk_from_key(key: &str) -> Option<Vk> {
    let up = key.trim().to_ascii_uppercase();
    let mut chars = up.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphanumeric() => Some(Vk(c as u32)),
        (Some('F'), Some(_)) => {
            let n: u32 = up[1..].parse().ok()?;
            (1..=24).contains(&n).then(|| Vk(0x70 + n - 1))
        }
        _ => None,
    }
}

/// Human readable chord, e.g. `Ctrl+Alt+T`.
pub fn describe(chord: &KeyChord) -> String {
    let mut parts: Vec<String> = Vec::new();
    if chord.ctrl {
        parts.push("Ctrl".into());
    }
    if chord.alt {
        parts.push("Alt".into());
    }
    if chord.shift {
        parts.push("Shift".into());
    }
    parts.push(chord.key.trim().to_ascii_uppercase());
    parts.join("+")
}

#[cfg(windows)]
pub fn register(hwnd: HWND, chord: &KeyChord, id: i32) -> Result<()> {
    let mut mods = MOD_NOREPEAT;
    if chord.ctrl {
        mods |= MOD_CONTROL;
    }
    if chord.alt {
        mods |= MOD_ALT;
    }
    if chord.shift {
        mods |= MOD_SHIFT;
    }
    let Vk(vk) = vk_from_key(&chord.key).ok_or_else(|| anyhow!("unsupported key {:?}", chord.key))?;
    unsafe { RegisterHotKey(hwnd, id, mods, vk) }
        .map_err(|e| anyhow!("RegisterHotKey({}) failed: {e}", describe(chord)))
}

#[cfg(windows)]
pub fn unregister(hwnd: HWND, id: i32) {
    unsafe {
        let _ = UnregisterHotKey(hwnd, id);
    }
}
