//! The window popup: one entry per listed window, a separator, then Exit.
//! Icons are attached while the menu is open, so the handle stays owned by
//! [`WindowMenu`] and tracking happens through [`track`] without a borrow.

use anyhow::Result;
use windows::Win32::Foundation::{HWND, LPARAM, POINT, WPARAM};
use windows::Win32::UI::WindowsAndMessaging::{
    AppendMenuW, CreatePopupMenu, DestroyMenu, GetCursorPos, HMENU, MENUITEMINFOW, MF_CHECKED,
    MF_SEPARATOR, MF_STRING, MF_UNCHECKED, MIIM_BITMAP, PostMessageW, SetForegroundWindow,
    SetMenuItemInfoW, TPM_BOTTOMALIGN, TPM_RETURNCMD, TPM_RIGHTBUTTON, TrackPopupMenu, WM_NULL,
};
use windows::core::PCWSTR;

use crate::bitmap::{self, OwnedBitmap};
use crate::core::WindowId;
use crate::pixels::IconPixels;

pub const CMD_EXIT: u32 = 1;
const CMD_WINDOW_BASE: u32 = 100;

#[derive(Debug, Clone)]
pub struct MenuEntry {
    pub window: WindowId,
    pub label: String,
    pub topmost: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Window(WindowId),
    Exit,
}

pub struct WindowMenu {
    hmenu: HMENU,
    windows: Vec<WindowId>,
    // must outlive the menu that shows them
    bitmaps: Vec<OwnedBitmap>,
}

fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

impl WindowMenu {
    pub fn build(entries: &[MenuEntry]) -> Result<Self> {
        unsafe {
            let hmenu = CreatePopupMenu()?;
            // owned from here on so an early return still destroys it
            let mut menu = Self {
                hmenu,
                windows: Vec::with_capacity(entries.len()),
                bitmaps: Vec::new(),
            };
            for (i, entry) in entries.iter().enumerate() {
                let text = wide(&entry.label);
                let check = if entry.topmost { MF_CHECKED } else { MF_UNCHECKED };
                AppendMenuW(
                    hmenu,
                    MF_STRING | check,
                    (CMD_WINDOW_BASE + i as u32) as usize,
                    PCWSTR(text.as_ptr()),
                )?;
                menu.windows.push(entry.window);
            }
            if !entries.is_empty() {
                AppendMenuW(hmenu, MF_SEPARATOR, 0, PCWSTR::null())?;
            }
            AppendMenuW(
                hmenu,
                MF_STRING,
                CMD_EXIT as usize,
                PCWSTR(windows::core::w!("Exit").as_wide().as_ptr()),
            )?;
            Ok(menu)
        }
    }

    pub fn handle(&self) -> HMENU {
        self.hmenu
    }

    pub fn windows(&self) -> &[WindowId] {
        &self.windows
    }

    /// Puts `pixels` next to the entry for `window`. Unknown windows are
    /// ignored; the menu may have been rebuilt since the request.
    pub fn set_icon(&mut self, window: WindowId, pixels: &IconPixels) -> Result<()> {
        let Some(pos) = self.windows.iter().position(|&w| w == window) else {
            return Ok(());
        };
        let bmp = bitmap::to_hbitmap(pixels)?;
        let info = MENUITEMINFOW {
            cbSize: std::mem::size_of::<MENUITEMINFOW>() as u32,
            fMask: MIIM_BITMAP,
            hbmpItem: bmp.0,
            ..Default::default()
        };
        unsafe { SetMenuItemInfoW(self.hmenu, CMD_WINDOW_BASE + pos as u32, false, &info)? };
        self.bitmaps.push(bmp);
        Ok(())
    }

    pub fn choice(&self, cmd: u32) -> Option<MenuChoice> {
        if cmd == CMD_EXIT {
            return Some(MenuChoice::Exit);
        }
        let idx = cmd.checked_sub(CMD_WINDOW_BASE)? as usize;
        self.windows.get(idx).copied().map(MenuChoice::Window)
    }
}

impl Drop for WindowMenu {
    fn drop(&mut self) {
        unsafe {
            let _ = DestroyMenu(self.hmenu);
        }
    }
}

/// Shows `hmenu` at the cursor and blocks until it is dismissed. Returns
/// the chosen command id, 0 when cancelled.
pub fn track(hmenu: HMENU, owner: HWND) -> u32 {
    unsafe {
        let mut pt = POINT::default();
        let _ = GetCursorPos(&mut pt);
        let _ = SetForegroundWindow(owner);
        let cmd = TrackPopupMenu(
            hmenu,
            TPM_RIGHTBUTTON | TPM_BOTTOMALIGN | TPM_RETURNCMD,
            pt.x,
            pt.y,
            0,
            owner,
            None,
        );
        // lets the menu close properly when focus moves elsewhere
        let _ = PostMessageW(owner, WM_NULL, WPARAM(0), LPARAM(0));
        cmd.0 as u32
    }
}
