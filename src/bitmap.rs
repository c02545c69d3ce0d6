// GDI glue between icon pixels and menu bitmaps.

use std::ffi::c_void;
use std::mem::size_of;

use anyhow::{Result, anyhow};
use windows::Win32::Foundation::{HANDLE, HWND, LPARAM, WPARAM};
use windows::Win32::Graphics::Gdi::{
    BI_RGB, BITMAPINFO, BITMAPINFOHEADER, CreateCompatibleDC, CreateDIBSection, DIB_RGB_COLORS,
    DeleteDC, DeleteObject, HBITMAP, HBRUSH, HDC, SelectObject,
};
use windows::Win32::UI::WindowsAndMessaging::{
    DI_NORMAL, DrawIconEx, GCLP_HICON, GCLP_HICONSM, GetClassLongPtrW, HICON, SMTO_ABORTIFHUNG,
    SendMessageTimeoutW, WM_GETICON,
};

use crate::pixels::{self, IconPixels};

const ICON_SMALL2: usize = 2;

/// A DIB section deleted on drop.
pub struct OwnedBitmap(pub HBITMAP);

impl Drop for OwnedBitmap {
    fn drop(&mut self) {
        if !self.0.is_invalid() {
            unsafe {
                let _ = DeleteObject(self.0);
            }
        }
    }
}

unsafe fn create_dib(size: u32) -> Result<(HBITMAP, *mut u8)> {
    let mut bi = BITMAPINFO::default();
    bi.bmiHeader = BITMAPINFOHEADER {
        biSize: size_of::<BITMAPINFOHEADER>() as u32,
        biWidth: size as i32,
        biHeight: -(size as i32), // top-down
        biPlanes: 1,
        biBitCount: 32,
        biCompression: BI_RGB.0,
        ..Default::default()
    };
    let mut bits: *mut c_void = std::ptr::null_mut();
    let hbm = CreateDIBSection(HDC::default(), &bi, DIB_RGB_COLORS, &mut bits, HANDLE::default(), 0)?;
    if hbm.is_invalid() || bits.is_null() {
        return Err(anyhow!("CreateDIBSection failed"));
    }
    Ok((hbm, bits as *mut u8))
}

pub fn to_hbitmap(px: &IconPixels) -> Result<OwnedBitmap> {
    unsafe {
        let (hbm, bits) = create_dib(px.size)?;
        std::ptr::copy_nonoverlapping(px.bgra.as_ptr(), bits, px.bgra.len());
        Ok(OwnedBitmap(hbm))
    }
}

/// Icon a window presents for itself: class small icon, then
/// `WM_GETICON`, then class icon.
pub fn window_icon(hwnd: HWND) -> Option<HICON> {
    unsafe {
        let small = GetClassLongPtrW(hwnd, GCLP_HICONSM);
        if small != 0 {
            return Some(HICON(small as *mut c_void));
        }
        let mut sent = 0usize;
        let ok = SendMessageTimeoutW(
            hwnd,
            WM_GETICON,
            WPARAM(ICON_SMALL2),
            LPARAM(0),
            SMTO_ABORTIFHUNG,
            200,
            Some(&mut sent),
        );
        if ok.0 != 0 && sent != 0 {
            return Some(HICON(sent as *mut c_void));
        }
        let big = GetClassLongPtrW(hwnd, GCLP_HICON);
        (big != 0).then(|| HICON(big as *mut c_void))
    }
}

/// Renders `icon` into a `size` x `size` premultiplied BGRA buffer.
pub fn icon_pixels(icon: HICON, size: u32) -> Result<IconPixels> {
    unsafe {
        let (hbm, bits) = create_dib(size)?;
        let bmp = OwnedBitmap(hbm);
        let dc = CreateCompatibleDC(HDC::default());
        if dc.is_invalid() {
            return Err(anyhow!("CreateCompatibleDC failed"));
        }
        let old = SelectObject(dc, bmp.0);
        let drawn = DrawIconEx(dc, 0, 0, icon, size as i32, size as i32, 0, HBRUSH::default(), DI_NORMAL);
        SelectObject(dc, old);
        let _ = DeleteDC(dc);
        drawn?;
        let len = (size as usize) * (size as usize) * 4;
        let mut bgra = std::slice::from_raw_parts(bits, len).to_vec();
        pixels::fill_missing_alpha(&mut bgra);
        IconPixels::new(size, bgra)
    }
}
