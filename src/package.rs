use std::path::{Path, PathBuf};

use windows::Win32::Foundation::{
    APPMODEL_ERROR_NO_PACKAGE, BOOL, CloseHandle, ERROR_INSUFFICIENT_BUFFER, HANDLE, HWND, LPARAM,
    WIN32_ERROR,
};
use windows::Win32::Storage::Packaging::Appx::{GetPackageFullName, GetPackagePathByFullName};
use windows::Win32::System::Threading::{
    OpenProcess, PROCESS_NAME_WIN32, PROCESS_QUERY_LIMITED_INFORMATION, QueryFullProcessImageNameW,
};
use windows::Win32::UI::WindowsAndMessaging::{EnumChildWindows, GetWindowThreadProcessId};
use windows::core::{PCWSTR, PWSTR};

use crate::core::WindowId;
use crate::resolver::{PackageLocator, ResolveError};

/// Process that hosts the frames of UWP apps.
const FRAME_HOST_EXE: &str = "applicationframehost.exe";

/// Finds packages through the app-model APIs. UWP windows are frames owned
/// by `ApplicationFrameHost.exe`; the app itself runs in the process of the
/// first child window with a different process id.
#[derive(Debug, Default, Clone, Copy)]
pub struct Win32PackageLocator;

struct Process(HANDLE);

impl Process {
    fn open(pid: u32) -> Result<Self, ResolveError> {
        unsafe { OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid) }
            .map(Self)
            .map_err(|e| ResolveError::Package(format!("OpenProcess({pid}): {e}")))
    }

    fn image_name(&self) -> Result<String, ResolveError> {
        let mut buf = [0u16; 1024];
        let mut len = buf.len() as u32;
        unsafe {
            QueryFullProcessImageNameW(self.0, PROCESS_NAME_WIN32, PWSTR(buf.as_mut_ptr()), &mut len)
        }
        .map_err(|e| ResolveError::Package(format!("QueryFullProcessImageNameW: {e}")))?;
        Ok(String::from_utf16_lossy(&buf[..len as usize]))
    }

    fn package_full_name(&self) -> Result<Option<Vec<u16>>, ResolveError> {
        let mut len = 0u32;
        let first = unsafe { GetPackageFullName(self.0, &mut len, PWSTR::null()) };
        if first == APPMODEL_ERROR_NO_PACKAGE {
            return Ok(None);
        }
        if first != ERROR_INSUFFICIENT_BUFFER {
            return Err(win32_failure("GetPackageFullName", first));
        }
        let mut buf = vec![0u16; len as usize];
        let rc = unsafe { GetPackageFullName(self.0, &mut len, PWSTR(buf.as_mut_ptr())) };
        if rc.is_err() {
            return Err(win32_failure("GetPackageFullName", rc));
        }
        Ok(Some(buf))
    }
}

impl Drop for Process {
    fn drop(&mut self) {
        unsafe {
            let _ = CloseHandle(self.0);
        }
    }
}

fn win32_failure(call: &str, err: WIN32_ERROR) -> ResolveError {
    ResolveError::Package(format!("{call} failed with error {}", err.0))
}

fn window_pid(hwnd: HWND) -> u32 {
    let mut pid = 0u32;
    unsafe { GetWindowThreadProcessId(hwnd, Some(&mut pid)) };
    pid
}

struct ChildSearch {
    host_pid: u32,
    found: Option<u32>,
}

unsafe extern "system" fn find_foreign_child(hwnd: HWND, l: LPARAM) -> BOOL {
    let search = &mut *(l.0 as *mut ChildSearch);
    let pid = window_pid(hwnd);
    if pid != search.host_pid {
        search.found = Some(pid);
        return BOOL(0);
    }
    BOOL(1)
}

fn package_path(full_name: &[u16]) -> Result<PathBuf, ResolveError> {
    let mut len = 0u32;
    let first = unsafe { GetPackagePathByFullName(PCWSTR(full_name.as_ptr()), &mut len, PWSTR::null()) };
    if first != ERROR_INSUFFICIENT_BUFFER {
        return Err(win32_failure("GetPackagePathByFullName", first));
    }
    let mut buf = vec![0u16; len as usize];
    let rc = unsafe {
        GetPackagePathByFullName(PCWSTR(full_name.as_ptr()), &mut len, PWSTR(buf.as_mut_ptr()))
    };
    if rc.is_err() {
        return Err(win32_failure("GetPackagePathByFullName", rc));
    }
    let end = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
    Ok(PathBuf::from(String::from_utf16_lossy(&buf[..end])))
}

impl PackageLocator for Win32PackageLocator {
    fn package_root(&self, window: WindowId) -> Result<Option<PathBuf>, ResolveError> {
        let hwnd = HWND(window.0 as *mut std::ffi::c_void);
        let host_pid = window_pid(hwnd);
        if host_pid == 0 {
            return Ok(None);
        }
        let exe = Process::open(host_pid)?.image_name()?;
        let is_frame_host = Path::new(&exe)
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.eq_ignore_ascii_case(FRAME_HOST_EXE));
        if !is_frame_host {
            return Ok(None);
        }

        let mut search = ChildSearch {
            host_pid,
            found: None,
        };
        unsafe {
            let _ = EnumChildWindows(
                hwnd,
                Some(find_foreign_child),
                LPARAM(&mut search as *mut ChildSearch as isize),
            );
        }
        let Some(app_pid) = search.found else {
            return Ok(None);
        };

        let Some(full_name) = Process::open(app_pid)?.package_full_name()? else {
            return Ok(None);
        };
        let root = package_path(&full_name)?;
        tracing::debug!(window = window.0, pid = app_pid, package=?root, "packaged app window");
        Ok(Some(root))
    }
}
