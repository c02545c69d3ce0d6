// Windows-only module compiled via cfg in the binary's main.rs

use anyhow::{Context, Result};
use std::cell::{Cell, RefCell};
use windows::Win32::Foundation::{HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::System::Com::{COINIT_APARTMENTTHREADED, CoInitializeEx, CoUninitialize};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::WindowsAndMessaging::*;
use windows::core::PCWSTR;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::sync::mpsc as std_mpsc;
use topmost::bitmap;
use topmost::config::{self, Config, MenuOptions, Paths};
use topmost::core::{self as wincore, ToggleFailure, WindowId};
use topmost::display::SystemDisplay;
use topmost::hotkeys::{self, HK_TOGGLE_TOPMOST};
use topmost::icon_queue::IconQueue;
use topmost::manifest::AppxManifest;
use topmost::menu::{self, MenuChoice, MenuEntry, WindowMenu};
use topmost::package::Win32PackageLocator;
use topmost::pixels::{self, IconPixels};
use topmost::resolver::{AssetResolver, DisplayProbe};
use topmost::tray::{TRAY_MSG, Tray};
use topmost::winlist::{self, Desktops};

const WM_ICONS_READY: u32 = WM_APP + 2;
const WM_CFG_CHANGED: u32 = WM_APP + 3;
const WM_THEME_CHANGED: u32 = WM_APP + 4;

const APP_NAME: &str = "TopMost";

thread_local! {
    static APP: RefCell<Option<AppState>> = const { RefCell::new(None) };
    // read by the message guard, which must not touch APP
    static TASKBAR_CREATED: Cell<u32> = const { Cell::new(0) };
}

/// What the worker hands back for one window.
struct LoadedIcon {
    pixels: Option<IconPixels>,
    resolve_failed: bool,
}

struct AppState {
    hwnd: HWND,
    cfg: Config,
    cfg_paths: Paths,
    tray: Tray,
    desktops: Desktops,
    display: SystemDisplay,
    icons: Option<IconQueue<LoadedIcon>>,
    menu: Option<WindowMenu>,
    menu_open: bool,
    failure_reported: bool,
}

fn post(hwnd_raw: usize, msg: u32) {
    unsafe {
        let _ = PostMessageW(
            HWND(hwnd_raw as *mut std::ffi::c_void),
            msg,
            WPARAM(0),
            LPARAM(0),
        );
    }
}

fn load_icon(
    resolver: &AssetResolver<Win32PackageLocator, AppxManifest>,
    display: &SystemDisplay,
    id: WindowId,
) -> Option<LoadedIcon> {
    if !winlist::is_alive(id) {
        return None;
    }
    let ctx = display.snapshot();
    let mut resolve_failed = false;
    let packaged = match resolver.resolve(id, &ctx) {
        Ok(Some(path)) => match pixels::load_png(&path, ctx.icon_size) {
            Ok(px) => Some(px),
            Err(e) => {
                tracing::warn!(window = id.0, error=%e, "package logo unreadable");
                resolve_failed = true;
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            tracing::warn!(window = id.0, error=%e, "package logo resolution failed");
            resolve_failed = true;
            None
        }
    };
    let pixels = packaged.or_else(|| {
        let icon = bitmap::window_icon(winlist::hwnd_of(id))?;
        bitmap::icon_pixels(icon, ctx.icon_size)
            .map_err(|e| tracing::debug!(window = id.0, error=%e, "window icon unavailable"))
            .ok()
    });
    Some(LoadedIcon {
        pixels: pixels.filter(|p| !p.is_blank()),
        resolve_failed,
    })
}

fn start_icon_queue(
    hwnd: HWND,
    opts: &MenuOptions,
    display: &SystemDisplay,
) -> Option<IconQueue<LoadedIcon>> {
    if !opts.show_icons {
        return None;
    }
    let resolver = AssetResolver::new(Win32PackageLocator, AppxManifest::new(opts.logo_attribute.clone()));
    let display = display.clone();
    let hwnd_raw = hwnd.0 as usize;
    match IconQueue::spawn(
        move |id| load_icon(&resolver, &display, id),
        move || post(hwnd_raw, WM_ICONS_READY),
    ) {
        Ok(q) => Some(q),
        Err(e) => {
            tracing::error!(error=%e, "icon loader failed to start; menu shows text only");
            None
        }
    }
}

/// Shows an error balloon without holding a borrow across the shell call.
fn balloon(title: &str, text: &str) {
    let tray = APP.with(|slot| slot.borrow().as_ref().map(|app| app.tray.clone()));
    if let Some(mut tray) = tray {
        tray.show_error(title, text);
    }
}

fn apply_hotkey(hwnd: HWND, cfg: &Config) {
    hotkeys::unregister(hwnd, HK_TOGGLE_TOPMOST);
    let chord = hotkeys::describe(&cfg.hotkey);
    match hotkeys::register(hwnd, &cfg.hotkey, HK_TOGGLE_TOPMOST) {
        Ok(()) => {
            tracing::info!(hotkey=%chord, "hotkey registered");
            let tray = APP.with(|slot| slot.borrow().as_ref().map(|app| app.tray.clone()));
            if let Some(mut tray) = tray {
                tray.set_tip(&format!("{APP_NAME} ({chord})"));
                APP.with(|slot| {
                    if let Some(app) = &mut *slot.borrow_mut() {
                        app.tray = tray;
                    }
                });
            }
        }
        Err(e) => {
            tracing::warn!(error=%e, "hotkey registration failed");
            balloon(
                "Hotkey",
                &format!("{chord} could not be registered. Adjust settings.json."),
            );
        }
    }
}

fn toggle(target: HWND) {
    match winlist::toggle_topmost(target) {
        Ok(pinned) => {
            tracing::info!(window = target.0 as usize, pinned, "toggled always-on-top");
        }
        Err(failure) => {
            if let ToggleFailure::Other(code) = failure {
                tracing::error!(window = target.0 as usize, code, "SetWindowPos failed");
            } else {
                tracing::warn!(window = target.0 as usize, ?failure, "toggle refused");
            }
            balloon(APP_NAME, &failure.message());
        }
    }
}

fn menu_entries(windows: &[HWND], max_label_chars: usize) -> Vec<MenuEntry> {
    windows
        .iter()
        .map(|&h| MenuEntry {
            window: winlist::id_of(h),
            label: wincore::menu_label(&winlist::window_title(h), max_label_chars),
            topmost: winlist::is_topmost(h),
        })
        .collect()
}

fn show_window_menu(hwnd: HWND) {
    // Claim the session first; a click while tracking is dropped.
    let snapshot = APP.with(|slot| {
        let mut borrowed = slot.borrow_mut();
        let app = borrowed.as_mut()?;
        if app.menu_open {
            return None;
        }
        app.menu_open = true;
        app.failure_reported = false;
        Some((app.desktops.clone(), app.cfg.menu.max_label_chars))
    });
    let Some((desktops, max_label_chars)) = snapshot else {
        tracing::debug!("menu already open");
        return;
    };

    // Enumeration talks to our own window too; no borrow may be held here.
    let windows = winlist::app_windows(&desktops);
    let entries = menu_entries(&windows, max_label_chars);
    let built = match WindowMenu::build(&entries) {
        Ok(m) => m,
        Err(e) => {
            tracing::error!(error=%e, "building the menu failed");
            APP.with(|slot| {
                if let Some(app) = &mut *slot.borrow_mut() {
                    app.menu_open = false;
                }
            });
            return;
        }
    };
    let hmenu = built.handle();
    tracing::debug!(windows = entries.len(), "showing menu");

    APP.with(|slot| {
        if let Some(app) = &mut *slot.borrow_mut() {
            if let Some(icons) = &app.icons {
                icons.request_all(built.windows().iter().copied());
            }
            app.menu = Some(built);
        }
    });

    let cmd = menu::track(hmenu, hwnd);

    let choice = APP.with(|slot| {
        let mut borrowed = slot.borrow_mut();
        let app = borrowed.as_mut()?;
        app.menu_open = false;
        app.menu.take().and_then(|m| m.choice(cmd))
    });
    match choice {
        Some(MenuChoice::Window(id)) => toggle(winlist::hwnd_of(id)),
        Some(MenuChoice::Exit) => unsafe {
            let _ = DestroyWindow(hwnd);
        },
        None => {}
    }
}

fn attach_loaded_icons() {
    // Take the menu out while touching it; SetMenuItemInfoW may repaint.
    let work = APP.with(|slot| {
        let mut borrowed = slot.borrow_mut();
        let app = borrowed.as_mut()?;
        let loaded = app.icons.as_ref()?.drain();
        let report = !app.failure_reported && loaded.iter().any(|(_, l)| l.resolve_failed);
        if report {
            app.failure_reported = true;
        }
        Some((loaded, app.menu.take(), report))
    });
    let Some((loaded, mut open_menu, report)) = work else {
        return;
    };
    if let Some(m) = open_menu.as_mut() {
        for (id, icon) in &loaded {
            if let Some(px) = &icon.pixels {
                if let Err(e) = m.set_icon(*id, px) {
                    tracing::debug!(window = id.0, error=%e, "menu bitmap not attached");
                }
            }
        }
    }
    let still_open = APP.with(|slot| {
        let mut borrowed = slot.borrow_mut();
        match borrowed.as_mut() {
            Some(app) if app.menu_open => {
                app.menu = open_menu.take();
                true
            }
            _ => false,
        }
    });
    // dropped outside the borrow when the session ended meanwhile
    drop(open_menu);
    if report && still_open {
        balloon(
            APP_NAME,
            "Some app icons could not be loaded. See the log for details.",
        );
    }
}

fn reload_config(hwnd: HWND) {
    let changed = APP.with(|slot| {
        let mut borrowed = slot.borrow_mut();
        let app = borrowed.as_mut()?;
        let new_cfg = config::load_from(&app.cfg_paths);
        if new_cfg == app.cfg {
            return None;
        }
        let restart_icons = new_cfg.menu.show_icons != app.cfg.menu.show_icons
            || new_cfg.menu.logo_attribute != app.cfg.menu.logo_attribute;
        let hotkey_changed = new_cfg.hotkey != app.cfg.hotkey;
        app.cfg = new_cfg;
        let old_queue = if restart_icons { app.icons.take() } else { None };
        Some((
            app.cfg.clone(),
            app.display.clone(),
            hotkey_changed,
            restart_icons,
            old_queue,
        ))
    });
    let Some((cfg, display, hotkey_changed, restart_icons, old_queue)) = changed else {
        return;
    };
    tracing::info!("configuration reloaded");
    if hotkey_changed {
        apply_hotkey(hwnd, &cfg);
    }
    if restart_icons {
        // joins the old worker
        drop(old_queue);
        let queue = start_icon_queue(hwnd, &cfg.menu, &display);
        APP.with(|slot| {
            if let Some(app) = &mut *slot.borrow_mut() {
                app.icons = queue;
            }
        });
    }
}

extern "system" fn wndproc(hwnd: HWND, msg: u32, w: WPARAM, l: LPARAM) -> LRESULT {
    match msg {
        WM_CREATE => {
            let tray = match Tray::new(hwnd, APP_NAME) {
                Ok(t) => t,
                Err(e) => {
                    tracing::error!(error=%e, "tray icon could not be added");
                    return LRESULT(-1);
                }
            };
            let (cfg, cfg_paths) = match config::load_or_default() {
                Ok(v) => v,
                Err(e) => {
                    tracing::error!(error=%e, "config unavailable");
                    return LRESULT(-1);
                }
            };
            let taskbar_created =
                unsafe { RegisterWindowMessageW(windows::core::w!("TaskbarCreated")) };
            TASKBAR_CREATED.with(|c| c.set(taskbar_created));

            let display = SystemDisplay::new();
            display.watch_theme(hwnd, WM_THEME_CHANGED);
            let icons = start_icon_queue(hwnd, &cfg.menu, &display);
            let app = AppState {
                hwnd,
                cfg: cfg.clone(),
                cfg_paths,
                tray,
                desktops: Desktops::new(),
                display,
                icons,
                menu: None,
                menu_open: false,
                failure_reported: false,
            };
            APP.with(|slot| *slot.borrow_mut() = Some(app));
            apply_hotkey(hwnd, &cfg);
            start_config_watcher(hwnd);
            LRESULT(0)
        }
        msg if msg != 0 && msg == TASKBAR_CREATED.with(|c| c.get()) => {
            let tray = APP.with(|slot| slot.borrow().as_ref().map(|app| app.tray.clone()));
            if let Some(mut tray) = tray {
                tray.re_add();
            }
            LRESULT(0)
        }
        TRAY_MSG => {
            // NOTIFYICON_VERSION_4: the mouse message is in LOWORD(lParam)
            let event = (l.0 as u32) & 0xFFFF;
            match event {
                WM_LBUTTONUP | WM_RBUTTONUP | WM_CONTEXTMENU => show_window_menu(hwnd),
                _ => {}
            }
            LRESULT(0)
        }
        WM_HOTKEY => {
            if w.0 as i32 == HK_TOGGLE_TOPMOST {
                let desktops = APP.with(|slot| slot.borrow().as_ref().map(|app| app.desktops.clone()));
                match desktops.and_then(|d| winlist::foreground_root(&d)) {
                    Some(target) => toggle(target),
                    None => tracing::debug!("hotkey: no listed foreground window"),
                }
            }
            LRESULT(0)
        }
        WM_ICONS_READY => {
            attach_loaded_icons();
            LRESULT(0)
        }
        WM_CFG_CHANGED => {
            reload_config(hwnd);
            LRESULT(0)
        }
        WM_THEME_CHANGED => {
            tracing::debug!("apps theme changed; next menu resolves against it");
            LRESULT(0)
        }
        WM_CLOSE => {
            unsafe {
                let _ = DestroyWindow(hwnd);
            }
            LRESULT(0)
        }
        WM_DESTROY => {
            let state = APP.with(|slot| slot.borrow_mut().take());
            if let Some(mut app) = state {
                hotkeys::unregister(app.hwnd, HK_TOGGLE_TOPMOST);
                // Remove tray icon to prevent ghost icons after exit
                app.tray.remove_icon();
                app.menu = None;
                if let Some(mut icons) = app.icons.take() {
                    icons.shutdown();
                }
            }
            unsafe { PostQuitMessage(0) };
            LRESULT(0)
        }
        _ => unsafe { DefWindowProcW(hwnd, msg, w, l) },
    }
}

fn class_name() -> PCWSTR {
    windows::core::w!("TopMostTrayWndClass")
}

fn single_instance_guard() -> bool {
    unsafe {
        let h = FindWindowW(class_name(), None).unwrap_or(HWND(std::ptr::null_mut()));
        h.0.is_null()
    }
}

/// Watches the config directory (the file itself is replaced on save) and
/// posts `WM_CFG_CHANGED` for events touching the settings file.
fn start_config_watcher(hwnd: HWND) {
    let paths = APP.with(|slot| slot.borrow().as_ref().map(|app| app.cfg_paths.clone()));
    let Some(paths) = paths else {
        return;
    };
    let hwnd_raw = hwnd.0 as usize;
    let spawned = std::thread::Builder::new()
        .name("config-watch".into())
        .spawn(move || {
            let (watch_tx, watch_rx) = std_mpsc::channel();
            let mut watcher: RecommendedWatcher =
                match Watcher::new(watch_tx, notify::Config::default()) {
                    Ok(w) => w,
                    Err(e) => {
                        tracing::warn!(error=%e, "config watcher unavailable");
                        return;
                    }
                };
            if let Err(e) = watcher.watch(&paths.cfg_dir, RecursiveMode::NonRecursive) {
                tracing::warn!(error=%e, dir=?paths.cfg_dir, "config watch failed");
                return;
            }
            while let Ok(event) = watch_rx.recv() {
                match event {
                    Ok(ev) if ev.paths.iter().any(|p| p == &paths.cfg_file) => {
                        post(hwnd_raw, WM_CFG_CHANGED);
                    }
                    Ok(_) => {}
                    Err(e) => tracing::debug!(error=%e, "config watcher event error"),
                }
            }
        });
    if let Err(e) = spawned {
        tracing::warn!(error=%e, "config watcher thread failed to start");
    }
}

pub fn main() -> Result<()> {
    // Logging is initialized by src/main.rs; nothing to do here.

    if !single_instance_guard() {
        tracing::warn!("Another instance is already running. Exiting.");
        return Ok(());
    }

    unsafe {
        CoInitializeEx(None, COINIT_APARTMENTTHREADED)
            .ok()
            .context("CoInitializeEx")?;

        let hinst = GetModuleHandleW(None).context("GetModuleHandleW")?;
        let wc = WNDCLASSW {
            lpfnWndProc: Some(wndproc),
            hInstance: hinst.into(),
            lpszClassName: class_name(),
            ..Default::default()
        };
        RegisterClassW(&wc);

        // Hidden tool window: owns the tray icon, the hotkey and the popup.
        let hwnd = CreateWindowExW(
            WS_EX_TOOLWINDOW,
            class_name(),
            windows::core::w!("TopMost"),
            WS_POPUP,
            0,
            0,
            0,
            0,
            None,
            None,
            hinst,
            None,
        )
        .context("CreateWindowExW")?;
        tracing::debug!(hwnd = hwnd.0 as usize, "tray window created");

        let mut msg = MSG::default();
        while GetMessageW(&mut msg, HWND(std::ptr::null_mut()), 0, 0).into() {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
        CoUninitialize();
    }
    tracing::info!("topmost exiting");
    Ok(())
}
