use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Start a background thread that listens for the global hotkey Ctrl+Shift+K (Windows).
/// Sets `flag` to `true` when the hotkey is pressed.
///
/// The bot's clicks move focus to the game, where the terminal keys no longer
/// reach us; this is the way to pause it without alt-tabbing.
#[cfg(target_os = "windows")]
pub fn start_hotkey_listener(flag: Arc<AtomicBool>) {
    use windows::Win32::Foundation::HWND;
    use windows::Win32::UI::Input::KeyboardAndMouse::{
        RegisterHotKey, MOD_CONTROL, MOD_NOREPEAT, MOD_SHIFT, VK_K,
    };
    use windows::Win32::UI::WindowsAndMessaging::{GetMessageW, MSG, WM_HOTKEY};

    const HOTKEY_ID: i32 = 1;

    std::thread::spawn(move || {
        unsafe {
            let registered = RegisterHotKey(
                HWND::default(),
                HOTKEY_ID,
                MOD_CONTROL | MOD_SHIFT | MOD_NOREPEAT,
                VK_K.0 as u32,
            );
            if registered.is_err() {
                crate::logger::error(
                    "failed to register global hotkey Ctrl+Shift+K, \
                     another application may have claimed it",
                );
                return;
            }

            crate::logger::info("global hotkey Ctrl+Shift+K registered");

            let mut msg = MSG::default();
            // GetMessageW blocks until a message arrives; 0 on WM_QUIT, -1 on error
            while GetMessageW(&mut msg, HWND::default(), 0, 0).0 > 0 {
                if msg.message == WM_HOTKEY && msg.wParam.0 == HOTKEY_ID as usize {
                    flag.store(true, Ordering::Release);
                }
            }
        }
    });
}

#[cfg(not(target_os = "windows"))]
pub fn start_hotkey_listener(_flag: Arc<AtomicBool>) {
    // Global hotkeys not supported on this platform
}

/// Consume a pending hotkey press.
pub fn take(flag: &AtomicBool) -> bool {
    flag.swap(false, Ordering::AcqRel)
}
