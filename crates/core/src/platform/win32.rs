use std::ffi::c_void;
use std::mem;

use windows::Win32::Foundation::{BOOL, HWND, LPARAM, RECT};
use windows::Win32::Graphics::Gdi::{
    BitBlt, CreateCompatibleBitmap, CreateCompatibleDC, DeleteDC, DeleteObject, GetDIBits,
    GetWindowDC, ReleaseDC, SelectObject, BITMAPINFO, BITMAPINFOHEADER, BI_RGB, DIB_RGB_COLORS,
    HBITMAP, HDC, HGDIOBJ, SRCCOPY,
};
use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_MOUSE, MOUSEEVENTF_ABSOLUTE, MOUSEEVENTF_LEFTDOWN,
    MOUSEEVENTF_LEFTUP, MOUSEEVENTF_MOVE, MOUSEEVENTF_VIRTUALDESK, MOUSEINPUT,
};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GetDesktopWindow, GetSystemMetrics, GetWindowRect, GetWindowTextLengthW,
    GetWindowTextW, IsWindowVisible, SM_CXVIRTUALSCREEN, SM_CYVIRTUALSCREEN, SM_XVIRTUALSCREEN,
    SM_YVIRTUALSCREEN,
};

use crate::error::{Error, Result};
use crate::logger;
use crate::types::*;
use super::{to_absolute, Platform, Pointer, WindowHandle};

pub struct Win32Platform;

fn hwnd(id: WindowId) -> HWND {
    HWND(id as usize as *mut c_void)
}

fn window_title(h: HWND) -> String {
    unsafe {
        let len = GetWindowTextLengthW(h);
        if len <= 0 {
            return String::new();
        }
        let mut buf = vec![0u16; len as usize + 1];
        let n = GetWindowTextW(h, &mut buf);
        String::from_utf16_lossy(&buf[..n.max(0) as usize])
    }
}

unsafe extern "system" fn collect_visible(h: HWND, lparam: LPARAM) -> BOOL {
    let out = &mut *(lparam.0 as *mut Vec<(WindowId, String)>);
    if IsWindowVisible(h).as_bool() {
        let title = window_title(h);
        if !title.is_empty() {
            out.push((h.0 as usize as WindowId, title));
        }
    }
    BOOL(1)
}

impl Platform for Win32Platform {
    fn list_windows(&self) -> Result<Vec<(WindowId, String)>> {
        let mut found: Vec<(WindowId, String)> = Vec::new();
        unsafe {
            EnumWindows(Some(collect_visible), LPARAM(&mut found as *mut _ as isize))
                .map_err(|e| Error::Capture(format!("EnumWindows: {}", e)))?;
        }
        Ok(found)
    }

    fn open_window(&self, window_id: WindowId) -> Result<Box<dyn WindowHandle>> {
        let title = window_title(hwnd(window_id));
        logger::info_p("win32", &format!("found window: \"{}\" (id: {:#x})", title, window_id));
        Ok(Box::new(Win32Window { window_id, title }))
    }

    fn desktop(&self) -> Result<Box<dyn WindowHandle>> {
        let window_id = unsafe { GetDesktopWindow() }.0 as usize as WindowId;
        Ok(Box::new(Win32Window { window_id, title: "Desktop".into() }))
    }

    fn pointer(&self) -> Box<dyn Pointer> {
        Box::new(Win32Pointer)
    }
}

struct Win32Window {
    window_id: WindowId,
    title: String,
}

impl WindowHandle for Win32Window {
    fn id(&self) -> WindowId { self.window_id }
    fn title(&self) -> &str { &self.title }

    fn region(&self) -> Result<Region> {
        let mut rc = RECT::default();
        unsafe { GetWindowRect(hwnd(self.window_id), &mut rc) }
            .map_err(|e| Error::Capture(format!("GetWindowRect: {}", e)))?;
        Ok(Region::from_ltrb(rc.left, rc.top, rc.right, rc.bottom))
    }

    fn capture(&mut self, rect: CaptureRect) -> Result<Frame> {
        let raw = blit(hwnd(self.window_id), rect)?;
        Ok(raw.to_frame())
    }
}

// --- Scoped GDI handles ---
//
// Each guard releases its handle on drop, so every exit path out of `blit`
// (including `?`) gives the device contexts back.

struct WindowDc {
    hwnd: HWND,
    hdc: HDC,
}

impl WindowDc {
    fn acquire(hwnd: HWND) -> Result<Self> {
        let hdc = unsafe { GetWindowDC(hwnd) };
        if hdc.is_invalid() {
            return Err(Error::Capture("GetWindowDC returned null".into()));
        }
        Ok(Self { hwnd, hdc })
    }
}

impl Drop for WindowDc {
    fn drop(&mut self) {
        unsafe { ReleaseDC(self.hwnd, self.hdc) };
    }
}

struct MemoryDc(HDC);

impl Drop for MemoryDc {
    fn drop(&mut self) {
        unsafe {
            let _ = DeleteDC(self.0);
        }
    }
}

struct Bitmap(HBITMAP);

impl Drop for Bitmap {
    fn drop(&mut self) {
        unsafe {
            let _ = DeleteObject(HGDIOBJ(self.0 .0));
        }
    }
}

/// Puts the previously selected object back into the DC.
struct Selection {
    hdc: HDC,
    previous: HGDIOBJ,
}

impl Drop for Selection {
    fn drop(&mut self) {
        unsafe { SelectObject(self.hdc, self.previous) };
    }
}

fn blit(h: HWND, rect: CaptureRect) -> Result<Capture> {
    if rect.w <= 0 || rect.h <= 0 {
        return Err(Error::Capture(format!("empty capture rect {:?}", rect)));
    }

    let window_dc = WindowDc::acquire(h)?;
    let mem_dc = MemoryDc(unsafe { CreateCompatibleDC(window_dc.hdc) });
    if mem_dc.0.is_invalid() {
        return Err(Error::Capture("CreateCompatibleDC failed".into()));
    }
    let bitmap = Bitmap(unsafe { CreateCompatibleBitmap(window_dc.hdc, rect.w, rect.h) });
    if bitmap.0.is_invalid() {
        return Err(Error::Capture("CreateCompatibleBitmap failed".into()));
    }
    let selection = Selection {
        hdc: mem_dc.0,
        previous: unsafe { SelectObject(mem_dc.0, HGDIOBJ(bitmap.0 .0)) },
    };

    unsafe {
        BitBlt(mem_dc.0, 0, 0, rect.w, rect.h, window_dc.hdc, rect.l, rect.t, SRCCOPY)
            .map_err(|e| Error::Capture(format!("BitBlt: {}", e)))?;
    }

    // Negative height asks for top-down rows.
    let mut info = BITMAPINFO {
        bmiHeader: BITMAPINFOHEADER {
            biSize: mem::size_of::<BITMAPINFOHEADER>() as u32,
            biWidth: rect.w,
            biHeight: -rect.h,
            biPlanes: 1,
            biBitCount: 32,
            biCompression: BI_RGB.0,
            ..Default::default()
        },
        ..Default::default()
    };
    let bytes_per_row = rect.w as u32 * 4;
    let mut data = vec![0u8; (bytes_per_row * rect.h as u32) as usize];

    // GetDIBits wants the bitmap deselected.
    drop(selection);
    let lines = unsafe {
        GetDIBits(
            mem_dc.0,
            bitmap.0,
            0,
            rect.h as u32,
            Some(data.as_mut_ptr() as *mut c_void),
            &mut info,
            DIB_RGB_COLORS,
        )
    };
    if lines != rect.h {
        return Err(Error::Capture(format!("GetDIBits copied {} of {} rows", lines, rect.h)));
    }

    Ok(Capture { data, width: rect.w as u32, height: rect.h as u32, bytes_per_row })
}

struct Win32Pointer;

impl Pointer for Win32Pointer {
    fn click(&mut self, at: ScreenPoint) -> Result<()> {
        let (vx, vy, vw, vh) = unsafe {
            (
                GetSystemMetrics(SM_XVIRTUALSCREEN),
                GetSystemMetrics(SM_YVIRTUALSCREEN),
                GetSystemMetrics(SM_CXVIRTUALSCREEN),
                GetSystemMetrics(SM_CYVIRTUALSCREEN),
            )
        };
        if vw <= 0 || vh <= 0 {
            return Err(Error::Input("virtual screen has no size".into()));
        }
        let dx = to_absolute(at.x, vx, vw);
        let dy = to_absolute(at.y, vy, vh);
        let flags = MOUSEEVENTF_ABSOLUTE | MOUSEEVENTF_VIRTUALDESK | MOUSEEVENTF_MOVE;
        let event = |extra| INPUT {
            r#type: INPUT_MOUSE,
            Anonymous: INPUT_0 {
                mi: MOUSEINPUT {
                    dx,
                    dy,
                    mouseData: 0,
                    dwFlags: flags | extra,
                    time: 0,
                    dwExtraInfo: 0,
                },
            },
        };
        let inputs = [event(MOUSEEVENTF_LEFTDOWN), event(MOUSEEVENTF_LEFTUP)];
        let sent = unsafe { SendInput(&inputs, mem::size_of::<INPUT>() as i32) };
        if sent as usize != inputs.len() {
            logger::error_p("win32", &format!("SendInput delivered {} of {} events", sent, inputs.len()));
            return Err(Error::Input(format!("SendInput delivered {} of {} events", sent, inputs.len())));
        }
        Ok(())
    }
}
