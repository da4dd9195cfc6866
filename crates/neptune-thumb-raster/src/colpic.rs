//! ColPic vendor compressor loaded from a shared library.
//!
//! The color-stream compression newer Neptune firmware expects is only
//! available as a vendor binary (`libColPic.so` / `libColPic.dylib` /
//! `ColPic_X64.dll`). It is looked up next to the executable first, then on
//! the system search path.

use std::ffi::c_int;
use std::path::PathBuf;

use libloading::Library;
use tracing::{debug, warn};

use crate::codec::ColorStreamCompressor;
use crate::error::{RasterError, RasterResult};

/// int ColPic_EncodeStr(U16* fromcolor16, int picw, int pich,
///                      U8* outputdata, int outputmaxtsize, int colorsmax);
type ColPicEncodeStr =
    unsafe extern "C" fn(*const u16, c_int, c_int, *mut u8, c_int, c_int) -> c_int;

const LIBRARY_NAMES: &[&str] = if cfg!(target_os = "macos") {
    &["libColPic.dylib"]
} else if cfg!(windows) {
    &["ColPic_X64.dll"]
} else {
    &["libColPic.so"]
};

/// [`ColorStreamCompressor`] backed by the vendor shared library.
pub struct ColPicLibrary {
    lib: Library,
}

impl ColPicLibrary {
    /// Loads the vendor library, preferring a copy next to the executable.
    pub fn load() -> RasterResult<Self> {
        let mut candidates: Vec<PathBuf> = Vec::new();
        if let Some(exe_dir) = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        {
            for name in LIBRARY_NAMES {
                candidates.push(exe_dir.join(name));
            }
        }
        for name in LIBRARY_NAMES {
            candidates.push(PathBuf::from(name));
        }

        let mut last_error = String::new();
        for candidate in &candidates {
            // SAFETY: loading a library runs its initializers; the ColPic
            // binary has none beyond the C runtime.
            match unsafe { Library::new(candidate) } {
                Ok(lib) => {
                    debug!("loaded ColPic library from {}", candidate.display());
                    return Ok(Self { lib });
                }
                Err(e) => last_error = e.to_string(),
            }
        }
        Err(RasterError::CompressorUnavailable(last_error))
    }
}

impl ColorStreamCompressor for ColPicLibrary {
    fn encode(&self, pixels: &[u16], width: u32, height: u32, max_colors: u32) -> (Vec<u8>, i32) {
        let mut output = vec![0u8; (width * height) as usize];

        let encode_str = match unsafe { self.lib.get::<ColPicEncodeStr>(b"ColPic_EncodeStr") } {
            Ok(sym) => sym,
            Err(e) => {
                warn!("ColPic_EncodeStr symbol missing: {}", e);
                return (output, -1);
            }
        };

        // ColPic takes the row count before the column count.
        let status = unsafe {
            encode_str(
                pixels.as_ptr(),
                height as c_int,
                width as c_int,
                output.as_mut_ptr(),
                output.len() as c_int,
                max_colors as c_int,
            )
        };
        (output, status)
    }
}
