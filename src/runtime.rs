//! ONNX Runtime shared-library discovery and initialization.
//!
//! Deployments that bundle the runtime next to the executable (or under a
//! `lib/` directory) are found automatically; `ORT_DYLIB_PATH` overrides
//! everything.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Locate the ONNX Runtime library in common bundled locations.
///
/// Search order: `ORT_DYLIB_PATH`, then the executable's directory, then
/// the current working directory. Returns `None` to let ort use system
/// library paths.
#[must_use]
pub fn find_ort_library() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("ORT_DYLIB_PATH") {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    let mut roots = Vec::new();
    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        roots.push(exe_dir);
    }
    if let Ok(cwd) = std::env::current_dir() {
        roots.push(cwd);
    }

    roots.iter().find_map(|root| bundled_library(root))
}

/// Look for the platform's runtime library under one root directory.
fn bundled_library(root: &Path) -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        let candidate = root.join("onnxruntime.dll");
        if candidate.exists() {
            return Some(candidate);
        }
    }

    #[cfg(target_os = "macos")]
    {
        let candidate = root.join("lib").join("libonnxruntime.dylib");
        if candidate.exists() {
            return Some(candidate);
        }
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    {
        let lib_dir = root.join("lib");
        let exact = lib_dir.join("libonnxruntime.so");
        if exact.exists() {
            return Some(exact);
        }

        // Versioned names like libonnxruntime.so.1.22.0
        if let Ok(entries) = std::fs::read_dir(&lib_dir) {
            for entry in entries.flatten() {
                if entry
                    .file_name()
                    .to_string_lossy()
                    .starts_with("libonnxruntime.so")
                {
                    return Some(entry.path());
                }
            }
        }
    }

    let _ = root;
    None
}

/// Initialize ONNX Runtime with an auto-detected library path.
///
/// Call once at application startup, before any model loading. When no
/// bundled library is found, ort falls back to system library paths.
///
/// # Errors
///
/// Returns [`Error::RuntimeInit`] if a library was found but fails to
/// initialize.
pub fn init_runtime() -> Result<()> {
    if let Some(lib_path) = find_ort_library() {
        ort::init_from(lib_path.display().to_string())
            .commit()
            .map_err(|e| Error::RuntimeInit(e.to_string()))?;
    }
    Ok(())
}
