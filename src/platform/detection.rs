//! Host platform detection

use super::Platform;

/// Detect the platform this binary is running on
pub fn current() -> Platform {
    from_target(std::env::consts::OS, std::env::consts::ARCH)
}

/// Map an OS/arch pair (as in `std::env::consts`) to a platform tag
pub fn from_target(os: &str, arch: &str) -> Platform {
    match (os, arch) {
        ("windows", _) => Platform::Windows,
        ("linux", _) => Platform::Linux,
        ("macos", "aarch64") => Platform::MacosApple,
        ("macos", "x86_64") => Platform::MacosIntel,
        _ => Platform::Undefined,
    }
}
