mod filesystem;
mod platform;

pub(crate) use filesystem::*;
pub(crate) use platform::*;

pub(crate) static BUILD_TARGET_PLATFORM: LinuxPlatform<RealFilesystem> =
    LinuxPlatform::new(RealFilesystem);
