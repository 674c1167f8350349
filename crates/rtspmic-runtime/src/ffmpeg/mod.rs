//! ffmpeg invocation and launching.

mod invocation;
mod launcher;

pub use invocation::FfmpegInvocation;
pub use launcher::FfmpegLauncher;
