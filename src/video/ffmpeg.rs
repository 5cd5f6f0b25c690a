//! # ffmpeg decoding
//!
//! Decodes arbitrary video files by streaming raw `rgb24` frames from an `ffmpeg` subprocess.
//! Stream properties are queried up front with `ffprobe`.
//!
//! The tools are looked up on `PATH` unless `FFMPEG_PATH` / `FFPROBE_PATH` point elsewhere.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::io::{BufReader, Read};
use std::path::Path;
use std::process::{Child, ChildStderr, ChildStdout, Command, Stdio};
use std::thread::{self, JoinHandle};

use image::RgbImage;
use log::{debug, warn};

use crate::error::*;
use crate::video::FrameSource;

// -----------------------------------------------------------------------------------------------
// CONSTANTS
// -----------------------------------------------------------------------------------------------

/// Bytes of ffmpeg's diagnostics kept for error reports.
const STDERR_TAIL: usize = 16 * 1024;

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

/// Properties of the first video stream of a file.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeInfo {
    pub width: u32,
    pub height: u32,
    pub frame_rate: Option<f64>,
    pub codec: String
}

pub struct FfmpegReader {
    child: Child,
    stdout: BufReader<ChildStdout>,
    stderr: Option<JoinHandle<String>>,
    info: ProbeInfo,
    frame_len: usize,
    done: bool
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl FfmpegReader {
    /// Start decoding the given file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let info = probe(path)?;
        debug!("ffprobe: {:?}", info);

        let mut child = Command::new(tool_path("ffmpeg"))
            .args(["-v", "error", "-nostdin", "-i"])
            .arg(path)
            .args(["-map", "0:v:0", "-f", "rawvideo", "-pix_fmt", "rgb24", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::Decoder(format!("failed to start ffmpeg: {}", e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Decoder("ffmpeg stdout was not captured".into()))?;

        // stderr must keep flowing while frames are read, or ffmpeg blocks once the pipe fills
        let stderr = child.stderr.take().map(drain_stderr);

        Ok(Self {
            child,
            stdout: BufReader::new(stdout),
            stderr,
            frame_len: info.width as usize * info.height as usize * 3,
            info,
            done: false
        })
    }

    pub fn info(&self) -> &ProbeInfo {
        &self.info
    }

    /// Wait for ffmpeg to exit, turning a failed exit into an error.
    fn finish(&mut self) -> Result<()> {
        self.done = true;
        let status = self.child.wait()?;
        let stderr = self.stderr
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        if !status.success() {
            return Err(Error::Decoder(format!("ffmpeg exited with {}: {}", status, stderr.trim())));
        }
        if !stderr.trim().is_empty() {
            warn!("ffmpeg: {}", stderr.trim());
        }

        Ok(())
    }
}

impl FrameSource for FfmpegReader {
    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        if self.done {
            return Ok(None);
        }

        let mut buf = vec![0u8; self.frame_len];
        let mut filled = 0;
        while filled < buf.len() {
            match self.stdout.read(&mut buf[filled..])? {
                0 => break,
                n => filled += n
            }
        }

        if filled < buf.len() {
            if filled > 0 {
                warn!("Discarding a partial frame of {} bytes at the end of the stream", filled);
            }
            self.finish()?;
            return Ok(None);
        }

        RgbImage::from_raw(self.info.width, self.info.height, buf)
            .map(Some)
            .ok_or_else(|| Error::Decoder("frame buffer does not match the stream size".into()))
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.info.width, self.info.height)
    }

    fn frame_rate(&self) -> Option<f64> {
        self.info.frame_rate
    }
}

impl Drop for FfmpegReader {
    fn drop(&mut self) {
        if !self.done {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

// -----------------------------------------------------------------------------------------------
// FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Query the first video stream of a file with ffprobe.
pub fn probe(path: &Path) -> Result<ProbeInfo> {
    let output = Command::new(tool_path("ffprobe"))
        .args([
            "-v", "error",
            "-select_streams", "v:0",
            "-show_entries", "stream=width,height,r_frame_rate,codec_name",
            "-print_format", "json"
        ])
        .arg(path)
        .output()
        .map_err(|e| Error::Decoder(format!("failed to run ffprobe: {}", e)))?;

    if !output.status.success() {
        return Err(Error::Decoder(format!(
            "ffprobe failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    parse_probe(&String::from_utf8_lossy(&output.stdout))
}

/// Parse ffprobe's JSON output.
pub fn parse_probe(json: &str) -> Result<ProbeInfo> {
    let json: serde_json::Value = serde_json::from_str(json)?;

    let stream = json["streams"]
        .as_array()
        .and_then(|s| s.first())
        .ok_or_else(|| Error::Decoder("no video stream".into()))?;

    let width = stream["width"].as_u64().unwrap_or(0) as u32;
    let height = stream["height"].as_u64().unwrap_or(0) as u32;
    if width == 0 || height == 0 {
        return Err(Error::Decoder("video stream has no dimensions".into()));
    }

    Ok(ProbeInfo {
        width,
        height,
        frame_rate: stream["r_frame_rate"].as_str().and_then(parse_frame_rate),
        codec: stream["codec_name"].as_str().unwrap_or("").to_string()
    })
}

/// Parse a rate such as `30000/1001` or `25`.
pub fn parse_frame_rate(s: &str) -> Option<f64> {
    let rate = match s.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        },
        None => s.trim().parse().ok()?
    };

    match rate.is_finite() && rate > 0.0 {
        true => Some(rate),
        false => None
    }
}

/// Read a child's stderr to the end on a helper thread, keeping only the last few KiB.
fn drain_stderr(mut stderr: ChildStderr) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut tail: Vec<u8> = Vec::new();
        let mut chunk = [0u8; 4096];

        loop {
            match stderr.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    tail.extend_from_slice(&chunk[..n]);
                    if tail.len() > STDERR_TAIL {
                        let excess = tail.len() - STDERR_TAIL;
                        tail.drain(..excess);
                    }
                },
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(_) => break
            }
        }

        String::from_utf8_lossy(&tail).into_owned()
    })
}

fn tool_path(tool: &str) -> String {
    let var = format!("{}_PATH", tool.to_ascii_uppercase());
    std::env::var(var).unwrap_or_else(|_| tool.to_string())
}
