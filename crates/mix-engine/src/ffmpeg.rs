//! ffmpeg/ffprobe implementation of [`AudioEngine`].

use std::ffi::OsString;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

use automix_common::config::EngineConfig;
use automix_common::error::{AutomixError, AutomixResult};

use crate::engine::{AudioEngine, ProgressCallback, RenderJob, RenderProgress};

/// Lines of ffmpeg stderr kept in a render failure message.
const STDERR_TAIL_LINES: usize = 20;

/// Seconds without encoder advancement before a stall warning.
const STALL_WARNING_SECS: u64 = 10;

const STALL_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Audio engine backed by the ffmpeg and ffprobe command-line tools.
#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    audio_bitrate_kbps: u32,
}

impl FfmpegEngine {
    pub fn new(
        ffmpeg: impl Into<PathBuf>,
        ffprobe: impl Into<PathBuf>,
        audio_bitrate_kbps: u32,
    ) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
            audio_bitrate_kbps,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            config.ffmpeg_path.clone(),
            config.resolved_ffprobe_path(),
            config.audio_bitrate_kbps,
        )
    }

    pub fn ffmpeg_path(&self) -> &Path {
        &self.ffmpeg
    }

    pub fn ffprobe_path(&self) -> &Path {
        &self.ffprobe
    }

    /// ffprobe arguments printing only the container duration.
    fn probe_args(path: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ]
        .iter()
        .map(OsString::from)
        .collect();
        args.push(path.as_os_str().to_os_string());
        args
    }

    /// ffmpeg arguments for a render job.
    fn render_args(&self, job: &RenderJob) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-hide_banner", "-nostdin", "-y"]
            .iter()
            .map(OsString::from)
            .collect();

        for input in &job.inputs {
            args.push("-i".into());
            args.push(input.as_os_str().to_os_string());
        }

        args.push("-filter_complex".into());
        args.push(job.filter_graph.clone().into());
        args.push("-map".into());
        args.push(format!("[{}]", job.output_label).into());
        args.push("-c:a".into());
        args.push("libmp3lame".into());
        args.push("-b:a".into());
        args.push(format!("{}k", self.audio_bitrate_kbps.max(32)).into());
        args.push("-f".into());
        args.push("mp3".into());
        args.push("-progress".into());
        args.push("pipe:1".into());
        args.push("-nostats".into());
        args.push(job.output_path.as_os_str().to_os_string());
        args
    }
}

impl AudioEngine for FfmpegEngine {
    fn probe_duration(&self, path: &Path) -> AutomixResult<Option<f64>> {
        let output = Command::new(&self.ffprobe)
            .args(Self::probe_args(path))
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                AutomixError::Other(anyhow::anyhow!(
                    "Failed to start {}: {e}",
                    self.ffprobe.display()
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AutomixError::Other(anyhow::anyhow!(
                "ffprobe failed (status {}): {}",
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let duration = parse_probe_output(&stdout);
        tracing::debug!(path = %path.display(), ?duration, "ffprobe finished");
        Ok(duration)
    }

    fn render(&self, job: &RenderJob, progress: Option<ProgressCallback>) -> AutomixResult<()> {
        let args = self.render_args(job);
        tracing::debug!(args = ?args, "Running ffmpeg");

        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let start = Instant::now();
        let mut child = cmd
            .spawn()
            .map_err(|e| AutomixError::render(format!("Failed to start ffmpeg: {e}")))?;

        tracing::info!(
            pid = child.id(),
            inputs = job.inputs.len(),
            expected_duration_secs = job.expected_duration_secs,
            "ffmpeg process started"
        );

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AutomixError::render("Failed to capture ffmpeg stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| AutomixError::render("Failed to capture ffmpeg stderr"))?;

        // Drain stderr concurrently so ffmpeg never blocks on a full pipe.
        let stderr_task = std::thread::spawn(move || -> String {
            let mut reader = BufReader::new(stderr);
            let mut output = String::new();
            match reader.read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        // Progress is parsed off-thread; the stall check runs on a timer.
        let (progress_tx, progress_rx) = mpsc::channel::<ProgressState>();
        let stdout_task = std::thread::spawn(move || {
            read_progress(BufReader::new(stdout), |state| {
                progress_tx.send(state.clone()).is_ok()
            });
        });

        let mut stall = StallTracker::new(Instant::now());
        loop {
            match progress_rx.recv_timeout(STALL_POLL_INTERVAL) {
                Ok(latest) => {
                    stall.observe(latest.out_time_secs, Instant::now());
                    if let Some(cb) = &progress {
                        cb(progress_report(
                            &latest,
                            job.expected_duration_secs,
                            start.elapsed().as_secs_f64(),
                        ));
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            if let Some(stalled) = stall.check(Instant::now()) {
                tracing::warn!(
                    out_time_secs = stall.last_out_time_secs(),
                    stalled_secs = stalled.as_secs_f64(),
                    elapsed_secs = start.elapsed().as_secs_f64(),
                    "No ffmpeg progress advancement for {STALL_WARNING_SECS}s"
                );
            }
        }

        if stdout_task.join().is_err() {
            tracing::warn!("ffmpeg progress reader panicked");
        }

        let status = child
            .wait()
            .map_err(|e| AutomixError::render(format!("Failed to wait on ffmpeg: {e}")))?;

        let stderr_output = stderr_task
            .join()
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

        if !status.success() {
            return Err(AutomixError::render(format!(
                "ffmpeg failed (status {}): {}",
                status,
                stderr_tail(&stderr_output, STDERR_TAIL_LINES)
            )));
        }

        tracing::info!(
            elapsed_secs = start.elapsed().as_secs_f64(),
            "ffmpeg render finished"
        );
        Ok(())
    }

    fn is_available(&self) -> bool {
        binary_runs(&self.ffmpeg) && binary_runs(&self.ffprobe)
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

/// Extract the duration from `ffprobe -show_entries format=duration` output.
///
/// Returns `None` when the value is absent (`N/A`, empty) or not a
/// usable number of seconds.
pub fn parse_probe_output(stdout: &str) -> Option<f64> {
    let value = stdout.lines().map(str::trim).find(|l| !l.is_empty())?;
    let value = value.strip_prefix("duration=").unwrap_or(value);
    let secs = value.parse::<f64>().ok()?;
    (secs.is_finite() && secs >= 0.0).then_some(secs)
}

/// Check whether a binary can be executed at all.
fn binary_runs(binary: &Path) -> bool {
    Command::new(binary)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Last `max_lines` non-empty lines of engine output.
fn stderr_tail(output: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = output
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.trim().is_empty())
        .collect();
    let skip = lines.len().saturating_sub(max_lines);
    lines[skip..].join("\n")
}

/// Parse `-progress` key/value lines from `reader` until EOF.
///
/// `on_report` runs once per `progress=` line and may return `false` to stop
/// reporting. Lines are decoded lossily, and whatever is left after a read
/// error or a stop is drained so the writer never blocks on a full pipe.
fn read_progress<R: BufRead>(
    mut reader: R,
    mut on_report: impl FnMut(&ProgressState) -> bool,
) {
    let mut buf = Vec::new();
    let mut latest = ProgressState::default();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => return,
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(error = %err, "Failed reading ffmpeg progress");
                break;
            }
        }

        let line = String::from_utf8_lossy(&buf);
        let Some((key, value)) = line.trim().split_once('=') else {
            continue;
        };
        latest.update(key, value);
        if key == "progress" && !on_report(&latest) {
            break;
        }
    }

    if let Err(err) = std::io::copy(&mut reader, &mut std::io::sink()) {
        tracing::debug!(error = %err, "Failed draining ffmpeg stdout");
    }
}

/// Tracks when the encoder position last moved forward.
#[derive(Debug)]
struct StallTracker {
    last_out_time_secs: f64,
    last_advance: Instant,
    warned_at: Option<Instant>,
}

impl StallTracker {
    fn new(now: Instant) -> Self {
        Self {
            last_out_time_secs: 0.0,
            last_advance: now,
            warned_at: None,
        }
    }

    fn observe(&mut self, out_time_secs: f64, now: Instant) {
        if out_time_secs > self.last_out_time_secs + 0.001 {
            self.last_out_time_secs = out_time_secs;
            self.last_advance = now;
            self.warned_at = None;
        }
    }

    /// How long the encoder has been stuck, at most once per warning period.
    fn check(&mut self, now: Instant) -> Option<Duration> {
        let period = Duration::from_secs(STALL_WARNING_SECS);
        let since = self.warned_at.unwrap_or(self.last_advance);
        if now.saturating_duration_since(since) < period {
            return None;
        }
        self.warned_at = Some(now);
        Some(now.saturating_duration_since(self.last_advance))
    }

    fn last_out_time_secs(&self) -> f64 {
        self.last_out_time_secs
    }
}

#[derive(Debug, Clone, Default)]
struct ProgressState {
    out_time_secs: f64,
    complete: bool,
}

impl ProgressState {
    fn update(&mut self, key: &str, value: &str) {
        match key {
            // ffmpeg reports microseconds under both names.
            "out_time_ms" | "out_time_us" => {
                if let Ok(us) = value.parse::<f64>() {
                    self.out_time_secs = us / 1_000_000.0;
                }
            }
            "progress" => {
                self.complete = value == "end";
            }
            _ => {}
        }
    }
}

fn progress_report(
    state: &ProgressState,
    expected_duration_secs: f64,
    elapsed_secs: f64,
) -> RenderProgress {
    let progress = if expected_duration_secs <= 0.0 {
        0.0
    } else {
        (state.out_time_secs / expected_duration_secs).clamp(0.0, 1.0)
    };

    let eta_secs = if progress > 0.0 {
        (elapsed_secs / progress) - elapsed_secs
    } else {
        0.0
    }
    .max(0.0);

    RenderProgress {
        progress: if state.complete { 1.0 } else { progress },
        out_time_secs: state.out_time_secs,
        eta_secs: if state.complete { 0.0 } else { eta_secs },
        complete: state.complete,
    }
}
