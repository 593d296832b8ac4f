//! Progress bars for long-running steps, with a log writer that prints
//! above them instead of tearing the bar.

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::{self, Write};
use std::sync::OnceLock;
use tracing_subscriber::fmt::MakeWriter;

static BARS: OnceLock<MultiProgress> = OnceLock::new();

fn bars() -> &'static MultiProgress {
    BARS.get_or_init(|| {
        let bars = MultiProgress::new();
        bars.set_draw_target(ProgressDrawTarget::stderr_with_hz(10));
        bars
    })
}

/// Add a styled bar of `len` steps labelled with `message`.
pub fn progress_bar(len: u64, message: &str) -> ProgressBar {
    let pb = bars().add(ProgressBar::new(len));
    let style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}",
    )
    .map(|style| style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"))
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb
}

fn emit(line: &str) {
    let _ = bars().println(line.trim_end_matches('\r'));
}

/// `tracing` writer factory routing log lines through the progress display.
#[derive(Default, Clone)]
pub struct LogWriterFactory;

#[derive(Default)]
pub struct LogWriter {
    pending: String,
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.push_str(&String::from_utf8_lossy(buf));
        while let Some(idx) = self.pending.find('\n') {
            emit(&self.pending[..idx]);
            self.pending.drain(..=idx);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.pending.is_empty() {
            emit(&self.pending);
            self.pending.clear();
        }
        Ok(())
    }
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

impl<'a> MakeWriter<'a> for LogWriterFactory {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter::default()
    }
}
