/*
 *  display/sinks.rs
 *
 *  flipframe - flip-disc frame controller
 *  (c) 2025-26 flipframe contributors
 *
 *  Byte-stream and log frame sinks
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use log::{debug, info};

use super::traits::FrameSink;
use crate::error::TransportError;
use crate::frame::WireFrame;

/// Writes each panel frame to a byte stream and flushes it straight away
pub struct WriterSink<W: Write + Send> {
    name: String,
    writer: W,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(name: impl Into<String>, writer: W) -> Self {
        Self { name: name.into(), writer }
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }
}

impl<W: Write + Send> FrameSink for WriterSink<W> {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&mut self, frame: &WireFrame) -> Result<(), TransportError> {
        self.writer.write_all(frame.as_bytes())?;
        self.writer.flush()?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Open a device node or plain file for frame output
pub fn open_file_sink(path: &Path) -> Result<WriterSink<std::fs::File>, TransportError> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    info!("Frame output to {}", path.display());
    Ok(WriterSink::new(path.display().to_string(), file))
}

/// Logs frames in hex at debug level, nothing reaches a device
#[derive(Debug, Default)]
pub struct LogSink {
    sent: u64,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }
}

impl FrameSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    fn send(&mut self, frame: &WireFrame) -> Result<(), TransportError> {
        self.sent += 1;
        let hex: String = frame.as_bytes().iter().map(|b| format!("{:02x}", b)).collect();
        debug!("panel {}: {}", frame.panel_id(), hex);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::encode;
    use crate::matrix::DisplayMatrix;

    #[test]
    fn test_writer_sink_writes_all_panels_in_order() {
        let frames = encode(&DisplayMatrix::default()).unwrap();
        let mut sink = WriterSink::new("mem", Vec::new());
        for f in &frames {
            sink.send(f).unwrap();
        }

        let bytes = sink.get_ref();
        assert_eq!(bytes.len(), 4 * 32);
        let ids: Vec<u8> = bytes.chunks(32).map(|c| c[2]).collect();
        assert_eq!(ids, vec![1, 2, 4, 8]);
    }

    #[test]
    fn test_file_sink_appends() {
        let dir = std::env::temp_dir().join(format!("flipframe-sink-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("frames.bin");
        let _ = std::fs::remove_file(&path);

        let frames = encode(&DisplayMatrix::default()).unwrap();
        let mut sink = open_file_sink(&path).unwrap();
        sink.send(&frames[0]).unwrap();
        sink.send(&frames[1]).unwrap();
        sink.close().unwrap();
        let mut sink = open_file_sink(&path).unwrap();
        sink.send(&frames[2]).unwrap();

        assert_eq!(std::fs::metadata(&path).unwrap().len(), 3 * 32);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_log_sink_counts() {
        let frames = encode(&DisplayMatrix::default()).unwrap();
        let mut sink = LogSink::new();
        for f in &frames {
            sink.send(f).unwrap();
        }
        assert_eq!(sink.sent(), 4);
    }
}
