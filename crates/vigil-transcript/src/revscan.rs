//! Lazy reverse line iteration.
//!
//! Reads a file in chunks from the end, yielding complete lines newest
//! first. Memory stays bounded by the chunk size plus the longest line,
//! which matters on multi-hundred-megabyte transcripts where only the last
//! few records are interesting. Finite; not restartable mid-scan.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

const CHUNK: usize = 8 * 1024;

pub struct RevLines {
    file: File,
    /// File offset of the first byte not yet pulled into `buf`.
    pos: u64,
    /// Unemitted tail bytes, in file order.
    buf: Vec<u8>,
    done: bool,
}

impl RevLines {
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(Self {
            file,
            pos: len,
            buf: Vec::new(),
            done: false,
        })
    }

    fn fill(&mut self) -> bool {
        if self.pos == 0 {
            return false;
        }
        let n = CHUNK.min(self.pos as usize);
        self.pos -= n as u64;
        if self.file.seek(SeekFrom::Start(self.pos)).is_err() {
            self.done = true;
            return false;
        }
        let mut chunk = vec![0u8; n];
        if self.file.read_exact(&mut chunk).is_err() {
            self.done = true;
            return false;
        }
        chunk.append(&mut self.buf);
        self.buf = chunk;
        true
    }
}

impl Iterator for RevLines {
    type Item = String;

    /// Next line from the end. Blank lines are skipped; a read failure
    /// ends the iteration early (soft).
    fn next(&mut self) -> Option<String> {
        loop {
            if self.done {
                return None;
            }
            if let Some(i) = self.buf.iter().rposition(|&b| b == b'\n') {
                let line_bytes = self.buf.split_off(i + 1);
                self.buf.pop(); // the newline itself
                let line = String::from_utf8_lossy(&line_bytes).trim().to_string();
                if line.is_empty() {
                    continue;
                }
                return Some(line);
            }
            if !self.fill() {
                // Head of the file: whatever is left is the first line.
                self.done = true;
                let line = String::from_utf8_lossy(&self.buf).trim().to_string();
                self.buf.clear();
                if line.is_empty() {
                    return None;
                }
                return Some(line);
            }
        }
    }
}
