use crate::handle::{Handle, HandleOption};
use crate::heartbeat::{EntityType, HeartBeat};
use crate::iterext::IterExt;
use std::fs;
use std::io::{self, Read};
use std::path::Path;

/// Files larger than this (in bytes) don't get a line count.
pub const MAX_FILE_SIZE_SUPPORTED: u64 = 2_097_152;

const CHUNK_SIZE: usize = 32 * 1024;

pub fn with_detection<'a>() -> HandleOption<'a> {
    Box::new(|mut next: Handle<'a>| -> Handle<'a> {
        Box::new(move |hh: Vec<HeartBeat>| {
            let hh: Vec<HeartBeat> = hh
                .into_iter()
                .edit(|h| {
                    if h.entity_type != EntityType::File {
                        return;
                    }

                    if let Some(lines) = detect_lines(Path::new(&h.entity)) {
                        h.lines = Some(lines);
                    }
                })
                .collect();

            next(hh)
        })
    })
}

fn detect_lines(path: &Path) -> Option<i32> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) => {
            tracing::error!("failed to retrieve file stats of file {:?}: {}", path, e);
            return None;
        }
    };

    if metadata.len() > MAX_FILE_SIZE_SUPPORTED {
        tracing::debug!(
            "file {:?} exceeds max file size of {} bytes. Lines won't be counted",
            path,
            MAX_FILE_SIZE_SUPPORTED
        );
        return None;
    }

    match count_line_numbers(path) {
        Ok(lines) => i32::try_from(lines).ok(),
        Err(e) => {
            tracing::error!(
                "failed to detect the total number of lines in file {:?}: {}",
                path,
                e
            );
            None
        }
    }
}

/// Number of `\n` bytes in the file.
pub fn count_line_numbers(path: &Path) -> io::Result<usize> {
    let mut file = fs::File::open(path)?;
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut count = 0;

    loop {
        let n = match file.read(&mut buf) {
            Ok(0) => return Ok(count),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };

        count += buf[..n].iter().filter(|&&b| b == b'\n').count();
    }
}
