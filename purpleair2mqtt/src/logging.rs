// Copyright 2025 The purpleair2mqtt Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! `env_logger` setup with an optional log file rolled at startup.

use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use env_logger::{Env, Target, WriteStyle};

use crate::settings::LoggingSettings;

/// Initializes the global logger. `RUST_LOG` takes precedence over the configured level.
pub fn init(settings: &LoggingSettings) -> Result<()> {
    let mut builder =
        env_logger::Builder::from_env(Env::default().default_filter_or(settings.level.as_str()));

    if let Some(path) = &settings.path {
        if settings.rotate {
            rotate(path, settings.max_keep)
                .with_context(|| format!("Failed to rotate log file {}", path.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        builder
            .target(Target::Pipe(Box::new(file)))
            .write_style(WriteStyle::Never);
    }

    builder.try_init().context("Failed to initialize logger")
}

fn numbered(path: &Path, n: usize) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(format!(".{n}"));
    PathBuf::from(name)
}

/// Shifts `path` to `path.1`, `path.1` to `path.2` and so on, dropping anything past `max_keep`.
fn rotate(path: &Path, max_keep: usize) -> io::Result<()> {
    if !path.exists() {
        return Ok(());
    }
    if max_keep == 0 {
        return fs::remove_file(path);
    }

    let oldest = numbered(path, max_keep);
    if oldest.exists() {
        fs::remove_file(&oldest)?;
    }
    for n in (1..max_keep).rev() {
        let from = numbered(path, n);
        if from.exists() {
            fs::rename(&from, numbered(path, n + 1))?;
        }
    }
    fs::rename(path, numbered(path, 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("purpleair2mqtt-{}-{name}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_numbered() {
        assert_eq!(
            numbered(Path::new("/var/log/pa.log"), 3),
            PathBuf::from("/var/log/pa.log.3")
        );
    }

    #[test]
    fn test_rotate_missing_file_is_noop() {
        let dir = scratch_dir("missing");
        rotate(&dir.join("pa.log"), 3).unwrap();
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);
    }

    #[test]
    fn test_rotate_shifts_and_drops_oldest() {
        let dir = scratch_dir("shift");
        let log = dir.join("pa.log");
        fs::write(&log, "current").unwrap();
        fs::write(numbered(&log, 1), "one").unwrap();
        fs::write(numbered(&log, 2), "two").unwrap();

        rotate(&log, 2).unwrap();

        assert!(!log.exists());
        assert_eq!(fs::read_to_string(numbered(&log, 1)).unwrap(), "current");
        assert_eq!(fs::read_to_string(numbered(&log, 2)).unwrap(), "one");
        assert!(!numbered(&log, 3).exists());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_rotate_keep_zero_deletes() {
        let dir = scratch_dir("zero");
        let log = dir.join("pa.log");
        fs::write(&log, "current").unwrap();

        rotate(&log, 0).unwrap();

        assert!(!log.exists());
        assert!(!numbered(&log, 1).exists());
        fs::remove_dir_all(&dir).unwrap();
    }
}
