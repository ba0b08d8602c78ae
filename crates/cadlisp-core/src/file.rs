use std::cell::RefCell;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::error::LispError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    Read,
    Write,
    Append,
}

impl FileMode {
    /// Parse the AutoLISP mode letter: "r", "w" or "a".
    pub fn parse(mode: &str) -> Option<FileMode> {
        match mode.to_ascii_lowercase().as_str() {
            "r" => Some(FileMode::Read),
            "w" => Some(FileMode::Write),
            "a" => Some(FileMode::Append),
            _ => None,
        }
    }
}

#[derive(Debug)]
enum Handle {
    Reader(BufReader<File>),
    Writer(BufWriter<File>),
}

/// An open file handle value, closed explicitly with `close`.
#[derive(Debug)]
pub struct LispFile {
    path: PathBuf,
    mode: FileMode,
    handle: RefCell<Option<Handle>>,
}

impl LispFile {
    pub fn open(path: impl AsRef<Path>, mode: FileMode) -> Result<LispFile, LispError> {
        let path = path.as_ref().to_path_buf();
        let handle = match mode {
            FileMode::Read => Handle::Reader(BufReader::new(
                File::open(&path).map_err(LispError::io)?,
            )),
            FileMode::Write => Handle::Writer(BufWriter::new(
                File::create(&path).map_err(LispError::io)?,
            )),
            FileMode::Append => Handle::Writer(BufWriter::new(
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)
                    .map_err(LispError::io)?,
            )),
        };
        Ok(LispFile {
            path,
            mode,
            handle: RefCell::new(Some(handle)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> FileMode {
        self.mode
    }

    pub fn is_open(&self) -> bool {
        self.handle.borrow().is_some()
    }

    pub fn close(&self) -> Result<(), LispError> {
        if let Some(Handle::Writer(mut w)) = self.handle.borrow_mut().take() {
            w.flush().map_err(LispError::io)?;
        }
        Ok(())
    }

    /// Next line without its terminator, or `None` at end of file.
    pub fn read_line(&self) -> Result<Option<String>, LispError> {
        let mut handle = self.handle.borrow_mut();
        let reader = match handle.as_mut() {
            Some(Handle::Reader(r)) => r,
            _ => return Err(self.not_readable()),
        };
        let mut line = String::new();
        let n = reader.read_line(&mut line).map_err(LispError::io)?;
        if n == 0 {
            return Ok(None);
        }
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(Some(line))
    }

    pub fn read_char(&self) -> Result<Option<char>, LispError> {
        let mut handle = self.handle.borrow_mut();
        let reader = match handle.as_mut() {
            Some(Handle::Reader(r)) => r,
            _ => return Err(self.not_readable()),
        };
        let mut buf = [0u8; 4];
        for len in 1..=4 {
            if reader
                .read(&mut buf[len - 1..len])
                .map_err(LispError::io)?
                == 0
            {
                return Ok(None);
            }
            if let Ok(s) = std::str::from_utf8(&buf[..len]) {
                return Ok(s.chars().next());
            }
        }
        Err(LispError::Io(format!(
            "invalid UTF-8 in {}",
            self.path.display()
        )))
    }

    pub fn write_str(&self, text: &str) -> Result<(), LispError> {
        let mut handle = self.handle.borrow_mut();
        match handle.as_mut() {
            Some(Handle::Writer(w)) => w.write_all(text.as_bytes()).map_err(LispError::io),
            _ => Err(LispError::Io(format!(
                "{} is not open for writing",
                self.path.display()
            ))),
        }
    }

    fn not_readable(&self) -> LispError {
        LispError::Io(format!("{} is not open for reading", self.path.display()))
    }
}
