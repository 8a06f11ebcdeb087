use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::PathBuf;

use regex::Regex;

use super::{InputError, Submission};

/// sshd-style auth log lines this tailer understands, e.g.
/// `Jan  1 12:00:00 host sshd[1234]: Failed password for admin from 45.33.22.11 port 2201`
const LINE_PATTERN: &str =
    r"(Failed|Accepted) (?:password|publickey|keyboard-interactive) for (?:invalid user )?(\S+) from (\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})";

/// Tail an auth log file and parse login attempts into submissions
pub struct AuthLogTailer {
    file_path: PathBuf,
    reader: Option<BufReader<File>>,
    line_pattern: Regex,
}

impl AuthLogTailer {
    pub fn new(file_path: PathBuf) -> Result<Self, InputError> {
        Ok(AuthLogTailer {
            file_path,
            reader: None,
            line_pattern: Regex::new(LINE_PATTERN)?,
        })
    }

    /// Open the file and seek to its end to start tailing
    pub fn initialize(&mut self) -> Result<(), InputError> {
        let file = File::open(&self.file_path)?;
        let mut reader = BufReader::new(file);
        reader.seek(SeekFrom::End(0))?;
        self.reader = Some(reader);
        Ok(())
    }

    /// Read any newly appended lines and parse them into submissions.
    /// Lines that do not look like login attempts are skipped.
    pub fn read_submissions(&mut self) -> Result<Vec<Submission>, InputError> {
        if self.reader.is_none() {
            self.initialize()?;
        }
        // Initialize above guarantees the reader is present.
        let reader = match self.reader.as_mut() {
            Some(reader) => reader,
            None => return Ok(Vec::new()),
        };

        let mut submissions = Vec::new();
        loop {
            let mut line = String::new();
            let bytes_read = reader.read_line(&mut line)?;
            if bytes_read == 0 {
                break; // EOF
            }
            if let Some(submission) = parse_line(&self.line_pattern, &line) {
                submissions.push(submission);
            }
        }
        Ok(submissions)
    }

    /// Check if the file still exists and is readable
    pub fn is_valid(&self) -> bool {
        self.file_path.exists()
    }
}

fn parse_line(pattern: &Regex, line: &str) -> Option<Submission> {
    let captures = pattern.captures(line)?;
    let status = match &captures[1] {
        "Accepted" => "success",
        _ => "failed",
    };
    Some(Submission {
        username: captures[2].to_string(),
        ip: captures[3].to_string(),
        status: status.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn pattern() -> Regex {
        Regex::new(LINE_PATTERN).unwrap()
    }

    #[test]
    fn test_parse_failed_line() {
        let line =
            "Jan  1 12:00:00 host sshd[1234]: Failed password for admin from 45.33.22.11 port 2201 ssh2";
        let submission = parse_line(&pattern(), line).unwrap();
        assert_eq!(submission.username, "admin");
        assert_eq!(submission.ip, "45.33.22.11");
        assert_eq!(submission.status, "failed");
    }

    #[test]
    fn test_parse_accepted_line() {
        let line = "Jan  1 12:00:05 host sshd[1234]: Accepted password for alice from 10.0.0.5 port 2202 ssh2";
        let submission = parse_line(&pattern(), line).unwrap();
        assert_eq!(submission.username, "alice");
        assert_eq!(submission.ip, "10.0.0.5");
        assert_eq!(submission.status, "success");
    }

    #[test]
    fn test_parse_invalid_user_line() {
        let line =
            "Jan  1 12:00:00 host sshd[99]: Failed password for invalid user oracle from 1.2.3.4 port 40022 ssh2";
        let submission = parse_line(&pattern(), line).unwrap();
        assert_eq!(submission.username, "oracle");
        assert_eq!(submission.status, "failed");
    }

    #[test]
    fn test_unrelated_lines_skipped() {
        assert!(parse_line(&pattern(), "Jan  1 12:00:00 host CRON[7]: session opened").is_none());
        assert!(parse_line(&pattern(), "").is_none());
    }

    #[test]
    fn test_tailer_picks_up_appended_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.log");
        std::fs::write(&path, "old line before tailing\n").unwrap();

        let mut tailer = AuthLogTailer::new(path.clone()).unwrap();
        tailer.initialize().unwrap();
        assert!(tailer.read_submissions().unwrap().is_empty());

        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(
            file,
            "Jan  1 12:00:00 host sshd[1]: Failed password for root from 5.6.7.8 port 22 ssh2"
        )
        .unwrap();
        writeln!(file, "noise line").unwrap();

        let submissions = tailer.read_submissions().unwrap();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].username, "root");
        assert_eq!(submissions[0].ip, "5.6.7.8");
    }
}
