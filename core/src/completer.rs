//! Named completion sources for argument values.

use std::fs;
use std::path::PathBuf;

use tracing::debug;

/// Produces completion candidates for a partially typed value.
///
/// Implemented for any `Fn(&str) -> Vec<String>`.
pub trait Completer: Send + Sync {
    /// Returns candidates starting with `prefix`.
    fn complete(&self, prefix: &str) -> Vec<String>;
}

impl<F> Completer for F
where
    F: Fn(&str) -> Vec<String> + Send + Sync,
{
    fn complete(&self, prefix: &str) -> Vec<String> {
        self(prefix)
    }
}

/// Lists directory entries relative to the typed prefix.
///
/// The prefix is split at its last `/`; entries of that directory (or the
/// working directory) whose names start with the remainder are returned with
/// the directory part kept, and directories gain a trailing `/`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilesCompleter;

impl Completer for FilesCompleter {
    fn complete(&self, prefix: &str) -> Vec<String> {
        let (dir, stem) = match prefix.rfind('/') {
            Some(idx) => prefix.split_at(idx + 1),
            None => ("", prefix),
        };
        let read_from = if dir.is_empty() { "." } else { dir };

        let entries = match fs::read_dir(read_from) {
            Ok(entries) => entries,
            Err(err) => {
                debug!(dir = read_from, error = %err, "Files completer cannot read directory");
                return Vec::new();
            }
        };

        let mut out = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with(stem) {
                continue;
            }
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            let suffix = if is_dir { "/" } else { "" };
            out.push(format!("{dir}{name}{suffix}"));
        }
        out
    }
}

/// Host names read from a hosts-format file.
#[derive(Debug, Clone)]
pub struct HostsCompleter {
    path: PathBuf,
}

impl HostsCompleter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for HostsCompleter {
    fn default() -> Self {
        Self::new("/etc/hosts")
    }
}

impl Completer for HostsCompleter {
    fn complete(&self, prefix: &str) -> Vec<String> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(err) => {
                debug!(path = %self.path.display(), error = %err, "Hosts completer cannot read file");
                return Vec::new();
            }
        };

        data.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with(';'))
            .flat_map(|line| line.split_whitespace().skip(1))
            .filter(|host| host.starts_with(prefix))
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs::File;
    use std::io::Write;

    #[test]
    fn test_files_completer_lists_matching_entries() {
        let temp = tempfile::tempdir().unwrap();
        File::create(temp.path().join("alpha.txt")).unwrap();
        File::create(temp.path().join("beta.txt")).unwrap();
        fs::create_dir(temp.path().join("assets")).unwrap();

        let base = format!("{}/", temp.path().display());
        let mut got = FilesCompleter.complete(&format!("{base}a"));
        got.sort();

        assert_eq!(got, vec![format!("{base}alpha.txt"), format!("{base}assets/")]);
    }

    #[test]
    fn test_files_completer_missing_dir_is_empty() {
        assert!(FilesCompleter.complete("/definitely/not/here/x").is_empty());
    }

    #[test]
    fn test_hosts_completer_skips_comments() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# local hosts").unwrap();
        writeln!(file, "127.0.0.1\tlocalhost loopback").unwrap();
        writeln!(file, "; legacy comment").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "10.0.0.5  build-server").unwrap();

        let hosts = HostsCompleter::new(file.path());
        assert_eq!(hosts.complete(""), vec!["localhost", "loopback", "build-server"]);
        assert_eq!(hosts.complete("lo"), vec!["localhost", "loopback"]);
    }

    #[test]
    fn test_closure_is_a_completer() {
        let colors = |prefix: &str| {
            ["red", "green", "grey"]
                .iter()
                .filter(|c| c.starts_with(prefix))
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
        };
        assert_eq!(colors.complete("gr"), vec!["green", "grey"]);
    }
}
