use std::sync::Arc;

use chrono::Local;
use regex::Regex;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::launcher::CommandLauncher;
use crate::tail::LineSource;
use crate::types::{LogDestination, LoggingMode, MatchEvent, Pattern};
use crate::utils::{format_date_time, format_rfc1123};

#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pub pattern: Pattern,
    regex: Regex,
}

impl CompiledPattern {
    pub fn compile(pattern: &Pattern) -> Result<Self> {
        let regex = Regex::new(&pattern.regex).map_err(|source| Error::Regex {
            name: pattern.name.clone(),
            source,
        })?;
        Ok(Self {
            pattern: pattern.clone(),
            regex,
        })
    }

    /// Unanchored: true if the regex matches anywhere in `line`.
    pub fn is_match(&self, line: &str) -> bool {
        self.regex.is_match(line)
    }
}

/// Everything a dispatcher needs from the configuration, shared read-only
/// between all of them.
#[derive(Debug, Clone)]
pub struct Rules {
    pub mode: LoggingMode,
    pub destination: LogDestination,
    pub patterns: Vec<CompiledPattern>,
}

impl Rules {
    /// Compiles every pattern up front; the first invalid regex is an error.
    pub fn compile(config: &Config) -> Result<Self> {
        let patterns = config
            .patterns
            .iter()
            .map(CompiledPattern::compile)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            mode: LoggingMode::from_setting(&config.logging),
            destination: LogDestination::from_setting(&config.log_file),
            patterns,
        })
    }

    pub fn format_record(&self, event: &MatchEvent<'_>) -> String {
        let pattern = event.pattern;
        match self.mode {
            LoggingMode::Minimal => format!(
                "{} | {} | {} | {}",
                format_date_time(&event.timestamp),
                event.source,
                pattern.name,
                event.line
            ),
            LoggingMode::Verbose | LoggingMode::None => format!(
                "{} | {} | {} | {} | {} | {} | {}",
                format_rfc1123(&event.timestamp),
                event.source,
                pattern.name,
                pattern.regex,
                pattern.command,
                pattern.alert,
                event.line
            ),
        }
    }
}

/// Evaluates every line of one watched file against all patterns.
pub struct Dispatcher<S> {
    source: S,
    rules: Arc<Rules>,
    launcher: Arc<dyn CommandLauncher>,
}

impl<S: LineSource> Dispatcher<S> {
    pub fn new(source: S, rules: Arc<Rules>, launcher: Arc<dyn CommandLauncher>) -> Self {
        Self {
            source,
            rules,
            launcher,
        }
    }

    /// Runs until the line stream ends. Only a failure to write an audit
    /// record is returned as an error; the caller treats it as fatal.
    pub async fn run(mut self) -> Result<()> {
        info!(file = self.source.name(), "Watching file");

        loop {
            match self.source.next_line().await {
                Ok(Some(line)) => {
                    self.process_line(&line)?;
                }
                Ok(None) => {
                    debug!(file = self.source.name(), "Line stream ended");
                    return Ok(());
                }
                Err(e) => {
                    error!(file = self.source.name(), error = %e, "Stopped watching file");
                    return Ok(());
                }
            }
        }
    }

    /// Returns how many patterns matched `line`.
    pub fn process_line(&self, line: &str) -> Result<usize> {
        if line == "\n" {
            return Ok(0);
        }

        let mut matched = 0;
        for compiled in &self.rules.patterns {
            if !compiled.is_match(line) {
                continue;
            }
            matched += 1;

            let event = MatchEvent {
                timestamp: Local::now(),
                source: self.source.name(),
                pattern: &compiled.pattern,
                line,
            };
            let record = self.rules.format_record(&event);
            self.rules.destination.write(&record)?;

            self.launcher.launch(&compiled.pattern.command);
            self.launcher.launch(&compiled.pattern.alert);
        }
        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::launcher::tests::RecordingLauncher;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::collections::VecDeque;
    use std::io;

    struct ScriptedSource {
        name: String,
        lines: VecDeque<io::Result<String>>,
    }

    impl ScriptedSource {
        fn new(name: &str, lines: &[&str]) -> Self {
            Self {
                name: name.to_string(),
                lines: lines.iter().map(|l| Ok(l.to_string())).collect(),
            }
        }
    }

    #[async_trait]
    impl LineSource for ScriptedSource {
        fn name(&self) -> &str {
            &self.name
        }

        async fn next_line(&mut self) -> io::Result<Option<String>> {
            self.lines.pop_front().transpose()
        }
    }

    fn config(logging: &str, log_file: &str) -> Config {
        Config::new()
            .with_logging(logging)
            .with_log_file(log_file)
            .with_file("/tmp/a.log")
            .with_pattern(Pattern::new("err", "ERROR", "notify", "page"))
    }

    fn event<'a>(pattern: &'a Pattern, line: &'a str) -> MatchEvent<'a> {
        MatchEvent {
            timestamp: Local.with_ymd_and_hms(2024, 5, 6, 12, 30, 45).unwrap(),
            source: "/tmp/a.log",
            pattern,
            line,
        }
    }

    #[test]
    fn verbose_record_layout() {
        let rules = Rules::compile(&config("verbose", "")).unwrap();
        let pattern = Pattern::new("err", "ERROR", "notify", "page");
        let record = rules.format_record(&event(&pattern, "ERROR disk full"));

        let fields: Vec<&str> = record.split(" | ").collect();
        assert_eq!(fields.len(), 7);
        assert!(fields[0].starts_with("Mon, 06 May 2024 12:30:45"));
        assert_eq!(
            &fields[1..],
            &["/tmp/a.log", "err", "ERROR", "notify", "page", "ERROR disk full"]
        );
    }

    #[test]
    fn minimal_record_layout() {
        let rules = Rules::compile(&config("minimal", "")).unwrap();
        let pattern = Pattern::new("err", "ERROR", "notify", "page");
        let record = rules.format_record(&event(&pattern, "ERROR disk full"));
        assert_eq!(
            record,
            "2024-05-06 12:30:45 | /tmp/a.log | err | ERROR disk full"
        );
    }

    #[test]
    fn unknown_and_none_logging_use_verbose_layout() {
        let pattern = Pattern::new("err", "ERROR", "notify", "page");
        for logging in ["", "loud", "none"] {
            let rules = Rules::compile(&config(logging, "")).unwrap();
            let record = rules.format_record(&event(&pattern, "ERROR disk full"));
            assert_eq!(record.split(" | ").count(), 7, "logging = {:?}", logging);
        }
    }

    #[test]
    fn invalid_regex_fails_compilation() {
        let config = Config::new().with_pattern(Pattern::new("bad", "(unclosed", "", ""));
        let err = Rules::compile(&config).unwrap_err();
        assert!(matches!(err, Error::Regex { ref name, .. } if name == "bad"));
    }

    #[test]
    fn match_writes_record_and_launches_both_commands() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("matches.log");
        let rules = Arc::new(Rules::compile(&config("minimal", out.to_str().unwrap())).unwrap());
        let launcher = Arc::new(RecordingLauncher::default());
        let dispatcher = Dispatcher::new(
            ScriptedSource::new("/tmp/a.log", &[]),
            rules,
            launcher.clone(),
        );

        assert_eq!(dispatcher.process_line("boot ok").unwrap(), 0);
        assert_eq!(dispatcher.process_line("x ERROR disk full").unwrap(), 1);

        assert_eq!(launcher.commands(), vec!["notify", "page"]);
        let contents = std::fs::read_to_string(&out).unwrap();
        assert_eq!(contents.lines().count(), 1);
        assert!(contents.ends_with(" | /tmp/a.log | err | x ERROR disk full\n"));
    }

    #[test]
    fn every_matching_pattern_fires_in_order() {
        let config = config("verbose", "")
            .with_pattern(Pattern::new("disk", "disk", "cleanup", "mail"))
            .with_pattern(Pattern::new("net", "network", "ping", "sms"));
        let launcher = Arc::new(RecordingLauncher::default());
        let dispatcher = Dispatcher::new(
            ScriptedSource::new("/tmp/a.log", &[]),
            Arc::new(Rules::compile(&config).unwrap()),
            launcher.clone(),
        );

        assert_eq!(dispatcher.process_line("ERROR disk full").unwrap(), 2);
        assert_eq!(launcher.commands(), vec!["notify", "page", "cleanup", "mail"]);
    }

    #[test]
    fn empty_commands_are_still_launched() {
        let config = Config::new().with_pattern(Pattern::new("any", "x", "", ""));
        let launcher = Arc::new(RecordingLauncher::default());
        let dispatcher = Dispatcher::new(
            ScriptedSource::new("f", &[]),
            Arc::new(Rules::compile(&config).unwrap()),
            launcher.clone(),
        );

        dispatcher.process_line("x").unwrap();
        assert_eq!(launcher.commands(), vec!["", ""]);
    }

    #[test]
    fn lone_newline_is_skipped() {
        let config = Config::new().with_pattern(Pattern::new("all", "", "run", "alert"));
        let launcher = Arc::new(RecordingLauncher::default());
        let dispatcher = Dispatcher::new(
            ScriptedSource::new("f", &[]),
            Arc::new(Rules::compile(&config).unwrap()),
            launcher.clone(),
        );

        assert_eq!(dispatcher.process_line("\n").unwrap(), 0);
        assert!(launcher.commands().is_empty());

        // Empty and whitespace-only lines are still evaluated.
        assert_eq!(dispatcher.process_line("").unwrap(), 1);
        assert_eq!(dispatcher.process_line("   ").unwrap(), 1);
    }

    #[test]
    fn sink_failure_is_returned() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("missing-dir").join("out.log");
        let dispatcher = Dispatcher::new(
            ScriptedSource::new("/tmp/a.log", &[]),
            Arc::new(Rules::compile(&config("verbose", out.to_str().unwrap())).unwrap()),
            Arc::new(RecordingLauncher::default()),
        );

        let err = dispatcher.process_line("ERROR").unwrap_err();
        assert!(matches!(err, Error::Sink { .. }));
    }

    #[tokio::test]
    async fn run_processes_lines_in_order_until_stream_ends() {
        let launcher = Arc::new(RecordingLauncher::default());
        let config = Config::new()
            .with_pattern(Pattern::new("a", "alpha", "a-cmd", "a-alert"))
            .with_pattern(Pattern::new("b", "beta", "b-cmd", "b-alert"));
        let dispatcher = Dispatcher::new(
            ScriptedSource::new("f", &["beta", "nothing", "alpha beta"]),
            Arc::new(Rules::compile(&config).unwrap()),
            launcher.clone(),
        );

        dispatcher.run().await.unwrap();
        assert_eq!(
            launcher.commands(),
            vec!["b-cmd", "b-alert", "a-cmd", "a-alert", "b-cmd", "b-alert"]
        );
    }

    #[tokio::test]
    async fn run_stops_quietly_on_read_error() {
        let mut source = ScriptedSource::new("f", &[]);
        source
            .lines
            .push_back(Err(io::Error::new(io::ErrorKind::Other, "gone")));
        let dispatcher = Dispatcher::new(
            source,
            Arc::new(Rules::compile(&Config::new()).unwrap()),
            Arc::new(RecordingLauncher::default()),
        );
        assert!(dispatcher.run().await.is_ok());
    }
}
