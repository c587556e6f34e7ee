//! Command sequences fed to the engine one pull at a time.

use serde::{Deserialize, Serialize};

use crate::config::DriverConfig;

/// Which fixed command sequence a netlist needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    Default,
    /// The netlist has a `.noise` directive; the spectrum plot must be
    /// selected before writing.
    Noise,
}

impl AnalysisMode {
    /// Detect the mode from netlist text.
    pub fn detect(netlist: &str) -> Self {
        let has_noise = netlist.lines().any(|line| {
            line.trim_start()
                .get(..6)
                .is_some_and(|head| head.eq_ignore_ascii_case(".noise"))
        });
        if has_noise {
            AnalysisMode::Noise
        } else {
            AnalysisMode::Default
        }
    }
}

/// Ordered commands for one run. Element 0 is always the idle command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSequence {
    mode: AnalysisMode,
    commands: Vec<String>,
}

impl CommandSequence {
    pub fn new(mode: AnalysisMode, config: &DriverConfig) -> Self {
        let mut commands = vec![
            config.idle_command.clone(),
            format!("source {}", config.netlist_path),
            "destroy all".to_string(),
            "run".to_string(),
        ];
        if mode == AnalysisMode::Noise {
            commands.push("setplot noise1".to_string());
        }
        commands.push(format!("write {}", config.output_path));

        Self { mode, commands }
    }

    /// Sequence for `netlist`.
    pub fn for_netlist(netlist: &str, config: &DriverConfig) -> Self {
        Self::new(AnalysisMode::detect(netlist), config)
    }

    pub fn mode(&self) -> AnalysisMode {
        self.mode
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Cursor over the active sequence.
///
/// The cursor is 0 exactly when no command is pending dispatch.
#[derive(Debug)]
pub struct CommandFeed {
    sequence: CommandSequence,
    idle: String,
    cursor: usize,
}

impl CommandFeed {
    pub fn new(config: &DriverConfig) -> Self {
        Self {
            sequence: CommandSequence::new(AnalysisMode::Default, config),
            idle: config.idle_command.clone(),
            cursor: 0,
        }
    }

    /// Return the current command and advance.
    ///
    /// Once the sequence is exhausted the cursor wraps to 0 and this call
    /// returns the idle command.
    pub fn next(&mut self) -> String {
        match self.sequence.commands.get(self.cursor) {
            Some(command) => {
                self.cursor += 1;
                command.clone()
            }
            None => {
                self.cursor = 0;
                self.idle.clone()
            }
        }
    }

    pub fn is_idle(&self) -> bool {
        self.cursor == 0
    }

    pub fn sequence(&self) -> &CommandSequence {
        &self.sequence
    }

    /// Replace the active sequence. Refused while a sequence is mid-dispatch.
    pub fn install(&mut self, sequence: CommandSequence) -> bool {
        if !self.is_idle() {
            log::warn!("refusing to switch command sequence at cursor {}", self.cursor);
            return false;
        }
        self.sequence = sequence;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_noise() {
        assert_eq!(AnalysisMode::detect("* rc\n.tran 1u 1m\n.end"), AnalysisMode::Default);
        assert_eq!(
            AnalysisMode::detect("* amp\n.NOISE v(2) vin dec 2 1 10Meg\n"),
            AnalysisMode::Noise
        );
        assert_eq!(
            AnalysisMode::detect("* amp\n   .noise v(2) vin dec 2 1 10Meg\n"),
            AnalysisMode::Noise
        );
        assert_eq!(
            AnalysisMode::detect("* mentions .noise mid-line only\n"),
            AnalysisMode::Default
        );
    }

    #[test]
    fn test_sequences() {
        let config = DriverConfig::default();
        let default = CommandSequence::new(AnalysisMode::Default, &config);
        assert_eq!(
            default.commands(),
            &[" ", "source /test.cir", "destroy all", "run", "write out.raw"]
        );

        let noise = CommandSequence::new(AnalysisMode::Noise, &config);
        assert_eq!(
            noise.commands(),
            &[" ", "source /test.cir", "destroy all", "run", "setplot noise1", "write out.raw"]
        );
    }

    #[test]
    fn test_feed_wraps_once_per_pass() {
        let config = DriverConfig::default();
        let mut feed = CommandFeed::new(&config);
        assert!(feed.is_idle());

        let mut pulled = Vec::new();
        for _ in 0..5 {
            pulled.push(feed.next());
            assert!(!feed.is_idle());
        }
        assert_eq!(pulled.last().map(String::as_str), Some("write out.raw"));

        assert_eq!(feed.next(), " ");
        assert!(feed.is_idle());

        // Next pass starts over.
        assert_eq!(feed.next(), " ");
        assert_eq!(feed.next(), "source /test.cir");
    }

    #[test]
    fn test_install_refused_mid_sequence() {
        let config = DriverConfig::default();
        let mut feed = CommandFeed::new(&config);
        let noise = CommandSequence::new(AnalysisMode::Noise, &config);

        feed.next();
        assert!(!feed.install(noise.clone()));
        assert_eq!(feed.sequence().mode(), AnalysisMode::Default);

        while !feed.is_idle() {
            feed.next();
        }
        assert!(feed.install(noise));
        assert_eq!(feed.sequence().mode(), AnalysisMode::Noise);
    }
}
