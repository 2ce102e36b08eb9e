//! `!quote [word]`: a random line from the quotes file.

use std::path::Path;

use parrot_core::{Command, Message, ParrotError, Result};
use rand::seq::SliceRandom;

use crate::context::CommandContext;

const BUILTIN_QUOTES: &[&str] = &[
    "Talk is cheap. Show me the code.",
    "It works on my machine.",
    "There are only two hard things: cache invalidation and naming things.",
    "Weeks of coding can save you hours of planning.",
];

/// Phrases loaded once at construction, one per non-empty line.
#[derive(Debug, Clone)]
pub struct PhraseStore {
    lines: Vec<String>,
}

impl PhraseStore {
    pub fn builtin() -> Self {
        Self {
            lines: BUILTIN_QUOTES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ParrotError::Config(format!("quotes file {}: {e}", path.display())))?;
        Self::parse(&content)
            .ok_or_else(|| ParrotError::Config(format!("quotes file {} is empty", path.display())))
    }

    pub fn parse(content: &str) -> Option<Self> {
        let lines: Vec<String> = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(String::from)
            .collect();
        (!lines.is_empty()).then_some(Self { lines })
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// A random line containing `filter` (case-insensitive), if any.
    pub fn pick(&self, filter: &str) -> Option<&str> {
        let filter = filter.to_lowercase();
        let matching: Vec<&String> = self
            .lines
            .iter()
            .filter(|l| l.to_lowercase().contains(&filter))
            .collect();
        matching.choose(&mut rand::thread_rng()).map(|s| s.as_str())
    }
}

pub struct QuoteCommand {
    ctx: CommandContext,
    quotes: PhraseStore,
}

impl QuoteCommand {
    pub fn build(ctx: &CommandContext) -> Result<Box<dyn Command>> {
        let quotes = match &ctx.config.commands.quotes_path {
            Some(path) => PhraseStore::load(Path::new(&*shellexpand::tilde(path)))?,
            None => PhraseStore::builtin(),
        };
        tracing::debug!("loaded {} quotes", quotes.len());
        Ok(Box::new(Self {
            ctx: ctx.clone(),
            quotes,
        }))
    }
}

impl Command for QuoteCommand {
    fn name(&self) -> &str {
        "quote"
    }

    fn triggers(&self) -> &[&'static str] {
        &["!quote"]
    }

    fn invoke(&mut self, _cmd: &str, remainder: &str, msg: &Message) -> Result<bool> {
        if !self.ctx.allowed(msg) {
            return Ok(false);
        }
        let Some(quote) = self.quotes.pick(remainder) else {
            return Ok(false);
        };
        self.ctx.post(&format!("{}: {quote}", msg.nick))?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use parrot_core::ParrotConfig;

    use super::*;
    use crate::context::testing::{NoProbe, fixture, fixture_with};

    #[test]
    fn test_parse_skips_blank_and_comment_lines() {
        let store = PhraseStore::parse("# header\n\nfirst\n  second  \n").unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.pick("SEC"), Some("second"));
        assert_eq!(store.pick("nothing like it"), None);
        assert!(PhraseStore::parse("\n# only comments\n").is_none());
    }

    #[test]
    fn test_missing_file_fails_construction() {
        let mut config = ParrotConfig::default();
        config.commands.quotes_path = Some("/nonexistent/parrot/quotes.txt".into());
        let f = fixture_with(config, std::sync::Arc::new(NoProbe));
        assert!(QuoteCommand::build(&f.ctx).is_err());
    }

    #[test]
    fn test_quote_from_file() {
        let dir = std::env::temp_dir().join("parrot-test-quotes");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("quotes.txt");
        std::fs::write(&path, "only one quote\n").unwrap();

        let mut config = ParrotConfig::default();
        config.commands.quotes_path = Some(path.to_string_lossy().into_owned());
        let f = fixture_with(config, std::sync::Arc::new(NoProbe));
        let mut cmd = QuoteCommand::build(&f.ctx).unwrap();
        assert!(cmd.invoke("!quote", "", &Message::new("anon", "!quote")).unwrap());
        assert_eq!(f.room.posts(), vec!["anon: only one quote"]);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_builtin_quotes() {
        let f = fixture();
        let mut cmd = QuoteCommand::build(&f.ctx).unwrap();
        assert!(cmd.invoke("!quote", "naming", &Message::new("anon", "!quote naming")).unwrap());
        assert!(f.room.posts()[0].contains("naming things"));
    }
}
