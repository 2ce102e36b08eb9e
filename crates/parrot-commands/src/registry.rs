//! Command registry: builds a room's commands and fixes their order.

use std::time::Duration;

use parrot_core::config::FeatureConfig;
use parrot_core::guard::isolate;
use parrot_core::{Command, Result};
use parrot_scheduler::PulseGate;

use crate::context::CommandContext;

/// Feature group a command belongs to; some can be switched off wholesale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Core,
    Discovery,
    /// Canned text; off with `features.phrases = false`.
    Phrase,
    /// Commands that upload files; on with `features.uploads = true`.
    Uploads,
}

impl Category {
    pub fn enabled(self, features: &FeatureConfig) -> bool {
        match self {
            Category::Phrase => features.phrases,
            Category::Uploads => features.uploads,
            Category::Core | Category::Discovery => true,
        }
    }
}

pub type Constructor = fn(&CommandContext) -> Result<Box<dyn Command>>;

/// A catalogue entry.
#[derive(Clone, Copy)]
pub struct CommandFactory {
    pub name: &'static str,
    pub category: Category,
    pub build: Constructor,
}

impl CommandFactory {
    pub const fn new(name: &'static str, category: Category, build: Constructor) -> Self {
        Self { name, category, build }
    }
}

/// A room's commands, sorted by name, with index lists per capability.
pub struct CommandRegistry {
    pub(crate) commands: Vec<Box<dyn Command>>,
    pub(crate) chat: Vec<usize>,
    pub(crate) file: Vec<usize>,
    pub(crate) pulse: Vec<(usize, PulseGate)>,
}

impl CommandRegistry {
    /// Instantiate every enabled factory. A factory that fails or panics is
    /// logged and left out; the rest still load.
    pub fn build(catalogue: &[CommandFactory], ctx: &CommandContext, features: &FeatureConfig) -> Self {
        let mut commands = Vec::with_capacity(catalogue.len());
        for factory in catalogue {
            if !factory.category.enabled(features) {
                tracing::debug!("command {} disabled ({:?})", factory.name, factory.category);
                continue;
            }
            if let Some(command) = isolate("construct", factory.name, || (factory.build)(ctx)) {
                commands.push(command);
            }
        }
        let registry = Self::from_commands(commands);
        tracing::info!(
            "📋 {}: {} commands ({} file, {} pulse)",
            ctx.room_name(),
            registry.len(),
            registry.file.len(),
            registry.pulse.len()
        );
        registry
    }

    pub fn from_commands(mut commands: Vec<Box<dyn Command>>) -> Self {
        commands.sort_by(|a, b| a.name().cmp(b.name()));

        let mut file = Vec::new();
        let mut pulse = Vec::new();
        for (i, command) in commands.iter().enumerate() {
            let caps = command.capabilities();
            if caps.file {
                file.push(i);
            }
            if let Some(interval) = caps.pulse {
                pulse.push((i, PulseGate::new(interval)));
            }
        }

        Self {
            chat: (0..commands.len()).collect(),
            commands,
            file,
            pulse,
        }
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Command names in dispatch order.
    pub fn names(&self) -> Vec<&str> {
        self.commands.iter().map(|c| c.name()).collect()
    }

    /// How often the room's pulse has to tick to serve every pulse handler.
    pub fn min_pulse_interval(&self) -> Option<Duration> {
        self.pulse.iter().map(|(_, gate)| gate.interval()).min()
    }
}
