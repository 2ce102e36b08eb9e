//! Builtin commands and the default catalogue.

pub mod admin;
pub mod discover;
pub mod games;
pub mod quote;
pub mod request;
pub mod roomstats;

use crate::registry::{Category, CommandFactory};

/// Every builtin command. Order here doesn't matter; the registry sorts.
pub fn catalogue() -> Vec<CommandFactory> {
    vec![
        CommandFactory::new("admin", Category::Core, admin::AdminToggleCommand::build),
        CommandFactory::new("roulette", Category::Core, games::RouletteCommand::build),
        CommandFactory::new("dice", Category::Core, games::DiceCommand::build),
        CommandFactory::new("8ball", Category::Phrase, games::EightballCommand::build),
        CommandFactory::new("quote", Category::Phrase, quote::QuoteCommand::build),
        CommandFactory::new("request", Category::Uploads, request::RequestCommand::build),
        CommandFactory::new("roomstats", Category::Core, roomstats::RoomStatsCommand::build),
        CommandFactory::new("addroom", Category::Discovery, discover::AddRoomCommand::build),
        CommandFactory::new("delroom", Category::Discovery, discover::DelRoomCommand::build),
        CommandFactory::new("discover", Category::Discovery, discover::DiscoverCommand::build),
        CommandFactory::new("fulldiscover", Category::Discovery, discover::FullDiscoverCommand::build),
        CommandFactory::new("crawler", Category::Discovery, discover::RoomCrawlerCommand::build),
    ]
}

#[cfg(test)]
mod tests {
    use parrot_core::config::FeatureConfig;

    use super::*;
    use crate::context::testing::fixture;
    use crate::registry::CommandRegistry;

    #[test]
    fn test_default_catalogue_order() {
        let f = fixture();
        let reg = CommandRegistry::build(&catalogue(), &f.ctx, &FeatureConfig::default());
        assert_eq!(
            reg.names(),
            vec![
                "8ball",
                "addroom",
                "admin",
                "crawler",
                "delroom",
                "dice",
                "discover",
                "fulldiscover",
                "quote",
                "roomstats",
                "roulette",
            ]
        );
        assert_eq!(reg.min_pulse_interval(), Some(std::time::Duration::from_secs(180)));
    }

    #[test]
    fn test_uploads_feature_adds_request() {
        let f = fixture();
        let features = FeatureConfig {
            phrases: false,
            uploads: true,
        };
        let reg = CommandRegistry::build(&catalogue(), &f.ctx, &features);
        assert!(reg.names().contains(&"request"));
        assert!(!reg.names().contains(&"quote"));
        assert!(!reg.names().contains(&"8ball"));
    }
}
