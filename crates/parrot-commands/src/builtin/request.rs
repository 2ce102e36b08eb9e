//! `!request <thing>`: uploads a placeholder file announcing the request.

use std::time::Duration;

use chrono::Utc;
use parrot_core::{Command, Message, RateLimitCache, Result};

use crate::context::CommandContext;

pub struct RequestCommand {
    ctx: CommandContext,
    cooldown: RateLimitCache,
}

impl RequestCommand {
    pub fn build(ctx: &CommandContext) -> Result<Box<dyn Command>> {
        let config = &ctx.config.commands;
        Ok(Box::new(Self {
            ctx: ctx.clone(),
            cooldown: RateLimitCache::new(
                config.request_cache_size,
                Duration::from_secs(config.request_cooldown_secs),
            ),
        }))
    }
}

impl Command for RequestCommand {
    fn name(&self) -> &str {
        "request"
    }

    fn triggers(&self) -> &[&'static str] {
        &["!request"]
    }

    fn invoke(&mut self, _cmd: &str, remainder: &str, msg: &Message) -> Result<bool> {
        if !self.ctx.state.is_active() {
            return Ok(false);
        }
        let now = Utc::now();
        let key = msg.nick.to_lowercase();
        if self.cooldown.is_cooling(&key, now) {
            self.ctx.post(&format!("{}, pls wait", msg.nick))?;
            return Ok(true);
        }

        let body = format!(
            "{} requested this on {}\nEverybody ignored it always",
            msg.nick,
            now.format("%Y-%m-%d %H:%M:%S UTC")
        );
        let name = format!("[REQUEST] {remainder} - {}", msg.nick);
        let id = self.ctx.room.upload_file(body.into_bytes(), &name)?;
        tracing::info!("📨 Request upload {id} for {}", msg.nick);
        self.cooldown.touch(&key, now);
        Ok(true)
    }
}
