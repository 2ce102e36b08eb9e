//! `.active` / `.ded`: mute and unmute the bot everywhere.

use parrot_core::{Command, Message, Result};

use crate::context::CommandContext;

pub struct AdminToggleCommand {
    ctx: CommandContext,
}

impl AdminToggleCommand {
    pub fn build(ctx: &CommandContext) -> Result<Box<dyn Command>> {
        Ok(Box::new(Self { ctx: ctx.clone() }))
    }
}

impl Command for AdminToggleCommand {
    fn name(&self) -> &str {
        "admin"
    }

    fn triggers(&self) -> &[&'static str] {
        &[".active", ".ded"]
    }

    fn invoke(&mut self, cmd: &str, _remainder: &str, msg: &Message) -> Result<bool> {
        if !self.ctx.is_admin(msg) {
            self.ctx.post(&format!("{}: I don't care about your commands", msg.nick))?;
            return Ok(true);
        }

        if cmd == ".ded" {
            self.ctx.post("Segmentation fault... core dumped")?;
            self.ctx.state.set_active(false);
            tracing::info!("🔇 Muted by {}", msg.nick);
        } else {
            self.ctx.state.set_active(true);
            self.ctx.post("Let the spam commence")?;
            tracing::info!("🔊 Unmuted by {}", msg.nick);
        }
        Ok(true)
    }
}
