//! Small chat games: `!roulette`, `!dice`, `!8ball`.

use std::time::Duration;

use parrot_core::{Command, Message, Result};
use rand::Rng;
use rand::seq::SliceRandom;

use crate::context::CommandContext;

/// Russian roulette, narrated over eight seconds with deferred posts.
pub struct RouletteCommand {
    ctx: CommandContext,
}

impl RouletteCommand {
    pub fn build(ctx: &CommandContext) -> Result<Box<dyn Command>> {
        Ok(Box::new(Self { ctx: ctx.clone() }))
    }

    fn say_later(&self, secs: u64, text: String) {
        let ctx = self.ctx.clone();
        self.ctx
            .call_later(Duration::from_secs(secs), move |_| ctx.post(&text));
    }
}

impl Command for RouletteCommand {
    fn name(&self) -> &str {
        "roulette"
    }

    fn triggers(&self) -> &[&'static str] {
        &["!roulette", "!volarette"]
    }

    fn invoke(&mut self, _cmd: &str, _remainder: &str, msg: &Message) -> Result<bool> {
        if !self.ctx.allowed(msg) {
            return Ok(true);
        }
        if !self.ctx.state.is_active() {
            return Ok(false);
        }

        let shot = rand::thread_rng().gen_range(1..=6);
        self.say_later(1, "loading...".into());
        self.say_later(4, "spinning...".into());
        self.say_later(7, "cocking...".into());
        let end = if shot == 6 {
            format!("BANG, {} is dead", msg.nick)
        } else {
            format!("CLICK, {} is still foreveralone", msg.nick)
        };
        self.say_later(8, end);
        Ok(true)
    }
}

/// `""` → one six-sided die; `"NdM"` → N dice with M sides.
pub fn parse_dice(spec: &str) -> Option<(u32, u32)> {
    if spec.is_empty() {
        return Some((1, 6));
    }
    let (many, sides) = spec.to_lowercase().split_once('d').map(|(a, b)| (a.to_string(), b.to_string()))?;
    if many.is_empty() || sides.is_empty() {
        return None;
    }
    let many: u32 = many.parse().ok()?;
    let sides: u32 = sides.parse().ok()?;
    let many = if many == 0 { 1 } else { many };
    let sides = if sides == 0 { 6 } else { sides };
    (sides > 1 && (1..=10).contains(&many)).then_some((many, sides))
}

pub struct DiceCommand {
    ctx: CommandContext,
}

impl DiceCommand {
    pub fn build(ctx: &CommandContext) -> Result<Box<dyn Command>> {
        Ok(Box::new(Self { ctx: ctx.clone() }))
    }
}

impl Command for DiceCommand {
    fn name(&self) -> &str {
        "dice"
    }

    fn triggers(&self) -> &[&'static str] {
        &["!dice", "!roll"]
    }

    fn invoke(&mut self, _cmd: &str, remainder: &str, msg: &Message) -> Result<bool> {
        if !self.ctx.allowed(msg) {
            return Ok(true);
        }
        let Some((many, sides)) = parse_dice(remainder) else {
            return Ok(false);
        };
        let mut rng = rand::thread_rng();
        let total: u32 = (0..many).map(|_| rng.gen_range(1..=sides)).sum();
        self.ctx.post(&format!("Rolled {total}"))?;
        Ok(true)
    }
}

const EIGHTBALL: &[&str] = &[
    "It is certain",
    "It is decidedly so",
    "Without a doubt",
    "Yes definitely",
    "You may rely on it",
    "As I see it, yes",
    "Most likely",
    "Outlook good",
    "Yes",
    "Signs point to yes",
    "Reply hazy try again",
    "Ask again later",
    "Better not tell you now",
    "Cannot predict now",
    "Concentrate and ask again",
    "Don't count on it",
    "My reply is no",
    "My sources say no",
    "Outlook not so good",
    "Very doubtful",
];

pub struct EightballCommand {
    ctx: CommandContext,
}

impl EightballCommand {
    pub fn build(ctx: &CommandContext) -> Result<Box<dyn Command>> {
        Ok(Box::new(Self { ctx: ctx.clone() }))
    }
}

impl Command for EightballCommand {
    fn name(&self) -> &str {
        "8ball"
    }

    fn triggers(&self) -> &[&'static str] {
        &["!8ball", "!eightball"]
    }

    fn invoke(&mut self, _cmd: &str, remainder: &str, msg: &Message) -> Result<bool> {
        if !self.ctx.allowed(msg) {
            return Ok(true);
        }
        // Only shitposting mode answers questions nobody asked.
        if remainder.is_empty() && !self.ctx.state.shitposting() {
            return Ok(false);
        }
        let answer = EIGHTBALL.choose(&mut rand::thread_rng()).unwrap_or(&"Ask again later");
        self.ctx.post(&format!("{}: {answer}", msg.nick))?;
        Ok(true)
    }
}
