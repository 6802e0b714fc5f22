use super::string_arg;
use crate::config::Theme;
use crate::context::AppContext;
use crate::dispatch::CliCommand;
use crate::ui::{CommandOutput, Palette};
use crate::Result;
use async_trait::async_trait;
use clap::{Arg, ArgMatches};
use serde_json::json;

/// `theme [light|dark]`
pub struct ThemeCommand;

#[async_trait]
impl CliCommand for ThemeCommand {
    fn name(&self) -> &str {
        "theme"
    }

    fn definition(&self) -> clap::Command {
        clap::Command::new("theme")
            .about("Set or view terminal color preferences (light|dark)")
            .arg(Arg::new("mode").help("light or dark"))
    }

    async fn run(&self, ctx: &AppContext, args: &ArgMatches) -> Result<CommandOutput> {
        let Some(mode) = string_arg(args, "mode") else {
            let current = ctx.config().theme;
            let output = CommandOutput::new(json!({ "status": "success", "theme": current }))
                .info(format!("Current theme: {}", current));
            return Ok(with_preview(output, current));
        };

        let theme: Theme = mode.parse()?;
        let store = ctx.config_store();
        let mut config = store.load();
        config.theme = theme;
        store.save(&config)?;

        // Rendered with the new palette so the preview shows what changed
        let palette = Palette::for_theme(theme);
        let output = CommandOutput::new(json!({ "status": "success", "theme": theme }))
            .plain(palette.info(&format!("Theme activated: {}", theme)).to_string());
        Ok(with_preview(output, theme))
    }
}

fn with_preview(output: CommandOutput, theme: Theme) -> CommandOutput {
    Palette::for_theme(theme)
        .preview()
        .into_iter()
        .fold(output, |output, line| output.plain(line))
}
