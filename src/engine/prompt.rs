use super::classifier::InteractionMode;
use crate::config::PromptsConfig;

/// Fill a template's named slots. Pure interpolation; the only branching in
/// prompt composition is the two-way mode switch in [`compose`].
fn render(template: &str, bot_name: &str, transcript: &str) -> String {
    template
        .replace("{bot_name}", bot_name)
        .replace("{transcript}", transcript)
}

/// Select and render the prompt for one trigger.
pub fn compose(
    prompts: &PromptsConfig,
    mode: InteractionMode,
    bot_name: &str,
    transcript: &str,
) -> String {
    let template = match mode {
        InteractionMode::Direct => &prompts.direct,
        InteractionMode::Periodic => &prompts.periodic,
    };
    render(template, bot_name, transcript)
}
