use super::prompts;

pub struct PromptPair {
    pub system: String,
    pub user: String,
}

/// System instruction for the given commit style and body wrap width.
///
/// 'conventional' and 'conv' (case-insensitive, surrounding whitespace
/// ignored) add the Conventional Commits rules; every other value behaves
/// as plain, unknown styles included.
pub fn build_system_prompt(style: &str, wrap_width: usize) -> String {
    let mut system = prompts::SYSTEM_BASE.to_owned();

    if is_conventional(style) {
        system.push('\n');
        system.push_str(prompts::CONVENTIONAL_RULES);
    }

    system.push('\n');
    system.push_str(&format!("- Wrap body lines at {wrap_width} characters."));
    system
}

/// User instruction embedding the raw diff verbatim.
pub fn build_user_prompt(diff: &str) -> String {
    format!(
        "{header}\n\n```diff\n{diff}\n```\n\n{trailer}",
        header = prompts::USER_HEADER,
        diff = diff,
        trailer = prompts::USER_TRAILER
    )
}

pub fn commit_prompt(style: &str, wrap_width: usize, diff: &str) -> PromptPair {
    PromptPair {
        system: build_system_prompt(style, wrap_width),
        user: build_user_prompt(diff),
    }
}

fn is_conventional(style: &str) -> bool {
    matches!(
        style.trim().to_ascii_lowercase().as_str(),
        "conventional" | "conv"
    )
}
