//! Trigger keyword parsing for incoming chat messages.

/// What to do with an incoming message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Not addressed to the bot.
    Ignored,
    /// Bare keyword: list the commands.
    Help,
    /// Keyword followed by a subcommand and its arguments.
    Command { name: String, args: Vec<String> },
}

/// Route a message of `author_id` for a bot whose own id is `bot_id`.
///
/// Matching is case-sensitive. The remainder after `keyword` and a space is
/// split on single spaces; the first token names the subcommand.
pub fn route(text: &str, author_id: &str, bot_id: &str, keyword: &str) -> Route {
    if author_id == bot_id {
        return Route::Ignored;
    }

    let Some(rest) = text.strip_prefix(keyword) else {
        return Route::Ignored;
    };

    if rest.is_empty() {
        return Route::Help;
    }

    let Some(rest) = rest.strip_prefix(' ') else {
        // e.g. "dobbyx"
        return Route::Ignored;
    };

    let mut tokens = rest.split(' ').map(str::to_string);
    let name = tokens.next().unwrap_or_default();

    Route::Command {
        name,
        args: tokens.collect(),
    }
}
