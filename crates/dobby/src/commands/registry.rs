//! Command registration table and dispatch.

use crate::commands::CommandHandler;
use std::collections::HashMap;
use std::ops::ControlFlow;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Maps a subcommand name to the handlers run for it, in order.
#[derive(Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Vec<Arc<dyn CommandHandler>>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler chain for `name`.
    ///
    /// Registering a name again replaces its chain; returns `true` when that
    /// happened.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        handlers: Vec<Arc<dyn CommandHandler>>,
    ) -> bool {
        let name = name.into();
        let replaced = self.commands.insert(name.clone(), handlers).is_some();
        if replaced {
            debug!("Replaced handlers for command {}", name);
        }
        replaced
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Registered command names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Chat text listing the available commands.
    pub fn help_text(&self) -> String {
        let mut msg = String::from("Here is a list of available commands: \n");
        for name in self.names() {
            msg.push('`');
            msg.push_str(name);
            msg.push_str("`\n");
        }
        msg
    }

    /// Run the handlers for `name` in registration order.
    ///
    /// Stops at the first handler that breaks. Unknown names are ignored.
    #[instrument(skip(self, args))]
    pub async fn dispatch(&self, channel_id: &str, name: &str, args: &[String]) {
        let Some(handlers) = self.commands.get(name) else {
            debug!("invalid command: {}", name);
            return;
        };

        for handler in handlers {
            if let ControlFlow::Break(()) = handler.execute(channel_id, args).await {
                debug!("{} stopped the {} chain", handler.name(), name);
                break;
            }
        }
    }
}
