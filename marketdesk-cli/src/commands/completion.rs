//! Shell completion for the `marketdesk` binary.

use clap::CommandFactory;
use clap_complete::{generate, shells::Shell};
use std::io;

/// Prints the completion script for `shell` to stdout.
///
/// # Arguments
/// * `shell` - Target shell, parsed from `--shell` (bash, zsh, fish, elvish or powershell)
///
/// The script completes subcommands and flags of every `marketdesk` command,
/// including `chat --peer` and `conversations --json`.
pub fn generate_completion(shell: Shell) {
    let mut command = crate::Cli::command();
    let name = command.get_name().to_string();
    generate(shell, &mut command, name, &mut io::stdout());
}
