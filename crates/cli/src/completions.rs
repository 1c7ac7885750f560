// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shell completion generation for the evoq CLI.
//!
//! ```bash
//! # Bash
//! evoq completions bash > ~/.local/share/bash-completion/completions/evoq
//!
//! # Zsh
//! evoq completions zsh > ~/.zfunc/_evoq
//!
//! # Fish
//! evoq completions fish > ~/.config/fish/completions/evoq.fish
//! ```

use clap::CommandFactory;
use clap_complete::{generate, Shell};
use std::io;

/// Generate shell completions and write to stdout.
pub fn generate_completions<C: CommandFactory>(shell: Shell) {
    let mut cmd = C::command();
    generate(shell, &mut cmd, "evoq", &mut io::stdout());
}

/// Arguments for the completions command.
#[derive(clap::Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
