// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

mod cli;
mod commands;

fn main() {
    std::process::exit(cli::run());
}
