// SPDX-License-Identifier: MIT
//
// loom — host for a terminal shared by several plugins.
//
// This binary wires the two library crates into one session:
//
//   loom-term  → geometry, colors, capabilities, escape encoding, diffing
//   loom-scene → the drawable tree tenants attach to
//
// It resolves a session configuration (defaults, then `--profile`, then
// flags), plays the demo scene, and writes the terminal bytes to stdout.
// Logs go to stderr so they never mix with the frame.

mod config;
mod demo;
mod session;

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use loom_term::caps::Charset;
use loom_term::escape::MouseMode;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{ColorDepth, SessionConfig};
use crate::session::Session;

/// Render a shared multi-tenant terminal scene.
#[derive(Debug, Parser)]
#[command(name = "loom", version, about)]
struct Args {
    /// Terminal width in columns (default: the local terminal, else 80)
    #[arg(long)]
    width: Option<i32>,

    /// Terminal height in rows (default: the local terminal, else 24)
    #[arg(long)]
    height: Option<i32>,

    /// Color depth of the far terminal
    #[arg(long, value_enum)]
    color: Option<ColorDepth>,

    /// Accepted charsets, most preferred first (utf8, latin1, cp437, ascii)
    #[arg(long, value_delimiter = ',')]
    charset: Vec<Charset>,

    /// Use blink as bright background (iCE colors)
    #[arg(long)]
    ice: bool,

    /// Mouse reporting to request (x10, click, drag, motion, utf8, sgr, urxvt)
    #[arg(long)]
    mouse: Option<MouseMode>,

    /// TOML session profile; flags override its values
    #[arg(long)]
    profile: Option<PathBuf>,

    /// More logging on stderr (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn apply(&self, config: &mut SessionConfig) {
        if let Some(width) = self.width {
            config.width = Some(width);
        }
        if let Some(height) = self.height {
            config.height = Some(height);
        }
        if let Some(color) = self.color {
            config.color = color;
        }
        if !self.charset.is_empty() {
            config.charsets.clone_from(&self.charset);
        }
        if self.ice {
            config.ice = true;
        }
        if self.mouse.is_some() {
            config.mouse = self.mouse;
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut config = match &args.profile {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::default(),
    };
    args.apply(&mut config);

    let caps = config.capabilities().context("cannot set up session")?;
    info!(
        size = %caps.size(),
        charset = %caps.active_charset(),
        flags = ?caps.color_flags(),
        "session ready"
    );

    let mut session = Session::new(caps, io::stdout().lock());
    session.set_mouse(config.mouse).context("writing to stdout")?;
    demo::run(&mut session)?;
    session.finish().context("restoring terminal")?;
    Ok(())
}
