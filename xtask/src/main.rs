use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use topmost::candidates::{self, Candidate};
use topmost::manifest::{AppxManifest, ManifestReader, DEFAULT_LOGO_ATTRIBUTE};
use topmost::ranking::{self, DisplayContext, HighContrast, Theme};

#[derive(Parser)]
#[command(name = "xtask", about = "Dev tools for TopMost")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
#[command(rename_all = "kebab-case")]
enum Cmd {
    /// Pick the logo variant an unpacked package would show in the menu
    Resolve {
        /// Package directory (the one holding AppxManifest.xml)
        package: PathBuf,
        /// Logo path relative to the package; read from the manifest when omitted
        #[arg(long)]
        logo: Option<String>,
        /// Manifest attribute to read when --logo is omitted
        #[arg(long, default_value = DEFAULT_LOGO_ATTRIBUTE)]
        attribute: String,
        /// Target icon size in pixels
        #[arg(long, default_value_t = 16)]
        size: u32,
        #[arg(long, value_enum, default_value_t = ThemeArg::Light)]
        theme: ThemeArg,
        #[arg(long, value_enum, default_value_t = ContrastArg::Off)]
        contrast: ContrastArg,
        /// Print every candidate, best first
        #[arg(long)]
        all: bool,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ThemeArg {
    Light,
    Dark,
}

#[derive(Clone, Copy, ValueEnum)]
enum ContrastArg {
    Off,
    Black,
    White,
}

impl From<ThemeArg> for Theme {
    fn from(t: ThemeArg) -> Self {
        match t {
            ThemeArg::Light => Theme::Light,
            ThemeArg::Dark => Theme::Dark,
        }
    }
}

impl From<ContrastArg> for HighContrast {
    fn from(c: ContrastArg) -> Self {
        match c {
            ContrastArg::Off => HighContrast::Off,
            ContrastArg::Black => HighContrast::Black,
            ContrastArg::White => HighContrast::White,
        }
    }
}

#[derive(Serialize)]
struct Row {
    rank: usize,
    path: PathBuf,
    rel: String,
    target_size: Option<u32>,
    scale: Option<u32>,
    qualifiers: BTreeMap<String, String>,
}

impl Row {
    fn new(rank: usize, c: &Candidate) -> Self {
        Self {
            rank,
            path: c.path.clone(),
            rel: c.rel.clone(),
            target_size: c.target_size,
            scale: c.scale,
            qualifiers: c
                .qualifiers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct Report {
    package: PathBuf,
    logo: String,
    context: DisplayContext,
    candidates: Vec<Row>,
}

fn logo_for(package: &Path, logo: Option<String>, attribute: &str) -> Result<String> {
    if let Some(l) = logo {
        return Ok(l);
    }
    AppxManifest::new(attribute)
        .logo_asset(package)?
        .ok_or_else(|| anyhow!("manifest declares no {attribute}"))
}

fn resolve(package: &Path, logo: &str, ctx: &DisplayContext, all: bool) -> Result<Vec<Row>> {
    let found = candidates::enumerate(package, logo)
        .with_context(|| format!("enumerate variants of {logo}"))?;
    let ranked = ranking::rank(&found, ctx);
    let keep = if all { ranked.len() } else { ranked.len().min(1) };
    Ok(ranked
        .into_iter()
        .take(keep)
        .enumerate()
        .map(|(i, c)| Row::new(i + 1, c))
        .collect())
}

fn print_text(report: &Report) {
    println!(
        "{} @ {}px, {:?} theme, contrast {:?}",
        report.logo, report.context.icon_size, report.context.theme, report.context.contrast
    );
    if report.candidates.is_empty() {
        println!("  (no variants on disk)");
        return;
    }
    for row in &report.candidates {
        println!("  {:>3}. {}", row.rank, row.rel);
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Resolve {
            package,
            logo,
            attribute,
            size,
            theme,
            contrast,
            all,
            json,
        } => {
            let logo = logo_for(&package, logo, &attribute)?;
            let context = DisplayContext {
                icon_size: size,
                contrast: contrast.into(),
                theme: theme.into(),
            };
            let candidates = resolve(&package, &logo, &context, all)?;
            let report = Report {
                package,
                logo,
                context,
                candidates,
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_text(&report);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(root: &Path, rel: &str) {
        let p = root.join(rel);
        fs::create_dir_all(p.parent().unwrap()).unwrap();
        fs::write(p, b"").unwrap();
    }

    #[test]
    fn resolve_lists_best_first() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "Assets/Logo.targetsize-16.png");
        touch(dir.path(), "Assets/Logo.targetsize-48.png");
        touch(dir.path(), "Assets/Logo.scale-100.png");
        let ctx = DisplayContext {
            icon_size: 48,
            ..Default::default()
        };
        let rows = resolve(dir.path(), "Assets\\Logo.png", &ctx, true).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].rel, "Logo.targetsize-48.png");
        assert_eq!(rows[0].target_size, Some(48));

        let best = resolve(dir.path(), "Assets\\Logo.png", &ctx, false).unwrap();
        assert_eq!(best.len(), 1);
    }

    #[test]
    fn explicit_logo_skips_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let logo = logo_for(dir.path(), Some("Assets\\X.png".into()), "Square44x44Logo").unwrap();
        assert_eq!(logo, "Assets\\X.png");
        assert!(logo_for(dir.path(), None, "Square44x44Logo").is_err());
    }
}
