//! Ordering of logo variants under the current display conditions.
//!
//! The comparator is a fixed sequence of pairwise stages. The first stage
//! that tells two candidates apart decides; later stages only break ties.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::candidates::Candidate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HighContrast {
    #[default]
    Off,
    /// A high-contrast scheme on a dark background.
    Black,
    /// A high-contrast scheme on a light background.
    White,
}

impl HighContrast {
    /// Maps the OS high-contrast flag and active scheme name.
    pub fn from_scheme(on: bool, scheme: &str) -> Self {
        if !on {
            Self::Off
        } else if scheme.contains("White") {
            Self::White
        } else {
            Self::Black
        }
    }

    fn tag(self) -> Option<&'static str> {
        match self {
            Self::Off => None,
            Self::Black => Some("black"),
            Self::White => Some("white"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    /// `AppsUseLightTheme` registry value: `0` means dark; missing means light.
    pub fn from_apps_use_light_theme(value: Option<u32>) -> Self {
        match value {
            Some(0) => Self::Dark,
            _ => Self::Light,
        }
    }

    fn tag(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    fn preferred_altform(self) -> &'static str {
        match self {
            Self::Light => "lightunplated",
            Self::Dark => "unplated",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayContext {
    /// Edge length in pixels the icon will be drawn at.
    pub icon_size: u32,
    pub contrast: HighContrast,
    pub theme: Theme,
}

impl Default for DisplayContext {
    fn default() -> Self {
        Self {
            icon_size: 16,
            contrast: HighContrast::Off,
            theme: Theme::Light,
        }
    }
}

type Stage = fn(&Candidate, &Candidate, &DisplayContext) -> Ordering;

const STAGES: &[Stage] = &[
    by_contrast,
    by_altform,
    by_theme,
    by_target_size,
    by_scale,
    by_qualifier_count,
];

/// `Less` means `a` is the better pick.
pub fn compare(a: &Candidate, b: &Candidate, ctx: &DisplayContext) -> Ordering {
    STAGES
        .iter()
        .map(|stage| stage(a, b, ctx))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// First minimum under [`compare`]; `None` only for an empty slice.
pub fn best<'a>(candidates: &'a [Candidate], ctx: &DisplayContext) -> Option<&'a Candidate> {
    candidates.iter().min_by(|a, b| compare(a, b, ctx))
}

/// All candidates, best first. Ties keep their input order.
pub fn rank<'a>(candidates: &'a [Candidate], ctx: &DisplayContext) -> Vec<&'a Candidate> {
    let mut v: Vec<&Candidate> = candidates.iter().collect();
    v.sort_by(|a, b| compare(a, b, ctx));
    v
}

// The side where `wins` holds comes first; equal when both or neither hold.
fn prefer(a_wins: bool, b_wins: bool) -> Ordering {
    b_wins.cmp(&a_wins)
}

fn by_contrast(a: &Candidate, b: &Candidate, ctx: &DisplayContext) -> Ordering {
    match ctx.contrast.tag() {
        Some(tag) => prefer(
            a.qualifiers.is("contrast", tag),
            b.qualifiers.is("contrast", tag),
        ),
        None => {
            let standard = |c: &Candidate| {
                c.qualifiers.get("contrast").map_or(true, |v| v == "standard")
            };
            prefer(standard(a), standard(b))
        }
    }
}

fn by_altform(a: &Candidate, b: &Candidate, ctx: &DisplayContext) -> Ordering {
    let want = ctx.theme.preferred_altform();
    prefer(a.qualifiers.contains("altform"), b.qualifiers.contains("altform"))
        .then_with(|| prefer(a.qualifiers.is("altform", want), b.qualifiers.is("altform", want)))
}

fn by_theme(a: &Candidate, b: &Candidate, ctx: &DisplayContext) -> Ordering {
    let want = ctx.theme.tag();
    prefer(a.qualifiers.contains("theme"), b.qualifiers.contains("theme"))
        .then_with(|| prefer(a.qualifiers.is("theme", want), b.qualifiers.is("theme", want)))
}

fn by_target_size(a: &Candidate, b: &Candidate, ctx: &DisplayContext) -> Ordering {
    match (a.target_size, b.target_size) {
        (Some(x), Some(y)) => {
            let want = ctx.icon_size;
            prefer(x >= want, y >= want).then_with(|| x.abs_diff(want).cmp(&y.abs_diff(want)))
        }
        (x, y) => prefer(x.is_some(), y.is_some()),
    }
}

fn by_scale(a: &Candidate, b: &Candidate, _ctx: &DisplayContext) -> Ordering {
    match (a.scale, b.scale) {
        (Some(x), Some(y)) => x.cmp(&y),
        (x, y) => prefer(x.is_some(), y.is_some()),
    }
}

fn by_qualifier_count(a: &Candidate, b: &Candidate, _ctx: &DisplayContext) -> Ordering {
    a.qualifiers.len().cmp(&b.qualifiers.len())
}
