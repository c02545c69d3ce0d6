use pretty_assertions::assert_eq;
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use topmost::candidates::{self, Candidate};
use topmost::core::WindowId;
use topmost::manifest::AppxManifest;
use topmost::ranking::{self, DisplayContext, HighContrast, Theme};
use topmost::resolver::{AssetResolver, PackageLocator, ResolveError, resolve_in_package};

const LOGO: &str = "Assets\\Square44x44Logo.png";

fn touch(root: &Path, rel: &str) {
    let p = root.join(rel);
    fs::create_dir_all(p.parent().unwrap()).unwrap();
    fs::write(p, b"png").unwrap();
}

fn package(files: &[&str]) -> tempfile::TempDir {
    let td = tempfile::tempdir().expect("tmpdir");
    for f in files {
        touch(td.path(), &format!("Assets/{f}"));
    }
    td
}

fn winner(root: &Path, ctx: &DisplayContext) -> Option<String> {
    resolve_in_package(root, LOGO, ctx)
        .expect("resolve")
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
}

fn at_size(icon_size: u32) -> DisplayContext {
    DisplayContext {
        icon_size,
        ..Default::default()
    }
}

#[test]
fn smaller_scale_wins_when_nothing_else_differs() {
    let pkg = package(&["Square44x44Logo.scale-200.png", "Square44x44Logo.scale-100.png"]);
    assert_eq!(
        winner(pkg.path(), &DisplayContext::default()).as_deref(),
        Some("Square44x44Logo.scale-100.png")
    );
}

#[test]
fn exact_target_size_wins() {
    let pkg = package(&[
        "Square44x44Logo.targetsize-16.png",
        "Square44x44Logo.targetsize-32.png",
        "Square44x44Logo.targetsize-48.png",
    ]);
    assert_eq!(
        winner(pkg.path(), &at_size(32)).as_deref(),
        Some("Square44x44Logo.targetsize-32.png")
    );
}

#[test]
fn next_larger_target_size_beats_smaller() {
    let pkg = package(&[
        "Square44x44Logo.targetsize-16.png",
        "Square44x44Logo.targetsize-64.png",
    ]);
    assert_eq!(
        winner(pkg.path(), &at_size(32)).as_deref(),
        Some("Square44x44Logo.targetsize-64.png")
    );
}

#[test]
fn black_high_contrast_picks_black_asset() {
    let pkg = package(&[
        "Square44x44Logo.contrast-black.png",
        "Square44x44Logo.contrast-white.png",
        "Square44x44Logo.png",
    ]);
    let ctx = DisplayContext {
        contrast: HighContrast::Black,
        ..Default::default()
    };
    assert_eq!(
        winner(pkg.path(), &ctx).as_deref(),
        Some("Square44x44Logo.contrast-black.png")
    );
}

#[test]
fn untagged_beats_contrast_assets_when_contrast_off() {
    let pkg = package(&[
        "Square44x44Logo.contrast-black.png",
        "Square44x44Logo.contrast-white.png",
        "Square44x44Logo.png",
    ]);
    assert_eq!(
        winner(pkg.path(), &DisplayContext::default()).as_deref(),
        Some("Square44x44Logo.png")
    );
}

#[test]
fn folder_qualifiers_take_part_in_ranking() {
    let pkg = package(&["Square44x44Logo.png", "contrast-white/Square44x44Logo.png"]);
    let ctx = DisplayContext {
        contrast: HighContrast::White,
        ..Default::default()
    };
    let best = resolve_in_package(pkg.path(), LOGO, &ctx).unwrap().unwrap();
    assert!(best.ends_with(Path::new("contrast-white").join("Square44x44Logo.png")));
}

#[test]
fn no_variants_is_no_result() {
    let pkg = package(&["StoreLogo.png"]);
    assert_eq!(resolve_in_package(pkg.path(), LOGO, &at_size(16)).unwrap(), None);

    let missing = tempfile::tempdir().unwrap();
    assert_eq!(resolve_in_package(missing.path(), LOGO, &at_size(16)).unwrap(), None);
}

#[test]
fn enumeration_drops_bad_segments_and_unrelated_files() {
    let pkg = package(&[
        "Square44x44Logo.scale-100.png",
        "Square44x44Logo.bogus.png",
        "Square44x44LogoWide.png",
        "SQUARE44X44LOGO.targetsize-24.png",
        "notes/Square44x44Logo.png",
    ]);
    let found = candidates::enumerate(pkg.path(), LOGO).unwrap();
    let rels: Vec<&str> = found.iter().map(|c| c.rel.as_str()).collect();
    assert_eq!(
        rels,
        vec!["SQUARE44X44LOGO.targetsize-24.png", "Square44x44Logo.scale-100.png"]
    );
}

#[test]
fn non_numeric_size_is_an_error() {
    let pkg = package(&["Square44x44Logo.targetsize-big.png"]);
    let err = candidates::enumerate(pkg.path(), LOGO).unwrap_err();
    assert!(matches!(err, ResolveError::InvalidNumber { qualifier: "targetsize", .. }));
}

fn sample() -> Vec<Candidate> {
    [
        "Logo.png",
        "Logo.scale-100.png",
        "Logo.scale-200.png",
        "Logo.targetsize-16.png",
        "Logo.targetsize-32.png",
        "Logo.targetsize-48.png",
        "Logo.targetsize-16_altform-unplated.png",
        "Logo.targetsize-16_altform-lightunplated.png",
        "Logo.targetsize-32_theme-dark.png",
        "Logo.theme-light.png",
        "Logo.contrast-black.png",
        "Logo.contrast-white_scale-100.png",
        "contrast-standard/Logo.targetsize-24.png",
    ]
    .iter()
    .map(|r| Candidate::from_rel(r).unwrap().unwrap())
    .collect()
}

fn contexts() -> Vec<DisplayContext> {
    let mut out = Vec::new();
    for contrast in [HighContrast::Off, HighContrast::Black, HighContrast::White] {
        for theme in [Theme::Light, Theme::Dark] {
            for icon_size in [16, 24, 40] {
                out.push(DisplayContext {
                    icon_size,
                    contrast,
                    theme,
                });
            }
        }
    }
    out
}

#[test]
fn comparator_is_a_strict_weak_order() {
    let cands = sample();
    for ctx in contexts() {
        for a in &cands {
            assert_eq!(ranking::compare(a, a, &ctx), Ordering::Equal);
            for b in &cands {
                let ab = ranking::compare(a, b, &ctx);
                assert_eq!(ab, ranking::compare(b, a, &ctx).reverse(), "{} vs {}", a.rel, b.rel);
                for c in &cands {
                    let bc = ranking::compare(b, c, &ctx);
                    if ab != Ordering::Greater && bc != Ordering::Greater {
                        let ac = ranking::compare(a, c, &ctx);
                        assert_ne!(ac, Ordering::Greater, "{} / {} / {} in {ctx:?}", a.rel, b.rel, c.rel);
                        if ab == Ordering::Less || bc == Ordering::Less {
                            assert_eq!(ac, Ordering::Less, "{} / {} / {} in {ctx:?}", a.rel, b.rel, c.rel);
                        }
                    }
                }
            }
        }
    }
}

#[test]
fn ranking_is_deterministic() {
    let cands = sample();
    for ctx in contexts() {
        let first = ranking::best(&cands, &ctx).map(|c| c.rel.clone());
        for _ in 0..5 {
            assert_eq!(ranking::best(&cands, &ctx).map(|c| c.rel.clone()), first);
        }
        let ranked = ranking::rank(&cands, &ctx);
        assert_eq!(ranked.first().map(|c| c.rel.clone()), first);
    }
}

struct FixedLocator(Option<PathBuf>);

impl PackageLocator for FixedLocator {
    fn package_root(&self, _window: WindowId) -> Result<Option<PathBuf>, ResolveError> {
        Ok(self.0.clone())
    }
}

const MANIFEST: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Package xmlns="http://schemas.microsoft.com/appx/manifest/foundation/windows10"
         xmlns:uap="http://schemas.microsoft.com/appx/manifest/uap/windows10">
  <Applications>
    <Application Id="App">
      <uap:VisualElements DisplayName="Demo" Square44x44Logo="Assets\Square44x44Logo.png"
          Square150x150Logo="Assets\Tile.png"/>
    </Application>
  </Applications>
</Package>"#;

#[test]
fn resolver_reads_manifest_and_ranks() {
    let pkg = package(&[
        "Square44x44Logo.targetsize-16.png",
        "Square44x44Logo.targetsize-16_altform-unplated.png",
        "Square44x44Logo.scale-100.png",
        "Tile.scale-100.png",
    ]);
    fs::write(pkg.path().join("AppxManifest.xml"), MANIFEST).unwrap();

    let resolver = AssetResolver::new(FixedLocator(Some(pkg.path().to_path_buf())), AppxManifest::default());
    let best = resolver.resolve(WindowId(42), &at_size(16)).unwrap().unwrap();
    assert_eq!(
        best.file_name().unwrap(),
        "Square44x44Logo.targetsize-16_altform-unplated.png"
    );

    let tiles = AssetResolver::new(
        FixedLocator(Some(pkg.path().to_path_buf())),
        AppxManifest::new("Square150x150Logo"),
    );
    let best = tiles.resolve(WindowId(42), &at_size(16)).unwrap().unwrap();
    assert_eq!(best.file_name().unwrap(), "Tile.scale-100.png");
}

#[test]
fn unpackaged_window_is_no_result() {
    let resolver = AssetResolver::new(FixedLocator(None), AppxManifest::default());
    assert_eq!(resolver.resolve(WindowId(7), &at_size(16)).unwrap(), None);
}

#[test]
fn missing_manifest_is_an_io_error() {
    let pkg = package(&["Square44x44Logo.png"]);
    let resolver = AssetResolver::new(FixedLocator(Some(pkg.path().to_path_buf())), AppxManifest::default());
    let err = resolver.resolve(WindowId(7), &at_size(16)).unwrap_err();
    assert!(matches!(err, ResolveError::Io { .. }));
}
