use std::path::{Path, PathBuf};

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::resolver::ResolveError;

pub const MANIFEST_FILE: &str = "AppxManifest.xml";
pub const DEFAULT_LOGO_ATTRIBUTE: &str = "Square44x44Logo";

/// Reads the logo reference a package declares for its application.
pub trait ManifestReader {
    /// Relative logo path such as `Assets\Square44x44Logo.png`, or `None`
    /// when the manifest declares none.
    fn logo_asset(&self, package_root: &Path) -> Result<Option<String>, ResolveError>;
}

/// Reads `AppxManifest.xml` from the package folder.
#[derive(Debug, Clone)]
pub struct AppxManifest {
    attribute: String,
}

impl AppxManifest {
    pub fn new(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
        }
    }
}

impl Default for AppxManifest {
    fn default() -> Self {
        Self::new(DEFAULT_LOGO_ATTRIBUTE)
    }
}

impl ManifestReader for AppxManifest {
    fn logo_asset(&self, package_root: &Path) -> Result<Option<String>, ResolveError> {
        let path = manifest_path(package_root);
        let xml = std::fs::read_to_string(&path).map_err(|e| ResolveError::io(&path, e))?;
        logo_from_xml(&xml, &self.attribute).map_err(|message| ResolveError::Manifest { path, message })
    }
}

/// Returns `attribute` of the `VisualElements` element of the first
/// `Application` in the manifest.
pub fn logo_from_xml(xml: &str, attribute: &str) -> Result<Option<String>, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut in_app = false;
    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) => {
                let name = e.local_name();
                if name.as_ref() == b"Application" {
                    in_app = true;
                } else if in_app && name.as_ref() == b"VisualElements" {
                    return find_attribute(&e, attribute);
                }
            }
            Event::Empty(e) => {
                if in_app && e.local_name().as_ref() == b"VisualElements" {
                    return find_attribute(&e, attribute);
                }
            }
            // only the first application counts
            Event::End(e) if e.local_name().as_ref() == b"Application" => return Ok(None),
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

fn find_attribute(e: &BytesStart<'_>, attribute: &str) -> Result<Option<String>, String> {
    for attr in e.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        if attr.key.local_name().as_ref() == attribute.as_bytes() {
            let value = attr.unescape_value().map_err(|e| e.to_string())?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Path of the manifest inside a package folder.
pub fn manifest_path(package_root: &Path) -> PathBuf {
    package_root.join(MANIFEST_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CALC: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Package xmlns="http://schemas.microsoft.com/appx/manifest/foundation/windows10"
         xmlns:uap="http://schemas.microsoft.com/appx/manifest/uap/windows10">
  <Properties>
    <DisplayName>Calculator</DisplayName>
    <Logo>Assets\CalculatorStoreLogo.png</Logo>
  </Properties>
  <Applications>
    <Application Id="App" Executable="CalculatorApp.exe" EntryPoint="CalculatorApp.App">
      <uap:VisualElements DisplayName="Calculator" Square150x150Logo="Assets\CalculatorMedTile.png"
          Square44x44Logo="Assets\CalculatorAppList.png" BackgroundColor="transparent">
        <uap:DefaultTile Wide310x150Logo="Assets\CalculatorWideTile.png"/>
      </uap:VisualElements>
    </Application>
    <Application Id="Other">
      <uap:VisualElements Square44x44Logo="Assets\Other.png"/>
    </Application>
  </Applications>
</Package>"#;

    #[test]
    fn reads_namespaced_visual_elements() {
        let logo = logo_from_xml(CALC, DEFAULT_LOGO_ATTRIBUTE).unwrap();
        assert_eq!(logo.as_deref(), Some("Assets\\CalculatorAppList.png"));
        let tile = logo_from_xml(CALC, "Square150x150Logo").unwrap();
        assert_eq!(tile.as_deref(), Some("Assets\\CalculatorMedTile.png"));
    }

    #[test]
    fn missing_attribute_is_none() {
        assert_eq!(logo_from_xml(CALC, "Square71x71Logo").unwrap(), None);
    }

    #[test]
    fn first_application_only() {
        let xml = r#"<Package><Applications>
            <Application Id="A"></Application>
            <Application Id="B"><VisualElements Square44x44Logo="b.png"/></Application>
        </Applications></Package>"#;
        assert_eq!(logo_from_xml(xml, DEFAULT_LOGO_ATTRIBUTE).unwrap(), None);
    }

    #[test]
    fn malformed_xml_is_error() {
        assert!(logo_from_xml("<Package><Applications></Package>", DEFAULT_LOGO_ATTRIBUTE).is_err());
    }
}
