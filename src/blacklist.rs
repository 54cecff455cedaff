use std::collections::HashSet;
use std::fs;

use camino::Utf8Path;
use tracing::info;

use crate::catalog::CatalogEntry;
use crate::error::IcevelError;
use crate::granule::Overrides;

/// Curated set of known-corrupt granule filename templates. Templates are
/// parameterized with `{parameter}` and `{ext}` placeholders because the
/// same corrupt acquisition recurs under several filename variants; they
/// are rendered against the current run's attributes before membership is
/// tested, so a template rendered for one parameter never excludes a
/// sibling variant unless that variant is listed itself.
///
/// Read-only at pipeline run time; grows only through offline curation
/// driven by the domain checksums.
#[derive(Debug, Clone)]
pub struct Blacklist {
    templates: Vec<String>,
}

impl Blacklist {
    /// Loads templates from a text asset, one per line. Blank lines and
    /// `#` comments are skipped.
    pub fn load(path: &Utf8Path) -> Result<Self, IcevelError> {
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|_| IcevelError::BlacklistRead(path.as_std_path().to_path_buf()))?;
        let templates = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect();
        Ok(Self { templates })
    }

    pub fn from_templates(templates: Vec<String>) -> Self {
        Self { templates }
    }

    pub fn empty() -> Self {
        Self {
            templates: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Instantiates every template with the given attributes, producing the
    /// literal filename set for one run.
    pub fn render(&self, overrides: &Overrides) -> HashSet<String> {
        let parameter = overrides.parameter.as_deref().unwrap_or("");
        let extension = overrides.extension.as_deref().unwrap_or("");
        self.templates
            .iter()
            .map(|template| {
                template
                    .replace("{parameter}", parameter)
                    .replace("{ext}", extension)
            })
            .collect()
    }

    /// Drops catalog entries whose rendered filename is blacklisted,
    /// logging each exclusion.
    pub fn exclude(&self, catalog: Vec<CatalogEntry>, overrides: &Overrides) -> Vec<CatalogEntry> {
        let rendered = self.render(overrides);
        catalog
            .into_iter()
            .filter(|entry| {
                let name = entry.file_name();
                if rendered.contains(&name) {
                    info!("blacklisting {name}");
                    false
                } else {
                    true
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use camino::Utf8PathBuf;

    use crate::granule::GranuleRecord;

    use super::*;

    const TEMPLATE: &str = "TSX_W69.10N_03Jul09_14Jul09_09-48-07_{parameter}_v02.0{ext}";

    fn entry(name: &str) -> CatalogEntry {
        CatalogEntry {
            record: GranuleRecord::decode(name).unwrap().unwrap(),
            dir: Utf8PathBuf::from("data"),
        }
    }

    fn overrides(parameter: &str, ext: &str) -> Overrides {
        Overrides {
            parameter: Some(parameter.to_string()),
            extension: Some(ext.to_string()),
        }
    }

    #[test]
    fn render_substitutes_placeholders() {
        let blacklist = Blacklist::from_templates(vec![TEMPLATE.to_string()]);
        let rendered = blacklist.render(&overrides("vx", ".tif"));
        assert!(rendered.contains("TSX_W69.10N_03Jul09_14Jul09_09-48-07_vx_v02.0.tif"));
    }

    #[test]
    fn exclude_drops_rendered_members() {
        let blacklist = Blacklist::from_templates(vec![TEMPLATE.to_string()]);
        let catalog = vec![
            entry("TSX_W69.10N_03Jul09_14Jul09_09-48-07_vx_v02.0.tif"),
            entry("TSX_W69.10N_18Sep09_29Sep09_09-48-11_vx_v02.0.tif"),
        ];
        let kept = blacklist.exclude(catalog, &overrides("vx", ".tif"));
        assert_eq!(kept.len(), 1);
        assert_eq!(
            kept[0].file_name(),
            "TSX_W69.10N_18Sep09_29Sep09_09-48-11_vx_v02.0.tif"
        );
    }

    #[test]
    fn exclusion_is_parameter_specific() {
        // A template rendered for vx must leave the vy variant of the same
        // acquisition alone.
        let blacklist = Blacklist::from_templates(vec![TEMPLATE.to_string()]);
        let catalog = vec![entry("TSX_W69.10N_03Jul09_14Jul09_09-48-07_vy_v02.0.tif")];
        let kept = blacklist.exclude(catalog, &overrides("vx", ".tif"));
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn load_skips_comments_and_blanks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blacklist.txt");
        std::fs::write(&path, format!("# curated corrupt granules\n\n{TEMPLATE}\n")).unwrap();
        let blacklist =
            Blacklist::load(Utf8Path::from_path(&path).unwrap()).unwrap();
        assert!(!blacklist.is_empty());
        let rendered = blacklist.render(&overrides("vv", ".nc"));
        assert!(rendered.contains("TSX_W69.10N_03Jul09_14Jul09_09-48-07_vv_v02.0.nc"));
    }
}
