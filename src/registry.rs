use crate::types::Gender;
use once_cell::sync::Lazy;
use serde::Deserialize;

/// The embedded reference data, parsed once per process.
static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    toml::from_str(include_str!("../data/parameters.toml"))
        .expect("embedded parameter registry is valid TOML")
});

/// Static reference data: every known anthropometric parameter with its
/// definition, applications, design guidance and per-gender data sources,
/// plus the fixed list of survey regions.
#[derive(Debug, Deserialize)]
pub struct Registry {
    pub regions: Vec<String>,
    #[serde(rename = "parameter")]
    pub parameters: Vec<Parameter>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub definition: String,
    pub applications: Vec<String>,
    pub design_guide: String,
    pub male: Option<SourceLinks>,
    pub female: Option<SourceLinks>,
}

/// Where one gender's data lives: the spreadsheet share URL and, when one
/// exists, the drive file id of the measurement diagram.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceLinks {
    pub sheet: String,
    pub image: Option<String>,
}

impl Registry {
    pub fn global() -> &'static Registry {
        &REGISTRY
    }

    /// Exact parameter lookup, case-insensitive since parameter names are
    /// conventionally upper-case but callers type them freely.
    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.parameters
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Parameters whose name contains the search term (case-insensitive).
    pub fn search(&self, term: &str) -> Vec<&Parameter> {
        let term = term.to_lowercase();
        self.parameters
            .iter()
            .filter(|p| p.name.to_lowercase().contains(&term))
            .collect()
    }

    /// Reverse lookup: parameters listing the given application string.
    pub fn parameters_for_application(&self, application: &str) -> Vec<&Parameter> {
        self.parameters
            .iter()
            .filter(|p| {
                p.applications
                    .iter()
                    .any(|a| a.eq_ignore_ascii_case(application))
            })
            .collect()
    }
}

impl Parameter {
    pub fn links(&self, gender: Gender) -> Option<&SourceLinks> {
        match gender {
            Gender::Male => self.male.as_ref(),
            Gender::Female => self.female.as_ref(),
        }
    }
}
