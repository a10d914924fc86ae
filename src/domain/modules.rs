//! Tool module selection
//!
//! Tools are grouped by upstream API family; deployments enable a subset through
//! `ENABLED_MODULES`.

use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleKind {
    Serp,
    KeywordsData,
    OnPage,
    DataforseoLabs,
    Backlinks,
    BusinessData,
    DomainAnalytics,
}

impl ModuleKind {
    pub const ALL: [ModuleKind; 7] = [
        ModuleKind::Serp,
        ModuleKind::KeywordsData,
        ModuleKind::OnPage,
        ModuleKind::DataforseoLabs,
        ModuleKind::Backlinks,
        ModuleKind::BusinessData,
        ModuleKind::DomainAnalytics,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Serp => "SERP",
            Self::KeywordsData => "KEYWORDS_DATA",
            Self::OnPage => "ONPAGE",
            Self::DataforseoLabs => "DATAFORSEO_LABS",
            Self::Backlinks => "BACKLINKS",
            Self::BusinessData => "BUSINESS_DATA",
            Self::DomainAnalytics => "DOMAIN_ANALYTICS",
        }
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownModule(pub String);

impl FromStr for ModuleKind {
    type Err = UnknownModule;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_uppercase();
        ModuleKind::ALL
            .into_iter()
            .find(|module| module.as_str() == normalized)
            .ok_or_else(|| UnknownModule(value.trim().to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnabledModules(Vec<ModuleKind>);

impl EnabledModules {
    pub fn all() -> Self {
        Self(ModuleKind::ALL.to_vec())
    }

    /// Parses a comma separated module list. Blank entries are ignored and an
    /// all-blank list enables every module.
    pub fn parse(value: &str) -> Result<Self, UnknownModule> {
        let mut modules = Vec::new();
        for entry in value.split(',').filter(|entry| !entry.trim().is_empty()) {
            let module = entry.parse::<ModuleKind>()?;
            if !modules.contains(&module) {
                modules.push(module);
            }
        }

        if modules.is_empty() {
            return Ok(Self::all());
        }
        Ok(Self(modules))
    }

    pub fn contains(&self, module: ModuleKind) -> bool {
        self.0.contains(&module)
    }

    pub fn iter(&self) -> impl Iterator<Item = ModuleKind> + '_ {
        self.0.iter().copied()
    }
}
